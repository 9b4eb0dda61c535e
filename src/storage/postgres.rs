//! PostgreSQL storage backend.
//!
//! The two lifecycle operations that must be atomic are each a single
//! statement: `issue_if_capacity` is an `INSERT ... SELECT` guarded by a
//! REDEEMED-count subquery, and `redeem_if_active` is a conditional
//! `UPDATE ... RETURNING`. Everything else is plain CRUD.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::domain::{
    AuditAction, AuditEntry, Coupon, CouponId, CouponStatus, Offer, OfferId, OtpChallenge,
    Redemption, Role, User, UserId,
};
use crate::error::ApiError;

use super::{
    AuditStore, CouponStore, CouponWithOffer, IssueOutcome, OfferStore, OfferWithVendor,
    RedemptionDetail, RedemptionStore, UserStore,
};

/// Embedded migrations, applied at startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Builds a connection pool from config and applies pending migrations.
///
/// # Errors
///
/// Returns [`ApiError::Storage`] when the pool cannot be created or a
/// migration fails.
pub async fn connect_and_migrate(
    url: &str,
    config: &GatewayConfig,
) -> Result<PgPool, ApiError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(std::time::Duration::from_secs(
            config.database_connect_timeout_secs,
        ))
        .connect(url)
        .await
        .map_err(|e| ApiError::Storage(e.to_string()))?;

    MIGRATOR
        .run(&pool)
        .await
        .map_err(|e| ApiError::Storage(e.to_string()))?;

    Ok(pool)
}

/// PostgreSQL backend implementing all five store seams.
#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Creates a backend over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn storage_err(e: sqlx::Error) -> ApiError {
    ApiError::Storage(e.to_string())
}

/// Maps unique-constraint violations on users to the conflict error.
fn user_write_err(e: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return ApiError::EmailOrPhoneTaken;
        }
    }
    storage_err(e)
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    password_hash: String,
    role: String,
    vendor_approved: bool,
    is_blocked: bool,
    otp_verified: bool,
    otp_code: Option<String>,
    otp_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User, ApiError> {
        let role = Role::from_parts(&self.role, self.vendor_approved)
            .ok_or_else(|| ApiError::Storage(format!("unknown role label: {}", self.role)))?;
        let otp = match (self.otp_code, self.otp_expires_at) {
            (Some(code), Some(expires_at)) => Some(OtpChallenge { code, expires_at }),
            _ => None,
        };
        Ok(User {
            id: UserId::from_uuid(self.id),
            name: self.name,
            email: self.email,
            phone: self.phone,
            password_hash: self.password_hash,
            role,
            is_blocked: self.is_blocked,
            otp_verified: self.otp_verified,
            otp,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const USER_COLUMNS: &str = "id, name, email, phone, password_hash, role, vendor_approved, \
     is_blocked, otp_verified, otp_code, otp_expires_at, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OfferRow {
    id: Uuid,
    vendor_id: Uuid,
    title: String,
    description: String,
    image_url: Option<String>,
    actual_price: f64,
    discounted_price: f64,
    coupon_price: f64,
    expiry_date: DateTime<Utc>,
    max_redemptions: i32,
    category: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OfferRow {
    fn into_offer(self) -> Result<Offer, ApiError> {
        let max_redemptions = u32::try_from(self.max_redemptions)
            .map_err(|_| ApiError::Storage("negative max_redemptions".to_string()))?;
        Ok(Offer {
            id: OfferId::from_uuid(self.id),
            vendor_id: UserId::from_uuid(self.vendor_id),
            title: self.title,
            description: self.description,
            image_url: self.image_url,
            actual_price: self.actual_price,
            discounted_price: self.discounted_price,
            coupon_price: self.coupon_price,
            expiry_date: self.expiry_date,
            max_redemptions,
            category: self.category,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const OFFER_COLUMNS: &str = "id, vendor_id, title, description, image_url, actual_price, \
     discounted_price, coupon_price, expiry_date, max_redemptions, category, is_active, \
     created_at, updated_at";

const OFFER_VENDOR_COLUMNS: &str =
    "o.id, o.vendor_id, o.title, o.description, o.image_url, o.actual_price, \
     o.discounted_price, o.coupon_price, o.expiry_date, o.max_redemptions, o.category, \
     o.is_active, o.created_at, o.updated_at, u.name AS vendor_name, u.email AS vendor_email";

#[derive(sqlx::FromRow)]
struct OfferVendorRow {
    #[sqlx(flatten)]
    offer: OfferRow,
    vendor_name: String,
    vendor_email: String,
}

impl OfferVendorRow {
    fn into_joined(self) -> Result<OfferWithVendor, ApiError> {
        Ok(OfferWithVendor {
            offer: self.offer.into_offer()?,
            vendor_name: self.vendor_name,
            vendor_email: self.vendor_email,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CouponRow {
    id: Uuid,
    offer_id: Uuid,
    user_id: Uuid,
    vendor_id: Uuid,
    status: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    redeemed_at: Option<DateTime<Utc>>,
}

impl CouponRow {
    fn into_coupon(self) -> Result<Coupon, ApiError> {
        let status = CouponStatus::from_label(&self.status)
            .ok_or_else(|| ApiError::Storage(format!("unknown coupon status: {}", self.status)))?;
        Ok(Coupon {
            id: CouponId::from_uuid(self.id),
            offer_id: OfferId::from_uuid(self.offer_id),
            user_id: UserId::from_uuid(self.user_id),
            vendor_id: UserId::from_uuid(self.vendor_id),
            status,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
            redeemed_at: self.redeemed_at,
        })
    }
}

const COUPON_COLUMNS: &str =
    "id, offer_id, user_id, vendor_id, status, issued_at, expires_at, redeemed_at";

#[derive(sqlx::FromRow)]
struct CouponOfferRow {
    #[sqlx(flatten)]
    coupon: CouponRow,
    offer_title: Option<String>,
    offer_category: Option<String>,
}

#[derive(sqlx::FromRow)]
struct RedemptionDetailRow {
    coupon_id: Uuid,
    user_id: Uuid,
    vendor_id: Uuid,
    offer_id: Uuid,
    redeemed_at: DateTime<Utc>,
    ip: String,
    created_at: DateTime<Utc>,
    user_name: Option<String>,
    user_email: Option<String>,
    vendor_name: Option<String>,
    vendor_email: Option<String>,
    offer_title: Option<String>,
    offer_category: Option<String>,
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    user_id: Option<Uuid>,
    action: String,
    ip: String,
    meta: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl AuditRow {
    fn into_entry(self) -> Result<AuditEntry, ApiError> {
        let action = AuditAction::from_label(&self.action)
            .ok_or_else(|| ApiError::Storage(format!("unknown audit action: {}", self.action)))?;
        Ok(AuditEntry {
            id: self.id,
            user_id: self.user_id.map(UserId::from_uuid),
            action,
            ip: self.ip,
            meta: self.meta,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl UserStore for PgStorage {
    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    async fn insert(&self, user: &User) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, phone, password_hash, role, vendor_approved, \
             is_blocked, otp_verified, otp_code, otp_expires_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role.label())
        .bind(user.role.vendor_approved())
        .bind(user.is_blocked)
        .bind(user.otp_verified)
        .bind(user.otp.as_ref().map(|o| o.code.clone()))
        .bind(user.otp.as_ref().map(|o| o.expires_at))
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(user_write_err)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update(&self, user: &User) -> Result<(), ApiError> {
        let result = sqlx::query(
            "UPDATE users SET name = $2, email = $3, phone = $4, password_hash = $5, \
             role = $6, vendor_approved = $7, is_blocked = $8, otp_verified = $9, \
             otp_code = $10, otp_expires_at = $11, updated_at = $12 WHERE id = $1",
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role.label())
        .bind(user.role.vendor_approved())
        .bind(user.is_blocked)
        .bind(user.otp_verified)
        .bind(user.otp.as_ref().map(|o| o.code.clone()))
        .bind(user.otp.as_ref().map(|o| o.expires_at))
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(user_write_err)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::UserNotFound);
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(user_id = %id))]
    async fn delete(&self, id: UserId) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        if result.rows_affected() == 0 {
            return Err(ApiError::UserNotFound);
        }
        Ok(())
    }

    async fn by_id(&self, id: UserId) -> Result<Option<User>, ApiError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;
        row.map(UserRow::into_user).transpose()
    }

    async fn by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;
        row.map(UserRow::into_user).transpose()
    }

    async fn by_identifier(&self, identifier: &str) -> Result<Option<User>, ApiError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 OR name = $1 LIMIT 1"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;
        row.map(UserRow::into_user).transpose()
    }

    async fn count(&self) -> Result<u64, ApiError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn list(&self) -> Result<Vec<User>, ApiError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.into_iter().map(UserRow::into_user).collect()
    }

    async fn list_vendors(&self) -> Result<Vec<User>, ApiError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = 'VENDOR' ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.into_iter().map(UserRow::into_user).collect()
    }
}

#[async_trait]
impl OfferStore for PgStorage {
    #[tracing::instrument(skip(self, offer), fields(offer_id = %offer.id))]
    async fn insert(&self, offer: &Offer) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO offers (id, vendor_id, title, description, image_url, actual_price, \
             discounted_price, coupon_price, expiry_date, max_redemptions, category, is_active, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(offer.id.as_uuid())
        .bind(offer.vendor_id.as_uuid())
        .bind(&offer.title)
        .bind(&offer.description)
        .bind(&offer.image_url)
        .bind(offer.actual_price)
        .bind(offer.discounted_price)
        .bind(offer.coupon_price)
        .bind(offer.expiry_date)
        .bind(i32::try_from(offer.max_redemptions).unwrap_or(i32::MAX))
        .bind(&offer.category)
        .bind(offer.is_active)
        .bind(offer.created_at)
        .bind(offer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, offer), fields(offer_id = %offer.id))]
    async fn update(&self, offer: &Offer) -> Result<(), ApiError> {
        let result = sqlx::query(
            "UPDATE offers SET title = $2, description = $3, image_url = $4, actual_price = $5, \
             discounted_price = $6, coupon_price = $7, expiry_date = $8, max_redemptions = $9, \
             category = $10, is_active = $11, updated_at = $12 WHERE id = $1",
        )
        .bind(offer.id.as_uuid())
        .bind(&offer.title)
        .bind(&offer.description)
        .bind(&offer.image_url)
        .bind(offer.actual_price)
        .bind(offer.discounted_price)
        .bind(offer.coupon_price)
        .bind(offer.expiry_date)
        .bind(i32::try_from(offer.max_redemptions).unwrap_or(i32::MAX))
        .bind(&offer.category)
        .bind(offer.is_active)
        .bind(offer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::OfferNotFound);
        }
        Ok(())
    }

    async fn by_id(&self, id: OfferId) -> Result<Option<Offer>, ApiError> {
        let row = sqlx::query_as::<_, OfferRow>(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;
        row.map(OfferRow::into_offer).transpose()
    }

    async fn by_vendor(&self, vendor_id: UserId) -> Result<Vec<Offer>, ApiError> {
        let rows = sqlx::query_as::<_, OfferRow>(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers WHERE vendor_id = $1 ORDER BY created_at DESC"
        ))
        .bind(vendor_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.into_iter().map(OfferRow::into_offer).collect()
    }

    async fn list_published(
        &self,
        now: DateTime<Utc>,
        category: Option<&str>,
    ) -> Result<Vec<OfferWithVendor>, ApiError> {
        let base = format!(
            "SELECT {OFFER_VENDOR_COLUMNS} \
             FROM offers o JOIN users u ON u.id = o.vendor_id \
             WHERE o.is_active AND o.expiry_date > $1"
        );
        let rows = if let Some(category) = category {
            sqlx::query_as::<_, OfferVendorRow>(&format!(
                "{base} AND o.category = $2 ORDER BY o.created_at DESC"
            ))
            .bind(now)
            .bind(category)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, OfferVendorRow>(&format!("{base} ORDER BY o.created_at DESC"))
                .bind(now)
                .fetch_all(&self.pool)
                .await
        }
        .map_err(storage_err)?;

        rows.into_iter().map(OfferVendorRow::into_joined).collect()
    }

    async fn list_all(&self) -> Result<Vec<OfferWithVendor>, ApiError> {
        let rows = sqlx::query_as::<_, OfferVendorRow>(&format!(
            "SELECT {OFFER_VENDOR_COLUMNS} \
             FROM offers o JOIN users u ON u.id = o.vendor_id \
             ORDER BY o.created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.into_iter().map(OfferVendorRow::into_joined).collect()
    }
}

#[async_trait]
impl CouponStore for PgStorage {
    #[tracing::instrument(
        skip(self, coupon),
        fields(coupon_id = %coupon.id, offer_id = %coupon.offer_id)
    )]
    async fn issue_if_capacity(
        &self,
        coupon: &Coupon,
        max_redemptions: u32,
    ) -> Result<IssueOutcome, ApiError> {
        // Cap check and insert in one statement; the subquery runs under
        // the same snapshot as the insert.
        let result = sqlx::query(
            "INSERT INTO coupons (id, offer_id, user_id, vendor_id, status, issued_at, \
             expires_at, redeemed_at) \
             SELECT $1, $2, $3, $4, $5, $6, $7, $8 \
             WHERE (SELECT COUNT(*) FROM coupons \
                    WHERE offer_id = $2 AND status = 'REDEEMED') < $9",
        )
        .bind(coupon.id.as_uuid())
        .bind(coupon.offer_id.as_uuid())
        .bind(coupon.user_id.as_uuid())
        .bind(coupon.vendor_id.as_uuid())
        .bind(coupon.status.as_str())
        .bind(coupon.issued_at)
        .bind(coupon.expires_at)
        .bind(coupon.redeemed_at)
        .bind(i64::from(max_redemptions))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            Ok(IssueOutcome::CapReached)
        } else {
            Ok(IssueOutcome::Issued)
        }
    }

    async fn by_id(&self, id: CouponId) -> Result<Option<Coupon>, ApiError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;
        row.map(CouponRow::into_coupon).transpose()
    }

    async fn for_user(&self, user_id: UserId) -> Result<Vec<CouponWithOffer>, ApiError> {
        let rows = sqlx::query_as::<_, CouponOfferRow>(
            "SELECT c.id, c.offer_id, c.user_id, c.vendor_id, c.status, c.issued_at, \
             c.expires_at, c.redeemed_at, o.title AS offer_title, o.category AS offer_category \
             FROM coupons c LEFT JOIN offers o ON o.id = c.offer_id \
             WHERE c.user_id = $1 ORDER BY c.issued_at DESC",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.into_iter()
            .map(|row| {
                Ok(CouponWithOffer {
                    coupon: row.coupon.into_coupon()?,
                    offer_title: row.offer_title,
                    offer_category: row.offer_category,
                })
            })
            .collect()
    }

    async fn count_redeemed(&self, offer_id: OfferId) -> Result<u64, ApiError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM coupons WHERE offer_id = $1 AND status = 'REDEEMED'",
        )
        .bind(offer_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    #[tracing::instrument(skip(self))]
    async fn expire_stale(&self, now: DateTime<Utc>) -> Result<u64, ApiError> {
        let result = sqlx::query(
            "UPDATE coupons SET status = 'EXPIRED' \
             WHERE status = 'ACTIVE' AND expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    async fn expire_stale_for_user(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<u64, ApiError> {
        let result = sqlx::query(
            "UPDATE coupons SET status = 'EXPIRED' \
             WHERE user_id = $1 AND status = 'ACTIVE' AND expires_at <= $2",
        )
        .bind(user_id.as_uuid())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self), fields(coupon_id = %id, vendor_id = %vendor_id))]
    async fn redeem_if_active(
        &self,
        id: CouponId,
        vendor_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Coupon>, ApiError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "UPDATE coupons SET status = 'REDEEMED', redeemed_at = $3 \
             WHERE id = $1 AND vendor_id = $2 AND status = 'ACTIVE' AND expires_at > $3 \
             RETURNING {COUPON_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(vendor_id.as_uuid())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;
        row.map(CouponRow::into_coupon).transpose()
    }

    async fn redeemed_counts(&self) -> Result<Vec<(OfferId, u64)>, ApiError> {
        let rows = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT offer_id, COUNT(*) FROM coupons \
             WHERE status = 'REDEEMED' GROUP BY offer_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(rows
            .into_iter()
            .map(|(offer_id, count)| {
                (
                    OfferId::from_uuid(offer_id),
                    u64::try_from(count).unwrap_or(0),
                )
            })
            .collect())
    }
}

#[async_trait]
impl RedemptionStore for PgStorage {
    #[tracing::instrument(skip(self, redemption), fields(coupon_id = %redemption.coupon_id))]
    async fn record(&self, redemption: &Redemption) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO redemptions (coupon_id, user_id, vendor_id, offer_id, redeemed_at, \
             ip, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(redemption.coupon_id.as_uuid())
        .bind(redemption.user_id.as_uuid())
        .bind(redemption.vendor_id.as_uuid())
        .bind(redemption.offer_id.as_uuid())
        .bind(redemption.redeemed_at)
        .bind(&redemption.ip)
        .bind(redemption.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn list_detailed(&self) -> Result<Vec<RedemptionDetail>, ApiError> {
        let rows = sqlx::query_as::<_, RedemptionDetailRow>(
            "SELECT r.coupon_id, r.user_id, r.vendor_id, r.offer_id, r.redeemed_at, r.ip, \
             r.created_at, \
             u.name AS user_name, u.email AS user_email, \
             v.name AS vendor_name, v.email AS vendor_email, \
             o.title AS offer_title, o.category AS offer_category \
             FROM redemptions r \
             LEFT JOIN users u ON u.id = r.user_id \
             LEFT JOIN users v ON v.id = r.vendor_id \
             LEFT JOIN offers o ON o.id = r.offer_id \
             ORDER BY r.redeemed_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows
            .into_iter()
            .map(|row| RedemptionDetail {
                redemption: Redemption {
                    coupon_id: CouponId::from_uuid(row.coupon_id),
                    user_id: UserId::from_uuid(row.user_id),
                    vendor_id: UserId::from_uuid(row.vendor_id),
                    offer_id: OfferId::from_uuid(row.offer_id),
                    redeemed_at: row.redeemed_at,
                    ip: row.ip,
                    created_at: row.created_at,
                },
                user_name: row.user_name,
                user_email: row.user_email,
                vendor_name: row.vendor_name,
                vendor_email: row.vendor_email,
                offer_title: row.offer_title,
                offer_category: row.offer_category,
            })
            .collect())
    }
}

#[async_trait]
impl AuditStore for PgStorage {
    #[tracing::instrument(skip(self, entry), fields(action = %entry.action))]
    async fn append(&self, entry: &AuditEntry) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO audit_log (id, user_id, action, ip, meta, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entry.id)
        .bind(entry.user_id.map(|id| *id.as_uuid()))
        .bind(entry.action.as_str())
        .bind(&entry.ip)
        .bind(&entry.meta)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn for_user(&self, user_id: UserId, limit: u32) -> Result<Vec<AuditEntry>, ApiError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT id, user_id, action, ip, meta, created_at FROM audit_log \
             WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id.as_uuid())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.into_iter().map(AuditRow::into_entry).collect()
    }

    async fn recent(&self, limit: u32) -> Result<Vec<AuditEntry>, ApiError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT id, user_id, action, ip, meta, created_at FROM audit_log \
             ORDER BY created_at DESC LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.into_iter().map(AuditRow::into_entry).collect()
    }
}
