//! Storage layer: trait seams over the in-memory and PostgreSQL backends.
//!
//! Handlers and services speak to these traits only. The contract that
//! matters most lives on [`CouponStore`]: `issue_if_capacity` and
//! `redeem_if_active` are single atomic operations on the backend, which
//! is what makes the redemption cap and the at-most-once redemption
//! guarantee hold under concurrency.

pub mod memory;
pub mod postgres;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    AuditEntry, Coupon, CouponId, Offer, OfferId, Redemption, User, UserId,
};
use crate::error::ApiError;

/// Outcome of an issuance attempt against an offer's redemption cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueOutcome {
    /// The coupon was persisted.
    Issued,
    /// The offer already has `max_redemptions` REDEEMED coupons.
    CapReached,
}

/// Offer joined with its vendor's public fields.
#[derive(Debug, Clone)]
pub struct OfferWithVendor {
    /// The offer itself.
    pub offer: Offer,
    /// Vendor display name.
    pub vendor_name: String,
    /// Vendor email.
    pub vendor_email: String,
}

/// Coupon joined with its offer's display fields.
///
/// The joined fields are optional: a held coupon outlives the offer it
/// was issued against when the vendor's account is deleted.
#[derive(Debug, Clone)]
pub struct CouponWithOffer {
    /// The coupon itself.
    pub coupon: Coupon,
    /// Title of the offer it was issued against, if it still exists.
    pub offer_title: Option<String>,
    /// Category of that offer, if it still exists.
    pub offer_category: Option<String>,
}

/// Redemption joined with the parties involved.
///
/// The joined fields are optional: redemption rows outlive the accounts
/// and offers they reference.
#[derive(Debug, Clone)]
pub struct RedemptionDetail {
    /// The redemption record itself.
    pub redemption: Redemption,
    /// Redeeming user's name, if the account still exists.
    pub user_name: Option<String>,
    /// Redeeming user's email, if the account still exists.
    pub user_email: Option<String>,
    /// Confirming vendor's name, if the account still exists.
    pub vendor_name: Option<String>,
    /// Confirming vendor's email, if the account still exists.
    pub vendor_email: Option<String>,
    /// Offer title, if the offer still exists.
    pub offer_title: Option<String>,
    /// Offer category, if the offer still exists.
    pub offer_category: Option<String>,
}

/// User account storage.
#[async_trait]
pub trait UserStore: Send + Sync + fmt::Debug {
    /// Inserts a new account.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EmailOrPhoneTaken`] when the email or phone is
    /// already in use, [`ApiError::Storage`] on backend failure.
    async fn insert(&self, user: &User) -> Result<(), ApiError>;

    /// Replaces the stored account with the given state.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::UserNotFound`] when no such account exists,
    /// [`ApiError::EmailOrPhoneTaken`] when the new email or phone
    /// collides with another account, [`ApiError::Storage`] on backend
    /// failure.
    async fn update(&self, user: &User) -> Result<(), ApiError>;

    /// Deletes an account. Offers and coupons belonging to it go with it.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::UserNotFound`] when no such account exists,
    /// [`ApiError::Storage`] on backend failure.
    async fn delete(&self, id: UserId) -> Result<(), ApiError>;

    /// Looks up an account by id.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn by_id(&self, id: UserId) -> Result<Option<User>, ApiError>;

    /// Looks up an account by exact email.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn by_email(&self, email: &str) -> Result<Option<User>, ApiError>;

    /// Looks up an account whose email **or** name equals `identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn by_identifier(&self, identifier: &str) -> Result<Option<User>, ApiError>;

    /// Total number of accounts.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn count(&self) -> Result<u64, ApiError>;

    /// All accounts, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn list(&self) -> Result<Vec<User>, ApiError>;

    /// All vendor accounts (approved or not), newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn list_vendors(&self) -> Result<Vec<User>, ApiError>;
}

/// Offer storage.
#[async_trait]
pub trait OfferStore: Send + Sync + fmt::Debug {
    /// Inserts a new offer.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn insert(&self, offer: &Offer) -> Result<(), ApiError>;

    /// Replaces the stored offer with the given state.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::OfferNotFound`] when no such offer exists,
    /// [`ApiError::Storage`] on backend failure.
    async fn update(&self, offer: &Offer) -> Result<(), ApiError>;

    /// Looks up an offer by id.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn by_id(&self, id: OfferId) -> Result<Option<Offer>, ApiError>;

    /// All offers owned by `vendor_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn by_vendor(&self, vendor_id: UserId) -> Result<Vec<Offer>, ApiError>;

    /// Active, unexpired offers visible to users, newest first,
    /// optionally filtered by exact category.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn list_published(
        &self,
        now: DateTime<Utc>,
        category: Option<&str>,
    ) -> Result<Vec<OfferWithVendor>, ApiError>;

    /// Every offer regardless of state, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn list_all(&self) -> Result<Vec<OfferWithVendor>, ApiError>;
}

/// Coupon storage. Hosts the two atomic lifecycle operations.
#[async_trait]
pub trait CouponStore: Send + Sync + fmt::Debug {
    /// Persists `coupon` unless the offer already has `max_redemptions`
    /// REDEEMED coupons. Cap check and insert are one atomic operation.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn issue_if_capacity(
        &self,
        coupon: &Coupon,
        max_redemptions: u32,
    ) -> Result<IssueOutcome, ApiError>;

    /// Looks up a coupon by id.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn by_id(&self, id: CouponId) -> Result<Option<Coupon>, ApiError>;

    /// All coupons held by `user_id`, newest first, joined with their
    /// offer's title and category.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn for_user(&self, user_id: UserId) -> Result<Vec<CouponWithOffer>, ApiError>;

    /// Number of REDEEMED coupons for an offer.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn count_redeemed(&self, offer_id: OfferId) -> Result<u64, ApiError>;

    /// Transitions every ACTIVE coupon with `expires_at <= now` to
    /// EXPIRED. Idempotent; returns the number of rows reconciled.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn expire_stale(&self, now: DateTime<Utc>) -> Result<u64, ApiError>;

    /// Same as [`CouponStore::expire_stale`] but scoped to one holder.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn expire_stale_for_user(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<u64, ApiError>;

    /// The at-most-once redemption transition: updates the coupon to
    /// REDEEMED with `redeemed_at = now` if and only if it matches
    /// {id, vendor, status ACTIVE, `expires_at > now`}, as one atomic
    /// conditional operation. Returns the updated coupon, or `None`
    /// when the condition did not hold.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn redeem_if_active(
        &self,
        id: CouponId,
        vendor_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Coupon>, ApiError>;

    /// REDEEMED coupon counts grouped by offer.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn redeemed_counts(&self) -> Result<Vec<(OfferId, u64)>, ApiError>;
}

/// Redemption record storage.
#[async_trait]
pub trait RedemptionStore: Send + Sync + fmt::Debug {
    /// Appends a redemption record.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn record(&self, redemption: &Redemption) -> Result<(), ApiError>;

    /// Every redemption, most recently redeemed first, joined with the
    /// involved parties.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn list_detailed(&self) -> Result<Vec<RedemptionDetail>, ApiError>;
}

/// Audit trail storage.
#[async_trait]
pub trait AuditStore: Send + Sync + fmt::Debug {
    /// Appends an audit entry.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn append(&self, entry: &AuditEntry) -> Result<(), ApiError>;

    /// Latest entries for one account, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn for_user(&self, user_id: UserId, limit: u32) -> Result<Vec<AuditEntry>, ApiError>;

    /// Latest entries across all accounts, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    async fn recent(&self, limit: u32) -> Result<Vec<AuditEntry>, ApiError>;
}

/// Bundle of the five store seams handed to services and handlers.
#[derive(Debug, Clone)]
pub struct Storage {
    /// User accounts.
    pub users: Arc<dyn UserStore>,
    /// Offers.
    pub offers: Arc<dyn OfferStore>,
    /// Coupons.
    pub coupons: Arc<dyn CouponStore>,
    /// Redemption records.
    pub redemptions: Arc<dyn RedemptionStore>,
    /// Audit trail.
    pub audit: Arc<dyn AuditStore>,
}

impl Storage {
    /// Creates a storage bundle over a single in-memory backend.
    #[must_use]
    pub fn in_memory() -> Self {
        let backend = Arc::new(memory::MemoryStorage::new());
        Self {
            users: Arc::clone(&backend) as Arc<dyn UserStore>,
            offers: Arc::clone(&backend) as Arc<dyn OfferStore>,
            coupons: Arc::clone(&backend) as Arc<dyn CouponStore>,
            redemptions: Arc::clone(&backend) as Arc<dyn RedemptionStore>,
            audit: backend,
        }
    }

    /// Creates a storage bundle over a PostgreSQL connection pool.
    #[must_use]
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let backend = Arc::new(postgres::PgStorage::new(pool));
        Self {
            users: Arc::clone(&backend) as Arc<dyn UserStore>,
            offers: Arc::clone(&backend) as Arc<dyn OfferStore>,
            coupons: Arc::clone(&backend) as Arc<dyn CouponStore>,
            redemptions: Arc::clone(&backend) as Arc<dyn RedemptionStore>,
            audit: backend,
        }
    }
}
