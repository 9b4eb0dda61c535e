//! Administrative operations: account management, oversight listings,
//! the vendor sales report and the redemption CSV export.
//!
//! Every operation here runs under an ADMIN identity; the API layer
//! enforces that before calling in. The guards in this module protect
//! the default admin account and prevent self-targeting.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::json;

use crate::domain::{AuditAction, AuditEntry, OfferId, Role, User, UserId};
use crate::error::ApiError;
use crate::storage::{OfferWithVendor, RedemptionDetail, Storage};

use super::record_audit;

/// Commission rate withheld from vendor revenue.
const COMMISSION_RATE: f64 = 0.15;

/// How many audit entries the system log endpoint returns.
const SYSTEM_LOG_LIMIT: u32 = 500;

/// Per-offer slice of a vendor's sales report.
#[derive(Debug, Clone)]
pub struct OfferSales {
    /// The offer reported on.
    pub offer_id: OfferId,
    /// Offer headline.
    pub title: String,
    /// Number of REDEEMED coupons.
    pub sold: u64,
    /// `sold` times the offer's unit revenue.
    pub revenue: f64,
}

/// One vendor's aggregated sales report.
#[derive(Debug, Clone)]
pub struct VendorSales {
    /// The vendor reported on.
    pub vendor_id: UserId,
    /// Vendor display name.
    pub vendor_name: String,
    /// Vendor email.
    pub vendor_email: String,
    /// Per-offer breakdown, every offer included even at zero sales.
    pub offers: Vec<OfferSales>,
    /// Sum of per-offer revenue.
    pub total_revenue: f64,
    /// Commission on the vendor's total, rounded to whole units.
    pub commission: f64,
    /// Total revenue minus commission.
    pub profit: f64,
}

/// Administrative surface over accounts, offers and redemptions.
#[derive(Debug, Clone)]
pub struct AdminService {
    storage: Storage,
    default_admin_email: String,
}

impl AdminService {
    /// Creates the service, naming the protected default admin account.
    #[must_use]
    pub fn new(storage: Storage, default_admin_email: String) -> Self {
        Self {
            storage,
            default_admin_email,
        }
    }

    /// Every account, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.storage.users.list().await
    }

    /// Changes an account's role.
    ///
    /// The default admin cannot be demoted and another admin's role
    /// cannot be changed (admins may change their own). Granting VENDOR
    /// approves the account in the same step.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::UserNotFound`] for an unknown target,
    /// [`ApiError::Validation`] for an unknown role label and
    /// [`ApiError::AdminGuard`] when a protection refuses the change.
    pub async fn set_role(
        &self,
        admin: &User,
        target_id: UserId,
        role_label: &str,
        ip: &str,
    ) -> Result<User, ApiError> {
        let role = Role::from_parts(role_label, true).ok_or_else(|| {
            ApiError::Validation("role must be one of ADMIN, VENDOR, USER".to_string())
        })?;

        let mut target = self
            .storage
            .users
            .by_id(target_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;
        if target.email == self.default_admin_email && !role.is_admin() {
            return Err(ApiError::AdminGuard(
                "default admin role cannot be changed".to_string(),
            ));
        }
        if target.role.is_admin() && admin.id != target.id {
            return Err(ApiError::AdminGuard(
                "cannot change another admin's role".to_string(),
            ));
        }

        target.role = role;
        target.updated_at = Utc::now();
        self.storage.users.update(&target).await?;
        record_audit(
            &self.storage,
            Some(admin.id),
            AuditAction::RoleUpdated,
            ip,
            Some(json!({ "target_user_id": target.id, "role": role.label() })),
        )
        .await;

        tracing::info!(target_user_id = %target.id, role = role.label(), "role updated");
        Ok(target)
    }

    /// Approves a vendor account.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::UserNotFound`] for an unknown target and
    /// [`ApiError::Validation`] when the target is not a VENDOR.
    pub async fn approve_vendor(
        &self,
        admin: &User,
        target_id: UserId,
        ip: &str,
    ) -> Result<User, ApiError> {
        let mut target = self
            .storage
            .users
            .by_id(target_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;
        if !target.role.is_vendor() {
            return Err(ApiError::Validation("user is not VENDOR".to_string()));
        }

        target.role = Role::Vendor { approved: true };
        target.updated_at = Utc::now();
        self.storage.users.update(&target).await?;
        record_audit(
            &self.storage,
            Some(admin.id),
            AuditAction::VendorApproved,
            ip,
            Some(json!({ "target_user_id": target.id })),
        )
        .await;

        tracing::info!(target_user_id = %target.id, "vendor approved");
        Ok(target)
    }

    /// Blocks or unblocks an account.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::UserNotFound`] for an unknown target and
    /// [`ApiError::AdminGuard`] when targeting the default admin or the
    /// calling admin themselves.
    pub async fn set_blocked(
        &self,
        admin: &User,
        target_id: UserId,
        blocked: bool,
        ip: &str,
    ) -> Result<User, ApiError> {
        let mut target = self
            .storage
            .users
            .by_id(target_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;
        if target.email == self.default_admin_email || target.id == admin.id {
            return Err(ApiError::AdminGuard(
                "cannot block the default admin or yourself".to_string(),
            ));
        }

        target.is_blocked = blocked;
        target.updated_at = Utc::now();
        self.storage.users.update(&target).await?;
        record_audit(
            &self.storage,
            Some(admin.id),
            AuditAction::UserBlockUpdated,
            ip,
            Some(json!({ "target_user_id": target.id, "is_blocked": blocked })),
        )
        .await;

        tracing::info!(target_user_id = %target.id, blocked, "block flag updated");
        Ok(target)
    }

    /// Deletes an account along with its offers and coupons.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::UserNotFound`] for an unknown target and
    /// [`ApiError::AdminGuard`] when targeting the default admin or the
    /// calling admin themselves.
    pub async fn delete_user(
        &self,
        admin: &User,
        target_id: UserId,
        ip: &str,
    ) -> Result<(), ApiError> {
        let target = self
            .storage
            .users
            .by_id(target_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;
        if target.email == self.default_admin_email || target.id == admin.id {
            return Err(ApiError::AdminGuard(
                "cannot delete the default admin or yourself".to_string(),
            ));
        }

        self.storage.users.delete(target.id).await?;
        record_audit(
            &self.storage,
            Some(admin.id),
            AuditAction::UserDeleted,
            ip,
            Some(json!({ "target_user_id": target.id, "target_email": target.email })),
        )
        .await;

        tracing::info!(target_user_id = %target.id, "user deleted");
        Ok(())
    }

    /// Every offer regardless of state, with vendor details.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    pub async fn all_offers(&self) -> Result<Vec<OfferWithVendor>, ApiError> {
        self.storage.offers.list_all().await
    }

    /// Every redemption, joined with the involved parties.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    pub async fn redemptions(&self) -> Result<Vec<RedemptionDetail>, ApiError> {
        self.storage.redemptions.list_detailed().await
    }

    /// Latest audit entries across all accounts.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    pub async fn system_logs(&self) -> Result<Vec<AuditEntry>, ApiError> {
        self.storage.audit.recent(SYSTEM_LOG_LIMIT).await
    }

    /// Sales report across all vendors.
    ///
    /// Sold counts come from REDEEMED coupons only; ACTIVE and EXPIRED
    /// coupons earn nothing. Commission is taken on each vendor's total
    /// rather than per offer.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    pub async fn vendor_sales(&self) -> Result<Vec<VendorSales>, ApiError> {
        let vendors = self.storage.users.list_vendors().await?;
        let counts: HashMap<OfferId, u64> = self
            .storage
            .coupons
            .redeemed_counts()
            .await?
            .into_iter()
            .collect();

        let mut report = Vec::with_capacity(vendors.len());
        for vendor in vendors {
            let offers = self.storage.offers.by_vendor(vendor.id).await?;
            let mut lines = Vec::with_capacity(offers.len());
            let mut total_revenue = 0.0;
            for offer in offers {
                let sold = counts.get(&offer.id).copied().unwrap_or(0);
                let revenue = as_f64(sold) * offer.unit_revenue();
                total_revenue += revenue;
                lines.push(OfferSales {
                    offer_id: offer.id,
                    title: offer.title,
                    sold,
                    revenue,
                });
            }
            let commission = (total_revenue * COMMISSION_RATE).round();
            report.push(VendorSales {
                vendor_id: vendor.id,
                vendor_name: vendor.name,
                vendor_email: vendor.email,
                offers: lines,
                total_revenue,
                commission,
                profit: total_revenue - commission,
            });
        }
        Ok(report)
    }

    /// Renders every redemption as CSV.
    ///
    /// Columns: coupon_id, user_email, vendor_email, offer_title,
    /// redeemed_at, ip. Missing joined fields render as empty cells.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure and
    /// [`ApiError::Internal`] when CSV rendering fails.
    pub async fn export_redemptions_csv(&self, admin: &User, ip: &str) -> Result<String, ApiError> {
        let rows = self.storage.redemptions.list_detailed().await?;
        let count = rows.len();

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record([
                "coupon_id",
                "user_email",
                "vendor_email",
                "offer_title",
                "redeemed_at",
                "ip",
            ])
            .map_err(csv_err)?;
        for row in rows {
            writer
                .write_record([
                    row.redemption.coupon_id.to_string(),
                    row.user_email.unwrap_or_default(),
                    row.vendor_email.unwrap_or_default(),
                    row.offer_title.unwrap_or_default(),
                    row.redemption.redeemed_at.to_rfc3339(),
                    row.redemption.ip,
                ])
                .map_err(csv_err)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ApiError::Internal(format!("csv flush failed: {e}")))?;
        let body = String::from_utf8(bytes)
            .map_err(|e| ApiError::Internal(format!("csv not utf-8: {e}")))?;

        record_audit(
            &self.storage,
            Some(admin.id),
            AuditAction::CsvExported,
            ip,
            Some(json!({ "count": count })),
        )
        .await;

        tracing::info!(count, "redemption csv exported");
        Ok(body)
    }
}

fn csv_err(e: csv::Error) -> ApiError {
    ApiError::Internal(format!("csv write failed: {e}"))
}

/// Exact for any realistic sold count.
#[allow(clippy::cast_precision_loss)]
fn as_f64(count: u64) -> f64 {
    count as f64
}
