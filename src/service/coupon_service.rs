//! Coupon lifecycle: issuance, lazy expiry sweeps and redemption
//! confirmation.
//!
//! The at-most-once guarantee lives in the storage layer's conditional
//! update; this service sequences the checks around it and owns the
//! side effects (QR rendering, redemption records, audit entries).

use chrono::{Duration, Utc};
use serde_json::json;

use crate::domain::{AuditAction, Coupon, CouponId, OfferId, Redemption, User, UserId};
use crate::error::ApiError;
use crate::qr::coupon_qr_data_url;
use crate::storage::{CouponWithOffer, IssueOutcome, Storage};

use super::record_audit;

/// Issuance and redemption orchestration.
#[derive(Debug, Clone)]
pub struct CouponService {
    storage: Storage,
    coupon_ttl: Duration,
}

impl CouponService {
    /// Creates the service with the configured coupon lifetime.
    #[must_use]
    pub fn new(storage: Storage, coupon_ttl_secs: i64) -> Self {
        Self {
            storage,
            coupon_ttl: Duration::seconds(coupon_ttl_secs),
        }
    }

    /// Issues a single-use coupon against an offer.
    ///
    /// The offer must be active and unexpired, and the offer's REDEEMED
    /// count must still be under its cap; the cap check and the insert
    /// are one atomic storage operation. Returns the coupon and its QR
    /// data URL.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::OfferUnavailable`] for a missing, inactive or
    /// expired offer and [`ApiError::RedemptionLimitReached`] at the cap.
    pub async fn issue(
        &self,
        user: &User,
        offer_id: OfferId,
        ip: &str,
    ) -> Result<(Coupon, String), ApiError> {
        let now = Utc::now();
        let offer = self
            .storage
            .offers
            .by_id(offer_id)
            .await?
            .filter(|offer| offer.is_available(now))
            .ok_or(ApiError::OfferUnavailable)?;

        let coupon = Coupon::issue(&offer, user.id, self.coupon_ttl, now);
        match self
            .storage
            .coupons
            .issue_if_capacity(&coupon, offer.max_redemptions)
            .await?
        {
            IssueOutcome::Issued => {}
            IssueOutcome::CapReached => return Err(ApiError::RedemptionLimitReached),
        }

        let qr_code = coupon_qr_data_url(&coupon)?;
        record_audit(
            &self.storage,
            Some(user.id),
            AuditAction::CouponGenerated,
            ip,
            Some(json!({ "coupon_id": coupon.id, "offer_id": offer.id })),
        )
        .await;

        tracing::info!(coupon_id = %coupon.id, offer_id = %offer.id, "coupon issued");
        Ok((coupon, qr_code))
    }

    /// Confirms a redemption on behalf of the owning vendor.
    ///
    /// Sequence: global expiry sweep, lookup, ownership check, then the
    /// atomic ACTIVE→REDEEMED transition. The redemption record and
    /// audit entry are fire-and-forget; their failure never reverses a
    /// confirmed redemption.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::CouponNotFound`] for an unknown id,
    /// [`ApiError::CouponOwnershipMismatch`] when `vendor` does not own
    /// the coupon and [`ApiError::AlreadyRedeemedOrExpired`] when the
    /// coupon is no longer ACTIVE and in date.
    pub async fn confirm(
        &self,
        vendor: &User,
        coupon_id: CouponId,
        ip: &str,
    ) -> Result<Coupon, ApiError> {
        let now = Utc::now();
        let swept = self.storage.coupons.expire_stale(now).await?;
        if swept > 0 {
            tracing::debug!(swept, "expired stale coupons before confirmation");
        }

        let coupon = self
            .storage
            .coupons
            .by_id(coupon_id)
            .await?
            .ok_or(ApiError::CouponNotFound)?;
        if coupon.vendor_id != vendor.id {
            return Err(ApiError::CouponOwnershipMismatch);
        }

        let redeemed = self
            .storage
            .coupons
            .redeem_if_active(coupon_id, vendor.id, now)
            .await?
            .ok_or(ApiError::AlreadyRedeemedOrExpired)?;

        let record = Redemption::for_coupon(&redeemed, ip.to_string());
        if let Err(e) = self.storage.redemptions.record(&record).await {
            tracing::warn!(coupon_id = %redeemed.id, error = %e, "redemption record write failed");
        }
        record_audit(
            &self.storage,
            Some(redeemed.user_id),
            AuditAction::CouponRedeemed,
            ip,
            Some(json!({ "coupon_id": redeemed.id, "vendor_id": vendor.id })),
        )
        .await;

        tracing::info!(coupon_id = %redeemed.id, vendor_id = %vendor.id, "coupon redeemed");
        Ok(redeemed)
    }

    /// The caller's coupons, newest first, after a user-scoped sweep so
    /// stale ACTIVE entries read as EXPIRED.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    pub async fn coupons_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<CouponWithOffer>, ApiError> {
        let swept = self
            .storage
            .coupons
            .expire_stale_for_user(user_id, Utc::now())
            .await?;
        if swept > 0 {
            tracing::debug!(swept, user_id = %user_id, "expired stale coupons before listing");
        }
        self.storage.coupons.for_user(user_id).await
    }
}
