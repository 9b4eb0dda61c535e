//! Immutable redemption records.
//!
//! One row per successful ACTIVE→REDEEMED transition. Written after the
//! coupon update commits and never modified afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Coupon, CouponId, OfferId, UserId};

/// Snapshot taken at the moment a vendor confirms a redemption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redemption {
    /// Redeemed coupon.
    pub coupon_id: CouponId,

    /// Coupon holder.
    pub user_id: UserId,

    /// Confirming vendor.
    pub vendor_id: UserId,

    /// Offer the coupon was issued against.
    pub offer_id: OfferId,

    /// Instant the redemption transition committed.
    pub redeemed_at: DateTime<Utc>,

    /// Originating IP of the confirmation request.
    pub ip: String,

    /// Record creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Redemption {
    /// Builds the record for a coupon that just transitioned to REDEEMED.
    ///
    /// `redeemed_at` falls back to now for the degenerate case where the
    /// transition committed without stamping a timestamp.
    #[must_use]
    pub fn for_coupon(coupon: &Coupon, ip: String) -> Self {
        let now = Utc::now();
        Self {
            coupon_id: coupon.id,
            user_id: coupon.user_id,
            vendor_id: coupon.vendor_id,
            offer_id: coupon.offer_id,
            redeemed_at: coupon.redeemed_at.unwrap_or(now),
            ip,
            created_at: now,
        }
    }
}
