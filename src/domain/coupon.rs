//! Issued coupons and their status state machine.
//!
//! A coupon moves through a monotone machine:
//!
//! ```text
//! ACTIVE ──redeem──▶ REDEEMED   (terminal)
//!    │
//!    └──expire──▶ EXPIRED       (terminal)
//! ```
//!
//! Both transitions happen through conditional storage updates so a
//! coupon can never be redeemed twice, nor redeemed after expiry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{CouponId, Offer, OfferId, UserId};

/// Coupon lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponStatus {
    /// Issued and usable until `expires_at`.
    Active,
    /// Consumed by a vendor confirmation. Terminal.
    Redeemed,
    /// Passed `expires_at` without being redeemed. Terminal.
    Expired,
}

impl CouponStatus {
    /// Uppercase wire label (`ACTIVE`, `REDEEMED`, `EXPIRED`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Redeemed => "REDEEMED",
            Self::Expired => "EXPIRED",
        }
    }

    /// Parses a persisted status label. Returns `None` for unknown labels.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "ACTIVE" => Some(Self::Active),
            "REDEEMED" => Some(Self::Redeemed),
            "EXPIRED" => Some(Self::Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for CouponStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issued coupon aggregate.
///
/// `vendor_id` is denormalized from the offer at issuance so redemption
/// scoping never needs a join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    /// Unique coupon identifier, doubles as the presented code.
    pub id: CouponId,

    /// Offer this coupon was issued against.
    pub offer_id: OfferId,

    /// Holder of the coupon.
    pub user_id: UserId,

    /// Vendor owning the offer; only this vendor may confirm redemption.
    pub vendor_id: UserId,

    /// Current lifecycle status.
    pub status: CouponStatus,

    /// Issuance timestamp.
    pub issued_at: DateTime<Utc>,

    /// Instant after which the coupon can no longer be redeemed.
    pub expires_at: DateTime<Utc>,

    /// Set exactly once, by the successful redemption transition.
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl Coupon {
    /// Issues a fresh ACTIVE coupon for `user_id` against `offer`.
    #[must_use]
    pub fn issue(offer: &Offer, user_id: UserId, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            id: CouponId::new(),
            offer_id: offer.id,
            user_id,
            vendor_id: offer.vendor_id,
            status: CouponStatus::Active,
            issued_at: now,
            expires_at: now + ttl,
            redeemed_at: None,
        }
    }

    /// Whether the coupon's expiry instant has passed at `now`.
    ///
    /// This is the time condition only; the status may still read ACTIVE
    /// until a sweep or redemption attempt observes the expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the redemption transition may fire at `now`:
    /// status ACTIVE and not past expiry.
    #[must_use]
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.status == CouponStatus::Active && !self.is_expired(now)
    }
}
