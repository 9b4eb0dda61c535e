//! Coupon DTOs: issuance requests, held-coupon views and redemption confirmations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Coupon, CouponId, CouponStatus, OfferId};
use crate::storage::CouponWithOffer;

/// Request body for claiming a free coupon against an offer.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RedeemRequest {
    /// Offer to issue a coupon for.
    pub offer_id: OfferId,
}

/// Freshly issued coupon, including the QR payload the holder presents.
#[derive(Debug, Serialize, ToSchema)]
pub struct IssuedCoupon {
    /// Coupon identifier, doubles as the presented code.
    pub coupon_id: CouponId,
    /// Offer the coupon was issued against.
    pub offer_id: OfferId,
    /// Lifecycle status, `ACTIVE` at issuance.
    pub status: CouponStatus,
    /// Instant after which the coupon can no longer be redeemed.
    pub expires_at: DateTime<Utc>,
    /// QR code as a `data:image/svg+xml;base64,...` URL.
    pub qr_code: String,
}

/// Response wrapper for a newly issued coupon.
#[derive(Debug, Serialize, ToSchema)]
pub struct IssuedCouponResponse {
    /// The issued coupon.
    pub coupon: IssuedCoupon,
}

impl IssuedCouponResponse {
    /// Builds the response from the issued coupon and its rendered QR code.
    #[must_use]
    pub fn new(coupon: &Coupon, qr_code: String) -> Self {
        Self {
            coupon: IssuedCoupon {
                coupon_id: coupon.id,
                offer_id: coupon.offer_id,
                status: coupon.status,
                expires_at: coupon.expires_at,
                qr_code,
            },
        }
    }
}

/// Coupon held by a user, joined with the offer it was issued against.
#[derive(Debug, Serialize, ToSchema)]
pub struct HeldCouponView {
    /// Coupon identifier.
    pub coupon_id: CouponId,
    /// Offer the coupon was issued against.
    pub offer_id: OfferId,
    /// Offer headline at listing time.
    pub offer_title: Option<String>,
    /// Offer category at listing time.
    pub offer_category: Option<String>,
    /// Lifecycle status after the lazy expiry sweep.
    pub status: CouponStatus,
    /// Issuance timestamp.
    pub issued_at: DateTime<Utc>,
    /// Redemption deadline.
    pub expires_at: DateTime<Utc>,
    /// Set once the coupon has been redeemed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl From<CouponWithOffer> for HeldCouponView {
    fn from(joined: CouponWithOffer) -> Self {
        Self {
            coupon_id: joined.coupon.id,
            offer_id: joined.coupon.offer_id,
            offer_title: joined.offer_title,
            offer_category: joined.offer_category,
            status: joined.coupon.status,
            issued_at: joined.coupon.issued_at,
            expires_at: joined.coupon.expires_at,
            redeemed_at: joined.coupon.redeemed_at,
        }
    }
}

/// Response wrapper for a user's coupon wallet.
#[derive(Debug, Serialize, ToSchema)]
pub struct CouponListResponse {
    /// Coupons, newest first.
    pub coupons: Vec<HeldCouponView>,
}

/// Request body for a vendor confirming a presented coupon.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmRequest {
    /// Coupon code scanned or typed by the vendor.
    pub coupon_id: CouponId,
}

/// Coupon state after a successful redemption.
#[derive(Debug, Serialize, ToSchema)]
pub struct RedeemedCouponView {
    /// Coupon identifier.
    pub coupon_id: CouponId,
    /// Offer the coupon was issued against.
    pub offer_id: OfferId,
    /// Lifecycle status, `REDEEMED` after confirmation.
    pub status: CouponStatus,
    /// Redemption timestamp.
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl From<Coupon> for RedeemedCouponView {
    fn from(coupon: Coupon) -> Self {
        Self {
            coupon_id: coupon.id,
            offer_id: coupon.offer_id,
            status: coupon.status,
            redeemed_at: coupon.redeemed_at,
        }
    }
}

/// Response wrapper for a confirmed redemption.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConfirmResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// The redeemed coupon.
    pub coupon: RedeemedCouponView,
}
