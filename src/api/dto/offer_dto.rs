//! Offer DTOs: publication payloads and listing views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::{Offer, OfferDraft, OfferId, UserId};
use crate::storage::OfferWithVendor;

/// Request body for creating or fully replacing an offer.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OfferPayload {
    /// Offer headline.
    #[validate(length(min = 3, max = 120))]
    pub title: String,
    /// Full description shown to users.
    #[validate(length(min = 10, max = 1000))]
    pub description: String,
    /// Optional image URL.
    #[validate(url)]
    pub image_url: Option<String>,
    /// Price before discount.
    #[validate(range(min = 0.0))]
    pub actual_price: f64,
    /// Price after discount.
    #[validate(range(min = 0.0))]
    pub discounted_price: f64,
    /// Price charged for the coupon itself.
    #[validate(range(min = 0.0))]
    pub coupon_price: f64,
    /// Instant after which the offer stops issuing coupons.
    pub expiry_date: DateTime<Utc>,
    /// Redemption cap.
    #[validate(range(min = 1, max = 100_000))]
    pub max_redemptions: u32,
    /// Free-form category label.
    #[validate(length(min = 2, max = 80))]
    pub category: String,
}

impl OfferPayload {
    /// Converts the validated payload into a domain draft.
    #[must_use]
    pub fn into_draft(self) -> OfferDraft {
        OfferDraft {
            title: self.title,
            description: self.description,
            image_url: self.image_url,
            actual_price: self.actual_price,
            discounted_price: self.discounted_price,
            coupon_price: self.coupon_price,
            expiry_date: self.expiry_date,
            max_redemptions: self.max_redemptions,
            category: self.category,
        }
    }
}

/// Query parameters for the published-offer listing.
#[derive(Debug, Deserialize, Validate, IntoParams)]
pub struct CategoryQuery {
    /// Exact category to filter by.
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
}

/// Full offer view.
#[derive(Debug, Serialize, ToSchema)]
pub struct OfferView {
    /// Offer identifier.
    pub id: OfferId,
    /// Owning vendor.
    pub vendor_id: UserId,
    /// Offer headline.
    pub title: String,
    /// Full description.
    pub description: String,
    /// Optional image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Price before discount.
    pub actual_price: f64,
    /// Price after discount.
    pub discounted_price: f64,
    /// Price charged for the coupon.
    pub coupon_price: f64,
    /// Issuance cutoff.
    pub expiry_date: DateTime<Utc>,
    /// Redemption cap.
    pub max_redemptions: u32,
    /// Category label.
    pub category: String,
    /// Whether the offer is visible to users.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Offer> for OfferView {
    fn from(offer: Offer) -> Self {
        Self {
            id: offer.id,
            vendor_id: offer.vendor_id,
            title: offer.title,
            description: offer.description,
            image_url: offer.image_url,
            actual_price: offer.actual_price,
            discounted_price: offer.discounted_price,
            coupon_price: offer.coupon_price,
            expiry_date: offer.expiry_date,
            max_redemptions: offer.max_redemptions,
            category: offer.category,
            is_active: offer.is_active,
            created_at: offer.created_at,
            updated_at: offer.updated_at,
        }
    }
}

/// Offer view joined with the vendor's public details.
#[derive(Debug, Serialize, ToSchema)]
pub struct OfferWithVendorView {
    /// The offer itself.
    #[serde(flatten)]
    pub offer: OfferView,
    /// Vendor display name.
    pub vendor_name: String,
    /// Vendor email.
    pub vendor_email: String,
}

impl From<OfferWithVendor> for OfferWithVendorView {
    fn from(joined: OfferWithVendor) -> Self {
        Self {
            offer: joined.offer.into(),
            vendor_name: joined.vendor_name,
            vendor_email: joined.vendor_email,
        }
    }
}

/// Response wrapper for a single offer.
#[derive(Debug, Serialize, ToSchema)]
pub struct OfferResponse {
    /// The offer.
    pub offer: OfferView,
}

/// Response wrapper for a vendor's own offers.
#[derive(Debug, Serialize, ToSchema)]
pub struct OfferListResponse {
    /// Offers, newest first.
    pub offers: Vec<OfferView>,
}

/// Response wrapper for listings that include vendor details.
#[derive(Debug, Serialize, ToSchema)]
pub struct OfferCatalogResponse {
    /// Offers with vendor details, newest first.
    pub offers: Vec<OfferWithVendorView>,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use validator::Validate;

    fn payload() -> OfferPayload {
        OfferPayload {
            title: "Half-price espresso".to_string(),
            description: "Any espresso drink at half price.".to_string(),
            image_url: None,
            actual_price: 6.0,
            discounted_price: 3.0,
            coupon_price: 0.5,
            expiry_date: Utc::now() + chrono::Duration::days(7),
            max_redemptions: 100,
            category: "coffee".to_string(),
        }
    }

    #[test]
    fn valid_payload_passes() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn bounds_are_enforced() {
        let mut short_title = payload();
        short_title.title = "ab".to_string();
        assert!(short_title.validate().is_err());

        let mut negative_price = payload();
        negative_price.coupon_price = -0.5;
        assert!(negative_price.validate().is_err());

        let mut zero_cap = payload();
        zero_cap.max_redemptions = 0;
        assert!(zero_cap.validate().is_err());

        let mut oversized_cap = payload();
        oversized_cap.max_redemptions = 100_001;
        assert!(oversized_cap.validate().is_err());

        let mut bad_url = payload();
        bad_url.image_url = Some("not a url".to_string());
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn draft_preserves_all_fields() {
        let draft = payload().into_draft();
        assert_eq!(draft.title, "Half-price espresso");
        assert_eq!(draft.max_redemptions, 100);
        assert!((draft.coupon_price - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn vendor_view_flattens_offer_fields() {
        let offer = Offer::new(UserId::new(), payload().into_draft());
        let joined = OfferWithVendor {
            offer,
            vendor_name: "Shop".to_string(),
            vendor_email: "shop@example.com".to_string(),
        };
        let view = OfferWithVendorView::from(joined);
        let json = serde_json::to_value(&view).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        assert_eq!(json.get("title").and_then(|v| v.as_str()), Some("Half-price espresso"));
        assert_eq!(json.get("vendor_name").and_then(|v| v.as_str()), Some("Shop"));
    }
}
