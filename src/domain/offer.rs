//! Vendor offers: the published deals coupons are issued against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OfferId, UserId};

/// Validated fields for creating or replacing an offer.
///
/// Range checks happen at the API boundary; by the time a draft reaches
/// the domain it is well-formed. Updates are full replacements of these
/// fields, so the same draft type serves both paths.
#[derive(Debug, Clone)]
pub struct OfferDraft {
    /// Offer headline.
    pub title: String,
    /// Full description shown to users.
    pub description: String,
    /// Optional image URL.
    pub image_url: Option<String>,
    /// Price before discount.
    pub actual_price: f64,
    /// Price after discount.
    pub discounted_price: f64,
    /// Price charged for the coupon itself.
    pub coupon_price: f64,
    /// Instant after which the offer stops issuing coupons.
    pub expiry_date: DateTime<Utc>,
    /// Redemption cap for this offer.
    pub max_redemptions: u32,
    /// Free-form category label used for filtering.
    pub category: String,
}

/// Offer aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    /// Unique offer identifier (immutable after creation).
    pub id: OfferId,

    /// Owning vendor (immutable after creation).
    pub vendor_id: UserId,

    /// Offer headline.
    pub title: String,

    /// Full description shown to users.
    pub description: String,

    /// Optional image URL.
    pub image_url: Option<String>,

    /// Price before discount.
    pub actual_price: f64,

    /// Price after discount.
    pub discounted_price: f64,

    /// Price charged for the coupon itself.
    pub coupon_price: f64,

    /// Instant after which the offer stops issuing coupons.
    pub expiry_date: DateTime<Utc>,

    /// Redemption cap for this offer.
    pub max_redemptions: u32,

    /// Free-form category label used for filtering.
    pub category: String,

    /// Inactive offers are hidden from users and issue no coupons.
    pub is_active: bool,

    /// Creation timestamp (immutable).
    pub created_at: DateTime<Utc>,

    /// Timestamp of last mutation.
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    /// Creates a new active offer owned by `vendor_id`.
    #[must_use]
    pub fn new(vendor_id: UserId, draft: OfferDraft) -> Self {
        let now = Utc::now();
        Self {
            id: OfferId::new(),
            vendor_id,
            title: draft.title,
            description: draft.description,
            image_url: draft.image_url,
            actual_price: draft.actual_price,
            discounted_price: draft.discounted_price,
            coupon_price: draft.coupon_price,
            expiry_date: draft.expiry_date,
            max_redemptions: draft.max_redemptions,
            category: draft.category,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether coupons may currently be issued against this offer.
    ///
    /// Requires the offer to be active and strictly before its expiry.
    #[must_use]
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expiry_date > now
    }

    /// Replaces all draft fields, keeping identity, active flag and
    /// creation time.
    pub fn apply_draft(&mut self, draft: OfferDraft) {
        self.title = draft.title;
        self.description = draft.description;
        self.image_url = draft.image_url;
        self.actual_price = draft.actual_price;
        self.discounted_price = draft.discounted_price;
        self.coupon_price = draft.coupon_price;
        self.expiry_date = draft.expiry_date;
        self.max_redemptions = draft.max_redemptions;
        self.category = draft.category;
        self.updated_at = Utc::now();
    }

    /// Revenue contribution of one redeemed coupon: the discounted price
    /// plus the coupon price.
    #[must_use]
    pub fn unit_revenue(&self) -> f64 {
        self.discounted_price + self.coupon_price
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn draft() -> OfferDraft {
        OfferDraft {
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
    fn new_offers_start_active() {
        let offer = Offer::new(UserId::new(), draft());
        assert!(offer.is_active);
        assert!(offer.is_available(Utc::now()));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let offer = Offer::new(UserId::new(), draft());
        assert!(!offer.is_available(offer.expiry_date));
        assert!(offer.is_available(offer.expiry_date - chrono::Duration::seconds(1)));
    }

    #[test]
    fn inactive_offers_are_unavailable() {
        let mut offer = Offer::new(UserId::new(), draft());
        offer.is_active = false;
        assert!(!offer.is_available(Utc::now()));
    }

    #[test]
    fn apply_draft_keeps_identity_and_creation_time() {
        let vendor = UserId::new();
        let mut offer = Offer::new(vendor, draft());
        let id = offer.id;
        let created_at = offer.created_at;

        let mut replacement = draft();
        replacement.title = "Free refill".to_string();
        replacement.coupon_price = 1.0;
        offer.apply_draft(replacement);

        assert_eq!(offer.id, id);
        assert_eq!(offer.vendor_id, vendor);
        assert_eq!(offer.created_at, created_at);
        assert_eq!(offer.title, "Free refill");
        assert!((offer.coupon_price - 1.0).abs() < f64::EPSILON);
        assert!(offer.is_active);
    }

    #[test]
    fn unit_revenue_is_discounted_plus_coupon_price() {
        let offer = Offer::new(UserId::new(), draft());
        assert!((offer.unit_revenue() - 3.5).abs() < f64::EPSILON);
    }
}
