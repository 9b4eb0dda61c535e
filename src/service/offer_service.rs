//! Offer publication and listing.

use serde_json::json;

use crate::domain::{AuditAction, Offer, OfferDraft, OfferId, User};
use crate::error::ApiError;
use crate::storage::{OfferWithVendor, Storage};

use super::record_audit;

/// Vendor-facing offer operations and the public catalogue.
#[derive(Debug, Clone)]
pub struct OfferService {
    storage: Storage,
}

impl OfferService {
    /// Creates the service.
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Publishes a new offer owned by `vendor`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::VendorNotApproved`] unless the caller is an
    /// approved vendor, or a storage error.
    pub async fn create(
        &self,
        vendor: &User,
        draft: OfferDraft,
        ip: &str,
    ) -> Result<Offer, ApiError> {
        if !vendor.role.can_publish_offers() {
            return Err(ApiError::VendorNotApproved);
        }

        let offer = Offer::new(vendor.id, draft);
        self.storage.offers.insert(&offer).await?;
        record_audit(
            &self.storage,
            Some(vendor.id),
            AuditAction::OfferCreated,
            ip,
            Some(json!({ "offer_id": offer.id })),
        )
        .await;

        tracing::info!(offer_id = %offer.id, vendor_id = %vendor.id, "offer created");
        Ok(offer)
    }

    /// Replaces the draft fields of an offer owned by `vendor`.
    ///
    /// The whole draft is swapped in; identity, ownership and the active
    /// flag survive the update.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::OfferNotFound`] when the offer does not exist
    /// or belongs to another vendor.
    pub async fn update(
        &self,
        vendor: &User,
        offer_id: OfferId,
        draft: OfferDraft,
        ip: &str,
    ) -> Result<Offer, ApiError> {
        let mut offer = self
            .storage
            .offers
            .by_id(offer_id)
            .await?
            .filter(|offer| offer.vendor_id == vendor.id)
            .ok_or(ApiError::OfferNotFound)?;

        offer.apply_draft(draft);
        self.storage.offers.update(&offer).await?;
        record_audit(
            &self.storage,
            Some(vendor.id),
            AuditAction::OfferUpdated,
            ip,
            Some(json!({ "offer_id": offer.id })),
        )
        .await;

        Ok(offer)
    }

    /// All offers owned by `vendor`, newest first, regardless of state.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    pub async fn vendor_offers(&self, vendor: &User) -> Result<Vec<Offer>, ApiError> {
        self.storage.offers.by_vendor(vendor.id).await
    }

    /// The public catalogue: active, unexpired offers with vendor
    /// details, optionally filtered by exact category.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    pub async fn published(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<OfferWithVendor>, ApiError> {
        self.storage
            .offers
            .list_published(chrono::Utc::now(), category)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use chrono::{Duration, Utc};

    fn make_vendor(approved: bool) -> User {
        User::new(
            "Vendor".to_string(),
            "vendor@example.com".to_string(),
            "+15550000001".to_string(),
            "hash".to_string(),
            Role::Vendor { approved },
        )
    }

    fn make_draft(title: &str) -> OfferDraft {
        OfferDraft {
            title: title.to_string(),
            description: "Ten tacos for the price of eight".to_string(),
            image_url: None,
            actual_price: 20.0,
            discounted_price: 16.0,
            coupon_price: 1.0,
            expiry_date: Utc::now() + Duration::days(30),
            max_redemptions: 100,
            category: "food".to_string(),
        }
    }

    async fn seeded_service(vendor: &User) -> OfferService {
        let storage = Storage::in_memory();
        let Ok(()) = storage.users.insert(vendor).await else {
            panic!("vendor insert failed");
        };
        OfferService::new(storage)
    }

    #[tokio::test]
    async fn unapproved_vendor_cannot_publish() {
        let vendor = make_vendor(false);
        let service = seeded_service(&vendor).await;
        let result = service.create(&vendor, make_draft("Taco deal"), "ip").await;
        assert!(matches!(result, Err(ApiError::VendorNotApproved)));
    }

    #[tokio::test]
    async fn admin_cannot_publish_either() {
        let mut admin = make_vendor(true);
        admin.role = Role::Admin;
        let service = seeded_service(&admin).await;
        let result = service.create(&admin, make_draft("Admin deal"), "ip").await;
        assert!(matches!(result, Err(ApiError::VendorNotApproved)));
    }

    #[tokio::test]
    async fn create_then_update_replaces_draft() {
        let vendor = make_vendor(true);
        let service = seeded_service(&vendor).await;
        let Ok(offer) = service.create(&vendor, make_draft("Taco deal"), "ip").await else {
            panic!("create failed");
        };

        let mut replacement = make_draft("Bigger taco deal");
        replacement.coupon_price = 2.5;
        let Ok(updated) = service.update(&vendor, offer.id, replacement, "ip").await else {
            panic!("update failed");
        };

        assert_eq!(updated.id, offer.id);
        assert_eq!(updated.title, "Bigger taco deal");
        assert!((updated.coupon_price - 2.5).abs() < f64::EPSILON);
        assert_eq!(updated.created_at, offer.created_at);
    }

    #[tokio::test]
    async fn update_is_scoped_to_the_owner() {
        let vendor = make_vendor(true);
        let service = seeded_service(&vendor).await;
        let Ok(offer) = service.create(&vendor, make_draft("Taco deal"), "ip").await else {
            panic!("create failed");
        };

        let mut other = make_vendor(true);
        other.email = "other@example.com".to_string();
        other.phone = "+15550000002".to_string();
        let result = service
            .update(&other, offer.id, make_draft("Hijacked"), "ip")
            .await;
        assert!(matches!(result, Err(ApiError::OfferNotFound)));
    }

    #[tokio::test]
    async fn published_listing_carries_vendor_details() {
        let vendor = make_vendor(true);
        let service = seeded_service(&vendor).await;
        let Ok(_) = service.create(&vendor, make_draft("Taco deal"), "ip").await else {
            panic!("create failed");
        };

        let Ok(listed) = service.published(None).await else {
            panic!("listing failed");
        };
        assert_eq!(listed.len(), 1);
        assert_eq!(listed.first().map(|o| o.vendor_name.as_str()), Some("Vendor"));

        let Ok(filtered) = service.published(Some("travel")).await else {
            panic!("listing failed");
        };
        assert!(filtered.is_empty());
    }
}
