//! In-memory storage backend.
//!
//! All collections live behind one `tokio::sync::RwLock`, so every trait
//! method executes atomically with respect to every other. That makes
//! the cap check in `issue_if_capacity` and the conditional transition in
//! `redeem_if_active` exact, which the concurrency tests rely on.
//!
//! Used for tests and for running the gateway without a database
//! (`DATABASE_URL` unset).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::{
    AuditEntry, Coupon, CouponId, CouponStatus, Offer, OfferId, Redemption, User, UserId,
};
use crate::error::ApiError;

use super::{
    AuditStore, CouponStore, CouponWithOffer, IssueOutcome, OfferStore, OfferWithVendor,
    RedemptionDetail, RedemptionStore, UserStore,
};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    offers: HashMap<OfferId, Offer>,
    coupons: HashMap<CouponId, Coupon>,
    redemptions: Vec<Redemption>,
    audit: Vec<AuditEntry>,
}

/// In-memory backend implementing all five store seams.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: RwLock<MemoryState>,
}

impl MemoryStorage {
    /// Creates an empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T, F>(items: &mut [T], created_at: F)
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

#[async_trait]
impl UserStore for MemoryStorage {
    async fn insert(&self, user: &User) -> Result<(), ApiError> {
        let mut state = self.state.write().await;
        let taken = state
            .users
            .values()
            .any(|u| u.email == user.email || u.phone == user.phone);
        if taken {
            return Err(ApiError::EmailOrPhoneTaken);
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), ApiError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user.id) {
            return Err(ApiError::UserNotFound);
        }
        let taken = state
            .users
            .values()
            .any(|u| u.id != user.id && (u.email == user.email || u.phone == user.phone));
        if taken {
            return Err(ApiError::EmailOrPhoneTaken);
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete(&self, id: UserId) -> Result<(), ApiError> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Err(ApiError::UserNotFound);
        }
        // Mirror the relational cascade: the account's offers go, and
        // coupons follow their holder or their offer.
        let removed_offers: Vec<OfferId> = state
            .offers
            .values()
            .filter(|o| o.vendor_id == id)
            .map(|o| o.id)
            .collect();
        for offer_id in &removed_offers {
            state.offers.remove(offer_id);
        }
        state
            .coupons
            .retain(|_, c| c.user_id != id && !removed_offers.contains(&c.offer_id));
        Ok(())
    }

    async fn by_id(&self, id: UserId) -> Result<Option<User>, ApiError> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).cloned())
    }

    async fn by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn by_identifier(&self, identifier: &str) -> Result<Option<User>, ApiError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email == identifier || u.name == identifier)
            .cloned())
    }

    async fn count(&self) -> Result<u64, ApiError> {
        let state = self.state.read().await;
        Ok(state.users.len() as u64)
    }

    async fn list(&self) -> Result<Vec<User>, ApiError> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        newest_first(&mut users, |u| u.created_at);
        Ok(users)
    }

    async fn list_vendors(&self) -> Result<Vec<User>, ApiError> {
        let state = self.state.read().await;
        let mut vendors: Vec<User> = state
            .users
            .values()
            .filter(|u| u.role.is_vendor())
            .cloned()
            .collect();
        newest_first(&mut vendors, |u| u.created_at);
        Ok(vendors)
    }
}

#[async_trait]
impl OfferStore for MemoryStorage {
    async fn insert(&self, offer: &Offer) -> Result<(), ApiError> {
        let mut state = self.state.write().await;
        state.offers.insert(offer.id, offer.clone());
        Ok(())
    }

    async fn update(&self, offer: &Offer) -> Result<(), ApiError> {
        let mut state = self.state.write().await;
        if !state.offers.contains_key(&offer.id) {
            return Err(ApiError::OfferNotFound);
        }
        state.offers.insert(offer.id, offer.clone());
        Ok(())
    }

    async fn by_id(&self, id: OfferId) -> Result<Option<Offer>, ApiError> {
        let state = self.state.read().await;
        Ok(state.offers.get(&id).cloned())
    }

    async fn by_vendor(&self, vendor_id: UserId) -> Result<Vec<Offer>, ApiError> {
        let state = self.state.read().await;
        let mut offers: Vec<Offer> = state
            .offers
            .values()
            .filter(|o| o.vendor_id == vendor_id)
            .cloned()
            .collect();
        newest_first(&mut offers, |o| o.created_at);
        Ok(offers)
    }

    async fn list_published(
        &self,
        now: DateTime<Utc>,
        category: Option<&str>,
    ) -> Result<Vec<OfferWithVendor>, ApiError> {
        let state = self.state.read().await;
        let mut rows: Vec<OfferWithVendor> = state
            .offers
            .values()
            .filter(|o| o.is_available(now))
            .filter(|o| category.is_none_or(|c| o.category == c))
            .filter_map(|o| {
                state.users.get(&o.vendor_id).map(|v| OfferWithVendor {
                    offer: o.clone(),
                    vendor_name: v.name.clone(),
                    vendor_email: v.email.clone(),
                })
            })
            .collect();
        newest_first(&mut rows, |r| r.offer.created_at);
        Ok(rows)
    }

    async fn list_all(&self) -> Result<Vec<OfferWithVendor>, ApiError> {
        let state = self.state.read().await;
        let mut rows: Vec<OfferWithVendor> = state
            .offers
            .values()
            .filter_map(|o| {
                state.users.get(&o.vendor_id).map(|v| OfferWithVendor {
                    offer: o.clone(),
                    vendor_name: v.name.clone(),
                    vendor_email: v.email.clone(),
                })
            })
            .collect();
        newest_first(&mut rows, |r| r.offer.created_at);
        Ok(rows)
    }
}

#[async_trait]
impl CouponStore for MemoryStorage {
    async fn issue_if_capacity(
        &self,
        coupon: &Coupon,
        max_redemptions: u32,
    ) -> Result<IssueOutcome, ApiError> {
        let mut state = self.state.write().await;
        let redeemed = state
            .coupons
            .values()
            .filter(|c| c.offer_id == coupon.offer_id && c.status == CouponStatus::Redeemed)
            .count() as u64;
        if redeemed >= u64::from(max_redemptions) {
            return Ok(IssueOutcome::CapReached);
        }
        if state.coupons.contains_key(&coupon.id) {
            return Err(ApiError::Storage(format!(
                "coupon id collision: {}",
                coupon.id
            )));
        }
        state.coupons.insert(coupon.id, coupon.clone());
        Ok(IssueOutcome::Issued)
    }

    async fn by_id(&self, id: CouponId) -> Result<Option<Coupon>, ApiError> {
        let state = self.state.read().await;
        Ok(state.coupons.get(&id).cloned())
    }

    async fn for_user(&self, user_id: UserId) -> Result<Vec<CouponWithOffer>, ApiError> {
        let state = self.state.read().await;
        let mut rows: Vec<CouponWithOffer> = state
            .coupons
            .values()
            .filter(|c| c.user_id == user_id)
            .map(|c| {
                let offer = state.offers.get(&c.offer_id);
                CouponWithOffer {
                    coupon: c.clone(),
                    offer_title: offer.map(|o| o.title.clone()),
                    offer_category: offer.map(|o| o.category.clone()),
                }
            })
            .collect();
        newest_first(&mut rows, |r| r.coupon.issued_at);
        Ok(rows)
    }

    async fn count_redeemed(&self, offer_id: OfferId) -> Result<u64, ApiError> {
        let state = self.state.read().await;
        Ok(state
            .coupons
            .values()
            .filter(|c| c.offer_id == offer_id && c.status == CouponStatus::Redeemed)
            .count() as u64)
    }

    async fn expire_stale(&self, now: DateTime<Utc>) -> Result<u64, ApiError> {
        let mut state = self.state.write().await;
        let mut reconciled = 0u64;
        for coupon in state.coupons.values_mut() {
            if coupon.status == CouponStatus::Active && coupon.expires_at <= now {
                coupon.status = CouponStatus::Expired;
                reconciled += 1;
            }
        }
        Ok(reconciled)
    }

    async fn expire_stale_for_user(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<u64, ApiError> {
        let mut state = self.state.write().await;
        let mut reconciled = 0u64;
        for coupon in state.coupons.values_mut() {
            if coupon.user_id == user_id
                && coupon.status == CouponStatus::Active
                && coupon.expires_at <= now
            {
                coupon.status = CouponStatus::Expired;
                reconciled += 1;
            }
        }
        Ok(reconciled)
    }

    async fn redeem_if_active(
        &self,
        id: CouponId,
        vendor_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Coupon>, ApiError> {
        let mut state = self.state.write().await;
        let Some(coupon) = state.coupons.get_mut(&id) else {
            return Ok(None);
        };
        if coupon.vendor_id != vendor_id
            || coupon.status != CouponStatus::Active
            || coupon.expires_at <= now
        {
            return Ok(None);
        }
        coupon.status = CouponStatus::Redeemed;
        coupon.redeemed_at = Some(now);
        Ok(Some(coupon.clone()))
    }

    async fn redeemed_counts(&self) -> Result<Vec<(OfferId, u64)>, ApiError> {
        let state = self.state.read().await;
        let mut counts: HashMap<OfferId, u64> = HashMap::new();
        for coupon in state.coupons.values() {
            if coupon.status == CouponStatus::Redeemed {
                *counts.entry(coupon.offer_id).or_insert(0) += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }
}

#[async_trait]
impl RedemptionStore for MemoryStorage {
    async fn record(&self, redemption: &Redemption) -> Result<(), ApiError> {
        let mut state = self.state.write().await;
        state.redemptions.push(redemption.clone());
        Ok(())
    }

    async fn list_detailed(&self) -> Result<Vec<RedemptionDetail>, ApiError> {
        let state = self.state.read().await;
        let mut rows: Vec<RedemptionDetail> = state
            .redemptions
            .iter()
            .map(|r| {
                let user = state.users.get(&r.user_id);
                let vendor = state.users.get(&r.vendor_id);
                let offer = state.offers.get(&r.offer_id);
                RedemptionDetail {
                    redemption: r.clone(),
                    user_name: user.map(|u| u.name.clone()),
                    user_email: user.map(|u| u.email.clone()),
                    vendor_name: vendor.map(|v| v.name.clone()),
                    vendor_email: vendor.map(|v| v.email.clone()),
                    offer_title: offer.map(|o| o.title.clone()),
                    offer_category: offer.map(|o| o.category.clone()),
                }
            })
            .collect();
        rows.sort_by(|a, b| b.redemption.redeemed_at.cmp(&a.redemption.redeemed_at));
        Ok(rows)
    }
}

#[async_trait]
impl AuditStore for MemoryStorage {
    async fn append(&self, entry: &AuditEntry) -> Result<(), ApiError> {
        let mut state = self.state.write().await;
        state.audit.push(entry.clone());
        Ok(())
    }

    async fn for_user(&self, user_id: UserId, limit: u32) -> Result<Vec<AuditEntry>, ApiError> {
        let state = self.state.read().await;
        let mut entries: Vec<AuditEntry> = state
            .audit
            .iter()
            .filter(|e| e.user_id == Some(user_id))
            .cloned()
            .collect();
        newest_first(&mut entries, |e| e.created_at);
        entries.truncate(limit as usize);
        Ok(entries)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<AuditEntry>, ApiError> {
        let state = self.state.read().await;
        let mut entries: Vec<AuditEntry> = state.audit.to_vec();
        newest_first(&mut entries, |e| e.created_at);
        entries.truncate(limit as usize);
        Ok(entries)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::domain::{OfferDraft, Role};
    use crate::storage::Storage;

    fn make_user(name: &str, role: Role) -> User {
        User::new(
            name.to_string(),
            format!("{name}@example.com"),
            format!("+1555-{name}"),
            "hash".to_string(),
            role,
        )
    }

    fn make_offer(vendor_id: UserId, cap: u32) -> Offer {
        Offer::new(
            vendor_id,
            OfferDraft {
                title: "Breakfast bundle".to_string(),
                description: "Coffee and a bagel for less.".to_string(),
                image_url: None,
                actual_price: 9.0,
                discounted_price: 5.0,
                coupon_price: 1.0,
                expiry_date: Utc::now() + Duration::days(1),
                max_redemptions: cap,
                category: "food".to_string(),
            },
        )
    }

    async fn seed(storage: &MemoryStorage, cap: u32) -> (User, User, Offer) {
        let vendor = make_user("vendor-a", Role::Vendor { approved: true });
        let holder = make_user("holder", Role::User);
        let offer = make_offer(vendor.id, cap);
        let Ok(()) = UserStore::insert(storage, &vendor).await else {
            panic!("vendor insert failed");
        };
        let Ok(()) = UserStore::insert(storage, &holder).await else {
            panic!("holder insert failed");
        };
        let Ok(()) = OfferStore::insert(storage, &offer).await else {
            panic!("offer insert failed");
        };
        (vendor, holder, offer)
    }

    #[tokio::test]
    async fn duplicate_email_or_phone_is_rejected() {
        let storage = MemoryStorage::new();
        let user = make_user("alice", Role::User);
        let Ok(()) = UserStore::insert(&storage, &user).await else {
            panic!("insert failed");
        };

        let mut same_email = make_user("alice2", Role::User);
        same_email.email = user.email.clone();
        let result = UserStore::insert(&storage, &same_email).await;
        assert!(matches!(result, Err(ApiError::EmailOrPhoneTaken)));

        let mut same_phone = make_user("alice3", Role::User);
        same_phone.phone = user.phone.clone();
        let result = UserStore::insert(&storage, &same_phone).await;
        assert!(matches!(result, Err(ApiError::EmailOrPhoneTaken)));
    }

    #[tokio::test]
    async fn identifier_lookup_matches_email_or_name() {
        let storage = MemoryStorage::new();
        let user = make_user("carol", Role::User);
        let Ok(()) = UserStore::insert(&storage, &user).await else {
            panic!("insert failed");
        };

        let by_name = storage.by_identifier("carol").await;
        assert!(matches!(by_name, Ok(Some(ref u)) if u.id == user.id));
        let by_email = storage.by_identifier("carol@example.com").await;
        assert!(matches!(by_email, Ok(Some(ref u)) if u.id == user.id));
        let missing = storage.by_identifier("nobody").await;
        assert!(matches!(missing, Ok(None)));
    }

    #[tokio::test]
    async fn deleting_a_vendor_cascades_to_offers_and_coupons() {
        let storage = MemoryStorage::new();
        let (vendor, holder, offer) = seed(&storage, 10).await;

        let coupon = Coupon::issue(&offer, holder.id, Duration::minutes(5), Utc::now());
        let Ok(IssueOutcome::Issued) = storage.issue_if_capacity(&coupon, 10).await else {
            panic!("issue failed");
        };

        let Ok(()) = UserStore::delete(&storage, vendor.id).await else {
            panic!("delete failed");
        };
        let gone_offer = OfferStore::by_id(&storage, offer.id).await;
        assert!(matches!(gone_offer, Ok(None)));
        let gone_coupon = CouponStore::by_id(&storage, coupon.id).await;
        assert!(matches!(gone_coupon, Ok(None)));
    }

    #[tokio::test]
    async fn cap_counts_redeemed_coupons_only() {
        let storage = MemoryStorage::new();
        let (vendor, holder, offer) = seed(&storage, 1).await;
        let now = Utc::now();

        // An ACTIVE coupon does not consume the cap.
        let first = Coupon::issue(&offer, holder.id, Duration::minutes(5), now);
        let Ok(IssueOutcome::Issued) = storage.issue_if_capacity(&first, 1).await else {
            panic!("first issue failed");
        };
        let second = Coupon::issue(&offer, holder.id, Duration::minutes(5), now);
        let Ok(IssueOutcome::Issued) = storage.issue_if_capacity(&second, 1).await else {
            panic!("second issue should pass while nothing is redeemed");
        };

        // One redemption fills the cap of 1.
        let redeemed = storage.redeem_if_active(first.id, vendor.id, now).await;
        assert!(matches!(redeemed, Ok(Some(_))));

        let third = Coupon::issue(&offer, holder.id, Duration::minutes(5), now);
        let outcome = storage.issue_if_capacity(&third, 1).await;
        assert!(matches!(outcome, Ok(IssueOutcome::CapReached)));
    }

    #[tokio::test]
    async fn concurrent_redemptions_succeed_exactly_once() {
        let storage = Arc::new(MemoryStorage::new());
        let (vendor, holder, offer) = seed(&storage, 10).await;
        let now = Utc::now();

        let coupon = Coupon::issue(&offer, holder.id, Duration::minutes(5), now);
        let Ok(IssueOutcome::Issued) = storage.issue_if_capacity(&coupon, 10).await else {
            panic!("issue failed");
        };

        let mut handles = Vec::with_capacity(50);
        for _ in 0..50 {
            let storage = Arc::clone(&storage);
            let coupon_id = coupon.id;
            let vendor_id = vendor.id;
            handles.push(tokio::spawn(async move {
                storage
                    .redeem_if_active(coupon_id, vendor_id, Utc::now())
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            let Ok(result) = handle.await else {
                panic!("task panicked");
            };
            if matches!(result, Ok(Some(_))) {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn redeem_checks_vendor_status_and_expiry() {
        let storage = MemoryStorage::new();
        let (vendor, holder, offer) = seed(&storage, 10).await;
        let now = Utc::now();

        let coupon = Coupon::issue(&offer, holder.id, Duration::minutes(5), now);
        let Ok(IssueOutcome::Issued) = storage.issue_if_capacity(&coupon, 10).await else {
            panic!("issue failed");
        };

        // Wrong vendor leaves the coupon untouched.
        let other_vendor = UserId::new();
        let wrong = storage.redeem_if_active(coupon.id, other_vendor, now).await;
        assert!(matches!(wrong, Ok(None)));
        let Ok(Some(still_active)) = CouponStore::by_id(&storage, coupon.id).await else {
            panic!("coupon disappeared");
        };
        assert_eq!(still_active.status, CouponStatus::Active);

        // Past expiry the condition fails even for the right vendor.
        let late = now + Duration::minutes(6);
        let expired = storage.redeem_if_active(coupon.id, vendor.id, late).await;
        assert!(matches!(expired, Ok(None)));

        // In time and with the right vendor it commits, exactly once.
        let ok = storage.redeem_if_active(coupon.id, vendor.id, now).await;
        assert!(matches!(ok, Ok(Some(_))));
        let again = storage.redeem_if_active(coupon.id, vendor.id, now).await;
        assert!(matches!(again, Ok(None)));
    }

    #[tokio::test]
    async fn sweep_expires_only_stale_active_coupons() {
        let storage = MemoryStorage::new();
        let (vendor, holder, offer) = seed(&storage, 10).await;
        let now = Utc::now();

        let stale = Coupon::issue(&offer, holder.id, Duration::minutes(5), now);
        let fresh = Coupon::issue(&offer, holder.id, Duration::minutes(30), now);
        let redeemed = Coupon::issue(&offer, holder.id, Duration::minutes(5), now);
        for c in [&stale, &fresh, &redeemed] {
            let Ok(IssueOutcome::Issued) = storage.issue_if_capacity(c, 10).await else {
                panic!("issue failed");
            };
        }
        let Ok(Some(_)) = storage.redeem_if_active(redeemed.id, vendor.id, now).await else {
            panic!("redeem failed");
        };

        let later = now + Duration::minutes(10);
        let Ok(reconciled) = storage.expire_stale(later).await else {
            panic!("sweep failed");
        };
        assert_eq!(reconciled, 1);

        let Ok(Some(c)) = CouponStore::by_id(&storage, stale.id).await else {
            panic!("coupon missing");
        };
        assert_eq!(c.status, CouponStatus::Expired);
        let Ok(Some(c)) = CouponStore::by_id(&storage, fresh.id).await else {
            panic!("coupon missing");
        };
        assert_eq!(c.status, CouponStatus::Active);
        let Ok(Some(c)) = CouponStore::by_id(&storage, redeemed.id).await else {
            panic!("coupon missing");
        };
        assert_eq!(c.status, CouponStatus::Redeemed);

        // Idempotent: a second sweep reconciles nothing.
        let Ok(reconciled_again) = storage.expire_stale(later).await else {
            panic!("sweep failed");
        };
        assert_eq!(reconciled_again, 0);
    }

    #[tokio::test]
    async fn user_scoped_sweep_ignores_other_holders() {
        let storage = MemoryStorage::new();
        let (_vendor, holder, offer) = seed(&storage, 10).await;
        let other = make_user("other-holder", Role::User);
        let Ok(()) = UserStore::insert(&storage, &other).await else {
            panic!("insert failed");
        };
        let now = Utc::now();

        let mine = Coupon::issue(&offer, holder.id, Duration::minutes(5), now);
        let theirs = Coupon::issue(&offer, other.id, Duration::minutes(5), now);
        for c in [&mine, &theirs] {
            let Ok(IssueOutcome::Issued) = storage.issue_if_capacity(c, 10).await else {
                panic!("issue failed");
            };
        }

        let later = now + Duration::minutes(10);
        let Ok(reconciled) = storage.expire_stale_for_user(holder.id, later).await else {
            panic!("sweep failed");
        };
        assert_eq!(reconciled, 1);

        let Ok(Some(c)) = CouponStore::by_id(&storage, theirs.id).await else {
            panic!("coupon missing");
        };
        assert_eq!(c.status, CouponStatus::Active);
    }

    #[tokio::test]
    async fn published_listing_filters_and_joins_vendor() {
        let storage = MemoryStorage::new();
        let (vendor, _holder, offer) = seed(&storage, 10).await;

        let mut expired = make_offer(vendor.id, 10);
        expired.expiry_date = Utc::now() - Duration::days(1);
        let mut inactive = make_offer(vendor.id, 10);
        inactive.is_active = false;
        let mut other_category = make_offer(vendor.id, 10);
        other_category.category = "fitness".to_string();
        for o in [&expired, &inactive, &other_category] {
            let Ok(()) = OfferStore::insert(&storage, o).await else {
                panic!("offer insert failed");
            };
        }

        let Ok(published) = storage.list_published(Utc::now(), None).await else {
            panic!("listing failed");
        };
        assert_eq!(published.len(), 2);
        assert!(published.iter().all(|r| r.vendor_email == vendor.email));

        let Ok(food_only) = storage.list_published(Utc::now(), Some("food")).await else {
            panic!("listing failed");
        };
        assert_eq!(food_only.len(), 1);
        assert_eq!(food_only.first().map(|r| r.offer.id), Some(offer.id));
    }

    #[tokio::test]
    async fn storage_bundle_shares_one_backend() {
        let storage = Storage::in_memory();
        let user = make_user("dave", Role::User);
        let Ok(()) = storage.users.insert(&user).await else {
            panic!("insert failed");
        };
        let Ok(count) = storage.users.count().await else {
            panic!("count failed");
        };
        assert_eq!(count, 1);
    }
}
