//! Admin DTOs: account management requests, sales reporting and audit views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{AuditEntry, CouponId, OfferId, UserId};
use crate::service::{OfferSales, VendorSales};
use crate::storage::RedemptionDetail;

use super::auth_dto::UserSummary;

/// Request body for assigning a role to an account.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RoleRequest {
    /// Role label: `ADMIN`, `VENDOR` or `USER`.
    #[validate(length(min = 1, max = 20))]
    pub role: String,
}

/// Request body for blocking or unblocking an account.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BlockRequest {
    /// Desired blocked state.
    pub blocked: bool,
}

/// Response wrapper for the account listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    /// All accounts, newest first.
    pub users: Vec<UserSummary>,
}

/// Response wrapper for a single mutated account.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    /// The account after the mutation.
    pub user: UserSummary,
}

/// Per-offer slice of a vendor's sales report.
#[derive(Debug, Serialize, ToSchema)]
pub struct OfferSalesView {
    /// Offer identifier.
    pub offer_id: OfferId,
    /// Offer headline.
    pub title: String,
    /// Redeemed coupon count.
    pub sold: u64,
    /// Revenue attributed to this offer.
    pub revenue: f64,
}

impl From<OfferSales> for OfferSalesView {
    fn from(sales: OfferSales) -> Self {
        Self {
            offer_id: sales.offer_id,
            title: sales.title,
            sold: sales.sold,
            revenue: sales.revenue,
        }
    }
}

/// One vendor's slice of the platform sales report.
#[derive(Debug, Serialize, ToSchema)]
pub struct VendorSalesView {
    /// Vendor identifier.
    pub vendor_id: UserId,
    /// Vendor display name.
    pub vendor_name: String,
    /// Vendor email.
    pub vendor_email: String,
    /// Per-offer breakdown.
    pub offers: Vec<OfferSalesView>,
    /// Revenue across all of the vendor's offers.
    pub total_revenue: f64,
    /// Platform commission on the vendor total.
    pub commission: f64,
    /// Vendor profit after commission.
    pub profit: f64,
}

impl From<VendorSales> for VendorSalesView {
    fn from(sales: VendorSales) -> Self {
        Self {
            vendor_id: sales.vendor_id,
            vendor_name: sales.vendor_name,
            vendor_email: sales.vendor_email,
            offers: sales.offers.into_iter().map(OfferSalesView::from).collect(),
            total_revenue: sales.total_revenue,
            commission: sales.commission,
            profit: sales.profit,
        }
    }
}

/// Response wrapper for the platform sales report.
#[derive(Debug, Serialize, ToSchema)]
pub struct VendorSalesResponse {
    /// One entry per vendor.
    pub report: Vec<VendorSalesView>,
}

/// One redemption joined with the accounts and offer involved.
///
/// Join fields are `null` when the referenced account or offer has since
/// been deleted.
#[derive(Debug, Serialize, ToSchema)]
pub struct RedemptionView {
    /// Redeemed coupon.
    pub coupon_id: CouponId,
    /// Redeeming user's name.
    pub user_name: Option<String>,
    /// Redeeming user's email.
    pub user_email: Option<String>,
    /// Confirming vendor's name.
    pub vendor_name: Option<String>,
    /// Confirming vendor's email.
    pub vendor_email: Option<String>,
    /// Offer headline.
    pub offer_title: Option<String>,
    /// Offer category.
    pub offer_category: Option<String>,
    /// Confirmation timestamp.
    pub redeemed_at: DateTime<Utc>,
    /// Originating IP of the confirmation.
    pub ip: String,
}

impl From<RedemptionDetail> for RedemptionView {
    fn from(detail: RedemptionDetail) -> Self {
        Self {
            coupon_id: detail.redemption.coupon_id,
            user_name: detail.user_name,
            user_email: detail.user_email,
            vendor_name: detail.vendor_name,
            vendor_email: detail.vendor_email,
            offer_title: detail.offer_title,
            offer_category: detail.offer_category,
            redeemed_at: detail.redemption.redeemed_at,
            ip: detail.redemption.ip,
        }
    }
}

/// Response wrapper for the platform redemption ledger.
#[derive(Debug, Serialize, ToSchema)]
pub struct RedemptionListResponse {
    /// Redemptions, newest first.
    pub redemptions: Vec<RedemptionView>,
}

/// One audit log entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuditView {
    /// Entry identifier.
    pub id: Uuid,
    /// Acting (or affected) account, when known.
    pub user_id: Option<UserId>,
    /// Action label, e.g. `COUPON_REDEEMED`.
    pub action: String,
    /// Originating IP of the request.
    pub ip: String,
    /// Free-form JSON context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
    /// Append timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<AuditEntry> for AuditView {
    fn from(entry: AuditEntry) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            action: entry.action.as_str().to_string(),
            ip: entry.ip,
            meta: entry.meta,
            created_at: entry.created_at,
        }
    }
}

/// Response wrapper for audit log listings.
#[derive(Debug, Serialize, ToSchema)]
pub struct LogListResponse {
    /// Entries, newest first.
    pub logs: Vec<AuditView>,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{AuditAction, Coupon, Offer, OfferDraft, Redemption};
    use chrono::Duration;

    #[test]
    fn audit_view_uses_wire_action_labels() {
        let entry = AuditEntry::new(
            Some(UserId::new()),
            AuditAction::CouponRedeemed,
            "10.0.0.1".to_string(),
            None,
        );
        let view = AuditView::from(entry);
        assert_eq!(view.action, "COUPON_REDEEMED");
    }

    #[test]
    fn redemption_view_tolerates_deleted_joins() {
        let offer = Offer::new(
            UserId::new(),
            OfferDraft {
                title: "Lunch special".to_string(),
                description: "Soup and sandwich combo.".to_string(),
                image_url: None,
                actual_price: 12.0,
                discounted_price: 9.0,
                coupon_price: 1.0,
                expiry_date: Utc::now() + Duration::days(1),
                max_redemptions: 5,
                category: "food".to_string(),
            },
        );
        let mut coupon = Coupon::issue(&offer, UserId::new(), Duration::minutes(30), Utc::now());
        coupon.redeemed_at = Some(Utc::now());
        let detail = RedemptionDetail {
            redemption: Redemption::for_coupon(&coupon, "10.0.0.2".to_string()),
            user_name: None,
            user_email: None,
            vendor_name: None,
            vendor_email: None,
            offer_title: Some("Lunch special".to_string()),
            offer_category: Some("food".to_string()),
        };
        let view = RedemptionView::from(detail);
        let Ok(json) = serde_json::to_value(&view) else {
            panic!("serialization failed");
        };
        assert!(json.get("user_name").is_some_and(serde_json::Value::is_null));
        assert_eq!(json.get("offer_title").and_then(|v| v.as_str()), Some("Lunch special"));
    }

    #[test]
    fn vendor_sales_view_preserves_totals() {
        let view = VendorSalesView::from(VendorSales {
            vendor_id: UserId::new(),
            vendor_name: "Shop".to_string(),
            vendor_email: "shop@example.com".to_string(),
            offers: vec![OfferSales {
                offer_id: OfferId::new(),
                title: "Lunch special".to_string(),
                sold: 3,
                revenue: 30.0,
            }],
            total_revenue: 30.0,
            commission: 5.0,
            profit: 25.0,
        });
        assert_eq!(view.offers.len(), 1);
        assert!((view.profit - 25.0).abs() < f64::EPSILON);
    }
}
