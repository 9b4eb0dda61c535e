//! Service layer: orchestration between handlers, domain and storage.
//!
//! One service per surface. Services own the audit trail writes; audit
//! failures are logged and swallowed so they never change the outcome
//! of the operation they describe.

pub mod admin_service;
pub mod auth_service;
pub mod coupon_service;
pub mod notify;
pub mod offer_service;
pub mod payment_service;

pub use admin_service::{AdminService, OfferSales, VendorSales};
pub use auth_service::{AuthService, BootstrapKind};
pub use coupon_service::CouponService;
pub use notify::{OtpDispatch, SimulatedSms, SmsSender};
pub use offer_service::OfferService;
pub use payment_service::{HmacPaymentGateway, PaymentGateway, PaymentOrder, PaymentService};

use crate::domain::{AuditAction, AuditEntry, UserId};
use crate::storage::Storage;

/// Appends an audit entry, logging instead of failing on error.
pub(crate) async fn record_audit(
    storage: &Storage,
    user_id: Option<UserId>,
    action: AuditAction,
    ip: &str,
    meta: Option<serde_json::Value>,
) {
    let entry = AuditEntry::new(user_id, action, ip.to_string(), meta);
    if let Err(e) = storage.audit.append(&entry).await {
        tracing::warn!(action = %entry.action, error = %e, "audit append failed");
    }
}
