//! Append-only audit trail.
//!
//! Every significant account, offer, coupon and payment event appends an
//! entry. Appends are fire-and-forget: a failed audit write is logged at
//! WARN and never fails the operation that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

/// Audited action labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// New account registered.
    Register,
    /// Successful login.
    Login,
    /// Registration OTP verified.
    OtpVerified,
    /// Registration OTP regenerated.
    OtpResent,
    /// Fixed-credential admin login.
    AdminBootstrapLogin,
    /// Fixed-credential user login.
    UserBootstrapLogin,
    /// Fixed-credential vendor login.
    VendorBootstrapLogin,
    /// Offer created by a vendor.
    OfferCreated,
    /// Offer updated by its vendor.
    OfferUpdated,
    /// Coupon issued to a user.
    CouponGenerated,
    /// Coupon redemption confirmed by a vendor.
    CouponRedeemed,
    /// Admin changed an account's role.
    RoleUpdated,
    /// Admin approved a vendor account.
    VendorApproved,
    /// Admin blocked or unblocked an account.
    UserBlockUpdated,
    /// Admin deleted an account.
    UserDeleted,
    /// Admin exported the redemption CSV.
    CsvExported,
    /// Payment order created for an offer.
    PaymentOrderCreated,
    /// Payment signature verified, coupon issued.
    PaymentVerified,
}

impl AuditAction {
    /// Uppercase wire label, e.g. `COUPON_GENERATED`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "REGISTER",
            Self::Login => "LOGIN",
            Self::OtpVerified => "OTP_VERIFIED",
            Self::OtpResent => "OTP_RESENT",
            Self::AdminBootstrapLogin => "ADMIN_BOOTSTRAP_LOGIN",
            Self::UserBootstrapLogin => "USER_BOOTSTRAP_LOGIN",
            Self::VendorBootstrapLogin => "VENDOR_BOOTSTRAP_LOGIN",
            Self::OfferCreated => "OFFER_CREATED",
            Self::OfferUpdated => "OFFER_UPDATED",
            Self::CouponGenerated => "COUPON_GENERATED",
            Self::CouponRedeemed => "COUPON_REDEEMED",
            Self::RoleUpdated => "ROLE_UPDATED",
            Self::VendorApproved => "VENDOR_APPROVED",
            Self::UserBlockUpdated => "USER_BLOCK_UPDATED",
            Self::UserDeleted => "USER_DELETED",
            Self::CsvExported => "CSV_EXPORTED",
            Self::PaymentOrderCreated => "PAYMENT_ORDER_CREATED",
            Self::PaymentVerified => "PAYMENT_VERIFIED",
        }
    }

    /// Parses a persisted action label. Returns `None` for unknown labels.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "REGISTER" => Some(Self::Register),
            "LOGIN" => Some(Self::Login),
            "OTP_VERIFIED" => Some(Self::OtpVerified),
            "OTP_RESENT" => Some(Self::OtpResent),
            "ADMIN_BOOTSTRAP_LOGIN" => Some(Self::AdminBootstrapLogin),
            "USER_BOOTSTRAP_LOGIN" => Some(Self::UserBootstrapLogin),
            "VENDOR_BOOTSTRAP_LOGIN" => Some(Self::VendorBootstrapLogin),
            "OFFER_CREATED" => Some(Self::OfferCreated),
            "OFFER_UPDATED" => Some(Self::OfferUpdated),
            "COUPON_GENERATED" => Some(Self::CouponGenerated),
            "COUPON_REDEEMED" => Some(Self::CouponRedeemed),
            "ROLE_UPDATED" => Some(Self::RoleUpdated),
            "VENDOR_APPROVED" => Some(Self::VendorApproved),
            "USER_BLOCK_UPDATED" => Some(Self::UserBlockUpdated),
            "USER_DELETED" => Some(Self::UserDeleted),
            "CSV_EXPORTED" => Some(Self::CsvExported),
            "PAYMENT_ORDER_CREATED" => Some(Self::PaymentOrderCreated),
            "PAYMENT_VERIFIED" => Some(Self::PaymentVerified),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit trail entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry identifier.
    pub id: Uuid,

    /// Acting (or affected) account, when known.
    pub user_id: Option<UserId>,

    /// What happened.
    pub action: AuditAction,

    /// Originating IP of the request.
    pub ip: String,

    /// Free-form JSON context (offer ids, counts, targets).
    pub meta: Option<serde_json::Value>,

    /// Append timestamp.
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(
        user_id: Option<UserId>,
        action: AuditAction,
        ip: String,
        meta: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            action,
            ip,
            meta,
            created_at: Utc::now(),
        }
    }
}
