//! User accounts, roles and OTP challenges.
//!
//! [`Role`] carries vendor approval inside the variant itself, so an
//! unapproved vendor is unrepresentable as "approved" anywhere in the
//! system. Capability checks (`can_publish_offers`, `can_administer`)
//! live here rather than being re-derived from strings at call sites.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Account role with capabilities.
///
/// Vendor approval is part of the variant, not a free-floating flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Full administrative access.
    Admin,
    /// May publish offers and confirm redemptions once `approved`.
    Vendor {
        /// Set by an administrator; gates all vendor write paths.
        approved: bool,
    },
    /// Regular consumer account.
    User,
}

impl Role {
    /// Uppercase wire label for this role (`ADMIN`, `VENDOR`, `USER`).
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Vendor { .. } => "VENDOR",
            Self::User => "USER",
        }
    }

    /// Reconstructs a role from its persisted parts.
    ///
    /// `approved` is only meaningful for the `VENDOR` label and ignored
    /// otherwise. Returns `None` for unknown labels.
    #[must_use]
    pub fn from_parts(label: &str, approved: bool) -> Option<Self> {
        match label {
            "ADMIN" => Some(Self::Admin),
            "VENDOR" => Some(Self::Vendor { approved }),
            "USER" => Some(Self::User),
            _ => None,
        }
    }

    /// Whether this role has administrative access.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Whether this role is a vendor (approved or not).
    #[must_use]
    pub const fn is_vendor(&self) -> bool {
        matches!(self, Self::Vendor { .. })
    }

    /// Approval flag as persisted; `false` for non-vendor roles.
    #[must_use]
    pub const fn vendor_approved(&self) -> bool {
        matches!(self, Self::Vendor { approved: true })
    }

    /// Whether this role may create offers.
    #[must_use]
    pub const fn can_publish_offers(&self) -> bool {
        self.vendor_approved()
    }

    /// Whether this role may use the administrative surface.
    #[must_use]
    pub const fn can_administer(&self) -> bool {
        self.is_admin()
    }
}

/// Pending one-time-password challenge attached to an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpChallenge {
    /// Six-digit numeric code.
    pub code: String,
    /// Instant after which the code is no longer accepted.
    pub expires_at: DateTime<Utc>,
}

impl OtpChallenge {
    /// Whether the challenge has passed its expiry at `now`.
    /// A code presented exactly at the expiry instant is still accepted.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// User account aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique account identifier (immutable after registration).
    pub id: UserId,

    /// Display name; also accepted as a login identifier.
    pub name: String,

    /// Unique email address.
    pub email: String,

    /// Unique phone number, OTP dispatch target.
    pub phone: String,

    /// Argon2 password hash. Never serialized.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Account role with capabilities.
    pub role: Role,

    /// Set by an administrator; blocked accounts cannot log in.
    pub is_blocked: bool,

    /// Whether the registration OTP has been verified.
    pub otp_verified: bool,

    /// Pending OTP challenge, cleared on successful verification.
    /// Never serialized.
    #[serde(skip_serializing)]
    pub otp: Option<OtpChallenge>,

    /// Registration timestamp (immutable).
    pub created_at: DateTime<Utc>,

    /// Timestamp of last account mutation.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new unverified account with the given role.
    #[must_use]
    pub fn new(
        name: String,
        email: String,
        phone: String,
        password_hash: String,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            name,
            email,
            phone,
            password_hash,
            role,
            is_blocked: false,
            otp_verified: false,
            otp: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attaches a fresh OTP challenge and marks the account unverified.
    pub fn set_otp(&mut self, code: String, expires_at: DateTime<Utc>) {
        self.otp = Some(OtpChallenge { code, expires_at });
        self.otp_verified = false;
        self.updated_at = Utc::now();
    }

    /// Marks the OTP as verified and clears the stored challenge.
    pub fn mark_otp_verified(&mut self) {
        self.otp = None;
        self.otp_verified = true;
        self.updated_at = Utc::now();
    }
}
