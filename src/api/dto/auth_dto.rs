//! Authentication and account DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::{User, UserId};

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// Display name, also usable as a login identifier.
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    /// Email address; must not be in use.
    #[validate(email)]
    pub email: String,
    /// Phone number the OTP is dispatched to; must not be in use.
    #[validate(length(min = 8, max = 20))]
    pub phone: String,
    /// Plaintext password, stored only as an Argon2 hash.
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Request body for `POST /auth/verify-otp`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyOtpRequest {
    /// Email the challenge was registered under.
    #[validate(email)]
    pub email: String,
    /// Six-digit code from the SMS (or the simulation echo).
    #[validate(length(equal = 6))]
    pub otp: String,
}

/// Request body for `POST /auth/resend-otp`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResendOtpRequest {
    /// Email the challenge was registered under.
    #[validate(email)]
    pub email: String,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// Email or display name.
    #[validate(length(min = 1, max = 100))]
    pub identifier: String,
    /// Account password.
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Request body for the fixed-credential bootstrap logins.
///
/// `email` is accepted as an alias for `identifier` since the fixed
/// accounts historically log in by an email-shaped field.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BootstrapLoginRequest {
    /// The fixed account name (`admin`, `user` or `vendor`).
    #[serde(alias = "email")]
    pub identifier: String,
    /// The fixed account password.
    pub password: String,
}

/// Public account view. Password and OTP material never appear here.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    /// Account identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Phone number.
    pub phone: String,
    /// Role label: `ADMIN`, `VENDOR` or `USER`.
    pub role: String,
    /// Vendor approval flag; always false for non-vendors.
    pub is_vendor_approved: bool,
    /// Whether an admin has blocked the account.
    pub is_blocked: bool,
    /// Whether the registration OTP has been verified.
    pub otp_verified: bool,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            role: user.role.label().to_string(),
            is_vendor_approved: user.role.vendor_approved(),
            is_blocked: user.is_blocked,
            otp_verified: user.otp_verified,
            created_at: user.created_at,
        }
    }
}

/// Response body for `POST /auth/register` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    /// Human-readable outcome.
    pub message: String,
    /// The OTP code, echoed only when dispatch ran in simulation mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_simulation: Option<String>,
    /// The newly created account.
    pub user: UserSummary,
}

/// Response body for `POST /auth/resend-otp`.
#[derive(Debug, Serialize, ToSchema)]
pub struct OtpResendResponse {
    /// Human-readable outcome.
    pub message: String,
    /// The regenerated OTP, echoed only in simulation mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_simulation: Option<String>,
}

/// Response body for successful logins.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// Signed bearer token.
    pub token: String,
    /// The authenticated account.
    pub user: UserSummary,
}

/// Response body for `GET /auth/me`.
#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    /// The authenticated account.
    pub user: UserSummary,
}

/// Generic message-only response.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    /// Human-readable outcome.
    pub message: String,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use validator::Validate;

    #[test]
    fn register_bounds_are_enforced() {
        let valid = RegisterRequest {
            name: "Dana".to_string(),
            email: "dana@example.com".to_string(),
            phone: "+15550000001".to_string(),
            password: "correct horse".to_string(),
        };
        assert!(valid.validate().is_ok());

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            name: valid.name.clone(),
            phone: valid.phone.clone(),
            password: valid.password.clone(),
        };
        assert!(bad_email.validate().is_err());

        let short_password = RegisterRequest {
            password: "short".to_string(),
            name: valid.name.clone(),
            email: valid.email.clone(),
            phone: valid.phone.clone(),
        };
        assert!(short_password.validate().is_err());
    }

    #[test]
    fn otp_code_must_be_six_chars() {
        let short = VerifyOtpRequest {
            email: "dana@example.com".to_string(),
            otp: "12345".to_string(),
        };
        assert!(short.validate().is_err());
        let exact = VerifyOtpRequest {
            email: "dana@example.com".to_string(),
            otp: "123456".to_string(),
        };
        assert!(exact.validate().is_ok());
    }

    #[test]
    fn bootstrap_request_accepts_email_alias() {
        let from_alias: Result<BootstrapLoginRequest, _> =
            serde_json::from_str(r#"{"email":"admin","password":"admin"}"#);
        let Ok(req) = from_alias else {
            panic!("alias deserialization failed");
        };
        assert_eq!(req.identifier, "admin");
    }

    #[test]
    fn summary_carries_role_label_and_approval() {
        let user = User::new(
            "Shop".to_string(),
            "shop@example.com".to_string(),
            "+15550000002".to_string(),
            "hash".to_string(),
            Role::Vendor { approved: true },
        );
        let summary = UserSummary::from(user);
        assert_eq!(summary.role, "VENDOR");
        assert!(summary.is_vendor_approved);

        let json = serde_json::to_string(&summary).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        assert!(!json.contains("password"));
    }
}
