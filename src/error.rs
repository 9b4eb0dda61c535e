//! Gateway error types with HTTP status code mapping.
//!
//! [`ApiError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! Every variant is an expected, locally-handled request failure; none is
//! ever allowed to take the process down.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2101,
///     "message": "coupon not found",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`ApiError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category            | HTTP Status                 |
/// |-----------|---------------------|-----------------------------|
/// | 1000–1999 | Validation/Auth     | 400 / 401 / 403 / 429       |
/// | 2000–2999 | Coupon lifecycle    | 400 / 403 / 404             |
/// | 3000–3999 | Server              | 500 Internal Server Error   |
/// | 4000–4999 | Accounts/Admin      | 400 / 404 / 409             |
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Offer missing, inactive, or past its expiry date.
    #[error("offer unavailable or expired")]
    OfferUnavailable,

    /// Issuing one more coupon would exceed the offer's redemption cap.
    #[error("offer redemption limit reached")]
    RedemptionLimitReached,

    /// Redemption confirmation references an unknown coupon id.
    #[error("coupon not found")]
    CouponNotFound,

    /// Vendor attempting to redeem a coupon issued against another
    /// vendor's offer.
    #[error("coupon does not belong to this vendor")]
    CouponOwnershipMismatch,

    /// The atomic conditional transition found no matching ACTIVE,
    /// unexpired, vendor-owned coupon.
    #[error("coupon already redeemed or expired")]
    AlreadyRedeemedOrExpired,

    /// Payment verification proof does not match the expected signature.
    #[error("payment signature verification failed")]
    InvalidSignature,

    /// Registration attempted with an email or phone already in use.
    #[error("email or phone already exists")]
    EmailOrPhoneTaken,

    /// Unknown identifier or wrong password at login.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Account has been blocked by an administrator.
    #[error("account blocked by admin")]
    AccountBlocked,

    /// Login attempted before the registration OTP was verified.
    #[error("OTP not verified; verify OTP before login")]
    OtpNotVerified,

    /// No pending OTP challenge for the given account.
    #[error("user or OTP not found")]
    OtpNotFound,

    /// The OTP challenge has passed its expiry.
    #[error("OTP expired")]
    OtpExpired,

    /// The submitted OTP code does not match the pending challenge.
    #[error("invalid OTP")]
    OtpMismatch,

    /// Too many failed login attempts inside the throttle window.
    #[error("too many login attempts; please try again later")]
    TooManyLoginAttempts,

    /// Missing, malformed, or rejected bearer token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated identity lacks the capability for this operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Vendor account exists but has not been approved by an admin.
    #[error("vendor not approved by admin")]
    VendorNotApproved,

    /// No user with the given identifier.
    #[error("user not found")]
    UserNotFound,

    /// No offer with the given identifier (scoped to the caller where
    /// ownership applies).
    #[error("offer not found")]
    OfferNotFound,

    /// Request body or parameters failed validation.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Administrative guard refused the operation (default admin or
    /// self-targeting protections).
    #[error("{0}")]
    AdminGuard(String),

    /// Storage layer failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Validation(_) => 1001,
            Self::InvalidCredentials => 1002,
            Self::Unauthorized(_) => 1003,
            Self::Forbidden(_) => 1004,
            Self::AccountBlocked => 1005,
            Self::OtpNotVerified => 1006,
            Self::OtpExpired => 1007,
            Self::OtpMismatch => 1008,
            Self::OtpNotFound => 1009,
            Self::TooManyLoginAttempts => 1010,
            Self::InvalidSignature => 1011,
            Self::OfferUnavailable => 2001,
            Self::RedemptionLimitReached => 2002,
            Self::AlreadyRedeemedOrExpired => 2003,
            Self::CouponNotFound => 2101,
            Self::CouponOwnershipMismatch => 2102,
            Self::Storage(_) => 3001,
            Self::Internal(_) => 3000,
            Self::UserNotFound => 4001,
            Self::OfferNotFound => 4002,
            Self::EmailOrPhoneTaken => 4003,
            Self::VendorNotApproved => 4004,
            Self::AdminGuard(_) => 4005,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::OfferUnavailable
            | Self::RedemptionLimitReached
            | Self::AlreadyRedeemedOrExpired
            | Self::InvalidSignature
            | Self::OtpExpired
            | Self::OtpMismatch
            | Self::Validation(_)
            | Self::AdminGuard(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::CouponOwnershipMismatch
            | Self::AccountBlocked
            | Self::OtpNotVerified
            | Self::Forbidden(_)
            | Self::VendorNotApproved => StatusCode::FORBIDDEN,
            Self::CouponNotFound
            | Self::OtpNotFound
            | Self::UserNotFound
            | Self::OfferNotFound => StatusCode::NOT_FOUND,
            Self::EmailOrPhoneTaken => StatusCode::CONFLICT,
            Self::TooManyLoginAttempts => StatusCode::TOO_MANY_REQUESTS,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_errors_map_to_documented_statuses() {
        assert_eq!(
            ApiError::OfferUnavailable.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::RedemptionLimitReached.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::CouponNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::CouponOwnershipMismatch.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::AlreadyRedeemedOrExpired.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidSignature.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::EmailOrPhoneTaken.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::TooManyLoginAttempts.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn error_codes_are_unique() {
        let variants = [
            ApiError::OfferUnavailable,
            ApiError::RedemptionLimitReached,
            ApiError::CouponNotFound,
            ApiError::CouponOwnershipMismatch,
            ApiError::AlreadyRedeemedOrExpired,
            ApiError::InvalidSignature,
            ApiError::EmailOrPhoneTaken,
            ApiError::InvalidCredentials,
            ApiError::AccountBlocked,
            ApiError::OtpNotVerified,
            ApiError::OtpNotFound,
            ApiError::OtpExpired,
            ApiError::OtpMismatch,
            ApiError::TooManyLoginAttempts,
            ApiError::Unauthorized(String::new()),
            ApiError::Forbidden(String::new()),
            ApiError::VendorNotApproved,
            ApiError::UserNotFound,
            ApiError::OfferNotFound,
            ApiError::Validation(String::new()),
            ApiError::AdminGuard(String::new()),
            ApiError::Storage(String::new()),
            ApiError::Internal(String::new()),
        ];
        let mut codes: Vec<u32> = variants.iter().map(ApiError::error_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), variants.len());
    }

    #[test]
    fn response_status_matches_variant() {
        let response = ApiError::AlreadyRedeemedOrExpired.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
