//! Data Transfer Objects for REST request/response serialization.
//!
//! Request DTOs carry `validator` range rules mirroring the domain
//! bounds; responses are views that never expose password or OTP
//! material.

pub mod admin_dto;
pub mod auth_dto;
pub mod coupon_dto;
pub mod offer_dto;
pub mod payment_dto;

pub use admin_dto::*;
pub use auth_dto::*;
pub use coupon_dto::*;
pub use offer_dto::*;
pub use payment_dto::*;

use validator::Validate;

use crate::error::ApiError;

/// Runs the DTO's validator rules, mapping failures to a 400.
pub(crate) fn validated<T: Validate>(value: T) -> Result<T, ApiError> {
    value
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    Ok(value)
}
