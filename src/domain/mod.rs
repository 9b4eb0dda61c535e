//! Domain layer: identifiers, aggregates and in-process policies.
//!
//! This module contains the server-side domain model: typed entity
//! identifiers, the user/offer/coupon aggregates with their invariants,
//! immutable redemption and audit records, and the login throttle.

pub mod audit;
pub mod coupon;
pub mod ids;
pub mod offer;
pub mod redemption;
pub mod throttle;
pub mod user;

pub use audit::{AuditAction, AuditEntry};
pub use coupon::{Coupon, CouponStatus};
pub use ids::{CouponId, OfferId, UserId};
pub use offer::{Offer, OfferDraft};
pub use redemption::Redemption;
pub use throttle::LoginThrottle;
pub use user::{OtpChallenge, Role, User};
