//! # offeyr-gateway
//!
//! REST API backend for the OFFEYR coupon marketplace. Vendors publish
//! discount offers, users claim single-use QR coupons against them (free
//! or paid through a payment gateway), and vendors confirm redemptions
//! at most once per coupon.
//!
//! All lifecycle transitions go through conditional storage updates, so
//! the at-most-once redemption guarantee holds under concurrent requests
//! on either backend.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers + Extractors (api/)
//!     │
//!     ├── AuthService / OfferService (service/)
//!     ├── CouponService / PaymentService / AdminService
//!     │
//!     ├── Domain model (domain/)
//!     ├── QR rendering (qr)
//!     │
//!     └── Storage traits (storage/)
//!         ├── In-memory backend
//!         └── PostgreSQL backend
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod qr;
pub mod service;
pub mod storage;
