//! Authentication primitives: bearer tokens and password hashing.

pub mod jwt;
pub mod password;

pub use jwt::{AccessClaims, TokenAuthority};
pub use password::{hash_password, verify_password};
