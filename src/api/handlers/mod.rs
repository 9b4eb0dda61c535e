//! REST endpoint handlers organized by audience.

pub mod admin;
pub mod auth;
pub mod system;
pub mod user;
pub mod vendor;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes for nesting under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::routes())
        .merge(user::routes())
        .merge(vendor::routes())
        .merge(admin::routes())
        .merge(system::routes())
}
