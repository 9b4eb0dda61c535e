//! REST API layer: route handlers, DTOs, extractors and router composition.
//!
//! All endpoints are mounted under `/api`. With the `swagger-ui` feature
//! enabled the OpenAPI document is served at `/api-docs/openapi.json`
//! with an interactive UI at `/swagger-ui`.

pub mod dto;
pub mod extract;
pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// OpenAPI document covering every REST endpoint.
#[derive(Debug, utoipa::OpenApi)]
#[openapi(
    info(
        title = "offeyr-gateway",
        description = "REST API for the OFFEYR coupon marketplace: offers, single-use coupons, and at-most-once redemption."
    ),
    paths(
        handlers::auth::register,
        handlers::auth::verify_otp,
        handlers::auth::resend_otp,
        handlers::auth::login,
        handlers::auth::me,
        handlers::auth::admin_bootstrap_login,
        handlers::auth::user_bootstrap_login,
        handlers::auth::vendor_bootstrap_login,
        handlers::user::list_offers,
        handlers::user::redeem,
        handlers::user::create_payment_order,
        handlers::user::verify_payment,
        handlers::user::my_coupons,
        handlers::user::my_logs,
        handlers::vendor::my_offers,
        handlers::vendor::create_offer,
        handlers::vendor::update_offer,
        handlers::vendor::confirm_redemption,
        handlers::admin::list_users,
        handlers::admin::set_role,
        handlers::admin::approve_vendor,
        handlers::admin::set_block,
        handlers::admin::delete_user,
        handlers::admin::all_offers,
        handlers::admin::redemptions,
        handlers::admin::system_logs,
        handlers::admin::vendor_sales,
        handlers::admin::export_csv,
        handlers::system::health,
    ),
    tags(
        (name = "Auth", description = "Registration, OTP challenges and login"),
        (name = "User", description = "Offer browsing, coupon claims and payments"),
        (name = "Vendor", description = "Offer publication and redemption confirmation"),
        (name = "Admin", description = "Account management, reporting and exports"),
        (name = "System", description = "Health and service metadata"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new().nest("/api", handlers::routes());

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi as _;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
    };

    router
}
