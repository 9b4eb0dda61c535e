//! User-facing handlers: browsing offers, claiming coupons, payments and activity.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    AuditView, CategoryQuery, CouponListResponse, CreateOrderRequest, HeldCouponView,
    IssuedCouponResponse, LogListResponse, OfferCatalogResponse, OfferWithVendorView,
    OrderResponse, RedeemRequest, VerifyPaymentRequest, validated,
};
use crate::api::extract::{ClientIp, Identity};
use crate::app_state::AppState;
use crate::error::{ApiError, ErrorResponse};

/// `GET /user/offers` — Browse published offers.
///
/// # Errors
///
/// Returns [`ApiError`] on an invalid category filter or storage failure.
#[utoipa::path(
    get,
    path = "/api/user/offers",
    tag = "User",
    summary = "Browse published offers",
    description = "Returns active, unexpired offers with vendor details, newest first, optionally filtered by exact category.",
    params(CategoryQuery),
    responses(
        (status = 200, description = "Published offers", body = OfferCatalogResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn list_offers(
    State(state): State<AppState>,
    Identity(_user): Identity,
    Query(query): Query<CategoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let query = validated(query)?;
    let offers = state.offers.published(query.category.as_deref()).await?;

    Ok(Json(OfferCatalogResponse {
        offers: offers.into_iter().map(OfferWithVendorView::from).collect(),
    }))
}

/// `POST /user/redeem` — Claim a coupon against an offer.
///
/// # Errors
///
/// Returns [`ApiError`] when the offer is unavailable or its redemption
/// cap is already consumed.
#[utoipa::path(
    post,
    path = "/api/user/redeem",
    tag = "User",
    summary = "Claim a coupon",
    description = "Issues a single-use ACTIVE coupon with its own short expiry window and returns it with a scannable QR code. Issuance fails once the offer's redemption cap is consumed by redeemed coupons.",
    request_body = RedeemRequest,
    responses(
        (status = 201, description = "Coupon issued", body = IssuedCouponResponse),
        (status = 400, description = "Offer unavailable or cap reached", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn redeem(
    State(state): State<AppState>,
    Identity(user): Identity,
    ClientIp(ip): ClientIp,
    Json(req): Json<RedeemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (coupon, qr_code) = state.coupons.issue(&user, req.offer_id, &ip).await?;

    Ok((
        StatusCode::CREATED,
        Json(IssuedCouponResponse::new(&coupon, qr_code)),
    ))
}

/// `POST /user/create-payment-order` — Open a gateway order for a paid offer.
///
/// # Errors
///
/// Returns [`ApiError`] when the offer is unavailable or sold out.
#[utoipa::path(
    post,
    path = "/api/user/create-payment-order",
    tag = "User",
    summary = "Open a payment order",
    description = "Creates a gateway order priced at the offer's coupon price in minor currency units. The client completes checkout against the returned order and key.",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order opened", body = OrderResponse),
        (status = 400, description = "Offer unavailable or cap reached", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn create_payment_order(
    State(state): State<AppState>,
    Identity(user): Identity,
    ClientIp(ip): ClientIp,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state.payments.create_order(&user, req.offer_id, &ip).await?;

    Ok((StatusCode::CREATED, Json(OrderResponse { order: order.into() })))
}

/// `POST /user/verify-payment` — Verify a checkout and issue the coupon.
///
/// # Errors
///
/// Returns [`ApiError`] on a bad signature, or when the offer became
/// unavailable or sold out between order and verification.
#[utoipa::path(
    post,
    path = "/api/user/verify-payment",
    tag = "User",
    summary = "Verify a completed checkout",
    description = "Checks the gateway signature over the order and payment ids; on success issues the purchased coupon exactly as a free claim would. No coupon is issued on a bad signature.",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 201, description = "Payment verified, coupon issued", body = IssuedCouponResponse),
        (status = 400, description = "Invalid signature or offer unavailable", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    Identity(user): Identity,
    ClientIp(ip): ClientIp,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let req = validated(req)?;
    let (coupon, qr_code) = state
        .payments
        .verify_and_issue(
            &user,
            req.offer_id,
            &req.order_id,
            &req.payment_id,
            &req.signature,
            &ip,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(IssuedCouponResponse::new(&coupon, qr_code)),
    ))
}

/// `GET /user/coupons` — List the caller's coupon wallet.
///
/// # Errors
///
/// Returns [`ApiError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/user/coupons",
    tag = "User",
    summary = "List held coupons",
    description = "Sweeps the caller's stale ACTIVE coupons to EXPIRED, then returns all coupons ever issued to the caller, joined with their offers, newest first.",
    responses(
        (status = 200, description = "Held coupons", body = CouponListResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn my_coupons(
    State(state): State<AppState>,
    Identity(user): Identity,
) -> Result<impl IntoResponse, ApiError> {
    let coupons = state.coupons.coupons_for_user(user.id).await?;

    Ok(Json(CouponListResponse {
        coupons: coupons.into_iter().map(HeldCouponView::from).collect(),
    }))
}

/// `GET /user/logs` — List the caller's recent activity.
///
/// # Errors
///
/// Returns [`ApiError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/user/logs",
    tag = "User",
    summary = "Recent account activity",
    description = "Returns the caller's latest 100 audit entries, newest first.",
    responses(
        (status = 200, description = "Recent activity", body = LogListResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn my_logs(
    State(state): State<AppState>,
    Identity(user): Identity,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state.auth.recent_activity(user.id).await?;

    Ok(Json(LogListResponse {
        logs: entries.into_iter().map(AuditView::from).collect(),
    }))
}

/// User routes, nested under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/offers", get(list_offers))
        .route("/user/redeem", post(redeem))
        .route("/user/create-payment-order", post(create_payment_order))
        .route("/user/verify-payment", post(verify_payment))
        .route("/user/coupons", get(my_coupons))
        .route("/user/logs", get(my_logs))
}
