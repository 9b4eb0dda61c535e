//! Vendor handlers: offer publication and redemption confirmation.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::api::dto::{
    ConfirmRequest, ConfirmResponse, OfferListResponse, OfferPayload, OfferResponse, OfferView,
    validated,
};
use crate::api::extract::{ClientIp, VendorIdentity};
use crate::app_state::AppState;
use crate::domain::OfferId;
use crate::error::{ApiError, ErrorResponse};

/// `GET /vendor/offers` — List the caller's own offers.
///
/// # Errors
///
/// Returns [`ApiError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/vendor/offers",
    tag = "Vendor",
    summary = "List own offers",
    description = "Returns every offer owned by the calling vendor, active or not, newest first.",
    responses(
        (status = 200, description = "The vendor's offers", body = OfferListResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Caller is not a vendor", body = ErrorResponse),
    )
)]
pub async fn my_offers(
    State(state): State<AppState>,
    VendorIdentity(vendor): VendorIdentity,
) -> Result<impl IntoResponse, ApiError> {
    let offers = state.offers.vendor_offers(&vendor).await?;

    Ok(Json(OfferListResponse {
        offers: offers.into_iter().map(OfferView::from).collect(),
    }))
}

/// `POST /vendor/offers` — Publish a new offer.
///
/// # Errors
///
/// Returns [`ApiError`] when the payload fails validation or the caller
/// is not an approved vendor.
#[utoipa::path(
    post,
    path = "/api/vendor/offers",
    tag = "Vendor",
    summary = "Publish an offer",
    description = "Creates an active offer owned by the calling vendor. Publication requires admin approval of the vendor account.",
    request_body = OfferPayload,
    responses(
        (status = 201, description = "Offer published", body = OfferResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 403, description = "Vendor not approved", body = ErrorResponse),
    )
)]
pub async fn create_offer(
    State(state): State<AppState>,
    VendorIdentity(vendor): VendorIdentity,
    ClientIp(ip): ClientIp,
    Json(req): Json<OfferPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let req = validated(req)?;
    let offer = state.offers.create(&vendor, req.into_draft(), &ip).await?;

    Ok((StatusCode::CREATED, Json(OfferResponse { offer: offer.into() })))
}

/// `PUT /vendor/offers/{offer_id}` — Replace one of the caller's offers.
///
/// # Errors
///
/// Returns [`ApiError`] when the offer does not exist or belongs to
/// another vendor.
#[utoipa::path(
    put,
    path = "/api/vendor/offers/{offer_id}",
    tag = "Vendor",
    summary = "Update an offer",
    description = "Fully replaces the offer's editable fields. Only the owning vendor may update an offer; offers owned by others read as not found.",
    params(("offer_id" = uuid::Uuid, Path, description = "Offer identifier")),
    request_body = OfferPayload,
    responses(
        (status = 200, description = "Offer updated", body = OfferResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 404, description = "No such offer for this vendor", body = ErrorResponse),
    )
)]
pub async fn update_offer(
    State(state): State<AppState>,
    VendorIdentity(vendor): VendorIdentity,
    ClientIp(ip): ClientIp,
    Path(offer_id): Path<uuid::Uuid>,
    Json(req): Json<OfferPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let req = validated(req)?;
    let offer = state
        .offers
        .update(&vendor, OfferId::from_uuid(offer_id), req.into_draft(), &ip)
        .await?;

    Ok(Json(OfferResponse { offer: offer.into() }))
}

/// `POST /vendor/confirm-redemption` — Consume a presented coupon.
///
/// # Errors
///
/// Returns [`ApiError`] when the coupon does not exist, belongs to
/// another vendor's offer, or is already redeemed or expired.
#[utoipa::path(
    post,
    path = "/api/vendor/confirm-redemption",
    tag = "Vendor",
    summary = "Confirm a redemption",
    description = "Atomically flips the presented coupon from ACTIVE to REDEEMED and records the redemption. A coupon confirms at most once; later attempts fail.",
    request_body = ConfirmRequest,
    responses(
        (status = 200, description = "Coupon redeemed", body = ConfirmResponse),
        (status = 400, description = "Already redeemed or expired", body = ErrorResponse),
        (status = 403, description = "Coupon belongs to another vendor", body = ErrorResponse),
        (status = 404, description = "No such coupon", body = ErrorResponse),
    )
)]
pub async fn confirm_redemption(
    State(state): State<AppState>,
    VendorIdentity(vendor): VendorIdentity,
    ClientIp(ip): ClientIp,
    Json(req): Json<ConfirmRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let coupon = state.coupons.confirm(&vendor, req.coupon_id, &ip).await?;

    Ok(Json(ConfirmResponse {
        message: "Coupon redeemed successfully".to_string(),
        coupon: coupon.into(),
    }))
}

/// Vendor routes, nested under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/vendor/offers", get(my_offers).post(create_offer))
        .route("/vendor/offers/{offer_id}", put(update_offer))
        .route("/vendor/confirm-redemption", post(confirm_redemption))
}
