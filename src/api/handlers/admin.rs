//! Admin handlers: account management, platform listings, sales and exports.

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch};
use axum::{Json, Router};

use crate::api::dto::{
    AuditView, BlockRequest, LogListResponse, OfferCatalogResponse, OfferWithVendorView,
    RedemptionListResponse, RedemptionView, RoleRequest, UserListResponse, UserResponse,
    VendorSalesResponse, VendorSalesView, validated,
};
use crate::api::extract::{AdminIdentity, ClientIp};
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::{ApiError, ErrorResponse};

/// `GET /admin/users` — List every account.
///
/// # Errors
///
/// Returns [`ApiError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    summary = "List accounts",
    description = "Returns every account on the platform, newest first.",
    responses(
        (status = 200, description = "All accounts", body = UserListResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AdminIdentity(_admin): AdminIdentity,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.admin.list_users().await?;

    Ok(Json(UserListResponse {
        users: users.into_iter().map(Into::into).collect(),
    }))
}

/// `PATCH /admin/users/{user_id}/role` — Assign a role.
///
/// # Errors
///
/// Returns [`ApiError`] on an unknown role label, a protected target
/// (the default admin, or another admin), or a missing account.
#[utoipa::path(
    patch,
    path = "/api/admin/users/{user_id}/role",
    tag = "Admin",
    summary = "Assign a role",
    description = "Sets the target account's role to ADMIN, VENDOR or USER. Granting VENDOR approves the vendor in the same step. The default admin's role cannot change, and no admin can change another admin.",
    params(("user_id" = uuid::Uuid, Path, description = "Target account")),
    request_body = RoleRequest,
    responses(
        (status = 200, description = "Role updated", body = UserResponse),
        (status = 400, description = "Unknown role label or protected target", body = ErrorResponse),
        (status = 404, description = "No such account", body = ErrorResponse),
    )
)]
pub async fn set_role(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    ClientIp(ip): ClientIp,
    Path(user_id): Path<uuid::Uuid>,
    Json(req): Json<RoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let req = validated(req)?;
    let user = state
        .admin
        .set_role(&admin, UserId::from_uuid(user_id), &req.role, &ip)
        .await?;

    Ok(Json(UserResponse { user: user.into() }))
}

/// `PATCH /admin/users/{user_id}/approve-vendor` — Approve a vendor account.
///
/// # Errors
///
/// Returns [`ApiError`] when the target is missing or not a vendor.
#[utoipa::path(
    patch,
    path = "/api/admin/users/{user_id}/approve-vendor",
    tag = "Admin",
    summary = "Approve a vendor",
    description = "Marks a VENDOR account as approved, unlocking offer publication.",
    params(("user_id" = uuid::Uuid, Path, description = "Target account")),
    responses(
        (status = 200, description = "Vendor approved", body = UserResponse),
        (status = 400, description = "Target is not a vendor", body = ErrorResponse),
        (status = 404, description = "No such account", body = ErrorResponse),
    )
)]
pub async fn approve_vendor(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    ClientIp(ip): ClientIp,
    Path(user_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .admin
        .approve_vendor(&admin, UserId::from_uuid(user_id), &ip)
        .await?;

    Ok(Json(UserResponse { user: user.into() }))
}

/// `PATCH /admin/users/{user_id}/block` — Block or unblock an account.
///
/// # Errors
///
/// Returns [`ApiError`] when the target is protected or missing.
#[utoipa::path(
    patch,
    path = "/api/admin/users/{user_id}/block",
    tag = "Admin",
    summary = "Block or unblock an account",
    description = "Sets the blocked flag. Blocked accounts fail every authenticated request on their next token use. The default admin and the caller's own account cannot be blocked.",
    params(("user_id" = uuid::Uuid, Path, description = "Target account")),
    request_body = BlockRequest,
    responses(
        (status = 200, description = "Blocked state updated", body = UserResponse),
        (status = 400, description = "Protected target", body = ErrorResponse),
        (status = 404, description = "No such account", body = ErrorResponse),
    )
)]
pub async fn set_block(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    ClientIp(ip): ClientIp,
    Path(user_id): Path<uuid::Uuid>,
    Json(req): Json<BlockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .admin
        .set_blocked(&admin, UserId::from_uuid(user_id), req.blocked, &ip)
        .await?;

    Ok(Json(UserResponse { user: user.into() }))
}

/// `DELETE /admin/users/{user_id}` — Delete an account.
///
/// # Errors
///
/// Returns [`ApiError`] when the target is protected or missing.
#[utoipa::path(
    delete,
    path = "/api/admin/users/{user_id}",
    tag = "Admin",
    summary = "Delete an account",
    description = "Removes the account along with its offers and coupons. Redemption records and audit entries remain for reporting. The default admin and the caller's own account cannot be deleted.",
    params(("user_id" = uuid::Uuid, Path, description = "Target account")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 400, description = "Protected target", body = ErrorResponse),
        (status = 404, description = "No such account", body = ErrorResponse),
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    ClientIp(ip): ClientIp,
    Path(user_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .admin
        .delete_user(&admin, UserId::from_uuid(user_id), &ip)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// `GET /admin/offers` — List every offer on the platform.
///
/// # Errors
///
/// Returns [`ApiError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/admin/offers",
    tag = "Admin",
    summary = "List all offers",
    description = "Returns every offer with vendor details, active or not, newest first.",
    responses(
        (status = 200, description = "All offers", body = OfferCatalogResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
    )
)]
pub async fn all_offers(
    State(state): State<AppState>,
    AdminIdentity(_admin): AdminIdentity,
) -> Result<impl IntoResponse, ApiError> {
    let offers = state.admin.all_offers().await?;

    Ok(Json(OfferCatalogResponse {
        offers: offers.into_iter().map(OfferWithVendorView::from).collect(),
    }))
}

/// `GET /admin/redemptions` — List the platform redemption ledger.
///
/// # Errors
///
/// Returns [`ApiError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/admin/redemptions",
    tag = "Admin",
    summary = "List redemptions",
    description = "Returns every recorded redemption joined with the user, vendor and offer involved, newest first. Join fields are null when the referenced row was deleted.",
    responses(
        (status = 200, description = "Redemption ledger", body = RedemptionListResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
    )
)]
pub async fn redemptions(
    State(state): State<AppState>,
    AdminIdentity(_admin): AdminIdentity,
) -> Result<impl IntoResponse, ApiError> {
    let details = state.admin.redemptions().await?;

    Ok(Json(RedemptionListResponse {
        redemptions: details.into_iter().map(RedemptionView::from).collect(),
    }))
}

/// `GET /admin/system-logs` — List recent platform audit entries.
///
/// # Errors
///
/// Returns [`ApiError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/admin/system-logs",
    tag = "Admin",
    summary = "Recent system logs",
    description = "Returns the latest 500 audit entries across all accounts, newest first.",
    responses(
        (status = 200, description = "Recent audit entries", body = LogListResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
    )
)]
pub async fn system_logs(
    State(state): State<AppState>,
    AdminIdentity(_admin): AdminIdentity,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state.admin.system_logs().await?;

    Ok(Json(LogListResponse {
        logs: entries.into_iter().map(AuditView::from).collect(),
    }))
}

/// `GET /admin/vendor-sales` — Per-vendor sales report.
///
/// # Errors
///
/// Returns [`ApiError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/admin/vendor-sales",
    tag = "Admin",
    summary = "Vendor sales report",
    description = "Returns redeemed-coupon counts and revenue per offer, grouped by vendor, with the platform commission taken on each vendor's total.",
    responses(
        (status = 200, description = "Sales report", body = VendorSalesResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
    )
)]
pub async fn vendor_sales(
    State(state): State<AppState>,
    AdminIdentity(_admin): AdminIdentity,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.admin.vendor_sales().await?;

    Ok(Json(VendorSalesResponse {
        report: report.into_iter().map(VendorSalesView::from).collect(),
    }))
}

/// `GET /admin/export/csv` — Download the redemption ledger as CSV.
///
/// # Errors
///
/// Returns [`ApiError`] on storage or serialization failure.
#[utoipa::path(
    get,
    path = "/api/admin/export/csv",
    tag = "Admin",
    summary = "Export redemptions as CSV",
    description = "Streams the full redemption ledger as a CSV attachment named redemptions.csv.",
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv", body = String),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
    )
)]
pub async fn export_csv(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    ClientIp(ip): ClientIp,
) -> Result<impl IntoResponse, ApiError> {
    let csv = state.admin.export_redemptions_csv(&admin, &ip).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"redemptions.csv\"",
            ),
        ],
        csv,
    ))
}

/// Admin routes, nested under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/{user_id}", delete(delete_user))
        .route("/admin/users/{user_id}/role", patch(set_role))
        .route("/admin/users/{user_id}/approve-vendor", patch(approve_vendor))
        .route("/admin/users/{user_id}/block", patch(set_block))
        .route("/admin/offers", get(all_offers))
        .route("/admin/redemptions", get(redemptions))
        .route("/admin/system-logs", get(system_logs))
        .route("/admin/vendor-sales", get(vendor_sales))
        .route("/admin/export/csv", get(export_csv))
}
