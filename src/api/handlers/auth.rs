//! Authentication handlers: registration, OTP verification, login and identity.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    AuthResponse, BootstrapLoginRequest, LoginRequest, MeResponse, MessageResponse,
    OtpResendResponse, RegisterRequest, RegisterResponse, ResendOtpRequest, VerifyOtpRequest,
    validated,
};
use crate::api::extract::{ClientIp, Identity};
use crate::app_state::AppState;
use crate::error::{ApiError, ErrorResponse};
use crate::service::BootstrapKind;

/// `POST /auth/register` — Create an account and start the OTP challenge.
///
/// # Errors
///
/// Returns [`ApiError`] when the payload fails validation or the email
/// or phone is already taken.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    summary = "Register a new account",
    description = "Creates an account and sends a one-time code to the given phone. The account cannot log in until the code is verified. The first account ever registered becomes the admin.",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, OTP challenge pending", body = RegisterResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 409, description = "Email or phone already in use", body = ErrorResponse),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let req = validated(req)?;
    let (user, otp_simulation) = state
        .auth
        .register(&req.name, &req.email, &req.phone, &req.password, &ip)
        .await?;

    let response = RegisterResponse {
        message: "registered; verify the OTP sent to your phone".to_string(),
        otp_simulation,
        user: user.into(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /auth/verify-otp` — Complete the OTP challenge.
///
/// # Errors
///
/// Returns [`ApiError`] when no challenge is pending for the email or
/// the code is wrong or expired.
#[utoipa::path(
    post,
    path = "/api/auth/verify-otp",
    tag = "Auth",
    summary = "Verify a one-time code",
    description = "Marks the account as verified when the submitted code matches the pending challenge. Verification unlocks login.",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "OTP verified", body = MessageResponse),
        (status = 400, description = "Wrong or expired code", body = ErrorResponse),
        (status = 404, description = "No pending challenge for this email", body = ErrorResponse),
    )
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let req = validated(req)?;
    state.auth.verify_otp(&req.email, &req.otp, &ip).await?;

    Ok(Json(MessageResponse {
        message: "OTP verified successfully".to_string(),
    }))
}

/// `POST /auth/resend-otp` — Issue a fresh code for a pending challenge.
///
/// # Errors
///
/// Returns [`ApiError`] when no challenge is pending for the email.
#[utoipa::path(
    post,
    path = "/api/auth/resend-otp",
    tag = "Auth",
    summary = "Resend the one-time code",
    description = "Replaces the pending code with a fresh one and resets its expiry.",
    request_body = ResendOtpRequest,
    responses(
        (status = 200, description = "Fresh code sent", body = OtpResendResponse),
        (status = 404, description = "No pending challenge for this email", body = ErrorResponse),
    )
)]
pub async fn resend_otp(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(req): Json<ResendOtpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let req = validated(req)?;
    let otp_simulation = state.auth.resend_otp(&req.email, &ip).await?;

    Ok(Json(OtpResendResponse {
        message: "OTP resent".to_string(),
        otp_simulation,
    }))
}

/// `POST /auth/login` — Exchange credentials for a bearer token.
///
/// # Errors
///
/// Returns [`ApiError`] on bad credentials, a blocked account, a pending
/// OTP challenge, or too many recent attempts for the identifier.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    summary = "Log in",
    description = "Accepts email or phone as the identifier and returns a signed bearer token on success. Repeated failures for one identifier are throttled.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = AuthResponse),
        (status = 401, description = "Unknown identifier or wrong password", body = ErrorResponse),
        (status = 403, description = "Account blocked or OTP not verified", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let req = validated(req)?;
    let (token, user) = state.auth.login(&req.identifier, &req.password, &ip).await?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// `GET /auth/me` — Return the authenticated account.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    summary = "Current account",
    description = "Returns the account behind the presented bearer token.",
    responses(
        (status = 200, description = "Authenticated account", body = MeResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn me(Identity(user): Identity) -> impl IntoResponse {
    Json(MeResponse { user: user.into() })
}

/// `POST /auth/admin-bootstrap-login` — Fixed-credential admin login.
///
/// # Errors
///
/// Returns [`ApiError`] when bootstrap accounts are disabled or the
/// credentials are not the fixed pair.
#[utoipa::path(
    post,
    path = "/api/auth/admin-bootstrap-login",
    tag = "Auth",
    summary = "Bootstrap admin login",
    description = "Development-only login for the fixed admin account. Upserts the account and returns a token. Disabled in production configurations.",
    request_body = BootstrapLoginRequest,
    responses(
        (status = 200, description = "Token issued", body = AuthResponse),
        (status = 401, description = "Wrong fixed credentials", body = ErrorResponse),
        (status = 403, description = "Bootstrap logins disabled", body = ErrorResponse),
    )
)]
pub async fn admin_bootstrap_login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(req): Json<BootstrapLoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    bootstrap_login(&state, BootstrapKind::Admin, &req, &ip).await
}

/// `POST /auth/user-bootstrap-login` — Fixed-credential user login.
///
/// # Errors
///
/// Returns [`ApiError`] when bootstrap accounts are disabled or the
/// credentials are not the fixed pair.
#[utoipa::path(
    post,
    path = "/api/auth/user-bootstrap-login",
    tag = "Auth",
    summary = "Bootstrap user login",
    description = "Development-only login for the fixed user account. Upserts the account and returns a token. Disabled in production configurations.",
    request_body = BootstrapLoginRequest,
    responses(
        (status = 200, description = "Token issued", body = AuthResponse),
        (status = 401, description = "Wrong fixed credentials", body = ErrorResponse),
        (status = 403, description = "Bootstrap logins disabled", body = ErrorResponse),
    )
)]
pub async fn user_bootstrap_login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(req): Json<BootstrapLoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    bootstrap_login(&state, BootstrapKind::User, &req, &ip).await
}

/// `POST /auth/vendor-bootstrap-login` — Fixed-credential vendor login.
///
/// # Errors
///
/// Returns [`ApiError`] when bootstrap accounts are disabled or the
/// credentials are not the fixed pair.
#[utoipa::path(
    post,
    path = "/api/auth/vendor-bootstrap-login",
    tag = "Auth",
    summary = "Bootstrap vendor login",
    description = "Development-only login for the fixed, pre-approved vendor account. Upserts the account and returns a token. Disabled in production configurations.",
    request_body = BootstrapLoginRequest,
    responses(
        (status = 200, description = "Token issued", body = AuthResponse),
        (status = 401, description = "Wrong fixed credentials", body = ErrorResponse),
        (status = 403, description = "Bootstrap logins disabled", body = ErrorResponse),
    )
)]
pub async fn vendor_bootstrap_login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(req): Json<BootstrapLoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    bootstrap_login(&state, BootstrapKind::Vendor, &req, &ip).await
}

async fn bootstrap_login(
    state: &AppState,
    kind: BootstrapKind,
    req: &BootstrapLoginRequest,
    ip: &str,
) -> Result<Json<AuthResponse>, ApiError> {
    if !state.bootstrap_accounts {
        return Err(ApiError::Forbidden(
            "bootstrap logins are disabled".to_string(),
        ));
    }

    let (token, user) = state
        .auth
        .bootstrap_login(kind, &req.identifier, &req.password, ip)
        .await?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// Auth routes, nested under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/resend-otp", post(resend_otp))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/admin-bootstrap-login", post(admin_bootstrap_login))
        .route("/auth/user-bootstrap-login", post(user_bootstrap_login))
        .route("/auth/vendor-bootstrap-login", post(vendor_bootstrap_login))
}
