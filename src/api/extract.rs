//! Request extractors: authenticated identities and the client IP.
//!
//! Identity extraction verifies the bearer token, reloads the account
//! from storage and rejects blocked accounts, so a block takes effect
//! on the next request rather than at the next login.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::domain::User;
use crate::error::ApiError;

/// Any authenticated account.
#[derive(Debug)]
pub struct Identity(pub User);

/// Authenticated account holding the VENDOR or ADMIN role.
#[derive(Debug)]
pub struct VendorIdentity(pub User);

/// Authenticated account holding the ADMIN role.
#[derive(Debug)]
pub struct AdminIdentity(pub User);

/// Originating client IP, for audit entries.
///
/// Prefers the first `x-forwarded-for` entry, falls back to the socket
/// peer address, then to `"unknown"`.
#[derive(Debug)]
pub struct ClientIp(pub String);

impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(authenticate(parts, state).await?))
    }
}

impl FromRequestParts<AppState> for VendorIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        if !(user.role.is_vendor() || user.role.is_admin()) {
            return Err(ApiError::Forbidden("vendor access required".to_string()));
        }
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for AdminIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        if !user.role.can_administer() {
            return Err(ApiError::Forbidden("admin access required".to_string()));
        }
        Ok(Self(user))
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let ip = match forwarded {
            Some(ip) => ip.to_string(),
            None => parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map_or_else(|| "unknown".to_string(), |info| info.0.ip().to_string()),
        };
        Ok(Self(ip))
    }
}

/// Resolves the bearer token to a live, unblocked account.
async fn authenticate(parts: &Parts, state: &AppState) -> Result<User, ApiError> {
    let token = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
    let claims = state.tokens.verify(token)?;
    let user = state
        .storage
        .users
        .by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("account no longer exists".to_string()))?;
    if user.is_blocked {
        return Err(ApiError::AccountBlocked);
    }
    Ok(user)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::domain::Role;
    use crate::storage::Storage;
    use axum::http::Request;
    use chrono::Utc;

    fn make_state() -> AppState {
        AppState::build(&GatewayConfig::default(), Storage::in_memory())
    }

    async fn seed_user(state: &AppState, name: &str, role: Role) -> (User, String) {
        let user = User::new(
            name.to_string(),
            format!("{}@example.com", name.to_lowercase()),
            format!("+1555-{name}"),
            "hash".to_string(),
            role,
        );
        let Ok(()) = state.storage.users.insert(&user).await else {
            panic!("user insert failed");
        };
        let Ok(token) = state.tokens.issue(&user, Utc::now()) else {
            panic!("token issue failed");
        };
        (user, token)
    }

    fn parts_with_bearer(token: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let Ok(request) = builder.body(()) else {
            panic!("request build failed");
        };
        request.into_parts().0
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let state = make_state();
        let mut parts = parts_with_bearer(None);
        let result = Identity::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn valid_token_resolves_the_account() {
        let state = make_state();
        let (user, token) = seed_user(&state, "Dana", Role::User).await;
        let mut parts = parts_with_bearer(Some(&token));
        let Ok(Identity(resolved)) = Identity::from_request_parts(&mut parts, &state).await else {
            panic!("extraction failed");
        };
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn deleted_account_token_is_rejected() {
        let state = make_state();
        let (user, token) = seed_user(&state, "Dana", Role::User).await;
        let Ok(()) = state.storage.users.delete(user.id).await else {
            panic!("delete failed");
        };
        let mut parts = parts_with_bearer(Some(&token));
        let result = Identity::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn blocked_account_is_rejected_on_any_request() {
        let state = make_state();
        let (mut user, token) = seed_user(&state, "Dana", Role::User).await;
        user.is_blocked = true;
        let Ok(()) = state.storage.users.update(&user).await else {
            panic!("update failed");
        };
        let mut parts = parts_with_bearer(Some(&token));
        let result = Identity::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(ApiError::AccountBlocked)));
    }

    #[tokio::test]
    async fn vendor_gate_admits_vendors_and_admins_only() {
        let state = make_state();
        let (_, user_token) = seed_user(&state, "Plain", Role::User).await;
        let (_, vendor_token) =
            seed_user(&state, "Shop", Role::Vendor { approved: false }).await;
        let (_, admin_token) = seed_user(&state, "Root", Role::Admin).await;

        let mut parts = parts_with_bearer(Some(&user_token));
        let refused = VendorIdentity::from_request_parts(&mut parts, &state).await;
        assert!(matches!(refused, Err(ApiError::Forbidden(_))));

        let mut parts = parts_with_bearer(Some(&vendor_token));
        assert!(VendorIdentity::from_request_parts(&mut parts, &state)
            .await
            .is_ok());
        let mut parts = parts_with_bearer(Some(&admin_token));
        assert!(VendorIdentity::from_request_parts(&mut parts, &state)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn admin_gate_admits_admins_only() {
        let state = make_state();
        let (_, vendor_token) = seed_user(&state, "Shop", Role::Vendor { approved: true }).await;
        let (_, admin_token) = seed_user(&state, "Root", Role::Admin).await;

        let mut parts = parts_with_bearer(Some(&vendor_token));
        let refused = AdminIdentity::from_request_parts(&mut parts, &state).await;
        assert!(matches!(refused, Err(ApiError::Forbidden(_))));

        let mut parts = parts_with_bearer(Some(&admin_token));
        assert!(AdminIdentity::from_request_parts(&mut parts, &state)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn client_ip_prefers_forwarded_for() {
        let Ok(request) = Request::builder()
            .uri("/")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(())
        else {
            panic!("request build failed");
        };
        let (mut parts, ()) = request.into_parts();
        let Ok(ClientIp(ip)) = ClientIp::from_request_parts(&mut parts, &()).await;
        assert_eq!(ip, "203.0.113.7");
    }

    #[tokio::test]
    async fn client_ip_falls_back_to_unknown() {
        let mut parts = parts_with_bearer(None);
        let Ok(ClientIp(ip)) = ClientIp::from_request_parts(&mut parts, &()).await;
        assert_eq!(ip, "unknown");
    }
}
