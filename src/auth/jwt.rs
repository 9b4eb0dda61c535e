//! Stateless bearer tokens (JWT, HS256).
//!
//! Tokens carry the account id and role label. The role in the token is
//! informational only: request extractors reload the account from
//! storage, so blocks and role changes take effect without waiting for
//! the token to expire.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::domain::{User, UserId};
use crate::error::ApiError;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Account id the token was issued to.
    pub sub: UserId,
    /// Role label at issuance time (`ADMIN`, `VENDOR` or `USER`).
    pub role: String,
    /// Issued-at, seconds since the UNIX epoch.
    pub iat: i64,
    /// Expiry, seconds since the UNIX epoch.
    pub exp: i64,
}

/// Signs and verifies access tokens with a shared HS256 secret.
#[derive(Clone)]
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenAuthority {
    /// Creates an authority from the shared secret and token lifetime.
    #[must_use]
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Issues a signed token for `user`, valid for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] when signing fails.
    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<String, ApiError> {
        let claims = AccessClaims {
            sub: user.id,
            role: user.role.label().to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
    }

    /// Verifies a token's signature and expiry and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] when the token is malformed,
    /// carries a bad signature or has expired.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, ApiError> {
        decode::<AccessClaims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| ApiError::Unauthorized("invalid or expired token".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::Role;

    fn make_user(role: Role) -> User {
        User::new(
            "Test User".to_string(),
            "test@example.com".to_string(),
            "+15550001111".to_string(),
            "hash".to_string(),
            role,
        )
    }

    #[test]
    fn issue_then_verify_round_trips_claims() {
        let authority = TokenAuthority::new("test-secret", 3600);
        let user = make_user(Role::User);
        let now = Utc::now();

        let Ok(token) = authority.issue(&user, now) else {
            panic!("token issuance failed");
        };
        let Ok(claims) = authority.verify(&token) else {
            panic!("verification failed");
        };

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, "USER");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let authority = TokenAuthority::new("test-secret", 3600);
        let user = make_user(Role::Admin);
        let Ok(token) = authority.issue(&user, Utc::now()) else {
            panic!("token issuance failed");
        };

        let mut tampered = token;
        tampered.pop();
        tampered.push('A');
        assert!(authority.verify(&tampered).is_err());
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let issuer = TokenAuthority::new("secret-a", 3600);
        let verifier = TokenAuthority::new("secret-b", 3600);
        let user = make_user(Role::User);
        let Ok(token) = issuer.issue(&user, Utc::now()) else {
            panic!("token issuance failed");
        };
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let authority = TokenAuthority::new("test-secret", 3600);
        let user = make_user(Role::User);
        // Issued two hours ago with a one hour TTL, well past the
        // validation leeway.
        let issued_at = Utc::now() - Duration::hours(2);
        let Ok(token) = authority.issue(&user, issued_at) else {
            panic!("token issuance failed");
        };
        assert!(authority.verify(&token).is_err());
    }

    #[test]
    fn vendor_claims_carry_vendor_label() {
        let authority = TokenAuthority::new("test-secret", 3600);
        let user = make_user(Role::Vendor { approved: false });
        let Ok(token) = authority.issue(&user, Utc::now()) else {
            panic!("token issuance failed");
        };
        let Ok(claims) = authority.verify(&token) else {
            panic!("verification failed");
        };
        assert_eq!(claims.role, "VENDOR");
    }
}
