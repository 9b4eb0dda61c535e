//! Account lifecycle: registration, OTP verification, login, bootstrap
//! accounts and the per-user activity feed.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;
use serde_json::json;

use crate::auth::{TokenAuthority, hash_password, verify_password};
use crate::domain::{AuditAction, AuditEntry, LoginThrottle, Role, User, UserId};
use crate::error::ApiError;
use crate::storage::Storage;

use super::notify::{OtpDispatch, SmsSender};
use super::record_audit;

/// Which fixed development account a bootstrap login targets.
///
/// Credentials are the account name twice (`admin`/`admin` and so on).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapKind {
    /// The `admin`/`admin` account.
    Admin,
    /// The `user`/`user` account.
    User,
    /// The `vendor`/`vendor` account (pre-approved).
    Vendor,
}

impl BootstrapKind {
    const fn fixed_identifier(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::Vendor => "vendor",
        }
    }

    fn role(self) -> Role {
        match self {
            Self::Admin => Role::Admin,
            Self::User => Role::User,
            Self::Vendor => Role::Vendor { approved: true },
        }
    }

    const fn phone_prefix(self) -> &'static str {
        match self {
            Self::Admin => "+1998",
            Self::User => "+9197",
            Self::Vendor => "+9196",
        }
    }

    const fn action(self) -> AuditAction {
        match self {
            Self::Admin => AuditAction::AdminBootstrapLogin,
            Self::User => AuditAction::UserBootstrapLogin,
            Self::Vendor => AuditAction::VendorBootstrapLogin,
        }
    }
}

/// Registration, OTP and login orchestration.
#[derive(Debug, Clone)]
pub struct AuthService {
    storage: Storage,
    tokens: TokenAuthority,
    sms: Arc<dyn SmsSender>,
    throttle: Arc<LoginThrottle>,
    otp_ttl: Duration,
}

impl AuthService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        storage: Storage,
        tokens: TokenAuthority,
        sms: Arc<dyn SmsSender>,
        throttle: Arc<LoginThrottle>,
        otp_ttl_secs: i64,
    ) -> Self {
        Self {
            storage,
            tokens,
            sms,
            throttle,
            otp_ttl: Duration::seconds(otp_ttl_secs),
        }
    }

    /// Registers a new account and dispatches its OTP challenge.
    ///
    /// The very first account in the system becomes ADMIN; every later
    /// registration is a plain USER. Returns the stored account and, in
    /// simulation mode, the OTP code to echo back to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EmailOrPhoneTaken`] when either contact field
    /// is already in use, or a storage/hashing error.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        phone: &str,
        password: &str,
        ip: &str,
    ) -> Result<(User, Option<String>), ApiError> {
        let name = name.trim().to_string();
        let email = email.trim().to_lowercase();
        let phone = phone.trim().to_string();

        let role = if self.storage.users.count().await? == 0 {
            Role::Admin
        } else {
            Role::User
        };

        let code = generate_otp_code();
        let mut user = User::new(name, email, phone, hash_password(password)?, role);
        user.set_otp(code.clone(), Utc::now() + self.otp_ttl);
        self.storage.users.insert(&user).await?;

        let dispatch = self.sms.send_otp(&user.phone, &code).await?;
        record_audit(
            &self.storage,
            Some(user.id),
            AuditAction::Register,
            ip,
            Some(json!({ "role_assigned": user.role.label() })),
        )
        .await;

        tracing::info!(user_id = %user.id, role = user.role.label(), "account registered");
        let echo = (dispatch == OtpDispatch::Simulation).then_some(code);
        Ok((user, echo))
    }

    /// Verifies a pending OTP challenge and clears it.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::OtpNotFound`] when the account or its
    /// challenge is missing, [`ApiError::OtpExpired`] past the TTL and
    /// [`ApiError::OtpMismatch`] on a wrong code.
    pub async fn verify_otp(&self, email: &str, code: &str, ip: &str) -> Result<(), ApiError> {
        let email = email.trim().to_lowercase();
        let mut user = self
            .storage
            .users
            .by_email(&email)
            .await?
            .ok_or(ApiError::OtpNotFound)?;
        let challenge = user.otp.as_ref().ok_or(ApiError::OtpNotFound)?;

        if challenge.is_expired(Utc::now()) {
            return Err(ApiError::OtpExpired);
        }
        if challenge.code != code {
            return Err(ApiError::OtpMismatch);
        }

        user.mark_otp_verified();
        self.storage.users.update(&user).await?;
        record_audit(&self.storage, Some(user.id), AuditAction::OtpVerified, ip, None).await;
        Ok(())
    }

    /// Regenerates an account's OTP challenge with a fresh TTL.
    ///
    /// Returns the new code when running in simulation mode.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::OtpNotFound`] for an unknown email, so the
    /// endpoint does not reveal which addresses have accounts.
    pub async fn resend_otp(&self, email: &str, ip: &str) -> Result<Option<String>, ApiError> {
        let email = email.trim().to_lowercase();
        let mut user = self
            .storage
            .users
            .by_email(&email)
            .await?
            .ok_or(ApiError::OtpNotFound)?;

        let code = generate_otp_code();
        user.set_otp(code.clone(), Utc::now() + self.otp_ttl);
        self.storage.users.update(&user).await?;

        let dispatch = self.sms.send_otp(&user.phone, &code).await?;
        record_audit(&self.storage, Some(user.id), AuditAction::OtpResent, ip, None).await;

        Ok((dispatch == OtpDispatch::Simulation).then_some(code))
    }

    /// Authenticates by email or name and issues an access token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::TooManyLoginAttempts`] past the throttle
    /// allowance, [`ApiError::InvalidCredentials`] for an unknown
    /// identifier or wrong password, [`ApiError::AccountBlocked`] for a
    /// blocked account and [`ApiError::OtpNotVerified`] while the OTP
    /// challenge is still pending.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        ip: &str,
    ) -> Result<(String, User), ApiError> {
        let now = Utc::now();
        self.throttle.check_and_record(identifier, now).await?;

        let user = self
            .storage
            .users
            .by_identifier(identifier)
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

        if user.is_blocked {
            return Err(ApiError::AccountBlocked);
        }
        if user.otp.is_some() && !user.otp_verified {
            return Err(ApiError::OtpNotVerified);
        }
        if !verify_password(password, &user.password_hash) {
            return Err(ApiError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user, now)?;
        record_audit(&self.storage, Some(user.id), AuditAction::Login, ip, None).await;
        tracing::info!(user_id = %user.id, "login");
        Ok((token, user))
    }

    /// Fixed-credential development login; upserts the account first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidCredentials`] unless both fields equal
    /// the fixed identifier for `kind`.
    pub async fn bootstrap_login(
        &self,
        kind: BootstrapKind,
        identifier: &str,
        password: &str,
        ip: &str,
    ) -> Result<(String, User), ApiError> {
        let fixed = kind.fixed_identifier();
        if identifier != fixed || password != fixed {
            return Err(ApiError::InvalidCredentials);
        }

        let user = self.upsert_fixed_account(kind).await?;
        let token = self.tokens.issue(&user, Utc::now())?;
        record_audit(&self.storage, Some(user.id), kind.action(), ip, None).await;
        tracing::info!(user_id = %user.id, account = fixed, "bootstrap login");
        Ok((token, user))
    }

    /// Upserts all three fixed development accounts.
    ///
    /// Run at startup when bootstrap accounts are enabled; idempotent.
    ///
    /// # Errors
    ///
    /// Returns a storage or hashing error.
    pub async fn ensure_default_accounts(&self) -> Result<(), ApiError> {
        for kind in [BootstrapKind::Admin, BootstrapKind::User, BootstrapKind::Vendor] {
            let user = self.upsert_fixed_account(kind).await?;
            tracing::info!(user_id = %user.id, account = kind.fixed_identifier(), "default account ready");
        }
        Ok(())
    }

    /// Latest audit entries for one account, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] on backend failure.
    pub async fn recent_activity(&self, user_id: UserId) -> Result<Vec<AuditEntry>, ApiError> {
        self.storage.audit.for_user(user_id, 100).await
    }

    async fn upsert_fixed_account(&self, kind: BootstrapKind) -> Result<User, ApiError> {
        let identifier = kind.fixed_identifier();
        let hashed = hash_password(identifier)?;
        let now = Utc::now();

        if let Some(mut user) = self.storage.users.by_identifier(identifier).await? {
            user.name = identifier.to_string();
            user.email = identifier.to_string();
            user.password_hash = hashed;
            user.role = kind.role();
            user.is_blocked = false;
            user.otp = None;
            user.otp_verified = true;
            user.updated_at = now;
            self.storage.users.update(&user).await?;
            return Ok(user);
        }

        let phone = format!(
            "{}{:07}",
            kind.phone_prefix(),
            now.timestamp_millis().rem_euclid(10_000_000)
        );
        let mut user = User::new(
            identifier.to_string(),
            identifier.to_string(),
            phone,
            hashed,
            kind.role(),
        );
        user.otp_verified = true;
        self.storage.users.insert(&user).await?;
        Ok(user)
    }
}

/// Six-digit OTP code.
fn generate_otp_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}
