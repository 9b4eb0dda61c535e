//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Storage backend selection is driven
//! by `DATABASE_URL`: when set the gateway runs on PostgreSQL, otherwise
//! it falls back to the in-memory store.

use std::net::SocketAddr;

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// PostgreSQL connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    pub database_max_connections: u32,

    /// Minimum idle connections in the pool.
    pub database_min_connections: u32,

    /// Timeout in seconds for acquiring a database connection.
    pub database_connect_timeout_secs: u64,

    /// Secret used to sign and verify JWT access tokens.
    pub jwt_secret: String,

    /// Access-token lifetime in seconds.
    pub jwt_ttl_secs: i64,

    /// Registration OTP lifetime in seconds.
    pub otp_ttl_secs: i64,

    /// Issued-coupon lifetime in seconds.
    pub coupon_ttl_secs: i64,

    /// Failed login attempts allowed per identifier inside the window.
    pub login_max_attempts: u32,

    /// Login throttle window in seconds.
    pub login_window_secs: i64,

    /// Public key id reported to clients when creating payment orders.
    pub payment_key_id: String,

    /// Secret for HMAC-SHA256 payment signature verification.
    pub payment_key_secret: String,

    /// ISO 4217 currency code for payment orders.
    pub payment_currency: String,

    /// Email (bootstrap identifier) of the protected default
    /// administrator account. Role, block and delete operations on this
    /// account are refused.
    pub default_admin_email: String,

    /// Whether to upsert the fixed dev accounts at startup and expose
    /// the bootstrap-login endpoints.
    pub bootstrap_accounts: bool,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()?;

        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let database_max_connections = parse_env("DATABASE_MAX_CONNECTIONS", 10);
        let database_min_connections = parse_env("DATABASE_MIN_CONNECTIONS", 2);
        let database_connect_timeout_secs = parse_env("DATABASE_CONNECT_TIMEOUT_SECS", 5);

        let jwt_secret = std::env::var("JWT_SECRET")
            .unwrap_or_else(|_| "offeyr-dev-secret-change-me".to_string());
        let jwt_ttl_secs = parse_env("JWT_TTL_SECS", 7 * 24 * 3600);

        let otp_ttl_secs = parse_env("OTP_TTL_SECS", 600);
        let coupon_ttl_secs = parse_env("COUPON_TTL_SECS", 300);

        let login_max_attempts = parse_env("LOGIN_MAX_ATTEMPTS", 10);
        let login_window_secs = parse_env("LOGIN_WINDOW_SECS", 15 * 60);

        let payment_key_id =
            std::env::var("PAYMENT_KEY_ID").unwrap_or_else(|_| "key_offeyr_dev".to_string());
        let payment_key_secret = std::env::var("PAYMENT_KEY_SECRET")
            .unwrap_or_else(|_| "offeyr-payment-dev-secret".to_string());
        let payment_currency =
            std::env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "USD".to_string());

        let default_admin_email =
            std::env::var("DEFAULT_ADMIN_EMAIL").unwrap_or_else(|_| "admin".to_string());

        let bootstrap_accounts = parse_env_bool("BOOTSTRAP_ACCOUNTS", true);

        Ok(Self {
            listen_addr,
            database_url,
            database_max_connections,
            database_min_connections,
            database_connect_timeout_secs,
            jwt_secret,
            jwt_ttl_secs,
            otp_ttl_secs,
            coupon_ttl_secs,
            login_max_attempts,
            login_window_secs,
            payment_key_id,
            payment_key_secret,
            payment_currency,
            default_admin_email,
            bootstrap_accounts,
        })
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: std::net::SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: None,
            database_max_connections: 10,
            database_min_connections: 2,
            database_connect_timeout_secs: 5,
            jwt_secret: "offeyr-dev-secret-change-me".to_string(),
            jwt_ttl_secs: 7 * 24 * 3600,
            otp_ttl_secs: 600,
            coupon_ttl_secs: 300,
            login_max_attempts: 10,
            login_window_secs: 15 * 60,
            payment_key_id: "key_offeyr_dev".to_string(),
            payment_key_secret: "offeyr-payment-dev-secret".to_string(),
            payment_currency: "USD".to_string(),
            default_admin_email: "admin".to_string(),
            bootstrap_accounts: true,
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).map(|v| v.to_ascii_lowercase()).ok().as_deref() {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}
