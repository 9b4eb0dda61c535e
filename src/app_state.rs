//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use chrono::Duration;

use crate::auth::TokenAuthority;
use crate::config::GatewayConfig;
use crate::domain::LoginThrottle;
use crate::service::{
    AdminService, AuthService, CouponService, HmacPaymentGateway, OfferService, PaymentGateway,
    PaymentService, SimulatedSms, SmsSender,
};
use crate::storage::Storage;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Storage bundle, used directly by the identity extractors.
    pub storage: Storage,
    /// Token signer/verifier for bearer auth.
    pub tokens: TokenAuthority,
    /// Registration, OTP and login flows.
    pub auth: AuthService,
    /// Offer publication and listings.
    pub offers: OfferService,
    /// Coupon issuance and redemption.
    pub coupons: CouponService,
    /// Payment-backed issuance.
    pub payments: PaymentService,
    /// Administrative operations.
    pub admin: AdminService,
    /// Whether the fixed-credential bootstrap logins are enabled.
    pub bootstrap_accounts: bool,
}

impl AppState {
    /// Wires the full service stack over `storage` from configuration.
    #[must_use]
    pub fn build(config: &GatewayConfig, storage: Storage) -> Self {
        let tokens = TokenAuthority::new(&config.jwt_secret, config.jwt_ttl_secs);
        let throttle = Arc::new(LoginThrottle::new(
            config.login_max_attempts,
            Duration::seconds(config.login_window_secs),
        ));
        let sms: Arc<dyn SmsSender> = Arc::new(SimulatedSms);
        let gateway: Arc<dyn PaymentGateway> = Arc::new(HmacPaymentGateway::new(
            &config.payment_key_id,
            &config.payment_key_secret,
            &config.payment_currency,
        ));

        let auth = AuthService::new(
            storage.clone(),
            tokens.clone(),
            sms,
            throttle,
            config.otp_ttl_secs,
        );
        let offers = OfferService::new(storage.clone());
        let coupons = CouponService::new(storage.clone(), config.coupon_ttl_secs);
        let payments = PaymentService::new(storage.clone(), gateway, coupons.clone());
        let admin = AdminService::new(storage.clone(), config.default_admin_email.clone());

        Self {
            storage,
            tokens,
            auth,
            offers,
            coupons,
            payments,
            admin,
            bootstrap_accounts: config.bootstrap_accounts,
        }
    }
}
