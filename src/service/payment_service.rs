//! Payment-backed coupon issuance.
//!
//! Order creation and signature verification sit behind
//! [`PaymentGateway`] so the gateway vendor stays swappable. The
//! shipped [`HmacPaymentGateway`] mints order ids locally and checks an
//! HMAC-SHA256 proof over `"{order_id}|{payment_id}"`; a real provider
//! client implements the same trait.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::Rng;
use serde_json::json;
use sha2::Sha256;

use crate::domain::{AuditAction, Coupon, OfferId, User};
use crate::error::ApiError;
use crate::storage::Storage;

use super::{record_audit, CouponService};

type HmacSha256 = Hmac<Sha256>;

/// A payment order handed to the client for checkout.
#[derive(Debug, Clone)]
pub struct PaymentOrder {
    /// Gateway order identifier.
    pub order_id: String,
    /// Amount due, in minor currency units.
    pub amount: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Public key id the client checkout needs.
    pub key_id: String,
}

/// Order creation and payment-proof verification.
#[async_trait]
pub trait PaymentGateway: Send + Sync + fmt::Debug {
    /// Creates an order over `amount_minor` minor currency units.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] when the gateway cannot create
    /// the order.
    async fn create_order(&self, amount_minor: i64) -> Result<PaymentOrder, ApiError>;

    /// Checks the payment proof for an order.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidSignature`] when the proof does not
    /// match.
    fn verify_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), ApiError>;
}

/// Local gateway: random order ids, HMAC-SHA256 signatures.
#[derive(Clone)]
pub struct HmacPaymentGateway {
    key_id: String,
    secret: String,
    currency: String,
}

impl HmacPaymentGateway {
    /// Creates a gateway signing with `secret`.
    #[must_use]
    pub fn new(key_id: &str, secret: &str, currency: &str) -> Self {
        Self {
            key_id: key_id.to_string(),
            secret: secret.to_string(),
            currency: currency.to_string(),
        }
    }

    /// Produces the hex signature a successful checkout would return.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] when the secret is rejected by the
    /// MAC implementation.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> Result<String, ApiError> {
        let mut mac = self.mac()?;
        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn mac(&self) -> Result<HmacSha256, ApiError> {
        HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| ApiError::Internal(format!("payment secret rejected: {e}")))
    }
}

impl fmt::Debug for HmacPaymentGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacPaymentGateway")
            .field("key_id", &self.key_id)
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PaymentGateway for HmacPaymentGateway {
    async fn create_order(&self, amount_minor: i64) -> Result<PaymentOrder, ApiError> {
        let nonce: [u8; 12] = rand::thread_rng().r#gen();
        Ok(PaymentOrder {
            order_id: format!("order_{}", hex::encode(nonce)),
            amount: amount_minor,
            currency: self.currency.clone(),
            key_id: self.key_id.clone(),
        })
    }

    fn verify_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), ApiError> {
        let expected = hex::decode(signature).map_err(|_| ApiError::InvalidSignature)?;
        let mut mac = self.mac()?;
        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| ApiError::InvalidSignature)
    }
}

/// Sells coupons: order first, verified payment proof second.
#[derive(Debug, Clone)]
pub struct PaymentService {
    storage: Storage,
    gateway: Arc<dyn PaymentGateway>,
    coupons: CouponService,
}

impl PaymentService {
    /// Creates the service around a gateway and the issuing service.
    #[must_use]
    pub fn new(storage: Storage, gateway: Arc<dyn PaymentGateway>, coupons: CouponService) -> Self {
        Self {
            storage,
            gateway,
            coupons,
        }
    }

    /// Creates a payment order over an offer's coupon price.
    ///
    /// The offer must be available and under its redemption cap; a
    /// sold-out offer is refused here rather than after the customer
    /// has paid.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::OfferUnavailable`] for a missing, inactive or
    /// expired offer, [`ApiError::RedemptionLimitReached`] at the cap
    /// and [`ApiError::Internal`] when the gateway fails.
    pub async fn create_order(
        &self,
        user: &User,
        offer_id: OfferId,
        ip: &str,
    ) -> Result<PaymentOrder, ApiError> {
        let now = Utc::now();
        let offer = self
            .storage
            .offers
            .by_id(offer_id)
            .await?
            .filter(|offer| offer.is_available(now))
            .ok_or(ApiError::OfferUnavailable)?;
        let redeemed = self.storage.coupons.count_redeemed(offer.id).await?;
        if redeemed >= u64::from(offer.max_redemptions) {
            return Err(ApiError::RedemptionLimitReached);
        }

        let order = self
            .gateway
            .create_order(minor_units(offer.coupon_price))
            .await?;
        record_audit(
            &self.storage,
            Some(user.id),
            AuditAction::PaymentOrderCreated,
            ip,
            Some(json!({
                "offer_id": offer.id,
                "order_id": order.order_id,
                "amount": order.amount,
            })),
        )
        .await;

        tracing::info!(offer_id = %offer.id, order_id = %order.order_id, "payment order created");
        Ok(order)
    }

    /// Verifies a payment proof and issues the coupon.
    ///
    /// Issuance re-checks availability and the cap; a payment against an
    /// offer that sold out in the meantime fails without a coupon.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidSignature`] on a bad proof, otherwise
    /// the issuance errors of [`CouponService::issue`].
    pub async fn verify_and_issue(
        &self,
        user: &User,
        offer_id: OfferId,
        order_id: &str,
        payment_id: &str,
        signature: &str,
        ip: &str,
    ) -> Result<(Coupon, String), ApiError> {
        self.gateway
            .verify_signature(order_id, payment_id, signature)?;

        let issued = self.coupons.issue(user, offer_id, ip).await?;
        record_audit(
            &self.storage,
            Some(user.id),
            AuditAction::PaymentVerified,
            ip,
            Some(json!({
                "offer_id": offer_id,
                "order_id": order_id,
                "payment_id": payment_id,
            })),
        )
        .await;

        tracing::info!(offer_id = %offer_id, order_id, "payment verified, coupon issued");
        Ok(issued)
    }
}

/// Converts a major-unit price to minor units (cents).
#[allow(clippy::cast_possible_truncation)]
fn minor_units(price: f64) -> i64 {
    (price * 100.0).round() as i64
}
