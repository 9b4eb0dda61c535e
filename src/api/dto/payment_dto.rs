//! Payment DTOs: order creation and gateway callback verification.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::OfferId;
use crate::service::PaymentOrder;

/// Request body for opening a payment order against a paid offer.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// Offer whose coupon is being purchased.
    pub offer_id: OfferId,
}

/// Gateway order handed to the client for checkout.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderView {
    /// Gateway order identifier.
    pub order_id: String,
    /// Amount in minor currency units.
    pub amount: i64,
    /// ISO currency code.
    pub currency: String,
    /// Public gateway key the client checks out with.
    pub key_id: String,
}

impl From<PaymentOrder> for OrderView {
    fn from(order: PaymentOrder) -> Self {
        Self {
            order_id: order.order_id,
            amount: order.amount,
            currency: order.currency,
            key_id: order.key_id,
        }
    }
}

/// Response wrapper for a freshly opened order.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    /// The gateway order.
    pub order: OrderView,
}

/// Request body for verifying a completed checkout.
///
/// The signature must be the gateway's HMAC over `"{order_id}|{payment_id}"`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyPaymentRequest {
    /// Offer the order was opened for.
    pub offer_id: OfferId,
    /// Gateway order identifier returned at order creation.
    #[validate(length(min = 1))]
    pub order_id: String,
    /// Gateway payment identifier from the completed checkout.
    #[validate(length(min = 1))]
    pub payment_id: String,
    /// Hex-encoded HMAC signature.
    #[validate(length(min = 1))]
    pub signature: String,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn empty_signature_is_rejected() {
        let request = VerifyPaymentRequest {
            offer_id: OfferId::new(),
            order_id: "order_abc".to_string(),
            payment_id: "pay_123".to_string(),
            signature: String::new(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn order_view_exposes_checkout_fields() {
        let view = OrderView::from(PaymentOrder {
            order_id: "order_abc".to_string(),
            amount: 250,
            currency: "USD".to_string(),
            key_id: "key_test".to_string(),
        });
        let Ok(json) = serde_json::to_value(&view) else {
            panic!("serialization failed");
        };
        assert_eq!(json.get("amount").and_then(serde_json::Value::as_i64), Some(250));
        assert_eq!(json.get("currency").and_then(|v| v.as_str()), Some("USD"));
    }
}
