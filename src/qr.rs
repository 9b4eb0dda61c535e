//! QR rendering for issued coupons.
//!
//! The QR encodes a small JSON payload with the coupon id and expiry.
//! Vendors scan it and confirm the redemption through the API; the
//! payload itself grants nothing without a vendor token.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use qrcode::QrCode;
use qrcode::render::svg;
use serde::Serialize;

use crate::domain::{Coupon, CouponId};
use crate::error::ApiError;

#[derive(Serialize)]
struct QrPayload {
    coupon_id: CouponId,
    expires_at: DateTime<Utc>,
}

/// Renders a coupon's QR as an SVG data URL
/// (`data:image/svg+xml;base64,...`).
///
/// # Errors
///
/// Returns [`ApiError::Internal`] when the payload cannot be serialized
/// or does not fit a QR code.
pub fn coupon_qr_data_url(coupon: &Coupon) -> Result<String, ApiError> {
    let payload = serde_json::to_string(&QrPayload {
        coupon_id: coupon.id,
        expires_at: coupon.expires_at,
    })
    .map_err(|e| ApiError::Internal(format!("qr payload serialization failed: {e}")))?;

    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| ApiError::Internal(format!("qr encoding failed: {e}")))?;

    let image = code
        .render::<svg::Color<'_>>()
        .min_dimensions(240, 240)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();

    Ok(format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(image)
    ))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Offer, OfferDraft, UserId};
    use chrono::Duration;

    fn make_coupon() -> Coupon {
        let draft = OfferDraft {
            title: "Test offer".to_string(),
            description: "A test offer for qr rendering".to_string(),
            image_url: None,
            actual_price: 10.0,
            discounted_price: 8.0,
            coupon_price: 1.0,
            expiry_date: Utc::now() + Duration::days(7),
            max_redemptions: 10,
            category: "food".to_string(),
        };
        let offer = Offer::new(UserId::new(), draft);
        Coupon::issue(&offer, UserId::new(), Duration::seconds(300), Utc::now())
    }

    #[test]
    fn renders_svg_data_url() {
        let coupon = make_coupon();
        let Ok(url) = coupon_qr_data_url(&coupon) else {
            panic!("qr rendering failed");
        };
        assert!(url.starts_with("data:image/svg+xml;base64,"));
    }

    #[test]
    fn encoded_payload_is_valid_svg() {
        let coupon = make_coupon();
        let Ok(url) = coupon_qr_data_url(&coupon) else {
            panic!("qr rendering failed");
        };
        let encoded = url.trim_start_matches("data:image/svg+xml;base64,");
        let Ok(bytes) = STANDARD.decode(encoded) else {
            panic!("data url payload is not valid base64");
        };
        let svg_text = String::from_utf8_lossy(&bytes);
        assert!(svg_text.contains("<svg"));
    }

    #[test]
    fn same_coupon_renders_identically() {
        let coupon = make_coupon();
        let first = coupon_qr_data_url(&coupon).ok();
        let second = coupon_qr_data_url(&coupon).ok();
        assert!(first.is_some());
        assert_eq!(first, second);
    }
}
