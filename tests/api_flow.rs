//! End-to-end API flows over the in-memory backend.

#![allow(clippy::unwrap_used, clippy::panic, clippy::indexing_slicing)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;

use offeyr_gateway::api;
use offeyr_gateway::app_state::AppState;
use offeyr_gateway::config::GatewayConfig;
use offeyr_gateway::service::HmacPaymentGateway;
use offeyr_gateway::storage::Storage;

fn test_app() -> Router {
    test_app_with(GatewayConfig::default())
}

fn test_app_with(config: GatewayConfig) -> Router {
    let state = AppState::build(&config, Storage::in_memory());
    Router::new().merge(api::build_router()).with_state(state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn offer_payload(coupon_price: f64) -> Value {
    json!({
        "title": "Half-price espresso",
        "description": "Any espresso drink at half price.",
        "actual_price": 6.0,
        "discounted_price": 3.0,
        "coupon_price": coupon_price,
        "expiry_date": (Utc::now() + Duration::days(7)).to_rfc3339(),
        "max_redemptions": 5,
        "category": "coffee",
    })
}

async fn bootstrap_token(app: &Router, kind: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        &format!("/api/auth/{kind}-bootstrap-login"),
        None,
        Some(json!({ "email": kind, "password": kind })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{kind} bootstrap login: {body}");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_service_metadata() {
    let app = test_app();

    let (status, body) = send(&app, "GET", "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "offeyr-gateway");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn full_marketplace_flow() {
    let app = test_app();

    // A pre-approved vendor publishes an offer.
    let vendor_token = bootstrap_token(&app, "vendor").await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/vendor/offers",
        Some(&vendor_token),
        Some(offer_payload(0.0)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let offer_id = body["offer"]["id"].as_str().unwrap().to_string();

    // A user registers and receives a simulated OTP.
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Asha",
            "email": "asha@example.com",
            "phone": "+15550123456",
            "password": "correct-horse-battery",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let otp = body["otp_simulation"].as_str().unwrap().to_string();

    // Login is refused while the OTP challenge is pending.
    let credentials = json!({
        "identifier": "asha@example.com",
        "password": "correct-horse-battery",
    });
    let (status, _) = send(&app, "POST", "/api/auth/login", None, Some(credentials.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Verifying the code unlocks login.
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/verify-otp",
        None,
        Some(json!({ "email": "asha@example.com", "otp": otp })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", "/api/auth/login", None, Some(credentials)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let user_token = body["token"].as_str().unwrap().to_string();

    // The published offer is browsable with its vendor details.
    let (status, body) = send(
        &app,
        "GET",
        "/api/user/offers?category=coffee",
        Some(&user_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["offers"].as_array().unwrap().len(), 1);
    assert_eq!(body["offers"][0]["vendor_name"], "vendor");

    // The user claims a coupon and gets a QR code.
    let (status, body) = send(
        &app,
        "POST",
        "/api/user/redeem",
        Some(&user_token),
        Some(json!({ "offer_id": offer_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["coupon"]["status"], "ACTIVE");
    let coupon_id = body["coupon"]["coupon_id"].as_str().unwrap().to_string();
    let qr = body["coupon"]["qr_code"].as_str().unwrap();
    assert!(qr.starts_with("data:image/svg+xml;base64,"));

    // The vendor confirms the presented coupon once.
    let (status, body) = send(
        &app,
        "POST",
        "/api/vendor/confirm-redemption",
        Some(&vendor_token),
        Some(json!({ "coupon_id": coupon_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Coupon redeemed successfully");
    assert_eq!(body["coupon"]["status"], "REDEEMED");

    // A second confirmation of the same coupon fails.
    let (status, _) = send(
        &app,
        "POST",
        "/api/vendor/confirm-redemption",
        Some(&vendor_token),
        Some(json!({ "coupon_id": coupon_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The user's wallet shows the coupon as redeemed.
    let (status, body) = send(&app, "GET", "/api/user/coupons", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["coupons"][0]["status"], "REDEEMED");
    assert_eq!(body["coupons"][0]["offer_title"], "Half-price espresso");

    // The user's activity log recorded both lifecycle events.
    let (status, body) = send(&app, "GET", "/api/user/logs", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = body["logs"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|entry| entry["action"].as_str())
        .collect();
    assert!(actions.contains(&"COUPON_GENERATED"));
    assert!(actions.contains(&"COUPON_REDEEMED"));
}

#[tokio::test]
async fn paid_offers_require_a_valid_gateway_signature() {
    let app = test_app();
    let config = GatewayConfig::default();

    let vendor_token = bootstrap_token(&app, "vendor").await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/vendor/offers",
        Some(&vendor_token),
        Some(offer_payload(2.5)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let offer_id = body["offer"]["id"].as_str().unwrap().to_string();

    let user_token = bootstrap_token(&app, "user").await;

    // The order is priced in minor currency units.
    let (status, body) = send(
        &app,
        "POST",
        "/api/user/create-payment-order",
        Some(&user_token),
        Some(json!({ "offer_id": offer_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["order"]["amount"], 250);
    assert_eq!(body["order"]["currency"], "USD");
    let order_id = body["order"]["order_id"].as_str().unwrap().to_string();

    // A tampered signature issues nothing.
    let (status, _) = send(
        &app,
        "POST",
        "/api/user/verify-payment",
        Some(&user_token),
        Some(json!({
            "offer_id": offer_id,
            "order_id": order_id,
            "payment_id": "pay_test_1",
            "signature": "deadbeef",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, "GET", "/api/user/coupons", Some(&user_token), None).await;
    assert_eq!(body["coupons"].as_array().unwrap().len(), 0);

    // The genuine gateway signature issues the coupon.
    let gateway = HmacPaymentGateway::new(
        &config.payment_key_id,
        &config.payment_key_secret,
        &config.payment_currency,
    );
    let signature = gateway.sign(&order_id, "pay_test_1").unwrap();
    let (status, body) = send(
        &app,
        "POST",
        "/api/user/verify-payment",
        Some(&user_token),
        Some(json!({
            "offer_id": offer_id,
            "order_id": order_id,
            "payment_id": "pay_test_1",
            "signature": signature,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["coupon"]["status"], "ACTIVE");
}

#[tokio::test]
async fn missing_or_bad_tokens_are_rejected() {
    let app = test_app();

    let (status, body) = send(&app, "GET", "/api/user/coupons", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], 1003);

    let (status, _) = send(&app, "GET", "/api/user/coupons", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn role_gates_are_enforced() {
    let app = test_app();
    let user_token = bootstrap_token(&app, "user").await;

    let (status, body) = send(&app, "GET", "/api/admin/users", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], 1004);

    let (status, _) = send(&app, "GET", "/api/vendor/offers", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin_token = bootstrap_token(&app, "admin").await;
    let (status, _) = send(&app, "GET", "/api/admin/users", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_csv_export_is_an_attachment() {
    let app = test_app();
    let admin_token = bootstrap_token(&app, "admin").await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/admin/export/csv")
        .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/csv"));
    assert!(disposition.contains("redemptions.csv"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with("coupon_id,user_email,vendor_email,offer_title,redeemed_at,ip"));
}

#[tokio::test]
async fn bootstrap_logins_can_be_disabled() {
    let config = GatewayConfig {
        bootstrap_accounts: false,
        ..GatewayConfig::default()
    };
    let app = test_app_with(config);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/vendor-bootstrap-login",
        None,
        Some(json!({ "email": "vendor", "password": "vendor" })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], 1004);
}

#[tokio::test]
async fn offer_validation_rejects_bad_payloads() {
    let app = test_app();
    let vendor_token = bootstrap_token(&app, "vendor").await;

    let mut payload = offer_payload(0.0);
    payload["title"] = json!("ab");
    let (status, body) = send(
        &app,
        "POST",
        "/api/vendor/offers",
        Some(&vendor_token),
        Some(payload),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1001);
}
