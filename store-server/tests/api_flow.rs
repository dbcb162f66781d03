//! End-to-end API tests against the assembled router
//!
//! Provider adapters are replaced with scripted mocks; everything else
//! (router, handlers, orchestrator, stores, rate fallback) is real.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use shared::models::order::{Order, ShippingLabel};
use store_server::address::{AddressError, AddressLookup, ResolvedAddress};
use store_server::core::{Config, ServerState};
use store_server::notify::MemoryNotificationStore;
use store_server::orders::MemoryOrderStore;
use store_server::payment::{
    CardInstrument, ChargeReceipt, ChargeStatus, PaymentError, PaymentGateway,
};
use store_server::shipping::{ShippingError, ShippingGateway, TrackingInfo, simulated_label};
use tower::ServiceExt;

/// Payment mock: charges come back pending, status queries are
/// scripted per test
struct MockPayment {
    status: Mutex<Option<ChargeStatus>>,
}

impl MockPayment {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(None),
        })
    }

    fn script_status(&self, status: ChargeStatus) {
        *self.status.lock().unwrap() = Some(status);
    }
}

#[async_trait]
impl PaymentGateway for MockPayment {
    async fn create_charge(
        &self,
        order: &Order,
        _card: Option<&CardInstrument>,
    ) -> Result<ChargeReceipt, PaymentError> {
        Ok(ChargeReceipt {
            charge_id: format!("chg-{}", order.id),
            redirect_url: Some("https://pay.example/checkout".into()),
            status: shared::PaymentStatus::Pending,
            detail: None,
        })
    }

    async fn charge_status(&self, _charge_id: &str) -> Result<ChargeStatus, PaymentError> {
        self.status
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| PaymentError::Transient("status not scripted".into()))
    }
}

struct MockShipping;

#[async_trait]
impl ShippingGateway for MockShipping {
    async fn create_label(&self, order: &Order) -> Result<ShippingLabel, ShippingError> {
        Ok(simulated_label(order))
    }

    async fn track(&self, _tracking_code: &str) -> Result<TrackingInfo, ShippingError> {
        Ok(store_server::shipping::simulated_tracking())
    }
}

struct MockAddress;

#[async_trait]
impl AddressLookup for MockAddress {
    async fn resolve(&self, postal_code: &str) -> Result<ResolvedAddress, AddressError> {
        Ok(ResolvedAddress {
            postal_code: postal_code.to_string(),
            street: "Av. Paulista".into(),
            district: "Bela Vista".into(),
            city: "São Paulo".into(),
            state: "SP".into(),
        })
    }
}

fn test_app() -> (Router, Arc<MockPayment>) {
    let mut config = Config::from_env();
    // Placeholder credential: the estimator uses the local fallback
    // table, so tests never touch the network
    config.super_frete_token = "SUA_API_KEY_AQUI".into();
    let payment = MockPayment::new();
    let state = ServerState::with_services(
        config,
        Arc::new(MemoryOrderStore::new()),
        Arc::new(MemoryNotificationStore::new()),
        payment.clone(),
        Arc::new(MockShipping),
        Arc::new(MockAddress),
    );
    (store_server::api::router(state), payment)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(json) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn checkout_body(buyer_id: &str) -> Value {
    json!({
        "buyer": { "id": buyer_id, "email": "buyer@example.com", "name": "Buyer" },
        "items": [
            { "product_id": "p1", "name": "Coffee mug", "unit_price": 49.90, "quantity": 2, "weight_kg": 0.4 }
        ],
        "address": {
            "postal_code": "01310-100",
            "number": "1000"
        },
        "payment_method": "pix"
    })
}

#[tokio::test]
async fn full_order_lifecycle_through_the_api() {
    let (app, payment) = test_app();

    // Checkout
    let (status, body) = send(&app, "POST", "/api/checkout", Some(checkout_body("u1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "E0000");
    let order_id = body["data"]["order_id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], "pending_payment");
    assert_eq!(
        body["data"]["redirect_url"],
        "https://pay.example/checkout"
    );

    // The order is queryable, address enriched, totals consistent
    let (status, body) = send(&app, "GET", &format!("/api/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let order = &body["data"];
    assert_eq!(order["shipping_address"]["city"], "São Paulo");
    assert_eq!(order["subtotal"], 99.80);
    assert_eq!(order["shipping"]["estimated"], true);

    // Payment approval arrives via webhook; the authoritative status
    // comes from the charge re-query
    payment.script_status(ChargeStatus {
        status: shared::PaymentStatus::Approved,
        detail: Some("accredited".into()),
        amount: order["total"].as_f64(),
        order_ref: Some(order_id.clone()),
    });
    let hook = json!({ "type": "payment", "data": { "id": format!("chg-{order_id}") } });
    let (status, _) = send(&app, "POST", "/api/webhooks/payment", Some(hook.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", &format!("/api/orders/{order_id}"), None).await;
    assert_eq!(body["data"]["status"], "shipping_created");
    assert_eq!(body["data"]["payment_status"], "approved");
    assert_eq!(body["data"]["label"]["simulated"], true);

    // Duplicate approval webhook changes nothing
    let (status, _) = send(&app, "POST", "/api/webhooks/payment", Some(hook)).await;
    assert_eq!(status, StatusCode::OK);

    // Carrier dispatch and delivery
    for (event, expected) in [
        ("shipment.dispatched", "shipped"),
        ("shipment.delivered", "delivered"),
    ] {
        let hook = json!({ "event": event, "data": { "order_id": order_id } });
        let (status, _) = send(&app, "POST", "/api/webhooks/shipping", Some(hook)).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, "GET", &format!("/api/orders/{order_id}"), None).await;
        assert_eq!(body["data"]["status"], expected);
    }

    // A late duplicate dispatch is acknowledged but dropped
    let late = json!({ "event": "shipment.dispatched", "data": { "order_id": order_id } });
    let (status, _) = send(&app, "POST", "/api/webhooks/shipping", Some(late)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, "GET", &format!("/api/orders/{order_id}"), None).await;
    assert_eq!(body["data"]["status"], "delivered");

    // Customer notifications were emitted for both transitions
    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/notifications?order_id={order_id}"),
        None,
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    // Buyer order listing includes it
    let (_, body) = send(&app, "GET", "/api/orders/?user_id=u1", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_cart_is_a_400() {
    let (app, _) = test_app();
    let mut body = checkout_body("u2");
    body["items"] = json!([]);
    let (status, body) = send(&app, "POST", "/api/checkout", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "E0002");
}

#[tokio::test]
async fn malformed_postal_code_is_a_400() {
    let (app, _) = test_app();
    let mut body = checkout_body("u3");
    body["address"]["postal_code"] = json!("12345678901");
    let (status, _) = send(&app, "POST", "/api/checkout", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_order_is_a_404() {
    let (app, _) = test_app();
    let (status, body) = send(&app, "GET", "/api/orders/ORD-NOPE", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "E0003");
}

#[tokio::test]
async fn rate_quotes_always_answer_for_valid_input() {
    let (app, _) = test_app();
    let body = json!({ "postal_code": "01310-100", "weight_kg": 0.3, "declared_value": 50.0 });
    let (status, body) = send(&app, "POST", "/api/rates/quote", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    let quotes = body["data"].as_array().unwrap();
    assert!(!quotes.is_empty());
    assert!(quotes.iter().all(|q| q["estimated"] == true));

    let bad = json!({ "postal_code": "12", "weight_kg": 0.3, "declared_value": 50.0 });
    let (status, _) = send(&app, "POST", "/api/rates/quote", Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_shipping_events_are_acknowledged() {
    let (app, _) = test_app();
    let hook = json!({ "event": "shipment.arrived_at_hub", "data": { "order_id": "ORD-X" } });
    let (status, body) = send(&app, "POST", "/api/webhooks/shipping", Some(hook)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Ignored");
}

#[tokio::test]
async fn checkout_rate_limit_kicks_in() {
    let (app, _) = test_app();
    let mut last = StatusCode::OK;
    for _ in 0..6 {
        let (status, _) = send(&app, "POST", "/api/checkout", Some(checkout_body("burst"))).await;
        last = status;
    }
    assert_eq!(last, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn health_reports_providers() {
    let (app, _) = test_app();
    let (status, body) = send(&app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["payment_provider"].is_string());
}
