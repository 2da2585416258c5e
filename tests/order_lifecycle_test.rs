//! End-to-end order lifecycle over the HTTP surface:
//! checkout, status progression, customer and payment-failure cancellation.

mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, TestApp, ADMIN_EMAIL, ADMIN_PHONE};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn checkout(payment_method: &str) -> Value {
    json!({
        "items": [
            { "id": "mug", "name": "Mug", "price": "100", "quantity": 3 },
            { "id": "lamp", "name": "Lamp", "price": "50", "quantity": 1 }
        ],
        "customerInfo": {
            "name": "Asha",
            "email": "asha@example.com",
            "phone": "+15550001"
        },
        "paymentMethod": payment_method
    })
}

async fn seeded_app() -> TestApp {
    let app = TestApp::new().await;
    app.seed_product("mug", 5, dec!(100)).await;
    app.seed_product("lamp", 2, dec!(50)).await;
    app
}

async fn place_order(app: &TestApp, payment_method: &str) -> Value {
    let (status, body) = app
        .send(Method::POST, "/api/v1/orders", Some(checkout(payment_method)))
        .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {body}");
    body["data"].clone()
}

#[tokio::test]
async fn checkout_deducts_stock_and_totals_the_cart() {
    let app = seeded_app().await;
    let order = place_order(&app, "cod").await;

    assert_eq!(order["status"], "OrderPending");
    assert_eq!(decimal(&order["total"]), dec!(350));
    assert_eq!(order["paymentType"], "COD");
    assert_eq!(order["paymentStatus"], "Pending");
    assert_eq!(decimal(&order["amountDue"]), dec!(350));
    assert!(order["trackingId"].as_str().unwrap().starts_with("AV"));

    assert_eq!(app.stock("mug").await, 2);
    assert_eq!(app.stock("lamp").await, 1);
}

#[tokio::test]
async fn prepaid_order_is_marked_paid_at_checkout() {
    let app = seeded_app().await;
    let order = place_order(&app, "upi").await;

    assert_eq!(order["paymentType"], "Prepaid");
    assert_eq!(order["paymentStatus"], "Paid");
    assert_eq!(decimal(&order["amountPaid"]), dec!(350));
    assert_eq!(decimal(&order["amountDue"]), dec!(0));
}

#[tokio::test]
async fn checkout_notifies_customer_and_staff() {
    let app = seeded_app().await;
    place_order(&app, "cod").await;

    let recipients: Vec<String> = app.sent_emails().into_iter().map(|e| e.to).collect();
    assert_eq!(recipients, vec!["asha@example.com".to_string(), ADMIN_EMAIL.to_string()]);
    assert_eq!(
        app.texts.recipients(),
        vec!["+15550001".to_string(), ADMIN_PHONE.to_string()]
    );
}

#[tokio::test]
async fn checkout_succeeds_when_every_notification_fails() {
    let app = TestApp::with_email(
        storefront_api::notifications::EmailVendor::Resend,
        vec![common::RecordingEmail::failing(
            storefront_api::notifications::EmailVendor::Resend,
        )],
    )
    .await;
    app.seed_product("mug", 5, dec!(100)).await;
    app.seed_product("lamp", 2, dec!(50)).await;

    let order = place_order(&app, "cod").await;
    assert_eq!(order["status"], "OrderPending");
}

#[tokio::test]
async fn unknown_products_do_not_block_checkout() {
    let app = TestApp::new().await;
    app.seed_product("lamp", 2, dec!(50)).await;

    let order = place_order(&app, "cod").await;
    assert_eq!(decimal(&order["total"]), dec!(350));
    assert_eq!(app.stock("lamp").await, 1);
}

#[tokio::test]
async fn empty_cart_is_rejected() {
    let app = seeded_app().await;
    let mut cart = checkout("cod");
    cart["items"] = json!([]);

    let (status, body) = app.send(Method::POST, "/api/v1/orders", Some(cart)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(app.stock("mug").await, 5);
}

#[tokio::test]
async fn malformed_customer_email_is_rejected() {
    let app = seeded_app().await;
    let mut cart = checkout("cod");
    cart["customerInfo"]["email"] = json!("not-an-email");

    let (status, _) = app.send(Method::POST, "/api/v1/orders", Some(cart)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mistyped_body_is_reported_in_the_error_envelope() {
    let app = seeded_app().await;
    let mut cart = checkout("cod");
    cart["items"][0]["quantity"] = json!(-1);

    let (status, body) = app.send(Method::POST, "/api/v1/orders", Some(cart)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("quantity"));
    assert_eq!(app.stock("mug").await, 5);

    let order = place_order(&app, "cod").await;
    let id = order["id"].as_str().unwrap();
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/orders/{id}/cancel"),
            Some(json!({ "reason": 42 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    // Omitting the optional body entirely is still accepted
    let (status, body) = app
        .send(Method::POST, &format!("/api/v1/orders/{id}/cancel"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Cancelled");
}

#[tokio::test]
async fn status_progression_notifies_customer_only() {
    let app = seeded_app().await;
    let order = place_order(&app, "cod").await;
    let id = order["id"].as_str().unwrap();
    let before = app.sent_emails().len();

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/v1/admin/orders/{id}/status"),
            Some(json!({ "status": "OutForDelivery" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "OutForDelivery");
    assert!(body["data"]["lastStatusUpdate"].is_string());

    let new_emails: Vec<_> = app.sent_emails().into_iter().skip(before).collect();
    assert_eq!(new_emails.len(), 1);
    assert_eq!(new_emails[0].to, "asha@example.com");
}

#[tokio::test]
async fn unknown_status_value_is_rejected() {
    let app = seeded_app().await;
    let order = place_order(&app, "cod").await;
    let id = order["id"].as_str().unwrap();

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/v1/admin/orders/{id}/status"),
            Some(json!({ "status": "Teleported" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn customer_cancel_restores_stock() {
    let app = seeded_app().await;
    let order = place_order(&app, "cod").await;
    let id = order["id"].as_str().unwrap();

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/orders/{id}/cancel"),
            Some(json!({ "reason": "Changed my mind" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Cancelled");
    assert_eq!(body["data"]["cancelledBy"], "customer");
    assert_eq!(body["data"]["cancellationReason"], "Changed my mind");
    assert!(body["data"]["cancelledAt"].is_string());

    assert_eq!(app.stock("mug").await, 5);
    assert_eq!(app.stock("lamp").await, 2);
}

#[tokio::test]
async fn customer_cannot_cancel_an_order_in_transit() {
    let app = seeded_app().await;
    let order = place_order(&app, "cod").await;
    let id = order["id"].as_str().unwrap();
    app.send(
        Method::PUT,
        &format!("/api/v1/admin/orders/{id}/status"),
        Some(json!({ "status": "InTransit" })),
    )
    .await;

    let (status, body) = app
        .send(Method::POST, &format!("/api/v1/orders/{id}/cancel"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (_, current) = app.send(Method::GET, &format!("/api/v1/orders/{id}"), None).await;
    assert_eq!(current["data"]["status"], "InTransit");
    assert_eq!(app.stock("mug").await, 2);
}

#[tokio::test]
async fn payment_failure_cancel_works_from_any_live_status() {
    let app = seeded_app().await;
    let order = place_order(&app, "cod").await;
    let id = order["id"].as_str().unwrap();
    app.send(
        Method::PUT,
        &format!("/api/v1/admin/orders/{id}/status"),
        Some(json!({ "status": "InTransit" })),
    )
    .await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/admin/orders/{id}/payment-failed"),
            Some(json!({ "reason": "Card declined", "cancelledBy": "ops" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Cancelled");
    assert_eq!(body["data"]["cancelledBy"], "ops");
    assert_eq!(app.stock("mug").await, 5);
}

#[tokio::test]
async fn cancelled_orders_reject_every_further_transition() {
    let app = seeded_app().await;
    let order = place_order(&app, "cod").await;
    let id = order["id"].as_str().unwrap();
    app.send(Method::POST, &format!("/api/v1/orders/{id}/cancel"), None)
        .await;

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/v1/admin/orders/{id}/status"),
            Some(json!({ "status": "InTransit" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/v1/admin/orders/{id}/verify-payment"),
            Some(json!({ "verified": true })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/v1/admin/orders/{id}/payment-failed"),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(Method::POST, &format!("/api/v1/orders/{id}/cancel"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Stock was restored exactly once
    assert_eq!(app.stock("mug").await, 5);
}

#[tokio::test]
async fn missing_order_is_not_found() {
    let app = TestApp::new().await;
    let id = uuid::Uuid::new_v4();

    let (status, body) = app.send(Method::GET, &format!("/api/v1/orders/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("not found"));

    let (status, _) = app
        .send(Method::POST, &format!("/api/v1/orders/{id}/cancel"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_order_id_is_a_validation_error() {
    let app = TestApp::new().await;
    let (status, _) = app.send(Method::GET, "/api/v1/orders/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn orders_can_be_tracked_and_listed_newest_first() {
    let app = seeded_app().await;
    let first = place_order(&app, "cod").await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = place_order(&app, "upi").await;

    let tracking = first["trackingId"].as_str().unwrap();
    let (status, body) = app
        .send(Method::GET, &format!("/api/v1/orders/track/{tracking}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], first["id"]);

    let (_, list) = app.send(Method::GET, "/api/v1/orders", None).await;
    let ids: Vec<&Value> = list["data"].as_array().unwrap().iter().map(|o| &o["id"]).collect();
    assert_eq!(ids, vec![&second["id"], &first["id"]]);

    let (_, mine) = app
        .send(Method::GET, "/api/v1/orders?email=ASHA@example.com", None)
        .await;
    assert_eq!(mine["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn responses_carry_the_request_id() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, &format!("/api/v1/orders/{}", uuid::Uuid::new_v4()), None)
        .await;
    assert!(response.headers().contains_key("x-request-id"));
}
