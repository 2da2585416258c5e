mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

async fn create_coupon(app: &TestApp, body: Value) -> Value {
    let (status, created) = app
        .send(Method::POST, "/api/v1/admin/coupons", Some(body))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    created["data"].clone()
}

async fn validate(app: &TestApp, code: &str, cart_total: &str) -> Value {
    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/coupons/validate",
            Some(json!({ "code": code, "cartTotal": cart_total })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn percentage_discount_is_capped() {
    let app = TestApp::new().await;
    create_coupon(
        &app,
        json!({
            "code": "save10",
            "discountType": "percentage",
            "discountValue": "10",
            "maxDiscount": "30"
        }),
    )
    .await;

    let body = validate(&app, "SAVE10", "500").await;
    assert_eq!(body["data"]["valid"], true);
    assert_eq!(decimal(&body["data"]["discountAmount"]), dec!(30));

    let body = validate(&app, "save10", "200").await;
    assert_eq!(decimal(&body["data"]["discountAmount"]), dec!(20));
}

#[tokio::test]
async fn fixed_discount_never_exceeds_the_cart() {
    let app = TestApp::new().await;
    create_coupon(
        &app,
        json!({ "code": "FLAT100", "discountType": "fixed", "discountValue": "100" }),
    )
    .await;

    let body = validate(&app, "FLAT100", "80").await;
    assert_eq!(body["data"]["valid"], true);
    assert_eq!(decimal(&body["data"]["discountAmount"]), dec!(80));
}

#[tokio::test]
async fn rejections_carry_a_reason_and_succeed_at_the_transport_level() {
    let app = TestApp::new().await;
    create_coupon(
        &app,
        json!({
            "code": "BIGSPEND",
            "discountType": "fixed",
            "discountValue": "50",
            "minPurchase": "1000"
        }),
    )
    .await;
    create_coupon(
        &app,
        json!({
            "code": "OLD",
            "discountType": "fixed",
            "discountValue": "5",
            "expiryDate": "2020-01-01T00:00:00Z"
        }),
    )
    .await;

    let body = validate(&app, "BIGSPEND", "999").await;
    assert_eq!(body["data"]["valid"], false);
    assert!(body["data"]["reason"].as_str().unwrap().contains("Minimum purchase"));

    let body = validate(&app, "OLD", "100").await;
    assert_eq!(body["data"]["reason"], "Coupon has expired");

    let body = validate(&app, "NOPE", "100").await;
    assert_eq!(body["data"]["valid"], false);
    assert_eq!(body["data"]["reason"], "Invalid coupon code");
}

#[tokio::test]
async fn apply_ignores_inactive_coupons() {
    let app = TestApp::new().await;
    create_coupon(
        &app,
        json!({
            "code": "PAUSED",
            "discountType": "fixed",
            "discountValue": "5",
            "isActive": false
        }),
    )
    .await;

    let (_, body) = app
        .send(
            Method::POST,
            "/api/v1/coupons/apply",
            Some(json!({ "code": "PAUSED", "cartTotal": "100" })),
        )
        .await;
    assert_eq!(body["data"]["valid"], false);
    assert_eq!(body["data"]["reason"], "Invalid or inactive coupon code");

    // Without a cart total the minimum is not checked and nothing is computed
    create_coupon(
        &app,
        json!({
            "code": "LIVE",
            "discountType": "fixed",
            "discountValue": "5",
            "minPurchase": "500"
        }),
    )
    .await;
    let (_, body) = app
        .send(Method::POST, "/api/v1/coupons/apply", Some(json!({ "code": "LIVE" })))
        .await;
    assert_eq!(body["data"]["valid"], true);
    assert_eq!(decimal(&body["data"]["discountAmount"]), dec!(0));
}

#[tokio::test]
async fn usage_limit_exhausts_the_coupon() {
    let app = TestApp::new().await;
    let coupon = create_coupon(
        &app,
        json!({
            "code": "ONCE",
            "discountType": "fixed",
            "discountValue": "5",
            "usageLimit": 1
        }),
    )
    .await;
    let id = coupon["id"].as_str().unwrap();

    let (status, body) = app
        .send(Method::POST, &format!("/api/v1/admin/coupons/{id}/usage"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["usageCount"], 1);

    let body = validate(&app, "ONCE", "100").await;
    assert_eq!(body["data"]["reason"], "Coupon usage limit reached");
}

#[tokio::test]
async fn admin_maintenance_round_trip() {
    let app = TestApp::new().await;
    let coupon = create_coupon(
        &app,
        json!({ "code": "spring", "discountType": "percentage", "discountValue": "15" }),
    )
    .await;
    assert_eq!(coupon["code"], "SPRING");
    let id = coupon["id"].as_str().unwrap();

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/admin/coupons",
            Some(json!({ "code": "Spring", "discountType": "fixed", "discountValue": "1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app
        .send(
            Method::PUT,
            &format!("/api/v1/admin/coupons/{id}"),
            Some(json!({ "discountValue": "20", "isActive": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&updated["data"]["discountValue"]), dec!(20));
    assert_eq!(updated["data"]["isActive"], false);

    let (_, list) = app.send(Method::GET, "/api/v1/admin/coupons", None).await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);

    let (status, deleted) = app
        .send(Method::DELETE, &format!("/api/v1/admin/coupons/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["message"], "Coupon deleted");

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/v1/admin/coupons/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn percentage_above_one_hundred_is_rejected() {
    let app = TestApp::new().await;
    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/admin/coupons",
            Some(json!({
                "code": "TOOMUCH",
                "discountType": "percentage",
                "discountValue": "150"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn checkout_with_a_coupon_discounts_and_records_usage() {
    let app = TestApp::new().await;
    app.seed_product("rug", 3, dec!(500)).await;
    let coupon = create_coupon(
        &app,
        json!({
            "code": "SAVE10",
            "discountType": "percentage",
            "discountValue": "10",
            "maxDiscount": "30"
        }),
    )
    .await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "items": [{ "id": "rug", "name": "Rug", "price": "500", "quantity": 1 }],
                "shippingCharges": "40",
                "couponCode": "save10",
                "customerInfo": { "name": "Lin", "email": "lin@example.com" },
                "paymentMethod": "cod"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order = &body["data"];
    assert_eq!(decimal(&order["subtotal"]), dec!(500));
    assert_eq!(decimal(&order["discount"]), dec!(30));
    assert_eq!(decimal(&order["total"]), dec!(510));
    assert_eq!(order["couponCode"], "SAVE10");

    let (_, list) = app.send(Method::GET, "/api/v1/admin/coupons", None).await;
    let stored = list["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == coupon["id"])
        .cloned()
        .unwrap();
    assert_eq!(stored["usageCount"], 1);
}

#[tokio::test]
async fn checkout_with_an_invalid_coupon_is_refused_without_touching_stock() {
    let app = TestApp::new().await;
    app.seed_product("rug", 3, dec!(500)).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "items": [{ "id": "rug", "name": "Rug", "price": "500", "quantity": 1 }],
                "couponCode": "GHOST",
                "customerInfo": { "name": "Lin", "email": "lin@example.com" },
                "paymentMethod": "cod"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid or inactive coupon code"));
    assert_eq!(app.stock("rug").await, 3);
}

#[tokio::test]
async fn fixed_coupon_larger_than_the_cart_leaves_nothing_payable() {
    let app = TestApp::new().await;
    app.seed_product("card", 10, dec!(80)).await;
    create_coupon(
        &app,
        json!({ "code": "FLAT100", "discountType": "fixed", "discountValue": "100" }),
    )
    .await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "items": [{ "id": "card", "name": "Card", "price": "80", "quantity": 1 }],
                "couponCode": "flat100",
                "customerInfo": { "name": "Lin", "email": "lin@example.com" },
                "paymentMethod": "cod"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(decimal(&body["data"]["discount"]), dec!(80));
    assert_eq!(decimal(&body["data"]["total"]), dec!(0));
    assert_eq!(decimal(&body["data"]["amountDue"]), dec!(0));
}
