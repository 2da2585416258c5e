use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use std::str::FromStr;
use validator::Validate;

use super::{default_admin, parse_id, Json, OptionalJson};
use crate::{
    errors::ServiceError,
    models::{Order, OrderStatus},
    services::{CancelActor, NewOrder},
    ApiResponse, AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    /// Restrict to one customer's orders
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFailedRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    #[serde(default = "default_admin")]
    #[validate(length(min = 1))]
    pub cancelled_by: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    #[validate(length(min = 1, message = "status is required"))]
    pub status: String,
}

fn parse_status(raw: &str) -> Result<OrderStatus, ServiceError> {
    OrderStatus::from_str(raw.trim())
        .map_err(|_| ServiceError::ValidationError(format!("Unknown order status: {raw}")))
}

/// Checkout: creates the order and fans out confirmations.
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<NewOrder>,
) -> Result<(StatusCode, Json<ApiResponse<Order>>), ServiceError> {
    let order = state.services.orders.create_order(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(order, "Order placed successfully")),
    ))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<ApiResponse<Vec<Order>>>, ServiceError> {
    let orders = match query.email.as_deref().filter(|e| !e.trim().is_empty()) {
        Some(email) => state.services.orders.list_customer_orders(email).await?,
        None => state.services.orders.list_orders().await?,
    };
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Order>>, ServiceError> {
    let order_id = parse_id(&id, "order id")?;
    let order = state.services.orders.get_order(order_id).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn track_order(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
) -> Result<Json<ApiResponse<Order>>, ServiceError> {
    let order = state
        .services
        .orders
        .find_by_tracking_id(tracking_id.trim())
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Customer self-service cancel; only pending orders qualify.
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OptionalJson(payload): OptionalJson<CancelOrderRequest>,
) -> Result<Json<ApiResponse<Order>>, ServiceError> {
    let order_id = parse_id(&id, "order id")?;
    let request = payload.unwrap_or_default();
    request.validate()?;

    let order = state
        .services
        .orders
        .cancel(order_id, request.reason, CancelActor::Customer)
        .await?;
    Ok(Json(ApiResponse::with_message(order, "Order cancelled successfully")))
}

pub async fn payment_failed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PaymentFailedRequest>,
) -> Result<Json<ApiResponse<Order>>, ServiceError> {
    let order_id = parse_id(&id, "order id")?;
    request.validate()?;

    let order = state
        .services
        .orders
        .cancel(
            order_id,
            request.reason,
            CancelActor::PaymentFailure {
                admin: request.cancelled_by,
            },
        )
        .await?;
    Ok(Json(ApiResponse::with_message(
        order,
        "Order cancelled due to payment failure",
    )))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<Order>>, ServiceError> {
    let order_id = parse_id(&id, "order id")?;
    request.validate()?;
    let status = parse_status(&request.status)?;

    let order = state.services.orders.update_status(order_id, status).await?;
    Ok(Json(ApiResponse::with_message(
        order,
        format!("Order status updated to {}", status),
    )))
}

/// Customer-facing order routes
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/track/:tracking_id", get(track_order))
        .route("/:id", get(get_order))
        .route("/:id/cancel", post(cancel_order))
}

/// Staff order routes, including the payment ledger
pub fn admin_order_routes() -> Router<AppState> {
    Router::new()
        .route("/:id/payment-failed", post(payment_failed))
        .route("/:id/status", put(update_order_status))
        .merge(super::payments::admin_payment_routes())
}
