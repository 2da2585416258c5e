use axum::{
    extract::{Path, State},
    routing::post,
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use super::{default_admin, parse_id, Json, OptionalJson};
use crate::{
    errors::ServiceError, models::Order, services::PaymentInput, ApiResponse, AppState,
};

fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount > Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("amount");
        err.message = Some("Payment amount must be greater than zero".into());
        Err(err)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    #[validate(custom = "validate_amount")]
    pub amount: Decimal,
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub method: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub note: String,
    #[serde(default = "default_admin")]
    pub recorded_by: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MarkPaidRequest {
    #[serde(default = "default_method")]
    #[validate(length(min = 1))]
    pub method: String,
    #[serde(default = "default_admin")]
    pub recorded_by: String,
}

impl Default for MarkPaidRequest {
    fn default() -> Self {
        Self {
            method: default_method(),
            recorded_by: default_admin(),
        }
    }
}

fn default_method() -> String {
    "cash".to_string()
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub verified: bool,
    #[serde(default = "default_admin")]
    #[validate(length(min = 1))]
    pub verified_by: String,
}

pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<Json<ApiResponse<Order>>, ServiceError> {
    let order_id = parse_id(&id, "order id")?;
    request.validate()?;

    let order = state
        .services
        .payments
        .record_payment(
            order_id,
            PaymentInput {
                amount: request.amount,
                method: request.method,
                note: request.note,
                recorded_by: request.recorded_by,
            },
        )
        .await?;
    Ok(Json(ApiResponse::with_message(order, "Payment recorded successfully")))
}

pub async fn mark_paid(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OptionalJson(payload): OptionalJson<MarkPaidRequest>,
) -> Result<Json<ApiResponse<Order>>, ServiceError> {
    let order_id = parse_id(&id, "order id")?;
    let request = payload.unwrap_or_default();
    request.validate()?;

    let order = state
        .services
        .payments
        .mark_fully_paid(order_id, &request.method, &request.recorded_by)
        .await?;
    Ok(Json(ApiResponse::with_message(order, "Order marked as fully paid")))
}

pub async fn verify_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<ApiResponse<Order>>, ServiceError> {
    let order_id = parse_id(&id, "order id")?;
    request.validate()?;

    let order = state
        .services
        .payments
        .verify_payment(order_id, request.verified, &request.verified_by)
        .await?;
    Ok(Json(ApiResponse::with_message(order, "Payment verification updated")))
}

/// Mounted under the admin order routes
pub fn admin_payment_routes() -> Router<AppState> {
    Router::new()
        .route("/:id/payments", post(record_payment))
        .route("/:id/mark-paid", post(mark_paid))
        .route("/:id/verify-payment", post(verify_payment))
}
