use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use super::{parse_id, Json};
use crate::{
    errors::ServiceError,
    models::Coupon,
    services::{CouponUpdate, CouponValidation, NewCoupon},
    ApiResponse, AppState,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApplyCouponRequest {
    #[validate(length(min = 1, message = "Coupon code is required"))]
    pub code: String,
    pub cart_total: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponRequest {
    #[validate(length(min = 1, message = "Coupon code is required"))]
    pub code: String,
    pub cart_total: Decimal,
}

fn into_response(result: CouponValidation) -> Json<ApiResponse<CouponValidation>> {
    let message = if result.valid {
        "Coupon applied".to_string()
    } else {
        result
            .reason
            .clone()
            .unwrap_or_else(|| "Invalid coupon".to_string())
    };
    Json(ApiResponse::with_message(result, message))
}

/// Checkout-time validate-and-apply.
pub async fn apply_coupon(
    State(state): State<AppState>,
    Json(request): Json<ApplyCouponRequest>,
) -> Result<Json<ApiResponse<CouponValidation>>, ServiceError> {
    request.validate()?;
    let result = state
        .services
        .coupons
        .apply(&request.code, request.cart_total)
        .await?;
    Ok(into_response(result))
}

/// Cart pre-flight check.
pub async fn validate_coupon(
    State(state): State<AppState>,
    Json(request): Json<ValidateCouponRequest>,
) -> Result<Json<ApiResponse<CouponValidation>>, ServiceError> {
    request.validate()?;
    let result = state
        .services
        .coupons
        .validate(&request.code, request.cart_total)
        .await?;
    Ok(into_response(result))
}

pub async fn list_coupons(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Coupon>>>, ServiceError> {
    let coupons = state.services.coupons.list().await?;
    Ok(Json(ApiResponse::success(coupons)))
}

pub async fn create_coupon(
    State(state): State<AppState>,
    Json(request): Json<NewCoupon>,
) -> Result<(StatusCode, Json<ApiResponse<Coupon>>), ServiceError> {
    let coupon = state.services.coupons.create(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(coupon, "Coupon created")),
    ))
}

pub async fn update_coupon(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<CouponUpdate>,
) -> Result<Json<ApiResponse<Coupon>>, ServiceError> {
    let coupon_id = parse_id(&id, "coupon id")?;
    let coupon = state.services.coupons.update(coupon_id, request).await?;
    Ok(Json(ApiResponse::with_message(coupon, "Coupon updated")))
}

pub async fn delete_coupon(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    let coupon_id = parse_id(&id, "coupon id")?;
    state.services.coupons.delete(coupon_id).await?;
    Ok(Json(ApiResponse::message("Coupon deleted")))
}

pub async fn record_coupon_usage(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Coupon>>, ServiceError> {
    let coupon_id = parse_id(&id, "coupon id")?;
    let coupon = state.services.coupons.record_usage(coupon_id).await?;
    Ok(Json(ApiResponse::success(coupon)))
}

pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/apply", post(apply_coupon))
        .route("/validate", post(validate_coupon))
}

pub fn admin_coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_coupons).post(create_coupon))
        .route("/:id", put(update_coupon).delete(delete_coupon))
        .route("/:id/usage", post(record_coupon_usage))
}
