use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use super::{parse_id, Json, OptionalJson};
use crate::{
    errors::ServiceError, models::CustomRequest, services::NewCustomRequest, ApiResponse,
    AppState,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub price: Decimal,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub approve: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ReasonRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

pub async fn submit_request(
    State(state): State<AppState>,
    Json(request): Json<NewCustomRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CustomRequest>>), ServiceError> {
    let created = state.services.custom_requests.submit(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(created, "Custom request submitted")),
    ))
}

pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CustomRequest>>, ServiceError> {
    let request_id = parse_id(&id, "request id")?;
    let request = state.services.custom_requests.get(request_id).await?;
    Ok(Json(ApiResponse::success(request)))
}

pub async fn respond_to_quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RespondRequest>,
) -> Result<Json<ApiResponse<CustomRequest>>, ServiceError> {
    let request_id = parse_id(&id, "request id")?;
    let request = state
        .services
        .custom_requests
        .respond(request_id, body.approve)
        .await?;
    Ok(Json(ApiResponse::success(request)))
}

pub async fn list_requests(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CustomRequest>>>, ServiceError> {
    let requests = state.services.custom_requests.list().await?;
    Ok(Json(ApiResponse::success(requests)))
}

pub async fn quote_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<QuoteRequest>,
) -> Result<Json<ApiResponse<CustomRequest>>, ServiceError> {
    let request_id = parse_id(&id, "request id")?;
    body.validate()?;
    let request = state
        .services
        .custom_requests
        .quote(request_id, body.price, body.notes)
        .await?;
    Ok(Json(ApiResponse::with_message(request, "Quote sent")))
}

pub async fn reject_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OptionalJson(payload): OptionalJson<ReasonRequest>,
) -> Result<Json<ApiResponse<CustomRequest>>, ServiceError> {
    let request_id = parse_id(&id, "request id")?;
    let body = payload.unwrap_or_default();
    body.validate()?;
    let request = state
        .services
        .custom_requests
        .reject(request_id, body.reason)
        .await?;
    Ok(Json(ApiResponse::with_message(request, "Custom request rejected")))
}

pub async fn cancel_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OptionalJson(payload): OptionalJson<ReasonRequest>,
) -> Result<Json<ApiResponse<CustomRequest>>, ServiceError> {
    let request_id = parse_id(&id, "request id")?;
    let body = payload.unwrap_or_default();
    body.validate()?;
    let request = state
        .services
        .custom_requests
        .cancel(request_id, body.reason)
        .await?;
    Ok(Json(ApiResponse::with_message(request, "Custom request cancelled")))
}

pub fn custom_request_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_request))
        .route("/:id", get(get_request))
        .route("/:id/respond", post(respond_to_quote))
}

pub fn admin_custom_request_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_requests))
        .route("/:id/quote", post(quote_request))
        .route("/:id/reject", post(reject_request))
        .route("/:id/cancel", post(cancel_request))
}
