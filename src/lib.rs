//! Storefront API Library
//!
//! Order, payment and notification lifecycle engine for a small storefront:
//! checkout, inventory reconciliation, coupons, the payment ledger and
//! best-effort customer/staff notifications, served over axum.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod notifications;
pub mod services;
pub mod store;
pub mod tracing;

use axum::{middleware, response::Json, Router};
use chrono::Utc;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::{
    notifications::NotificationDispatcher,
    services::{ServiceContainer, ServiceFactory},
    store::SharedStore,
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
    pub store: SharedStore,
    pub notifier: NotificationDispatcher,
    pub services: ServiceContainer,
}

impl AppState {
    /// Wires every service over the given store and dispatcher.
    pub fn new(
        config: config::AppConfig,
        store: SharedStore,
        notifier: NotificationDispatcher,
    ) -> Self {
        let factory = ServiceFactory::new(store.clone(), notifier.clone());
        Self {
            config,
            store,
            notifier,
            services: ServiceContainer::new(&factory),
        }
    }
}

// Common response wrappers
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/orders", handlers::orders::order_routes())
        .nest("/coupons", handlers::coupons::coupon_routes())
        .nest(
            "/custom-requests",
            handlers::custom_requests::custom_request_routes(),
        )
        .nest("/admin/orders", handlers::orders::admin_order_routes())
        .nest("/admin/coupons", handlers::coupons::admin_coupon_routes())
        .nest(
            "/admin/custom-requests",
            handlers::custom_requests::admin_custom_request_routes(),
        )
}

/// Full application router with request ids, tracing and CORS.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(handlers::health::health_routes())
        .nest("/api/v1", api_v1_routes())
        .layer(crate::tracing::http_trace_layer())
        .layer(middleware::from_fn(crate::tracing::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
