#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use storefront_api::{
    build_router,
    config::AppConfig,
    models::Product,
    notifications::{
        AdminContacts, EmailProvider, EmailVendor, NotificationDispatcher, NotificationError,
        ProviderChain, ProviderRegistry, TextMessageGateway,
    },
    store::{InMemoryStore, SharedStore},
    AppState,
};
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "owner@shop.example";
pub const ADMIN_PHONE: &str = "+15550100";

#[derive(Debug, Clone, PartialEq)]
pub struct SentEmail {
    pub vendor: EmailVendor,
    pub to: String,
    pub subject: String,
}

/// Email vendor double that records every attempt and can be told to fail.
#[derive(Clone)]
pub struct RecordingEmail {
    vendor: EmailVendor,
    fail: bool,
    pub attempts: Arc<Mutex<Vec<SentEmail>>>,
}

impl RecordingEmail {
    pub fn new(vendor: EmailVendor) -> Self {
        Self {
            vendor,
            fail: false,
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(vendor: EmailVendor) -> Self {
        Self {
            fail: true,
            ..Self::new(vendor)
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailProvider for RecordingEmail {
    fn vendor(&self) -> EmailVendor {
        self.vendor
    }

    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<(), NotificationError> {
        self.attempts.lock().unwrap().push(SentEmail {
            vendor: self.vendor,
            to: to.to_string(),
            subject: subject.to_string(),
        });
        if self.fail {
            Err(NotificationError::Rejected {
                provider: self.vendor.to_string(),
                message: "503 service unavailable".into(),
            })
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Default)]
pub struct RecordingGateway {
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingGateway {
    pub fn recipients(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(to, _)| to.clone()).collect()
    }
}

#[async_trait]
impl TextMessageGateway for RecordingGateway {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, to: &str, body: &str) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok(())
    }
}

/// Router over an in-memory store with recording notification channels.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub store: SharedStore,
    pub emails: Vec<RecordingEmail>,
    pub texts: RecordingGateway,
}

impl TestApp {
    /// Working Resend vendor, admin email and phone configured.
    pub async fn new() -> Self {
        Self::with_email(EmailVendor::Resend, vec![RecordingEmail::new(EmailVendor::Resend)]).await
    }

    pub async fn with_email(primary: EmailVendor, providers: Vec<RecordingEmail>) -> Self {
        Self::build(
            primary,
            providers,
            AdminContacts {
                email: Some(ADMIN_EMAIL.to_string()),
                phone: Some(ADMIN_PHONE.to_string()),
            },
        )
        .await
    }

    pub async fn build(
        primary: EmailVendor,
        providers: Vec<RecordingEmail>,
        admin: AdminContacts,
    ) -> Self {
        let mut registry = ProviderRegistry::new();
        for provider in &providers {
            registry.register(Arc::new(provider.clone()));
        }
        let texts = RecordingGateway::default();
        let notifier = NotificationDispatcher::new(
            ProviderChain::new(primary, registry),
            Arc::new(texts.clone()),
            admin,
        );

        let store: SharedStore = Arc::new(InMemoryStore::new());
        let state = AppState::new(AppConfig::default(), store.clone(), notifier);

        Self {
            router: build_router(state.clone()),
            state,
            store,
            emails: providers,
            texts,
        }
    }

    pub async fn seed_product(&self, id: &str, stock: u32, price: Decimal) {
        self.state
            .services
            .inventory
            .put_product(&Product::new(id, id, stock, price))
            .await
            .expect("seed product");
    }

    pub async fn stock(&self, id: &str) -> u32 {
        self.state
            .services
            .inventory
            .get_product(id)
            .await
            .expect("load product")
            .expect("product exists")
            .stock
    }

    pub fn sent_emails(&self) -> Vec<SentEmail> {
        self.emails.iter().flat_map(|p| p.sent()).collect()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends a request and decodes the JSON envelope.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body).await;
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body bytes");
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}

/// Decimal fields travel as strings on the wire.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}
