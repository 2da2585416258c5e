//! Outbound customer and staff notifications.
//!
//! Delivery is best-effort: [`NotificationDispatcher`] always returns a
//! [`DispatchOutcome`] and never raises, so a failed email or text message can
//! not undo the state transition that triggered it.

use serde::Serialize;
use std::sync::Arc;
use strum::Display;
use thiserror::Error;
use tracing::{info, instrument, warn};

pub mod email;
pub mod messages;
pub mod sms;
pub mod vendors;

pub use email::{
    is_valid_email, EmailOutcome, EmailProvider, EmailVendor, ProviderChain, ProviderRegistry,
    FALLBACK_EMAIL_VENDOR,
};
pub use sms::{TextMessageGateway, TwilioGateway, UnconfiguredGateway};

use crate::config::NotificationConfig;

/// Notification channel errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
    #[error("Notification not configured: {0}")]
    NotConfigured(String),
    #[error("{provider} rejected the message: {message}")]
    Rejected { provider: String, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum Channel {
    Email,
    TextMessage,
}

/// One message to deliver. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    pub channel: Channel,
    pub recipient: String,
    pub subject: Option<String>,
    pub body: String,
}

impl NotificationRequest {
    pub fn email(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        html: impl Into<String>,
    ) -> Self {
        Self {
            channel: Channel::Email,
            recipient: recipient.into(),
            subject: Some(subject.into()),
            body: html.into(),
        }
    }

    pub fn text(recipient: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            channel: Channel::TextMessage,
            recipient: recipient.into(),
            subject: None,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchOutcome {
    pub channel: Channel,
    pub recipient: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Staff contact points read from configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminContacts {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl AdminContacts {
    pub fn from_config(config: &NotificationConfig) -> Self {
        Self {
            email: config.admin_email.clone(),
            phone: config.admin_phone.clone(),
        }
    }
}

/// Fire-and-log delivery over email and text message.
#[derive(Clone)]
pub struct NotificationDispatcher {
    email: Arc<ProviderChain>,
    sms: Arc<dyn TextMessageGateway>,
    admin: AdminContacts,
}

impl NotificationDispatcher {
    pub fn new(
        email: ProviderChain,
        sms: Arc<dyn TextMessageGateway>,
        admin: AdminContacts,
    ) -> Self {
        Self {
            email: Arc::new(email),
            sms,
            admin,
        }
    }

    /// Builds vendor adapters and the text gateway from configuration.
    pub fn from_config(config: &NotificationConfig) -> Result<Self, NotificationError> {
        let registry = vendors::build_registry(config)?;
        let chain = ProviderChain::new(config.email_vendor, registry);
        if !chain.is_configured() {
            warn!(
                vendor = %config.email_vendor,
                "no email vendor credentials configured; emails will not be delivered"
            );
        }

        let sms: Arc<dyn TextMessageGateway> = match TwilioGateway::from_config(config)? {
            Some(gateway) => Arc::new(gateway),
            None => {
                info!("text message gateway not configured");
                Arc::new(UnconfiguredGateway)
            }
        };

        Ok(Self::new(chain, sms, AdminContacts::from_config(config)))
    }

    pub fn admin(&self) -> &AdminContacts {
        &self.admin
    }

    pub fn email_chain(&self) -> &ProviderChain {
        &self.email
    }

    /// Delivers one request. Never fails; the outcome carries the error.
    #[instrument(skip(self, request), fields(channel = %request.channel))]
    pub async fn dispatch(&self, request: NotificationRequest) -> DispatchOutcome {
        match request.channel {
            Channel::Email => {
                let subject = request.subject.as_deref().unwrap_or_default();
                let outcome = self
                    .email
                    .send_email(&request.recipient, subject, &request.body)
                    .await;
                DispatchOutcome {
                    channel: Channel::Email,
                    recipient: request.recipient,
                    success: outcome.success,
                    provider: outcome.provider.map(|p| p.to_string()),
                    error: outcome.error,
                }
            }
            Channel::TextMessage => {
                let result = self.sms.send(&request.recipient, &request.body).await;
                if let Err(err) = &result {
                    warn!(gateway = self.sms.name(), error = %err, "text message not delivered");
                }
                DispatchOutcome {
                    channel: Channel::TextMessage,
                    recipient: request.recipient,
                    success: result.is_ok(),
                    provider: Some(self.sms.name().to_string()),
                    error: result.err().map(|e| e.to_string()),
                }
            }
        }
    }

    /// Delivers requests one after another and logs a summary.
    pub async fn dispatch_all(
        &self,
        context: &str,
        requests: Vec<NotificationRequest>,
    ) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            outcomes.push(self.dispatch(request).await);
        }

        let failed = outcomes.iter().filter(|o| !o.success).count();
        if failed > 0 {
            warn!(
                context,
                sent = outcomes.len() - failed,
                failed,
                "notifications partially delivered"
            );
        } else {
            info!(context, sent = outcomes.len(), "notifications delivered");
        }
        outcomes
    }
}
