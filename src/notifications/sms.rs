use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{vendors::http_client, NotificationError};
use crate::config::NotificationConfig;

/// Single outbound text-message gateway.
#[async_trait]
pub trait TextMessageGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, to: &str, body: &str) -> Result<(), NotificationError>;
}

/// Stand-in used when no gateway credentials are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredGateway;

#[async_trait]
impl TextMessageGateway for UnconfiguredGateway {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    async fn send(&self, _to: &str, _body: &str) -> Result<(), NotificationError> {
        Err(NotificationError::NotConfigured(
            "text message gateway credentials missing".into(),
        ))
    }
}

/// Twilio-compatible gateway: form POST with HTTP basic auth.
#[derive(Clone)]
pub struct TwilioGateway {
    client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioGateway {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
        }
    }

    /// `None` when any credential is missing.
    pub fn from_config(config: &NotificationConfig) -> Result<Option<Self>, NotificationError> {
        let (Some(sid), Some(token), Some(from)) = (
            config.sms_account_sid.as_ref(),
            config.sms_auth_token.as_ref(),
            config.sms_from_number.as_ref(),
        ) else {
            return Ok(None);
        };

        Ok(Some(Self::new(
            http_client(config.http_timeout())?,
            config.sms_base_url.clone(),
            sid.clone(),
            token.clone(),
            from.clone(),
        )))
    }
}

#[async_trait]
impl TextMessageGateway for TwilioGateway {
    fn name(&self) -> &'static str {
        "twilio"
    }

    #[instrument(skip(self, body))]
    async fn send(&self, to: &str, body: &str) -> Result<(), NotificationError> {
        if to.trim().is_empty() {
            return Err(NotificationError::InvalidRecipient(to.into()));
        }

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            self.account_sid
        );
        let response = self
            .client
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(%status, "text message accepted");
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(NotificationError::Rejected {
                provider: self.name().to_string(),
                message: format!("{status}: {message}"),
            })
        }
    }
}
