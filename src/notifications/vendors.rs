//! Email vendor adapters. Each one translates `(to, subject, html)` into the
//! vendor's own transport and reports any non-success as an error.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use super::email::{EmailProvider, EmailVendor, ProviderRegistry};
use super::NotificationError;
use crate::config::NotificationConfig;

/// Shared HTTP client with the configured request timeout.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, NotificationError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

async fn check_response(
    vendor: EmailVendor,
    response: reqwest::Response,
) -> Result<(), NotificationError> {
    let status = response.status();
    if status.is_success() {
        debug!(%vendor, %status, "vendor accepted email");
        return Ok(());
    }
    let message = response.text().await.unwrap_or_default();
    Err(NotificationError::Rejected {
        provider: vendor.to_string(),
        message: format!("{status}: {message}"),
    })
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Resend: JSON body with bearer token.
pub struct ResendProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    from: String,
}

impl ResendProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }
}

#[async_trait]
impl EmailProvider for ResendProvider {
    fn vendor(&self) -> EmailVendor {
        EmailVendor::Resend
    }

    #[instrument(skip(self, html))]
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "/emails"))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [to],
                "subject": subject,
                "html": html,
            }))
            .send()
            .await?;
        check_response(self.vendor(), response).await
    }
}

/// SendGrid v3 mail send: JSON body with bearer token.
pub struct SendGridProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    from: String,
}

impl SendGridProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }
}

#[async_trait]
impl EmailProvider for SendGridProvider {
    fn vendor(&self) -> EmailVendor {
        EmailVendor::SendGrid
    }

    #[instrument(skip(self, html))]
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "/v3/mail/send"))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "personalizations": [{ "to": [{ "email": to }] }],
                "from": { "email": self.from },
                "subject": subject,
                "content": [{ "type": "text/html", "value": html }],
            }))
            .send()
            .await?;
        check_response(self.vendor(), response).await
    }
}

/// Mailgun messages API: form body with basic auth as `api:<key>`.
pub struct MailgunProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    domain: String,
    from: String,
}

impl MailgunProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        domain: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            domain: domain.into(),
            from: from.into(),
        }
    }
}

#[async_trait]
impl EmailProvider for MailgunProvider {
    fn vendor(&self) -> EmailVendor {
        EmailVendor::Mailgun
    }

    #[instrument(skip(self, html))]
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), NotificationError> {
        let url = endpoint(&self.base_url, &format!("/v3/{}/messages", self.domain));
        let response = self
            .client
            .post(url)
            .basic_auth("api", Some(&self.api_key))
            .form(&[
                ("from", self.from.as_str()),
                ("to", to),
                ("subject", subject),
                ("html", html),
            ])
            .send()
            .await?;
        check_response(self.vendor(), response).await
    }
}

/// Plain SMTP relay over STARTTLS.
pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpProvider {
    pub fn new(
        host: &str,
        port: u16,
        credentials: Option<(String, String)>,
        from: &str,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| NotificationError::Transport(e.to_string()))?
            .port(port)
            .timeout(Some(timeout));
        if let Some((username, password)) = credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }
        let from = from
            .parse::<Mailbox>()
            .map_err(|e| NotificationError::Transport(format!("invalid sender address: {e}")))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    fn vendor(&self) -> EmailVendor {
        EmailVendor::Smtp
    }

    #[instrument(skip(self, html))]
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), NotificationError> {
        let recipient = to
            .parse::<Mailbox>()
            .map_err(|_| NotificationError::InvalidRecipient(to.to_string()))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::Rejected {
                provider: EmailVendor::Smtp.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}

/// Registers every vendor whose credentials are present.
pub fn build_registry(config: &NotificationConfig) -> Result<ProviderRegistry, NotificationError> {
    let client = http_client(config.http_timeout())?;
    let mut registry = ProviderRegistry::new();

    if let Some(key) = &config.resend_api_key {
        registry.register(Arc::new(ResendProvider::new(
            client.clone(),
            config.resend_base_url.clone(),
            key.clone(),
            config.email_from.clone(),
        )));
    }

    if let Some(key) = &config.sendgrid_api_key {
        registry.register(Arc::new(SendGridProvider::new(
            client.clone(),
            config.sendgrid_base_url.clone(),
            key.clone(),
            config.email_from.clone(),
        )));
    }

    if let (Some(key), Some(domain)) = (&config.mailgun_api_key, &config.mailgun_domain) {
        registry.register(Arc::new(MailgunProvider::new(
            client.clone(),
            config.mailgun_base_url.clone(),
            key.clone(),
            domain.clone(),
            config.email_from.clone(),
        )));
    }

    if let Some(host) = &config.smtp_host {
        let credentials = config
            .smtp_username
            .clone()
            .zip(config.smtp_password.clone());
        registry.register(Arc::new(SmtpProvider::new(
            host,
            config.smtp_port,
            credentials,
            &config.email_from,
            config.http_timeout(),
        )?));
    }

    Ok(registry)
}
