use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{error, info, instrument, warn};

use super::NotificationError;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Syntactic `local@domain.tld` check performed before any delivery attempt.
pub fn is_valid_email(address: &str) -> bool {
    EMAIL_PATTERN.is_match(address)
}

/// Closed set of interchangeable email vendors.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EmailVendor {
    #[default]
    Resend,
    #[serde(rename = "sendgrid")]
    #[strum(serialize = "sendgrid")]
    SendGrid,
    Mailgun,
    Smtp,
}

/// Vendor retried whenever the configured vendor fails.
pub const FALLBACK_EMAIL_VENDOR: EmailVendor = EmailVendor::Resend;

/// One email vendor adapter.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailProvider: Send + Sync {
    fn vendor(&self) -> EmailVendor;

    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), NotificationError>;
}

/// Providers keyed by vendor. Vendors without credentials are simply absent.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<EmailVendor, Arc<dyn EmailProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn EmailProvider>) {
        self.providers.insert(provider.vendor(), provider);
    }

    pub fn with(mut self, provider: Arc<dyn EmailProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, vendor: EmailVendor) -> Option<Arc<dyn EmailProvider>> {
        self.providers.get(&vendor).cloned()
    }

    pub fn contains(&self, vendor: EmailVendor) -> bool {
        self.providers.contains_key(&vendor)
    }
}

/// Result of one `send_email` call, after failover.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailOutcome {
    pub success: bool,
    /// Vendor that delivered the message, when one did
    pub provider: Option<EmailVendor>,
    pub attempts: u8,
    pub error: Option<String>,
}

impl EmailOutcome {
    fn delivered(provider: EmailVendor, attempts: u8) -> Self {
        Self {
            success: true,
            provider: Some(provider),
            attempts,
            error: None,
        }
    }

    fn failed(attempts: u8, error: impl Into<String>) -> Self {
        Self {
            success: false,
            provider: None,
            attempts,
            error: Some(error.into()),
        }
    }
}

/// Primary vendor plus automatic failover to [`FALLBACK_EMAIL_VENDOR`].
///
/// At most two attempts are made per message: the primary, then the fallback
/// once. When the primary is the fallback vendor there is a single attempt.
#[derive(Clone)]
pub struct ProviderChain {
    primary: EmailVendor,
    fallback: EmailVendor,
    registry: ProviderRegistry,
}

impl ProviderChain {
    pub fn new(primary: EmailVendor, registry: ProviderRegistry) -> Self {
        Self {
            primary,
            fallback: FALLBACK_EMAIL_VENDOR,
            registry,
        }
    }

    pub fn primary(&self) -> EmailVendor {
        self.primary
    }

    pub fn fallback(&self) -> EmailVendor {
        self.fallback
    }

    /// True when at least one vendor of the chain can be attempted.
    pub fn is_configured(&self) -> bool {
        self.registry.contains(self.primary) || self.registry.contains(self.fallback)
    }

    async fn attempt(
        &self,
        vendor: EmailVendor,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<(), NotificationError> {
        let provider = self
            .registry
            .get(vendor)
            .ok_or_else(|| NotificationError::NotConfigured(format!("email vendor {vendor}")))?;
        provider.send(to, subject, html).await
    }

    #[instrument(skip(self, html), fields(primary = %self.primary))]
    pub async fn send_email(&self, to: &str, subject: &str, html: &str) -> EmailOutcome {
        if !is_valid_email(to) {
            warn!(recipient = to, "refusing to send email to malformed address");
            return EmailOutcome::failed(
                0,
                NotificationError::InvalidRecipient(to.into()).to_string(),
            );
        }

        let primary_err = match self.attempt(self.primary, to, subject, html).await {
            Ok(()) => {
                info!(vendor = %self.primary, "email delivered");
                return EmailOutcome::delivered(self.primary, 1);
            }
            Err(err) => err,
        };

        if self.primary == self.fallback {
            error!(vendor = %self.primary, error = %primary_err, "email delivery failed");
            return EmailOutcome::failed(1, primary_err.to_string());
        }

        warn!(
            vendor = %self.primary,
            fallback = %self.fallback,
            error = %primary_err,
            "primary email vendor failed, retrying through fallback"
        );

        match self.attempt(self.fallback, to, subject, html).await {
            Ok(()) => {
                info!(vendor = %self.fallback, "email delivered through fallback");
                EmailOutcome::delivered(self.fallback, 2)
            }
            Err(fallback_err) => {
                error!(
                    primary_error = %primary_err,
                    fallback_error = %fallback_err,
                    "email delivery failed on every vendor"
                );
                EmailOutcome::failed(
                    2,
                    format!("primary: {primary_err}; fallback: {fallback_err}"),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    fn mock_provider(
        vendor: EmailVendor,
        calls: usize,
        ok: bool,
    ) -> Arc<dyn EmailProvider> {
        let mut mock = MockEmailProvider::new();
        mock.expect_vendor().return_const(vendor);
        mock.expect_send().times(calls).returning(move |_, _, _| {
            if ok {
                Ok(())
            } else {
                Err(NotificationError::Rejected {
                    provider: vendor.to_string(),
                    message: "503 unavailable".into(),
                })
            }
        });
        Arc::new(mock)
    }

    #[rstest]
    #[case("buyer@example.com", true)]
    #[case("first.last@mail.example.co", true)]
    #[case("no-at-sign.example.com", false)]
    #[case("missing@tld", false)]
    #[case("spaces in@example.com", false)]
    #[case("", false)]
    fn email_syntax(#[case] address: &str, #[case] valid: bool) {
        assert_eq!(is_valid_email(address), valid);
    }

    #[test]
    fn vendor_names_parse_case_insensitively() {
        assert_eq!(EmailVendor::from_str("SendGrid").unwrap(), EmailVendor::SendGrid);
        assert_eq!(EmailVendor::from_str("smtp").unwrap(), EmailVendor::Smtp);
        assert_eq!(EmailVendor::SendGrid.to_string(), "sendgrid");
        assert!(EmailVendor::from_str("carrier-pigeon").is_err());
    }

    #[tokio::test]
    async fn primary_success_makes_single_attempt() {
        let registry = ProviderRegistry::new()
            .with(mock_provider(EmailVendor::SendGrid, 1, true))
            .with(mock_provider(EmailVendor::Resend, 0, true));
        let chain = ProviderChain::new(EmailVendor::SendGrid, registry);

        let outcome = chain.send_email("a@b.co", "Hi", "<p>Hi</p>").await;
        assert!(outcome.success);
        assert_eq!(outcome.provider, Some(EmailVendor::SendGrid));
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn primary_failure_falls_back_exactly_once() {
        let registry = ProviderRegistry::new()
            .with(mock_provider(EmailVendor::Mailgun, 1, false))
            .with(mock_provider(EmailVendor::Resend, 1, true));
        let chain = ProviderChain::new(EmailVendor::Mailgun, registry);

        let outcome = chain.send_email("a@b.co", "Hi", "<p>Hi</p>").await;
        assert!(outcome.success);
        assert_eq!(outcome.provider, Some(EmailVendor::Resend));
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn both_vendors_failing_gives_up_after_two_attempts() {
        let registry = ProviderRegistry::new()
            .with(mock_provider(EmailVendor::Smtp, 1, false))
            .with(mock_provider(EmailVendor::Resend, 1, false));
        let chain = ProviderChain::new(EmailVendor::Smtp, registry);

        let outcome = chain.send_email("a@b.co", "Hi", "<p>Hi</p>").await;
        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 2);
        assert!(outcome.error.unwrap().contains("fallback"));
    }

    #[tokio::test]
    async fn fallback_as_primary_collapses_to_one_attempt() {
        let registry = ProviderRegistry::new().with(mock_provider(EmailVendor::Resend, 1, false));
        let chain = ProviderChain::new(EmailVendor::Resend, registry);

        let outcome = chain.send_email("a@b.co", "Hi", "<p>Hi</p>").await;
        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn unregistered_primary_goes_straight_to_fallback() {
        let registry = ProviderRegistry::new().with(mock_provider(EmailVendor::Resend, 1, true));
        let chain = ProviderChain::new(EmailVendor::SendGrid, registry);

        let outcome = chain.send_email("a@b.co", "Hi", "<p>Hi</p>").await;
        assert!(outcome.success);
        assert_eq!(outcome.provider, Some(EmailVendor::Resend));
    }

    #[tokio::test]
    async fn malformed_recipient_never_reaches_a_vendor() {
        let registry = ProviderRegistry::new()
            .with(mock_provider(EmailVendor::SendGrid, 0, true))
            .with(mock_provider(EmailVendor::Resend, 0, true));
        let chain = ProviderChain::new(EmailVendor::SendGrid, registry);

        let outcome = chain.send_email("not-an-email", "Hi", "<p>Hi</p>").await;
        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 0);
    }

    #[tokio::test]
    async fn empty_registry_reports_not_configured() {
        let chain = ProviderChain::new(EmailVendor::Mailgun, ProviderRegistry::new());
        assert!(!chain.is_configured());

        let outcome = chain.send_email("a@b.co", "Hi", "<p>Hi</p>").await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("not configured"));
    }
}
