use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use validator::{Validate, ValidationError};

use crate::notifications::EmailVendor;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_STORE_BACKEND: &str = "in-memory";
const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
const DEFAULT_EMAIL_FROM: &str = "Storefront <orders@storefront.local>";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Outbound channel configuration. Every field is optional; a channel whose
/// credentials are missing is reported as "not configured" at send time.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NotificationConfig {
    /// Active email vendor
    #[serde(default)]
    pub email_vendor: EmailVendor,

    /// Sender address used by every vendor
    #[serde(default = "default_email_from")]
    pub email_from: String,

    #[serde(default)]
    pub resend_api_key: Option<String>,
    #[serde(default = "default_resend_base_url")]
    pub resend_base_url: String,

    #[serde(default)]
    pub sendgrid_api_key: Option<String>,
    #[serde(default = "default_sendgrid_base_url")]
    pub sendgrid_base_url: String,

    #[serde(default)]
    pub mailgun_api_key: Option<String>,
    #[serde(default)]
    pub mailgun_domain: Option<String>,
    #[serde(default = "default_mailgun_base_url")]
    pub mailgun_base_url: String,

    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,

    /// Staff mailbox receiving new-order and cancellation alerts
    #[serde(default)]
    #[validate(email)]
    pub admin_email: Option<String>,

    /// Staff phone receiving text alerts; text alerts are skipped when unset
    #[serde(default)]
    pub admin_phone: Option<String>,

    #[serde(default)]
    pub sms_account_sid: Option<String>,
    #[serde(default)]
    pub sms_auth_token: Option<String>,
    #[serde(default)]
    pub sms_from_number: Option<String>,
    #[serde(default = "default_sms_base_url")]
    pub sms_base_url: String,

    /// Timeout applied to vendor HTTP calls
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            email_vendor: EmailVendor::default(),
            email_from: default_email_from(),
            resend_api_key: None,
            resend_base_url: default_resend_base_url(),
            sendgrid_api_key: None,
            sendgrid_base_url: default_sendgrid_base_url(),
            mailgun_api_key: None,
            mailgun_domain: None,
            mailgun_base_url: default_mailgun_base_url(),
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            admin_email: None,
            admin_phone: None,
            sms_account_sid: None,
            sms_auth_token: None,
            sms_from_number: None,
            sms_base_url: default_sms_base_url(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl NotificationConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn sms_configured(&self) -> bool {
        self.sms_account_sid.is_some()
            && self.sms_auth_token.is_some()
            && self.sms_from_number.is_some()
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Key-value store backend: "in-memory" or "redis"
    #[serde(default = "default_store_backend")]
    #[validate(custom = "validate_store_backend")]
    pub store_backend: String,

    /// Redis connection URL, used when `store_backend = "redis"`
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    #[serde(default)]
    #[validate]
    pub notifications: NotificationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            store_backend: default_store_backend(),
            redis_url: default_redis_url(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_store_backend() -> String {
    DEFAULT_STORE_BACKEND.to_string()
}

fn default_redis_url() -> String {
    DEFAULT_REDIS_URL.to_string()
}

fn default_email_from() -> String {
    DEFAULT_EMAIL_FROM.to_string()
}

fn default_resend_base_url() -> String {
    "https://api.resend.com".to_string()
}

fn default_sendgrid_base_url() -> String {
    "https://api.sendgrid.com".to_string()
}

fn default_mailgun_base_url() -> String {
    "https://api.mailgun.net".to_string()
}

fn default_sms_base_url() -> String {
    "https://api.twilio.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_store_backend(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "in-memory" | "redis" => Ok(()),
        _ => {
            let mut err = ValidationError::new("store_backend");
            err.message = Some("Must be one of: in-memory, redis".into());
            Err(err)
        }
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("storefront_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*, nested with `__`)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let config = Config::builder()
        .set_default("environment", run_env.clone())?
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(&run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;
    app_config.validate()?;
    Ok(app_config)
}

/// Logs the effective configuration. Called once tracing is initialised,
/// since configuration has to be loaded before the subscriber exists.
pub fn log_loaded_config(config: &AppConfig, config_dir: &Path) {
    if !config_dir.exists() {
        info!(
            config_dir = %config_dir.display(),
            "config directory not found; using built-in defaults and environment variables"
        );
    }
    info!(
        environment = %config.environment,
        email_vendor = %config.notifications.email_vendor,
        store_backend = %config.store_backend,
        "configuration loaded"
    );
}
