use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_CURRENCY: &str = "MYR";
const DEFAULT_DOWNLOAD_URL_TTL_SECS: u64 = 86_400;
const DEFAULT_IP_ECHO_URL: &str = "https://api.ipify.org";
const DEV_DEFAULT_SESSION_SECRET: &str =
    "this_is_a_development_session_secret_that_is_at_least_64_characters_long";

/// Payment gateway configuration.
///
/// The merchant password and service id are shared secrets with the gateway;
/// the field set and its order are part of the signature contract in
/// `services::payments::sign_request`.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Merchant password shared with the gateway
    #[validate(length(min = 1))]
    pub merchant_password: String,

    /// Merchant service id assigned by the gateway
    #[validate(length(min = 1))]
    pub service_id: String,

    /// Gateway payment page the buyer is redirected to
    pub payment_url: String,

    /// URL the gateway redirects the buyer back to after payment
    pub return_url: String,

    /// URL the gateway posts the asynchronous transaction result to
    pub callback_url: String,

    /// ISO currency code used for all payments
    #[serde(default = "default_currency")]
    pub currency_code: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            merchant_password: String::new(),
            service_id: String::new(),
            payment_url: "https://gateway.example.com/pay".to_string(),
            return_url: "http://localhost:8080/payment/return".to_string(),
            callback_url: "http://localhost:8080/api/v1/payments/gateway/callback".to_string(),
            currency_code: default_currency(),
        }
    }
}

/// Object storage configuration (signed download URLs)
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Public base URL objects are served from
    #[serde(default = "default_storage_base_url")]
    pub base_url: String,

    /// Secret used to sign download URLs
    #[serde(default)]
    pub signing_secret: String,

    /// TTL for signed download URLs in seconds
    #[serde(default = "default_download_url_ttl_secs")]
    pub download_url_ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: default_storage_base_url(),
            signing_secret: String::new(),
            download_url_ttl_secs: default_download_url_ttl_secs(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Session cookie signing secret (minimum 64 characters)
    #[validate(length(min = 64), custom = "validate_session_secret")]
    pub session_secret: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default = "default_false_bool")]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Third-party IP-echo service used to resolve the caller's public IP
    #[serde(default = "default_ip_echo_url")]
    pub ip_echo_url: String,

    /// Capacity of the in-process event channel
    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Payment gateway settings
    #[serde(default)]
    #[validate]
    pub gateway: GatewayConfig,

    /// Object storage settings
    #[serde(default)]
    #[validate]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Creates a new configuration with defaults for everything not passed in
    pub fn new(
        database_url: String,
        session_secret: String,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            session_secret,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            ip_echo_url: default_ip_echo_url(),
            event_channel_capacity: default_event_channel_capacity(),
            gateway: GatewayConfig::default(),
            storage: StorageConfig::default(),
        }
    }

    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if !self.is_development() && self.session_secret.trim() == DEV_DEFAULT_SESSION_SECRET {
            let mut err = ValidationError::new("session_secret_default_dev");
            err.message = Some(
                "The bundled development session secret must not be used outside development. Set APP__SESSION_SECRET to a unique, secure value."
                    .into(),
            );
            errors.add("session_secret", err);
        }

        if !self.is_development() && self.gateway.merchant_password.trim().is_empty() {
            let mut err = ValidationError::new("merchant_password_required");
            err.message = Some(
                "Set APP__GATEWAY__MERCHANT_PASSWORD; payment requests cannot be signed without it"
                    .into(),
            );
            errors.add("gateway", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_db_connect_timeout_secs() -> u64 {
    30
}

fn default_db_idle_timeout_secs() -> u64 {
    600
}

fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_ip_echo_url() -> String {
    DEFAULT_IP_ECHO_URL.to_string()
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_storage_base_url() -> String {
    "http://localhost:9000/classpix".to_string()
}

fn default_download_url_ttl_secs() -> u64 {
    DEFAULT_DOWNLOAD_URL_TTL_SECS
}

fn default_false_bool() -> bool {
    false
}

fn validate_session_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    if trimmed.len() < 64 {
        let mut err = ValidationError::new("session_secret");
        err.message =
            Some("Session secret must be at least 64 characters for adequate security".into());
        return Err(err);
    }

    if let Some(first) = trimmed.chars().next() {
        if trimmed.chars().all(|c| c == first) {
            let mut err = ValidationError::new("session_secret");
            err.message = Some("Session secret cannot be a repeated character sequence".into());
            return Err(err);
        }
    }

    let lower = trimmed.to_ascii_lowercase();
    let weak_fragments = ["changeme", "password", "12345"];
    if weak_fragments.iter().any(|pattern| lower.contains(pattern)) {
        let mut err = ValidationError::new("session_secret");
        err.message = Some(
            "Session secret appears to be weak; use a cryptographically strong random string"
                .into(),
        );
        return Err(err);
    }

    Ok(())
}

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("event_channel_capacity");
        err.message = Some("event_channel_capacity must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("classpix_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    // NOTE: session_secret has no default; it MUST be provided via environment
    // variable or config file so an insecure default never reaches production.
    let builder = Config::builder()
        .set_default("database_url", "sqlite://classpix.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("session_secret").is_err() {
        error!("Session secret is not configured. Set APP__SESSION_SECRET with a secure random string (minimum 64 characters).");
        error!("Generate a secure secret with: openssl rand -base64 64");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "session_secret is required but not configured. Set APP__SESSION_SECRET environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite://classpix.db?mode=memory".into(),
            "ksA8hJ2mQ9xVnW4eRtY7uIoP3aSdFgHjKlZxCvBnM6qW1eRtY7uIoP3aSdFgHjKl".into(),
            "127.0.0.1".into(),
            8080,
            "production".into(),
        )
    }

    #[test]
    fn non_dev_requires_cors_origins() {
        let cfg = base_config();
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn non_dev_allows_override_flag() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        cfg.gateway.merchant_password = "mp".into();
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn non_dev_requires_merchant_password() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn development_allows_permissive_by_default() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        cfg.gateway.merchant_password = String::new();
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn repeated_character_session_secret_rejected() {
        assert!(validate_session_secret(&"a".repeat(80)).is_err());
    }
}
