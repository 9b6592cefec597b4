// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProvider {
  Stripe,
  /// In-process gateway for local runs; sessions are paid through a dev route.
  Mock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailProvider {
  Resend,
  /// Logs messages instead of delivering them.
  Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub database_max_connections: u32,
  pub run_migrations: bool,
  pub app_base_url: String,

  pub payment_provider: PaymentProvider,
  pub stripe_secret_key: Option<String>,
  pub stripe_api_base: String,
  pub webhook_secret: String,
  pub webhook_tolerance: Duration,
  pub currency: String,

  pub mail_provider: MailProvider,
  pub resend_api_key: Option<String>,
  pub resend_api_base: String,
  pub email_sender: String,
  pub email_max_attempts: u32,
  pub email_retry_delay: Duration,

  pub request_timeout: Duration,
  pub log_format: LogFormat,
}

// Secrets stay out of Debug output.
impl std::fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("database_url", &"[REDACTED]")
      .field("database_max_connections", &self.database_max_connections)
      .field("run_migrations", &self.run_migrations)
      .field("app_base_url", &self.app_base_url)
      .field("payment_provider", &self.payment_provider)
      .field("stripe_api_base", &self.stripe_api_base)
      .field("currency", &self.currency)
      .field("mail_provider", &self.mail_provider)
      .field("resend_api_base", &self.resend_api_base)
      .field("email_sender", &self.email_sender)
      .field("email_max_attempts", &self.email_max_attempts)
      .field("email_retry_delay", &self.email_retry_delay)
      .field("request_timeout", &self.request_timeout)
      .field("log_format", &self.log_format)
      .finish_non_exhaustive()
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // .env is optional
    let config = Self::from_lookup(|key| env::var(key).ok())?;
    tracing::info!(config = ?config, "Application configuration loaded.");
    Ok(config)
  }

  /// Builds the configuration from any key lookup. `from_env` passes the
  /// process environment; tests pass a map.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let required = |key: &str| get(key).ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", key)));
    let parsed = |key: &str, default: &str| -> Result<String> { Ok(get(key).unwrap_or_else(|| default.to_string())) };

    let server_host = parsed("SERVER_HOST", "127.0.0.1")?;
    let server_port: u16 = parse_value("SERVER_PORT", &parsed("SERVER_PORT", "8080")?)?;
    let database_url = required("DATABASE_URL")?;
    let database_max_connections: u32 = parse_value("DATABASE_MAX_CONNECTIONS", &parsed("DATABASE_MAX_CONNECTIONS", "10")?)?;
    let run_migrations: bool = parse_value("RUN_MIGRATIONS", &parsed("RUN_MIGRATIONS", "true")?)?;
    let app_base_url = get("APP_BASE_URL")
      .unwrap_or_else(|| format!("http://{}:{}", server_host, server_port))
      .trim_end_matches('/')
      .to_string();

    let payment_provider = match parsed("PAYMENT_PROVIDER", "mock")?.to_ascii_lowercase().as_str() {
      "stripe" => PaymentProvider::Stripe,
      "mock" => PaymentProvider::Mock,
      other => return Err(AppError::Config(format!("Unknown PAYMENT_PROVIDER '{}'", other))),
    };
    let (stripe_secret_key, webhook_secret) = match payment_provider {
      PaymentProvider::Stripe => (Some(required("STRIPE_SECRET_KEY")?), required("STRIPE_WEBHOOK_SECRET")?),
      PaymentProvider::Mock => (get("STRIPE_SECRET_KEY"), parsed("WEBHOOK_SECRET", "whsec_mock")?),
    };
    let stripe_api_base = parsed("STRIPE_API_BASE", "https://api.stripe.com")?
      .trim_end_matches('/')
      .to_string();
    let webhook_tolerance = Duration::from_secs(parse_value(
      "WEBHOOK_TOLERANCE_SECS",
      &parsed("WEBHOOK_TOLERANCE_SECS", "300")?,
    )?);
    let currency = parsed("CURRENCY", "usd")?.to_ascii_lowercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
      return Err(AppError::Config(format!("CURRENCY must be a 3-letter ISO code, got '{}'", currency)));
    }

    let mail_provider = match parsed("MAIL_PROVIDER", "log")?.to_ascii_lowercase().as_str() {
      "resend" => MailProvider::Resend,
      "log" => MailProvider::Log,
      other => return Err(AppError::Config(format!("Unknown MAIL_PROVIDER '{}'", other))),
    };
    let resend_api_key = match mail_provider {
      MailProvider::Resend => Some(required("RESEND_API_KEY")?),
      MailProvider::Log => get("RESEND_API_KEY"),
    };
    let resend_api_base = parsed("RESEND_API_BASE", "https://api.resend.com")?
      .trim_end_matches('/')
      .to_string();
    let email_sender = parsed("EMAIL_SENDER", "noreply@glowmart.example")?;
    let email_max_attempts: u32 = parse_value("EMAIL_MAX_ATTEMPTS", &parsed("EMAIL_MAX_ATTEMPTS", "3")?)?;
    if email_max_attempts == 0 {
      return Err(AppError::Config("EMAIL_MAX_ATTEMPTS must be at least 1".to_string()));
    }
    let email_retry_delay = Duration::from_millis(parse_value(
      "EMAIL_RETRY_DELAY_MS",
      &parsed("EMAIL_RETRY_DELAY_MS", "1000")?,
    )?);

    let request_timeout = Duration::from_secs(parse_value(
      "REQUEST_TIMEOUT_SECS",
      &parsed("REQUEST_TIMEOUT_SECS", "15")?,
    )?);
    let log_format = match parsed("LOG_FORMAT", "pretty")?.to_ascii_lowercase().as_str() {
      "pretty" => LogFormat::Pretty,
      "json" => LogFormat::Json,
      other => return Err(AppError::Config(format!("Unknown LOG_FORMAT '{}'", other))),
    };

    Ok(Self {
      server_host,
      server_port,
      database_url,
      database_max_connections,
      run_migrations,
      app_base_url,
      payment_provider,
      stripe_secret_key,
      stripe_api_base,
      webhook_secret,
      webhook_tolerance,
      currency,
      mail_provider,
      resend_api_key,
      resend_api_base,
      email_sender,
      email_max_attempts,
      email_retry_delay,
      request_timeout,
      log_format,
    })
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", key, raw, e)))
}
