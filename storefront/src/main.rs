// storefront/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use glowmart::config::{AppConfig, MailProvider, PaymentProvider};
use glowmart::errors::AppError;
use glowmart::services::mail::{LogTransport, MailTransport, Notifier, ResendTransport};
use glowmart::services::payments::{MockGateway, PaymentGateway, StripeGateway};
use glowmart::state::AppState;
use glowmart::store::{PgStore, Store};
use glowmart::telemetry;
use glowmart::web::configure_app_routes;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

const JSON_BODY_LIMIT: usize = 256 * 1024;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  dotenvy::dotenv().ok();
  telemetry::init_tracing(telemetry::log_format_from_env());
  tracing::info!("Starting GlowMart storefront...");

  let app_state = match build_state().await {
    Ok(state) => state,
    Err(e) => {
      tracing::error!(error = %e, "Startup failed.");
      return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
    }
  };

  let server_address = app_state.config.bind_address();
  let dev_routes = app_state.mock_gateway.is_some();
  tracing::info!(
    address = %server_address,
    gateway = app_state.gateway.name(),
    mail = app_state.notifier.transport_name(),
    "Binding HTTP server."
  );

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .app_data(actix_data::JsonConfig::default().limit(JSON_BODY_LIMIT))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(|cfg| configure_app_routes(cfg, dev_routes))
  })
  .bind(&server_address)?
  .run()
  .await
}

async fn build_state() -> Result<AppState, AppError> {
  let config = AppConfig::from_env()?;

  let pool = PgPoolOptions::new()
    .max_connections(config.database_max_connections)
    .acquire_timeout(config.request_timeout)
    .connect(&config.database_url)
    .await?;
  tracing::info!("Connected to the database.");

  if config.run_migrations {
    sqlx::migrate!("./migrations")
      .run(&pool)
      .await
      .map_err(|e| AppError::Internal(format!("Migrations failed: {}", e)))?;
    tracing::info!("Database migrations applied.");
  }
  let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));

  let (gateway, mock_gateway): (Arc<dyn PaymentGateway>, Option<Arc<MockGateway>>) = match config.payment_provider {
    PaymentProvider::Stripe => {
      let key = config
        .stripe_secret_key
        .clone()
        .ok_or_else(|| AppError::Config("STRIPE_SECRET_KEY is required".to_string()))?;
      let stripe: Arc<dyn PaymentGateway> =
        Arc::new(StripeGateway::new(key, config.stripe_api_base.clone(), config.request_timeout)?);
      (stripe, None)
    }
    PaymentProvider::Mock => {
      tracing::warn!("Using the in-process mock payment gateway.");
      let mock = Arc::new(MockGateway::new(config.app_base_url.clone()));
      let gateway: Arc<dyn PaymentGateway> = mock.clone();
      (gateway, Some(mock))
    }
  };

  let transport: Arc<dyn MailTransport> = match config.mail_provider {
    MailProvider::Resend => {
      let key = config
        .resend_api_key
        .clone()
        .ok_or_else(|| AppError::Config("RESEND_API_KEY is required".to_string()))?;
      Arc::new(ResendTransport::new(
        key,
        config.resend_api_base.clone(),
        config.email_sender.clone(),
        config.request_timeout,
      )?)
    }
    MailProvider::Log => Arc::new(LogTransport::new(config.email_sender.clone())),
  };
  let notifier = Arc::new(Notifier::new(
    transport,
    store.clone(),
    config.email_max_attempts,
    config.email_retry_delay,
  )
  .with_attempt_timeout(config.request_timeout));

  Ok(AppState::assemble(config, store, gateway, mock_gateway, notifier))
}
