// storefront/tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use glowmart::config::AppConfig;
use glowmart::errors::{AppError, Result};
use glowmart::models::{NewProduct, Principal, Product, Role, ShippingAddress};
use glowmart::services::mail::{MailTransport, Notifier, OutgoingEmail};
use glowmart::services::payments::{
  MetadataItem, MockGateway, OrderMetadata, PaymentGateway, PaymentSession, PaymentStatus,
};
use glowmart::state::AppState;
use glowmart::store::{MemoryStore, Store};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const WEBHOOK_SECRET: &str = "whsec_integration";

static TRACING: Lazy<()> = Lazy::new(|| {
  let filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
  tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().init();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

/// Mail transport that fails its first `failures` sends and records the rest.
pub struct ScriptedTransport {
  failures: AtomicU32,
  delay: Duration,
  pub attempts: AtomicU32,
  pub sent: Mutex<Vec<OutgoingEmail>>,
}

impl ScriptedTransport {
  pub fn failing_first(failures: u32) -> Self {
    Self {
      failures: AtomicU32::new(failures),
      delay: Duration::ZERO,
      attempts: AtomicU32::new(0),
      sent: Mutex::new(Vec::new()),
    }
  }

  pub fn reliable() -> Self {
    Self::failing_first(0)
  }

  pub fn always_failing() -> Self {
    Self::failing_first(u32::MAX)
  }

  /// Every send waits `delay` before answering.
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }

  /// Makes the next `n` sends fail; `u32::MAX` fails forever.
  pub fn fail_next(&self, n: u32) {
    self.failures.store(n, Ordering::SeqCst);
    self.attempts.store(0, Ordering::SeqCst);
  }

  pub fn attempt_count(&self) -> u32 {
    self.attempts.load(Ordering::SeqCst)
  }

  pub fn sent_subjects(&self) -> Vec<String> {
    self.sent.lock().iter().map(|e| e.subject.clone()).collect()
  }
}

#[async_trait]
impl MailTransport for ScriptedTransport {
  fn name(&self) -> &'static str {
    "scripted"
  }

  async fn send(&self, email: &OutgoingEmail) -> Result<String> {
    self.attempts.fetch_add(1, Ordering::SeqCst);
    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }
    let remaining = self.failures.load(Ordering::SeqCst);
    if remaining > 0 {
      if remaining != u32::MAX {
        self.failures.fetch_sub(1, Ordering::SeqCst);
      }
      return Err(AppError::Upstream("mail provider unavailable".to_string()));
    }
    self.sent.lock().push(email.clone());
    Ok(format!("msg_{}", Uuid::new_v4().simple()))
  }
}

pub struct TestApp {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub gateway: Arc<MockGateway>,
  pub mail: Arc<ScriptedTransport>,
}

pub fn test_config() -> AppConfig {
  test_config_with(&[])
}

/// Test config with some variables replaced.
pub fn test_config_with(overrides: &[(&str, &str)]) -> AppConfig {
  let mut vars: HashMap<&str, &str> = HashMap::from([
    ("DATABASE_URL", "postgres://unused/test"),
    ("APP_BASE_URL", "http://shop.test"),
    ("WEBHOOK_SECRET", WEBHOOK_SECRET),
    ("EMAIL_RETRY_DELAY_MS", "0"),
    ("REQUEST_TIMEOUT_SECS", "5"),
  ]);
  vars.extend(overrides.iter().copied());
  AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).expect("test config")
}

pub fn spawn_app_with(mail: ScriptedTransport) -> TestApp {
  spawn_app_configured(mail, test_config())
}

pub fn spawn_app_configured(mail: ScriptedTransport, config: AppConfig) -> TestApp {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let gateway = Arc::new(MockGateway::new(config.app_base_url.clone()));
  let mail = Arc::new(mail);
  let notifier = Arc::new(Notifier::new(
    mail.clone(),
    store.clone(),
    config.email_max_attempts,
    config.email_retry_delay,
  )
  .with_attempt_timeout(config.request_timeout));
  let dyn_store: Arc<dyn Store> = store.clone();
  let dyn_gateway: Arc<dyn PaymentGateway> = gateway.clone();
  let state = AppState::assemble(config, dyn_store, dyn_gateway, Some(gateway.clone()), notifier);
  TestApp {
    state,
    store,
    gateway,
    mail,
  }
}

pub fn spawn_app() -> TestApp {
  spawn_app_with(ScriptedTransport::reliable())
}

pub fn customer(id: &str) -> Principal {
  Principal {
    id: id.to_string(),
    email: format!("{}@example.com", id),
    name: Some(format!("Customer {}", id)),
    role: Role::Customer,
  }
}

pub fn admin() -> Principal {
  Principal {
    id: "admin_1".to_string(),
    email: "ops@glowmart.example".to_string(),
    name: Some("Ops".to_string()),
    role: Role::Admin,
  }
}

pub fn address() -> ShippingAddress {
  ShippingAddress {
    name: "Seo-yeon Lee".to_string(),
    line1: "221 Pine St".to_string(),
    line2: Some("Apt 4".to_string()),
    city: "Seattle".to_string(),
    state: Some("WA".to_string()),
    postal_code: "98101".to_string(),
    country: "US".to_string(),
  }
}

pub async fn seed_product(app: &TestApp, name: &str, price_cents: i64, stock: i32) -> Product {
  app
    .store
    .insert_product(&NewProduct {
      name: name.to_string(),
      brand: "Beauty of Joseon".to_string(),
      category: "serum".to_string(),
      description: Some("Glow serum with propolis".to_string()),
      price_cents,
      images: vec![format!("https://cdn.glowmart.example/{}.jpg", name.to_lowercase().replace(' ', "-"))],
      is_vegan: true,
      is_cruelty_free: true,
      stock,
    })
    .await
    .expect("seed product")
}

pub fn cart_metadata(user_id: &str, lines: &[(Uuid, i32, i64)]) -> BTreeMap<String, String> {
  OrderMetadata {
    user_id: user_id.to_string(),
    customer_email: Some(format!("{}@example.com", user_id)),
    shipping_address: address(),
    items: lines
      .iter()
      .map(|(product_id, quantity, price_cents)| MetadataItem {
        product_id: *product_id,
        quantity: *quantity,
        price_cents: *price_cents,
      })
      .collect(),
  }
  .encode()
  .expect("encode metadata")
}

/// Registers a gateway session as if checkout had run for `user_id`.
pub fn seed_session(
  app: &TestApp,
  session_id: &str,
  status: PaymentStatus,
  amount_total_cents: i64,
  metadata: BTreeMap<String, String>,
) {
  app.gateway.insert_session(PaymentSession {
    id: session_id.to_string(),
    payment_status: status,
    amount_total_cents: Some(amount_total_cents),
    currency: Some("usd".to_string()),
    customer_email: None,
    metadata,
  });
}

/// Reconciles a paid one-line order for `user_id` and returns its id.
pub async fn paid_order(app: &TestApp, user_id: &str, session_id: &str) -> Uuid {
  let product = seed_product(app, &format!("Serum {}", session_id), 1500, 10).await;
  seed_session(
    app,
    session_id,
    PaymentStatus::Paid,
    1500,
    cart_metadata(user_id, &[(product.id, 1, 1500)]),
  );
  glowmart::services::orders::reconcile(&app.state, session_id, None)
    .await
    .expect("reconcile seeded order")
    .order
    .order
    .id
}

pub async fn stock_of(app: &TestApp, product_id: Uuid) -> i32 {
  app.store.get_product(product_id).await.unwrap().unwrap().stock
}
