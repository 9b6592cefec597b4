// storefront/tests/reconciliation_tests.rs
mod common;

use common::*;
use glowmart::errors::AppError;
use glowmart::models::{EmailStatus, NewUser, OrderStatus, ProductPatch};
use glowmart::services::mail::templates;
use glowmart::services::orders;
use glowmart::services::payments::PaymentStatus;
use glowmart::store::Store;
use std::collections::BTreeMap;
use std::time::Duration;

#[tokio::test]
async fn paid_session_becomes_exactly_one_order() {
  let app = spawn_app();
  let serum = seed_product(&app, "Relief Sun", 1000, 10).await;
  let meta = cart_metadata("user_1", &[(serum.id, 2, 1000)]);
  seed_session(&app, "cs_paid_1", PaymentStatus::Paid, 2000, meta);

  let first = orders::reconcile(&app.state, "cs_paid_1", Some(customer("user_1")))
    .await
    .expect("first reconciliation");
  assert!(first.created);
  assert_eq!(first.order.order.status, OrderStatus::Processing);
  assert_eq!(first.order.order.total_amount_cents, 2000);
  assert_eq!(first.order.order.user_id, "user_1");
  assert_eq!(first.order.items.len(), 1);
  assert_eq!(first.order.items[0].quantity, 2);
  assert_eq!(first.order.items[0].price_cents, 1000);
  assert_eq!(stock_of(&app, serum.id).await, 8);

  let second = orders::reconcile(&app.state, "cs_paid_1", Some(customer("user_1")))
    .await
    .expect("repeat reconciliation");
  assert!(!second.created);
  assert_eq!(second.order.order.id, first.order.order.id);
  assert_eq!(stock_of(&app, serum.id).await, 8, "stock must only move once");
  assert_eq!(app.store.order_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reconciliations_agree_on_one_order() {
  let app = spawn_app();
  let toner = seed_product(&app, "Glow Toner", 1800, 20).await;
  seed_session(
    &app,
    "cs_race",
    PaymentStatus::Paid,
    3600,
    cart_metadata("user_race", &[(toner.id, 2, 1800)]),
  );

  let mut handles = Vec::new();
  for i in 0..8 {
    let state = app.state.clone();
    // Mix of the buyer's redirect and anonymous webhook-style callers.
    let principal = (i % 2 == 0).then(|| customer("user_race"));
    handles.push(tokio::spawn(async move {
      orders::reconcile(&state, "cs_race", principal).await
    }));
  }

  let mut ids = Vec::new();
  let mut created = 0;
  for handle in handles {
    let result = handle.await.expect("task panicked").expect("reconciliation failed");
    if result.created {
      created += 1;
    }
    ids.push(result.order.order.id);
  }
  ids.dedup();
  assert_eq!(ids.len(), 1, "every caller must see the same order");
  assert_eq!(created, 1);
  assert_eq!(app.store.order_count(), 1);
  assert_eq!(app.store.order_item_count(), 1);
  assert_eq!(stock_of(&app, toner.id).await, 18);
}

#[tokio::test]
async fn unpaid_session_is_not_reconciled() {
  let app = spawn_app();
  let cream = seed_product(&app, "Water Cream", 3200, 5).await;
  seed_session(
    &app,
    "cs_unpaid",
    PaymentStatus::Unpaid,
    3200,
    cart_metadata("user_2", &[(cream.id, 1, 3200)]),
  );

  let err = orders::reconcile(&app.state, "cs_unpaid", Some(customer("user_2")))
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::PaymentIncomplete(_)), "got {:?}", err);
  assert_eq!(app.store.order_count(), 0);
  assert_eq!(stock_of(&app, cream.id).await, 5);
}

#[tokio::test]
async fn unknown_session_is_payment_not_found() {
  let app = spawn_app();
  let err = orders::reconcile(&app.state, "cs_missing", None).await.unwrap_err();
  assert!(matches!(err, AppError::PaymentNotFound(_)), "got {:?}", err);
}

#[tokio::test]
async fn blank_session_id_is_rejected() {
  let app = spawn_app();
  let err = orders::reconcile(&app.state, "  ", None).await.unwrap_err();
  assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn session_without_cart_metadata_is_missing_order_data() {
  let app = spawn_app();
  seed_session(&app, "cs_bare", PaymentStatus::Paid, 1500, BTreeMap::new());

  let err = orders::reconcile(&app.state, "cs_bare", None).await.unwrap_err();
  assert!(matches!(err, AppError::MissingOrderData(_)), "got {:?}", err);
  assert_eq!(app.store.order_count(), 0);
}

#[tokio::test]
async fn insufficient_stock_persists_nothing() {
  let app = spawn_app();
  let plenty = seed_product(&app, "Cleansing Balm", 2200, 10).await;
  let scarce = seed_product(&app, "Snail Essence", 2500, 1).await;
  seed_session(
    &app,
    "cs_scarce",
    PaymentStatus::Paid,
    2200 + 2 * 2500,
    cart_metadata("user_3", &[(plenty.id, 1, 2200), (scarce.id, 2, 2500)]),
  );

  let err = orders::reconcile(&app.state, "cs_scarce", None).await.unwrap_err();
  assert!(matches!(err, AppError::InsufficientStock(_)), "got {:?}", err);
  assert_eq!(app.store.order_count(), 0);
  assert_eq!(app.store.order_item_count(), 0);
  assert_eq!(stock_of(&app, plenty.id).await, 10);
  assert_eq!(stock_of(&app, scarce.id).await, 1);
}

#[tokio::test]
async fn item_prices_are_frozen_at_purchase() {
  let app = spawn_app();
  let mask = seed_product(&app, "Sheet Mask", 300, 50).await;
  seed_session(
    &app,
    "cs_frozen",
    PaymentStatus::Paid,
    900,
    cart_metadata("user_4", &[(mask.id, 3, 300)]),
  );
  let reconciled = orders::reconcile(&app.state, "cs_frozen", None).await.unwrap();

  app
    .store
    .update_product(
      mask.id,
      &ProductPatch {
        price_cents: Some(450),
        ..Default::default()
      },
    )
    .await
    .unwrap();

  let stored = app.store.get_order(reconciled.order.order.id).await.unwrap().unwrap();
  assert_eq!(stored.items[0].price_cents, 300);
  assert_eq!(stored.order.total_amount_cents, 900);
}

#[tokio::test]
async fn confirmation_email_is_sent_and_logged_once() {
  let app = spawn_app();
  let pads = seed_product(&app, "Toner Pads", 1900, 10).await;
  seed_session(
    &app,
    "cs_mail",
    PaymentStatus::Paid,
    1900,
    cart_metadata("user_5", &[(pads.id, 1, 1900)]),
  );

  orders::reconcile(&app.state, "cs_mail", None).await.unwrap();
  orders::reconcile(&app.state, "cs_mail", None).await.unwrap();

  let logs = app.store.list_email_logs(None, 10).await.unwrap();
  assert_eq!(logs.len(), 1, "repeat reconciliation must not resend");
  assert_eq!(logs[0].template, templates::CONFIRMATION);
  assert_eq!(logs[0].status, EmailStatus::Sent);
  assert_eq!(logs[0].recipient, "user_5@example.com");
  assert_eq!(app.mail.sent.lock().len(), 1);
}

#[tokio::test]
async fn failed_confirmation_does_not_fail_the_order() {
  let app = spawn_app_with(ScriptedTransport::always_failing());
  let oil = seed_product(&app, "Cleansing Oil", 2100, 10).await;
  seed_session(
    &app,
    "cs_mail_down",
    PaymentStatus::Paid,
    2100,
    cart_metadata("user_6", &[(oil.id, 1, 2100)]),
  );

  let reconciled = orders::reconcile(&app.state, "cs_mail_down", None).await.unwrap();
  assert!(reconciled.created);
  let logs = app.store.list_email_logs(Some(EmailStatus::Failed), 10).await.unwrap();
  assert_eq!(logs.len(), 1);
  assert_eq!(logs[0].attempts, 3);
}

#[tokio::test]
async fn slow_mail_does_not_time_out_a_committed_order() {
  let mail = ScriptedTransport::always_failing().with_delay(Duration::from_millis(700));
  let app = spawn_app_configured(mail, test_config_with(&[("REQUEST_TIMEOUT_SECS", "1")]));
  let cream = seed_product(&app, "Snail Cream", 2600, 4).await;
  seed_session(
    &app,
    "cs_slow_mail",
    PaymentStatus::Paid,
    2600,
    cart_metadata("user_8", &[(cream.id, 1, 2600)]),
  );

  let reconciled = orders::reconcile(&app.state, "cs_slow_mail", None)
    .await
    .expect("order is committed even though mail outlasts the request timeout");
  assert!(reconciled.created);
  assert_eq!(stock_of(&app, cream.id).await, 3);

  let logs = app.store.list_email_logs(Some(EmailStatus::Failed), 10).await.unwrap();
  assert_eq!(logs.len(), 1);
  assert_eq!(logs[0].template, templates::CONFIRMATION);
  assert_eq!(logs[0].attempts, 3);
}

#[tokio::test]
async fn another_customer_cannot_claim_the_payment() {
  let app = spawn_app();
  let essence = seed_product(&app, "First Essence", 4100, 3).await;
  seed_session(
    &app,
    "cs_owned",
    PaymentStatus::Paid,
    4100,
    cart_metadata("owner", &[(essence.id, 1, 4100)]),
  );

  let err = orders::reconcile(&app.state, "cs_owned", Some(customer("intruder")))
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::Forbidden(_)), "got {:?}", err);
  assert_eq!(app.store.order_count(), 0);

  let by_admin = orders::reconcile(&app.state, "cs_owned", Some(admin())).await.unwrap();
  assert_eq!(by_admin.order.order.user_id, "owner");
}

#[tokio::test]
async fn existing_order_stays_private_to_its_owner() {
  let app = spawn_app();
  let essence = seed_product(&app, "Ginseng Essence", 3600, 5).await;
  seed_session(
    &app,
    "cs_settled",
    PaymentStatus::Paid,
    3600,
    cart_metadata("owner", &[(essence.id, 1, 3600)]),
  );

  let first = orders::reconcile(&app.state, "cs_settled", Some(customer("owner")))
    .await
    .unwrap();
  assert!(first.created);

  let err = orders::reconcile(&app.state, "cs_settled", Some(customer("stranger")))
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::Forbidden(_)), "got {:?}", err);

  let again = orders::reconcile(&app.state, "cs_settled", Some(customer("owner")))
    .await
    .unwrap();
  assert!(!again.created);
  assert_eq!(again.order.order.id, first.order.order.id);

  let by_admin = orders::reconcile(&app.state, "cs_settled", Some(admin())).await.unwrap();
  assert_eq!(by_admin.order.order.id, first.order.order.id);
  assert_eq!(app.store.order_count(), 1);
}

#[tokio::test]
async fn payment_links_to_existing_account_by_email() {
  let app = spawn_app();
  app
    .store
    .insert_user_if_absent(&NewUser {
      id: "acct_42".to_string(),
      email: "guest_7@example.com".to_string(),
      name: Some("Min-ji".to_string()),
    })
    .await
    .unwrap();
  let ampoule = seed_product(&app, "Ampoule", 2700, 4).await;
  seed_session(
    &app,
    "cs_link",
    PaymentStatus::Paid,
    2700,
    cart_metadata("guest_7", &[(ampoule.id, 1, 2700)]),
  );

  let reconciled = orders::reconcile(&app.state, "cs_link", None).await.unwrap();
  assert_eq!(reconciled.order.order.user_id, "acct_42");
  assert!(app.store.get_user("guest_7").await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_owner_gets_an_account_on_first_order() {
  let app = spawn_app();
  let cushion = seed_product(&app, "Cushion", 3500, 4).await;
  seed_session(
    &app,
    "cs_new_user",
    PaymentStatus::Paid,
    3500,
    cart_metadata("fresh", &[(cushion.id, 1, 3500)]),
  );

  orders::reconcile(&app.state, "cs_new_user", Some(customer("fresh"))).await.unwrap();
  let user = app.store.get_user("fresh").await.unwrap().expect("lazily created user");
  assert_eq!(user.email, "fresh@example.com");
  assert_eq!(user.name.as_deref(), Some("Customer fresh"));
}
