// storefront/tests/checkout_tests.rs
mod common;

use common::*;
use glowmart::errors::AppError;
use glowmart::services::orders;
use glowmart::services::payments::{OrderMetadata, PaymentStatus};
use glowmart::workflows::{CartLine, CheckoutRequest};
use uuid::Uuid;

fn line(product_id: Uuid, quantity: i32, price_cents: Option<i64>) -> CartLine {
  CartLine {
    product_id,
    quantity,
    name: None,
    price_cents,
  }
}

fn request(items: Vec<CartLine>) -> CheckoutRequest {
  CheckoutRequest {
    items,
    email: "buyer@example.com".to_string(),
    shipping_address: address(),
  }
}

#[tokio::test]
async fn checkout_charges_catalog_prices_and_carries_the_cart() {
  let app = spawn_app();
  let sun = seed_product(&app, "Relief Sun", 1800, 10).await;
  let mask = seed_product(&app, "Sheet Mask", 300, 10).await;

  let session = orders::start_checkout(
    &app.state,
    customer("buyer"),
    request(vec![line(sun.id, 1, Some(1)), line(mask.id, 2, None), line(mask.id, 1, None)]),
  )
  .await
  .expect("checkout");
  assert!(session.session_id.starts_with("cs_mock_"));
  assert!(session.redirect_url.ends_with(&format!("/api/v1/dev/payments/{}/complete", session.session_id)));

  let stored = app.gateway.session(&session.session_id).expect("gateway session");
  assert_eq!(stored.payment_status, PaymentStatus::Unpaid);
  assert_eq!(stored.amount_total_cents, Some(1800 + 3 * 300));

  let metadata = OrderMetadata::decode(&stored.metadata).unwrap();
  assert_eq!(metadata.user_id, "buyer");
  assert_eq!(metadata.customer_email.as_deref(), Some("buyer@example.com"));
  assert_eq!(metadata.items.len(), 2, "duplicate lines merge");
  let sun_item = metadata.items.iter().find(|i| i.product_id == sun.id).unwrap();
  assert_eq!(sun_item.price_cents, 1800);
  let mask_item = metadata.items.iter().find(|i| i.product_id == mask.id).unwrap();
  assert_eq!(mask_item.quantity, 3);
  assert_eq!(stock_of(&app, sun.id).await, 10, "checkout must not reserve stock");
}

#[tokio::test]
async fn gateway_failure_is_checkout_initiation_failed() {
  let app = spawn_app();
  let toner = seed_product(&app, "Toner", 1500, 10).await;
  app.gateway.set_fail_creation(true);

  let err = orders::start_checkout(&app.state, customer("buyer"), request(vec![line(toner.id, 1, None)]))
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::CheckoutInitiationFailed(_)), "got {:?}", err);
}

#[tokio::test]
async fn cart_problems_are_reported_before_the_gateway() {
  let app = spawn_app();
  let scarce = seed_product(&app, "Limited Palette", 4200, 1).await;

  let empty = orders::start_checkout(&app.state, customer("buyer"), request(vec![])).await.unwrap_err();
  assert!(matches!(empty, AppError::InvalidInput(_)));

  let zero = orders::start_checkout(&app.state, customer("buyer"), request(vec![line(scarce.id, 0, None)]))
    .await
    .unwrap_err();
  assert!(matches!(zero, AppError::InvalidInput(_)));

  let unknown = orders::start_checkout(&app.state, customer("buyer"), request(vec![line(Uuid::new_v4(), 1, None)]))
    .await
    .unwrap_err();
  assert!(matches!(unknown, AppError::NotFound(_)));

  let short = orders::start_checkout(&app.state, customer("buyer"), request(vec![line(scarce.id, 2, None)]))
    .await
    .unwrap_err();
  assert!(matches!(short, AppError::InsufficientStock(_)));

  let mut bad_email = request(vec![line(scarce.id, 1, None)]);
  bad_email.email = "not-an-email".to_string();
  let err = orders::start_checkout(&app.state, customer("buyer"), bad_email).await.unwrap_err();
  assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn checkout_then_payment_then_reconcile() {
  let app = spawn_app();
  let cream = seed_product(&app, "Dynasty Cream", 2400, 6).await;

  let session = orders::start_checkout(&app.state, customer("buyer_e2e"), request(vec![line(cream.id, 2, None)]))
    .await
    .unwrap();

  let early = orders::reconcile(&app.state, &session.session_id, Some(customer("buyer_e2e")))
    .await
    .unwrap_err();
  assert!(matches!(early, AppError::PaymentIncomplete(_)));

  assert!(app.gateway.mark_paid(&session.session_id));
  let reconciled = orders::reconcile(&app.state, &session.session_id, Some(customer("buyer_e2e")))
    .await
    .unwrap();
  assert!(reconciled.created);
  assert_eq!(reconciled.order.order.user_id, "buyer_e2e");
  assert_eq!(reconciled.order.order.total_amount_cents, 4800);
  assert_eq!(reconciled.order.order.payment_session_id, session.session_id);
  assert_eq!(reconciled.order.items[0].product.name, "Dynasty Cream");
  assert_eq!(stock_of(&app, cream.id).await, 4);
  assert_eq!(app.mail.sent_subjects().len(), 1);
}
