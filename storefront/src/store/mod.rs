// storefront/src/store/mod.rs

//! Persistence behind one async trait. `PgStore` is the production backend;
//! `MemoryStore` keeps the same uniqueness and atomicity rules in process.

pub mod memory;
pub mod postgres;

use crate::errors::Result;
use crate::models::{
  EmailLog, EmailStatus, NewEmailLog, NewProduct, NewUser, Order, OrderDetail, OrderStatus, Product, ProductPatch,
  ProductQuery, ShippingAddress, User,
};
use async_trait::async_trait;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
  pub product_id: Uuid,
  pub quantity: i32,
  pub price_cents: i64,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
  pub user_id: String,
  pub total_amount_cents: i64,
  pub currency: String,
  pub shipping_address: ShippingAddress,
  pub payment_session_id: String,
  pub items: Vec<NewOrderItem>,
}

impl NewOrder {
  /// Items in product-id order, so concurrent writers lock stock rows in the
  /// same sequence.
  pub fn items_by_product(&self) -> Vec<NewOrderItem> {
    let mut items = self.items.clone();
    items.sort_by_key(|i| i.product_id);
    items
  }
}

#[async_trait]
pub trait Store: Send + Sync {
  async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>>;
  async fn get_product(&self, id: Uuid) -> Result<Option<Product>>;
  async fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>>;
  async fn insert_product(&self, input: &NewProduct) -> Result<Product>;
  async fn update_product(&self, id: Uuid, patch: &ProductPatch) -> Result<Option<Product>>;

  async fn get_user(&self, id: &str) -> Result<Option<User>>;
  async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
  /// Inserts unless the id or the email is taken. Returns whether a row was
  /// written; a conflict is not an error.
  async fn insert_user_if_absent(&self, user: &NewUser) -> Result<bool>;

  async fn get_order(&self, id: Uuid) -> Result<Option<OrderDetail>>;
  async fn get_order_by_payment_session(&self, session_id: &str) -> Result<Option<OrderDetail>>;
  /// Newest first.
  async fn list_orders_for_user(&self, user_id: &str) -> Result<Vec<OrderDetail>>;
  /// Newest first, optionally filtered by status.
  async fn list_orders(&self, status: Option<OrderStatus>, limit: i64, offset: i64) -> Result<Vec<OrderDetail>>;

  /// Writes the order (status `PROCESSING`), its items and every stock
  /// decrement as one unit.
  ///
  /// Fails with `DuplicatePayment` if an order already holds the payment
  /// session id, `InsufficientStock` if any product would go negative, and
  /// `NotFound` for an unknown product. Nothing is written on failure.
  async fn create_order(&self, order: &NewOrder) -> Result<OrderDetail>;

  /// Compare-and-set on the status column: applies only if the order is
  /// still in `from`. `None` means the order is missing or has moved on.
  async fn update_order_status(
    &self,
    id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
    tracking_number: Option<&str>,
  ) -> Result<Option<Order>>;

  async fn insert_email_log(&self, log: &NewEmailLog) -> Result<EmailLog>;
  /// Newest first.
  async fn list_email_logs(&self, status: Option<EmailStatus>, limit: i64) -> Result<Vec<EmailLog>>;
}
