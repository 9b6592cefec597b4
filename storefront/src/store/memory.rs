// storefront/src/store/memory.rs

use super::{NewOrder, Store};
use crate::errors::{AppError, Result};
use crate::models::{
  EmailLog, EmailStatus, NewEmailLog, NewProduct, NewUser, Order, OrderDetail, OrderItem, OrderItemDetail,
  OrderStatus, Product, ProductPatch, ProductQuery, ProductSnapshot, User,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use sqlx::types::Json;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
  products: HashMap<Uuid, Product>,
  users: Vec<User>,
  orders: Vec<Order>,
  order_items: Vec<OrderItem>,
  email_logs: Vec<EmailLog>,
}

impl Tables {
  fn detail(&self, order: &Order) -> OrderDetail {
    let mut items: Vec<OrderItemDetail> = self
      .order_items
      .iter()
      .filter(|item| item.order_id == order.id)
      .map(|item| {
        let product = self.products.get(&item.product_id);
        OrderItemDetail {
          id: item.id,
          product_id: item.product_id,
          quantity: item.quantity,
          price_cents: item.price_cents,
          product: ProductSnapshot {
            id: item.product_id,
            name: product.map(|p| p.name.clone()).unwrap_or_default(),
            brand: product.map(|p| p.brand.clone()).unwrap_or_default(),
            image: product.and_then(|p| p.primary_image().map(str::to_string)),
          },
        }
      })
      .collect();
    items.sort_by(|a, b| a.product.name.cmp(&b.product.name).then(a.id.cmp(&b.id)));
    OrderDetail {
      order: order.clone(),
      items,
    }
  }

  fn newest_first(&self, mut orders: Vec<&Order>) -> Vec<OrderDetail> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
    orders.into_iter().map(|o| self.detail(o)).collect()
  }
}

/// In-process store. A single mutex around all tables makes every operation
/// atomic, which is what `create_order` relies on.
#[derive(Default)]
pub struct MemoryStore {
  tables: Mutex<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn order_count(&self) -> usize {
    self.tables.lock().orders.len()
  }

  pub fn order_item_count(&self) -> usize {
    self.tables.lock().order_items.len()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
    let tables = self.tables.lock();
    let mut hits: Vec<Product> = tables.products.values().filter(|p| query.matches(p)).cloned().collect();
    hits.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    Ok(
      hits
        .into_iter()
        .skip(query.offset() as usize)
        .take(query.limit() as usize)
        .collect(),
    )
  }

  async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
    Ok(self.tables.lock().products.get(&id).cloned())
  }

  async fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
    let tables = self.tables.lock();
    Ok(ids.iter().filter_map(|id| tables.products.get(id).cloned()).collect())
  }

  async fn insert_product(&self, input: &NewProduct) -> Result<Product> {
    let now = Utc::now();
    let product = Product {
      id: Uuid::new_v4(),
      name: input.name.trim().to_string(),
      brand: input.brand.trim().to_string(),
      category: input.category.trim().to_string(),
      description: input.description.clone(),
      price_cents: input.price_cents,
      images: input.images.clone(),
      is_vegan: input.is_vegan,
      is_cruelty_free: input.is_cruelty_free,
      stock: input.stock,
      created_at: now,
      updated_at: now,
    };
    self.tables.lock().products.insert(product.id, product.clone());
    Ok(product)
  }

  async fn update_product(&self, id: Uuid, patch: &ProductPatch) -> Result<Option<Product>> {
    let mut tables = self.tables.lock();
    Ok(tables.products.get_mut(&id).map(|product| {
      patch.apply_to(product);
      product.clone()
    }))
  }

  async fn get_user(&self, id: &str) -> Result<Option<User>> {
    Ok(self.tables.lock().users.iter().find(|u| u.id == id).cloned())
  }

  async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
    Ok(
      self
        .tables
        .lock()
        .users
        .iter()
        .find(|u| u.email.eq_ignore_ascii_case(email))
        .cloned(),
    )
  }

  async fn insert_user_if_absent(&self, user: &NewUser) -> Result<bool> {
    let mut tables = self.tables.lock();
    if tables
      .users
      .iter()
      .any(|u| u.id == user.id || u.email.eq_ignore_ascii_case(&user.email))
    {
      return Ok(false);
    }
    tables.users.push(User {
      id: user.id.clone(),
      email: user.email.clone(),
      name: user.name.clone(),
      created_at: Utc::now(),
    });
    Ok(true)
  }

  async fn get_order(&self, id: Uuid) -> Result<Option<OrderDetail>> {
    let tables = self.tables.lock();
    Ok(tables.orders.iter().find(|o| o.id == id).map(|o| tables.detail(o)))
  }

  async fn get_order_by_payment_session(&self, session_id: &str) -> Result<Option<OrderDetail>> {
    let tables = self.tables.lock();
    Ok(
      tables
        .orders
        .iter()
        .find(|o| o.payment_session_id == session_id)
        .map(|o| tables.detail(o)),
    )
  }

  async fn list_orders_for_user(&self, user_id: &str) -> Result<Vec<OrderDetail>> {
    let tables = self.tables.lock();
    let mine = tables.orders.iter().filter(|o| o.user_id == user_id).collect();
    Ok(tables.newest_first(mine))
  }

  async fn list_orders(&self, status: Option<OrderStatus>, limit: i64, offset: i64) -> Result<Vec<OrderDetail>> {
    let tables = self.tables.lock();
    let matching = tables
      .orders
      .iter()
      .filter(|o| status.map_or(true, |s| o.status == s))
      .collect();
    Ok(
      tables
        .newest_first(matching)
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect(),
    )
  }

  async fn create_order(&self, order: &NewOrder) -> Result<OrderDetail> {
    let mut tables = self.tables.lock();

    if tables.orders.iter().any(|o| o.payment_session_id == order.payment_session_id) {
      return Err(AppError::DuplicatePayment(order.payment_session_id.clone()));
    }
    if !tables.users.iter().any(|u| u.id == order.user_id) {
      return Err(AppError::Internal(format!("Order owner {} does not exist", order.user_id)));
    }

    // Check every line before touching anything so a failure leaves no trace.
    let items = order.items_by_product();
    let mut wanted: HashMap<Uuid, i32> = HashMap::new();
    for item in &items {
      *wanted.entry(item.product_id).or_default() += item.quantity;
    }
    for (product_id, quantity) in &wanted {
      let product = tables
        .products
        .get(product_id)
        .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))?;
      if product.stock < *quantity {
        return Err(AppError::InsufficientStock(format!(
          "Not enough stock for product {} (wanted {})",
          product_id, quantity
        )));
      }
    }

    let now = Utc::now();
    for (product_id, quantity) in &wanted {
      if let Some(product) = tables.products.get_mut(product_id) {
        product.stock -= quantity;
        product.updated_at = now;
      }
    }

    let created = Order {
      id: Uuid::new_v4(),
      user_id: order.user_id.clone(),
      status: OrderStatus::Processing,
      total_amount_cents: order.total_amount_cents,
      currency: order.currency.clone(),
      shipping_address: Json(order.shipping_address.clone()),
      payment_session_id: order.payment_session_id.clone(),
      tracking_number: None,
      created_at: now,
      updated_at: now,
    };
    for item in items {
      tables.order_items.push(OrderItem {
        id: Uuid::new_v4(),
        order_id: created.id,
        product_id: item.product_id,
        quantity: item.quantity,
        price_cents: item.price_cents,
      });
    }
    tables.orders.push(created.clone());
    Ok(tables.detail(&created))
  }

  async fn update_order_status(
    &self,
    id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
    tracking_number: Option<&str>,
  ) -> Result<Option<Order>> {
    let mut tables = self.tables.lock();
    let Some(order) = tables.orders.iter_mut().find(|o| o.id == id && o.status == from) else {
      return Ok(None);
    };
    order.status = to;
    if let Some(tracking) = tracking_number {
      order.tracking_number = Some(tracking.to_string());
    }
    order.updated_at = Utc::now();
    Ok(Some(order.clone()))
  }

  async fn insert_email_log(&self, log: &NewEmailLog) -> Result<EmailLog> {
    let entry = EmailLog {
      id: Uuid::new_v4(),
      recipient: log.recipient.clone(),
      subject: log.subject.clone(),
      template: log.template.clone(),
      order_id: log.order_id,
      status: log.status,
      attempts: log.attempts,
      last_error: log.last_error.clone(),
      provider_message_id: log.provider_message_id.clone(),
      created_at: Utc::now(),
    };
    self.tables.lock().email_logs.push(entry.clone());
    Ok(entry)
  }

  async fn list_email_logs(&self, status: Option<EmailStatus>, limit: i64) -> Result<Vec<EmailLog>> {
    let tables = self.tables.lock();
    // Insertion order is creation order.
    Ok(
      tables
        .email_logs
        .iter()
        .rev()
        .filter(|l| status.map_or(true, |s| l.status == s))
        .take(limit.max(0) as usize)
        .cloned()
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::ShippingAddress;
  use crate::store::NewOrderItem;

  fn product(stock: i32) -> NewProduct {
    NewProduct {
      name: "Advanced Snail 96 Mucin Power Essence".into(),
      brand: "COSRX".into(),
      category: "essence".into(),
      description: None,
      price_cents: 2500,
      images: vec![],
      is_vegan: false,
      is_cruelty_free: true,
      stock,
    }
  }

  fn address() -> ShippingAddress {
    ShippingAddress {
      name: "Mina Kim".into(),
      line1: "1 Main St".into(),
      line2: None,
      city: "Portland".into(),
      state: Some("OR".into()),
      postal_code: "97201".into(),
      country: "US".into(),
    }
  }

  async fn store_with_user() -> MemoryStore {
    let store = MemoryStore::new();
    store
      .insert_user_if_absent(&NewUser {
        id: "user_1".into(),
        email: "mina@example.com".into(),
        name: None,
      })
      .await
      .unwrap();
    store
  }

  fn order_for(session: &str, product_id: Uuid, quantity: i32) -> NewOrder {
    NewOrder {
      user_id: "user_1".into(),
      total_amount_cents: 2500 * quantity as i64,
      currency: "usd".into(),
      shipping_address: address(),
      payment_session_id: session.into(),
      items: vec![NewOrderItem {
        product_id,
        quantity,
        price_cents: 2500,
      }],
    }
  }

  #[tokio::test]
  async fn duplicate_session_is_refused() {
    let store = store_with_user().await;
    let p = store.insert_product(&product(10)).await.unwrap();
    store.create_order(&order_for("cs_1", p.id, 1)).await.unwrap();
    let err = store.create_order(&order_for("cs_1", p.id, 1)).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicatePayment(_)));
    assert_eq!(store.get_product(p.id).await.unwrap().unwrap().stock, 9);
  }

  #[tokio::test]
  async fn insufficient_stock_writes_nothing() {
    let store = store_with_user().await;
    let p = store.insert_product(&product(1)).await.unwrap();
    let err = store.create_order(&order_for("cs_2", p.id, 2)).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock(_)));
    assert_eq!(store.order_count(), 0);
    assert_eq!(store.order_item_count(), 0);
    assert_eq!(store.get_product(p.id).await.unwrap().unwrap().stock, 1);
  }

  #[tokio::test]
  async fn status_update_is_compare_and_set() {
    let store = store_with_user().await;
    let p = store.insert_product(&product(5)).await.unwrap();
    let detail = store.create_order(&order_for("cs_3", p.id, 1)).await.unwrap();
    let id = detail.order.id;

    let stale = store
      .update_order_status(id, OrderStatus::Pending, OrderStatus::Processing, None)
      .await
      .unwrap();
    assert!(stale.is_none());

    let shipped = store
      .update_order_status(id, OrderStatus::Processing, OrderStatus::Shipped, Some("1Z999"))
      .await
      .unwrap()
      .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);
    assert_eq!(shipped.tracking_number.as_deref(), Some("1Z999"));
  }

  #[tokio::test]
  async fn user_insert_ignores_conflicts() {
    let store = store_with_user().await;
    let again = NewUser {
      id: "user_2".into(),
      email: "mina@example.com".into(),
      name: Some("Mina".into()),
    };
    assert!(!store.insert_user_if_absent(&again).await.unwrap());
    assert!(store.get_user("user_2").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn emails_are_unique_regardless_of_case() {
    let store = store_with_user().await;
    let shouted = NewUser {
      id: "user_3".into(),
      email: "Mina@Example.COM".into(),
      name: None,
    };
    assert!(!store.insert_user_if_absent(&shouted).await.unwrap());
    let found = store.get_user_by_email("MINA@example.com").await.unwrap().unwrap();
    assert_eq!(found.id, "user_1");
  }
}
