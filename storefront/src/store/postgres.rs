// storefront/src/store/postgres.rs

use super::{NewOrder, Store};
use crate::errors::{AppError, Result};
use crate::models::{
  EmailLog, EmailStatus, NewEmailLog, NewProduct, NewUser, Order, OrderDetail, OrderItemDetail, OrderItemRow,
  OrderStatus, Product, ProductPatch, ProductQuery, User,
};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

const PRODUCT_COLUMNS: &str = "id, name, brand, category, description, price_cents, images, is_vegan, \
                               is_cruelty_free, stock, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, user_id, status, total_amount_cents, currency, shipping_address, \
                             payment_session_id, tracking_number, created_at, updated_at";
const EMAIL_LOG_COLUMNS: &str = "id, recipient, subject, template, order_id, status, attempts, last_error, \
                                 provider_message_id, created_at";

const PAYMENT_SESSION_CONSTRAINT: &str = "orders_payment_session_id_key";

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }

  async fn load_items(&self, order_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<OrderItemDetail>>> {
    if order_ids.is_empty() {
      return Ok(HashMap::new());
    }
    let rows = sqlx::query_as::<_, OrderItemRow>(
      "SELECT oi.id, oi.order_id, oi.product_id, oi.quantity, oi.price_cents, \
              p.name AS product_name, p.brand AS product_brand, p.images[1] AS product_image \
         FROM order_items oi \
         JOIN products p ON p.id = oi.product_id \
        WHERE oi.order_id = ANY($1) \
        ORDER BY p.name, oi.id",
    )
    .bind(order_ids)
    .fetch_all(&self.pool)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<OrderItemDetail>> = HashMap::new();
    for row in rows {
      grouped.entry(row.order_id).or_default().push(row.into());
    }
    Ok(grouped)
  }

  async fn with_items(&self, orders: Vec<Order>) -> Result<Vec<OrderDetail>> {
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut items = self.load_items(&ids).await?;
    Ok(
      orders
        .into_iter()
        .map(|order| {
          let items = items.remove(&order.id).unwrap_or_default();
          OrderDetail { order, items }
        })
        .collect(),
    )
  }

  async fn one_with_items(&self, order: Option<Order>) -> Result<Option<OrderDetail>> {
    match order {
      Some(order) => Ok(self.with_items(vec![order]).await?.pop()),
      None => Ok(None),
    }
  }
}

fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
  err
    .as_database_error()
    .map(|db| db.code().as_deref() == Some("23505") && db.constraint() == Some(constraint))
    .unwrap_or(false)
}

// `\`, `%` and `_` are literal in user search terms.
fn like_pattern(term: &str) -> String {
  let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
  format!("%{}%", escaped)
}

#[async_trait]
impl Store for PgStore {
  #[instrument(name = "PgStore::list_products", skip(self))]
  async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT {} FROM products WHERE TRUE", PRODUCT_COLUMNS));
    if let Some(term) = query.search_term() {
      let pattern = like_pattern(term);
      qb.push(" AND (name ILIKE ")
        .push_bind(pattern.clone())
        .push(" OR brand ILIKE ")
        .push_bind(pattern.clone())
        .push(" OR description ILIKE ")
        .push_bind(pattern)
        .push(")");
    }
    if let Some(category) = &query.category {
      qb.push(" AND lower(category) = lower(").push_bind(category.clone()).push(")");
    }
    if let Some(brand) = &query.brand {
      qb.push(" AND lower(brand) = lower(").push_bind(brand.clone()).push(")");
    }
    if let Some(vegan) = query.vegan {
      qb.push(" AND is_vegan = ").push_bind(vegan);
    }
    if let Some(cruelty_free) = query.cruelty_free {
      qb.push(" AND is_cruelty_free = ").push_bind(cruelty_free);
    }
    if query.in_stock == Some(true) {
      qb.push(" AND stock > 0");
    }
    qb.push(" ORDER BY name, id LIMIT ")
      .push_bind(query.limit())
      .push(" OFFSET ")
      .push_bind(query.offset());

    Ok(qb.build_query_as::<Product>().fetch_all(&self.pool).await?)
  }

  async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
    Ok(sqlx::query_as::<_, Product>(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ANY($1)", PRODUCT_COLUMNS);
    Ok(sqlx::query_as::<_, Product>(&sql).bind(ids).fetch_all(&self.pool).await?)
  }

  #[instrument(name = "PgStore::insert_product", skip(self, input), fields(name = %input.name))]
  async fn insert_product(&self, input: &NewProduct) -> Result<Product> {
    let sql = format!(
      "INSERT INTO products (id, name, brand, category, description, price_cents, images, is_vegan, is_cruelty_free, stock) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
      PRODUCT_COLUMNS
    );
    let product = sqlx::query_as::<_, Product>(&sql)
      .bind(Uuid::new_v4())
      .bind(input.name.trim())
      .bind(input.brand.trim())
      .bind(input.category.trim())
      .bind(&input.description)
      .bind(input.price_cents)
      .bind(&input.images)
      .bind(input.is_vegan)
      .bind(input.is_cruelty_free)
      .bind(input.stock)
      .fetch_one(&self.pool)
      .await?;
    Ok(product)
  }

  #[instrument(name = "PgStore::update_product", skip(self, patch))]
  async fn update_product(&self, id: Uuid, patch: &ProductPatch) -> Result<Option<Product>> {
    let sql = format!(
      "UPDATE products SET \
         name = COALESCE($2, name), \
         brand = COALESCE($3, brand), \
         category = COALESCE($4, category), \
         description = COALESCE($5, description), \
         price_cents = COALESCE($6, price_cents), \
         images = COALESCE($7, images), \
         is_vegan = COALESCE($8, is_vegan), \
         is_cruelty_free = COALESCE($9, is_cruelty_free), \
         stock = COALESCE($10, stock), \
         updated_at = now() \
       WHERE id = $1 RETURNING {}",
      PRODUCT_COLUMNS
    );
    let product = sqlx::query_as::<_, Product>(&sql)
      .bind(id)
      .bind(patch.name.as_deref().map(str::trim))
      .bind(patch.brand.as_deref().map(str::trim))
      .bind(patch.category.as_deref().map(str::trim))
      .bind(&patch.description)
      .bind(patch.price_cents)
      .bind(&patch.images)
      .bind(patch.is_vegan)
      .bind(patch.is_cruelty_free)
      .bind(patch.stock)
      .fetch_optional(&self.pool)
      .await?;
    Ok(product)
  }

  async fn get_user(&self, id: &str) -> Result<Option<User>> {
    Ok(
      sqlx::query_as::<_, User>("SELECT id, email, name, created_at FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
    Ok(
      sqlx::query_as::<_, User>("SELECT id, email, name, created_at FROM users WHERE lower(email) = lower($1)")
        .bind(email)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  #[instrument(name = "PgStore::insert_user_if_absent", skip(self, user), fields(user_id = %user.id))]
  async fn insert_user_if_absent(&self, user: &NewUser) -> Result<bool> {
    let result = sqlx::query("INSERT INTO users (id, email, name) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING")
      .bind(&user.id)
      .bind(&user.email)
      .bind(&user.name)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() == 1)
  }

  async fn get_order(&self, id: Uuid) -> Result<Option<OrderDetail>> {
    let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
    let order = sqlx::query_as::<_, Order>(&sql).bind(id).fetch_optional(&self.pool).await?;
    self.one_with_items(order).await
  }

  async fn get_order_by_payment_session(&self, session_id: &str) -> Result<Option<OrderDetail>> {
    let sql = format!("SELECT {} FROM orders WHERE payment_session_id = $1", ORDER_COLUMNS);
    let order = sqlx::query_as::<_, Order>(&sql)
      .bind(session_id)
      .fetch_optional(&self.pool)
      .await?;
    self.one_with_items(order).await
  }

  async fn list_orders_for_user(&self, user_id: &str) -> Result<Vec<OrderDetail>> {
    let sql = format!(
      "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id",
      ORDER_COLUMNS
    );
    let orders = sqlx::query_as::<_, Order>(&sql).bind(user_id).fetch_all(&self.pool).await?;
    self.with_items(orders).await
  }

  async fn list_orders(&self, status: Option<OrderStatus>, limit: i64, offset: i64) -> Result<Vec<OrderDetail>> {
    let sql = format!(
      "SELECT {} FROM orders WHERE ($1::order_status IS NULL OR status = $1) \
       ORDER BY created_at DESC, id LIMIT $2 OFFSET $3",
      ORDER_COLUMNS
    );
    let orders = sqlx::query_as::<_, Order>(&sql)
      .bind(status)
      .bind(limit)
      .bind(offset)
      .fetch_all(&self.pool)
      .await?;
    self.with_items(orders).await
  }

  #[instrument(
    name = "PgStore::create_order",
    skip(self, order),
    fields(payment_session_id = %order.payment_session_id, items = order.items.len())
  )]
  async fn create_order(&self, order: &NewOrder) -> Result<OrderDetail> {
    let mut tx = self.pool.begin().await?;

    let sql = format!(
      "INSERT INTO orders (id, user_id, status, total_amount_cents, currency, shipping_address, payment_session_id) \
       VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
      ORDER_COLUMNS
    );
    let inserted = sqlx::query_as::<_, Order>(&sql)
      .bind(Uuid::new_v4())
      .bind(&order.user_id)
      .bind(OrderStatus::Processing)
      .bind(order.total_amount_cents)
      .bind(&order.currency)
      .bind(Json(&order.shipping_address))
      .bind(&order.payment_session_id)
      .fetch_one(&mut *tx)
      .await;
    let created = match inserted {
      Ok(created) => created,
      Err(e) if is_unique_violation(&e, PAYMENT_SESSION_CONSTRAINT) => {
        debug!("payment session already has an order");
        return Err(AppError::DuplicatePayment(order.payment_session_id.clone()));
      }
      Err(e) => return Err(e.into()),
    };

    for item in order.items_by_product() {
      // Guarded decrement: no row updated means not enough stock (or no product).
      let decremented = sqlx::query(
        "UPDATE products SET stock = stock - $1, updated_at = now() WHERE id = $2 AND stock >= $1",
      )
      .bind(item.quantity)
      .bind(item.product_id)
      .execute(&mut *tx)
      .await?;
      if decremented.rows_affected() == 0 {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
          .bind(item.product_id)
          .fetch_one(&mut *tx)
          .await?;
        // Dropping `tx` rolls back the order row and earlier decrements.
        if !exists {
          return Err(AppError::NotFound(format!("Product {} not found", item.product_id)));
        }
        warn!(product_id = %item.product_id, quantity = item.quantity, "insufficient stock");
        return Err(AppError::InsufficientStock(format!(
          "Not enough stock for product {} (wanted {})",
          item.product_id, item.quantity
        )));
      }

      sqlx::query("INSERT INTO order_items (id, order_id, product_id, quantity, price_cents) VALUES ($1, $2, $3, $4, $5)")
        .bind(Uuid::new_v4())
        .bind(created.id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.price_cents)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await.map_err(|e| {
      // Two writers can both pass the insert under some isolation setups and
      // collide at commit.
      if is_unique_violation(&e, PAYMENT_SESSION_CONSTRAINT) {
        AppError::DuplicatePayment(order.payment_session_id.clone())
      } else {
        AppError::from(e)
      }
    })?;

    let mut items = self.load_items(&[created.id]).await?;
    let items = items.remove(&created.id).unwrap_or_default();
    Ok(OrderDetail { order: created, items })
  }

  #[instrument(name = "PgStore::update_order_status", skip(self, tracking_number))]
  async fn update_order_status(
    &self,
    id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
    tracking_number: Option<&str>,
  ) -> Result<Option<Order>> {
    let sql = format!(
      "UPDATE orders SET status = $3, tracking_number = COALESCE($4, tracking_number), updated_at = now() \
       WHERE id = $1 AND status = $2 RETURNING {}",
      ORDER_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(tracking_number)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn insert_email_log(&self, log: &NewEmailLog) -> Result<EmailLog> {
    let sql = format!(
      "INSERT INTO email_logs (id, recipient, subject, template, order_id, status, attempts, last_error, provider_message_id) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
      EMAIL_LOG_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, EmailLog>(&sql)
        .bind(Uuid::new_v4())
        .bind(&log.recipient)
        .bind(&log.subject)
        .bind(&log.template)
        .bind(log.order_id)
        .bind(log.status)
        .bind(log.attempts)
        .bind(&log.last_error)
        .bind(&log.provider_message_id)
        .fetch_one(&self.pool)
        .await?,
    )
  }

  async fn list_email_logs(&self, status: Option<EmailStatus>, limit: i64) -> Result<Vec<EmailLog>> {
    let sql = format!(
      "SELECT {} FROM email_logs WHERE ($1::email_status IS NULL OR status = $1) ORDER BY created_at DESC, id LIMIT $2",
      EMAIL_LOG_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, EmailLog>(&sql)
        .bind(status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?,
    )
  }
}
