// storefront/src/models/order_item.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A purchased line. `price_cents` is the unit price captured at purchase
/// and never follows later catalog edits.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub price_cents: i64,
}

/// Product fields resolved at read time for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
  pub id: Uuid,
  pub name: String,
  pub brand: String,
  pub image: Option<String>,
}

/// The single response shape for an order line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDetail {
  pub id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub price_cents: i64,
  pub product: ProductSnapshot,
}

/// Flat row of `order_items` joined with `products`.
#[derive(Debug, Clone, FromRow)]
pub struct OrderItemRow {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub price_cents: i64,
  pub product_name: String,
  pub product_brand: String,
  pub product_image: Option<String>,
}

impl From<OrderItemRow> for OrderItemDetail {
  fn from(row: OrderItemRow) -> Self {
    Self {
      id: row.id,
      product_id: row.product_id,
      quantity: row.quantity,
      price_cents: row.price_cents,
      product: ProductSnapshot {
        id: row.product_id,
        name: row.product_name,
        brand: row.product_brand,
        image: row.product_image,
      },
    }
  }
}
