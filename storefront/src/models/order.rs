// storefront/src/models/order.rs

use super::order_item::OrderItemDetail;
use crate::errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle state of an order. Stored as the `order_status` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
  Pending,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 5] = [
    OrderStatus::Pending,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "PENDING",
      OrderStatus::Processing => "PROCESSING",
      OrderStatus::Shipped => "SHIPPED",
      OrderStatus::Delivered => "DELIVERED",
      OrderStatus::Cancelled => "CANCELLED",
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
  }

  /// Forward-only graph: PENDING -> PROCESSING -> SHIPPED -> DELIVERED, with
  /// CANCELLED reachable from PENDING or PROCESSING. Staying put is not a
  /// transition.
  pub fn can_transition_to(&self, next: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
      (self, next),
      (Pending, Processing) | (Processing, Shipped) | (Shipped, Delivered) | (Pending, Cancelled) | (Processing, Cancelled)
    )
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = AppError;

  fn from_str(raw: &str) -> Result<Self, Self::Err> {
    let wanted = raw.trim();
    OrderStatus::ALL
      .into_iter()
      .find(|s| s.as_str().eq_ignore_ascii_case(wanted))
      .ok_or_else(|| {
        AppError::InvalidStatus(format!(
          "'{}' is not an order status; expected one of PENDING, PROCESSING, SHIPPED, DELIVERED, CANCELLED",
          raw
        ))
      })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
  pub name: String,
  pub line1: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub line2: Option<String>,
  pub city: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub state: Option<String>,
  pub postal_code: String,
  pub country: String,
}

impl ShippingAddress {
  pub fn validate(&self) -> Result<(), AppError> {
    let required = [
      ("name", &self.name),
      ("line1", &self.line1),
      ("city", &self.city),
      ("postalCode", &self.postal_code),
      ("country", &self.country),
    ];
    for (field, value) in required {
      if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("shippingAddress.{} is required", field)));
      }
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub user_id: String,
  pub status: OrderStatus,
  /// Fixed at creation from the gateway's charged amount.
  pub total_amount_cents: i64,
  pub currency: String,
  pub shipping_address: Json<ShippingAddress>,
  pub payment_session_id: String,
  pub tracking_number: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// An order together with its items, the shape every order endpoint returns.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
  #[serde(flatten)]
  pub order: Order,
  pub items: Vec<OrderItemDetail>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use OrderStatus::*;

  #[test]
  fn forward_path_is_allowed() {
    assert!(Pending.can_transition_to(Processing));
    assert!(Processing.can_transition_to(Shipped));
    assert!(Shipped.can_transition_to(Delivered));
    assert!(Pending.can_transition_to(Cancelled));
    assert!(Processing.can_transition_to(Cancelled));
  }

  #[test]
  fn backwards_skips_and_terminal_exits_are_rejected() {
    assert!(!Delivered.can_transition_to(Processing));
    assert!(!Shipped.can_transition_to(Processing));
    assert!(!Shipped.can_transition_to(Cancelled));
    assert!(!Pending.can_transition_to(Shipped));
    for next in OrderStatus::ALL {
      assert!(!Delivered.can_transition_to(next));
      assert!(!Cancelled.can_transition_to(next));
      assert!(!next.can_transition_to(next), "{} -> itself", next);
    }
  }

  #[test]
  fn terminal_states() {
    let terminal: Vec<_> = OrderStatus::ALL.into_iter().filter(|s| s.is_terminal()).collect();
    assert_eq!(terminal, vec![Delivered, Cancelled]);
  }

  #[test]
  fn parses_members_and_rejects_everything_else() {
    assert_eq!("SHIPPED".parse::<OrderStatus>().unwrap(), Shipped);
    assert_eq!(" delivered ".parse::<OrderStatus>().unwrap(), Delivered);
    for bad in ["", "PAID", "REFUNDED", "SHIPPED!", "1"] {
      assert!(matches!(bad.parse::<OrderStatus>(), Err(AppError::InvalidStatus(_))), "{bad}");
    }
  }

  #[test]
  fn serializes_uppercase() {
    assert_eq!(serde_json::to_string(&Processing).unwrap(), "\"PROCESSING\"");
    assert_eq!(serde_json::from_str::<OrderStatus>("\"CANCELLED\"").unwrap(), Cancelled);
  }

  #[test]
  fn address_requires_core_fields() {
    let mut address = ShippingAddress {
      name: "Ji-woo Park".into(),
      line1: "12 Garosu-gil".into(),
      line2: None,
      city: "Seoul".into(),
      state: None,
      postal_code: "06035".into(),
      country: "KR".into(),
    };
    assert!(address.validate().is_ok());
    address.city = "  ".into();
    assert!(matches!(address.validate(), Err(AppError::InvalidInput(m)) if m.contains("city")));
  }
}
