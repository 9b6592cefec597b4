// storefront/src/services/payments/metadata.rs

//! Packs the cart and shipping address into gateway session metadata, and
//! unpacks it again at reconciliation time.
//!
//! Gateways cap each metadata value (500 characters) and the number of keys
//! (50), so the item list is stored as compact JSON split across
//! `items_0..items_{n-1}` with `items_count = n`.

use crate::errors::{AppError, Result};
use crate::models::ShippingAddress;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub const MAX_VALUE_CHARS: usize = 500;
pub const MAX_ITEM_CHUNKS: usize = 40;

pub const KEY_USER_ID: &str = "userId";
pub const KEY_CUSTOMER_EMAIL: &str = "customerEmail";
pub const KEY_SHIPPING_ADDRESS: &str = "shippingAddress";
pub const KEY_ITEMS_COUNT: &str = "items_count";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataItem {
  pub product_id: Uuid,
  pub quantity: i32,
  pub price_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderMetadata {
  pub user_id: String,
  pub customer_email: Option<String>,
  pub shipping_address: ShippingAddress,
  pub items: Vec<MetadataItem>,
}

fn item_key(idx: usize) -> String {
  format!("items_{}", idx)
}

fn missing(what: impl std::fmt::Display) -> AppError {
  AppError::MissingOrderData(format!("Payment session metadata: {}", what))
}

impl OrderMetadata {
  pub fn encode(&self) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    out.insert(KEY_USER_ID.to_string(), self.user_id.clone());
    if let Some(email) = &self.customer_email {
      out.insert(KEY_CUSTOMER_EMAIL.to_string(), email.clone());
    }

    let address = serde_json::to_string(&self.shipping_address)
      .map_err(|e| AppError::Internal(format!("Failed to serialize shipping address: {}", e)))?;
    if address.chars().count() > MAX_VALUE_CHARS {
      return Err(AppError::InvalidInput("Shipping address is too long".to_string()));
    }
    out.insert(KEY_SHIPPING_ADDRESS.to_string(), address);

    let items = serde_json::to_string(&self.items)
      .map_err(|e| AppError::Internal(format!("Failed to serialize cart items: {}", e)))?;
    let chars: Vec<char> = items.chars().collect();
    let chunks: Vec<String> = chars.chunks(MAX_VALUE_CHARS).map(|c| c.iter().collect()).collect();
    if chunks.len() > MAX_ITEM_CHUNKS {
      return Err(AppError::InvalidInput(format!(
        "Cart is too large for checkout ({} lines)",
        self.items.len()
      )));
    }
    out.insert(KEY_ITEMS_COUNT.to_string(), chunks.len().to_string());
    for (idx, chunk) in chunks.into_iter().enumerate() {
      out.insert(item_key(idx), chunk);
    }
    Ok(out)
  }

  pub fn decode(metadata: &BTreeMap<String, String>) -> Result<Self> {
    let user_id = metadata
      .get(KEY_USER_ID)
      .filter(|v| !v.trim().is_empty())
      .cloned()
      .ok_or_else(|| missing("no user id"))?;
    let customer_email = metadata.get(KEY_CUSTOMER_EMAIL).filter(|v| !v.trim().is_empty()).cloned();

    let address_raw = metadata
      .get(KEY_SHIPPING_ADDRESS)
      .ok_or_else(|| missing("no shipping address"))?;
    let shipping_address: ShippingAddress =
      serde_json::from_str(address_raw).map_err(|e| missing(format_args!("malformed shipping address ({})", e)))?;

    let count: usize = metadata
      .get(KEY_ITEMS_COUNT)
      .ok_or_else(|| missing("no item list"))?
      .parse()
      .map_err(|_| missing("bad item chunk count"))?;
    if count == 0 || count > MAX_ITEM_CHUNKS {
      return Err(missing(format_args!("item chunk count {} out of range", count)));
    }
    let mut joined = String::new();
    for idx in 0..count {
      let chunk = metadata
        .get(&item_key(idx))
        .ok_or_else(|| missing(format_args!("item chunk {} missing", idx)))?;
      joined.push_str(chunk);
    }
    let items: Vec<MetadataItem> =
      serde_json::from_str(&joined).map_err(|e| missing(format_args!("malformed item list ({})", e)))?;
    if items.is_empty() {
      return Err(missing("empty item list"));
    }
    if items.iter().any(|i| i.quantity <= 0 || i.price_cents < 0) {
      return Err(missing("item with invalid quantity or price"));
    }

    Ok(Self {
      user_id,
      customer_email,
      shipping_address,
      items,
    })
  }

  pub fn items_total_cents(&self) -> i64 {
    self.items.iter().map(|i| i.price_cents * i.quantity as i64).sum()
  }
}
