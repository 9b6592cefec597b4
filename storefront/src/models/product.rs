// storefront/src/models/product.rs

use crate::errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: i64 = 24;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub brand: String,
  pub category: String,
  pub description: Option<String>,
  pub price_cents: i64,
  pub images: Vec<String>,
  pub is_vegan: bool,
  pub is_cruelty_free: bool,
  pub stock: i32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Product {
  pub fn primary_image(&self) -> Option<&str> {
    self.images.first().map(String::as_str)
  }
}

/// Catalog filters as accepted on `GET /products`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
  pub q: Option<String>,
  pub category: Option<String>,
  pub brand: Option<String>,
  pub vegan: Option<bool>,
  pub cruelty_free: Option<bool>,
  pub in_stock: Option<bool>,
  pub limit: Option<i64>,
  pub offset: Option<i64>,
}

impl ProductQuery {
  pub fn limit(&self) -> i64 {
    self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
  }

  pub fn offset(&self) -> i64 {
    self.offset.unwrap_or(0).max(0)
  }

  /// Search term, or `None` when blank.
  pub fn search_term(&self) -> Option<&str> {
    self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
  }

  /// In-process equivalent of the SQL filter.
  pub fn matches(&self, product: &Product) -> bool {
    if let Some(term) = self.search_term() {
      let term = term.to_lowercase();
      let hit = product.name.to_lowercase().contains(&term)
        || product.brand.to_lowercase().contains(&term)
        || product
          .description
          .as_deref()
          .is_some_and(|d| d.to_lowercase().contains(&term));
      if !hit {
        return false;
      }
    }
    if let Some(category) = &self.category {
      if !product.category.eq_ignore_ascii_case(category) {
        return false;
      }
    }
    if let Some(brand) = &self.brand {
      if !product.brand.eq_ignore_ascii_case(brand) {
        return false;
      }
    }
    if self.vegan.is_some_and(|v| v != product.is_vegan) {
      return false;
    }
    if self.cruelty_free.is_some_and(|v| v != product.is_cruelty_free) {
      return false;
    }
    if self.in_stock == Some(true) && product.stock <= 0 {
      return false;
    }
    true
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
  pub name: String,
  pub brand: String,
  pub category: String,
  #[serde(default)]
  pub description: Option<String>,
  pub price_cents: i64,
  #[serde(default)]
  pub images: Vec<String>,
  #[serde(default)]
  pub is_vegan: bool,
  #[serde(default)]
  pub is_cruelty_free: bool,
  pub stock: i32,
}

impl NewProduct {
  pub fn validate(&self) -> Result<(), AppError> {
    require_text("name", &self.name)?;
    require_text("brand", &self.brand)?;
    require_text("category", &self.category)?;
    require_price(self.price_cents)?;
    require_stock(self.stock)?;
    require_images(&self.images)
  }
}

/// Partial update; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
  pub name: Option<String>,
  pub brand: Option<String>,
  pub category: Option<String>,
  pub description: Option<String>,
  pub price_cents: Option<i64>,
  pub images: Option<Vec<String>>,
  pub is_vegan: Option<bool>,
  pub is_cruelty_free: Option<bool>,
  pub stock: Option<i32>,
}

impl ProductPatch {
  pub fn validate(&self) -> Result<(), AppError> {
    if let Some(name) = &self.name {
      require_text("name", name)?;
    }
    if let Some(brand) = &self.brand {
      require_text("brand", brand)?;
    }
    if let Some(category) = &self.category {
      require_text("category", category)?;
    }
    if let Some(price) = self.price_cents {
      require_price(price)?;
    }
    if let Some(stock) = self.stock {
      require_stock(stock)?;
    }
    if let Some(images) = &self.images {
      require_images(images)?;
    }
    Ok(())
  }

  pub fn is_empty(&self) -> bool {
    self.name.is_none()
      && self.brand.is_none()
      && self.category.is_none()
      && self.description.is_none()
      && self.price_cents.is_none()
      && self.images.is_none()
      && self.is_vegan.is_none()
      && self.is_cruelty_free.is_none()
      && self.stock.is_none()
  }

  pub fn apply_to(&self, product: &mut Product) {
    if let Some(v) = &self.name {
      product.name = v.trim().to_string();
    }
    if let Some(v) = &self.brand {
      product.brand = v.trim().to_string();
    }
    if let Some(v) = &self.category {
      product.category = v.trim().to_string();
    }
    if let Some(v) = &self.description {
      product.description = Some(v.clone());
    }
    if let Some(v) = self.price_cents {
      product.price_cents = v;
    }
    if let Some(v) = &self.images {
      product.images = v.clone();
    }
    if let Some(v) = self.is_vegan {
      product.is_vegan = v;
    }
    if let Some(v) = self.is_cruelty_free {
      product.is_cruelty_free = v;
    }
    if let Some(v) = self.stock {
      product.stock = v;
    }
    product.updated_at = Utc::now();
  }
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
  if value.trim().is_empty() {
    return Err(AppError::InvalidInput(format!("{} must not be empty", field)));
  }
  Ok(())
}

fn require_price(price_cents: i64) -> Result<(), AppError> {
  if price_cents <= 0 {
    return Err(AppError::InvalidInput("priceCents must be positive".to_string()));
  }
  Ok(())
}

fn require_stock(stock: i32) -> Result<(), AppError> {
  if stock < 0 {
    return Err(AppError::InvalidInput("stock must not be negative".to_string()));
  }
  Ok(())
}

fn require_images(images: &[String]) -> Result<(), AppError> {
  if images.iter().any(|url| url.trim().is_empty()) {
    return Err(AppError::InvalidInput("image URLs must not be empty".to_string()));
  }
  Ok(())
}
