// storefront/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Local account record. The id is the auth provider's subject.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: String,
  pub email: String,
  pub name: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
  pub id: String,
  pub email: String,
  pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
  Admin,
  Customer,
}

/// The authenticated caller as forwarded by the auth provider.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
  pub id: String,
  pub email: String,
  pub name: Option<String>,
  pub role: Role,
}

impl Principal {
  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }

  /// Owners and admins may see an order.
  pub fn can_view(&self, owner_id: &str) -> bool {
    self.is_admin() || self.id == owner_id
  }
}
