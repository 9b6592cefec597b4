// storefront/src/models/email_log.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SqlxType)]
#[sqlx(type_name = "email_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum EmailStatus {
  Sent,
  Failed,
}

/// One dispatch outcome, after all retries.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmailLog {
  pub id: Uuid,
  pub recipient: String,
  pub subject: String,
  pub template: String,
  pub order_id: Option<Uuid>,
  pub status: EmailStatus,
  pub attempts: i32,
  pub last_error: Option<String>,
  pub provider_message_id: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEmailLog {
  pub recipient: String,
  pub subject: String,
  pub template: String,
  pub order_id: Option<Uuid>,
  pub status: EmailStatus,
  pub attempts: i32,
  pub last_error: Option<String>,
  pub provider_message_id: Option<String>,
}
