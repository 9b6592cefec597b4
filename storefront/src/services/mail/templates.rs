// storefront/src/services/mail/templates.rs

//! HTML bodies for order notifications. Every interpolated value is escaped.

use crate::models::money::display_amount;
use crate::models::{OrderDetail, OrderStatus, ShippingAddress};
use std::fmt::Write;

pub const CONFIRMATION: &str = "confirmation";
pub const SHIPPED: &str = "shipped";
pub const DELIVERED: &str = "delivered";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
  pub template: &'static str,
  pub subject: String,
  pub html: String,
}

pub fn escape_html(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  for c in raw.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      other => out.push(other),
    }
  }
  out
}

/// Picks the template for a status. PENDING and CANCELLED have none.
pub fn for_status(status: OrderStatus, detail: &OrderDetail, customer_name: Option<&str>) -> Option<RenderedEmail> {
  match status {
    OrderStatus::Processing => Some(confirmation(detail, customer_name)),
    OrderStatus::Shipped => Some(shipped(detail, customer_name)),
    OrderStatus::Delivered => Some(delivered(detail, customer_name)),
    OrderStatus::Pending | OrderStatus::Cancelled => None,
  }
}

fn short_id(detail: &OrderDetail) -> String {
  detail.order.id.simple().to_string()[..8].to_uppercase()
}

fn greeting(customer_name: Option<&str>) -> String {
  let name = customer_name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or("there");
  format!("<p>Hi {},</p>", escape_html(name))
}

fn items_table(detail: &OrderDetail) -> String {
  let currency = &detail.order.currency;
  let mut rows = String::new();
  for item in &detail.items {
    let _ = write!(
      rows,
      "<tr><td>{} {}</td><td>{}</td><td>{}</td></tr>",
      escape_html(&item.product.brand),
      escape_html(&item.product.name),
      item.quantity,
      escape_html(&display_amount(item.price_cents * item.quantity as i64, currency)),
    );
  }
  format!(
    "<table><thead><tr><th>Item</th><th>Qty</th><th>Price</th></tr></thead><tbody>{}</tbody>\
     <tfoot><tr><td colspan=\"2\">Total</td><td>{}</td></tr></tfoot></table>",
    rows,
    escape_html(&display_amount(detail.order.total_amount_cents, currency)),
  )
}

fn address_block(address: &ShippingAddress) -> String {
  let mut lines = vec![address.name.as_str(), address.line1.as_str()];
  if let Some(line2) = address.line2.as_deref() {
    lines.push(line2);
  }
  let city_line = match address.state.as_deref() {
    Some(state) => format!("{}, {} {}", address.city, state, address.postal_code),
    None => format!("{} {}", address.city, address.postal_code),
  };
  let escaped: Vec<String> = lines
    .into_iter()
    .map(escape_html)
    .chain([escape_html(&city_line), escape_html(&address.country)])
    .collect();
  format!("<p>{}</p>", escaped.join("<br>"))
}

fn wrap(title: &str, body: String) -> String {
  format!(
    "<!DOCTYPE html><html><body style=\"font-family:sans-serif\"><h1>{}</h1>{}<p>With love,<br>GlowMart</p></body></html>",
    escape_html(title),
    body
  )
}

pub fn confirmation(detail: &OrderDetail, customer_name: Option<&str>) -> RenderedEmail {
  let id = short_id(detail);
  let body = format!(
    "{}<p>Thank you for your order! We're getting it ready.</p>{}<h3>Shipping to</h3>{}",
    greeting(customer_name),
    items_table(detail),
    address_block(&detail.order.shipping_address),
  );
  RenderedEmail {
    template: CONFIRMATION,
    subject: format!("Order #{} confirmed", id),
    html: wrap("Your order is confirmed", body),
  }
}

pub fn shipped(detail: &OrderDetail, customer_name: Option<&str>) -> RenderedEmail {
  let id = short_id(detail);
  let tracking = match detail.order.tracking_number.as_deref() {
    Some(number) => format!("<p>Tracking number: <strong>{}</strong></p>", escape_html(number)),
    None => String::new(),
  };
  let body = format!(
    "{}<p>Good news: order #{} is on its way.</p>{}{}",
    greeting(customer_name),
    id,
    tracking,
    items_table(detail),
  );
  RenderedEmail {
    template: SHIPPED,
    subject: format!("Order #{} has shipped", id),
    html: wrap("Your order has shipped", body),
  }
}

pub fn delivered(detail: &OrderDetail, customer_name: Option<&str>) -> RenderedEmail {
  let id = short_id(detail);
  let body = format!(
    "{}<p>Order #{} was delivered. We hope you love your new routine.</p>{}",
    greeting(customer_name),
    id,
    items_table(detail),
  );
  RenderedEmail {
    template: DELIVERED,
    subject: format!("Order #{} was delivered", id),
    html: wrap("Your order was delivered", body),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{Order, OrderItemDetail, ProductSnapshot};
  use chrono::Utc;
  use sqlx::types::Json;
  use uuid::Uuid;

  fn detail(tracking: Option<&str>) -> OrderDetail {
    let product_id = Uuid::new_v4();
    OrderDetail {
      order: Order {
        id: Uuid::new_v4(),
        user_id: "u1".into(),
        status: OrderStatus::Processing,
        total_amount_cents: 2000,
        currency: "usd".into(),
        shipping_address: Json(ShippingAddress {
          name: "Mina <Kim>".into(),
          line1: "1 Main St".into(),
          line2: None,
          city: "Portland".into(),
          state: Some("OR".into()),
          postal_code: "97201".into(),
          country: "US".into(),
        }),
        payment_session_id: "cs_test_1".into(),
        tracking_number: tracking.map(str::to_string),
        created_at: Utc::now(),
        updated_at: Utc::now(),
      },
      items: vec![OrderItemDetail {
        id: Uuid::new_v4(),
        product_id,
        quantity: 2,
        price_cents: 1000,
        product: ProductSnapshot {
          id: product_id,
          name: "Rice Toner".into(),
          brand: "I'm From".into(),
          image: None,
        },
      }],
    }
  }

  #[test]
  fn escapes_markup() {
    assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
  }

  #[test]
  fn confirmation_lists_items_and_escapes_values() {
    let email = confirmation(&detail(None), Some("<script>"));
    assert_eq!(email.template, CONFIRMATION);
    assert!(email.html.contains("$20.00"));
    assert!(email.html.contains("I&#39;m From Rice Toner"));
    assert!(email.html.contains("Mina &lt;Kim&gt;"));
    assert!(!email.html.contains("<script>"));
  }

  #[test]
  fn shipped_includes_tracking_only_when_known() {
    assert!(shipped(&detail(Some("1Z999AA1")), None).html.contains("1Z999AA1"));
    assert!(!shipped(&detail(None), None).html.contains("Tracking number"));
  }

  #[test]
  fn template_selection_follows_status() {
    let d = detail(None);
    assert_eq!(for_status(OrderStatus::Processing, &d, None).map(|e| e.template), Some(CONFIRMATION));
    assert_eq!(for_status(OrderStatus::Shipped, &d, None).map(|e| e.template), Some(SHIPPED));
    assert_eq!(for_status(OrderStatus::Delivered, &d, None).map(|e| e.template), Some(DELIVERED));
    assert!(for_status(OrderStatus::Cancelled, &d, None).is_none());
    assert!(for_status(OrderStatus::Pending, &d, None).is_none());
  }
}
