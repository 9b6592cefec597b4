// storefront/src/services/payments/signature.rs

//! Verification of signed webhook deliveries.
//!
//! The header looks like `t=1700000000,v1=<hex>[,v1=<hex>...]`. Each `v1` is
//! HMAC-SHA256 over `"{t}.{raw body}"` keyed with the shared secret. Any one
//! matching signature is enough, provided `t` is within the tolerance window.

use crate::errors::{AppError, Result};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

pub struct WebhookVerifier {
  secret: String,
  tolerance: Duration,
}

impl WebhookVerifier {
  pub fn new(secret: impl Into<String>, tolerance: Duration) -> Self {
    Self {
      secret: secret.into(),
      tolerance,
    }
  }

  pub fn verify(&self, payload: &[u8], header: &str) -> Result<()> {
    self.verify_at(payload, header, Utc::now().timestamp())
  }

  pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<()> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();
    for part in header.split(',') {
      match part.trim().split_once('=') {
        Some(("t", value)) => timestamp = Some(value),
        Some(("v1", value)) => signatures.push(value),
        _ => {}
      }
    }

    let timestamp = timestamp.ok_or_else(|| rejected("no timestamp"))?;
    if signatures.is_empty() {
      return Err(rejected("no v1 signature"));
    }
    let sent_at: i64 = timestamp.parse().map_err(|_| rejected("malformed timestamp"))?;
    if (now - sent_at).unsigned_abs() > self.tolerance.as_secs() {
      return Err(rejected("timestamp outside tolerance"));
    }

    let matched = signatures.iter().any(|candidate| {
      let Ok(expected) = hex::decode(candidate) else {
        return false;
      };
      let mut mac = self.mac();
      mac.update(timestamp.as_bytes());
      mac.update(b".");
      mac.update(payload);
      // `verify_slice` compares in constant time.
      mac.verify_slice(&expected).is_ok()
    });
    if !matched {
      return Err(rejected("signature mismatch"));
    }
    Ok(())
  }

  /// Produces a header value for `payload`; used by the mock gateway and tests.
  pub fn sign(&self, payload: &[u8], timestamp: i64) -> String {
    let mut mac = self.mac();
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
  }

  fn mac(&self) -> HmacSha256 {
    // HMAC accepts keys of any length, so this cannot fail.
    match HmacSha256::new_from_slice(self.secret.as_bytes()) {
      Ok(mac) => mac,
      Err(_) => unreachable!("HMAC-SHA256 accepts any key length"),
    }
  }
}

fn rejected(reason: &str) -> AppError {
  tracing::warn!(reason, "webhook signature rejected");
  AppError::Unauthorized(format!("Invalid webhook signature: {}", reason))
}

#[cfg(test)]
mod tests {
  use super::*;

  const NOW: i64 = 1_760_000_000;
  const BODY: &[u8] = br#"{"type":"checkout.session.completed"}"#;

  fn verifier() -> WebhookVerifier {
    WebhookVerifier::new("whsec_test123secret456", Duration::from_secs(300))
  }

  #[test]
  fn accepts_own_signature() {
    let v = verifier();
    let header = v.sign(BODY, NOW);
    assert!(v.verify_at(BODY, &header, NOW + 10).is_ok());
  }

  #[test]
  fn rejects_wrong_secret_and_tampered_body() {
    let header = WebhookVerifier::new("other", Duration::from_secs(300)).sign(BODY, NOW);
    assert!(matches!(verifier().verify_at(BODY, &header, NOW), Err(AppError::Unauthorized(_))));

    let header = verifier().sign(BODY, NOW);
    let tampered = br#"{"type":"checkout.session.completed","x":1}"#;
    assert!(verifier().verify_at(tampered, &header, NOW).is_err());
  }

  #[test]
  fn rejects_stale_timestamps() {
    let header = verifier().sign(BODY, NOW - 600);
    assert!(verifier().verify_at(BODY, &header, NOW).is_err());
  }

  #[test]
  fn any_v1_may_match_during_secret_rotation() {
    let good = verifier().sign(BODY, NOW);
    let good_sig = good.split("v1=").nth(1).unwrap();
    let header = format!("t={},v1={},v1={}", NOW, "00".repeat(32), good_sig);
    assert!(verifier().verify_at(BODY, &header, NOW).is_ok());
  }

  #[test]
  fn rejects_malformed_headers() {
    let headers = vec![
      String::new(),
      "v1=abcd".to_string(),
      "t=now,v1=abcd".to_string(),
      format!("t={}", NOW),
      format!("t={},v1=zz", NOW),
    ];
    for header in headers {
      assert!(verifier().verify_at(BODY, &header, NOW).is_err(), "{header}");
    }
  }
}
