// storefront/src/models/money.rs

/// `2000` -> `"20.00"`. Integer arithmetic only.
pub fn format_cents(cents: i64) -> String {
  let sign = if cents < 0 { "-" } else { "" };
  let abs = cents.unsigned_abs();
  format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Human-facing amount, e.g. `$20.00` or `20.00 KRW`.
pub fn display_amount(cents: i64, currency: &str) -> String {
  match currency.to_ascii_lowercase().as_str() {
    "usd" => format!("${}", format_cents(cents)),
    "eur" => format!("€{}", format_cents(cents)),
    other => format!("{} {}", format_cents(cents), other.to_ascii_uppercase()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn formats_minor_units() {
    assert_eq!(format_cents(2000), "20.00");
    assert_eq!(format_cents(5), "0.05");
    assert_eq!(format_cents(0), "0.00");
    assert_eq!(format_cents(-150), "-1.50");
  }

  #[test]
  fn display_uses_currency() {
    assert_eq!(display_amount(1999, "USD"), "$19.99");
    assert_eq!(display_amount(1000, "krw"), "10.00 KRW");
  }
}
