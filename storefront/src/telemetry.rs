// storefront/src/telemetry.rs

use crate::config::LogFormat;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` overrides the default `info`.
pub fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}

/// Reads `LOG_FORMAT` before the full configuration is loaded, so config
/// errors are logged in the requested format.
pub fn log_format_from_env() -> LogFormat {
  match std::env::var("LOG_FORMAT") {
    Ok(v) if v.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
    _ => LogFormat::Pretty,
  }
}
