//! Logging setup for Tether.
//!
//! Logging is off unless one of these environment variables asks for it:
//!
//! - `TETHER_DEBUG=true|1|yes` - Enable debug logging
//! - `TETHER_LOG_LEVEL=debug|info|warn|error|trace` - Set specific log level
//! - `TETHER_LOG_FORMAT=json|pretty|compact` - Set output format (default: json)
//!
//! Every fetch is logged at `debug` with the session id and the loading
//! strategy that caused it, so `TETHER_DEBUG=1` shows exactly how many
//! round trips eager, explicit, and lazy loading cost.
//!
//! ```rust,no_run
//! use tether_query::logging;
//!
//! // Call once at startup
//! logging::init();
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Crates whose spans and events are shown.
const TARGETS: &[&str] = &["tether_query", "tether_sqlite", "tether_lab", "tether_orm"];

/// Check if debug logging is enabled via `TETHER_DEBUG`.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("TETHER_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Get the configured log level from `TETHER_LOG_LEVEL`.
///
/// Defaults to "debug" if `TETHER_DEBUG` is enabled, otherwise "warn".
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("TETHER_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Get the configured log format from `TETHER_LOG_FORMAT`.
pub fn get_log_format() -> &'static str {
    env::var("TETHER_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// The filter directive for `level`, e.g. `tether_query=debug,tether_sqlite=debug,...`.
pub fn filter_directive(level: &str) -> String {
    TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the logging system.
///
/// Subsequent calls are no-ops. Without the `tracing-subscriber` feature this
/// installs nothing and events go to whatever subscriber the application set up.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("TETHER_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(filter_directive(level))
                .unwrap_or_else(|_| EnvFilter::new("warn"));

            let result = match get_log_format() {
                "json" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .try_init(),
                "compact" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact())
                    .try_init(),
                _ => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty())
                    .try_init(),
            };

            if result.is_ok() {
                tracing::info!(
                    level = level,
                    format = get_log_format(),
                    "Tether logging initialized"
                );
            }
        }
    });
}

/// Initialize logging with a specific level.
///
/// # Safety
///
/// This function modifies environment variables, which is unsafe in
/// multi-threaded programs. Call it at startup before spawning threads.
pub fn init_with_level(level: &str) {
    // SAFETY: only called at program startup before threads are spawned.
    unsafe {
        env::set_var("TETHER_LOG_LEVEL", level);
    }
    init();
}
