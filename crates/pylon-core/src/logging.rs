//! Structured logging and secret redaction.
//!
//! Pylon logs through the `tracing` ecosystem. [`init_logging`] installs a
//! `tracing-subscriber` pipeline (JSON for production, pretty for
//! development); [`redact`] masks sensitive keys in structured payloads
//! before they are emitted.
//!
//! # Example
//!
//! ```rust,ignore
//! use pylon_core::logging::{LogConfig, init_logging};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(service = "auth", action = "login", "dispatching");
//! ```

use crate::env::Environment;
use crate::error::{PylonError, PylonResult};
use serde_json::Value;
use std::collections::HashSet;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Replacement string for redacted values.
pub const MASK: &str = "*****";

/// Env key holding extra comma-separated keys to hide in logs.
pub const HIDE_IN_LOGS: &str = "HIDE_IN_LOGS";

/// Keys masked in log payloads regardless of configuration.
pub const DEFAULT_HIDDEN_KEYS: &[&str] = &[
    "password",
    "pass",
    "pin",
    "secret",
    "token",
    "access_token",
    "refresh_token",
    "authorization",
    "api_key",
];

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled at all.
    pub enabled: bool,
    /// Env-filter directive (e.g. `info`, `pylon=debug`).
    pub level: String,
    /// Emit JSON records instead of pretty text.
    pub json_format: bool,
    /// Emit span enter/close events.
    pub span_events: bool,
    /// Include file and line in records.
    pub file_line_info: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            span_events: false,
            file_line_info: false,
        }
    }
}

impl LogConfig {
    /// Human-readable output at debug level.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            file_line_info: true,
            ..Self::default()
        }
    }

    /// JSON output at info level.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Picks development or production output based on the debug switch.
    #[must_use]
    pub fn from_env(env: &Environment) -> Self {
        if env.is_debug() {
            Self::development()
        } else {
            Self::production()
        }
    }
}

/// Installs the global `tracing` subscriber.
///
/// # Errors
///
/// Fails when the filter directive is invalid or a subscriber is already
/// installed.
pub fn init_logging(config: &LogConfig) -> PylonResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| PylonError::configuration(format!("Invalid log level: {e}")))?;

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_filter(filter);
        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| PylonError::configuration(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_filter(filter);
        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| PylonError::configuration(e.to_string()))?;
    }

    Ok(())
}

/// The set of keys to hide in logs: the defaults plus any comma-separated
/// names in the `HIDE_IN_LOGS` env value. Matching is case-insensitive.
#[must_use]
pub fn hidden_keys(env: &Environment) -> HashSet<String> {
    let mut keys: HashSet<String> = DEFAULT_HIDDEN_KEYS
        .iter()
        .map(|k| (*k).to_string())
        .collect();
    if let Some(extra) = env.get(HIDE_IN_LOGS) {
        keys.extend(
            extra
                .split(',')
                .map(|k| k.trim().to_ascii_lowercase())
                .filter(|k| !k.is_empty()),
        );
    }
    keys
}

/// Returns a copy of `value` with every field named in `hidden` masked.
///
/// Objects are walked recursively; arrays are walked element-wise. Scalars
/// pass through untouched.
#[must_use]
pub fn redact(value: &Value, hidden: &HashSet<String>) -> Value {
    match value {
        Value::Object(map) => {
            let redacted = map
                .iter()
                .map(|(key, inner)| {
                    if hidden.contains(&key.to_ascii_lowercase()) {
                        (key.clone(), Value::String(MASK.to_string()))
                    } else {
                        (key.clone(), redact(inner, hidden))
                    }
                })
                .collect();
            Value::Object(redacted)
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| redact(item, hidden)).collect())
        }
        scalar => scalar.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn default_hidden() -> HashSet<String> {
        hidden_keys(&Environment::new())
    }

    #[test]
    fn test_redact_top_level() {
        let payload = json!({"username": "alice", "password": "hunter2"});
        let redacted = redact(&payload, &default_hidden());
        assert_eq!(redacted["username"], "alice");
        assert_eq!(redacted["password"], MASK);
    }

    #[test]
    fn test_redact_nested_and_arrays() {
        let payload = json!({
            "users": [
                {"name": "a", "token": "t-1"},
                {"name": "b", "credentials": {"SECRET": "s"}}
            ]
        });
        let redacted = redact(&payload, &default_hidden());
        assert_eq!(redacted["users"][0]["token"], MASK);
        assert_eq!(redacted["users"][1]["credentials"]["SECRET"], MASK);
        assert_eq!(redacted["users"][0]["name"], "a");
    }

    #[test]
    fn test_hidden_keys_extension() {
        let env = Environment::new();
        env.set(HIDE_IN_LOGS, "ssn, Card_Number");
        let hidden = hidden_keys(&env);
        assert!(hidden.contains("ssn"));
        assert!(hidden.contains("card_number"));
        assert!(hidden.contains("password"));

        let payload = json!({"ssn": "123-45-6789", "card_number": "4111"});
        let redacted = redact(&payload, &hidden);
        assert_eq!(redacted["ssn"], MASK);
        assert_eq!(redacted["card_number"], MASK);
    }

    #[test]
    fn test_scalars_untouched() {
        let hidden = default_hidden();
        assert_eq!(redact(&json!(42), &hidden), json!(42));
        assert_eq!(redact(&json!("password"), &hidden), json!("password"));
    }
}
