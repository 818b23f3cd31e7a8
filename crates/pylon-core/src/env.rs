//! Environment settings.
//!
//! [`Environment`] is a thread-safe string map seeded from process
//! environment variables and optional `.env` files. Reads fall back through
//! the in-memory overrides to the process environment, so tests can override
//! values without touching the process state.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;

/// Keys commonly consulted by the framework itself.
pub mod keys {
    /// Human-readable application name.
    pub const APP_NAME: &str = "APP_NAME";
    /// Debug switch; gates the ping endpoint and verbose error output.
    pub const DEBUG: &str = "DEBUG";
    /// Base path prefix for all API routes.
    pub const API_BASE: &str = "API_BASE";
    /// Comma-separated middleware names to enable at boot.
    pub const MIDDLEWARES: &str = "MIDDLEWARES";
    /// Comma-separated authentication backend names to enable at boot.
    pub const AUTHENTICATIONS: &str = "AUTHENTICATIONS";
}

/// Thread-safe environment settings with process-env fallback.
#[derive(Default)]
pub struct Environment {
    overrides: RwLock<HashMap<String, String>>,
}

impl Environment {
    /// Creates an empty environment; reads fall through to process env vars.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an environment after loading `.env` from the working
    /// directory, if present. Missing files are not an error.
    #[must_use]
    pub fn from_dotenv() -> Self {
        let _ = dotenvy::dotenv();
        Self::new()
    }

    /// Loads additional variables from a specific env file into the process
    /// environment. Existing variables are not overwritten.
    pub fn load_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        dotenvy::from_path(path.as_ref())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Sets an override visible to subsequent reads.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.overrides.write().insert(key.into(), value.into());
    }

    /// Returns the value for `key`: overrides first, then process env.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.overrides.read().get(key) {
            return Some(value.clone());
        }
        std::env::var(key).ok()
    }

    /// Returns the value for `key`, or `default` when unset.
    #[must_use]
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Returns true when `key` holds a present value.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Parses `key` as a boolean. Accepts `1`, `true`, `yes`, `on`
    /// case-insensitively; anything else (including unset) is `default`.
    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(raw) => matches!(
                raw.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            ),
            None => default,
        }
    }

    /// Parses `key` as an integer, falling back to `default` on absence or
    /// parse failure.
    #[must_use]
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get(key)
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Whether the application runs in debug mode. Defaults to false.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.get_bool(keys::DEBUG, false)
    }

    /// The configured application name.
    #[must_use]
    pub fn app_name(&self) -> String {
        self.get_or(keys::APP_NAME, "Pylon")
    }

    /// The base path under which all API routes are mounted.
    ///
    /// Always returned with leading and trailing slashes.
    #[must_use]
    pub fn api_base(&self) -> String {
        let raw = self.get_or(keys::API_BASE, "/api/");
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{trimmed}/")
        }
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("overrides", &self.overrides.read().len())
            .finish()
    }
}
