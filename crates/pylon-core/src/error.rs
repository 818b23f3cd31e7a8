//! Error types for Pylon.
//!
//! [`PylonError`] is the standard error type used throughout the framework.
//! Errors fall into two propagation classes:
//!
//! - **Component-local** errors (`Configuration`) are raised during boot-time
//!   registration (chains, switches, guards) and fail fast to the caller.
//! - **Request-scoped** errors (`NotFound`, `Authentication`, `Authorization`,
//!   `Resolution`) are recovered into the uniform response envelope at the
//!   dispatch boundary; anything else is caught only at the kernel's outermost
//!   boundary and rendered as a generic server error.
//!
//! The numeric code carried in the envelope for each category is configurable
//! through the environment; see [`ResponseCodes`].

use crate::env::Environment;
use crate::response::BaseResponse;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`PylonError`].
pub type PylonResult<T> = Result<T, PylonError>;

/// Categories of errors for classification and envelope-code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid middleware/auth/switch registration. Fatal at boot.
    Configuration,
    /// Missing route, service, action, or registry key.
    NotFound,
    /// Unauthenticated access.
    Authentication,
    /// Insufficient permission.
    Authorization,
    /// The container cannot construct or downcast a dependency.
    Resolution,
    /// Anything else; caught only at the kernel boundary.
    Internal,
}

/// Standard error type for Pylon.
///
/// # Example
///
/// ```
/// use pylon_core::{PylonError, ErrorCategory};
///
/// let err = PylonError::not_found("Service ghost not found");
/// assert_eq!(err.category(), ErrorCategory::NotFound);
/// ```
#[derive(Error, Debug)]
pub enum PylonError {
    /// Invalid registration detected at boot time.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Human-readable error message.
        message: String,
    },

    /// A route, service, action, or registry key was not found.
    #[error("{message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
    },

    /// The request is not authenticated.
    #[error("{message}")]
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// The authenticated user lacks permission.
    #[error("{message}")]
    Authorization {
        /// Human-readable error message.
        message: String,
    },

    /// The container failed to construct or downcast an entry.
    #[error("Resolution error: {message}")]
    Resolution {
        /// Human-readable error message.
        message: String,
    },

    /// Unclassified internal error.
    #[error("{message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error. Never exposed to clients.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl PylonError {
    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates an authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates an authorization error.
    #[must_use]
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    /// Creates a resolution error.
    #[must_use]
    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Authentication { .. } => ErrorCategory::Authentication,
            Self::Authorization { .. } => ErrorCategory::Authorization,
            Self::Resolution { .. } => ErrorCategory::Resolution,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the numeric envelope code for this error.
    #[must_use]
    pub const fn response_code(&self, codes: &ResponseCodes) -> i64 {
        match self.category() {
            ErrorCategory::NotFound => codes.not_found,
            ErrorCategory::Authentication => codes.unauthenticated,
            ErrorCategory::Authorization => codes.unauthorized,
            ErrorCategory::Configuration | ErrorCategory::Resolution | ErrorCategory::Internal => {
                codes.server_error
            }
        }
    }

    /// Renders this error into the uniform response envelope.
    ///
    /// Only the message and the configured numeric code are carried; sources
    /// and backtraces never reach the client.
    #[must_use]
    pub fn to_response(&self, codes: &ResponseCodes) -> BaseResponse {
        BaseResponse::error(self.response_code(codes), self.to_string())
    }
}

/// Numeric envelope codes for dispatch errors, configurable via environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseCodes {
    /// Code for missing routes, services, and actions.
    pub not_found: i64,
    /// Code for unauthenticated access.
    pub unauthenticated: i64,
    /// Code for insufficient permission.
    pub unauthorized: i64,
    /// Code for server-side failures.
    pub server_error: i64,
}

impl Default for ResponseCodes {
    fn default() -> Self {
        Self {
            not_found: 404,
            unauthenticated: 401,
            unauthorized: 403,
            server_error: 500,
        }
    }
}

impl ResponseCodes {
    /// Loads the codes from the environment, falling back to the defaults.
    ///
    /// Recognized keys: `NOT_FOUND_CODE`, `UNAUTHENTICATED_CODE`,
    /// `UNAUTHORIZED_CODE`, `SERVER_ERROR_CODE`.
    #[must_use]
    pub fn from_env(env: &Environment) -> Self {
        let defaults = Self::default();
        Self {
            not_found: env.get_int("NOT_FOUND_CODE", defaults.not_found),
            unauthenticated: env.get_int("UNAUTHENTICATED_CODE", defaults.unauthenticated),
            unauthorized: env.get_int("UNAUTHORIZED_CODE", defaults.unauthorized),
            server_error: env.get_int("SERVER_ERROR_CODE", defaults.server_error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            PylonError::configuration("x").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(PylonError::not_found("x").category(), ErrorCategory::NotFound);
        assert_eq!(
            PylonError::authentication("x").category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            PylonError::authorization("x").category(),
            ErrorCategory::Authorization
        );
        assert_eq!(
            PylonError::resolution("x").category(),
            ErrorCategory::Resolution
        );
        assert_eq!(PylonError::internal("x").category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_default_codes() {
        let codes = ResponseCodes::default();
        assert_eq!(codes.not_found, 404);
        assert_eq!(codes.unauthenticated, 401);
        assert_eq!(codes.unauthorized, 403);
        assert_eq!(codes.server_error, 500);
    }

    #[test]
    fn test_response_code_mapping() {
        let codes = ResponseCodes::default();
        assert_eq!(PylonError::not_found("x").response_code(&codes), 404);
        assert_eq!(PylonError::authentication("x").response_code(&codes), 401);
        assert_eq!(PylonError::authorization("x").response_code(&codes), 403);
        assert_eq!(PylonError::resolution("x").response_code(&codes), 500);
        assert_eq!(PylonError::internal("x").response_code(&codes), 500);
    }

    #[test]
    fn test_to_response_carries_message_only() {
        let codes = ResponseCodes::default();
        let err = PylonError::internal_with_source(
            "Something went wrong",
            std::io::Error::new(std::io::ErrorKind::Other, "disk exploded"),
        );
        let response = err.to_response(&codes);
        assert_eq!(response.return_code, 500);
        assert_eq!(response.return_message.as_deref(), Some("Something went wrong"));
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("disk exploded"));
    }

    #[test]
    fn test_codes_from_env() {
        let env = Environment::new();
        env.set("NOT_FOUND_CODE", "44");
        env.set("SERVER_ERROR_CODE", "50");
        let codes = ResponseCodes::from_env(&env);
        assert_eq!(codes.not_found, 44);
        assert_eq!(codes.server_error, 50);
        assert_eq!(codes.unauthenticated, 401);
    }
}
