//! Application configuration loaded from environment variables.
//!
//! All configuration is loaded from environment variables with sensible defaults
//! for development. A `.env` file is honored if present.
//!
//! # Unwrapping
//!
//! - `PUBSUB_CONTENT_TYPE`: Content type of the unwrapped request (default: `application/json`)
//! - `PUBSUB_ALLOW_ATTRIBUTES`: Accept envelopes carrying attributes (default: `true`)
//! - `PUBSUB_ATTRIBUTES_TO_QUERY`: Turn attributes into the query string (default: `false`)
//! - `MAX_ENVELOPE_SIZE`: Largest accepted envelope in bytes (default: 10MB)
//!
//! # Server
//!
//! - `HOST` / `PORT`: Bind address of the demo server (default: `0.0.0.0:8080`)
//! - `METRICS_PORT`: Prometheus exporter port (default: 0 = disabled)

use std::env;

use axum::http::HeaderValue;

use crate::error::{AppError, AppResult};
use crate::middleware::{DEFAULT_CONTENT_TYPE, DEFAULT_MAX_ENVELOPE_SIZE, UnwrapConfig};

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// let layer = PubsubUnwrapLayer::new(config.unwrap_config()?);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 8080)
    pub port: u16,

    // =========================================================================
    // Unwrapping Configuration
    // =========================================================================
    /// Content type set on unwrapped requests
    pub content_type: String,

    /// Whether envelopes with attributes are accepted
    pub allow_attributes: bool,

    /// Whether attributes replace the request's query string
    pub attributes_to_query: bool,

    /// Maximum envelope body size in bytes (default: 10MB)
    pub max_envelope_size: usize,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    /// Port for Prometheus metrics endpoint (default: 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if any value fails to parse or validate.
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 8080)?,

            content_type: env::var("PUBSUB_CONTENT_TYPE")
                .unwrap_or_else(|_| DEFAULT_CONTENT_TYPE.to_string()),
            allow_attributes: Self::parse_bool_env("PUBSUB_ALLOW_ATTRIBUTES", true)?,
            attributes_to_query: Self::parse_bool_env("PUBSUB_ATTRIBUTES_TO_QUERY", false)?,
            max_envelope_size: Self::parse_env("MAX_ENVELOPE_SIZE", DEFAULT_MAX_ENVELOPE_SIZE)?,

            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            metrics_port: Self::parse_env("METRICS_PORT", 0)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    fn validate(&self) -> AppResult<()> {
        if HeaderValue::from_str(&self.content_type).is_err() || self.content_type.is_empty() {
            return Err(AppError::ConfigError(format!(
                "PUBSUB_CONTENT_TYPE ({:?}) is not a valid header value",
                self.content_type
            )));
        }

        if self.max_envelope_size == 0 {
            return Err(AppError::ConfigError(
                "MAX_ENVELOPE_SIZE must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the middleware configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if the content type is not a valid header value.
    pub fn unwrap_config(&self) -> AppResult<UnwrapConfig> {
        let config = UnwrapConfig::default()
            .with_content_type(&self.content_type)
            .map_err(|e| AppError::ConfigError(format!("Invalid PUBSUB_CONTENT_TYPE: {e}")))?
            .with_allow_attributes(self.allow_attributes)
            .with_attributes_to_query(self.attributes_to_query)
            .with_max_envelope_size(self.max_envelope_size);
        Ok(config)
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address, or `None` if metrics are disabled.
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        self.metrics_enabled()
            .then(|| std::net::SocketAddr::from(([0, 0, 0, 0], self.metrics_port)))
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse a boolean flag; accepts `true/false`, `1/0`, `yes/no`, `on/off`.
    fn parse_bool_env(name: &str, default: bool) -> AppResult<bool> {
        match env::var(name) {
            Ok(val) => parse_bool(&val)
                .ok_or_else(|| AppError::ConfigError(format!("Invalid {name}: {val:?}"))),
            Err(_) => Ok(default),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Default configuration for testing and development.
impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            allow_attributes: true,
            attributes_to_query: false,
            max_envelope_size: DEFAULT_MAX_ENVELOPE_SIZE,
            log_level: "info".to_string(),
            metrics_port: 0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();

        assert_eq!(config.port, 8080);
        assert_eq!(config.content_type, "application/json");
        assert!(config.allow_attributes);
        assert!(!config.attributes_to_query);
        assert!(!config.metrics_enabled());
        assert!(config.metrics_addr().is_none());
    }

    #[test]
    fn test_server_addr_format() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 9000,
            ..Config::default()
        };

        assert_eq!(config.server_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_content_type() {
        let config = Config {
            content_type: "text/plain\r\nx-injected: 1".to_string(),
            ..Config::default()
        };

        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("PUBSUB_CONTENT_TYPE"));
    }

    #[test]
    fn test_validate_empty_content_type() {
        let config = Config {
            content_type: String::new(),
            ..Config::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_envelope_size() {
        let config = Config {
            max_envelope_size: 0,
            ..Config::default()
        };

        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("MAX_ENVELOPE_SIZE"));
    }

    #[test]
    fn test_unwrap_config_carries_flags() {
        let config = Config {
            content_type: "text/plain".to_string(),
            allow_attributes: false,
            attributes_to_query: true,
            max_envelope_size: 1024,
            ..Config::default()
        };

        let unwrap = config.unwrap_config().unwrap();
        assert_eq!(unwrap.content_type, "text/plain");
        assert!(!unwrap.allow_attributes);
        assert!(unwrap.attributes_to_query);
        assert_eq!(unwrap.max_envelope_size, 1024);
    }

    #[test]
    fn test_metrics_addr_when_enabled() {
        let config = Config {
            metrics_port: 9090,
            ..Config::default()
        };

        assert_eq!(config.metrics_addr().unwrap().port(), 9090);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" 0 "), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
