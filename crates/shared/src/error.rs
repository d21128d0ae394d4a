//! Startup error types.
//!
//! Request-path failures carry their own taxonomy (`GroupError`,
//! `PaymentError`); this type only covers what can stop the process before
//! it serves anything.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Errors raised while assembling the application.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration sources could not be read or deserialized.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A setting deserialized but holds an unsupported value.
    #[error("Invalid setting {key}: {reason}")]
    InvalidSetting {
        /// Dotted path of the setting.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_from_source() {
        let err = AppError::from(config::ConfigError::NotFound("database.url".to_string()));
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().starts_with("Configuration error: "));
        assert!(err.to_string().contains("database.url"));
    }

    #[test]
    fn test_invalid_setting_display() {
        let err = AppError::InvalidSetting {
            key: "gateway.currency",
            reason: "unsupported currency: XYZ".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid setting gateway.currency: unsupported currency: XYZ"
        );
    }
}
