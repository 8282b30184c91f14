//! The single error kind raised by configuration validation.
//!
//! Operators fix their configuration by reading these messages, so the
//! message text is the contract; there is no error hierarchy to match on.

use thiserror::Error;

/// A configuration document failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::new(format!("Failed to parse configuration: {err}"))
    }
}

/// Return early with a [`ConfigError`] built from a format string.
#[macro_export]
macro_rules! config_bail {
    ($($arg:tt)*) => {
        return Err($crate::error::ConfigError::new(format!($($arg)*)))
    };
}
