//! # Error handling for Loupe Core
//!
//! This module provides the error type shared by the core services:
//! configuration, canvas loading and vault access. Collaborator-level
//! failures that plugins observe (load, save, render) stay typed in
//! `loupe-plugin-api`; this enum is what the host and its startup path see.

use thiserror::Error;

/// Result type used throughout Loupe Core.
///
/// # Example
///
/// ```rust
/// use loupe_core::{Result, Error};
///
/// fn example_function() -> Result<String> {
///     Ok("Success".to_string())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Loupe Core.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Canvas file errors
    #[error("Canvas error: {message}")]
    Canvas { message: String },

    /// File I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic error with custom message
    #[error("Error: {message}")]
    Generic { message: String },

    /// Validation errors
    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },
}

impl Error {
    /// Create a new configuration error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use loupe_core::Error;
    ///
    /// let error = Error::config("Invalid configuration file format");
    /// assert!(error.is_config());
    /// ```
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new canvas error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use loupe_core::Error;
    ///
    /// let error = Error::canvas("Unknown node type 'widget'");
    /// assert_eq!(error.category(), "Canvas");
    /// ```
    pub fn canvas<S: Into<String>>(message: S) -> Self {
        Self::Canvas {
            message: message.into(),
        }
    }

    /// Create a new generic error.
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Create a new validation error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use loupe_core::Error;
    ///
    /// let error = Error::validation("app.log_level", "Unknown level");
    /// assert!(error.is_validation());
    /// ```
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Check if this error is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Check if this error is an I/O error.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Check if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Get the error category as a string.
    ///
    /// # Example
    ///
    /// ```rust
    /// use loupe_core::Error;
    ///
    /// let error = Error::config("Invalid format");
    /// assert_eq!(error.category(), "Config");
    /// ```
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "Config",
            Self::Canvas { .. } => "Canvas",
            Self::Io(_) => "IO",
            Self::Json(_) => "JSON",
            Self::Toml(_) => "TOML",
            Self::Generic { .. } => "Generic",
            Self::Validation { .. } => "Validation",
        }
    }
}

/// Convenience macro for creating errors with context.
///
/// # Example
///
/// ```rust
/// use loupe_core::{error, Error};
///
/// let err = error!("Failed to load {}: {}", "board.canvas", "Permission denied");
/// assert_eq!(err.category(), "Generic");
/// ```
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::Error::generic(format!($($arg)*))
    };
}

/// Convenience macro for creating configuration errors.
///
/// # Example
///
/// ```rust
/// use loupe_core::{config_error, Error};
///
/// let err = config_error!("Invalid value for {}: {}", "log_level", "loud");
/// assert!(err.is_config());
/// ```
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::Error::config(format!($($arg)*))
    };
}

/// Convert from `anyhow::Error` to our custom error type.
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::generic(err.to_string())
    }
}
