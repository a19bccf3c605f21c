//! # Loupe Core
//!
//! Core services for the Loupe canvas note previewer: the TOML
//! configuration, the error type, the filesystem vault behind the
//! [`Storage`](loupe_plugin_api::Storage) service, JSON Canvas loading, and
//! tracing setup.
//!
//! ## Example
//!
//! ```rust
//! use loupe_core::{Config, VaultStorage};
//! use loupe_plugin_api::PluginContext;
//!
//! let config = Config::default();
//! let mut ctx = PluginContext::new();
//! config.apply_to(&mut ctx);
//!
//! let vault = VaultStorage::new(std::env::temp_dir());
//! assert!(vault.root().is_absolute());
//! ```

pub mod canvas_file;
pub mod config;
pub mod error;
pub mod storage;

pub use canvas_file::{CanvasDocument, CanvasNodeRecord, NodeGeometry};
pub use config::Config;
pub use error::{Error, Result};
pub use loupe_plugin_api::event::{Event, EventType};
pub use storage::VaultStorage;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for the application
///
/// `RUST_LOG` takes precedence over `default_level` when set. Installing a
/// subscriber twice is harmless: the second call leaves the first in place.
///
/// # Example
///
/// ```rust
/// loupe_core::init_tracing(tracing::Level::INFO);
/// tracing::info!("Application started");
/// ```
pub fn init_tracing(default_level: tracing::Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str().to_lowercase()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing() {
        // Should not panic, even when called twice
        init_tracing(tracing::Level::DEBUG);
        init_tracing(tracing::Level::INFO);
    }
}
