//! Storage and rendering services consumed by plugins.
//!
//! Both services are asynchronous and report failures through the typed
//! errors defined here. Callers map these errors to user-visible state; none
//! of them is fatal.

use crate::{RenderedDocument, ResourceRef};
use async_trait::async_trait;
use thiserror::Error;

/// Failure to read a resource.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The resource does not exist
    #[error("resource not found: {path}")]
    NotFound { path: String },

    /// The resource path resolves outside the storage root
    #[error("invalid resource path: {path}")]
    InvalidPath { path: String },

    /// The resource exists but could not be read as text
    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Any other backend failure
    #[error("failed to read {path}: {message}")]
    Backend { path: String, message: String },
}

impl LoadError {
    /// Path of the resource that failed to load.
    pub fn path(&self) -> &str {
        match self {
            LoadError::NotFound { path }
            | LoadError::InvalidPath { path }
            | LoadError::Unreadable { path, .. }
            | LoadError::Backend { path, .. } => path,
        }
    }
}

/// Failure to persist a resource.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The write failed at the I/O layer
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The resource path resolves outside the storage root
    #[error("invalid resource path: {path}")]
    InvalidPath { path: String },

    /// Any other backend failure
    #[error("failed to write {path}: {message}")]
    Backend { path: String, message: String },
}

/// Failure to render text.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The input cannot be rendered
    #[error("malformed content in {path}: {message}")]
    Malformed { path: String, message: String },

    /// Any other renderer failure
    #[error("render failed: {message}")]
    Other { message: String },
}

/// Reads and writes text resources.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use loupe_plugin_api::{LoadError, ResourceRef, SaveError, Storage};
///
/// struct Fixed;
///
/// #[async_trait]
/// impl Storage for Fixed {
///     async fn read(&self, _resource: &ResourceRef) -> Result<String, LoadError> {
///         Ok("# Hello".to_string())
///     }
///
///     async fn write(&self, resource: &ResourceRef, _text: &str) -> Result<(), SaveError> {
///         Err(SaveError::Backend {
///             path: resource.path().to_string(),
///             message: "read-only".to_string(),
///         })
///     }
/// }
///
/// let storage = Fixed;
/// let text = tokio_test::block_on(storage.read(&ResourceRef::new("note.md"))).unwrap();
/// assert_eq!(text, "# Hello");
/// ```
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the full text of a resource.
    async fn read(&self, resource: &ResourceRef) -> Result<String, LoadError>;

    /// Replace the full text of a resource.
    async fn write(&self, resource: &ResourceRef, text: &str) -> Result<(), SaveError>;
}

/// Turns text into structured content.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `text` into `target`.
    ///
    /// `source` identifies the resource the text came from, for renderers
    /// that resolve relative links. Implementations must not panic on any
    /// input; unrenderable input is reported as [`RenderError`].
    async fn render(
        &self,
        text: &str,
        target: &mut RenderedDocument,
        source: &ResourceRef,
    ) -> Result<(), RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_path() {
        let err = LoadError::NotFound {
            path: "missing.md".into(),
        };
        assert_eq!(err.path(), "missing.md");
        assert_eq!(err.to_string(), "resource not found: missing.md");
    }

    #[test]
    fn test_save_error_keeps_io_source() {
        let err = SaveError::Io {
            path: "note.md".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("note.md"));
    }
}
