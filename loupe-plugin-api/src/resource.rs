//! Identity of a text resource in the vault.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Opaque identity and vault-relative path of a text resource.
///
/// A `ResourceRef` is the correlation key between a canvas selection, the
/// content shown in a preview panel, and the storage calls that persist it.
/// Two references are equal when their paths are equal.
///
/// # Example
///
/// ```rust
/// use loupe_plugin_api::ResourceRef;
///
/// let note = ResourceRef::new("journal/2024-01-01.md");
/// assert_eq!(note.display_name(), "2024-01-01");
/// assert_eq!(note.extension(), Some("md"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceRef {
    path: String,
}

impl ResourceRef {
    /// Create a reference from a vault-relative path.
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self { path: path.into() }
    }

    /// The vault-relative path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// File name without its extension, used for panel headers.
    pub fn display_name(&self) -> &str {
        Path::new(&self.path)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.path)
    }

    /// File extension, if any.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.path).extension().and_then(|ext| ext.to_str())
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl From<&str> for ResourceRef {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}
