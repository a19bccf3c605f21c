//! # Vault storage
//!
//! [`VaultStorage`] implements the [`Storage`] service over a directory of
//! text files. Resource paths are resolved relative to the vault root;
//! absolute paths and paths that climb out of the root are rejected before
//! touching the filesystem.

use async_trait::async_trait;
use loupe_plugin_api::{LoadError, ResourceRef, SaveError, Storage};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Text resources stored as files under a root directory.
///
/// # Example
///
/// ```rust
/// use loupe_core::VaultStorage;
/// use loupe_plugin_api::{ResourceRef, Storage};
///
/// # tokio_test::block_on(async {
/// let dir = tempfile::tempdir()?;
/// let vault = VaultStorage::new(dir.path());
/// let note = ResourceRef::new("note.md");
///
/// vault.write(&note, "# Hello").await?;
/// assert_eq!(vault.read(&note).await?, "# Hello");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct VaultStorage {
    root: PathBuf,
}

impl VaultStorage {
    /// Create a storage rooted at `root`.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// The vault root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a resource to a file path inside the vault.
    ///
    /// Returns `None` for empty, absolute or parent-relative paths.
    pub fn resolve(&self, resource: &ResourceRef) -> Option<PathBuf> {
        let relative = Path::new(resource.path());
        if resource.path().is_empty() {
            return None;
        }
        let contained = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        contained.then(|| self.root.join(relative))
    }
}

#[async_trait]
impl Storage for VaultStorage {
    async fn read(&self, resource: &ResourceRef) -> Result<String, LoadError> {
        let path = self.resolve(resource).ok_or_else(|| LoadError::InvalidPath {
            path: resource.path().to_string(),
        })?;

        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                debug!(resource = %resource, bytes = text.len(), "read resource");
                Ok(text)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(LoadError::NotFound {
                path: resource.path().to_string(),
            }),
            Err(e) => {
                warn!(resource = %resource, "failed to read resource: {}", e);
                Err(LoadError::Unreadable {
                    path: resource.path().to_string(),
                    source: e,
                })
            }
        }
    }

    async fn write(&self, resource: &ResourceRef, text: &str) -> Result<(), SaveError> {
        let path = self.resolve(resource).ok_or_else(|| SaveError::InvalidPath {
            path: resource.path().to_string(),
        })?;

        tokio::fs::write(&path, text)
            .await
            .map_err(|e| SaveError::Io {
                path: resource.path().to_string(),
                source: e,
            })?;

        debug!(resource = %resource, bytes = text.len(), "wrote resource");
        Ok(())
    }
}
