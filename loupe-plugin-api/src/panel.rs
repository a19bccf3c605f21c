//! Panel host contracts for Loupe UI plugins.
//!
//! The host owns panel layout. Plugins ask it for panels of a given
//! [`PanelKind`], mount their view into them, and bring them to the front.
//! The user may close a panel at any time, so plugins must treat a
//! [`PanelHandle`] as a lookup key rather than a guarantee that the panel
//! still exists: [`PanelHost::view`] returns `None` for a destroyed panel.
//!
//! # Example
//!
//! ```rust
//! use loupe_plugin_api::{PanelKind, PanelRegion};
//!
//! let kind = PanelKind::new("canvas-note-preview", "Note preview");
//! assert_eq!(kind.id(), "canvas-note-preview");
//! assert_eq!(PanelRegion::Right.display_name(), "Right sidebar");
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Type of a panel, shared by every panel instance of that type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PanelKind {
    id: String,
    display_name: String,
}

impl PanelKind {
    pub fn new<S: Into<String>>(id: S, display_name: S) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }

    /// Stable type identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Title shown in the panel header
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// Identity of one panel instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PanelHandle {
    id: Uuid,
    kind: PanelKind,
}

impl PanelHandle {
    /// Create a handle for a freshly created panel.
    pub fn new(kind: PanelKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> &PanelKind {
        &self.kind
    }
}

impl fmt::Display for PanelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind.id, self.id)
    }
}

/// Region of the workspace a panel is docked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelRegion {
    /// Docked to the left side of the main content
    Left,
    /// Docked to the right side of the main content
    #[default]
    Right,
    /// Docked below the main content
    Bottom,
    /// Floating as a separate window
    Floating,
}

impl PanelRegion {
    /// Get a human-readable name for the region.
    pub fn display_name(&self) -> &'static str {
        match self {
            PanelRegion::Left => "Left sidebar",
            PanelRegion::Right => "Right sidebar",
            PanelRegion::Bottom => "Bottom panel",
            PanelRegion::Floating => "Floating window",
        }
    }
}

/// Failures raised by panel hosts.
#[derive(Debug, Error)]
pub enum PanelError {
    /// The host refused to create a panel
    #[error("could not create {kind} panel: {message}")]
    CreateFailed { kind: String, message: String },

    /// The panel no longer exists
    #[error("panel {0} no longer exists")]
    Gone(Uuid),

    /// The panel exists but no view is mounted in it
    #[error("panel {0} has no mounted view")]
    NotMounted(Uuid),
}

/// Host-side panel management.
///
/// `V` is the view type mounted into panels: a cheap cloneable handle the
/// host stores and draws every frame.
#[async_trait]
pub trait PanelHost<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Existing panels of `kind`, in host order.
    async fn find_existing_panels(&self, kind: &PanelKind) -> Vec<PanelHandle>;

    /// Create an empty panel of `kind` in `region`.
    async fn create_panel(
        &self,
        kind: &PanelKind,
        region: PanelRegion,
    ) -> Result<PanelHandle, PanelError>;

    /// Bring a panel to the front and make it visible.
    async fn reveal(&self, panel: &PanelHandle) -> Result<(), PanelError>;

    /// Bind a view to a panel, replacing any previous view.
    async fn mount(&self, panel: &PanelHandle, view: V) -> Result<(), PanelError>;

    /// The view bound to a panel, or `None` if the panel was destroyed or
    /// has nothing mounted.
    async fn view(&self, panel: &PanelHandle) -> Option<V>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique_per_panel() {
        let kind = PanelKind::new("k", "Kind");
        let a = PanelHandle::new(kind.clone());
        let b = PanelHandle::new(kind);
        assert_ne!(a, b);
        assert_eq!(a.kind(), b.kind());
        assert!(a.to_string().starts_with("k#"));
    }

    #[test]
    fn test_region_defaults_to_right() {
        assert_eq!(PanelRegion::default(), PanelRegion::Right);
        let json = serde_json::to_string(&PanelRegion::Left).unwrap();
        assert_eq!(json, "\"left\"");
    }
}
