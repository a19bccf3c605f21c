//! Display mode and save status of a preview session.

use serde::{Deserialize, Serialize};

/// Which surface a preview panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Rendered content (the default on every load)
    #[default]
    Preview,
    /// Editable plain text
    Edit,
}

impl Mode {
    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            Mode::Preview => Mode::Edit,
            Mode::Edit => Mode::Preview,
        }
    }

    /// Label of the button that switches away from this mode.
    ///
    /// # Example
    ///
    /// ```rust
    /// use loupe_canvas_preview::Mode;
    ///
    /// assert_eq!(Mode::Preview.toggle_label(), "Edit");
    /// assert_eq!(Mode::Edit.toggle_label(), "Preview");
    /// ```
    pub fn toggle_label(self) -> &'static str {
        match self {
            Mode::Preview => "Edit",
            Mode::Edit => "Preview",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Preview => "Preview",
            Mode::Edit => "Edit",
        }
    }
}

/// Persistence state of the edit buffer.
///
/// Valid transitions:
///
/// ```text
/// Saved ──edit──▶ Unsaved ──flush──▶ Saving ──ok──▶ Saved
///                    ▲                  │
///                    └──edit── Error ◀──┘ fail
///                              │
///                              └──retry──▶ Saving
/// ```
///
/// These are the only edges within one resource's lifecycle. Binding a new
/// resource starts a fresh lifecycle at `Saved` from whatever state the
/// previous one ended in, after the session has flushed what it could.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SaveStatus {
    #[default]
    Saved,
    Saving,
    Unsaved,
    Error,
}

impl SaveStatus {
    /// Whether moving from `self` to `next` is a valid transition.
    ///
    /// # Example
    ///
    /// ```rust
    /// use loupe_canvas_preview::SaveStatus;
    ///
    /// assert!(SaveStatus::Unsaved.can_transition_to(SaveStatus::Saving));
    /// assert!(!SaveStatus::Saved.can_transition_to(SaveStatus::Saving));
    /// ```
    pub fn can_transition_to(self, next: SaveStatus) -> bool {
        use SaveStatus::*;
        matches!(
            (self, next),
            (Saved, Unsaved)
                | (Unsaved, Saving)
                | (Saving, Saved)
                | (Saving, Error)
                | (Error, Unsaved)
                | (Error, Saving)
        )
    }

    /// Whether the buffer holds changes not yet persisted.
    pub fn is_dirty(self) -> bool {
        !matches!(self, SaveStatus::Saved)
    }

    /// Text shown in the panel header.
    pub fn label(self) -> &'static str {
        match self {
            SaveStatus::Saved => "Saved",
            SaveStatus::Saving => "Saving...",
            SaveStatus::Unsaved => "Unsaved changes",
            SaveStatus::Error => "Save failed",
        }
    }
}
