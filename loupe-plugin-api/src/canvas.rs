//! Canvas host contracts.
//!
//! A [`CanvasSurface`] is a workspace view that hosts a canvas. Its
//! [`Canvas`] object may not exist yet when the surface becomes active, so
//! [`CanvasSurface::canvas`] returns `None` until the host has finished
//! initializing it. Plugins only read canvas nodes; they never mutate them.

use crate::ResourceRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Stable identifier of a canvas node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a canvas node represents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    /// Node backed by a text resource
    File { resource: ResourceRef },
    /// Free-standing text card
    Text,
    /// Web link card
    Link,
    /// Group frame around other nodes
    Group,
}

/// A canvas graph element.
///
/// # Example
///
/// ```rust
/// use loupe_plugin_api::{Node, ResourceRef};
///
/// let node = Node::file("n1", ResourceRef::new("note.md"));
/// assert_eq!(node.resource(), Some(&ResourceRef::new("note.md")));
/// assert!(Node::text("n2").resource().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(id),
            kind,
        }
    }

    /// A node backed by `resource`.
    pub fn file(id: impl Into<String>, resource: ResourceRef) -> Self {
        Self::new(id, NodeKind::File { resource })
    }

    /// A text card.
    pub fn text(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Text)
    }

    /// The backing resource, present only for file nodes.
    pub fn resource(&self) -> Option<&ResourceRef> {
        match &self.kind {
            NodeKind::File { resource } => Some(resource),
            _ => None,
        }
    }
}

/// A raw click on the canvas's root interaction element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    /// Pointer position in canvas coordinates
    pub x: f32,
    pub y: f32,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ClickEvent {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Failures raised by canvas hosts.
#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("canvas not initialized")]
    NotReady,

    #[error("failed to load canvas {path}: {message}")]
    Load { path: String, message: String },
}

/// An initialized canvas.
pub trait Canvas: Send + Sync {
    /// Snapshot of the currently selected nodes.
    ///
    /// The host may update the selection after delivering the click that
    /// caused it, so callers read this after a short settle delay.
    fn selection(&self) -> Vec<Node>;

    /// Subscribe to clicks on the canvas root.
    ///
    /// The subscription ends when the receiver is dropped or when the canvas
    /// is torn down.
    fn subscribe_clicks(&self) -> mpsc::UnboundedReceiver<ClickEvent>;
}

/// A workspace view that hosts a canvas.
pub trait CanvasSurface: Send + Sync {
    /// Identifier of this surface, stable for its lifetime.
    fn surface_id(&self) -> Uuid;

    /// The canvas, once the host has initialized it.
    fn canvas(&self) -> Option<Arc<dyn Canvas>>;
}
