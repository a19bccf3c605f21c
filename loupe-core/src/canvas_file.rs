//! # JSON Canvas files
//!
//! Loads `.canvas` documents in the JSON Canvas interchange format: a list
//! of positioned nodes (`file`, `text`, `link`, `group`) and a list of edges
//! between them. Only what the host needs to draw and select nodes is kept.

use crate::{Error, Result};
use loupe_plugin_api::{Node, NodeKind, ResourceRef};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// A parsed canvas document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanvasDocument {
    #[serde(default)]
    pub nodes: Vec<CanvasNodeRecord>,
    #[serde(default)]
    pub edges: Vec<CanvasEdgeRecord>,
}

/// A node as stored in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasNodeRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// An edge as stored in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasEdgeRecord {
    pub id: String,
    #[serde(rename = "fromNode")]
    pub from_node: String,
    #[serde(rename = "toNode")]
    pub to_node: String,
}

/// Position and size of a node in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeGeometry {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CanvasNodeRecord {
    /// Convert to a plugin-facing node, or `None` for an unknown type or a
    /// file node without a file path.
    pub fn to_node(&self) -> Option<Node> {
        let kind = match self.kind.as_str() {
            "file" => NodeKind::File {
                resource: ResourceRef::new(self.file.clone()?),
            },
            "text" => NodeKind::Text,
            "link" => NodeKind::Link,
            "group" => NodeKind::Group,
            _ => return None,
        };
        Some(Node::new(self.id.clone(), kind))
    }

    pub fn geometry(&self) -> NodeGeometry {
        NodeGeometry {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    /// Short label for drawing the node.
    pub fn caption(&self) -> String {
        match self.kind.as_str() {
            "file" => self
                .file
                .as_deref()
                .map(|path| ResourceRef::new(path).display_name().to_string())
                .unwrap_or_default(),
            "text" => self
                .text
                .as_deref()
                .and_then(|text| text.lines().find(|line| !line.trim().is_empty()))
                .unwrap_or_default()
                .trim_start_matches('#')
                .trim()
                .to_string(),
            "link" => self.url.clone().unwrap_or_default(),
            _ => self.label.clone().unwrap_or_default(),
        }
    }
}

impl CanvasDocument {
    /// Parse a canvas document from JSON text.
    ///
    /// # Example
    ///
    /// ```rust
    /// use loupe_core::CanvasDocument;
    ///
    /// let doc = CanvasDocument::parse(r#"{
    ///     "nodes": [
    ///         {"id": "a", "type": "file", "file": "note.md", "x": 0, "y": 0, "width": 200, "height": 100}
    ///     ],
    ///     "edges": []
    /// }"#)?;
    /// let nodes = doc.nodes();
    /// assert_eq!(nodes[0].0.resource().unwrap().path(), "note.md");
    /// # Ok::<(), loupe_core::Error>(())
    /// ```
    pub fn parse(json: &str) -> Result<Self> {
        let doc: CanvasDocument = serde_json::from_str(json)?;
        Ok(doc)
    }

    /// Read and parse a canvas file.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::canvas(format!("Failed to read {}: {}", path.display(), e)))?;
        let doc = Self::parse(&content)?;
        debug!(path = %path.display(), nodes = doc.nodes.len(), "loaded canvas");
        Ok(doc)
    }

    /// Known nodes with their geometry and caption, in file order.
    ///
    /// Records of unknown type are skipped with a warning.
    pub fn nodes(&self) -> Vec<(Node, NodeGeometry, String)> {
        self.nodes
            .iter()
            .filter_map(|record| match record.to_node() {
                Some(node) => Some((node, record.geometry(), record.caption())),
                None => {
                    warn!(id = %record.id, kind = %record.kind, "skipping unsupported canvas node");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r##"{
        "nodes": [
            {"id": "g", "type": "group", "label": "Ideas", "x": -10, "y": -10, "width": 500, "height": 300},
            {"id": "a", "type": "file", "file": "notes/alpha.md", "x": 0, "y": 0, "width": 200, "height": 100},
            {"id": "t", "type": "text", "text": "\n# Loose thought\nmore", "x": 220, "y": 0, "width": 200, "height": 100},
            {"id": "w", "type": "widget", "x": 0, "y": 400, "width": 10, "height": 10},
            {"id": "bad", "type": "file", "x": 0, "y": 500, "width": 10, "height": 10}
        ],
        "edges": [
            {"id": "e1", "fromNode": "a", "toNode": "t", "fromSide": "right"}
        ]
    }"##;

    #[test]
    fn test_parse_keeps_known_nodes() {
        let doc = CanvasDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.nodes.len(), 5);
        assert_eq!(doc.edges.len(), 1);
        assert_eq!(doc.edges[0].from_node, "a");

        let nodes = doc.nodes();
        let ids: Vec<&str> = nodes.iter().map(|(node, _, _)| node.id.as_str()).collect();
        assert_eq!(ids, vec!["g", "a", "t"]);

        let (alpha, geometry, caption) = &nodes[1];
        assert_eq!(alpha.resource(), Some(&ResourceRef::new("notes/alpha.md")));
        assert_eq!(geometry.width, 200.0);
        assert_eq!(caption, "alpha");
    }

    #[test]
    fn test_captions() {
        let doc = CanvasDocument::parse(SAMPLE).unwrap();
        let captions: Vec<String> = doc.nodes().into_iter().map(|(_, _, c)| c).collect();
        assert_eq!(captions, vec!["Ideas", "alpha", "Loose thought"]);
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let err = CanvasDocument::parse("{\"nodes\": [").unwrap_err();
        assert_eq!(err.category(), "JSON");
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("board.canvas");
        std::fs::write(&path, SAMPLE).unwrap();

        let doc = CanvasDocument::load(&path).await.unwrap();
        assert_eq!(doc.nodes().len(), 3);

        let missing = CanvasDocument::load(dir.path().join("none.canvas")).await;
        assert_eq!(missing.unwrap_err().category(), "Canvas");
    }
}
