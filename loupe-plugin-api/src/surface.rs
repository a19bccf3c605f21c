//! Content displayed by a preview surface.
//!
//! A [`Renderer`](crate::Renderer) writes structured [`Block`]s into a
//! [`RenderedDocument`]. Hosts draw either that document or one of the fixed
//! [`Placeholder`] messages, wrapped together as [`PreviewContent`].

use serde::{Deserialize, Serialize};

/// One block-level element of rendered content.
///
/// Inline formatting is flattened to plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Block {
    /// Heading with its level (1 to 6)
    Heading { level: u8, text: String },
    /// Paragraph of text
    Paragraph(String),
    /// Code block with an optional language tag
    Code {
        language: Option<String>,
        code: String,
    },
    /// List item; `depth` is 0 for top-level items, `ordinal` is set for
    /// ordered lists
    ListItem {
        depth: usize,
        ordinal: Option<u64>,
        text: String,
    },
    /// Task list item
    Task {
        depth: usize,
        checked: bool,
        text: String,
    },
    /// Block quote
    Quote(String),
    /// Table row; `header` marks the head row
    TableRow { header: bool, cells: Vec<String> },
    /// Horizontal rule
    Rule,
}

/// Structured output of a renderer, as an ordered list of blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedDocument {
    blocks: Vec<Block>,
}

impl RenderedDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block.
    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Remove every block.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// The blocks in display order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Text of the first heading, if any.
    ///
    /// # Example
    ///
    /// ```rust
    /// use loupe_plugin_api::{Block, RenderedDocument};
    ///
    /// let mut doc = RenderedDocument::new();
    /// doc.push(Block::Paragraph("intro".into()));
    /// doc.push(Block::Heading { level: 2, text: "Hello".into() });
    /// assert_eq!(doc.first_heading(), Some("Hello"));
    /// ```
    pub fn first_heading(&self) -> Option<&str> {
        self.blocks.iter().find_map(|block| match block {
            Block::Heading { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Fixed messages shown instead of rendered content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placeholder {
    /// No resource is bound
    Empty,
    /// The bound resource could not be read
    LoadFailed,
    /// The bound resource could not be rendered
    RenderFailed,
}

impl Placeholder {
    /// User-facing message for this placeholder.
    pub fn message(&self) -> &'static str {
        match self {
            Placeholder::Empty => "Click a note in canvas to preview",
            Placeholder::LoadFailed => "Failed to load note content",
            Placeholder::RenderFailed => "Failed to render preview",
        }
    }
}

/// What a preview surface currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreviewContent {
    Placeholder(Placeholder),
    Document(RenderedDocument),
}

impl PreviewContent {
    /// The rendered document, unless a placeholder is shown.
    pub fn document(&self) -> Option<&RenderedDocument> {
        match self {
            PreviewContent::Document(doc) => Some(doc),
            PreviewContent::Placeholder(_) => None,
        }
    }

    /// The placeholder, unless a document is shown.
    pub fn placeholder(&self) -> Option<Placeholder> {
        match self {
            PreviewContent::Placeholder(p) => Some(*p),
            PreviewContent::Document(_) => None,
        }
    }
}

impl Default for PreviewContent {
    fn default() -> Self {
        PreviewContent::Placeholder(Placeholder::Empty)
    }
}
