//! # Markdown rendering
//!
//! Converts markdown text into the block structure a preview panel draws.
//! Parsing is done by `pulldown-cmark` with the CommonMark extensions notes
//! commonly use (tables, task lists, footnotes, strikethrough).

use async_trait::async_trait;
use loupe_plugin_api::{Block, RenderError, RenderedDocument, Renderer, ResourceRef};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};
use tracing::trace;

/// Markdown renderer producing [`Block`]s.
///
/// # Example
///
/// ```rust
/// use loupe_canvas_preview::MarkdownRenderer;
/// use loupe_plugin_api::{Block, RenderedDocument};
///
/// let renderer = MarkdownRenderer::new();
/// let mut doc = RenderedDocument::new();
/// renderer.render_blocks("# Hello **World**", &mut doc).unwrap();
/// assert_eq!(doc.blocks(), &[Block::Heading { level: 1, text: "Hello World".into() }]);
/// ```
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    options: Options,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        Self { options }
    }

    /// Append the blocks of `markdown` to `target`.
    ///
    /// Text containing NUL bytes is treated as binary content and rejected.
    pub fn render_blocks(
        &self,
        markdown: &str,
        target: &mut RenderedDocument,
    ) -> Result<(), RenderError> {
        if markdown.contains('\0') {
            return Err(RenderError::Other {
                message: "content is not text".to_string(),
            });
        }
        let mut builder = BlockBuilder::default();
        for event in Parser::new_ext(markdown, self.options) {
            builder.handle(event, target);
        }
        builder.finish(target);
        Ok(())
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Renderer for MarkdownRenderer {
    async fn render(
        &self,
        text: &str,
        target: &mut RenderedDocument,
        source: &ResourceRef,
    ) -> Result<(), RenderError> {
        trace!(resource = %source, bytes = text.len(), "rendering markdown");
        self.render_blocks(text, target).map_err(|e| match e {
            RenderError::Other { message } => RenderError::Malformed {
                path: source.path().to_string(),
                message,
            },
            other => other,
        })
    }
}

struct PendingItem {
    depth: usize,
    ordinal: Option<u64>,
    task: Option<bool>,
    emitted: bool,
}

/// Folds the parser's event stream into blocks.
#[derive(Default)]
struct BlockBuilder {
    text: String,
    paragraph: bool,
    heading: Option<u8>,
    code_language: Option<Option<String>>,
    quote_depth: usize,
    /// Next ordinal of each open list, `None` for bullet lists
    lists: Vec<Option<u64>>,
    items: Vec<PendingItem>,
    cells: Vec<String>,
    in_cell: bool,
}

impl BlockBuilder {
    fn handle(&mut self, event: Event<'_>, out: &mut RenderedDocument) {
        match event {
            Event::Start(tag) => self.start(tag, out),
            Event::End(tag) => self.end(tag, out),
            Event::Text(text) | Event::Code(text) => self.text.push_str(&text),
            Event::Html(html) => {
                if self.collecting_inline() {
                    self.text.push_str(&html);
                } else if !html.trim().is_empty() {
                    out.push(Block::Paragraph(html.trim().to_string()));
                }
            }
            Event::FootnoteReference(label) => {
                self.text.push('[');
                self.text.push_str(&label);
                self.text.push(']');
            }
            Event::SoftBreak => self.text.push(' '),
            Event::HardBreak => self.text.push('\n'),
            Event::Rule => out.push(Block::Rule),
            Event::TaskListMarker(checked) => {
                if let Some(item) = self.items.last_mut() {
                    item.task = Some(checked);
                }
            }
        }
    }

    fn start(&mut self, tag: Tag<'_>, out: &mut RenderedDocument) {
        match tag {
            Tag::Paragraph => {
                self.paragraph = true;
                if self.items.is_empty() {
                    self.text.clear();
                } else if !self.text.is_empty() {
                    self.text.push(' ');
                }
            }
            Tag::Heading(level, _, _) => {
                self.heading = Some(heading_level(level));
                self.text.clear();
            }
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .filter(|lang| !lang.is_empty())
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code_language = Some(language);
                self.text.clear();
            }
            Tag::BlockQuote => self.quote_depth += 1,
            Tag::List(start) => {
                // A nested list ends the parent item's own text.
                self.emit_open_item(out);
                self.lists.push(start);
            }
            Tag::Item => {
                let depth = self.lists.len().saturating_sub(1);
                let ordinal = match self.lists.last_mut() {
                    Some(Some(next)) => {
                        let current = *next;
                        *next += 1;
                        Some(current)
                    }
                    _ => None,
                };
                self.items.push(PendingItem {
                    depth,
                    ordinal,
                    task: None,
                    emitted: false,
                });
                self.text.clear();
            }
            Tag::TableHead | Tag::TableRow => self.cells.clear(),
            Tag::TableCell => {
                self.in_cell = true;
                self.text.clear();
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: Tag<'_>, out: &mut RenderedDocument) {
        match tag {
            Tag::Paragraph => {
                self.paragraph = false;
                if self.items.is_empty() {
                    let text = self.take_text();
                    if !text.is_empty() {
                        if self.quote_depth > 0 {
                            out.push(Block::Quote(text));
                        } else {
                            out.push(Block::Paragraph(text));
                        }
                    }
                }
            }
            Tag::Heading(..) => {
                let level = self.heading.take().unwrap_or(1);
                out.push(Block::Heading {
                    level,
                    text: self.take_text(),
                });
            }
            Tag::CodeBlock(_) => {
                let language = self.code_language.take().flatten();
                let mut code = std::mem::take(&mut self.text);
                if code.ends_with('\n') {
                    code.pop();
                }
                out.push(Block::Code { language, code });
            }
            Tag::BlockQuote => self.quote_depth = self.quote_depth.saturating_sub(1),
            Tag::List(_) => {
                self.lists.pop();
            }
            Tag::Item => {
                self.emit_open_item(out);
                self.items.pop();
                self.text.clear();
            }
            Tag::TableHead => out.push(Block::TableRow {
                header: true,
                cells: std::mem::take(&mut self.cells),
            }),
            Tag::TableRow => out.push(Block::TableRow {
                header: false,
                cells: std::mem::take(&mut self.cells),
            }),
            Tag::TableCell => {
                self.in_cell = false;
                let cell = self.take_text();
                self.cells.push(cell);
            }
            _ => {}
        }
    }

    fn finish(&mut self, out: &mut RenderedDocument) {
        while !self.items.is_empty() {
            self.emit_open_item(out);
            self.items.pop();
        }
    }

    /// Push the innermost open item if its text has not been pushed yet.
    fn emit_open_item(&mut self, out: &mut RenderedDocument) {
        let text = self.take_text();
        let Some(item) = self.items.last_mut() else {
            return;
        };
        if item.emitted {
            return;
        }
        item.emitted = true;
        let block = match item.task {
            Some(checked) => Block::Task {
                depth: item.depth,
                checked,
                text,
            },
            None => Block::ListItem {
                depth: item.depth,
                ordinal: item.ordinal,
                text,
            },
        };
        out.push(block);
    }

    fn collecting_inline(&self) -> bool {
        self.paragraph
            || self.heading.is_some()
            || self.code_language.is_some()
            || self.in_cell
            || !self.items.is_empty()
    }

    fn take_text(&mut self) -> String {
        let text = std::mem::take(&mut self.text);
        text.trim().to_string()
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(markdown: &str) -> Vec<Block> {
        let mut doc = RenderedDocument::new();
        MarkdownRenderer::new()
            .render_blocks(markdown, &mut doc)
            .unwrap();
        doc.blocks().to_vec()
    }

    #[test]
    fn test_headings_and_paragraphs() {
        assert_eq!(
            blocks("# Title\n\nSome *soft*\nwrapped text.\n\n### Deep"),
            vec![
                Block::Heading {
                    level: 1,
                    text: "Title".into()
                },
                Block::Paragraph("Some soft wrapped text.".into()),
                Block::Heading {
                    level: 3,
                    text: "Deep".into()
                },
            ]
        );
    }

    #[test]
    fn test_fenced_code_keeps_language() {
        assert_eq!(
            blocks("```rust\nfn main() {}\n```\n\n    indented"),
            vec![
                Block::Code {
                    language: Some("rust".into()),
                    code: "fn main() {}".into()
                },
                Block::Code {
                    language: None,
                    code: "indented".into()
                },
            ]
        );
    }

    #[test]
    fn test_nested_lists() {
        assert_eq!(
            blocks("- one\n  1. inner\n  2. second\n- two"),
            vec![
                Block::ListItem {
                    depth: 0,
                    ordinal: None,
                    text: "one".into()
                },
                Block::ListItem {
                    depth: 1,
                    ordinal: Some(1),
                    text: "inner".into()
                },
                Block::ListItem {
                    depth: 1,
                    ordinal: Some(2),
                    text: "second".into()
                },
                Block::ListItem {
                    depth: 0,
                    ordinal: None,
                    text: "two".into()
                },
            ]
        );
    }

    #[test]
    fn test_task_items() {
        assert_eq!(
            blocks("- [x] done\n- [ ] todo"),
            vec![
                Block::Task {
                    depth: 0,
                    checked: true,
                    text: "done".into()
                },
                Block::Task {
                    depth: 0,
                    checked: false,
                    text: "todo".into()
                },
            ]
        );
    }

    #[test]
    fn test_quote_and_rule() {
        assert_eq!(
            blocks("> quoted\n\n---\n\nafter"),
            vec![
                Block::Quote("quoted".into()),
                Block::Rule,
                Block::Paragraph("after".into()),
            ]
        );
    }

    #[test]
    fn test_table_rows() {
        assert_eq!(
            blocks("| a | b |\n|---|---|\n| 1 | 2 |"),
            vec![
                Block::TableRow {
                    header: true,
                    cells: vec!["a".into(), "b".into()]
                },
                Block::TableRow {
                    header: false,
                    cells: vec!["1".into(), "2".into()]
                },
            ]
        );
    }

    #[test]
    fn test_empty_input_renders_nothing() {
        assert!(blocks("").is_empty());
        assert!(blocks("\n\n   \n").is_empty());
    }

    #[tokio::test]
    async fn test_binary_content_is_malformed() {
        let renderer = MarkdownRenderer::new();
        let mut doc = RenderedDocument::new();
        let err = renderer
            .render("abc\0def", &mut doc, &ResourceRef::new("blob.md"))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Malformed { ref path, .. } if path == "blob.md"));
        assert!(doc.is_empty());
    }
}
