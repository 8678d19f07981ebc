//! Markdown answers, rendered for the terminal.
//!
//! Parsing is CommonMark via pulldown-cmark; rendering goes through rich_rust's
//! `Markdown` and is then word-wrapped to the terminal width. Fenced code keeps
//! its raw content so command harvesting sees exactly what the service sent.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use rich_rust::renderables::markdown::Markdown;
use rich_rust::text::Text;
use rich_rust::Segment;

use super::segments_to_string;

/// A fenced code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// First word of the info string (`bash` in ```` ```bash ````), may be empty.
    pub lang: String,
    pub content: String,
}

/// A parsed markdown document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    source: String,
    blocks: Vec<CodeBlock>,
}

impl Document {
    /// Parse markdown text.
    #[must_use]
    pub fn parse(markdown: &str) -> Self {
        Self {
            source: markdown.to_string(),
            blocks: fenced_blocks(markdown),
        }
    }

    /// Fenced code blocks, in document order.
    #[must_use]
    pub fn blocks(&self) -> &[CodeBlock] {
        &self.blocks
    }

    /// Raw contents of fenced code blocks, in document order.
    pub fn code_blocks(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().map(|block| block.content.as_str())
    }

    /// Render to a string for the terminal.
    #[must_use]
    pub fn render(&self, color: bool, width: usize) -> String {
        segments_to_string(&self.render_segments(width), !color)
    }

    fn render_segments(&self, width: usize) -> Vec<Segment<'static>> {
        // Width 0 turns off rich_rust's right padding; wrapping happens below.
        let markdown = Markdown::new(self.source.as_str()).hyperlinks(false);
        let mut text = Text::new("");
        for segment in markdown.render(0) {
            if segment.is_control() {
                continue;
            }
            match segment.style {
                Some(style) => text.append_styled(&segment.text, style),
                None => text.append(&segment.text),
            }
        }

        let mut out = Vec::new();
        for (i, line) in text.wrap(width.max(1)).iter().enumerate() {
            if i > 0 {
                out.push(Segment::line());
            }
            out.extend(line.render("").into_iter().map(Segment::into_owned));
        }
        out
    }
}

/// Collect fenced code blocks with the contents pulldown-cmark reports.
///
/// Container indentation (list items, quotes) is already stripped by the
/// parser. One trailing newline is dropped; indented code blocks are ignored.
fn fenced_blocks(markdown: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<CodeBlock> = None;

    for event in Parser::new_ext(markdown, Options::ENABLE_TABLES) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                current = Some(CodeBlock {
                    lang: info.split_whitespace().next().unwrap_or_default().to_string(),
                    content: String::new(),
                });
            }
            Event::Text(text) => {
                if let Some(block) = current.as_mut() {
                    block.content.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(mut block) = current.take() {
                    if block.content.ends_with('\n') {
                        block.content.pop();
                    }
                    blocks.push(block);
                }
            }
            _ => {}
        }
    }
    tracing::trace!(count = blocks.len(), "Parsed fenced code blocks");
    blocks
}
