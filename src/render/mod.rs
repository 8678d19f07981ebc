//! Terminal rendering for answers and errors.

pub mod error;
pub mod markdown;

use rich_rust::{ColorSystem, Segment};

pub use error::render_error;
pub use markdown::{CodeBlock, Document};

/// Convert segments to a string, with ANSI styling unless `no_color`.
pub(crate) fn segments_to_string(segments: &[Segment], no_color: bool) -> String {
    segments
        .iter()
        .map(|seg| match &seg.style {
            Some(style) if !no_color => style.render(&seg.text, ColorSystem::TrueColor),
            _ => seg.text.to_string(),
        })
        .collect()
}
