//! Error rendering for the terminal.
//!
//! Errors go to stderr as a header line with the stable code, an optional
//! hint, and the response body of a remote failure.

use rich_rust::prelude::*;
use rich_rust::{Segment, Style};

use super::segments_to_string;
use crate::error::UncleError;

/// Longest response body shown under a remote failure.
const MAX_BODY_CHARS: usize = 2000;

/// Render an error, styled when `color` is set.
#[must_use]
pub fn render_error(error: &UncleError, color: bool) -> String {
    let no_color = !color;
    let mut lines = vec![render_header(error, no_color)];

    if let Some(hint) = error.hint() {
        let segments = [
            Segment::styled("hint: ".to_string(), named_style("cyan").bold()),
            Segment::plain(hint),
        ];
        lines.push(segments_to_string(&segments, no_color));
    }

    if let Some(body) = error.body() {
        lines.push(String::new());
        lines.push(segments_to_string(
            &[Segment::styled(truncate(body.trim_end()), Style::new().dim())],
            no_color,
        ));
    }

    lines.join("\n")
}

fn render_header(error: &UncleError, no_color: bool) -> String {
    let segments = [
        Segment::styled("error".to_string(), named_style("red").bold()),
        Segment::styled(format!("[{}]", error.error_code()), Style::new().dim()),
        Segment::plain(format!(": {error}")),
    ];
    segments_to_string(&segments, no_color)
}

fn named_style(name: &str) -> Style {
    Color::parse(name).map_or_else(|_| Style::new(), |c| Style::new().color(c))
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_CHARS) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{has_ansi_codes, strip_ansi_codes};

    #[test]
    fn plain_rendering_has_code_and_hint() {
        let out = render_error(&UncleError::PresetNotFound("sh".to_string()), false);
        assert!(!has_ansi_codes(&out));
        assert!(out.starts_with("error[UNCLE-U001]: unknown preset: sh"));
        assert!(out.contains("hint: Presets live under"));
    }

    #[test]
    fn remote_body_is_shown() {
        let err = UncleError::RemoteStatus {
            operation: "query",
            status: 500,
            body: "upstream exploded\n".to_string(),
        };
        let out = render_error(&err, true);
        let plain = strip_ansi_codes(&out);
        assert!(plain.contains("query failed with HTTP 500"));
        assert!(plain.ends_with("upstream exploded"));
    }

    #[test]
    fn long_bodies_are_cut() {
        let body = "x".repeat(MAX_BODY_CHARS + 50);
        let cut = truncate(&body);
        assert_eq!(cut.chars().count(), MAX_BODY_CHARS + 1);
        assert!(cut.ends_with('…'));
    }
}
