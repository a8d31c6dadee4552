//! Shared conversions between compiler-shaped and protocol-shaped values.

use glint_core::{SourcePosition, SourceRange};
use lsp_types::{MarkupContent, MarkupKind, Position, Range, Uri};
use std::str::FromStr;

/// Convert a compiler position to a protocol position.
pub fn to_lsp_position(position: glint_core::Position) -> Position {
    Position::new(position.line, position.column)
}

/// Convert a compiler range to a protocol range, dropping the source.
pub fn to_lsp_range(range: &SourceRange) -> Range {
    Range {
        start: to_lsp_position(range.start),
        end: to_lsp_position(range.end),
    }
}

/// Build a compiler query position from a request's document and position.
pub fn source_position(uri: &Uri, position: Position) -> SourcePosition {
    SourcePosition::new(uri.as_str(), position.line, position.character)
}

/// Parse a source identifier back into a URI.
pub fn parse_uri(id: &str) -> Option<Uri> {
    match Uri::from_str(id) {
        Ok(uri) => Some(uri),
        Err(e) => {
            tracing::warn!("Invalid source URI {:?}: {}", id, e);
            None
        }
    }
}

/// The position just past the last character of `text`, in UTF-16 units.
pub fn end_position(text: &str) -> Position {
    let line = text.matches('\n').count() + text.matches('\r').count()
        - text.matches("\r\n").count();
    let last_line = text.rfind(['\n', '\r']).map_or(text, |i| &text[i + 1..]);
    Position::new(line as u32, last_line.encode_utf16().count() as u32)
}

/// A fenced code block followed by free-form documentation.
pub fn code_markdown(code: &str, documentation: &str) -> MarkupContent {
    MarkupContent {
        kind: MarkupKind::Markdown,
        value: format!("```glsl\n{code}\n```\n{documentation}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_position() {
        assert_eq!(end_position(""), Position::new(0, 0));
        assert_eq!(end_position("ab"), Position::new(0, 2));
        assert_eq!(end_position("ab\n"), Position::new(1, 0));
        assert_eq!(end_position("a\r\n\u{1F600}"), Position::new(1, 2));
        assert_eq!(end_position("a\rbc\r"), Position::new(2, 0));
        assert_eq!(end_position("a\rbc"), Position::new(1, 2));
    }

    #[test]
    fn test_to_lsp_range() {
        let range = SourceRange::new(
            "file:///a.glsl",
            glint_core::Position::new(1, 2),
            glint_core::Position::new(1, 5),
        );
        assert_eq!(
            to_lsp_range(&range),
            Range::new(Position::new(1, 2), Position::new(1, 5))
        );
    }

    #[test]
    fn test_parse_uri() {
        assert!(parse_uri("file:///a.glsl").is_some());
        assert!(parse_uri("not a uri").is_none());
    }
}
