//! Formatting options passed to the compiler's formatter.

use serde::{Deserialize, Serialize};

/// What to do with the newline at the end of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingNewline {
    /// Always end with exactly one newline.
    #[default]
    Insert,
    /// Never end with a newline.
    Remove,
    /// Keep a single trailing newline if the input had one.
    Preserve,
}

/// Options for whole-document formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOptions {
    /// One level of indentation (e.g. four spaces or a tab).
    pub indent: String,
    /// Line terminator to emit.
    pub newline: String,
    /// Trailing newline handling.
    pub trailing_newline: TrailingNewline,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            newline: "\n".to_string(),
            trailing_newline: TrailingNewline::Insert,
        }
    }
}

impl FormatOptions {
    /// Indent with `width` spaces.
    #[must_use]
    pub fn spaces(width: usize) -> Self {
        Self {
            indent: " ".repeat(width),
            ..Self::default()
        }
    }

    /// Indent with tabs.
    #[must_use]
    pub fn tabs() -> Self {
        Self {
            indent: "\t".to_string(),
            ..Self::default()
        }
    }
}
