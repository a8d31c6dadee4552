//! Problems reported by a compile.

use crate::position::SourceRange;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a compiler diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The program is invalid.
    Error,
    /// The program is valid but suspicious.
    Warning,
    /// A suggestion with no effect on validity.
    Hint,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Hint => write!(f, "hint"),
        }
    }
}

/// A single problem found while compiling.
///
/// The range's source may differ from the document that was compiled: a
/// problem inside an included file is attributed to that file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    /// How bad it is.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Where it is, if the compiler could tell.
    pub range: Option<SourceRange>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(message: impl Into<String>, range: SourceRange) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            range: Some(range),
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(message: impl Into<String>, range: SourceRange) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            range: Some(range),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.range {
            Some(range) => write!(f, "{range}: {}: {}", self.severity, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// A declared symbol that nothing references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnusedSymbol {
    /// The symbol's name.
    pub name: String,
    /// The declaring range.
    pub range: SourceRange,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    #[test]
    fn test_display_with_range() {
        let diagnostic = Diagnostic::error(
            "undefined symbol \"foo\"",
            SourceRange::new("a.glsl", Position::new(2, 0), Position::new(2, 3)),
        );
        assert_eq!(
            diagnostic.to_string(),
            "a.glsl:3:1-3:4: error: undefined symbol \"foo\""
        );
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }
}
