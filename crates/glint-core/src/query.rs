//! IDE query and response types.
//!
//! These are compiler-shaped: the language server converts them into
//! protocol-shaped answers.

use crate::position::{Position, SourceRange};
use serde::{Deserialize, Serialize};

/// A position inside a named source, used by position-based queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    /// Identifier of the source the position points into.
    pub source: String,
    /// The position.
    pub position: Position,
}

impl SourcePosition {
    /// Create a new source position.
    pub fn new(source: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            source: source.into(),
            position: Position::new(line, column),
        }
    }
}

/// A tooltip (hover) query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TooltipQuery {
    /// Where the cursor is.
    pub at: SourcePosition,
    /// Leave diagnostics out of the tooltip text. Editors that show published
    /// diagnostics on hover would otherwise display them twice.
    pub ignore_diagnostics: bool,
}

/// Answer to a tooltip query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tooltip {
    /// Code-like description of the symbol.
    pub text: String,
    /// Free-form documentation, possibly empty.
    pub documentation: String,
    /// The range the tooltip covers.
    pub range: SourceRange,
}

/// Compiler-side symbol kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// A struct type.
    Struct,
    /// A function.
    Function,
    /// A variable, parameter, or field.
    Variable,
    /// A language keyword or built-in type name.
    Keyword,
    /// Anything else.
    Other,
}

/// A declared symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// The symbol's name.
    pub name: String,
    /// What it is.
    pub kind: SymbolKind,
    /// Where it is declared.
    pub range: SourceRange,
}

/// A completion candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// The text to insert.
    pub name: String,
    /// What it is.
    pub kind: SymbolKind,
    /// Code-like detail (e.g. the declaration), possibly empty.
    pub detail: String,
    /// Free-form documentation, possibly empty.
    pub documentation: String,
}

/// One candidate signature for signature help.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// The full signature text.
    pub text: String,
    /// Free-form documentation, possibly empty.
    pub documentation: String,
    /// Label of each parameter.
    pub arguments: Vec<String>,
}

/// Answer to a signature query.
///
/// `active_signature` and `active_argument` are `None` when the cursor is not
/// inside an argument list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureQueryResult {
    /// Candidate signatures.
    pub signatures: Vec<Signature>,
    /// Index of the signature that best matches the call.
    pub active_signature: Option<usize>,
    /// Index of the argument under the cursor.
    pub active_argument: Option<usize>,
}
