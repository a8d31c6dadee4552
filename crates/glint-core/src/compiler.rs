//! The compiler collaborator traits.

use crate::diagnostic::{Diagnostic, UnusedSymbol};
use crate::error::CompileError;
use crate::format::FormatOptions;
use crate::position::SourceRange;
use crate::query::{Completion, SignatureQueryResult, SourcePosition, Symbol, Tooltip, TooltipQuery};
use std::sync::Arc;

/// A named source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Stable identifier (a URI for documents known to the server).
    pub name: String,
    /// Full text.
    pub contents: String,
}

impl Source {
    /// Create a new source.
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

/// Turns an include directive into source text.
///
/// `include` is the literal text of the directive and `requester` the
/// identifier of the source containing it. Returning `None` means the include
/// could not be found; the compiler reports that as a diagnostic on the
/// including source.
pub trait IncludeResolver {
    /// Resolve an include.
    fn resolve(&self, include: &str, requester: &str) -> Option<Source>;
}

impl<F> IncludeResolver for F
where
    F: Fn(&str, &str) -> Option<Source>,
{
    fn resolve(&self, include: &str, requester: &str) -> Option<Source> {
        self(include, requester)
    }
}

/// The result of compiling one primary source.
///
/// Opaque to the language server apart from these queries. Implementations
/// are immutable once built.
pub trait CompiledProgram: Send + Sync {
    /// Problems found while compiling.
    fn diagnostics(&self) -> &[Diagnostic];

    /// Declared-but-unreferenced symbols.
    fn unused_symbols(&self) -> &[UnusedSymbol];

    /// Describe the symbol under a position.
    fn tooltip(&self, query: &TooltipQuery) -> Option<Tooltip>;

    /// Find where the symbol under a position is declared.
    fn definition(&self, at: &SourcePosition) -> Option<SourceRange>;

    /// List the symbols declared in `source`.
    fn symbols(&self, source: &str) -> Option<Vec<Symbol>>;

    /// Every range that must change to rename the symbol under a position.
    fn rename(&self, at: &SourcePosition) -> Option<Vec<SourceRange>>;

    /// Completion candidates at a position.
    fn completions(&self, at: &SourcePosition) -> Vec<Completion>;

    /// Signature help at a position.
    fn signature(&self, at: &SourcePosition) -> SignatureQueryResult;
}

/// A compiler front-end.
pub trait Compiler: Send + Sync {
    /// Compile `primary`, resolving includes through `resolver`.
    fn compile(
        &self,
        primary: Source,
        resolver: &dyn IncludeResolver,
    ) -> Result<Arc<dyn CompiledProgram>, CompileError>;

    /// Format raw text. Independent of any compile.
    fn format(&self, text: &str, options: &FormatOptions) -> Result<String, CompileError>;
}
