//! Reference shader front-end for glint.
//!
//! Implements [`glint_core::Compiler`] for a GLSL-like shader language with
//! `#include "path"` directives. The analysis is deliberately shallow: it
//! tracks declarations, scopes, and references well enough to answer IDE
//! queries, and does no type checking.
//!
//! # Example
//!
//! ```
//! use glint_core::{CompiledProgram, Compiler, Source};
//! use glint_frontend::Frontend;
//!
//! let resolver = |_: &str, _: &str| -> Option<Source> { None };
//! let program = Frontend::new()
//!     .compile(Source::new("main.glsl", "void main() { x = 1.0; }"), &resolver)
//!     .unwrap();
//! assert_eq!(program.diagnostics()[0].message, "undefined symbol \"x\"");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod analysis;
pub mod builtins;
mod format;
pub mod lexer;
mod program;

pub use program::Program;

use glint_core::{CompileError, CompiledProgram, Compiler, FormatOptions, IncludeResolver, Source};
use std::sync::Arc;

/// The reference front-end.
#[derive(Debug, Clone, Copy, Default)]
pub struct Frontend;

impl Frontend {
    /// Create a front-end.
    pub const fn new() -> Self {
        Self
    }

    /// Compile into the concrete [`Program`] type.
    pub fn analyze(&self, primary: Source, resolver: &dyn IncludeResolver) -> Program {
        analysis::analyze(primary, resolver)
    }
}

impl Compiler for Frontend {
    fn compile(
        &self,
        primary: Source,
        resolver: &dyn IncludeResolver,
    ) -> Result<Arc<dyn CompiledProgram>, CompileError> {
        let name = primary.name.clone();
        let program = self.analyze(primary, resolver);
        tracing::debug!(
            source = %name,
            sources = program.sources().count(),
            diagnostics = program.diagnostics().len(),
            "compiled"
        );
        Ok(Arc::new(program))
    }

    fn format(&self, text: &str, options: &FormatOptions) -> Result<String, CompileError> {
        if options.newline != "\n" && options.newline != "\r\n" {
            return Err(CompileError::InvalidInput(format!(
                "unsupported line terminator {:?}",
                options.newline
            )));
        }
        Ok(format::format(text, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_through_trait() {
        let compiler: &dyn Compiler = &Frontend::new();
        let resolver = |_: &str, _: &str| -> Option<Source> { None };
        let program = compiler
            .compile(Source::new("a", "float a;\nvoid main() { a = 1.0; }"), &resolver)
            .unwrap();
        assert!(program.diagnostics().is_empty());
        assert_eq!(program.symbols("a").unwrap().len(), 2);
        assert!(program.symbols("b").is_none());
    }

    #[test]
    fn test_format_rejects_odd_newline() {
        let options = FormatOptions {
            newline: "\u{2028}".to_string(),
            ..FormatOptions::default()
        };
        assert!(Frontend::new().format("x", &options).is_err());
    }
}
