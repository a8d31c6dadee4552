//! Compiler adapter interface for the glint language server.
//!
//! This crate defines the narrow surface between the language server and a
//! compiler front-end. The server never looks inside a compiled program; it
//! only asks the questions described here.
//!
//! # Overview
//!
//! - [`Compiler`]: compiles a primary [`Source`], pulling includes through an
//!   [`IncludeResolver`], and formats raw text.
//! - [`CompiledProgram`]: the opaque result of a compile, answering IDE queries.
//! - [`SourceRange`] / [`Position`]: zero-based line and UTF-16 column addressing,
//!   matching what editors send over the protocol.
//!
//! # Example
//!
//! ```ignore
//! use glint_core::{Compiler, Source};
//!
//! let program = compiler.compile(Source::new("file:///a.glsl", text), &resolver)?;
//! for diagnostic in program.diagnostics() {
//!     println!("{diagnostic}");
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod compiler;
mod diagnostic;
mod error;
mod format;
mod position;
mod query;

pub use compiler::{CompiledProgram, Compiler, IncludeResolver, Source};
pub use diagnostic::{Diagnostic, Severity, UnusedSymbol};
pub use error::CompileError;
pub use format::{FormatOptions, TrailingNewline};
pub use position::{Position, SourceRange};
pub use query::{
    Completion, Signature, SignatureQueryResult, SourcePosition, Symbol, SymbolKind, Tooltip,
    TooltipQuery,
};
