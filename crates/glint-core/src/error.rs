//! Compiler error types.

use thiserror::Error;

/// A failure of the compiler itself, as opposed to a problem in the program.
///
/// Problems in the program are reported as [`crate::Diagnostic`]s on a
/// successful compile. This error means no program could be produced at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// An internal compiler fault.
    #[error("internal compiler error: {0}")]
    Internal(String),

    /// The compiler refused its input outright.
    #[error("invalid compiler input: {0}")]
    InvalidInput(String),
}
