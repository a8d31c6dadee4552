//! Immutable build cache snapshot for request handling.
//!
//! A build cycle produces one [`Snapshot`] covering every document that was
//! open when it started. The server swaps its `Arc<Snapshot>` in one step, so
//! a handler holding a snapshot never observes a half-finished cycle.

use glint_core::{CompiledProgram, Diagnostic, UnusedSymbol};
use std::collections::HashMap;
use std::sync::Arc;

/// The compiled state of one document.
pub struct BuildResult {
    /// The compiled program, for queries.
    pub program: Arc<dyn CompiledProgram>,
    /// Diagnostics from compiling this document.
    pub diagnostics: Vec<Diagnostic>,
    /// Unused-symbol findings from compiling this document.
    pub unused_symbols: Vec<UnusedSymbol>,
    /// The document version the build saw.
    pub version: i32,
}

impl std::fmt::Debug for BuildResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildResult")
            .field("diagnostics", &self.diagnostics.len())
            .field("unused_symbols", &self.unused_symbols.len())
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// An immutable view of the build cache.
#[derive(Debug, Default)]
pub struct Snapshot {
    /// The build generation that produced this snapshot (0 = no build yet).
    generation: u64,
    /// Build results by document URI.
    results: HashMap<String, Arc<BuildResult>>,
}

impl Snapshot {
    /// The snapshot before any build has completed.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot from a completed build cycle.
    pub fn new(generation: u64, results: HashMap<String, Arc<BuildResult>>) -> Self {
        Self {
            generation,
            results,
        }
    }

    /// The generation that produced this snapshot.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// The build result for a document.
    pub fn get(&self, id: &str) -> Option<&Arc<BuildResult>> {
        self.results.get(id)
    }

    /// The compiled program for a document.
    pub fn program(&self, id: &str) -> Option<&dyn CompiledProgram> {
        self.results.get(id).map(|result| result.program.as_ref())
    }

    /// Number of documents in the snapshot.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the snapshot holds no results.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
