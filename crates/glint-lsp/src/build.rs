//! Build cycle assembly.
//!
//! One cycle compiles every open document with the same include resolver,
//! pools the diagnostics, and assembles a fresh [`Snapshot`]. The cycle either
//! completes as a whole or fails as a whole.

use crate::resolve::{FileSystem, WorkspaceResolver};
use crate::snapshot::{BuildResult, Snapshot};
use crate::vfs::DocumentSet;
use glint_core::{CompileError, CompiledProgram, Compiler, Diagnostic, Source, UnusedSymbol};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;

/// Errors that abort a build cycle.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The compiler reported a failure.
    #[error("compiling {source_id} failed: {source}")]
    Compiler {
        /// The document being compiled.
        source_id: String,
        /// The compiler's error.
        #[source]
        source: CompileError,
    },

    /// The compiler panicked.
    #[error("compiler panicked on {source_id}: {message}")]
    Panicked {
        /// The document being compiled.
        source_id: String,
        /// The panic payload, if it was a string.
        message: String,
    },
}

/// The output of a successful build cycle.
#[derive(Debug)]
pub struct BuildOutcome {
    /// The new cache snapshot.
    pub snapshot: Snapshot,
    /// Diagnostics pooled from every compile, duplicates removed.
    pub diagnostics: Vec<Diagnostic>,
    /// Unused-symbol findings pooled from every compile, duplicates removed.
    pub unused_symbols: Vec<UnusedSymbol>,
}

/// Render a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn compile_guarded(
    compiler: &dyn Compiler,
    primary: Source,
    resolver: &WorkspaceResolver<'_>,
) -> Result<Arc<dyn CompiledProgram>, BuildError> {
    let source_id = primary.name.clone();
    match panic::catch_unwind(AssertUnwindSafe(|| compiler.compile(primary, resolver))) {
        Ok(Ok(program)) => Ok(program),
        Ok(Err(source)) => Err(BuildError::Compiler { source_id, source }),
        Err(payload) => Err(BuildError::Panicked {
            source_id,
            message: panic_message(payload.as_ref()),
        }),
    }
}

/// Items collected across compiles, each kept once in first-seen order.
#[derive(Debug)]
struct Pool<T> {
    seen: HashSet<T>,
    items: Vec<T>,
}

impl<T: Eq + Hash + Clone> Pool<T> {
    fn new() -> Self {
        Self {
            seen: HashSet::new(),
            items: Vec::new(),
        }
    }

    fn extend(&mut self, items: &[T]) {
        for item in items {
            if self.seen.insert(item.clone()) {
                self.items.push(item.clone());
            }
        }
    }

    fn into_vec(self) -> Vec<T> {
        self.items
    }
}

/// Run one build cycle over `documents`.
pub fn build_once(
    compiler: &dyn Compiler,
    documents: &DocumentSet,
    fs: &dyn FileSystem,
    generation: u64,
) -> Result<BuildOutcome, BuildError> {
    let resolver = WorkspaceResolver::new(documents, fs);
    let mut results = HashMap::with_capacity(documents.len());
    let mut diagnostics = Pool::new();
    let mut unused_symbols = Pool::new();

    for document in documents {
        let primary = Source::new(document.id.clone(), document.text.clone());
        let program = compile_guarded(compiler, primary, &resolver)?;

        diagnostics.extend(program.diagnostics());
        unused_symbols.extend(program.unused_symbols());

        let result = BuildResult {
            diagnostics: program.diagnostics().to_vec(),
            unused_symbols: program.unused_symbols().to_vec(),
            version: document.version,
            program,
        };
        results.insert(document.id.clone(), Arc::new(result));
    }

    Ok(BuildOutcome {
        snapshot: Snapshot::new(generation, results),
        diagnostics: diagnostics.into_vec(),
        unused_symbols: unused_symbols.into_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::MemoryFileSystem;
    use crate::vfs::Vfs;
    use glint_core::FormatOptions;
    use glint_frontend::Frontend;

    struct Exploding;

    impl Compiler for Exploding {
        fn compile(
            &self,
            primary: Source,
            _: &dyn glint_core::IncludeResolver,
        ) -> Result<Arc<dyn CompiledProgram>, CompileError> {
            if primary.contents.contains("panic") {
                panic!("boom in {}", primary.name);
            }
            Err(CompileError::Internal("no backend".to_string()))
        }

        fn format(&self, text: &str, _: &FormatOptions) -> Result<String, CompileError> {
            Ok(text.to_string())
        }
    }

    #[test]
    fn test_build_pools_diagnostics_once() {
        let fs = MemoryFileSystem::new();
        let mut vfs = Vfs::new();
        vfs.open("file:///p/lib.glsl", "void f() { y = 1.0; }").unwrap();
        vfs.open("file:///p/main.glsl", "#include \"lib.glsl\"\nvoid main() { f(); }")
            .unwrap();

        let outcome = build_once(&Frontend::new(), &vfs.all(), &fs, 7).unwrap();
        assert_eq!(outcome.snapshot.generation(), 7);
        assert_eq!(outcome.snapshot.len(), 2);
        // The error in lib.glsl is found by both compiles but pooled once.
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(
            outcome.diagnostics[0].range.as_ref().unwrap().source,
            "file:///p/lib.glsl"
        );
        let main = outcome.snapshot.get("file:///p/main.glsl").unwrap();
        assert_eq!(main.diagnostics.len(), 1);
        assert_eq!(main.version, 0);
    }

    #[test]
    fn test_pool_keeps_first_seen_order() {
        let diagnostic = |line: u32, message: &str| {
            Diagnostic::error(
                message,
                glint_core::SourceRange::new(
                    "file:///a.glsl",
                    glint_core::Position::new(line, 0),
                    glint_core::Position::new(line, 1),
                ),
            )
        };
        let first: Vec<Diagnostic> = (0..500).map(|line| diagnostic(line, "bad")).collect();
        let mut pool = Pool::new();
        pool.extend(&first);
        pool.extend(&first[250..]);
        pool.extend(&[diagnostic(3, "worse"), diagnostic(3, "bad")]);

        let pooled = pool.into_vec();
        assert_eq!(pooled.len(), 501);
        assert_eq!(pooled[..500], first[..]);
        assert_eq!(pooled[500], diagnostic(3, "worse"));
    }

    #[test]
    fn test_compiler_error_aborts_cycle() {
        let fs = MemoryFileSystem::new();
        let mut vfs = Vfs::new();
        vfs.open("file:///a.glsl", "x").unwrap();
        let err = build_once(&Exploding, &vfs.all(), &fs, 1).unwrap_err();
        assert!(matches!(err, BuildError::Compiler { ref source_id, .. } if source_id == "file:///a.glsl"));
    }

    #[test]
    fn test_compiler_panic_is_caught() {
        let fs = MemoryFileSystem::new();
        let mut vfs = Vfs::new();
        vfs.open("file:///a.glsl", "panic").unwrap();
        match build_once(&Exploding, &vfs.all(), &fs, 1) {
            Err(BuildError::Panicked { message, .. }) => {
                assert_eq!(message, "boom in file:///a.glsl");
            }
            other => panic!("expected a panic error, got {other:?}"),
        }
    }
}
