//! Language Server Protocol implementation for glint shaders.
//!
//! The server keeps the documents open in the editor, rebuilds all of them
//! after a short quiet period, and answers queries from the latest build:
//! - Diagnostics pushed after every build, including unused-symbol hints
//! - Hover, go-to-definition and document symbols
//! - Cross-file rename with per-document versioned edits
//! - Completion and signature help
//! - Whole-document formatting
//!
//! # Architecture
//!
//! - **Main loop**: one thread, handles LSP messages and runs due builds
//! - **Scheduler**: debounces edits into build cycles
//! - **Snapshot**: the immutable result of one build cycle, swapped whole
//! - **Handlers**: answer requests against the current snapshot

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod build;
pub mod config;
pub mod handlers;
pub mod main_loop;
pub mod resolve;
pub mod scheduler;
pub mod snapshot;
pub mod vfs;

mod server;

pub use config::ServerConfig;
pub use main_loop::{MainLoopState, run_main_loop};
pub use server::{Server, ServerOverrides, resolve_config, server_capabilities, start_stdio};
pub use snapshot::Snapshot;
pub use vfs::Vfs;

/// LSP server version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
