//! glint language server.
//!
//! Usage:
//!   glint-lsp                      # Start LSP server (stdio)
//!   glint-lsp --debounce-ms 250    # Rebuild 250 ms after the last edit
//!   glint-lsp --version            # Print version

use clap::Parser;
use glint_lsp::ServerOverrides;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Language server for glint shaders. Speaks LSP over stdio.
#[derive(Parser, Debug)]
#[command(name = "glint-lsp", version, about)]
struct Args {
    /// Milliseconds to wait after the last edit before rebuilding
    #[arg(long, value_name = "MS")]
    debounce_ms: Option<u64>,

    /// Log filter, e.g. `debug` or `glint_lsp=trace` (RUST_LOG takes precedence)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Logs go to stderr; stdout carries the protocol
    let default_directive = match &args.log_level {
        Some(level) if level.contains('=') => level.clone(),
        Some(level) => format!("glint_lsp={level},glint_frontend={level}"),
        None => "glint_lsp=info".to_string(),
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&default_directive))
        .unwrap_or_else(|_| EnvFilter::new("glint_lsp=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let overrides = ServerOverrides {
        debounce_ms: args.debounce_ms,
    };

    match glint_lsp::start_stdio(&overrides) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            tracing::warn!("Exited without a shutdown request");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("Server error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
