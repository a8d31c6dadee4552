//! Main event loop for the LSP server.
//!
//! Everything runs on one thread:
//! - Notifications mutate the document store and re-arm the build scheduler
//! - Requests are answered from the current build snapshot
//! - A build cycle runs when the receive deadline passes with no message

use crate::build::{build_once, panic_message};
use crate::config::ServerConfig;
use crate::handlers::diagnostics::{group_by_document, publish_params};
use crate::handlers::{
    handle_completion, handle_document_symbols, handle_formatting, handle_goto_definition,
    handle_hover, handle_rename, handle_signature_help,
};
use crate::resolve::{DiskFileSystem, FileSystem};
use crate::scheduler::{BuildScheduler, Clock, SystemClock};
use crate::snapshot::Snapshot;
use crate::vfs::Vfs;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use glint_core::Compiler;
use glint_frontend::Frontend;
use lsp_types::notification::{
    DidChangeTextDocument, DidChangeWatchedFiles, DidCloseTextDocument, DidOpenTextDocument,
    Exit, Initialized, Notification, PublishDiagnostics, ShowMessage,
};
use lsp_types::request::{
    Completion, DocumentSymbolRequest, Formatting, GotoDefinition, HoverRequest, Rename, Request,
    Shutdown, SignatureHelpRequest,
};
use lsp_types::{
    CompletionParams, DocumentFormattingParams, DocumentSymbolParams, GotoDefinitionParams,
    HoverParams, MessageType, PublishDiagnosticsParams, RenameParams, ShowMessageParams,
    SignatureHelpParams,
};
use serde::de::DeserializeOwned;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Prefix of the error returned for methods the server does not implement.
const UNHANDLED_REQUEST: &str = "Unhandled request";

/// Events processed by the main loop.
#[derive(Debug)]
pub enum Event {
    /// LSP message from the client.
    Message(lsp_server::Message),
    /// The receive deadline passed without a message.
    BuildDue,
}

/// State managed by the main loop.
pub struct MainLoopState {
    /// Open documents.
    vfs: Vfs,
    /// The most recent successful build.
    snapshot: Arc<Snapshot>,
    /// Debounce state machine.
    scheduler: BuildScheduler,
    /// The compiler driven by build cycles and formatting.
    compiler: Arc<dyn Compiler>,
    /// Storage for includes that are not open in the editor.
    fs: Arc<dyn FileSystem>,
    /// Server configuration.
    config: ServerConfig,
    /// Sender for outgoing LSP messages.
    sender: Sender<lsp_server::Message>,
    /// Whether shutdown was requested.
    shutdown_requested: bool,
    /// Whether the client sent `exit`.
    exit_requested: bool,
}

impl std::fmt::Debug for MainLoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainLoopState")
            .field("documents", &self.vfs.len())
            .field("generation", &self.snapshot.generation())
            .field("scheduler", &self.scheduler)
            .field("shutdown_requested", &self.shutdown_requested)
            .finish_non_exhaustive()
    }
}

fn parse_params<P: DeserializeOwned>(params: serde_json::Value) -> Result<P, String> {
    serde_json::from_value(params).map_err(|e| e.to_string())
}

fn to_json<T: serde::Serialize>(value: T) -> Result<serde_json::Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

impl MainLoopState {
    /// Create a state that drives the bundled front-end against the disk.
    pub fn new(sender: Sender<lsp_server::Message>, config: ServerConfig) -> Self {
        Self::with_parts(
            sender,
            config,
            Arc::new(Frontend::new()),
            Arc::new(DiskFileSystem),
            Arc::new(SystemClock),
        )
    }

    /// Create a state from explicit collaborators.
    pub fn with_parts(
        sender: Sender<lsp_server::Message>,
        config: ServerConfig,
        compiler: Arc<dyn Compiler>,
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let scheduler = BuildScheduler::new(clock, config.debounce());
        Self {
            vfs: Vfs::new(),
            snapshot: Arc::new(Snapshot::empty()),
            scheduler,
            compiler,
            fs,
            config,
            sender,
            shutdown_requested: false,
            exit_requested: false,
        }
    }

    /// The open documents.
    pub const fn vfs(&self) -> &Vfs {
        &self.vfs
    }

    /// The current build snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    /// The build scheduler.
    pub const fn scheduler(&self) -> &BuildScheduler {
        &self.scheduler
    }

    /// Whether the client asked the server to shut down.
    pub const fn shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }

    /// Whether the client sent `exit`.
    pub const fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Arm the scheduler for a build, e.g. right after initialization.
    pub fn schedule_build(&mut self) {
        self.scheduler.schedule();
    }

    /// Handle an incoming event.
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Message(msg) => self.handle_message(msg),
            Event::BuildDue => {}
        }
        self.run_build_if_due();
    }

    /// Handle an LSP message.
    pub fn handle_message(&mut self, msg: lsp_server::Message) {
        match msg {
            lsp_server::Message::Request(req) => self.handle_request(req),
            lsp_server::Message::Notification(notif) => self.handle_notification(notif),
            lsp_server::Message::Response(resp) => {
                if let Some(err) = resp.error {
                    tracing::warn!("Client rejected request {}: {}", resp.id, err.message);
                } else {
                    tracing::debug!("Client acknowledged request {}", resp.id);
                }
            }
        }
    }

    /// Run the pending build cycle if its debounce deadline has passed.
    ///
    /// Returns whether a cycle ran.
    pub fn run_build_if_due(&mut self) -> bool {
        let Some(generation) = self.scheduler.begin_due() else {
            return false;
        };

        let documents = self.vfs.all();
        tracing::info!(
            "Build {} started for {} documents",
            generation,
            documents.len()
        );

        match build_once(
            self.compiler.as_ref(),
            &documents,
            self.fs.as_ref(),
            generation,
        ) {
            Ok(outcome) => {
                tracing::info!(
                    "Build {} finished: {} diagnostics, {} unused symbols",
                    generation,
                    outcome.diagnostics.len(),
                    outcome.unused_symbols.len()
                );
                self.snapshot = Arc::new(outcome.snapshot);
                let grouped = group_by_document(&outcome.diagnostics, &outcome.unused_symbols);
                for params in publish_params(&documents, grouped) {
                    self.send_diagnostics(params);
                }
            }
            Err(e) => {
                // The previous snapshot stays authoritative.
                tracing::error!("Build {} failed: {}", generation, e);
                self.show_error(format!("glint: {e}"));
            }
        }

        self.scheduler.finish();
        true
    }

    /// Handle an LSP request (expects response).
    fn handle_request(&mut self, req: lsp_server::Request) {
        let id = req.id.clone();
        let method = req.method.clone();

        if self.shutdown_requested && method != Shutdown::METHOD {
            let response = lsp_server::Response::new_err(
                id,
                lsp_server::ErrorCode::InvalidRequest as i32,
                "Server is shutting down".to_string(),
            );
            self.send(lsp_server::Message::Response(response));
            return;
        }

        tracing::debug!("Request {}: {}", id, method);

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch_request(req)))
            .unwrap_or_else(|payload| {
                Err(format!(
                    "{method} panicked: {}",
                    panic_message(payload.as_ref())
                ))
            });

        // Send response
        let response = match result {
            Ok(value) => lsp_server::Response::new_ok(id, value),
            Err(msg) if msg.starts_with(UNHANDLED_REQUEST) => lsp_server::Response::new_err(
                id,
                lsp_server::ErrorCode::MethodNotFound as i32,
                msg,
            ),
            Err(msg) => {
                tracing::error!("Request {} failed: {}", method, msg);
                self.show_error(format!("glint: {method} failed: {msg}"));
                lsp_server::Response::new_err(id, lsp_server::ErrorCode::InternalError as i32, msg)
            }
        };

        self.send(lsp_server::Message::Response(response));
    }

    fn dispatch_request(&mut self, req: lsp_server::Request) -> Result<serde_json::Value, String> {
        match req.method.as_str() {
            Shutdown::METHOD => {
                tracing::info!("Shutdown requested");
                self.shutdown_requested = true;
                Ok(serde_json::Value::Null)
            }
            HoverRequest::METHOD => self.handle_hover_request(req),
            GotoDefinition::METHOD => self.handle_goto_definition_request(req),
            DocumentSymbolRequest::METHOD => self.handle_document_symbols_request(req),
            Rename::METHOD => self.handle_rename_request(req),
            Completion::METHOD => self.handle_completion_request(req),
            SignatureHelpRequest::METHOD => self.handle_signature_help_request(req),
            Formatting::METHOD => self.handle_formatting_request(req),
            _ => {
                tracing::warn!("Unhandled request: {}", req.method);
                Err(format!("{UNHANDLED_REQUEST}: {}", req.method))
            }
        }
    }

    /// Handle the textDocument/hover request.
    fn handle_hover_request(&self, req: lsp_server::Request) -> Result<serde_json::Value, String> {
        let params: HoverParams = parse_params(req.params)?;
        to_json(handle_hover(&params, &self.snapshot))
    }

    /// Handle the textDocument/definition request.
    fn handle_goto_definition_request(
        &self,
        req: lsp_server::Request,
    ) -> Result<serde_json::Value, String> {
        let params: GotoDefinitionParams = parse_params(req.params)?;
        to_json(handle_goto_definition(&params, &self.snapshot))
    }

    /// Handle the textDocument/documentSymbol request.
    fn handle_document_symbols_request(
        &self,
        req: lsp_server::Request,
    ) -> Result<serde_json::Value, String> {
        let params: DocumentSymbolParams = parse_params(req.params)?;
        to_json(handle_document_symbols(&params, &self.snapshot))
    }

    /// Handle the textDocument/rename request.
    fn handle_rename_request(&self, req: lsp_server::Request) -> Result<serde_json::Value, String> {
        let params: RenameParams = parse_params(req.params)?;
        to_json(handle_rename(&params, &self.snapshot, &self.vfs))
    }

    /// Handle the textDocument/completion request.
    fn handle_completion_request(
        &self,
        req: lsp_server::Request,
    ) -> Result<serde_json::Value, String> {
        let params: CompletionParams = parse_params(req.params)?;
        to_json(handle_completion(&params, &self.snapshot))
    }

    /// Handle the textDocument/signatureHelp request.
    fn handle_signature_help_request(
        &self,
        req: lsp_server::Request,
    ) -> Result<serde_json::Value, String> {
        let params: SignatureHelpParams = parse_params(req.params)?;
        to_json(handle_signature_help(&params, &self.snapshot))
    }

    /// Handle the textDocument/formatting request.
    fn handle_formatting_request(
        &self,
        req: lsp_server::Request,
    ) -> Result<serde_json::Value, String> {
        let params: DocumentFormattingParams = parse_params(req.params)?;
        let edits = handle_formatting(
            &params,
            &self.vfs,
            self.compiler.as_ref(),
            self.config.formatting.trailing_newline,
        )?;
        to_json(edits)
    }

    /// Handle an LSP notification (no response expected).
    fn handle_notification(&mut self, notif: lsp_server::Notification) {
        // Notifications are handled synchronously - this is critical for correctness
        match notif.method.as_str() {
            DidOpenTextDocument::METHOD => {
                if let Ok(params) =
                    serde_json::from_value::<lsp_types::DidOpenTextDocumentParams>(notif.params)
                {
                    self.on_did_open(params);
                }
            }
            DidChangeTextDocument::METHOD => {
                if let Ok(params) =
                    serde_json::from_value::<lsp_types::DidChangeTextDocumentParams>(notif.params)
                {
                    self.on_did_change(params);
                }
            }
            DidCloseTextDocument::METHOD => {
                if let Ok(params) =
                    serde_json::from_value::<lsp_types::DidCloseTextDocumentParams>(notif.params)
                {
                    self.on_did_close(params);
                }
            }
            DidChangeWatchedFiles::METHOD => {
                if let Ok(params) =
                    serde_json::from_value::<lsp_types::DidChangeWatchedFilesParams>(notif.params)
                {
                    self.on_did_change_watched_files(params);
                }
            }
            Initialized::METHOD => {
                tracing::info!("Client initialized");
                self.register_file_watchers();
            }
            Exit::METHOD => {
                tracing::info!("Exit notification received");
                self.exit_requested = true;
            }
            _ => {
                tracing::debug!("Unhandled notification: {}", notif.method);
            }
        }
    }

    /// Handle textDocument/didOpen notification.
    fn on_did_open(&mut self, params: lsp_types::DidOpenTextDocumentParams) {
        let document = params.text_document;
        tracing::info!("Document opened: {}", document.uri.as_str());

        if let Err(e) =
            self.vfs
                .open_versioned(document.uri.as_str(), &document.text, document.version)
        {
            tracing::warn!("{}", e);
            return;
        }
        self.scheduler.schedule();
    }

    /// Handle textDocument/didChange notification.
    fn on_did_change(&mut self, params: lsp_types::DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        match self.vfs.change_versioned(
            uri.as_str(),
            &params.content_changes,
            Some(params.text_document.version),
        ) {
            Ok(version) => {
                tracing::debug!("Document changed: {} (version {})", uri.as_str(), version);
                self.scheduler.schedule();
            }
            Err(e) => tracing::warn!("{}", e),
        }
    }

    /// Handle textDocument/didClose notification.
    fn on_did_close(&mut self, params: lsp_types::DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::info!("Document closed: {}", uri.as_str());

        if let Err(e) = self.vfs.close(uri.as_str()) {
            tracing::warn!("{}", e);
            return;
        }

        // Clear diagnostics
        self.send_diagnostics(PublishDiagnosticsParams {
            uri,
            diagnostics: Vec::new(),
            version: None,
        });
        self.scheduler.schedule();
    }

    /// Handle workspace/didChangeWatchedFiles notification.
    fn on_did_change_watched_files(&mut self, params: lsp_types::DidChangeWatchedFilesParams) {
        tracing::info!("Watched files changed: {} files", params.changes.len());
        for change in &params.changes {
            tracing::debug!("File {:?}: {:?}", change.uri.as_str(), change.typ);
        }
        self.scheduler.schedule();
    }

    /// Register file watchers with the client.
    fn register_file_watchers(&self) {
        let watchers = self
            .config
            .watch_patterns
            .iter()
            .map(|pattern| lsp_types::FileSystemWatcher {
                glob_pattern: lsp_types::GlobPattern::String(pattern.clone()),
                kind: Some(lsp_types::WatchKind::all()),
            })
            .collect();

        let register_options =
            match serde_json::to_value(lsp_types::DidChangeWatchedFilesRegistrationOptions {
                watchers,
            }) {
                Ok(value) => value,
                Err(e) => {
                    tracing::error!("Failed to encode watcher registration: {}", e);
                    return;
                }
            };

        let params = lsp_types::RegistrationParams {
            registrations: vec![lsp_types::Registration {
                id: "file-watcher".to_string(),
                method: DidChangeWatchedFiles::METHOD.to_string(),
                register_options: Some(register_options),
            }],
        };

        let request = lsp_server::Request::new(
            lsp_server::RequestId::from("register-file-watchers".to_string()),
            lsp_types::request::RegisterCapability::METHOD.to_string(),
            params,
        );

        self.send(lsp_server::Message::Request(request));
        tracing::info!(
            "Registered file watchers for {}",
            self.config.watch_patterns.join(", ")
        );
    }

    /// Send diagnostics to the client.
    fn send_diagnostics(&self, params: PublishDiagnosticsParams) {
        tracing::debug!(
            "Publishing {} diagnostics for {}",
            params.diagnostics.len(),
            params.uri.as_str()
        );
        let notif = lsp_server::Notification::new(PublishDiagnostics::METHOD.to_string(), params);
        self.send(lsp_server::Message::Notification(notif));
    }

    /// Show an error to the user.
    fn show_error(&self, message: String) {
        let params = ShowMessageParams {
            typ: MessageType::ERROR,
            message,
        };
        let notif = lsp_server::Notification::new(ShowMessage::METHOD.to_string(), params);
        self.send(lsp_server::Message::Notification(notif));
    }

    /// Send a message to the client.
    fn send(&self, msg: lsp_server::Message) {
        if let Err(e) = self.sender.send(msg) {
            tracing::error!("Failed to send message: {}", e);
        }
    }
}

/// Run the main event loop until the client sends `exit` or disconnects.
///
/// Returns whether shutdown was requested before the loop ended.
pub fn run_main_loop(receiver: &Receiver<lsp_server::Message>, mut state: MainLoopState) -> bool {
    tracing::info!("Main loop started");

    // Build whatever was opened during initialization.
    state.schedule_build();

    loop {
        let received = match state.scheduler().deadline() {
            Some(deadline) => receiver.recv_deadline(deadline),
            None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        let event = match received {
            Ok(msg) => Event::Message(msg),
            Err(RecvTimeoutError::Timeout) => Event::BuildDue,
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!("Client disconnected");
                break;
            }
        };

        state.handle_event(event);
        if state.exit_requested() {
            break;
        }
    }

    tracing::info!("Main loop ended");
    state.shutdown_requested()
}
