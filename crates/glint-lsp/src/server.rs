//! Server bootstrap: the initialize handshake and the stdio transport.

use crate::config::ServerConfig;
use crate::main_loop::{MainLoopState, run_main_loop};
use anyhow::Context;
use lsp_server::{Connection, ErrorCode, RequestId, Response};
use lsp_types::InitializeParams;

/// Settings given on the command line, applied on top of the client's
/// initialization options.
#[derive(Debug, Clone, Default)]
pub struct ServerOverrides {
    /// Replaces the configured debounce delay.
    pub debounce_ms: Option<u64>,
}

/// Capabilities advertised to the client.
pub fn server_capabilities() -> lsp_types::ServerCapabilities {
    lsp_types::ServerCapabilities {
        text_document_sync: Some(lsp_types::TextDocumentSyncCapability::Kind(
            lsp_types::TextDocumentSyncKind::INCREMENTAL,
        )),
        hover_provider: Some(lsp_types::HoverProviderCapability::Simple(true)),
        rename_provider: Some(lsp_types::OneOf::Left(true)),
        definition_provider: Some(lsp_types::OneOf::Left(true)),
        document_symbol_provider: Some(lsp_types::OneOf::Left(true)),
        document_formatting_provider: Some(lsp_types::OneOf::Left(true)),
        completion_provider: Some(lsp_types::CompletionOptions {
            trigger_characters: Some(vec![".".to_string()]),
            ..Default::default()
        }),
        signature_help_provider: Some(lsp_types::SignatureHelpOptions {
            trigger_characters: Some(vec!["(".to_string(), ",".to_string()]),
            retrigger_characters: None,
            work_done_progress_options: Default::default(),
        }),
        ..Default::default()
    }
}

/// Read the configuration from the initialize parameters.
///
/// Invalid options are logged and the defaults used instead.
pub fn resolve_config(params: &InitializeParams, overrides: &ServerOverrides) -> ServerConfig {
    let mut config =
        match ServerConfig::from_initialization_options(params.initialization_options.clone()) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                ServerConfig::default()
            }
        };
    if let Some(debounce_ms) = overrides.debounce_ms {
        config.debounce_ms = debounce_ms;
    }
    config
}

/// The LSP server.
pub struct Server {
    /// Connection to the LSP client.
    connection: Connection,
    /// Configuration resolved during initialization.
    config: ServerConfig,
}

impl Server {
    /// Create a new LSP server from a connection.
    pub fn new(connection: Connection, config: ServerConfig) -> Self {
        Self { connection, config }
    }

    /// Run the server's main loop.
    ///
    /// Returns whether the client shut the server down cleanly.
    pub fn run(self) -> bool {
        tracing::info!(
            "Starting glint language server v{} (debounce {} ms)",
            crate::VERSION,
            self.config.debounce_ms
        );

        let Connection { sender, receiver } = self.connection;
        let state = MainLoopState::new(sender, self.config);
        let clean = run_main_loop(&receiver, state);

        tracing::info!("Server shutdown complete");
        clean
    }
}

/// Decode the `initialize` params, answering the request with
/// `InvalidParams` if they are malformed.
fn parse_initialize(
    connection: &Connection,
    id: RequestId,
    params: serde_json::Value,
) -> anyhow::Result<InitializeParams> {
    match serde_json::from_value(params) {
        Ok(params) => Ok(params),
        Err(err) => {
            tracing::error!("Malformed initialize params: {}", err);
            let response = Response::new_err(
                id,
                ErrorCode::InvalidParams as i32,
                format!("malformed initialize params: {err}"),
            );
            connection
                .sender
                .send(response.into())
                .context("failed to reject initialize")?;
            Err(anyhow::Error::new(err).context("malformed initialize params"))
        }
    }
}

/// Start the LSP server using stdio transport.
///
/// Returns whether the client shut the server down cleanly.
pub fn start_stdio(overrides: &ServerOverrides) -> anyhow::Result<bool> {
    tracing::info!("Starting LSP server on stdio");

    // Create connection using stdio
    let (connection, io_threads) = Connection::stdio();

    // Wait for initialize request
    let (id, params) = connection
        .initialize_start()
        .context("initialize handshake failed")?;
    let init_params = parse_initialize(&connection, id.clone(), params)?;

    if let Some(folder) = init_params
        .workspace_folders
        .as_ref()
        .and_then(|folders| folders.first())
    {
        tracing::info!("Workspace root: {}", folder.uri.as_str());
    }

    let config = resolve_config(&init_params, overrides);

    let init_result = lsp_types::InitializeResult {
        capabilities: server_capabilities(),
        server_info: Some(lsp_types::ServerInfo {
            name: "glint-lsp".to_string(),
            version: Some(crate::VERSION.to_string()),
        }),
    };

    // Complete initialization handshake
    connection
        .initialize_finish(id, serde_json::to_value(init_result)?)
        .context("initialize handshake failed")?;

    tracing::info!("LSP initialized successfully");

    let clean = Server::new(connection, config).run();

    // Wait for IO threads to finish
    io_threads.join().context("stdio transport failed")?;

    Ok(clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn init_params(options: serde_json::Value) -> InitializeParams {
        serde_json::from_value(json!({
            "capabilities": {},
            "initializationOptions": options,
        }))
        .unwrap()
    }

    #[test]
    fn test_capabilities() {
        let capabilities = server_capabilities();
        assert_eq!(
            capabilities.text_document_sync,
            Some(lsp_types::TextDocumentSyncCapability::Kind(
                lsp_types::TextDocumentSyncKind::INCREMENTAL
            ))
        );
        assert_eq!(
            capabilities.completion_provider.unwrap().trigger_characters,
            Some(vec![".".to_string()])
        );
        assert_eq!(
            capabilities.signature_help_provider.unwrap().trigger_characters,
            Some(vec!["(".to_string(), ",".to_string()])
        );
        assert!(capabilities.document_formatting_provider.is_some());
    }

    #[test]
    fn test_resolve_config() {
        let config = resolve_config(&init_params(json!({ "debounceMs": 40 })), &ServerOverrides::default());
        assert_eq!(config.debounce_ms, 40);

        let overridden = resolve_config(
            &init_params(json!({ "debounceMs": 40 })),
            &ServerOverrides {
                debounce_ms: Some(5),
            },
        );
        assert_eq!(overridden.debounce_ms, 5);

        let invalid = resolve_config(
            &init_params(json!({ "debounceMs": "soon" })),
            &ServerOverrides::default(),
        );
        assert_eq!(invalid, ServerConfig::default());
    }

    #[test]
    fn test_malformed_initialize_is_answered() {
        let (server, client) = Connection::memory();
        let result = parse_initialize(&server, RequestId::from(1), json!({ "capabilities": 7 }));
        assert!(result.is_err());

        match client.receiver.try_recv().unwrap() {
            lsp_server::Message::Response(resp) => {
                assert_eq!(resp.id, RequestId::from(1));
                assert!(resp.result.is_none());
                assert_eq!(resp.error.unwrap().code, ErrorCode::InvalidParams as i32);
            }
            other => panic!("expected a response, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_initialize_sends_nothing() {
        let (server, client) = Connection::memory();
        let params = parse_initialize(
            &server,
            RequestId::from(1),
            json!({ "capabilities": {}, "initializationOptions": { "debounceMs": 40 } }),
        )
        .unwrap();
        assert!(params.initialization_options.is_some());
        assert!(client.receiver.try_recv().is_err());
    }
}
