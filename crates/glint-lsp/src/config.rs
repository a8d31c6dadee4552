//! Server configuration.
//!
//! Read from the client's `initializationOptions`. Every field has a default,
//! so an empty or missing object yields a working configuration.
//!
//! ```
//! use glint_lsp::config::ServerConfig;
//!
//! let config = ServerConfig::from_initialization_options(Some(serde_json::json!({
//!     "debounceMs": 250,
//!     "formatting": { "trailingNewline": "preserve" }
//! })))
//! .unwrap();
//! assert_eq!(config.debounce_ms, 250);
//! ```

use glint_core::TrailingNewline;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Default debounce between the last edit and the rebuild.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Errors from reading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The initialization options did not match the expected shape.
    #[error("invalid initialization options: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Root configuration for the glint server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Quiet period after an edit before a build cycle runs.
    pub debounce_ms: u64,
    /// Formatting defaults.
    pub formatting: FormattingConfig,
    /// Glob patterns registered with the client for file watching.
    pub watch_patterns: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            formatting: FormattingConfig::default(),
            watch_patterns: default_watch_patterns(),
        }
    }
}

/// Formatting defaults, used when a request does not say otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormattingConfig {
    /// What to do with the final newline.
    pub trailing_newline: TrailingNewline,
}

fn default_watch_patterns() -> Vec<String> {
    ["**/*.glsl", "**/*.glslx", "**/*.vert", "**/*.frag"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl ServerConfig {
    /// Parse the `initializationOptions` value sent with `initialize`.
    pub fn from_initialization_options(
        options: Option<serde_json::Value>,
    ) -> Result<Self, ConfigError> {
        match options {
            None | Some(serde_json::Value::Null) => Ok(Self::default()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    /// The debounce delay as a [`Duration`].
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
