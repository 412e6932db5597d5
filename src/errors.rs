// ABOUTME: Error types for the deck-slides application
// ABOUTME: Provides structured error handling for configuration, rendering and export

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("Failed to read file: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("Failed to fetch remote resource: {0}")]
    FetchError(#[from] reqwest::Error),

    #[error("Invalid resource path: {0}")]
    InvalidResourcePath(String),

    #[error("Markdown conversion error: {0}")]
    MarkdownError(String),

    #[error("Plugin '{plugin}' failed to register: {message}")]
    PluginError { plugin: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    #[error("Theme error: {0}")]
    ThemeError(String),

    #[error("Headless browser error: {message}")]
    BrowserError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Export error: {0}")]
    ExportError(String),

    #[error("Input validation error: {0}")]
    ValidationError(String),

    #[error("Path not found: {0}")]
    PathNotFoundError(PathBuf),

    #[error("Watch error: {0}")]
    WatchError(String),

    #[error("Unknown error: {0}")]
    UnknownError(String),
}

impl DeckError {
    /// Shorthand for a plugin registration failure
    pub fn plugin(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        DeckError::PluginError {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a browser failure without an underlying source
    pub fn browser(message: impl Into<String>) -> Self {
        DeckError::BrowserError {
            message: message.into(),
            source: None,
        }
    }
}

// Implement conversion from anyhow::Error to our DeckError
impl From<anyhow::Error> for DeckError {
    fn from(err: anyhow::Error) -> Self {
        DeckError::UnknownError(err.to_string())
    }
}

impl From<serde_json::Error> for DeckError {
    fn from(err: serde_json::Error) -> Self {
        DeckError::ConfigError(format!("JSON serialization failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, DeckError>;
