// ABOUTME: Configuration module for the deck-slides application
// ABOUTME: Loads deck.toml, applies environment overrides and builds the configured engine

use crate::engine::{Engine, EngineFactory, EngineOptions, MathEngine};
use crate::errors::{DeckError, Result};
use crate::plugins::{DeclarativeFactory, EnginePreset, PluginSpec};
use crate::resources::{IncludeMode, ResourceFile};
use crate::theme::Theme;
use clap::ValueEnum;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory when no config is given
pub const CONFIG_FILE_NAME: &str = "deck.toml";

/// Paper sizes for PDF export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum PdfFormat {
    A3,
    #[default]
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

impl PdfFormat {
    /// Portrait (width, height) in inches
    pub fn dimensions(self) -> (f64, f64) {
        match self {
            PdfFormat::A3 => (11.69, 16.54),
            PdfFormat::A4 => (8.27, 11.69),
            PdfFormat::A5 => (5.83, 8.27),
            PdfFormat::Letter => (8.5, 11.0),
            PdfFormat::Legal => (8.5, 14.0),
            PdfFormat::Tabloid => (11.0, 17.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfOptions {
    pub format: PdfFormat,
    #[serde(alias = "printBackground")]
    pub print_background: bool,
    pub landscape: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            format: PdfFormat::A4,
            print_background: true,
            landscape: false,
        }
    }
}

/// `math = "katex"`, `math = "mathjax"`, `math = true` or `math = false`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MathSetting {
    Enabled(bool),
    Engine(MathEngine),
}

impl Default for MathSetting {
    fn default() -> Self {
        MathSetting::Engine(MathEngine::Katex)
    }
}

impl MathSetting {
    pub fn engine(self) -> Option<MathEngine> {
        match self {
            MathSetting::Enabled(true) => Some(MathEngine::Katex),
            MathSetting::Enabled(false) => None,
            MathSetting::Engine(engine) => Some(engine),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevMarkdownConfig {
    /// Extra plugins applied on top of the deck plugins while serving
    pub plugins: Vec<PluginSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevServerConfig {
    pub port: u16,
    /// WebSocket port for live reload, defaults to `port + 1`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reload_port: Option<u16>,
    pub debounce_ms: u64,
    pub live_reload: bool,
    pub markdown: DevMarkdownConfig,
    /// Options handed to the browser side as `window.__DECK_CLIENT__`
    pub client: toml::Table,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            reload_port: None,
            debounce_ms: 500,
            live_reload: true,
            markdown: DevMarkdownConfig::default(),
            client: toml::Table::new(),
        }
    }
}

impl DevServerConfig {
    pub fn reload_port(&self) -> u16 {
        self.reload_port
            .unwrap_or_else(|| self.port.saturating_add(1))
    }
}

/// Configuration for a deck: engine capabilities, plugins, theme, export
/// options. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    pub engine: EnginePreset,
    pub html: bool,
    pub math: MathSetting,
    pub breaks: bool,
    #[serde(alias = "allowLocalFiles")]
    pub allow_local_files: bool,
    pub resources: IncludeMode,
    pub timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<PathBuf>,
    pub css: Vec<String>,
    pub js: Vec<String>,
    pub pdf: PdfOptions,
    pub plugins: Vec<PluginSpec>,
    pub dev_server: DevServerConfig,
    /// Directory relative paths in the file resolve against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            engine: EnginePreset::Alerts,
            html: true,
            math: MathSetting::default(),
            breaks: false,
            allow_local_files: true,
            resources: IncludeMode::Embed,
            timeout_ms: 30000, // 30 seconds
            browser_path: None,
            theme: None,
            css: Vec::new(),
            js: Vec::new(),
            pdf: PdfOptions::default(),
            plugins: Vec::new(),
            dev_server: DevServerConfig::default(),
            base_dir: PathBuf::from("."),
        }
    }
}

impl DeckConfig {
    /// Every top-level key the configuration understands
    pub const RECOGNIZED_KEYS: [&'static str; 14] = [
        "engine",
        "html",
        "math",
        "breaks",
        "allow_local_files",
        "resources",
        "timeout_ms",
        "browser_path",
        "theme",
        "css",
        "js",
        "pdf",
        "plugins",
        "dev_server",
    ];

    /// camelCase spellings accepted for recognized keys
    pub const KEY_ALIASES: [&'static str; 1] = ["allowLocalFiles"];

    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, then the config file, then environment overrides.
    ///
    /// Without an explicit path, `deck.toml` in the working directory is used
    /// when present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(DeckError::PathNotFoundError(path.to_path_buf()));
                }
                Some(path.to_path_buf())
            }
            None => {
                let candidate = PathBuf::from(CONFIG_FILE_NAME);
                candidate.exists().then_some(candidate)
            }
        };

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => {
                debug!("No {} found, using defaults", CONFIG_FILE_NAME);
                Self::default()
            }
        };
        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Loading configuration from {:?}", path);
        let content = fs::read_to_string(path).map_err(DeckError::FileReadError)?;
        let mut config = Self::from_toml_str(&content)?;
        config.base_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(config)
    }

    /// Parse a configuration document. Unknown keys are ignored.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content)?;
        for key in table.keys() {
            let known = Self::RECOGNIZED_KEYS.contains(&key.as_str())
                || Self::KEY_ALIASES.contains(&key.as_str());
            if !known {
                debug!("Ignoring unknown configuration key '{}'", key);
            }
        }
        let config: DeckConfig = toml::Value::Table(table).try_into()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("BROWSER_PATH").filter(|p| !p.is_empty()) {
            self.browser_path = Some(path);
        }
        if let Some(html) = lookup("DECK_HTML") {
            self.html = html.to_lowercase() != "false";
        }
        if let Some(allow) = lookup("DECK_ALLOW_LOCAL_FILES") {
            self.allow_local_files = allow.to_lowercase() != "false";
        }
        if let Some(mode) = lookup("DECK_RESOURCES") {
            match IncludeMode::from_str(&mode, true) {
                Ok(mode) => self.resources = mode,
                Err(e) => warn!("Ignoring DECK_RESOURCES: {}", e),
            }
        }
        if let Some(timeout) = lookup("DECK_TIMEOUT_MS").and_then(|s| s.parse::<u64>().ok()) {
            self.timeout_ms = timeout;
        }
        if let Some(theme) = lookup("DECK_THEME").filter(|t| !t.is_empty()) {
            self.theme = Some(PathBuf::from(theme));
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            html: self.html,
            math: self.math.engine(),
            breaks: self.breaks,
        }
    }

    /// The engine described by `engine` and `plugins`
    pub fn engine(&self) -> Result<Engine> {
        self.engine_with(&DeclarativeFactory {
            preset: self.engine,
            plugins: self.plugins.clone(),
        })
    }

    /// The engine produced by a caller-supplied factory
    pub fn engine_with(&self, factory: &dyn EngineFactory) -> Result<Engine> {
        let engine = factory.create(self.engine_options())?;
        info!("Engine ready with plugins: {}", engine.plugins().join(", "));
        Ok(engine)
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn load_theme(&self) -> Result<Theme> {
        match &self.theme {
            Some(path) => Theme::from_file(&self.resolve_path(path)),
            None => Ok(Theme::default()),
        }
    }

    fn resources(&self, paths: &[String]) -> Vec<ResourceFile> {
        paths
            .iter()
            .map(|path| {
                let resource = ResourceFile::new(path);
                if resource.is_remote {
                    resource
                } else {
                    ResourceFile::new(&self.resolve_path(Path::new(path)).to_string_lossy())
                }
            })
            .collect()
    }

    pub fn css_resources(&self) -> Vec<ResourceFile> {
        self.resources(&self.css)
    }

    pub fn js_resources(&self) -> Vec<ResourceFile> {
        self.resources(&self.js)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| DeckError::ConfigError(e.to_string()))
    }
}
