// ABOUTME: Plugin module for the deck-slides application
// ABOUTME: Defines the plugin seam, declarative plugin specs and the stock presets

pub mod attrs;
pub mod container;
pub mod fence;
pub mod highlight;
pub mod inline;
pub mod markers;

use crate::engine::{Engine, EngineFactory, EngineOptions, ExtensionRegistry};
use crate::errors::{DeckError, Result};
use serde::{Deserialize, Serialize};

pub use attrs::AttrsPlugin;
pub use container::{
    AlertRenderer, CenterRenderer, ContainerPlugin, ContainerRenderer, ContainerToken,
    DefaultRenderer, Nesting,
};
pub use highlight::{HighlightOptions, HighlightPlugin};
pub use inline::{InsPlugin, MarkPlugin};

/// Container names that get the alert renderer by default
pub const ALERT_DIRECTIVES: [&str; 4] = ["info", "tip", "warning", "danger"];

/// Every container name the presets register
pub const PRESET_DIRECTIVES: [&str; 5] = ["info", "tip", "warning", "danger", "center"];

/// An extension applied to an engine's registry
pub trait Plugin {
    fn name(&self) -> &str;

    fn register(&self, registry: &mut ExtensionRegistry) -> Result<()>;
}

impl<P: Plugin + ?Sized> Plugin for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn register(&self, registry: &mut ExtensionRegistry) -> Result<()> {
        (**self).register(registry)
    }
}

/// A plugin named in configuration, with its options:
///
/// ```toml
/// [[plugins]]
/// use = "container"
/// name = "note"
/// render = "alert"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    #[serde(rename = "use")]
    pub plugin: String,
    #[serde(flatten)]
    pub options: toml::Table,
}

impl PluginSpec {
    pub fn new(plugin: &str) -> Self {
        Self {
            plugin: plugin.to_string(),
            options: toml::Table::new(),
        }
    }

    pub fn with_option(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    fn string_option(&self, key: &str) -> Result<Option<&str>> {
        match self.options.get(key) {
            None => Ok(None),
            Some(toml::Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(DeckError::plugin(
                &self.plugin,
                format!("option '{}' must be a string, got {}", key, other.type_str()),
            )),
        }
    }

    fn bool_option(&self, key: &str, default: bool) -> Result<bool> {
        match self.options.get(key) {
            None => Ok(default),
            Some(toml::Value::Boolean(b)) => Ok(*b),
            Some(other) => Err(DeckError::plugin(
                &self.plugin,
                format!("option '{}' must be a boolean, got {}", key, other.type_str()),
            )),
        }
    }
}

/// Instantiate the plugin a spec names
pub fn plugin_from_spec(spec: &PluginSpec) -> Result<Box<dyn Plugin>> {
    match spec.plugin.as_str() {
        "container" => {
            let name = spec.string_option("name")?.ok_or_else(|| {
                DeckError::plugin("container", "missing required option 'name'")
            })?;
            let plugin = match spec.string_option("render")? {
                Some(style) => ContainerPlugin::with_style(name, style)?,
                None => ContainerPlugin::for_name(name),
            };
            Ok(Box::new(plugin))
        }
        "mark" => Ok(Box::new(MarkPlugin)),
        "ins" => Ok(Box::new(InsPlugin)),
        "attrs" => Ok(Box::new(AttrsPlugin)),
        "highlight" => {
            let defaults = HighlightOptions::default();
            Ok(Box::new(HighlightPlugin::new(HighlightOptions {
                inline: spec.bool_option("inline", defaults.inline)?,
                auto: spec.bool_option("auto", defaults.auto)?,
                code: spec.bool_option("code", defaults.code)?,
            })))
        }
        other => Err(DeckError::plugin(other, "unknown plugin")),
    }
}

/// Base plugin set an engine starts from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnginePreset {
    /// Alert-style containers, center, mark, ins, attrs and highlight
    #[default]
    Alerts,
    /// Highlight, mark, ins, attrs and plain class-wrapping containers
    Basic,
    /// No plugins
    Plain,
}

impl EnginePreset {
    pub fn plugins(self) -> Vec<Box<dyn Plugin>> {
        match self {
            EnginePreset::Alerts => alerts(),
            EnginePreset::Basic => basic(),
            EnginePreset::Plain => Vec::new(),
        }
    }
}

/// Alert containers first, then the inline and highlight extensions
pub fn alerts() -> Vec<Box<dyn Plugin>> {
    let mut plugins: Vec<Box<dyn Plugin>> = PRESET_DIRECTIVES
        .iter()
        .map(|name| Box::new(ContainerPlugin::for_name(name)) as Box<dyn Plugin>)
        .collect();
    plugins.push(Box::new(MarkPlugin));
    plugins.push(Box::new(InsPlugin));
    plugins.push(Box::new(AttrsPlugin));
    plugins.push(Box::new(HighlightPlugin::new(HighlightOptions {
        inline: false,
        auto: true,
        code: true,
    })));
    plugins
}

/// Inline and highlight extensions, then containers with the stock renderer
pub fn basic() -> Vec<Box<dyn Plugin>> {
    let mut plugins: Vec<Box<dyn Plugin>> = vec![
        Box::new(HighlightPlugin::default()),
        Box::new(MarkPlugin),
        Box::new(InsPlugin),
        Box::new(AttrsPlugin),
    ];
    for name in PRESET_DIRECTIVES {
        plugins.push(Box::new(ContainerPlugin::new(name, DefaultRenderer)));
    }
    plugins
}

/// Factory that applies a preset followed by configured plugin specs
pub struct DeclarativeFactory {
    pub preset: EnginePreset,
    pub plugins: Vec<PluginSpec>,
}

impl EngineFactory for DeclarativeFactory {
    fn create(&self, options: EngineOptions) -> Result<Engine> {
        let mut engine = Engine::new(options);
        for plugin in self.preset.plugins() {
            engine = engine.use_plugin(plugin)?;
        }
        for spec in &self.plugins {
            engine = engine.use_plugin(plugin_from_spec(spec)?)?;
        }
        Ok(engine)
    }
}
