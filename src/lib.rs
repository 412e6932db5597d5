// ABOUTME: Library module for the deck-slides program.
// ABOUTME: Contains the pluggable markdown engine, themes, deck assembly, export and dev server.

// Reexport modules
pub mod config;
pub mod engine;
pub mod errors;
pub mod export;
pub mod html;
pub mod plugins;
pub mod resources;
pub mod theme;
pub mod utils;
pub mod watch;

// Reexport common types and functions
pub use config::{DeckConfig, PdfFormat, PdfOptions};
pub use engine::{Engine, EngineFactory, EngineOptions, ExtensionRegistry, MathEngine, RenderedDeck, Slide};
pub use errors::{DeckError, Result};
pub use export::{BrowserOptions, ImageFormat, ImageOptions, export_images, export_pdf};
pub use html::{generate_html, generate_html_with_engine, write_html_to_file};
pub use plugins::{
    ContainerPlugin, ContainerRenderer, ContainerToken, EnginePreset, Plugin, PluginSpec,
    plugin_from_spec,
};
pub use resources::{IncludeMode, ResourceFile};
pub use theme::Theme;
pub use watch::{ServeConfig, serve};
