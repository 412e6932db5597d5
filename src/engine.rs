// ABOUTME: Engine module for the deck-slides application
// ABOUTME: Assembles a comrak-backed slide engine and runs the plugin pipeline

use crate::errors::Result;
use crate::plugins::container::{self, ContainerRenderer, ContainerRule};
use crate::plugins::inline::{self, InlineDelimiter};
use crate::plugins::markers::{Markers, SLIDE_BREAK};
use crate::plugins::{attrs, Plugin};
use comrak::{markdown_to_html, Options};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Math typesetting backend loaded into rendered decks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MathEngine {
    Katex,
    Mathjax,
}

/// Capabilities requested from the engine. Immutable once handed to a factory.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Pass author-written raw HTML through to the output
    pub html: bool,
    /// Math support (`$inline$` and `$$display$$`), `None` to disable
    pub math: Option<MathEngine>,
    /// Render soft line breaks as `<br />`
    pub breaks: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            html: true,
            math: Some(MathEngine::Katex),
            breaks: false,
        }
    }
}

/// Document-level asset a plugin needs in the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    Stylesheet(String),
    Script(String),
    InlineScript(String),
}

/// Transforms rendered HTML after markdown conversion
pub trait PostProcessor: Send + Sync {
    fn process(&self, html: &str) -> String;
}

impl<F> PostProcessor for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn process(&self, html: &str) -> String {
        self(html)
    }
}

/// Extension points plugins register into.
///
/// Registrations keyed by a syntax token (container name, inline marker,
/// post-processor name) replace an earlier registration for the same token
/// in place, so order is kept and the later plugin wins.
#[derive(Default)]
pub struct ExtensionRegistry {
    containers: Vec<ContainerRule>,
    delimiters: Vec<InlineDelimiter>,
    block_attributes: bool,
    post_processors: Vec<(String, Box<dyn PostProcessor>)>,
    assets: Vec<Asset>,
}

impl ExtensionRegistry {
    pub fn add_container(&mut self, name: &str, renderer: Arc<dyn ContainerRenderer>) {
        let rule = ContainerRule {
            name: name.to_string(),
            renderer,
        };
        match self.containers.iter_mut().find(|r| r.name == name) {
            Some(existing) => {
                debug!("Overriding container renderer for '{}'", name);
                *existing = rule;
            }
            None => self.containers.push(rule),
        }
    }

    pub fn add_delimiter(&mut self, delimiter: InlineDelimiter) {
        match self
            .delimiters
            .iter_mut()
            .find(|d| d.marker == delimiter.marker)
        {
            Some(existing) => {
                debug!("Overriding inline delimiter '{}'", delimiter.marker);
                *existing = delimiter;
            }
            None => self.delimiters.push(delimiter),
        }
    }

    pub fn enable_block_attributes(&mut self) {
        self.block_attributes = true;
    }

    pub fn add_post_processor(&mut self, name: &str, processor: Box<dyn PostProcessor>) {
        match self.post_processors.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => {
                debug!("Overriding post-processor '{}'", name);
                existing.1 = processor;
            }
            None => self.post_processors.push((name.to_string(), processor)),
        }
    }

    pub fn add_asset(&mut self, asset: Asset) {
        if !self.assets.contains(&asset) {
            self.assets.push(asset);
        }
    }

    pub fn container_names(&self) -> Vec<&str> {
        self.containers.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn delimiter_markers(&self) -> Vec<&str> {
        self.delimiters.iter().map(|d| d.marker.as_str()).collect()
    }

    pub fn post_processor_names(&self) -> Vec<&str> {
        self.post_processors.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn block_attributes(&self) -> bool {
        self.block_attributes
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }
}

/// A single rendered slide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    pub number: usize,
    pub html: String,
}

/// Output of [`Engine::render`]
#[derive(Debug, Clone)]
pub struct RenderedDeck {
    pub title: Option<String>,
    pub slides: Vec<Slide>,
    pub assets: Vec<Asset>,
}

/// Markdown-to-slides engine with its registered extensions
pub struct Engine {
    options: EngineOptions,
    registry: ExtensionRegistry,
    plugins: Vec<String>,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            registry: ExtensionRegistry::default(),
            plugins: Vec::new(),
        }
    }

    /// Register a plugin against this engine. Chainable.
    pub fn use_plugin(mut self, plugin: impl Plugin) -> Result<Self> {
        debug!("Registering plugin '{}'", plugin.name());
        plugin.register(&mut self.registry)?;
        self.plugins.push(plugin.name().to_string());
        Ok(self)
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Names of registered plugins in registration order
    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }

    fn comrak_options(&self) -> Options {
        let mut options = Options::default();
        options.extension.strikethrough = true;
        options.extension.table = true;
        options.extension.autolink = true;
        options.extension.tasklist = true;
        options.extension.footnotes = true;
        options.extension.math_dollars = self.options.math.is_some();
        options.render.unsafe_ = self.options.html;
        options.render.hardbreaks = self.options.breaks;
        options
    }

    /// Render markdown into slides
    pub fn render(&self, markdown: &str) -> RenderedDeck {
        let (front_matter, body) = split_front_matter(markdown);

        let mut markers = Markers::new();
        let mut source = container::expand(body, &self.registry.containers, &mut markers);
        source = inline::expand(&source, &self.registry.delimiters, &mut markers);
        if self.registry.block_attributes {
            source = attrs::extract(&source, &mut markers);
        }

        let mut html = markdown_to_html(&source, &self.comrak_options());
        html = markers.restore(&html);
        for (name, processor) in &self.registry.post_processors {
            debug!("Running post-processor '{}'", name);
            html = processor.process(&html);
        }

        let slides: Vec<Slide> = split_slides(&html)
            .into_iter()
            .enumerate()
            .map(|(idx, html)| Slide {
                number: idx + 1,
                html,
            })
            .collect();
        info!("Rendered {} slides", slides.len());

        let mut assets = self.registry.assets.clone();
        if let Some(math) = self.options.math {
            assets.extend(math_assets(math));
        }

        RenderedDeck {
            title: front_matter.title,
            slides,
            assets,
        }
    }
}

/// Builds a configured engine from base options
pub trait EngineFactory {
    fn create(&self, options: EngineOptions) -> Result<Engine>;
}

impl<F> EngineFactory for F
where
    F: Fn(EngineOptions) -> Result<Engine>,
{
    fn create(&self, options: EngineOptions) -> Result<Engine> {
        self(options)
    }
}

#[derive(Debug, Default, PartialEq)]
struct FrontMatter {
    title: Option<String>,
}

/// Split a leading `---` YAML block or `% Title` header off the document
fn split_front_matter(content: &str) -> (FrontMatter, &str) {
    let mut front = FrontMatter::default();

    if let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    {
        let mut offset = 0;
        for line in rest.split_inclusive('\n') {
            offset += line.len();
            let line = line.trim_end();
            if line == "---" {
                return (front, &rest[offset..]);
            }
            if let Some((key, value)) = line.split_once(':') {
                if key.trim() == "title" {
                    let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                    front.title = Some(value.to_string());
                }
            }
        }
        // No closing delimiter: not front matter, the leading rule is a slide break
        return (FrontMatter::default(), content);
    }

    if let Some(rest) = content.strip_prefix("% ") {
        let (title, body) = rest.split_once('\n').unwrap_or((rest, ""));
        front.title = Some(title.trim().to_string());
        return (front, body.trim_start_matches(['\r', '\n']));
    }

    (front, content)
}

/// Split rendered HTML into slides at the top-level breaks placed during expansion
fn split_slides(html: &str) -> Vec<String> {
    html.split(SLIDE_BREAK)
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

const KATEX_VERSION: &str = "0.16.9";

fn math_assets(math: MathEngine) -> Vec<Asset> {
    match math {
        MathEngine::Katex => vec![
            Asset::Stylesheet(format!(
                "https://cdn.jsdelivr.net/npm/katex@{}/dist/katex.min.css",
                KATEX_VERSION
            )),
            Asset::Script(format!(
                "https://cdn.jsdelivr.net/npm/katex@{}/dist/katex.min.js",
                KATEX_VERSION
            )),
            Asset::InlineScript(
                r#"document.querySelectorAll('[data-math-style]').forEach(function (el) {
  katex.render(el.textContent, el, { displayMode: el.dataset.mathStyle === 'display', throwOnError: false });
});"#
                    .to_string(),
            ),
        ],
        MathEngine::Mathjax => vec![
            Asset::InlineScript(
                r#"document.querySelectorAll('[data-math-style]').forEach(function (el) {
  var display = el.dataset.mathStyle === 'display';
  el.textContent = (display ? '\\[' : '\\(') + el.textContent + (display ? '\\]' : '\\)');
});"#
                    .to_string(),
            ),
            Asset::Script(
                "https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-chtml.js".to_string(),
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_matter_title_is_extracted() {
        let (front, body) = split_front_matter("---\ntitle: \"Quarterly\"\nmarp: true\n---\n# One\n");
        assert_eq!(front.title.as_deref(), Some("Quarterly"));
        assert_eq!(body, "# One\n");
    }

    #[test]
    fn percent_header_is_extracted() {
        let (front, body) = split_front_matter("% My Talk\n\n# One");
        assert_eq!(front.title.as_deref(), Some("My Talk"));
        assert_eq!(body, "# One");
    }

    #[test]
    fn unterminated_front_matter_is_left_alone() {
        let source = "---\n# One\n";
        let (front, body) = split_front_matter(source);
        assert_eq!(front, FrontMatter::default());
        assert_eq!(body, source);
    }

    #[test]
    fn empty_slides_are_dropped() {
        let html = format!("<h1>A</h1>\n{0}\n{0}\n<h1>B</h1>\n", SLIDE_BREAK);
        let slides = split_slides(&html);
        assert_eq!(slides, vec!["<h1>A</h1>", "<h1>B</h1>"]);
    }
}
