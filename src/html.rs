// ABOUTME: HTML generation module for the deck-slides application
// ABOUTME: Renders markdown through the configured engine into a themed slide document

use crate::config::DeckConfig;
use crate::engine::{Asset, Engine, RenderedDeck};
use crate::errors::{DeckError, Result};
use crate::resources::{IncludeMode, ResourceFile, ResourceKind};
use crate::theme::Theme;
use crate::utils::{self, escape_html};
use log::{info, warn};
use std::fs;
use std::path::Path;

/// Layout every deck gets before the theme is applied
pub const BASE_CSS: &str = r#"html, body { margin: 0; padding: 0; }
body { background: #111; }
section { box-sizing: border-box; width: 1280px; height: 720px; margin: 0 auto 24px; padding: 64px; overflow: hidden; position: relative; }
.alert { border-left: 4px solid; border-radius: 4px; margin: 16px 0; padding: 8px 16px; }
.alert-title { font-weight: 700; margin-bottom: 8px; }
.alert-info { border-color: #2196f3; background: rgba(33, 150, 243, .12); }
.alert-tip { border-color: #4caf50; background: rgba(76, 175, 80, .12); }
.alert-warning { border-color: #ff9800; background: rgba(255, 152, 0, .12); }
.alert-danger { border-color: #f44336; background: rgba(244, 67, 54, .12); }
.center-content { display: flex; flex-direction: column; align-items: center; justify-content: center; height: 100%; text-align: center; }
@media print {
  body { background: none; }
  section { width: 100vw; height: 100vh; margin: 0; break-after: page; }
}"#;

/// Arrow-key and space navigation between slides
pub const NAVIGATION_JS: &str = r#"(function () {
  var slides = document.querySelectorAll('body > section');
  var current = 0;
  function show(idx) {
    current = Math.max(0, Math.min(slides.length - 1, idx));
    if (slides.length) slides[current].scrollIntoView({ block: 'center' });
  }
  document.addEventListener('keydown', function (e) {
    if (e.key === 'ArrowRight' || e.key === 'PageDown' || e.key === ' ') show(current + 1);
    if (e.key === 'ArrowLeft' || e.key === 'PageUp') show(current - 1);
  });
})();"#;

/// Generate a slide document from a markdown file with the configured engine
pub fn generate_html(markdown_path: &Path, config: &DeckConfig) -> Result<String> {
    let engine = config.engine()?;
    generate_html_with_engine(markdown_path, config, &engine, None)
}

/// Generate a slide document with a given engine, optionally appending a script
pub fn generate_html_with_engine(
    markdown_path: &Path,
    config: &DeckConfig,
    engine: &Engine,
    extra_script: Option<&str>,
) -> Result<String> {
    info!("Generating HTML from markdown: {:?}", markdown_path);
    utils::validate_file_exists(markdown_path)?;

    let markdown = fs::read_to_string(markdown_path).map_err(DeckError::FileReadError)?;
    let deck = engine.render(&markdown);
    let theme = config.load_theme()?;

    Ok(build_document(&deck, &theme, config, extra_script))
}

fn push_tag(html_doc: &mut String, resource: &ResourceFile, kind: ResourceKind, mode: IncludeMode) {
    match resource.tag(kind, mode) {
        Ok(tag) => {
            html_doc.push_str(&tag);
            html_doc.push('\n');
        }
        Err(e) => {
            // Keep going with the other resources
            warn!("Failed to include resource {}: {}", resource.path, e);
        }
    }
}

/// Assemble the full HTML document for a rendered deck
pub fn build_document(
    deck: &RenderedDeck,
    theme: &Theme,
    config: &DeckConfig,
    extra_script: Option<&str>,
) -> String {
    let title = deck.title.as_deref().unwrap_or("Presentation");

    let mut html_doc = String::from("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html_doc.push_str("<meta charset=\"UTF-8\">\n");
    html_doc.push_str(
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html_doc.push_str(&format!("<title>{}</title>\n", escape_html(title)));
    html_doc.push_str(&format!("<style>\n{}\n</style>\n", BASE_CSS));
    html_doc.push_str(&format!("<style>\n{}</style>\n", theme.to_css()));

    for asset in &deck.assets {
        if let Asset::Stylesheet(url) = asset {
            push_tag(&mut html_doc, &ResourceFile::new(url), ResourceKind::Stylesheet, config.resources);
        }
    }
    for css in config.css_resources() {
        push_tag(&mut html_doc, &css, ResourceKind::Stylesheet, config.resources);
    }

    html_doc.push_str("</head>\n<body>\n");

    for slide in &deck.slides {
        html_doc.push_str(&format!(
            "<section id=\"{}\" data-slide=\"{}\">\n{}\n</section>\n",
            slide.number, slide.number, slide.html
        ));
    }

    for asset in &deck.assets {
        match asset {
            Asset::Script(url) => {
                push_tag(&mut html_doc, &ResourceFile::new(url), ResourceKind::Script, config.resources)
            }
            Asset::InlineScript(code) => {
                html_doc.push_str(&format!("<script>\n{}\n</script>\n", code));
            }
            Asset::Stylesheet(_) => {}
        }
    }
    html_doc.push_str(&format!("<script>\n{}\n</script>\n", NAVIGATION_JS));
    for js in config.js_resources() {
        push_tag(&mut html_doc, &js, ResourceKind::Script, config.resources);
    }

    if let Some(script) = extra_script {
        html_doc.push_str(&format!("<script>\n{}\n</script>\n", script));
    }

    html_doc.push_str("</body>\n</html>\n");
    html_doc
}

/// Write HTML content to a file, creating parent directories
pub fn write_html_to_file(html_content: &str, output_path: &Path) -> Result<()> {
    info!("Writing HTML to file: {:?}", output_path);
    utils::ensure_parent_directory_exists(output_path)?;
    fs::write(output_path, html_content).map_err(DeckError::FileReadError)?;
    Ok(())
}
