// ABOUTME: Code highlighting plugin for the deck-slides application
// ABOUTME: Tags code elements for highlight.js and registers its assets

use super::Plugin;
use crate::engine::{Asset, ExtensionRegistry};
use crate::errors::Result;

const HIGHLIGHT_JS_VERSION: &str = "11.9.0";

/// Which code elements get the `hljs` class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightOptions {
    /// Inline `code` spans
    pub inline: bool,
    /// Fenced blocks without a language (highlight.js guesses one)
    pub auto: bool,
    /// Fenced blocks with a language
    pub code: bool,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            inline: false,
            auto: true,
            code: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HighlightPlugin {
    options: HighlightOptions,
}

impl HighlightPlugin {
    pub fn new(options: HighlightOptions) -> Self {
        Self { options }
    }
}

impl Plugin for HighlightPlugin {
    fn name(&self) -> &str {
        "highlight"
    }

    fn register(&self, registry: &mut ExtensionRegistry) -> Result<()> {
        let options = self.options;
        registry.add_post_processor(
            "highlight",
            Box::new(move |html: &str| tag_code(html, options)),
        );
        registry.add_asset(Asset::Stylesheet(format!(
            "https://cdnjs.cloudflare.com/ajax/libs/highlight.js/{}/styles/github-dark.min.css",
            HIGHLIGHT_JS_VERSION
        )));
        registry.add_asset(Asset::Script(format!(
            "https://cdnjs.cloudflare.com/ajax/libs/highlight.js/{}/highlight.min.js",
            HIGHLIGHT_JS_VERSION
        )));
        registry.add_asset(Asset::InlineScript(
            "document.querySelectorAll('code.hljs').forEach(function (el) { hljs.highlightElement(el); });"
                .to_string(),
        ));
        Ok(())
    }
}

/// Add the `hljs` class to the code elements the options select
pub fn tag_code(html: &str, options: HighlightOptions) -> String {
    let mut out = String::with_capacity(html.len() + 64);
    let mut rest = html;

    while let Some(pos) = rest.find("<code") {
        let (before, from_tag) = rest.split_at(pos);
        out.push_str(before);

        let Some(tag_end) = from_tag.find('>') else {
            out.push_str(from_tag);
            return out;
        };
        let tag = &from_tag[..=tag_end];
        let in_pre = out.ends_with("<pre>");

        let tagged = if tag == "<code>" {
            let wanted = if in_pre { options.auto } else { options.inline };
            wanted.then(|| "<code class=\"hljs\">".to_string())
        } else if in_pre && options.code {
            tag.strip_prefix("<code class=\"")
                .map(|rest| format!("<code class=\"hljs {}", rest))
        } else {
            None
        };

        out.push_str(tagged.as_deref().unwrap_or(tag));
        rest = &from_tag[tag_end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "<pre><code class=\"language-rust\">fn main() {}\n</code></pre>\n<pre><code>plain\n</code></pre>\n<p>use <code>x</code></p>\n";

    #[test]
    fn tags_fenced_blocks_by_default() {
        let html = tag_code(SAMPLE, HighlightOptions::default());
        assert!(html.contains("<pre><code class=\"hljs language-rust\">"));
        assert!(html.contains("<pre><code class=\"hljs\">plain"));
        assert!(html.contains("<p>use <code>x</code></p>"));
    }

    #[test]
    fn inline_and_auto_switches() {
        let options = HighlightOptions {
            inline: true,
            auto: false,
            code: false,
        };
        let html = tag_code(SAMPLE, options);
        assert!(html.contains("<pre><code class=\"language-rust\">"));
        assert!(html.contains("<pre><code>plain"));
        assert!(html.contains("<p>use <code class=\"hljs\">x</code></p>"));
    }
}
