// ABOUTME: Container directive plugin for the deck-slides application
// ABOUTME: Expands `::: name title` ... `:::` blocks through per-name renderers

use super::fence::{indent_width, indentation, starts_list_item, FenceTracker, IndentedCode};
use super::markers::Markers;
use super::{Plugin, ALERT_DIRECTIVES};
use crate::engine::ExtensionRegistry;
use crate::errors::{DeckError, Result};
use crate::utils::capitalize;
use log::warn;
use std::sync::Arc;

/// Whether a token opens or closes a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
    Open,
    Close,
}

/// A container boundary as seen by a renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerToken<'a> {
    pub nesting: Nesting,
    /// Directive name the block was opened with
    pub name: &'a str,
    /// Everything after the colons on the opening line, e.g. `warning Careful`
    pub info: &'a str,
    /// 1-based source line of the boundary
    pub line: usize,
    /// Number of enclosing containers
    pub depth: usize,
}

impl<'a> ContainerToken<'a> {
    /// Text following the directive keyword, trimmed
    pub fn title(&self) -> &'a str {
        self.info
            .trim()
            .strip_prefix(self.name)
            .unwrap_or_default()
            .trim()
    }
}

/// Renders the markup for one side of a container
pub trait ContainerRenderer: Send + Sync {
    fn render(&self, token: &ContainerToken) -> String;
}

impl<F> ContainerRenderer for F
where
    F: Fn(&ContainerToken) -> String + Send + Sync,
{
    fn render(&self, token: &ContainerToken) -> String {
        self(token)
    }
}

/// `<div class="alert alert-NAME">` with a title row
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertRenderer;

impl ContainerRenderer for AlertRenderer {
    fn render(&self, token: &ContainerToken) -> String {
        match token.nesting {
            Nesting::Open => {
                let title = match token.title() {
                    "" => capitalize(token.name),
                    text => text.to_string(),
                };
                format!(
                    "<div class=\"alert alert-{}\">\n<div class=\"alert-title\">{}</div>\n",
                    token.name, title
                )
            }
            Nesting::Close => "</div>\n".to_string(),
        }
    }
}

/// `<div class="center-content">`
#[derive(Debug, Clone, Copy, Default)]
pub struct CenterRenderer;

impl ContainerRenderer for CenterRenderer {
    fn render(&self, token: &ContainerToken) -> String {
        match token.nesting {
            Nesting::Open => "<div class=\"center-content\">\n".to_string(),
            Nesting::Close => "</div>\n".to_string(),
        }
    }
}

/// `<div class="NAME">`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRenderer;

impl ContainerRenderer for DefaultRenderer {
    fn render(&self, token: &ContainerToken) -> String {
        match token.nesting {
            Nesting::Open => format!("<div class=\"{}\">\n", token.name),
            Nesting::Close => "</div>\n".to_string(),
        }
    }
}

/// A registered container: directive name and its renderer
pub struct ContainerRule {
    pub name: String,
    pub renderer: Arc<dyn ContainerRenderer>,
}

/// Registers one container directive
pub struct ContainerPlugin {
    name: String,
    renderer: Arc<dyn ContainerRenderer>,
}

impl ContainerPlugin {
    pub fn new(name: &str, renderer: impl ContainerRenderer + 'static) -> Self {
        Self {
            name: name.to_string(),
            renderer: Arc::new(renderer),
        }
    }

    /// Alert renderer for the alert names, center for `center`, stock otherwise
    pub fn for_name(name: &str) -> Self {
        if ALERT_DIRECTIVES.contains(&name) {
            Self::new(name, AlertRenderer)
        } else if name == "center" {
            Self::new(name, CenterRenderer)
        } else {
            Self::new(name, DefaultRenderer)
        }
    }

    /// Renderer picked by its configuration name
    pub fn with_style(name: &str, style: &str) -> Result<Self> {
        match style {
            "alert" => Ok(Self::new(name, AlertRenderer)),
            "center" => Ok(Self::new(name, CenterRenderer)),
            "default" => Ok(Self::new(name, DefaultRenderer)),
            other => Err(DeckError::plugin(
                "container",
                format!("unknown renderer '{}' for '{}'", other, name),
            )),
        }
    }
}

impl Plugin for ContainerPlugin {
    fn name(&self) -> &str {
        "container"
    }

    fn register(&self, registry: &mut ExtensionRegistry) -> Result<()> {
        if !is_valid_name(&self.name) {
            return Err(DeckError::plugin(
                "container",
                format!("invalid directive name '{}'", self.name),
            ));
        }
        registry.add_container(&self.name, Arc::clone(&self.renderer));
        Ok(())
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

enum Marker<'a> {
    Open { colons: usize, name: &'a str, info: &'a str },
    Close { colons: usize },
}

fn parse_marker(line: &str) -> Option<Marker<'_>> {
    if indent_width(line) >= 4 {
        return None;
    }
    let trimmed = line.trim();
    let colons = trimmed.chars().take_while(|&c| c == ':').count();
    if colons < 3 {
        return None;
    }
    let info = trimmed[colons..].trim();
    if info.is_empty() {
        return Some(Marker::Close { colons });
    }
    let name = info.split_whitespace().next().unwrap_or_default();
    Some(Marker::Open { colons, name, info })
}

/// `---`, `***` or `___` (three or more, spaces allowed) starting in column 0
fn is_thematic_break(line: &str) -> Option<char> {
    let first = line.chars().next().filter(|c| matches!(c, '-' | '*' | '_'))?;
    let mut count = 0;
    for c in line.trim_end().chars() {
        if c == first {
            count += 1;
        } else if c != ' ' && c != '\t' {
            return None;
        }
    }
    (count >= 3).then_some(first)
}

/// Whether a `---` on the next line would underline this one as a heading
fn is_paragraph_text(line: &str) -> bool {
    let trimmed = line.trim_start();
    !(trimmed.is_empty()
        || indent_width(line) >= 4
        || trimmed.starts_with('#')
        || trimmed.starts_with('>')
        || trimmed.starts_with('|')
        || trimmed.starts_with('<')
        || starts_list_item(trimmed))
}

struct OpenContainer<'a> {
    rule: &'a ContainerRule,
    info: &'a str,
    colons: usize,
}

/// Expand container directives and slide breaks into block placeholders.
///
/// Unknown names and stray closers are left as written. Containers still
/// open at the end of the document are closed there, so every opening
/// wrapper gets exactly one closing wrapper. Only thematic breaks outside
/// every container, code block and list indentation separate slides; a
/// `---` directly under paragraph text stays a heading underline.
pub(crate) fn expand(source: &str, rules: &[ContainerRule], markers: &mut Markers) -> String {
    let mut fence = FenceTracker::new();
    let mut code = IndentedCode::new();
    let mut stack: Vec<OpenContainer> = Vec::new();
    let mut out = String::with_capacity(source.len());
    let mut last_line = 0;
    let mut after_text = false;

    for (idx, line) in source.lines().enumerate() {
        let line_num = idx + 1;
        last_line = line_num;

        if fence.update(line) || fence.in_fence() {
            code.boundary();
            after_text = false;
            out.push_str(line);
            out.push('\n');
            continue;
        }
        if code.update(line) {
            after_text = false;
            out.push_str(line);
            out.push('\n');
            continue;
        }

        if stack.is_empty() {
            if let Some(ch) = is_thematic_break(line) {
                if ch != '-' || !after_text {
                    push_block(&mut out, "", markers.slide_break());
                    code.boundary();
                    after_text = false;
                    continue;
                }
            }
        }

        match parse_marker(line) {
            Some(Marker::Open { colons, name, info }) => {
                if let Some(rule) = rules.iter().find(|r| r.name == name) {
                    let token = ContainerToken {
                        nesting: Nesting::Open,
                        name,
                        info,
                        line: line_num,
                        depth: stack.len(),
                    };
                    let token = markers.block(rule.renderer.render(&token));
                    push_block(&mut out, indentation(line), token);
                    stack.push(OpenContainer { rule, info, colons });
                    code.boundary();
                    after_text = false;
                    continue;
                }
            }
            Some(Marker::Close { colons }) => {
                if stack.last().is_some_and(|open| colons >= open.colons) {
                    if let Some(open) = stack.pop() {
                        let token = close(markers, &open, line_num, stack.len());
                        push_block(&mut out, indentation(line), token);
                    }
                    code.boundary();
                    after_text = false;
                    continue;
                }
            }
            None => {}
        }

        after_text = is_paragraph_text(line);
        out.push_str(line);
        out.push('\n');
    }

    while let Some(open) = stack.pop() {
        warn!(
            "Container '{}' opened without a closing marker; closing at end of document",
            open.rule.name
        );
        let token = close(markers, &open, last_line, stack.len());
        push_block(&mut out, "", token);
    }

    out
}

fn close(markers: &mut Markers, open: &OpenContainer, line: usize, depth: usize) -> String {
    let token = ContainerToken {
        nesting: Nesting::Close,
        name: &open.rule.name,
        info: open.info,
        line,
        depth,
    };
    markers.block(open.rule.renderer.render(&token))
}

/// Put a block token on its own line, keeping the marker's indentation so
/// containers inside list items stay in the item
fn push_block(out: &mut String, indent: &str, token: String) {
    out.push('\n');
    out.push_str(indent);
    out.push_str(&token);
    out.push_str("\n\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::markers::SLIDE_BREAK;

    fn rules(names: &[&str]) -> Vec<ContainerRule> {
        names
            .iter()
            .map(|name| ContainerRule {
                name: name.to_string(),
                renderer: Arc::new(DefaultRenderer),
            })
            .collect()
    }

    fn expand_and_restore(source: &str, names: &[&str]) -> String {
        let mut markers = Markers::new();
        let expanded = expand(source, &rules(names), &mut markers);
        // Stand in for comrak: wrap lone tokens the way a paragraph would be
        let wrapped: String = expanded
            .lines()
            .map(|l| {
                if l.starts_with('\u{E000}') {
                    format!("<p>{}</p>\n", l)
                } else {
                    format!("{}\n", l)
                }
            })
            .collect();
        markers.restore(&wrapped)
    }

    #[test]
    fn title_strips_directive_name() {
        let token = ContainerToken {
            nesting: Nesting::Open,
            name: "warning",
            info: " warning   Mind the gap ",
            line: 1,
            depth: 0,
        };
        assert_eq!(token.title(), "Mind the gap");
    }

    #[test]
    fn unknown_directive_passes_through() {
        let out = expand_and_restore("::: note\nbody\n:::\n", &["info"]);
        assert_eq!(out, "::: note\nbody\n:::\n");
    }

    #[test]
    fn nested_containers_close_innermost_first() {
        let out = expand_and_restore(":::: info\n::: tip\nx\n:::\n::::\n", &["info", "tip"]);
        let opens: Vec<_> = out.match_indices("<div class=").map(|(i, _)| i).collect();
        assert_eq!(opens.len(), 2);
        assert!(out.find("<div class=\"info\">") < out.find("<div class=\"tip\">"));
        assert_eq!(out.matches("</div>").count(), 2);
    }

    #[test]
    fn shorter_closer_does_not_close_longer_opener() {
        let out = expand_and_restore(":::: info\nx\n:::\ny\n::::\n", &["info"]);
        assert!(out.contains("\n:::\n"));
        assert_eq!(out.matches("</div>").count(), 1);
    }

    #[test]
    fn slide_breaks_only_at_top_level() {
        let mut markers = Markers::new();
        let source = "A\n\n---\n\n::: info\nB\n\n---\n\nC\n:::\n\n***\n\nD\n";
        let out = expand(source, &rules(&["info"]), &mut markers);

        assert_eq!(out.matches("\n---\n").count(), 1, "nested rule must stay: {:?}", out);
        assert_eq!(markers.restore(&out).matches(SLIDE_BREAK).count(), 2);
    }

    #[test]
    fn heading_underline_is_not_a_slide_break() {
        let mut markers = Markers::new();
        let out = expand("Title\n---\n\nBody\n", &[], &mut markers);
        assert_eq!(out, "Title\n---\n\nBody\n");
        assert!(markers.is_empty());
    }

    #[test]
    fn markers_in_indented_code_are_literal() {
        let source = "Example:\n\n    ::: info\n    inside\n    :::\n\n    ---\n";
        let mut markers = Markers::new();
        let out = expand(source, &rules(&["info"]), &mut markers);
        assert_eq!(out, source);
        assert!(markers.is_empty());
    }

    #[test]
    fn markers_in_list_items_keep_indentation() {
        let mut markers = Markers::new();
        let out = expand("- item\n\n  ::: info\n  body\n  :::\n", &rules(&["info"]), &mut markers);
        assert!(out.contains("\n  \u{E000}0\u{E001}\n"), "opener lost indentation: {:?}", out);
        assert!(out.contains("\n  \u{E000}1\u{E001}\n"), "closer lost indentation: {:?}", out);
        assert!(out.starts_with("- item\n"));
    }

    #[test]
    fn invalid_names_are_rejected() {
        let mut registry = ExtensionRegistry::default();
        let plugin = ContainerPlugin::new("bad name", DefaultRenderer);
        assert!(plugin.register(&mut registry).is_err());
    }
}
