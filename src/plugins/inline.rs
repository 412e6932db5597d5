// ABOUTME: Inline delimiter plugins for the deck-slides application
// ABOUTME: Turns `==marked==` and `++inserted++` spans into <mark> and <ins>

use super::fence::{FenceTracker, IndentedCode};
use super::markers::Markers;
use super::Plugin;
use crate::engine::ExtensionRegistry;
use crate::errors::Result;

/// A symmetric inline delimiter wrapping its content in an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineDelimiter {
    pub marker: String,
    pub tag: String,
}

impl InlineDelimiter {
    pub fn new(marker: &str, tag: &str) -> Self {
        Self {
            marker: marker.to_string(),
            tag: tag.to_string(),
        }
    }
}

/// `==text==` becomes `<mark>text</mark>`
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkPlugin;

impl Plugin for MarkPlugin {
    fn name(&self) -> &str {
        "mark"
    }

    fn register(&self, registry: &mut ExtensionRegistry) -> Result<()> {
        registry.add_delimiter(InlineDelimiter::new("==", "mark"));
        Ok(())
    }
}

/// `++text++` becomes `<ins>text</ins>`
#[derive(Debug, Clone, Copy, Default)]
pub struct InsPlugin;

impl Plugin for InsPlugin {
    fn name(&self) -> &str {
        "ins"
    }

    fn register(&self, registry: &mut ExtensionRegistry) -> Result<()> {
        registry.add_delimiter(InlineDelimiter::new("++", "ins"));
        Ok(())
    }
}

/// Replace delimited spans with inline placeholders.
///
/// Spans do not cross line boundaries. Fenced code, indented code and inline
/// code spans are copied untouched.
pub(crate) fn expand(source: &str, delimiters: &[InlineDelimiter], markers: &mut Markers) -> String {
    if delimiters.is_empty() {
        return source.to_string();
    }

    let mut fence = FenceTracker::new();
    let mut code = IndentedCode::new();
    let mut out = String::with_capacity(source.len());

    for line in source.lines() {
        if fence.update(line) || fence.in_fence() {
            code.boundary();
            out.push_str(line);
        } else if code.update(line) {
            out.push_str(line);
        } else {
            let mut processed = line.to_string();
            for delimiter in delimiters {
                processed = expand_line(&processed, delimiter, markers);
            }
            out.push_str(&processed);
        }
        out.push('\n');
    }

    out
}

fn expand_line(line: &str, delimiter: &InlineDelimiter, markers: &mut Markers) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while !rest.is_empty() {
        let next_tick = rest.find('`');
        let next_marker = find_opener(rest, &delimiter.marker);

        match (next_tick, next_marker) {
            // A code span starts first: copy it verbatim
            (Some(tick), marker) if marker.map_or(true, |m| tick < m) => {
                let span = code_span_len(&rest[tick..]);
                out.push_str(&rest[..tick + span]);
                rest = &rest[tick + span..];
            }
            (_, Some(open)) => {
                let body_start = open + delimiter.marker.len();
                match find_closer(&rest[body_start..], &delimiter.marker) {
                    Some(close) => {
                        out.push_str(&rest[..open]);
                        out.push_str(&markers.inline(format!("<{}>", delimiter.tag)));
                        out.push_str(&rest[body_start..body_start + close]);
                        out.push_str(&markers.inline(format!("</{}>", delimiter.tag)));
                        rest = &rest[body_start + close + delimiter.marker.len()..];
                    }
                    None => {
                        out.push_str(&rest[..body_start]);
                        rest = &rest[body_start..];
                    }
                }
            }
            _ => {
                out.push_str(rest);
                break;
            }
        }
    }

    out
}

/// Length of the code span at the start of `text`, or of the unmatched backtick run
fn code_span_len(text: &str) -> usize {
    let run = text.chars().take_while(|&c| c == '`').count();
    let ticks = &text[..run];
    let mut search = run;
    while let Some(found) = text[search..].find(ticks) {
        let start = search + found;
        let len = text[start..].chars().take_while(|&c| c == '`').count();
        if len == run {
            return start + run;
        }
        search = start + len;
    }
    run
}

fn marker_char(marker: &str) -> char {
    marker.chars().next().unwrap_or_default()
}

/// Position of the next marker that can open a span
fn find_opener(text: &str, marker: &str) -> Option<usize> {
    let ch = marker_char(marker);
    let mut search = 0;
    while let Some(found) = text[search..].find(marker) {
        let pos = search + found;
        let escaped = text[..pos].ends_with('\\');
        let prev = text[..pos].chars().next_back();
        let next = text[pos + marker.len()..].chars().next();
        let opens = !escaped
            && prev != Some(ch)
            && next.is_some_and(|c| !c.is_whitespace() && c != ch);
        if opens {
            return Some(pos);
        }
        search = pos + marker.len();
    }
    None
}

/// Position of the marker closing a span, relative to the span body
fn find_closer(body: &str, marker: &str) -> Option<usize> {
    let ch = marker_char(marker);
    let mut search = 0;
    while let Some(found) = body[search..].find(marker) {
        let pos = search + found;
        let prev = body[..pos].chars().next_back();
        let next = body[pos + marker.len()..].chars().next();
        let closes = prev.is_some_and(|c| !c.is_whitespace() && c != '\\')
            && next != Some(ch)
            && !body[..pos].contains('`');
        if closes {
            return Some(pos);
        }
        search = pos + marker.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(source: &str) -> String {
        let mut markers = Markers::new();
        let delimiters = [
            InlineDelimiter::new("==", "mark"),
            InlineDelimiter::new("++", "ins"),
        ];
        let expanded = expand(source, &delimiters, &mut markers);
        markers.restore(&expanded)
    }

    #[test]
    fn marks_and_inserts() {
        assert_eq!(
            render("a ==hot== and ++new++ b"),
            "a <mark>hot</mark> and <ins>new</ins> b\n"
        );
    }

    #[test]
    fn leaves_code_spans_alone() {
        assert_eq!(render("`a ==b== c` ==d=="), "`a ==b== c` <mark>d</mark>\n");
    }

    #[test]
    fn ignores_language_names_and_spaced_markers() {
        assert_eq!(render("C++ and C++ rock"), "C++ and C++ rock\n");
        assert_eq!(render("a == b == c"), "a == b == c\n");
    }

    #[test]
    fn leaves_fenced_code_alone() {
        assert_eq!(render("```\nx ==y==\n```"), "```\nx ==y==\n```\n");
    }

    #[test]
    fn leaves_indented_code_alone() {
        assert_eq!(render("Text\n\n    x ==y==\n"), "Text\n\n    x ==y==\n");
        assert_eq!(
            render("- item\n\n    ==nested=="),
            "- item\n\n    <mark>nested</mark>\n"
        );
    }

    #[test]
    fn unterminated_span_is_literal() {
        assert_eq!(render("==open only"), "==open only\n");
    }
}
