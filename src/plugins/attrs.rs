// ABOUTME: Block attribute plugin for the deck-slides application
// ABOUTME: Applies trailing `{.class #id key=value}` lists to the enclosing element

use super::fence::{FenceTracker, IndentedCode};
use super::markers::{Attribute, Markers};
use super::Plugin;
use crate::engine::ExtensionRegistry;
use crate::errors::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct AttrsPlugin;

impl Plugin for AttrsPlugin {
    fn name(&self) -> &str {
        "attrs"
    }

    fn register(&self, registry: &mut ExtensionRegistry) -> Result<()> {
        registry.enable_block_attributes();
        Ok(())
    }
}

/// Parse the inside of an attribute list. `None` if any item is malformed.
pub fn parse_attributes(input: &str) -> Option<Vec<Attribute>> {
    let mut attributes = Vec::new();
    let mut chars = input.trim().chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(first) = chars.next() else {
            break;
        };

        let mut word = String::new();
        while let Some(c) = chars.next_if(|c| !c.is_whitespace() && *c != '=') {
            word.push(c);
        }

        match first {
            '.' | '#' => {
                if !is_valid_value(&word) {
                    return None;
                }
                let key = if first == '.' { "class" } else { "id" };
                attributes.push(Attribute::new(key, &word));
            }
            _ => {
                let key = format!("{}{}", first, word);
                if !is_valid_key(&key) {
                    return None;
                }
                let value = if chars.next_if_eq(&'=').is_some() {
                    if chars.next_if_eq(&'"').is_some() {
                        let mut quoted = String::new();
                        loop {
                            match chars.next() {
                                Some('"') => break,
                                Some(c) => quoted.push(c),
                                None => return None,
                            }
                        }
                        quoted
                    } else {
                        let mut bare = String::new();
                        while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                            bare.push(c);
                        }
                        bare
                    }
                } else {
                    String::new()
                };
                attributes.push(Attribute::new(&key, &value));
            }
        }
    }

    if attributes.is_empty() {
        None
    } else {
        Some(attributes)
    }
}

fn is_valid_value(word: &str) -> bool {
    !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == ':')
}

fn is_valid_key(key: &str) -> bool {
    key.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':')
}

/// Swap trailing attribute lists for attribute placeholders
pub(crate) fn extract(source: &str, markers: &mut Markers) -> String {
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
            match split_trailing_attributes(line) {
                Some((text, attributes)) => {
                    out.push_str(text);
                    out.push_str(&markers.attributes(attributes));
                }
                None => out.push_str(line),
            }
        }
        out.push('\n');
    }

    out
}

/// Split `text {.a #b}` into the text (keeping its trailing space) and the list
fn split_trailing_attributes(line: &str) -> Option<(&str, Vec<Attribute>)> {
    let trimmed = line.trim_end();
    let inner_end = trimmed.strip_suffix('}')?;
    let open = inner_end.rfind('{')?;
    let text = &inner_end[..open];

    // An attribute list alone on a line has nothing to attach to
    if text.trim().is_empty() || !text.ends_with(char::is_whitespace) {
        return None;
    }
    // Inside an unterminated code span
    if text.matches('`').count() % 2 == 1 {
        return None;
    }

    let attributes = parse_attributes(&inner_end[open + 1..])?;
    Some((text, attributes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_classes_ids_and_pairs() {
        let attributes = parse_attributes(".lead #intro data-x=1 title=\"Two words\" hidden")
            .expect("valid attribute list");
        assert_eq!(
            attributes,
            vec![
                Attribute::new("class", "lead"),
                Attribute::new("id", "intro"),
                Attribute::new("data-x", "1"),
                Attribute::new("title", "Two words"),
                Attribute::new("hidden", ""),
            ]
        );
    }

    #[test]
    fn rejects_non_attribute_braces() {
        assert!(parse_attributes("x: 1, y: 2").is_none());
        assert!(parse_attributes("").is_none());
        assert!(split_trailing_attributes("fn main() {}").is_none());
        assert!(split_trailing_attributes("{.alone}").is_none());
        assert!(split_trailing_attributes("`code {.x}").is_none());
    }

    #[test]
    fn keeps_text_before_list() {
        let (text, attributes) =
            split_trailing_attributes("# Title {.big}").expect("trailing attributes");
        assert_eq!(text, "# Title ");
        assert_eq!(attributes, vec![Attribute::new("class", "big")]);
    }
}
