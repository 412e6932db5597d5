// ABOUTME: Placeholder markers for plugin output
// ABOUTME: Keeps plugin markup out of comrak and splices it back into the rendered HTML

use crate::utils::escape_html;

const OPEN: char = '\u{E000}';
const CLOSE: char = '\u{E001}';

/// What a slide break placeholder restores to; rendered HTML is split on it
pub const SLIDE_BREAK: &str = "\u{E002}";

/// A `key="value"` attribute; classes are merged, everything else appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug)]
enum Fragment {
    Markup { html: String, block: bool },
    Attributes(Vec<Attribute>),
}

/// Table of placeholder tokens emitted into the markdown source.
///
/// Tokens are private-use characters around an index, which comrak treats as
/// plain text regardless of the raw HTML setting.
#[derive(Debug, Default)]
pub struct Markers {
    fragments: Vec<Fragment>,
}

impl Markers {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, fragment: Fragment) -> String {
        let token = token(self.fragments.len());
        self.fragments.push(fragment);
        token
    }

    /// Token for markup that sits inside a paragraph
    pub fn inline(&mut self, html: impl Into<String>) -> String {
        self.push(Fragment::Markup {
            html: html.into(),
            block: false,
        })
    }

    /// Token for markup that occupies its own block; comrak wraps it in `<p>`
    pub fn block(&mut self, html: impl Into<String>) -> String {
        self.push(Fragment::Markup {
            html: html.into(),
            block: true,
        })
    }

    /// Block token marking the boundary between two slides
    pub fn slide_break(&mut self) -> String {
        self.block(SLIDE_BREAK)
    }

    /// Token that attaches attributes to the element enclosing it
    pub fn attributes(&mut self, attributes: Vec<Attribute>) -> String {
        self.push(Fragment::Attributes(attributes))
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Replace every token in rendered HTML with its fragment
    pub fn restore(&self, html: &str) -> String {
        if self.fragments.is_empty() {
            return html.to_string();
        }

        let mut html = html.to_string();

        for (idx, fragment) in self.fragments.iter().enumerate() {
            match fragment {
                Fragment::Attributes(attributes) => {
                    html = apply_attributes(&html, &token(idx), attributes);
                }
                Fragment::Markup { block: true, .. } => {
                    let token = token(idx);
                    html = html
                        .replace(&format!("<p>{}</p>\n", token), &token)
                        .replace(&format!("<p>{}</p>", token), &token);
                }
                Fragment::Markup { block: false, .. } => {}
            }
        }

        let mut out = String::with_capacity(html.len());
        let mut rest = html.as_str();
        while let Some(start) = rest.find(OPEN) {
            out.push_str(&rest[..start]);
            let after = &rest[start + OPEN.len_utf8()..];
            let parsed = after.find(CLOSE).and_then(|end| {
                after[..end]
                    .parse::<usize>()
                    .ok()
                    .map(|idx| (idx, end + CLOSE.len_utf8()))
            });
            match parsed {
                Some((idx, consumed)) => {
                    if let Some(Fragment::Markup { html, .. }) = self.fragments.get(idx) {
                        out.push_str(html);
                    }
                    rest = &after[consumed..];
                }
                None => {
                    out.push(OPEN);
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn token(idx: usize) -> String {
    format!("{}{}{}", OPEN, idx, CLOSE)
}

const VOID_ELEMENTS: [&str; 6] = ["br", "hr", "img", "input", "meta", "link"];

/// Remove the token and merge its attributes into the enclosing open tag
fn apply_attributes(html: &str, token: &str, attributes: &[Attribute]) -> String {
    let Some(pos) = html.find(token) else {
        return html.to_string();
    };

    let mut before = html[..pos].to_string();
    if before.ends_with(' ') {
        before.pop();
    }
    let after = &html[pos + token.len()..];

    let Some((start, end)) = enclosing_open_tag(&before) else {
        return format!("{}{}", before, after);
    };

    let tag = merge_attributes(&before[start..=end], attributes);
    format!("{}{}{}{}", &before[..start], tag, &before[end + 1..], after)
}

/// Find the innermost unclosed open tag, as (index of `<`, index of `>`)
fn enclosing_open_tag(html: &str) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut cursor = html.len();

    while let Some(lt) = html[..cursor].rfind('<') {
        cursor = lt;
        let Some(offset) = html[lt..].find('>') else {
            continue;
        };
        let gt = lt + offset;
        let inner = &html[lt + 1..gt];

        if inner.starts_with('/') {
            depth += 1;
            continue;
        }
        let name = inner
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if inner.starts_with('!') || inner.ends_with('/') || VOID_ELEMENTS.contains(&name.as_str())
        {
            continue;
        }
        if depth == 0 {
            return Some((lt, gt));
        }
        depth -= 1;
    }

    None
}

fn merge_attributes(tag: &str, attributes: &[Attribute]) -> String {
    let mut tag = tag.to_string();

    let classes: Vec<&str> = attributes
        .iter()
        .filter(|a| a.key == "class")
        .map(|a| a.value.as_str())
        .collect();

    if !classes.is_empty() {
        let joined = escape_html(&classes.join(" "));
        if let Some(idx) = tag.find(" class=\"") {
            let value_start = idx + " class=\"".len();
            tag.insert_str(value_start, &format!("{} ", joined));
        } else {
            let insert_at = tag.len() - 1;
            tag.insert_str(insert_at, &format!(" class=\"{}\"", joined));
        }
    }

    for attribute in attributes.iter().filter(|a| a.key != "class") {
        let insert_at = tag.len() - 1;
        tag.insert_str(
            insert_at,
            &format!(" {}=\"{}\"", attribute.key, escape_html(&attribute.value)),
        );
    }

    tag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_markup_unwraps_paragraph() {
        let mut markers = Markers::new();
        let token = markers.block("<div class=\"x\">\n");
        let html = format!("<p>{}</p>\n<p>body</p>\n", token);
        assert_eq!(markers.restore(&html), "<div class=\"x\">\n<p>body</p>\n");
    }

    #[test]
    fn attributes_merge_into_existing_class() {
        let mut markers = Markers::new();
        let token = markers.attributes(vec![
            Attribute::new("class", "wide"),
            Attribute::new("id", "intro"),
        ]);
        let html = format!("<pre class=\"a\">x</pre><h2 class=\"lead\">Hello {}</h2>", token);
        assert_eq!(
            markers.restore(&html),
            "<pre class=\"a\">x</pre><h2 class=\"wide lead\" id=\"intro\">Hello</h2>"
        );
    }

    #[test]
    fn attributes_skip_closed_inline_elements() {
        let mut markers = Markers::new();
        let token = markers.attributes(vec![Attribute::new("class", "red")]);
        let html = format!("<p>Some <em>text</em><br />\nmore {}</p>", token);
        assert_eq!(
            markers.restore(&html),
            "<p class=\"red\">Some <em>text</em><br />\nmore</p>"
        );
    }

    #[test]
    fn restore_without_markers_is_identity() {
        let markers = Markers::new();
        let html = "<p>plain</p>";
        assert_eq!(markers.restore(html), html);
    }
}
