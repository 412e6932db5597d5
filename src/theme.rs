// ABOUTME: Theme token module for the deck-slides application
// ABOUTME: Holds design tokens for decks and turns them into slide CSS

use crate::errors::{DeckError, Result};
use crate::utils::kebab_case;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Value of a style property: a literal, a token reference, a scale index,
/// a per-breakpoint list or a nested selector block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Responsive(Vec<StyleValue>),
    Nested(StyleRule),
}

pub type StyleRule = BTreeMap<String, StyleValue>;

/// Design tokens for a deck. Missing keys in a theme file take the default
/// theme's values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Theme {
    pub colors: BTreeMap<String, String>,
    pub fonts: BTreeMap<String, String>,
    pub font_sizes: Vec<u32>,
    pub font_weights: BTreeMap<String, u32>,
    pub line_heights: BTreeMap<String, f64>,
    pub space: Vec<u32>,
    pub sizes: BTreeMap<String, u32>,
    pub breakpoints: Vec<String>,
    pub radii: BTreeMap<String, u32>,
    pub shadows: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_font: Option<String>,
    pub styles: BTreeMap<String, StyleRule>,
}

fn text(value: &str) -> StyleValue {
    StyleValue::Text(value.to_string())
}

fn num(value: i64) -> StyleValue {
    StyleValue::Integer(value)
}

fn rule(entries: Vec<(&str, StyleValue)>) -> StyleRule {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn map<V: Clone>(entries: &[(&str, V)]) -> BTreeMap<String, V> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn heading(color: &str, font_size: i64, margin_bottom: i64) -> StyleRule {
    rule(vec![
        ("color", text(color)),
        ("fontFamily", text("heading")),
        ("lineHeight", text("heading")),
        ("fontWeight", text("heading")),
        ("fontSize", num(font_size)),
        ("marginBottom", num(margin_bottom)),
    ])
}

impl Default for Theme {
    /// Dark deck theme
    fn default() -> Self {
        let system_stack = "\"Segoe UI\", Roboto, \"Helvetica Neue\", Arial, sans-serif";

        let mut styles = BTreeMap::new();
        styles.insert(
            "root".to_string(),
            rule(vec![
                ("fontFamily", text("body")),
                ("lineHeight", text("body")),
                ("fontWeight", text("body")),
            ]),
        );
        styles.insert("h1".to_string(), heading("primary", 6, 3));
        styles.insert("h2".to_string(), heading("secondary", 5, 3));
        styles.insert("h3".to_string(), heading("text", 4, 3));
        styles.insert("h4".to_string(), heading("text", 3, 2));
        styles.insert(
            "p".to_string(),
            rule(vec![
                ("color", text("text")),
                ("fontFamily", text("body")),
                ("fontWeight", text("body")),
                ("lineHeight", text("body")),
                ("marginBottom", num(3)),
            ]),
        );
        styles.insert(
            "a".to_string(),
            rule(vec![
                ("color", text("secondary")),
                ("textDecoration", text("none")),
                (
                    "&:hover",
                    StyleValue::Nested(rule(vec![("textDecoration", text("underline"))])),
                ),
            ]),
        );
        styles.insert(
            "pre".to_string(),
            rule(vec![
                ("fontFamily", text("monospace")),
                ("overflowX", text("auto")),
                (
                    "code",
                    StyleValue::Nested(rule(vec![("color", text("inherit"))])),
                ),
                ("backgroundColor", text("muted")),
                ("padding", num(3)),
                ("borderRadius", text("default")),
                ("marginBottom", num(3)),
            ]),
        );
        styles.insert(
            "code".to_string(),
            rule(vec![
                ("fontFamily", text("monospace")),
                ("fontSize", text("inherit")),
                ("backgroundColor", text("muted")),
                ("padding", num(1)),
                ("borderRadius", text("default")),
            ]),
        );
        styles.insert(
            "table".to_string(),
            rule(vec![
                ("width", text("100%")),
                ("borderCollapse", text("separate")),
                ("borderSpacing", num(0)),
                ("marginBottom", num(3)),
            ]),
        );
        styles.insert(
            "th".to_string(),
            rule(vec![
                ("textAlign", text("left")),
                ("borderBottomStyle", text("solid")),
                ("borderBottomWidth", text("2px")),
                ("borderBottomColor", text("primary")),
                ("padding", num(2)),
                ("backgroundColor", text("muted")),
            ]),
        );
        styles.insert(
            "td".to_string(),
            rule(vec![
                ("textAlign", text("left")),
                ("borderBottomStyle", text("solid")),
                ("borderBottomWidth", text("1px")),
                ("borderBottomColor", text("muted")),
                ("padding", num(2)),
            ]),
        );
        styles.insert("img".to_string(), rule(vec![("maxWidth", text("100%"))]));
        styles.insert("ul".to_string(), rule(vec![("marginBottom", num(3))]));
        styles.insert("ol".to_string(), rule(vec![("marginBottom", num(3))]));
        styles.insert("li".to_string(), rule(vec![("marginBottom", num(2))]));
        styles.insert(
            "blockquote".to_string(),
            rule(vec![
                ("color", text("gray")),
                ("marginLeft", num(0)),
                ("marginRight", num(0)),
                ("paddingLeft", num(3)),
                ("borderLeftColor", text("primary")),
                ("borderLeftStyle", text("solid")),
                ("borderLeftWidth", text("4px")),
                ("fontStyle", text("italic")),
                ("marginBottom", num(3)),
            ]),
        );

        Self {
            colors: map(&[
                ("text", "#ffffff".to_string()),
                ("background", "#1e1e1e".to_string()),
                ("primary", "#2196f3".to_string()),
                ("secondary", "#00bcd4".to_string()),
                ("accent", "#ff9800".to_string()),
                ("muted", "#2d2d30".to_string()),
                ("gray", "#cccccc".to_string()),
            ]),
            fonts: map(&[
                ("body", system_stack.to_string()),
                ("heading", system_stack.to_string()),
                ("monospace", "Consolas, Monaco, \"Courier New\", monospace".to_string()),
            ]),
            font_sizes: vec![12, 14, 16, 20, 24, 32, 48, 64, 96],
            font_weights: map(&[("body", 400), ("heading", 700), ("bold", 700)]),
            line_heights: map(&[("body", 1.5), ("heading", 1.25)]),
            space: vec![0, 4, 8, 16, 32, 64, 128, 256, 512],
            sizes: map(&[("container", 1280)]),
            breakpoints: vec!["40em".to_string(), "52em".to_string(), "64em".to_string()],
            radii: map(&[("default", 4), ("circle", 99999)]),
            shadows: map(&[
                ("card", "0 0 4px rgba(0, 0, 0, .125)".to_string()),
                ("large", "0 0 24px rgba(0, 0, 0, .125)".to_string()),
            ]),
            google_font: Some(
                "https://fonts.googleapis.com/css2?family=Roboto:wght@400;700&family=Roboto+Mono&display=swap"
                    .to_string(),
            ),
            styles,
        }
    }
}

/// Token scale a property draws its values from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scale {
    Colors,
    Fonts,
    FontSizes,
    FontWeights,
    LineHeights,
    Space,
    Sizes,
    Radii,
    Shadows,
    None,
}

fn scale_for(property: &str) -> Scale {
    match property {
        "color" | "fill" | "stroke" => Scale::Colors,
        p if p.ends_with("Color") => Scale::Colors,
        "fontFamily" => Scale::Fonts,
        "fontSize" => Scale::FontSizes,
        "fontWeight" => Scale::FontWeights,
        "lineHeight" => Scale::LineHeights,
        "gap" | "rowGap" | "columnGap" | "top" | "right" | "bottom" | "left" => Scale::Space,
        p if p.starts_with("margin") || p.starts_with("padding") => Scale::Space,
        "width" | "height" | "minWidth" | "maxWidth" | "minHeight" | "maxHeight" => Scale::Sizes,
        p if p.starts_with("border") && p.ends_with("Radius") => Scale::Radii,
        "boxShadow" | "textShadow" => Scale::Shadows,
        _ => Scale::None,
    }
}

const UNITLESS: [&str; 6] = ["fontWeight", "lineHeight", "opacity", "zIndex", "flex", "order"];

fn with_unit(property: &str, value: f64) -> String {
    if value == 0.0 || UNITLESS.contains(&property) {
        format_number(value)
    } else {
        format!("{}px", format_number(value))
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

impl Theme {
    /// Load a theme from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Loading theme from {:?}", path);
        let content = fs::read_to_string(path).map_err(DeckError::FileReadError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DeckError::ThemeError(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| DeckError::ThemeError(e.to_string()))
    }

    fn keyed(&self, scale: Scale, key: &str) -> Option<String> {
        match scale {
            Scale::Colors => self.colors.get(key).cloned(),
            Scale::Fonts => self.fonts.get(key).cloned(),
            Scale::FontWeights => self.font_weights.get(key).map(|w| w.to_string()),
            Scale::LineHeights => self.line_heights.get(key).map(|h| format_number(*h)),
            Scale::Sizes => self.sizes.get(key).map(|s| format!("{}px", s)),
            Scale::Radii => self.radii.get(key).map(|r| with_unit("borderRadius", *r as f64)),
            Scale::Shadows => self.shadows.get(key).cloned(),
            Scale::FontSizes | Scale::Space | Scale::None => None,
        }
    }

    fn indexed(&self, scale: Scale, index: i64) -> Option<u32> {
        let index = usize::try_from(index).ok()?;
        match scale {
            Scale::FontSizes => self.font_sizes.get(index).copied(),
            Scale::Space => self.space.get(index).copied(),
            _ => None,
        }
    }

    /// Resolve a property value against the token scales. References that do
    /// not name a token are emitted verbatim.
    pub fn resolve(&self, property: &str, value: &StyleValue) -> Option<String> {
        let scale = scale_for(property);
        match value {
            StyleValue::Text(s) => Some(self.keyed(scale, s).unwrap_or_else(|| s.clone())),
            StyleValue::Integer(i) => Some(match self.indexed(scale, *i) {
                Some(v) => with_unit(property, v as f64),
                None => with_unit(property, *i as f64),
            }),
            StyleValue::Float(f) => Some(with_unit(property, *f)),
            StyleValue::Responsive(_) | StyleValue::Nested(_) => None,
        }
    }

    /// Custom properties exposing every token
    fn custom_properties(&self) -> String {
        let mut css = String::from(":root {\n");
        for (name, value) in &self.colors {
            let _ = writeln!(css, "  --color-{}: {};", name, value);
        }
        for (name, value) in &self.fonts {
            let _ = writeln!(css, "  --font-{}: {};", name, value);
        }
        for (idx, value) in self.font_sizes.iter().enumerate() {
            let _ = writeln!(css, "  --font-size-{}: {}px;", idx, value);
        }
        for (name, value) in &self.font_weights {
            let _ = writeln!(css, "  --font-weight-{}: {};", name, value);
        }
        for (name, value) in &self.line_heights {
            let _ = writeln!(css, "  --line-height-{}: {};", name, format_number(*value));
        }
        for (idx, value) in self.space.iter().enumerate() {
            let _ = writeln!(css, "  --space-{}: {};", idx, with_unit("margin", *value as f64));
        }
        for (name, value) in &self.sizes {
            let _ = writeln!(css, "  --size-{}: {}px;", name, value);
        }
        for (idx, value) in self.breakpoints.iter().enumerate() {
            let _ = writeln!(css, "  --breakpoint-{}: {};", idx, value);
        }
        for (name, value) in &self.radii {
            let _ = writeln!(css, "  --radius-{}: {};", name, with_unit("borderRadius", *value as f64));
        }
        for (name, value) in &self.shadows {
            let _ = writeln!(css, "  --shadow-{}: {};", name, value);
        }
        css.push_str("}\n");
        css
    }

    /// Emit `selector { ... }` plus nested and responsive rules
    fn write_rule(&self, selector: &str, rule: &StyleRule, css: &mut String) {
        let mut declarations = Vec::new();
        let mut nested = Vec::new();
        let mut media: BTreeMap<usize, Vec<String>> = BTreeMap::new();

        for (property, value) in rule {
            match value {
                StyleValue::Nested(inner) => {
                    let child = if property.contains('&') {
                        property.replace('&', selector)
                    } else {
                        format!("{} {}", selector, property)
                    };
                    nested.push((child, inner));
                }
                StyleValue::Responsive(values) => {
                    for (idx, value) in values.iter().enumerate() {
                        let Some(resolved) = self.resolve(property, value) else {
                            continue;
                        };
                        let declaration = format!("{}: {};", kebab_case(property), resolved);
                        if idx == 0 {
                            declarations.push(declaration);
                        } else {
                            media.entry(idx - 1).or_default().push(declaration);
                        }
                    }
                }
                value => {
                    if let Some(resolved) = self.resolve(property, value) {
                        declarations.push(format!("{}: {};", kebab_case(property), resolved));
                    }
                }
            }
        }

        if !declarations.is_empty() {
            let _ = writeln!(css, "{} {{", selector);
            for declaration in &declarations {
                let _ = writeln!(css, "  {}", declaration);
            }
            css.push_str("}\n");
        }

        for (idx, declarations) in media {
            let Some(breakpoint) = self.breakpoints.get(idx) else {
                continue;
            };
            let _ = writeln!(css, "@media screen and (min-width: {}) {{", breakpoint);
            let _ = writeln!(css, "  {} {{", selector);
            for declaration in &declarations {
                let _ = writeln!(css, "    {}", declaration);
            }
            css.push_str("  }\n}\n");
        }

        for (child, inner) in nested {
            self.write_rule(&child, inner, css);
        }
    }

    /// Render the theme as a stylesheet scoped to slide `section`s
    pub fn to_css(&self) -> String {
        let mut css = String::new();

        if let Some(font) = &self.google_font {
            let _ = writeln!(css, "@import url('{}');", font);
        }
        css.push_str(&self.custom_properties());

        let mut base = StyleRule::new();
        if self.colors.contains_key("text") {
            base.insert("color".to_string(), text("text"));
        }
        if self.colors.contains_key("background") {
            base.insert("backgroundColor".to_string(), text("background"));
        }
        if let Some(root) = self.styles.get("root") {
            base.extend(root.clone());
        }
        self.write_rule("section", &base, &mut css);

        for (element, rule) in self.styles.iter().filter(|(name, _)| *name != "root") {
            self.write_rule(&format!("section {}", element), rule, &mut css);
        }

        css
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_token_references() {
        let theme = Theme::default();
        assert_eq!(theme.resolve("color", &text("primary")).as_deref(), Some("#2196f3"));
        assert_eq!(theme.resolve("fontSize", &num(6)).as_deref(), Some("48px"));
        assert_eq!(theme.resolve("marginBottom", &num(3)).as_deref(), Some("16px"));
        assert_eq!(theme.resolve("borderRadius", &text("default")).as_deref(), Some("4px"));
        assert_eq!(theme.resolve("fontWeight", &text("heading")).as_deref(), Some("700"));
        assert_eq!(theme.resolve("lineHeight", &text("body")).as_deref(), Some("1.5"));
    }

    #[test]
    fn unknown_references_pass_through() {
        let theme = Theme::default();
        assert_eq!(theme.resolve("color", &text("inherit")).as_deref(), Some("inherit"));
        assert_eq!(theme.resolve("fontSize", &num(42)).as_deref(), Some("42px"));
        assert_eq!(theme.resolve("borderSpacing", &num(0)).as_deref(), Some("0"));
    }

    #[test]
    fn responsive_values_use_breakpoints() {
        let mut theme = Theme::default();
        theme.styles.clear();
        theme.styles.insert(
            "h1".to_string(),
            rule(vec![("fontSize", StyleValue::Responsive(vec![num(4), num(6)]))]),
        );
        let css = theme.to_css();
        assert!(css.contains("section h1 {\n  font-size: 24px;\n}"));
        assert!(css.contains("@media screen and (min-width: 40em) {\n  section h1 {\n    font-size: 48px;\n  }\n}"));
    }
}
