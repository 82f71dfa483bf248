use std::sync::OnceLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::dom::tree::SvgElement;
use crate::error::InkscapeError;

/// Patterns that must never appear in a selector, screened before the
/// charset check: XPath syntax, script vectors, CSS imports/expressions,
/// URL functions, escapes, and brace injection.
fn unsafe_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"//",
            r"(?i)script",
            r"(?i)@import",
            r"(?i)expression\s*\(",
            r"(?i)javascript:",
            r"(?i)<\s*script",
            r"(?i)url\s*\(",
            r"\\\\",
            r"[{}]",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("invalid selector pattern"))
        .collect()
    })
}

/// The only characters a selector may consist of.
fn safe_charset() -> &'static Regex {
    static SAFE: OnceLock<Regex> = OnceLock::new();
    SAFE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9#.\-\s,>*]+$").expect("invalid selector pattern"))
}

/// Rejects selectors containing anything outside the safe CSS subset.
pub fn validate_selector(value: &str) -> Result<(), InkscapeError> {
    for pattern in unsafe_patterns() {
        if pattern.is_match(value) {
            return Err(InkscapeError::Validation(format!(
                "selector not allowed: {value}"
            )));
        }
    }
    if !safe_charset().is_match(value) {
        return Err(InkscapeError::Validation(format!(
            "selector not allowed: {value}"
        )));
    }
    Ok(())
}

/// A compiled selector from the supported CSS subset.
///
/// Unsupported-but-safe constructs (child combinators, multi-class chains)
/// compile to `NoMatch` rather than erroring, so a valid-looking selector
/// simply selects nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    Universal,
    Tag(String),
    Id(String),
    Class(String),
    TagClass(String, String),
    Group(Vec<Selector>),
    NoMatch,
}

impl Selector {
    pub fn matches(&self, element: &SvgElement) -> bool {
        match self {
            Selector::Universal => true,
            Selector::Tag(tag) => element.local_name() == tag,
            Selector::Id(id) => element.attr("id") == Some(id.as_str()),
            Selector::Class(class) => has_class_token(element, class),
            Selector::TagClass(tag, class) => {
                element.local_name() == tag && has_class_token(element, class)
            }
            Selector::Group(parts) => parts.iter().any(|part| part.matches(element)),
            Selector::NoMatch => false,
        }
    }
}

fn has_class_token(element: &SvgElement, token: &str) -> bool {
    element
        .attr("class")
        .map(|value| value.split_whitespace().any(|t| t == token))
        .unwrap_or(false)
}

/// Compiles a validated selector string.
pub fn parse_selector(value: &str) -> Selector {
    let value = value.trim();
    if value.contains(',') {
        return Selector::Group(
            value
                .split(',')
                .map(|part| parse_simple(part.trim()))
                .collect(),
        );
    }
    parse_simple(value)
}

fn parse_simple(value: &str) -> Selector {
    if value == "*" {
        return Selector::Universal;
    }
    if value.is_empty() || value.contains('>') || value.contains(char::is_whitespace) {
        // Combinators are out of scope; they select nothing.
        return Selector::NoMatch;
    }
    if let Some(id) = value.strip_prefix('#') {
        return if is_name(id) {
            Selector::Id(id.to_string())
        } else {
            Selector::NoMatch
        };
    }
    if let Some(class) = value.strip_prefix('.') {
        return if is_name(class) {
            Selector::Class(class.to_string())
        } else {
            Selector::NoMatch
        };
    }
    if let Some((tag, class)) = value.split_once('.') {
        return if is_tag(tag) && is_name(class) {
            Selector::TagClass(tag.to_string(), class.to_string())
        } else {
            Selector::NoMatch
        };
    }
    if is_tag(value) {
        return Selector::Tag(value.to_string());
    }
    Selector::NoMatch
}

fn is_tag(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|ch| ch.is_ascii_alphabetic())
}

fn is_name(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
}

/// Wire form of a selector as tools receive it: `{"type": "css", "value": …}`.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct CssSelector {
    #[serde(rename = "type")]
    pub kind: SelectorType,
    #[schemars(description = "Selector from the safe CSS subset")]
    pub value: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SelectorType {
    Css,
}

impl CssSelector {
    pub fn css(value: impl Into<String>) -> Self {
        Self {
            kind: SelectorType::Css,
            value: value.into(),
        }
    }

    /// Validates then compiles the selector.
    pub fn compile(&self) -> Result<Selector, InkscapeError> {
        validate_selector(&self.value)?;
        Ok(parse_selector(&self.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::tree::SvgDocument;

    const FIXTURE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg">
    <circle cx="50" cy="50" r="20" class="shape" id="circle1"/>
    <rect x="10" y="10" width="30" height="30" class="shape" id="rect1"/>
    <text x="50" y="80" class="label">Test</text>
</svg>"#;

    fn match_count(selector: &str) -> usize {
        let doc = SvgDocument::parse(FIXTURE).unwrap();
        let compiled = CssSelector::css(selector).compile().unwrap();
        let mut count = 0;
        fn walk(el: &crate::dom::tree::SvgElement, sel: &Selector, count: &mut usize) {
            if sel.matches(el) {
                *count += 1;
            }
            for child in el.child_elements() {
                walk(child, sel, count);
            }
        }
        walk(&doc.root, &compiled, &mut count);
        count
    }

    #[test]
    fn safe_selectors_pass_validation() {
        for selector in [
            "circle",
            "rect.shape",
            "#circle1",
            ".shape",
            "circle > rect",
            "text, rect",
            "*",
        ] {
            validate_selector(selector).unwrap_or_else(|err| panic!("{selector}: {err}"));
        }
    }

    #[test]
    fn unsafe_selectors_are_rejected() {
        for selector in [
            "//xpath/expression",
            "script[src]",
            "@import url(http://)",
            "expression(alert())",
            "javascript:",
            "<script>",
            "url(",
            "\\\\",
            "{}",
        ] {
            let err = validate_selector(selector).unwrap_err();
            assert!(
                err.to_string().contains("selector not allowed"),
                "{selector}: {err}"
            );
        }
    }

    #[test]
    fn tag_selectors_match_by_local_name() {
        assert_eq!(match_count("circle"), 1);
        assert_eq!(match_count("rect"), 1);
        assert_eq!(match_count("svg"), 1);
    }

    #[test]
    fn universal_matches_everything() {
        assert_eq!(match_count("*"), 4);
    }

    #[test]
    fn id_and_class_selectors() {
        assert_eq!(match_count("#circle1"), 1);
        assert_eq!(match_count(".shape"), 2);
        assert_eq!(match_count(".label"), 1);
        assert_eq!(match_count("rect.shape"), 1);
        assert_eq!(match_count("circle.label"), 0);
    }

    #[test]
    fn group_selectors_union_their_parts() {
        assert_eq!(match_count("text, rect"), 2);
        assert_eq!(match_count("circle, rect, text"), 3);
    }

    #[test]
    fn child_combinators_match_nothing() {
        assert_eq!(match_count("circle > rect"), 0);
        assert_eq!(match_count("svg circle"), 0);
    }

    #[test]
    fn class_token_matching_is_whitespace_delimited() {
        let doc =
            SvgDocument::parse(r#"<svg xmlns="http://www.w3.org/2000/svg" class="a shape b"/>"#)
                .unwrap();
        assert!(parse_selector(".shape").matches(&doc.root));
        assert!(!parse_selector(".shap").matches(&doc.root));
    }
}
