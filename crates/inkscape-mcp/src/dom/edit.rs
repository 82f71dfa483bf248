use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::dom::selector::{CssSelector, Selector};
use crate::dom::tree::{SvgDocument, SvgElement, SvgNode};
use crate::error::InkscapeError;

/// One mutation: a selector plus the attribute/style assignments to apply to
/// every matched element. Keys starting with `@` set attributes, keys
/// starting with `style.` update the inline style declaration list; anything
/// else is ignored.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct SetOp {
    pub selector: CssSelector,
    #[schemars(description = "Assignments, e.g. {\"@x\": \"10\", \"style.fill\": \"#f60\"}")]
    pub set: BTreeMap<String, String>,
}

/// Applies set operations to a document and returns the number of matched
/// nodes across all ops. All selectors are compiled (and therefore
/// validated) before the first mutation, so a bad op never leaves the
/// document half-edited.
pub fn apply_set_ops(doc: &mut SvgDocument, ops: &[SetOp]) -> Result<usize, InkscapeError> {
    let compiled: Vec<Selector> = ops
        .iter()
        .map(|op| op.selector.compile())
        .collect::<Result<_, _>>()?;

    let mut changed = 0;
    for (op, selector) in ops.iter().zip(compiled.iter()) {
        apply_to_element(&mut doc.root, selector, &op.set, &mut changed);
    }
    Ok(changed)
}

fn apply_to_element(
    element: &mut SvgElement,
    selector: &Selector,
    set: &BTreeMap<String, String>,
    changed: &mut usize,
) {
    if selector.matches(element) {
        for (key, value) in set {
            if let Some(prop) = key.strip_prefix("style.") {
                set_style_property(element, prop, value);
            } else if let Some(attr) = key.strip_prefix('@') {
                element.set_attr(attr, value);
            }
        }
        *changed += 1;
    }
    for child in element.children.iter_mut() {
        if let SvgNode::Element(el) = child {
            apply_to_element(el, selector, set, changed);
        }
    }
}

/// Updates one property of the inline `style` attribute, preserving the
/// order of existing declarations.
fn set_style_property(element: &mut SvgElement, property: &str, value: &str) {
    let mut declarations: Vec<(String, String)> = element
        .attr("style")
        .map(parse_style)
        .unwrap_or_default();

    if let Some(entry) = declarations.iter_mut().find(|(name, _)| name == property) {
        entry.1 = value.to_string();
    } else {
        declarations.push((property.to_string(), value.to_string()));
    }

    let rendered = declarations
        .iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect::<Vec<_>>()
        .join(";");
    element.set_attr("style", &rendered);
}

fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}
