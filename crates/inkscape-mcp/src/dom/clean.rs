use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::dom::tree::{SvgDocument, SvgElement, SvgNode};

/// Cleanup switches, mirroring the optimizer options the DOM server always
/// enables: metadata removal and viewBox synthesis.
#[derive(Clone, Copy, Debug)]
pub struct CleanOptions {
    pub remove_metadata: bool,
    pub ensure_viewbox: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            remove_metadata: true,
            ensure_viewbox: true,
        }
    }
}

/// Optimizes a document in place: strips comments and processing
/// instructions, drops `metadata` subtrees, prunes unreferenced `defs`
/// children, removes inter-element whitespace, and synthesizes a `viewBox`
/// from width/height when absent.
pub fn clean_document(doc: &mut SvgDocument, options: &CleanOptions) {
    doc.prologue.clear();
    scrub(&mut doc.root, options);

    let referenced = collect_referenced_ids(&doc.root);
    prune_defs(&mut doc.root, &referenced);

    if options.ensure_viewbox {
        ensure_viewbox(&mut doc.root);
    }
}

fn scrub(element: &mut SvgElement, options: &CleanOptions) {
    element.children.retain(|child| match child {
        SvgNode::Comment(_) | SvgNode::ProcessingInstruction { .. } => false,
        SvgNode::Text(text) => !text.trim().is_empty(),
        SvgNode::Element(el) => !(options.remove_metadata && el.local_name() == "metadata"),
    });
    for child in element.children.iter_mut() {
        if let SvgNode::Element(el) = child {
            scrub(el, options);
        }
    }
}

fn url_reference() -> &'static Regex {
    static URL_REF: OnceLock<Regex> = OnceLock::new();
    URL_REF.get_or_init(|| Regex::new(r#"url\(\s*#([^)\s"']+)\s*\)"#).expect("invalid pattern"))
}

/// Every id mentioned by a `url(#…)` function or a fragment `href`.
fn collect_referenced_ids(element: &SvgElement) -> HashSet<String> {
    let mut ids = HashSet::new();
    walk_refs(element, &mut ids);
    ids
}

fn walk_refs(element: &SvgElement, ids: &mut HashSet<String>) {
    for (name, value) in &element.attrs {
        for capture in url_reference().captures_iter(value) {
            ids.insert(capture[1].to_string());
        }
        let local = name.rsplit(':').next().unwrap_or(name);
        if local == "href" {
            if let Some(id) = value.strip_prefix('#') {
                ids.insert(id.to_string());
            }
        }
    }
    for child in element.child_elements() {
        walk_refs(child, ids);
    }
}

fn prune_defs(element: &mut SvgElement, referenced: &HashSet<String>) {
    if element.local_name() == "defs" {
        element.children.retain(|child| match child {
            SvgNode::Element(el) => match el.attr("id") {
                Some(id) => referenced.contains(id),
                None => true,
            },
            _ => true,
        });
    }
    for child in element.children.iter_mut() {
        if let SvgNode::Element(el) = child {
            prune_defs(el, referenced);
        }
    }
    // Drop defs that ended up empty.
    element.children.retain(|child| match child {
        SvgNode::Element(el) => !(el.local_name() == "defs" && el.children.is_empty()),
        _ => true,
    });
}

fn ensure_viewbox(root: &mut SvgElement) {
    if root.attr("viewBox").is_some() {
        return;
    }
    let (Some(width), Some(height)) = (
        root.attr("width").and_then(parse_length),
        root.attr("height").and_then(parse_length),
    ) else {
        return;
    };
    root.set_attr(
        "viewBox",
        &format!("0 0 {} {}", format_number(width), format_number(height)),
    );
}

fn parse_length(value: &str) -> Option<f64> {
    let trimmed = value.trim().trim_end_matches("px").trim();
    trimmed.parse().ok().filter(|n: &f64| n.is_finite() && *n > 0.0)
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::tree::SvgDocument;

    const MESSY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<svg width="100" height="100" xmlns="http://www.w3.org/2000/svg">
    <metadata>
        <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
            <rdf:Description>Created with Inkscape</rdf:Description>
        </rdf:RDF>
    </metadata>
    <defs>
        <linearGradient id="unused-gradient">
            <stop offset="0%" stop-color="red"/>
        </linearGradient>
    </defs>
    <circle cx="50" cy="50" r="40" fill="blue"/>
</svg>"#;

    fn cleaned(text: &str) -> SvgDocument {
        let mut doc = SvgDocument::parse(text).unwrap();
        clean_document(&mut doc, &CleanOptions::default());
        doc
    }

    #[test]
    fn metadata_and_unused_defs_are_removed() {
        let doc = cleaned(MESSY);
        let text = doc.serialize(true);
        assert!(!text.contains("metadata"));
        assert!(!text.contains("unused-gradient"));
        assert!(text.contains("<circle"));
    }

    #[test]
    fn referenced_defs_survive() {
        let svg = r#"<svg width="10" height="10" xmlns="http://www.w3.org/2000/svg">
<defs><linearGradient id="used"><stop offset="0%"/></linearGradient></defs>
<rect fill="url(#used)" width="10" height="10"/>
</svg>"#;
        let text = cleaned(svg).serialize(false);
        assert!(text.contains("id=\"used\""));
    }

    #[test]
    fn href_references_count() {
        let svg = r##"<svg width="10" height="10" xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">
<defs><circle id="dot" r="1"/></defs>
<use xlink:href="#dot"/>
</svg>"##;
        let text = cleaned(svg).serialize(false);
        assert!(text.contains("id=\"dot\""));
    }

    #[test]
    fn comments_and_pis_are_stripped() {
        let svg = "<?xml-stylesheet href=\"a.css\"?><svg width=\"10\" height=\"10\" \
                   xmlns=\"http://www.w3.org/2000/svg\"><!-- noise --><rect width=\"1\" height=\"1\"/></svg>";
        let text = cleaned(svg).serialize(false);
        assert!(!text.contains("noise"));
        assert!(!text.contains("xml-stylesheet"));
    }

    #[test]
    fn viewbox_is_synthesized_from_dimensions() {
        let doc = cleaned(MESSY);
        assert_eq!(doc.root.attr("viewBox"), Some("0 0 100 100"));
    }

    #[test]
    fn viewbox_handles_px_units_and_existing_values() {
        let svg = r#"<svg width="120px" height="80px" xmlns="http://www.w3.org/2000/svg"/>"#;
        assert_eq!(cleaned(svg).root.attr("viewBox"), Some("0 0 120 80"));

        let svg = r#"<svg width="120" height="80" viewBox="0 0 12 8" xmlns="http://www.w3.org/2000/svg"/>"#;
        assert_eq!(cleaned(svg).root.attr("viewBox"), Some("0 0 12 8"));
    }

    #[test]
    fn cleaning_does_not_inflate_the_document() {
        let cleaned_text = cleaned(MESSY).serialize(true);
        assert!(cleaned_text.len() <= MESSY.len());
    }
}
