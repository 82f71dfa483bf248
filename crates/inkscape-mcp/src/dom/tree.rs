use roxmltree::{Document, Node, NodeType, ParsingOptions};

use crate::error::InkscapeError;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
const XMLNS_NS: &str = "http://www.w3.org/2000/xmlns/";

/// One node of an owned SVG tree.
#[derive(Clone, Debug, PartialEq)]
pub enum SvgNode {
    Element(SvgElement),
    Text(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        data: Option<String>,
    },
}

/// A mutable SVG element. `name` keeps the serialized (prefixed) form;
/// attribute order is preserved from the source document.
#[derive(Clone, Debug, PartialEq)]
pub struct SvgElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<SvgNode>,
}

impl SvgElement {
    /// The element name without any namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        if let Some(entry) = self.attrs.iter_mut().find(|(key, _)| key == name) {
            entry.1 = value.to_string();
        } else {
            self.attrs.push((name.to_string(), value.to_string()));
        }
    }

    /// Child elements, skipping text/comment nodes.
    pub fn child_elements(&self) -> impl Iterator<Item = &SvgElement> {
        self.children.iter().filter_map(|node| match node {
            SvgNode::Element(el) => Some(el),
            _ => None,
        })
    }
}

/// An owned SVG document: prologue nodes (comments and processing
/// instructions before the root) plus the root element.
#[derive(Clone, Debug, PartialEq)]
pub struct SvgDocument {
    pub prologue: Vec<SvgNode>,
    pub root: SvgElement,
}

impl SvgDocument {
    /// Parses SVG text into an owned tree. Parse failures are validation
    /// errors; callers surface them as `ParseError`.
    pub fn parse(text: &str) -> Result<Self, InkscapeError> {
        let mut options = ParsingOptions::default();
        // Real-world SVGs routinely carry a DOCTYPE.
        options.allow_dtd = true;
        let doc = Document::parse_with_options(text, options)
            .map_err(|err| InkscapeError::Validation(format!("ParseError: {err}")))?;

        let mut prologue = Vec::new();
        let mut root = None;
        for child in doc.root().children() {
            match child.node_type() {
                NodeType::Element => root = Some(convert_element(child)),
                NodeType::Comment => {
                    prologue.push(SvgNode::Comment(child.text().unwrap_or("").to_string()))
                }
                NodeType::PI => {
                    if let Some(pi) = child.pi() {
                        prologue.push(SvgNode::ProcessingInstruction {
                            target: pi.target.to_string(),
                            data: pi.value.map(|v| v.to_string()),
                        });
                    }
                }
                _ => {}
            }
        }

        let root = root
            .ok_or_else(|| InkscapeError::Validation("ParseError: no root element".to_string()))?;
        Ok(Self { prologue, root })
    }

    /// Parse-only validation.
    pub fn validate(text: &str) -> Result<(), InkscapeError> {
        Self::parse(text).map(|_| ())
    }

    /// Serializes the tree back to XML text.
    pub fn serialize(&self, xml_declaration: bool) -> String {
        let mut out = String::new();
        if xml_declaration {
            out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        }
        for node in &self.prologue {
            write_node(&mut out, node);
            out.push('\n');
        }
        write_element(&mut out, &self.root);
        out.push('\n');
        out
    }
}

fn convert_element(node: Node<'_, '_>) -> SvgElement {
    let mut attrs = Vec::new();

    // Namespace declarations introduced on this element: everything in scope
    // here that the parent did not already have.
    let parent_scope: Vec<(Option<String>, String)> = node
        .parent_element()
        .map(|parent| {
            parent
                .namespaces()
                .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
                .collect()
        })
        .unwrap_or_default();
    for ns in node.namespaces() {
        if ns.uri() == XML_NS || ns.uri() == XMLNS_NS {
            continue;
        }
        let key = (ns.name().map(str::to_string), ns.uri().to_string());
        if parent_scope.contains(&key) {
            continue;
        }
        match key.0 {
            Some(prefix) => attrs.push((format!("xmlns:{prefix}"), key.1)),
            None => attrs.push(("xmlns".to_string(), key.1)),
        }
    }

    for attr in node.attributes() {
        let name = match attr.namespace() {
            Some(uri) if uri == XML_NS => format!("xml:{}", attr.name()),
            Some(uri) => match prefix_for(node, uri) {
                Some(prefix) => format!("{prefix}:{}", attr.name()),
                None => attr.name().to_string(),
            },
            None => attr.name().to_string(),
        };
        attrs.push((name, attr.value().to_string()));
    }

    let mut children = Vec::new();
    for child in node.children() {
        match child.node_type() {
            NodeType::Element => children.push(SvgNode::Element(convert_element(child))),
            NodeType::Text => {
                if let Some(text) = child.text() {
                    children.push(SvgNode::Text(text.to_string()));
                }
            }
            NodeType::Comment => {
                children.push(SvgNode::Comment(child.text().unwrap_or("").to_string()))
            }
            NodeType::PI => {
                if let Some(pi) = child.pi() {
                    children.push(SvgNode::ProcessingInstruction {
                        target: pi.target.to_string(),
                        data: pi.value.map(|v| v.to_string()),
                    });
                }
            }
            NodeType::Root => {}
        }
    }

    SvgElement {
        name: qualified_name(node),
        attrs,
        children,
    }
}

fn qualified_name(node: Node<'_, '_>) -> String {
    let tag = node.tag_name();
    let Some(uri) = tag.namespace() else {
        return tag.name().to_string();
    };

    // Prefer the default declaration for this URI; fall back to a prefix.
    let mut prefix: Option<String> = None;
    for ns in node.namespaces() {
        if ns.uri() == uri {
            if ns.name().is_none() {
                prefix = None;
                break;
            }
            if prefix.is_none() {
                prefix = ns.name().map(str::to_string);
            }
        }
    }
    match prefix {
        Some(prefix) => format!("{prefix}:{}", tag.name()),
        None => tag.name().to_string(),
    }
}

fn prefix_for(node: Node<'_, '_>, uri: &str) -> Option<String> {
    node.namespaces()
        .find(|ns| ns.uri() == uri && ns.name().is_some())
        .and_then(|ns| ns.name().map(str::to_string))
}

fn write_element(out: &mut String, element: &SvgElement) {
    out.push('<');
    out.push_str(&element.name);
    for (name, value) in &element.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attr(out, value);
        out.push('"');
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &element.children {
        write_node(out, child);
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

fn write_node(out: &mut String, node: &SvgNode) {
    match node {
        SvgNode::Element(el) => write_element(out, el),
        SvgNode::Text(text) => escape_text(out, text),
        SvgNode::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        SvgNode::ProcessingInstruction { target, data } => {
            out.push_str("<?");
            out.push_str(target);
            if let Some(data) = data {
                out.push(' ');
                out.push_str(data);
            }
            out.push_str("?>");
        }
    }
}

fn escape_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
}

fn escape_attr(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
}
