//! Tools that edit SVG documents directly, without Inkscape.

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::{Json, Parameters};
use rmcp::schemars::JsonSchema;
use rmcp::{tool, tool_router};
use serde::{Deserialize, Serialize};

use inkscape_mcp::{
    CleanOptions, DocSource, InkscapeError, SetOp, SvgDocument, Workspace, apply_set_ops,
    clean_document,
};

use crate::error::{McpError, to_mcp_error};
use crate::server::InkscapeMcpServer;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DomValidateArgs {
    /// Document to validate.
    pub doc: DocSource,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct DomValidateResult {
    pub ok: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DomSetArgs {
    /// Document to edit.
    pub doc: DocSource,
    /// Mutations to apply, in order.
    pub ops: Vec<SetOp>,
    /// Workspace path the edited document is saved to.
    pub save_as: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct DomSetResult {
    pub ok: bool,
    /// Number of matched nodes across all ops.
    pub changed: usize,
    /// Path the edited document was written to.
    pub out: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DomCleanArgs {
    /// Document to optimize.
    pub doc: DocSource,
    /// Workspace path the cleaned document is saved to.
    pub save_as: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct DomCleanResult {
    pub ok: bool,
    pub out: String,
}

pub(crate) fn build_dom_tool_router() -> ToolRouter<InkscapeMcpServer> {
    InkscapeMcpServer::dom_tool_router()
}

impl InkscapeMcpServer {
    /// Loads document text from either source, enforcing workspace
    /// confinement and size bounds.
    fn load_svg_text(&self, workspace: &Workspace, doc: &DocSource) -> Result<String, InkscapeError> {
        match doc {
            DocSource::File { path } => {
                let confined = workspace.confine(path)?;
                workspace.read_bounded(&confined)
            }
            DocSource::Inline { svg } => {
                workspace.check_inline(svg)?;
                Ok(svg.clone())
            }
        }
    }
}

#[tool_router(router = dom_tool_router)]
impl InkscapeMcpServer {
    #[tool(
        name = "dom_validate",
        description = "Validate that a document parses as well-formed SVG."
    )]
    pub(crate) async fn dom_validate(
        &self,
        Parameters(args): Parameters<DomValidateArgs>,
    ) -> Result<Json<DomValidateResult>, McpError> {
        let _permit = self.semaphore.acquire().await.map_err(|_| {
            to_mcp_error(InkscapeError::Tool("server is shutting down".to_string()))
        })?;

        let workspace = self.workspace().map_err(to_mcp_error)?;
        let text = self
            .load_svg_text(&workspace, &args.doc)
            .map_err(to_mcp_error)?;
        SvgDocument::validate(&text).map_err(to_mcp_error)?;
        Ok(Json(DomValidateResult { ok: true }))
    }

    #[tool(
        name = "dom_set",
        description = "Set attributes (@attr) and inline styles (style.prop) on elements matched by safe CSS selectors, saving the result to a workspace path."
    )]
    pub(crate) async fn dom_set(
        &self,
        Parameters(args): Parameters<DomSetArgs>,
    ) -> Result<Json<DomSetResult>, McpError> {
        tracing::debug!(ops = args.ops.len(), save_as = %args.save_as, "dom_set");
        let _permit = self.semaphore.acquire().await.map_err(|_| {
            to_mcp_error(InkscapeError::Tool("server is shutting down".to_string()))
        })?;

        let workspace = self.workspace().map_err(to_mcp_error)?;
        let text = self
            .load_svg_text(&workspace, &args.doc)
            .map_err(to_mcp_error)?;

        let mut doc = SvgDocument::parse(&text).map_err(to_mcp_error)?;
        let changed = apply_set_ops(&mut doc, &args.ops).map_err(to_mcp_error)?;

        let out = workspace.confine(&args.save_as).map_err(to_mcp_error)?;
        workspace
            .atomic_write(&out, &doc.serialize(true))
            .map_err(to_mcp_error)?;

        Ok(Json(DomSetResult {
            ok: true,
            changed,
            out: out.display().to_string(),
        }))
    }

    #[tool(
        name = "dom_clean",
        description = "Optimize an SVG document (strip metadata and comments, prune unused defs, synthesize a viewBox), saving the result to a workspace path."
    )]
    pub(crate) async fn dom_clean(
        &self,
        Parameters(args): Parameters<DomCleanArgs>,
    ) -> Result<Json<DomCleanResult>, McpError> {
        let _permit = self.semaphore.acquire().await.map_err(|_| {
            to_mcp_error(InkscapeError::Tool("server is shutting down".to_string()))
        })?;

        let workspace = self.workspace().map_err(to_mcp_error)?;
        let text = self
            .load_svg_text(&workspace, &args.doc)
            .map_err(to_mcp_error)?;

        let mut doc = SvgDocument::parse(&text).map_err(to_mcp_error)?;
        clean_document(&mut doc, &CleanOptions::default());

        let out = workspace.confine(&args.save_as).map_err(to_mcp_error)?;
        workspace
            .atomic_write(&out, &doc.serialize(true))
            .map_err(to_mcp_error)?;

        Ok(Json(DomCleanResult {
            ok: true,
            out: out.display().to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ServerVariant;
    use inkscape_mcp::{CssSelector, InkscapeConfig};
    use rmcp::model::ErrorCode;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::tempdir;

    const TEST_SVG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<svg width="200" height="200" xmlns="http://www.w3.org/2000/svg">
    <circle cx="50" cy="50" r="40" fill="blue" class="shape" id="circle1"/>
    <circle cx="150" cy="50" r="30" fill="green" class="shape" id="circle2"/>
    <rect x="50" y="100" width="100" height="50" fill="red" class="shape" id="rect1"/>
    <text x="100" y="180" class="label">Test SVG</text>
</svg>"#;

    const MESSY_SVG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
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

    fn server() -> (tempfile::TempDir, InkscapeMcpServer) {
        let temp = tempdir().unwrap();
        let config = InkscapeConfig::new(temp.path().join("ws")).unwrap();
        let server = InkscapeMcpServer::new(config, ServerVariant::Dom).unwrap();
        (temp, server)
    }

    fn inline(svg: &str) -> DocSource {
        DocSource::Inline {
            svg: svg.to_string(),
        }
    }

    fn set(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn validate_accepts_inline_and_file_documents() {
        let (_temp, server) = server();
        let Json(result) = server
            .dom_validate(Parameters(DomValidateArgs {
                doc: inline(TEST_SVG),
            }))
            .await
            .unwrap();
        assert!(result.ok);

        let workspace_root = server.config.workspace.clone();
        fs::write(workspace_root.join("test.svg"), TEST_SVG).unwrap();
        let Json(result) = server
            .dom_validate(Parameters(DomValidateArgs {
                doc: DocSource::File {
                    path: "test.svg".to_string(),
                },
            }))
            .await
            .unwrap();
        assert!(result.ok);
    }

    #[tokio::test]
    async fn validate_rejects_malformed_documents() {
        let (_temp, server) = server();
        let err = server
            .dom_validate(Parameters(DomValidateArgs {
                doc: inline("not xml at all"),
            }))
            .await
            .err().unwrap();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("ParseError"));
    }

    #[tokio::test]
    async fn validate_rejects_traversal_and_missing_files() {
        let (_temp, server) = server();
        for path in ["../../../etc/passwd", "../../sensitive.svg"] {
            let err = server
                .dom_validate(Parameters(DomValidateArgs {
                    doc: DocSource::File {
                        path: path.to_string(),
                    },
                }))
                .await
                .err().unwrap();
            assert!(err.message.contains("escapes workspace"), "{path}");
        }

        let err = server
            .dom_validate(Parameters(DomValidateArgs {
                doc: DocSource::File {
                    path: "doesnt_exist.svg".to_string(),
                },
            }))
            .await
            .err().unwrap();
        assert!(err.message.contains("not found"));
    }

    #[tokio::test]
    async fn set_edits_and_saves_a_copy() {
        let (_temp, server) = server();
        let Json(result) = server
            .dom_set(Parameters(DomSetArgs {
                doc: inline(TEST_SVG),
                ops: vec![SetOp {
                    selector: CssSelector::css("circle"),
                    set: set(&[("@fill", "orange")]),
                }],
                save_as: "colors_modified.svg".to_string(),
            }))
            .await
            .unwrap();

        assert!(result.ok);
        assert_eq!(result.changed, 2);
        assert!(result.out.contains("colors_modified.svg"));

        let written = fs::read_to_string(&result.out).unwrap();
        assert!(written.starts_with("<?xml version=\"1.0\""));
        assert_eq!(written.matches("fill=\"orange\"").count(), 2);
    }

    #[tokio::test]
    async fn set_supports_batched_ops() {
        let (_temp, server) = server();
        let Json(result) = server
            .dom_set(Parameters(DomSetArgs {
                doc: inline(TEST_SVG),
                ops: vec![
                    SetOp {
                        selector: CssSelector::css("circle"),
                        set: set(&[("@stroke", "black")]),
                    },
                    SetOp {
                        selector: CssSelector::css("rect"),
                        set: set(&[("@rx", "5")]),
                    },
                    SetOp {
                        selector: CssSelector::css(".shape"),
                        set: set(&[("@data-batch", "yes")]),
                    },
                ],
                save_as: "batch.svg".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(result.changed, 6);
    }

    #[tokio::test]
    async fn set_rejects_unsafe_selectors() {
        let (_temp, server) = server();
        for selector in ["//xpath/expression", "<script>", "url(", "{}"] {
            let err = server
                .dom_set(Parameters(DomSetArgs {
                    doc: inline(TEST_SVG),
                    ops: vec![SetOp {
                        selector: CssSelector::css(selector),
                        set: set(&[("@fill", "red")]),
                    }],
                    save_as: "unsafe.svg".to_string(),
                }))
                .await
                .err().unwrap();
            assert_eq!(err.code, ErrorCode::INVALID_PARAMS, "{selector}");
            assert!(err.message.contains("selector not allowed"), "{selector}");
        }
    }

    #[tokio::test]
    async fn set_refuses_to_save_outside_the_workspace() {
        let (_temp, server) = server();
        let err = server
            .dom_set(Parameters(DomSetArgs {
                doc: inline(TEST_SVG),
                ops: vec![SetOp {
                    selector: CssSelector::css("circle"),
                    set: set(&[("@fill", "red")]),
                }],
                save_as: "../escape.svg".to_string(),
            }))
            .await
            .err().unwrap();
        assert!(err.message.contains("escapes workspace"));
    }

    #[tokio::test]
    async fn clean_strips_metadata_and_adds_a_viewbox() {
        let (_temp, server) = server();
        let workspace_root = server.config.workspace.clone();
        fs::write(workspace_root.join("messy.svg"), MESSY_SVG).unwrap();

        let Json(result) = server
            .dom_clean(Parameters(DomCleanArgs {
                doc: DocSource::File {
                    path: "messy.svg".to_string(),
                },
                save_as: "cleaned.svg".to_string(),
            }))
            .await
            .unwrap();

        assert!(result.ok);
        assert!(result.out.contains("cleaned.svg"));

        let cleaned = fs::read_to_string(&result.out).unwrap();
        assert!(cleaned.starts_with("<?xml version=\"1.0\""));
        assert!(!cleaned.contains("metadata"));
        assert!(!cleaned.contains("unused-gradient"));
        assert!(cleaned.contains("viewBox=\"0 0 100 100\""));
        assert!(cleaned.len() <= MESSY_SVG.len());
    }

    #[tokio::test]
    async fn oversized_inline_documents_are_rejected() {
        let temp = tempdir().unwrap();
        let mut config = InkscapeConfig::new(temp.path().join("ws")).unwrap();
        config.max_file_size = 1024;
        let server = InkscapeMcpServer::new(config, ServerVariant::Dom).unwrap();

        let large = "<svg>".to_string() + &"x".repeat(2048) + "</svg>";
        let err = server
            .dom_validate(Parameters(DomValidateArgs { doc: inline(&large) }))
            .await
            .err().unwrap();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("too large"));
    }
}
