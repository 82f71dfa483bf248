//! Tools backed by a headless `inkscape` subprocess.

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::{Json, Parameters};
use rmcp::schemars::JsonSchema;
use rmcp::{tool, tool_router};
use serde::{Deserialize, Serialize};

use inkscape_mcp::{DocSource, ExportSpec};

use crate::error::{McpError, to_mcp_error};
use crate::runner::{ActionDescriptor, RunRequest};
use crate::server::InkscapeMcpServer;

#[derive(Debug, Serialize, JsonSchema)]
pub struct ActionListResult {
    pub actions: Vec<ActionDescriptor>,
}

/// `action_run` input schema.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ActionRunArgs {
    /// Document to operate on.
    pub doc: DocSource,
    /// Allowlisted Inkscape actions, in execution order.
    #[serde(default)]
    pub actions: Vec<String>,
    /// Optional export request.
    #[serde(default)]
    pub export: Option<ExportSpec>,
    /// Per-call timeout in seconds; falls back to the configured default.
    #[serde(default)]
    pub timeout_s: Option<u64>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ActionRunResult {
    pub ok: bool,
    /// Final export path, when an export was requested.
    pub out: Option<String>,
}

pub(crate) fn build_cli_tool_router() -> ToolRouter<InkscapeMcpServer> {
    InkscapeMcpServer::cli_tool_router()
}

#[tool_router(router = cli_tool_router)]
impl InkscapeMcpServer {
    #[tool(
        name = "action_list",
        description = "List the Inkscape actions available to action_run."
    )]
    pub(crate) async fn action_list(&self) -> Result<Json<ActionListResult>, McpError> {
        let actions = self.runner.action_list().await.map_err(to_mcp_error)?;
        Ok(Json(ActionListResult { actions }))
    }

    #[tool(
        name = "action_run",
        description = "Run allowlisted Inkscape actions on a workspace or inline document, optionally exporting the result to png, pdf, or svg."
    )]
    pub(crate) async fn action_run(
        &self,
        Parameters(args): Parameters<ActionRunArgs>,
    ) -> Result<Json<ActionRunResult>, McpError> {
        tracing::debug!(
            inline = !args.doc.is_file(),
            actions = args.actions.len(),
            export = args.export.is_some(),
            "action_run"
        );
        let outcome = self
            .runner
            .run_actions(RunRequest {
                doc: args.doc,
                actions: args.actions,
                export: args.export,
                timeout_s: args.timeout_s,
            })
            .await
            .map_err(to_mcp_error)?;

        Ok(Json(ActionRunResult {
            ok: true,
            out: outcome.out,
        }))
    }
}
