use std::str::FromStr;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::model::{Implementation, ServerCapabilities, ServerInfo};
use rmcp::service::ServerInitializeError;
use rmcp::{ServerHandler, ServiceExt, tool_handler, transport};
use tokio::sync::Semaphore;

use inkscape_mcp::{InkscapeConfig, InkscapeError, Workspace};

use crate::cli_tools::build_cli_tool_router;
use crate::dom_tools::build_dom_tool_router;
use crate::error::to_mcp_error;
use crate::runner::InkscapeRunner;

/// Which tool surface a server process exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ServerVariant {
    /// Subprocess-driven tools only: `action_list`, `action_run`.
    Cli,
    /// Direct SVG editing only: `dom_validate`, `dom_set`, `dom_clean`.
    Dom,
    /// Both tool sets.
    #[default]
    Combined,
}

impl ServerVariant {
    /// Advertised MCP server name for this variant.
    pub fn server_name(&self) -> &'static str {
        match self {
            ServerVariant::Cli => "inkscape-cli",
            ServerVariant::Dom => "inkex-dom",
            ServerVariant::Combined => "inkscape-combined",
        }
    }

    /// Whether this variant shells out to the `inkscape` binary.
    pub fn requires_inkscape(&self) -> bool {
        !matches!(self, ServerVariant::Dom)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServerVariant::Cli => "cli",
            ServerVariant::Dom => "dom",
            ServerVariant::Combined => "combined",
        }
    }

    fn instructions(&self) -> &'static str {
        match self {
            ServerVariant::Cli => {
                "Inkscape CLI server. Use action_list to discover available \
                 Inkscape actions and action_run to execute allowlisted actions \
                 on a workspace document, optionally exporting to png, pdf, or svg."
            }
            ServerVariant::Dom => {
                "Inkscape DOM server. Use dom_validate to check SVG structure, \
                 dom_set to edit attributes and styles via safe CSS selectors, \
                 and dom_clean to optimize a document. All paths are confined \
                 to the configured workspace."
            }
            ServerVariant::Combined => {
                "Combined Inkscape server. action_list/action_run drive a \
                 headless Inkscape process; dom_validate/dom_set/dom_clean edit \
                 SVG documents directly. All paths are confined to the \
                 configured workspace."
            }
        }
    }
}

impl FromStr for ServerVariant {
    type Err = InkscapeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "cli" => Ok(ServerVariant::Cli),
            "dom" => Ok(ServerVariant::Dom),
            "combined" => Ok(ServerVariant::Combined),
            other => Err(InkscapeError::Config(format!(
                "unknown server variant '{other}' (expected cli, dom, or combined)"
            ))),
        }
    }
}

/// The Inkscape MCP server. One implementation backs all three variants;
/// the variant only decides which tool router is installed and how the
/// server introduces itself.
#[derive(Clone)]
pub struct InkscapeMcpServer {
    pub(crate) config: Arc<InkscapeConfig>,
    pub(crate) runner: Arc<InkscapeRunner>,
    pub(crate) semaphore: Arc<Semaphore>,
    variant: ServerVariant,
    tool_router: ToolRouter<Self>,
}

impl InkscapeMcpServer {
    pub fn new(mut config: InkscapeConfig, variant: ServerVariant) -> Result<Self, InkscapeError> {
        config.ensure_workspace()?;
        let config = Arc::new(config);
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent));
        let runner = Arc::new(InkscapeRunner::new(config.clone(), semaphore.clone()));

        let tool_router = match variant {
            ServerVariant::Cli => build_cli_tool_router(),
            ServerVariant::Dom => build_dom_tool_router(),
            ServerVariant::Combined => build_cli_tool_router() + build_dom_tool_router(),
        };

        Ok(Self {
            config,
            runner,
            semaphore,
            variant,
            tool_router,
        })
    }

    pub fn variant(&self) -> ServerVariant {
        self.variant
    }

    pub(crate) fn workspace(&self) -> Result<Workspace, InkscapeError> {
        Workspace::new(&self.config)
    }

    /// Serves over stdio until the peer closes the transport.
    pub async fn run_stdio(self) -> Result<(), ServerInitializeError> {
        tracing::info!(
            variant = self.variant.as_str(),
            workspace = %self.config.workspace.display(),
            "serving MCP over stdio"
        );
        let service = self.serve(transport::io::stdio()).await?;

        // Hold the service open until the peer closes the transport.
        let _ = service.waiting().await;
        Ok(())
    }
}

#[tool_handler]
impl ServerHandler for InkscapeMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.variant.server_name().into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(self.variant.instructions().into()),
            ..ServerInfo::default()
        }
    }
}

/// Convenience entry point: builds the server for a variant and serves it
/// over stdio.
pub async fn run_stdio_server(
    config: InkscapeConfig,
    variant: ServerVariant,
) -> Result<(), ServerInitializeError> {
    let server = InkscapeMcpServer::new(config, variant)
        .map_err(|err| ServerInitializeError::InitializeFailed(to_mcp_error(err)))?;
    server.run_stdio().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn server(variant: ServerVariant) -> InkscapeMcpServer {
        let temp = tempdir().unwrap();
        let config = InkscapeConfig::new(temp.path().join("ws")).unwrap();
        InkscapeMcpServer::new(config, variant).unwrap()
    }

    #[test]
    fn variants_parse_from_strings() {
        assert_eq!("cli".parse::<ServerVariant>().unwrap(), ServerVariant::Cli);
        assert_eq!("dom".parse::<ServerVariant>().unwrap(), ServerVariant::Dom);
        assert_eq!(
            "combined".parse::<ServerVariant>().unwrap(),
            ServerVariant::Combined
        );
        assert!("gui".parse::<ServerVariant>().is_err());
    }

    #[test]
    fn variants_advertise_their_server_names() {
        assert_eq!(
            server(ServerVariant::Cli).get_info().server_info.name,
            "inkscape-cli"
        );
        assert_eq!(
            server(ServerVariant::Dom).get_info().server_info.name,
            "inkex-dom"
        );
        assert_eq!(
            server(ServerVariant::Combined).get_info().server_info.name,
            "inkscape-combined"
        );
    }

    #[test]
    fn only_the_dom_variant_skips_the_inkscape_requirement() {
        assert!(ServerVariant::Cli.requires_inkscape());
        assert!(ServerVariant::Combined.requires_inkscape());
        assert!(!ServerVariant::Dom.requires_inkscape());
    }

    #[test]
    fn tool_routers_match_the_variant() {
        assert_eq!(server(ServerVariant::Cli).tool_router.list_all().len(), 2);
        assert_eq!(server(ServerVariant::Dom).tool_router.list_all().len(), 3);
        assert_eq!(
            server(ServerVariant::Combined).tool_router.list_all().len(),
            5
        );
    }
}
