use std::env;
use std::path::PathBuf;

use inkscape_mcp::InkscapeConfig;
use inkscape_mcp_server::{ServerVariant, init_tracing, run_stdio_server};

#[tokio::main]
async fn main() {
    init_tracing();

    let mut args = env::args().skip(1);
    let mut workspace: Option<PathBuf> = None;
    let mut variant = ServerVariant::Combined;

    while let Some(arg) = args.next() {
        if let Some(path) = arg.strip_prefix("--workspace=") {
            workspace = Some(PathBuf::from(path));
        } else if arg == "--workspace" {
            match args.next() {
                Some(path) => workspace = Some(PathBuf::from(path)),
                None => {
                    eprintln!("--workspace requires a path argument");
                    std::process::exit(1);
                }
            }
        } else if let Some(value) = arg.strip_prefix("--variant=") {
            variant = parse_variant(value);
        } else if arg == "--variant" {
            match args.next() {
                Some(value) => variant = parse_variant(&value),
                None => {
                    eprintln!("--variant requires cli, dom, or combined");
                    std::process::exit(1);
                }
            }
        } else {
            eprintln!("unknown argument: {arg}");
            std::process::exit(1);
        }
    }

    let config = match workspace {
        Some(path) => InkscapeConfig::from_env_with_workspace(path),
        None => InkscapeConfig::from_env(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            eprintln!("inkscape-mcp-server: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run_stdio_server(config, variant).await {
        eprintln!("inkscape-mcp-server failed: {err}");
        std::process::exit(1);
    }
}

fn parse_variant(value: &str) -> ServerVariant {
    match value.parse() {
        Ok(variant) => variant,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
