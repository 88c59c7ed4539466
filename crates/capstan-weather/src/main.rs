// ABOUTME: CLI entry point for the capstan-weather sample MCP server
// ABOUTME: Parses arguments, selects transport (stdio or HTTP), and starts serving

// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;

use capstan::{HttpTransport, McpError, McpServer, McpTransport, StdioTransport};
use capstan::protocol::ServerInfo;
use clap::Parser;

use capstan_weather::{build_registry, build_services};

/// Sample MCP server exposing weather tools, prompts, and resources
#[derive(Parser)]
#[command(name = "capstan-weather", version, about)]
struct Cli {
    /// Transport mode: "stdio" for stdin/stdout or "http" for HTTP+SSE
    #[arg(long, default_value = "stdio")]
    transport: String,

    /// HTTP listen port (only used with --transport http)
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// HTTP listen host (only used with --transport http)
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr to keep stdout clean for stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let registry = build_registry()?;
    let server = Arc::new(McpServer::new(
        registry,
        build_services(),
        ServerInfo::new("capstan-weather", env!("CARGO_PKG_VERSION")),
    ));

    tracing::info!(transport = %cli.transport, "Starting weather MCP server");

    match cli.transport.as_str() {
        "stdio" => {
            StdioTransport.serve(server).await?;
        }
        "http" => {
            HttpTransport::new(cli.host, cli.port).serve(server).await?;
        }
        other => {
            return Err(McpError::configuration(format!(
                "Unknown transport: {other}. Valid: stdio, http"
            ))
            .into());
        }
    }

    Ok(())
}
