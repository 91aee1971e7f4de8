//! Bitbucket MCP server entry point.

use std::sync::Arc;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use bitbucket_client::{BitbucketApi, BitbucketClient, BitbucketConfig};
use bitbucket_mcp::config::{CliOverrides, ServerConfig, TransportKind};
use bitbucket_mcp::protocol::{AuthGuard, ProtocolHandler};
use bitbucket_mcp::tools::ToolRegistry;
use bitbucket_mcp::transport::StdioTransport;

#[derive(Parser)]
#[command(
    name = "bitbucket-mcp",
    about = "MCP server exposing Bitbucket Server operations as tools",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(flatten)]
    serve: ServeArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone, Default)]
struct ServeArgs {
    /// Serve over HTTP instead of stdio. Also enabled by ENABLE_HTTP_TRANSPORT.
    #[arg(long)]
    http: bool,

    /// Listen host [env: MCP_HTTP_HOST] [default: 127.0.0.1]
    #[arg(long)]
    host: Option<String>,

    /// Listen port [env: MCP_HTTP_PORT] [default: 3001]
    #[arg(long)]
    port: Option<u16>,

    /// JSON-RPC and stream endpoint path [env: MCP_HTTP_ENDPOINT] [default: /stream]
    #[arg(long)]
    endpoint: Option<String>,

    /// Shared secret required in the x-api-key header [env: MCP_API_KEY]
    #[arg(long)]
    api_key: Option<String>,

    /// Seconds between keep-alive comments on open streams [default: 30]
    #[arg(long)]
    keep_alive_secs: Option<u64>,
}

impl From<ServeArgs> for CliOverrides {
    fn from(args: ServeArgs) -> Self {
        CliOverrides {
            http: args.http,
            host: args.host,
            port: args.port,
            endpoint: args.endpoint,
            api_key: args.api_key,
            keep_alive_secs: args.keep_alive_secs,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server (default).
    Serve(ServeArgs),

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   bitbucket-mcp completions bash > ~/.local/share/bash-completion/completions/bitbucket-mcp
    ///   bitbucket-mcp completions zsh > ~/.zfunc/_bitbucket-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    // stdout carries the stdio transport's wire traffic.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "bitbucket-mcp", &mut std::io::stdout());
        }
        Some(Commands::Serve(args)) => serve(args).await?,
        None => serve(cli.serve).await?,
    }

    Ok(())
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = ServerConfig::resolve(&args.into())?;
    tracing::debug!(?config, "Resolved server configuration");

    let bitbucket = BitbucketConfig::from_env()?;
    tracing::info!(
        url = %bitbucket.base_url,
        default_project = bitbucket.default_project.as_deref().unwrap_or("none"),
        "Bitbucket MCP server starting"
    );
    let api: Arc<dyn BitbucketApi> = Arc::new(BitbucketClient::new(bitbucket)?);
    let tools = Arc::new(ToolRegistry::bitbucket(api)?);
    tracing::info!(tools = tools.len(), "Tool registry ready");

    match config.transport {
        TransportKind::Stdio => {
            if config.api_key.is_some() {
                tracing::info!("API key configured but not enforced on the stdio transport");
            }
            let handler = ProtocolHandler::new(tools, AuthGuard::open());
            StdioTransport::new(handler).run().await?;
        }
        TransportKind::Http => run_http(config, tools).await?,
    }

    Ok(())
}

#[cfg(feature = "http")]
async fn run_http(config: ServerConfig, tools: Arc<ToolRegistry>) -> anyhow::Result<()> {
    use bitbucket_mcp::transport::HttpTransport;

    let addr = config.listen_addr().await?;
    let auth = AuthGuard::new(config.api_key.clone());
    if auth.is_enforcing() {
        tracing::info!("Auth: x-api-key required for tools/call");
    }

    let handler = ProtocolHandler::new(tools, auth);
    let transport = HttpTransport::new(handler, config.endpoint.clone(), config.keep_alive);
    transport.run(addr).await?;
    Ok(())
}

#[cfg(not(feature = "http"))]
async fn run_http(_config: ServerConfig, _tools: Arc<ToolRegistry>) -> anyhow::Result<()> {
    anyhow::bail!("this build does not include the HTTP transport (enable the `http` feature)")
}
