//! Actions MCP - Declarative project actions over MCP
//!
//! Loads a YAML config of developer-defined commands and prompts, validates
//! it, and serves the result over stdio. Fails fast on config or environment
//! problems; once serving, every failure is a structured per-call error.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rmcp::ServiceExt;

use actions_mcp::{ActionsMcpServer, EnvSnapshot, ProjectSandbox, ServerConfig};

#[derive(Parser)]
#[command(name = "actions-mcp")]
#[command(about = "Serve project-defined actions and prompts over MCP")]
#[command(version)]
struct Cli {
    /// Path to the actions config file
    #[arg(default_value = "./actions_mcp.yaml")]
    config_path: PathBuf,

    /// Project root to run actions in (defaults to the current directory)
    #[arg(short = 'w', long)]
    working_directory: Option<PathBuf>,

    /// Do not expose the get_prompt tool, regardless of config
    #[arg(long)]
    disable_prompt_tool: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    mcp_common::init_tracing("actions_mcp")?;

    if let Some(dir) = &cli.working_directory {
        std::env::set_current_dir(dir)
            .with_context(|| format!("cannot change to working directory {}", dir.display()))?;
    }

    let project_root = std::env::current_dir().context("cannot determine working directory")?;
    let sandbox = ProjectSandbox::new(&project_root)
        .with_context(|| format!("invalid project root {}", project_root.display()))?;

    let config_path = cli
        .config_path
        .canonicalize()
        .with_context(|| format!("config file not found: {}", cli.config_path.display()))?;
    let dotenv_path = config_path
        .parent()
        .map(|dir| dir.join(".env"))
        .filter(|p| p.is_file());

    let env = EnvSnapshot::capture(dotenv_path.as_deref())?;
    let config = ServerConfig::load(&config_path, &sandbox)?;

    // Startup gate: a misconfigured environment should fail here, not on the
    // first tool call.
    config.check_required_env(&env)?;

    tracing::info!(
        server = %config.server_name,
        actions = config.actions.len(),
        prompts = config.prompts.len(),
        root = %sandbox.root().display(),
        "starting actions-mcp"
    );

    let server = ActionsMcpServer::new(config, env, sandbox, cli.disable_prompt_tool);
    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .context("failed to start MCP server")?;
    service.waiting().await?;

    Ok(())
}
