//! `toolsmith-sandbox-server` binary.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use toolsmith_sandbox_server::{AppState, ServerConfig, ServerError, install_assets, router};

/// Serve toolsmith actions and function runs over HTTP.
#[derive(Debug, Parser)]
#[command(name = "toolsmith-sandbox-server", version, about)]
struct Args {
    /// Address to bind.
    #[arg(long, env = "TOOLSMITH_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to bind.
    #[arg(long, env = "TOOLSMITH_PORT", default_value_t = 8000)]
    port: u16,

    /// Workspace root.
    #[arg(long, env = "TOOLSMITH_WORKSPACE_DIR", default_value = "/workspace")]
    workspace_dir: PathBuf,

    /// Mounted input data.
    #[arg(long, env = "TOOLSMITH_MOUNT_DIR", default_value = "/mount")]
    mount_dir: PathBuf,

    /// Where the runner assets are installed.
    #[arg(long, env = "TOOLSMITH_TOOLMAKER_DIR", default_value = "/toolmaker")]
    toolmaker_dir: PathBuf,

    /// Python interpreter for function runs.
    #[arg(long, env = "TOOLSMITH_PYTHON", default_value = "python")]
    python: String,

    /// Do not mirror command output to stdout.
    #[arg(long, env = "TOOLSMITH_NO_MIRROR")]
    no_mirror: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = serve(Args::parse()).await {
        eprintln!("toolsmith-sandbox-server error: {err}");
        std::process::exit(1);
    }
}

async fn serve(args: Args) -> Result<(), ServerError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new("info").map_err(|e| ServerError::LogFilter(e.to_string()))?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    install_assets(&args.toolmaker_dir).await?;
    let config = ServerConfig::new(args.workspace_dir, args.mount_dir, args.toolmaker_dir)
        .interpreter(args.python)
        .mirror(!args.no_mirror);
    let app = router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "sandbox server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
