//! Palisade CLI entry point.

use std::path::PathBuf;

use clap::Parser;

use palisade_gateway::Gateway;

/// A sanitizing MCP gateway: one endpoint in front of many MCP servers.
#[derive(Parser)]
#[command(name = "palisade", version)]
struct Cli {
    /// Path to the JSON config file.
    #[arg(default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    let cfg = match palisade_types::loader::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("config: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = Gateway::new(cfg).run().await {
        tracing::error!(error = %e, "gateway failed");
        eprintln!("gateway: {e}");
        std::process::exit(1);
    }
}

/// Initialise the tracing subscriber with stderr output.
///
/// Logs must never touch stdout: on the stdio transport it carries the
/// MCP stream. Filtering follows `RUST_LOG`.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}
