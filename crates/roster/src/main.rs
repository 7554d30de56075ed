//! # roster
//!
//! Presence service binary. `serve` runs the HTTP/WebSocket server;
//! `disconnect` handles a single gateway disconnect event and prints the
//! handler response.

#![deny(unsafe_code)]

mod wiring;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use roster_server::{GatewayEvent, RosterServer, ServerConfig};
use roster_settings::{Deployment, RosterSettings};

/// Roster presence service.
#[derive(Parser, Debug)]
#[command(name = "roster", about = "Presence registry and departure broadcast service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP + WebSocket server.
    Serve {
        /// Host to bind (overrides settings).
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides settings).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Handle one disconnect and print the `{statusCode, body}` response.
    #[command(group(ArgGroup::new("target").required(true).args(["connection_id", "event"])))]
    Disconnect {
        /// Connection id to disconnect.
        #[arg(long)]
        connection_id: Option<String>,
        /// Gateway event JSON file, or `-` for stdin.
        #[arg(long)]
        event: Option<PathBuf>,
    },
}

/// Load settings and validate the deployment before doing any work.
fn load() -> Result<(RosterSettings, Deployment)> {
    let settings = roster_settings::load_settings().context("Failed to load settings")?;
    roster_core::logging::init_subscriber(&settings.logging.level, settings.logging.json);
    let deployment = settings.resolve().context("Invalid deployment configuration")?;
    tracing::info!(registry = %deployment.registry, gateway = %deployment.gateway, "deployment resolved");
    Ok((settings, deployment))
}

fn read_event(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        let _ = std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read event from stdin")?;
        Ok(buf)
    } else {
        std::fs::read(path).with_context(|| format!("Failed to read event file {}", path.display()))
    }
}

async fn serve(host: Option<String>, port: Option<u16>) -> Result<ExitCode> {
    let (settings, deployment) = load()?;
    let services = wiring::build_services(&settings, &deployment, wiring::Role::Server)?;
    let metrics = roster_server::metrics::install_recorder().context("Failed to install metrics recorder")?;

    let mut config = ServerConfig::from_settings(&settings);
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    let server = RosterServer::new(config, services.handler, services.local, Some(metrics));
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("roster listening on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server.shutdown().graceful_shutdown(vec![handle], None).await;
    tracing::info!("Shutdown complete");
    Ok(ExitCode::SUCCESS)
}

async fn disconnect(connection_id: Option<String>, event: Option<PathBuf>) -> Result<ExitCode> {
    let (settings, deployment) = load()?;
    let services = wiring::build_services(&settings, &deployment, wiring::Role::OneShot)?;

    let response = match (connection_id, event) {
        (Some(id), _) => services.handler.handle_event(&GatewayEvent::disconnect(id)).await,
        (None, Some(path)) => services.handler.handle_json(&read_event(&path)?).await,
        (None, None) => anyhow::bail!("either --connection-id or --event is required"),
    };

    println!("{}", serde_json::to_string(&response)?);
    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    match Cli::parse().command {
        Command::Serve { host, port } => serve(host, port).await,
        Command::Disconnect {
            connection_id,
            event,
        } => disconnect(connection_id, event).await,
    }
}
