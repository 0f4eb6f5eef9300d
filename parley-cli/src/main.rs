mod join;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use parley::server::{Hub, ServerConfig, serve_with_shutdown};
use std::io::IsTerminal;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Room-scoped WebRTC signaling relay and test client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay
    Serve {
        #[arg(long, default_value = "0.0.0.0:5000")]
        addr: SocketAddr,

        #[arg(long, default_value = "/hub")]
        hub_path: String,
    },
    /// Join a room and take part in its calls
    Join {
        #[arg(short, long, default_value = "ws://127.0.0.1:5000/hub")]
        url: String,

        /// Room to join; prompted for when omitted
        #[arg(short, long)]
        room: Option<String>,

        /// Start a call right after joining
        #[arg(long)]
        call: bool,

        /// Hold the offer until a callee accepts
        #[arg(long)]
        offer_on_accept: bool,

        #[arg(long, default_value_t = 30)]
        heartbeat_secs: u64,

        #[arg(long = "ice-server")]
        ice_servers: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve { addr, hub_path } => serve(ServerConfig { addr, hub_path }).await,
        Commands::Join {
            url,
            room,
            call,
            offer_on_accept,
            heartbeat_secs,
            ice_servers,
        } => {
            let room = match room {
                Some(room) => room,
                None if !std::io::stdin().is_terminal() => {
                    bail!("--room is required when stdin is not a terminal")
                }
                None => dialoguer::Input::<String>::new()
                    .with_prompt("Room")
                    .interact_text()
                    .context("Failed to read room name")?,
            };
            join::run(join::JoinOptions {
                url,
                room,
                call,
                offer_on_accept,
                heartbeat: Duration::from_secs(heartbeat_secs),
                ice_servers,
            })
            .await
        }
    }
}

async fn serve(config: ServerConfig) -> Result<()> {
    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.addr))?;
    println!(
        "{} ws://{}{}",
        "Relay listening on".green().bold(),
        listener.local_addr()?,
        config.hub_path
    );

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    serve_with_shutdown(listener, Hub::default(), &config, shutdown).await?;

    println!("{}", "Relay stopped".yellow());
    Ok(())
}
