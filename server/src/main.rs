use clap::Parser;
use log::{error, info};
use server::config::{ServerConfig, TeamFile};
use server::network::Server;
use shared::TeamCatalog;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Maximum number of connected players
    #[arg(short, long, default_value = "32")]
    max_clients: usize,

    /// JSON file with extra teams and operators
    #[arg(short, long, default_value = "teams.json")]
    teams: PathBuf,

    /// Player allowed to move others between teams (repeatable)
    #[arg(short, long)]
    operator: Vec<String>,

    /// Secret operators must present when connecting
    #[arg(long)]
    operator_token: Option<String>,

    /// Seconds of silence before a client is dropped
    #[arg(long, default_value = "5")]
    client_timeout: u64,

    /// Do not resend the roster when a player with a team leaves
    #[arg(long)]
    no_disconnect_broadcast: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let team_file = TeamFile::load(&args.teams)?;
    let catalog = TeamCatalog::from_config(team_file.teams);

    let mut operators = team_file.operators;
    operators.extend(args.operator);

    let config = ServerConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        max_clients: args.max_clients,
        client_timeout: Duration::from_secs(args.client_timeout),
        broadcast_on_disconnect: !args.no_disconnect_broadcast,
        operators,
        operator_token: args.operator_token,
    };

    info!("Starting team server on {}", config.bind_addr);
    info!("Max clients: {}", config.max_clients);
    info!("Operators: {}", config.operators.join(", "));

    let mut server = Server::new(&config, catalog).await?;

    let handle = server.handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down gracefully...");
                handle.shutdown();
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    server.run().await?;

    Ok(())
}
