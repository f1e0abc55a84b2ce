use clap::Parser;
use client::console::HELP;
use client::network::Client;
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Display name to join with
    #[arg(short = 'n', long)]
    name: String,

    /// Operator token, needed to move players between teams
    #[arg(long)]
    operator_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    println!("{}", HELP);

    let mut client = Client::new(&args.server, &args.name)
        .await?
        .with_operator_token(args.operator_token);

    client.run().await?;

    Ok(())
}
