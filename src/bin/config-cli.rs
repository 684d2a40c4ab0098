use clap::{Parser, Subcommand};
use serde_json::Value;

use server_config::http::{CLIENT_CONFIG_PATH, CLIENT_CONFIG_STATUS_PATH};

#[derive(Parser)]
#[command(name = "config-cli")]
#[command(about = "Query a running server-config instance", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8065")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the public client configuration
    Client,
    /// Show which file the live configuration came from
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let path = match cli.command {
        Commands::Client => CLIENT_CONFIG_PATH,
        Commands::Status => CLIENT_CONFIG_STATUS_PATH,
    };

    let res = client
        .get(format!("{}{}", cli.url.trim_end_matches('/'), path))
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {status}");
        if let Ok(text) = res.text().await {
            eprintln!("Response: {text}");
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
