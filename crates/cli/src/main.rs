//! Storefront command line client.

use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod add_product;
mod error;

#[derive(Debug, Parser)]
#[command(name = "storefront", about = "Storefront CLI", long_about = None)]
struct Cli {
    /// Base URL of the storefront API
    #[arg(long, global = true, env = "API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Bearer token sent with every request
    #[arg(long, global = true, env = "API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Add a new product
    AddProduct(add_product::AddProductArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        eprintln!("{error}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), error::CliError> {
    let client = reqwest::Client::new();
    match cli.command {
        Commands::AddProduct(args) => {
            add_product::run(&client, &cli.api_url, cli.token.as_deref(), args).await
        }
    }
}
