use std::net::SocketAddr;

use clap::Parser;
use starbucks_provider::{init_logging, serve, serve_on, ServeError, StarbucksProvider};
use tracing::info;

/// Infrastructure provider plugin for the Starbucks Management API
#[derive(Parser, Debug)]
#[command(name = "starbucks-provider", version, about, long_about = None)]
struct Args {
    /// Log at debug level unless RUST_LOG is set
    #[arg(long)]
    debug: bool,

    /// Listen on a fixed address instead of an ephemeral localhost port
    #[arg(long)]
    address: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), ServeError> {
    let args = Args::parse();
    init_logging(args.debug);

    let provider = StarbucksProvider::new(env!("CARGO_PKG_VERSION"));
    info!(version = env!("CARGO_PKG_VERSION"), "Starting Starbucks provider");

    match args.address {
        Some(addr) => serve_on(provider, addr).await,
        None => serve(provider).await,
    }
}
