//! Scribble game server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin scribble-server
//! cargo run --bin scribble-server -- --host 0.0.0.0 --port 5000 --max-players 12
//! SCRIBBLE_ALLOWED_ORIGINS=https://a.example,https://b.example cargo run --bin scribble-server
//! ```

use clap::Parser;
use scribble::logging::init_tracing;
use scribble::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "scribble-server")]
#[command(about = "Real-time multiplayer drawing game server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "SCRIBBLE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "SCRIBBLE_PORT", default_value_t = 5000)]
    port: u16,

    /// Maximum number of players per room, not counting the admin
    #[arg(long, env = "SCRIBBLE_MAX_PLAYERS", default_value_t = RoomConfig::DEFAULT_MAX_PLAYERS)]
    max_players: usize,

    /// Browser origin allowed to connect; repeat for several. Allows all when unset
    #[arg(
        long = "allowed-origin",
        env = "SCRIBBLE_ALLOWED_ORIGINS",
        value_delimiter = ','
    )]
    allowed_origins: Vec<String>,
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl+C"),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let server = match ScribbleServer::builder()
        .bind(&addr)
        .max_players(args.max_players)
        .allowed_origins(args.allowed_origins)
        .build()
        .await
    {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to start server");
            std::process::exit(1);
        }
    };

    tracing::info!("Press Ctrl+C to shutdown gracefully");
    if let Err(e) = server.run_until(shutdown_signal()).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
    tracing::info!("server shutdown complete");
}
