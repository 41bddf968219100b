//! signalhub relay server binary

use std::net::SocketAddr;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use signalhub_relay_server::{RelayConfig, RelayServerBuilder, ServerConfig};

#[derive(Parser, Debug)]
#[command(
    name = "signalhub-relay-server",
    version,
    about = "WebRTC signaling relay and room membership coordinator"
)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3001")]
    bind: SocketAddr,

    /// Chat messages retained per room
    #[arg(long, default_value_t = 100)]
    chat_log_cap: usize,

    /// Signaling messages retained per room
    #[arg(long, default_value_t = 50)]
    signal_log_cap: usize,

    /// Signaling freshness window in milliseconds
    #[arg(long, default_value_t = 300_000)]
    signal_freshness_ms: u64,

    /// Participant liveness window in milliseconds
    #[arg(long, default_value_t = 30_000)]
    participant_liveness_ms: u64,

    /// Idle lifetime of an empty room in milliseconds
    #[arg(long, default_value_t = 7_200_000)]
    room_max_idle_ms: u64,

    /// Reaper sweep cadence in milliseconds
    #[arg(long, default_value_t = 300_000)]
    reap_interval_ms: u64,

    /// Disable permissive CORS
    #[arg(long)]
    no_cors: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_filter: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&args.log_filter)),
        )
        .init();

    let relay = RelayConfig::default()
        .with_chat_log_cap(args.chat_log_cap)
        .with_signal_log_cap(args.signal_log_cap)
        .with_signal_freshness_ms(args.signal_freshness_ms)
        .with_participant_liveness_ms(args.participant_liveness_ms)
        .with_room_max_idle_ms(args.room_max_idle_ms)
        .with_reap_interval_ms(args.reap_interval_ms);
    let config = ServerConfig::default()
        .with_bind_addr(args.bind)
        .with_cors_permissive(!args.no_cors)
        .with_relay(relay);

    info!("signalhub relay server v{}", env!("CARGO_PKG_VERSION"));
    let server = RelayServerBuilder::new().with_config(config).build().await?;
    server.run().await?;

    info!("goodbye");
    Ok(())
}
