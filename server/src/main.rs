use clap::Parser;
use log::{error, info};
use server::config::AuthorityConfig;
use server::network::Authority;
use shared::{WorldSpec, DEFAULT_PUBLISH_PORT, DEFAULT_REPLY_PORT};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind both endpoints to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port of the request/reply endpoint
    #[arg(long, default_value_t = DEFAULT_REPLY_PORT)]
    reply_port: u16,

    /// Port of the broadcast endpoint
    #[arg(long, default_value_t = DEFAULT_PUBLISH_PORT)]
    publish_port: u16,

    /// Milliseconds between snapshots
    #[arg(short, long, default_value = "10")]
    tick_ms: u64,

    /// Drop sessions silent for this many milliseconds (0 disables)
    #[arg(long, default_value = "5000")]
    session_timeout_ms: u64,

    /// Drop subscribers without a keepalive for this many milliseconds
    #[arg(long, default_value = "5000")]
    subscriber_timeout_ms: u64,

    /// Level description (TOML); the built-in level is used when omitted
    #[arg(short, long)]
    world: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = AuthorityConfig {
        host: args.host,
        reply_port: args.reply_port,
        publish_port: args.publish_port,
        tick_interval: Duration::from_millis(args.tick_ms),
        session_timeout: (args.session_timeout_ms > 0)
            .then(|| Duration::from_millis(args.session_timeout_ms)),
        subscriber_timeout: Duration::from_millis(args.subscriber_timeout_ms),
        world: WorldSpec::load_or_default(args.world.as_deref())?,
    };

    info!(
        "Starting authority: reply {}, broadcast {}, tick {:?}",
        config.reply_addr(),
        config.publish_addr(),
        config.tick_interval
    );

    let authority = match Authority::bind(config).await {
        Ok(authority) => authority,
        Err(e) => {
            error!("Failed to start authority: {}", e);
            return Err(e);
        }
    };

    tokio::select! {
        _ = authority.run() => {
            error!("Authority stopped unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
