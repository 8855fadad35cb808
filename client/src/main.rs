use clap::Parser;
use client::bot::Wanderer;
use client::config::ClientConfig;
use client::mirror::{ClientWorld, LocalPlayer};
use client::network::{Requester, Subscriber};
use client::reconcile::LocalEvent;
use log::{error, info, warn};
use shared::{ChannelError, Position, WorldSpec, DEFAULT_PUBLISH_PORT, DEFAULT_REPLY_PORT};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Player name, unique among connected clients
    #[arg(short, long)]
    name: String,

    /// Authority host
    #[arg(short = 's', long, default_value = "127.0.0.1")]
    server: String,

    /// Port of the authority's request/reply endpoint
    #[arg(long, default_value_t = DEFAULT_REPLY_PORT)]
    reply_port: u16,

    /// Port of the authority's broadcast endpoint
    #[arg(long, default_value_t = DEFAULT_PUBLISH_PORT)]
    publish_port: u16,

    /// Milliseconds per frame
    #[arg(short, long, default_value = "16")]
    frame_ms: u64,

    /// Bounded wait for each acknowledgment
    #[arg(long, default_value = "500")]
    request_timeout_ms: u64,

    /// Evict remote players not seen for this many milliseconds (0 disables)
    #[arg(long, default_value = "5000")]
    mirror_timeout_ms: u64,

    /// Level description (TOML); must match the authority's
    #[arg(short, long)]
    world: Option<PathBuf>,

    /// Seed for the random walk
    #[arg(long)]
    seed: Option<u64>,
}

fn log_events(events: &[LocalEvent]) {
    for event in events {
        match event {
            LocalEvent::PlayerJoined { name } => info!("Now mirroring {}", name),
            LocalEvent::PlayerLeft { name } => info!("Stopped mirroring {}", name),
        }
    }
}

async fn run_frames(
    config: &ClientConfig,
    world: &mut ClientWorld,
    requester: &Requester,
    subscriber: &mut Subscriber,
    seed: Option<u64>,
) -> Result<(), ChannelError> {
    let mut wanderer = Wanderer::new(seed);
    let mut frames = interval(config.frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let dt = config.frame_interval.as_secs_f64();

    loop {
        frames.tick().await;

        for payload in subscriber.drain()? {
            let report = world.apply_payload(&payload);
            log_events(&report.events);
        }

        if let Some(max_age) = config.mirror_timeout {
            world.evict_stale(max_age);
        }

        let next = wanderer.step(world.local().position, dt);
        world.move_local(next);

        match requester.send_state(&world.local().state()).await {
            Ok(_) => {}
            Err(ChannelError::Timeout(wait)) => warn!("No ack within {:?}", wait),
            Err(e) => return Err(e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = ClientConfig {
        server: args.server,
        reply_port: args.reply_port,
        publish_port: args.publish_port,
        frame_interval: Duration::from_millis(args.frame_ms),
        request_timeout: Duration::from_millis(args.request_timeout_ms),
        mirror_timeout: (args.mirror_timeout_ms > 0)
            .then(|| Duration::from_millis(args.mirror_timeout_ms)),
        world: WorldSpec::load_or_default(args.world.as_deref())?,
        ..ClientConfig::new(&args.name)
    };
    config.validate()?;

    info!("Starting client {}", config.name);
    info!("Reply endpoint: {}", config.reply_addr());
    info!("Broadcast endpoint: {}", config.publish_addr());

    let requester = Requester::connect(&config.reply_addr(), config.request_timeout).await?;
    let mut subscriber = Subscriber::spawn(&config.publish_addr(), config.keepalive).await?;

    let local = LocalPlayer::new(&config.name, Position::new(100.0, 100.0));
    let mut world = ClientWorld::new(local, &config.world);

    tokio::select! {
        result = run_frames(&config, &mut world, &requester, &mut subscriber, args.seed) => {
            if let Err(e) = result {
                error!("Session ended: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, leaving");
        }
    }

    world.deactivate_local();
    if let Err(e) = requester.send_state(&world.local().state()).await {
        warn!("Failed to announce departure: {}", e);
    }
    subscriber.unsubscribe().await?;

    Ok(())
}
