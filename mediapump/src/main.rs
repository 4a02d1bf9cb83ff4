//! mediapump demo binary
//!
//! Runs the decode pump against a synthetic media stream and walks it
//! through the full command set: prime, play, pause, rewind while paused,
//! play to end of stream, shut down.

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediapump::config::Config;
use mediapump::events::{EventSink, PumpEvent};
use mediapump::media::SyntheticSession;
use mediapump::player::Player;

/// Command-line arguments for mediapump
#[derive(Parser, Debug)]
#[command(name = "mediapump")]
#[command(about = "Streaming decode/render pump demo")]
#[command(version)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "MEDIAPUMP_CONFIG")]
    config: Option<PathBuf>,

    /// Frames the synthetic stream produces (overrides the config file)
    #[arg(long)]
    frames: Option<u32>,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mediapump=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config =
        Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(frames) = args.frames {
        config.demo_frames = frames;
    }

    info!(
        "Starting mediapump demo: {} frames at {}us intervals",
        config.demo_frames, config.demo_frame_interval_us
    );

    let session = SyntheticSession::from_config(&config);
    let probe = session.probe();

    let (event_tx, event_rx) = mpsc::channel();
    let player = Player::start(Box::new(session), &config, EventSink::new(event_tx))
        .context("Failed to start playback pipeline")?;

    // Priming shows the opening frame; give it a beat before playing.
    thread::sleep(Duration::from_millis(100));

    player.play().context("play")?;
    thread::sleep(Duration::from_millis(500));

    player.pause().context("pause")?;
    thread::sleep(Duration::from_millis(200));

    // Rewind while paused: one fresh frame at the start, still paused.
    player.rewind().context("rewind")?;
    thread::sleep(Duration::from_millis(200));

    player.play().context("play after rewind")?;

    // Let the stream run out.
    loop {
        match event_rx.recv_timeout(Duration::from_secs(60)) {
            Ok(PumpEvent::EndOfStream) => break,
            Ok(event) => info!("event: {:?}", event),
            Err(e) => {
                info!("gave up waiting for end of stream: {}", e);
                break;
            }
        }
    }

    player.shutdown();

    info!("Demo finished: {} frames rendered", probe.rendered());
    Ok(())
}
