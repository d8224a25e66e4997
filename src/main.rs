//! Pelorus bridge controller: capture thread, publish loop, shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser as _;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pelorus::capture::source::StreamProfile;
use pelorus::capture::{worker, FrameSource};
use pelorus::cli::Cli;
use pelorus::pipeline::FrameSlot;
use pelorus::publish::zenoh_sink::ZenohSink;
use pelorus::{publish, Config};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("pelorus launching...");

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    if !config.publish.color && !config.publish.depth {
        warn!("no streams enabled, the bridge will capture but publish nothing");
    }

    let mut zenoh_config = zenoh::Config::default();
    if !config.bus.connect.is_empty() {
        let endpoints = config
            .bus
            .connect
            .iter()
            .map(|e| format!("\"{e}\""))
            .collect::<Vec<_>>()
            .join(", ");
        zenoh_config
            .insert_json5("connect/endpoints", &format!("[{endpoints}]"))
            .map_err(|e| eyre!("failed to set connect endpoints: {e}"))?;
    }

    info!("opening zenoh session...");
    let session = zenoh::open(zenoh_config)
        .await
        .map_err(|e| eyre!("failed to open zenoh session: {e}"))?;

    let sink = ZenohSink::new(&session, &config.bus, &config.publish)
        .map_err(|e| eyre!("failed to declare publishers: {e}"))?;

    let slot = Arc::new(FrameSlot::new());
    let shutdown = Arc::new(AtomicBool::new(false));

    let profile = StreamProfile {
        width: config.camera.width,
        height: config.camera.height,
        fps: config.camera.fps,
    };
    let source = make_source()?;

    // Capture loop on its own thread; the device wait is blocking.
    let capture_slot = Arc::clone(&slot);
    let capture_shutdown = Arc::clone(&shutdown);
    let mut capture_task = tokio::task::spawn_blocking(move || {
        worker::run(source, profile, capture_slot, capture_shutdown)
    });

    // Publish loop, also blocking: polling sleep plus synchronous puts.
    let publish_slot = Arc::clone(&slot);
    let publish_shutdown = Arc::clone(&shutdown);
    let publish_options = config.publish.clone();
    let publish_task = tokio::task::spawn_blocking(move || {
        publish::run(publish_slot, sink, &publish_options, publish_shutdown)
    });

    let mut exit = Ok(());
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("closing down on user request");
        }
        res = &mut capture_task => {
            match res {
                Ok(Ok(())) => info!("capture loop exited"),
                Ok(Err(e)) => {
                    error!("capture loop failed: {e}");
                    exit = Err(eyre!("capture loop failed: {e}"));
                }
                Err(e) => {
                    error!("capture task panicked: {e}");
                    exit = Err(eyre!("capture task panicked: {e}"));
                }
            }
        }
    }

    shutdown.store(true, Ordering::Relaxed);
    if !capture_task.is_finished() {
        if let Err(e) = capture_task.await {
            warn!("capture task did not join cleanly: {e}");
        }
    }
    if let Err(e) = publish_task.await {
        warn!("publish task did not join cleanly: {e}");
    }

    if let Err(e) = session.close().await {
        warn!("failed to close zenoh session: {e}");
    }

    let (deposits, withdrawals, overwrites) = slot.stats();
    info!(deposits, withdrawals, overwrites, "pelorus shut down");
    exit
}

#[cfg(feature = "realsense")]
fn make_source() -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(
        pelorus::capture::realsense::RealSenseSource::new()?,
    ))
}

#[cfg(not(feature = "realsense"))]
fn make_source() -> Result<Box<dyn FrameSource>> {
    warn!("built without the realsense feature, using the synthetic source");
    Ok(Box::new(pelorus::capture::SyntheticSource::new()))
}
