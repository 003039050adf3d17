use anyhow::Context;
use common::MetricsGuard;
use livetrack::PreviewSession;
use preview::{
    PreviewConfig, ReplayCamera, ReplayModel, load_recording, logging::setup_logging,
    spawn_overlay_logger,
};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag,
};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = PreviewConfig::from_env()?;
    setup_logging(&config);

    // Must exist before the session creates its instruments
    let metrics = config
        .otel_endpoint
        .as_ref()
        .map(|endpoint| MetricsGuard::init("preview", endpoint, Duration::from_secs(10)))
        .transpose()?;

    tracing::info!(config = ?config, "Loaded configuration");

    let shutdown = Arc::new(AtomicBool::new(false));
    flag::register(SIGTERM, Arc::clone(&shutdown))?;
    flag::register(SIGINT, Arc::clone(&shutdown))?;

    tracing::info!("Signal handlers registered (SIGTERM, SIGINT)");

    let frames = load_recording(&config.recording_path)
        .context("Failed to load recording - check RECORDING_PATH")?;

    let (session, receiver) = PreviewSession::<ReplayModel>::new(&config.engine)
        .context("Invalid engine configuration")?;
    let overlay = spawn_overlay_logger(receiver, Arc::clone(&shutdown));

    let camera = ReplayCamera::new(frames, &config);
    let camera_shutdown = Arc::clone(&shutdown);
    let result = tokio::task::spawn_blocking(move || {
        // Dropping the session closes the overlay channel
        let stats = camera.run(&session, &camera_shutdown);
        drop(session);
        stats
    })
    .await?;

    if let Some(metrics) = &metrics {
        metrics.flush();
    }

    let summary = overlay
        .join()
        .map_err(|_| anyhow::anyhow!("Overlay logger thread panicked"))?;

    match result {
        Ok(stats) => {
            tracing::info!(
                stats = ?stats,
                overlay_updates = summary.updates,
                last_sequence = ?summary.last_sequence,
                snapshot = summary.snapshot.len(),
                "Preview stopped gracefully"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Preview failed: {}", e);
            anyhow::bail!("Preview error: {}", e)
        }
    }
}
