//! Headless host for the landing page: loads an HTML page, runs the engine
//! against the live status endpoint and simulates a visitor scrolling it.

mod page_loader;
mod settings;
mod visitor;

use anyhow::Context;
use pulse_logging::{pulse_info, LogDestination};

use settings::AppSettings;

fn main() -> anyhow::Result<()> {
    let (settings, origin) = AppSettings::load()?;
    pulse_logging::initialize(LogDestination::Both, settings.level());
    settings.log_summary(&origin);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    let view = runtime.block_on(visitor::run(settings))?;

    pulse_info!("Final metrics: {}", view.metrics.join(" / "));
    pulse_info!(
        "Final status: {} ({} particles spawned, {} failed polls in a row)",
        view.health(),
        view.particles_spawned,
        view.consecutive_poll_failures
    );
    Ok(())
}
