use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};

use pulse_core::{Indicator, Page, PageViewModel, PresentationSurface};
use pulse_engine::{EngineHandle, ReqwestStatusSource};
use pulse_logging::{pulse_debug, pulse_info, pulse_warn};

use crate::page_loader::{self, DEFAULT_PAGE};
use crate::settings::AppSettings;

const SCROLL_STEP: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Scrolling(Direction),
    Dwelling { remaining: Duration, then: Direction },
}

/// Simulated reader: lingers at the top, scrolls to the bottom, lingers,
/// scrolls back up, and so on.
#[derive(Debug, Clone)]
pub struct Visitor {
    offset: f64,
    max_scroll: f64,
    speed: f64,
    dwell: Duration,
    phase: Phase,
}

impl Visitor {
    pub fn new(max_scroll: f64, speed_px_per_sec: f64, dwell: Duration) -> Self {
        Self {
            offset: 0.0,
            max_scroll: max_scroll.max(0.0),
            speed: speed_px_per_sec,
            dwell,
            phase: Phase::Dwelling {
                remaining: dwell,
                then: Direction::Down,
            },
        }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Advances the visitor by `elapsed` and returns the new scroll offset.
    pub fn step(&mut self, elapsed: Duration) -> f64 {
        match self.phase {
            Phase::Dwelling { remaining, then } => {
                let remaining = remaining.saturating_sub(elapsed);
                self.phase = if remaining.is_zero() {
                    Phase::Scrolling(then)
                } else {
                    Phase::Dwelling { remaining, then }
                };
            }
            Phase::Scrolling(direction) => {
                let distance = self.speed * elapsed.as_secs_f64();
                let (offset, edge, next) = match direction {
                    Direction::Down => {
                        let offset = (self.offset + distance).min(self.max_scroll);
                        (offset, offset >= self.max_scroll, Direction::Up)
                    }
                    Direction::Up => {
                        let offset = (self.offset - distance).max(0.0);
                        (offset, offset <= 0.0, Direction::Down)
                    }
                };
                self.offset = offset;
                if edge {
                    self.phase = Phase::Dwelling {
                        remaining: self.dwell,
                        then: next,
                    };
                }
            }
        }
        self.offset
    }
}

/// One status line for the periodic render.
pub fn render_line(view: &PageViewModel) -> String {
    let indicator = match view.indicator {
        Some(Indicator::Online) => "online",
        Some(Indicator::Offline) => "offline",
        None => "checking",
    };
    format!(
        "[{}] metrics: {} | revealed {}/{} | counters {} | particles {} | polls in flight {} | failures {}",
        indicator,
        view.metrics.join(" / "),
        view.revealed_units,
        view.observed_units,
        view.running_counters,
        view.live_particles,
        view.polls_in_flight,
        view.consecutive_poll_failures
    )
}

/// Loads the page, runs the engine with a simulated visitor until ctrl-c or
/// the configured run time, and returns the final view.
pub async fn run(settings: AppSettings) -> anyhow::Result<PageViewModel> {
    let (width, height) = (settings.viewport_width, settings.viewport_height);
    let surface = match &settings.page {
        Some(path) => page_loader::load_file(path, width, height)?,
        None => page_loader::build_surface(DEFAULT_PAGE, width, height)?,
    };
    let max_scroll = surface.viewport().max_scroll();
    let page = Page::new(surface, settings.behavior.clone())?;
    let source = ReqwestStatusSource::new(settings.source_settings())?;
    pulse_info!(
        "Visiting page (max scroll {}px), polling {}",
        max_scroll,
        settings.status_url
    );

    let engine = EngineHandle::spawn(page, Arc::new(source));
    let mut visitor = Visitor::new(
        max_scroll,
        settings.scroll_speed_px_per_sec,
        settings.dwell(),
    );

    let mut scroll = time::interval(SCROLL_STEP);
    scroll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut render = time::interval(settings.render_interval());
    render.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let stop = stop_signal(settings.run_for());
    tokio::pin!(stop);

    let mut last_step = Instant::now();
    loop {
        tokio::select! {
            _ = &mut stop => break,
            now = scroll.tick() => {
                let offset = visitor.step(now.saturating_duration_since(last_step));
                last_step = now;
                engine.scroll_to(offset);
            }
            _ = render.tick() => pulse_info!("{}", render_line(&engine.view())),
        }
    }

    pulse_debug!("Visitor stopped at offset {}", visitor.offset());
    let page = engine.shutdown().await?;
    Ok(page.view())
}

async fn stop_signal(run_for: Option<Duration>) {
    match run_for {
        Some(limit) => {
            tokio::select! {
                _ = time::sleep(limit) => pulse_info!("Run time of {:?} elapsed", limit),
                _ = ctrl_c() => {}
            }
        }
        None => ctrl_c().await,
    }
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => pulse_info!("Interrupted, shutting down"),
        Err(err) => {
            pulse_warn!("Cannot listen for ctrl-c: {}", err);
            std::future::pending::<()>().await
        }
    }
}
