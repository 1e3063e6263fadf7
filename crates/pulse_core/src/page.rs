use std::collections::HashMap;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use pulse_logging::{pulse_debug, pulse_info};

use crate::config::{ConfigError, PageConfig};
use crate::counter::CounterAnimator;
use crate::particles::ParticleSystem;
use crate::reveal::RevealController;
use crate::scheduler::{Scheduler, Task, TimerHandle};
use crate::status::StatusPoller;
use crate::surface::{ElementId, PresentationSurface};
use crate::{Effect, Msg, PageViewModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Default)]
struct PageTimers {
    observer: Option<TimerHandle>,
    frame: Option<TimerHandle>,
    particles: Option<TimerHandle>,
    poll: Option<TimerHandle>,
    expiries: HashMap<ElementId, TimerHandle>,
}

/// Owns the surface and every page behaviour, and is the single place timers
/// are armed and torn down.
///
/// All work runs to completion inside [`Page::update`]; hosts drive it with
/// [`Msg::Tick`] whenever [`Page::next_deadline`] passes and execute the
/// returned [`Effect`]s.
pub struct Page<S> {
    surface: S,
    config: PageConfig,
    rng: StdRng,
    scheduler: Scheduler,
    timers: PageTimers,
    reveal: Option<RevealController>,
    counters: CounterAnimator,
    particles: ParticleSystem,
    status: StatusPoller,
    lifecycle: Lifecycle,
    now: Duration,
}

impl<S: PresentationSurface> Page<S> {
    pub fn new(surface: S, config: PageConfig) -> Result<Self, ConfigError> {
        Self::with_rng(surface, config, StdRng::from_os_rng())
    }

    pub fn with_rng(surface: S, config: PageConfig, rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            particles: ParticleSystem::new(config.particles.clone(), None),
            status: StatusPoller::new(&config),
            surface,
            config,
            rng,
            scheduler: Scheduler::new(),
            timers: PageTimers::default(),
            reveal: None,
            counters: CounterAnimator::new(),
            lifecycle: Lifecycle::Idle,
            now: Duration::ZERO,
        })
    }

    pub fn update(&mut self, msg: Msg) -> Vec<Effect> {
        match msg {
            Msg::Start { now } => self.start(now),
            Msg::Tick { now } => self.advance(now),
            Msg::Scrolled { offset } => {
                self.surface.set_scroll_offset(offset);
                Vec::new()
            }
            Msg::StatusFetched { request, outcome } => {
                if self.lifecycle != Lifecycle::Running {
                    pulse_debug!("dropping status request={} after shutdown", request.0);
                    return Vec::new();
                }
                let overwritten = self.status.apply(&mut self.surface, request, outcome);
                for element in overwritten {
                    self.counters.cancel(element);
                }
                Vec::new()
            }
            Msg::Shutdown => self.shutdown(),
        }
    }

    /// Earliest pending timer, or `None` when nothing is scheduled.
    pub fn next_deadline(&self) -> Option<Duration> {
        match self.lifecycle {
            Lifecycle::Running => self.scheduler.next_deadline(),
            Lifecycle::Idle | Lifecycle::Stopped => None,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn reveal(&self) -> Option<&RevealController> {
        self.reveal.as_ref()
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.active_count()
    }

    pub fn view(&self) -> PageViewModel {
        let metrics = self
            .status
            .metric_slots(&self.surface)
            .into_iter()
            .filter_map(|element| self.surface.text(element))
            .collect();
        PageViewModel {
            lifecycle: self.lifecycle,
            indicator: self.status.indicator(),
            snapshot: self.status.snapshot(),
            metrics,
            observed_units: self.reveal.as_ref().map_or(0, RevealController::observed_count),
            revealed_units: self.reveal.as_ref().map_or(0, RevealController::revealed_count),
            running_counters: self.counters.running_count(),
            live_particles: self.particles.live_count(),
            particles_spawned: self.particles.spawned_total(),
            polls_in_flight: self.status.in_flight(),
            consecutive_poll_failures: self.status.consecutive_failures(),
        }
    }

    fn start(&mut self, now: Duration) -> Vec<Effect> {
        if self.lifecycle != Lifecycle::Idle {
            pulse_debug!("start ignored in {:?}", self.lifecycle);
            return Vec::new();
        }
        self.lifecycle = Lifecycle::Running;
        self.now = now;

        let selectors = &self.config.selectors;
        let layer = self.surface.query(&selectors.particle_layer);
        self.particles = ParticleSystem::new(self.config.particles.clone(), layer);
        self.reveal = Some(RevealController::observe(
            &mut self.surface,
            selectors,
            self.config.reveal.clone(),
        ));

        // Initial intersection pass, then once per frame while anything is hidden.
        self.check_reveals(now);
        if self.reveal.as_ref().is_some_and(RevealController::is_active) {
            self.timers.observer = Some(self.scheduler.every(
                now,
                self.config.frame_interval(),
                Task::ObserveIntersections,
            ));
        }
        self.timers.particles = Some(self.scheduler.every(
            now,
            self.config.particle_cadence(),
            Task::SpawnParticle,
        ));
        self.timers.poll = Some(self.scheduler.every(
            now,
            self.config.poll_interval(),
            Task::PollStatus,
        ));

        pulse_info!(
            "page started: {} sections observed, particles every {}ms, polling every {}ms",
            self.reveal.as_ref().map_or(0, RevealController::observed_count),
            self.config.particles.cadence_ms,
            self.config.poll_interval_ms
        );
        vec![Effect::FetchStatus {
            request: self.status.refresh(),
        }]
    }

    fn advance(&mut self, now: Duration) -> Vec<Effect> {
        if self.lifecycle != Lifecycle::Running {
            return Vec::new();
        }
        let mut effects = Vec::new();
        while let Some((at, task)) = self.scheduler.pop_due(now) {
            self.now = at;
            effects.extend(self.dispatch(at, task));
        }
        self.now = self.now.max(now);
        effects
    }

    fn dispatch(&mut self, at: Duration, task: Task) -> Vec<Effect> {
        match task {
            Task::ObserveIntersections => {
                self.check_reveals(at);
                if !self.reveal.as_ref().is_some_and(RevealController::is_active) {
                    if let Some(handle) = self.timers.observer.take() {
                        handle.cancel(&mut self.scheduler);
                        pulse_debug!("all sections revealed, observer detached");
                    }
                }
            }
            Task::CounterFrame => {
                // One-shot: it has already left the scheduler.
                self.timers.frame = None;
                if self.counters.frame(&mut self.surface, at) {
                    self.request_frame(at);
                }
            }
            Task::SpawnParticle => {
                if let Some(particle) = self.particles.spawn(&mut self.surface, &mut self.rng, at) {
                    let handle = self.scheduler.after(
                        at,
                        particle.lifetime,
                        Task::ParticleExpired(particle.element),
                    );
                    self.timers.expiries.insert(particle.element, handle);
                }
            }
            Task::ParticleExpired(element) => {
                self.timers.expiries.remove(&element);
                self.particles.finish(&mut self.surface, element);
            }
            Task::PollStatus => {
                return vec![Effect::FetchStatus {
                    request: self.status.refresh(),
                }];
            }
        }
        Vec::new()
    }

    fn check_reveals(&mut self, now: Duration) {
        let Some(reveal) = self.reveal.as_mut() else {
            return;
        };
        let duration = self.config.counter_duration();
        let mut started = false;
        for revealed in reveal.check(&mut self.surface) {
            for request in revealed.counters {
                self.counters
                    .start(request.element, request.metric, duration, now);
                started = true;
            }
        }
        if started {
            self.request_frame(now);
        }
    }

    fn request_frame(&mut self, now: Duration) {
        if self.timers.frame.is_none() {
            self.timers.frame = Some(self.scheduler.after(
                now,
                self.config.frame_interval(),
                Task::CounterFrame,
            ));
        }
    }

    fn shutdown(&mut self) -> Vec<Effect> {
        let was_running = self.lifecycle == Lifecycle::Running;
        self.lifecycle = Lifecycle::Stopped;
        if !was_running {
            return Vec::new();
        }

        let timers = std::mem::take(&mut self.timers);
        let handles = [timers.observer, timers.frame, timers.particles, timers.poll]
            .into_iter()
            .flatten()
            .chain(timers.expiries.into_values());
        for handle in handles {
            handle.cancel(&mut self.scheduler);
        }
        if let Some(reveal) = self.reveal.as_mut() {
            reveal.disconnect();
        }
        self.counters.clear();
        self.particles.clear(&mut self.surface);
        self.status.abandon_in_flight();

        pulse_info!(
            "page stopped: {} particles spawned, {} timers left",
            self.particles.spawned_total(),
            self.scheduler.active_count()
        );
        vec![Effect::CancelFetches]
    }
}
