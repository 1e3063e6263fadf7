use crate::{Indicator, Lifecycle, StatusSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageViewModel {
    pub lifecycle: Lifecycle,
    pub indicator: Option<Indicator>,
    pub snapshot: Option<StatusSnapshot>,
    /// Current text of every metric slot, in document order.
    pub metrics: Vec<String>,
    pub observed_units: usize,
    pub revealed_units: usize,
    pub running_counters: usize,
    pub live_particles: usize,
    pub particles_spawned: u64,
    pub polls_in_flight: usize,
    pub consecutive_poll_failures: u32,
}

impl PageViewModel {
    /// Same wording as the status service's own health route.
    pub fn health(&self) -> &'static str {
        match self.indicator {
            Some(Indicator::Online) => "alive",
            _ => "offline",
        }
    }
}
