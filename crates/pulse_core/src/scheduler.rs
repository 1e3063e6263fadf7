//! Discrete-event timer queue on a virtual clock.
//!
//! Time is a `Duration` since the page started. The host decides how that
//! clock maps onto real time; the scheduler only orders work.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

use pulse_logging::pulse_debug;

use crate::surface::ElementId;

/// Work dispatched when a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    ObserveIntersections,
    CounterFrame,
    SpawnParticle,
    ParticleExpired(ElementId),
    PollStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// Owning handle for a scheduled timer.
///
/// Dropping the handle leaves the timer running; call [`TimerHandle::cancel`]
/// to stop it.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a timer without its handle can only be stopped by clearing the scheduler"]
pub struct TimerHandle {
    id: TimerId,
}

impl TimerHandle {
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Stops the timer. Returns false if it had already fired (one-shot) or
    /// been cancelled.
    pub fn cancel(self, scheduler: &mut Scheduler) -> bool {
        scheduler.cancel(self.id)
    }
}

#[derive(Debug)]
struct Timer {
    task: Task,
    deadline: Duration,
    period: Option<Duration>,
    seq: u64,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Reverse<(Duration, u64, TimerId)>>,
    timers: HashMap<TimerId, Timer>,
    next_id: u64,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// One-shot timer firing at `now + delay`.
    pub fn after(&mut self, now: Duration, delay: Duration, task: Task) -> TimerHandle {
        self.insert(task, now + delay, None)
    }

    /// Fixed-rate timer firing at `now + period`, `now + 2 * period`, ...
    ///
    /// Fires missed by more than one period are skipped: a late timer fires
    /// once and then keeps to its original grid. A zero period is bumped to
    /// one microsecond so the queue always moves forward.
    pub fn every(&mut self, now: Duration, period: Duration, task: Task) -> TimerHandle {
        let period = period.max(Duration::from_micros(1));
        self.insert(task, now + period, Some(period))
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn active_count(&self) -> usize {
        self.timers.len()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.values().map(|timer| timer.deadline).min()
    }

    /// Pops the earliest timer due at or before `now`, returning its own fire
    /// time. Interval timers are re-armed at the first grid point after
    /// `now`. Timers with equal deadlines fire in the order they were armed.
    pub fn pop_due(&mut self, now: Duration) -> Option<(Duration, Task)> {
        while let Some(&Reverse((deadline, seq, id))) = self.queue.peek() {
            if deadline > now {
                return None;
            }
            self.queue.pop();

            let Some(timer) = self.timers.get(&id) else {
                continue;
            };
            if timer.seq != seq {
                continue;
            }
            let task = timer.task;
            match timer.period {
                Some(period) => {
                    let seq = self.bump_seq();
                    let next = next_on_grid(deadline, period, now);
                    if next > deadline + period {
                        pulse_debug!(
                            "timer {:?} ({:?}) fell behind, skipping to {:?}",
                            id,
                            task,
                            next
                        );
                    }
                    if let Some(timer) = self.timers.get_mut(&id) {
                        timer.deadline = next;
                        timer.seq = seq;
                    }
                    self.queue.push(Reverse((next, seq, id)));
                }
                None => {
                    self.timers.remove(&id);
                }
            }
            return Some((deadline, task));
        }
        None
    }

    /// Drops every pending timer.
    pub fn clear(&mut self) {
        self.timers.clear();
        self.queue.clear();
    }

    fn insert(&mut self, task: Task, deadline: Duration, period: Option<Duration>) -> TimerHandle {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let seq = self.bump_seq();
        self.timers.insert(
            id,
            Timer {
                task,
                deadline,
                period,
                seq,
            },
        );
        self.queue.push(Reverse((deadline, seq, id)));
        TimerHandle { id }
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

/// First `deadline + k * period` (k >= 1) strictly after `now`.
fn next_on_grid(deadline: Duration, period: Duration, now: Duration) -> Duration {
    let next = deadline + period;
    if next > now {
        return next;
    }
    let behind = (now - deadline).as_nanos() % period.as_nanos();
    now + period - Duration::from_nanos(behind as u64)
}
