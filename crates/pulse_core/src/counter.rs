use std::collections::BTreeMap;
use std::time::Duration;

use pulse_logging::pulse_trace;

use crate::surface::{ElementId, PresentationSurface};

const NUMBER_SEPARATORS: [char; 4] = [',', '.', '\'', '_'];

/// Metric text split into its leading integer and trailing unit label,
/// e.g. `"12ms"` is value 12 with suffix `"ms"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricText {
    pub value: u64,
    pub suffix: String,
}

impl MetricText {
    /// Returns `None` unless the trimmed text starts with an ASCII digit.
    /// Grouped or fractional numbers such as `"1,234"` or `"1.5k"` are not
    /// counted either: a separator right after the digits rejects the text.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let digits = text
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(text.len());
        if digits == 0 {
            return None;
        }
        if text[digits..].starts_with(&NUMBER_SEPARATORS[..]) {
            return None;
        }
        let value = text[..digits].parse().ok()?;
        Some(Self {
            value,
            suffix: text[digits..].trim().to_string(),
        })
    }

    pub fn render(&self, value: u64) -> String {
        format!("{value}{}", self.suffix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterFrame {
    pub value: u64,
    pub finished: bool,
}

/// One run of a counter from 0 to `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterAnimation {
    metric: MetricText,
    started_at: Duration,
    duration: Duration,
}

impl CounterAnimation {
    pub fn new(metric: MetricText, started_at: Duration, duration: Duration) -> Self {
        Self {
            metric,
            started_at,
            duration,
        }
    }

    pub fn target(&self) -> u64 {
        self.metric.value
    }

    /// Displayed value at `now`: `floor(progress * target)`, snapped to the
    /// exact target once progress reaches 1.
    pub fn frame_at(&self, now: Duration) -> CounterFrame {
        let target = self.metric.value;
        let elapsed = now.saturating_sub(self.started_at);
        let progress = if self.duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
        };

        if progress >= 1.0 {
            return CounterFrame {
                value: target,
                finished: true,
            };
        }
        let value = ((progress * target as f64).floor() as u64).min(target);
        CounterFrame {
            value,
            finished: false,
        }
    }
}

/// Runs counter animations, at most one per element.
#[derive(Debug, Default)]
pub struct CounterAnimator {
    running: BTreeMap<ElementId, CounterAnimation>,
}

impl CounterAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts counting `element` up to `metric.value`. A run already in
    /// progress on the same element is replaced.
    pub fn start(
        &mut self,
        element: ElementId,
        metric: MetricText,
        duration: Duration,
        now: Duration,
    ) {
        pulse_trace!(
            "counter start element={} target={} duration_ms={}",
            element,
            metric.value,
            duration.as_millis()
        );
        self.running
            .insert(element, CounterAnimation::new(metric, now, duration));
    }

    pub fn cancel(&mut self, element: ElementId) -> bool {
        self.running.remove(&element).is_some()
    }

    pub fn clear(&mut self) {
        self.running.clear();
    }

    pub fn is_running(&self) -> bool {
        !self.running.is_empty()
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    /// Writes one frame for every running counter and drops the finished
    /// ones. Returns whether another frame is needed.
    pub fn frame<S>(&mut self, surface: &mut S, now: Duration) -> bool
    where
        S: PresentationSurface + ?Sized,
    {
        self.running.retain(|&element, animation| {
            let frame = animation.frame_at(now);
            surface.set_text(element, &animation.metric.render(frame.value));
            !frame.finished
        });
        self.is_running()
    }
}
