use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
    #[error("particle lifetime range is empty ({min_ms}..{max_ms} ms)")]
    EmptyLifetimeRange { min_ms: u64, max_ms: u64 },
    #[error("reveal threshold {0} is outside (0, 1]")]
    Threshold(f64),
    #[error("reveal margin {0} must be finite")]
    Margin(f64),
}

/// Element lookups used by the page behaviours.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// Units observed by the reveal controller.
    pub sections: String,
    /// Section whose metrics animate when revealed.
    pub status_container: String,
    /// Metric slots: guild count, permitted users, latency (in this order).
    pub metrics: String,
    pub indicator: String,
    pub status_label: String,
    /// Parent of spawned particles; the document root when it matches nothing.
    pub particle_layer: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            sections: "section".to_string(),
            status_container: "#status".to_string(),
            metrics: ".stat-number".to_string(),
            indicator: ".status-indicator".to_string(),
            status_label: ".status-text".to_string(),
            particle_layer: ".particles".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Fraction of a unit's area that must be visible.
    pub threshold: f64,
    /// Pixels trimmed off the bottom of the viewport before testing.
    pub bottom_margin_px: f64,
    pub revealed_class: String,
    /// Offset the hidden state starts from before sliding in.
    pub hidden_offset_px: f64,
    pub transition_ms: u64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            bottom_margin_px: 50.0,
            revealed_class: "revealed".to_string(),
            hidden_offset_px: 30.0,
            transition_ms: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub cadence_ms: u64,
    pub min_lifetime_ms: u64,
    /// Exclusive upper bound.
    pub max_lifetime_ms: u64,
    pub start_opacity: f64,
    /// Extra travel past the top of the viewport.
    pub overshoot_px: f64,
    pub class: String,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            cadence_ms: 300,
            min_lifetime_ms: 2000,
            max_lifetime_ms: 5000,
            start_opacity: 0.7,
            overshoot_px: 100.0,
            class: "particle".to_string(),
        }
    }
}

/// Timing and selector configuration for a [`crate::Page`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub selectors: Selectors,
    pub reveal: RevealConfig,
    pub particles: ParticleConfig,
    pub counter_duration_ms: u64,
    pub poll_interval_ms: u64,
    /// Length of one animation frame, in microseconds.
    pub frame_interval_us: u64,
    pub online_label: String,
    pub offline_label: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            selectors: Selectors::default(),
            reveal: RevealConfig::default(),
            particles: ParticleConfig::default(),
            counter_duration_ms: 2000,
            poll_interval_ms: 30_000,
            frame_interval_us: 16_667,
            online_label: "Online".to_string(),
            offline_label: "Offline".to_string(),
        }
    }
}

impl PageConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.particles.cadence_ms == 0 {
            return Err(ConfigError::ZeroInterval("particles.cadence_ms"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval("poll_interval_ms"));
        }
        if self.frame_interval_us == 0 {
            return Err(ConfigError::ZeroInterval("frame_interval_us"));
        }
        if self.particles.min_lifetime_ms >= self.particles.max_lifetime_ms {
            return Err(ConfigError::EmptyLifetimeRange {
                min_ms: self.particles.min_lifetime_ms,
                max_ms: self.particles.max_lifetime_ms,
            });
        }
        let threshold = self.reveal.threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::Threshold(threshold));
        }
        if !self.reveal.bottom_margin_px.is_finite() {
            return Err(ConfigError::Margin(self.reveal.bottom_margin_px));
        }
        Ok(())
    }

    pub fn counter_duration(&self) -> Duration {
        Duration::from_millis(self.counter_duration_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_micros(self.frame_interval_us)
    }

    pub fn particle_cadence(&self) -> Duration {
        Duration::from_millis(self.particles.cadence_ms)
    }
}
