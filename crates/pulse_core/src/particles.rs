use std::collections::BTreeSet;
use std::time::Duration;

use rand::Rng;

use pulse_logging::pulse_trace;

use crate::config::ParticleConfig;
use crate::surface::{Animation, Easing, ElementId, PresentationSurface, VisualState};

/// A particle that was just put on the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub element: ElementId,
    pub x: f64,
    pub spawned_at: Duration,
    pub lifetime: Duration,
}

impl Particle {
    pub fn expires_at(&self) -> Duration {
        self.spawned_at + self.lifetime
    }
}

/// Spawns decorative particles that float from the bottom of the viewport
/// to above its top, then disappear.
#[derive(Debug)]
pub struct ParticleSystem {
    config: ParticleConfig,
    layer: Option<ElementId>,
    live: BTreeSet<ElementId>,
    spawned_total: u64,
}

impl ParticleSystem {
    /// Particles are created under `layer`, or the document root when `None`.
    pub fn new(config: ParticleConfig, layer: Option<ElementId>) -> Self {
        Self {
            config,
            layer,
            live: BTreeSet::new(),
            spawned_total: 0,
        }
    }

    pub fn spawn<S, R>(&mut self, surface: &mut S, rng: &mut R, now: Duration) -> Option<Particle>
    where
        S: PresentationSurface + ?Sized,
        R: Rng,
    {
        let viewport = surface.viewport();
        let x = if viewport.width > 0.0 {
            rng.random_range(0.0..viewport.width)
        } else {
            0.0
        };
        let lifetime = Duration::from_millis(
            rng.random_range(self.config.min_lifetime_ms..self.config.max_lifetime_ms),
        );

        let element = surface.create_element(self.layer, "div")?;
        surface.add_class(element, &self.config.class);
        surface.set_style(element, "position", "fixed");
        surface.set_style(element, "left", &format!("{x:.1}px"));
        surface.set_style(element, "top", &format!("{}px", viewport.height));
        surface.set_style(element, "pointer-events", "none");
        surface.animate(element, &self.animation(viewport.height, lifetime));

        self.live.insert(element);
        self.spawned_total += 1;
        pulse_trace!(
            "particle {} spawned x={:.1} lifetime_ms={}",
            element,
            x,
            lifetime.as_millis()
        );
        Some(Particle {
            element,
            x,
            spawned_at: now,
            lifetime,
        })
    }

    /// Completion hook: removes the particle from the surface.
    pub fn finish<S>(&mut self, surface: &mut S, element: ElementId) -> bool
    where
        S: PresentationSurface + ?Sized,
    {
        surface.remove_element(element);
        self.live.remove(&element)
    }

    /// Removes every live particle.
    pub fn clear<S>(&mut self, surface: &mut S)
    where
        S: PresentationSurface + ?Sized,
    {
        for element in std::mem::take(&mut self.live) {
            surface.remove_element(element);
        }
    }

    pub fn animation(&self, viewport_height: f64, lifetime: Duration) -> Animation {
        Animation {
            from: VisualState {
                opacity: self.config.start_opacity,
                translate_y: 0.0,
                scale: 1.0,
            },
            to: VisualState {
                opacity: 0.0,
                translate_y: -(viewport_height + self.config.overshoot_px),
                scale: 0.0,
            },
            duration: lifetime,
            easing: Easing::Linear,
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn spawned_total(&self) -> u64 {
        self.spawned_total
    }
}
