use std::time::Duration;

use pulse_logging::{pulse_debug, pulse_info};

use crate::config::{RevealConfig, Selectors};
use crate::counter::MetricText;
use crate::surface::{Animation, Easing, ElementId, PresentationSurface, Rect, Viewport, VisualState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    Hidden,
    Revealed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RevealUnit {
    element: ElementId,
    state: RevealState,
}

/// Counter run requested by a revealed status container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterRequest {
    pub element: ElementId,
    pub metric: MetricText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revealed {
    pub element: ElementId,
    pub counters: Vec<CounterRequest>,
}

/// Fraction of `rect` visible inside the viewport once its bottom edge is
/// pulled up by `bottom_margin` pixels.
pub fn intersection_ratio(rect: &Rect, viewport: &Viewport, bottom_margin: f64) -> Option<f64> {
    let mut root = viewport.visible_rect();
    root.height = (root.height - bottom_margin).max(0.0);

    let overlap = rect.intersection(&root)?;
    let area = rect.area();
    if area == 0.0 {
        // Edge-adjacent zero-area targets count as fully visible.
        return Some(1.0);
    }
    Some(overlap.area() / area)
}

pub fn is_intersecting(rect: &Rect, viewport: &Viewport, config: &RevealConfig) -> bool {
    intersection_ratio(rect, viewport, config.bottom_margin_px)
        .is_some_and(|ratio| ratio >= config.threshold)
}

/// One-shot viewport observer for page sections.
///
/// The set of units is captured by [`RevealController::observe`]; sections
/// added to the surface later are never observed.
#[derive(Debug)]
pub struct RevealController {
    units: Vec<RevealUnit>,
    status_container: Option<ElementId>,
    metric_selector: String,
    config: RevealConfig,
    connected: bool,
}

impl RevealController {
    /// Captures the current sections and puts them in their hidden state.
    pub fn observe<S>(surface: &mut S, selectors: &Selectors, config: RevealConfig) -> Self
    where
        S: PresentationSurface + ?Sized,
    {
        let hidden_transform = format!("translateY({}px)", config.hidden_offset_px);
        let units: Vec<RevealUnit> = surface
            .query_all(&selectors.sections)
            .into_iter()
            .map(|element| {
                surface.set_style(element, "opacity", "0");
                surface.set_style(element, "transform", &hidden_transform);
                RevealUnit {
                    element,
                    state: RevealState::Hidden,
                }
            })
            .collect();
        let status_container = surface.query(&selectors.status_container);

        pulse_debug!(
            "reveal observing {} units, status container {:?}",
            units.len(),
            status_container
        );
        Self {
            units,
            status_container,
            metric_selector: selectors.metrics.clone(),
            config,
            connected: true,
        }
    }

    /// Reveals every hidden unit that now intersects the viewport.
    pub fn check<S>(&mut self, surface: &mut S) -> Vec<Revealed>
    where
        S: PresentationSurface + ?Sized,
    {
        if !self.connected {
            return Vec::new();
        }
        let viewport = surface.viewport();
        let mut revealed = Vec::new();

        for unit in &mut self.units {
            if unit.state == RevealState::Revealed {
                continue;
            }
            let Some(rect) = surface.bounds(unit.element) else {
                continue;
            };
            if !is_intersecting(&rect, &viewport, &self.config) {
                continue;
            }

            unit.state = RevealState::Revealed;
            apply_reveal(surface, unit.element, &self.config);
            let counters = if Some(unit.element) == self.status_container {
                collect_counters(surface, unit.element, &self.metric_selector)
            } else {
                Vec::new()
            };
            pulse_info!(
                "revealed {} ({} counters)",
                unit.element,
                counters.len()
            );
            revealed.push(Revealed {
                element: unit.element,
                counters,
            });
        }
        revealed
    }

    /// Stops observing all units.
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// True while connected with at least one unit still hidden.
    pub fn is_active(&self) -> bool {
        self.connected && self.pending_count() > 0
    }

    pub fn state(&self, element: ElementId) -> Option<RevealState> {
        self.units
            .iter()
            .find(|unit| unit.element == element)
            .map(|unit| unit.state)
    }

    pub fn observed_count(&self) -> usize {
        self.units.len()
    }

    pub fn revealed_count(&self) -> usize {
        self.units
            .iter()
            .filter(|unit| unit.state == RevealState::Revealed)
            .count()
    }

    fn pending_count(&self) -> usize {
        self.observed_count() - self.revealed_count()
    }
}

fn apply_reveal<S>(surface: &mut S, element: ElementId, config: &RevealConfig)
where
    S: PresentationSurface + ?Sized,
{
    surface.add_class(element, &config.revealed_class);
    surface.set_style(element, "opacity", "1");
    surface.set_style(element, "transform", "translateY(0)");
    surface.animate(
        element,
        &Animation {
            from: VisualState {
                opacity: 0.0,
                translate_y: config.hidden_offset_px,
                scale: 1.0,
            },
            to: VisualState {
                opacity: 1.0,
                translate_y: 0.0,
                scale: 1.0,
            },
            duration: Duration::from_millis(config.transition_ms),
            easing: Easing::EaseOut,
        },
    );
}

fn collect_counters<S>(surface: &S, container: ElementId, selector: &str) -> Vec<CounterRequest>
where
    S: PresentationSurface + ?Sized,
{
    surface
        .query_within(container, selector)
        .into_iter()
        .filter_map(|element| {
            let metric = MetricText::parse(&surface.text(element)?)?;
            Some(CounterRequest { element, metric })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(scroll: f64) -> Viewport {
        Viewport {
            width: 1000.0,
            height: 800.0,
            scroll_offset: scroll,
            document_height: 4000.0,
        }
    }

    #[test]
    fn bottom_margin_delays_the_trigger() {
        let config = RevealConfig::default();
        // 100px tall unit starting 40px above the viewport bottom: only the
        // top 40px are on screen, all of it inside the 50px margin.
        let rect = Rect::new(0.0, 760.0, 1000.0, 100.0);
        assert_eq!(intersection_ratio(&rect, &viewport(0.0), 50.0), None);
        assert!(!is_intersecting(&rect, &viewport(0.0), &config));

        // Scrolled 70px: the trimmed root now ends at 820, exposing 60px.
        assert!(is_intersecting(&rect, &viewport(70.0), &config));
    }

    #[test]
    fn threshold_is_ten_percent_of_area() {
        let config = RevealConfig::default();
        let rect = Rect::new(0.0, 700.0, 1000.0, 1000.0);
        // Trimmed root ends at 750 + scroll; 50px visible is 5%.
        assert!(!is_intersecting(&rect, &viewport(0.0), &config));
        // 100px visible is exactly 10%.
        assert!(is_intersecting(&rect, &viewport(50.0), &config));
    }
}
