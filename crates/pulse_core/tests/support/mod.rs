#![allow(dead_code)]

use std::sync::Once;
use std::time::Duration;

use pulse_core::{
    Effect, ElementId, ElementSpec, InMemorySurface, Msg, Page, PageConfig, Rect, RequestId,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub const WIDTH: f64 = 1000.0;
pub const HEIGHT: f64 = 800.0;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(pulse_logging::initialize_for_tests);
}

pub fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// Element handles of the fixture page.
#[derive(Debug, Clone, Copy)]
pub struct Fixture {
    pub hero: ElementId,
    pub features: ElementId,
    pub status: ElementId,
    pub metrics: [ElementId; 3],
    pub indicator: ElementId,
    pub label: ElementId,
    pub particles: ElementId,
}

/// Hero (0-800), features (800-1600), status (1600-2200), footer padding to
/// 3000. Metric slots start with the server-rendered values.
pub fn fixture_surface(metric_texts: [&str; 3]) -> (InMemorySurface, Fixture) {
    let mut surface = InMemorySurface::new(WIDTH, HEIGHT);
    let root = surface.root();
    let section = |id: &str, top: f64, height: f64| {
        ElementSpec::new("section")
            .id(id)
            .rect(Rect::new(0.0, top, WIDTH, height))
    };

    let particles = surface
        .append(root, ElementSpec::new("div").class("particles"))
        .unwrap();
    let hero = surface.append(root, section("hero", 0.0, 800.0)).unwrap();
    let features = surface
        .append(root, section("features", 800.0, 800.0))
        .unwrap();
    let status = surface.append(root, section("status", 1600.0, 600.0)).unwrap();
    let indicator = surface
        .append(status, ElementSpec::new("span").class("status-indicator"))
        .unwrap();
    let label = surface
        .append(status, ElementSpec::new("span").class("status-text").text("Checking"))
        .unwrap();
    let metrics = metric_texts.map(|text| {
        surface
            .append(status, ElementSpec::new("div").class("stat-number").text(text))
            .unwrap()
    });
    surface
        .append(
            root,
            ElementSpec::new("footer").rect(Rect::new(0.0, 2200.0, WIDTH, 800.0)),
        )
        .unwrap();

    (
        surface,
        Fixture {
            hero,
            features,
            status,
            metrics,
            indicator,
            label,
            particles,
        },
    )
}

pub fn fixture_page(metric_texts: [&str; 3]) -> (Page<InMemorySurface>, Fixture) {
    let (surface, fixture) = fixture_surface(metric_texts);
    let page = Page::with_rng(surface, PageConfig::default(), StdRng::seed_from_u64(7)).unwrap();
    (page, fixture)
}

/// Starts the page at t=0 and returns the id of the immediate poll.
pub fn start(page: &mut Page<InMemorySurface>) -> RequestId {
    let effects = page.update(Msg::Start { now: ms(0) });
    fetch_requests(&effects)
        .into_iter()
        .next()
        .expect("start issues an immediate poll")
}

pub fn fetch_requests(effects: &[Effect]) -> Vec<RequestId> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::FetchStatus { request } => Some(*request),
            Effect::CancelFetches => None,
        })
        .collect()
}

pub fn text(page: &Page<InMemorySurface>, element: ElementId) -> String {
    use pulse_core::PresentationSurface;
    page.surface().text(element).unwrap_or_default()
}

pub fn metric_texts(page: &Page<InMemorySurface>, fixture: &Fixture) -> Vec<String> {
    fixture
        .metrics
        .iter()
        .map(|&element| text(page, element))
        .collect()
}

/// Ticks at every deadline up to `until`, the way a host sleeping until
/// [`Page::next_deadline`] does, and returns all effects.
pub fn run_until(page: &mut Page<InMemorySurface>, until: Duration) -> Vec<Effect> {
    let mut effects = Vec::new();
    while let Some(deadline) = page.next_deadline().filter(|deadline| *deadline <= until) {
        effects.extend(page.update(Msg::Tick { now: deadline }));
    }
    effects.extend(page.update(Msg::Tick { now: until }));
    effects
}

/// Scrolls so the status section is well inside the viewport.
pub fn scroll_to_status(page: &mut Page<InMemorySurface>) {
    page.update(Msg::Scrolled { offset: 1500.0 });
}
