#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use pulse_core::{
    ElementSpec, InMemorySurface, Page, PageConfig, PollFailure, Rect, StatusPayload,
};
use pulse_engine::StatusSource;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(pulse_logging::initialize_for_tests);
}

pub fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// Hero, features and status sections stacked on a 1000x800 viewport.
pub fn fixture_page(metric_texts: [&str; 3]) -> Page<InMemorySurface> {
    let mut surface = InMemorySurface::new(1000.0, 800.0);
    let root = surface.root();
    let section = |id: &str, top: f64, height: f64| {
        ElementSpec::new("section")
            .id(id)
            .rect(Rect::new(0.0, top, 1000.0, height))
    };

    surface
        .append(root, ElementSpec::new("div").class("particles"))
        .unwrap();
    surface.append(root, section("hero", 0.0, 800.0)).unwrap();
    surface.append(root, section("features", 800.0, 800.0)).unwrap();
    let status = surface.append(root, section("status", 1600.0, 600.0)).unwrap();
    surface
        .append(status, ElementSpec::new("span").class("status-indicator"))
        .unwrap();
    surface
        .append(status, ElementSpec::new("span").class("status-text").text("Checking"))
        .unwrap();
    for text in metric_texts {
        surface
            .append(status, ElementSpec::new("div").class("stat-number").text(text))
            .unwrap();
    }
    surface
        .append(
            root,
            ElementSpec::new("footer").rect(Rect::new(0.0, 2200.0, 1000.0, 800.0)),
        )
        .unwrap();

    Page::with_rng(surface, PageConfig::default(), StdRng::seed_from_u64(11)).unwrap()
}

pub fn payload(online: bool, guilds: u64) -> StatusPayload {
    StatusPayload {
        online: Some(online),
        guilds: Some(guilds),
        permitted_users: Some(7),
        latency: Some(12),
    }
}

type Script = dyn Fn(usize) -> (Duration, Result<StatusPayload, PollFailure>) + Send + Sync;

/// Status source answering the n-th call from a script, after the scripted
/// delay.
pub struct ScriptedSource {
    calls: AtomicUsize,
    script: Box<Script>,
}

impl ScriptedSource {
    pub fn new<F>(script: F) -> Arc<Self>
    where
        F: Fn(usize) -> (Duration, Result<StatusPayload, PollFailure>) + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            script: Box::new(script),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StatusSource for ScriptedSource {
    async fn fetch(&self) -> Result<StatusPayload, PollFailure> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay, outcome) = (self.script)(call);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}
