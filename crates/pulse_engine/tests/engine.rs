mod support;

use std::time::Duration;

use pretty_assertions::assert_eq;
use pulse_core::{Indicator, Lifecycle, PollFailure};
use pulse_engine::EngineHandle;
use tokio::time::sleep;

use support::{fixture_page, init_logging, ms, payload, ScriptedSource};

#[tokio::test(start_paused = true)]
async fn polls_immediately_then_every_interval() {
    init_logging();
    let source = ScriptedSource::new(|_| (Duration::ZERO, Ok(payload(true, 42))));
    let engine = EngineHandle::spawn(fixture_page(["3", "5", "80ms"]), source.clone());

    sleep(ms(10)).await;
    assert_eq!(source.calls(), 1);
    let view = engine.view();
    assert_eq!(view.lifecycle, Lifecycle::Running);
    assert_eq!(view.indicator, Some(Indicator::Online));
    assert_eq!(view.metrics, vec!["42", "7", "12ms"]);

    sleep(ms(29_980)).await;
    assert_eq!(source.calls(), 1);
    sleep(ms(20)).await;
    assert_eq!(source.calls(), 2);

    sleep(ms(30_000)).await;
    assert_eq!(source.calls(), 3);
    engine.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failing_source_shows_offline_and_keeps_metrics() {
    init_logging();
    let source = ScriptedSource::new(|_| (Duration::ZERO, Err(PollFailure::HttpStatus(503))));
    let engine = EngineHandle::spawn(fixture_page(["3", "5", "80ms"]), source.clone());

    sleep(ms(10)).await;
    let view = engine.view();
    assert_eq!(view.indicator, Some(Indicator::Offline));
    assert_eq!(view.health(), "offline");
    assert_eq!(view.metrics, vec!["3", "5", "80ms"]);
    assert_eq!(view.consecutive_poll_failures, 1);

    sleep(ms(30_000)).await;
    assert_eq!(engine.view().consecutive_poll_failures, 2);
    engine.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn scrolling_reveals_sections_and_runs_counters() {
    init_logging();
    let source = ScriptedSource::new(|_| (Duration::ZERO, Err(PollFailure::Timeout)));
    let engine = EngineHandle::spawn(fixture_page(["3", "5", "80ms"]), source);

    sleep(ms(10)).await;
    let view = engine.view();
    assert_eq!(view.observed_units, 3);
    assert_eq!(view.revealed_units, 1);

    engine.scroll_to(1500.0);
    sleep(ms(100)).await;
    let view = engine.view();
    assert_eq!(view.revealed_units, 3);
    assert_eq!(view.running_counters, 3);
    assert_ne!(view.metrics, vec!["3", "5", "80ms"]);

    sleep(ms(2_100)).await;
    let view = engine.view();
    assert_eq!(view.running_counters, 0);
    assert_eq!(view.metrics, vec!["3", "5", "80ms"]);
    assert!(view.particles_spawned > 0);
    engine.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_discards_in_flight_fetch_and_clears_timers() {
    init_logging();
    let source = ScriptedSource::new(|_| (Duration::from_secs(5), Ok(payload(true, 42))));
    let engine = EngineHandle::spawn(fixture_page(["3", "5", "80ms"]), source.clone());

    sleep(ms(1_000)).await;
    let view = engine.view();
    assert_eq!(view.polls_in_flight, 1);
    assert_eq!(view.indicator, None);

    let page = engine.shutdown().await.unwrap();
    sleep(ms(10_000)).await;

    let view = page.view();
    assert_eq!(view.lifecycle, Lifecycle::Stopped);
    assert_eq!(view.indicator, None);
    assert_eq!(view.polls_in_flight, 0);
    assert_eq!(view.live_particles, 0);
    assert_eq!(page.pending_timers(), 0);
    assert_eq!(page.next_deadline(), None);
    assert_eq!(source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_stops_the_engine() {
    init_logging();
    let source = ScriptedSource::new(|_| (Duration::ZERO, Ok(payload(true, 42))));
    let engine = EngineHandle::spawn(fixture_page(["3", "5", "80ms"]), source.clone());
    let mut views = engine.subscribe();

    sleep(ms(10)).await;
    assert_eq!(source.calls(), 1);
    drop(engine);

    sleep(ms(95_000)).await;
    assert_eq!(source.calls(), 1);
    assert_eq!(views.borrow_and_update().lifecycle, Lifecycle::Stopped);
}

#[tokio::test(start_paused = true)]
async fn later_completion_wins_when_polls_overlap() {
    init_logging();
    // The first poll stalls past the second one.
    let source = ScriptedSource::new(|call| match call {
        0 => (Duration::from_secs(40), Ok(payload(false, 1))),
        _ => (Duration::ZERO, Ok(payload(true, 42))),
    });
    let engine = EngineHandle::spawn(fixture_page(["3", "5", "80ms"]), source.clone());

    sleep(ms(35_000)).await;
    assert_eq!(source.calls(), 2);
    let view = engine.view();
    assert_eq!(view.indicator, Some(Indicator::Online));
    assert_eq!(view.polls_in_flight, 1);

    sleep(ms(6_000)).await;
    let view = engine.view();
    assert_eq!(view.indicator, Some(Indicator::Offline));
    assert_eq!(view.snapshot.map(|snapshot| snapshot.guild_count), Some(1));
    assert_eq!(view.polls_in_flight, 0);
    engine.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_published_views() {
    init_logging();
    let source = ScriptedSource::new(|_| (ms(200), Ok(payload(true, 9))));
    let engine = EngineHandle::spawn(fixture_page(["3", "5", "80ms"]), source);
    let mut views = engine.subscribe();

    let online = views
        .wait_for(|view| view.indicator == Some(Indicator::Online))
        .await
        .unwrap()
        .clone();
    assert_eq!(online.metrics, vec!["9", "7", "12ms"]);
    assert_eq!(online.health(), "alive");
    engine.shutdown().await.unwrap();
}
