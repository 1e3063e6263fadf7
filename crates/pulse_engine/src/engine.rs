use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

use pulse_core::{
    Effect, Msg, Page, PageViewModel, PollFailure, PresentationSurface, RequestId, StatusPayload,
};
use pulse_logging::{pulse_debug, pulse_info};

use crate::source::StatusSource;

type FetchResult = (RequestId, Result<StatusPayload, PollFailure>);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

enum EngineCommand {
    Scroll(f64),
}

/// Runs a [`Page`] on the current tokio runtime.
///
/// All page work happens on one task, one message at a time. Status fetches
/// run on their own tasks and report back through a channel, so timers keep
/// firing while a request is pending.
///
/// Dropping the handle stops the engine the same way [`EngineHandle::shutdown`]
/// does, without waiting for it.
pub struct EngineHandle<S> {
    cmd_tx: mpsc::UnboundedSender<EngineCommand>,
    view_rx: watch::Receiver<PageViewModel>,
    cancel: DropGuard,
    task: JoinHandle<Page<S>>,
}

impl<S> EngineHandle<S>
where
    S: PresentationSurface + Send + 'static,
{
    /// Starts the page immediately; the first status poll is issued before
    /// this returns control to the runtime.
    pub fn spawn(page: Page<S>, source: Arc<dyn StatusSource>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(page.view());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(page, source, cmd_rx, view_tx, cancel.clone()));
        Self {
            cmd_tx,
            view_rx,
            cancel: cancel.drop_guard(),
            task,
        }
    }

    pub fn scroll_to(&self, offset: f64) {
        let _ = self.cmd_tx.send(EngineCommand::Scroll(offset));
    }

    /// Latest published view of the page.
    pub fn view(&self) -> PageViewModel {
        self.view_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PageViewModel> {
        self.view_rx.clone()
    }

    /// Stops every timer, cancels in-flight fetches and hands the page back.
    pub async fn shutdown(self) -> Result<Page<S>, EngineError> {
        let Self { cancel, task, .. } = self;
        drop(cancel);
        Ok(task.await?)
    }
}

async fn run<S>(
    mut page: Page<S>,
    source: Arc<dyn StatusSource>,
    mut cmd_rx: mpsc::UnboundedReceiver<EngineCommand>,
    view_tx: watch::Sender<PageViewModel>,
    cancel: CancellationToken,
) -> Page<S>
where
    S: PresentationSurface + Send + 'static,
{
    let origin = Instant::now();
    let fetches = cancel.child_token();
    let (result_tx, mut result_rx) = mpsc::unbounded_channel::<FetchResult>();

    let effects = page.update(Msg::Start {
        now: Duration::ZERO,
    });
    execute(effects, &source, &result_tx, &fetches);
    view_tx.send_replace(page.view());

    loop {
        let wake = page.next_deadline().map(|deadline| origin + deadline);
        let effects = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            Some(command) = cmd_rx.recv() => match command {
                EngineCommand::Scroll(offset) => page.update(Msg::Scrolled { offset }),
            },
            Some((request, outcome)) = result_rx.recv() => {
                page.update(Msg::StatusFetched { request, outcome })
            }
            _ = sleep_until(wake) => page.update(Msg::Tick { now: origin.elapsed() }),
        };
        execute(effects, &source, &result_tx, &fetches);
        view_tx.send_replace(page.view());
    }

    let effects = page.update(Msg::Shutdown);
    execute(effects, &source, &result_tx, &fetches);
    view_tx.send_replace(page.view());
    pulse_info!("engine stopped after {:?}", origin.elapsed());
    page
}

async fn sleep_until(wake: Option<Instant>) {
    match wake {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

fn execute(
    effects: Vec<Effect>,
    source: &Arc<dyn StatusSource>,
    results: &mpsc::UnboundedSender<FetchResult>,
    fetches: &CancellationToken,
) {
    for effect in effects {
        match effect {
            Effect::FetchStatus { request } => {
                let source = Arc::clone(source);
                let results = results.clone();
                let token = fetches.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => {
                            pulse_debug!("status request={} cancelled", request.0);
                        }
                        outcome = source.fetch() => {
                            let _ = results.send((request, outcome));
                        }
                    }
                });
            }
            Effect::CancelFetches => fetches.cancel(),
        }
    }
}
