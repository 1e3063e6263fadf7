use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Host is ready: observe sections, arm timers, issue the first poll.
    Start { now: Duration },
    /// Virtual clock moved; run every timer due by `now`.
    Tick { now: Duration },
    /// Visitor scrolled the page.
    Scrolled { offset: f64 },
    /// A status fetch finished.
    StatusFetched {
        request: crate::RequestId,
        outcome: Result<crate::StatusPayload, crate::PollFailure>,
    },
    /// Host is going away: stop every timer and observer.
    Shutdown,
}
