//! Pagepulse core: page behaviours, virtual-clock scheduler and the page
//! state machine. No IO and no async; hosts supply time and fetch results.
mod config;
mod counter;
mod dom;
mod effect;
mod msg;
mod page;
mod particles;
mod reveal;
mod scheduler;
mod status;
mod surface;
mod view_model;

pub use config::{ConfigError, PageConfig, ParticleConfig, RevealConfig, Selectors};
pub use counter::{CounterAnimation, CounterAnimator, CounterFrame, MetricText};
pub use dom::{ElementSpec, InMemorySurface};
pub use effect::Effect;
pub use msg::Msg;
pub use page::{Lifecycle, Page};
pub use particles::{Particle, ParticleSystem};
pub use reveal::{
    intersection_ratio, is_intersecting, CounterRequest, RevealController, RevealState, Revealed,
};
pub use scheduler::{Scheduler, Task, TimerHandle, TimerId};
pub use status::{
    Indicator, PollFailure, RequestId, StatusPayload, StatusPoller, StatusSnapshot, METRIC_SLOTS,
    OFFLINE_CLASS, ONLINE_CLASS,
};
pub use surface::{
    Animation, Easing, ElementId, PresentationSurface, Rect, Viewport, VisualState,
};
pub use view_model::PageViewModel;
