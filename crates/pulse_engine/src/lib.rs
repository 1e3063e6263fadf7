//! Pagepulse engine: tokio event loop and the remote status source.
mod engine;
mod source;

pub use engine::{EngineError, EngineHandle};
pub use source::{ReqwestStatusSource, SourceSettings, StatusSource};
