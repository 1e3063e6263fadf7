#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchStatus { request: crate::RequestId },
    CancelFetches,
}
