use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use pulse_logging::{pulse_debug, pulse_warn};

use crate::config::{PageConfig, Selectors};
use crate::surface::{ElementId, PresentationSurface};

/// Indicator classes swapped on every poll result.
pub const ONLINE_CLASS: &str = "online";
pub const OFFLINE_CLASS: &str = "offline";

/// Number of metric slots a status update writes.
pub const METRIC_SLOTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollFailure {
    #[error("invalid status endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("timeout")]
    Timeout,
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("response too large (max {max_bytes} bytes)")]
    TooLarge { max_bytes: u64 },
    #[error("invalid status payload: {0}")]
    Payload(String),
}

/// Body returned by the remote status endpoint. Every field is optional.
///
/// Counts accept any JSON number: fractions are rounded, while negative or
/// non-numeric values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatusPayload {
    pub online: Option<bool>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub guilds: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub permitted_users: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub latency: Option<u64>,
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(count_from_json))
}

fn count_from_json(value: &Value) -> Option<u64> {
    let Value::Number(number) = value else {
        return None;
    };
    if let Some(count) = number.as_u64() {
        return Some(count);
    }
    let float = number.as_f64()?;
    (float.is_finite() && float >= 0.0).then(|| float.round() as u64)
}

impl StatusPayload {
    pub fn from_json(body: &[u8]) -> Result<Self, PollFailure> {
        serde_json::from_slice(body).map_err(|err| PollFailure::Payload(err.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub online: bool,
    pub guild_count: u64,
    pub permitted_user_count: u64,
    pub latency_ms: u64,
}

impl From<StatusPayload> for StatusSnapshot {
    fn from(payload: StatusPayload) -> Self {
        Self {
            online: payload.online.unwrap_or(false),
            guild_count: payload.guilds.unwrap_or(1),
            permitted_user_count: payload.permitted_users.unwrap_or(0),
            latency_ms: payload.latency.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Online,
    Offline,
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Indicator::Online => write!(f, "online"),
            Indicator::Offline => write!(f, "offline"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

/// Keeps the status widget in sync with the remote endpoint.
///
/// The poller never performs IO: [`StatusPoller::refresh`] hands out a request
/// id for the host to fetch, and [`StatusPoller::apply`] takes the outcome.
/// Outcomes are applied in arrival order, so a slow response can overwrite a
/// newer one.
#[derive(Debug)]
pub struct StatusPoller {
    selectors: Selectors,
    online_label: String,
    offline_label: String,
    indicator: Option<Indicator>,
    snapshot: Option<StatusSnapshot>,
    in_flight: BTreeSet<RequestId>,
    next_request: u64,
    consecutive_failures: u32,
}

impl StatusPoller {
    pub fn new(config: &PageConfig) -> Self {
        Self {
            selectors: config.selectors.clone(),
            online_label: config.online_label.clone(),
            offline_label: config.offline_label.clone(),
            indicator: None,
            snapshot: None,
            in_flight: BTreeSet::new(),
            next_request: 1,
            consecutive_failures: 0,
        }
    }

    pub fn refresh(&mut self) -> RequestId {
        let request = RequestId(self.next_request);
        self.next_request += 1;
        self.in_flight.insert(request);
        pulse_debug!("status refresh request={}", request.0);
        request
    }

    /// Applies a poll outcome. Returns the metric slots whose text was
    /// overwritten.
    pub fn apply<S>(
        &mut self,
        surface: &mut S,
        request: RequestId,
        outcome: Result<StatusPayload, PollFailure>,
    ) -> Vec<ElementId>
    where
        S: PresentationSurface + ?Sized,
    {
        self.in_flight.remove(&request);
        match outcome {
            Ok(payload) => {
                let snapshot = StatusSnapshot::from(payload);
                self.consecutive_failures = 0;
                self.snapshot = Some(snapshot);
                let indicator = if snapshot.online {
                    Indicator::Online
                } else {
                    Indicator::Offline
                };
                self.render_indicator(surface, indicator);
                pulse_debug!(
                    "status request={} {} guilds={} permitted={} latency_ms={}",
                    request.0,
                    indicator,
                    snapshot.guild_count,
                    snapshot.permitted_user_count,
                    snapshot.latency_ms
                );
                self.render_metrics(surface, &snapshot)
            }
            Err(failure) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                pulse_warn!(
                    "status poll request={} failed ({} in a row): {}",
                    request.0,
                    self.consecutive_failures,
                    failure
                );
                self.render_indicator(surface, Indicator::Offline);
                Vec::new()
            }
        }
    }

    /// Forgets outstanding requests; their outcomes are still accepted if
    /// delivered.
    pub fn abandon_in_flight(&mut self) {
        self.in_flight.clear();
    }

    pub fn indicator(&self) -> Option<Indicator> {
        self.indicator
    }

    pub fn snapshot(&self) -> Option<StatusSnapshot> {
        self.snapshot
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn metric_slots<S>(&self, surface: &S) -> Vec<ElementId>
    where
        S: PresentationSurface + ?Sized,
    {
        surface.query_all(&self.selectors.metrics)
    }

    fn render_indicator<S>(&mut self, surface: &mut S, indicator: Indicator)
    where
        S: PresentationSurface + ?Sized,
    {
        self.indicator = Some(indicator);
        let (class, label) = match indicator {
            Indicator::Online => (ONLINE_CLASS, &self.online_label),
            Indicator::Offline => (OFFLINE_CLASS, &self.offline_label),
        };
        for element in surface.query_all(&self.selectors.indicator) {
            surface.remove_class(element, ONLINE_CLASS);
            surface.remove_class(element, OFFLINE_CLASS);
            surface.add_class(element, class);
        }
        for element in surface.query_all(&self.selectors.status_label) {
            surface.set_text(element, label);
        }
    }

    fn render_metrics<S>(&self, surface: &mut S, snapshot: &StatusSnapshot) -> Vec<ElementId>
    where
        S: PresentationSurface + ?Sized,
    {
        let slots = self.metric_slots(surface);
        if slots.len() < METRIC_SLOTS {
            return Vec::new();
        }
        let values = [
            snapshot.guild_count.to_string(),
            snapshot.permitted_user_count.to_string(),
            format!("{}ms", snapshot.latency_ms),
        ];
        for (element, text) in slots.iter().zip(values.iter()) {
            surface.set_text(*element, text);
        }
        slots.into_iter().take(METRIC_SLOTS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let snapshot = StatusSnapshot::from(StatusPayload::from_json(b"{}").unwrap());
        assert_eq!(
            snapshot,
            StatusSnapshot {
                online: false,
                guild_count: 1,
                permitted_user_count: 0,
                latency_ms: 0,
            }
        );
    }

    #[test]
    fn non_object_bodies_are_payload_failures() {
        for body in [&b"<html>"[..], b"[]", b"null", b""] {
            assert!(matches!(
                StatusPayload::from_json(body),
                Err(PollFailure::Payload(_))
            ));
        }
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let payload =
            StatusPayload::from_json(br#"{"online":true,"guilds":3,"uptime":99}"#).unwrap();
        assert_eq!(payload.online, Some(true));
        assert_eq!(payload.guilds, Some(3));
    }

    #[test]
    fn counts_tolerate_fractions_negatives_and_junk() {
        let payload = StatusPayload::from_json(
            br#"{"online":true,"guilds":2.0,"permitted_users":"many","latency":12.5}"#,
        )
        .unwrap();
        assert_eq!(
            payload,
            StatusPayload {
                online: Some(true),
                guilds: Some(2),
                permitted_users: None,
                latency: Some(13),
            }
        );

        let payload =
            StatusPayload::from_json(br#"{"guilds":-4,"permitted_users":null,"latency":-0.5}"#)
                .unwrap();
        assert_eq!(payload, StatusPayload::default());
    }
}
