use std::time::Duration;

use futures_util::StreamExt;

use pulse_core::{PollFailure, StatusPayload};

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5000/api/status".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            max_bytes: 64 * 1024,
        }
    }
}

/// Remote status endpoint.
#[async_trait::async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch(&self) -> Result<StatusPayload, PollFailure>;
}

#[derive(Debug, Clone)]
pub struct ReqwestStatusSource {
    settings: SourceSettings,
    client: reqwest::Client,
}

impl ReqwestStatusSource {
    pub fn new(settings: SourceSettings) -> Result<Self, PollFailure> {
        reqwest::Url::parse(&settings.endpoint)
            .map_err(|err| PollFailure::InvalidEndpoint(err.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| PollFailure::Network(err.to_string()))?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &SourceSettings {
        &self.settings
    }
}

#[async_trait::async_trait]
impl StatusSource for ReqwestStatusSource {
    async fn fetch(&self) -> Result<StatusPayload, PollFailure> {
        let response = self
            .client
            .get(&self.settings.endpoint)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollFailure::HttpStatus(status.as_u16()));
        }

        let max_bytes = self.settings.max_bytes;
        if response
            .content_length()
            .is_some_and(|content_len| content_len > max_bytes)
        {
            return Err(PollFailure::TooLarge { max_bytes });
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            if body.len() as u64 + chunk.len() as u64 > max_bytes {
                return Err(PollFailure::TooLarge { max_bytes });
            }
            body.extend_from_slice(&chunk);
        }

        StatusPayload::from_json(&body)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> PollFailure {
    if err.is_timeout() {
        return PollFailure::Timeout;
    }
    PollFailure::Network(err.to_string())
}
