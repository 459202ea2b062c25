//! Suno-compatible HTTP client
//!
//! Bearer-token JSON API. Every endpoint wraps its result in
//! `{ code, msg, data }`; both the HTTP status and the envelope code are
//! classified into a RemoteError.

use crate::{
    error::RemoteError,
    r#trait::{Created, RemoteClient},
    request::GenerationRequest,
    retry::{with_retry, RetryConfig},
    status::{decode_envelope, CreatedTask, Envelope, RawStatus, RecordInfo},
};
use async_trait::async_trait;
use cadence_foundation::{ApiConfig, Error, GenerationKind, Result, TaskId};
use reqwest::{header::HeaderMap, Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CALLBACK_URL: &str = "https://example.com/callback";

/// Vendor endpoints, relative to the base URL
pub mod endpoints {
    pub const GENERATE: &str = "/generate";
    pub const COVER: &str = "/generate/upload-cover";
    pub const EXTEND: &str = "/generate/upload-extend";
    pub const RECORD_INFO: &str = "/generate/record-info";
    pub const CREDITS: &str = "/chat/credit";
    pub const DOWNLOAD_URL: &str = "/common/download-url";
}

/// HTTP client for the music generation service
#[derive(Debug, Clone)]
pub struct SunoClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
    callback_url: String,
    retry: RetryConfig,
}

impl SunoClient {
    /// Create a client with the default 30s per-call timeout
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
            callback_url: DEFAULT_CALLBACK_URL.to_string(),
            retry: RetryConfig::default(),
        })
    }

    /// Create from the `api` config section
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let client = Self::new(config.require_base_url()?, config.require_api_key()?)?
            .with_timeout(config.request_timeout())?
            .with_callback_url(config.callback_url.clone());
        Ok(client)
    }

    /// Set custom per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_http_client(timeout)?;
        self.timeout = timeout;
        Ok(self)
    }

    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = url.into();
        self
    }

    /// Retry policy for idempotent auxiliary calls
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn endpoint_for(kind: GenerationKind) -> &'static str {
        match kind {
            GenerationKind::Generate => endpoints::GENERATE,
            GenerationKind::Cover => endpoints::COVER,
            GenerationKind::Extend => endpoints::EXTEND,
        }
    }

    /// Send and decode the JSON body, classifying HTTP-level failures
    async fn send_json(&self, request: RequestBuilder) -> std::result::Result<Value, RemoteError> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| RemoteError::from_reqwest(&e))?;

        let status = response.status();
        let retry_after = retry_after(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::from_reqwest(&e))?;

        if !status.is_success() {
            // Prefer the vendor's message when the error body is an envelope
            let message = serde_json::from_str::<Envelope<Value>>(&body)
                .ok()
                .and_then(|env| env.msg)
                .unwrap_or(body);
            return Err(RemoteError::from_http_status(status.as_u16(), &message)
                .with_retry_after(retry_after));
        }

        serde_json::from_str(&body)
            .map_err(|e| RemoteError::invalid_response(format!("invalid JSON body: {}", e)))
    }

    /// Remaining account credits
    pub async fn credits(&self) -> std::result::Result<f64, RemoteError> {
        with_retry(&self.retry, "credits", move || async move {
            let value = self
                .send_json(self.client.get(self.url(endpoints::CREDITS)))
                .await?;
            decode_envelope::<f64>(value)
        })
        .await
    }

    /// Resolve a temporary download link for a produced file
    pub async fn download_url(&self, file_url: &str) -> std::result::Result<String, RemoteError> {
        #[derive(Serialize)]
        struct DownloadRequest<'a> {
            url: &'a str,
        }

        with_retry(&self.retry, "download_url", move || async move {
            let value = self
                .send_json(
                    self.client
                        .post(self.url(endpoints::DOWNLOAD_URL))
                        .json(&DownloadRequest { url: file_url }),
                )
                .await?;
            decode_envelope::<String>(value)
        })
        .await
    }
}

/// `Retry-After` in its delta-seconds form; HTTP dates are ignored
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

#[async_trait]
impl RemoteClient for SunoClient {
    fn id(&self) -> &str {
        "suno"
    }

    fn payload_for(&self, request: &GenerationRequest) -> Value {
        request.to_payload(&self.callback_url)
    }

    async fn create(&self, request: &GenerationRequest) -> std::result::Result<Created, RemoteError> {
        let kind = request.kind();
        let url = self.url(Self::endpoint_for(kind));
        let payload = self.payload_for(request);

        debug!(kind = %kind, model = %request.model, url = %url, "Creating generation task");

        let response = self
            .send_json(self.client.post(&url).json(&payload))
            .await
            .map_err(|e| {
                warn!(kind = %kind, code = %e.code, "Create request failed: {}", e.message);
                e
            })?;

        let created: CreatedTask = decode_envelope(response.clone())?;
        if created.task_id.trim().is_empty() {
            return Err(RemoteError::invalid_response("empty taskId in response"));
        }

        debug!(kind = %kind, task_id = %created.task_id, "Generation task created");

        Ok(Created {
            task_id: TaskId::new(created.task_id),
            response,
        })
    }

    async fn check_status(&self, task_id: &TaskId) -> std::result::Result<RawStatus, RemoteError> {
        let request = self
            .client
            .get(self.url(endpoints::RECORD_INFO))
            .query(&[("taskId", task_id.as_str())]);

        let value = self.send_json(request).await?;
        let record: RecordInfo = decode_envelope(value)?;
        let raw = RawStatus::from_record(task_id, record);

        debug!(task_id = %task_id, status = %raw.status, tracks = raw.tracks.len(), "Status checked");
        Ok(raw)
    }
}
