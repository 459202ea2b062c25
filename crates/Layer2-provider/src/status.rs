//! Vendor response envelopes and the raw task status

use crate::error::RemoteError;
use cadence_foundation::{TaskId, Track};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Success code used inside vendor envelopes
pub const VENDOR_OK: i64 = 200;

/// `{ code, msg, data }` wrapper returned by every vendor endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Unwrap `data`, turning a non-200 vendor code into a RemoteError
    pub fn into_data(self) -> Result<T, RemoteError> {
        if self.code != VENDOR_OK {
            return Err(RemoteError::from_envelope(self.code, self.msg.as_deref()));
        }
        self.data
            .ok_or_else(|| RemoteError::invalid_response("envelope has no data"))
    }
}

/// Decode a vendor envelope from a JSON value
pub fn decode_envelope<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, RemoteError> {
    let envelope: Envelope<T> = serde_json::from_value(value)
        .map_err(|e| RemoteError::invalid_response(format!("unexpected body: {}", e)))?;
    envelope.into_data()
}

/// `data` of a successful creation call
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTask {
    pub task_id: String,
}

/// `data` of a record-info call
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInfo {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub response: Option<RecordResponse>,
    #[serde(default)]
    pub error_code: Option<serde_json::Value>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    #[serde(default)]
    pub suno_data: Option<Vec<Track>>,
}

/// Result of one status check, before classification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStatus {
    pub status: String,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}

impl RawStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Default::default()
        }
    }

    pub fn with_tracks(mut self, tracks: Vec<Track>) -> Self {
        self.tracks = tracks;
        self
    }

    pub fn with_error(mut self, message: impl Into<String>, code: Option<String>) -> Self {
        self.error_message = Some(message.into());
        self.error_code = code;
        self
    }

    /// Build from a record-info payload; `task_id` is only used for logging context
    pub fn from_record(task_id: &TaskId, record: RecordInfo) -> Self {
        if let Some(ref reported) = record.task_id {
            if reported != task_id.as_str() {
                tracing::debug!(task_id = %task_id, reported = %reported, "Record-info returned a different task id");
            }
        }

        let error_code = record.error_code.and_then(|v| match v {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        });

        Self {
            status: record.status,
            tracks: record
                .response
                .and_then(|r| r.suno_data)
                .unwrap_or_default(),
            error_message: record.error_message.filter(|m| !m.is_empty()),
            error_code,
        }
    }
}
