//! Batch job values and their wire shapes.

use crate::types::{int64, GenerateContentRequest, GenerateContentResponse, Status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle of a batch job.
///
/// Moves forward only: `Pending → Running → {Succeeded, Failed, Cancelled, Expired}`.
/// The service spells states `PENDING`, `JOB_STATE_PENDING` or
/// `BATCH_STATE_PENDING`; all are accepted. Unknown values read as
/// `Unspecified`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BatchState {
    #[default]
    Unspecified,
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    Expired,
}

impl BatchState {
    pub fn parse(raw: &str) -> Self {
        let bare = raw
            .trim()
            .trim_start_matches("BATCH_STATE_")
            .trim_start_matches("JOB_STATE_");
        match bare.to_ascii_uppercase().as_str() {
            "PENDING" | "QUEUED" => BatchState::Pending,
            "RUNNING" => BatchState::Running,
            "SUCCEEDED" => BatchState::Succeeded,
            "FAILED" => BatchState::Failed,
            "CANCELLED" | "CANCELED" => BatchState::Cancelled,
            "EXPIRED" => BatchState::Expired,
            _ => BatchState::Unspecified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchState::Unspecified => "BATCH_STATE_UNSPECIFIED",
            BatchState::Pending => "BATCH_STATE_PENDING",
            BatchState::Running => "BATCH_STATE_RUNNING",
            BatchState::Succeeded => "BATCH_STATE_SUCCEEDED",
            BatchState::Failed => "BATCH_STATE_FAILED",
            BatchState::Cancelled => "BATCH_STATE_CANCELLED",
            BatchState::Expired => "BATCH_STATE_EXPIRED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchState::Succeeded | BatchState::Failed | BatchState::Cancelled | BatchState::Expired
        )
    }

    /// Position in the lifecycle; later states rank higher.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            BatchState::Unspecified => 0,
            BatchState::Pending => 1,
            BatchState::Running => 2,
            _ => 3,
        }
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BatchState {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BatchState {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(BatchState::parse(&raw))
    }
}

/// Why a job ended in `FAILED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    pub code: i32,
    pub message: String,
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch failed ({}): {}", self.code, self.message)
    }
}

impl std::error::Error for BatchError {}

impl From<Status> for BatchError {
    fn from(status: Status) -> Self {
        Self {
            code: status.code,
            message: status.message,
        }
    }
}

/// Request counters reported while a job runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    #[serde(default, with = "int64", skip_serializing_if = "Option::is_none")]
    pub request_count: Option<u64>,
    #[serde(default, with = "int64", skip_serializing_if = "Option::is_none")]
    pub successful_request_count: Option<u64>,
    #[serde(default, with = "int64", skip_serializing_if = "Option::is_none")]
    pub failed_request_count: Option<u64>,
    #[serde(default, with = "int64", skip_serializing_if = "Option::is_none")]
    pub pending_request_count: Option<u64>,
}

/// Where the results of a finished job are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutput {
    /// `files/{id}` holding one JSON response per line.
    pub responses_file: Option<String>,
    pub inlined_responses: Vec<InlinedResponse>,
}

/// Result of one inlined request, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlinedResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<GenerateContentResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// A server-side batch job, as last observed.
///
/// Values are snapshots; use
/// [`BatchController::refresh`](super::BatchController::refresh) to observe a
/// newer state.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchJob {
    /// `batches/{id}`
    pub name: String,
    pub display_name: Option<String>,
    pub model: Option<String>,
    pub state: BatchState,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub stats: Option<BatchStats>,
    /// Present only when `state` is `Failed`.
    pub error: Option<BatchError>,
    pub output: Option<BatchOutput>,
}

impl BatchJob {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// `{id}` part of `batches/{id}`.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// One request of an inline batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlinedRequest {
    pub request: GenerateContentRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

impl InlinedRequest {
    pub fn new(request: GenerateContentRequest) -> Self {
        Self {
            request,
            metadata: None,
        }
    }

    /// Tag the request so its response can be matched up later.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(BTreeMap::new)
            .insert("key".to_string(), key.into());
        self
    }
}

/// A dataset the service reads requests from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetRef {
    /// An uploaded JSONL file, `files/{id}`.
    File(String),
    /// A bucket URI, `gs://...`.
    Bucket(String),
}

/// What a batch job runs over.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchInput {
    Inline(Vec<InlinedRequest>),
    Dataset(DatasetRef),
}

// ---- wire ----

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateBatchBody<'a> {
    pub batch: CreateBatch<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateBatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<&'a str>,
    pub input_config: InputConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum InputConfig<'a> {
    Requests { requests: &'a [InlinedRequest] },
    FileName(&'a str),
    GcsUri(&'a str),
}

impl<'a> InputConfig<'a> {
    pub(crate) fn from_input(input: &'a BatchInput) -> Self {
        match input {
            BatchInput::Inline(requests) => InputConfig::Requests { requests },
            BatchInput::Dataset(DatasetRef::File(name)) => InputConfig::FileName(name),
            BatchInput::Dataset(DatasetRef::Bucket(uri)) => InputConfig::GcsUri(uri),
        }
    }
}

/// Fields of a job, whether they arrive bare or as operation metadata.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireJob {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    state: Option<BatchState>,
    #[serde(default)]
    create_time: Option<DateTime<Utc>>,
    #[serde(default)]
    update_time: Option<DateTime<Utc>>,
    #[serde(default)]
    end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    batch_stats: Option<BatchStats>,
    #[serde(default)]
    error: Option<Status>,
    #[serde(default)]
    output: Option<WireOutput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOutput {
    #[serde(default)]
    responses_file: Option<String>,
    #[serde(default)]
    inlined_responses: Option<InlinedResponses>,
}

/// Inline results arrive either as a list or wrapped in
/// `{"inlinedResponses": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InlinedResponses {
    List(Vec<InlinedResponse>),
    Wrapped {
        #[serde(rename = "inlinedResponses", default)]
        inlined_responses: Vec<InlinedResponse>,
    },
}

impl From<WireOutput> for BatchOutput {
    fn from(w: WireOutput) -> Self {
        let inlined_responses = match w.inlined_responses {
            Some(InlinedResponses::List(v)) => v,
            Some(InlinedResponses::Wrapped { inlined_responses }) => inlined_responses,
            None => Vec::new(),
        };
        Self {
            responses_file: w.responses_file,
            inlined_responses,
        }
    }
}

/// Long-running-operation envelope around a job.
#[derive(Debug, Deserialize)]
struct WireOperation {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    metadata: Option<WireJob>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<Status>,
    #[serde(default)]
    response: Option<Value>,
}

fn is_operation(value: &Value) -> bool {
    value.get("metadata").map_or(false, Value::is_object) || value.get("done").is_some()
}

/// Read a job from either an operation envelope or a bare job object.
pub(crate) fn job_from_value(value: Value) -> Result<BatchJob, serde_json::Error> {
    let (name, mut wire, done, op_error) = if is_operation(&value) {
        let op: WireOperation = serde_json::from_value(value)?;
        let mut wire = op.metadata.unwrap_or_default();
        if wire.output.is_none() {
            if let Some(response) = op.response {
                wire.output = serde_json::from_value::<WireJob>(response.clone())
                    .ok()
                    .and_then(|j| j.output)
                    .or_else(|| serde_json::from_value::<WireOutput>(response).ok());
            }
        }
        let name = op.name.or_else(|| wire.name.take());
        (name, wire, op.done, op.error)
    } else {
        let mut wire: WireJob = serde_json::from_value(value)?;
        (wire.name.take(), wire, false, None)
    };

    let Some(name) = name.filter(|n| !n.is_empty()) else {
        return Err(serde::de::Error::missing_field("name"));
    };

    let error = op_error.or_else(|| wire.error.take());
    let mut state = wire.state.unwrap_or_default();
    if done && !state.is_terminal() {
        state = if error.is_some() {
            BatchState::Failed
        } else {
            BatchState::Succeeded
        };
    }

    let error = if state == BatchState::Failed {
        Some(error.map(BatchError::from).unwrap_or_else(|| BatchError {
            code: 0,
            message: "job failed without error details".to_string(),
        }))
    } else {
        None
    };

    Ok(BatchJob {
        name,
        display_name: wire.display_name,
        model: wire.model,
        state,
        create_time: wire.create_time,
        update_time: wire.update_time,
        end_time: wire.end_time,
        stats: wire.batch_stats,
        error,
        output: wire.output.map(BatchOutput::from),
    })
}
