//! Stored files produced by the upload protocol.

use super::{int64, Status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file held by the service.
///
/// Only re-fetching (`FilesApi::get`) observes a newer state; the value itself
/// is never mutated by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResource {
    /// `files/{id}`
    pub name: String,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, with = "int64", skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub state: FileState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Status>,
}

impl FileResource {
    pub fn is_active(&self) -> bool {
        self.state == FileState::Active
    }

    pub fn is_failed(&self) -> bool {
        self.state == FileState::Failed
    }

    /// `{id}` part of `files/{id}`.
    pub fn id(&self) -> &str {
        self.name.strip_prefix("files/").unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    Processing,
    Active,
    Failed,
    /// `STATE_UNSPECIFIED`, or any state added after this crate was built.
    #[default]
    #[serde(other)]
    StateUnspecified,
}

/// Page of `files.list`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesResponse {
    #[serde(default)]
    pub files: Vec<FileResource>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}
