//! # Types Module
//!
//! Typed request and response values exchanged with the service. The crate
//! forwards them as given; field-level validation belongs to the caller.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`content`] | Conversation turns and parts |
//! | [`generation`] | `generateContent` request/response |
//! | [`embedding`] | `embedContent` and `countTokens` |
//! | [`file`] | Uploaded file resources |
//! | [`model`] | Models and capability checks |
//!
//! ## Example
//!
//! ```rust
//! use genai_wire::types::{Capability, GenerateContentRequest, Model};
//!
//! let model = Model::gemini("gemini-2.0-flash");
//! assert!(model.supports(Capability::GenerateContent));
//! let req = GenerateContentRequest::user_text("Write a haiku about borrow checking");
//! assert_eq!(req.contents.len(), 1);
//! ```

pub mod content;
pub mod embedding;
pub mod file;
pub mod generation;
pub mod model;

pub use content::{Blob, Content, FileData, FunctionCall, FunctionResponse, Part, Role};
pub use embedding::{
    ContentEmbedding, CountTokensRequest, CountTokensResponse, EmbedContentRequest,
    EmbedContentResponse,
};
pub use file::{FileResource, FileState, ListFilesResponse};
pub use generation::{
    Candidate, FinishReason, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    PromptFeedback, SafetyRating, SafetySetting, UsageMetadata,
};
pub use model::{Capability, Model};

use serde::{Deserialize, Serialize};

/// `google.rpc.Status`, as embedded in failed files and batch jobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<serde_json::Value>,
}

/// One page of a list call.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Pass back to fetch the next page; `None` on the last page.
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page_token: Option<String>) -> Self {
        Self {
            items,
            next_page_token: next_page_token.filter(|t| !t.is_empty()),
        }
    }

    pub fn has_more(&self) -> bool {
        self.next_page_token.is_some()
    }
}

/// int64 fields arrive as JSON strings; accept numbers too.
pub(crate) mod int64 {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(u64),
        Str(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        match Option::<Repr>::deserialize(d)? {
            None => Ok(None),
            Some(Repr::Num(n)) => Ok(Some(n)),
            Some(Repr::Str(s)) => s
                .parse::<u64>()
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }

    pub fn serialize<S: Serializer>(value: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(n) => s.serialize_str(&n.to_string()),
            None => s.serialize_none(),
        }
    }
}
