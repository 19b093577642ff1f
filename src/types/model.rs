//! Models and the operations they support.
//!
//! A [`Model`] carries its capability set, so an unsupported model/operation
//! pairing (say, `embedContent` on a text-generation model) is rejected before
//! any request is sent.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An operation a model may support, named after the service's
/// `supportedGenerationMethods` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    GenerateContent,
    StreamGenerateContent,
    CountTokens,
    EmbedContent,
    BatchGenerateContent,
}

impl Capability {
    /// Method name as used in endpoint paths (`models/{m}:{method}`).
    pub fn method(&self) -> &'static str {
        match self {
            Self::GenerateContent => "generateContent",
            Self::StreamGenerateContent => "streamGenerateContent",
            Self::CountTokens => "countTokens",
            Self::EmbedContent => "embedContent",
            Self::BatchGenerateContent => "batchGenerateContent",
        }
    }

    pub fn from_method(method: &str) -> Option<Self> {
        match method {
            "generateContent" => Some(Self::GenerateContent),
            "streamGenerateContent" => Some(Self::StreamGenerateContent),
            "countTokens" => Some(Self::CountTokens),
            "embedContent" => Some(Self::EmbedContent),
            "batchGenerateContent" => Some(Self::BatchGenerateContent),
            _ => None,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

/// A model reference plus the evidence of what it can do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    id: String,
    capabilities: BTreeSet<Capability>,
}

impl Model {
    /// A generative model: generate, stream, count tokens and batch.
    pub fn gemini(id: impl AsRef<str>) -> Self {
        Self::with_capabilities(
            id,
            [
                Capability::GenerateContent,
                Capability::StreamGenerateContent,
                Capability::CountTokens,
                Capability::BatchGenerateContent,
            ],
        )
    }

    /// An embedding model.
    pub fn embedding(id: impl AsRef<str>) -> Self {
        Self::with_capabilities(id, [Capability::EmbedContent])
    }

    pub fn with_capabilities(
        id: impl AsRef<str>,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        let id = id.as_ref();
        Self {
            id: id.strip_prefix("models/").unwrap_or(id).to_string(),
            capabilities: capabilities.into_iter().collect(),
        }
    }

    /// Build from a model listing entry; unknown method names are ignored.
    pub fn from_methods<S: AsRef<str>>(id: impl AsRef<str>, methods: &[S]) -> Self {
        Self::with_capabilities(
            id,
            methods
                .iter()
                .filter_map(|m| Capability::from_method(m.as_ref())),
        )
    }

    /// Bare model id, e.g. `gemini-2.0-flash`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Resource name, e.g. `models/gemini-2.0-flash`.
    pub fn resource_name(&self) -> String {
        format!("models/{}", self.id)
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn capabilities(&self) -> impl Iterator<Item = Capability> + '_ {
        self.capabilities.iter().copied()
    }

    /// Endpoint path for `capability`, or `InvalidRequest` if unsupported.
    pub fn endpoint(&self, capability: Capability) -> Result<String> {
        let path = format!("{}:{}", self.resource_name(), capability.method());
        if self.supports(capability) {
            Ok(path)
        } else {
            Err(Error::invalid_request(format!(
                "model {} does not support {}",
                self.id, capability
            ))
            .with_context(ErrorContext::new().with_endpoint(path).with_source("model")))
        }
    }
}
