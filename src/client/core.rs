use crate::batch::BatchController;
use crate::client::builder::GenAiClientBuilder;
use crate::config::ClientConfig;
use crate::pipeline::ResponseStream;
use crate::transport::{classify, Api};
use crate::types::{
    Capability, CountTokensRequest, CountTokensResponse, EmbedContentRequest,
    EmbedContentResponse, GenerateContentRequest, GenerateContentResponse, Model,
};
use crate::upload::FilesApi;
use crate::{ErrorContext, Result};
use std::sync::Arc;
use tracing::debug;

struct Inner {
    api: Api,
}

/// Entry point for calls to the generative service.
///
/// Cheap to clone; clones share one connection pool. Every model-bound call
/// checks the model's capabilities first and fails with `InvalidRequest`
/// before any network I/O when the pairing is unsupported.
#[derive(Clone)]
pub struct GenAiClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for GenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAiClient").finish_non_exhaustive()
    }
}

impl GenAiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        GenAiClientBuilder::new().config(config).build()
    }

    /// Configuration from `GEMINI_API_KEY` and the `GENAI_*` variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn builder() -> GenAiClientBuilder {
        GenAiClientBuilder::new()
    }

    pub(crate) fn from_api(api: Api) -> Self {
        Self {
            inner: Arc::new(Inner { api }),
        }
    }

    /// Typed access to arbitrary endpoints.
    pub fn api(&self) -> &Api {
        &self.inner.api
    }

    /// `POST models/{m}:generateContent`.
    ///
    /// A 200 whose prompt or every candidate was blocked is `Error::Safety`.
    pub async fn generate_content(
        &self,
        model: &Model,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let endpoint = model.endpoint(Capability::GenerateContent)?;
        let response: GenerateContentResponse = self.inner.api.post(&endpoint, request).await?;
        classify::check_safety(&response)
            .map_err(|e| e.with_context(ErrorContext::new().with_endpoint(endpoint)))?;
        Ok(response)
    }

    /// `POST models/{m}:streamGenerateContent`, one response per element.
    ///
    /// The stream yields elements as they complete, ends at the first error
    /// (including a safety block on any element), and closes the connection
    /// when dropped or cancelled.
    pub async fn stream_generate_content(
        &self,
        model: &Model,
        request: &GenerateContentRequest,
    ) -> Result<ResponseStream<GenerateContentResponse>> {
        let endpoint = model.endpoint(Capability::StreamGenerateContent)?;
        let stream = self
            .inner
            .api
            .post_stream::<_, GenerateContentResponse>(&endpoint, request)
            .await?;
        debug!(model = model.id(), "generation stream open");
        Ok(stream.check_each(move |chunk| {
            classify::check_safety(&chunk.value).map_err(|e| {
                e.with_context(
                    ErrorContext::new()
                        .with_endpoint(endpoint.clone())
                        .with_details(format!("stream element {}", chunk.index)),
                )
            })
        }))
    }

    /// `POST models/{m}:embedContent`.
    pub async fn embed_content(
        &self,
        model: &Model,
        request: &EmbedContentRequest,
    ) -> Result<EmbedContentResponse> {
        let endpoint = model.endpoint(Capability::EmbedContent)?;
        self.inner.api.post(&endpoint, request).await
    }

    /// `POST models/{m}:countTokens`.
    pub async fn count_tokens(
        &self,
        model: &Model,
        request: &CountTokensRequest,
    ) -> Result<CountTokensResponse> {
        let endpoint = model.endpoint(Capability::CountTokens)?;
        self.inner.api.post(&endpoint, request).await
    }

    pub fn files(&self) -> FilesApi {
        FilesApi::new(self.inner.api.clone())
    }

    pub fn batches(&self) -> BatchController {
        BatchController::new(self.inner.api.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_code::ErrorKind;
    use crate::transport::testing::ScriptedTransport;
    use crate::transport::Target;
    use crate::Error;
    use futures::StreamExt;

    fn client(transport: &Arc<ScriptedTransport>) -> GenAiClient {
        GenAiClient::builder()
            .transport(transport.clone())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn generate_content_round_trip() {
        let transport = ScriptedTransport::new();
        transport.reply(
            200,
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello"}]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":3,"candidatesTokenCount":1,"totalTokenCount":4}}"#,
        );
        let resp = client(&transport)
            .generate_content(&Model::gemini("gemini-2.0-flash"), &GenerateContentRequest::user_text("Hi"))
            .await
            .unwrap();
        assert_eq!(resp.text().as_deref(), Some("Hello"));
        assert_eq!(
            transport.requests()[0].target,
            Target::Path("models/gemini-2.0-flash:generateContent".into())
        );
    }

    #[tokio::test]
    async fn capability_mismatch_fails_without_io() {
        let transport = ScriptedTransport::new();
        let c = client(&transport);
        let err = c
            .embed_content(&Model::gemini("gemini-2.0-flash"), &EmbedContentRequest::text("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        let err = c
            .generate_content(&Model::embedding("text-embedding-004"), &GenerateContentRequest::user_text("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn blocked_prompt_is_safety_error() {
        let transport = ScriptedTransport::new();
        transport.reply(200, r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        let err = client(&transport)
            .generate_content(&Model::gemini("g"), &GenerateContentRequest::user_text("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Safety { .. }));
    }

    #[tokio::test]
    async fn error_envelope_with_success_status_is_an_error() {
        let transport = ScriptedTransport::new();
        transport.reply(
            200,
            r#"{"error":{"code":503,"message":"The model is overloaded.","status":"UNAVAILABLE"}}"#,
        );
        let err = client(&transport)
            .generate_content(&Model::gemini("g"), &GenerateContentRequest::user_text("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Model);
        assert_eq!(err.status(), Some(503));
        assert!(err.context().unwrap().request_id.is_some());
    }

    #[tokio::test]
    async fn stream_stops_at_error_element() {
        let transport = ScriptedTransport::new();
        transport.reply(
            200,
            r#"[{"candidates":[{"content":{"parts":[{"text":"a"}]}}]},
{"error":{"code":503,"message":"overloaded","status":"UNAVAILABLE"}},
{"candidates":[{"content":{"parts":[{"text":"c"}]}}]}]"#,
        );
        let stream = client(&transport)
            .stream_generate_content(&Model::gemini("g"), &GenerateContentRequest::user_text("x"))
            .await
            .unwrap();
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().value.text().as_deref(), Some("a"));
        assert_eq!(items[1].as_ref().unwrap_err().kind(), ErrorKind::Model);
    }

    #[tokio::test]
    async fn stream_stops_at_blocked_chunk() {
        let transport = ScriptedTransport::new();
        transport.reply(
            200,
            r#"[{"candidates":[{"content":{"parts":[{"text":"a"}]}}]},
{"candidates":[{"finishReason":"SAFETY"}]},
{"candidates":[{"content":{"parts":[{"text":"c"}]}}]}]"#,
        );
        let stream = client(&transport)
            .stream_generate_content(&Model::gemini("g"), &GenerateContentRequest::user_text("x"))
            .await
            .unwrap();
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().value.text().as_deref(), Some("a"));
        assert_eq!(items[1].as_ref().unwrap_err().kind(), ErrorKind::Safety);
    }

    #[tokio::test]
    async fn embed_and_count() {
        let transport = ScriptedTransport::new();
        transport
            .reply(200, r#"{"embedding":{"values":[0.5,-1.0]}}"#)
            .reply(200, r#"{"totalTokens":7}"#);
        let c = client(&transport);
        let emb = c
            .embed_content(&Model::embedding("text-embedding-004"), &EmbedContentRequest::text("x"))
            .await
            .unwrap();
        assert_eq!(emb.embedding.values, vec![0.5, -1.0]);
        let count = c
            .count_tokens(
                &Model::gemini("g"),
                &CountTokensRequest {
                    contents: vec![crate::types::Content::user("x")],
                },
            )
            .await
            .unwrap();
        assert_eq!(count.total_tokens, 7);
    }
}
