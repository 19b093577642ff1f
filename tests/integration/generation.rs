use crate::integration::mock_server::MockServerFixture;
use genai_wire::types::{
    CountTokensRequest, Content, EmbedContentRequest, FinishReason, GenerateContentRequest, Model,
};

#[tokio::test]
async fn generate_content_returns_single_candidate() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_json(
            "POST",
            "models/x:generateContent",
            200,
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"pong"}]},"finishReason":"STOP","index":0}],"modelVersion":"x-001"}"#,
        )
        .await;

    let resp = fixture
        .client()
        .generate_content(&Model::gemini("x"), &GenerateContentRequest::user_text("ping"))
        .await
        .unwrap();

    assert_eq!(resp.candidates.len(), 1);
    assert_eq!(resp.candidates[0].finish_reason, Some(FinishReason::Stop));
    assert_eq!(resp.text().as_deref(), Some("pong"));
    mock.assert_async().await;
}

#[tokio::test]
async fn request_body_is_camel_case_json() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", MockServerFixture::path("models/x:generateContent"))
        .match_header("content-type", "application/json")
        .match_body(mockito::Matcher::PartialJsonString(
            r#"{"contents":[{"role":"user","parts":[{"text":"hi"}]}],"systemInstruction":{"parts":[{"text":"be brief"}]}}"#
                .to_string(),
        ))
        .with_status(200)
        .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"ok"}]}}]}"#)
        .create_async()
        .await;

    fixture
        .client()
        .generate_content(
            &Model::gemini("x"),
            &GenerateContentRequest::user_text("hi").with_system_instruction("be brief"),
        )
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn embed_and_count_tokens() {
    let mut fixture = MockServerFixture::new().await;
    let _embed = fixture
        .mock_json(
            "POST",
            "models/text-embedding-004:embedContent",
            200,
            r#"{"embedding":{"values":[0.1,0.2,0.3]}}"#,
        )
        .await;
    let _count = fixture
        .mock_json("POST", "models/x:countTokens", 200, r#"{"totalTokens":12}"#)
        .await;
    let client = fixture.client();

    let emb = client
        .embed_content(
            &Model::embedding("text-embedding-004"),
            &EmbedContentRequest::text("vectorize me"),
        )
        .await
        .unwrap();
    assert_eq!(emb.embedding.values.len(), 3);

    let count = client
        .count_tokens(
            &Model::gemini("x"),
            &CountTokensRequest {
                contents: vec![Content::user("count me")],
            },
        )
        .await
        .unwrap();
    assert_eq!(count.total_tokens, 12);
}
