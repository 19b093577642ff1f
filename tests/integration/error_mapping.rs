use crate::integration::mock_server::MockServerFixture;
use genai_wire::types::{GenerateContentRequest, Model};
use genai_wire::{ClientConfig, Error, ErrorKind, GenAiClient};
use std::time::Duration;

async fn generate(fixture: &MockServerFixture) -> Error {
    fixture
        .client()
        .generate_content(&Model::gemini("x"), &GenerateContentRequest::user_text("hi"))
        .await
        .unwrap_err()
}

#[tokio::test]
async fn rate_limit_keeps_retry_after_and_body() {
    let mut fixture = MockServerFixture::new().await;
    let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
    let _m = fixture
        .server
        .mock("POST", MockServerFixture::path("models/x:generateContent"))
        .with_status(429)
        .with_header("retry-after", "30")
        .with_body(body)
        .create_async()
        .await;

    let err = generate(&fixture).await;
    match &err {
        Error::RateLimit {
            retry_after,
            raw_body,
            context,
            ..
        } => {
            assert_eq!(*retry_after, Some(Duration::from_secs(30)));
            assert_eq!(raw_body, body);
            assert_eq!(context.status_code, Some(429));
            assert!(context.request_id.is_some());
        }
        other => panic!("expected RateLimit, got {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unauthorized_is_auth() {
    let mut fixture = MockServerFixture::new().await;
    let _m = fixture
        .mock_json(
            "POST",
            "models/x:generateContent",
            401,
            r#"{"error":{"code":401,"message":"API key not valid","status":"UNAUTHENTICATED"}}"#,
        )
        .await;

    let err = generate(&fixture).await;
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(err.status(), Some(401));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn server_error_is_model_error() {
    let mut fixture = MockServerFixture::new().await;
    let _m = fixture
        .mock_json(
            "POST",
            "models/x:generateContent",
            503,
            r#"{"error":{"code":503,"message":"The model is overloaded","status":"UNAVAILABLE"}}"#,
        )
        .await;

    let err = generate(&fixture).await;
    assert_eq!(err.kind(), ErrorKind::Model);
    assert!(err.to_string().contains("overloaded"));
}

#[tokio::test]
async fn unparseable_success_body_is_decode_error() {
    let mut fixture = MockServerFixture::new().await;
    let _m = fixture
        .mock_json("POST", "models/x:generateContent", 200, "{not json")
        .await;

    let err = generate(&fixture).await;
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(err.raw_body(), Some("{not json"));
    assert_eq!(err.status(), Some(200));
}

#[tokio::test]
async fn error_envelope_with_200_is_not_a_success() {
    let mut fixture = MockServerFixture::new().await;
    let _m = fixture
        .mock_json(
            "POST",
            "models/x:generateContent",
            200,
            r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#,
        )
        .await;

    let err = generate(&fixture).await;
    assert_eq!(err.kind(), ErrorKind::RateLimit);
    assert!(err.to_string().contains("Quota exceeded"));
    assert!(err.raw_body().unwrap().contains("RESOURCE_EXHAUSTED"));
}

#[tokio::test]
async fn refused_connection_is_connection_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = GenAiClient::new(
        ClientConfig::new("k")
            .with_base_url(format!("http://127.0.0.1:{}/v1beta", port))
            .with_timeout(Duration::from_secs(5)),
    )
    .unwrap();

    let err = client
        .generate_content(&Model::gemini("x"), &GenerateContentRequest::user_text("hi"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn missing_key_fails_at_construction() {
    let err = GenAiClient::new(ClientConfig::default().with_base_url("http://127.0.0.1:1/")).unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));
}
