use crate::integration::mock_server::MockServerFixture;
use futures::StreamExt;
use genai_wire::types::{GenerateContentRequest, Model};
use genai_wire::ErrorKind;
use std::io::Write;
use std::time::Duration;

const CHUNK: &str = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"tick"}]}}]}"#;

#[tokio::test]
async fn json_array_stream_yields_each_element() {
    let mut fixture = MockServerFixture::new().await;
    let body = format!(
        "[{},\r\n{},\r\n{}]",
        CHUNK.replace("tick", "one"),
        CHUNK.replace("tick", "two"),
        CHUNK.replace("tick", "three")
    );
    let _m = fixture
        .mock_json("POST", "models/x:streamGenerateContent", 200, &body)
        .await;

    let stream = fixture
        .client()
        .stream_generate_content(&Model::gemini("x"), &GenerateContentRequest::user_text("count"))
        .await
        .unwrap();
    let texts: Vec<String> = stream
        .map(|item| item.unwrap().value.text().unwrap_or_default())
        .collect()
        .await;
    assert_eq!(texts, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn ndjson_stream_is_accepted() {
    let mut fixture = MockServerFixture::new().await;
    let body = format!("{}\n{}\n", CHUNK, CHUNK);
    let _m = fixture
        .mock_json("POST", "models/x:streamGenerateContent", 200, &body)
        .await;

    let stream = fixture
        .client()
        .stream_generate_content(&Model::gemini("x"), &GenerateContentRequest::user_text("x"))
        .await
        .unwrap();
    let items: Vec<_> = stream.collect().await;
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.is_ok()));
}

#[tokio::test]
async fn error_status_fails_before_streaming() {
    let mut fixture = MockServerFixture::new().await;
    let _m = fixture
        .mock_json(
            "POST",
            "models/x:streamGenerateContent",
            400,
            r#"{"error":{"code":400,"message":"contents is not specified","status":"INVALID_ARGUMENT"}}"#,
        )
        .await;

    let err = fixture
        .client()
        .stream_generate_content(&Model::gemini("x"), &GenerateContentRequest::new(vec![]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert!(err.raw_body().unwrap().contains("contents is not specified"));
}

#[tokio::test]
async fn truncated_stream_ends_with_decode_error() {
    let mut fixture = MockServerFixture::new().await;
    let body = format!("[{},{{\"candidates\":[", CHUNK);
    let _m = fixture
        .mock_json("POST", "models/x:streamGenerateContent", 200, &body)
        .await;

    let stream = fixture
        .client()
        .stream_generate_content(&Model::gemini("x"), &GenerateContentRequest::user_text("x"))
        .await
        .unwrap();
    let items: Vec<_> = stream.collect().await;
    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert_eq!(items[1].as_ref().unwrap_err().kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn cancel_mid_stream_stops_emissions() {
    let mut fixture = MockServerFixture::new().await;
    let _m = fixture
        .server
        .mock("POST", MockServerFixture::path("models/x:streamGenerateContent"))
        .with_status(200)
        .with_chunked_body(|w| {
            w.write_all(b"[")?;
            w.write_all(CHUNK.as_bytes())?;
            w.flush()?;
            for _ in 0..40 {
                std::thread::sleep(Duration::from_millis(25));
                w.write_all(b",")?;
                w.write_all(CHUNK.as_bytes())?;
                w.flush()?;
            }
            w.write_all(b"]")
        })
        .create_async()
        .await;

    let mut stream = fixture
        .client()
        .stream_generate_content(&Model::gemini("x"), &GenerateContentRequest::user_text("x"))
        .await
        .unwrap();
    let handle = stream.cancel_handle();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.index, 0);

    handle.cancel();
    assert!(stream.next().await.is_none());
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn error_element_mid_stream_ends_with_mapped_error() {
    let mut fixture = MockServerFixture::new().await;
    let body = format!(
        "[{},\r\n{},\r\n{}]",
        CHUNK.replace("tick", "a"),
        r#"{"error":{"code":503,"message":"overloaded","status":"UNAVAILABLE"}}"#,
        CHUNK.replace("tick", "never")
    );
    let _m = fixture
        .mock_json("POST", "models/x:streamGenerateContent", 200, &body)
        .await;

    let stream = fixture
        .client()
        .stream_generate_content(&Model::gemini("x"), &GenerateContentRequest::user_text("x"))
        .await
        .unwrap();
    let items: Vec<_> = stream.collect().await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap().value.text().as_deref(), Some("a"));
    let err = items[1].as_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Model);
    assert_eq!(err.status(), Some(503));
}
