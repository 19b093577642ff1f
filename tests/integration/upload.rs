use crate::integration::mock_server::{MockServerFixture, TEST_KEY};
use genai_wire::types::FileState;
use genai_wire::upload::{UploadPhase, UploadSource};
use genai_wire::ErrorKind;
use mockito::Matcher;

const FINAL: &str = r#"{"file":{"name":"files/abc123","displayName":"greeting","mimeType":"text/plain","sizeBytes":"11","createTime":"2025-03-01T10:00:00.000000Z","uri":"https://example.test/v1beta/files/abc123","state":"ACTIVE"}}"#;

#[tokio::test]
async fn resumable_handshake_returns_file() {
    let mut fixture = MockServerFixture::new().await;
    let session_url = format!("{}/upload/session/abc?upload_id=abc", fixture.base_url);

    let start = fixture
        .server
        .mock("POST", Matcher::Regex("^/upload/v1beta/files".into()))
        .match_query(Matcher::UrlEncoded("key".into(), TEST_KEY.into()))
        .match_header("x-goog-upload-protocol", "resumable")
        .match_header("x-goog-upload-command", "start")
        .match_header("x-goog-upload-header-content-length", "11")
        .match_header("x-goog-upload-header-content-type", "text/plain")
        .match_body(Matcher::PartialJsonString(
            r#"{"file":{"display_name":"greeting"}}"#.to_string(),
        ))
        .with_status(200)
        .with_header("x-goog-upload-url", &session_url)
        .create_async()
        .await;
    let transfer = fixture
        .server
        .mock("PUT", Matcher::Regex("^/upload/session/abc".into()))
        .match_header("x-goog-upload-command", "upload, finalize")
        .match_header("x-goog-upload-offset", "0")
        .match_body("hello world")
        .with_status(200)
        .with_body(FINAL)
        .create_async()
        .await;

    let file = fixture
        .client()
        .files()
        .upload(UploadSource::bytes(&b"hello world"[..], "text/plain").with_display_name("greeting"))
        .await
        .unwrap();

    assert_eq!(file.name, "files/abc123");
    assert_eq!(file.size_bytes, Some(11));
    assert_eq!(file.state, FileState::Active);
    start.assert_async().await;
    transfer.assert_async().await;
}

#[tokio::test]
async fn missing_upload_url_fails_initiate() {
    let mut fixture = MockServerFixture::new().await;
    let _start = fixture
        .server
        .mock("POST", Matcher::Regex("^/upload/v1beta/files".into()))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    let transfer = fixture
        .server
        .mock("PUT", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let err = fixture
        .client()
        .files()
        .upload(UploadSource::bytes(&b"data"[..], "application/octet-stream"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(err.phase(), Some(UploadPhase::Initiate));
    transfer.assert_async().await;
}

#[tokio::test]
async fn unrecognised_finalize_body_fails_finalize() {
    let mut fixture = MockServerFixture::new().await;
    let session_url = format!("{}/upload/session/z", fixture.base_url);
    let _start = fixture
        .server
        .mock("POST", Matcher::Regex("^/upload/v1beta/files".into()))
        .with_status(200)
        .with_header("x-goog-upload-url", &session_url)
        .create_async()
        .await;
    let _transfer = fixture
        .server
        .mock("PUT", "/upload/session/z")
        .with_status(200)
        .with_body(r#"{"status":"ok"}"#)
        .create_async()
        .await;

    let err = fixture
        .client()
        .files()
        .upload(UploadSource::bytes(&b"data"[..], "application/octet-stream"))
        .await
        .unwrap_err();
    assert_eq!(err.phase(), Some(UploadPhase::Finalize));
    assert_eq!(err.raw_body(), Some(r#"{"status":"ok"}"#));
}

#[tokio::test]
async fn transfer_rejection_is_tagged_with_cause() {
    let mut fixture = MockServerFixture::new().await;
    let session_url = format!("{}/upload/session/q", fixture.base_url);
    let _start = fixture
        .server
        .mock("POST", Matcher::Regex("^/upload/v1beta/files".into()))
        .with_status(200)
        .with_header("x-goog-upload-url", &session_url)
        .create_async()
        .await;
    let _transfer = fixture
        .server
        .mock("PUT", "/upload/session/q")
        .with_status(413)
        .with_body(r#"{"error":{"code":413,"message":"payload too large"}}"#)
        .create_async()
        .await;

    let err = fixture
        .client()
        .files()
        .upload(UploadSource::bytes(&b"data"[..], "application/octet-stream"))
        .await
        .unwrap_err();
    assert_eq!(err.phase(), Some(UploadPhase::Transfer));
    assert_eq!(err.status(), Some(413));
    assert!(err.raw_body().unwrap().contains("payload too large"));
}

#[tokio::test]
async fn get_and_list_files() {
    let mut fixture = MockServerFixture::new().await;
    let _get = fixture
        .mock_json(
            "GET",
            "files/abc123",
            200,
            r#"{"name":"files/abc123","uri":"u","state":"PROCESSING"}"#,
        )
        .await;
    let _list = fixture
        .server
        .mock("GET", Matcher::Regex("^/v1beta/files".into()))
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("key".into(), TEST_KEY.into()),
            Matcher::UrlEncoded("pageSize".into(), "1".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"files":[{"name":"files/abc123","uri":"u"}],"nextPageToken":"p2"}"#)
        .create_async()
        .await;

    let files = fixture.client().files();
    let file = files.get("abc123").await.unwrap();
    assert_eq!(file.state, FileState::Processing);
    let page = files.list(Some(1), None).await.unwrap();
    assert_eq!(page.items[0].name, "files/abc123");
    assert_eq!(page.next_page_token.as_deref(), Some("p2"));
}
