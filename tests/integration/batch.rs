use crate::integration::mock_server::MockServerFixture;
use genai_wire::batch::{BatchInput, BatchState, DatasetRef, InlinedRequest};
use genai_wire::types::{GenerateContentRequest, Model};
use genai_wire::ErrorKind;
use mockito::Matcher;

#[tokio::test]
async fn inline_batch_lifecycle() {
    let mut fixture = MockServerFixture::new().await;
    let create = fixture
        .server
        .mock("POST", MockServerFixture::path("models/x:batchGenerateContent"))
        .match_body(Matcher::PartialJsonString(
            r#"{"batch":{"displayName":"nightly","inputConfig":{"requests":{"requests":[{"metadata":{"key":"q1"}}]}}}}"#
                .to_string(),
        ))
        .with_status(200)
        .with_body(
            r#"{"name":"batches/b1","metadata":{"@type":"type.googleapis.com/google.ai.generativelanguage.v1main.GenerateContentBatch","model":"models/x","displayName":"nightly","state":"BATCH_STATE_PENDING"}}"#,
        )
        .create_async()
        .await;
    let _running = fixture
        .mock_json(
            "GET",
            "batches/b1",
            200,
            r#"{"name":"batches/b1","metadata":{"state":"BATCH_STATE_RUNNING"},"done":false}"#,
        )
        .await;

    let client = fixture.client();
    let batches = client.batches();
    let job = batches
        .create(
            &Model::gemini("x"),
            BatchInput::Inline(vec![
                InlinedRequest::new(GenerateContentRequest::user_text("2+2?")).with_key("q1")
            ]),
            Some("nightly"),
        )
        .await
        .unwrap();
    assert_eq!(job.name, "batches/b1");
    assert_eq!(job.state, BatchState::Pending);
    create.assert_async().await;

    let job = batches.refresh(&job).await.unwrap();
    assert_eq!(job.state, BatchState::Running);
}

#[tokio::test]
async fn finished_job_exposes_output_and_stays_terminal() {
    let mut fixture = MockServerFixture::new().await;
    let poll = fixture
        .mock_json(
            "GET",
            "batches/b2",
            200,
            r#"{"name":"batches/b2","done":true,"metadata":{"state":"BATCH_STATE_SUCCEEDED","output":{"responsesFile":"files/batch-b2-out"}}}"#,
        )
        .await;

    let batches = fixture.client().batches();
    let job = batches.poll("b2").await.unwrap();
    assert!(job.is_terminal());
    assert_eq!(
        job.output.as_ref().and_then(|o| o.responses_file.as_deref()),
        Some("files/batch-b2-out")
    );

    let again = batches.refresh(&job).await.unwrap();
    assert_eq!(again.state, BatchState::Succeeded);
    poll.assert_async().await;
}

#[tokio::test]
async fn succeeded_job_reads_succeeded_on_every_later_observation() {
    let mut fixture = MockServerFixture::new().await;
    let poll = fixture
        .server
        .mock("GET", MockServerFixture::path("batches/b9"))
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"name":"batches/b9","state":"JOB_STATE_SUCCEEDED"}"#)
        .expect(3)
        .create_async()
        .await;

    let batches = fixture.client().batches();
    let mut job = batches.poll("b9").await.unwrap();
    for _ in 0..2 {
        job = batches.poll(&job.name).await.unwrap();
        assert_eq!(job.state, BatchState::Succeeded);
    }
    for _ in 0..3 {
        job = batches.refresh(&job).await.unwrap();
        assert_eq!(job.state, BatchState::Succeeded);
    }
    poll.assert_async().await;
}

#[tokio::test]
async fn failed_job_carries_error() {
    let mut fixture = MockServerFixture::new().await;
    let _poll = fixture
        .mock_json(
            "GET",
            "batches/b3",
            200,
            r#"{"name":"batches/b3","state":"JOB_STATE_FAILED","error":{"code":3,"message":"invalid input file"}}"#,
        )
        .await;

    let job = fixture.client().batches().poll("batches/b3").await.unwrap();
    assert_eq!(job.state, BatchState::Failed);
    let error = job.error.unwrap();
    assert_eq!(error.code, 3);
    assert_eq!(error.message, "invalid input file");
}

#[tokio::test]
async fn dataset_batch_cancel_and_delete() {
    let mut fixture = MockServerFixture::new().await;
    let create = fixture
        .server
        .mock("POST", MockServerFixture::path("models/x:batchGenerateContent"))
        .match_body(Matcher::Json(serde_json::json!({
            "batch": {"inputConfig": {"fileName": "files/requests-jsonl"}}
        })))
        .with_status(200)
        .with_body(r#"{"name":"batches/b4","state":"PENDING"}"#)
        .create_async()
        .await;
    let cancel = fixture
        .mock_json("POST", "batches/b4:cancel", 200, "{}")
        .await;
    let delete = fixture.mock_json("DELETE", "batches/b4", 200, "").await;

    let batches = fixture.client().batches();
    let job = batches
        .create(
            &Model::gemini("x"),
            BatchInput::Dataset(DatasetRef::File("files/requests-jsonl".into())),
            None,
        )
        .await
        .unwrap();
    batches.cancel(job.id()).await.unwrap();
    batches.delete(&job.name).await.unwrap();

    create.assert_async().await;
    cancel.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test]
async fn list_accepts_operations_key() {
    let mut fixture = MockServerFixture::new().await;
    let _list = fixture
        .mock_json(
            "GET",
            "batches",
            200,
            r#"{"operations":[{"name":"batches/1","metadata":{"state":"BATCH_STATE_RUNNING"}},{"name":"batches/2","metadata":{"state":"BATCH_STATE_CANCELLED"}}]}"#,
        )
        .await;

    let page = fixture.client().batches().list(None, None).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[1].state, BatchState::Cancelled);
    assert!(!page.has_more());
}

#[tokio::test]
async fn unknown_batch_is_invalid_request() {
    let mut fixture = MockServerFixture::new().await;
    let _poll = fixture
        .mock_json(
            "GET",
            "batches/nope",
            404,
            r#"{"error":{"code":404,"message":"Requested entity was not found.","status":"NOT_FOUND"}}"#,
        )
        .await;

    let err = fixture.client().batches().poll("nope").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(err.status(), Some(404));
}
