//! # Batch jobs
//!
//! Server-side batch jobs run many `generateContent` requests asynchronously.
//! [`BatchController`] submits a job over inline requests or an uploaded
//! dataset and then observes it until it reaches a terminal state.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchController`] | `create`, `poll`, `refresh`, `cancel`, `delete`, `list` |
//! | [`BatchJob`] | Snapshot of a job as last observed |
//! | [`BatchState`] | Forward-only lifecycle |
//! | [`BatchInput`] | Inline requests or a [`DatasetRef`] |
//!
//! ## Example
//!
//! ```rust,no_run
//! use genai_wire::batch::{BatchInput, InlinedRequest};
//! use genai_wire::types::{GenerateContentRequest, Model};
//! use genai_wire::GenAiClient;
//!
//! # async fn run(client: GenAiClient) -> genai_wire::Result<()> {
//! let batches = client.batches();
//! let mut job = batches
//!     .create(
//!         &Model::gemini("gemini-2.0-flash"),
//!         BatchInput::Inline(vec![InlinedRequest::new(GenerateContentRequest::user_text("hi"))]),
//!         Some("example"),
//!     )
//!     .await?;
//! while !job.is_terminal() {
//!     tokio::time::sleep(std::time::Duration::from_secs(30)).await;
//!     job = batches.refresh(&job).await?;
//! }
//! # Ok(())
//! # }
//! ```

mod controller;
mod job;

pub use controller::{batch_name, BatchController};
pub use job::{
    BatchError, BatchInput, BatchJob, BatchOutput, BatchState, BatchStats, DatasetRef,
    InlinedRequest, InlinedResponse,
};
