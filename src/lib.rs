//! # genai-wire
//!
//! Typed, streaming-first client core for a JSON-over-HTTPS generative AI
//! service.
//!
//! ## Overview
//!
//! Requests are typed values encoded to JSON, sent over a pooled HTTP
//! connection and decoded back into typed responses. Every failure lands in a
//! single closed [`Error`] taxonomy; nothing is retried behind the caller's
//! back.
//!
//! ## Key Features
//!
//! - **Client façade**: [`GenAiClient`] for generation, streaming, embeddings and token counts
//! - **Streaming**: JSON-array and NDJSON bodies decoded element by element into a
//!   cancellable [`ResponseStream`]
//! - **Error mapping**: HTTP status, service error bodies and safety blocks mapped exactly
//! - **Uploads**: the resumable upload handshake via [`upload::FilesApi`]
//! - **Batch jobs**: create and follow server-side jobs via [`batch::BatchController`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use genai_wire::types::{GenerateContentRequest, Model};
//! use genai_wire::GenAiClient;
//!
//! #[tokio::main]
//! async fn main() -> genai_wire::Result<()> {
//!     let client = GenAiClient::from_env()?;
//!     let model = Model::gemini("gemini-2.0-flash");
//!
//!     let mut stream = client
//!         .stream_generate_content(&model, &GenerateContentRequest::user_text("Tell me a story"))
//!         .await?;
//!     while let Some(chunk) = stream.next().await {
//!         print!("{}", chunk?.value.text().unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | `GenAiClient` and its builder |
//! | [`codec`] | JSON encode/decode of typed values |
//! | [`transport`] | HTTP transport, typed calls and error mapping |
//! | [`pipeline`] | Stream decoder and cancellation |
//! | [`upload`] | Resumable upload protocol and the files API |
//! | [`batch`] | Batch job controller |
//! | [`types`] | Request and response values |
//! | [`config`] | Client configuration |

pub mod batch;
pub mod client;
pub mod codec;
pub mod config;
pub mod error_code;
pub mod pipeline;
pub mod transport;
pub mod types;
pub mod upload;

pub use client::{GenAiClient, GenAiClientBuilder};
pub use config::ClientConfig;
pub use error_code::ErrorKind;
pub use pipeline::{CancelHandle, ResponseStream, StreamChunk};
pub use types::Model;

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
