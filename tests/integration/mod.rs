//! Integration tests with mock HTTP server

pub mod batch;
pub mod error_mapping;
pub mod generation;
pub mod mock_server;
pub mod streaming;
pub mod upload;
