//! Client façade over the transport, upload and batch layers.
//!
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod core;

pub use builder::GenAiClientBuilder;
pub use self::core::GenAiClient;
