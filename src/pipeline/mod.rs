//! # Streaming pipeline
//!
//! Turns a chunked HTTP body into a cancellable stream of typed elements.
//!
//! ```text
//! Raw Bytes → JsonFrameCodec → codec::decode::<T> → StreamChunk<T> → ControlledStream
//!     │             │                  │                                   │
//!   HTTP      frame split on     typed decode,                      cancel / drop
//!  chunks    top-level values   fail-fast on error                  closes the body
//! ```
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`decode`] | Frame splitter and typed stream adaptor |
//! | [`cancel`] | `CancelHandle` and `ControlledStream` |

pub mod cancel;
pub mod decode;

pub use cancel::{CancelHandle, ControlledStream};
pub use decode::{decode_stream, split_frames, Framing, JsonFrameCodec};

/// One decoded element of a streamed response.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamChunk<T> {
    /// 0-based position in the stream.
    pub index: usize,
    pub value: T,
}

impl<T> StreamChunk<T> {
    pub fn into_value(self) -> T {
        self.value
    }
}

/// A streamed, typed response: lazy, consumer-paced and cancellable.
pub type ResponseStream<T> = ControlledStream<StreamChunk<T>>;
