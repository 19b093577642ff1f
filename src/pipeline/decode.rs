//! Streaming decoder (Bytes -> typed values)
//!
//! Streamed responses arrive either as one top-level JSON array whose elements
//! trickle in over many HTTP chunks, or as newline-delimited JSON. Both are
//! framed by the same scanner: it tracks bracket depth outside string literals
//! and cuts a frame the moment a top-level value is complete, so elements are
//! emitted as soon as their last byte arrives and independently of how the
//! network split the bytes.

use super::StreamChunk;
use crate::codec;
use crate::transport::classify;
use crate::{BoxStream, Error, ErrorContext, Result};
use bytes::{Buf, Bytes, BytesMut};
use futures::{stream, StreamExt};
use serde::de::DeserializeOwned;
use tokio_util::codec::Decoder;

/// How top-level values are laid out in the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// Decide from the first non-whitespace byte: `[` means [`Framing::Array`],
    /// anything else [`Framing::Ndjson`].
    #[default]
    Auto,
    /// A single JSON array; each element is one frame.
    Array,
    /// Whitespace-separated JSON values (NDJSON / JSON Lines); each value is one frame.
    Ndjson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArrayState {
    Unopened,
    ExpectFirst,
    ExpectValue,
    AfterValue,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Container,
    String,
    Bare,
}

/// Incremental frame splitter for JSON value streams.
///
/// Implements [`tokio_util::codec::Decoder`], yielding the raw bytes of each
/// complete top-level value. Consumed bytes are released from the buffer after
/// every frame, so the buffer only ever holds the value being assembled.
#[derive(Debug, Clone)]
pub struct JsonFrameCodec {
    framing: Framing,
    array: ArrayState,
    /// Scan position, relative to the start of the buffer.
    pos: usize,
    /// Start of the value being assembled, relative to the start of the buffer.
    start: Option<usize>,
    kind: ValueKind,
    depth: usize,
    in_string: bool,
    escaped: bool,
    /// Bytes already released from the buffer, for error offsets.
    released: usize,
}

impl Default for JsonFrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFrameCodec {
    pub fn new() -> Self {
        Self::with_framing(Framing::Auto)
    }

    pub fn with_framing(framing: Framing) -> Self {
        Self {
            framing,
            array: ArrayState::Unopened,
            pos: 0,
            start: None,
            kind: ValueKind::Container,
            depth: 0,
            in_string: false,
            escaped: false,
            released: 0,
        }
    }

    /// Framing in effect; `Auto` until the first byte has been seen.
    pub fn framing(&self) -> Framing {
        self.framing
    }

    fn begin_value(&mut self, byte: u8) {
        self.start = Some(self.pos);
        match byte {
            b'{' | b'[' => {
                self.kind = ValueKind::Container;
                self.depth = 1;
            }
            b'"' => {
                self.kind = ValueKind::String;
                self.in_string = true;
            }
            _ => self.kind = ValueKind::Bare,
        }
    }

    /// Handle one byte outside any value.
    ///
    /// Returns `Ok(true)` when the byte starts a value.
    fn between_values(&mut self, byte: u8, buf: &BytesMut) -> Result<bool> {
        if byte.is_ascii_whitespace() {
            return Ok(false);
        }
        if self.framing == Framing::Auto {
            self.framing = if byte == b'[' {
                Framing::Array
            } else {
                Framing::Ndjson
            };
        }
        if self.framing == Framing::Ndjson {
            return Ok(true);
        }
        match (self.array, byte) {
            (ArrayState::Unopened, b'[') => self.array = ArrayState::ExpectFirst,
            (ArrayState::Unopened, _) => {
                return Err(self.error(buf, "expected '[' at start of JSON array stream"))
            }
            (ArrayState::ExpectFirst | ArrayState::AfterValue, b']') => {
                self.array = ArrayState::Closed
            }
            (ArrayState::AfterValue, b',') => self.array = ArrayState::ExpectValue,
            (ArrayState::AfterValue, _) => {
                return Err(self.error(buf, "expected ',' or ']' after array element"))
            }
            (ArrayState::Closed, _) => {
                return Err(self.error(buf, "unexpected data after end of JSON array"))
            }
            (_, b',' | b']') => {
                return Err(self.error(buf, "expected array element"));
            }
            _ => return Ok(true),
        }
        Ok(false)
    }

    /// Complete the current value at `end` (exclusive) and split it off the buffer.
    fn take_frame(&mut self, buf: &mut BytesMut, end: usize) -> Bytes {
        let start = self.start.take().unwrap_or(0);
        buf.advance(start);
        let frame = buf.split_to(end - start).freeze();
        self.released += end;
        self.pos = 0;
        self.depth = 0;
        self.in_string = false;
        self.escaped = false;
        if self.framing == Framing::Array {
            self.array = ArrayState::AfterValue;
        }
        frame
    }

    /// Drop bytes that can no longer be part of a frame.
    fn compact(&mut self, buf: &mut BytesMut) {
        let keep_from = self.start.unwrap_or(self.pos);
        if keep_from > 0 {
            buf.advance(keep_from);
            self.released += keep_from;
            self.pos -= keep_from;
            if let Some(start) = self.start.as_mut() {
                *start = 0;
            }
        }
    }

    fn error(&self, buf: &BytesMut, msg: &str) -> Error {
        let from = self.start.unwrap_or(self.pos).min(buf.len());
        let to = (self.pos + 64).min(buf.len()).max(from);
        Error::decode(
            String::from_utf8_lossy(&buf[from..to]).into_owned(),
            format!("{} (byte offset {})", msg, self.released + self.pos),
        )
        .with_context(ErrorContext::new().with_source("stream_decoder"))
    }
}

impl Decoder for JsonFrameCodec {
    type Item = Bytes;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>> {
        while self.pos < buf.len() {
            let byte = buf[self.pos];

            if self.start.is_none() {
                if self.between_values(byte, buf)? {
                    self.begin_value(byte);
                }
                self.pos += 1;
                continue;
            }

            match self.kind {
                ValueKind::Bare => {
                    if byte.is_ascii_whitespace()
                        || matches!(byte, b',' | b']' | b'}' | b'[' | b'{' | b'"')
                    {
                        // The terminator belongs to whatever follows.
                        let end = self.pos;
                        return Ok(Some(self.take_frame(buf, end)));
                    }
                }
                _ if self.in_string => {
                    if self.escaped {
                        self.escaped = false;
                    } else if byte == b'\\' {
                        self.escaped = true;
                    } else if byte == b'"' {
                        self.in_string = false;
                        if self.kind == ValueKind::String {
                            let end = self.pos + 1;
                            return Ok(Some(self.take_frame(buf, end)));
                        }
                    }
                }
                _ => match byte {
                    b'"' => self.in_string = true,
                    b'{' | b'[' => self.depth += 1,
                    b'}' | b']' => {
                        self.depth -= 1;
                        if self.depth == 0 {
                            let end = self.pos + 1;
                            return Ok(Some(self.take_frame(buf, end)));
                        }
                    }
                    _ => {}
                },
            }
            self.pos += 1;
        }

        self.compact(buf);
        Ok(None)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        if self.start.is_some() {
            if self.kind == ValueKind::Bare {
                let end = self.pos;
                return Ok(Some(self.take_frame(buf, end)));
            }
            return Err(self.error(buf, "stream ended inside a JSON value"));
        }
        if self.framing == Framing::Array
            && matches!(
                self.array,
                ArrayState::ExpectFirst | ArrayState::ExpectValue | ArrayState::AfterValue
            )
        {
            return Err(self.error(buf, "stream ended before closing ']'"));
        }
        Ok(None)
    }
}

/// Split a complete body into frames.
pub fn split_frames(body: &[u8], framing: Framing) -> Result<Vec<Bytes>> {
    let mut codec = JsonFrameCodec::with_framing(framing);
    let mut buf = BytesMut::from(body);
    let mut frames = Vec::new();
    while let Some(frame) = codec.decode_eof(&mut buf)? {
        frames.push(frame);
    }
    Ok(frames)
}

/// Decode a chunked byte stream into a stream of typed elements.
///
/// Elements are decoded and yielded one at a time as soon as they are
/// complete. Input is pulled only when the consumer polls. The first failure
/// (transport error, framing error, an element that does not decode into `T`,
/// or an element that is a service error envelope) is yielded once and ends
/// the stream; elements already yielded stand.
pub fn decode_stream<T>(
    input: BoxStream<'static, Bytes>,
    codec: JsonFrameCodec,
) -> BoxStream<'static, StreamChunk<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    struct State {
        input: BoxStream<'static, Bytes>,
        codec: JsonFrameCodec,
        buf: BytesMut,
        index: usize,
        eof: bool,
        done: bool,
    }

    let init = State {
        input,
        codec,
        buf: BytesMut::new(),
        index: 0,
        eof: false,
        done: false,
    };

    let stream = stream::unfold(init, |mut st| async move {
        loop {
            if st.done {
                return None;
            }

            let framed = if st.eof {
                st.codec.decode_eof(&mut st.buf)
            } else {
                st.codec.decode(&mut st.buf)
            };
            match framed {
                Ok(Some(frame)) => {
                    let index = st.index;
                    let decoded = match classify::in_band_error(&frame) {
                        Some(e) => Err(e),
                        None => codec::decode::<T>(&frame),
                    };
                    return match decoded {
                        Ok(value) => {
                            st.index += 1;
                            Some((Ok(StreamChunk { index, value }), st))
                        }
                        Err(e) => {
                            st.done = true;
                            let e = e.with_context(
                                ErrorContext::new()
                                    .with_details(format!("stream element {}", index)),
                            );
                            Some((Err(e), st))
                        }
                    };
                }
                Ok(None) if st.eof => return None,
                Ok(None) => {}
                Err(e) => {
                    st.done = true;
                    return Some((Err(e), st));
                }
            }

            match st.input.next().await {
                Some(Ok(bytes)) => st.buf.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(e), st));
                }
                None => st.eof = true,
            }
        }
    });

    Box::pin(stream)
}
