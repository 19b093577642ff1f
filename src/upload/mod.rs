//! # Resumable upload
//!
//! Files are uploaded with the service's three-phase resumable protocol:
//!
//! 1. **Initiate**: POST the file metadata to the upload endpoint with
//!    `X-Goog-Upload-Command: start`; the response names the destination in
//!    the `x-goog-upload-url` header.
//! 2. **Transfer**: PUT the bytes to that destination with
//!    `X-Goog-Upload-Command: upload, finalize`.
//! 3. **Finalize**: parse the stored [`FileResource`](crate::types::FileResource)
//!    out of the transfer response.
//!
//! Every failure is an [`Error::Protocol`](crate::Error::Protocol) naming the
//! phase, with the underlying mapped error attached as its cause.
//!
//! [`FilesApi`] wraps the protocol together with `get`, `list` and `delete`.

mod files;
mod session;
mod source;

pub use files::FilesApi;
pub use session::{parse_finalize, UploadSession};
pub use source::{guess_mime_type, UploadSource};

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadPhase {
    Initiate,
    Transfer,
    Finalize,
}

impl UploadPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadPhase::Initiate => "initiate",
            UploadPhase::Transfer => "transfer",
            UploadPhase::Finalize => "finalize",
        }
    }
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
