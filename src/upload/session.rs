use super::UploadPhase;
use crate::transport::{Api, HttpRequest, Method, Target};
use crate::types::FileResource;
use crate::{Error, Result};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

pub const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

#[derive(Serialize)]
struct InitiateBody<'a> {
    file: InitiateFile<'a>,
}

#[derive(Serialize)]
struct InitiateFile<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
}

/// An upload that has been started but not yet finalized.
///
/// Owns the destination URL handed out by the service. Not `Clone`, and
/// [`UploadSession::transfer`] takes `&mut self`: a failed transfer leaves
/// the session usable so the caller can retry that phase alone, while a
/// session that has received a finalize response refuses any further transfer.
#[derive(Debug)]
pub struct UploadSession {
    api: Api,
    upload_url: String,
    size: u64,
    mime_type: String,
    offset: u64,
    phase: UploadPhase,
}

impl UploadSession {
    /// Run the initiate phase for `size` bytes of `mime_type`.
    pub async fn initiate(
        api: &Api,
        size: u64,
        mime_type: &str,
        display_name: Option<&str>,
    ) -> Result<Self> {
        let request = HttpRequest::new(Method::Post, Target::UploadBase)
            .with_header("X-Goog-Upload-Protocol", "resumable")
            .with_header("X-Goog-Upload-Command", "start")
            .with_header("X-Goog-Upload-Header-Content-Length", size.to_string())
            .with_header("X-Goog-Upload-Header-Content-Type", mime_type)
            .with_json(&InitiateBody {
                file: InitiateFile { display_name },
            })?;

        let resp = api
            .execute(request)
            .await
            .map_err(|e| e.in_phase(UploadPhase::Initiate, "start request failed"))?;

        let Some(upload_url) = resp.header(UPLOAD_URL_HEADER) else {
            warn!(phase = %UploadPhase::Initiate, http_status = resp.status, "upload url header missing");
            return Err(Error::protocol(
                UploadPhase::Initiate,
                format!("response carried no {} header", UPLOAD_URL_HEADER),
            ));
        };
        debug!(phase = %UploadPhase::Initiate, size, mime_type, "upload session started");

        Ok(Self {
            api: api.clone(),
            upload_url: upload_url.to_string(),
            size,
            mime_type: mime_type.to_string(),
            offset: 0,
            phase: UploadPhase::Transfer,
        })
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    /// Bytes the service has acknowledged. Transfers are single-shot, so this
    /// is the starting point for the next chunk and always 0 before transfer.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// `Transfer` until the service has answered a finalize, `Finalize` after.
    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    pub fn is_finalized(&self) -> bool {
        self.phase == UploadPhase::Finalize
    }

    /// Send the whole payload and finalize, returning the stored file.
    ///
    /// A transport or HTTP failure leaves the session in `Transfer`, so the
    /// same call can be repeated. Once the service has answered, the
    /// destination is spent even if the answer does not parse.
    pub async fn transfer(&mut self, data: Bytes) -> Result<FileResource> {
        if self.phase != UploadPhase::Transfer {
            return Err(Error::protocol(
                UploadPhase::Transfer,
                "upload session was already finalized",
            ));
        }
        if data.len() as u64 != self.size {
            return Err(Error::protocol(
                UploadPhase::Transfer,
                format!(
                    "payload is {} bytes but {} were declared at initiate",
                    data.len(),
                    self.size
                ),
            ));
        }

        let request = HttpRequest::new(Method::Put, Target::Url(self.upload_url.clone()))
            .with_header("X-Goog-Upload-Command", "upload, finalize")
            .with_header("X-Goog-Upload-Offset", self.offset.to_string())
            .with_body(data, self.mime_type.clone());

        let resp = self
            .api
            .execute(request)
            .await
            .map_err(|e| e.in_phase(UploadPhase::Transfer, "upload request failed"))?;
        self.offset = self.size;
        self.phase = UploadPhase::Finalize;
        debug!(phase = %UploadPhase::Transfer, bytes = self.size, "upload transferred");

        parse_finalize(&resp.body)
    }
}

/// Extract the stored file from a finalize response.
///
/// Accepts `{"file": {...}}` (preferred) or a bare file object. Anything else
/// is a `Finalize` protocol error whose cause keeps the raw body.
pub fn parse_finalize(body: &[u8]) -> Result<FileResource> {
    let raw = String::from_utf8_lossy(body).into_owned();
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        Error::decode(raw.clone(), e).in_phase(UploadPhase::Finalize, "response is not JSON")
    })?;

    if let Some(file) = value.get("file") {
        if let Ok(resource) = serde_json::from_value::<FileResource>(file.clone()) {
            return Ok(resource);
        }
    }
    serde_json::from_value::<FileResource>(value).map_err(|e| {
        Error::decode(raw, e).in_phase(
            UploadPhase::Finalize,
            "response holds neither a file envelope nor a file resource",
        )
    })
}
