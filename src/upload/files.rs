use super::{UploadSession, UploadSource};
use crate::codec::Empty;
use crate::transport::Api;
use crate::types::{FileResource, ListFilesResponse, Page};
use crate::Result;
use tracing::info;

/// The `files` collection: upload, fetch, list and delete.
#[derive(Debug, Clone)]
pub struct FilesApi {
    api: Api,
}

impl FilesApi {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    /// Upload `source` with the resumable protocol.
    ///
    /// The returned file may still be `PROCESSING`; poll [`FilesApi::get`]
    /// until [`FileResource::is_active`] before referencing it in a prompt.
    pub async fn upload(&self, source: UploadSource) -> Result<FileResource> {
        let mut session = UploadSession::initiate(
            &self.api,
            source.len(),
            source.mime_type(),
            source.display_name(),
        )
        .await?;
        let file = session.transfer(source.into_data()).await?;
        info!(file = file.name.as_str(), state = ?file.state, "file uploaded");
        Ok(file)
    }

    /// Fetch a file by `files/{id}` or bare `{id}`.
    pub async fn get(&self, name: &str) -> Result<FileResource> {
        self.api.get(&file_name(name), &[]).await
    }

    pub async fn list(
        &self,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> Result<Page<FileResource>> {
        let size = page_size.map(|n| n.to_string());
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(size) = size.as_deref() {
            query.push(("pageSize", size));
        }
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        let resp: ListFilesResponse = self.api.get("files", &query).await?;
        Ok(Page::new(resp.files, resp.next_page_token))
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        let _: Empty = self.api.delete(&file_name(name)).await?;
        Ok(())
    }
}

fn file_name(name: &str) -> String {
    if name.starts_with("files/") {
        name.to_string()
    } else {
        format!("files/{}", name)
    }
}
