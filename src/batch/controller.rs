use super::job::{job_from_value, CreateBatch, CreateBatchBody, InputConfig};
use super::{BatchInput, BatchJob, BatchState};
use crate::codec::Empty;
use crate::transport::{Api, HttpRequest};
use crate::types::{Capability, Model, Page};
use crate::{Error, ErrorContext, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Creates, observes and ends batch jobs.
///
/// Holds nothing but a handle to the transport. Each call is exactly one
/// request; polling cadence is up to the caller.
#[derive(Debug, Clone)]
pub struct BatchController {
    api: Api,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListBatchesResponse {
    #[serde(default)]
    batches: Vec<Value>,
    #[serde(default)]
    operations: Vec<Value>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl BatchController {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    /// Submit a job running `model` over `input`.
    pub async fn create(
        &self,
        model: &Model,
        input: BatchInput,
        display_name: Option<&str>,
    ) -> Result<BatchJob> {
        let endpoint = model.endpoint(Capability::BatchGenerateContent)?;
        if let BatchInput::Inline(requests) = &input {
            if requests.is_empty() {
                return Err(Error::invalid_request("inline batch has no requests")
                    .with_context(ErrorContext::new().with_endpoint(endpoint)));
            }
        }
        let body = CreateBatchBody {
            batch: CreateBatch {
                display_name,
                input_config: InputConfig::from_input(&input),
            },
        };
        let job = self.fetch(HttpRequest::post(endpoint.as_str()).with_json(&body)?).await?;
        info!(batch = job.name.as_str(), state = %job.state, model = model.id(), "batch created");
        Ok(job)
    }

    /// Fetch the current state of a job. Exactly one GET.
    pub async fn poll(&self, name: &str) -> Result<BatchJob> {
        let job = self.fetch(HttpRequest::get(batch_name(name))).await?;
        debug!(batch = job.name.as_str(), state = %job.state, "batch polled");
        Ok(job)
    }

    /// Poll `job` and check that its state did not move backwards.
    ///
    /// A job already in a terminal state is returned as is without any
    /// request.
    pub async fn refresh(&self, job: &BatchJob) -> Result<BatchJob> {
        if job.is_terminal() {
            return Ok(job.clone());
        }
        let next = self.poll(&job.name).await?;
        if next.state != BatchState::Unspecified
            && next.state.rank() < job.state.rank()
        {
            warn!(batch = job.name.as_str(), from = %job.state, to = %next.state, "batch state regressed");
            return Err(Error::decode(
                format!("{}", next.state),
                format!(
                    "batch {} moved from {} back to {}",
                    job.name, job.state, next.state
                ),
            )
            .with_context(ErrorContext::new().with_endpoint(job.name.clone())));
        }
        Ok(next)
    }

    /// Ask the service to stop a job. Its state becomes `Cancelled` eventually.
    pub async fn cancel(&self, name: &str) -> Result<()> {
        let name = batch_name(name);
        let _: Empty = self
            .api
            .post(&format!("{}:cancel", name), &serde_json::json!({}))
            .await?;
        info!(batch = name.as_str(), "batch cancel requested");
        Ok(())
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        let name = batch_name(name);
        let _: Empty = self.api.delete(&name).await?;
        info!(batch = name.as_str(), "batch deleted");
        Ok(())
    }

    pub async fn list(
        &self,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> Result<Page<BatchJob>> {
        let mut request = HttpRequest::get("batches");
        if let Some(n) = page_size {
            request = request.with_query("pageSize", n.to_string());
        }
        if let Some(token) = page_token {
            request = request.with_query("pageToken", token);
        }
        let resp: ListBatchesResponse = self.api.call(request).await?;
        let mut raw = resp.batches;
        raw.extend(resp.operations);
        let jobs = raw
            .into_iter()
            .map(|v| {
                let text = v.to_string();
                job_from_value(v).map_err(|e| Error::decode(text, e))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(jobs, resp.next_page_token))
    }

    async fn fetch(&self, request: HttpRequest) -> Result<BatchJob> {
        let endpoint = request.target.to_string();
        let value: Value = self.api.call(request).await?;
        let text = value.to_string();
        job_from_value(value).map_err(|e| {
            Error::decode(text, e).with_context(
                ErrorContext::new()
                    .with_endpoint(endpoint)
                    .with_source("batch"),
            )
        })
    }
}

/// `"123"` → `"batches/123"`; qualified names pass through.
pub fn batch_name(name: &str) -> String {
    let name = name.trim();
    if name.contains('/') {
        name.to_string()
    } else {
        format!("batches/{}", name)
    }
}
