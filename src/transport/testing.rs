//! In-process [`Transport`] double for unit tests.

use super::{HttpRequest, HttpResponse, Transport};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replies with pre-scripted responses in order and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<HttpResponse>>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, status: u16, body: &str) -> &Self {
        self.push(Ok(HttpResponse::new(status, body.to_string())))
    }

    pub fn reply_with_header(
        &self,
        status: u16,
        name: &'static str,
        value: &str,
        body: &str,
    ) -> &Self {
        let mut resp = HttpResponse::new(status, body.to_string());
        resp.headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_str(value).unwrap(),
        );
        self.push(Ok(resp))
    }

    pub fn fail(&self, err: Error) -> &Self {
        self.push(Err(err))
    }

    fn push(&self, reply: Result<HttpResponse>) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.seen.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::connection("no scripted reply left", None)))
    }
}
