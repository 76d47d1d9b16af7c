//! In-memory transport for tests.

use crate::api::{Method, Payload, Response, Transport};
use crate::error::{LiferayError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// A request as seen by the transport
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub url: String,
    pub method: Method,
    pub payload: Option<Payload>,
}

impl RecordedRequest {
    /// Integer payload field, e.g. `start`
    pub fn field(&self, name: &str) -> Option<u64> {
        self.payload.as_ref()?.get(name)?.as_u64()
    }
}

/// Serves scripted responses per (method, url), in the order they were added
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<HashMap<(Method, String), VecDeque<Result<Response>>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: Method, url: &str, text: &str) {
        self.push(method, url, Ok(Response::ok(text)));
    }

    pub fn fail(&self, method: Method, url: &str) {
        self.push(method, url, Err(LiferayError::transport(url, "status 500: boom")));
    }

    fn push(&self, method: Method, url: &str, response: Result<Response>) {
        self.responses
            .lock()
            .unwrap()
            .entry((method, url.to_string()))
            .or_default()
            .push_back(response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests whose URL ends with the given suffix
    pub fn requests_to(&self, suffix: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.url.ends_with(suffix))
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(
        &self,
        url: &str,
        method: Method,
        payload: Option<&Payload>,
    ) -> Result<Response> {
        self.requests.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            method,
            payload: payload.cloned(),
        });

        self.responses
            .lock()
            .unwrap()
            .get_mut(&(method, url.to_string()))
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(LiferayError::transport(
                    url,
                    format!("no scripted response for {} {}", method, url),
                ))
            })
    }
}
