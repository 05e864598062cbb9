//! HTTP boundary with the execution service and session store.
//!
//! These four endpoints are the only wire contracts the console depends on;
//! the transport can be swapped behind this module without touching the core.

use std::time::Duration;

use flowscope_types::{GraphResponse, SubmitRequest, ThreadInfo, TraceStep};

use crate::error::{ConsoleError, Result};
use crate::stream::TraceStream;

#[derive(Debug, Clone)]
pub struct ConsoleApi {
    client: reqwest::Client,
    base_url: String,
}

fn ensure_ok(response: reqwest::Response, endpoint: &'static str) -> Result<reqwest::Response> {
    let status = response.status();
    if !status.is_success() {
        return Err(ConsoleError::Status {
            endpoint,
            status: status.as_u16(),
        });
    }
    Ok(response)
}

impl ConsoleApi {
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self> {
        // No overall request timeout: the /chat body stays open for the
        // whole run.
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `GET /graph` — consumed once at load.
    pub async fn fetch_graph(&self) -> Result<GraphResponse> {
        let url = format!("{}/graph", self.base_url);
        let response = ensure_ok(self.client.get(&url).send().await?, "/graph")?;
        Ok(response.json().await?)
    }

    /// `GET /threads[?thread_id=<substring>]` — stateful mode only.
    pub async fn fetch_threads(&self, filter: Option<&str>) -> Result<Vec<ThreadInfo>> {
        let url = format!("{}/threads", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(filter) = filter {
            request = request.query(&[("thread_id", filter)]);
        }
        let response = ensure_ok(request.send().await?, "/threads")?;
        Ok(response.json().await?)
    }

    /// `GET /history/:id` — hydrates a selected thread.
    pub async fn fetch_history(&self, thread_id: &str) -> Result<Vec<TraceStep>> {
        let url = format!("{}/history/{}", self.base_url, thread_id);
        let response = ensure_ok(self.client.get(&url).send().await?, "/history")?;
        Ok(response.json().await?)
    }

    /// `POST /chat` — opens the chunked trace stream for one run.
    pub async fn open_run_stream(
        &self,
        input: &str,
        thread_id: Option<&str>,
    ) -> Result<TraceStream> {
        let url = format!("{}/chat", self.base_url);
        let body = SubmitRequest {
            input: input.to_string(),
            thread_id: thread_id.map(ToString::to_string),
        };
        let response = ensure_ok(self.client.post(&url).json(&body).send().await?, "/chat")?;
        Ok(TraceStream::from_response(response))
    }
}
