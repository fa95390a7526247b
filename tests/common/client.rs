//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per song-convert-server endpoint.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

#[allow(dead_code)]
impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// GET /
    pub async fn home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    /// POST /v1/convert
    pub async fn convert(&self, song_name: &str, requester: &str) -> Response {
        self.convert_raw(json!({
            "song_name": song_name,
            "requester": requester,
        }))
        .await
    }

    /// POST /v1/convert with a source hint
    pub async fn convert_with_hint(&self, song_name: &str, hint: &str, requester: &str) -> Response {
        self.convert_raw(json!({
            "song_name": song_name,
            "source_hint": hint,
            "requester": requester,
        }))
        .await
    }

    /// POST /v1/convert with an arbitrary body
    pub async fn convert_raw(&self, body: Value) -> Response {
        self.client
            .post(format!("{}/v1/convert", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("Convert request failed")
    }

    /// POST /v1/convert, asserting 202, returning the job id
    pub async fn submit(&self, song_name: &str) -> String {
        let response = self.convert(song_name, TEST_REQUESTER).await;
        assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);
        let body: Value = response.json().await.expect("Invalid convert response");
        body["job_id"]
            .as_str()
            .expect("job_id missing")
            .to_string()
    }

    /// GET /v1/status/{job_id}
    pub async fn status(&self, job_id: &str) -> Response {
        self.client
            .get(format!("{}/v1/status/{}", self.base_url, job_id))
            .send()
            .await
            .expect("Status request failed")
    }

    /// GET /v1/jobs?limit=N
    pub async fn jobs(&self, limit: usize) -> Response {
        self.client
            .get(format!("{}/v1/jobs?limit={}", self.base_url, limit))
            .send()
            .await
            .expect("Jobs request failed")
    }

    /// GET /v1/stats
    pub async fn stats(&self) -> Response {
        self.client
            .get(format!("{}/v1/stats", self.base_url))
            .send()
            .await
            .expect("Stats request failed")
    }

    /// GET an absolute URL, e.g. a download link
    pub async fn get_url(&self, url: &str) -> Response {
        self.client
            .get(url)
            .send()
            .await
            .expect("Request failed")
    }

    /// Polls the status endpoint until the job is completed or failed.
    ///
    /// # Panics
    ///
    /// Panics if the job does not finish within `JOB_COMPLETION_TIMEOUT_MS`.
    pub async fn wait_for_terminal(&self, job_id: &str) -> Value {
        let start = std::time::Instant::now();
        loop {
            let response = self.status(job_id).await;
            assert_eq!(response.status(), reqwest::StatusCode::OK);
            let job: Value = response.json().await.expect("Invalid status response");
            let status = job["status"].as_str().unwrap_or_default();
            if status == "completed" || status == "failed" {
                return job;
            }
            if start.elapsed() > Duration::from_millis(JOB_COMPLETION_TIMEOUT_MS) {
                panic!("Job {} still {} after timeout", job_id, status);
            }
            tokio::time::sleep(Duration::from_millis(JOB_POLL_INTERVAL_MS)).await;
        }
    }
}
