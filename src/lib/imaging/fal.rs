use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;

use super::{GeneratedImage, ImageError, ImageGenerator};

#[cfg(feature = "tracing")]
use tracing::{debug, instrument};

pub const DEFAULT_MODEL: &str = "fal-ai/flux/dev";
pub const DEFAULT_QUEUE_URL: &str = "https://queue.fal.run";

#[derive(Clone)]
pub struct FalConfig {
    pub api_key: String,
    pub model: String,
    pub queue_url: String,
    pub poll_interval: Duration,
}

impl FalConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            queue_url: DEFAULT_QUEUE_URL.to_string(),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl std::fmt::Debug for FalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FalConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("queue_url", &self.queue_url)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[cfg_attr(not(feature = "tracing"), allow(dead_code))]
struct QueueReceipt {
    request_id: String,
    status_url: String,
    response_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
enum QueueStatus {
    InQueue {
        #[serde(default)]
        queue_position: Option<u64>,
    },
    InProgress {
        #[serde(default)]
        logs: Vec<QueueLog>,
    },
    Completed,
}

#[derive(Debug, Deserialize)]
#[cfg_attr(not(feature = "tracing"), allow(dead_code))]
struct QueueLog {
    message: String,
}

#[derive(Debug, Deserialize)]
struct FalOutput {
    #[serde(default)]
    images: Vec<GeneratedImage>,
}

/// Client for the fal.ai request queue: submit, poll until completed, fetch the result.
pub struct FalClient {
    http: Client,
    config: FalConfig,
}

impl FalClient {
    pub fn new(config: FalConfig) -> Result<Self, ImageError> {
        let http = Client::builder().build()?;
        Ok(Self { http, config })
    }

    fn auth(&self) -> String {
        format!("Key {}", self.config.api_key)
    }

    async fn submit(&self, prompt: &str) -> Result<QueueReceipt, ImageError> {
        let url = format!(
            "{}/{}",
            self.config.queue_url.trim_end_matches('/'),
            self.config.model
        );
        let response = self
            .http
            .post(url)
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .json(&json!({ "prompt": prompt }))
            .send()
            .await?;
        Ok(check(response, "submit")?.json().await?)
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    async fn wait_for_completion(&self, receipt: &QueueReceipt) -> Result<(), ImageError> {
        let mut seen_logs = 0;
        loop {
            let response = self
                .http
                .get(&receipt.status_url)
                .query(&[("logs", "1")])
                .header(reqwest::header::AUTHORIZATION, self.auth())
                .send()
                .await?;
            let status: QueueStatus = check(response, "status")?
                .json()
                .await
                .map_err(|e| ImageError::Protocol(format!("unexpected queue status: {e}")))?;
            match status {
                QueueStatus::Completed => return Ok(()),
                QueueStatus::InQueue { queue_position } => {
                    #[cfg(feature = "tracing")]
                    debug!(request_id = %receipt.request_id, queue_position = ?queue_position, "Waiting in queue");
                }
                QueueStatus::InProgress { logs } => {
                    for log in logs.iter().skip(seen_logs) {
                        #[cfg(feature = "tracing")]
                        debug!(request_id = %receipt.request_id, "{}", log.message);
                    }
                    seen_logs = seen_logs.max(logs.len());
                }
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn fetch_result(&self, receipt: &QueueReceipt) -> Result<FalOutput, ImageError> {
        let response = self
            .http
            .get(&receipt.response_url)
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .send()
            .await?;
        check(response, "result")?
            .json()
            .await
            .map_err(|e| ImageError::Protocol(format!("malformed result: {e}")))
    }
}

#[async_trait]
impl ImageGenerator for FalClient {
    #[cfg_attr(feature = "tracing", instrument(skip(self), fields(model = %self.config.model)))]
    async fn generate(&self, prompt: &str) -> Result<Vec<GeneratedImage>, ImageError> {
        let receipt = self.submit(prompt).await?;
        #[cfg(feature = "tracing")]
        debug!(request_id = %receipt.request_id, "Submitted image request");
        self.wait_for_completion(&receipt).await?;
        Ok(self.fetch_result(&receipt).await?.images)
    }
}

fn check(response: Response, endpoint: &'static str) -> Result<Response, ImageError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ImageError::Status { endpoint, status: status.as_u16() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> FalClient {
        let mut config = FalConfig::new("test-key");
        config.queue_url = server.url();
        config.poll_interval = Duration::from_millis(5);
        FalClient::new(config).unwrap()
    }

    fn receipt_body(server: &mockito::ServerGuard) -> String {
        json!({
            "request_id": "req-1",
            "status_url": format!("{}/fal-ai/flux/requests/req-1/status", server.url()),
            "response_url": format!("{}/fal-ai/flux/requests/req-1", server.url()),
        })
        .to_string()
    }

    #[tokio::test]
    async fn submits_polls_and_returns_images() {
        let mut server = mockito::Server::new_async().await;
        let submit = server
            .mock("POST", "/fal-ai/flux/dev")
            .match_header("authorization", "Key test-key")
            .match_body(Matcher::Json(json!({ "prompt": "Buy milk" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(receipt_body(&server))
            .expect(1)
            .create_async()
            .await;
        let status = server
            .mock("GET", "/fal-ai/flux/requests/req-1/status")
            .match_query(Matcher::UrlEncoded("logs".into(), "1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"COMPLETED","logs":[]}"#)
            .expect(1)
            .create_async()
            .await;
        let result = server
            .mock("GET", "/fal-ai/flux/requests/req-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"images":[{"url":"https://cdn.fal/1.png","width":1024,"height":768},{"url":"https://cdn.fal/2.png"}],"seed":7}"#)
            .expect(1)
            .create_async()
            .await;

        let images = client_for(&server).generate("Buy milk").await.unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].url, "https://cdn.fal/1.png");

        submit.assert_async().await;
        status.assert_async().await;
        result.assert_async().await;
    }

    #[tokio::test]
    async fn keeps_polling_until_completed() {
        let mut server = mockito::Server::new_async().await;
        let _submit = server
            .mock("POST", "/fal-ai/flux/dev")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(receipt_body(&server))
            .create_async()
            .await;
        let path = "/fal-ai/flux/requests/req-1/status";
        let queued = server
            .mock("GET", path)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"IN_QUEUE","queue_position":0}"#)
            .expect(1)
            .create_async()
            .await;
        let running = server
            .mock("GET", path)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"IN_PROGRESS","logs":[{"message":"step 1"},{"message":"step 2"}]}"#)
            .expect(1)
            .create_async()
            .await;
        let done = server
            .mock("GET", path)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"COMPLETED"}"#)
            .expect(1)
            .create_async()
            .await;
        let _result = server
            .mock("GET", "/fal-ai/flux/requests/req-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"images":[{"url":"https://cdn.fal/slow.png"}]}"#)
            .create_async()
            .await;

        let images = client_for(&server).generate("Buy milk").await.unwrap();
        assert_eq!(images[0].url, "https://cdn.fal/slow.png");

        queued.assert_async().await;
        running.assert_async().await;
        done.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_submission_is_a_status_error() {
        let mut server = mockito::Server::new_async().await;
        let _submit = server
            .mock("POST", "/fal-ai/flux/dev")
            .with_status(401)
            .with_body(r#"{"detail":"Unauthorized"}"#)
            .create_async()
            .await;

        let err = client_for(&server).generate("Buy milk").await.unwrap_err();
        assert!(matches!(err, ImageError::Status { endpoint: "submit", status: 401 }));
    }

    #[tokio::test]
    async fn unknown_queue_status_is_a_protocol_error() {
        let mut server = mockito::Server::new_async().await;
        let _submit = server
            .mock("POST", "/fal-ai/flux/dev")
            .with_status(200)
            .with_body(receipt_body(&server))
            .create_async()
            .await;
        let _status = server
            .mock("GET", "/fal-ai/flux/requests/req-1/status")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status":"CANCELLED"}"#)
            .create_async()
            .await;

        let err = client_for(&server).generate("Buy milk").await.unwrap_err();
        assert!(matches!(err, ImageError::Protocol(_)));
    }
}
