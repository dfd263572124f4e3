use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("queue not found at {url}")]
    QueueNotFound { url: String },
    #[error("{0}")]
    Other(String),
}

pub const QUEUE_NOT_FOUND_HINT: &str = "Sink queue not found (HTTP 404). Check:
  - SINK_QUEUE_URL / --sink-url is the full endpoint URL, including the path
  - the queue endpoint exists and accepts POST requests";

impl SinkError {
    /// Operator guidance for errors that point at configuration.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            SinkError::QueueNotFound { .. } => Some(QUEUE_NOT_FOUND_HINT),
            SinkError::Other(_) => None,
        }
    }
}

/// Destination for extracted payloads. Called concurrently from workers.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn deliver(&self, body: &str) -> Result<(), SinkError>;
}

/// Posts each payload to a queue endpoint over HTTP.
pub struct HttpQueueSink {
    url: String,
    client: Client,
}

impl HttpQueueSink {
    pub fn new(url: impl Into<String>) -> Result<Self, SinkError> {
        let client = Client::builder()
            .build()
            .map_err(|e| SinkError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl Sink for HttpQueueSink {
    async fn deliver(&self, body: &str) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| SinkError::Other(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SinkError::QueueNotFound {
                url: self.url.clone(),
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SinkError::Other(format!("queue returned {status}: {text}")));
        }
        Ok(())
    }
}
