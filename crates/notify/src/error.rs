use killwatch_core::CoreError;
use killwatch_queue::QueueError;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Lookup failed: {0}")]
    Lookup(#[from] CoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Malformed dispatchable: {0}")]
    Decode(#[from] serde_json::Error),
}

impl NotifyError {
    /// Build a status error from a response, keeping a bounded body excerpt.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<f64>().ok())
                .map(|secs| secs.ceil() as u64)
                .unwrap_or(1);
            return NotifyError::RateLimited { retry_after_secs };
        }
        let mut body = response.text().await.unwrap_or_default();
        body.truncate(body.char_indices().nth(256).map_or(body.len(), |(i, _)| i));
        NotifyError::Status {
            status: status.as_u16(),
            body,
        }
    }
}
