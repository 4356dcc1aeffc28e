use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to deliver notification: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Payload posted to the notification endpoint once a report is stored.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionNotice {
    pub output_id: i64,
    pub template_id: String,
    pub report_url: String,
}

/// Notify the external endpoint that a report is ready.
///
/// A non-2xx response is logged and swallowed; only transport failures are
/// returned to the caller.
pub async fn send(
    client: &reqwest::Client,
    url: &str,
    notice: &CompletionNotice,
) -> Result<(), NotifyError> {
    let response = client.post(url).json(notice).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!("failed to notify API: {}, {}", status, body);
    }

    Ok(())
}
