use crate::utils::error::{PipelineError, Result};
use reqwest::{RequestBuilder, Response};
use tokio_util::sync::CancellationToken;

/// Sends `request`, giving up as soon as `cancel` fires.
pub async fn send_cancellable(
    request: RequestBuilder,
    cancel: &CancellationToken,
    context: &str,
) -> Result<Response> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::cancelled(context)),
        result = request.send() => result.map_err(|e| PipelineError::from_request(e, context)),
    }
}

/// Reads the whole body as text under the same cancellation rules.
pub async fn read_body_cancellable(
    response: Response,
    cancel: &CancellationToken,
    context: &str,
) -> Result<String> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::cancelled(context)),
        result = response.text() => result.map_err(|e| PipelineError::from_request(e, context)),
    }
}
