use crate::adapters::http::{read_body_cancellable, send_cancellable};
use crate::config::OrderClientSettings;
use crate::domain::model::Order;
use crate::domain::ports::OrderSink;
use crate::utils::error::{PipelineError, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Posts orders to the order-intake service at `{host}/orders`.
///
/// The underlying client is built once and reused, so sequential posts share
/// connections. Delivery is never retried.
pub struct OrderClient {
    client: Client,
    settings: OrderClientSettings,
}

impl OrderClient {
    pub fn new(settings: OrderClientSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.client_timeout))
            .build()?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self) -> String {
        format!("{}/orders", self.settings.host.trim_end_matches('/'))
    }
}

#[async_trait]
impl OrderSink for OrderClient {
    async fn post_order(&self, order: &Order, cancel: &CancellationToken) -> Result<()> {
        if self.settings.bypass {
            tracing::info!("Bypass enabled, skipping delivery of order for {}", order.device);
            return Ok(());
        }

        let payload = serde_json::to_string(order)?;
        tracing::debug!("Serialized order payload: {}", payload);

        tracing::info!("Posting order for {} to {}", order.device, self.endpoint());
        let request = self
            .client
            .post(self.endpoint())
            .header(header::CONTENT_TYPE, "application/json")
            .body(payload);

        let response = send_cancellable(request, cancel, "posting order")
            .await
            .map_err(|e| {
                tracing::error!("Request failed while posting order for {}: {}", order.device, e);
                e
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(
                "Successfully posted order for {}. Status: {}",
                order.device,
                status
            );
            return Ok(());
        }

        let body = read_body_cancellable(response, cancel, "reading order response").await;
        Err(rejected_delivery(status.as_u16(), body, &order.device))
    }
}

/// Error for a non-2xx response. A cancellation while reading the body wins
/// over the status; any other read failure leaves the body empty.
fn rejected_delivery(status: u16, body: Result<String>, device: &str) -> PipelineError {
    let body = match body {
        Ok(body) => body,
        Err(e) if e.is_cancellation() => {
            tracing::error!(
                "Request timeout or cancellation while posting order for {}: {}",
                device,
                e
            );
            return e;
        }
        Err(e) => {
            tracing::warn!("Could not read order response body: {}", e);
            String::new()
        }
    };
    tracing::error!(
        "Failed to post order for {}. Status: {}, Response: {}",
        device,
        status,
        body
    );
    PipelineError::Delivery { status, body }
}
