use crate::adapters::http::{read_body_cancellable, send_cancellable};
use crate::config::LlmSettings;
use crate::domain::model::Order;
use crate::domain::ports::NoteExtractor;
use crate::utils::error::{PipelineError, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SYSTEM_PROMPT: &str = r#"You extract durable medical equipment orders from physician notes.
Read the note and return a single JSON object with exactly these keys:
- "Device": the medical device being ordered
- "Liters": the oxygen amount in liters, only when the device is an oxygen tank; otherwise ""
- "Usage": how often or how the device should be used
- "Diagnosis": the diagnosis or condition
- "OrderingProvider": the name of the ordering physician
- "PatientName": the patient's full name
- "Dob": the patient's date of birth
Use "" for any value the note does not state. Do not guess."#;

/// Extracts orders through an OpenAI-compatible chat-completion endpoint.
pub struct LlmNoteExtractor {
    client: Client,
    settings: LlmSettings,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl LlmNoteExtractor {
    pub fn new(settings: LlmSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.host.trim_end_matches('/'))
    }

    fn request_body(&self, note: &str) -> Value {
        json!({
            "model": self.settings.model_name,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": note},
            ],
            "response_format": {"type": "json_object"},
        })
    }
}

/// Narrows model output to the span from the first `{` to the last `}`.
pub fn extract_json_object(content: &str) -> &str {
    let trimmed = content.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Parses model output into an order. A literal `null` yields the empty order.
pub fn parse_order(content: &str) -> Result<Order> {
    let value: Value = serde_json::from_str(extract_json_object(content))?;

    if value.is_null() {
        tracing::warn!("Model returned null, using empty order");
        return Ok(Order::default());
    }

    Order::from_json_value_case_insensitive(&value).ok_or_else(|| PipelineError::Extraction {
        message: format!("expected a JSON object, got: {}", value),
    })
}

fn log_request_error(e: PipelineError) -> PipelineError {
    if e.is_cancellation() {
        tracing::error!("Request timeout or cancellation during order extraction: {}", e);
    } else {
        tracing::error!("Unexpected error occurred during order extraction: {}", e);
    }
    e
}

#[async_trait]
impl NoteExtractor for LlmNoteExtractor {
    async fn extract_order(&self, note: &str, cancel: &CancellationToken) -> Result<Order> {
        tracing::info!(
            "Starting order extraction from physician note ({} characters)",
            note.chars().count()
        );
        tracing::debug!("Calling model {} at {}", self.settings.model_name, self.endpoint());

        let request = self
            .client
            .post(self.endpoint())
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(&self.settings.api_key)
            .json(&self.request_body(note));

        let response = send_cancellable(request, cancel, "LLM chat completion")
            .await
            .map_err(log_request_error)?;
        let status = response.status();
        let body = read_body_cancellable(response, cancel, "LLM chat completion")
            .await
            .map_err(log_request_error)?;

        if !status.is_success() {
            tracing::error!("LLM API error during order extraction. Status: {}", status);
            return Err(PipelineError::LlmApi {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse chat completion envelope: {}", e);
            PipelineError::from(e)
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| PipelineError::Extraction {
                message: "model returned no message content".to_string(),
            })?;
        tracing::debug!("Received model response: {}", content);

        let order = parse_order(&content).map_err(|e| {
            tracing::error!("Failed to deserialize order from model response: {}", e);
            e
        })?;

        if order.is_empty() {
            tracing::warn!("Model response contained no order fields");
        }

        tracing::info!(
            "Successfully extracted order. Device: {}, OrderingProvider: {}",
            order.device,
            order.ordering_provider
        );
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorKind;
    use httpmock::prelude::*;

    fn settings(host: String) -> LlmSettings {
        LlmSettings {
            host,
            api_key: "test-key".to_string(),
            model_name: "test-model".to_string(),
            timeout_seconds: 5,
        }
    }

    fn completion(content: &str) -> Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
            ]
        })
    }

    #[test]
    fn test_extract_json_object_strips_fences_and_prose() {
        let fenced = "Here you go:\n```json\n{\"Device\": \"Walker\"}\n```";
        assert_eq!(extract_json_object(fenced), "{\"Device\": \"Walker\"}");
        assert_eq!(extract_json_object("  null "), "null");
        assert_eq!(extract_json_object("} nothing {"), "} nothing {");
    }

    #[test]
    fn test_parse_order_null_is_empty_order() {
        let order = parse_order("null").unwrap();
        assert!(order.is_empty());
    }

    #[test]
    fn test_parse_order_malformed_json_fails() {
        let err = parse_order("{\"Device\": ").unwrap_err();
        assert!(matches!(err, PipelineError::Serialization(_)));

        let err = parse_order("[1, 2]").unwrap_err();
        assert!(matches!(err, PipelineError::Extraction { .. }));
    }

    #[tokio::test]
    async fn test_extract_order_from_wrapped_response() {
        let server = MockServer::start_async().await;
        let content = "```json\n{\"device\": \"CPAP Machine\", \"usage\": \"Nightly during sleep\", \
                       \"diagnosis\": \"Obstructive Sleep Apnea\", \"orderingprovider\": \"Dr. Smith\", \
                       \"PATIENTNAME\": \"John Doe\", \"dob\": \"1980-01-15\", \"liters\": \"\"}\n```";

        let llm_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer test-key")
                    .json_body_partial(r#"{"model": "test-model", "response_format": {"type": "json_object"}}"#);
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(completion(content));
            })
            .await;

        let extractor = LlmNoteExtractor::new(settings(server.base_url())).unwrap();
        let order = extractor
            .extract_order(
                "Patient John Doe needs a CPAP Machine for sleep apnea.",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        llm_mock.assert_async().await;
        assert_eq!(order.device, "CPAP Machine");
        assert_eq!(order.patient_name, "John Doe");
        assert_eq!(order.ordering_provider, "Dr. Smith");
        assert_eq!(order.dob, "1980-01-15");
        assert!(order.liters.is_empty());
    }

    #[tokio::test]
    async fn test_extract_order_api_error_propagates() {
        let server = MockServer::start_async().await;
        let llm_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(503).body("service unavailable");
            })
            .await;

        let extractor = LlmNoteExtractor::new(settings(server.base_url())).unwrap();
        let err = extractor
            .extract_order("Some physician note.", &CancellationToken::new())
            .await
            .unwrap_err();

        llm_mock.assert_async().await;
        match err {
            PipelineError::LlmApi { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "service unavailable");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extract_order_without_choices_fails() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({"choices": []}));
            })
            .await;

        let extractor = LlmNoteExtractor::new(settings(server.base_url())).unwrap();
        let err = extractor
            .extract_order("Some physician note.", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Extraction { .. }));
    }

    #[tokio::test]
    async fn test_extract_order_timeout_is_cancellation() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200)
                    .json_body(completion("{}"))
                    .delay(Duration::from_secs(3));
            })
            .await;

        let extractor = LlmNoteExtractor::new(LlmSettings {
            timeout_seconds: 1,
            ..settings(server.base_url())
        })
        .unwrap();
        let err = extractor
            .extract_order("Some physician note.", &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn test_extract_order_empty_object_is_empty_order() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(completion("{}"));
            })
            .await;

        let extractor = LlmNoteExtractor::new(settings(server.base_url())).unwrap();
        let order = extractor
            .extract_order("Illegible note.", &CancellationToken::new())
            .await
            .unwrap();

        assert!(order.is_empty());
    }

    #[tokio::test]
    async fn test_extract_order_cancelled_before_send() {
        let server = MockServer::start_async().await;
        let llm_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(completion("{}"));
            })
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let extractor = LlmNoteExtractor::new(settings(server.base_url())).unwrap();
        let err = extractor.extract_order("note", &cancel).await.unwrap_err();

        assert!(err.is_cancellation());
        llm_mock.assert_hits_async(0).await;
    }
}
