//! In-memory doubles for the extractor and sink ports.
//!
//! Used by the unit tests here and by the integration tests under `tests/`.

use crate::domain::model::Order;
use crate::domain::ports::{NoteExtractor, OrderSink};
use crate::utils::error::{PipelineError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

type Scripted = std::result::Result<Order, String>;

/// Extractor that answers from a script instead of calling a model.
#[derive(Clone)]
pub struct ScriptedExtractor {
    default: Scripted,
    rules: Vec<(String, Scripted)>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedExtractor {
    pub fn returning(order: Order) -> Self {
        Self::with_default(Ok(order))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_default(Err(message.into()))
    }

    fn with_default(default: Scripted) -> Self {
        Self {
            default,
            rules: Vec::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Notes containing `pattern` get `outcome` instead of the default.
    pub fn on_note_containing(
        mut self,
        pattern: impl Into<String>,
        outcome: std::result::Result<Order, String>,
    ) -> Self {
        self.rules.push((pattern.into(), outcome));
        self
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl NoteExtractor for ScriptedExtractor {
    async fn extract_order(&self, note: &str, cancel: &CancellationToken) -> Result<Order> {
        self.calls.lock().await.push(note.to_string());
        if cancel.is_cancelled() {
            return Err(PipelineError::cancelled("scripted extraction"));
        }

        let outcome = self
            .rules
            .iter()
            .find(|(pattern, _)| note.contains(pattern.as_str()))
            .map(|(_, outcome)| outcome)
            .unwrap_or(&self.default);

        outcome.clone().map_err(|message| PipelineError::Extraction { message })
    }
}

/// Sink that keeps every order it accepts.
#[derive(Clone, Default)]
pub struct RecordingSink {
    failures: Vec<(String, u16)>,
    posted: Arc<Mutex<Vec<Order>>>,
    attempts: Arc<Mutex<usize>>,
}

impl RecordingSink {
    pub fn accepting() -> Self {
        Self::default()
    }

    /// Orders for `device` are rejected with `status`.
    pub fn failing_for_device(mut self, device: impl Into<String>, status: u16) -> Self {
        self.failures.push((device.into(), status));
        self
    }

    pub async fn posted(&self) -> Vec<Order> {
        self.posted.lock().await.clone()
    }

    pub async fn attempts(&self) -> usize {
        *self.attempts.lock().await
    }
}

#[async_trait]
impl OrderSink for RecordingSink {
    async fn post_order(&self, order: &Order, cancel: &CancellationToken) -> Result<()> {
        *self.attempts.lock().await += 1;
        if cancel.is_cancelled() {
            return Err(PipelineError::cancelled("recording sink"));
        }

        if let Some((_, status)) = self.failures.iter().find(|(device, _)| *device == order.device) {
            return Err(PipelineError::Delivery {
                status: *status,
                body: "rejected by recording sink".to_string(),
            });
        }

        self.posted.lock().await.push(order.clone());
        Ok(())
    }
}
