use crate::domain::model::{Note, Order};
use crate::utils::error::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Supplies the batch of notes for one run.
#[async_trait]
pub trait NoteSource: Send + Sync {
    async fn read_notes(&self, cancel: &CancellationToken) -> Result<Vec<Note>>;
}

/// Turns raw note text into an order.
#[async_trait]
pub trait NoteExtractor: Send + Sync {
    async fn extract_order(&self, note: &str, cancel: &CancellationToken) -> Result<Order>;
}

/// Delivers an order downstream.
#[async_trait]
pub trait OrderSink: Send + Sync {
    async fn post_order(&self, order: &Order, cancel: &CancellationToken) -> Result<()>;
}

/// Runs the extract-then-post pipeline for a single note.
#[async_trait]
pub trait NoteProcessor: Send + Sync {
    async fn process_note(&self, note: &str, cancel: &CancellationToken) -> Result<()>;
}
