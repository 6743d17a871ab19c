use crate::domain::ports::{NoteExtractor, NoteProcessor, OrderSink};
use crate::utils::error::Result;
use crate::utils::logger::preview;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

const NOTE_PREVIEW_CHARS: usize = 60;

/// Extracts an order from one note and hands it to the sink.
///
/// Failures from either stage are logged here once and returned unchanged;
/// whether they end the run is up to the caller.
pub struct NotesProcessor<E: NoteExtractor, S: OrderSink> {
    extractor: E,
    sink: S,
}

impl<E: NoteExtractor, S: OrderSink> NotesProcessor<E, S> {
    pub fn new(extractor: E, sink: S) -> Self {
        Self { extractor, sink }
    }
}

#[async_trait]
impl<E: NoteExtractor, S: OrderSink> NoteProcessor for NotesProcessor<E, S> {
    async fn process_note(&self, note: &str, cancel: &CancellationToken) -> Result<()> {
        let note_preview = preview(note, NOTE_PREVIEW_CHARS);

        let order = match self.extractor.extract_order(note, cancel).await {
            Ok(order) => order,
            Err(e) => {
                tracing::error!(
                    error_kind = ?e.kind(),
                    "Order extraction failed for note \"{}\": {}",
                    note_preview,
                    e
                );
                return Err(e);
            }
        };

        if !order.liters.is_empty() && !order.liters_applies() {
            tracing::warn!(
                "Order for {} carries Liters={} but is not an oxygen order",
                order.device,
                order.liters
            );
        }

        if let Err(e) = self.sink.post_order(&order, cancel).await {
            tracing::error!(
                error_kind = ?e.kind(),
                "Order delivery failed for {} (note \"{}\"): {}",
                order.device,
                note_preview,
                e
            );
            return Err(e);
        }

        Ok(())
    }
}
