use crate::domain::ports::{NoteProcessor, NoteSource};
use crate::utils::error::{ErrorKind, PipelineError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Idle,
    Running,
    /// The loop finished, whatever the individual note outcomes.
    Completed,
    /// The note source failed; nothing was processed.
    Aborted,
    Cancelled,
}

impl WorkerState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkerState::Completed | WorkerState::Aborted | WorkerState::Cancelled
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NoteFailure {
    pub note: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub state: WorkerState,
    pub processed: usize,
    pub failed: usize,
    pub total: usize,
    pub failures: Vec<NoteFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    fn started(total: usize) -> Self {
        let now = Utc::now();
        Self {
            state: WorkerState::Running,
            processed: 0,
            failed: 0,
            total,
            failures: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Process exit code for this report.
    ///
    /// 130 when cancelled, 2 when `fail_on_note_errors` is set and any note
    /// failed, otherwise 0.
    pub fn exit_code(&self, fail_on_note_errors: bool) -> i32 {
        match self.state {
            WorkerState::Cancelled => 130,
            WorkerState::Aborted => 1,
            _ if fail_on_note_errors && self.has_failures() => 2,
            _ => 0,
        }
    }
}

/// Runs every note from the source through the processor, one at a time.
pub struct BatchWorker<F: NoteSource, P: NoteProcessor> {
    source: F,
    processor: P,
    state: WorkerState,
}

impl<F: NoteSource, P: NoteProcessor> BatchWorker<F, P> {
    pub fn new(source: F, processor: P) -> Self {
        Self {
            source,
            processor,
            state: WorkerState::Idle,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Processes the whole batch.
    ///
    /// Per-note failures are tallied and never escape. The only error returned
    /// is a failure of the note source itself (or calling `run` twice).
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<RunReport> {
        if self.state != WorkerState::Idle {
            return Err(PipelineError::InvalidState { state: self.state });
        }
        self.state = WorkerState::Running;
        tracing::info!("Starting physician notes file worker.");

        tracing::info!("Reading physician notes files.");
        let notes = match self.source.read_notes(cancel).await {
            Ok(notes) => notes,
            Err(e) if cancel.is_cancelled() => {
                tracing::warn!("Cancellation requested while reading notes: {}", e);
                return Ok(self.finish(RunReport::started(0), WorkerState::Cancelled));
            }
            Err(e) => {
                self.state = WorkerState::Aborted;
                tracing::error!(
                    error_kind = ?e.kind(),
                    "Error occurred during processing of physician notes: {}",
                    e
                );
                return Err(e);
            }
        };
        tracing::info!("Found {} physician notes files to process.", notes.len());

        let mut report = RunReport::started(notes.len());
        let mut final_state = WorkerState::Completed;

        for note in &notes {
            if cancel.is_cancelled() {
                tracing::warn!(
                    "Cancellation requested. Stopping before {} ({} of {} notes handled).",
                    note.name,
                    report.processed + report.failed,
                    report.total
                );
                final_state = WorkerState::Cancelled;
                break;
            }

            tracing::info!("Processing file: {}", note.name);
            match self.processor.process_note(&note.text, cancel).await {
                Ok(()) => {
                    report.processed += 1;
                    tracing::info!("Successfully processed file: {}", note.name);
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        error_kind = ?e.kind(),
                        "Failed to process file: {}. Error: {}",
                        note.name,
                        e
                    );
                    report.failures.push(NoteFailure {
                        note: note.name.clone(),
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }

        // the last note may have been cut short by cancellation
        if cancel.is_cancelled() {
            final_state = WorkerState::Cancelled;
        }

        let report = self.finish(report, final_state);
        tracing::info!(
            "Physician notes processing {}. Processed: {}, Failed: {}, Total: {}",
            if report.state == WorkerState::Cancelled {
                "cancelled"
            } else {
                "completed"
            },
            report.processed,
            report.failed,
            report.total
        );
        Ok(report)
    }

    fn finish(&mut self, mut report: RunReport, state: WorkerState) -> RunReport {
        debug_assert!(state.is_terminal());
        self.state = state;
        report.state = state;
        report.finished_at = Utc::now();
        report
    }
}
