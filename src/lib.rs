pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod testing;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;

pub use adapters::{FileReader, LlmNoteExtractor, OrderClient};
pub use config::AppConfig;
pub use core::{
    processor::NotesProcessor,
    worker::{BatchWorker, NoteFailure, RunReport, WorkerState},
};
pub use domain::model::{Note, Order};
pub use utils::error::{ErrorKind, PipelineError, Result};
