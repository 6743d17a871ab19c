pub mod processor;
pub mod worker;

pub use crate::domain::model::{Note, Order};
pub use crate::domain::ports::{NoteExtractor, NoteProcessor, NoteSource, OrderSink};
pub use crate::utils::error::Result;
