// Adapters layer: concrete implementations of the domain ports for the
// filesystem, the LLM provider and the order-intake service.

pub mod file_reader;
pub mod http;
pub mod llm_extractor;
pub mod order_client;

pub use file_reader::FileReader;
pub use llm_extractor::LlmNoteExtractor;
pub use order_client::OrderClient;
