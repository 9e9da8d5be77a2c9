//! Retrieval-augmented generation pipeline
//!
//! `ContextRetriever` turns a user question into ranked shelter records,
//! `prompts`/`context` turn those records into a grounded prompt, and
//! `RagService` drives the full streamed chat turn.

pub mod context;
pub mod pipeline;
pub mod prompts;
pub mod retriever;

pub use pipeline::ChatTurn;
pub use pipeline::RagService;
pub use pipeline::TotalCount;
pub use retriever::ContextRetriever;
