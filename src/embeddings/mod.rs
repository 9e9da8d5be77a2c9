//! Embedding generation against external providers

pub mod client;

pub use client::EmbeddingBackend;
pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;
pub use client::EmbeddingTask;
