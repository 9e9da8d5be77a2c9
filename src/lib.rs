pub mod config;
pub mod embeddings;
pub mod errors;
pub mod geo;
pub mod geocoding;
pub mod llm;
pub mod location;
pub mod logging;
pub mod models;
pub mod rag;
pub mod vectordb;

pub mod api;

#[cfg(test)]
pub mod tests;

pub use config::AppConfig;
pub use errors::*;
