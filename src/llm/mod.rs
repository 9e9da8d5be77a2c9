//! Text generation against external providers

pub mod client;
pub mod streaming;

pub use client::GenerationClient;
pub use client::GenerationProvider;
pub use client::TextGenerator;
pub use streaming::TokenStream;
