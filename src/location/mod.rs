//! Location handling: extracting a place reference from a free-text query
//! and resolving it to coordinates

pub mod extractor;
pub mod resolver;

pub use extractor::LocationExtractor;
pub use resolver::LocationResolver;
