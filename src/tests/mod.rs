//! Pipeline tests with mocked collaborators
//!
//! Unit tests for pure helpers live next to their modules; the tests here
//! exercise retrieval and the streamed chat turn end to end against
//! in-memory backends.

pub mod mocks;

mod pipeline_tests;
mod retriever_tests;
