//! Streaming response handling

use std::pin::Pin;

use async_stream::try_stream;
use bytes::Bytes;
use futures::Stream;
use futures::StreamExt;

use crate::errors::Result;
use crate::errors::ShelterRagError;

/// Ordered stream of generated text chunks
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Split an HTTP byte stream into trimmed, non-empty lines.
///
/// Both supported providers frame their incremental output line-wise
/// (NDJSON for Ollama, `data:`-prefixed SSE for OpenAI-compatible
/// endpoints), so line splitting is shared here.
pub(crate) fn lines<S>(byte_stream: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
{
    try_stream! {
        let mut byte_stream = Box::pin(byte_stream);
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = byte_stream.next().await {
            let chunk = chunk.map_err(|e| ShelterRagError::Http(e.to_string()))?;
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                if !line.is_empty() {
                    yield line;
                }
            }
        }

        // Trailing data without a final newline
        let tail = String::from_utf8_lossy(&buffer).trim().to_string();
        if !tail.is_empty() {
            yield tail;
        }
    }
}
