//! In-memory collaborator fakes shared across pipeline tests

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::embeddings::EmbeddingBackend;
use crate::embeddings::EmbeddingTask;
use crate::errors::Result;
use crate::errors::ShelterRagError;
use crate::llm::TextGenerator;
use crate::llm::TokenStream;
use crate::models::ShelterMetadata;
use crate::models::StoredDocument;
use crate::vectordb::VectorStore;

/// Returns a fixed dummy vector for any input
pub struct MockEmbedding {
    pub fail: bool,
}

impl MockEmbedding {
    pub fn ok() -> Self {
        Self { fail: false }
    }
}

#[async_trait]
impl EmbeddingBackend for MockEmbedding {
    async fn embed(&self, _text: &str, _task: EmbeddingTask) -> Result<Vec<f32>> {
        if self.fail {
            return Err(ShelterRagError::Embedding("mock failure".to_string()));
        }
        Ok(vec![0.1; 8])
    }
}

/// Serves a canned ranked result set and document collection
pub struct MockVectorStore {
    pub ids: Vec<String>,
    pub distances: Vec<f32>,
    pub documents: Vec<StoredDocument>,
    pub total: usize,
    pub fail_search: bool,
    pub fail_count: AtomicBool,
    /// `top_k` of the most recent search call
    pub seen_top_k: Mutex<Option<usize>>,
}

impl MockVectorStore {
    pub fn with_ranked(ids: &[&str], distances: &[f32], documents: Vec<StoredDocument>) -> Self {
        Self {
            ids: ids.iter().map(|s| (*s).to_string()).collect(),
            distances: distances.to_vec(),
            documents,
            total: 294,
            fail_search: false,
            fail_count: AtomicBool::new(false),
            seen_top_k: Mutex::new(None),
        }
    }

    pub fn empty() -> Self {
        Self::with_ranked(&[], &[], Vec::new())
    }
}

#[async_trait]
impl VectorStore for MockVectorStore {
    async fn search(
        &self,
        _collection: &str,
        _query_embedding: &[f32],
        top_k: usize,
    ) -> Result<(Vec<String>, Vec<f32>)> {
        *self.seen_top_k.lock().unwrap() = Some(top_k);
        if self.fail_search {
            return Err(ShelterRagError::VectorStore("mock failure".to_string()));
        }
        let n = top_k.min(self.ids.len());
        Ok((self.ids[..n].to_vec(), self.distances[..n].to_vec()))
    }

    async fn get_by_ids(&self, _collection: &str, ids: &[String]) -> Result<Vec<StoredDocument>> {
        Ok(self
            .documents
            .iter()
            .filter(|doc| ids.contains(&doc.id))
            .cloned()
            .collect())
    }

    async fn count(&self, _collection: &str) -> Result<usize> {
        if self.fail_count.load(Ordering::SeqCst) {
            return Err(ShelterRagError::VectorStore("mock failure".to_string()));
        }
        Ok(self.total)
    }
}

/// Scripted generation behavior
pub enum MockGeneration {
    /// Stream these chunks, then finish normally
    Chunks(Vec<String>),
    /// Finish immediately without producing anything
    Empty,
    /// Fail before the stream starts
    FailStart,
    /// Stream the prefix, then fail mid-stream
    FailAfter(Vec<String>),
}

pub struct MockGenerator {
    pub behavior: MockGeneration,
    /// Set once either generation entry point runs
    pub invoked: AtomicBool,
}

impl MockGenerator {
    pub fn new(behavior: MockGeneration) -> Self {
        Self {
            behavior,
            invoked: AtomicBool::new(false),
        }
    }

    pub fn chunks(parts: &[&str]) -> Self {
        Self::new(MockGeneration::Chunks(
            parts.iter().map(|s| (*s).to_string()).collect(),
        ))
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(
        &self,
        _prompt: &str,
        _temperature: f32,
        _max_tokens: usize,
    ) -> Result<String> {
        self.invoked.store(true, Ordering::SeqCst);
        match &self.behavior {
            MockGeneration::Chunks(parts) => Ok(parts.concat()),
            MockGeneration::Empty => Ok(String::new()),
            MockGeneration::FailStart | MockGeneration::FailAfter(_) => {
                Err(ShelterRagError::Generation("mock failure".to_string()))
            }
        }
    }

    async fn generate_stream(
        &self,
        _prompt: &str,
        _temperature: f32,
        _max_tokens: usize,
    ) -> Result<TokenStream> {
        self.invoked.store(true, Ordering::SeqCst);
        match &self.behavior {
            MockGeneration::Chunks(parts) => {
                let items: Vec<Result<String>> = parts.iter().cloned().map(Ok).collect();
                Ok(Box::pin(futures::stream::iter(items)))
            }
            MockGeneration::Empty => Ok(Box::pin(futures::stream::iter(
                Vec::<Result<String>>::new(),
            ))),
            MockGeneration::FailStart => {
                Err(ShelterRagError::Generation("mock failure".to_string()))
            }
            MockGeneration::FailAfter(prefix) => {
                let mut items: Vec<Result<String>> = prefix.iter().cloned().map(Ok).collect();
                items.push(Err(ShelterRagError::Generation("mock failure".to_string())));
                Ok(Box::pin(futures::stream::iter(items)))
            }
        }
    }
}

/// A stored shelter document with optional coordinates
pub fn shelter_doc(id: &str, coords: Option<(f64, f64)>) -> StoredDocument {
    let metadata = ShelterMetadata {
        name: Some(format!("Skyddsrum {id}")),
        coordinates_lat: coords.map(|(lat, _)| lat),
        coordinates_lng: coords.map(|(_, lng)| lng),
        ..ShelterMetadata::default()
    };
    StoredDocument {
        id: id.to_string(),
        document: format!("Skyddsrum {id} med plats för allmänheten."),
        metadata,
    }
}
