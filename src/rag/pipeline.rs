//! The full chat turn: retrieve, prompt, generate, stream

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use async_stream::stream;
use futures::Stream;
use futures::StreamExt;
use tokio::sync::RwLock;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::llm::TextGenerator;
use crate::models::ChatMessage;
use crate::models::Language;
use crate::models::ResolvedLocation;
use crate::models::SourceInfo;
use crate::models::StreamEvent;
use crate::rag::prompts;
use crate::rag::retriever::ContextRetriever;
use crate::vectordb::VectorStore;

#[derive(Debug, Clone, Copy)]
struct CountSnapshot {
    value: usize,
    fetched_at: Instant,
}

/// Cached total number of indexed shelters.
///
/// The count changes only when the dataset is re-ingested, so it is fetched
/// lazily and reused until it goes stale. On refresh failure a stale value
/// is better than none; with no value at all, zero is reported.
pub struct TotalCount {
    snapshot: RwLock<Option<CountSnapshot>>,
    max_age: Duration,
}

impl TotalCount {
    #[must_use]
    pub fn new(max_age: Duration) -> Self {
        Self {
            snapshot: RwLock::new(None),
            max_age,
        }
    }

    pub async fn get(&self, store: &dyn VectorStore, collection: &str) -> usize {
        if let Some(snapshot) = *self.snapshot.read().await {
            if snapshot.fetched_at.elapsed() < self.max_age {
                return snapshot.value;
            }
        }

        match store.count(collection).await {
            Ok(value) => {
                let mut guard = self.snapshot.write().await;
                *guard = Some(CountSnapshot {
                    value,
                    fetched_at: Instant::now(),
                });
                value
            }
            Err(e) => {
                warn!("Failed to refresh shelter count: {e}");
                self.snapshot.read().await.map_or(0, |s| s.value)
            }
        }
    }
}

/// Everything an incoming chat turn needs, bundled for sharing across
/// handlers. Cloning is cheap.
#[derive(Clone)]
pub struct RagService {
    retriever: Arc<ContextRetriever>,
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn VectorStore>,
    collection: String,
    total_count: Arc<TotalCount>,
    temperature: f32,
    max_tokens: usize,
}

/// Per-turn request parameters
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub question: String,
    pub history: Vec<ChatMessage>,
    pub language: Language,
    pub max_docs: usize,
    pub location: Option<ResolvedLocation>,
}

impl RagService {
    pub fn new(
        retriever: Arc<ContextRetriever>,
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        total_count: Arc<TotalCount>,
        temperature: f32,
        max_tokens: usize,
    ) -> Self {
        Self {
            retriever,
            generator,
            store,
            collection: collection.into(),
            total_count,
            temperature,
            max_tokens,
        }
    }

    /// Run one chat turn as an event stream.
    ///
    /// Event order: one `Context`, then zero or more `Chunk`s, then
    /// `Sources` and `Done`. Any `Error` event terminates the stream.
    /// Nothing runs once the consumer stops polling.
    pub fn stream(&self, turn: ChatTurn) -> impl Stream<Item = StreamEvent> + Send + 'static {
        let service = self.clone();
        stream! {
            let records = service
                .retriever
                .retrieve(&turn.question, turn.max_docs, turn.location.as_ref())
                .await;
            info!(
                "Retrieved {} record(s) for chat turn (location: {})",
                records.len(),
                turn.location.as_ref().map_or("none", |l| l.place_name.as_str())
            );
            yield StreamEvent::Context {
                count: records.len(),
                message: context_message(turn.language, records.len()),
            };

            let total = service
                .total_count
                .get(service.store.as_ref(), &service.collection)
                .await;
            let prompt = prompts::assemble(
                turn.language,
                &turn.question,
                &turn.history,
                &records,
                total,
                turn.location.as_ref(),
            );

            let token_stream = match service
                .generator
                .generate_stream(&prompt, service.temperature, service.max_tokens)
                .await
            {
                Ok(stream) => stream,
                Err(e) => {
                    error!("Failed to start generation: {e}");
                    yield StreamEvent::Error {
                        message: generation_error_message(turn.language),
                    };
                    return;
                }
            };

            let mut token_stream = token_stream;
            let mut produced_any = false;
            while let Some(chunk) = token_stream.next().await {
                match chunk {
                    Ok(text) => {
                        produced_any = true;
                        yield StreamEvent::Chunk { text };
                    }
                    Err(e) => {
                        error!("Generation stream failed: {e}");
                        yield StreamEvent::Error {
                            message: generation_error_message(turn.language),
                        };
                        return;
                    }
                }
            }

            if !produced_any {
                warn!("Generation finished without producing any content");
                yield StreamEvent::Error {
                    message: empty_answer_message(turn.language),
                };
                return;
            }

            yield StreamEvent::Sources {
                sources: records.iter().map(SourceInfo::from_record).collect(),
            };
            yield StreamEvent::Done;
        }
    }

    /// Run one chat turn non-streamed. Generation failure degrades into a
    /// localized apology, matching the streamed path.
    pub async fn respond(&self, turn: ChatTurn) -> (String, Vec<SourceInfo>) {
        let records = self
            .retriever
            .retrieve(&turn.question, turn.max_docs, turn.location.as_ref())
            .await;

        let total = self
            .total_count
            .get(self.store.as_ref(), &self.collection)
            .await;
        let prompt = prompts::assemble(
            turn.language,
            &turn.question,
            &turn.history,
            &records,
            total,
            turn.location.as_ref(),
        );

        let sources: Vec<SourceInfo> = records.iter().map(SourceInfo::from_record).collect();
        match self
            .generator
            .generate(&prompt, self.temperature, self.max_tokens)
            .await
        {
            Ok(answer) => (answer, sources),
            Err(e) => {
                error!("Generation failed: {e}");
                (generation_error_message(turn.language), sources)
            }
        }
    }

    /// Current total shelter count, refreshing the cache as needed.
    pub async fn shelter_count(&self) -> usize {
        self.total_count
            .get(self.store.as_ref(), &self.collection)
            .await
    }

    /// Direct access to retrieval, for the search endpoint and CLI.
    pub async fn search(
        &self,
        query: &str,
        max_docs: usize,
        location: Option<&ResolvedLocation>,
    ) -> Vec<SourceInfo> {
        self.retriever
            .retrieve(query, max_docs, location)
            .await
            .iter()
            .map(SourceInfo::from_record)
            .collect()
    }
}

fn context_message(language: Language, count: usize) -> String {
    match (language, count) {
        (Language::Sv, 0) => "Hittade ingen relevant skyddsrumsinformation.".to_string(),
        (Language::Sv, 1) => "Hittade 1 relevant skyddsrum.".to_string(),
        (Language::Sv, n) => format!("Hittade {n} relevanta skyddsrum."),
        (Language::En, 0) => "Found no relevant shelter information.".to_string(),
        (Language::En, 1) => "Found 1 relevant shelter.".to_string(),
        (Language::En, n) => format!("Found {n} relevant shelters."),
    }
}

fn generation_error_message(language: Language) -> String {
    match language {
        Language::Sv => {
            "Ursäkta, jag kunde inte generera ett svar just nu. Försök igen om en stund."
                .to_string()
        }
        Language::En => {
            "Sorry, I couldn't generate a response right now. Please try again in a moment."
                .to_string()
        }
    }
}

fn empty_answer_message(language: Language) -> String {
    match language {
        Language::Sv => {
            "Jag fick inget svar från språkmodellen. Försök formulera om frågan.".to_string()
        }
        Language::En => {
            "I didn't get a response from the language model. Try rephrasing your question."
                .to_string()
        }
    }
}
