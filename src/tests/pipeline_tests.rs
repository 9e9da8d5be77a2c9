//! Streamed chat turn behavior, including the event ordering contract

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use crate::models::Language;
use crate::models::ResolvedLocation;
use crate::models::StreamEvent;
use crate::rag::ChatTurn;
use crate::rag::ContextRetriever;
use crate::rag::RagService;
use crate::rag::TotalCount;
use crate::tests::mocks::shelter_doc;
use crate::tests::mocks::MockEmbedding;
use crate::tests::mocks::MockGeneration;
use crate::tests::mocks::MockGenerator;
use crate::tests::mocks::MockVectorStore;

const COLLECTION: &str = "uppsala_shelters";

fn service(store: Arc<MockVectorStore>, generator: Arc<MockGenerator>) -> RagService {
    let retriever = Arc::new(ContextRetriever::new(
        Arc::new(MockEmbedding::ok()),
        store.clone(),
        COLLECTION,
    ));
    RagService::new(
        retriever,
        generator,
        store,
        COLLECTION,
        Arc::new(TotalCount::new(Duration::ZERO)),
        0.7,
        512,
    )
}

fn turn(question: &str) -> ChatTurn {
    ChatTurn {
        question: question.to_string(),
        history: Vec::new(),
        language: Language::Sv,
        max_docs: 5,
        location: None,
    }
}

fn ranked_store() -> Arc<MockVectorStore> {
    Arc::new(MockVectorStore::with_ranked(
        &["a", "b"],
        &[0.1, 0.2],
        vec![
            shelter_doc("a", Some((59.86, 17.6447))),
            shelter_doc("b", Some((59.88, 17.6447))),
        ],
    ))
}

#[tokio::test]
async fn test_event_ordering_on_success() {
    let service = service(
        ranked_store(),
        Arc::new(MockGenerator::chunks(&["Det ", "finns ", "två."])),
    );

    let events: Vec<StreamEvent> = service.stream(turn("Var finns skyddsrum?")).collect().await;

    assert!(matches!(events[0], StreamEvent::Context { count: 2, .. }));
    let chunks: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Chunk { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(chunks, vec!["Det ", "finns ", "två."]);
    assert!(matches!(events[events.len() - 2], StreamEvent::Sources { .. }));
    assert_eq!(events[events.len() - 1], StreamEvent::Done);
}

#[tokio::test]
async fn test_empty_generation_yields_context_then_error() {
    let service = service(
        ranked_store(),
        Arc::new(MockGenerator::new(MockGeneration::Empty)),
    );

    let events: Vec<StreamEvent> = service.stream(turn("Var finns skyddsrum?")).collect().await;

    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], StreamEvent::Context { .. }));
    assert!(matches!(events[1], StreamEvent::Error { .. }));
}

#[tokio::test]
async fn test_generation_start_failure_is_terminal() {
    let service = service(
        ranked_store(),
        Arc::new(MockGenerator::new(MockGeneration::FailStart)),
    );

    let events: Vec<StreamEvent> = service.stream(turn("Var finns skyddsrum?")).collect().await;

    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], StreamEvent::Context { .. }));
    assert!(matches!(events[1], StreamEvent::Error { .. }));
}

#[tokio::test]
async fn test_mid_stream_failure_keeps_chunks_and_ends_with_error() {
    let service = service(
        ranked_store(),
        Arc::new(MockGenerator::new(MockGeneration::FailAfter(vec![
            "Det finns".to_string(),
        ]))),
    );

    let events: Vec<StreamEvent> = service.stream(turn("Var finns skyddsrum?")).collect().await;

    assert!(matches!(events[0], StreamEvent::Context { .. }));
    assert_eq!(
        events[1],
        StreamEvent::Chunk {
            text: "Det finns".to_string()
        }
    );
    assert!(matches!(events.last(), Some(StreamEvent::Error { .. })));
    assert!(!events
        .iter()
        .any(|e| matches!(e, StreamEvent::Sources { .. } | StreamEvent::Done)));
}

#[tokio::test]
async fn test_sources_carry_distances_for_located_turns() {
    let service = service(ranked_store(), Arc::new(MockGenerator::chunks(&["Svar."])));

    let mut located = turn("närmaste skyddsrum?");
    located.location =
        ResolvedLocation::new(59.8585, 17.6447, "Uppsala C", "Centralstationen", "central");

    let events: Vec<StreamEvent> = service.stream(located).collect().await;
    let sources = events
        .iter()
        .find_map(|e| match e {
            StreamEvent::Sources { sources } => Some(sources),
            _ => None,
        })
        .expect("sources event");
    assert!(!sources.is_empty());
    assert!(sources.iter().all(|s| s.distance_km.is_some()));
    // Nearest first
    assert!(sources[0].distance_km.unwrap() <= sources[1].distance_km.unwrap());
}

#[tokio::test]
async fn test_respond_returns_answer_and_sources() {
    let service = service(
        ranked_store(),
        Arc::new(MockGenerator::chunks(&["Det finns ", "två."])),
    );

    let (answer, sources) = service.respond(turn("Var finns skyddsrum?")).await;
    assert_eq!(answer, "Det finns två.");
    assert_eq!(sources.len(), 2);
}

#[tokio::test]
async fn test_respond_degrades_generation_failure_to_apology() {
    let service = service(
        ranked_store(),
        Arc::new(MockGenerator::new(MockGeneration::FailStart)),
    );

    let (answer, sources) = service.respond(turn("Var finns skyddsrum?")).await;
    assert!(answer.contains("Ursäkta"));
    // Retrieval succeeded, so the sources still come back
    assert_eq!(sources.len(), 2);
}

#[tokio::test]
async fn test_total_count_serves_stale_value_on_refresh_failure() {
    let store = ranked_store();
    let count = TotalCount::new(Duration::ZERO);

    assert_eq!(count.get(store.as_ref(), COLLECTION).await, 294);

    store.fail_count.store(true, Ordering::SeqCst);
    // Refresh fails, the stale snapshot is served
    assert_eq!(count.get(store.as_ref(), COLLECTION).await, 294);
}

#[tokio::test]
async fn test_total_count_without_snapshot_reports_zero() {
    let store = ranked_store();
    store.fail_count.store(true, Ordering::SeqCst);

    let count = TotalCount::new(Duration::from_secs(3600));
    assert_eq!(count.get(store.as_ref(), COLLECTION).await, 0);
}

#[tokio::test]
async fn test_dropped_stream_never_starts_generation() {
    let generator = Arc::new(MockGenerator::chunks(&["never seen"]));
    let service = service(ranked_store(), generator.clone());

    {
        let stream = service.stream(turn("Var finns skyddsrum?"));
        futures::pin_mut!(stream);
        // Consume only the leading context event, then drop the stream
        let first = stream.next().await;
        assert!(matches!(first, Some(StreamEvent::Context { .. })));
    }

    assert!(!generator.invoked.load(Ordering::SeqCst));
}
