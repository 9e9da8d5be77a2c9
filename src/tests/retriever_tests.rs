//! Retrieval behavior against mocked embedding and vector store backends

use std::sync::Arc;

use crate::models::ResolvedLocation;
use crate::rag::ContextRetriever;
use crate::tests::mocks::shelter_doc;
use crate::tests::mocks::MockEmbedding;
use crate::tests::mocks::MockVectorStore;

const COLLECTION: &str = "uppsala_shelters";

fn retriever(store: Arc<MockVectorStore>) -> ContextRetriever {
    ContextRetriever::new(Arc::new(MockEmbedding::ok()), store, COLLECTION)
}

fn central_station() -> ResolvedLocation {
    ResolvedLocation::new(59.8585, 17.6447, "Uppsala C", "Centralstationen", "central").unwrap()
}

#[tokio::test]
async fn test_no_location_preserves_similarity_order() {
    let store = Arc::new(MockVectorStore::with_ranked(
        &["a", "b", "c"],
        &[0.1, 0.2, 0.3],
        vec![
            shelter_doc("a", None),
            shelter_doc("b", None),
            shelter_doc("c", None),
        ],
    ));
    let retriever = retriever(store.clone());

    let records = retriever.retrieve("skyddsrum i centrum", 2, None).await;
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert!(records.iter().all(|r| r.geo_distance_km.is_none()));
    // Without a location there is no headroom fetch
    assert_eq!(*store.seen_top_k.lock().unwrap(), Some(2));
}

#[tokio::test]
async fn test_location_fetches_with_headroom() {
    let store = Arc::new(MockVectorStore::with_ranked(
        &["a"],
        &[0.1],
        vec![shelter_doc("a", Some((59.86, 17.6447)))],
    ));
    let retriever = retriever(store.clone());

    retriever
        .retrieve("närmaste skyddsrum", 3, Some(&central_station()))
        .await;
    assert_eq!(*store.seen_top_k.lock().unwrap(), Some(6));
}

#[tokio::test]
async fn test_oversized_max_docs_saturates_headroom() {
    let store = Arc::new(MockVectorStore::with_ranked(
        &["a"],
        &[0.1],
        vec![shelter_doc("a", Some((59.86, 17.6447)))],
    ));
    let retriever = retriever(store.clone());

    let records = retriever
        .retrieve("närmaste skyddsrum", usize::MAX, Some(&central_station()))
        .await;
    assert_eq!(records.len(), 1);
    assert_eq!(*store.seen_top_k.lock().unwrap(), Some(usize::MAX));
}

#[tokio::test]
async fn test_radius_filter_and_nearest_first() {
    // Latitude offsets from the station of roughly 0.2, 0.5, 1.5 and
    // 0.9 km; the 1.5 km record falls outside the radius
    let store = Arc::new(MockVectorStore::with_ranked(
        &["a", "b", "c", "d"],
        &[0.1, 0.2, 0.3, 0.4],
        vec![
            shelter_doc("a", Some((59.8585 + 0.0018, 17.6447))),
            shelter_doc("b", Some((59.8585 + 0.0045, 17.6447))),
            shelter_doc("c", Some((59.8585 + 0.0135, 17.6447))),
            shelter_doc("d", Some((59.8585 + 0.0081, 17.6447))),
        ],
    ));
    let retriever = retriever(store);

    let location = central_station().with_max_radius(1.0);
    let records = retriever
        .retrieve("närmaste skyddsrum", 4, Some(&location))
        .await;
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "d"]);
    assert!(records.iter().all(|r| r.geo_distance_km.unwrap() <= 1.0));
}

#[tokio::test]
async fn test_records_without_coordinates_rank_last() {
    let store = Arc::new(MockVectorStore::with_ranked(
        &["unknown", "known"],
        &[0.1, 0.2],
        vec![
            shelter_doc("unknown", None),
            shelter_doc("known", Some((59.87, 17.6447))),
        ],
    ));
    let retriever = retriever(store);

    let records = retriever
        .retrieve("skyddsrum", 2, Some(&central_station()))
        .await;
    assert_eq!(records[0].id, "known");
    assert_eq!(records[1].id, "unknown");
    assert_eq!(records[1].geo_distance_km, None);
}

#[tokio::test]
async fn test_candidates_missing_from_join_are_dropped() {
    let store = Arc::new(MockVectorStore::with_ranked(
        &["a", "gone", "c"],
        &[0.1, 0.2, 0.3],
        vec![shelter_doc("a", None), shelter_doc("c", None)],
    ));
    let retriever = retriever(store);

    let records = retriever.retrieve("skyddsrum", 3, None).await;
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
}

#[tokio::test]
async fn test_search_failure_degrades_to_empty() {
    let mut store = MockVectorStore::empty();
    store.fail_search = true;
    let retriever = retriever(Arc::new(store));

    let records = retriever.retrieve("skyddsrum", 5, None).await;
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_embedding_failure_degrades_to_empty() {
    let store = Arc::new(MockVectorStore::with_ranked(
        &["a"],
        &[0.1],
        vec![shelter_doc("a", None)],
    ));
    let retriever = ContextRetriever::new(
        Arc::new(MockEmbedding { fail: true }),
        store,
        COLLECTION,
    );

    let records = retriever.retrieve("skyddsrum", 5, None).await;
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_no_candidates_is_a_normal_outcome() {
    let retriever = retriever(Arc::new(MockVectorStore::empty()));
    let records = retriever.retrieve("skyddsrum", 5, None).await;
    assert!(records.is_empty());
}
