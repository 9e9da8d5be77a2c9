//! Semantic retrieval with optional geographic re-ranking

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::embeddings::EmbeddingBackend;
use crate::embeddings::EmbeddingTask;
use crate::errors::Result;
use crate::geo;
use crate::models::ResolvedLocation;
use crate::models::ShelterRecord;
use crate::models::StoredDocument;
use crate::vectordb::VectorStore;

/// Retrieves the shelter records most relevant to a question.
///
/// Retrieval never fails a chat turn: collaborator errors are logged and
/// degrade to an empty result, which downstream treats as "no context".
pub struct ContextRetriever {
    embeddings: Arc<dyn EmbeddingBackend>,
    store: Arc<dyn VectorStore>,
    collection: String,
}

impl ContextRetriever {
    pub fn new(
        embeddings: Arc<dyn EmbeddingBackend>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embeddings,
            store,
            collection: collection.into(),
        }
    }

    /// Retrieve up to `max_docs` records for `query`.
    ///
    /// With a location, candidates are fetched with extra headroom, ranked
    /// by distance to the user, and optionally filtered to the location's
    /// radius. Without one, similarity-rank order is preserved.
    pub async fn retrieve(
        &self,
        query: &str,
        max_docs: usize,
        location: Option<&ResolvedLocation>,
    ) -> Vec<ShelterRecord> {
        match self.try_retrieve(query, max_docs, location).await {
            Ok(records) => records,
            Err(e) => {
                error!("Retrieval failed, continuing without context: {e}");
                Vec::new()
            }
        }
    }

    async fn try_retrieve(
        &self,
        query: &str,
        max_docs: usize,
        location: Option<&ResolvedLocation>,
    ) -> Result<Vec<ShelterRecord>> {
        if max_docs == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embeddings.embed(query, EmbeddingTask::Query).await?;

        // Extra headroom when re-ranking by distance, so nearby shelters
        // just outside the similarity cutoff can still surface
        let fetch_count = if location.is_some() {
            max_docs.saturating_mul(2)
        } else {
            max_docs
        };

        let (ids, distances) = self
            .store
            .search(&self.collection, &embedding, fetch_count)
            .await?;
        if ids.is_empty() {
            debug!("Vector search returned no candidates for '{query}'");
            return Ok(Vec::new());
        }

        let documents = self.store.get_by_ids(&self.collection, &ids).await?;
        let mut by_id: HashMap<String, StoredDocument> = documents
            .into_iter()
            .map(|doc| (doc.id.clone(), doc))
            .collect();

        // Join by id in similarity-rank order. Ids the by-id fetch did not
        // return are dropped.
        let mut records: Vec<ShelterRecord> = Vec::with_capacity(ids.len());
        for (rank, id) in ids.iter().enumerate() {
            let Some(doc) = by_id.remove(id) else {
                continue;
            };
            let similarity_distance = distances.get(rank).copied().unwrap_or(f32::MAX);
            records.push(ShelterRecord {
                id: doc.id,
                document: doc.document,
                metadata: doc.metadata,
                similarity_distance,
                geo_distance_km: None,
            });
        }
        if records.len() < ids.len() {
            warn!(
                "Dropped {} candidate(s) missing from the by-id fetch",
                ids.len() - records.len()
            );
        }

        if let Some(location) = location {
            records = rerank_by_distance(records, location);
        }
        records.truncate(max_docs);
        Ok(records)
    }
}

/// Annotate records with distance to the user and re-rank nearest first.
///
/// Records without coordinates sort last (treated as infinitely far) and
/// are excluded entirely when a radius limit applies. The sort is stable,
/// so equal distances keep similarity order.
fn rerank_by_distance(
    mut records: Vec<ShelterRecord>,
    location: &ResolvedLocation,
) -> Vec<ShelterRecord> {
    for record in &mut records {
        record.geo_distance_km = record.metadata.coordinates().map(|(lat, lng)| {
            geo::distance_km(location.latitude, location.longitude, lat, lng)
        });
    }

    if let Some(radius) = location.max_radius_km {
        records.retain(|record| record.geo_distance_km.is_some_and(|d| d <= radius));
    }

    records.sort_by(|a, b| {
        let da = a.geo_distance_km.unwrap_or(f64::INFINITY);
        let db = b.geo_distance_km.unwrap_or(f64::INFINITY);
        da.total_cmp(&db)
    });
    records
}
