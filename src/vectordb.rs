//! HTTP client for the vector database service
//!
//! The service exposes nearest-neighbor search over pre-ingested shelter
//! documents plus a batch by-id lookup and per-collection statistics. The
//! index internals are the service's concern; this client only speaks its
//! wire format.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::config::VectorDbConfig;
use crate::errors::Result;
use crate::errors::ShelterRagError;
use crate::models::StoredDocument;

/// Nearest-neighbor store collaborator seam
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Search a collection, returning ids and similarity distances in
    /// similarity-rank order (ascending distance).
    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<(Vec<String>, Vec<f32>)>;

    /// Fetch full documents for a set of ids. Order is not guaranteed;
    /// callers join by id.
    async fn get_by_ids(&self, collection: &str, ids: &[String]) -> Result<Vec<StoredDocument>>;

    /// Total number of documents in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;
}

/// Client for the vector database HTTP service
pub struct VectorDbClient {
    base_url: String,
    client: Client,
}

impl VectorDbClient {
    /// Create a new client from configuration
    pub fn new(config: &VectorDbConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ShelterRagError::Http(e.to_string()))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    collection_name: &'a str,
    query_embeddings: Vec<&'a [f32]>,
    n_results: usize,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: QueryResults,
}

/// The service returns one inner array per query embedding; we always send
/// exactly one.
#[derive(Deserialize, Default)]
struct QueryResults {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    distances: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct ByIdsResponse {
    #[serde(default)]
    documents: Vec<StoredDocument>,
}

#[derive(Deserialize)]
struct StatsResponse {
    #[serde(default)]
    stats: CollectionStats,
}

#[derive(Deserialize, Default)]
struct CollectionStats {
    #[serde(default)]
    count: usize,
}

#[async_trait]
impl VectorStore for VectorDbClient {
    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<(Vec<String>, Vec<f32>)> {
        let url = format!("{}/query", self.base_url);
        debug!("Querying vector db: collection={collection} top_k={top_k}");

        let request = QueryRequest {
            collection_name: collection,
            query_embeddings: vec![query_embedding],
            n_results: top_k,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ShelterRagError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ShelterRagError::VectorStore(format!(
                "Query failed ({status}): {error_text}"
            )));
        }

        let result: QueryResponse = response
            .json()
            .await
            .map_err(|e| ShelterRagError::VectorStore(format!("Failed to parse response: {e}")))?;

        let ids = result.results.ids.into_iter().next().unwrap_or_default();
        let distances = result
            .results
            .distances
            .into_iter()
            .next()
            .unwrap_or_default();

        Ok((ids, distances))
    }

    async fn get_by_ids(&self, collection: &str, ids: &[String]) -> Result<Vec<StoredDocument>> {
        let url = format!("{}/collections/{collection}/documents/by_ids", self.base_url);
        debug!("Fetching {} documents by id", ids.len());

        let response = self
            .client
            .post(&url)
            .json(&ids)
            .send()
            .await
            .map_err(|e| ShelterRagError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ShelterRagError::VectorStore(format!(
                "By-id fetch failed ({status}): {error_text}"
            )));
        }

        let result: ByIdsResponse = response
            .json()
            .await
            .map_err(|e| ShelterRagError::VectorStore(format!("Failed to parse response: {e}")))?;

        Ok(result.documents)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let url = format!("{}/collections/{collection}/stats", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ShelterRagError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ShelterRagError::VectorStore(format!(
                "Stats request failed ({})",
                response.status()
            )));
        }

        let result: StatsResponse = response
            .json()
            .await
            .map_err(|e| ShelterRagError::VectorStore(format!("Failed to parse response: {e}")))?;

        Ok(result.stats.count)
    }
}
