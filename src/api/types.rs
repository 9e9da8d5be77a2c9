//! API request and response types

use serde::Deserialize;
use serde::Serialize;

use crate::models::ChatMessage;
use crate::models::SourceInfo;

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub shelter_count: usize,
}

/// Explicit user position sent by the client, e.g. from browser geolocation
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UserLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Chat request, shared by the buffered and streaming endpoints
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
    /// "sv" (default) or "en"
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub max_context_docs: Option<usize>,
    /// When set, overrides any place name mentioned in the message
    #[serde(default)]
    pub user_location: Option<UserLocation>,
    /// Only return shelters within this distance of the location
    #[serde(default)]
    pub max_radius_km: Option<f64>,
}

/// Buffered chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub sources: Vec<SourceInfo>,
    pub timestamp: String,
}

/// Geocoding request
#[derive(Debug, Deserialize)]
pub struct GeocodeRequest {
    pub place: String,
}

/// Raw retrieval request
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    5
}
