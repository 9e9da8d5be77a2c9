//! API request handlers

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::Event;
use axum::response::sse::KeepAlive;
use axum::response::sse::Sse;
use axum::Json;
use futures::Stream;
use futures::StreamExt;
use tracing::error;
use tracing::info;

use crate::api::types::ApiResponse;
use crate::api::types::ChatRequest;
use crate::api::types::ChatResponse;
use crate::api::types::GeocodeRequest;
use crate::api::types::HealthResponse;
use crate::api::types::SearchRequest;
use crate::location::LocationExtractor;
use crate::location::LocationResolver;
use crate::models::Language;
use crate::models::ResolvedLocation;
use crate::models::SourceInfo;
use crate::rag::ChatTurn;
use crate::rag::RagService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub rag: RagService,
    pub resolver: Arc<LocationResolver>,
    pub extractor: Arc<LocationExtractor>,
    pub default_max_docs: usize,
}

/// Health check handler
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        shelter_count: state.rag.shelter_count().await,
    }))
}

/// Buffered chat: the full answer in one response
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatResponse>>, (StatusCode, Json<ApiResponse<ChatResponse>>)> {
    info!("POST /api/chat: {}", req.message);

    let turn = build_turn(&state, req).await?;
    let (response, sources) = state.rag.respond(turn).await;
    Ok(Json(ApiResponse::success(ChatResponse {
        response,
        sources,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })))
}

/// Streaming chat over server-sent events.
///
/// Each SSE data frame is one pipeline event serialized as JSON.
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<ApiResponse<()>>)>
{
    info!("POST /api/chat/stream: {}", req.message);

    let turn = build_turn(&state, req).await?;
    let events = state.rag.stream(turn).map(|event| {
        let frame = match Event::default().json_data(&event) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize stream event: {e}");
                Event::default().data("{\"type\":\"error\",\"message\":\"serialization failure\"}")
            }
        };
        Ok(frame)
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Geocode a place name within the configured region
pub async fn geocode(
    State(state): State<AppState>,
    Json(req): Json<GeocodeRequest>,
) -> Result<Json<ApiResponse<ResolvedLocation>>, (StatusCode, Json<ApiResponse<ResolvedLocation>>)>
{
    info!("POST /api/geocode: {}", req.place);

    match state.resolver.resolve(&req.place).await {
        Some(location) => Ok(Json(ApiResponse::success(location))),
        None => Err(error_reply(
            StatusCode::NOT_FOUND,
            format!("No location found for '{}'", req.place),
        )),
    }
}

/// Raw retrieval without generation
pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Json<ApiResponse<Vec<SourceInfo>>> {
    info!("POST /api/search: {}", req.query);

    let results = state.rag.search(&req.query, req.limit, None).await;
    Json(ApiResponse::success(results))
}

/// Turn a chat request into pipeline parameters, resolving the location.
///
/// An explicit client position takes precedence; otherwise a place name is
/// extracted from the message and geocoded. Either step failing softly
/// leaves the turn without a location.
async fn build_turn<T>(
    state: &AppState,
    req: ChatRequest,
) -> Result<ChatTurn, (StatusCode, Json<ApiResponse<T>>)> {
    let language = Language::from_code(req.language.as_deref().unwrap_or(""));

    let mut location = match req.user_location {
        Some(position) => {
            let label = match language {
                Language::Sv => "din position",
                Language::En => "your location",
            };
            let Some(resolved) = ResolvedLocation::new(
                position.latitude,
                position.longitude,
                label,
                label,
                "",
            ) else {
                return Err(error_reply(
                    StatusCode::BAD_REQUEST,
                    "user_location coordinates are out of range",
                ));
            };
            Some(resolved)
        }
        None => match state.extractor.extract(&req.message) {
            Some(place) => state.resolver.resolve(&place).await,
            None => None,
        },
    };
    if let Some(radius) = req.max_radius_km {
        location = location.map(|l| l.with_max_radius(radius));
    }

    Ok(ChatTurn {
        question: req.message,
        history: req.conversation_history,
        language,
        max_docs: req.max_context_docs.unwrap_or(state.default_max_docs),
        location,
    })
}

fn error_reply<T>(
    status: StatusCode,
    message: impl Into<String>,
) -> (StatusCode, Json<ApiResponse<T>>) {
    (status, Json(ApiResponse::error(message)))
}
