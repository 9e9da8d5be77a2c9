//! HTTP server implementation

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers::AppState;
use crate::api::routes;
use crate::config::AppConfig;
use crate::embeddings::EmbeddingClient;
use crate::geocoding::NominatimClient;
use crate::llm::GenerationClient;
use crate::location::LocationExtractor;
use crate::location::LocationResolver;
use crate::rag::ContextRetriever;
use crate::rag::RagService;
use crate::rag::TotalCount;
use crate::vectordb::VectorDbClient;
use crate::Result;

/// Wire up all collaborator clients and the pipeline from configuration.
///
/// Shared between the server and the CLI commands.
pub fn build_state(config: &AppConfig) -> Result<AppState> {
    let embeddings = Arc::new(EmbeddingClient::new(&config.embeddings)?);
    let store = Arc::new(VectorDbClient::new(&config.vectordb)?);
    let generator = Arc::new(GenerationClient::new(&config.llm)?);
    let geocoder = Arc::new(NominatimClient::new(&config.geocoding)?);

    let retriever = Arc::new(ContextRetriever::new(
        embeddings,
        store.clone(),
        config.collection(),
    ));
    let total_count = Arc::new(TotalCount::new(Duration::from_secs(
        config.retrieval.count_max_age_secs,
    )));
    let rag = RagService::new(
        retriever,
        generator,
        store,
        config.collection(),
        total_count,
        config.llm.temperature,
        config.llm.max_tokens,
    );

    Ok(AppState {
        rag,
        resolver: Arc::new(LocationResolver::new(geocoder, config.region.clone())),
        extractor: Arc::new(LocationExtractor::new()),
        default_max_docs: config.max_docs(),
    })
}

/// Start the API server
pub async fn serve_api(
    config: &AppConfig,
    host: String,
    port: u16,
    enable_cors: bool,
) -> Result<()> {
    info!("Starting shelter assistant API server...");

    let state = build_state(config)?;

    let mut app = Router::new().nest("/api", routes::api_routes(state));

    // Add middleware layers
    app = app
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    // Add CORS if enabled
    if enable_cors {
        info!("CORS enabled");
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    // Start server
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /api/health       - Health check");
    info!("  POST /api/chat         - Buffered chat");
    info!("  POST /api/chat/stream  - Streaming chat (SSE)");
    info!("  POST /api/geocode      - Geocode a place name");
    info!("  POST /api/search       - Raw retrieval");

    axum::serve(listener, app).await?;

    Ok(())
}
