use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub backtrace: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    /// Base URL of the vector database service
    pub url: String,
    pub collection: String,
    #[serde(default = "default_vectordb_timeout")]
    pub request_timeout_secs: u64,
}

fn default_vectordb_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    /// "gemini" or "ollama"
    pub provider: String,
    pub model: String,
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub dimension: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai" (any OpenAI-compatible endpoint)
    pub provider: String,
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_llm_timeout")]
    pub request_timeout_secs: u64,
}

fn default_llm_model() -> String {
    "gemma3:27b".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> usize {
    2048
}

fn default_llm_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    #[serde(default = "default_geocoding_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_geocoding_timeout")]
    pub request_timeout_secs: u64,
}

fn default_geocoding_endpoint() -> String {
    "https://nominatim.openstreetmap.org/search".to_string()
}

fn default_user_agent() -> String {
    "shelterrag/0.1 (emergency shelter assistant)".to_string()
}

fn default_geocoding_timeout() -> u64 {
    10
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_geocoding_endpoint(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_geocoding_timeout(),
        }
    }
}

/// The region the shelter dataset covers. Geocoding results are biased
/// towards its bounding box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    pub country: String,
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
    #[serde(default = "default_bias_results")]
    pub bias_results: bool,
}

fn default_bias_results() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_max_docs")]
    pub max_docs: usize,
    /// How long the cached total shelter count stays fresh
    #[serde(default = "default_count_max_age_secs")]
    pub count_max_age_secs: u64,
}

fn default_max_docs() -> usize {
    5
}

fn default_count_max_age_secs() -> u64 {
    3600
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_docs: default_max_docs(),
            count_max_age_secs: default_count_max_age_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub vectordb: VectorDbConfig,
    pub embeddings: EmbeddingsConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    pub region: RegionConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from default config file path
    pub fn load() -> crate::Result<Self> {
        // Try to load from config.toml first, then fall back to config.example.toml
        if Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else if Path::new("config.example.toml").exists() {
            eprintln!(
                "Warning: Using config.example.toml. Please create config.toml for production use."
            );
            Self::from_file("config.example.toml")
        } else {
            Err(crate::ShelterRagError::Config(
                "No config file found. Please create config.toml or config.example.toml"
                    .to_string(),
            ))
        }
    }

    /// Get vector database service URL
    pub fn vectordb_url(&self) -> &str {
        &self.vectordb.url
    }

    /// Get the shelter collection name
    pub fn collection(&self) -> &str {
        &self.vectordb.collection
    }

    /// Get embedding dimension
    pub fn embedding_dimension(&self) -> usize {
        self.embeddings.dimension
    }

    /// Get embedding model name
    pub fn embedding_model(&self) -> &str {
        &self.embeddings.model
    }

    /// Get LLM endpoint
    pub fn llm_endpoint(&self) -> &str {
        &self.llm.endpoint
    }

    /// Get LLM model
    pub fn llm_model(&self) -> &str {
        &self.llm.model
    }

    /// Get default retrieval depth
    pub fn max_docs(&self) -> usize {
        self.retrieval.max_docs
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                backtrace: true,
            },
            vectordb: VectorDbConfig {
                url: "http://localhost:8000".to_string(),
                collection: "uppsala_shelters".to_string(),
                request_timeout_secs: default_vectordb_timeout(),
            },
            embeddings: EmbeddingsConfig {
                provider: "ollama".to_string(),
                model: "nomic-embed-text".to_string(),
                endpoint: "http://localhost:11434".to_string(),
                api_key: None,
                dimension: 768,
            },
            llm: LlmConfig {
                provider: "ollama".to_string(),
                endpoint: "http://localhost:11434".to_string(),
                api_key: None,
                model: default_llm_model(),
                temperature: default_temperature(),
                max_tokens: default_max_tokens(),
                request_timeout_secs: default_llm_timeout(),
            },
            geocoding: GeocodingConfig::default(),
            region: RegionConfig {
                name: "Uppsala".to_string(),
                country: "Sweden".to_string(),
                min_lon: 17.4,
                min_lat: 59.7,
                max_lon: 17.8,
                max_lat: 60.0,
                bias_results: true,
            },
            retrieval: RetrievalConfig::default(),
        }
    }
}
