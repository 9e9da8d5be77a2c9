//! Core data types shared across the retrieval and generation pipeline

use serde::Deserialize;
use serde::Serialize;

/// Response language. Swedish is the primary language; unknown codes fall
/// back to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Sv,
    En,
}

impl Language {
    /// Parse a language code, falling back to Swedish for anything unknown.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Self::En,
            _ => Self::Sv,
        }
    }

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Sv => "sv",
            Self::En => "en",
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::Sv
    }
}

/// Role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single message in the conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Shelter metadata as stored alongside each indexed document.
///
/// Every field is optional: the scraped source data is incomplete and the
/// store may hold values with the wrong type (e.g. capacity as a string).
/// Malformed values deserialize as absent rather than failing the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShelterMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub coordinates_lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub coordinates_lng: Option<f64>,
    #[serde(default)]
    pub map_url: Option<String>,
}

impl ShelterMetadata {
    /// Both coordinate fields present and finite.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.coordinates_lat, self.coordinates_lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some((lat, lng)),
            _ => None,
        }
    }
}

/// Accept an integer, a whole float, or a numeric string; anything else is
/// treated as absent.
fn lenient_u32<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Int(v)) => u32::try_from(v).ok(),
        Some(Raw::Float(v)) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => {
            Some(v as u32)
        }
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Accept a float, an integer, or a numeric string; anything else is absent.
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Float(f64),
        Int(i64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Float(v)) if v.is_finite() => Some(v),
        Some(Raw::Int(v)) => Some(v as f64),
        Some(Raw::Text(s)) => s.trim().parse().ok().filter(|v: &f64| v.is_finite()),
        _ => None,
    })
}

/// A document fetched from the vector store by id
#[derive(Debug, Clone, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub document: String,
    #[serde(default)]
    pub metadata: ShelterMetadata,
}

/// A retrieved shelter candidate.
///
/// `similarity_distance` is the store-reported metric (lower = more
/// similar); `geo_distance_km` is populated only when geographic re-ranking
/// was applied for this query.
#[derive(Debug, Clone, PartialEq)]
pub struct ShelterRecord {
    pub id: String,
    pub document: String,
    pub metadata: ShelterMetadata,
    pub similarity_distance: f32,
    pub geo_distance_km: Option<f64>,
}

/// A geocoded user location for one chat turn.
///
/// Intentionally not cached across turns: the user may reference a
/// different place in every message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
    pub place_name: String,
    pub source_query: String,
    pub max_radius_km: Option<f64>,
}

impl ResolvedLocation {
    /// Build a location, rejecting out-of-range or non-finite coordinates.
    #[must_use]
    pub fn new(
        latitude: f64,
        longitude: f64,
        display_name: impl Into<String>,
        place_name: impl Into<String>,
        source_query: impl Into<String>,
    ) -> Option<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
            display_name: display_name.into(),
            place_name: place_name.into(),
            source_query: source_query.into(),
            max_radius_km: None,
        })
    }

    #[must_use]
    pub fn with_max_radius(mut self, max_radius_km: f64) -> Self {
        self.max_radius_km = Some(max_radius_km);
        self
    }
}

/// Source entry attached to the end of a streamed answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub id: String,
    pub name: Option<String>,
    pub address: Option<String>,
    pub capacity: Option<u32>,
    pub district: Option<String>,
    pub coordinates_lat: Option<f64>,
    pub coordinates_lng: Option<f64>,
    pub map_url: Option<String>,
    /// Store-reported similarity distance
    pub score: f32,
    /// First 200 characters of the document text
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl SourceInfo {
    #[must_use]
    pub fn from_record(record: &ShelterRecord) -> Self {
        let snippet: String = record.document.chars().take(200).collect();
        Self {
            id: record.id.clone(),
            name: record.metadata.name.clone(),
            address: record.metadata.address.clone(),
            capacity: record.metadata.capacity,
            district: record.metadata.district.clone(),
            coordinates_lat: record.metadata.coordinates_lat,
            coordinates_lng: record.metadata.coordinates_lng,
            map_url: record.metadata.map_url.clone(),
            score: record.similarity_distance,
            snippet,
            distance_km: record.geo_distance_km,
        }
    }
}

/// Events produced by a streaming chat turn.
///
/// Ordering contract: exactly one `Context` first, then zero or more
/// `Chunk`s in generation order, then one `Sources` and one `Done`. An
/// `Error` terminates the turn and is always the last event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Context { count: usize, message: String },
    Chunk { text: String },
    Sources { sources: Vec<SourceInfo> },
    Error { message: String },
    Done,
}
