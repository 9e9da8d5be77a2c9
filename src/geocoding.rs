//! Geocoding against a Nominatim-compatible endpoint

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::GeocodingConfig;
use crate::errors::Result;
use crate::errors::ShelterRagError;

/// Viewport hint passed to the geocoding provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Nominatim viewbox format: left,top,right,bottom
    #[must_use]
    pub fn to_viewbox(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lon, self.max_lat, self.max_lon, self.min_lat
        )
    }
}

/// Address components of a geocoding hit. Used to pick a short display
/// label for the resolved place.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressDetails {
    #[serde(default)]
    pub amenity: Option<String>,
    #[serde(default)]
    pub building: Option<String>,
    #[serde(default)]
    pub road: Option<String>,
    #[serde(default)]
    pub suburb: Option<String>,
    #[serde(default)]
    pub neighbourhood: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
}

/// One ranked geocoding result
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeHit {
    #[serde(deserialize_with = "coord_from_string_or_number")]
    pub lat: f64,
    #[serde(deserialize_with = "coord_from_string_or_number")]
    pub lon: f64,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub address: AddressDetails,
}

// Nominatim returns coordinates as JSON strings
fn coord_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(v) => Ok(v),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Place-name-to-coordinates collaborator seam
#[async_trait]
pub trait GeocodingBackend: Send + Sync {
    /// Geocode free-text, optionally restricted to a viewport. Results are
    /// ranked by provider relevance; an empty list means no match.
    async fn geocode(&self, query: &str, viewport: Option<&BoundingBox>)
        -> Result<Vec<GeocodeHit>>;
}

/// Client for a Nominatim-compatible geocoding endpoint.
///
/// Nominatim asks clients to identify themselves, so the User-Agent comes
/// from configuration.
pub struct NominatimClient {
    endpoint: String,
    user_agent: String,
    client: Client,
}

impl NominatimClient {
    /// Create a new client from configuration
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ShelterRagError::Http(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            user_agent: config.user_agent.clone(),
            client,
        })
    }
}

#[async_trait]
impl GeocodingBackend for NominatimClient {
    async fn geocode(
        &self,
        query: &str,
        viewport: Option<&BoundingBox>,
    ) -> Result<Vec<GeocodeHit>> {
        debug!("Geocoding query: '{query}'");

        let mut params = vec![
            ("q", query.to_string()),
            ("format", "json".to_string()),
            ("limit", "1".to_string()),
            ("addressdetails", "1".to_string()),
        ];
        if let Some(bbox) = viewport {
            params.push(("viewbox", bbox.to_viewbox()));
            params.push(("bounded", "1".to_string()));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| ShelterRagError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ShelterRagError::Geocoding(format!(
                "Geocoding request failed ({})",
                response.status()
            )));
        }

        let hits: Vec<GeocodeHit> = response
            .json()
            .await
            .map_err(|e| ShelterRagError::Geocoding(format!("Failed to parse response: {e}")))?;

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewbox_format() {
        let bbox = BoundingBox {
            min_lon: 17.4,
            min_lat: 59.7,
            max_lon: 17.8,
            max_lat: 60.0,
        };
        assert_eq!(bbox.to_viewbox(), "17.4,60,17.8,59.7");
    }

    #[test]
    fn test_hit_parsing_with_string_coordinates() {
        let json = r#"[{
            "lat": "59.8585",
            "lon": "17.6447",
            "display_name": "Uppsala Centralstation, Uppsala, Sweden",
            "address": {"building": "Uppsala Centralstation", "road": "Olof Palmes plats"}
        }]"#;
        let hits: Vec<GeocodeHit> = serde_json::from_str(json).unwrap();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].lat - 59.8585).abs() < 1e-9);
        assert_eq!(
            hits[0].address.building.as_deref(),
            Some("Uppsala Centralstation")
        );
    }
}
