//! Resolving a place name to coordinates via the geocoding collaborator

use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::RegionConfig;
use crate::geocoding::BoundingBox;
use crate::geocoding::GeocodeHit;
use crate::geocoding::GeocodingBackend;
use crate::models::ResolvedLocation;

/// Resolver that turns an extracted place name into a `ResolvedLocation`.
///
/// Geocoding failure is never fatal for a chat turn: any transport error or
/// empty result degrades to "no location context" and is only logged.
pub struct LocationResolver {
    geocoder: Arc<dyn GeocodingBackend>,
    region: RegionConfig,
}

impl LocationResolver {
    pub fn new(geocoder: Arc<dyn GeocodingBackend>, region: RegionConfig) -> Self {
        Self { geocoder, region }
    }

    /// The region's bounding box, used as a viewport hint.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            min_lon: self.region.min_lon,
            min_lat: self.region.min_lat,
            max_lon: self.region.max_lon,
            max_lat: self.region.max_lat,
        }
    }

    /// Resolve a place name to coordinates, biased to the configured region.
    ///
    /// Returns `None` when the geocoder has no match, errors out, or
    /// returns out-of-range coordinates.
    pub async fn resolve(&self, place_name: &str) -> Option<ResolvedLocation> {
        let place = place_name.trim();
        if place.is_empty() {
            return None;
        }

        let bias = self.region.bias_results;
        let query = if bias
            && !place
                .to_lowercase()
                .contains(&self.region.name.to_lowercase())
        {
            format!("{place}, {}, {}", self.region.name, self.region.country)
        } else {
            place.to_string()
        };

        let viewport = self.bounding_box();
        let hits = match self
            .geocoder
            .geocode(&query, bias.then_some(&viewport))
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Geocoding failed for '{place}': {e}");
                return None;
            }
        };

        // Top-ranked result only
        let Some(hit) = hits.into_iter().next() else {
            debug!("No geocoding results for '{place}'");
            return None;
        };

        let label = place_label(&hit, place);
        let resolved =
            ResolvedLocation::new(hit.lat, hit.lon, hit.display_name.clone(), label, place);
        match resolved {
            Some(location) => {
                info!(
                    "Geocoded '{place}' to ({:.4}, {:.4}) - {}",
                    location.latitude, location.longitude, location.display_name
                );
                Some(location)
            }
            None => {
                warn!(
                    "Geocoder returned out-of-range coordinates for '{place}': ({}, {})",
                    hit.lat, hit.lon
                );
                None
            }
        }
    }
}

/// Pick a short label from the hit's address components, in a fixed
/// preference order, falling back to the raw query text.
fn place_label(hit: &GeocodeHit, fallback: &str) -> String {
    let address = &hit.address;
    address
        .amenity
        .clone()
        .or_else(|| address.building.clone())
        .or_else(|| address.road.clone())
        .or_else(|| address.suburb.clone())
        .or_else(|| address.neighbourhood.clone())
        .or_else(|| address.town.clone())
        .unwrap_or_else(|| fallback.to_string())
}
