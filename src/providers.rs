//! External collaborator contracts: reverse geocoding, places search and
//! wind observations.
//!
//! Like the storage trait, these return `impl Future` without `Send` bounds;
//! the engine runs on a single-threaded event loop.

use crate::error::ProviderError;
use crate::model::WindObservation;
use geo_types::Coord;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Category of waypoint a perimeter search asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceCategory {
    Fuel,
    Parking,
    Transit,
}

impl PlaceCategory {
    /// Category tag understood by common places APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fuel => "gas_station",
            Self::Parking => "parking",
            Self::Transit => "transit_station",
        }
    }

    pub fn all() -> [PlaceCategory; 3] {
        [Self::Fuel, Self::Parking, Self::Transit]
    }
}

/// A point of interest returned by a places provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Provider-assigned identifier, used for deduplication.
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub location: Coord<f64>,
}

impl Place {
    pub fn new(id: impl Into<String>, name: Option<&str>, location: Coord<f64>) -> Self {
        Self {
            id: id.into(),
            name: name.map(str::to_string),
            location,
        }
    }
}

/// Reverse geocoding: point to a human-readable address.
pub trait Geocoder {
    fn reverse_geocode(
        &self,
        point: Coord<f64>,
    ) -> impl Future<Output = Result<String, ProviderError>>;
}

/// Nearest-point-of-interest queries, ranked by proximity to `point`.
pub trait PlacesProvider {
    fn nearby(
        &self,
        point: Coord<f64>,
        category: PlaceCategory,
    ) -> impl Future<Output = Result<Vec<Place>, ProviderError>>;
}

/// On-demand wind observations. `Ok(None)` means no fresh reading.
pub trait WindProvider {
    fn observe(
        &self,
        point: Coord<f64>,
    ) -> impl Future<Output = Result<Option<WindObservation>, ProviderError>>;
}

/// Structured geocoder result, reduced to what address formatting needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressComponents {
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub street_number: Option<String>,
    #[serde(default)]
    pub formatted_address: Option<String>,
}

/// Short address for labels: "Route 12", else the route, else the first
/// comma-separated part of the formatted address.
pub fn format_address(components: &AddressComponents) -> String {
    fn non_empty(s: &Option<String>) -> Option<&str> {
        s.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    match (non_empty(&components.route), non_empty(&components.street_number)) {
        (Some(route), Some(number)) => return format!("{route} {number}"),
        (Some(route), None) => return route.to_string(),
        _ => {}
    }

    components
        .formatted_address
        .as_deref()
        .and_then(|f| f.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("Unknown location")
        .to_string()
}
