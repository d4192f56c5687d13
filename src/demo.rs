//! Offline collaborators for the workbench.
//!
//! A small fixed gazetteer of central Stockholm stands in for the places,
//! geocoding and weather services so the map works without network access.

use geo_types::Coord;
use tactimap::error::ProviderError;
use tactimap::geo::{distance_between, lat_lng};
use tactimap::model::{UnixMillis, WindObservation};
use tactimap::providers::{
    format_address, AddressComponents, Geocoder, Place, PlaceCategory, PlacesProvider,
    WindProvider,
};

struct DemoPlace {
    id: &'static str,
    name: Option<&'static str>,
    category: PlaceCategory,
    lat: f64,
    lng: f64,
}

const fn place(
    id: &'static str,
    name: &'static str,
    category: PlaceCategory,
    lat: f64,
    lng: f64,
) -> DemoPlace {
    DemoPlace {
        id,
        name: Some(name),
        category,
        lat,
        lng,
    }
}

static PLACES: &[DemoPlace] = &[
    place("fuel-1", "Circle K Vasagatan", PlaceCategory::Fuel, 59.3340, 18.0560),
    place("fuel-2", "OKQ8 Kungsholmen", PlaceCategory::Fuel, 59.3300, 18.0420),
    place("fuel-3", "Preem Fridhemsplan", PlaceCategory::Fuel, 59.3320, 18.0300),
    place("fuel-4", "St1 Södermalm", PlaceCategory::Fuel, 59.3150, 18.0650),
    place("park-1", "P-hus Centrum", PlaceCategory::Parking, 59.3325, 18.0640),
    place("park-2", "Q-Park Gallerian", PlaceCategory::Parking, 59.3320, 18.0700),
    place("park-3", "P-hus Sergel", PlaceCategory::Parking, 59.3338, 18.0660),
    place("park-4", "Parkering Slussen", PlaceCategory::Parking, 59.3200, 18.0700),
    DemoPlace {
        id: "park-5",
        name: None,
        category: PlaceCategory::Parking,
        lat: 59.3270,
        lng: 18.0800,
    },
    place("transit-1", "T-Centralen", PlaceCategory::Transit, 59.3313, 18.0597),
    place("transit-2", "Gamla stan", PlaceCategory::Transit, 59.3231, 18.0674),
    place("transit-3", "Kungsträdgården", PlaceCategory::Transit, 59.3307, 18.0735),
    place("transit-4", "Östermalmstorg", PlaceCategory::Transit, 59.3350, 18.0740),
    place("transit-5", "Hötorget", PlaceCategory::Transit, 59.3356, 18.0634),
    place("transit-6", "Rådmansgatan", PlaceCategory::Transit, 59.3405, 18.0588),
    place("transit-7", "Slussen", PlaceCategory::Transit, 59.3195, 18.0721),
];

/// Places from the built-in gazetteer within `search_radius_m` of the query.
pub struct DemoPlaces {
    pub search_radius_m: f64,
}

impl Default for DemoPlaces {
    fn default() -> Self {
        Self {
            search_radius_m: 1500.0,
        }
    }
}

impl PlacesProvider for DemoPlaces {
    async fn nearby(
        &self,
        point: Coord<f64>,
        category: PlaceCategory,
    ) -> Result<Vec<Place>, ProviderError> {
        let mut hits: Vec<(f64, Place)> = PLACES
            .iter()
            .filter(|p| p.category == category)
            .map(|p| {
                let location = lat_lng(p.lat, p.lng);
                (
                    distance_between(point, location),
                    Place::new(p.id, p.name, location),
                )
            })
            .filter(|(d, _)| *d <= self.search_radius_m)
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        log::debug!(
            "Demo places: {} {} result(s)",
            hits.len(),
            category.as_str()
        );
        Ok(hits.into_iter().map(|(_, p)| p).collect())
    }
}

static STREETS: &[(&str, &str, f64, f64)] = &[
    ("Drottninggatan", "12", 59.3318, 18.0626),
    ("Vasagatan", "7", 59.3316, 18.0580),
    ("Sergels torg", "1", 59.3323, 18.0645),
    ("Hamngatan", "18", 59.3315, 18.0700),
    ("Kungsgatan", "30", 59.3358, 18.0660),
    ("Birger Jarlsgatan", "9", 59.3345, 18.0730),
    ("Västerlånggatan", "41", 59.3245, 18.0690),
    ("Skeppsbron", "20", 59.3240, 18.0750),
    ("Götgatan", "4", 59.3175, 18.0720),
    ("Fleminggatan", "22", 59.3330, 18.0430),
];

/// Reverse geocoder that snaps to the nearest known street address.
pub struct DemoGeocoder {
    pub max_distance_m: f64,
}

impl Default for DemoGeocoder {
    fn default() -> Self {
        Self {
            max_distance_m: 400.0,
        }
    }
}

impl Geocoder for DemoGeocoder {
    async fn reverse_geocode(&self, point: Coord<f64>) -> Result<String, ProviderError> {
        let nearest = STREETS
            .iter()
            .map(|s| (distance_between(point, lat_lng(s.2, s.3)), s))
            .min_by(|a, b| a.0.total_cmp(&b.0));

        match nearest {
            Some((d, (route, number, _, _))) if d <= self.max_distance_m => {
                Ok(format_address(&AddressComponents {
                    route: Some(route.to_string()),
                    street_number: Some(number.to_string()),
                    formatted_address: Some(format!("{route} {number}, Stockholm")),
                }))
            }
            _ => Err(ProviderError::Provider("ZERO_RESULTS".to_string())),
        }
    }
}

/// Fixed wind reading, stamped with the time it was asked for.
pub struct DemoWind {
    pub speed_mps: f64,
    pub direction_from_deg: f64,
}

impl Default for DemoWind {
    fn default() -> Self {
        Self {
            speed_mps: 6.5,
            direction_from_deg: 250.0,
        }
    }
}

impl WindProvider for DemoWind {
    async fn observe(&self, _point: Coord<f64>) -> Result<Option<WindObservation>, ProviderError> {
        Ok(Some(WindObservation::new(
            self.speed_mps,
            self.direction_from_deg,
            UnixMillis::now(),
        )))
    }
}
