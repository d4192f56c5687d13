//! Perimeter candidate search.
//!
//! Finds safe breakpoint candidates just outside a zone's hot perimeter:
//! sample points on the outer edge, ask the places provider for nearby
//! waypoints around each, then keep the closest ones that are strictly
//! outside the perimeter plus a clearance margin.

use crate::error::SearchError;
use crate::geo::{destination_point, distance_between};
use crate::model::Zone;
use crate::providers::{Place, PlaceCategory, PlacesProvider};
use futures_util::future::join_all;
use geo_types::Coord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Provider ids that mean "nothing here" rather than a real place.
const SENTINEL_IDS: &[&str] = &["", "ZERO_RESULTS", "NOT_FOUND"];

/// Tunables for the perimeter scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Bearings at which the outer edge is sampled.
    pub bearings_deg: Vec<f64>,
    pub categories: Vec<PlaceCategory>,
    /// Margin beyond the outer radius a candidate must clear.
    pub clearance_m: f64,
    /// Maximum number of candidates kept.
    pub shortlist_len: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            bearings_deg: vec![0.0, 120.0, 240.0],
            categories: PlaceCategory::all().to_vec(),
            clearance_m: 10.0,
            shortlist_len: 6,
        }
    }
}

/// A place that survived filtering, with its ranking distances.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub place_id: String,
    pub name: Option<String>,
    pub location: Coord<f64>,
    pub distance_to_center_m: f64,
    /// Distance outside the hot perimeter; the ranking key.
    pub distance_to_edge_m: f64,
}

impl Candidate {
    /// Marker label for the candidate at shortlist position `index`.
    pub fn label(&self, index: usize) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("BP {}", index + 1),
        }
    }
}

/// Why a search that did not fail came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoCandidateReason {
    /// Every query answered, none with a usable place.
    NoPlacesFound,
    /// Places were found, but none cleared the perimeter.
    NoneOutsidePerimeter,
}

/// Result of a completed search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found(Vec<Candidate>),
    NoCandidates(NoCandidateReason),
}

impl SearchOutcome {
    pub fn candidates(&self) -> &[Candidate] {
        match self {
            Self::Found(candidates) => candidates,
            Self::NoCandidates(_) => &[],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PerimeterSearch {
    config: SearchConfig,
}

impl PerimeterSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Points on the outer edge at each configured bearing.
    pub fn sample_edge_points(&self, center: Coord<f64>, radius_m: f64) -> Vec<Coord<f64>> {
        self.config
            .bearings_deg
            .iter()
            .map(|&bearing| destination_point(center, radius_m, bearing))
            .collect()
    }

    /// Runs the full scan around `zone`.
    ///
    /// All (edge point, category) queries run concurrently. A failed query
    /// counts as an empty list; only if every query fails is the search an
    /// error.
    pub async fn search<P: PlacesProvider>(
        &self,
        provider: &P,
        zone: &Zone,
    ) -> Result<SearchOutcome, SearchError> {
        let center = zone.center();
        let radius_m = zone.radius_m();

        let queries: Vec<_> = self
            .sample_edge_points(center, radius_m)
            .into_iter()
            .flat_map(|point| {
                self.config
                    .categories
                    .iter()
                    .map(move |&category| (point, category))
            })
            .map(|(point, category)| provider.nearby(point, category))
            .collect();
        let total = queries.len();

        let mut places = Vec::new();
        let mut failures = 0;
        let mut last_error = None;
        for result in join_all(queries).await {
            match result {
                Ok(found) => places.extend(found),
                Err(e) => {
                    log::warn!("Places query near zone {} failed: {}", zone.id(), e);
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }

        if failures == total {
            if let Some(e) = last_error {
                log::error!("All {} places queries failed for zone {}", total, zone.id());
                return Err(SearchError::Provider(e));
            }
        }

        Ok(self.outcome(center, radius_m, places))
    }

    /// Classifies ranked results into an outcome.
    pub fn outcome(
        &self,
        center: Coord<f64>,
        radius_m: f64,
        places: Vec<Place>,
    ) -> SearchOutcome {
        let usable = places
            .iter()
            .any(|p| !SENTINEL_IDS.contains(&p.id.as_str()));
        if !usable {
            return SearchOutcome::NoCandidates(NoCandidateReason::NoPlacesFound);
        }

        let shortlist = self.rank_candidates(center, radius_m, places);
        if shortlist.is_empty() {
            SearchOutcome::NoCandidates(NoCandidateReason::NoneOutsidePerimeter)
        } else {
            SearchOutcome::Found(shortlist)
        }
    }

    /// Dedups, filters and ranks raw places into the shortlist.
    ///
    /// The first occurrence of a place id wins. A place is kept only if it
    /// lies strictly farther than `radius + clearance` from the center.
    pub fn rank_candidates(
        &self,
        center: Coord<f64>,
        radius_m: f64,
        places: Vec<Place>,
    ) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        let limit = radius_m + self.config.clearance_m;

        let mut candidates: Vec<Candidate> = places
            .into_iter()
            .filter(|p| !SENTINEL_IDS.contains(&p.id.as_str()))
            .filter(|p| seen.insert(p.id.clone()))
            .filter_map(|p| {
                let distance_to_center_m = distance_between(center, p.location);
                (distance_to_center_m > limit).then(|| Candidate {
                    place_id: p.id,
                    name: p.name,
                    location: p.location,
                    distance_to_center_m,
                    distance_to_edge_m: distance_to_center_m - radius_m,
                })
            })
            .collect();

        // stable sort keeps first-seen order on ties
        candidates.sort_by(|a, b| a.distance_to_edge_m.total_cmp(&b.distance_to_edge_m));
        candidates.truncate(self.config.shortlist_len);
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::geo::lat_lng;
    use crate::model::{ShapeKind, UnixMillis, ZoneShape, ZoneStore};
    use futures_executor::block_on;
    use std::cell::Cell;

    fn center() -> Coord<f64> {
        lat_lng(59.3293, 18.0686)
    }

    fn zone(radius_m: f64) -> Zone {
        let mut store = ZoneStore::new();
        store
            .create(
                ZoneShape {
                    center: center(),
                    kind: ShapeKind::Circle,
                    radius_m,
                    inner_radius_m: None,
                    bearing_deg: None,
                    has_warm_zone: true,
                }
                .into(),
                UnixMillis(0),
            )
            .unwrap()
            .clone()
    }

    fn place(id: &str, distance_m: f64, bearing: f64) -> Place {
        Place::new(id, Some(id), destination_point(center(), distance_m, bearing))
    }

    /// Returns a fixed list per category, whatever the query point.
    struct CategoryMock {
        fuel: Vec<Place>,
        parking: Vec<Place>,
        transit: Vec<Place>,
        calls: Cell<usize>,
    }

    impl PlacesProvider for CategoryMock {
        async fn nearby(
            &self,
            _point: Coord<f64>,
            category: PlaceCategory,
        ) -> Result<Vec<Place>, ProviderError> {
            self.calls.set(self.calls.get() + 1);
            Ok(match category {
                PlaceCategory::Fuel => self.fuel.clone(),
                PlaceCategory::Parking => self.parking.clone(),
                PlaceCategory::Transit => self.transit.clone(),
            })
        }
    }

    struct FailingMock;

    impl PlacesProvider for FailingMock {
        async fn nearby(
            &self,
            _point: Coord<f64>,
            _category: PlaceCategory,
        ) -> Result<Vec<Place>, ProviderError> {
            Err(ProviderError::Network("offline".into()))
        }
    }

    /// Fails fuel queries, answers the rest.
    struct PartialMock;

    impl PlacesProvider for PartialMock {
        async fn nearby(
            &self,
            _point: Coord<f64>,
            category: PlaceCategory,
        ) -> Result<Vec<Place>, ProviderError> {
            match category {
                PlaceCategory::Fuel => Err(ProviderError::Provider("quota".into())),
                _ => Ok(vec![place("P", 700.0, 30.0)]),
            }
        }
    }

    #[test]
    fn test_edge_points_lie_on_perimeter() {
        let search = PerimeterSearch::default();
        let points = search.sample_edge_points(center(), 500.0);
        assert_eq!(points.len(), 3);
        for p in points {
            assert!((distance_between(center(), p) - 500.0).abs() < 0.01);
        }
    }

    #[test]
    fn test_clearance_filter_and_ranking() {
        let search = PerimeterSearch::default();
        let ranked = search.rank_candidates(
            center(),
            500.0,
            vec![
                place("far", 800.0, 10.0),
                place("inside", 495.0, 20.0),
                place("near", 520.0, 30.0),
            ],
        );
        let ids: Vec<_> = ranked.iter().map(|c| c.place_id.as_str()).collect();
        assert_eq!(ids, ["near", "far"]);
        assert!((ranked[0].distance_to_edge_m - 20.0).abs() < 0.01);
    }

    #[test]
    fn test_boundary_within_clearance_is_excluded() {
        let search = PerimeterSearch::default();
        let ranked = search.rank_candidates(center(), 500.0, vec![place("edge", 505.0, 0.0)]);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_dedup_sentinels_and_truncation() {
        let search = PerimeterSearch::default();
        let mut places: Vec<Place> = (0..10)
            .map(|i| place(&format!("p{i}"), 600.0 + 10.0 * i as f64, 0.0))
            .collect();
        places.push(place("p0", 900.0, 180.0));
        places.push(Place::new("ZERO_RESULTS", None, center()));

        let ranked = search.rank_candidates(center(), 500.0, places);
        assert_eq!(ranked.len(), 6);
        assert_eq!(ranked[0].place_id, "p0");
        assert!((ranked[0].distance_to_center_m - 600.0).abs() < 0.01);
    }

    #[test]
    fn test_label_falls_back_to_index() {
        let mut c = PerimeterSearch::default()
            .rank_candidates(center(), 100.0, vec![place("x", 300.0, 0.0)])
            .remove(0);
        assert_eq!(c.label(0), "x");
        c.name = None;
        assert_eq!(c.label(2), "BP 3");
    }

    #[test]
    fn test_end_to_end_three_categories() {
        let mock = CategoryMock {
            fuel: vec![place("A", 510.0, 45.0), place("B", 600.0, 160.0)],
            parking: vec![place("B", 600.0, 160.0), place("C", 505.0, 280.0)],
            transit: vec![place("C", 505.0, 280.0), place("A", 510.0, 45.0)],
            calls: Cell::new(0),
        };
        let search = PerimeterSearch::new(SearchConfig {
            clearance_m: 0.0,
            ..Default::default()
        });

        let outcome = block_on(search.search(&mock, &zone(500.0))).unwrap();
        let ids: Vec<_> = outcome
            .candidates()
            .iter()
            .map(|c| c.place_id.as_str())
            .collect();
        assert_eq!(ids, ["C", "A", "B"]);
        assert_eq!(mock.calls.get(), 9);
    }

    #[test]
    fn test_zero_results_is_not_an_error() {
        let mock = CategoryMock {
            fuel: vec![],
            parking: vec![],
            transit: vec![],
            calls: Cell::new(0),
        };
        let outcome = block_on(PerimeterSearch::default().search(&mock, &zone(500.0))).unwrap();
        assert_eq!(
            outcome,
            SearchOutcome::NoCandidates(NoCandidateReason::NoPlacesFound)
        );
    }

    #[test]
    fn test_all_inside_reports_none_outside() {
        let mock = CategoryMock {
            fuel: vec![place("in", 200.0, 0.0)],
            parking: vec![],
            transit: vec![],
            calls: Cell::new(0),
        };
        let outcome = block_on(PerimeterSearch::default().search(&mock, &zone(500.0))).unwrap();
        assert_eq!(
            outcome,
            SearchOutcome::NoCandidates(NoCandidateReason::NoneOutsidePerimeter)
        );
    }

    #[test]
    fn test_total_failure_is_an_error() {
        let result = block_on(PerimeterSearch::default().search(&FailingMock, &zone(500.0)));
        assert!(matches!(result, Err(SearchError::Provider(_))));
    }

    #[test]
    fn test_partial_failure_degrades_to_empty_lists() {
        let outcome = block_on(PerimeterSearch::default().search(&PartialMock, &zone(500.0))).unwrap();
        assert_eq!(outcome.candidates().len(), 1);
        assert_eq!(outcome.candidates()[0].place_id, "P");
    }
}
