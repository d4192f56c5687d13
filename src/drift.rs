//! Man-overboard drift estimation.
//!
//! Estimates where a person in the water has drifted since the marker's
//! creation time using a simplified leeway model: a fixed fraction of the
//! wind speed, carried downwind. Estimates are derived display state and
//! never move the stored marker.

use crate::geo::{destination_point, distance_between, CircleShape};
use crate::model::{MarkerId, TacticalMarker, UnixMillis, WindObservation};
use chrono::{DateTime, Duration, NaiveTime, TimeZone};
use geo_types::{Coord, Line};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Drift heading with no wind reading: downwind of a wind from 0° (north).
const UNKNOWN_WIND_DRIFT_BEARING_DEG: f64 = 180.0;

/// Tunables for the leeway model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Fraction of wind speed a person in the water drifts at.
    pub leeway_coefficient: f64,
    /// Drift speed used when there is no wind (ambient current), m/s.
    pub residual_current_mps: f64,
    /// Uncertainty radius at time zero, meters.
    pub base_uncertainty_m: f64,
    /// Uncertainty growth, meters per elapsed second.
    pub uncertainty_growth_mps: f64,
    /// Interval between recomputations.
    pub tick_ms: i64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            leeway_coefficient: 0.03,
            residual_current_mps: 0.2,
            base_uncertainty_m: 10.0,
            uncertainty_growth_mps: 0.1,
            tick_ms: 1_000,
        }
    }
}

/// One drift projection for a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct DriftEstimate {
    pub marker_id: MarkerId,
    pub origin: Coord<f64>,
    pub position: Coord<f64>,
    pub elapsed_s: f64,
    pub speed_mps: f64,
    pub bearing_deg: f64,
    /// Whether the bearing came from an actual wind reading.
    pub direction_known: bool,
    pub uncertainty_radius_m: f64,
}

impl DriftEstimate {
    /// Track from the original position to the estimate.
    pub fn track(&self) -> Line<f64> {
        Line::new(self.origin, self.position)
    }

    /// Search circle centered on the estimate.
    pub fn search_area(&self) -> CircleShape {
        CircleShape {
            center: self.position,
            radius_m: self.uncertainty_radius_m,
        }
    }

    /// Distance drifted from the original position.
    pub fn drift_distance_m(&self) -> f64 {
        distance_between(self.origin, self.position)
    }
}

/// Stateless leeway calculator.
#[derive(Debug, Clone, Default)]
pub struct DriftEstimator {
    config: DriftConfig,
}

impl DriftEstimator {
    pub fn new(config: DriftConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    /// Projects a marker's drift at `now` under the latest wind reading.
    pub fn estimate(
        &self,
        marker: &TacticalMarker,
        wind: Option<&WindObservation>,
        now: UnixMillis,
    ) -> DriftEstimate {
        let elapsed_s = now.seconds_since(marker.created_at());

        let wind_speed = wind.map(|w| w.speed_mps).unwrap_or(0.0);
        let speed_mps = if wind_speed > 0.0 {
            wind_speed * self.config.leeway_coefficient
        } else {
            self.config.residual_current_mps
        };
        let bearing_deg = wind
            .map(WindObservation::downwind_bearing)
            .unwrap_or(UNKNOWN_WIND_DRIFT_BEARING_DEG);

        let origin = marker.position();
        DriftEstimate {
            marker_id: marker.id().clone(),
            origin,
            position: destination_point(origin, speed_mps * elapsed_s, bearing_deg),
            elapsed_s,
            speed_mps,
            bearing_deg,
            direction_known: wind.is_some(),
            uncertainty_radius_m: self.config.base_uncertainty_m
                + self.config.uncertainty_growth_mps * elapsed_s,
        }
    }
}

/// Recurring per-marker tick schedule.
///
/// A marker is tracked from the moment it exists until it is deleted;
/// `untrack` stops its tick immediately.
#[derive(Debug, Clone, Default)]
pub struct DriftTracker {
    next_due: BTreeMap<MarkerId, UnixMillis>,
    tick_ms: i64,
}

impl DriftTracker {
    pub fn new(tick_ms: i64) -> Self {
        Self {
            next_due: BTreeMap::new(),
            tick_ms: tick_ms.max(1),
        }
    }

    /// Starts ticking a marker; the first tick is due immediately.
    pub fn track(&mut self, id: MarkerId, now: UnixMillis) {
        self.next_due.entry(id).or_insert(now);
    }

    pub fn untrack(&mut self, id: &MarkerId) {
        self.next_due.remove(id);
    }

    pub fn is_tracking(&self, id: &MarkerId) -> bool {
        self.next_due.contains_key(id)
    }

    pub fn tracked(&self) -> impl Iterator<Item = &MarkerId> {
        self.next_due.keys()
    }

    pub fn clear(&mut self) {
        self.next_due.clear();
    }

    /// Markers whose tick is due at `now`; reschedules them one tick ahead.
    pub fn due(&mut self, now: UnixMillis) -> Vec<MarkerId> {
        let tick = self.tick_ms.max(1);
        let mut due = Vec::new();
        for (id, next) in self.next_due.iter_mut() {
            if *next <= now {
                due.push(id.clone());
                *next = now.plus_millis(tick);
            }
        }
        due
    }
}

/// Resolves a wall-clock "went overboard at HH:MM" entry to a timestamp.
///
/// The time is taken on the same day as `now`; if that lies in the future
/// it is taken from the previous day (the entry crossed midnight).
pub fn incident_time_from_clock<Tz: TimeZone>(
    hour: u32,
    minute: u32,
    now: &DateTime<Tz>,
) -> Option<UnixMillis> {
    let clock = NaiveTime::from_hms_opt(hour, minute, 0)?;
    let local = now.date_naive().and_time(clock);
    let mut candidate = now.timezone().from_local_datetime(&local).earliest()?;
    if candidate > *now {
        candidate = candidate - Duration::days(1);
    }
    Some(UnixMillis(candidate.timestamp_millis()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::lat_lng;
    use crate::model::{MarkerKind, MarkerStore};
    use chrono::Utc;

    fn mob(created_at: UnixMillis) -> TacticalMarker {
        let mut store = MarkerStore::new();
        store
            .add(
                MarkerKind::ManOverboard,
                lat_lng(59.32, 18.08),
                None,
                created_at,
                created_at,
            )
            .clone()
    }

    #[test]
    fn test_drift_is_monotonic_under_constant_wind() {
        let estimator = DriftEstimator::default();
        let t0 = UnixMillis(1_714_564_800_000);
        let marker = mob(t0);
        let wind = WindObservation::new(8.0, 270.0, t0);

        let samples: Vec<DriftEstimate> = [0, 30, 60]
            .iter()
            .map(|s| estimator.estimate(&marker, Some(&wind), t0.plus_millis(s * 1000)))
            .collect();

        for pair in samples.windows(2) {
            assert!(pair[1].uncertainty_radius_m >= pair[0].uncertainty_radius_m);
            assert!(pair[1].drift_distance_m() > pair[0].drift_distance_m());
        }
        assert_eq!(samples[0].uncertainty_radius_m, 10.0);
        assert!((samples[2].uncertainty_radius_m - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_leeway_speed_and_bearing() {
        let estimator = DriftEstimator::default();
        let t0 = UnixMillis(0);
        let marker = mob(t0);
        let wind = WindObservation::new(10.0, 0.0, t0);

        let est = estimator.estimate(&marker, Some(&wind), UnixMillis(100_000));
        assert!((est.speed_mps - 0.3).abs() < 1e-9);
        assert_eq!(est.bearing_deg, 180.0);
        assert!((est.drift_distance_m() - 30.0).abs() < 0.01);
        assert!(est.position.y < est.origin.y);
        assert!(est.direction_known);
    }

    #[test]
    fn test_no_wind_uses_residual_current() {
        let estimator = DriftEstimator::default();
        let marker = mob(UnixMillis(0));

        let est = estimator.estimate(&marker, None, UnixMillis(50_000));
        assert_eq!(est.speed_mps, 0.2);
        assert!(!est.direction_known);
        let north = WindObservation::new(0.0, 0.0, UnixMillis(0));
        assert_eq!(est.bearing_deg, north.downwind_bearing());

        let calm = WindObservation::new(0.0, 90.0, UnixMillis(0));
        let est = estimator.estimate(&marker, Some(&calm), UnixMillis(50_000));
        assert_eq!(est.speed_mps, 0.2);
        assert!((est.drift_distance_m() - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_estimate_does_not_move_marker() {
        let estimator = DriftEstimator::default();
        let marker = mob(UnixMillis(0));
        let before = marker.position();
        let est = estimator.estimate(&marker, None, UnixMillis(600_000));
        assert_eq!(marker.position(), before);
        assert_eq!(est.track().start, before);
        assert_eq!(est.search_area().center, est.position);
    }

    #[test]
    fn test_tracker_ticks_and_stops() {
        let mut tracker = DriftTracker::new(1_000);
        let id = MarkerId::new("mob-1");
        tracker.track(id.clone(), UnixMillis(0));

        assert_eq!(tracker.due(UnixMillis(0)), vec![id.clone()]);
        assert!(tracker.due(UnixMillis(500)).is_empty());
        assert_eq!(tracker.due(UnixMillis(1_000)), vec![id.clone()]);

        tracker.untrack(&id);
        assert!(tracker.due(UnixMillis(5_000)).is_empty());
        assert!(!tracker.is_tracking(&id));
    }

    #[test]
    fn test_incident_time_same_day() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let t = incident_time_from_clock(11, 45, &now).unwrap();
        assert_eq!(now.timestamp_millis() - t.0, 15 * 60 * 1000);
    }

    #[test]
    fn test_incident_time_crosses_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 10, 0).unwrap();
        let t = incident_time_from_clock(23, 50, &now).unwrap();
        assert_eq!(now.timestamp_millis() - t.0, 20 * 60 * 1000);
    }

    #[test]
    fn test_incident_time_rejects_bad_clock() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert!(incident_time_from_clock(25, 0, &now).is_none());
    }
}
