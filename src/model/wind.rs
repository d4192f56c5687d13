//! Wind observations.

use super::keys::UnixMillis;
use crate::geo::normalize_bearing;
use serde::{Deserialize, Serialize};

/// A surface wind reading.
///
/// `direction_from_deg` follows the meteorological convention: the
/// direction the wind blows *from*.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindObservation {
    pub speed_mps: f64,
    pub direction_from_deg: f64,
    pub observed_at: UnixMillis,
}

impl WindObservation {
    pub fn new(speed_mps: f64, direction_from_deg: f64, observed_at: UnixMillis) -> Self {
        Self {
            speed_mps,
            direction_from_deg,
            observed_at,
        }
    }

    /// Direction the wind carries things *to*.
    pub fn downwind_bearing(&self) -> f64 {
        normalize_bearing(self.direction_from_deg + 180.0)
    }
}
