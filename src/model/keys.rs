//! Core key types for zones and markers.
//!
//! These types provide strongly-typed identifiers for the model and sync
//! layers:
//! - `UnitId`: Operating unit whose zones and markers are shared
//! - `ZoneId` / `MarkerId`: Record identifiers, immutable once assigned
//! - `UnixMillis`: Timestamp in milliseconds since Unix epoch
//!
//! ## Id Derivation
//!
//! Locally created records get an id made of the creation time in base 36
//! plus a per-store sequence number, so ids created in the same millisecond
//! by one operator never collide.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating unit identifier (e.g., "RTJ-310").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId(pub String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Storage key for this unit's zone collection.
    pub fn zones_key(&self) -> String {
        format!("tactimap_{}_zones", self.0)
    }

    /// Storage key for this unit's marker collection.
    pub fn markers_key(&self) -> String {
        format!("tactimap_{}_markers", self.0)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generates a fresh id from a creation time and sequence number.
            pub fn generate(now: UnixMillis, seq: u64) -> Self {
                Self(format!("{}-{}", to_base36(now.0.max(0) as u64), to_base36(seq)))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

record_id!(
    /// Identifies a hazard zone.
    ZoneId
);

record_id!(
    /// Identifies a tactical marker.
    MarkerId
);

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Unix timestamp in milliseconds.
///
/// Using milliseconds provides sub-second precision for debounce windows
/// and drift ticks, and matches the epoch-millisecond timestamps stored
/// alongside persisted records.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UnixMillis(pub i64);

impl UnixMillis {
    pub fn now() -> Self {
        use web_time::{SystemTime, UNIX_EPOCH};
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(duration.as_millis() as i64)
    }

    pub fn from_secs(secs: i64) -> Self {
        Self(secs * 1000)
    }

    pub fn as_secs(&self) -> i64 {
        self.0 / 1000
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// Returns this timestamp shifted by `millis`.
    pub fn plus_millis(&self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Seconds elapsed since `earlier`, clamped at zero.
    pub fn seconds_since(&self, earlier: UnixMillis) -> f64 {
        (self.0 - earlier.0).max(0) as f64 / 1000.0
    }
}

impl fmt::Display for UnixMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_storage_keys() {
        let unit = UnitId::new("RTJ-310");
        assert_eq!(unit.zones_key(), "tactimap_RTJ-310_zones");
        assert_eq!(unit.markers_key(), "tactimap_RTJ-310_markers");
    }

    #[test]
    fn test_generated_ids_are_unique_per_sequence() {
        let now = UnixMillis(1714564800000);
        let a = ZoneId::generate(now, 0);
        let b = ZoneId::generate(now, 1);
        assert_ne!(a, b);
        assert!(a.as_str().ends_with("-0"));
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_seconds_since_clamps() {
        let t0 = UnixMillis(10_000);
        assert_eq!(UnixMillis(40_000).seconds_since(t0), 30.0);
        assert_eq!(UnixMillis(5_000).seconds_since(t0), 0.0);
    }
}
