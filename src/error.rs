//! Error types for the zone model, providers and perimeter search.

use crate::model::{ShapeKind, ZoneId};
use thiserror::Error;

/// A zone field combination that breaks the zone invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: f64 },
    #[error("a {0} zone requires a bearing")]
    MissingBearing(ShapeKind),
    #[error("a keyhole zone requires an inner radius")]
    MissingInnerRadius,
    #[error("inner radius {inner} m exceeds outer radius {outer} m")]
    InnerExceedsOuter { inner: f64, outer: f64 },
    #[error("inner radius only applies to keyhole zones, not {0}")]
    NotKeyhole(ShapeKind),
    #[error("bearing only applies to sector and keyhole zones")]
    BearingOnCircle,
}

/// Failure of a zone model mutation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ZoneError {
    #[error("invalid zone: {0}")]
    Validation(#[from] ValidationError),
    #[error("zone {0} not found")]
    NotFound(ZoneId),
}

/// Failure reported by an external collaborator (geocoder, places, wind).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),
    #[error("provider error: {0}")]
    Provider(String),
}

/// Failure of a perimeter candidate search.
///
/// Finding nothing is not an error; see `SearchOutcome::NoCandidates`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("no zone to search around")]
    NoZone,
    #[error("places search failed: {0}")]
    Provider(#[from] ProviderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_converts_into_zone_error() {
        let err: ZoneError = ValidationError::MissingInnerRadius.into();
        assert!(matches!(err, ZoneError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "invalid zone: a keyhole zone requires an inner radius"
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = ZoneError::NotFound(ZoneId::new("abc"));
        assert_eq!(err.to_string(), "zone abc not found");
    }
}
