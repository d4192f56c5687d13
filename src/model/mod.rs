//! Zone and marker data model.
//!
//! Zones and markers are the only shared mutable state in the engine. All
//! mutation goes through [`ZoneStore`] and [`MarkerStore`].

mod keys;
mod marker;
mod wind;
mod zone;

pub use keys::{MarkerId, UnitId, UnixMillis, ZoneId};
pub use marker::{MarkerKind, MarkerPatch, MarkerStore, TacticalMarker};
pub use wind::WindObservation;
pub use zone::{ShapeKind, Zone, ZoneDescriptor, ZonePatch, ZoneShape, ZoneStore};
