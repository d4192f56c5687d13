//! Geodesy and zone geometry.
//!
//! This module holds the spherical-earth math and the builder that turns
//! zone fields into renderable value objects (circles and sector polygons).

pub mod geodesy;
mod shape;

pub use geodesy::{
    bearing_between, cardinal_direction, destination_point, distance_between, lat_lng,
    normalize_bearing, EARTH_RADIUS_M,
};
pub use shape::{CircleShape, HotShape, ShapeBuilder, ShapeConfig, ZoneGeometry};
