//! Zone shape builder.
//!
//! Turns the canonical geometric fields of a zone into renderable value
//! objects. Geometry is always rebuilt from those fields, never patched
//! from a previously built polygon, so identical inputs give bit-identical
//! output.

use super::geodesy::{destination_point, normalize_bearing};
use crate::model::{ShapeKind, ZoneShape};
use geo_types::{Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};

/// Finest arc sampling step accepted from configuration.
const MIN_ARC_STEP_DEG: f64 = 0.5;

/// Tunables for shape construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    /// Distance added outside the anchoring radius for the warm-zone buffer.
    pub warm_standoff_m: f64,
    /// Half of the total sector opening for `sector` zones.
    pub sector_half_spread_deg: f64,
    /// Half of the total sector opening for `keyhole` zones.
    pub keyhole_half_spread_deg: f64,
    /// Angular sampling step along the sector arc, at least 0.5°.
    pub arc_step_deg: f64,
    /// Source radius the warm buffer of a plain sector is anchored to.
    pub sector_source_radius_m: f64,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            warm_standoff_m: 50.0,
            sector_half_spread_deg: 30.0,
            keyhole_half_spread_deg: 22.5,
            arc_step_deg: 5.0,
            sector_source_radius_m: 50.0,
        }
    }
}

/// A geodesic circle: center plus radius in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleShape {
    pub center: Coord<f64>,
    pub radius_m: f64,
}

/// Primary hot-zone primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum HotShape {
    Circle(CircleShape),
    Sector(Polygon<f64>),
}

/// Renderable geometry for a zone or a preview ghost.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneGeometry {
    /// Outer hot zone (circle, or sector polygon for sector/keyhole).
    pub hot: HotShape,
    /// Near-field hot circle around the source (keyhole only).
    pub inner_hot: Option<CircleShape>,
    /// Derived warm-zone buffer, present when the zone has one.
    pub warm: Option<CircleShape>,
    /// Position of the resize handle on the outer edge.
    pub handle: Coord<f64>,
}

impl ZoneGeometry {
    /// Center of the zone the geometry was built for.
    pub fn center(&self) -> Coord<f64> {
        match &self.hot {
            HotShape::Circle(c) => c.center,
            HotShape::Sector(poly) => poly.exterior().0.first().copied().unwrap_or(self.handle),
        }
    }
}

/// Builds zone geometry from canonical zone fields.
#[derive(Debug, Clone, Default)]
pub struct ShapeBuilder {
    config: ShapeConfig,
}

impl ShapeBuilder {
    pub fn new(config: ShapeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ShapeConfig {
        &self.config
    }

    /// Half-spread used for a given shape kind (0 for circles).
    pub fn half_spread_deg(&self, kind: ShapeKind) -> f64 {
        match kind {
            ShapeKind::Circle => 0.0,
            ShapeKind::Sector => self.config.sector_half_spread_deg,
            ShapeKind::Keyhole => self.config.keyhole_half_spread_deg,
        }
    }

    /// Radius of the warm buffer for a shape, or `None` if it has no buffer.
    ///
    /// Circles buffer their outer edge. Keyholes buffer the inner (source)
    /// radius, and plain sectors buffer the configured source radius, since
    /// the warm zone protects handlers near the source rather than the plume.
    pub fn warm_radius(&self, shape: &ZoneShape) -> Option<f64> {
        if !shape.has_warm_zone {
            return None;
        }
        let anchor = match shape.kind {
            ShapeKind::Circle => shape.radius_m,
            ShapeKind::Keyhole => shape.inner_radius_m.unwrap_or(0.0),
            ShapeKind::Sector => self.config.sector_source_radius_m,
        };
        Some(anchor + self.config.warm_standoff_m)
    }

    /// Builds the full geometry for a zone shape.
    pub fn build(&self, shape: &ZoneShape) -> ZoneGeometry {
        let center = shape.center;
        let bearing = shape.bearing_deg.unwrap_or(0.0);

        let hot = match shape.kind {
            ShapeKind::Circle => HotShape::Circle(CircleShape {
                center,
                radius_m: shape.radius_m,
            }),
            ShapeKind::Sector | ShapeKind::Keyhole => HotShape::Sector(self.sector_polygon(
                center,
                shape.radius_m,
                bearing,
                self.half_spread_deg(shape.kind),
            )),
        };

        let inner_hot = match (shape.kind, shape.inner_radius_m) {
            (ShapeKind::Keyhole, Some(inner)) => Some(CircleShape {
                center,
                radius_m: inner,
            }),
            _ => None,
        };

        let warm = self
            .warm_radius(shape)
            .map(|radius_m| CircleShape { center, radius_m });

        let handle_bearing = match shape.kind {
            ShapeKind::Circle => 0.0,
            ShapeKind::Sector | ShapeKind::Keyhole => bearing,
        };

        ZoneGeometry {
            hot,
            inner_hot,
            warm,
            handle: destination_point(center, shape.radius_m, handle_bearing),
        }
    }

    /// Samples a closed sector polygon: center, arc from
    /// `bearing - half_spread` to `bearing + half_spread`, back to center.
    ///
    /// Arc angles are computed by index from the start angle so repeated
    /// builds never accumulate floating error.
    pub fn sector_polygon(
        &self,
        center: Coord<f64>,
        radius_m: f64,
        bearing_deg: f64,
        half_spread_deg: f64,
    ) -> Polygon<f64> {
        let bearing = normalize_bearing(bearing_deg);
        let start = bearing - half_spread_deg;
        let end = bearing + half_spread_deg;
        let step = self.config.arc_step_deg.max(MIN_ARC_STEP_DEG);
        let steps = (((end - start) / step) - 1e-9).ceil().max(0.0) as usize;

        let mut ring = Vec::with_capacity(steps + 3);
        ring.push(center);
        for i in 0..steps {
            ring.push(destination_point(center, radius_m, start + step * i as f64));
        }
        ring.push(destination_point(center, radius_m, end));
        ring.push(center);

        Polygon::new(LineString::from(ring), vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::geodesy::{distance_between, lat_lng};

    fn shape(kind: ShapeKind) -> ZoneShape {
        ZoneShape {
            center: lat_lng(59.3293, 18.0686),
            kind,
            radius_m: 500.0,
            inner_radius_m: match kind {
                ShapeKind::Keyhole => Some(50.0),
                _ => None,
            },
            bearing_deg: match kind {
                ShapeKind::Circle => None,
                _ => Some(90.0),
            },
            has_warm_zone: true,
        }
    }

    #[test]
    fn test_circle_with_warm_zone() {
        let builder = ShapeBuilder::default();
        let geom = builder.build(&shape(ShapeKind::Circle));

        match geom.hot {
            HotShape::Circle(c) => assert_eq!(c.radius_m, 500.0),
            _ => panic!("expected circle"),
        }
        assert!(geom.inner_hot.is_none());
        assert_eq!(geom.warm.map(|w| w.radius_m), Some(550.0));
    }

    #[test]
    fn test_warm_zone_omitted_when_disabled() {
        let builder = ShapeBuilder::default();
        let mut s = shape(ShapeKind::Keyhole);
        s.has_warm_zone = false;
        assert!(builder.build(&s).warm.is_none());
    }

    #[test]
    fn test_keyhole_warm_zone_anchored_to_inner_radius() {
        let builder = ShapeBuilder::default();
        for outer in [200.0, 500.0, 2000.0] {
            let mut s = shape(ShapeKind::Keyhole);
            s.radius_m = outer;
            let geom = builder.build(&s);
            assert_eq!(geom.warm.map(|w| w.radius_m), Some(100.0));
            assert_eq!(geom.inner_hot.map(|c| c.radius_m), Some(50.0));
        }
    }

    #[test]
    fn test_sector_polygon_shape() {
        let builder = ShapeBuilder::default();
        let s = shape(ShapeKind::Sector);
        let geom = builder.build(&s);

        let HotShape::Sector(poly) = &geom.hot else {
            panic!("expected sector");
        };
        let ring = &poly.exterior().0;
        // center + 12 stepped samples + end + center
        assert_eq!(ring.len(), 15);
        assert_eq!(ring.first(), Some(&s.center));
        assert_eq!(ring.last(), Some(&s.center));
        for p in &ring[1..ring.len() - 1] {
            assert!((distance_between(s.center, *p) - 500.0).abs() < 0.5);
        }
    }

    #[test]
    fn test_keyhole_spread_is_narrower() {
        let builder = ShapeBuilder::default();
        let geom = builder.build(&shape(ShapeKind::Keyhole));
        let HotShape::Sector(poly) = &geom.hot else {
            panic!("expected sector");
        };
        // center + 9 stepped samples + end + center
        assert_eq!(poly.exterior().0.len(), 12);
    }

    #[test]
    fn test_zero_arc_step_is_clamped() {
        let builder = ShapeBuilder::new(ShapeConfig {
            arc_step_deg: 0.0,
            ..Default::default()
        });
        let HotShape::Sector(poly) = builder.build(&shape(ShapeKind::Sector)).hot else {
            panic!("expected sector");
        };
        // 60° opening at 0.5° steps: center + 120 samples + end + center
        assert_eq!(poly.exterior().0.len(), 123);
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = ShapeBuilder::default();
        for kind in [ShapeKind::Circle, ShapeKind::Sector, ShapeKind::Keyhole] {
            let s = shape(kind);
            assert_eq!(builder.build(&s), builder.build(&s));
        }
    }

    #[test]
    fn test_handle_follows_bearing() {
        let builder = ShapeBuilder::default();
        let s = shape(ShapeKind::Sector);
        let geom = builder.build(&s);
        assert!(geom.handle.x > s.center.x);
        assert!((distance_between(s.center, geom.handle) - 500.0).abs() < 0.5);
        assert_eq!(geom.center(), s.center);
    }
}
