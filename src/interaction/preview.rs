//! Ghost preview of a zone before it is placed.
//!
//! While the zone tool is active, every pointer move rebuilds the preview
//! geometry at the pointer using the same [`ShapeBuilder`] as committed
//! zones. The ghost is a value; nothing here touches the zone store.

use crate::geo::{ShapeBuilder, ZoneGeometry};
use crate::model::{ShapeKind, UnixMillis, WindObservation, ZoneDescriptor, ZoneShape};
use geo_types::Coord;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Cosmetic pulse applied to the ghost fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub base_opacity: f64,
    pub opacity_amplitude: f64,
    pub pulse_period_ms: i64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            base_opacity: 0.25,
            opacity_amplitude: 0.1,
            pulse_period_ms: 1_500,
        }
    }
}

/// The zone parameters the operator has dialled in for the next placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewParams {
    pub kind: ShapeKind,
    pub radius_m: f64,
    pub inner_radius_m: f64,
    /// Downwind bearing the plume travels toward.
    pub bearing_deg: f64,
    pub has_warm_zone: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for PreviewParams {
    fn default() -> Self {
        Self {
            kind: ShapeKind::Circle,
            radius_m: 100.0,
            inner_radius_m: 50.0,
            bearing_deg: 0.0,
            has_warm_zone: true,
            description: None,
        }
    }
}

impl PreviewParams {
    /// The shape these parameters describe, centered at `center`.
    pub fn shape_at(&self, center: Coord<f64>) -> ZoneShape {
        ZoneShape {
            center,
            kind: self.kind,
            radius_m: self.radius_m,
            inner_radius_m: (self.kind == ShapeKind::Keyhole).then_some(self.inner_radius_m),
            bearing_deg: self.kind.needs_bearing().then_some(self.bearing_deg),
            has_warm_zone: self.has_warm_zone,
        }
    }

    /// Orients the plume downwind of a fresh wind reading.
    ///
    /// A wind reading implies a plume scenario, so a circle switches to a
    /// keyhole.
    pub fn apply_wind(&mut self, wind: &WindObservation) {
        self.bearing_deg = wind.downwind_bearing();
        if self.kind == ShapeKind::Circle {
            self.kind = ShapeKind::Keyhole;
        }
    }
}

/// Produces provisional geometry that follows the pointer.
#[derive(Debug, Clone, Default)]
pub struct PreviewProjector {
    builder: ShapeBuilder,
    config: PreviewConfig,
    params: PreviewParams,
    active_since: Option<UnixMillis>,
    pointer: Option<Coord<f64>>,
    ghost: Option<ZoneGeometry>,
}

impl PreviewProjector {
    pub fn new(builder: ShapeBuilder, config: PreviewConfig) -> Self {
        Self {
            builder,
            config,
            ..Default::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.active_since.is_some()
    }

    pub fn params(&self) -> &PreviewParams {
        &self.params
    }

    /// Replaces the preview parameters and rebuilds at the last pointer.
    pub fn set_params(&mut self, params: PreviewParams) {
        self.params = params;
        self.rebuild();
    }

    /// Edits the parameters in place and rebuilds at the last pointer.
    pub fn update_params(&mut self, edit: impl FnOnce(&mut PreviewParams)) {
        edit(&mut self.params);
        self.rebuild();
    }

    /// Starts following the pointer (zone tool selected).
    pub fn activate(&mut self, now: UnixMillis) {
        if self.active_since.is_none() {
            self.active_since = Some(now);
        }
    }

    /// Tears the ghost down immediately (tool deselected or placed).
    pub fn deactivate(&mut self) {
        self.active_since = None;
        self.pointer = None;
        self.ghost = None;
    }

    /// Rebuilds the ghost at a new pointer location.
    ///
    /// Returns `None` while the projector is inactive.
    pub fn pointer_moved(&mut self, pointer: Coord<f64>) -> Option<&ZoneGeometry> {
        if !self.is_active() {
            return None;
        }
        self.pointer = Some(pointer);
        self.rebuild();
        self.ghost.as_ref()
    }

    /// The pointer left the map surface.
    pub fn pointer_left(&mut self) {
        self.pointer = None;
        self.ghost = None;
    }

    pub fn ghost(&self) -> Option<&ZoneGeometry> {
        self.ghost.as_ref()
    }

    fn rebuild(&mut self) {
        self.ghost = match (self.is_active(), self.pointer) {
            (true, Some(pointer)) => Some(self.builder.build(&self.params.shape_at(pointer))),
            _ => None,
        };
    }

    /// Fill opacity of the ghost at `now`: `base ± amplitude` on a sine.
    pub fn pulse_opacity(&self, now: UnixMillis) -> f64 {
        let Some(since) = self.active_since else {
            return self.config.base_opacity;
        };
        let period = self.config.pulse_period_ms.max(1) as f64;
        let phase = (now.0 - since.0) as f64 / period;
        self.config.base_opacity + self.config.opacity_amplitude * (phase * TAU).sin()
    }

    /// Snapshots the current parameters into a zone descriptor at `at` and
    /// clears the ghost. Returns `None` if the projector is inactive.
    pub fn take_placement(&mut self, at: Coord<f64>) -> Option<ZoneDescriptor> {
        if !self.is_active() {
            return None;
        }
        let descriptor = ZoneDescriptor {
            shape: self.params.shape_at(at),
            description: self.params.description.clone(),
        };
        self.deactivate();
        Some(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{lat_lng, HotShape};

    #[test]
    fn test_inactive_projector_has_no_ghost() {
        let mut proj = PreviewProjector::default();
        assert!(proj.pointer_moved(lat_lng(59.0, 18.0)).is_none());
        assert!(proj.take_placement(lat_lng(59.0, 18.0)).is_none());
    }

    #[test]
    fn test_ghost_follows_pointer() {
        let mut proj = PreviewProjector::default();
        proj.activate(UnixMillis(0));

        let a = lat_lng(59.0, 18.0);
        let b = lat_lng(59.1, 18.1);
        assert_eq!(proj.pointer_moved(a).map(|g| g.center()), Some(a));
        assert_eq!(proj.pointer_moved(b).map(|g| g.center()), Some(b));
    }

    #[test]
    fn test_param_change_rebuilds_at_last_pointer() {
        let mut proj = PreviewProjector::default();
        proj.activate(UnixMillis(0));
        proj.pointer_moved(lat_lng(59.0, 18.0));

        proj.update_params(|p| {
            p.kind = ShapeKind::Keyhole;
            p.radius_m = 800.0;
        });
        let ghost = proj.ghost().unwrap();
        assert!(matches!(ghost.hot, HotShape::Sector(_)));
        assert_eq!(ghost.inner_hot.map(|c| c.radius_m), Some(50.0));
        assert_eq!(ghost.warm.map(|c| c.radius_m), Some(100.0));
    }

    #[test]
    fn test_deactivate_tears_down_ghost() {
        let mut proj = PreviewProjector::default();
        proj.activate(UnixMillis(0));
        proj.pointer_moved(lat_lng(59.0, 18.0));
        proj.deactivate();
        assert!(proj.ghost().is_none());
        assert!(proj.pointer_moved(lat_lng(59.0, 18.0)).is_none());
    }

    #[test]
    fn test_take_placement_snapshots_params() {
        let mut proj = PreviewProjector::default();
        proj.set_params(PreviewParams {
            kind: ShapeKind::Sector,
            radius_m: 300.0,
            bearing_deg: 135.0,
            ..Default::default()
        });
        proj.activate(UnixMillis(0));
        proj.pointer_moved(lat_lng(59.0, 18.0));

        let at = lat_lng(59.2, 18.2);
        let desc = proj.take_placement(at).unwrap();
        assert_eq!(desc.shape.center, at);
        assert_eq!(desc.shape.bearing_deg, Some(135.0));
        assert_eq!(desc.shape.inner_radius_m, None);
        assert!(!proj.is_active());
        assert!(proj.ghost().is_none());
    }

    #[test]
    fn test_pulse_stays_within_amplitude() {
        let mut proj = PreviewProjector::default();
        proj.activate(UnixMillis(0));
        for ms in (0..3_000).step_by(37) {
            let o = proj.pulse_opacity(UnixMillis(ms));
            assert!((0.15 - 1e-9..=0.35 + 1e-9).contains(&o));
        }
        assert!((proj.pulse_opacity(UnixMillis(375)) - 0.35).abs() < 1e-9);
    }

    #[test]
    fn test_apply_wind_points_downwind() {
        let mut params = PreviewParams::default();
        params.apply_wind(&WindObservation::new(6.0, 225.0, UnixMillis(0)));
        assert_eq!(params.bearing_deg, 45.0);
        assert_eq!(params.kind, ShapeKind::Keyhole);
    }
}
