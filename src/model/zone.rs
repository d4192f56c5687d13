//! Hazard zones and the zone store.
//!
//! The store is the only place zone fields change. A zone's center and
//! creation time are fixed once created; radius, inner radius and bearing
//! change through validated store operations, and address metadata is
//! filled in asynchronously after creation.

use super::keys::{UnixMillis, ZoneId};
use crate::error::{ValidationError, ZoneError};
use crate::geo::normalize_bearing;
use geo_types::Coord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Geometric family of a zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    /// Omnidirectional blast or spill perimeter.
    #[default]
    Circle,
    /// Downwind plume wedge.
    Sector,
    /// Near-field circle around the source plus a downwind wedge.
    Keyhole,
}

impl ShapeKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Circle => "Circle",
            Self::Sector => "Sector",
            Self::Keyhole => "Keyhole",
        }
    }

    /// Whether this kind is oriented by a bearing.
    pub fn needs_bearing(&self) -> bool {
        matches!(self, Self::Sector | Self::Keyhole)
    }

    pub fn all() -> &'static [ShapeKind] {
        &[Self::Circle, Self::Sector, Self::Keyhole]
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label().to_lowercase())
    }
}

/// The geometric fields the shape builder works from.
///
/// Used both for committed zones and for provisional preview shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneShape {
    pub center: Coord<f64>,
    pub kind: ShapeKind,
    pub radius_m: f64,
    pub inner_radius_m: Option<f64>,
    pub bearing_deg: Option<f64>,
    pub has_warm_zone: bool,
}

impl ZoneShape {
    /// Same shape with a different outer radius.
    pub fn with_radius(mut self, radius_m: f64) -> Self {
        self.radius_m = radius_m;
        self
    }

    /// Checks the zone invariants, returning a normalized copy.
    ///
    /// Circles drop any inner radius and bearing; bearings are wrapped into
    /// `[0, 360)`.
    pub fn validated(self) -> Result<Self, ValidationError> {
        check_radius("radius", self.radius_m)?;

        let bearing_deg = match (self.kind.needs_bearing(), self.bearing_deg) {
            (false, _) => None,
            (true, None) => return Err(ValidationError::MissingBearing(self.kind)),
            (true, Some(b)) if !b.is_finite() => {
                return Err(ValidationError::NonFinite { field: "bearing" })
            }
            (true, Some(b)) => Some(normalize_bearing(b)),
        };

        let inner_radius_m = match (self.kind, self.inner_radius_m) {
            (ShapeKind::Keyhole, None) => return Err(ValidationError::MissingInnerRadius),
            (ShapeKind::Keyhole, Some(inner)) => {
                check_radius("inner radius", inner)?;
                if inner > self.radius_m {
                    return Err(ValidationError::InnerExceedsOuter {
                        inner,
                        outer: self.radius_m,
                    });
                }
                Some(inner)
            }
            _ => None,
        };

        if !self.center.x.is_finite() || !self.center.y.is_finite() {
            return Err(ValidationError::NonFinite { field: "center" });
        }

        Ok(Self {
            bearing_deg,
            inner_radius_m,
            ..self
        })
    }
}

fn check_radius(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite { field });
    }
    if value < 0.0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(())
}

/// Everything needed to create a zone.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneDescriptor {
    pub shape: ZoneShape,
    pub description: Option<String>,
}

impl From<ZoneShape> for ZoneDescriptor {
    fn from(shape: ZoneShape) -> Self {
        Self {
            shape,
            description: None,
        }
    }
}

/// A committed hazard perimeter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    id: ZoneId,
    center: Coord<f64>,
    kind: ShapeKind,
    radius_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inner_radius_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bearing_deg: Option<f64>,
    #[serde(default)]
    has_warm_zone: bool,
    created_at: UnixMillis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl Zone {
    pub fn id(&self) -> &ZoneId {
        &self.id
    }

    pub fn center(&self) -> Coord<f64> {
        self.center
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    pub fn inner_radius_m(&self) -> Option<f64> {
        self.inner_radius_m
    }

    pub fn bearing_deg(&self) -> Option<f64> {
        self.bearing_deg
    }

    pub fn has_warm_zone(&self) -> bool {
        self.has_warm_zone
    }

    pub fn created_at(&self) -> UnixMillis {
        self.created_at
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The canonical geometric fields of this zone.
    pub fn shape(&self) -> ZoneShape {
        ZoneShape {
            center: self.center,
            kind: self.kind,
            radius_m: self.radius_m,
            inner_radius_m: self.inner_radius_m,
            bearing_deg: self.bearing_deg,
            has_warm_zone: self.has_warm_zone,
        }
    }

    /// Applies a partial update (last write wins).
    ///
    /// The patched shape must still satisfy the zone invariants; on error
    /// the zone is left unchanged.
    pub(crate) fn apply_patch(&mut self, patch: &ZonePatch) -> Result<(), ValidationError> {
        let shape = ZoneShape {
            radius_m: patch.radius_m.unwrap_or(self.radius_m),
            inner_radius_m: patch.inner_radius_m.or(self.inner_radius_m),
            bearing_deg: patch.bearing_deg.or(self.bearing_deg),
            ..self.shape()
        }
        .validated()?;
        self.set_shape(&shape);
        if let Some(address) = &patch.address {
            self.address = Some(address.clone());
        }
        Ok(())
    }

    /// Normalizes a zone that arrived from outside the store.
    fn checked(mut self) -> Result<Self, ValidationError> {
        let shape = self.shape().validated()?;
        self.set_shape(&shape);
        Ok(self)
    }

    fn set_shape(&mut self, shape: &ZoneShape) {
        self.radius_m = shape.radius_m;
        self.inner_radius_m = shape.inner_radius_m;
        self.bearing_deg = shape.bearing_deg;
    }
}

/// Partial update of the mutable zone fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZonePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_radius_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearing_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Authoritative collection of zones, in creation order.
#[derive(Debug, Default)]
pub struct ZoneStore {
    zones: Vec<Zone>,
    next_seq: u64,
}

impl ZoneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a descriptor and creates a zone from it.
    pub fn create(
        &mut self,
        descriptor: ZoneDescriptor,
        now: UnixMillis,
    ) -> Result<&Zone, ValidationError> {
        let shape = descriptor.shape.validated()?;
        let id = ZoneId::generate(now, self.next_seq);
        self.next_seq += 1;

        log::info!(
            "Created {} zone {} ({:.0} m)",
            shape.kind,
            id,
            shape.radius_m
        );

        self.zones.push(Zone {
            id,
            center: shape.center,
            kind: shape.kind,
            radius_m: shape.radius_m,
            inner_radius_m: shape.inner_radius_m,
            bearing_deg: shape.bearing_deg,
            has_warm_zone: shape.has_warm_zone,
            created_at: now,
            address: None,
            description: descriptor.description,
        });
        Ok(&self.zones[self.zones.len() - 1])
    }

    pub fn get(&self, id: &ZoneId) -> Option<&Zone> {
        self.zones.iter().find(|z| &z.id == id)
    }

    fn get_mut(&mut self, id: &ZoneId) -> Option<&mut Zone> {
        self.zones.iter_mut().find(|z| &z.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Most recently created zone.
    pub fn latest(&self) -> Option<&Zone> {
        self.zones
            .iter()
            .enumerate()
            .max_by_key(|(idx, z)| (z.created_at, *idx))
            .map(|(_, z)| z)
    }

    /// Sets the outer radius. Rejected if the zone is gone or the new
    /// radius breaks an invariant; the stored zone is unchanged on error.
    pub fn resize(&mut self, id: &ZoneId, radius_m: f64) -> Result<(), ZoneError> {
        self.mutate(id, |shape| shape.with_radius(radius_m))
    }

    /// Sets the inner (source) radius of a keyhole zone.
    pub fn set_inner_radius(&mut self, id: &ZoneId, inner_radius_m: f64) -> Result<(), ZoneError> {
        let zone = self
            .get(id)
            .ok_or_else(|| ZoneError::NotFound(id.clone()))?;
        if zone.kind != ShapeKind::Keyhole {
            return Err(ValidationError::NotKeyhole(zone.kind).into());
        }
        self.mutate(id, |shape| ZoneShape {
            inner_radius_m: Some(inner_radius_m),
            ..shape
        })
    }

    /// Sets the plume bearing of a sector or keyhole zone.
    pub fn set_bearing(&mut self, id: &ZoneId, bearing_deg: f64) -> Result<(), ZoneError> {
        let zone = self
            .get(id)
            .ok_or_else(|| ZoneError::NotFound(id.clone()))?;
        if !zone.kind.needs_bearing() {
            return Err(ValidationError::BearingOnCircle.into());
        }
        self.mutate(id, |shape| ZoneShape {
            bearing_deg: Some(bearing_deg),
            ..shape
        })
    }

    fn mutate(
        &mut self,
        id: &ZoneId,
        change: impl FnOnce(ZoneShape) -> ZoneShape,
    ) -> Result<(), ZoneError> {
        let zone = self
            .get_mut(id)
            .ok_or_else(|| ZoneError::NotFound(id.clone()))?;
        let shape = change(zone.shape()).validated()?;
        zone.set_shape(&shape);
        Ok(())
    }

    /// Attaches a looked-up address. Returns `false` if the zone is gone.
    pub fn attach_address(&mut self, id: &ZoneId, address: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(zone) => {
                zone.address = Some(address.into());
                true
            }
            None => false,
        }
    }

    /// Deletes a zone. Deleting an unknown id is a no-op.
    ///
    /// Returns whether a zone was removed.
    pub fn delete(&mut self, id: &ZoneId) -> bool {
        let before = self.zones.len();
        self.zones.retain(|z| &z.id != id);
        let removed = self.zones.len() != before;
        if removed {
            log::info!("Deleted zone {}", id);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.zones.clear();
    }

    /// Replaces the collection with a synced snapshot.
    ///
    /// Zones that break an invariant are dropped. Returns `false` (and
    /// changes nothing) when the snapshot matches the current state.
    pub fn apply_snapshot(&mut self, snapshot: Vec<Zone>) -> bool {
        let snapshot: Vec<Zone> = snapshot
            .into_iter()
            .filter_map(|zone| {
                let id = zone.id.clone();
                zone.checked()
                    .map_err(|e| log::warn!("Dropped invalid zone {} from snapshot: {}", id, e))
                    .ok()
            })
            .collect();
        if snapshot == self.zones {
            return false;
        }
        log::debug!("Applying zone snapshot ({} zones)", snapshot.len());
        self.zones = snapshot;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::lat_lng;

    fn keyhole(radius_m: f64, inner: f64) -> ZoneDescriptor {
        ZoneShape {
            center: lat_lng(59.3293, 18.0686),
            kind: ShapeKind::Keyhole,
            radius_m,
            inner_radius_m: Some(inner),
            bearing_deg: Some(45.0),
            has_warm_zone: true,
        }
        .into()
    }

    fn circle(radius_m: f64) -> ZoneDescriptor {
        ZoneShape {
            center: lat_lng(59.3293, 18.0686),
            kind: ShapeKind::Circle,
            radius_m,
            inner_radius_m: Some(10.0),
            bearing_deg: Some(10.0),
            has_warm_zone: false,
        }
        .into()
    }

    #[test]
    fn test_create_normalizes_circle() {
        let mut store = ZoneStore::new();
        let zone = store.create(circle(100.0), UnixMillis(1)).unwrap();
        assert_eq!(zone.inner_radius_m(), None);
        assert_eq!(zone.bearing_deg(), None);
        assert_eq!(zone.address(), None);
    }

    #[test]
    fn test_create_rejects_missing_bearing() {
        let mut store = ZoneStore::new();
        let mut desc = keyhole(500.0, 50.0);
        desc.shape.bearing_deg = None;
        assert_eq!(
            store.create(desc, UnixMillis(1)).unwrap_err(),
            ValidationError::MissingBearing(ShapeKind::Keyhole)
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_create_rejects_inner_exceeding_outer() {
        let mut store = ZoneStore::new();
        assert!(matches!(
            store.create(keyhole(40.0, 50.0), UnixMillis(1)),
            Err(ValidationError::InnerExceedsOuter { .. })
        ));
    }

    #[test]
    fn test_create_rejects_negative_radius() {
        let mut store = ZoneStore::new();
        assert!(matches!(
            store.create(circle(-1.0), UnixMillis(1)),
            Err(ValidationError::Negative { .. })
        ));
    }

    #[test]
    fn test_create_wraps_bearing() {
        let mut store = ZoneStore::new();
        let mut desc = keyhole(500.0, 50.0);
        desc.shape.bearing_deg = Some(370.0);
        let zone = store.create(desc, UnixMillis(1)).unwrap();
        assert!((zone.bearing_deg().unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_resize_below_inner_radius_is_rejected() {
        let mut store = ZoneStore::new();
        let id = store
            .create(keyhole(500.0, 50.0), UnixMillis(1))
            .unwrap()
            .id()
            .clone();

        let err = store.resize(&id, 30.0).unwrap_err();
        assert!(matches!(
            err,
            ZoneError::Validation(ValidationError::InnerExceedsOuter { .. })
        ));
        assert_eq!(store.get(&id).unwrap().radius_m(), 500.0);
    }

    #[test]
    fn test_set_inner_radius_above_outer_is_rejected() {
        let mut store = ZoneStore::new();
        let id = store
            .create(keyhole(500.0, 50.0), UnixMillis(1))
            .unwrap()
            .id()
            .clone();

        assert!(store.set_inner_radius(&id, 600.0).is_err());
        assert_eq!(store.get(&id).unwrap().inner_radius_m(), Some(50.0));
        store.set_inner_radius(&id, 120.0).unwrap();
        assert_eq!(store.get(&id).unwrap().inner_radius_m(), Some(120.0));
    }

    #[test]
    fn test_set_inner_radius_on_circle_is_rejected() {
        let mut store = ZoneStore::new();
        let id = store
            .create(circle(100.0), UnixMillis(1))
            .unwrap()
            .id()
            .clone();
        assert_eq!(
            store.set_inner_radius(&id, 10.0).unwrap_err(),
            ZoneError::Validation(ValidationError::NotKeyhole(ShapeKind::Circle))
        );
    }

    #[test]
    fn test_resize_missing_zone_is_not_found() {
        let mut store = ZoneStore::new();
        let missing = ZoneId::new("gone");
        assert_eq!(
            store.resize(&missing, 10.0).unwrap_err(),
            ZoneError::NotFound(missing)
        );
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut store = ZoneStore::new();
        let id = store
            .create(circle(100.0), UnixMillis(1))
            .unwrap()
            .id()
            .clone();
        store.create(circle(200.0), UnixMillis(2)).unwrap();

        assert!(store.delete(&id));
        let after_first: Vec<Zone> = store.iter().cloned().collect();
        assert!(!store.delete(&id));
        let after_second: Vec<Zone> = store.iter().cloned().collect();
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn test_attach_address_to_missing_zone_is_noop() {
        let mut store = ZoneStore::new();
        assert!(!store.attach_address(&ZoneId::new("gone"), "Drottninggatan 1"));
    }

    #[test]
    fn test_latest_zone() {
        let mut store = ZoneStore::new();
        store.create(circle(100.0), UnixMillis(5)).unwrap();
        let id = store
            .create(circle(200.0), UnixMillis(5))
            .unwrap()
            .id()
            .clone();
        assert_eq!(store.latest().unwrap().id(), &id);
    }

    #[test]
    fn test_identical_snapshot_is_noop() {
        let mut store = ZoneStore::new();
        store.create(circle(100.0), UnixMillis(1)).unwrap();
        let snapshot: Vec<Zone> = store.iter().cloned().collect();
        assert!(!store.apply_snapshot(snapshot.clone()));
        assert!(store.apply_snapshot(Vec::new()));
        assert!(store.apply_snapshot(snapshot));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_patch_breaking_keyhole_is_rejected() {
        let mut store = ZoneStore::new();
        let mut zone = store
            .create(keyhole(300.0, 100.0), UnixMillis(1))
            .unwrap()
            .clone();

        let shrink = ZonePatch {
            radius_m: Some(150.0),
            ..Default::default()
        };
        zone.apply_patch(&shrink).unwrap();

        let widen_inner = ZonePatch {
            inner_radius_m: Some(200.0),
            address: Some("Slussen".into()),
            ..Default::default()
        };
        assert!(matches!(
            zone.apply_patch(&widen_inner),
            Err(ValidationError::InnerExceedsOuter { .. })
        ));
        assert_eq!(zone.radius_m(), 150.0);
        assert_eq!(zone.inner_radius_m(), Some(100.0));
        assert_eq!(zone.address(), None);
    }

    #[test]
    fn test_snapshot_drops_invalid_zones() {
        let mut store = ZoneStore::new();
        store.create(circle(100.0), UnixMillis(1)).unwrap();
        let mut snapshot: Vec<Zone> = store.iter().cloned().collect();
        let broken: Zone = serde_json::from_str(
            r#"{"id":"bad","center":{"x":18.0686,"y":59.3293},"kind":"keyhole","radius_m":-5.0,"created_at":0}"#,
        )
        .unwrap();
        snapshot.push(broken);

        let mut other = ZoneStore::new();
        assert!(other.apply_snapshot(snapshot));
        assert_eq!(other.len(), 1);
        assert!(other.get(&ZoneId::new("bad")).is_none());
    }

    #[test]
    fn test_zone_serde_round_trip_keeps_fields() {
        let mut store = ZoneStore::new();
        let zone = store
            .create(keyhole(500.0, 50.0), UnixMillis(42))
            .unwrap()
            .clone();
        let json = serde_json::to_string(&zone).unwrap();
        assert!(json.contains("\"kind\":\"keyhole\""));
        let back: Zone = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), zone.id());
        assert_eq!(back.kind(), ShapeKind::Keyhole);
        assert_eq!(back.radius_m(), 500.0);
        assert_eq!(back.inner_radius_m(), Some(50.0));
        assert_eq!(back.created_at(), UnixMillis(42));
    }
}
