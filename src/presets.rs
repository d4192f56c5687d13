//! Hazard preset catalog.
//!
//! Initial risk distances for common incident types, grouped the way
//! responders look them up: explosive threats, unknown substances, and
//! dangerous goods by class or UN number.

use crate::interaction::PreviewParams;
use crate::model::{ShapeKind, ZoneDescriptor, ZoneShape};
use geo_types::Coord;

/// One preset risk distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HazardPreset {
    pub category: &'static str,
    /// UN number or class tag for dangerous goods.
    pub un: Option<&'static str>,
    pub label: &'static str,
    pub kind: ShapeKind,
    pub radius_m: f64,
    pub inner_radius_m: Option<f64>,
    pub description: Option<&'static str>,
}

impl HazardPreset {
    const fn circle(category: &'static str, label: &'static str, radius_m: f64) -> Self {
        Self {
            category,
            un: None,
            label,
            kind: ShapeKind::Circle,
            radius_m,
            inner_radius_m: None,
            description: None,
        }
    }

    const fn keyhole(
        category: &'static str,
        label: &'static str,
        radius_m: f64,
        inner_radius_m: f64,
    ) -> Self {
        Self {
            category,
            un: None,
            label,
            kind: ShapeKind::Keyhole,
            radius_m,
            inner_radius_m: Some(inner_radius_m),
            description: None,
        }
    }

    const fn un(mut self, un: &'static str) -> Self {
        self.un = Some(un);
        self
    }

    const fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    /// Zone descriptor for this preset at `center`.
    ///
    /// `bearing_deg` orients keyhole presets downwind; circles ignore it.
    pub fn descriptor(&self, center: Coord<f64>, bearing_deg: f64) -> ZoneDescriptor {
        ZoneDescriptor {
            shape: ZoneShape {
                center,
                kind: self.kind,
                radius_m: self.radius_m,
                inner_radius_m: self.inner_radius_m,
                bearing_deg: self.kind.needs_bearing().then_some(bearing_deg),
                has_warm_zone: true,
            },
            description: Some(self.description_text()),
        }
    }

    /// Loads this preset into the placement preview. The preview keeps its
    /// bearing, and its inner radius when the preset has none.
    pub fn apply_to(&self, params: &mut PreviewParams) {
        params.kind = self.kind;
        params.radius_m = self.radius_m;
        if let Some(inner) = self.inner_radius_m {
            params.inner_radius_m = inner;
        }
        params.has_warm_zone = true;
        params.description = Some(self.description_text());
    }

    fn description_text(&self) -> String {
        match self.description {
            Some(d) => format!("{}: {}", self.label, d),
            None => self.label.to_string(),
        }
    }
}

const BOMB_URBAN: &str = "Bomb threat (urban)";
const BOMB_OPEN: &str = "Bomb threat (open terrain)";
const UNKNOWN: &str = "Unknown substance";
const FLAMMABLE_GAS: &str = "Class 2 flammable gas";
const TOXIC_GAS: &str = "Class 2 toxic gas";
const FLAMMABLE_LIQUID: &str = "Class 3 flammable liquid";
const DANGEROUS_GOODS: &str = "Dangerous goods";

static PRESETS: &[HazardPreset] = &[
    HazardPreset::circle(BOMB_URBAN, "Briefcase, parcel, grenade", 100.0),
    HazardPreset::circle(BOMB_URBAN, "Car bomb (passenger car) / suicide vest", 200.0),
    HazardPreset::circle(BOMB_URBAN, "Car bomb (van)", 400.0),
    HazardPreset::circle(BOMB_OPEN, "Briefcase, parcel, grenade", 200.0),
    HazardPreset::circle(BOMB_OPEN, "Car bomb (passenger car) / suicide vest", 400.0),
    HazardPreset::circle(BOMB_OPEN, "Car bomb (van)", 800.0),
    HazardPreset::circle(UNKNOWN, "Solid", 50.0).describe("initial risk distance"),
    HazardPreset::circle(UNKNOWN, "Liquid", 100.0).describe("from the edge of the pool"),
    HazardPreset::circle(UNKNOWN, "Gas", 300.0).describe("initial risk distance"),
    HazardPreset::circle(FLAMMABLE_GAS, "Small release (gasket leak)", 100.0),
    HazardPreset::circle(FLAMMABLE_GAS, "Large release (broken pipe)", 300.0),
    HazardPreset::circle(FLAMMABLE_GAS, "Tank rupture risk (BLEVE)", 1000.0),
    HazardPreset::circle(FLAMMABLE_GAS, "Cylinder in fire (<= 45 kg)", 300.0),
    HazardPreset::circle(FLAMMABLE_GAS, "Cylinder in fire (> 45 kg)", 500.0),
    HazardPreset::keyhole(TOXIC_GAS, "Small release (wind > 5 m/s)", 300.0, 50.0)
        .describe("300 m downwind, 50 m upwind"),
    HazardPreset::circle(TOXIC_GAS, "Small release (wind < 5 m/s)", 1000.0),
    HazardPreset::keyhole(TOXIC_GAS, "Large release (wind > 5 m/s)", 1000.0, 50.0)
        .describe("1 km downwind, 50 m upwind"),
    HazardPreset::circle(TOXIC_GAS, "Large release (wind < 2 m/s)", 2000.0),
    HazardPreset::circle(FLAMMABLE_LIQUID, "Passenger car leak (max 100 l)", 50.0),
    HazardPreset::circle(FLAMMABLE_LIQUID, "Tanker (autumn to spring)", 50.0),
    HazardPreset::circle(FLAMMABLE_LIQUID, "Tanker (summer)", 100.0),
    HazardPreset::circle(FLAMMABLE_LIQUID, "Oil depot (summer)", 300.0),
    HazardPreset::keyhole(DANGEROUS_GOODS, "UN 1005 Ammonia, anhydrous", 1000.0, 100.0)
        .un("1005"),
    HazardPreset::keyhole(DANGEROUS_GOODS, "UN 1017 Chlorine", 1000.0, 100.0).un("1017"),
    HazardPreset::keyhole(DANGEROUS_GOODS, "UN 1079 Sulphur dioxide", 1000.0, 100.0)
        .un("1079"),
    HazardPreset::circle(DANGEROUS_GOODS, "UN 1075 Petroleum gases (LPG)", 300.0).un("1075"),
    HazardPreset::circle(DANGEROUS_GOODS, "UN 1203 Petrol", 100.0).un("1203"),
    HazardPreset::circle(DANGEROUS_GOODS, "UN 1202 Diesel", 100.0).un("1202"),
    HazardPreset::circle(DANGEROUS_GOODS, "UN 1942 Ammonium nitrate", 300.0).un("1942"),
    HazardPreset::circle(DANGEROUS_GOODS, "UN 1830 Sulphuric acid", 100.0).un("1830"),
    HazardPreset::circle(DANGEROUS_GOODS, "UN 3480 Lithium-ion batteries", 50.0).un("3480"),
];

/// The full preset catalog, in display order.
pub fn all() -> &'static [HazardPreset] {
    PRESETS
}

/// Presets in one category.
pub fn by_category(category: &str) -> impl Iterator<Item = &'static HazardPreset> + '_ {
    PRESETS.iter().filter(move |p| p.category == category)
}

/// Case-insensitive search over labels and UN numbers.
pub fn search(query: &str) -> Vec<&'static HazardPreset> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    PRESETS
        .iter()
        .filter(|p| p.label.to_lowercase().contains(&query) || p.un.is_some_and(|un| un == query))
        .collect()
}

/// Distinct categories, in display order.
pub fn categories() -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::new();
    for preset in PRESETS {
        if !out.contains(&preset.category) {
            out.push(preset.category);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::lat_lng;

    #[test]
    fn test_keyhole_presets_are_valid_zones() {
        for preset in all() {
            let desc = preset.descriptor(lat_lng(59.33, 18.07), 90.0);
            assert!(desc.shape.validated().is_ok(), "{}", preset.label);
        }
    }

    #[test]
    fn test_descriptor_orients_keyhole_only() {
        let chlorine = search("1017")[0];
        let desc = chlorine.descriptor(lat_lng(59.33, 18.07), 135.0);
        assert_eq!(desc.shape.kind, ShapeKind::Keyhole);
        assert_eq!(desc.shape.bearing_deg, Some(135.0));
        assert_eq!(desc.shape.inner_radius_m, Some(100.0));

        let petrol = search("petrol")[0];
        assert_eq!(petrol.descriptor(lat_lng(0.0, 0.0), 135.0).shape.bearing_deg, None);
    }

    #[test]
    fn test_apply_to_preview_keeps_bearing() {
        let mut params = PreviewParams {
            bearing_deg: 45.0,
            ..PreviewParams::default()
        };
        search("1005")[0].apply_to(&mut params);
        assert_eq!(params.kind, ShapeKind::Keyhole);
        assert_eq!(params.radius_m, 1000.0);
        assert_eq!(params.inner_radius_m, 100.0);
        assert_eq!(params.bearing_deg, 45.0);
        assert_eq!(params.description.as_deref(), Some("UN 1005 Ammonia, anhydrous"));

        let shape = params.shape_at(lat_lng(59.33, 18.07));
        assert!(shape.validated().is_ok());
    }

    #[test]
    fn test_categories_and_search() {
        assert_eq!(categories()[0], BOMB_URBAN);
        assert_eq!(by_category(TOXIC_GAS).count(), 4);
        assert!(search("  ").is_empty());
        assert_eq!(search("BLEVE").len(), 1);
    }
}
