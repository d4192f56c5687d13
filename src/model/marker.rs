//! Tactical markers and the marker store.

use super::keys::{MarkerId, UnixMillis};
use geo_types::Coord;
use serde::{Deserialize, Serialize};

/// Kind of tactical point of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// Safe breakpoint for arriving units (ambulance staging).
    Breakpoint,
    /// Casualty assembly point.
    Assembly,
    /// Decontamination site.
    Decon,
    /// Rescue command.
    Command,
    /// Unclassified point.
    Generic,
    /// Incident command post.
    CommandPost,
    /// Casualty clearing station.
    CasualtyClearing,
    /// Sector boundary marker.
    Sector,
    /// Person in the water; drift-tracked from its creation time.
    ManOverboard,
}

impl MarkerKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Breakpoint => "Breakpoint",
            Self::Assembly => "Assembly point",
            Self::Decon => "Decontamination",
            Self::Command => "Rescue command",
            Self::Generic => "Marker",
            Self::CommandPost => "Command post",
            Self::CasualtyClearing => "Casualty clearing",
            Self::Sector => "Sector",
            Self::ManOverboard => "MAN OVERBOARD",
        }
    }

    /// Short label for compact display.
    pub fn short_label(&self) -> &'static str {
        match self {
            Self::Breakpoint => "BP",
            Self::Assembly => "AP",
            Self::Decon => "DC",
            Self::Command => "RC",
            Self::Generic => "PT",
            Self::CommandPost => "CP",
            Self::CasualtyClearing => "CCS",
            Self::Sector => "SEC",
            Self::ManOverboard => "MOB",
        }
    }

    /// Whether the drift estimator tracks markers of this kind.
    pub fn drifts(&self) -> bool {
        matches!(self, Self::ManOverboard)
    }

    /// Kinds an operator can place by hand.
    pub fn placeable() -> &'static [MarkerKind] {
        &[
            Self::Breakpoint,
            Self::Assembly,
            Self::Decon,
            Self::Command,
            Self::CommandPost,
            Self::CasualtyClearing,
            Self::Sector,
            Self::ManOverboard,
        ]
    }
}

/// A point of interest on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TacticalMarker {
    id: MarkerId,
    position: Coord<f64>,
    kind: MarkerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    created_at: UnixMillis,
}

impl TacticalMarker {
    pub fn id(&self) -> &MarkerId {
        &self.id
    }

    pub fn position(&self) -> Coord<f64> {
        self.position
    }

    pub fn kind(&self) -> MarkerKind {
        self.kind
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn created_at(&self) -> UnixMillis {
        self.created_at
    }

    /// Label, falling back to the kind's display name.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or_else(|| self.kind.label())
    }

    pub(crate) fn apply_patch(&mut self, patch: &MarkerPatch) {
        if let Some(label) = &patch.label {
            self.label = Some(label.clone());
        }
    }
}

/// Partial update of the mutable marker fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Collection of markers, in creation order.
#[derive(Debug, Default)]
pub struct MarkerStore {
    markers: Vec<TacticalMarker>,
    next_seq: u64,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a marker. `created_at` is the event time (for a man-overboard
    /// marker, when the person went into the water), not necessarily now.
    pub fn add(
        &mut self,
        kind: MarkerKind,
        position: Coord<f64>,
        label: Option<String>,
        created_at: UnixMillis,
        now: UnixMillis,
    ) -> &TacticalMarker {
        let id = MarkerId::generate(now, self.next_seq);
        self.next_seq += 1;
        log::info!("Added {} marker {}", kind.short_label(), id);

        self.markers.push(TacticalMarker {
            id,
            position,
            kind,
            label,
            created_at,
        });
        &self.markers[self.markers.len() - 1]
    }

    pub fn get(&self, id: &MarkerId) -> Option<&TacticalMarker> {
        self.markers.iter().find(|m| &m.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TacticalMarker> {
        self.markers.iter()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Replaces a marker's label in place. Returns `false` if it is gone.
    pub fn set_label(&mut self, id: &MarkerId, label: impl Into<String>) -> bool {
        match self.markers.iter_mut().find(|m| &m.id == id) {
            Some(marker) => {
                marker.label = Some(label.into());
                true
            }
            None => false,
        }
    }

    /// Deletes a marker. Deleting an unknown id is a no-op.
    pub fn delete(&mut self, id: &MarkerId) -> bool {
        let before = self.markers.len();
        self.markers.retain(|m| &m.id != id);
        before != self.markers.len()
    }

    pub fn clear(&mut self) {
        self.markers.clear();
    }

    /// Replaces the collection with a synced snapshot; identical snapshots
    /// are a no-op and return `false`.
    pub fn apply_snapshot(&mut self, snapshot: Vec<TacticalMarker>) -> bool {
        if snapshot == self.markers {
            return false;
        }
        log::debug!("Applying marker snapshot ({} markers)", snapshot.len());
        self.markers = snapshot;
        true
    }
}
