//! Interactive resize controller.
//!
//! One controller exists per zone. Pointer drags update a live radius that
//! only affects the displayed geometry; the committed zone is written once,
//! after a trailing debounce window following the end of the drag.
//!
//! ```text
//! Idle --begin_drag--> Dragging --end_drag--> Committing --poll(deadline)--> Idle
//!                         ^                        |
//!                         +-------begin_drag-------+
//! ```
//!
//! Cancelling from any state returns to `Idle` and discards the live radius.

use crate::geo::distance_between;
use crate::model::{UnixMillis, Zone, ZoneId};
use geo_types::Coord;
use serde::{Deserialize, Serialize};

/// Tunables for interactive resizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeConfig {
    /// Trailing debounce window after a drag ends.
    pub debounce_ms: i64,
    /// Radius changes at or below this are treated as no change.
    pub epsilon_m: f64,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 400,
            epsilon_m: 0.1,
        }
    }
}

/// Current phase of a resize interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizePhase {
    Idle,
    Dragging,
    /// Drag ended; the live radius is written once `deadline` passes.
    Committing { deadline: UnixMillis },
}

/// A radius write the controller wants applied to the zone model.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeCommit {
    pub zone_id: ZoneId,
    pub radius_m: f64,
}

/// Per-zone resize state machine.
#[derive(Debug, Clone)]
pub struct ResizeController {
    zone_id: ZoneId,
    center: Coord<f64>,
    committed_radius_m: f64,
    live_radius_m: Option<f64>,
    phase: ResizePhase,
    config: ResizeConfig,
}

impl ResizeController {
    pub fn new(zone: &Zone, config: ResizeConfig) -> Self {
        Self {
            zone_id: zone.id().clone(),
            center: zone.center(),
            committed_radius_m: zone.radius_m(),
            live_radius_m: None,
            phase: ResizePhase::Idle,
            config,
        }
    }

    pub fn zone_id(&self) -> &ZoneId {
        &self.zone_id
    }

    pub fn phase(&self) -> ResizePhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != ResizePhase::Idle
    }

    /// Radius the renderer should show right now.
    pub fn displayed_radius(&self) -> f64 {
        match self.phase {
            ResizePhase::Idle => self.committed_radius_m,
            _ => self.live_radius_m.unwrap_or(self.committed_radius_m),
        }
    }

    /// Starts (or resumes) a drag.
    ///
    /// Resuming from `Committing` drops the pending deadline, so quick
    /// successive adjustments collapse into a single commit.
    pub fn begin_drag(&mut self) {
        if self.phase == ResizePhase::Idle {
            self.live_radius_m = Some(self.committed_radius_m);
        }
        self.phase = ResizePhase::Dragging;
    }

    /// Updates the live radius from the pointer position.
    ///
    /// Ignored unless a drag is in progress. Returns the new live radius.
    pub fn drag_to(&mut self, pointer: Coord<f64>) -> Option<f64> {
        if self.phase != ResizePhase::Dragging {
            return None;
        }
        let radius = distance_between(self.center, pointer);
        self.live_radius_m = Some(radius);
        Some(radius)
    }

    /// Ends the drag and arms the trailing debounce window.
    pub fn end_drag(&mut self, now: UnixMillis) {
        if self.phase != ResizePhase::Dragging {
            return;
        }
        self.phase = ResizePhase::Committing {
            deadline: now.plus_millis(self.config.debounce_ms),
        };
    }

    /// Aborts the interaction without writing anything.
    pub fn cancel(&mut self) {
        if self.is_active() {
            log::debug!("Resize of zone {} cancelled", self.zone_id);
        }
        self.phase = ResizePhase::Idle;
        self.live_radius_m = None;
    }

    /// Fires the debounce timer if its deadline has passed.
    ///
    /// Returns a commit only when the live radius differs from the committed
    /// radius by more than the configured epsilon.
    pub fn poll(&mut self, now: UnixMillis) -> Option<ResizeCommit> {
        let ResizePhase::Committing { deadline } = self.phase else {
            return None;
        };
        if now < deadline {
            return None;
        }

        self.phase = ResizePhase::Idle;
        let live = self.live_radius_m.take()?;
        if (live - self.committed_radius_m).abs() <= self.config.epsilon_m {
            log::debug!("Resize of zone {} was a no-op", self.zone_id);
            return None;
        }

        Some(ResizeCommit {
            zone_id: self.zone_id.clone(),
            radius_m: live,
        })
    }

    /// Records the radius the zone model now holds.
    pub fn set_committed_radius(&mut self, radius_m: f64) {
        self.committed_radius_m = radius_m;
    }
}
