//! The tactical engine facade.
//!
//! `TacticalEngine` owns the zone and marker stores and every piece of
//! interaction state around them. It is the only path through which zones
//! and markers change, so displayed geometry and committed fields cannot
//! diverge.
//!
//! Geometry, resize and drift work is synchronous. Provider calls and
//! persistence are the only `async` operations. Local mutations apply
//! immediately and are queued for the shared store; `flush` writes them
//! in arrival order.

use crate::config::EngineConfig;
use crate::drift::{DriftEstimate, DriftEstimator, DriftTracker};
use crate::error::{ProviderError, SearchError, ValidationError, ZoneError};
use crate::geo::{ShapeBuilder, ZoneGeometry};
use crate::interaction::{PreviewParams, PreviewProjector, ResizeCommit, ResizeController};
use crate::model::{
    MarkerId, MarkerKind, MarkerPatch, MarkerStore, TacticalMarker, UnitId, UnixMillis,
    WindObservation, Zone, ZoneDescriptor, ZoneId, ZonePatch, ZoneStore,
};
use crate::perimeter::{NoCandidateReason, PerimeterSearch, SearchOutcome};
use crate::providers::{Geocoder, PlacesProvider, WindProvider};
use crate::storage::{KeyValueStore, MemoryStore, PendingWrite, RecordSync, StorageError};
use futures_channel::mpsc::UnboundedReceiver;
use futures_util::{FutureExt, StreamExt};
use geo_types::Coord;
use std::collections::HashMap;
use std::rc::Rc;

/// The active map tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tool {
    #[default]
    None,
    /// Place a zone using the current preview parameters.
    Zone,
    /// Place markers of one kind; stays selected for rapid placement.
    Marker(MarkerKind),
}

/// What a click placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Zone(ZoneId),
    Marker(MarkerId),
}

/// Work done by one [`TacticalEngine::tick`].
#[derive(Debug, Default)]
pub struct TickReport {
    /// Debounced resizes written to the zone model.
    pub commits: Vec<ResizeCommit>,
    /// Debounced resizes the zone model refused.
    pub rejected: Vec<ZoneError>,
    /// Fresh drift estimates for markers whose tick was due.
    pub drift: Vec<DriftEstimate>,
}

/// Result of a breakpoint generation run.
#[derive(Debug, Clone, PartialEq)]
pub enum BreakpointReport {
    Placed(Vec<MarkerId>),
    NoCandidates(NoCandidateReason),
}

/// Receivers for a unit's zone and marker snapshots.
pub struct SnapshotFeed {
    zones: UnboundedReceiver<Vec<Zone>>,
    markers: UnboundedReceiver<Vec<TacticalMarker>>,
}

impl SnapshotFeed {
    /// Drains everything queued so far without waiting, keeping only the
    /// newest snapshot of each collection.
    fn drain(&mut self) -> (Option<Vec<Zone>>, Option<Vec<TacticalMarker>>) {
        let mut zones = None;
        while let Some(Some(snapshot)) = self.zones.next().now_or_never() {
            zones = Some(snapshot);
        }
        let mut markers = None;
        while let Some(Some(snapshot)) = self.markers.next().now_or_never() {
            markers = Some(snapshot);
        }
        (zones, markers)
    }
}

pub struct TacticalEngine<S = MemoryStore> {
    config: EngineConfig,
    builder: ShapeBuilder,
    zones: ZoneStore,
    markers: MarkerStore,
    tool: Tool,
    preview: PreviewProjector,
    resizers: HashMap<ZoneId, ResizeController>,
    drift: DriftEstimator,
    drift_tracker: DriftTracker,
    drift_estimates: HashMap<MarkerId, DriftEstimate>,
    wind: Option<WindObservation>,
    search: PerimeterSearch,
    outbox: Vec<PendingWrite>,
    sync: Option<(Rc<RecordSync<S>>, UnitId)>,
}

impl TacticalEngine {
    /// A local-only engine with no shared store.
    pub fn new(config: EngineConfig) -> Self {
        Self::build(config, None)
    }
}

impl<S: KeyValueStore> TacticalEngine<S> {
    /// An engine whose mutations are written to `sync` under `unit`.
    ///
    /// Engines sharing one `RecordSync` see each other's writes through
    /// their snapshot feeds.
    pub fn with_sync(config: EngineConfig, sync: Rc<RecordSync<S>>, unit: UnitId) -> Self {
        Self::build(config, Some((sync, unit)))
    }

    fn build(config: EngineConfig, sync: Option<(Rc<RecordSync<S>>, UnitId)>) -> Self {
        let builder = ShapeBuilder::new(config.shape.clone());
        Self {
            preview: PreviewProjector::new(builder.clone(), config.preview.clone()),
            builder,
            zones: ZoneStore::new(),
            markers: MarkerStore::new(),
            tool: Tool::None,
            resizers: HashMap::new(),
            drift: DriftEstimator::new(config.drift.clone()),
            drift_tracker: DriftTracker::new(config.drift.tick_ms),
            drift_estimates: HashMap::new(),
            wind: None,
            search: PerimeterSearch::new(config.search.clone()),
            outbox: Vec::new(),
            sync,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn zones(&self) -> &ZoneStore {
        &self.zones
    }

    pub fn markers(&self) -> &MarkerStore {
        &self.markers
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn preview(&self) -> &PreviewProjector {
        &self.preview
    }

    pub fn wind(&self) -> Option<&WindObservation> {
        self.wind.as_ref()
    }

    pub fn unit(&self) -> Option<&UnitId> {
        self.sync.as_ref().map(|(_, unit)| unit)
    }

    /// Writes queued for the shared store.
    pub fn pending_writes(&self) -> &[PendingWrite] {
        &self.outbox
    }

    fn record(&mut self, write: PendingWrite) {
        if self.sync.is_some() {
            self.outbox.push(write);
        }
    }

    // --- tools and preview ---

    /// Switches the active tool. Leaving the zone tool tears the ghost
    /// down immediately.
    pub fn select_tool(&mut self, tool: Tool, now: UnixMillis) {
        if tool == self.tool {
            return;
        }
        log::debug!("Tool changed: {:?} -> {:?}", self.tool, tool);
        self.tool = tool;
        match tool {
            Tool::Zone => self.preview.activate(now),
            _ => self.preview.deactivate(),
        }
    }

    pub fn set_preview_params(&mut self, params: PreviewParams) {
        self.preview.set_params(params);
    }

    pub fn update_preview_params(&mut self, edit: impl FnOnce(&mut PreviewParams)) {
        self.preview.update_params(edit);
    }

    /// Moves the ghost to the pointer while the zone tool is active.
    pub fn pointer_moved(&mut self, pointer: Coord<f64>) -> Option<&ZoneGeometry> {
        if self.tool != Tool::Zone {
            return None;
        }
        self.preview.pointer_moved(pointer)
    }

    pub fn pointer_left(&mut self) {
        self.preview.pointer_left();
    }

    /// Ghost fill opacity at `now`.
    pub fn preview_opacity(&self, now: UnixMillis) -> f64 {
        self.preview.pulse_opacity(now)
    }

    // --- placement ---

    /// Handles a click at `at` with the active tool.
    ///
    /// Placing a zone deselects the zone tool; marker tools stay selected.
    pub fn place_at(
        &mut self,
        at: Coord<f64>,
        now: UnixMillis,
    ) -> Result<Option<Placement>, ValidationError> {
        match self.tool {
            Tool::None => Ok(None),
            Tool::Zone => {
                let Some(descriptor) = self.preview.take_placement(at) else {
                    return Ok(None);
                };
                let id = match self.create_zone(descriptor, now) {
                    Ok(id) => id,
                    Err(e) => {
                        // keep the tool armed so the operator can adjust
                        self.preview.activate(now);
                        return Err(e);
                    }
                };
                self.tool = Tool::None;
                Ok(Some(Placement::Zone(id)))
            }
            Tool::Marker(kind) => {
                let id = self.add_marker(kind, at, None, now, now);
                Ok(Some(Placement::Marker(id)))
            }
        }
    }

    /// Creates a zone directly, independent of the active tool.
    pub fn create_zone(
        &mut self,
        descriptor: ZoneDescriptor,
        now: UnixMillis,
    ) -> Result<ZoneId, ValidationError> {
        let zone = self.zones.create(descriptor, now)?.clone();
        let id = zone.id().clone();
        self.record(PendingWrite::CreateZone(zone));
        Ok(id)
    }

    /// Creates a zone from the current preview parameters at `at`.
    pub fn create_zone_at(
        &mut self,
        at: Coord<f64>,
        now: UnixMillis,
    ) -> Result<ZoneId, ValidationError> {
        let params = self.preview.params();
        let descriptor = ZoneDescriptor {
            shape: params.shape_at(at),
            description: params.description.clone(),
        };
        self.create_zone(descriptor, now)
    }

    /// Adds a marker. Drifting kinds start ticking immediately.
    pub fn add_marker(
        &mut self,
        kind: MarkerKind,
        at: Coord<f64>,
        label: Option<String>,
        created_at: UnixMillis,
        now: UnixMillis,
    ) -> MarkerId {
        let marker = self.markers.add(kind, at, label, created_at, now).clone();
        let id = marker.id().clone();
        if kind.drifts() {
            self.drift_tracker.track(id.clone(), now);
        }
        self.record(PendingWrite::CreateMarker(marker));
        id
    }

    /// Drops a man-overboard marker whose drift starts at `incident_time`.
    pub fn place_man_overboard(
        &mut self,
        at: Coord<f64>,
        incident_time: UnixMillis,
        now: UnixMillis,
    ) -> MarkerId {
        self.add_marker(MarkerKind::ManOverboard, at, None, incident_time, now)
    }

    // --- enrichment ---

    /// Attaches a reverse-geocoded address to a zone. A lookup failure
    /// attaches the placeholder instead. Returns `false` if the zone is gone.
    pub fn attach_zone_address(
        &mut self,
        id: &ZoneId,
        address: Result<String, ProviderError>,
    ) -> bool {
        let address = self.address_or_placeholder(address);
        if !self.zones.attach_address(id, address.clone()) {
            log::debug!("Zone {} vanished before its address arrived", id);
            return false;
        }
        self.record(PendingWrite::UpdateZone(
            id.clone(),
            ZonePatch {
                address: Some(address),
                ..Default::default()
            },
        ));
        true
    }

    /// Replaces a marker's label in place. Returns `false` if it is gone.
    pub fn attach_marker_label(
        &mut self,
        id: &MarkerId,
        label: Result<String, ProviderError>,
    ) -> bool {
        let label = self.address_or_placeholder(label);
        if !self.markers.set_label(id, label.clone()) {
            log::debug!("Marker {} vanished before its label arrived", id);
            return false;
        }
        self.record(PendingWrite::UpdateMarker(
            id.clone(),
            MarkerPatch { label: Some(label) },
        ));
        true
    }

    fn address_or_placeholder(&self, address: Result<String, ProviderError>) -> String {
        match address {
            Ok(address) => address,
            Err(e) => {
                log::warn!("Reverse geocoding failed: {}", e);
                self.config.address_placeholder.clone()
            }
        }
    }

    /// Looks up and attaches the address of a zone's center.
    pub async fn enrich_zone_address<G: Geocoder>(&mut self, geocoder: &G, id: &ZoneId) -> bool {
        let Some(center) = self.zones.get(id).map(Zone::center) else {
            return false;
        };
        let address = geocoder.reverse_geocode(center).await;
        self.attach_zone_address(id, address)
    }

    /// Looks up and attaches the address of a marker's position as its label.
    pub async fn enrich_marker_label<G: Geocoder>(&mut self, geocoder: &G, id: &MarkerId) -> bool {
        let Some(position) = self.markers.get(id).map(TacticalMarker::position) else {
            return false;
        };
        let label = geocoder.reverse_geocode(position).await;
        self.attach_marker_label(id, label)
    }

    // --- deletion ---

    /// Deletes a zone and discards any pending resize commit for it.
    pub fn delete_zone(&mut self, id: &ZoneId) -> bool {
        if let Some(mut resizer) = self.resizers.remove(id) {
            resizer.cancel();
        }
        let removed = self.zones.delete(id);
        self.record(PendingWrite::DeleteZone(id.clone()));
        removed
    }

    /// Deletes a marker and stops its drift tick.
    pub fn delete_marker(&mut self, id: &MarkerId) -> bool {
        self.drift_tracker.untrack(id);
        self.drift_estimates.remove(id);
        let removed = self.markers.delete(id);
        if removed {
            log::info!("Deleted marker {}", id);
        }
        self.record(PendingWrite::DeleteMarker(id.clone()));
        removed
    }

    /// Drops every zone and marker.
    pub fn clear_all(&mut self) {
        for resizer in self.resizers.values_mut() {
            resizer.cancel();
        }
        self.resizers.clear();
        self.drift_tracker.clear();
        self.drift_estimates.clear();
        self.zones.clear();
        self.markers.clear();
        self.outbox.clear();
        self.record(PendingWrite::ClearAll);
        log::info!("Cleared all zones and markers");
    }

    // --- zone edits ---

    /// Starts or resumes a resize drag on a zone's handle.
    pub fn begin_resize(&mut self, id: &ZoneId) -> Result<(), ZoneError> {
        let zone = self
            .zones
            .get(id)
            .ok_or_else(|| ZoneError::NotFound(id.clone()))?;
        let config = self.config.resize.clone();
        self.resizers
            .entry(id.clone())
            .or_insert_with(|| ResizeController::new(zone, config))
            .begin_drag();
        Ok(())
    }

    /// Updates the live radius of an in-progress drag.
    pub fn drag_resize(&mut self, id: &ZoneId, pointer: Coord<f64>) -> Option<f64> {
        self.resizers.get_mut(id)?.drag_to(pointer)
    }

    /// Ends a drag; the radius commits after the debounce window.
    pub fn end_resize(&mut self, id: &ZoneId, now: UnixMillis) {
        if let Some(resizer) = self.resizers.get_mut(id) {
            resizer.end_drag(now);
        }
    }

    /// Abandons a drag or pending commit; the zone keeps its stored radius.
    pub fn cancel_resize(&mut self, id: &ZoneId) {
        if let Some(mut resizer) = self.resizers.remove(id) {
            resizer.cancel();
        }
    }

    pub fn is_resizing(&self, id: &ZoneId) -> bool {
        self.resizers.get(id).is_some_and(ResizeController::is_active)
    }

    pub fn set_inner_radius(&mut self, id: &ZoneId, inner_radius_m: f64) -> Result<(), ZoneError> {
        self.zones.set_inner_radius(id, inner_radius_m)?;
        let stored = self.zones.get(id).and_then(Zone::inner_radius_m);
        self.record(PendingWrite::UpdateZone(
            id.clone(),
            ZonePatch {
                inner_radius_m: stored,
                ..Default::default()
            },
        ));
        Ok(())
    }

    pub fn set_bearing(&mut self, id: &ZoneId, bearing_deg: f64) -> Result<(), ZoneError> {
        self.zones.set_bearing(id, bearing_deg)?;
        let stored = self.zones.get(id).and_then(Zone::bearing_deg);
        self.record(PendingWrite::UpdateZone(
            id.clone(),
            ZonePatch {
                bearing_deg: stored,
                ..Default::default()
            },
        ));
        Ok(())
    }

    // --- time ---

    /// Advances timers: fires due resize commits and drift ticks.
    pub fn tick(&mut self, now: UnixMillis) -> TickReport {
        let mut report = TickReport::default();

        let due: Vec<ResizeCommit> = self
            .resizers
            .values_mut()
            .filter_map(|resizer| resizer.poll(now))
            .collect();
        for commit in due {
            match self.zones.resize(&commit.zone_id, commit.radius_m) {
                Ok(()) => {
                    log::info!(
                        "Zone {} resized to {:.0} m",
                        commit.zone_id,
                        commit.radius_m
                    );
                    self.record(PendingWrite::UpdateZone(
                        commit.zone_id.clone(),
                        ZonePatch {
                            radius_m: Some(commit.radius_m),
                            ..Default::default()
                        },
                    ));
                    report.commits.push(commit);
                }
                Err(e) => {
                    log::warn!("Rejected resize of zone {}: {}", commit.zone_id, e);
                    report.rejected.push(e);
                }
            }
        }
        self.resizers.retain(|_, resizer| resizer.is_active());

        for id in self.drift_tracker.due(now) {
            let Some(marker) = self.markers.get(&id) else {
                self.drift_tracker.untrack(&id);
                continue;
            };
            let estimate = self.drift.estimate(marker, self.wind.as_ref(), now);
            self.drift_estimates.insert(id, estimate.clone());
            report.drift.push(estimate);
        }

        report
    }

    // --- derived geometry ---

    /// Displayed geometry of a zone, including any live drag radius.
    pub fn zone_geometry(&self, id: &ZoneId) -> Option<ZoneGeometry> {
        let zone = self.zones.get(id)?;
        let shape = match self.resizers.get(id) {
            Some(resizer) if resizer.is_active() => {
                zone.shape().with_radius(resizer.displayed_radius())
            }
            _ => zone.shape(),
        };
        Some(self.builder.build(&shape))
    }

    /// Displayed geometry of every zone, in creation order.
    pub fn zone_geometries(&self) -> Vec<(ZoneId, ZoneGeometry)> {
        self.zones
            .iter()
            .filter_map(|z| Some((z.id().clone(), self.zone_geometry(z.id())?)))
            .collect()
    }

    /// Latest drift estimate for a man-overboard marker.
    pub fn drift_estimate(&self, id: &MarkerId) -> Option<&DriftEstimate> {
        self.drift_estimates.get(id)
    }

    // --- external collaborators ---

    /// Records a wind reading and orients the preview downwind.
    pub fn set_wind(&mut self, observation: WindObservation) {
        log::info!(
            "Wind {:.1} m/s from {:.0}°",
            observation.speed_mps,
            observation.direction_from_deg
        );
        self.wind = Some(observation);
        self.preview.update_params(|p| p.apply_wind(&observation));
    }

    /// Fetches a wind reading at `point`. No reading leaves the current
    /// wind untouched.
    pub async fn refresh_wind<W: WindProvider>(
        &mut self,
        provider: &W,
        point: Coord<f64>,
    ) -> Result<Option<WindObservation>, ProviderError> {
        let observation = provider.observe(point).await?;
        if let Some(obs) = observation {
            self.set_wind(obs);
        }
        Ok(observation)
    }

    /// Searches for breakpoints around the most recently created zone and
    /// places one breakpoint marker per candidate.
    pub async fn generate_breakpoints<P: PlacesProvider>(
        &mut self,
        places: &P,
        now: UnixMillis,
    ) -> Result<BreakpointReport, SearchError> {
        let zone = self.zones.latest().cloned().ok_or(SearchError::NoZone)?;
        let candidates = match self.search.search(places, &zone).await? {
            SearchOutcome::Found(candidates) => candidates,
            SearchOutcome::NoCandidates(reason) => {
                log::info!("No breakpoints around zone {}: {:?}", zone.id(), reason);
                return Ok(BreakpointReport::NoCandidates(reason));
            }
        };

        let ids: Vec<MarkerId> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| {
                self.add_marker(
                    MarkerKind::Breakpoint,
                    c.location,
                    Some(c.label(i)),
                    now,
                    now,
                )
            })
            .collect();
        log::info!("Placed {} breakpoints around zone {}", ids.len(), zone.id());
        Ok(BreakpointReport::Placed(ids))
    }

    // --- sync ---

    /// Applies a synced zone snapshot. Resizes of zones that vanished are
    /// cancelled; the rest compare against the synced radius from now on.
    /// Identical snapshots are a no-op.
    pub fn apply_zone_snapshot(&mut self, snapshot: Vec<Zone>) -> bool {
        if !self.zones.apply_snapshot(snapshot) {
            return false;
        }
        let zones = &self.zones;
        self.resizers.retain(|id, resizer| match zones.get(id) {
            Some(zone) => {
                resizer.set_committed_radius(zone.radius_m());
                true
            }
            None => false,
        });
        true
    }

    /// Applies a synced marker snapshot and re-aligns drift tracking.
    pub fn apply_marker_snapshot(&mut self, snapshot: Vec<TacticalMarker>, now: UnixMillis) -> bool {
        if !self.markers.apply_snapshot(snapshot) {
            return false;
        }
        let markers = &self.markers;
        let gone: Vec<MarkerId> = self
            .drift_tracker
            .tracked()
            .filter(|id| markers.get(id).is_none())
            .cloned()
            .collect();
        for id in gone {
            self.drift_tracker.untrack(&id);
            self.drift_estimates.remove(&id);
        }
        for marker in self.markers.iter().filter(|m| m.kind().drifts()) {
            self.drift_tracker.track(marker.id().clone(), now);
        }
        true
    }

    /// Subscribes to this engine's unit in the shared store.
    pub async fn subscribe(&self) -> Result<Option<SnapshotFeed>, StorageError> {
        let Some((sync, unit)) = &self.sync else {
            return Ok(None);
        };
        Ok(Some(SnapshotFeed {
            zones: sync.subscribe_zones(unit).await?,
            markers: sync.subscribe_markers(unit).await?,
        }))
    }

    /// Applies whatever snapshots have arrived on `feed`. Returns whether
    /// anything changed.
    pub fn pump(&mut self, feed: &mut SnapshotFeed, now: UnixMillis) -> bool {
        let (zones, markers) = feed.drain();
        let zones_changed = zones.is_some_and(|z| self.apply_zone_snapshot(z));
        let markers_changed = markers.is_some_and(|m| self.apply_marker_snapshot(m, now));
        zones_changed || markers_changed
    }

    /// Writes queued mutations to the shared store in arrival order.
    ///
    /// On failure the unwritten tail stays queued and local state is kept.
    pub async fn flush(&mut self) -> Result<usize, StorageError> {
        let Some((sync, unit)) = &self.sync else {
            return Ok(0);
        };
        let pending = std::mem::take(&mut self.outbox);
        for (written, write) in pending.iter().enumerate() {
            if let Err(e) = sync.apply(unit, write).await {
                log::warn!("Failed to persist change, keeping it locally: {}", e);
                let mut rest = pending[written..].to_vec();
                rest.append(&mut self.outbox);
                self.outbox = rest;
                return Err(e);
            }
        }
        Ok(pending.len())
    }
}
