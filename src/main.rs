#![warn(clippy::all)]

//! Tactimap workbench - an interactive map for the tactical zone engine.
//!
//! Places hazard zones with a live ghost preview, resizes them by dragging
//! their handle, drops markers (including drifting man-overboard markers)
//! and searches for breakpoints outside a zone's perimeter. Places, wind
//! and addresses come from an offline Stockholm gazetteer.

mod demo;
mod ui;

use demo::{DemoGeocoder, DemoPlaces, DemoWind};
use eframe::egui;
use futures_executor::block_on;
use std::rc::Rc;
use std::time::Duration;
use tactimap::model::{MarkerKind, UnitId, UnixMillis};
use tactimap::storage::{MemoryStore, RecordSync};
use tactimap::{BreakpointReport, EngineConfig, Placement, SnapshotFeed, TacticalEngine, Tool};
use ui::{Hit, MapEvent, MapState, PanelAction, PanelState, Status};

/// Environment variable naming an optional JSON engine config.
const CONFIG_ENV: &str = "TACTIMAP_CONFIG";

/// Frame interval while idle; keeps the ghost pulse and drift moving.
const REPAINT_INTERVAL: Duration = Duration::from_millis(100);

fn main() -> eframe::Result<()> {
    env_logger::init();

    let native_options = eframe::NativeOptions::default();

    eframe::run_native(
        "Tactimap",
        native_options,
        Box::new(|cc| Ok(Box::new(TactimapApp::new(cc)))),
    )
}

/// Main application state and logic.
pub struct TactimapApp {
    engine: TacticalEngine,

    /// Snapshot pushes from the shared record store
    feed: Option<SnapshotFeed>,

    map: MapState,
    panel: PanelState,
    status: Status,

    places: DemoPlaces,
    geocoder: DemoGeocoder,
    wind: DemoWind,
}

impl TactimapApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let config = match std::env::var(CONFIG_ENV) {
            Ok(path) => EngineConfig::load(path),
            Err(_) => EngineConfig::default(),
        };

        let sync = Rc::new(RecordSync::new(MemoryStore::new()));
        let engine = TacticalEngine::with_sync(config, sync, UnitId::new("demo"));

        let feed = match block_on(engine.subscribe()) {
            Ok(feed) => feed,
            Err(e) => {
                log::error!("Failed to subscribe to unit records: {}", e);
                None
            }
        };

        Self {
            engine,
            feed,
            map: MapState::default(),
            panel: PanelState::default(),
            status: Status::info("Select a tool to start"),
            places: DemoPlaces::default(),
            geocoder: DemoGeocoder::default(),
            wind: DemoWind::default(),
        }
    }

    /// Advances debounced resizes and drift ticks.
    fn tick(&mut self, now: UnixMillis) {
        let report = self.engine.tick(now);
        for commit in &report.commits {
            self.status = Status::info(format!("Zone resized to {:.0} m", commit.radius_m));
        }
        if let Some(e) = report.rejected.last() {
            self.status = Status::error(format!("Resize rejected: {}", e));
        }

        if let Some(feed) = self.feed.as_mut() {
            if self.engine.pump(feed, now) {
                log::debug!("Applied pushed snapshot");
            }
        }
    }

    fn handle_map_event(&mut self, event: MapEvent, now: UnixMillis) {
        match event {
            MapEvent::Place(at) => {
                if self.engine.tool() == Tool::Marker(MarkerKind::ManOverboard) {
                    let incident = self.panel.incident_time(now);
                    let id = self.engine.place_man_overboard(at, incident, now);
                    block_on(self.engine.enrich_marker_label(&self.geocoder, &id));
                    self.status = Status::info("Man overboard marked, tracking drift");
                    return;
                }

                match self.engine.place_at(at, now) {
                    Ok(Some(Placement::Zone(id))) => {
                        block_on(self.engine.enrich_zone_address(&self.geocoder, &id));
                        let address = self
                            .engine
                            .zones()
                            .get(&id)
                            .and_then(|z| z.address())
                            .unwrap_or_default()
                            .to_string();
                        self.status = Status::success(format!("Zone placed at {}", address));
                    }
                    Ok(Some(Placement::Marker(_))) => {
                        self.status = Status::info("Marker placed");
                    }
                    Ok(None) => {}
                    Err(e) => self.status = Status::error(format!("Cannot place zone: {}", e)),
                }
            }
            MapEvent::Delete(Hit::Zone(id)) => {
                if self.engine.delete_zone(&id) {
                    self.status = Status::info("Zone deleted");
                }
            }
            MapEvent::Delete(Hit::Marker(id)) => {
                if self.engine.delete_marker(&id) {
                    self.status = Status::info("Marker deleted");
                }
            }
        }
    }

    fn handle_panel_action(&mut self, action: PanelAction, now: UnixMillis) {
        match action {
            PanelAction::FetchWind => {
                let at = self
                    .engine
                    .zones()
                    .latest()
                    .map(|z| z.center())
                    .unwrap_or_else(|| self.map.view_center());
                self.status = match block_on(self.engine.refresh_wind(&self.wind, at)) {
                    Ok(Some(_)) => Status::success("Wind updated, preview oriented downwind"),
                    Ok(None) => Status::info("No fresh wind reading"),
                    Err(e) => {
                        log::error!("Wind lookup failed: {}", e);
                        Status::error(format!("Wind lookup failed: {}", e))
                    }
                };
            }
            PanelAction::GenerateBreakpoints => {
                self.status = match block_on(self.engine.generate_breakpoints(&self.places, now)) {
                    Ok(BreakpointReport::Placed(ids)) => {
                        Status::success(format!("Placed {} breakpoint(s)", ids.len()))
                    }
                    Ok(BreakpointReport::NoCandidates(reason)) => {
                        Status::info(format!("No breakpoints found ({:?})", reason))
                    }
                    Err(e) => {
                        log::error!("Breakpoint search failed: {}", e);
                        Status::error(format!("Breakpoint search failed: {}", e))
                    }
                };
            }
            PanelAction::ClearAll => {
                self.engine.clear_all();
                self.status = Status::info("Cleared all zones and markers");
            }
            PanelAction::ResetView => self.map.reset_view(),
        }
    }

    /// Writes queued changes to the record store.
    fn flush(&mut self) {
        if self.engine.pending_writes().is_empty() {
            return;
        }
        if let Err(e) = block_on(self.engine.flush()) {
            self.status = Status::error(format!("Changes kept locally: {}", e));
        }
    }
}

impl eframe::App for TactimapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = UnixMillis::now();
        self.tick(now);

        ui::render_top_bar(ctx, &self.engine, &self.status);

        if let Some(action) = ui::render_side_panel(ctx, &mut self.engine, &mut self.panel, now) {
            self.handle_panel_action(action, now);
        }

        if let Some(event) = ui::render_map(ctx, &mut self.engine, &mut self.map, now) {
            self.handle_map_event(event, now);
        }

        self.flush();

        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}
