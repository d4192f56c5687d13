//! Side panel UI: tools, zone parameters, presets and incident actions.

use super::colors;
use eframe::egui::{self, RichText};
use tactimap::drift::incident_time_from_clock;
use tactimap::geo::cardinal_direction;
use tactimap::model::{MarkerKind, ShapeKind, UnixMillis};
use tactimap::presets;
use tactimap::{TacticalEngine, Tool};

/// Panel-only state that is not part of the engine.
pub struct PanelState {
    pub preset_category: &'static str,
    pub preset_query: String,
    /// Whether MOB markers use the entered clock time instead of "now".
    pub use_incident_time: bool,
    pub incident_hour: u32,
    pub incident_minute: u32,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            preset_category: presets::categories().first().copied().unwrap_or_default(),
            preset_query: String::new(),
            use_incident_time: false,
            incident_hour: 0,
            incident_minute: 0,
        }
    }
}

impl PanelState {
    /// When a man-overboard marker placed now should start drifting.
    pub fn incident_time(&self, now: UnixMillis) -> UnixMillis {
        if !self.use_incident_time {
            return now;
        }
        incident_time_from_clock(
            self.incident_hour,
            self.incident_minute,
            &chrono::Local::now(),
        )
        .unwrap_or(now)
    }
}

/// Panel actions that need the app's collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    FetchWind,
    GenerateBreakpoints,
    ClearAll,
    ResetView,
}

pub fn render_side_panel(
    ctx: &egui::Context,
    engine: &mut TacticalEngine,
    panel: &mut PanelState,
    now: UnixMillis,
) -> Option<PanelAction> {
    let mut action = None;

    egui::SidePanel::left("side_panel")
        .resizable(true)
        .default_width(270.0)
        .min_width(220.0)
        .max_width(400.0)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                render_tools(ui, engine, now);
                ui.add_space(8.0);
                render_zone_params(ui, engine);
                ui.add_space(8.0);
                render_presets(ui, engine, panel, now);
                ui.add_space(8.0);
                render_markers(ui, engine, panel, now);
                ui.add_space(8.0);
                render_incident(ui, engine, &mut action);
                ui.add_space(8.0);
                render_zone_list(ui, engine);
            });
        });

    action
}

fn render_tools(ui: &mut egui::Ui, engine: &mut TacticalEngine, now: UnixMillis) {
    ui.heading("Tools");
    ui.separator();

    ui.horizontal(|ui| {
        let tool = engine.tool();
        if ui.selectable_label(tool == Tool::None, "Pan").clicked() {
            engine.select_tool(Tool::None, now);
        }
        if ui.selectable_label(tool == Tool::Zone, "Place zone").clicked() {
            engine.select_tool(Tool::Zone, now);
        }
    });
    ui.label(
        RichText::new("Drag a handle to resize, right click to delete")
            .small()
            .color(colors::ui::LABEL),
    );
}

fn render_zone_params(ui: &mut egui::Ui, engine: &mut TacticalEngine) {
    ui.heading("Zone");
    ui.separator();

    let mut params = engine.preview().params().clone();

    egui::ComboBox::from_label("Shape")
        .selected_text(params.kind.label())
        .show_ui(ui, |ui| {
            for kind in ShapeKind::all() {
                ui.selectable_value(&mut params.kind, *kind, kind.label());
            }
        });

    ui.add(
        egui::Slider::new(&mut params.radius_m, 10.0..=3000.0)
            .logarithmic(true)
            .suffix(" m")
            .text("Radius"),
    );

    ui.add_enabled(
        params.kind == ShapeKind::Keyhole,
        egui::Slider::new(&mut params.inner_radius_m, 10.0..=500.0)
            .suffix(" m")
            .text("Inner radius"),
    );

    ui.add_enabled_ui(params.kind.needs_bearing(), |ui| {
        ui.horizontal(|ui| {
            ui.add(
                egui::Slider::new(&mut params.bearing_deg, 0.0..=359.0)
                    .suffix("°")
                    .text("Bearing"),
            );
            ui.label(
                RichText::new(cardinal_direction(params.bearing_deg))
                    .monospace()
                    .color(colors::ui::VALUE),
            );
        });
    });

    ui.checkbox(&mut params.has_warm_zone, "Warm zone");

    if let Some(description) = params.description.clone() {
        ui.horizontal(|ui| {
            ui.label(RichText::new(description).small().color(colors::ui::VALUE));
            if ui.small_button("🗑").clicked() {
                params.description = None;
            }
        });
    }

    if params != *engine.preview().params() {
        engine.set_preview_params(params);
    }
}

fn render_presets(
    ui: &mut egui::Ui,
    engine: &mut TacticalEngine,
    panel: &mut PanelState,
    now: UnixMillis,
) {
    ui.heading("Presets");
    ui.separator();

    ui.add(
        egui::TextEdit::singleline(&mut panel.preset_query).hint_text("Search label or UN number"),
    );

    let listed: Vec<&'static presets::HazardPreset> = if panel.preset_query.trim().is_empty() {
        egui::ComboBox::from_id_salt("preset_category")
            .selected_text(panel.preset_category)
            .width(230.0)
            .show_ui(ui, |ui| {
                for category in presets::categories() {
                    ui.selectable_value(&mut panel.preset_category, category, category);
                }
            });
        presets::by_category(panel.preset_category).collect()
    } else {
        presets::search(&panel.preset_query)
    };

    if listed.is_empty() {
        ui.label(RichText::new("No matching presets").small().color(colors::ui::LABEL));
    }

    for preset in listed {
        let text = match preset.inner_radius_m {
            Some(inner) => format!("{} ({:.0}/{:.0} m)", preset.label, preset.radius_m, inner),
            None => format!("{} ({:.0} m)", preset.label, preset.radius_m),
        };
        if ui.button(text).clicked() {
            engine.update_preview_params(|p| preset.apply_to(p));
            engine.select_tool(Tool::Zone, now);
        }
    }
}

fn render_markers(
    ui: &mut egui::Ui,
    engine: &mut TacticalEngine,
    panel: &mut PanelState,
    now: UnixMillis,
) {
    ui.heading("Markers");
    ui.separator();

    let tool = engine.tool();
    ui.horizontal_wrapped(|ui| {
        for kind in MarkerKind::placeable() {
            let selected = tool == Tool::Marker(*kind);
            let text = RichText::new(kind.label()).color(colors::markers::fill(*kind));
            if ui.selectable_label(selected, text).clicked() {
                engine.select_tool(Tool::Marker(*kind), now);
            }
        }
    });

    ui.add_space(4.0);
    ui.horizontal(|ui| {
        ui.checkbox(&mut panel.use_incident_time, "Overboard at");
        ui.add_enabled_ui(panel.use_incident_time, |ui| {
            ui.add(egui::DragValue::new(&mut panel.incident_hour).range(0..=23));
            ui.label(":");
            ui.add(egui::DragValue::new(&mut panel.incident_minute).range(0..=59));
        });
    });
}

fn render_incident(ui: &mut egui::Ui, engine: &TacticalEngine, action: &mut Option<PanelAction>) {
    ui.heading("Incident");
    ui.separator();

    match engine.wind() {
        Some(wind) => {
            ui.label(
                RichText::new(format!(
                    "Wind {:.1} m/s from {:.0}° ({})",
                    wind.speed_mps,
                    wind.direction_from_deg,
                    cardinal_direction(wind.direction_from_deg)
                ))
                .color(colors::ui::VALUE),
            );
        }
        None => {
            ui.label(RichText::new("No wind reading").color(colors::ui::LABEL));
        }
    }

    ui.horizontal_wrapped(|ui| {
        if ui.button("Fetch wind").clicked() {
            *action = Some(PanelAction::FetchWind);
        }
        if ui
            .add_enabled(!engine.zones().is_empty(), egui::Button::new("Find breakpoints"))
            .clicked()
        {
            *action = Some(PanelAction::GenerateBreakpoints);
        }
        if ui.button("Reset view").clicked() {
            *action = Some(PanelAction::ResetView);
        }
        if ui.button("Clear all").clicked() {
            *action = Some(PanelAction::ClearAll);
        }
    });
}

fn render_zone_list(ui: &mut egui::Ui, engine: &mut TacticalEngine) {
    ui.heading(format!("Zones ({})", engine.zones().len()));
    ui.separator();

    let mut delete = None;
    for zone in engine.zones().iter() {
        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new(zone.kind().label()).strong());
                ui.label(
                    RichText::new(format!("{:.0} m", zone.radius_m()))
                        .monospace()
                        .color(colors::ui::VALUE),
                );
                if engine.is_resizing(zone.id()) {
                    ui.label(RichText::new("resizing").small().color(colors::ui::ACTIVE));
                }
                if ui.small_button("🗑").clicked() {
                    delete = Some(zone.id().clone());
                }
            });
            if let Some(address) = zone.address() {
                ui.label(RichText::new(address).small());
            }
            if let Some(description) = zone.description() {
                ui.label(RichText::new(description).small().color(colors::ui::LABEL));
            }
        });
    }
    if let Some(id) = delete {
        engine.delete_zone(&id);
    }

    ui.label(
        RichText::new(format!("{} marker(s)", engine.markers().len())).color(colors::ui::LABEL),
    );
}
