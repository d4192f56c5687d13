//! Central canvas UI: the tactical map.
//!
//! Draws the engine's geometry values (zones, ghost preview, markers and
//! drift) through [`MapProjection`], and turns pointer input into engine
//! calls. Placement and deletion are reported back as [`MapEvent`]s since
//! they involve the offline collaborators owned by the app.

use super::colors;
use super::projection::MapProjection;
use eframe::egui::{
    self, Align2, Color32, FontId, Painter, PointerButton, Pos2, Rect, Sense, Shape, Stroke, Vec2,
};
use geo_types::Coord;
use tactimap::geo::{
    bearing_between, cardinal_direction, distance_between, CircleShape, HotShape, ZoneGeometry,
};
use tactimap::model::{MarkerId, UnixMillis, ZoneId};
use tactimap::{TacticalEngine, Tool};

/// Pointer distance in pixels that still grabs a resize handle or marker.
const HIT_RADIUS_PX: f32 = 10.0;

/// Marker dot radius in pixels.
const MARKER_RADIUS_PX: f32 = 7.0;

/// View state of the map canvas.
#[derive(Default)]
pub struct MapState {
    pub projection: MapProjection,
    /// Zone whose handle is being dragged.
    resizing: Option<ZoneId>,
    /// A resize was abandoned mid-drag; the rest of the drag does nothing.
    drag_cancelled: bool,
    /// Geographic position under the pointer, if any.
    cursor: Option<Coord<f64>>,
}

impl MapState {
    pub fn reset_view(&mut self) {
        self.projection.zoom = 1.0;
        self.projection.pan_offset = Vec2::ZERO;
    }

    /// Geographic point under the middle of the canvas.
    pub fn view_center(&self) -> Coord<f64> {
        self.projection.view_center()
    }
}

/// Something on the map under the pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hit {
    Zone(ZoneId),
    Marker(MarkerId),
}

/// Input the app has to act on.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// Primary click with the active tool.
    Place(Coord<f64>),
    /// Secondary click on a zone or marker.
    Delete(Hit),
}

pub fn render_map(
    ctx: &egui::Context,
    engine: &mut TacticalEngine,
    map: &mut MapState,
    now: UnixMillis,
) -> Option<MapEvent> {
    let mut event = None;

    egui::CentralPanel::default()
        .frame(egui::Frame::NONE)
        .show(ctx, |ui| {
            let available_size = ui.available_size();
            let (response, painter) = ui.allocate_painter(available_size, Sense::click_and_drag());
            let rect = response.rect;

            let zoom = map.projection.zoom;
            let pan_offset = map.projection.pan_offset;
            map.projection.update(zoom, pan_offset, rect);

            event = handle_map_interaction(&response, engine, map, now);

            painter.rect_filled(rect, 0.0, colors::canvas::BACKGROUND);
            render_grid(&painter, &map.projection);
            render_zones(&painter, engine, map);
            render_ghost(&painter, engine, &map.projection, now);
            render_markers(&painter, engine, &map.projection);
            render_scale_bar(&painter, &map.projection, rect);
            render_north_arrow(&painter, rect);
            draw_overlay_info(&painter, rect, engine, map);
        });

    event
}

fn handle_map_interaction(
    response: &egui::Response,
    engine: &mut TacticalEngine,
    map: &mut MapState,
    now: UnixMillis,
) -> Option<MapEvent> {
    map.cursor = response.hover_pos().map(|p| map.projection.screen_to_geo(p));
    match map.cursor {
        Some(geo) if engine.tool() == Tool::Zone && map.resizing.is_none() => {
            engine.pointer_moved(geo);
        }
        _ => engine.pointer_left(),
    }

    // Grabbing a handle resizes; grabbing anywhere else pans.
    if response.drag_started_by(PointerButton::Primary) {
        if let Some(pos) = response.interact_pointer_pos() {
            if let Some(id) = handle_at(engine, &map.projection, pos) {
                match engine.begin_resize(&id) {
                    Ok(()) => map.resizing = Some(id),
                    Err(e) => log::warn!("Cannot resize: {}", e),
                }
            }
        }
    }

    if let Some(id) = map.resizing.clone() {
        let escape = response.ctx.input(|i| i.key_pressed(egui::Key::Escape));
        if resize_abandoned(response.rect, response.interact_pointer_pos(), escape) {
            engine.cancel_resize(&id);
            map.resizing = None;
            map.drag_cancelled = true;
        }
    }

    if response.dragged_by(PointerButton::Primary) && !map.drag_cancelled {
        match (&map.resizing, response.interact_pointer_pos()) {
            (Some(id), Some(pos)) => {
                let geo = map.projection.screen_to_geo(pos);
                engine.drag_resize(id, geo);
            }
            (None, _) => map.projection.pan_offset += response.drag_delta(),
            _ => {}
        }
    }

    if response.drag_stopped() {
        if let Some(id) = map.resizing.take() {
            engine.end_resize(&id, now);
        }
        map.drag_cancelled = false;
    }

    // Scroll zooms relative to the cursor position
    if response.hovered() {
        let scroll_delta = response.ctx.input(|i| i.raw_scroll_delta);
        if scroll_delta.y != 0.0 {
            let zoom_factor = 1.0 + scroll_delta.y * 0.001;
            let old_zoom = map.projection.zoom;
            let new_zoom = (old_zoom * zoom_factor).clamp(0.1, 20.0);

            if let Some(cursor_pos) = response.hover_pos() {
                let cursor_rel = cursor_pos - response.rect.center();
                let ratio = new_zoom / old_zoom;
                map.projection.pan_offset =
                    cursor_rel * (1.0 - ratio) + map.projection.pan_offset * ratio;
            }

            map.projection.zoom = new_zoom;
        }
    }

    if response.clicked() {
        return response
            .interact_pointer_pos()
            .map(|pos| MapEvent::Place(map.projection.screen_to_geo(pos)));
    }

    if response.secondary_clicked() {
        return response
            .interact_pointer_pos()
            .and_then(|pos| hit_test(engine, &map.projection, pos))
            .map(MapEvent::Delete);
    }

    None
}

/// Whether an in-progress resize drag should be dropped: the pointer left
/// the canvas or Escape was pressed.
fn resize_abandoned(canvas: Rect, pointer: Option<Pos2>, escape: bool) -> bool {
    escape || pointer.is_some_and(|p| !canvas.contains(p))
}

/// Zone whose resize handle is under `pos`.
fn handle_at(engine: &TacticalEngine, projection: &MapProjection, pos: Pos2) -> Option<ZoneId> {
    engine
        .zone_geometries()
        .into_iter()
        .map(|(id, geometry)| (id, projection.geo_to_screen(geometry.handle).distance(pos)))
        .filter(|(_, d)| *d <= HIT_RADIUS_PX)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

/// Topmost marker under `pos`, else the smallest zone containing it.
fn hit_test(engine: &TacticalEngine, projection: &MapProjection, pos: Pos2) -> Option<Hit> {
    let marker = engine
        .markers()
        .iter()
        .filter(|m| projection.geo_to_screen(m.position()).distance(pos) <= HIT_RADIUS_PX)
        .last()
        .map(|m| Hit::Marker(m.id().clone()));
    if marker.is_some() {
        return marker;
    }

    let geo = projection.screen_to_geo(pos);
    engine
        .zones()
        .iter()
        .filter(|z| distance_between(z.center(), geo) <= z.radius_m())
        .min_by(|a, b| a.radius_m().total_cmp(&b.radius_m()))
        .map(|z| Hit::Zone(z.id().clone()))
}

fn render_grid(painter: &Painter, projection: &MapProjection) {
    let (min_lon, min_lat, max_lon, max_lat) = projection.visible_bounds();
    let step = grid_step_deg(max_lat - min_lat);
    let stroke = Stroke::new(0.5, colors::canvas::grid());
    let rect = projection.screen_rect;

    let mut lat = (min_lat / step).floor() * step;
    while lat <= max_lat {
        let y = projection.geo_to_screen(Coord { x: min_lon, y: lat }).y;
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        lat += step;
    }

    let mut lon = (min_lon / step).floor() * step;
    while lon <= max_lon {
        let x = projection.geo_to_screen(Coord { x: lon, y: min_lat }).x;
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        lon += step;
    }
}

/// Grid spacing giving roughly eight lines across `span_deg`.
fn grid_step_deg(span_deg: f64) -> f64 {
    const STEPS: [f64; 6] = [0.001, 0.002, 0.005, 0.01, 0.02, 0.05];
    STEPS
        .iter()
        .copied()
        .find(|s| span_deg / s <= 10.0)
        .unwrap_or(0.1)
}

fn render_zones(painter: &Painter, engine: &TacticalEngine, map: &MapState) {
    for (id, geometry) in engine.zone_geometries() {
        let handle_color = if map.resizing.as_ref() == Some(&id) {
            colors::zones::HANDLE_ACTIVE
        } else {
            colors::zones::HANDLE
        };
        render_geometry(painter, &map.projection, &geometry, 1.0);
        render_handle(painter, &map.projection, geometry.handle, handle_color);

        let Some(zone) = engine.zones().get(&id) else {
            continue;
        };
        let label = zone
            .address()
            .or(zone.description())
            .unwrap_or(zone.kind().label());
        let center = map.projection.geo_to_screen(geometry.center());
        painter.text(
            center + Vec2::new(0.0, 8.0),
            Align2::CENTER_TOP,
            format!("{}\n{:.0} m", label, displayed_radius_m(&geometry)),
            FontId::proportional(11.0),
            colors::zones::LABEL,
        );
    }
}

/// Outer radius as drawn; the handle sits on the outer edge and follows
/// the pointer mid-drag.
fn displayed_radius_m(geometry: &ZoneGeometry) -> f64 {
    match &geometry.hot {
        HotShape::Circle(c) => c.radius_m,
        HotShape::Sector(_) => distance_between(geometry.center(), geometry.handle),
    }
}

fn render_ghost(painter: &Painter, engine: &TacticalEngine, projection: &MapProjection, now: UnixMillis) {
    if let Some(ghost) = engine.preview().ghost() {
        // pulse opacity is tuned for fills; outlines get the same ratio
        let opacity = (engine.preview_opacity(now) * 2.0) as f32;
        render_geometry(painter, projection, ghost, opacity.clamp(0.0, 1.0));
    }
}

/// Renders one zone's warm, hot and inner-hot primitives, back to front.
fn render_geometry(painter: &Painter, projection: &MapProjection, geometry: &ZoneGeometry, opacity: f32) {
    let hot_fill = colors::zones::hot_fill().gamma_multiply(opacity);
    let hot_stroke = Stroke::new(2.0, colors::zones::HOT_STROKE.gamma_multiply(opacity));

    if let Some(warm) = &geometry.warm {
        render_circle(
            painter,
            projection,
            warm,
            colors::zones::warm_fill().gamma_multiply(opacity),
            Stroke::new(1.5, colors::zones::WARM_STROKE.gamma_multiply(opacity)),
        );
    }

    match &geometry.hot {
        HotShape::Circle(circle) => render_circle(painter, projection, circle, hot_fill, hot_stroke),
        HotShape::Sector(polygon) => {
            let mut points: Vec<Pos2> = polygon
                .exterior()
                .coords()
                .map(|c| projection.geo_to_screen(*c))
                .collect();
            // the exterior ring repeats its first vertex
            if points.len() > 1 && points.first() == points.last() {
                points.pop();
            }
            if points.len() >= 3 {
                painter.add(Shape::convex_polygon(points, hot_fill, hot_stroke));
            }
        }
    }

    if let Some(inner) = &geometry.inner_hot {
        render_circle(painter, projection, inner, hot_fill, hot_stroke);
    }
}

fn render_circle(
    painter: &Painter,
    projection: &MapProjection,
    circle: &CircleShape,
    fill: Color32,
    stroke: Stroke,
) {
    let center = projection.geo_to_screen(circle.center);
    let radius = projection.radius_px(circle.center, circle.radius_m);
    painter.circle_filled(center, radius, fill);
    painter.circle_stroke(center, radius, stroke);
}

fn render_handle(painter: &Painter, projection: &MapProjection, handle: Coord<f64>, color: Color32) {
    let pos = projection.geo_to_screen(handle);
    painter.circle_filled(pos, 5.0, color);
    painter.circle_stroke(pos, 5.0, Stroke::new(1.0, colors::zones::HOT_STROKE));
}

fn render_markers(painter: &Painter, engine: &TacticalEngine, projection: &MapProjection) {
    for marker in engine.markers().iter() {
        if let Some(estimate) = engine.drift_estimate(marker.id()) {
            let origin = projection.geo_to_screen(estimate.origin);
            let drifted = projection.geo_to_screen(estimate.position);
            let stroke = Stroke::new(1.5, colors::markers::DRIFT);
            painter.line_segment([origin, drifted], stroke);
            render_circle(
                painter,
                projection,
                &estimate.search_area(),
                colors::markers::DRIFT.gamma_multiply(0.15),
                stroke,
            );
            painter.circle_filled(drifted, 4.0, colors::markers::DRIFT);

            let heading = if estimate.direction_known {
                cardinal_direction(estimate.bearing_deg)
            } else {
                "?"
            };
            painter.text(
                drifted + Vec2::new(6.0, 6.0),
                Align2::LEFT_TOP,
                format!(
                    "{:.0} m {} in {:.0} min",
                    estimate.drift_distance_m(),
                    heading,
                    estimate.elapsed_s / 60.0
                ),
                FontId::monospace(10.0),
                colors::markers::DRIFT,
            );
        }

        let pos = projection.geo_to_screen(marker.position());
        painter.circle_filled(pos, MARKER_RADIUS_PX, colors::markers::fill(marker.kind()));
        painter.circle_stroke(pos, MARKER_RADIUS_PX, Stroke::new(1.0, Color32::WHITE));
        painter.text(
            pos,
            Align2::CENTER_CENTER,
            marker.kind().short_label(),
            FontId::proportional(7.0),
            Color32::BLACK,
        );
        painter.text(
            pos + Vec2::new(MARKER_RADIUS_PX + 3.0, 0.0),
            Align2::LEFT_CENTER,
            marker.display_label(),
            FontId::proportional(11.0),
            colors::markers::LABEL,
        );
    }
}

fn render_scale_bar(painter: &Painter, projection: &MapProjection, rect: Rect) {
    let meters_per_px = projection.meters_per_px();
    if meters_per_px <= 0.0 {
        return;
    }
    let Some(meters) = scale_bar_length_m(meters_per_px, 120.0) else {
        return;
    };
    let width = (meters / meters_per_px) as f32;
    let start = rect.left_bottom() + Vec2::new(16.0, -20.0);
    let end = start + Vec2::new(width, 0.0);
    let stroke = Stroke::new(2.0, colors::canvas::SCALE);

    painter.line_segment([start, end], stroke);
    painter.line_segment([start, start - Vec2::new(0.0, 5.0)], stroke);
    painter.line_segment([end, end - Vec2::new(0.0, 5.0)], stroke);
    let label = if meters >= 1000.0 {
        format!("{} km", meters / 1000.0)
    } else {
        format!("{meters} m")
    };
    painter.text(
        start - Vec2::new(0.0, 8.0),
        Align2::LEFT_BOTTOM,
        label,
        FontId::monospace(11.0),
        colors::canvas::SCALE,
    );
}

/// Longest round length that fits in `max_px` pixels.
fn scale_bar_length_m(meters_per_px: f64, max_px: f64) -> Option<f64> {
    const LENGTHS: [f64; 10] = [
        10.0, 20.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0,
    ];
    LENGTHS
        .iter()
        .rev()
        .copied()
        .find(|m| m / meters_per_px <= max_px)
}

fn render_north_arrow(painter: &Painter, rect: Rect) {
    let tip = rect.right_top() + Vec2::new(-24.0, 16.0);
    let base = tip + Vec2::new(0.0, 22.0);
    painter.add(Shape::convex_polygon(
        vec![tip, base + Vec2::new(6.0, 0.0), base - Vec2::new(6.0, 0.0)],
        colors::canvas::CARDINAL,
        Stroke::NONE,
    ));
    painter.text(
        base + Vec2::new(0.0, 4.0),
        Align2::CENTER_TOP,
        "N",
        FontId::proportional(12.0),
        colors::canvas::CARDINAL,
    );
}

fn draw_overlay_info(painter: &Painter, rect: Rect, engine: &TacticalEngine, map: &MapState) {
    let mut lines = Vec::new();
    if let Some(cursor) = map.cursor {
        lines.push(format!("{:.5}, {:.5}", cursor.y, cursor.x));
        if let Some(zone) = engine.zones().latest() {
            let bearing = bearing_between(zone.center(), cursor);
            lines.push(format!(
                "{:.0} m {} of zone ({:.0}°)",
                distance_between(zone.center(), cursor),
                cardinal_direction(bearing),
                bearing
            ));
        }
    }
    lines.push(format!("Zoom: {:.1}x", map.projection.zoom));
    let tool = match engine.tool() {
        Tool::None => "Pan".to_string(),
        Tool::Zone => format!("Place {}", engine.preview().params().kind.label().to_lowercase()),
        Tool::Marker(kind) => format!("Place {}", kind.label().to_lowercase()),
    };
    lines.push(tool);

    painter.text(
        rect.left_top() + Vec2::new(10.0, 10.0),
        Align2::LEFT_TOP,
        lines.join("\n"),
        FontId::monospace(12.0),
        Color32::from_rgb(200, 200, 220),
    );
}
