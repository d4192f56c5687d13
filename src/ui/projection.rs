//! Map projection and coordinate transformation.
//!
//! Converts between geographic coordinates (lat/lon) and screen positions
//! on the map canvas. Geometry from the engine arrives in meters and
//! degrees; everything pixel-related stays in this module.

use eframe::egui::{Pos2, Rect, Vec2};
use geo_types::Coord;
use tactimap::geo::destination_point;

/// Map projection for converting geographic to screen coordinates.
#[derive(Debug, Clone)]
pub struct MapProjection {
    /// Center latitude of the view
    pub center_lat: f64,
    /// Center longitude of the view
    pub center_lon: f64,
    /// Visible half-span in degrees of latitude at zoom 1.0
    pub range_deg: f64,
    /// Current zoom level
    pub zoom: f32,
    /// Pan offset in screen pixels
    pub pan_offset: Vec2,
    /// Screen rectangle for the canvas
    pub screen_rect: Rect,
}

impl Default for MapProjection {
    fn default() -> Self {
        Self {
            // Central Stockholm
            center_lat: 59.3293,
            center_lon: 18.0686,
            // ~2.2 km half-span, enough for the largest presets
            range_deg: 0.02,
            zoom: 1.0,
            pan_offset: Vec2::ZERO,
            screen_rect: Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0)),
        }
    }
}

impl MapProjection {
    /// Updates the projection with current view state.
    pub fn update(&mut self, zoom: f32, pan_offset: Vec2, screen_rect: Rect) {
        self.zoom = zoom;
        self.pan_offset = pan_offset;
        self.screen_rect = screen_rect;
    }

    /// Geographic point under the middle of the canvas.
    pub fn view_center(&self) -> Coord<f64> {
        self.screen_to_geo(self.screen_rect.center())
    }

    /// Converts geographic coordinates (lon, lat) to screen position.
    ///
    /// Equirectangular with a cosine correction at the view latitude, which
    /// is accurate to well under a pixel over a few kilometres.
    pub fn geo_to_screen(&self, coord: Coord<f64>) -> Pos2 {
        let effective_range = self.range_deg / self.zoom as f64;

        let rel_lon = coord.x - self.center_lon;
        let rel_lat = coord.y - self.center_lat;

        let lat_correction = self.center_lat.to_radians().cos();
        let corrected_lon = rel_lon * lat_correction;

        let norm_x = corrected_lon / effective_range;
        let norm_y = -rel_lat / effective_range; // screen Y increases downward

        let center = self.screen_rect.center() + self.pan_offset;
        let half_size = self.screen_rect.size().min_elem() / 2.0;

        Pos2::new(
            center.x + (norm_x as f32) * half_size,
            center.y + (norm_y as f32) * half_size,
        )
    }

    /// Converts screen position to geographic coordinates (lon, lat).
    pub fn screen_to_geo(&self, pos: Pos2) -> Coord<f64> {
        let effective_range = self.range_deg / self.zoom as f64;

        let center = self.screen_rect.center() + self.pan_offset;
        let half_size = self.screen_rect.size().min_elem() / 2.0;

        let norm_x = (pos.x - center.x) / half_size;
        let norm_y = (pos.y - center.y) / half_size;

        let lat_correction = self.center_lat.to_radians().cos();
        let rel_lon = (norm_x as f64) * effective_range / lat_correction;
        let rel_lat = -(norm_y as f64) * effective_range;

        Coord {
            x: self.center_lon + rel_lon,
            y: self.center_lat + rel_lat,
        }
    }

    /// Screen radius in pixels of a geodesic circle.
    pub fn radius_px(&self, center: Coord<f64>, radius_m: f64) -> f32 {
        let edge = self.geo_to_screen(destination_point(center, radius_m, 0.0));
        self.geo_to_screen(center).distance(edge)
    }

    /// Meters covered by one screen pixel at the view center.
    pub fn meters_per_px(&self) -> f64 {
        let reference_m = 1000.0;
        let px = self.radius_px(self.view_center(), reference_m);
        if px > 0.0 {
            reference_m / px as f64
        } else {
            0.0
        }
    }

    /// Returns the visible geographic bounds as (min_lon, min_lat, max_lon, max_lat).
    pub fn visible_bounds(&self) -> (f64, f64, f64, f64) {
        let top_left = self.screen_to_geo(self.screen_rect.left_top());
        let bottom_right = self.screen_to_geo(self.screen_rect.right_bottom());

        (
            top_left.x.min(bottom_right.x),
            top_left.y.min(bottom_right.y),
            top_left.x.max(bottom_right.x),
            top_left.y.max(bottom_right.y),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactimap::geo::lat_lng;

    fn projection() -> MapProjection {
        let mut p = MapProjection::default();
        p.update(1.0, Vec2::ZERO, Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0)));
        p
    }

    #[test]
    fn test_center_maps_to_canvas_center() {
        let p = projection();
        let pos = p.geo_to_screen(lat_lng(p.center_lat, p.center_lon));
        assert!((pos.x - 400.0).abs() < 0.01);
        assert!((pos.y - 300.0).abs() < 0.01);
    }

    #[test]
    fn test_screen_geo_round_trip() {
        let p = projection();
        let geo = p.screen_to_geo(Pos2::new(123.0, 456.0));
        let back = p.geo_to_screen(geo);
        assert!((back.x - 123.0).abs() < 0.01);
        assert!((back.y - 456.0).abs() < 0.01);
    }

    #[test]
    fn test_radius_scales_with_zoom() {
        let mut p = projection();
        let center = lat_lng(p.center_lat, p.center_lon);
        let r1 = p.radius_px(center, 500.0);
        p.zoom = 2.0;
        let r2 = p.radius_px(center, 500.0);
        assert!(r1 > 0.0);
        assert!((r2 / r1 - 2.0).abs() < 0.01);
    }
}
