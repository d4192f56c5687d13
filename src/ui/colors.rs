//! Centralized color constants for the UI.
//!
//! This module provides consistent colors across the panels and the map.

use eframe::egui::Color32;

/// General UI colors for labels and values.
pub mod ui {
    use super::Color32;

    /// Muted gray for stat labels.
    pub const LABEL: Color32 = Color32::from_rgb(100, 100, 100);
    /// Slightly brighter for stat values.
    pub const VALUE: Color32 = Color32::from_rgb(160, 160, 160);
    /// Emphasized color for active states.
    pub const ACTIVE: Color32 = Color32::from_rgb(100, 180, 255);
    /// Success/positive indicator.
    pub const SUCCESS: Color32 = Color32::from_rgb(100, 200, 100);
    /// Failure indicator.
    pub const ERROR: Color32 = Color32::from_rgb(255, 80, 80);
}

/// Colors for the map canvas.
pub mod canvas {
    use super::Color32;

    /// Background color.
    pub const BACKGROUND: Color32 = Color32::from_rgb(20, 20, 35);
    /// Cardinal direction label.
    pub const CARDINAL: Color32 = Color32::from_rgb(120, 140, 120);
    /// Scale bar and its label.
    pub const SCALE: Color32 = Color32::from_rgb(180, 180, 200);

    /// Grid line color - requires alpha, use function.
    pub fn grid() -> Color32 {
        Color32::from_rgba_unmultiplied(60, 70, 90, 90)
    }
}

/// Colors for hazard zones.
pub mod zones {
    use super::Color32;

    /// Hot zone outline.
    pub const HOT_STROKE: Color32 = Color32::from_rgb(230, 50, 50);
    /// Warm zone outline.
    pub const WARM_STROKE: Color32 = Color32::from_rgb(255, 170, 40);
    /// Resize handle.
    pub const HANDLE: Color32 = Color32::WHITE;
    /// Resize handle while dragging.
    pub const HANDLE_ACTIVE: Color32 = Color32::from_rgb(100, 180, 255);
    /// Address label.
    pub const LABEL: Color32 = Color32::from_rgb(230, 230, 240);

    /// Hot zone fill - requires alpha, use function.
    pub fn hot_fill() -> Color32 {
        Color32::from_rgba_unmultiplied(230, 50, 50, 70)
    }

    /// Warm zone fill - requires alpha, use function.
    pub fn warm_fill() -> Color32 {
        Color32::from_rgba_unmultiplied(255, 170, 40, 35)
    }
}

/// Colors for tactical markers.
pub mod markers {
    use super::Color32;
    use tactimap::model::MarkerKind;

    /// Marker label text.
    pub const LABEL: Color32 = Color32::from_rgb(220, 220, 240);
    /// Drift track and search area.
    pub const DRIFT: Color32 = Color32::from_rgb(80, 200, 255);

    /// Fill color per marker kind.
    pub fn fill(kind: MarkerKind) -> Color32 {
        match kind {
            MarkerKind::Breakpoint => Color32::from_rgb(60, 170, 90),
            MarkerKind::Assembly => Color32::from_rgb(40, 120, 220),
            MarkerKind::Decon => Color32::from_rgb(220, 200, 40),
            MarkerKind::Command | MarkerKind::CommandPost => Color32::from_rgb(200, 80, 200),
            MarkerKind::CasualtyClearing => Color32::from_rgb(240, 120, 120),
            MarkerKind::Sector => Color32::from_rgb(150, 150, 170),
            MarkerKind::Generic => Color32::from_rgb(120, 120, 130),
            MarkerKind::ManOverboard => Color32::from_rgb(255, 80, 80),
        }
    }
}
