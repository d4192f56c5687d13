//! UI modules for the Tactimap workbench.
//!
//! The UI is split into distinct panels:
//! - Top bar: title, unit and status
//! - Side panel: tools, zone parameters, presets and incident actions
//! - Central map: zones, ghost preview, markers and drift

mod colors;
mod map;
mod projection;
mod side_panel;
mod top_bar;

pub use map::{render_map, Hit, MapEvent, MapState};
pub use side_panel::{render_side_panel, PanelAction, PanelState};
pub use top_bar::{render_top_bar, Status};
