//! Pointer-driven interaction state: zone resizing and placement preview.

mod preview;
mod resize;

pub use preview::{PreviewConfig, PreviewParams, PreviewProjector};
pub use resize::{ResizeCommit, ResizeConfig, ResizeController, ResizePhase};
