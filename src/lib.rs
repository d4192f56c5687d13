#![warn(clippy::all)]

//! Tactimap - tactical hazard-zone geometry and safety-perimeter engine.
//!
//! The engine computes geometry as plain values (circles, sector polygons,
//! handles) that any renderer can draw. It covers:
//!
//! - spherical-earth geodesy and zone shape construction
//! - the validated zone and marker model
//! - debounced interactive resizing and the placement ghost preview
//! - man-overboard drift estimation
//! - the breakpoint search just outside a zone's perimeter
//! - unit-scoped persistence with push snapshots
//!
//! [`TacticalEngine`] ties these together and is the intended entry point.

pub mod config;
pub mod drift;
pub mod engine;
pub mod error;
pub mod geo;
pub mod interaction;
pub mod model;
pub mod perimeter;
pub mod presets;
pub mod providers;
pub mod storage;

pub use config::EngineConfig;
pub use engine::{BreakpointReport, Placement, SnapshotFeed, TacticalEngine, TickReport, Tool};
