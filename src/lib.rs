//! Splotty - scrolling terminal plotter for tab-delimited telemetry
//!
//! Reads `label:value` lines from a serial device (or a synthetic generator),
//! tracks the field schema as it appears, and plots every enabled field as a
//! colored glyph on a terminal scroll region, one row per sample.

pub mod app;
pub mod config;
pub mod data;
pub mod fields;
pub mod keyboard;
pub mod persist;
pub mod shortcuts;
pub mod signals;
pub mod terminal;
pub mod ui;
pub mod utils;

pub use app::{App, Console, TickOutcome};
pub use config::Config;
