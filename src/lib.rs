//! CCD acquisition adapter and interactive scan viewer.
//!
//! * [`device`] drives a CCD camera through the [`device::CcdDriver`] seam.
//! * [`plotter`] holds the overlay state behind the two-panel scan view.
//! * [`app`] and [`ui`] render it with egui.

pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod device;
pub mod error;
pub mod plotter;
pub mod state;
pub mod ui;

pub use error::{Error, Result};
