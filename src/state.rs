use std::path::Path;

use eframe::egui::{self, TextureHandle};

use crate::data::experiment::{AccessorPath, ExperimentRecord};
use crate::data::loader::{ScanSource, load_file};
use crate::plotter::{PlotKey, PlotterOptions, ScanPlotter};
use crate::ui::heatmap::HeatmapImage;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// An experiment record waiting for the user to pick its sweep path.
pub struct PendingExperiment {
    pub record: ExperimentRecord,
    pub file_name: String,
    /// Numeric fields offered as sweep paths.
    pub candidates: Vec<AccessorPath>,
    pub path_text: String,
}

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Options every plotter is built with.
    pub options: PlotterOptions,

    /// Active plotter (None until a scan is loaded).
    pub plotter: Option<ScanPlotter>,

    /// Loaded record still missing its sweep path.
    pub pending: Option<PendingExperiment>,

    /// Raster of the active plotter's heatmap.
    pub heatmap: Option<HeatmapImage>,

    /// GPU copy of `heatmap`; rebuilt when it is None.
    pub texture: Option<TextureHandle>,

    /// Name of the file the plotter was built from.
    pub file_name: Option<String>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Whether a file loading operation is in progress.
    pub loading: bool,

    shift_held: bool,
}

impl AppState {
    pub fn new(options: PlotterOptions) -> Self {
        Self {
            options,
            plotter: None,
            pending: None,
            heatmap: None,
            texture: None,
            file_name: None,
            status_message: None,
            loading: false,
            shift_held: false,
        }
    }

    /// Load a file; experiment records use `sweep` when given, otherwise
    /// they wait in `pending`.
    pub fn open_path(&mut self, path: &Path, sweep: Option<AccessorPath>) {
        self.loading = true;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        match load_file(path) {
            Ok(source) => {
                log::info!("Loaded {}", path.display());
                self.set_source(source, file_name, sweep);
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
        self.loading = false;
    }

    pub fn set_source(
        &mut self,
        source: ScanSource,
        file_name: String,
        sweep: Option<AccessorPath>,
    ) {
        match (source, sweep) {
            (ScanSource::Experiment(record), None) => {
                let candidates = record.numeric_paths();
                let path_text = candidates.first().map(ToString::to_string).unwrap_or_default();
                self.status_message = Some(format!(
                    "{file_name}: choose the sweep field of {} scans",
                    record.len()
                ));
                self.pending = Some(PendingExperiment {
                    record,
                    file_name,
                    candidates,
                    path_text,
                });
            }
            (source, sweep) => {
                self.pending = None;
                self.build_plotter(source, file_name, sweep);
            }
        }
    }

    /// Build the plotter for the pending record with its typed path.
    pub fn apply_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        match pending.path_text.parse::<AccessorPath>() {
            Ok(path) => {
                let source = ScanSource::Experiment(pending.record);
                self.build_plotter(source, pending.file_name, Some(path));
            }
            Err(e) => {
                self.status_message = Some(format!("Error: {e}"));
                self.pending = Some(pending);
            }
        }
    }

    fn build_plotter(&mut self, source: ScanSource, file_name: String, sweep: Option<AccessorPath>) {
        let built = source
            .into_input(sweep)
            .and_then(|input| ScanPlotter::new(input, self.options.clone()));
        match built {
            Ok(mut plotter) => {
                // A held shift has no fresh transition to report.
                if self.shift_held {
                    plotter.key_pressed(PlotKey::Shift);
                }
                self.heatmap = Some(HeatmapImage::from_plotter(&plotter));
                self.texture = None;
                self.plotter = Some(plotter);
                self.file_name = Some(file_name);
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Cannot plot {file_name}: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Upload the heatmap raster if the texture is missing.
    pub fn ensure_texture(&mut self, ctx: &egui::Context) {
        if self.texture.is_some() {
            return;
        }
        if let Some(heatmap) = &self.heatmap {
            self.texture = Some(ctx.load_texture(
                "scan_heatmap",
                heatmap.to_color_image(),
                egui::TextureOptions::LINEAR,
            ));
        }
    }

    /// Forward shift and `u` transitions to the plotter.
    pub fn handle_keys(&mut self, input: &egui::InputState, typing: bool) {
        let u_events: Vec<bool> = input
            .events
            .iter()
            .filter_map(|event| match event {
                egui::Event::Key {
                    key: egui::Key::U,
                    pressed,
                    repeat: false,
                    ..
                } => Some(*pressed),
                _ => None,
            })
            .collect();
        self.apply_keys(input.modifiers.shift, &u_events, typing);
    }

    /// `u_events` holds one `pressed` flag per `u` key transition, in order.
    /// Presses are dropped while a text field has focus; releases never are.
    fn apply_keys(&mut self, shift: bool, u_events: &[bool], typing: bool) {
        let shift_changed = shift != self.shift_held;
        self.shift_held = shift;

        let Some(plotter) = self.plotter.as_mut() else {
            return;
        };
        if shift_changed {
            if shift {
                plotter.key_pressed(PlotKey::Shift);
            } else {
                plotter.key_released(PlotKey::Shift);
            }
        }
        for &pressed in u_events {
            if pressed && !typing {
                plotter.key_pressed(PlotKey::Unselect);
            } else if !pressed {
                plotter.key_released(PlotKey::Unselect);
            }
        }
    }
}
