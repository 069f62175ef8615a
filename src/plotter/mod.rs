//! Interactive scan plotter: the state behind the heatmap and spectrum panels.
//!
//! ```text
//!   PlotInput ──► ScanDataset ──► units ► colours ► cosmic rays ► shift
//!                                                          │
//!   key_pressed / key_released ──► ModifierState           ▼
//!   click(y) ─────────────────────► select / deselect ─► OverlaySet
//!                                                          │
//!                                      ui::plot draws ◄────┘
//! ```
//!
//! Nothing here touches egui's event loop; the app translates input into the
//! calls below, so the whole protocol can be driven from tests.

pub mod options;
pub mod overlay;

use eframe::egui::Color32;
use log::{debug, info};
use ndarray::Array2;

use crate::color::{Colormap, cycle_color};
use crate::data::model::{PlotInput, ScanDataset};
use crate::data::process::{invert_units, remove_cosmic_rays, shift_correction};
use crate::error::{Error, Result};

pub use options::{PlotterOptions, Shading};
pub use overlay::{Overlay, OverlaySet, REFERENCE_ALPHA, ReferenceLine, SpectrumLine};

/// Keys the plotter reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKey {
    Shift,
    /// The `u` key.
    Unselect,
}

/// Which keys are currently held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    pub shift: bool,
    pub unselect: bool,
}

impl ModifierState {
    fn set(&mut self, key: PlotKey, held: bool) {
        match key {
            PlotKey::Shift => self.shift = held,
            PlotKey::Unselect => self.unselect = held,
        }
    }
}

/// What a click on the heatmap did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickOutcome {
    /// No modifier held.
    Ignored,
    Selected { key: f64 },
    Removed { key: f64 },
    /// Deselect with no overlays held.
    NothingToRemove,
}

pub struct ScanPlotter {
    dataset: ScanDataset,
    /// `(xx, yy)` grids of the heatmap, in plotted x units.
    mesh: (Array2<f64>, Array2<f64>),
    options: PlotterOptions,
    colormap: Colormap,
    series: Option<Vec<Color32>>,
    color_range: (f64, f64),
    overlays: OverlaySet,
    modifiers: ModifierState,
    /// Selections made so far; drives stagger and default colours.
    counter: usize,
    view_reset: bool,
}

impl ScanPlotter {
    pub fn new(input: PlotInput, options: PlotterOptions) -> Result<Self> {
        let mut dataset = input.into_dataset()?;

        if options.change_x_units {
            let x = invert_units(dataset.x(), options.unit_constant)?;
            dataset.set_x(x);
        }
        let mesh = dataset.mesh();

        let colormap = Colormap::by_name(&options.cmap)?;
        let series = options
            .cmap_series
            .as_deref()
            .map(|name| -> Result<Vec<Color32>> {
                let mut colors = Colormap::by_name(name)?.series(dataset.n_rows());
                if options.cmap_series_flip {
                    colors.reverse();
                }
                Ok(colors)
            })
            .transpose()?;

        if !options.cr_thresholds.is_empty() {
            let clean = remove_cosmic_rays(dataset.data(), options.cr_m, &options.cr_thresholds);
            dataset.set_data(clean);
        }
        if let Some(x_min) = options.sc_e_min {
            let shifted = shift_correction(
                dataset.data(),
                dataset.x(),
                x_min,
                options.sc_e_max,
                options.shift_value,
            )?;
            dataset.set_data(shifted);
        }

        let (lo, hi) = dataset.value_range();
        let color_range = (options.vmin.unwrap_or(lo), options.vmax.unwrap_or(hi));
        if color_range.0 > color_range.1 {
            return Err(Error::Config(format!(
                "colour range is inverted: vmin {} > vmax {}",
                color_range.0, color_range.1
            )));
        }

        info!(
            "Scan plotter ready: {} spectra × {} points, colormap {}",
            dataset.n_rows(),
            dataset.n_columns(),
            colormap.label()
        );

        Ok(Self {
            dataset,
            mesh,
            options,
            colormap,
            series,
            color_range,
            overlays: OverlaySet::default(),
            modifiers: ModifierState::default(),
            counter: 0,
            view_reset: true,
        })
    }

    // ---- input protocol ----

    pub fn key_pressed(&mut self, key: PlotKey) {
        self.modifiers.set(key, true);
    }

    pub fn key_released(&mut self, key: PlotKey) {
        self.modifiers.set(key, false);
    }

    /// A click on the heatmap at sweep value `y`. Shift wins over `u`.
    pub fn click(&mut self, y: f64) -> ClickOutcome {
        let outcome = if self.modifiers.shift {
            self.select(y)
        } else if self.modifiers.unselect {
            self.deselect(y)
        } else {
            ClickOutcome::Ignored
        };
        self.view_reset = true;
        debug!("Click at y={y}: {outcome:?}");
        outcome
    }

    fn select(&mut self, y: f64) -> ClickOutcome {
        let Some(row) = self.dataset.nearest_row(y) else {
            return ClickOutcome::Ignored;
        };
        let key = self.dataset.y()[row];
        let color = match &self.series {
            Some(colors) => colors[row],
            None => cycle_color(self.counter),
        };
        let offset = self.counter as f64 * self.options.spec_staggering;
        let points = self
            .dataset
            .x()
            .iter()
            .zip(self.dataset.row(row))
            .map(|(&x, &v)| [x, v + offset])
            .collect();

        self.overlays.insert(Overlay {
            key,
            row,
            reference: ReferenceLine { y: key, color },
            spectrum: SpectrumLine {
                label: format!("{}={:?}", self.options.legend_label, round2(key)),
                color,
                offset,
                points,
            },
        });
        self.counter += 1;
        ClickOutcome::Selected { key }
    }

    fn deselect(&mut self, y: f64) -> ClickOutcome {
        let Some(row) = self.dataset.nearest_row(y) else {
            return ClickOutcome::Ignored;
        };
        match self.overlays.remove_nearest(self.dataset.y()[row]) {
            Some(removed) => ClickOutcome::Removed { key: removed.key },
            None => ClickOutcome::NothingToRemove,
        }
    }

    /// Remove the overlay with exactly this key (side-panel list).
    pub fn remove_overlay(&mut self, key: f64) -> bool {
        let removed = self.overlays.remove(key).is_some();
        self.view_reset |= removed;
        removed
    }

    pub fn clear_overlays(&mut self) {
        self.overlays.clear();
        self.view_reset = true;
    }

    // ---- view ----

    /// True once after anything that should re-fit the spectrum panel.
    pub fn take_view_reset(&mut self) -> bool {
        std::mem::take(&mut self.view_reset)
    }

    /// `([x_min, y_min], [x_max, y_max])` fitting every selected spectrum.
    pub fn spectrum_bounds(&self) -> ([f64; 2], [f64; 2]) {
        let (x_lo, x_hi) = self.dataset.x_range();
        let (y_lo, y_hi) = self
            .overlays
            .iter()
            .flat_map(|o| o.spectrum.points.iter().map(|p| p[1]))
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        let (y_lo, y_hi) = if y_lo > y_hi {
            (0.0, 1.0)
        } else {
            let margin = ((y_hi - y_lo) * 0.05).max(1e-9);
            (y_lo - margin, y_hi + margin)
        };
        ([x_lo, y_lo], [x_hi, y_hi])
    }

    /// `(label, colour)` per overlay, in selection order.
    pub fn legend_entries(&self) -> Vec<(String, Color32)> {
        self.overlays
            .iter()
            .map(|o| (o.spectrum.label.clone(), o.spectrum.color))
            .collect()
    }

    pub fn dataset(&self) -> &ScanDataset {
        &self.dataset
    }

    pub fn mesh(&self) -> (&Array2<f64>, &Array2<f64>) {
        (&self.mesh.0, &self.mesh.1)
    }

    pub fn options(&self) -> &PlotterOptions {
        &self.options
    }

    pub fn colormap(&self) -> Colormap {
        self.colormap
    }

    /// Per-row colours from `cmap_series`, if configured.
    pub fn series(&self) -> Option<&[Color32]> {
        self.series.as_deref()
    }

    /// Values mapped to the two ends of the colormap.
    pub fn color_range(&self) -> (f64, f64) {
        self.color_range
    }

    pub fn overlays(&self) -> &OverlaySet {
        &self.overlays
    }

    pub fn modifiers(&self) -> ModifierState {
        self.modifiers
    }

    pub fn counter(&self) -> usize {
        self.counter
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
