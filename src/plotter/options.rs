use serde::{Deserialize, Serialize};

use crate::config::Options;
use crate::data::process::HC_EV_NM;

/// How the heatmap fills the space between grid points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shading {
    /// Bilinear interpolation between neighbouring samples.
    #[default]
    Gouraud,
    /// Each sample fills the cell around it.
    Nearest,
    /// Treated like `Nearest`: one colour per cell.
    Flat,
}

impl Shading {
    pub fn interpolates(self) -> bool {
        matches!(self, Shading::Gouraud)
    }
}

/// Plot appearance and preprocessing switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotterOptions {
    /// Vertical offset added per selected spectrum, in intensity units.
    pub spec_staggering: f64,
    pub legend_label: String,
    pub title: String,
    pub xlabel: String,
    pub ylabel: String,
    pub ilabel: String,
    pub cmap: String,
    /// Colormap that gives each row its own overlay colour.
    pub cmap_series: Option<String>,
    pub cmap_series_flip: bool,
    pub shading: Shading,
    /// Neighbours on each side used for the cosmic-ray median.
    pub cr_m: usize,
    pub cr_thresholds: Vec<f64>,
    pub sc_e_min: Option<f64>,
    pub sc_e_max: Option<f64>,
    pub shift_value: f64,
    pub change_x_units: bool,
    pub unit_constant: f64,
    pub vmin: Option<f64>,
    pub vmax: Option<f64>,
}

impl Default for PlotterOptions {
    fn default() -> Self {
        Self {
            spec_staggering: 0.0,
            legend_label: "voltage".into(),
            title: "title".into(),
            xlabel: "x".into(),
            ylabel: "y".into(),
            ilabel: "intensity [a.u.]".into(),
            cmap: "inferno".into(),
            cmap_series: None,
            cmap_series_flip: false,
            shading: Shading::Gouraud,
            cr_m: 3,
            cr_thresholds: Vec::new(),
            sc_e_min: None,
            sc_e_max: None,
            shift_value: 0.0,
            change_x_units: false,
            unit_constant: HC_EV_NM,
            vmin: None,
            vmax: None,
        }
    }
}

impl Options for PlotterOptions {
    const ALIASES: &'static [(&'static str, &'static str)] =
        &[("camp_series_flip", "cmap_series_flip")];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Overrides;
    use serde_json::json;

    #[test]
    fn test_misspelled_flip_accepted() {
        let mut map = Overrides::new();
        map.insert("camp_series_flip".into(), json!(true));
        map.insert("shading".into(), json!("nearest"));
        let opts = PlotterOptions::with_overrides(&map).unwrap();
        assert!(opts.cmap_series_flip);
        assert_eq!(opts.shading, Shading::Nearest);
        assert_eq!(opts.legend_label, "voltage");
    }

    #[test]
    fn test_unknown_shading_rejected() {
        let mut map = Overrides::new();
        map.insert("shading".into(), json!("phong"));
        assert!(PlotterOptions::with_overrides(&map).is_err());
    }
}
