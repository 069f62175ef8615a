use std::path::Path;

use anyhow::Context;
use eframe::egui::{self, Color32};
use ndarray::Array2;

use crate::color::Colormap;
use crate::data::model::ScanDataset;
use crate::plotter::{ScanPlotter, Shading};

/// Largest texture edge the heatmap is rasterized at.
const MAX_EDGE: usize = 2048;
/// Smallest raster edge for interpolated shading.
const MIN_SMOOTH_EDGE: usize = 256;
/// Pixel rows per dataset row for cell shading, so uneven y spacing shows.
const CELL_OVERSAMPLE: usize = 8;

// ---------------------------------------------------------------------------
// Heatmap raster
// ---------------------------------------------------------------------------

/// The scan resampled onto a uniform RGBA grid.
///
/// Row 0 of `rgba` is the top of the plot (largest y).
#[derive(Debug, Clone)]
pub struct HeatmapImage {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
    /// `[min, max]` covered in x and y plot coordinates.
    pub x_extent: [f64; 2],
    pub y_extent: [f64; 2],
}

impl HeatmapImage {
    pub fn from_plotter(plotter: &ScanPlotter) -> Self {
        let (xx, yy) = plotter.mesh();
        rasterize_mesh(
            xx,
            yy,
            plotter.dataset().data(),
            plotter.colormap(),
            plotter.color_range(),
            plotter.options().shading,
        )
    }

    pub fn to_color_image(&self) -> egui::ColorImage {
        egui::ColorImage::from_rgba_unmultiplied([self.width, self.height], &self.rgba)
    }

    pub fn center(&self) -> [f64; 2] {
        [
            (self.x_extent[0] + self.x_extent[1]) / 2.0,
            (self.y_extent[0] + self.y_extent[1]) / 2.0,
        ]
    }

    pub fn size(&self) -> [f32; 2] {
        [
            (self.x_extent[1] - self.x_extent[0]) as f32,
            (self.y_extent[1] - self.y_extent[0]) as f32,
        ]
    }

    pub fn save_png(&self, path: &Path) -> anyhow::Result<()> {
        let image = image::RgbaImage::from_raw(
            self.width as u32,
            self.height as u32,
            self.rgba.clone(),
        )
        .context("heatmap buffer does not match its dimensions")?;
        image
            .save(path)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("Saved heatmap to {}", path.display());
        Ok(())
    }
}

/// Resample `dataset` onto a uniform grid and colour it.
///
/// x may be unsorted (e.g. after a unit conversion); columns are visited in
/// ascending x. NaN samples come out transparent.
pub fn rasterize(
    dataset: &ScanDataset,
    colormap: Colormap,
    range: (f64, f64),
    shading: Shading,
) -> HeatmapImage {
    let (xx, yy) = dataset.mesh();
    rasterize_mesh(&xx, &yy, dataset.data(), colormap, range, shading)
}

/// Rasterize `data` over its coordinate grids, both shaped like `data`.
pub fn rasterize_mesh(
    xx: &Array2<f64>,
    yy: &Array2<f64>,
    data: &Array2<f64>,
    colormap: Colormap,
    (vmin, vmax): (f64, f64),
    shading: Shading,
) -> HeatmapImage {
    let mut columns: Vec<(f64, usize)> = xx
        .row(0)
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, &v)| (v, i))
        .collect();
    columns.sort_by(|a, b| a.0.total_cmp(&b.0));
    let xs: Vec<f64> = columns.iter().map(|c| c.0).collect();
    let ys = yy.column(0).to_vec();

    let (width, height) = if shading.interpolates() {
        (
            xs.len().clamp(MIN_SMOOTH_EDGE, MAX_EDGE),
            ys.len().clamp(MIN_SMOOTH_EDGE, MAX_EDGE),
        )
    } else {
        (
            xs.len().clamp(1, MAX_EDGE),
            (ys.len() * CELL_OVERSAMPLE).clamp(1, MAX_EDGE),
        )
    };

    let x_extent = padded_extent(&xs);
    let y_extent = padded_extent(&ys);
    let span = vmax - vmin;

    let mut rgba = Vec::with_capacity(width * height * 4);
    for py in 0..height {
        let yv = y_extent[1] - (py as f64 + 0.5) / height as f64 * (y_extent[1] - y_extent[0]);
        let (r0, r1, ty) = locate(&ys, yv);
        for px in 0..width {
            let xv = x_extent[0] + (px as f64 + 0.5) / width as f64 * (x_extent[1] - x_extent[0]);
            let value = if xs.is_empty() {
                f64::NAN
            } else {
                let (c0, c1, tx) = locate(&xs, xv);
                let at = |r: usize, c: usize| data[[r, columns[c].1]];
                if shading.interpolates() {
                    let top = lerp(at(r0, c0), at(r0, c1), tx);
                    let bottom = lerp(at(r1, c0), at(r1, c1), tx);
                    lerp(top, bottom, ty)
                } else {
                    let r = if ty < 0.5 { r0 } else { r1 };
                    let c = if tx < 0.5 { c0 } else { c1 };
                    at(r, c)
                }
            };
            let t = if span > 0.0 { (value - vmin) / span } else { 0.5 };
            let color: Color32 = if value.is_nan() {
                Color32::TRANSPARENT
            } else {
                colormap.sample(t)
            };
            rgba.extend_from_slice(&color.to_array());
        }
    }

    HeatmapImage {
        width,
        height,
        rgba,
        x_extent,
        y_extent,
    }
}

/// Bracketing indices in ascending `axis` and the fraction between them.
fn locate(axis: &[f64], v: f64) -> (usize, usize, f64) {
    if axis.len() < 2 {
        return (0, 0, 0.0);
    }
    let hi = axis.partition_point(|&a| a < v).clamp(1, axis.len() - 1);
    let lo = hi - 1;
    let gap = axis[hi] - axis[lo];
    let t = if gap > 0.0 {
        ((v - axis[lo]) / gap).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (lo, hi, t)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn padded_extent(axis: &[f64]) -> [f64; 2] {
    match (axis.first(), axis.last()) {
        (Some(&lo), Some(&hi)) if hi > lo => [lo, hi],
        (Some(&v), _) => [v - 0.5, v + 0.5],
        _ => [0.0, 1.0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> ScanDataset {
        ScanDataset::from_rows(
            vec![3.0, 1.0, 2.0],
            vec![0.0, 1.0],
            vec![vec![3.0, 1.0, 2.0], vec![30.0, 10.0, 20.0]],
        )
        .unwrap()
    }

    fn pixel(img: &HeatmapImage, px: usize, py: usize) -> [u8; 4] {
        let i = (py * img.width + px) * 4;
        [img.rgba[i], img.rgba[i + 1], img.rgba[i + 2], img.rgba[i + 3]]
    }

    #[test]
    fn test_nearest_raster_dimensions() {
        let cmap = Colormap::by_name("gray").unwrap();
        let img = rasterize(&dataset(), cmap, (1.0, 30.0), Shading::Nearest);
        assert_eq!(img.width, 3);
        assert_eq!(img.height, 2 * CELL_OVERSAMPLE);
        assert_eq!(img.rgba.len(), img.width * img.height * 4);
        assert_eq!(img.x_extent, [1.0, 3.0]);
        assert_eq!(img.y_extent, [0.0, 1.0]);
    }

    #[test]
    fn test_top_row_is_largest_y_and_x_is_sorted() {
        let cmap = Colormap::by_name("gray").unwrap();
        let img = rasterize(&dataset(), cmap, (1.0, 30.0), Shading::Flat);
        // Top right: y = 1, x = 3 → 30 → white.
        assert_eq!(pixel(&img, 2, 0), [255, 255, 255, 255]);
        // Bottom left: y = 0, x = 1 → 1 → black.
        assert_eq!(pixel(&img, 0, img.height - 1), [0, 0, 0, 255]);
    }

    #[test]
    fn test_gouraud_upsamples() {
        let cmap = Colormap::by_name("viridis").unwrap();
        let img = rasterize(&dataset(), cmap, (1.0, 30.0), Shading::Gouraud);
        assert_eq!((img.width, img.height), (MIN_SMOOTH_EDGE, MIN_SMOOTH_EDGE));
    }

    #[test]
    fn test_nan_is_transparent() {
        let ds = ScanDataset::from_rows(vec![1.0], vec![0.0], vec![vec![f64::NAN]]).unwrap();
        let cmap = Colormap::by_name("gray").unwrap();
        let img = rasterize(&ds, cmap, (0.0, 1.0), Shading::Nearest);
        assert_eq!(pixel(&img, 0, 0)[3], 0);
        assert_eq!(img.x_extent, [0.5, 1.5]);
    }

    #[test]
    fn test_save_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heatmap.png");
        let cmap = Colormap::by_name("magma").unwrap();
        rasterize(&dataset(), cmap, (1.0, 30.0), Shading::Nearest)
            .save_png(&path)
            .unwrap();
        assert!(path.exists());
    }
}
