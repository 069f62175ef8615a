use eframe::egui::Color32;
use palette::{IntoColor, LinSrgb, Mix, Srgb};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Default line colours
// ---------------------------------------------------------------------------

/// The "tab10" cycle overlays fall back to when no colour series is set.
pub const DEFAULT_CYCLE: [Color32; 10] = [
    Color32::from_rgb(0x1f, 0x77, 0xb4),
    Color32::from_rgb(0xff, 0x7f, 0x0e),
    Color32::from_rgb(0x2c, 0xa0, 0x2c),
    Color32::from_rgb(0xd6, 0x27, 0x28),
    Color32::from_rgb(0x94, 0x67, 0xbd),
    Color32::from_rgb(0x8c, 0x56, 0x4b),
    Color32::from_rgb(0xe3, 0x77, 0xc2),
    Color32::from_rgb(0x7f, 0x7f, 0x7f),
    Color32::from_rgb(0xbc, 0xbd, 0x22),
    Color32::from_rgb(0x17, 0xbe, 0xcf),
];

/// `index`-th colour of the default cycle, wrapping around.
pub fn cycle_color(index: usize) -> Color32 {
    DEFAULT_CYCLE[index % DEFAULT_CYCLE.len()]
}

// ---------------------------------------------------------------------------
// Colormaps: normalized value → Color32
// ---------------------------------------------------------------------------

type Stops = &'static [[u8; 3]];

const VIRIDIS: Stops = &[
    [0x44, 0x01, 0x54], [0x48, 0x28, 0x78], [0x3e, 0x49, 0x89], [0x31, 0x68, 0x8e],
    [0x26, 0x82, 0x8e], [0x1f, 0x9e, 0x89], [0x35, 0xb7, 0x79], [0x6e, 0xce, 0x58],
    [0xb5, 0xde, 0x2b], [0xfd, 0xe7, 0x25],
];
const INFERNO: Stops = &[
    [0x00, 0x00, 0x04], [0x1b, 0x0c, 0x41], [0x4a, 0x0c, 0x6b], [0x78, 0x1c, 0x6d],
    [0xa5, 0x2c, 0x60], [0xcf, 0x44, 0x46], [0xed, 0x69, 0x25], [0xfb, 0x9b, 0x06],
    [0xf7, 0xd1, 0x3d], [0xfc, 0xff, 0xa4],
];
const PLASMA: Stops = &[
    [0x0d, 0x08, 0x87], [0x46, 0x03, 0x9f], [0x72, 0x01, 0xa8], [0x9c, 0x17, 0x9e],
    [0xbd, 0x37, 0x86], [0xd8, 0x57, 0x6b], [0xed, 0x79, 0x53], [0xfb, 0x9f, 0x3a],
    [0xfd, 0xca, 0x26], [0xf0, 0xf9, 0x21],
];
const MAGMA: Stops = &[
    [0x00, 0x00, 0x04], [0x18, 0x0f, 0x3d], [0x44, 0x0f, 0x76], [0x72, 0x1f, 0x81],
    [0x9e, 0x2f, 0x7f], [0xcd, 0x40, 0x71], [0xf1, 0x60, 0x5d], [0xfd, 0x96, 0x68],
    [0xfe, 0xca, 0x8d], [0xfc, 0xfd, 0xbf],
];
const COOLWARM: Stops = &[[0x3b, 0x4c, 0xc0], [0xdd, 0xdd, 0xdd], [0xb4, 0x04, 0x26]];
const GRAY: Stops = &[[0x00, 0x00, 0x00], [0xff, 0xff, 0xff]];

const KNOWN: [(&str, Stops); 7] = [
    ("viridis", VIRIDIS),
    ("inferno", INFERNO),
    ("plasma", PLASMA),
    ("magma", MAGMA),
    ("coolwarm", COOLWARM),
    ("gray", GRAY),
    ("grey", GRAY),
];

/// A named colormap; a `_r` suffix reverses it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Colormap {
    name: &'static str,
    stops: Stops,
    reversed: bool,
}

impl Colormap {
    pub fn by_name(name: &str) -> Result<Self> {
        let (base, reversed) = match name.strip_suffix("_r") {
            Some(base) => (base, true),
            None => (name, false),
        };
        KNOWN
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(base))
            .map(|&(name, stops)| Colormap {
                name,
                stops,
                reversed,
            })
            .ok_or_else(|| Error::UnknownColormap {
                name: name.to_string(),
                known: KNOWN.iter().map(|(n, _)| *n).collect::<Vec<_>>().join(", "),
            })
    }

    pub fn label(&self) -> String {
        if self.reversed {
            format!("{}_r", self.name)
        } else {
            self.name.to_string()
        }
    }

    /// Colour at `t` in `[0, 1]`; NaN maps to transparent.
    pub fn sample(&self, t: f64) -> Color32 {
        if t.is_nan() {
            return Color32::TRANSPARENT;
        }
        let t = t.clamp(0.0, 1.0);
        let t = if self.reversed { 1.0 - t } else { t };

        let last = self.stops.len() - 1;
        let pos = t * last as f64;
        let lo = (pos.floor() as usize).min(last);
        let hi = (lo + 1).min(last);
        let frac = (pos - lo as f64) as f32;

        let mixed = linear(self.stops[lo]).mix(linear(self.stops[hi]), frac);
        let rgb: Srgb = mixed.into_color();
        Color32::from_rgb(
            (rgb.red * 255.0).round() as u8,
            (rgb.green * 255.0).round() as u8,
            (rgb.blue * 255.0).round() as u8,
        )
    }

    /// `n` colours sampled evenly from one end of the map to the other.
    pub fn series(&self, n: usize) -> Vec<Color32> {
        match n {
            0 => Vec::new(),
            1 => vec![self.sample(0.0)],
            _ => (0..n)
                .map(|i| self.sample(i as f64 / (n - 1) as f64))
                .collect(),
        }
    }
}

fn linear([r, g, b]: [u8; 3]) -> LinSrgb {
    Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0).into_color()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_hit_stops() {
        let cmap = Colormap::by_name("inferno").unwrap();
        assert_eq!(cmap.sample(0.0), Color32::from_rgb(0x00, 0x00, 0x04));
        assert_eq!(cmap.sample(1.0), Color32::from_rgb(0xfc, 0xff, 0xa4));
        assert_eq!(cmap.sample(7.0), cmap.sample(1.0));
    }

    #[test]
    fn test_reversed_suffix() {
        let fwd = Colormap::by_name("viridis").unwrap();
        let rev = Colormap::by_name("viridis_r").unwrap();
        assert_eq!(rev.label(), "viridis_r");
        assert_eq!(rev.sample(0.0), fwd.sample(1.0));
    }

    #[test]
    fn test_unknown_colormap() {
        let err = Colormap::by_name("jet").unwrap_err();
        assert!(matches!(err, Error::UnknownColormap { ref name, .. } if name == "jet"));
    }

    #[test]
    fn test_series_spans_map() {
        let cmap = Colormap::by_name("gray").unwrap();
        let colors = cmap.series(3);
        assert_eq!(colors.len(), 3);
        assert_eq!(colors[0], Color32::BLACK);
        assert_eq!(colors[2], Color32::WHITE);
        assert!(cmap.series(0).is_empty());
    }

    #[test]
    fn test_nan_is_transparent() {
        let cmap = Colormap::by_name("magma").unwrap();
        assert_eq!(cmap.sample(f64::NAN), Color32::TRANSPARENT);
    }

    #[test]
    fn test_cycle_wraps() {
        assert_eq!(cycle_color(0), cycle_color(10));
        assert_ne!(cycle_color(0), cycle_color(1));
    }
}
