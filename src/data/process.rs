use ndarray::{Array1, Array2, ArrayViewMut1, Axis};

use crate::error::{Error, Result};

/// `hc` in eV·nm: converts wavelength in nm to photon energy in eV and back.
pub const HC_EV_NM: f64 = 1240.0;

/// Cap on repeated sweeps of one cosmic-ray threshold over a spectrum.
const MAX_CR_SWEEPS: usize = 32;

// ---------------------------------------------------------------------------
// Axis unit conversion
// ---------------------------------------------------------------------------

/// `x ← constant / x`, e.g. wavelength (nm) to energy (eV) with [`HC_EV_NM`].
pub fn invert_units(x: &Array1<f64>, constant: f64) -> Result<Array1<f64>> {
    if let Some(i) = x.iter().position(|&v| v == 0.0) {
        return Err(Error::DataFormat(format!(
            "cannot convert units: x[{i}] is zero"
        )));
    }
    Ok(x.mapv(|v| constant / v))
}

// ---------------------------------------------------------------------------
// Cosmic-ray rejection
// ---------------------------------------------------------------------------

/// Suppress single-sample spikes in every spectrum.
///
/// For each threshold in turn, a sample exceeding the median of its `m`
/// neighbours on either side by more than the threshold is replaced by that
/// median. A threshold is re-applied until a sweep changes nothing, so
/// spikes wider than one sample are eaten from the edges inwards.
pub fn remove_cosmic_rays(data: &Array2<f64>, m: usize, thresholds: &[f64]) -> Array2<f64> {
    let mut out = data.clone();
    if m == 0 {
        return out;
    }
    for mut row in out.axis_iter_mut(Axis(0)) {
        for &threshold in thresholds {
            for _ in 0..MAX_CR_SWEEPS {
                if !despike_once(&mut row, m, threshold) {
                    break;
                }
            }
        }
    }
    out
}

fn despike_once(row: &mut ArrayViewMut1<'_, f64>, m: usize, threshold: f64) -> bool {
    let n = row.len();
    let mut changed = false;
    let mut window = Vec::with_capacity(2 * m);
    for i in 0..n {
        window.clear();
        let lo = i.saturating_sub(m);
        let hi = (i + m + 1).min(n);
        window.extend(
            (lo..hi)
                .filter(|&j| j != i)
                .map(|j| row[j])
                .filter(|v| v.is_finite()),
        );
        let Some(reference) = median(&mut window) else {
            continue;
        };
        if row[i] - reference > threshold {
            row[i] = reference;
            changed = true;
        }
    }
    changed
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

// ---------------------------------------------------------------------------
// Baseline shift correction
// ---------------------------------------------------------------------------

/// Offset each spectrum so its mean over `x ∈ [x_min, x_max]` equals `shift`.
///
/// `x_max = None` leaves the window open above.
pub fn shift_correction(
    data: &Array2<f64>,
    x: &Array1<f64>,
    x_min: f64,
    x_max: Option<f64>,
    shift: f64,
) -> Result<Array2<f64>> {
    let x_max = x_max.unwrap_or(f64::INFINITY);
    let window: Vec<usize> = x
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v >= x_min && v <= x_max)
        .map(|(i, _)| i)
        .collect();
    if window.is_empty() {
        return Err(Error::DataFormat(format!(
            "shift correction window [{x_min}, {x_max}] contains no x values"
        )));
    }

    let mut out = data.clone();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let (sum, count) = window
            .iter()
            .map(|&i| row[i])
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
        if count == 0 {
            continue;
        }
        let offset = shift - sum / count as f64;
        row.mapv_inplace(|v| v + offset);
    }
    Ok(out)
}
