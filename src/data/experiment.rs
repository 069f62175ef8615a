use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::model::ScanDataset;
use crate::error::{Error, Result};

/// Data fields holding a scan's spectrum, most processed first.
pub const DATA_FIELDS: [&str; 3] = ["reflection contrast", "spec dark subtracted", "spec"];

/// Data field holding the spectral axis shared by every scan.
pub const WAVELENGTH_FIELD: &str = "wavelengths";

// ---------------------------------------------------------------------------
// AccessorPath – where a scan keeps its sweep value
// ---------------------------------------------------------------------------

/// Dotted key path into a scan record, e.g. `metadata.voltage`.
/// Numeric segments index into arrays.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessorPath(Vec<String>);

impl AccessorPath {
    pub fn new<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return Err(Error::Config(format!(
                "accessor path needs non-empty segments, got {segments:?}"
            )));
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl FromStr for AccessorPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AccessorPath::new(s.trim().split('.').map(str::trim))
    }
}

impl fmt::Display for AccessorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

// ---------------------------------------------------------------------------
// ScanRecord – one point of the sweep
// ---------------------------------------------------------------------------

/// A single scan: its `data` mapping plus whatever else the experiment
/// recorded (settings, instrument readbacks, timestamps).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ScanRecord {
    /// Resolve `path`; a leading `data` segment reads from the data mapping.
    pub fn lookup(&self, path: &AccessorPath) -> Option<&Value> {
        let (first, rest) = path.segments().split_first()?;
        if first == "data" {
            walk_map(&self.data, rest)
        } else {
            walk(self.fields.get(first)?, rest)
        }
    }

    pub fn sweep_value(&self, path: &AccessorPath) -> Option<f64> {
        self.lookup(path).and_then(Value::as_f64)
    }

    /// The first recognized data field, in [`DATA_FIELDS`] order.
    pub fn spectrum(&self, scan_id: &str) -> Result<(&'static str, Vec<f64>)> {
        let Some((field, value)) = DATA_FIELDS
            .iter()
            .find_map(|&field| self.data.get(field).map(|v| (field, v)))
        else {
            return Err(Error::NoRecognizedDataField {
                scan_id: scan_id.to_string(),
                tried: DATA_FIELDS.join(", "),
            });
        };
        let values = f64_array(value).ok_or_else(|| {
            Error::DataFormat(format!("scan '{scan_id}': '{field}' is not a numeric array"))
        })?;
        Ok((field, values))
    }

    pub fn wavelengths(&self, scan_id: &str) -> Result<Vec<f64>> {
        self.data
            .get(WAVELENGTH_FIELD)
            .and_then(f64_array)
            .ok_or_else(|| {
                Error::DataFormat(format!(
                    "scan '{scan_id}': missing numeric '{WAVELENGTH_FIELD}' array"
                ))
            })
    }

    /// Every path that resolves to a scalar number, for sweep suggestions.
    pub fn numeric_paths(&self) -> Vec<AccessorPath> {
        let mut out = Vec::new();
        let mut prefix = Vec::new();
        collect_numeric(&self.fields, &mut prefix, &mut out);
        prefix.push("data".to_string());
        collect_numeric(&self.data, &mut prefix, &mut out);
        out
    }
}

fn walk_map<'a>(map: &'a Map<String, Value>, segments: &[String]) -> Option<&'a Value> {
    let (head, tail) = segments.split_first()?;
    walk(map.get(head)?, tail)
}

fn walk<'a>(value: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments.iter().try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn collect_numeric(map: &Map<String, Value>, prefix: &mut Vec<String>, out: &mut Vec<AccessorPath>) {
    for (key, value) in map {
        prefix.push(key.clone());
        match value {
            Value::Number(_) => out.push(AccessorPath(prefix.clone())),
            Value::Object(inner) => collect_numeric(inner, prefix, out),
            _ => {}
        }
        prefix.pop();
    }
}

/// JSON has no NaN, so `null` entries stand in for missing samples.
fn f64_array(value: &Value) -> Option<Vec<f64>> {
    value
        .as_array()?
        .iter()
        .map(|v| match v {
            Value::Null => Some(f64::NAN),
            other => other.as_f64(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// ExperimentRecord – the whole sweep
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub master_data: BTreeMap<String, ScanRecord>,
}

impl ExperimentRecord {
    pub fn len(&self) -> usize {
        self.master_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.master_data.is_empty()
    }

    /// Sweep-path candidates taken from the first scan.
    pub fn numeric_paths(&self) -> Vec<AccessorPath> {
        self.master_data
            .values()
            .next()
            .map(ScanRecord::numeric_paths)
            .unwrap_or_default()
    }

    /// Stack every scan's spectrum into rows ordered by the sweep value.
    pub fn to_dataset(&self, path: &AccessorPath) -> Result<ScanDataset> {
        if self.master_data.is_empty() {
            return Err(Error::DataFormat("experiment has no scans".into()));
        }

        let mut x: Vec<f64> = Vec::new();
        let mut y = Vec::with_capacity(self.master_data.len());
        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(self.master_data.len());

        for (scan_id, scan) in &self.master_data {
            let (field, spectrum) = scan.spectrum(scan_id)?;
            let sweep = scan
                .sweep_value(path)
                .ok_or_else(|| Error::MissingSweepValue {
                    scan_id: scan_id.clone(),
                    path: path.to_string(),
                })?;
            let wavelengths = scan.wavelengths(scan_id)?;
            if wavelengths.len() != spectrum.len() {
                return Err(Error::DataFormat(format!(
                    "scan '{scan_id}': {} wavelengths but {} values in '{field}'",
                    wavelengths.len(),
                    spectrum.len()
                )));
            }
            if !x.is_empty() && x.len() != wavelengths.len() {
                return Err(Error::DataFormat(format!(
                    "scan '{scan_id}' has {} samples, earlier scans have {}",
                    wavelengths.len(),
                    x.len()
                )));
            }
            x = wavelengths;
            y.push(sweep);
            rows.push(spectrum);
        }

        let columns = x.len();
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let data = Array2::from_shape_vec((y.len(), columns), flat)
            .map_err(|e| Error::DataFormat(e.to_string()))?;

        ScanDataset::new(Array1::from_vec(x), Array1::from_vec(y), data)
    }
}
