use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeListArray, ListArray, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::experiment::{AccessorPath, ExperimentRecord, ScanRecord};
use super::model::PlotInput;
use crate::error::Error;

/// Column naming each scan in a Parquet experiment table.
const SCAN_ID_COLUMN: &str = "scan_id";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Contents of a scan file before a sweep path is chosen.
#[derive(Debug, Clone)]
pub enum ScanSource {
    Raw {
        x: Vec<f64>,
        y: Vec<f64>,
        data: Vec<Vec<f64>>,
    },
    Experiment(ExperimentRecord),
}

impl ScanSource {
    /// Experiment records need the path of their sweep value.
    pub fn needs_sweep_path(&self) -> bool {
        matches!(self, ScanSource::Experiment(_))
    }

    pub fn into_input(self, path: Option<AccessorPath>) -> crate::error::Result<PlotInput> {
        match (self, path) {
            (ScanSource::Raw { x, y, data }, _) => Ok(PlotInput::Raw { x, y, data }),
            (ScanSource::Experiment(record), Some(path)) => {
                Ok(PlotInput::Experiment { record, path })
            }
            (ScanSource::Experiment(_), None) => Err(Error::Config(
                "experiment records need a sweep accessor path".into(),
            )),
        }
    }
}

/// Load a scan file.  Dispatch by extension.
///
/// Supported formats:
/// * `.json`    – `{"master_data": {...}}` experiment record, or
///                `{"x": [...], "y": [...], "data": [[...], ...]}`
/// * `.csv`     – header `<sweep label>,x0,x1,...`; each row `y,v0,v1,...`
/// * `.parquet` – one row per scan: list columns `wavelengths` and a data
///                field, scalar columns become scan fields
pub fn load_file(path: &Path) -> Result<ScanSource> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "json" => load_json(path),
        "csv" => load_csv(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RawScan {
    x: Vec<f64>,
    y: Vec<f64>,
    data: Vec<Vec<f64>>,
}

fn load_json(path: &Path) -> Result<ScanSource> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

fn parse_json(text: &str) -> Result<ScanSource> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let obj = root
        .as_object()
        .context("Expected a top-level JSON object")?;

    if obj.contains_key("master_data") {
        let record: ExperimentRecord =
            serde_json::from_value(root).context("reading experiment record")?;
        return Ok(ScanSource::Experiment(record));
    }

    if ["x", "y", "data"].iter().all(|k| obj.contains_key(*k)) {
        let raw: RawScan = serde_json::from_value(root).context("reading x/y/data arrays")?;
        return Ok(ScanSource::Raw {
            x: raw.x,
            y: raw.y,
            data: raw.data,
        });
    }

    Err(Error::DataFormat(
        "expected an experiment record ('master_data') or 'x', 'y' and 'data' arrays".into(),
    )
    .into())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: the header row holds a label for the sweep column followed by
/// the x values; every following row holds the sweep value then the spectrum.
fn load_csv(path: &Path) -> Result<ScanSource> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .context("opening CSV")?;

    let headers = reader.headers().context("reading CSV headers")?.clone();
    if headers.len() < 2 {
        bail!("CSV header needs a sweep label and at least one x value");
    }
    let x = headers
        .iter()
        .skip(1)
        .enumerate()
        .map(|(j, tok)| {
            tok.parse::<f64>()
                .with_context(|| format!("Header x[{j}]: '{tok}' is not a number"))
        })
        .collect::<Result<Vec<f64>>>()?;

    let mut y = Vec::new();
    let mut data = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let mut values = record.iter().enumerate().map(|(j, tok)| {
            parse_sample(tok).with_context(|| format!("Row {row_no}, column {j}: '{tok}' is not a number"))
        });

        let sweep = values
            .next()
            .with_context(|| format!("Row {row_no} is empty"))??;
        let spectrum = values.collect::<Result<Vec<f64>>>()?;

        if spectrum.len() != x.len() {
            bail!(
                "CSV row {row_no}: {} values but the header has {} x values",
                spectrum.len(),
                x.len()
            );
        }
        y.push(sweep);
        data.push(spectrum);
    }

    Ok(ScanSource::Raw { x, y, data })
}

/// Empty cells and `nan` read as missing samples.
fn parse_sample(tok: &str) -> Result<f64> {
    if tok.is_empty() {
        return Ok(f64::NAN);
    }
    Ok(tok.parse::<f64>()?)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet experiment table.
///
/// Expected schema:
/// - `wavelengths`: List<Float64> or LargeList<Float64>
/// - one of the recognized data fields, same list type
/// - optional `scan_id` column naming the scan (row number otherwise)
/// - any other scalar columns are scan fields usable as the sweep path
fn load_parquet(path: &Path) -> Result<ScanSource> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut record = ExperimentRecord::default();
    let mut row_offset = 0usize;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        for row in 0..batch.num_rows() {
            let mut scan = ScanRecord::default();
            let mut scan_id = format!("{:04}", row_offset + row);

            for (col_idx, field) in schema.fields().iter().enumerate() {
                let name = field.name();
                let column = batch.column(col_idx);

                match column.data_type() {
                    DataType::List(_) | DataType::LargeList(_) => {
                        let values = extract_f64_list(column, row)
                            .with_context(|| format!("Row {row}: failed to read '{name}'"))?;
                        scan.data.insert(name.clone(), f64s_to_json(values));
                    }
                    _ if name == SCAN_ID_COLUMN => {
                        scan_id = match extract_scalar(column, row) {
                            JsonValue::String(s) => s,
                            other => other.to_string(),
                        };
                    }
                    _ => {
                        scan.fields.insert(name.clone(), extract_scalar(column, row));
                    }
                }
            }

            record.master_data.insert(scan_id, scan);
        }
        row_offset += batch.num_rows();
    }

    if record.is_empty() {
        bail!("Parquet file has no rows");
    }
    Ok(ScanSource::Experiment(record))
}

// -- Parquet / Arrow helpers --

fn f64s_to_json(values: Vec<f64>) -> JsonValue {
    JsonValue::Array(
        values
            .into_iter()
            .map(|v| serde_json::Number::from_f64(v).map_or(JsonValue::Null, JsonValue::Number))
            .collect(),
    )
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // The inner array can be Float64 or Float32
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

/// Extract a single scalar from an Arrow column at a given row.
fn extract_scalar(col: &Arc<dyn Array>, row: usize) -> JsonValue {
    if col.is_null(row) {
        return JsonValue::Null;
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|a| JsonValue::from(a.value(row))),
        DataType::LargeUtf8 => Some(JsonValue::from(col.as_string::<i64>().value(row))),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| JsonValue::from(a.value(row))),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| JsonValue::from(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| JsonValue::from(a.value(row) as f64)),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| JsonValue::from(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| JsonValue::from(a.value(row))),
        _ => None,
    };
    value.unwrap_or_else(|| JsonValue::String(format!("{:?}", col.data_type())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Builder, ListBuilder};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    #[test]
    fn test_json_raw_shape() {
        let src = parse_json(r#"{"x": [1, 2], "y": [0.5], "data": [[3, 4]]}"#).unwrap();
        assert!(!src.needs_sweep_path());
        let ScanSource::Raw { x, y, data } = src else {
            panic!("expected raw scan");
        };
        assert_eq!(x, vec![1.0, 2.0]);
        assert_eq!(y, vec![0.5]);
        assert_eq!(data, vec![vec![3.0, 4.0]]);
    }

    #[test]
    fn test_json_experiment_shape() {
        let src = parse_json(
            r#"{"master_data": {"s0": {"data": {"wavelengths": [1.0], "spec": [2.0]}, "voltage": 1.5}}}"#,
        )
        .unwrap();
        assert!(src.needs_sweep_path());
        assert!(src.clone().into_input(None).is_err());
        let input = src.into_input(Some("voltage".parse().unwrap())).unwrap();
        let ds = input.into_dataset().unwrap();
        assert_eq!(ds.y().to_vec(), vec![1.5]);
    }

    #[test]
    fn test_json_unknown_shape_is_format_error() {
        let err = parse_json(r#"{"spectra": []}"#).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::DataFormat(_))));
    }

    #[test]
    fn test_csv_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.csv");
        std::fs::write(&path, "voltage,500,501,502\n2.0,1,2,3\n1.0,4,,6\n").unwrap();

        let ScanSource::Raw { x, y, data } = load_file(&path).unwrap() else {
            panic!("expected raw scan");
        };
        assert_eq!(x, vec![500.0, 501.0, 502.0]);
        assert_eq!(y, vec![2.0, 1.0]);
        assert_eq!(data[0], vec![1.0, 2.0, 3.0]);
        assert!(data[1][1].is_nan());
    }

    #[test]
    fn test_csv_ragged_row_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.csv");
        std::fs::write(&path, "v,1,2\n0.0,1\n").unwrap();
        assert!(load_file(&path).is_err());
    }

    #[test]
    fn test_parquet_experiment_table() {
        let item = Arc::new(Field::new("item", DataType::Float64, true));
        let schema = Arc::new(Schema::new(vec![
            Field::new("wavelengths", DataType::List(item.clone()), false),
            Field::new("spec", DataType::List(item), false),
            Field::new("voltage", DataType::Float64, false),
        ]));

        let mut wl = ListBuilder::new(Float64Builder::new());
        let mut spec = ListBuilder::new(Float64Builder::new());
        for (i, _) in [3.0, 1.0].iter().enumerate() {
            wl.values().append_slice(&[700.0, 701.0]);
            wl.append(true);
            spec.values().append_slice(&[i as f64, i as f64 + 0.5]);
            spec.append(true);
        }
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(wl.finish()),
                Arc::new(spec.finish()),
                Arc::new(Float64Array::from(vec![3.0, 1.0])),
            ],
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.parquet");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ScanSource::Experiment(record) = load_file(&path).unwrap() else {
            panic!("expected experiment record");
        };
        assert_eq!(record.len(), 2);
        assert_eq!(record.master_data["0001"].fields["voltage"], JsonValue::from(1.0));

        let ds = record.to_dataset(&"voltage".parse().unwrap()).unwrap();
        assert_eq!(ds.y().to_vec(), vec![1.0, 3.0]);
        assert_eq!(ds.row(0).to_vec(), vec![1.0, 1.5]);
        assert_eq!(ds.x().to_vec(), vec![700.0, 701.0]);
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(load_file(Path::new("scan.h5")).is_err());
    }
}
