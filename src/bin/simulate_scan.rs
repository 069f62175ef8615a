//! Sweep a simulated CCD across a voltage range and write the experiment.
//!
//! Each sweep point moves the scene's peaks by `--shift-per-volt` nm, takes
//! one acquisition, and stores it as a scan. Output: `<out>.json` (experiment
//! record) and `<out>.parquet` (one row per scan), both openable by the viewer
//! with `--sweep voltage`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Float64Array, Float64Builder, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use log::{info, warn};
use parquet::arrow::ArrowWriter;
use serde_json::{Map, Value, json};

use rusty_scan::config::{Options, load_overrides};
use rusty_scan::data::experiment::{ExperimentRecord, ScanRecord};
use rusty_scan::device::{
    Camera, CameraOptions, SIMULATED_PROG_ID, SimulatedCcd, SimulatedConnector,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Acquire a voltage sweep from a simulated CCD")]
struct Args {
    /// Output path without extension
    #[arg(short, long, default_value = "scan")]
    out: PathBuf,

    /// First sweep voltage
    #[arg(long, default_value_t = -2.0)]
    start: f64,

    /// Last sweep voltage
    #[arg(long, default_value_t = 2.0)]
    stop: f64,

    /// Number of sweep points
    #[arg(short, long, default_value_t = 41)]
    points: usize,

    /// Peak shift per volt, nm
    #[arg(long, default_value_t = 5.0)]
    shift_per_volt: f64,

    /// Integration time per acquisition, seconds
    #[arg(short, long, default_value_t = 0.02)]
    integration: f64,

    /// Camera options file (.json or .toml); the flags above win
    #[arg(long)]
    camera_options: Option<PathBuf>,

    /// Acquisition attempts per point while the device reports not ready
    #[arg(long, default_value_t = 3)]
    retries: usize,
}

/// One sweep point's readout.
struct Sample {
    scan_id: String,
    voltage: f64,
    spectrum: Vec<f64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    if args.points == 0 {
        bail!("--points must be at least 1");
    }

    let mut overrides = match &args.camera_options {
        Some(path) => load_overrides(path)?,
        None => Map::new(),
    };
    overrides
        .entry("settle_time_in_s")
        .or_insert_with(|| json!(0.0));
    overrides.insert("integration_time_in_s".into(), json!(args.integration));
    let options = CameraOptions::with_overrides(&overrides).context("invalid camera options")?;

    let connector = SimulatedConnector::new(SimulatedCcd::new());
    let mut camera = Camera::connect(&connector, SIMULATED_PROG_ID, "CCD1", options)?;
    let wavelengths = camera.driver().wavelengths();
    let base_centers: Vec<f64> = camera
        .driver()
        .scene()
        .peaks
        .iter()
        .map(|p| p.center)
        .collect();

    let mut samples = Vec::with_capacity(args.points);
    for i in 0..args.points {
        let voltage = if args.points == 1 {
            args.start
        } else {
            args.start + (args.stop - args.start) * i as f64 / (args.points - 1) as f64
        };
        for (peak, base) in camera
            .driver_mut()
            .scene_mut()
            .peaks
            .iter_mut()
            .zip(&base_centers)
        {
            peak.center = base + args.shift_per_volt * voltage;
        }

        let spectrum = acquire_with_retries(&mut camera, args.retries)?;
        info!("Scan {i}: {voltage:+.3} V, {} values", spectrum.len());
        samples.push(Sample {
            scan_id: format!("scan_{i:04}"),
            voltage,
            spectrum,
        });
    }
    camera.close()?;

    let json_path = args.out.with_extension("json");
    write_record(&json_path, &wavelengths, &samples)?;
    let parquet_path = args.out.with_extension("parquet");
    write_parquet(&parquet_path, &wavelengths, &samples)?;

    println!(
        "Wrote {} scans ({} wavelengths each) to {} and {}",
        samples.len(),
        wavelengths.len(),
        json_path.display(),
        parquet_path.display()
    );
    Ok(())
}

fn acquire_with_retries(camera: &mut Camera<SimulatedCcd>, retries: usize) -> Result<Vec<f64>> {
    for attempt in 1..=retries.max(1) {
        if let Some(readout) = camera.acquire()? {
            return Ok(readout.to_vec());
        }
        warn!("Camera not ready (attempt {attempt})");
    }
    bail!("camera stayed not ready after {retries} attempts")
}

fn write_record(path: &Path, wavelengths: &[f64], samples: &[Sample]) -> Result<()> {
    let mut record = ExperimentRecord::default();
    for sample in samples {
        let mut data = Map::new();
        data.insert("wavelengths".into(), json!(wavelengths));
        data.insert("spec".into(), json!(sample.spectrum));
        let mut fields = Map::new();
        fields.insert("voltage".into(), Value::from(sample.voltage));
        record
            .master_data
            .insert(sample.scan_id.clone(), ScanRecord { data, fields });
    }

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, &record).context("writing experiment record")?;
    Ok(())
}

fn write_parquet(path: &Path, wavelengths: &[f64], samples: &[Sample]) -> Result<()> {
    let mut wl_builder = ListBuilder::new(Float64Builder::new());
    let mut spec_builder = ListBuilder::new(Float64Builder::new());
    for sample in samples {
        wl_builder.values().append_slice(wavelengths);
        wl_builder.append(true);
        spec_builder.values().append_slice(&sample.spectrum);
        spec_builder.append(true);
    }

    let ids = StringArray::from(samples.iter().map(|s| s.scan_id.as_str()).collect::<Vec<_>>());
    let voltages = Float64Array::from(samples.iter().map(|s| s.voltage).collect::<Vec<_>>());

    let item = Arc::new(Field::new("item", DataType::Float64, true));
    let schema = Arc::new(Schema::new(vec![
        Field::new("scan_id", DataType::Utf8, false),
        Field::new("voltage", DataType::Float64, false),
        Field::new("wavelengths", DataType::List(item.clone()), false),
        Field::new("spec", DataType::List(item), false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(ids),
            Arc::new(voltages),
            Arc::new(wl_builder.finish()),
            Arc::new(spec_builder.finish()),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}
