use std::path::Path;

use serde_json::json;

use rusty_scan::Error;
use rusty_scan::config::{Options, Overrides};
use rusty_scan::data::experiment::AccessorPath;
use rusty_scan::data::loader::{ScanSource, load_file};
use rusty_scan::plotter::{ClickOutcome, PlotKey, PlotterOptions, ScanPlotter};

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn experiment_json() -> String {
    json!({
        "master_data": {
            "s0": {"voltage": 1.0, "data": {"wavelengths": [500.0, 600.0], "reflection contrast": [0.1, 0.2], "spec": [9.0, 9.0]}},
            "s1": {"voltage": 0.0, "data": {"wavelengths": [500.0, 600.0], "spec": [1.0, 2.0]}},
            "s2": {"voltage": 2.0, "data": {"wavelengths": [500.0, 600.0], "spec dark subtracted": [5.0, 6.0]}}
        }
    })
    .to_string()
}

fn plotter_from(source: ScanSource, sweep: Option<&str>, overrides: Overrides) -> ScanPlotter {
    let path = sweep.map(|p| p.parse::<AccessorPath>().unwrap());
    let options = PlotterOptions::with_overrides(&overrides).unwrap();
    ScanPlotter::new(source.into_input(path).unwrap(), options).unwrap()
}

#[test]
fn experiment_file_rows_follow_sweep_and_field_priority() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "exp.json", &experiment_json());

    let source = load_file(&path).unwrap();
    assert!(source.needs_sweep_path());
    let plotter = plotter_from(source, Some("voltage"), Overrides::new());

    let ds = plotter.dataset();
    assert_eq!(ds.y().to_vec(), vec![0.0, 1.0, 2.0]);
    assert_eq!(ds.row(0).to_vec(), vec![1.0, 2.0]);
    assert_eq!(ds.row(1).to_vec(), vec![0.1, 0.2]);
    assert_eq!(ds.row(2).to_vec(), vec![5.0, 6.0]);
}

#[test]
fn missing_sweep_value_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "exp.json", &experiment_json());
    let input = load_file(&path)
        .unwrap()
        .into_input(Some("gate.voltage".parse().unwrap()))
        .unwrap();

    let err = ScanPlotter::new(input, PlotterOptions::default()).err().unwrap();
    assert!(matches!(err, Error::MissingSweepValue { .. }));
}

#[test]
fn unrecognized_json_is_a_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "other.json", r#"{"spectra": []}"#);
    let err = load_file(&path).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::DataFormat(_))));
}

#[test]
fn csv_scan_select_and_remove() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "scan.csv",
        "voltage,1.0,2.0,3.0\n6.0,6,6,6\n4.0,4,4,4\n5.0,5,5,5\n",
    );
    let mut overrides = Overrides::new();
    overrides.insert("spec_staggering".into(), json!(1.0));
    overrides.insert("legend_label".into(), json!("gate"));
    let mut plotter = plotter_from(load_file(&path).unwrap(), None, overrides);

    plotter.key_pressed(PlotKey::Shift);
    assert_eq!(plotter.click(5.0), ClickOutcome::Selected { key: 5.0 });
    assert_eq!(plotter.click(3.9), ClickOutcome::Selected { key: 4.0 });
    plotter.key_released(PlotKey::Shift);

    let labels: Vec<String> = plotter.legend_entries().into_iter().map(|(l, _)| l).collect();
    assert_eq!(labels, vec!["gate=5.0", "gate=4.0"]);
    let second = plotter.overlays().iter().nth(1).unwrap();
    assert_eq!(second.spectrum.points, vec![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0]]);

    plotter.key_pressed(PlotKey::Unselect);
    assert_eq!(plotter.click(5.05), ClickOutcome::Removed { key: 5.0 });
    assert_eq!(plotter.overlays().keys(), vec![4.0]);

    assert_eq!(plotter.click(4.0), ClickOutcome::Removed { key: 4.0 });
    assert_eq!(plotter.click(4.0), ClickOutcome::NothingToRemove);
}

#[test]
fn preprocessing_runs_before_plotting() {
    let source = ScanSource::Raw {
        x: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0],
        y: vec![0.0],
        data: vec![vec![3.0, 3.0, 3.0, 90.0, 3.0, 3.0, 3.0]],
    };
    let mut overrides = Overrides::new();
    overrides.insert("cr_thresholds".into(), json!([20.0]));
    overrides.insert("sc_e_min".into(), json!(1.0));
    overrides.insert("sc_e_max".into(), json!(2.0));
    overrides.insert("shift_value".into(), json!(1.0));
    let plotter = plotter_from(source, None, overrides);

    assert_eq!(plotter.dataset().row(0).to_vec(), vec![1.0; 7]);
    assert_eq!(plotter.color_range(), (1.0, 1.0));
}
