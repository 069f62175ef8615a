use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use eframe::egui;

use rusty_scan::app::ScanViewerApp;
use rusty_scan::config::{Options, Overrides, load_overrides};
use rusty_scan::data::experiment::AccessorPath;
use rusty_scan::plotter::PlotterOptions;
use rusty_scan::state::AppState;

#[derive(Parser, Debug)]
#[command(author, version, about = "Interactive scan viewer: heatmap plus selected spectra")]
struct Args {
    /// Scan file to open (.json, .csv or .parquet)
    file: Option<PathBuf>,

    /// Dotted path of each scan's sweep value, e.g. `settings.voltage`
    #[arg(long)]
    sweep: Option<String>,

    /// Plot options file (.json or .toml)
    #[arg(long)]
    options: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let overrides = match &args.options {
        Some(path) => load_overrides(path)?,
        None => Overrides::new(),
    };
    let options = PlotterOptions::with_overrides(&overrides).context("invalid plot options")?;
    let sweep = args
        .sweep
        .as_deref()
        .map(str::parse::<AccessorPath>)
        .transpose()
        .context("invalid --sweep path")?;

    let mut state = AppState::new(options);
    if let Some(file) = &args.file {
        state.open_path(file, sweep);
    }

    let native = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 900.0])
            .with_min_inner_size([600.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty Scan – Scan Viewer",
        native,
        Box::new(|_cc| Ok(Box::new(ScanViewerApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("viewer failed: {e}"))
}
