//! Simulated CCD for running the adapter without vendor hardware.
//!
//! The simulated device keeps the register set of the real driver, takes
//! `integration_time * accumulations` of wall time per exposure, and renders
//! a spectrum from a [`Scene`] of Gaussian peaks. Tests use the readiness
//! toggle, the stall mode, failure injection, and the shared [`CallLog`].

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::device::driver::{AcquisitionFormat, Area, CcdDriver, DriverConnector};
use crate::device::options::seconds;
use crate::device::{DEFAULT_PROG_ID, SIMULATED_PROG_ID};
use crate::error::{Error, Result};

/// Names of driver operations in the order they were called.
pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Peak {
    /// Centre wavelength in nm.
    pub center: f64,
    /// Standard deviation in nm.
    pub width: f64,
    /// Counts per second at the centre.
    pub amplitude: f64,
}

/// What the simulated detector looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub peaks: Vec<Peak>,
    /// Counts per second on every pixel.
    pub background: f64,
    /// Standard deviation of additive read noise, in counts.
    pub noise: f64,
    /// Wavelength of the first chip column, nm.
    pub wavelength_start: f64,
    /// Wavelength step per chip column, nm.
    pub wavelength_step: f64,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            peaks: vec![Peak {
                center: 750.0,
                width: 4.0,
                amplitude: 400.0,
            }],
            background: 20.0,
            noise: 2.0,
            wavelength_start: 600.0,
            wavelength_step: 0.2,
        }
    }
}

impl Scene {
    fn intensity(&self, wavelength: f64) -> f64 {
        self.background
            + self
                .peaks
                .iter()
                .map(|p| p.amplitude * (-(wavelength - p.center).powi(2) / (2.0 * p.width.powi(2))).exp())
                .sum::<f64>()
    }
}

// ---------------------------------------------------------------------------
// SimulatedCcd
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SimulatedCcd {
    unique_id: String,
    loaded: bool,
    communicating: bool,
    initialized: bool,
    chip_size: (u32, u32),
    integration_time: f64,
    gain: i32,
    adc: i32,
    format: AcquisitionFormat,
    area: Option<Area>,
    operating_mode: (i32, bool),
    accumulations: u32,
    acquisition_count: u32,
    ready: bool,
    stalled: bool,
    fail_on: Option<&'static str>,
    exposure_started: Option<Instant>,
    last_result: Option<Vec<f64>>,
    scene: Scene,
    rng: StdRng,
    calls: CallLog,
}

impl SimulatedCcd {
    pub fn new() -> Self {
        Self {
            unique_id: String::new(),
            loaded: false,
            communicating: false,
            initialized: false,
            chip_size: (1600, 256),
            integration_time: 1.0,
            gain: 0,
            adc: 0,
            format: AcquisitionFormat::Image,
            area: None,
            operating_mode: (0, false),
            accumulations: 1,
            acquisition_count: 1,
            ready: true,
            stalled: false,
            fail_on: None,
            exposure_started: None,
            last_result: None,
            scene: Scene::default(),
            rng: StdRng::seed_from_u64(0x5eed),
            calls: CallLog::default(),
        }
    }

    pub fn with_chip_size(mut self, columns: u32, rows: u32) -> Self {
        self.chip_size = (columns, rows);
        self
    }

    pub fn with_scene(mut self, scene: Scene) -> Self {
        self.scene = scene;
        self
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Make `ReadyForAcquisition` report `ready`.
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Keep the busy flag raised forever once an exposure starts.
    pub fn set_stalled(&mut self, stalled: bool) {
        self.stalled = stalled;
    }

    /// Fail every call of the named operation.
    pub fn fail_on(mut self, operation: &'static str) -> Self {
        self.fail_on = Some(operation);
        self
    }

    /// Shared handle on the call log; clones of this device share it.
    pub fn call_log(&self) -> CallLog {
        Arc::clone(&self.calls)
    }

    pub fn is_communicating(&self) -> bool {
        self.communicating
    }

    pub fn gain(&self) -> i32 {
        self.gain
    }

    pub fn format(&self) -> AcquisitionFormat {
        self.format
    }

    pub fn area(&self) -> Option<Area> {
        self.area
    }

    /// Wavelength of each binned column of the current area.
    pub fn wavelengths(&self) -> Vec<f64> {
        let Some(area) = self.area else {
            return Vec::new();
        };
        let bin = area.x_bin.max(1);
        (0..area.x_size / bin)
            .map(|i| {
                let first_column = (area.x_origin.saturating_sub(1) + i * bin) as f64;
                let centre = first_column + (bin as f64 - 1.0) / 2.0;
                self.scene.wavelength_start + centre * self.scene.wavelength_step
            })
            .collect()
    }

    fn record(&self, operation: &'static str) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(operation);
        }
        if self.fail_on == Some(operation) {
            return Err(Error::driver(operation, "injected failure"));
        }
        Ok(())
    }

    fn require_communications(&self, operation: &'static str) -> Result<()> {
        if !self.communicating {
            return Err(Error::driver(operation, "communications are closed"));
        }
        Ok(())
    }

    fn exposure(&self) -> Duration {
        seconds(self.integration_time * self.accumulations.max(1) as f64)
    }

    fn busy(&self) -> bool {
        match self.exposure_started {
            Some(started) => self.stalled || started.elapsed() < self.exposure(),
            None => false,
        }
    }

    fn gauss(&mut self) -> f64 {
        // Box-Muller
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    fn render(&mut self, area: Area) -> Vec<f64> {
        let spectrum: Vec<f64> = self
            .wavelengths()
            .into_iter()
            .map(|wl| self.scene.intensity(wl))
            .collect();
        let rows = (area.y_size / area.y_bin.max(1)) as usize;
        // Binned rows sum the pixels they cover.
        let per_row = area.y_bin.max(1) as f64 * area.x_bin.max(1) as f64;
        let exposure = self.integration_time * self.accumulations.max(1) as f64;

        let mut out = Vec::with_capacity(rows * spectrum.len());
        for _ in 0..rows {
            for &counts in &spectrum {
                let noise = self.scene.noise * self.gauss();
                out.push(counts * exposure * per_row + noise);
            }
        }
        out
    }
}

impl Default for SimulatedCcd {
    fn default() -> Self {
        Self::new()
    }
}

impl CcdDriver for SimulatedCcd {
    fn set_unique_id(&mut self, unique_id: &str) -> Result<()> {
        self.record("UniqueID")?;
        self.unique_id = unique_id.to_string();
        Ok(())
    }

    fn load(&mut self) -> Result<()> {
        self.record("Load")?;
        self.loaded = true;
        Ok(())
    }

    fn open_communications(&mut self) -> Result<()> {
        self.record("OpenCommunications")?;
        if !self.loaded {
            return Err(Error::driver("OpenCommunications", "driver not loaded"));
        }
        self.communicating = true;
        Ok(())
    }

    fn initialize(&mut self) -> Result<()> {
        self.record("Initialize")?;
        self.require_communications("Initialize")?;
        self.initialized = true;
        Ok(())
    }

    fn close_communications(&mut self) -> Result<()> {
        self.record("CloseCommunications")?;
        self.communicating = false;
        self.exposure_started = None;
        Ok(())
    }

    fn firmware_version(&self) -> Result<String> {
        self.record("FirmwareVersion")?;
        Ok("SIM-1.0".to_string())
    }

    fn description(&self) -> Result<String> {
        self.record("Description")?;
        Ok("Simulated open-electrode CCD".to_string())
    }

    fn name(&self) -> Result<String> {
        self.record("Name")?;
        Ok(format!("Simulated CCD {}", self.unique_id))
    }

    fn chip_size(&self) -> Result<(u32, u32)> {
        self.record("GetChipSize")?;
        Ok(self.chip_size)
    }

    fn data_size(&self) -> Result<usize> {
        self.record("DataSize")?;
        Ok(self.area.map_or(0, |a| a.readout_len()))
    }

    fn integration_time(&self) -> Result<f64> {
        self.record("IntegrationTime")?;
        Ok(self.integration_time)
    }

    fn set_integration_time(&mut self, seconds: f64) -> Result<()> {
        self.record("SetIntegrationTime")?;
        self.integration_time = seconds;
        Ok(())
    }

    fn set_gain(&mut self, gain: i32) -> Result<()> {
        self.record("Gain")?;
        self.gain = gain;
        Ok(())
    }

    fn select_adc(&mut self, adc: i32) -> Result<()> {
        self.record("SelectADC")?;
        self.adc = adc;
        Ok(())
    }

    fn define_acquisition_format(&mut self, format: AcquisitionFormat, areas: u32) -> Result<()> {
        self.record("DefineAcquisitionFormat")?;
        if areas == 0 {
            return Err(Error::driver("DefineAcquisitionFormat", "at least one area"));
        }
        self.format = format;
        Ok(())
    }

    fn define_area(&mut self, area: &Area) -> Result<()> {
        self.record("DefineArea")?;
        let (columns, rows) = self.chip_size;
        let x_end = area.x_origin.saturating_sub(1) + area.x_size;
        let y_end = area.y_origin.saturating_sub(1) + area.y_size;
        if area.x_origin == 0 || area.y_origin == 0 || x_end > columns || y_end > rows {
            return Err(Error::driver(
                "DefineArea",
                format!("area {area:?} outside {columns}x{rows} chip"),
            ));
        }
        if area.x_bin == 0 || area.y_bin == 0 {
            return Err(Error::driver("DefineArea", "binning must be non-zero"));
        }
        self.area = Some(*area);
        Ok(())
    }

    fn set_operating_mode(&mut self, mode: i32, enabled: bool) -> Result<()> {
        self.record("SetOperatingModeValue")?;
        self.operating_mode = (mode, enabled);
        Ok(())
    }

    fn set_accumulations(&mut self, count: u32) -> Result<()> {
        self.record("NumberOfAccumulations")?;
        self.accumulations = count;
        Ok(())
    }

    fn set_acquisition_count(&mut self, count: u32) -> Result<()> {
        self.record("AcquisitionCount")?;
        self.acquisition_count = count;
        Ok(())
    }

    fn ready_for_acquisition(&self) -> Result<bool> {
        self.record("ReadyForAcquisition")?;
        Ok(self.ready && self.initialized && self.communicating && !self.busy())
    }

    fn start_acquisition(&mut self, _open_shutter: bool) -> Result<()> {
        self.record("StartAcquisition")?;
        self.require_communications("StartAcquisition")?;
        if self.area.is_none() {
            return Err(Error::driver("StartAcquisition", "no area defined"));
        }
        self.exposure_started = Some(Instant::now());
        self.last_result = None;
        Ok(())
    }

    fn acquisition_busy(&self) -> Result<bool> {
        self.record("AcquisitionBusy")?;
        Ok(self.busy())
    }

    fn raw_result(&mut self) -> Result<Vec<f64>> {
        self.record("GetResult")?;
        if self.busy() {
            return Err(Error::driver("GetResult", "acquisition still running"));
        }
        if self.exposure_started.take().is_some() {
            let area = self
                .area
                .ok_or_else(|| Error::driver("GetResult", "no area defined"))?;
            let data = self.render(area);
            self.last_result = Some(data);
        }
        self.last_result
            .clone()
            .ok_or_else(|| Error::driver("GetResult", "no acquisition has completed"))
    }
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Hands out clones of a prototype device for the known program ids.
#[derive(Debug, Clone, Default)]
pub struct SimulatedConnector {
    prototype: SimulatedCcd,
}

impl SimulatedConnector {
    pub fn new(prototype: SimulatedCcd) -> Self {
        Self { prototype }
    }
}

impl DriverConnector for SimulatedConnector {
    type Driver = SimulatedCcd;

    fn dispatch(&self, prog_id: &str) -> Result<SimulatedCcd> {
        match prog_id {
            DEFAULT_PROG_ID | SIMULATED_PROG_ID => Ok(self.prototype.clone()),
            other => Err(Error::DriverNotFound(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_device() -> SimulatedCcd {
        let mut ccd = SimulatedCcd::new();
        ccd.load().unwrap();
        ccd.open_communications().unwrap();
        ccd.initialize().unwrap();
        ccd
    }

    #[test]
    fn test_open_requires_load() {
        let mut ccd = SimulatedCcd::new();
        assert!(ccd.open_communications().is_err());
    }

    #[test]
    fn test_area_must_fit_chip() {
        let mut ccd = open_device().with_chip_size(1024, 256);
        let area = Area {
            number: 1,
            x_origin: 1,
            y_origin: 1,
            x_size: 1600,
            y_size: 200,
            x_bin: 1,
            y_bin: 200,
        };
        assert!(ccd.define_area(&area).is_err());
    }

    #[test]
    fn test_exposure_produces_binned_spectrum() {
        let mut ccd = open_device();
        let area = Area {
            number: 1,
            x_origin: 1,
            y_origin: 1,
            x_size: 400,
            y_size: 100,
            x_bin: 2,
            y_bin: 100,
        };
        ccd.define_area(&area).unwrap();
        ccd.set_integration_time(0.0).unwrap();
        ccd.start_acquisition(true).unwrap();
        assert!(!ccd.acquisition_busy().unwrap());

        let data = ccd.raw_result().unwrap();
        assert_eq!(data.len(), 200);
        assert_eq!(ccd.wavelengths().len(), 200);
    }

    #[test]
    fn test_stalled_device_stays_busy() {
        let mut ccd = open_device();
        ccd.define_area(&Area {
            number: 1,
            x_origin: 1,
            y_origin: 1,
            x_size: 10,
            y_size: 1,
            x_bin: 1,
            y_bin: 1,
        })
        .unwrap();
        ccd.set_integration_time(0.0).unwrap();
        ccd.set_stalled(true);
        ccd.start_acquisition(true).unwrap();
        assert!(ccd.acquisition_busy().unwrap());
        assert!(ccd.raw_result().is_err());
    }

    #[test]
    fn test_connector_knows_vendor_prog_id() {
        let connector = SimulatedConnector::default();
        assert!(connector.dispatch(DEFAULT_PROG_ID).is_ok());
        assert!(matches!(
            connector.dispatch("Other.Driver.1"),
            Err(Error::DriverNotFound(id)) if id == "Other.Driver.1"
        ));
    }

    #[test]
    fn test_injected_failure_is_logged() {
        let mut ccd = SimulatedCcd::new().fail_on("Load");
        let log = ccd.call_log();
        assert!(ccd.load().is_err());
        assert_eq!(log.lock().unwrap().as_slice(), ["Load"]);
    }
}
