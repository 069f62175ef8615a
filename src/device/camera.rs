use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use ndarray::Array1;

use crate::device::driver::{AcquisitionFormat, Area, CcdDriver, DeviceIdentity, DriverConnector};
use crate::device::options::{CameraOptions, seconds};
use crate::error::{Error, Result};

/// Upper bound on the sleep between busy-flag polls.
const MAX_POLL_INTERVAL_S: f64 = 0.01;

/// Integration time programmed by the legacy sequence before options apply.
const LEGACY_INTEGRATION_TIME_S: f64 = 10.0;
/// 1 MHz digitizer.
const LEGACY_ADC: i32 = 1;
/// High dynamic range.
const LEGACY_GAIN: i32 = 1;
/// Hardware operating mode.
const LEGACY_OPERATING_MODE: i32 = 1;
const LEGACY_AREA: Area = Area {
    number: 1,
    x_origin: 1,
    y_origin: 1,
    x_size: 1024,
    y_size: 256,
    x_bin: 1,
    y_bin: 1,
};

// ---------------------------------------------------------------------------
// Scoped connection
// ---------------------------------------------------------------------------

/// Owns an open driver and closes its communications when dropped.
struct Connection<D: CcdDriver> {
    driver: D,
    open: bool,
}

impl<D: CcdDriver> Drop for Connection<D> {
    fn drop(&mut self) {
        if self.open {
            self.open = false;
            if let Err(e) = self.driver.close_communications() {
                warn!("Failed to close CCD communications: {e}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

/// A configured CCD camera performing blocking single-shot acquisitions.
///
/// The driver connection is released when the camera is closed or dropped,
/// including when construction fails part way.
pub struct Camera<D: CcdDriver> {
    conn: Connection<D>,
    unique_id: String,
    options: CameraOptions,
    identity: DeviceIdentity,
}

impl<D: CcdDriver> Camera<D> {
    /// Dispatch `prog_id`, bring the device up and apply `options`.
    pub fn connect<C>(
        connector: &C,
        prog_id: &str,
        unique_id: &str,
        options: CameraOptions,
    ) -> Result<Self>
    where
        C: DriverConnector<Driver = D>,
    {
        info!("Connecting to CCD '{unique_id}' via {prog_id}");

        let mut driver = connector.dispatch(prog_id)?;
        driver.set_unique_id(unique_id)?;
        driver.load()?;
        driver.open_communications()?;

        let mut conn = Connection { driver, open: true };
        conn.driver.initialize()?;
        thread::sleep(options.settle_time());

        let identity = legacy_init(&mut conn.driver)?;
        apply_options(&mut conn.driver, &options)?;

        info!(
            "CCD '{unique_id}' configured: {} readout values, {} s integration",
            options.area().readout_len(),
            options.integration_time_in_s
        );

        Ok(Self {
            conn,
            unique_id: unique_id.to_string(),
            options,
            identity,
        })
    }

    /// Expose the detector once and return the readout.
    ///
    /// Returns `Ok(None)` without touching the device further when it
    /// reports not ready; callers retry or give up.
    pub fn acquire(&mut self) -> Result<Option<Array1<f64>>> {
        let driver = &mut self.conn.driver;
        if !driver.ready_for_acquisition()? {
            warn!("CCD '{}' not ready for acquisition", self.unique_id);
            return Ok(None);
        }

        let integration = driver.integration_time()?;
        let poll = poll_interval(integration);
        let limit = wait_limit(integration, self.options.readout_timeout());

        driver.start_acquisition(true)?;
        let started = Instant::now();
        while driver.acquisition_busy()? {
            let waited = started.elapsed();
            if waited >= limit {
                return Err(Error::DeviceUnresponsive { waited });
            }
            thread::sleep(poll);
        }

        let raw = driver.raw_result()?;
        debug!(
            "CCD '{}' read {} values after {:?}",
            self.unique_id,
            raw.len(),
            started.elapsed()
        );
        Ok(Some(Array1::from_vec(raw)))
    }

    /// Integration time as the device currently holds it.
    pub fn integration_time(&self) -> Result<f64> {
        self.conn.driver.integration_time()
    }

    pub fn set_integration_time(&mut self, seconds: f64) -> Result<()> {
        self.conn.driver.set_integration_time(seconds)
    }

    /// Values per acquisition for the configured area.
    pub fn readout_len(&self) -> usize {
        self.options.area().readout_len()
    }

    pub fn options(&self) -> &CameraOptions {
        &self.options
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn driver(&self) -> &D {
        &self.conn.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.conn.driver
    }

    /// Close communications, reporting a failure instead of only logging it.
    pub fn close(self) -> Result<()> {
        let mut conn = self.conn;
        conn.open = false;
        info!("Closing CCD '{}'", self.unique_id);
        conn.driver.close_communications()
    }
}

/// Identity readout plus the fixed setup the device needs before the caller
/// options can be applied.
fn legacy_init<D: CcdDriver>(driver: &mut D) -> Result<DeviceIdentity> {
    let identity = DeviceIdentity {
        firmware_version: driver.firmware_version()?,
        description: driver.description()?,
        name: driver.name()?,
        chip_size: driver.chip_size()?,
    };
    info!(
        "CCD {} ({}), firmware {}, chip {}x{}",
        identity.name,
        identity.description,
        identity.firmware_version,
        identity.chip_size.0,
        identity.chip_size.1
    );

    driver.set_integration_time(LEGACY_INTEGRATION_TIME_S)?;
    driver.select_adc(LEGACY_ADC)?;
    driver.set_gain(LEGACY_GAIN)?;
    driver.define_acquisition_format(AcquisitionFormat::Image, 1)?;
    driver.define_area(&LEGACY_AREA)?;
    info!("CCD data size after legacy setup: {}", driver.data_size()?);
    driver.set_operating_mode(LEGACY_OPERATING_MODE, false)?;
    driver.set_accumulations(1)?;
    driver.set_acquisition_count(1)?;

    Ok(identity)
}

fn apply_options<D: CcdDriver>(driver: &mut D, options: &CameraOptions) -> Result<()> {
    driver.define_acquisition_format(options.acquisition_format, 1)?;
    driver.define_area(&options.area())?;
    if let Some(gain) = options.gain {
        driver.set_gain(gain)?;
    }
    driver.set_integration_time(options.integration_time_in_s)
}

/// Lesser of 10 ms and a tenth of the exposure.
fn poll_interval(integration_s: f64) -> Duration {
    seconds((integration_s / 10.0).min(MAX_POLL_INTERVAL_S))
}

/// Exposure plus readout allowance, saturating at `Duration::MAX`.
fn wait_limit(integration_s: f64, readout_timeout: Duration) -> Duration {
    seconds(integration_s)
        .checked_add(readout_timeout)
        .unwrap_or(Duration::MAX)
}
