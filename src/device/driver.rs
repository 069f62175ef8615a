use serde::{Deserialize, Serialize};

use crate::error::Result;

// ---------------------------------------------------------------------------
// Vendor value types
// ---------------------------------------------------------------------------

/// Readout layout passed to `DefineAcquisitionFormat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquisitionFormat {
    /// Full 2D image readout.
    Image,
    /// Binned spectrum ("scan") readout.
    #[default]
    Scan,
}

impl AcquisitionFormat {
    /// Integer code the automation layer expects.
    pub fn code(self) -> i32 {
        match self {
            AcquisitionFormat::Image => 0,
            AcquisitionFormat::Scan => 1,
        }
    }
}

/// Active detector region, 1-based origin as the driver counts pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Area {
    pub number: u32,
    pub x_origin: u32,
    pub y_origin: u32,
    pub x_size: u32,
    pub y_size: u32,
    pub x_bin: u32,
    pub y_bin: u32,
}

impl Area {
    /// Number of values one readout of this area produces.
    pub fn readout_len(&self) -> usize {
        let columns = self.x_size / self.x_bin.max(1);
        let rows = self.y_size / self.y_bin.max(1);
        columns as usize * rows as usize
    }
}

/// Identity fields read during the legacy initialization sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub firmware_version: String,
    pub description: String,
    pub name: String,
    pub chip_size: (u32, u32),
}

// ---------------------------------------------------------------------------
// Automation seams
// ---------------------------------------------------------------------------

/// Operation set of a CCD exposed through the vendor automation interface.
///
/// Implementations bind these calls to whatever native interop the platform
/// offers; nothing outside the implementation sees that mechanism.
pub trait CcdDriver {
    fn set_unique_id(&mut self, unique_id: &str) -> Result<()>;
    fn load(&mut self) -> Result<()>;
    fn open_communications(&mut self) -> Result<()>;
    fn initialize(&mut self) -> Result<()>;
    fn close_communications(&mut self) -> Result<()>;

    fn firmware_version(&self) -> Result<String>;
    fn description(&self) -> Result<String>;
    fn name(&self) -> Result<String>;
    fn chip_size(&self) -> Result<(u32, u32)>;
    /// Size of the buffer the current format and area produce.
    fn data_size(&self) -> Result<usize>;

    /// Live integration time register, in seconds.
    fn integration_time(&self) -> Result<f64>;
    fn set_integration_time(&mut self, seconds: f64) -> Result<()>;
    fn set_gain(&mut self, gain: i32) -> Result<()>;
    fn select_adc(&mut self, adc: i32) -> Result<()>;
    fn define_acquisition_format(&mut self, format: AcquisitionFormat, areas: u32)
        -> Result<()>;
    fn define_area(&mut self, area: &Area) -> Result<()>;
    fn set_operating_mode(&mut self, mode: i32, enabled: bool) -> Result<()>;
    fn set_accumulations(&mut self, count: u32) -> Result<()>;
    fn set_acquisition_count(&mut self, count: u32) -> Result<()>;

    fn ready_for_acquisition(&self) -> Result<bool>;
    fn start_acquisition(&mut self, open_shutter: bool) -> Result<()>;
    fn acquisition_busy(&self) -> Result<bool>;
    /// Raw data of the first data object of the last result.
    fn raw_result(&mut self) -> Result<Vec<f64>>;
}

/// Resolves an automation program id to a driver instance.
pub trait DriverConnector {
    type Driver: CcdDriver;

    fn dispatch(&self, prog_id: &str) -> Result<Self::Driver>;
}
