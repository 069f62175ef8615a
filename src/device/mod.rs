/// Device adapter: CCD camera behind a vendor automation interface.
///
/// Architecture:
/// ```text
///   DriverConnector::dispatch(prog_id)
///        │
///        ▼
///   ┌───────────┐
///   │ CcdDriver │  opaque vendor operation set (or SimulatedCcd)
///   └───────────┘
///        │
///        ▼
///   ┌───────────┐
///   │  Camera   │  legacy init, options, bounded acquire, scoped close
///   └───────────┘
/// ```

pub mod camera;
pub mod driver;
pub mod options;
pub mod sim;

pub use camera::Camera;
pub use driver::{AcquisitionFormat, Area, CcdDriver, DeviceIdentity, DriverConnector};
pub use options::CameraOptions;
pub use sim::{SimulatedCcd, SimulatedConnector};

/// Automation program id of the vendor multichannel CCD driver.
pub const DEFAULT_PROG_ID: &str = "JYCCD.JYMCD.1";
/// Program id served only by the simulated driver.
pub const SIMULATED_PROG_ID: &str = "Simulated.CCD";
/// Unique id the vendor configuration assigns to the first CCD.
pub const DEFAULT_UNIQUE_ID: &str = "CCD1";
