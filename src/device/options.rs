use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Options;
use crate::device::driver::{AcquisitionFormat, Area};

/// Camera configuration applied after the legacy initialization sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraOptions {
    pub acquisition_format: AcquisitionFormat,
    pub integration_time_in_s: f64,
    pub area_num: u32,
    pub x_origin: u32,
    pub y_origin: u32,
    pub x_size: u32,
    pub y_size: u32,
    pub x_bin: u32,
    pub y_bin: u32,
    /// Left at the legacy value when unset.
    pub gain: Option<i32>,
    /// Pause after `Initialize` before the device accepts configuration.
    pub settle_time_in_s: f64,
    /// Allowed time past the exposure for the busy flag to clear.
    pub readout_timeout_in_s: f64,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            acquisition_format: AcquisitionFormat::Scan,
            integration_time_in_s: 5.0,
            area_num: 1,
            x_origin: 1,
            y_origin: 1,
            x_size: 1600,
            y_size: 200,
            x_bin: 1,
            y_bin: 200,
            gain: None,
            settle_time_in_s: 3.0,
            readout_timeout_in_s: 30.0,
        }
    }
}

impl Options for CameraOptions {}

impl CameraOptions {
    pub fn area(&self) -> Area {
        Area {
            number: self.area_num,
            x_origin: self.x_origin,
            y_origin: self.y_origin,
            x_size: self.x_size,
            y_size: self.y_size,
            x_bin: self.x_bin,
            y_bin: self.y_bin,
        }
    }

    pub fn settle_time(&self) -> Duration {
        seconds(self.settle_time_in_s)
    }

    pub fn readout_timeout(&self) -> Duration {
        seconds(self.readout_timeout_in_s)
    }
}

/// Non-positive and NaN give zero; values past `Duration::MAX` saturate.
pub(crate) fn seconds(value: f64) -> Duration {
    if value > 0.0 {
        Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Overrides;
    use serde_json::json;

    #[test]
    fn test_defaults_describe_full_vertical_binning() {
        let opts = CameraOptions::default();
        assert_eq!(opts.area().readout_len(), 1600);
        assert_eq!(opts.acquisition_format, AcquisitionFormat::Scan);
        assert!(opts.gain.is_none());
    }

    #[test]
    fn test_overrides_merge_over_defaults() {
        let mut overrides = Overrides::new();
        overrides.insert("x_size".into(), json!(1024));
        overrides.insert("gain".into(), json!(2));
        overrides.insert("acquisition_format".into(), json!("image"));

        let opts = CameraOptions::with_overrides(&overrides).unwrap();
        assert_eq!(opts.x_size, 1024);
        assert_eq!(opts.gain, Some(2));
        assert_eq!(opts.acquisition_format, AcquisitionFormat::Image);
        assert_eq!(opts.y_bin, 200);
        assert_eq!(opts.integration_time_in_s, 5.0);
    }

    #[test]
    fn test_huge_waits_saturate() {
        let opts = CameraOptions {
            settle_time_in_s: 1e20,
            readout_timeout_in_s: f64::INFINITY,
            ..CameraOptions::default()
        };
        assert_eq!(opts.settle_time(), Duration::MAX);
        assert_eq!(opts.readout_timeout(), Duration::MAX);
    }

    #[test]
    fn test_negative_and_nan_waits_are_zero() {
        let opts = CameraOptions {
            settle_time_in_s: -1.0,
            readout_timeout_in_s: f64::NAN,
            ..CameraOptions::default()
        };
        assert_eq!(opts.settle_time(), Duration::ZERO);
        assert_eq!(opts.readout_timeout(), Duration::ZERO);
    }
}
