use rusty_scan::Error;
use rusty_scan::device::sim::CallLog;
use rusty_scan::device::{
    AcquisitionFormat, Camera, CameraOptions, DEFAULT_PROG_ID, SimulatedCcd, SimulatedConnector,
};

fn fast_options() -> CameraOptions {
    CameraOptions {
        integration_time_in_s: 0.01,
        settle_time_in_s: 0.0,
        readout_timeout_in_s: 0.2,
        ..CameraOptions::default()
    }
}

fn connect(prototype: SimulatedCcd) -> (Camera<SimulatedCcd>, CallLog) {
    let log = prototype.call_log();
    let connector = SimulatedConnector::new(prototype);
    let camera = Camera::connect(&connector, DEFAULT_PROG_ID, "CCD1", fast_options()).unwrap();
    log.lock().unwrap().clear();
    (camera, log)
}

fn count(log: &CallLog, op: &str) -> usize {
    log.lock().unwrap().iter().filter(|&&c| c == op).count()
}

#[test]
fn acquire_returns_one_full_readout() {
    let (mut camera, log) = connect(SimulatedCcd::new());

    let readout = camera.acquire().unwrap().expect("device is ready");
    assert_eq!(readout.len(), camera.readout_len());
    assert_eq!(readout.len(), 1600);
    assert_eq!(count(&log, "StartAcquisition"), 1);
    assert_eq!(count(&log, "GetResult"), 1);
}

#[test]
fn not_ready_skips_acquisition() {
    let (mut camera, log) = connect(SimulatedCcd::new());
    camera.driver_mut().set_ready(false);

    assert!(camera.acquire().unwrap().is_none());
    assert_eq!(count(&log, "ReadyForAcquisition"), 1);
    assert_eq!(count(&log, "StartAcquisition"), 0);
    assert_eq!(count(&log, "GetResult"), 0);
}

#[test]
fn stalled_device_times_out() {
    let (mut camera, log) = connect(SimulatedCcd::new());
    camera.driver_mut().set_stalled(true);

    match camera.acquire() {
        Err(Error::DeviceUnresponsive { waited }) => {
            assert!(waited.as_secs_f64() >= 0.2);
        }
        other => panic!("expected DeviceUnresponsive, got {other:?}"),
    }
    assert_eq!(count(&log, "GetResult"), 0);
}

#[test]
fn options_are_applied_after_legacy_setup() {
    let prototype = SimulatedCcd::new();
    let log = prototype.call_log();
    let connector = SimulatedConnector::new(prototype);
    let options = CameraOptions {
        gain: Some(2),
        ..fast_options()
    };
    let camera = Camera::connect(&connector, DEFAULT_PROG_ID, "CCD1", options).unwrap();

    assert_eq!(camera.driver().gain(), 2);
    assert_eq!(camera.driver().format(), AcquisitionFormat::Scan);
    assert_eq!(camera.integration_time().unwrap(), 0.01);

    let calls = log.lock().unwrap().clone();
    let formats: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == "DefineAcquisitionFormat")
        .map(|(i, _)| i)
        .collect();
    assert_eq!(formats.len(), 2);
    let accumulations = calls.iter().position(|c| *c == "NumberOfAccumulations").unwrap();
    assert!(formats[1] > accumulations);
}

#[test]
fn integration_time_setter_reaches_device() {
    let (mut camera, _log) = connect(SimulatedCcd::new());
    camera.set_integration_time(0.02).unwrap();
    assert_eq!(camera.integration_time().unwrap(), 0.02);
}

#[test]
fn failed_initialization_closes_communications() {
    let prototype = SimulatedCcd::new().fail_on("GetChipSize");
    let log = prototype.call_log();
    let connector = SimulatedConnector::new(prototype);

    let result = Camera::connect(&connector, DEFAULT_PROG_ID, "CCD1", fast_options());
    assert!(matches!(result, Err(Error::Driver { operation: "GetChipSize", .. })));
    assert_eq!(count(&log, "CloseCommunications"), 1);
}

#[test]
fn unknown_prog_id_is_reported() {
    let connector = SimulatedConnector::new(SimulatedCcd::new());
    let result = Camera::connect(&connector, "Other.Driver", "CCD1", fast_options());
    assert!(matches!(result, Err(Error::DriverNotFound(id)) if id == "Other.Driver"));
}

#[test]
fn dropping_the_camera_closes_communications() {
    let (camera, log) = connect(SimulatedCcd::new());
    drop(camera);
    assert_eq!(count(&log, "CloseCommunications"), 1);
}

#[test]
fn explicit_close_closes_once() {
    let (camera, log) = connect(SimulatedCcd::new());
    camera.close().unwrap();
    assert_eq!(count(&log, "CloseCommunications"), 1);
}

#[test]
fn huge_readout_timeout_still_acquires() {
    let prototype = SimulatedCcd::new();
    let connector = SimulatedConnector::new(prototype);
    let options = CameraOptions {
        readout_timeout_in_s: 1e20,
        ..fast_options()
    };
    let mut camera = Camera::connect(&connector, DEFAULT_PROG_ID, "CCD1", options).unwrap();

    let readout = camera.acquire().unwrap().expect("device is ready");
    assert_eq!(readout.len(), camera.readout_len());
}
