//! Load-or-fetch-and-persist calibration cache.
//!
//! `get_*` first attempts a complete load from
//! `<cache_root>/<sensor_name>/`; any failure at all is a cache miss
//! that triggers one full download from the device, a persist, and the
//! downloaded record as result. There is no partial reuse: a miss always
//! refetches the entire record. The cache root must already exist —
//! creating it is the caller's responsibility.
//!
//! Concurrent first-time writes to the same path are an accepted benign
//! race: content is idempotent, last write wins.

use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::Matrix4;
use tracing::debug;

use crate::calibration::blob::{mat4_from_rows, mat4_to_rows, read_pod, write_pod};
use crate::calibration::records::{CalibrationRecord, ColorCalibration};
use crate::device::DeviceClient;
use crate::error::Error;
use crate::sensors::{ColorProfile, SensorPort};

const HAND_EYE_FILE: &str = "extrinsics.bin";

fn check_cache_root(cache_root: &Path) -> Result<(), Error> {
    if cache_root.is_dir() {
        Ok(())
    } else {
        Err(Error::MissingCacheRoot(cache_root.to_path_buf()))
    }
}

fn sensor_directory(cache_root: &Path, port: SensorPort) -> PathBuf {
    cache_root.join(port.name())
}

/// Load the calibration record for a non-color sensor, downloading and
/// persisting it on any cache miss.
pub fn get_calibration<C: DeviceClient>(
    client: &mut C,
    port: SensorPort,
    cache_root: &Path,
) -> Result<CalibrationRecord, Error> {
    check_cache_root(cache_root)?;
    let dir = sensor_directory(cache_root, port);

    match CalibrationRecord::load(port, &dir) {
        Ok(record) => Ok(record),
        Err(err) => {
            debug!(sensor = %port, %err, "calibration cache miss, downloading");
            let record = client.download_calibration(port)?;
            fs::create_dir_all(&dir)?;
            record.save(&dir)?;
            Ok(record)
        }
    }
}

/// Load the color-camera calibration for a capture profile, downloading
/// and persisting on a miss.
///
/// The record nests under `<root>/<sensor>/<focus>_<width>_<height>/`.
/// When `load_extrinsics` is set, the separately persisted hand-eye
/// extrinsics are read from the sensor's own directory (profile
/// independent) and merged into the returned record; asking for
/// extrinsics that were never saved is an error.
pub fn get_color_calibration<C: DeviceClient>(
    client: &mut C,
    profile: &ColorProfile,
    cache_root: &Path,
    load_extrinsics: bool,
) -> Result<ColorCalibration, Error> {
    check_cache_root(cache_root)?;
    let sensor_dir = sensor_directory(cache_root, SensorPort::Color);
    let profile_dir = sensor_dir.join(profile.directory_name());

    let extrinsics = if load_extrinsics {
        let rows = read_pod::<f32>(&sensor_dir.join(HAND_EYE_FILE), 16)?;
        Some(mat4_from_rows(&rows))
    } else {
        None
    };

    let mut record = match ColorCalibration::load(&profile_dir) {
        Ok(record) => record,
        Err(err) => {
            debug!(profile = %profile.directory_name(), %err, "color calibration cache miss, downloading");
            let record = client.download_color_calibration(profile)?;
            fs::create_dir_all(&profile_dir)?;
            record.save(&profile_dir)?;
            record
        }
    };
    record.extrinsics = extrinsics;
    Ok(record)
}

/// Persist the color camera's hand-eye extrinsics, profile independent.
pub fn save_color_extrinsics(extrinsics: &Matrix4<f32>, cache_root: &Path) -> Result<(), Error> {
    check_cache_root(cache_root)?;
    let dir = sensor_directory(cache_root, SensorPort::Color);
    fs::create_dir_all(&dir)?;
    write_pod(&dir.join(HAND_EYE_FILE), &mat4_to_rows(extrinsics))?;
    Ok(())
}
