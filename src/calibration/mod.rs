//! Disk-backed calibration cache with download-on-miss semantics.
//!
//! Records live under one directory per sensor name below a caller-owned
//! cache root, one raw binary file per field. A record is complete or
//! absent: any load failure (missing directory, missing file, wrong
//! length) is a cache miss that triggers exactly one full refetch from
//! the device followed by a persist. The cache root itself must already
//! exist; its absence is a configuration error, not a miss.

pub(crate) mod blob;
pub mod records;
pub mod store;

pub use records::{
    CalibrationRecord, ColorCalibration, DepthAhatCalibration, DepthLongThrowCalibration,
    GrayCalibration, ImuCalibration,
};
pub use store::{get_calibration, get_color_calibration, save_color_extrinsics};
