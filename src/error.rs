//! Crate-level error taxonomy.
//!
//! Calibration-cache load failures never appear here: any load problem
//! is treated as a cache miss and resolved by refetching from the
//! device. What does surface is a missing cache root (a configuration
//! error the caller must fix), device communication failures, and I/O
//! errors while persisting a freshly fetched record.

use std::path::PathBuf;

use thiserror::Error;

use crate::device::DeviceError;

#[derive(Debug, Error)]
pub enum Error {
    /// The calibration cache root does not exist. The caller must create
    /// it; this is never retried or repaired automatically.
    #[error("calibration cache root {0} does not exist")]
    MissingCacheRoot(PathBuf),

    /// Device communication failure, propagated unmodified.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Cache I/O failure outside the load-or-fetch fallback: persisting
    /// a fetched record, or reading an explicitly requested hand-eye
    /// extrinsic that was never saved.
    #[error("calibration cache i/o: {0}")]
    Cache(#[from] std::io::Error),

    /// Failure inside an external vision routine (rectification).
    #[error(transparent)]
    Vision(#[from] opencv::Error),
}
