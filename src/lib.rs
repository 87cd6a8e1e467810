//! Geometry and caching subsystem for a mixed-reality device client.
//!
//! Turns raw per-sensor calibration blobs and live spatial-mapping surfaces
//! into query-ready structures:
//!
//! - [`geometry`] — stateless coordinate-frame transform pipeline,
//! - [`calibration`] — disk-backed calibration cache with download-on-miss,
//! - [`stereo`] — stereo calibration and rectification between the
//!   grayscale cameras,
//! - [`surface`] — incremental spatial-surface cache with per-surface
//!   ray-intersection structures and batched nearest-distance queries.
//!
//! The device itself (network transport, wire encoding, tracking) sits
//! behind the collaborator traits in [`device`].

pub mod calibration;
pub mod device;
pub mod error;
pub mod geometry;
pub mod sensors;
pub mod stereo;
pub mod surface;

pub use error::Error;
