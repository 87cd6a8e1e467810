//! Stateless geometric primitives: homogeneous conversions, named frame
//! conversions, point/ray transforms and projection, per-sensor rotation
//! and mirroring corrections, and epipolar derivations.
//!
//! # Matrix convention
//!
//! Every 4x4 transform in this crate uses the **row-vector** convention:
//! a point `p` (a row) maps through `M` as `p' = p · M`. Rotation lives in
//! the upper-left 3x3 block and translation in the fourth **row**. The one
//! place a transpose to the column-vector convention is required is the
//! OpenCV boundary in [`crate::stereo`], documented there.
//!
//! All functions here are pure and callable from any thread.

pub mod epipolar;
pub mod lut;
pub mod rotation;
pub mod transforms;

pub use lut::PixelMap;
pub use transforms::{project, project_point, transform, transform_point};
