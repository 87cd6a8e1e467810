//! Stereo calibration and rectification between two grayscale cameras.
//!
//! Calibration is a pure application of the epipolar derivations in
//! [`crate::geometry::epipolar`] and is deterministic per ordered camera
//! pair. Rectification delegates the numerically heavy map synthesis to
//! OpenCV and precomputes full per-pixel maps once, so per-frame work is
//! a plain remap. Both results persist independently under
//! `<sensorNameA>.<sensorNameB>` using the same per-field binary dumps
//! as the calibration cache.

mod rectify;

use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::{Matrix3, Matrix3x4, Matrix4, RowVector3};

use crate::calibration::blob::{
    mat3_from_rows, mat3_to_rows, mat3x4_from_rows, mat3x4_to_rows, mat4_from_rows, mat4_to_rows,
    read_pod, write_pod,
};
use crate::error::Error;
use crate::geometry::epipolar::{
    essential, extrinsics_to_rt, fundamental, relative_extrinsics, skew_row,
};
use crate::geometry::lut::PixelMap;
use crate::geometry::transforms::image_to_camera;
use crate::sensors::SensorPort;

pub use rectify::compute_rectification;

/// Relative pose and epipolar matrices between two cameras.
#[derive(Debug, Clone, PartialEq)]
pub struct StereoCalibration {
    /// Rotation block of the camera-1 → camera-2 transform.
    pub rotation: Matrix3<f32>,
    /// Translation row of the same transform.
    pub translation: RowVector3<f32>,
    pub essential: Matrix3<f32>,
    pub fundamental: Matrix3<f32>,
}

/// Rectification rotations, projections, disparity-to-depth matrix,
/// valid regions and dense per-pixel resampling maps for a camera pair.
#[derive(Debug, Clone, PartialEq)]
pub struct StereoRectification {
    pub r1: Matrix3<f64>,
    pub r2: Matrix3<f64>,
    pub p1: Matrix3x4<f64>,
    pub p2: Matrix3x4<f64>,
    pub q: Matrix4<f64>,
    /// Valid pixel region `[x, y, width, height]` per rectified image.
    pub roi1: [i32; 4],
    pub roi2: [i32; 4],
    pub map1: PixelMap,
    pub map2: PixelMap,
}

/// Derive the stereo calibration for an ordered camera pair from their
/// individual intrinsics and rig extrinsics. Pure and deterministic.
///
/// A zero baseline produces an exactly zero essential matrix rather
/// than an error.
pub fn compute_calibration(
    intrinsics_1: &Matrix4<f32>,
    intrinsics_2: &Matrix4<f32>,
    extrinsics_1: &Matrix4<f32>,
    extrinsics_2: &Matrix4<f32>,
) -> StereoCalibration {
    let rel = relative_extrinsics(extrinsics_1, extrinsics_2);
    let (rotation, translation) = extrinsics_to_rt(&rel);
    let e = essential(&rotation, &skew_row(&translation));
    let f = fundamental(
        &image_to_camera(intrinsics_1).fixed_view::<3, 3>(0, 0).into_owned(),
        &image_to_camera(intrinsics_2).fixed_view::<3, 3>(0, 0).into_owned(),
        &e,
    );
    StereoCalibration {
        rotation,
        translation,
        essential: e,
        fundamental: f,
    }
}

// ============================================================================
// Persistence
// ============================================================================

fn check_cache_root(cache_root: &Path) -> Result<(), Error> {
    if cache_root.is_dir() {
        Ok(())
    } else {
        Err(Error::MissingCacheRoot(cache_root.to_path_buf()))
    }
}

fn pair_directory(cache_root: &Path, port_1: SensorPort, port_2: SensorPort) -> PathBuf {
    cache_root.join(format!("{}.{}", port_1.name(), port_2.name()))
}

pub fn save_calibration(
    port_1: SensorPort,
    port_2: SensorPort,
    calibration: &StereoCalibration,
    cache_root: &Path,
) -> Result<(), Error> {
    check_cache_root(cache_root)?;
    let dir = pair_directory(cache_root, port_1, port_2);
    fs::create_dir_all(&dir)?;
    write_pod(&dir.join("R.bin"), &mat3_to_rows(&calibration.rotation))?;
    write_pod(&dir.join("t.bin"), calibration.translation.as_slice())?;
    write_pod(&dir.join("E.bin"), &mat3_to_rows(&calibration.essential))?;
    write_pod(&dir.join("F.bin"), &mat3_to_rows(&calibration.fundamental))?;
    Ok(())
}

pub fn load_calibration(
    port_1: SensorPort,
    port_2: SensorPort,
    cache_root: &Path,
) -> Result<StereoCalibration, Error> {
    check_cache_root(cache_root)?;
    let dir = pair_directory(cache_root, port_1, port_2);
    let t = read_pod::<f32>(&dir.join("t.bin"), 3)?;
    Ok(StereoCalibration {
        rotation: mat3_from_rows(&read_pod::<f32>(&dir.join("R.bin"), 9)?),
        translation: RowVector3::new(t[0], t[1], t[2]),
        essential: mat3_from_rows(&read_pod::<f32>(&dir.join("E.bin"), 9)?),
        fundamental: mat3_from_rows(&read_pod::<f32>(&dir.join("F.bin"), 9)?),
    })
}

pub fn save_rectification(
    port_1: SensorPort,
    port_2: SensorPort,
    rectification: &StereoRectification,
    cache_root: &Path,
) -> Result<(), Error> {
    check_cache_root(cache_root)?;
    let dir = pair_directory(cache_root, port_1, port_2);
    fs::create_dir_all(&dir)?;
    write_pod(&dir.join("R1.bin"), &mat3_to_rows(&rectification.r1))?;
    write_pod(&dir.join("R2.bin"), &mat3_to_rows(&rectification.r2))?;
    write_pod(&dir.join("P1.bin"), &mat3x4_to_rows(&rectification.p1))?;
    write_pod(&dir.join("P2.bin"), &mat3x4_to_rows(&rectification.p2))?;
    write_pod(&dir.join("Q.bin"), &mat4_to_rows(&rectification.q))?;
    write_pod(&dir.join("roi1.bin"), &rectification.roi1)?;
    write_pod(&dir.join("roi2.bin"), &rectification.roi2)?;
    write_pod(&dir.join("map1.bin"), rectification.map1.as_flat())?;
    write_pod(&dir.join("map2.bin"), rectification.map2.as_flat())?;
    Ok(())
}

/// Load a persisted rectification; `map_size` is the `(width, height)`
/// of the rectified images, known from the sensor constants.
pub fn load_rectification(
    port_1: SensorPort,
    port_2: SensorPort,
    cache_root: &Path,
    map_size: (usize, usize),
) -> Result<StereoRectification, Error> {
    check_cache_root(cache_root)?;
    let dir = pair_directory(cache_root, port_1, port_2);
    let (width, height) = map_size;
    let load_map = |file: &str| -> Result<PixelMap, Error> {
        let flat = read_pod::<f32>(&dir.join(file), width * height * 2)?;
        PixelMap::from_flat(width, height, flat).ok_or_else(|| {
            Error::Cache(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{file}: shape mismatch"),
            ))
        })
    };

    let roi1 = read_pod::<i32>(&dir.join("roi1.bin"), 4)?;
    let roi2 = read_pod::<i32>(&dir.join("roi2.bin"), 4)?;
    Ok(StereoRectification {
        r1: mat3_from_rows(&read_pod::<f64>(&dir.join("R1.bin"), 9)?),
        r2: mat3_from_rows(&read_pod::<f64>(&dir.join("R2.bin"), 9)?),
        p1: mat3x4_from_rows(&read_pod::<f64>(&dir.join("P1.bin"), 12)?),
        p2: mat3x4_from_rows(&read_pod::<f64>(&dir.join("P2.bin"), 12)?),
        q: mat4_from_rows(&read_pod::<f64>(&dir.join("Q.bin"), 16)?),
        roi1: [roi1[0], roi1[1], roi1[2], roi1[3]],
        roi2: [roi2[0], roi2[1], roi2[2], roi2[3]],
        map1: load_map("map1.bin")?,
        map2: load_map("map2.bin")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn gray_intrinsics(fx: f32, fy: f32, cx: f32, cy: f32) -> Matrix4<f32> {
        let mut k = Matrix4::identity();
        k[(0, 0)] = fx;
        k[(1, 1)] = fy;
        k[(2, 0)] = cx;
        k[(2, 1)] = cy;
        k
    }

    fn rigid(axis_angle: Vector3<f32>, t: RowVector3<f32>) -> Matrix4<f32> {
        let r = nalgebra::Rotation3::new(axis_angle);
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&r.matrix().transpose());
        m.fixed_view_mut::<1, 3>(3, 0).copy_from(&t);
        m
    }

    #[test]
    fn test_identical_cameras_yield_identity_and_zero() {
        let k = gray_intrinsics(450.0, 450.0, 320.0, 240.0);
        let e = rigid(Vector3::new(0.1, 0.0, -0.2), RowVector3::new(0.3, 0.0, 0.0));
        let calib = compute_calibration(&k, &k, &e, &e);
        assert_relative_eq!(calib.rotation, Matrix3::identity(), epsilon = 1e-5);
        assert_relative_eq!(calib.translation, RowVector3::zeros(), epsilon = 1e-5);
        assert_relative_eq!(calib.essential, Matrix3::zeros(), epsilon = 1e-5);
    }

    #[test]
    fn test_calibration_persistence_round_trip() {
        let root = tempfile::tempdir().unwrap();
        let k1 = gray_intrinsics(450.0, 452.0, 318.0, 242.0);
        let k2 = gray_intrinsics(449.0, 451.0, 321.0, 238.0);
        let e1 = rigid(Vector3::new(0.0, 0.05, 0.0), RowVector3::new(-0.04, 0.0, 0.0));
        let e2 = rigid(Vector3::new(0.0, -0.05, 0.0), RowVector3::new(0.04, 0.0, 0.0));
        let calib = compute_calibration(&k1, &k2, &e1, &e2);

        save_calibration(
            SensorPort::GrayLeftFront,
            SensorPort::GrayRightFront,
            &calib,
            root.path(),
        )
        .unwrap();
        assert!(root
            .path()
            .join("gray_leftfront.gray_rightfront/F.bin")
            .exists());

        let loaded = load_calibration(
            SensorPort::GrayLeftFront,
            SensorPort::GrayRightFront,
            root.path(),
        )
        .unwrap();
        assert_eq!(loaded, calib);
    }

    #[test]
    fn test_rectification_persistence_round_trip() {
        let root = tempfile::tempdir().unwrap();
        let (width, height) = (8usize, 6usize);
        let rect = StereoRectification {
            r1: Matrix3::identity(),
            r2: Matrix3::identity(),
            p1: Matrix3x4::from_row_slice(&[
                400.0, 0.0, 160.0, 0.0, 0.0, 400.0, 120.0, 0.0, 0.0, 0.0, 1.0, 0.0,
            ]),
            p2: Matrix3x4::from_row_slice(&[
                400.0, 0.0, 160.0, -40.0, 0.0, 400.0, 120.0, 0.0, 0.0, 0.0, 1.0, 0.0,
            ]),
            q: Matrix4::identity(),
            roi1: [0, 0, 8, 6],
            roi2: [1, 0, 7, 6],
            map1: PixelMap::from_fn(width, height, |u, v| [u as f32, v as f32]),
            map2: PixelMap::from_fn(width, height, |u, v| [u as f32 + 0.5, v as f32]),
        };

        save_rectification(
            SensorPort::GrayLeftFront,
            SensorPort::GrayRightFront,
            &rect,
            root.path(),
        )
        .unwrap();
        let loaded = load_rectification(
            SensorPort::GrayLeftFront,
            SensorPort::GrayRightFront,
            root.path(),
            (width, height),
        )
        .unwrap();
        assert_eq!(loaded, rect);
    }

    #[test]
    fn test_missing_root_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let result = load_calibration(
            SensorPort::GrayLeftFront,
            SensorPort::GrayRightFront,
            &missing,
        );
        assert!(matches!(result, Err(Error::MissingCacheRoot(_))));
    }
}
