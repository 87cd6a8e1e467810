//! Rectification map synthesis via OpenCV.
//!
//! This is the one place the crate crosses into OpenCV's column-vector
//! convention: intrinsics and the relative pose are transposed on the
//! way in, and the returned rotations, projections and
//! disparity-to-depth matrix are kept exactly as OpenCV produced them
//! (column convention). The per-pixel maps are convention free — each
//! destination pixel stores the source pixel to sample.

use nalgebra::{Matrix3, Matrix3x4, Matrix4, RowVector3};
use opencv::calib3d;
use opencv::core::{Mat, Rect, Size, CV_32FC1};
use opencv::prelude::*;

use crate::error::Error;
use crate::geometry::lut::PixelMap;

use super::StereoRectification;

fn camera_matrix(intrinsics: &Matrix4<f32>) -> opencv::Result<Mat> {
    // Row-convention intrinsics transpose into the usual 3x3 K.
    Mat::from_slice_2d(&[
        [f64::from(intrinsics[(0, 0)]), 0.0, f64::from(intrinsics[(2, 0)])],
        [0.0, f64::from(intrinsics[(1, 1)]), f64::from(intrinsics[(2, 1)])],
        [0.0, 0.0, 1.0],
    ])
}

fn mat_to_matrix3(m: &Mat) -> opencv::Result<Matrix3<f64>> {
    let mut out = Matrix3::zeros();
    for r in 0..3 {
        for c in 0..3 {
            out[(r, c)] = *m.at_2d::<f64>(r as i32, c as i32)?;
        }
    }
    Ok(out)
}

fn mat_to_matrix3x4(m: &Mat) -> opencv::Result<Matrix3x4<f64>> {
    let mut out = Matrix3x4::zeros();
    for r in 0..3 {
        for c in 0..4 {
            out[(r, c)] = *m.at_2d::<f64>(r as i32, c as i32)?;
        }
    }
    Ok(out)
}

fn mat_to_matrix4(m: &Mat) -> opencv::Result<Matrix4<f64>> {
    let mut out = Matrix4::zeros();
    for r in 0..4 {
        for c in 0..4 {
            out[(r, c)] = *m.at_2d::<f64>(r as i32, c as i32)?;
        }
    }
    Ok(out)
}

fn mat_to_pixel_map(x: &Mat, y: &Mat, width: usize, height: usize) -> opencv::Result<PixelMap> {
    let xs = x.data_typed::<f32>()?;
    let ys = y.data_typed::<f32>()?;
    Ok(PixelMap::from_fn(width, height, |u, v| {
        let i = v * width + u;
        [xs[i], ys[i]]
    }))
}

/// Compute the rectification for a camera pair from its row-convention
/// intrinsics and camera-1 → camera-2 rotation and translation, at the
/// cameras' shared `(width, height)` resolution.
///
/// Principal rays are aligned (zero disparity at infinity) and no
/// cropping is applied, so the full original field of view survives
/// into the rectified images.
pub fn compute_rectification(
    intrinsics_1: &Matrix4<f32>,
    intrinsics_2: &Matrix4<f32>,
    rotation: &Matrix3<f32>,
    translation: &RowVector3<f32>,
    image_size: (usize, usize),
) -> Result<StereoRectification, Error> {
    let (width, height) = image_size;
    let size = Size::new(width as i32, height as i32);

    let k1 = camera_matrix(intrinsics_1)?;
    let k2 = camera_matrix(intrinsics_2)?;
    let no_distortion = Mat::default();

    // Column convention: transpose the rotation, stand the row up.
    let r = rotation.map(f64::from).transpose();
    let r = Mat::from_slice_2d(&[
        [r[(0, 0)], r[(0, 1)], r[(0, 2)]],
        [r[(1, 0)], r[(1, 1)], r[(1, 2)]],
        [r[(2, 0)], r[(2, 1)], r[(2, 2)]],
    ])?;
    let t = Mat::from_slice_2d(&[
        [f64::from(translation[0])],
        [f64::from(translation[1])],
        [f64::from(translation[2])],
    ])?;

    let mut r1 = Mat::default();
    let mut r2 = Mat::default();
    let mut p1 = Mat::default();
    let mut p2 = Mat::default();
    let mut q = Mat::default();
    let mut roi1 = Rect::default();
    let mut roi2 = Rect::default();
    calib3d::stereo_rectify(
        &k1,
        &no_distortion,
        &k2,
        &no_distortion,
        size,
        &r,
        &t,
        &mut r1,
        &mut r2,
        &mut p1,
        &mut p2,
        &mut q,
        calib3d::CALIB_ZERO_DISPARITY,
        -1.0,
        Size::new(0, 0),
        &mut roi1,
        &mut roi2,
    )?;

    let mut map1_x = Mat::default();
    let mut map1_y = Mat::default();
    let mut map2_x = Mat::default();
    let mut map2_y = Mat::default();
    calib3d::init_undistort_rectify_map(
        &k1,
        &no_distortion,
        &r1,
        &p1,
        size,
        CV_32FC1,
        &mut map1_x,
        &mut map1_y,
    )?;
    calib3d::init_undistort_rectify_map(
        &k2,
        &no_distortion,
        &r2,
        &p2,
        size,
        CV_32FC1,
        &mut map2_x,
        &mut map2_y,
    )?;

    Ok(StereoRectification {
        r1: mat_to_matrix3(&r1)?,
        r2: mat_to_matrix3(&r2)?,
        p1: mat_to_matrix3x4(&p1)?,
        p2: mat_to_matrix3x4(&p2)?,
        q: mat_to_matrix4(&q)?,
        roi1: [roi1.x, roi1.y, roi1.width, roi1.height],
        roi2: [roi2.x, roi2.y, roi2.width, roi2.height],
        map1: mat_to_pixel_map(&map1_x, &map1_y, width, height)?,
        map2: mat_to_pixel_map(&map2_x, &map2_y, width, height)?,
    })
}
