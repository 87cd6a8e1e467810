//! Calibration corrections for sensor mounting and mirroring.
//!
//! The grayscale cameras are mounted sideways: presenting their images
//! upright requires a ±90° rotation, and the calibration must be rotated
//! analytically so that projecting into the rotated image from the
//! rotated calibration reproduces exactly rotating the unrotated
//! projection. The color camera additionally ships mirrored and needs a
//! one-time fix-up at calibration load.

use nalgebra::Matrix4;

use crate::sensors::{MountRotation, GRAY_HEIGHT, GRAY_WIDTH};

/// Rotate a grayscale intrinsic matrix to match an upright image.
///
/// Focal lengths swap; the principal point moves to
/// `(H-1-cy, cx)` for clockwise and `(cy, W-1-cx)` for
/// counter-clockwise rotation.
#[rustfmt::skip]
pub fn rotate_gray_intrinsics(intrinsics: &Matrix4<f32>, rotation: MountRotation) -> Matrix4<f32> {
    let rw = (GRAY_WIDTH - 1) as f32;
    let bh = (GRAY_HEIGHT - 1) as f32;

    let fx = intrinsics[(0, 0)];
    let fy = intrinsics[(1, 1)];
    let cx = intrinsics[(2, 0)];
    let cy = intrinsics[(2, 1)];

    match rotation {
        MountRotation::Clockwise90 => Matrix4::new(
            fy,      0.0, 0.0, 0.0,
            0.0,     fx,  0.0, 0.0,
            bh - cy, cx,  1.0, 0.0,
            0.0,     0.0, 0.0, 1.0,
        ),
        MountRotation::CounterClockwise90 => Matrix4::new(
            fy,  0.0,     0.0, 0.0,
            0.0, fx,      0.0, 0.0,
            cy,  rw - cx, 1.0, 0.0,
            0.0, 0.0,     0.0, 1.0,
        ),
    }
}

/// Rotate grayscale extrinsics by folding the in-plane image rotation
/// into the camera frame.
#[rustfmt::skip]
pub fn rotate_gray_extrinsics(extrinsics: &Matrix4<f32>, rotation: MountRotation) -> Matrix4<f32> {
    let block = match rotation {
        MountRotation::Clockwise90 => Matrix4::new(
            0.0, 1.0, 0.0, 0.0,
            -1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ),
        MountRotation::CounterClockwise90 => Matrix4::new(
            0.0, -1.0, 0.0, 0.0,
            1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ),
    };
    extrinsics * block
}

/// Rotate a grayscale `(intrinsics, extrinsics)` pair together.
pub fn rotate_gray_calibration(
    intrinsics: &Matrix4<f32>,
    extrinsics: &Matrix4<f32>,
    rotation: MountRotation,
) -> (Matrix4<f32>, Matrix4<f32>) {
    (
        rotate_gray_intrinsics(intrinsics, rotation),
        rotate_gray_extrinsics(extrinsics, rotation),
    )
}

/// One-time fix-up for the color camera's mirroring convention: negate
/// the horizontal focal length and fold a 180° rotation about X into the
/// extrinsics. Applied once at calibration load, not per frame.
#[rustfmt::skip]
pub fn fix_color_calibration(
    intrinsics: &Matrix4<f32>,
    extrinsics: &Matrix4<f32>,
) -> (Matrix4<f32>, Matrix4<f32>) {
    let flip = Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, -1.0, 0.0, 0.0,
        0.0, 0.0, -1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    );
    let mut fixed = *intrinsics;
    fixed[(0, 0)] = -fixed[(0, 0)];
    (fixed, extrinsics * flip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::transforms::project_point;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn gray_intrinsics() -> Matrix4<f32> {
        let mut k = Matrix4::identity();
        k[(0, 0)] = 450.0;
        k[(1, 1)] = 455.0;
        k[(2, 0)] = 315.0;
        k[(2, 1)] = 245.0;
        k
    }

    /// Projecting through the rotated pair must agree with rotating the
    /// unrotated projection by the same image rotation.
    #[test]
    fn test_rotation_consistency_clockwise() {
        let k = gray_intrinsics();
        let e = Matrix4::identity();
        let (k_rot, e_rot) = rotate_gray_calibration(&k, &e, MountRotation::Clockwise90);

        let p = Point3::new(0.2f32, -0.1, 1.5);
        let pixel = project_point(&p, &k);

        // Clockwise image rotation: (u, v) -> (H-1-v, u).
        let expected_u = (GRAY_HEIGHT - 1) as f32 - pixel.y;
        let expected_v = pixel.x;

        let p_rot = crate::geometry::transforms::transform_point(&p, &e_rot);
        let pixel_rot = project_point(&p_rot, &k_rot);

        assert_relative_eq!(pixel_rot.x, expected_u, epsilon = 1e-3);
        assert_relative_eq!(pixel_rot.y, expected_v, epsilon = 1e-3);
    }

    #[test]
    fn test_rotation_consistency_counter_clockwise() {
        let k = gray_intrinsics();
        let e = Matrix4::identity();
        let (k_rot, e_rot) = rotate_gray_calibration(&k, &e, MountRotation::CounterClockwise90);

        let p = Point3::new(-0.15f32, 0.25, 2.0);
        let pixel = project_point(&p, &k);

        // Counter-clockwise image rotation: (u, v) -> (v, W-1-u).
        let expected_u = pixel.y;
        let expected_v = (GRAY_WIDTH - 1) as f32 - pixel.x;

        let p_rot = crate::geometry::transforms::transform_point(&p, &e_rot);
        let pixel_rot = project_point(&p_rot, &k_rot);

        assert_relative_eq!(pixel_rot.x, expected_u, epsilon = 1e-3);
        assert_relative_eq!(pixel_rot.y, expected_v, epsilon = 1e-3);
    }

    #[test]
    fn test_color_fixup_negates_fx_and_stays_rigid() {
        let mut k = Matrix4::<f32>::identity();
        k[(0, 0)] = 600.0;
        k[(1, 1)] = 600.0;
        let e = Matrix4::identity();

        let (k_fixed, e_fixed) = fix_color_calibration(&k, &e);
        assert_eq!(k_fixed[(0, 0)], -600.0);

        // 180° about X keeps the transform rigid.
        let block = e_fixed.fixed_view::<3, 3>(0, 0);
        assert_relative_eq!(
            (block * block.transpose()),
            nalgebra::Matrix3::identity(),
            epsilon = 1e-6
        );
    }
}
