//! Epipolar derivations between two cameras on the same rig.
//!
//! All matrices follow the crate-wide row-vector convention, so the
//! skew-symmetric form and the epipolar constraint are the transposes of
//! their textbook column-vector counterparts: for pixel rows `u1`, `u2`
//! of the same world point, `u1 · F · u2ᵀ = 0`.

use nalgebra::{Matrix3, Matrix4, RealField, RowVector3};

use super::transforms::{camera_to_rignode, rignode_to_camera};

/// Relative extrinsics mapping camera-1 coordinates into camera 2:
/// `camera_to_rignode(E1) · rignode_to_camera(E2)`.
pub fn relative_extrinsics<T: RealField + Copy>(
    extrinsics_1: &Matrix4<T>,
    extrinsics_2: &Matrix4<T>,
) -> Matrix4<T> {
    camera_to_rignode(extrinsics_1) * rignode_to_camera(extrinsics_2)
}

/// Split a rigid row-vector transform into its rotation block and
/// translation row.
pub fn extrinsics_to_rt<T: RealField + Copy>(
    extrinsics: &Matrix4<T>,
) -> (Matrix3<T>, RowVector3<T>) {
    (
        extrinsics.fixed_view::<3, 3>(0, 0).into_owned(),
        extrinsics.fixed_view::<1, 3>(3, 0).into_owned(),
    )
}

/// Skew-symmetric form of a translation row in the row-vector
/// convention (the transpose of the usual `[t]×`).
#[rustfmt::skip]
pub fn skew_row<T: RealField + Copy>(t: &RowVector3<T>) -> Matrix3<T> {
    let zero = T::zero();
    Matrix3::new(
        zero,  t[2], -t[1],
        -t[2], zero,  t[0],
        t[1], -t[0],  zero,
    )
}

/// Essential matrix `E = R · [t]` for the row-vector convention.
///
/// A zero baseline yields an exactly zero matrix; that degeneracy is
/// left to the caller, not raised.
#[inline]
pub fn essential<T: RealField + Copy>(r: &Matrix3<T>, t_skew: &Matrix3<T>) -> Matrix3<T> {
    r * t_skew
}

/// Fundamental matrix `F = K1⁻¹ · E · K2⁻ᵀ` from the 3x3 blocks of each
/// camera's inverse intrinsics.
#[inline]
pub fn fundamental<T: RealField + Copy>(
    inv_k1: &Matrix3<T>,
    inv_k2: &Matrix3<T>,
    e: &Matrix3<T>,
) -> Matrix3<T> {
    inv_k1 * e * inv_k2.transpose()
}
