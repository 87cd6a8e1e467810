//! Homogeneous conversions, point transforms and the named frame
//! conversions between image, camera, rignode and world frames.
//!
//! Functions are generic over the scalar so the same entry points serve
//! `f32` calibration data and `f64` world-space math.

use nalgebra::{Matrix4, Point2, Point3, RealField, RowVector3, Vector3, Vector4};

use crate::geometry::lut::PixelMap;
use crate::sensors::DEPTH_RAW_MAX;

// ============================================================================
// Homogeneous coordinates
// ============================================================================

/// Append a unit homogeneous component to a point.
#[inline]
pub fn to_homogeneous<T: RealField + Copy>(p: &Point3<T>) -> Vector4<T> {
    Vector4::new(p.x, p.y, p.z, T::one())
}

/// Strip the homogeneous component with a perspective divide.
#[inline]
pub fn to_inhomogeneous<T: RealField + Copy>(v: &Vector4<T>) -> Point3<T> {
    Point3::new(v.x / v.w, v.y / v.w, v.z / v.w)
}

// ============================================================================
// Row-vector transforms
// ============================================================================

/// Apply the 3x3 block and translation row of a 4x4 affine matrix to a
/// single point: `p' = p · M[:3,:3] + M[3,:3]`.
#[inline]
pub fn transform_point<T: RealField + Copy>(p: &Point3<T>, m: &Matrix4<T>) -> Point3<T> {
    let row = RowVector3::new(p.x, p.y, p.z);
    let mapped = row * m.fixed_view::<3, 3>(0, 0) + m.fixed_view::<1, 3>(3, 0);
    Point3::new(mapped[0], mapped[1], mapped[2])
}

/// Batched [`transform_point`].
pub fn transform<T: RealField + Copy>(points: &[Point3<T>], m: &Matrix4<T>) -> Vec<Point3<T>> {
    points.iter().map(|p| transform_point(p, m)).collect()
}

/// Transform a point and perform the perspective divide, yielding pixel
/// coordinates when `m` is an intrinsic (or composed projection) matrix.
#[inline]
pub fn project_point<T: RealField + Copy>(p: &Point3<T>, m: &Matrix4<T>) -> Point2<T> {
    let q = transform_point(p, m);
    Point2::new(q.x / q.z, q.y / q.z)
}

/// Batched [`project_point`].
pub fn project<T: RealField + Copy>(points: &[Point3<T>], m: &Matrix4<T>) -> Vec<Point2<T>> {
    points.iter().map(|p| project_point(p, m)).collect()
}

// ============================================================================
// Named frame conversions
// ============================================================================

/// Closed-form inverse of a rigid row-vector transform
/// `[[R, 0], [t, 1]]` → `[[Rᵀ, 0], [-t·Rᵀ, 1]]`.
pub fn rigid_inverse<T: RealField + Copy>(m: &Matrix4<T>) -> Matrix4<T> {
    let r = m.fixed_view::<3, 3>(0, 0).into_owned();
    let t = m.fixed_view::<1, 3>(3, 0).into_owned();
    let r_inv = r.transpose();
    let t_inv = -t * r_inv;

    let mut out = Matrix4::identity();
    out.fixed_view_mut::<3, 3>(0, 0).copy_from(&r_inv);
    out.fixed_view_mut::<1, 3>(3, 0).copy_from(&t_inv);
    out
}

/// Closed-form inverse of an affine intrinsic matrix
/// `[[fx,0,0,0],[0,fy,0,0],[cx,cy,1,0],[0,0,0,1]]`.
///
/// Maps pixel coordinates to normalized camera-ray coordinates. Assumes
/// zero skew, the only form the device produces.
pub fn image_to_camera<T: RealField + Copy>(intrinsics: &Matrix4<T>) -> Matrix4<T> {
    let fx = intrinsics[(0, 0)];
    let fy = intrinsics[(1, 1)];
    let cx = intrinsics[(2, 0)];
    let cy = intrinsics[(2, 1)];

    let mut out = Matrix4::identity();
    out[(0, 0)] = T::one() / fx;
    out[(1, 1)] = T::one() / fy;
    out[(2, 0)] = -cx / fx;
    out[(2, 1)] = -cy / fy;
    out
}

/// Pixel-to-camera map is the inverse direction of the intrinsics.
#[inline]
pub fn camera_to_image<T: RealField + Copy>(intrinsics: &Matrix4<T>) -> Matrix4<T> {
    *intrinsics
}

/// Extrinsics map rignode → camera; this is the inverse direction.
#[inline]
pub fn camera_to_rignode<T: RealField + Copy>(extrinsics: &Matrix4<T>) -> Matrix4<T> {
    rigid_inverse(extrinsics)
}

#[inline]
pub fn rignode_to_camera<T: RealField + Copy>(extrinsics: &Matrix4<T>) -> Matrix4<T> {
    *extrinsics
}

/// A pose already expresses rignode → world.
#[inline]
pub fn reference_to_world<T: RealField + Copy>(pose: &Matrix4<T>) -> Matrix4<T> {
    *pose
}

#[inline]
pub fn world_to_reference<T: RealField + Copy>(pose: &Matrix4<T>) -> Matrix4<T> {
    rigid_inverse(pose)
}

// ============================================================================
// Ray lookup tables and depth
// ============================================================================

/// Synthesize the per-pixel ray-direction table (`uv2xy`) from an
/// intrinsic matrix: `x = (u - cx) / fx`, `y = (v - cy) / fy`.
pub fn compute_uv2xy(intrinsics: &Matrix4<f32>, width: usize, height: usize) -> PixelMap {
    let fx = intrinsics[(0, 0)];
    let fy = intrinsics[(1, 1)];
    let cx = intrinsics[(2, 0)];
    let cy = intrinsics[(2, 1)];

    PixelMap::from_fn(width, height, |u, v| {
        [(u as f32 - cx) / fx, (v as f32 - cy) / fy]
    })
}

/// Per-pixel rays at unit depth and their range scale.
///
/// Returns `(rays, range_scale)` where `rays[i] = (x, y, 1)` and
/// `range_scale[i] = |(x, y, 1)| · depth_scale`: the obliquity factor
/// away from the optical axis combined with the sensor's depth scale
/// (the calibration record's scale field; pass `1.0` for the pure
/// obliquity).
pub fn depth_rays(uv2xy: &PixelMap, depth_scale: f32) -> (Vec<Vector3<f32>>, Vec<f32>) {
    let mut rays = Vec::with_capacity(uv2xy.pixels().len());
    let mut scale = Vec::with_capacity(uv2xy.pixels().len());
    for &[x, y] in uv2xy.pixels() {
        let ray = Vector3::new(x, y, 1.0);
        scale.push(ray.norm() * depth_scale);
        rays.push(ray);
    }
    (rays, scale)
}

/// Turn raw 16-bit depth samples into camera-frame 3D points:
/// `point = ray · (raw / 65535) · range_scale`.
///
/// `rays` and `range_scale` come from [`depth_rays`].
pub fn depth_to_points(
    rays: &[Vector3<f32>],
    range_scale: &[f32],
    depth: &[u16],
) -> Vec<Point3<f32>> {
    rays.iter()
        .zip(range_scale)
        .zip(depth)
        .map(|((ray, s), &d)| {
            let r = ray * (d as f32 / DEPTH_RAW_MAX * s);
            Point3::new(r.x, r.y, r.z)
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn intrinsics(fx: f64, fy: f64, cx: f64, cy: f64) -> Matrix4<f64> {
        let mut k = Matrix4::identity();
        k[(0, 0)] = fx;
        k[(1, 1)] = fy;
        k[(2, 0)] = cx;
        k[(2, 1)] = cy;
        k
    }

    #[test]
    fn test_homogeneous_round_trip() {
        let p = Point3::new(1.0, -2.0, 3.0);
        let h = to_homogeneous(&p);
        assert_eq!(h.w, 1.0);
        assert_relative_eq!(to_inhomogeneous(&h), p, epsilon = 1e-12);
    }

    #[test]
    fn test_transform_applies_rotation_and_translation_row() {
        // 90° about Z (row-vector block) plus a translation row.
        #[rustfmt::skip]
        let m = Matrix4::new(
            0.0, 1.0, 0.0, 0.0,
            -1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            10.0, 20.0, 30.0, 1.0,
        );
        let p = transform_point(&Point3::new(1.0, 0.0, 0.0), &m);
        assert_relative_eq!(p, Point3::new(10.0, 21.0, 30.0), epsilon = 1e-12);
    }

    #[test]
    fn test_project_divides_by_depth() {
        let k = intrinsics(200.0, 300.0, 320.0, 240.0);
        let pixel = project_point(&Point3::new(0.5, -0.25, 2.0), &k);
        assert_relative_eq!(pixel.x, 0.25 * 200.0 + 320.0, epsilon = 1e-12);
        assert_relative_eq!(pixel.y, -0.125 * 300.0 + 240.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rigid_inverse_matches_general_inverse() {
        #[rustfmt::skip]
        let m = Matrix4::new(
            0.0, 1.0, 0.0, 0.0,
            -1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            1.0, 2.0, 3.0, 1.0,
        );
        let inv = rigid_inverse(&m);
        assert_relative_eq!(m * inv, Matrix4::identity(), epsilon = 1e-12);
        assert_relative_eq!(inv, m.try_inverse().unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn test_image_to_camera_inverts_intrinsics() {
        let k = intrinsics(450.0, 460.0, 319.5, 239.5);
        let inv = image_to_camera(&k);
        assert_relative_eq!(k * inv, Matrix4::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_world_to_reference_round_trip() {
        #[rustfmt::skip]
        let pose = Matrix4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, -1.0, 0.0, 0.0,
            0.5, -0.5, 2.0, 1.0,
        );
        let p = Point3::new(0.1, 0.2, 0.3);
        let world = transform_point(&p, &reference_to_world(&pose));
        let back = transform_point(&world, &world_to_reference(&pose));
        assert_relative_eq!(back, p, epsilon = 1e-12);
    }

    #[test]
    fn test_compute_uv2xy_principal_point_is_zero_ray() {
        let mut k = Matrix4::<f32>::identity();
        k[(0, 0)] = 100.0;
        k[(1, 1)] = 100.0;
        k[(2, 0)] = 2.0;
        k[(2, 1)] = 1.0;
        let lut = compute_uv2xy(&k, 4, 3);
        assert_eq!(lut.at(2, 1), [0.0, 0.0]);
        let [x, y] = lut.at(3, 2);
        assert_relative_eq!(x, 0.01, epsilon = 1e-6);
        assert_relative_eq!(y, 0.01, epsilon = 1e-6);
    }

    #[test]
    fn test_depth_rays_range_scale_is_obliquity() {
        let mut k = Matrix4::<f32>::identity();
        k[(0, 0)] = 1.0;
        k[(1, 1)] = 1.0;
        let lut = compute_uv2xy(&k, 2, 1);
        let (rays, scale) = depth_rays(&lut, 1.0);
        assert_eq!(rays[0], Vector3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(scale[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(scale[1], (2.0f32).sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn test_depth_rays_fold_in_sensor_scale() {
        let mut k = Matrix4::<f32>::identity();
        k[(0, 0)] = 1.0;
        k[(1, 1)] = 1.0;
        let lut = compute_uv2xy(&k, 2, 1);
        let (rays, scale) = depth_rays(&lut, 250.0);
        assert_relative_eq!(scale[0], 250.0, epsilon = 1e-4);
        assert_relative_eq!(scale[1], 250.0 * (2.0f32).sqrt(), epsilon = 1e-3);

        // On-axis pixel at full raw range lands at depth_scale meters.
        let points = depth_to_points(&rays, &scale, &[65535, 0]);
        assert_relative_eq!(points[0], Point3::new(0.0, 0.0, 250.0), epsilon = 1e-3);
        assert_eq!(points[1], Point3::new(0.0, 0.0, 0.0));
    }
}
