//! Packed surface meshes and their decoded world-space form.
//!
//! The device serves each surface mesh in a packed wire form: raw
//! component buffers plus the encoding formats, a per-axis position
//! scale and the mesh-to-world pose. [`PackedMesh::decode`] unpacks,
//! normalizes and transforms everything into one world-space
//! [`SurfaceMesh`] ready for spatial queries.

use bytemuck::Pod;
use nalgebra::{Matrix4, Point3, Vector3};
use thiserror::Error;

use crate::geometry::transforms::transform_point;

/// Encoding of packed vertex positions: four components per vertex, the
/// fourth being the normalization divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexPositionFormat {
    R16G16B16A16IntNormalized,
    R32G32B32A32Float,
}

/// Encoding of packed triangle indices, three per triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriangleIndexFormat {
    R16UInt,
    R32UInt,
}

/// Encoding of packed vertex normals, four components per vertex with
/// the fourth ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexNormalFormat {
    R8G8B8A8IntNormalized,
    R32G32B32A32Float,
}

/// Surface mesh as served by the device, still in its wire encoding.
#[derive(Debug, Clone)]
pub struct PackedMesh {
    pub vertex_position_scale: [f32; 3],
    /// Mesh-to-world transform, row-vector convention.
    pub pose: Matrix4<f64>,
    pub vertex_format: VertexPositionFormat,
    pub index_format: TriangleIndexFormat,
    pub normal_format: VertexNormalFormat,
    pub vertex_positions: Vec<u8>,
    pub triangle_indices: Vec<u8>,
    /// Empty when normals were not requested.
    pub vertex_normals: Vec<u8>,
}

/// Structural defect in a packed mesh buffer.
#[derive(Debug, Error)]
pub enum MeshDecodeError {
    #[error("{section} buffer of {len} bytes is not a whole number of {stride}-byte elements")]
    Truncated {
        section: &'static str,
        len: usize,
        stride: usize,
    },
    #[error("triangle index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}

/// Decoded surface mesh in world coordinates.
#[derive(Debug, Clone, Default)]
pub struct SurfaceMesh {
    pub positions: Vec<Point3<f64>>,
    pub indices: Vec<[u32; 3]>,
    /// Unit world-space normals; empty when the packed mesh carried none.
    pub normals: Vec<Vector3<f64>>,
}

fn unpack<T: Pod>(
    bytes: &[u8],
    section: &'static str,
    group: usize,
) -> Result<Vec<T>, MeshDecodeError> {
    let stride = std::mem::size_of::<T>() * group;
    if stride == 0 || bytes.len() % stride != 0 {
        return Err(MeshDecodeError::Truncated {
            section,
            len: bytes.len(),
            stride,
        });
    }
    Ok(bytemuck::pod_collect_to_vec(bytes))
}

impl PackedMesh {
    /// Unpack the wire buffers and lift the mesh into world space.
    ///
    /// Positions are scaled per axis, divided by their fourth component
    /// and pushed through the pose. Normals are renormalized to unit
    /// length (zero-length inputs stay zero) and rotated by the pose's
    /// rotation block.
    pub fn decode(&self) -> Result<SurfaceMesh, MeshDecodeError> {
        let positions = self.decode_positions()?;
        let indices = self.decode_indices(positions.len())?;
        let normals = self.decode_normals()?;
        Ok(SurfaceMesh {
            positions,
            indices,
            normals,
        })
    }

    fn decode_positions(&self) -> Result<Vec<Point3<f64>>, MeshDecodeError> {
        let components: Vec<f64> = match self.vertex_format {
            VertexPositionFormat::R16G16B16A16IntNormalized => {
                unpack::<i16>(&self.vertex_positions, "vertex position", 4)?
                    .into_iter()
                    .map(f64::from)
                    .collect()
            }
            VertexPositionFormat::R32G32B32A32Float => {
                unpack::<f32>(&self.vertex_positions, "vertex position", 4)?
                    .into_iter()
                    .map(f64::from)
                    .collect()
            }
        };
        let scale = self.vertex_position_scale.map(f64::from);
        Ok(components
            .chunks_exact(4)
            .map(|v| {
                let local = Point3::new(
                    v[0] * scale[0] / v[3],
                    v[1] * scale[1] / v[3],
                    v[2] * scale[2] / v[3],
                );
                transform_point(&local, &self.pose)
            })
            .collect())
    }

    fn decode_indices(&self, vertex_count: usize) -> Result<Vec<[u32; 3]>, MeshDecodeError> {
        let raw: Vec<u32> = match self.index_format {
            TriangleIndexFormat::R16UInt => {
                unpack::<u16>(&self.triangle_indices, "triangle index", 3)?
                    .into_iter()
                    .map(u32::from)
                    .collect()
            }
            TriangleIndexFormat::R32UInt => {
                unpack::<u32>(&self.triangle_indices, "triangle index", 3)?
            }
        };
        for &index in &raw {
            if index as usize >= vertex_count {
                return Err(MeshDecodeError::IndexOutOfRange {
                    index,
                    vertex_count,
                });
            }
        }
        Ok(raw.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect())
    }

    fn decode_normals(&self) -> Result<Vec<Vector3<f64>>, MeshDecodeError> {
        if self.vertex_normals.is_empty() {
            return Ok(Vec::new());
        }
        let components: Vec<f64> = match self.normal_format {
            VertexNormalFormat::R8G8B8A8IntNormalized => {
                unpack::<i8>(&self.vertex_normals, "vertex normal", 4)?
                    .into_iter()
                    .map(f64::from)
                    .collect()
            }
            VertexNormalFormat::R32G32B32A32Float => {
                unpack::<f32>(&self.vertex_normals, "vertex normal", 4)?
                    .into_iter()
                    .map(f64::from)
                    .collect()
            }
        };
        let rotation = self.pose.fixed_view::<3, 3>(0, 0).into_owned();
        Ok(components
            .chunks_exact(4)
            .map(|n| {
                let n = Vector3::new(n[0], n[1], n[2]);
                let length = n.norm();
                let unit = if length > 0.0 { n / length } else { n };
                (unit.transpose() * rotation).transpose()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn float_quad() -> PackedMesh {
        // Unit square in the z = 0 plane, w divisor 2 and scale 2 so the
        // decoded coordinates equal the raw ones.
        let positions: Vec<f32> = [
            [0.0, 0.0, 0.0, 2.0],
            [2.0, 0.0, 0.0, 2.0],
            [2.0, 2.0, 0.0, 2.0],
            [0.0, 2.0, 0.0, 2.0],
        ]
        .concat();
        let normals: Vec<f32> = [[0.0, 0.0, 3.0, 0.0]; 4].concat();
        PackedMesh {
            vertex_position_scale: [2.0, 2.0, 2.0],
            pose: Matrix4::identity(),
            vertex_format: VertexPositionFormat::R32G32B32A32Float,
            index_format: TriangleIndexFormat::R32UInt,
            normal_format: VertexNormalFormat::R32G32B32A32Float,
            vertex_positions: bytemuck::cast_slice(&positions).to_vec(),
            triangle_indices: bytemuck::cast_slice(&[0u32, 1, 2, 0, 2, 3]).to_vec(),
            vertex_normals: bytemuck::cast_slice(&normals).to_vec(),
        }
    }

    #[test]
    fn test_decode_scales_divides_and_normalizes() {
        let mesh = float_quad().decode().unwrap();
        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.indices, vec![[0, 1, 2], [0, 2, 3]]);
        assert_relative_eq!(mesh.positions[2], Point3::new(2.0, 2.0, 0.0));
        // Length-3 input normal comes out unit length.
        assert_relative_eq!(mesh.normals[0], Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_decode_applies_pose() {
        let mut packed = float_quad();
        // Pure translation along z in the row convention.
        packed.pose[(3, 2)] = 5.0;
        let mesh = packed.decode().unwrap();
        assert_relative_eq!(mesh.positions[0], Point3::new(0.0, 0.0, 5.0));
        // Translation leaves normals alone.
        assert_relative_eq!(mesh.normals[0], Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_snorm_positions_decode() {
        let raw: Vec<i16> = vec![100, -200, 300, 100];
        let packed = PackedMesh {
            vertex_position_scale: [1.0, 1.0, 1.0],
            pose: Matrix4::identity(),
            vertex_format: VertexPositionFormat::R16G16B16A16IntNormalized,
            index_format: TriangleIndexFormat::R16UInt,
            normal_format: VertexNormalFormat::R8G8B8A8IntNormalized,
            vertex_positions: bytemuck::cast_slice(&raw).to_vec(),
            triangle_indices: Vec::new(),
            vertex_normals: Vec::new(),
        };
        let mesh = packed.decode().unwrap();
        assert_relative_eq!(mesh.positions[0], Point3::new(1.0, -2.0, 3.0));
        assert!(mesh.normals.is_empty());
    }

    #[test]
    fn test_truncated_buffer_rejected() {
        let mut packed = float_quad();
        packed.vertex_positions.pop();
        assert!(matches!(
            packed.decode(),
            Err(MeshDecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_index_out_of_range_rejected() {
        let mut packed = float_quad();
        packed.triangle_indices = bytemuck::cast_slice(&[0u32, 1, 9]).to_vec();
        assert!(matches!(
            packed.decode(),
            Err(MeshDecodeError::IndexOutOfRange {
                index: 9,
                vertex_count: 4
            })
        ));
    }

    #[test]
    fn test_zero_length_normal_stays_zero() {
        let mut packed = float_quad();
        packed.vertex_normals = bytemuck::cast_slice(&[0.0f32; 16]).to_vec();
        let mesh = packed.decode().unwrap();
        assert_eq!(mesh.normals[0], Vector3::zeros());
    }
}
