//! Raw flat-array binary dumps.
//!
//! The on-disk format is headerless: one file per field, elements in
//! native byte order, shape reconstructed from sensor constants known
//! identically to writer and reader. A length mismatch on read (e.g.
//! after a sensor-resolution change) reads as corrupt and upstream
//! treats it as a cache miss.

use std::fs;
use std::io;
use std::path::Path;

use bytemuck::Pod;
use nalgebra::{Matrix3, Matrix4, Matrix3x4};

/// Write a flat array of plain-old-data elements.
pub(crate) fn write_pod<T: Pod>(path: &Path, values: &[T]) -> io::Result<()> {
    fs::write(path, bytemuck::cast_slice(values))
}

/// Read a flat array, enforcing the expected element count.
pub(crate) fn read_pod<T: Pod>(path: &Path, expected: usize) -> io::Result<Vec<T>> {
    let bytes = fs::read(path)?;
    if bytes.len() != expected * std::mem::size_of::<T>() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "{}: expected {} elements, found {} bytes",
                path.display(),
                expected,
                bytes.len()
            ),
        ));
    }
    Ok(bytemuck::pod_collect_to_vec(&bytes))
}

/// Row-major element order for a 4x4 matrix, matching the dump layout.
pub(crate) fn mat4_to_rows<T: Pod + nalgebra::Scalar>(m: &Matrix4<T>) -> Vec<T> {
    m.transpose().as_slice().to_vec()
}

pub(crate) fn mat4_from_rows<T: Pod + nalgebra::Scalar>(rows: &[T]) -> Matrix4<T> {
    Matrix4::from_row_slice(rows)
}

pub(crate) fn mat3_to_rows<T: Pod + nalgebra::Scalar>(m: &Matrix3<T>) -> Vec<T> {
    m.transpose().as_slice().to_vec()
}

pub(crate) fn mat3_from_rows<T: Pod + nalgebra::Scalar>(rows: &[T]) -> Matrix3<T> {
    Matrix3::from_row_slice(rows)
}

pub(crate) fn mat3x4_to_rows<T: Pod + nalgebra::Scalar>(m: &Matrix3x4<T>) -> Vec<T> {
    m.transpose().as_slice().to_vec()
}

pub(crate) fn mat3x4_from_rows<T: Pod + nalgebra::Scalar>(rows: &[T]) -> Matrix3x4<T> {
    Matrix3x4::from_row_slice(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_rejects_length_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("field.bin");
        write_pod(&path, &[1.0f32, 2.0, 3.0]).unwrap();

        assert_eq!(read_pod::<f32>(&path, 3).unwrap(), vec![1.0, 2.0, 3.0]);
        assert!(read_pod::<f32>(&path, 4).is_err());
        assert!(read_pod::<f64>(&path, 3).is_err());
    }

    #[test]
    fn test_matrix_row_order_round_trip() {
        let m = Matrix4::<f32>::from_row_slice(&[
            0.0, 1.0, 2.0, 3.0, //
            4.0, 5.0, 6.0, 7.0, //
            8.0, 9.0, 10.0, 11.0, //
            12.0, 13.0, 14.0, 15.0,
        ]);
        let rows = mat4_to_rows(&m);
        assert_eq!(rows[1], 1.0);
        assert_eq!(rows[4], 4.0);
        assert_eq!(mat4_from_rows(&rows), m);
    }
}
