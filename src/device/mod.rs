//! Collaborator interfaces to the device: calibration download and the
//! spatial-mapping session.
//!
//! Nothing here talks to the network directly; the crate consumes these
//! capabilities and tests substitute mocks. Implementations live with the
//! transport layer, outside this crate.

use std::fmt;

use nalgebra::{Matrix4, Point3, Vector3};
use thiserror::Error;

use crate::calibration::records::{CalibrationRecord, ColorCalibration};
use crate::sensors::{ColorProfile, SensorPort};
use crate::surface::mesh::{PackedMesh, TriangleIndexFormat, VertexNormalFormat, VertexPositionFormat};

/// Failure talking to the device. Always fatal to the operation that
/// triggered it; never silently absorbed.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("spatial mapping session closed")]
    SessionClosed,
    #[error("device protocol: {0}")]
    Protocol(String),
}

/// Calibration download capability.
pub trait DeviceClient {
    /// Download the calibration record for a non-color sensor.
    fn download_calibration(&mut self, port: SensorPort) -> Result<CalibrationRecord, DeviceError>;

    /// Download the color-camera calibration for a capture profile.
    fn download_color_calibration(
        &mut self,
        profile: &ColorProfile,
    ) -> Result<ColorCalibration, DeviceError>;
}

/// Opaque identity of an observed environment surface, stable across
/// refresh cycles.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub [u8; 16]);

impl fmt::Debug for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceId({self})")
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// One observed surface as reported by the device: identity plus a
/// monotonically increasing update time.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceInfo {
    pub id: SurfaceId,
    pub update_time: u64,
}

/// Region of space the observer reports surfaces for.
#[derive(Debug, Clone, Copy)]
pub enum ObservationVolume {
    Sphere {
        center: Point3<f32>,
        radius: f32,
    },
    Box {
        center: Point3<f32>,
        extents: Vector3<f32>,
    },
}

/// One mesh request inside a batched fetch. Encoding parameters are
/// supplied per task so the device packs each mesh as asked.
#[derive(Debug, Clone, Copy)]
pub struct MeshTask {
    pub id: SurfaceId,
    pub triangles_per_cubic_meter: f64,
    pub vertex_format: VertexPositionFormat,
    pub index_format: TriangleIndexFormat,
    pub normal_format: VertexNormalFormat,
    pub include_normals: bool,
}

/// Spatial-mapping session capability set.
///
/// A session is opened by the transport layer, observes volumes set by
/// [`set_volumes`](SpatialMappingSession::set_volumes), and serves
/// surface listings and batched mesh fetches. A lost session surfaces as
/// [`DeviceError::SessionClosed`] and is fatal to the refresh cycle.
pub trait SpatialMappingSession {
    fn set_volumes(&mut self, volumes: &[ObservationVolume]) -> Result<(), DeviceError>;

    /// All currently observed surfaces.
    fn observed_surfaces(&mut self) -> Result<Vec<SurfaceInfo>, DeviceError>;

    /// Batched mesh fetch, parallelized device-side across `workers`.
    ///
    /// The result has one slot per task, in task order; `None` marks a
    /// per-mesh fetch failure (the task's surface is skipped this cycle).
    fn fetch_meshes(
        &mut self,
        tasks: &[MeshTask],
        workers: usize,
    ) -> Result<Vec<Option<PackedMesh>>, DeviceError>;
}

/// Pose matrix type alias used for mesh-to-world transforms supplied by
/// the device (row-vector convention, like every transform in the crate).
pub type Pose = Matrix4<f64>;
