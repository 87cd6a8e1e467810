//! Incremental cache of observed environment surfaces.
//!
//! Each refresh cycle asks the device which surfaces exist, keeps every
//! cached mesh whose update time is still current, fetches the rest in
//! one batch, decodes and bakes them on worker threads, and publishes
//! the new surface map as a single atomic swap. Readers hold a cheap
//! cloneable handle and always see a complete, consistent snapshot, even
//! mid-refresh.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::device::{
    DeviceError, MeshTask, ObservationVolume, SpatialMappingSession, SurfaceId, SurfaceInfo,
};
use crate::surface::mesh::{
    SurfaceMesh, TriangleIndexFormat, VertexNormalFormat, VertexPositionFormat,
};
use crate::surface::raycast::{Ray, RaycastMesh};

/// Tuning knobs for mesh fetching and baking.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceCacheOptions {
    /// Requested mesh density.
    pub triangles_per_cubic_meter: f64,
    /// Device-side fetch parallelism, also used for local baking threads.
    pub fetch_workers: usize,
    /// Wire encodings requested from the device. The packed defaults
    /// keep fetches small; the float variants trade bandwidth for
    /// lossless transfer.
    pub vertex_format: VertexPositionFormat,
    pub index_format: TriangleIndexFormat,
    pub normal_format: VertexNormalFormat,
    pub include_normals: bool,
}

impl Default for SurfaceCacheOptions {
    fn default() -> Self {
        Self {
            triangles_per_cubic_meter: 1000.0,
            fetch_workers: 2,
            vertex_format: VertexPositionFormat::R16G16B16A16IntNormalized,
            index_format: TriangleIndexFormat::R16UInt,
            normal_format: VertexNormalFormat::R8G8B8A8IntNormalized,
            include_normals: false,
        }
    }
}

struct SurfaceEntry {
    info: SurfaceInfo,
    mesh: SurfaceMesh,
    raycast: RaycastMesh,
}

type SurfaceMap = HashMap<SurfaceId, Arc<SurfaceEntry>>;

/// Cloneable read handle onto the published surface snapshot.
#[derive(Clone)]
pub struct SurfaceCacheHandle {
    shared: Arc<RwLock<Arc<SurfaceMap>>>,
}

impl SurfaceCacheHandle {
    fn snapshot(&self) -> Arc<SurfaceMap> {
        self.shared.read().clone()
    }

    /// Nearest hit distance per ray across every cached surface;
    /// [`f64::INFINITY`] where nothing is hit (including an empty cache).
    pub fn cast_rays(&self, rays: &[Ray]) -> Vec<f64> {
        let surfaces = self.snapshot();
        rays.iter()
            .map(|ray| {
                surfaces
                    .values()
                    .map(|entry| entry.raycast.cast(ray))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect()
    }

    /// Number of surfaces in the current snapshot.
    pub fn surface_count(&self) -> usize {
        self.snapshot().len()
    }

    /// Total triangle count across the current snapshot.
    pub fn triangle_count(&self) -> usize {
        self.snapshot()
            .values()
            .map(|entry| entry.mesh.indices.len())
            .sum()
    }
}

/// Owns the spatial-mapping session and drives refresh cycles.
pub struct SurfaceCacheManager<S> {
    session: S,
    options: SurfaceCacheOptions,
    shared: Arc<RwLock<Arc<SurfaceMap>>>,
}

impl<S: SpatialMappingSession> SurfaceCacheManager<S> {
    pub fn new(session: S, options: SurfaceCacheOptions) -> Self {
        Self {
            session,
            options,
            shared: Arc::new(RwLock::new(Arc::new(HashMap::new()))),
        }
    }

    /// Read handle sharing this manager's published snapshot.
    pub fn handle(&self) -> SurfaceCacheHandle {
        SurfaceCacheHandle {
            shared: self.shared.clone(),
        }
    }

    /// Replace the observed volumes on the device.
    pub fn set_volumes(&mut self, volumes: &[ObservationVolume]) -> Result<(), DeviceError> {
        self.session.set_volumes(volumes)
    }

    /// One refresh cycle; returns the number of surfaces rebuilt.
    ///
    /// Surfaces no longer reported by the device are dropped. A surface
    /// whose mesh fails to fetch or decode is dropped for this cycle and
    /// becomes stale again on the next one. Device-level failures abort
    /// the cycle and leave the previous snapshot published.
    pub fn refresh(&mut self) -> Result<usize, DeviceError> {
        let reported = self.session.observed_surfaces()?;
        let current = self.shared.read().clone();

        let mut next: SurfaceMap = HashMap::with_capacity(reported.len());
        let mut stale: Vec<SurfaceInfo> = Vec::new();
        for info in reported {
            match current.get(&info.id) {
                Some(entry) if entry.info.update_time >= info.update_time => {
                    next.insert(info.id, entry.clone());
                }
                _ => stale.push(info),
            }
        }
        debug!(
            kept = next.len(),
            stale = stale.len(),
            "surface refresh cycle"
        );

        let mut rebuilt = 0;
        if !stale.is_empty() {
            let tasks: Vec<MeshTask> = stale
                .iter()
                .map(|info| MeshTask {
                    id: info.id,
                    triangles_per_cubic_meter: self.options.triangles_per_cubic_meter,
                    vertex_format: self.options.vertex_format,
                    index_format: self.options.index_format,
                    normal_format: self.options.normal_format,
                    include_normals: self.options.include_normals,
                })
                .collect();
            let packed = self.session.fetch_meshes(&tasks, self.options.fetch_workers)?;

            for (info, entry) in bake_meshes(&stale, packed, self.options.fetch_workers) {
                match entry {
                    Some(entry) => {
                        next.insert(info.id, Arc::new(entry));
                        rebuilt += 1;
                    }
                    None => warn!(surface = %info.id, "surface skipped this cycle"),
                }
            }
        }

        *self.shared.write() = Arc::new(next);
        Ok(rebuilt)
    }

    /// Convenience for callers that keep no separate handle.
    pub fn cast_rays(&self, rays: &[Ray]) -> Vec<f64> {
        self.handle().cast_rays(rays)
    }
}

/// Decode and bake fetched meshes on `workers` threads. Slots that
/// failed to fetch or fail to decode come back as `None`.
fn bake_meshes(
    stale: &[SurfaceInfo],
    packed: Vec<Option<crate::surface::mesh::PackedMesh>>,
    workers: usize,
) -> Vec<(SurfaceInfo, Option<SurfaceEntry>)> {
    let (task_tx, task_rx) = crossbeam_channel::unbounded();
    for (slot, packed) in stale.iter().copied().zip(packed) {
        let _ = task_tx.send((slot, packed));
    }
    drop(task_tx);

    let (done_tx, done_rx) = crossbeam_channel::unbounded();
    std::thread::scope(|scope| {
        for _ in 0..workers.max(1) {
            let task_rx = task_rx.clone();
            let done_tx = done_tx.clone();
            scope.spawn(move || {
                for (info, packed) in task_rx {
                    let entry = packed.and_then(|packed| match packed.decode() {
                        Ok(mesh) => {
                            let raycast = RaycastMesh::build(&mesh);
                            Some(SurfaceEntry {
                                info,
                                mesh,
                                raycast,
                            })
                        }
                        Err(err) => {
                            warn!(surface = %info.id, %err, "mesh decode failed");
                            None
                        }
                    });
                    let _ = done_tx.send((info, entry));
                }
            });
        }
    });
    drop(done_tx);

    done_rx.into_iter().collect()
}
