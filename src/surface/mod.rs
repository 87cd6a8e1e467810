//! Environment surface meshes: wire decoding, ray queries and the
//! incremental cache that keeps them fresh.

pub mod manager;
pub mod mesh;
pub mod raycast;

pub use manager::{SurfaceCacheHandle, SurfaceCacheManager, SurfaceCacheOptions};
pub use mesh::{MeshDecodeError, PackedMesh, SurfaceMesh};
pub use raycast::{Ray, RaycastMesh};
