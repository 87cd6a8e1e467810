//! Ray queries against a decoded surface mesh.
//!
//! Each mesh is baked once into a bounding-volume hierarchy (median
//! split over triangle centroids) so repeated batched queries skip most
//! of the geometry. A miss is reported as an infinite distance, which
//! composes directly with the min-reduction across meshes.

use nalgebra::{Point3, Vector3};

use super::mesh::SurfaceMesh;

const LEAF_SIZE: usize = 4;

/// A world-space ray. The direction need not be unit length; reported
/// distances are in multiples of it.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3<f64>,
    pub direction: Vector3<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Aabb {
    min: Point3<f64>,
    max: Point3<f64>,
}

impl Aabb {
    fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    fn grow(&mut self, p: &Point3<f64>) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(p[axis]);
            self.max[axis] = self.max[axis].max(p[axis]);
        }
    }

    /// Slab test, bounded above by the best hit found so far.
    fn hit(&self, ray: &Ray, t_max: f64) -> bool {
        let mut t0 = 0.0f64;
        let mut t1 = t_max;
        for axis in 0..3 {
            let inv = 1.0 / ray.direction[axis];
            let mut near = (self.min[axis] - ray.origin[axis]) * inv;
            let mut far = (self.max[axis] - ray.origin[axis]) * inv;
            if near > far {
                std::mem::swap(&mut near, &mut far);
            }
            t0 = t0.max(near);
            t1 = t1.min(far);
            if t0 > t1 {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy)]
struct Triangle {
    a: Point3<f64>,
    edge_ab: Vector3<f64>,
    edge_ac: Vector3<f64>,
}

impl Triangle {
    /// Möller–Trumbore intersection; `None` on miss or backward hit.
    fn intersect(&self, ray: &Ray) -> Option<f64> {
        let p = ray.direction.cross(&self.edge_ac);
        let det = self.edge_ab.dot(&p);
        if det.abs() < f64::EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = ray.origin - self.a;
        let u = s.dot(&p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(&self.edge_ab);
        let v = ray.direction.dot(&q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = self.edge_ac.dot(&q) * inv_det;
        (t >= 0.0).then_some(t)
    }
}

/// Depth-first flat node; `count > 0` marks a leaf over
/// `triangles[start..start + count]`, otherwise the left child is the
/// next node and `right` indexes the right child.
#[derive(Debug, Clone, Copy)]
struct Node {
    bounds: Aabb,
    start: u32,
    count: u32,
    right: u32,
}

/// Bounding-volume hierarchy baked from one surface mesh.
#[derive(Debug, Clone)]
pub struct RaycastMesh {
    nodes: Vec<Node>,
    triangles: Vec<Triangle>,
}

impl RaycastMesh {
    pub fn build(mesh: &SurfaceMesh) -> Self {
        let mut triangles: Vec<Triangle> = mesh
            .indices
            .iter()
            .map(|&[i, j, k]| {
                let a = mesh.positions[i as usize];
                Triangle {
                    a,
                    edge_ab: mesh.positions[j as usize] - a,
                    edge_ac: mesh.positions[k as usize] - a,
                }
            })
            .collect();

        let mut built = Self {
            nodes: Vec::new(),
            triangles: Vec::new(),
        };
        if triangles.is_empty() {
            return built;
        }
        built.nodes.reserve(2 * triangles.len());
        built.split(&mut triangles, 0);
        built
    }

    /// Recursively partition `pending`, appending nodes depth first and
    /// draining finished leaves into `self.triangles`.
    fn split(&mut self, pending: &mut [Triangle], start: u32) {
        let mut bounds = Aabb::empty();
        let mut centroid_bounds = Aabb::empty();
        for tri in pending.iter() {
            bounds.grow(&tri.a);
            bounds.grow(&(tri.a + tri.edge_ab));
            bounds.grow(&(tri.a + tri.edge_ac));
            centroid_bounds.grow(&centroid(tri));
        }

        if pending.len() <= LEAF_SIZE {
            self.nodes.push(Node {
                bounds,
                start,
                count: pending.len() as u32,
                right: 0,
            });
            self.triangles.extend_from_slice(pending);
            return;
        }

        let extent = centroid_bounds.max - centroid_bounds.min;
        let axis = extent.imax();
        let mid = pending.len() / 2;
        pending.select_nth_unstable_by(mid, |a, b| {
            centroid(a)[axis].total_cmp(&centroid(b)[axis])
        });

        let index = self.nodes.len();
        self.nodes.push(Node {
            bounds,
            start,
            count: 0,
            right: 0,
        });
        let (left, right) = pending.split_at_mut(mid);
        self.split(left, start);
        self.nodes[index].right = self.nodes.len() as u32;
        self.split(right, start + mid as u32);
    }

    /// Nearest hit distance along `ray`, or [`f64::INFINITY`] on miss.
    pub fn cast(&self, ray: &Ray) -> f64 {
        let mut best = f64::INFINITY;
        if !self.nodes.is_empty() {
            self.cast_node(ray, 0, &mut best);
        }
        best
    }

    fn cast_node(&self, ray: &Ray, index: usize, best: &mut f64) {
        let node = self.nodes[index];
        if !node.bounds.hit(ray, *best) {
            return;
        }
        if node.count > 0 {
            let start = node.start as usize;
            for tri in &self.triangles[start..start + node.count as usize] {
                if let Some(t) = tri.intersect(ray) {
                    *best = best.min(t);
                }
            }
        } else {
            self.cast_node(ray, index + 1, best);
            self.cast_node(ray, node.right as usize, best);
        }
    }
}

fn centroid(tri: &Triangle) -> Point3<f64> {
    tri.a + (tri.edge_ab + tri.edge_ac) / 3.0
}
