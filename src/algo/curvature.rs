//! Discrete curvature estimation on triangle meshes.
//!
//! Gaussian curvature comes from the angle defect, mean curvature from the
//! cotangent Laplace-Beltrami operator, and principal curvatures from
//! `k = H ± sqrt(H² - K)`. The adaptive sizing field of the remesher
//! consumes [`max_abs_curvature`].
//!
//! Deleted and isolated vertices get zero curvature, so results can be
//! indexed by [`VertexId`] on meshes that still carry garbage.
//!
//! # Example
//!
//! ```no_run
//! use halfmesh::prelude::*;
//! use halfmesh::algo::curvature::compute_curvature;
//!
//! let (mesh, _) = halfmesh::io::load("mesh.obj").unwrap();
//! let result = compute_curvature(&mesh);
//!
//! let v = VertexId::new(0);
//! let (k1, k2) = result.principal(v);
//! println!("K={} H={} k1={} k2={}", result.gaussian(v), result.mean(v), k1, k2);
//! ```
//!
//! # References
//!
//! - Meyer, M., et al. (2003). "Discrete Differential-Geometry Operators for
//!   Triangulated 2-Manifolds." Visualization and Mathematics III.

use std::f64::consts::PI;

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use crate::mesh::{HalfEdgeId, HalfEdgeMesh, VertexId};

const AREA_EPSILON: f64 = 1e-10;

/// Per-vertex curvature values.
#[derive(Debug, Clone, Default)]
pub struct CurvatureResult {
    gaussian: Vec<f64>,
    mean: Vec<f64>,
    principal_max: Vec<f64>,
    principal_min: Vec<f64>,
}

impl CurvatureResult {
    /// Gaussian curvature at a vertex.
    #[inline]
    pub fn gaussian(&self, v: VertexId) -> f64 {
        self.gaussian[v.index()]
    }

    /// Signed mean curvature at a vertex.
    #[inline]
    pub fn mean(&self, v: VertexId) -> f64 {
        self.mean[v.index()]
    }

    /// Principal curvatures `(k1, k2)` with `k1 >= k2`.
    #[inline]
    pub fn principal(&self, v: VertexId) -> (f64, f64) {
        (self.principal_max[v.index()], self.principal_min[v.index()])
    }

    /// `max(|k1|, |k2|)` at a vertex.
    #[inline]
    pub fn max_abs(&self, v: VertexId) -> f64 {
        self.principal_max[v.index()]
            .abs()
            .max(self.principal_min[v.index()].abs())
    }

    /// Number of vertex slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.gaussian.len()
    }

    /// Whether the result is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.gaussian.is_empty()
    }
}

/// Angle at `a` in triangle (a, b, c).
fn triangle_angle(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    let (Some(ab), Some(ac)) = ((b - a).try_normalize(0.0), (c - a).try_normalize(0.0)) else {
        return 0.0;
    };
    ab.dot(&ac).clamp(-1.0, 1.0).acos()
}

/// Cotangent of the angle at `a` in triangle (a, b, c).
pub(crate) fn cotangent_angle(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    let ab = b - a;
    let ac = c - a;
    let cross_norm = ab.cross(&ac).norm();
    if cross_norm < AREA_EPSILON {
        0.0
    } else {
        ab.dot(&ac) / cross_norm
    }
}

/// Cotangent weight `cot α + cot β` of the edge of `h`, clamped at zero.
pub(crate) fn cotangent_weight(mesh: &HalfEdgeMesh, h: HalfEdgeId) -> f64 {
    let p0 = mesh.position(mesh.source(h));
    let p1 = mesh.position(mesh.target(h));
    let mut w = 0.0;
    for side in [h, h.twin()] {
        if mesh.is_boundary_halfedge(side) {
            continue;
        }
        let opposite = mesh.position(mesh.target(mesh.next(side)));
        w += cotangent_angle(opposite, p0, p1);
    }
    w.max(0.0)
}

/// Mixed Voronoi area of a vertex (Meyer et al.).
pub(crate) fn mixed_area(mesh: &HalfEdgeMesh, v: VertexId) -> f64 {
    let mut area = 0.0;
    let p = mesh.position(v);

    for h in mesh.vertex_halfedges(v) {
        if mesh.is_boundary_halfedge(h) {
            continue;
        }
        let q = mesh.position(mesh.target(h));
        let r = mesh.position(mesh.target(mesh.next(h)));
        let tri_area = 0.5 * (q - p).cross(&(r - p)).norm();

        let at_p = triangle_angle(p, q, r);
        let at_q = triangle_angle(q, r, p);
        let at_r = PI - at_p - at_q;
        let half_pi = PI / 2.0;

        area += if at_p > half_pi {
            tri_area / 2.0
        } else if at_q > half_pi || at_r > half_pi {
            tri_area / 4.0
        } else {
            0.125
                * ((r - p).norm_squared() * cotangent_angle(q, p, r)
                    + (q - p).norm_squared() * cotangent_angle(r, p, q))
        };
    }

    if area < AREA_EPSILON {
        let barycentric: f64 = mesh.vertex_faces(v).map(|f| mesh.face_area(f) / 3.0).sum();
        if barycentric > AREA_EPSILON {
            return barycentric;
        }
    }
    area
}

fn angle_sum(mesh: &HalfEdgeMesh, v: VertexId) -> f64 {
    let p = mesh.position(v);
    mesh.vertex_halfedges(v)
        .filter(|&h| !mesh.is_boundary_halfedge(h))
        .map(|h| {
            let q = mesh.position(mesh.target(h));
            let r = mesh.position(mesh.target(mesh.next(h)));
            triangle_angle(p, q, r)
        })
        .sum()
}

/// Unnormalized cotangent Laplacian at a vertex; its norm is `2H·A`.
fn mean_curvature_normal(mesh: &HalfEdgeMesh, v: VertexId) -> Vector3<f64> {
    let p = mesh.position(v);
    let mut laplacian = Vector3::zeros();
    for h in mesh.vertex_halfedges(v) {
        let q = mesh.position(mesh.target(h));
        laplacian += cotangent_weight(mesh, h) * (q - p);
    }
    0.5 * laplacian
}

struct VertexCurvature {
    gaussian: f64,
    mean: f64,
    principal_max: f64,
    principal_min: f64,
}

impl VertexCurvature {
    const ZERO: Self = Self {
        gaussian: 0.0,
        mean: 0.0,
        principal_max: 0.0,
        principal_min: 0.0,
    };
}

fn vertex_curvature(mesh: &HalfEdgeMesh, v: VertexId) -> VertexCurvature {
    if mesh.is_deleted_vertex(v) || mesh.is_isolated(v) {
        return VertexCurvature::ZERO;
    }
    let area = mixed_area(mesh, v);
    if area <= AREA_EPSILON {
        return VertexCurvature::ZERO;
    }

    let k = (2.0 * PI - angle_sum(mesh, v)) / area;

    let laplacian = mean_curvature_normal(mesh, v) / area;
    let sign = if laplacian.dot(&mesh.vertex_normal(v)) >= 0.0 {
        1.0
    } else {
        -1.0
    };
    let h = sign * laplacian.norm() / 2.0;

    let discriminant = h * h - k;
    let (principal_max, principal_min) = if discriminant >= 0.0 {
        let s = discriminant.sqrt();
        (h + s, h - s)
    } else {
        (h, h)
    };

    VertexCurvature {
        gaussian: k,
        mean: h,
        principal_max,
        principal_min,
    }
}

/// Compute all curvatures for every vertex slot (parallel).
pub fn compute_curvature(mesh: &HalfEdgeMesh) -> CurvatureResult {
    compute_curvature_impl(mesh, true)
}

/// Compute all curvatures (sequential version).
///
/// Uses single-threaded execution. Useful for benchmarking.
pub fn compute_curvature_sequential(mesh: &HalfEdgeMesh) -> CurvatureResult {
    compute_curvature_impl(mesh, false)
}

fn compute_curvature_impl(mesh: &HalfEdgeMesh, parallel: bool) -> CurvatureResult {
    let n = mesh.vertices_size();
    let compute = |idx: usize| vertex_curvature(mesh, VertexId::new(idx));

    let results: Vec<VertexCurvature> = if parallel {
        (0..n).into_par_iter().map(compute).collect()
    } else {
        (0..n).map(compute).collect()
    };

    let mut out = CurvatureResult {
        gaussian: Vec::with_capacity(n),
        mean: Vec::with_capacity(n),
        principal_max: Vec::with_capacity(n),
        principal_min: Vec::with_capacity(n),
    };
    for vc in results {
        out.gaussian.push(vc.gaussian);
        out.mean.push(vc.mean);
        out.principal_max.push(vc.principal_max);
        out.principal_min.push(vc.principal_min);
    }
    out
}

/// Maximum absolute principal curvature per vertex slot.
///
/// Boundary estimates are unreliable, so boundary vertices take the mean of
/// their interior neighbours (zero if they have none).
pub fn max_abs_curvature(mesh: &HalfEdgeMesh) -> Vec<f64> {
    let result = compute_curvature(mesh);
    let mut values: Vec<f64> = (0..mesh.vertices_size())
        .map(|i| result.max_abs(VertexId::new(i)))
        .collect();

    for v in mesh.vertex_ids() {
        if !mesh.is_boundary_vertex(v) {
            continue;
        }
        let (sum, count) = mesh
            .vertex_neighbors(v)
            .filter(|&w| !mesh.is_boundary_vertex(w))
            .fold((0.0, 0usize), |(s, c), w| (s + result.max_abs(w), c + 1));
        values[v.index()] = if count > 0 { sum / count as f64 } else { 0.0 };
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_triangles;

    fn create_flat_grid(n: usize) -> HalfEdgeMesh {
        let mut vertices = Vec::new();
        let mut faces = Vec::new();

        for j in 0..=n {
            for i in 0..=n {
                vertices.push(Point3::new(i as f64, j as f64, 0.0));
            }
        }

        for j in 0..n {
            for i in 0..n {
                let v00 = j * (n + 1) + i;
                let v10 = j * (n + 1) + i + 1;
                let v01 = (j + 1) * (n + 1) + i;
                let v11 = (j + 1) * (n + 1) + i + 1;

                faces.push([v00, v10, v11]);
                faces.push([v00, v11, v01]);
            }
        }

        build_from_triangles(&vertices, &faces).unwrap()
    }

    fn create_icosphere(subdivisions: usize) -> HalfEdgeMesh {
        let phi = (1.0 + 5.0_f64.sqrt()) / 2.0;
        let scale = 1.0 / (1.0 + phi * phi).sqrt();

        let mut vertices = vec![
            Point3::new(-1.0, phi, 0.0) * scale,
            Point3::new(1.0, phi, 0.0) * scale,
            Point3::new(-1.0, -phi, 0.0) * scale,
            Point3::new(1.0, -phi, 0.0) * scale,
            Point3::new(0.0, -1.0, phi) * scale,
            Point3::new(0.0, 1.0, phi) * scale,
            Point3::new(0.0, -1.0, -phi) * scale,
            Point3::new(0.0, 1.0, -phi) * scale,
            Point3::new(phi, 0.0, -1.0) * scale,
            Point3::new(phi, 0.0, 1.0) * scale,
            Point3::new(-phi, 0.0, -1.0) * scale,
            Point3::new(-phi, 0.0, 1.0) * scale,
        ];

        let mut faces = vec![
            [0, 11, 5],
            [0, 5, 1],
            [0, 1, 7],
            [0, 7, 10],
            [0, 10, 11],
            [1, 5, 9],
            [5, 11, 4],
            [11, 10, 2],
            [10, 7, 6],
            [7, 1, 8],
            [3, 9, 4],
            [3, 4, 2],
            [3, 2, 6],
            [3, 6, 8],
            [3, 8, 9],
            [4, 9, 5],
            [2, 4, 11],
            [6, 2, 10],
            [8, 6, 7],
            [9, 8, 1],
        ];

        for _ in 0..subdivisions {
            let mut new_faces = Vec::new();
            let mut edge_midpoints: std::collections::HashMap<(usize, usize), usize> =
                std::collections::HashMap::new();

            for face in &faces {
                let mut mids = [0usize; 3];

                for i in 0..3 {
                    let v0 = face[i];
                    let v1 = face[(i + 1) % 3];
                    let key = if v0 < v1 { (v0, v1) } else { (v1, v0) };

                    mids[i] = *edge_midpoints.entry(key).or_insert_with(|| {
                        let mid = Point3::from((vertices[v0].coords + vertices[v1].coords) / 2.0);
                        vertices.push(Point3::from(mid.coords.normalize()));
                        vertices.len() - 1
                    });
                }

                new_faces.push([face[0], mids[0], mids[2]]);
                new_faces.push([face[1], mids[1], mids[0]]);
                new_faces.push([face[2], mids[2], mids[1]]);
                new_faces.push([mids[0], mids[1], mids[2]]);
            }

            faces = new_faces;
        }

        build_from_triangles(&vertices, &faces).unwrap()
    }

    #[test]
    fn test_curvature_flat_plane() {
        let mesh = create_flat_grid(3);
        let result = compute_curvature(&mesh);

        // vertex (1,1) is interior
        let v = VertexId::new(5);
        assert!(result.gaussian(v).abs() < 0.1);
        assert!(result.mean(v).abs() < 0.1);
        assert!(result.max_abs(v) < 0.1);
    }

    #[test]
    fn test_gauss_bonnet() {
        let mesh = create_icosphere(2);
        let result = compute_curvature(&mesh);

        let total: f64 = mesh
            .vertex_ids()
            .map(|v| result.gaussian(v) * mixed_area(&mesh, v))
            .sum();
        assert!(
            (total - 4.0 * PI).abs() < 0.5,
            "Gauss-Bonnet violated: got {}",
            total
        );
    }

    #[test]
    fn test_principal_curvatures_relation() {
        let mesh = create_icosphere(1);
        let result = compute_curvature(&mesh);

        for v in mesh.vertex_ids() {
            let (k1, k2) = result.principal(v);
            assert!(k1 >= k2 - 1e-10);
            assert!(((k1 + k2) / 2.0 - result.mean(v)).abs() < 0.1);
        }
    }

    #[test]
    fn test_sphere_max_abs_close_to_one() {
        let mesh = create_icosphere(3);
        let values = max_abs_curvature(&mesh);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        assert!((mean - 1.0).abs() < 0.2, "mean |k| = {}", mean);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mesh = create_icosphere(1);
        let a = compute_curvature(&mesh);
        let b = compute_curvature_sequential(&mesh);
        for v in mesh.vertex_ids() {
            assert_eq!(a.gaussian(v), b.gaussian(v));
            assert_eq!(a.mean(v), b.mean(v));
        }
    }

    #[test]
    fn test_boundary_vertices_take_interior_mean() {
        let mesh = create_flat_grid(2);
        let values = max_abs_curvature(&mesh);
        assert_eq!(values.len(), mesh.vertices_size());
        for v in mesh.vertex_ids() {
            assert!(values[v.index()].is_finite());
            assert!(values[v.index()] < 0.1);
        }
    }

    #[test]
    fn test_deleted_vertex_has_zero_curvature() {
        let mut mesh = create_icosphere(1);
        let v = VertexId::new(0);
        mesh.delete_vertex(v);
        let result = compute_curvature_sequential(&mesh);
        assert_eq!(result.len(), mesh.vertices_size());
        assert_eq!(result.gaussian(v), 0.0);
    }
}
