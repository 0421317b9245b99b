//! Tangential relaxation of free vertices.

use nalgebra::{Matrix3, Point3, Vector3};

use super::Remesher;
use crate::mesh::VertexId;

impl Remesher<'_> {
    /// Move every free vertex towards a better spaced position within its
    /// tangent plane.
    ///
    /// Feature vertices slide along their feature line; all others move to
    /// the minimizer of the squared one-ring areas, or to the sizing-weighted
    /// centroid when that system is singular.
    pub(super) fn tangential_smoothing(&mut self, iterations: usize) {
        let projecting = self.reference.is_some();

        // vertices created by splits get reference normals and sizing
        if projecting {
            for v in self.free_vertices() {
                self.project_to_reference(v);
            }
        }

        for _ in 0..iterations {
            self.update_normals();

            let updates: Vec<(VertexId, Vector3<f64>)> = self
                .free_vertices()
                .into_iter()
                .filter_map(|v| {
                    let update = if self.is_feature(v) {
                        self.feature_update(v)?
                    } else {
                        self.area_update(v)
                    };
                    Some((v, update))
                })
                .collect();

            for (v, update) in updates {
                let p = self.mesh.position(v) + update;
                self.mesh.set_position(v, p);
            }
        }

        if projecting {
            for v in self.free_vertices() {
                self.project_to_reference(v);
            }
        }
    }

    fn free_vertices(&self) -> Vec<VertexId> {
        self.mesh
            .vertex_ids()
            .filter(|&v| !self.mesh.is_boundary_vertex(v) && !self.is_locked(v) && !self.mesh.is_isolated(v))
            .collect()
    }

    /// Displacement along the feature line through `v`, or `None` unless
    /// exactly two feature edges meet there.
    fn feature_update(&self, v: VertexId) -> Option<Vector3<f64>> {
        let p = *self.mesh.position(v);
        let mut target = Vector3::zeros();
        let mut tangent = Vector3::zeros();
        let mut total_weight = 0.0;
        let mut count = 0;

        for h in self.mesh.vertex_halfedges(v) {
            if !self.is_feature_edge(h.edge()) {
                continue;
            }
            let w = self.mesh.target(h);
            let q = *self.mesh.position(w);
            let weight = (q - p).norm() / self.target_length(v, w);
            target += weight * nalgebra::center(&p, &q).coords;
            total_weight += weight;

            let direction = (q - p).try_normalize(f64::EPSILON)?;
            if count == 0 {
                tangent += direction;
            } else {
                tangent -= direction;
            }
            count += 1;
        }

        if count != 2 || total_weight <= 0.0 {
            return None;
        }
        let tangent = tangent.try_normalize(f64::EPSILON)?;
        let u = target / total_weight - p.coords;
        Some(tangent * u.dot(&tangent))
    }

    /// Displacement towards the area minimizer, projected onto the tangent plane.
    fn area_update(&self, v: VertexId) -> Vector3<f64> {
        let p = *self.mesh.position(v);
        let goal = self
            .minimize_squared_areas(v)
            .unwrap_or_else(|| self.weighted_centroid(v));
        let u = goal - p;
        let n = self.normal(v);
        u - n * u.dot(&n)
    }

    /// Position minimizing the sum of squared areas of the one-ring triangles.
    fn minimize_squared_areas(&self, v: VertexId) -> Option<Point3<f64>> {
        let mut a = Matrix3::zeros();
        let mut b = Vector3::zeros();

        for h in self.mesh.vertex_halfedges(v) {
            let p = self.mesh.position(self.mesh.target(h)).coords;
            let q = self.mesh.position(self.mesh.target(self.mesh.next(h))).coords;
            let d = q - p;
            let len = d.norm();
            if len <= 0.0 {
                continue;
            }
            let w = 1.0 / len;
            let m = Matrix3::identity() * d.norm_squared() - d * d.transpose();
            a += w * m;
            b += w * (m * p);
        }

        let x = a.try_inverse()? * b;
        x.iter().all(|c| c.is_finite()).then(|| Point3::from(x))
    }

    /// Centroid of the one-ring triangles weighted by area over squared sizing.
    fn weighted_centroid(&self, v: VertexId) -> Point3<f64> {
        let p0 = *self.mesh.position(v);
        let s0 = self.sizing(v);
        let mut sum = Vector3::zeros();
        let mut total = 0.0;

        for h in self.mesh.vertex_halfedges(v) {
            let v1 = self.mesh.target(h);
            let v2 = self.mesh.target(self.mesh.next(h));
            let p1 = self.mesh.position(v1);
            let p2 = self.mesh.position(v2);

            let centroid = (p0.coords + p1.coords + p2.coords) / 3.0;
            let mut area = (p1 - p0).cross(&(p2 - p0)).norm();
            if area == 0.0 {
                area = 1.0;
            }
            let sizing = (s0 + self.sizing(v1) + self.sizing(v2)) / 3.0;
            let w = area / (sizing * sizing);
            sum += w * centroid;
            total += w;
        }

        if total > 0.0 && total.is_finite() {
            Point3::from(sum / total)
        } else {
            p0
        }
    }
}
