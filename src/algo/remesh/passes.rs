//! Split, collapse, flip and cap-removal passes.

use log::trace;
use nalgebra::Vector3;

use super::{
    Remesher, CAP_ANGLE_DEGREES, IDEAL_VALENCE_BOUNDARY, IDEAL_VALENCE_INTERIOR, MAX_PASSES,
};
use crate::mesh::{EdgeId, HalfEdgeId, VertexId};

impl Remesher<'_> {
    /// Split every edge longer than 4/3 of its target length at its midpoint.
    pub(super) fn split_long_edges(&mut self) {
        for pass in 0..MAX_PASSES {
            let mut changed = false;

            for i in 0..self.mesh.edges_size() {
                let e = EdgeId::new(i);
                if self.mesh.is_deleted_edge(e) || self.is_edge_locked(e) {
                    continue;
                }
                let h = e.halfedge(0);
                let v0 = self.mesh.source(h);
                let v1 = self.mesh.target(h);
                if !self.is_too_long(v0, v1) {
                    continue;
                }
                // both faces share their apex; splitting would double the edge to it
                if !self.mesh.is_boundary_edge(e)
                    && self.mesh.target(self.mesh.next(h)) == self.mesh.target(self.mesh.next(h.twin()))
                {
                    continue;
                }

                let midpoint = self.mesh.edge_midpoint(e);
                let sizing = self.target_length(v0, v1);
                let feature = self.is_feature_edge(e);

                let v = self.mesh.add_vertex(midpoint);
                let t1 = self.mesh.split_edge(e, v);
                let normal = self.mesh.vertex_normal(v);
                self.mesh.vertex_property_mut(self.vnormal)[v] = normal;
                self.mesh.vertex_property_mut(self.vsizing)[v] = sizing;

                if feature {
                    self.mesh.edge_property_mut(self.efeature)[t1.edge()] = true;
                    self.mesh.vertex_property_mut(self.vfeature)[v] = true;
                } else {
                    self.project_to_reference(v);
                }

                self.stats.splits += 1;
                changed = true;
            }

            if !changed {
                trace!("split converged after {} passes", pass + 1);
                break;
            }
        }
    }

    /// Collapse every edge shorter than 4/5 of its target length where the
    /// boundary, lock and feature rules allow it.
    pub(super) fn collapse_short_edges(&mut self) {
        for pass in 0..MAX_PASSES {
            let mut changed = false;

            for i in 0..self.mesh.edges_size() {
                let e = EdgeId::new(i);
                if self.mesh.is_deleted_edge(e) || self.is_edge_locked(e) {
                    continue;
                }

                // h01 moves v0 into v1, h10 moves v1 into v0
                let h10 = e.halfedge(0);
                let h01 = e.halfedge(1);
                let v0 = self.mesh.target(h10);
                let v1 = self.mesh.target(h01);

                if !self.is_too_short(v0, v1) {
                    continue;
                }

                let mut hcol01 = true;
                let mut hcol10 = true;

                let b0 = self.mesh.is_boundary_vertex(v0);
                let b1 = self.mesh.is_boundary_vertex(v1);
                if b0 && b1 {
                    if !self.mesh.is_boundary_edge(e) {
                        continue;
                    }
                } else if b0 {
                    hcol01 = false;
                } else if b1 {
                    hcol10 = false;
                }

                let l0 = self.is_locked(v0);
                let l1 = self.is_locked(v1);
                if l0 && l1 {
                    continue;
                } else if l0 {
                    hcol01 = false;
                } else if l1 {
                    hcol10 = false;
                }

                let f0 = self.is_feature(v0);
                let f1 = self.is_feature(v1);
                if f0 && f1 {
                    if !self.is_feature_edge(e) {
                        continue;
                    }
                    // the two edges merged away by a collapse must not be features
                    if self.removes_feature_edge(h01) {
                        hcol01 = false;
                    }
                    if self.removes_feature_edge(h10) {
                        hcol10 = false;
                    }
                } else if f0 {
                    hcol01 = false;
                } else if f1 {
                    hcol10 = false;
                }

                hcol01 = hcol01 && self.mesh.is_collapse_ok(h01);
                hcol10 = hcol10 && self.mesh.is_collapse_ok(h10);
                if !hcol01 && !hcol10 {
                    continue;
                }

                // keep the vertex of higher valence
                let keep_v0 = if hcol01 && hcol10 {
                    self.mesh.valence(v0) >= self.mesh.valence(v1)
                } else {
                    hcol10
                };
                let (h, removed, kept) = if keep_v0 { (h10, v1, v0) } else { (h01, v0, v1) };

                if self.creates_long_edge(removed, kept) {
                    continue;
                }
                self.mesh.collapse(h);

                self.stats.collapses += 1;
                changed = true;
            }

            if !changed {
                trace!("collapse converged after {} passes", pass + 1);
                break;
            }
        }

        self.mesh.collect_garbage();
    }

    /// Whether an edge merged away by collapsing `h` is a feature edge.
    fn removes_feature_edge(&self, h: HalfEdgeId) -> bool {
        let o = h.twin();
        [self.mesh.prev(h), self.mesh.next(o)]
            .into_iter()
            .any(|x| self.is_feature_edge(x.edge()))
    }

    /// Whether moving `removed` into `kept` would leave an edge longer than
    /// the split threshold.
    fn creates_long_edge(&self, removed: VertexId, kept: VertexId) -> bool {
        self.mesh
            .vertex_neighbors(removed)
            .any(|w| w != kept && self.is_too_long(kept, w))
    }

    /// Flip edges while the squared deviation from the ideal valences drops.
    pub(super) fn flip_edges(&mut self) {
        let mut valence: Vec<i64> = (0..self.mesh.vertices_size())
            .map(|i| {
                let v = VertexId::new(i);
                if self.mesh.is_deleted_vertex(v) {
                    0
                } else {
                    self.mesh.valence(v) as i64
                }
            })
            .collect();
        let ideal: Vec<i64> = (0..self.mesh.vertices_size())
            .map(|i| {
                if self.mesh.is_boundary_vertex(VertexId::new(i)) {
                    IDEAL_VALENCE_BOUNDARY
                } else {
                    IDEAL_VALENCE_INTERIOR
                }
            })
            .collect();

        for pass in 0..MAX_PASSES {
            let mut changed = false;

            for i in 0..self.mesh.edges_size() {
                let e = EdgeId::new(i);
                if self.mesh.is_deleted_edge(e)
                    || self.mesh.is_boundary_edge(e)
                    || self.is_edge_locked(e)
                    || self.is_feature_edge(e)
                {
                    continue;
                }

                let h0 = e.halfedge(0);
                let h1 = e.halfedge(1);
                let v0 = self.mesh.target(h0);
                let v2 = self.mesh.target(self.mesh.next(h0));
                let v1 = self.mesh.target(h1);
                let v3 = self.mesh.target(self.mesh.next(h1));

                if [v0, v1, v2, v3].iter().any(|&v| self.is_locked(v)) {
                    continue;
                }

                let deviation = |v: VertexId, delta: i64| {
                    let d = valence[v.index()] + delta - ideal[v.index()];
                    d * d
                };
                let before = deviation(v0, 0) + deviation(v1, 0) + deviation(v2, 0) + deviation(v3, 0);
                let after = deviation(v0, -1) + deviation(v1, -1) + deviation(v2, 1) + deviation(v3, 1);

                if after < before && self.mesh.is_flip_ok(e) {
                    self.mesh.flip(e);
                    valence[v0.index()] -= 1;
                    valence[v1.index()] -= 1;
                    valence[v2.index()] += 1;
                    valence[v3.index()] += 1;
                    self.stats.flips += 1;
                    changed = true;
                }
            }

            if !changed {
                trace!("flip converged after {} passes", pass + 1);
                break;
            }
        }
    }

    /// Flip the edge opposite every angle above 170°.
    pub(super) fn remove_caps(&mut self) {
        let threshold = CAP_ANGLE_DEGREES.to_radians().cos();

        for i in 0..self.mesh.edges_size() {
            let e = EdgeId::new(i);
            if self.mesh.is_deleted_edge(e) || self.is_edge_locked(e) || !self.mesh.is_flip_ok(e) {
                continue;
            }

            let h0 = e.halfedge(0);
            let h1 = e.halfedge(1);
            let a = self.mesh.target(h0);
            let b = self.mesh.target(self.mesh.next(h0));
            let c = self.mesh.target(h1);
            let d = self.mesh.target(self.mesh.next(h1));

            let pa = *self.mesh.position(a);
            let pc = *self.mesh.position(c);
            let cos_at = |v: VertexId| {
                let p = self.mesh.position(v);
                let u = pa - p;
                let w = pc - p;
                let len = u.norm() * w.norm();
                if len > 0.0 {
                    u.dot(&w) / len
                } else {
                    1.0
                }
            };
            let (cos_b, cos_d) = (cos_at(b), cos_at(d));
            let (cos_min, v) = if cos_b < cos_d { (cos_b, b) } else { (cos_d, d) };

            if cos_min >= threshold {
                continue;
            }

            if self.is_feature_edge(e) {
                if self.is_feature(v) || self.is_locked(v) || self.mesh.is_boundary_vertex(v) {
                    continue;
                }
                // the feature line now runs a-v-c
                self.mesh.set_position(v, nalgebra::center(&pa, &pc));
                let ea = self.mesh.find_edge(a, v);
                let ec = self.mesh.find_edge(v, c);
                let efeature = self.mesh.edge_property_mut(self.efeature);
                efeature[e] = false;
                efeature[ea] = true;
                efeature[ec] = true;
                self.mesh.vertex_property_mut(self.vfeature)[v] = true;
            }

            self.mesh.flip(e);
            self.stats.caps_removed += 1;
        }
    }

    /// Move a vertex to its closest point on the reference surface and
    /// interpolate its normal and sizing there.
    pub(super) fn project_to_reference(&mut self, v: VertexId) {
        let Some(reference) = self.reference.as_ref() else {
            return;
        };
        let p = *self.mesh.position(v);
        let Some(hit) = reference.bvh.nearest(&p) else {
            return;
        };

        let [a, b, c] = reference.mesh.face_triangle(hit.face);
        let normal = hit.interpolate_vector([
            reference.normals[a.index()],
            reference.normals[b.index()],
            reference.normals[c.index()],
        ]);
        let normal = normal.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros);
        let sizing = hit.interpolate([
            reference.sizing[a.index()],
            reference.sizing[b.index()],
            reference.sizing[c.index()],
        ]);

        self.mesh.set_position(v, hit.point);
        self.mesh.vertex_property_mut(self.vnormal)[v] = normal;
        self.mesh.vertex_property_mut(self.vsizing)[v] = sizing;
    }
}
