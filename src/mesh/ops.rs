//! Local topology operators: edge split, face split, edge collapse and edge flip.
//!
//! All operators rewrite connectivity in place. `collapse` and `flip` have
//! preconditions ([`HalfEdgeMesh::is_collapse_ok`], [`HalfEdgeMesh::is_flip_ok`])
//! that callers must check; they are only asserted in debug builds.
//!
//! Element count deltas:
//!
//! | operator | vertices | edges | faces |
//! |----------|----------|-------|-------|
//! | [`split_edge`](HalfEdgeMesh::split_edge) | +1 (given) | +3 interior, +2 boundary | +2 interior, +1 boundary |
//! | [`collapse`](HalfEdgeMesh::collapse) | -1 | -3 interior, -2 boundary | -2 interior, -1 boundary |
//! | [`flip`](HalfEdgeMesh::flip) | 0 | 0 | 0 |

use super::halfedge::HalfEdgeMesh;
use super::index::{EdgeId, FaceId, HalfEdgeId, VertexId};

impl HalfEdgeMesh {
    // ==================== Split ====================

    /// Split an edge of a triangle mesh at the (isolated) vertex `v`.
    ///
    /// Both incident triangles are split in two. Returns the new half-edge
    /// that runs from the former source of `halfedge(e, 0)` into `v`; its
    /// edge is the new half of `e`.
    pub fn split_edge(&mut self, e: EdgeId, v: VertexId) -> HalfEdgeId {
        debug_assert!(self.is_isolated(v), "split vertex must be isolated");

        let h0 = e.halfedge(0);
        let o0 = e.halfedge(1);

        let v2 = self.target(o0);

        let e1 = self.new_edge(v, v2);
        let t1 = e1.twin();

        let f0 = self.face_of(h0);
        let f3 = self.face_of(o0);

        self.set_vertex_halfedge(v, h0);
        self.set_target(o0, v);

        if !self.is_boundary_halfedge(h0) {
            let h1 = self.next(h0);
            let h2 = self.next(h1);

            let v1 = self.target(h1);

            let e0 = self.new_edge(v, v1);
            let t0 = e0.twin();

            let f1 = self.new_face();
            self.set_face_halfedge(f0, h0);
            self.set_face_halfedge(f1, h2);

            self.set_face(h1, f0);
            self.set_face(t0, f0);
            self.set_face(h0, f0);

            self.set_face(h2, f1);
            self.set_face(t1, f1);
            self.set_face(e0, f1);

            self.set_next(h0, h1);
            self.set_next(h1, t0);
            self.set_next(t0, h0);

            self.set_next(e0, h2);
            self.set_next(h2, t1);
            self.set_next(t1, e0);
        } else {
            let p = self.prev(h0);
            self.set_next(p, t1);
            self.set_next(t1, h0);
        }

        if !self.is_boundary_halfedge(o0) {
            let o1 = self.next(o0);
            let o2 = self.next(o1);

            let v3 = self.target(o1);

            let e2 = self.new_edge(v, v3);
            let t2 = e2.twin();

            let f2 = self.new_face();
            self.set_face_halfedge(f2, o1);
            self.set_face_halfedge(f3, o0);

            self.set_face(o1, f2);
            self.set_face(t2, f2);
            self.set_face(e1, f2);

            self.set_face(o2, f3);
            self.set_face(o0, f3);
            self.set_face(e2, f3);

            self.set_next(e1, o1);
            self.set_next(o1, t2);
            self.set_next(t2, e1);

            self.set_next(o0, e2);
            self.set_next(e2, o2);
            self.set_next(o2, o0);
        } else {
            let n = self.next(o0);
            self.set_next(e1, n);
            self.set_next(o0, e1);
            self.set_vertex_halfedge(v, e1);
        }

        if self.vertex_halfedge(v2) == h0 {
            self.set_vertex_halfedge(v2, t1);
        }

        t1
    }

    /// Insert the (isolated) vertex `v` on the edge of `h0` without
    /// triangulating the incident faces, which gain one corner each.
    ///
    /// Returns the new half-edge that runs from the target of `h0` into `v`.
    pub fn insert_vertex(&mut self, h0: HalfEdgeId, v: VertexId) -> HalfEdgeId {
        let h2 = self.next(h0);
        let o0 = h0.twin();
        let o2 = self.prev(o0);
        let v2 = self.target(h0);
        let fh = self.face_of(h0);
        let fo = self.face_of(o0);

        let h1 = self.new_edge(v, v2);
        let o1 = h1.twin();

        self.set_next(h1, h2);
        self.set_next(h0, h1);
        self.set_target(h0, v);
        self.set_target(h1, v2);
        self.set_face(h1, fh);

        self.set_next(o1, o0);
        self.set_next(o2, o1);
        self.set_target(o1, v);
        self.set_face(o1, fo);

        self.set_vertex_halfedge(v2, o1);
        self.adjust_outgoing_halfedge(v2);
        self.set_vertex_halfedge(v, h1);
        self.adjust_outgoing_halfedge(v);

        if fh.is_valid() {
            self.set_face_halfedge(fh, h0);
        }
        if fo.is_valid() {
            self.set_face_halfedge(fo, o1);
        }

        o1
    }

    /// Split a face into a triangle fan around the (isolated) vertex `v`.
    ///
    /// `f` stays valid and becomes one of the fan triangles.
    pub fn split_face(&mut self, f: FaceId, v: VertexId) {
        debug_assert!(self.is_isolated(v), "split vertex must be isolated");

        let hend = self.face_halfedge(f);
        let mut h = self.next(hend);

        let first = self.new_edge(self.target(hend), v);
        self.set_next(hend, first);
        self.set_face(first, f);

        let mut hold = first.twin();

        while h != hend {
            let hnext = self.next(h);

            let fnew = self.new_face();
            self.set_face_halfedge(fnew, h);

            let hnew = self.new_edge(self.target(h), v);

            self.set_next(hnew, hold);
            self.set_next(hold, h);
            self.set_next(h, hnew);

            self.set_face(hnew, fnew);
            self.set_face(hold, fnew);
            self.set_face(h, fnew);

            hold = hnew.twin();
            h = hnext;
        }

        self.set_next(hold, hend);
        let n = self.next(hend);
        self.set_next(n, hold);
        self.set_face(hold, f);

        self.set_vertex_halfedge(v, hold);
    }

    // ==================== Collapse ====================

    /// Whether collapsing `v0v1` (moving its source into its target) keeps
    /// the mesh manifold and free of duplicate edges.
    pub fn is_collapse_ok(&self, v0v1: HalfEdgeId) -> bool {
        if self.is_deleted_halfedge(v0v1) {
            return false;
        }
        let v1v0 = v0v1.twin();
        let v0 = self.target(v1v0);
        let v1 = self.target(v0v1);
        let mut vl = VertexId::invalid();
        let mut vr = VertexId::invalid();

        // the edges v1-vl and vl-v0 must not be both boundary edges
        if !self.is_boundary_halfedge(v0v1) {
            let h1 = self.next(v0v1);
            let h2 = self.next(h1);
            vl = self.target(h1);
            if self.next(h2) != v0v1 {
                return false;
            }
            if self.is_boundary_halfedge(h1.twin()) && self.is_boundary_halfedge(h2.twin()) {
                return false;
            }
        }

        // the edges v0-vr and vr-v1 must not be both boundary edges
        if !self.is_boundary_halfedge(v1v0) {
            let h1 = self.next(v1v0);
            let h2 = self.next(h1);
            vr = self.target(h1);
            if self.next(h2) != v1v0 {
                return false;
            }
            if self.is_boundary_halfedge(h1.twin()) && self.is_boundary_halfedge(h2.twin()) {
                return false;
            }
        }

        // vl and vr equal or both missing
        if vl == vr {
            return false;
        }

        // a second v0-v1 edge would become a loop
        if self.vertex_neighbors(v0).filter(|&w| w == v1).count() > 1 {
            return false;
        }

        // an interior vertex of valence 3 at vl or vr would drop to valence 2
        for v in [vl, vr] {
            if v.is_valid() && !self.is_boundary_vertex(v) && self.valence(v) == 3 {
                return false;
            }
        }

        // an edge between two boundary vertices must be a boundary edge
        if self.is_boundary_vertex(v0)
            && self.is_boundary_vertex(v1)
            && !self.is_boundary_halfedge(v0v1)
            && !self.is_boundary_halfedge(v1v0)
        {
            return false;
        }

        // the one-rings of v0 and v1 may only share vl and vr
        for vv in self.vertex_neighbors(v0) {
            if vv != v1 && vv != vl && vv != vr && self.find_halfedge(vv, v1).is_valid() {
                return false;
            }
        }

        true
    }

    /// Collapse the edge of `h`, moving `source(h)` into `target(h)`.
    ///
    /// Degenerate two-sided faces left behind are removed and the rim
    /// half-edges are re-linked.
    pub fn collapse(&mut self, h: HalfEdgeId) {
        debug_assert!(self.is_collapse_ok(h), "collapse of {:?} is not allowed", h);

        let h0 = h;
        let h1 = self.prev(h0);
        let o0 = h0.twin();
        let o1 = self.next(o0);

        self.remove_edge_helper(h0);

        if self.next(self.next(h1)) == h1 {
            self.remove_loop_helper(h1);
        }
        if self.next(self.next(o1)) == o1 {
            self.remove_loop_helper(o1);
        }
    }

    fn remove_edge_helper(&mut self, h: HalfEdgeId) {
        let hn = self.next(h);
        let hp = self.prev(h);

        let o = h.twin();
        let on = self.next(o);
        let op = self.prev(o);

        let fh = self.face_of(h);
        let fo = self.face_of(o);

        let vh = self.target(h);
        let vo = self.target(o);

        let incoming: Vec<HalfEdgeId> = self.vertex_halfedges(vo).map(|hc| hc.twin()).collect();
        for hc in incoming {
            self.set_target(hc, vh);
        }

        self.set_next(hp, hn);
        self.set_next(op, on);

        if fh.is_valid() {
            self.set_face_halfedge(fh, hn);
        }
        if fo.is_valid() {
            self.set_face_halfedge(fo, on);
        }

        if self.vertex_halfedge(vh) == o {
            self.set_vertex_halfedge(vh, hn);
        }
        self.adjust_outgoing_halfedge(vh);
        self.set_vertex_halfedge(vo, HalfEdgeId::invalid());

        self.mark_vertex_deleted(vo);
        self.mark_edge_deleted(h.edge());
    }

    fn remove_loop_helper(&mut self, h: HalfEdgeId) {
        let h0 = h;
        let h1 = self.next(h0);

        let o0 = h0.twin();
        let o1 = h1.twin();

        let v0 = self.target(h0);
        let v1 = self.target(h1);

        let fh = self.face_of(h0);
        let fo = self.face_of(o0);

        debug_assert!(self.next(h1) == h0 && h1 != o0);

        let on = self.next(o0);
        let op = self.prev(o0);
        self.set_next(h1, on);
        self.set_next(op, h1);

        self.set_face(h1, fo);

        self.set_vertex_halfedge(v0, h1);
        self.adjust_outgoing_halfedge(v0);
        self.set_vertex_halfedge(v1, o1);
        self.adjust_outgoing_halfedge(v1);

        if fo.is_valid() && self.face_halfedge(fo) == o0 {
            self.set_face_halfedge(fo, h1);
        }

        if fh.is_valid() {
            self.mark_face_deleted(fh);
        }
        self.mark_edge_deleted(h.edge());
    }

    // ==================== Flip ====================

    /// Whether the diagonal of the two triangles sharing `e` can be flipped.
    pub fn is_flip_ok(&self, e: EdgeId) -> bool {
        if self.is_deleted_edge(e) || self.is_boundary_edge(e) {
            return false;
        }

        let h0 = e.halfedge(0);
        let h1 = e.halfedge(1);

        if self.next(self.next(self.next(h0))) != h0 || self.next(self.next(self.next(h1))) != h1 {
            return false;
        }

        let v0 = self.target(self.next(h0));
        let v1 = self.target(self.next(h1));

        if v0 == v1 {
            return false;
        }

        !self.find_halfedge(v0, v1).is_valid()
    }

    /// Replace the diagonal of the two triangles sharing `e`.
    pub fn flip(&mut self, e: EdgeId) {
        debug_assert!(self.is_flip_ok(e), "flip of {:?} is not allowed", e);

        let a0 = e.halfedge(0);
        let b0 = e.halfedge(1);

        let a1 = self.next(a0);
        let a2 = self.next(a1);

        let b1 = self.next(b0);
        let b2 = self.next(b1);

        let va0 = self.target(a0);
        let va1 = self.target(a1);

        let vb0 = self.target(b0);
        let vb1 = self.target(b1);

        let fa = self.face_of(a0);
        let fb = self.face_of(b0);

        self.set_target(a0, va1);
        self.set_target(b0, vb1);

        self.set_next(a0, a2);
        self.set_next(a2, b1);
        self.set_next(b1, a0);

        self.set_next(b0, b2);
        self.set_next(b2, a1);
        self.set_next(a1, b0);

        self.set_face(a1, fb);
        self.set_face(b1, fa);

        self.set_face_halfedge(fa, a0);
        self.set_face_halfedge(fb, b0);

        if self.vertex_halfedge(va0) == b0 {
            self.set_vertex_halfedge(va0, a1);
        }
        if self.vertex_halfedge(vb0) == a0 {
            self.set_vertex_halfedge(vb0, b1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn tetrahedron() -> (HalfEdgeMesh, [VertexId; 4]) {
        let mut mesh = HalfEdgeMesh::new();
        let v = [
            mesh.add_vertex(Point3::new(0.0, 0.0, 0.0)),
            mesh.add_vertex(Point3::new(1.0, 0.0, 0.0)),
            mesh.add_vertex(Point3::new(0.5, 1.0, 0.0)),
            mesh.add_vertex(Point3::new(0.5, 0.5, 1.0)),
        ];
        for t in [[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]] {
            assert!(mesh.add_triangle(v[t[0]], v[t[1]], v[t[2]]).is_valid());
        }
        (mesh, v)
    }

    fn two_triangles() -> (HalfEdgeMesh, [VertexId; 4]) {
        // 3 --- 2
        // | \   |
        // |  \  |
        // 0 --- 1     diagonal 1-3
        let mut mesh = HalfEdgeMesh::new();
        let v = [
            mesh.add_vertex(Point3::new(0.0, 0.0, 0.0)),
            mesh.add_vertex(Point3::new(1.0, 0.0, 0.0)),
            mesh.add_vertex(Point3::new(1.0, 1.0, 0.0)),
            mesh.add_vertex(Point3::new(0.0, 1.0, 0.0)),
        ];
        mesh.add_triangle(v[0], v[1], v[3]);
        mesh.add_triangle(v[1], v[2], v[3]);
        (mesh, v)
    }

    #[test]
    fn test_split_interior_edge() {
        let (mut mesh, v) = tetrahedron();
        let e = mesh.find_edge(v[0], v[1]);
        let mid = mesh.edge_midpoint(e);
        let m = mesh.add_vertex(mid);
        let h = mesh.split_edge(e, m);

        assert_eq!(mesh.num_vertices(), 5);
        assert_eq!(mesh.num_edges(), 9);
        assert_eq!(mesh.num_faces(), 6);
        assert!(mesh.is_valid());
        assert_eq!(mesh.target(h), m);
        assert_eq!(mesh.valence(m), 4);
        assert!(mesh.is_triangle_mesh());
        assert!(mesh.find_halfedge(v[0], m).is_valid() || mesh.find_halfedge(v[1], m).is_valid());
        assert!(!mesh.find_edge(v[0], v[1]).is_valid());
    }

    #[test]
    fn test_split_boundary_edge() {
        let (mut mesh, v) = two_triangles();
        let e = mesh.find_edge(v[0], v[1]);
        assert!(mesh.is_boundary_edge(e));
        let m = mesh.add_vertex(mesh.edge_midpoint(e));
        mesh.split_edge(e, m);

        assert_eq!(mesh.num_vertices(), 5);
        assert_eq!(mesh.num_edges(), 7);
        assert_eq!(mesh.num_faces(), 3);
        assert!(mesh.is_valid());
        assert!(mesh.is_boundary_vertex(m));
        assert_eq!(mesh.valence(m), 3);
    }

    #[test]
    fn test_collapse_interior() {
        let (mut mesh, v) = tetrahedron();
        let e = mesh.find_edge(v[0], v[1]);
        let m = mesh.add_vertex(mesh.edge_midpoint(e));
        mesh.split_edge(e, m);

        let h = mesh.find_halfedge(m, v[1]);
        assert!(mesh.is_collapse_ok(h));
        mesh.collapse(h);

        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_edges(), 6);
        assert_eq!(mesh.num_faces(), 4);
        assert!(mesh.is_valid());
        mesh.collect_garbage();
        assert!(mesh.is_valid());
        assert_eq!(mesh.vertices_size(), 4);
    }

    #[test]
    fn test_collapse_boundary() {
        let (mut mesh, v) = two_triangles();
        let e = mesh.find_edge(v[0], v[1]);
        let m = mesh.add_vertex(mesh.edge_midpoint(e));
        mesh.split_edge(e, m);

        let h = mesh.find_halfedge(m, v[0]);
        assert!(mesh.is_collapse_ok(h));
        mesh.collapse(h);
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_edges(), 5);
        assert_eq!(mesh.num_faces(), 2);
        assert!(mesh.is_valid());
        assert!(mesh.is_boundary_vertex(v[0]));
    }

    #[test]
    fn test_lone_triangle_collapse_rejected() {
        let mut mesh = HalfEdgeMesh::new();
        let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
        mesh.add_triangle(a, b, c);
        for h in mesh.halfedge_ids() {
            assert!(!mesh.is_collapse_ok(h));
        }
    }

    #[test]
    fn test_tetrahedron_collapse_rejected() {
        let (mesh, _) = tetrahedron();
        for h in mesh.halfedge_ids() {
            assert!(!mesh.is_collapse_ok(h));
        }
    }

    #[test]
    fn test_collapse_rejects_double_edge() {
        // two triangles glued along all three edges
        let mut mesh = HalfEdgeMesh::new();
        let v = [
            mesh.add_vertex(Point3::new(0.0, 0.0, 0.0)),
            mesh.add_vertex(Point3::new(1.0, 0.0, 0.0)),
            mesh.add_vertex(Point3::new(0.0, 1.0, 0.0)),
        ];
        assert!(mesh.add_triangle(v[0], v[1], v[2]).is_valid());
        assert!(mesh.add_triangle(v[1], v[0], v[2]).is_valid());
        assert!(mesh.is_valid());

        // both new spokes of the split run from m to v2
        let e = mesh.find_edge(v[0], v[1]);
        let m = mesh.add_vertex(mesh.edge_midpoint(e));
        mesh.split_edge(e, m);
        assert!(mesh.is_valid());

        let spokes: Vec<HalfEdgeId> = mesh
            .vertex_halfedges(m)
            .filter(|&h| mesh.target(h) == v[2])
            .collect();
        assert_eq!(spokes.len(), 2);
        for h in spokes {
            assert!(!mesh.is_collapse_ok(h));
            assert!(!mesh.is_collapse_ok(h.twin()));
        }
    }

    #[test]
    fn test_collapse_rejects_interior_edge_between_boundary_vertices() {
        let (mesh, v) = two_triangles();
        let h = mesh.find_halfedge(v[1], v[3]);
        assert!(!mesh.is_collapse_ok(h));
        assert!(!mesh.is_collapse_ok(h.twin()));

        // the boundary edge 0-1 may collapse, leaving one triangle
        assert!(mesh.is_collapse_ok(mesh.find_halfedge(v[0], v[1])));
    }

    #[test]
    fn test_flip() {
        let (mut mesh, v) = two_triangles();
        let e = mesh.find_edge(v[1], v[3]);
        assert!(mesh.is_flip_ok(e));
        mesh.flip(e);

        assert!(mesh.is_valid());
        assert_eq!(mesh.num_edges(), 5);
        assert_eq!(mesh.num_faces(), 2);
        assert!(!mesh.find_edge(v[1], v[3]).is_valid());
        assert!(mesh.find_edge(v[0], v[2]).is_valid());
        assert_eq!(mesh.valence(v[1]), 2);
        assert_eq!(mesh.valence(v[0]), 3);

        // boundary edges never flip
        assert!(!mesh.is_flip_ok(mesh.find_edge(v[0], v[1])));
    }

    #[test]
    fn test_flip_rejects_existing_diagonal() {
        let (mesh, v) = tetrahedron();
        // flipping 0-1 would produce 2-3, which already exists
        assert!(!mesh.is_flip_ok(mesh.find_edge(v[0], v[1])));
    }

    #[test]
    fn test_split_face() {
        let mut mesh = HalfEdgeMesh::new();
        let v: Vec<VertexId> = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .iter()
            .map(|&(x, y)| mesh.add_vertex(Point3::new(x, y, 0.0)))
            .collect();
        let f = mesh.add_face(&v);
        let c = mesh.add_vertex(mesh.face_centroid(f));
        mesh.split_face(f, c);

        assert!(mesh.is_valid());
        assert_eq!(mesh.num_faces(), 4);
        assert_eq!(mesh.num_edges(), 8);
        assert!(mesh.is_triangle_mesh());
        assert_eq!(mesh.valence(c), 4);
        assert!(!mesh.is_boundary_vertex(c));
    }

    #[test]
    fn test_insert_vertex() {
        let mut mesh = HalfEdgeMesh::new();
        let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
        let f = mesh.add_triangle(a, b, c);
        let m = mesh.add_vertex(Point3::new(0.5, 0.0, 0.0));
        let h = mesh.find_halfedge(a, b);
        mesh.insert_vertex(h, m);

        assert!(mesh.is_valid());
        assert_eq!(mesh.face_valence(f), 4);
        assert_eq!(mesh.num_edges(), 4);
        assert!(mesh.is_boundary_vertex(m));
    }
}
