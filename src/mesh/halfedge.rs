//! Half-edge mesh data structure.
//!
//! This module provides a half-edge (doubly-connected edge list) representation
//! for polygon meshes. This structure enables O(1) adjacency queries and is
//! the foundation for the builder and the remeshing operators.
//!
//! # Structure
//!
//! - Each edge is split into two **half-edges** pointing in opposite directions.
//!   Half-edges `2k` and `2k + 1` are twins, so the twin is never stored.
//! - Each half-edge knows its **target vertex**, **next** and **prev** half-edge
//!   around its face, and its **incident face**
//! - Each vertex stores one outgoing half-edge
//! - Each face stores one half-edge on its boundary
//!
//! # Boundary Handling
//!
//! Boundary half-edges have an invalid face ID and are linked into boundary
//! loops through `next`/`prev`. The outgoing half-edge of a boundary vertex is
//! always a boundary half-edge, which makes [`HalfEdgeMesh::is_boundary_vertex`]
//! O(1).
//!
//! # Deletion
//!
//! `delete_*` only marks elements; handles stay stable until
//! [`HalfEdgeMesh::collect_garbage`] compacts the arrays.

use log::debug;
use nalgebra::{Point3, Vector3};
use thiserror::Error;

use super::index::{EdgeId, FaceId, HalfEdgeId, VertexId};
use super::property::{
    EdgeProperty, FaceProperty, HalfEdgeProperty, Model, ModelProperty, PropertyContainer,
    PropertyVec, VertexProperty,
};
use crate::error::Result;

/// A vertex in the half-edge mesh.
#[derive(Debug, Clone)]
pub struct Vertex {
    /// The 3D position of this vertex.
    pub position: Point3<f64>,

    /// One outgoing half-edge from this vertex.
    /// For boundary vertices, this is guaranteed to be a boundary half-edge.
    pub halfedge: HalfEdgeId,

    /// Marked for removal by the next garbage collection.
    pub deleted: bool,
}

impl Vertex {
    /// Create a new isolated vertex at the given position.
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            halfedge: HalfEdgeId::invalid(),
            deleted: false,
        }
    }
}

/// A half-edge in the mesh.
#[derive(Debug, Clone, Copy, Default)]
pub struct HalfEdge {
    /// The vertex this half-edge points to.
    pub vertex: VertexId,

    /// The next half-edge around the face (or boundary loop).
    pub next: HalfEdgeId,

    /// The previous half-edge around the face (or boundary loop).
    pub prev: HalfEdgeId,

    /// The face this half-edge belongs to.
    /// Invalid for boundary half-edges.
    pub face: FaceId,
}

impl HalfEdge {
    /// Check if this half-edge is on the boundary.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        !self.face.is_valid()
    }
}

/// A face in the half-edge mesh.
#[derive(Debug, Clone, Copy, Default)]
pub struct Face {
    /// One half-edge on the boundary of this face.
    pub halfedge: HalfEdgeId,

    /// Marked for removal by the next garbage collection.
    pub deleted: bool,
}

/// Reasons why a polygon cannot be linked into the current topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinkError {
    /// Fewer than three corners.
    #[error("face has fewer than 3 vertices")]
    TooFewVertices,

    /// The same vertex appears twice.
    #[error("face has duplicate vertices")]
    DuplicateVertex,

    /// A corner is out of range or deleted.
    #[error("corner {0} references a missing vertex")]
    InvalidVertex(usize),

    /// A corner vertex is not on the boundary.
    #[error("complex vertex at corner {0}")]
    ComplexVertex(usize),

    /// The half-edge from corner `i` to corner `i + 1` already has a face.
    #[error("complex edge starting at corner {0}")]
    ComplexEdge(usize),

    /// No free boundary gap around the corner for re-linking a patch.
    #[error("patch re-linking failed at corner {0}")]
    PatchRelinkFailed(usize),
}

/// Result of the topology checks run before a face is linked.
struct FacePlan {
    halfedges: Vec<HalfEdgeId>,
    is_new: Vec<bool>,
    next_cache: Vec<(HalfEdgeId, HalfEdgeId)>,
}

/// A half-edge mesh data structure for polygon meshes.
///
/// This structure stores vertices, half-edges, and faces with full connectivity
/// information, enabling O(1) adjacency queries, plus one
/// [`PropertyContainer`] per element kind.
#[derive(Debug, Clone)]
pub struct HalfEdgeMesh {
    /// All vertices in the mesh.
    pub(crate) vertices: Vec<Vertex>,

    /// All half-edges in the mesh.
    pub(crate) halfedges: Vec<HalfEdge>,

    /// All faces in the mesh.
    pub(crate) faces: Vec<Face>,

    /// Deletion flags, one per edge.
    pub(crate) edge_deleted: Vec<bool>,

    pub(crate) deleted_vertices: usize,
    pub(crate) deleted_edges: usize,
    pub(crate) deleted_faces: usize,
    pub(crate) has_garbage: bool,

    pub(crate) vprops: PropertyContainer<VertexId>,
    pub(crate) hprops: PropertyContainer<HalfEdgeId>,
    pub(crate) eprops: PropertyContainer<EdgeId>,
    pub(crate) fprops: PropertyContainer<FaceId>,
    pub(crate) mprops: PropertyContainer<Model>,
}

impl Default for HalfEdgeMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl HalfEdgeMesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            halfedges: Vec::new(),
            faces: Vec::new(),
            edge_deleted: Vec::new(),
            deleted_vertices: 0,
            deleted_edges: 0,
            deleted_faces: 0,
            has_garbage: false,
            vprops: PropertyContainer::new(0),
            hprops: PropertyContainer::new(0),
            eprops: PropertyContainer::new(0),
            fprops: PropertyContainer::new(0),
            mprops: PropertyContainer::new(1),
        }
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(num_vertices: usize, num_faces: usize) -> Self {
        // Closed triangle mesh: E = 3F/2, so HE = 3F
        let num_edges = num_faces * 3 / 2 + num_faces / 4;

        let mut mesh = Self::new();
        mesh.vertices.reserve(num_vertices);
        mesh.halfedges.reserve(2 * num_edges);
        mesh.edge_deleted.reserve(num_edges);
        mesh.faces.reserve(num_faces);
        mesh
    }

    /// Remove every element and every property.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    // ==================== Accessors ====================

    /// Number of live vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() - self.deleted_vertices
    }

    /// Number of live half-edges.
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        2 * self.num_edges()
    }

    /// Number of live edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edge_deleted.len() - self.deleted_edges
    }

    /// Number of live faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len() - self.deleted_faces
    }

    /// Size of the vertex array, including deleted vertices.
    #[inline]
    pub fn vertices_size(&self) -> usize {
        self.vertices.len()
    }

    /// Size of the half-edge array, including deleted half-edges.
    #[inline]
    pub fn halfedges_size(&self) -> usize {
        self.halfedges.len()
    }

    /// Size of the edge array, including deleted edges.
    #[inline]
    pub fn edges_size(&self) -> usize {
        self.edge_deleted.len()
    }

    /// Size of the face array, including deleted faces.
    #[inline]
    pub fn faces_size(&self) -> usize {
        self.faces.len()
    }

    /// Whether the mesh has no live vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_vertices() == 0
    }

    /// Whether any element is marked deleted.
    #[inline]
    pub fn has_garbage(&self) -> bool {
        self.has_garbage
    }

    /// Get a vertex by ID.
    #[inline]
    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.index()]
    }

    /// Get a half-edge by ID.
    #[inline]
    pub fn halfedge(&self, id: HalfEdgeId) -> &HalfEdge {
        &self.halfedges[id.index()]
    }

    /// Get a face by ID.
    #[inline]
    pub fn face(&self, id: FaceId) -> &Face {
        &self.faces[id.index()]
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId) -> &Point3<f64> {
        &self.vertices[v.index()].position
    }

    /// Set the position of a vertex.
    #[inline]
    pub fn set_position(&mut self, v: VertexId, pos: Point3<f64>) {
        self.vertices[v.index()].position = pos;
    }

    /// Whether a vertex is marked deleted.
    #[inline]
    pub fn is_deleted_vertex(&self, v: VertexId) -> bool {
        self.vertices[v.index()].deleted
    }

    /// Whether a half-edge belongs to a deleted edge.
    #[inline]
    pub fn is_deleted_halfedge(&self, h: HalfEdgeId) -> bool {
        self.edge_deleted[h.edge().index()]
    }

    /// Whether an edge is marked deleted.
    #[inline]
    pub fn is_deleted_edge(&self, e: EdgeId) -> bool {
        self.edge_deleted[e.index()]
    }

    /// Whether a face is marked deleted.
    #[inline]
    pub fn is_deleted_face(&self, f: FaceId) -> bool {
        self.faces[f.index()].deleted
    }

    // ==================== Topology Queries ====================

    /// The outgoing half-edge stored at a vertex.
    #[inline]
    pub fn vertex_halfedge(&self, v: VertexId) -> HalfEdgeId {
        self.vertices[v.index()].halfedge
    }

    /// The twin (opposite) half-edge.
    #[inline]
    pub fn twin(&self, he: HalfEdgeId) -> HalfEdgeId {
        he.twin()
    }

    /// Get the next half-edge around the face.
    #[inline]
    pub fn next(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.halfedges[he.index()].next
    }

    /// Get the previous half-edge around the face.
    #[inline]
    pub fn prev(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.halfedges[he.index()].prev
    }

    /// The vertex a half-edge points to.
    #[inline]
    pub fn target(&self, he: HalfEdgeId) -> VertexId {
        self.halfedges[he.index()].vertex
    }

    /// The vertex a half-edge starts from.
    #[inline]
    pub fn source(&self, he: HalfEdgeId) -> VertexId {
        self.target(he.twin())
    }

    /// Get the face of a half-edge.
    #[inline]
    pub fn face_of(&self, he: HalfEdgeId) -> FaceId {
        self.halfedges[he.index()].face
    }

    /// One half-edge of a face.
    #[inline]
    pub fn face_halfedge(&self, f: FaceId) -> HalfEdgeId {
        self.faces[f.index()].halfedge
    }

    /// Rotate an outgoing half-edge clockwise around its source.
    #[inline]
    pub fn rotate_cw(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.next(he.twin())
    }

    /// Rotate an outgoing half-edge counter-clockwise around its source.
    #[inline]
    pub fn rotate_ccw(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.prev(he).twin()
    }

    /// Check if a half-edge is on the boundary.
    #[inline]
    pub fn is_boundary_halfedge(&self, he: HalfEdgeId) -> bool {
        self.halfedges[he.index()].is_boundary()
    }

    /// Check if a vertex is on the boundary.
    ///
    /// Isolated vertices count as boundary vertices.
    #[inline]
    pub fn is_boundary_vertex(&self, v: VertexId) -> bool {
        let h = self.vertex_halfedge(v);
        !(h.is_valid() && self.face_of(h).is_valid())
    }

    /// Check if an edge is on the boundary.
    #[inline]
    pub fn is_boundary_edge(&self, e: EdgeId) -> bool {
        self.is_boundary_halfedge(e.halfedge(0)) || self.is_boundary_halfedge(e.halfedge(1))
    }

    /// Check if a face touches the boundary with one of its edges.
    pub fn is_boundary_face(&self, f: FaceId) -> bool {
        self.face_halfedges(f)
            .any(|h| self.is_boundary_halfedge(h.twin()))
    }

    /// Whether a vertex has no incident edge.
    #[inline]
    pub fn is_isolated(&self, v: VertexId) -> bool {
        !self.vertex_halfedge(v).is_valid()
    }

    /// A vertex is manifold if its one-ring contains at most one boundary gap.
    pub fn is_manifold(&self, v: VertexId) -> bool {
        let mut gaps = 0;
        for h in self.vertex_halfedges(v) {
            if self.is_boundary_halfedge(h) {
                gaps += 1;
                if gaps > 1 {
                    return false;
                }
            }
        }
        true
    }

    /// Number of edges incident to a vertex.
    pub fn valence(&self, v: VertexId) -> usize {
        self.vertex_halfedges(v).count()
    }

    /// Number of corners of a face.
    pub fn face_valence(&self, f: FaceId) -> usize {
        self.face_halfedges(f).count()
    }

    /// Whether every live face is a triangle.
    pub fn is_triangle_mesh(&self) -> bool {
        self.face_ids().all(|f| self.face_valence(f) == 3)
    }

    /// Find the half-edge from `start` to `end`.
    pub fn find_halfedge(&self, start: VertexId, end: VertexId) -> HalfEdgeId {
        self.vertex_halfedges(start)
            .find(|&h| self.target(h) == end)
            .unwrap_or_default()
    }

    /// Find the edge between two vertices.
    pub fn find_edge(&self, a: VertexId, b: VertexId) -> EdgeId {
        let h = self.find_halfedge(a, b);
        if h.is_valid() {
            h.edge()
        } else {
            EdgeId::invalid()
        }
    }

    // ==================== Iteration ====================

    /// Iterate over live vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.deleted)
            .map(|(i, _)| VertexId::new(i))
    }

    /// Iterate over live half-edge IDs.
    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId> + '_ {
        (0..self.halfedges.len())
            .filter(|&i| !self.edge_deleted[i >> 1])
            .map(HalfEdgeId::new)
    }

    /// Iterate over live edge IDs.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edge_deleted
            .iter()
            .enumerate()
            .filter(|(_, d)| !**d)
            .map(|(i, _)| EdgeId::new(i))
    }

    /// Iterate over live face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.faces
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.deleted)
            .map(|(i, _)| FaceId::new(i))
    }

    /// Iterate over outgoing half-edges around a vertex.
    pub fn vertex_halfedges(&self, v: VertexId) -> VertexHalfEdgeIter<'_> {
        VertexHalfEdgeIter::new(self, v)
    }

    /// Iterate over vertices adjacent to a vertex.
    pub fn vertex_neighbors(&self, v: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.vertex_halfedges(v).map(|he| self.target(he))
    }

    /// Iterate over faces adjacent to a vertex.
    pub fn vertex_faces(&self, v: VertexId) -> impl Iterator<Item = FaceId> + '_ {
        self.vertex_halfedges(v)
            .map(|he| self.face_of(he))
            .filter(|f| f.is_valid())
    }

    /// Iterate over half-edges around a face.
    pub fn face_halfedges(&self, f: FaceId) -> FaceHalfEdgeIter<'_> {
        FaceHalfEdgeIter::new(self, self.face_halfedge(f))
    }

    /// Iterate over the half-edges of the loop (face or boundary) containing `h`.
    pub fn loop_halfedges(&self, h: HalfEdgeId) -> FaceHalfEdgeIter<'_> {
        FaceHalfEdgeIter::new(self, h)
    }

    /// Iterate over vertices of a face.
    pub fn face_vertices(&self, f: FaceId) -> impl Iterator<Item = VertexId> + '_ {
        self.face_halfedges(f).map(|he| self.target(he))
    }

    /// Get the three vertices of a triangular face.
    pub fn face_triangle(&self, f: FaceId) -> [VertexId; 3] {
        let he0 = self.face_halfedge(f);
        let he1 = self.next(he0);
        let he2 = self.next(he1);
        [self.target(he0), self.target(he1), self.target(he2)]
    }

    /// Get the positions of the three vertices of a triangular face.
    pub fn face_positions(&self, f: FaceId) -> [Point3<f64>; 3] {
        let [v0, v1, v2] = self.face_triangle(f);
        [*self.position(v0), *self.position(v1), *self.position(v2)]
    }

    /// All boundary loops, each as the cycle of its boundary half-edges.
    pub fn boundary_loops(&self) -> Vec<Vec<HalfEdgeId>> {
        let mut visited = vec![false; self.halfedges.len()];
        let mut loops = Vec::new();
        for h in self.halfedge_ids() {
            if visited[h.index()] || !self.is_boundary_halfedge(h) {
                continue;
            }
            let cycle: Vec<HalfEdgeId> = self.loop_halfedges(h).collect();
            for c in &cycle {
                visited[c.index()] = true;
            }
            loops.push(cycle);
        }
        loops
    }

    // ==================== Geometry ====================

    /// Iterate over live vertex positions.
    pub fn positions(&self) -> impl Iterator<Item = &Point3<f64>> + '_ {
        self.vertices
            .iter()
            .filter(|v| !v.deleted)
            .map(|v| &v.position)
    }

    /// Unnormalized face normal (twice the vector area), valid for polygons.
    pub fn face_vector_area(&self, f: FaceId) -> Vector3<f64> {
        let mut n = Vector3::zeros();
        for h in self.face_halfedges(f) {
            let p = self.position(self.source(h));
            let q = self.position(self.target(h));
            n += p.coords.cross(&q.coords);
        }
        n
    }

    /// Compute the unit normal of a face (zero for degenerate faces).
    pub fn face_normal(&self, f: FaceId) -> Vector3<f64> {
        self.face_vector_area(f)
            .try_normalize(f64::MIN_POSITIVE)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Compute the area of a face.
    pub fn face_area(&self, f: FaceId) -> f64 {
        0.5 * self.face_vector_area(f).norm()
    }

    /// Compute the centroid of a face.
    pub fn face_centroid(&self, f: FaceId) -> Point3<f64> {
        let mut sum = Vector3::zeros();
        let mut n = 0;
        for v in self.face_vertices(f) {
            sum += self.position(v).coords;
            n += 1;
        }
        Point3::from(sum / n.max(1) as f64)
    }

    /// Compute the area-weighted normal at a vertex (zero if undefined).
    pub fn vertex_normal(&self, v: VertexId) -> Vector3<f64> {
        let mut normal = Vector3::zeros();
        for f in self.vertex_faces(v) {
            normal += self.face_vector_area(f);
        }
        normal
            .try_normalize(f64::MIN_POSITIVE)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Compute the length of an edge.
    pub fn edge_length(&self, e: EdgeId) -> f64 {
        self.edge_vector(e.halfedge(0)).norm()
    }

    /// Compute the half-edge vector (from source to target).
    pub fn edge_vector(&self, he: HalfEdgeId) -> Vector3<f64> {
        self.position(self.target(he)) - self.position(self.source(he))
    }

    /// Compute the midpoint of an edge.
    pub fn edge_midpoint(&self, e: EdgeId) -> Point3<f64> {
        let h = e.halfedge(0);
        let p0 = self.position(self.source(h));
        let p1 = self.position(self.target(h));
        Point3::from((p0.coords + p1.coords) * 0.5)
    }

    /// Mean length over all live edges.
    pub fn mean_edge_length(&self) -> f64 {
        let mut total = 0.0;
        let mut count = 0;
        for e in self.edge_ids() {
            total += self.edge_length(e);
            count += 1;
        }
        if count == 0 {
            0.0
        } else {
            total / count as f64
        }
    }

    /// Compute the bounding box of the live vertices.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut positions = self.positions();
        let first = *positions.next()?;
        let mut min = first;
        let mut max = first;

        for p in positions {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }

        Some((min, max))
    }

    /// Compute the total surface area of the mesh.
    pub fn surface_area(&self) -> f64 {
        self.face_ids().map(|f| self.face_area(f)).sum()
    }

    // ==================== Low-level Connectivity ====================

    #[inline]
    pub(crate) fn set_vertex_halfedge(&mut self, v: VertexId, h: HalfEdgeId) {
        self.vertices[v.index()].halfedge = h;
    }

    #[inline]
    pub(crate) fn set_target(&mut self, h: HalfEdgeId, v: VertexId) {
        self.halfedges[h.index()].vertex = v;
    }

    /// Link `h -> n` and `n.prev = h`.
    #[inline]
    pub(crate) fn set_next(&mut self, h: HalfEdgeId, n: HalfEdgeId) {
        self.halfedges[h.index()].next = n;
        self.halfedges[n.index()].prev = h;
    }

    #[inline]
    pub(crate) fn set_face(&mut self, h: HalfEdgeId, f: FaceId) {
        self.halfedges[h.index()].face = f;
    }

    #[inline]
    pub(crate) fn set_face_halfedge(&mut self, f: FaceId, h: HalfEdgeId) {
        self.faces[f.index()].halfedge = h;
    }

    pub(crate) fn mark_vertex_deleted(&mut self, v: VertexId) {
        let vertex = &mut self.vertices[v.index()];
        if !vertex.deleted {
            vertex.deleted = true;
            self.deleted_vertices += 1;
            self.has_garbage = true;
        }
    }

    pub(crate) fn mark_edge_deleted(&mut self, e: EdgeId) {
        if !self.edge_deleted[e.index()] {
            self.edge_deleted[e.index()] = true;
            self.deleted_edges += 1;
            self.has_garbage = true;
        }
    }

    pub(crate) fn mark_face_deleted(&mut self, f: FaceId) {
        let face = &mut self.faces[f.index()];
        if !face.deleted {
            face.deleted = true;
            self.deleted_faces += 1;
            self.has_garbage = true;
        }
    }

    /// Allocate an edge `start -> end`; returns the half-edge pointing to `end`.
    ///
    /// Both half-edges are left unlinked and without a face.
    pub(crate) fn new_edge(&mut self, start: VertexId, end: VertexId) -> HalfEdgeId {
        debug_assert!(start != end);
        let h0 = HalfEdgeId::new(self.halfedges.len());
        self.halfedges.push(HalfEdge {
            vertex: end,
            ..HalfEdge::default()
        });
        self.halfedges.push(HalfEdge {
            vertex: start,
            ..HalfEdge::default()
        });
        self.hprops.push();
        self.hprops.push();
        self.edge_deleted.push(false);
        self.eprops.push();
        h0
    }

    pub(crate) fn new_face(&mut self) -> FaceId {
        let f = FaceId::new(self.faces.len());
        self.faces.push(Face::default());
        self.fprops.push();
        f
    }

    // ==================== Construction ====================

    /// Add a new vertex and return its ID.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> VertexId {
        let id = VertexId::new(self.vertices.len());
        self.vertices.push(Vertex::new(position));
        self.vprops.push();
        id
    }

    /// Run the topology checks of [`add_face`](Self::add_face) without mutating.
    pub fn check_face(&self, vertices: &[VertexId]) -> std::result::Result<(), LinkError> {
        self.plan_face(vertices).map(|_| ())
    }

    fn plan_face(&self, vertices: &[VertexId]) -> std::result::Result<FacePlan, LinkError> {
        let n = vertices.len();
        if n < 3 {
            return Err(LinkError::TooFewVertices);
        }
        for (i, &v) in vertices.iter().enumerate() {
            if !v.is_valid() || v.index() >= self.vertices.len() || self.is_deleted_vertex(v) {
                return Err(LinkError::InvalidVertex(i));
            }
            if vertices[..i].contains(&v) {
                return Err(LinkError::DuplicateVertex);
            }
        }

        let mut halfedges = vec![HalfEdgeId::invalid(); n];
        let mut is_new = vec![false; n];
        let mut next_cache = Vec::with_capacity(3 * n);

        for i in 0..n {
            let ii = (i + 1) % n;
            if !self.is_boundary_vertex(vertices[i]) {
                return Err(LinkError::ComplexVertex(i));
            }

            halfedges[i] = self.find_halfedge(vertices[i], vertices[ii]);
            is_new[i] = !halfedges[i].is_valid();

            if !is_new[i] && !self.is_boundary_halfedge(halfedges[i]) {
                return Err(LinkError::ComplexEdge(i));
            }
        }

        // Re-link patches so the two old half-edges around each corner become consecutive.
        for i in 0..n {
            let ii = (i + 1) % n;
            if is_new[i] || is_new[ii] {
                continue;
            }
            let inner_prev = halfedges[i];
            let inner_next = halfedges[ii];
            if self.next(inner_prev) == inner_next {
                continue;
            }

            // Search a free gap between boundary_prev and boundary_next.
            let outer_prev = inner_next.twin();
            let mut boundary_prev = outer_prev;
            let mut steps = 0;
            loop {
                boundary_prev = self.next(boundary_prev).twin();
                steps += 1;
                if steps > self.halfedges.len() {
                    return Err(LinkError::PatchRelinkFailed(ii));
                }
                if self.is_boundary_halfedge(boundary_prev) && boundary_prev != inner_prev {
                    break;
                }
            }
            let boundary_next = self.next(boundary_prev);

            if boundary_next == inner_next {
                return Err(LinkError::PatchRelinkFailed(ii));
            }

            let patch_start = self.next(inner_prev);
            let patch_end = self.prev(inner_next);

            next_cache.push((boundary_prev, patch_start));
            next_cache.push((patch_end, boundary_next));
            next_cache.push((inner_prev, inner_next));
        }

        Ok(FacePlan {
            halfedges,
            is_new,
            next_cache,
        })
    }

    /// Link a new polygon into the existing topology.
    ///
    /// Returns [`FaceId::invalid()`] and leaves the mesh untouched when the
    /// polygon has fewer than three corners, repeats a vertex, references a
    /// missing vertex, or cannot be linked without creating a non-manifold
    /// vertex or edge. Use [`MeshBuilder`](super::MeshBuilder) for arbitrary
    /// polygon soups.
    pub fn add_face(&mut self, vertices: &[VertexId]) -> FaceId {
        let plan = match self.plan_face(vertices) {
            Ok(plan) => plan,
            Err(err) => {
                debug!("add_face({:?}) rejected: {}", vertices, err);
                return FaceId::invalid();
            }
        };

        let n = vertices.len();
        let FacePlan {
            mut halfedges,
            is_new,
            mut next_cache,
        } = plan;
        let mut needs_adjust = vec![false; n];

        for i in 0..n {
            if is_new[i] {
                halfedges[i] = self.new_edge(vertices[i], vertices[(i + 1) % n]);
            }
        }

        let f = self.new_face();
        self.set_face_halfedge(f, halfedges[n - 1]);

        for i in 0..n {
            let ii = (i + 1) % n;
            let v = vertices[ii];
            let inner_prev = halfedges[i];
            let inner_next = halfedges[ii];

            let id = (is_new[i] as u8) | ((is_new[ii] as u8) << 1);

            if id != 0 {
                let outer_prev = inner_next.twin();
                let outer_next = inner_prev.twin();

                match id {
                    // prev is new, next is old
                    1 => {
                        let boundary_prev = self.prev(inner_next);
                        next_cache.push((boundary_prev, outer_next));
                        self.set_vertex_halfedge(v, outer_next);
                    }
                    // next is new, prev is old
                    2 => {
                        let boundary_next = self.next(inner_prev);
                        next_cache.push((outer_prev, boundary_next));
                        self.set_vertex_halfedge(v, boundary_next);
                    }
                    // both are new
                    _ => {
                        if !self.vertex_halfedge(v).is_valid() {
                            self.set_vertex_halfedge(v, outer_next);
                            next_cache.push((outer_prev, outer_next));
                        } else {
                            let boundary_next = self.vertex_halfedge(v);
                            let boundary_prev = self.prev(boundary_next);
                            next_cache.push((boundary_prev, outer_next));
                            next_cache.push((outer_prev, boundary_next));
                        }
                    }
                }

                next_cache.push((inner_prev, inner_next));
            } else {
                needs_adjust[ii] = self.vertex_halfedge(v) == inner_next;
            }

            self.set_face(halfedges[i], f);
        }

        for (h, next) in next_cache {
            self.set_next(h, next);
        }

        for i in 0..n {
            if needs_adjust[i] {
                self.adjust_outgoing_halfedge(vertices[i]);
            }
        }

        f
    }

    /// Add a triangle.
    pub fn add_triangle(&mut self, v0: VertexId, v1: VertexId, v2: VertexId) -> FaceId {
        self.add_face(&[v0, v1, v2])
    }

    /// Add a quad.
    pub fn add_quad(&mut self, v0: VertexId, v1: VertexId, v2: VertexId, v3: VertexId) -> FaceId {
        self.add_face(&[v0, v1, v2, v3])
    }

    /// Make the outgoing half-edge of a boundary vertex a boundary half-edge.
    pub fn adjust_outgoing_halfedge(&mut self, v: VertexId) {
        let start = self.vertex_halfedge(v);
        if !start.is_valid() {
            return;
        }
        let mut h = start;
        loop {
            if self.is_boundary_halfedge(h) {
                self.set_vertex_halfedge(v, h);
                return;
            }
            h = self.rotate_cw(h);
            if h == start {
                return;
            }
        }
    }

    /// Run [`adjust_outgoing_halfedge`](Self::adjust_outgoing_halfedge) on every live vertex.
    pub fn adjust_outgoing_halfedges(&mut self) {
        for i in 0..self.vertices.len() {
            let v = VertexId::new(i);
            if !self.is_deleted_vertex(v) {
                self.adjust_outgoing_halfedge(v);
            }
        }
    }

    // ==================== Deletion ====================

    /// Delete a vertex together with all incident faces.
    pub fn delete_vertex(&mut self, v: VertexId) {
        if self.is_deleted_vertex(v) {
            return;
        }
        let incident: Vec<FaceId> = self.vertex_faces(v).collect();
        for f in incident {
            self.delete_face(f);
        }
        self.mark_vertex_deleted(v);
    }

    /// Delete an edge together with its incident faces.
    pub fn delete_edge(&mut self, e: EdgeId) {
        if self.is_deleted_edge(e) {
            return;
        }
        let f0 = self.face_of(e.halfedge(0));
        let f1 = self.face_of(e.halfedge(1));
        if f0.is_valid() {
            self.delete_face(f0);
        }
        if f1.is_valid() {
            self.delete_face(f1);
        }
    }

    /// Delete a face. Edges left without faces and vertices left without
    /// edges are deleted as well.
    pub fn delete_face(&mut self, f: FaceId) {
        if self.is_deleted_face(f) {
            return;
        }
        self.mark_face_deleted(f);

        let cycle: Vec<HalfEdgeId> = self.face_halfedges(f).collect();
        let mut dead_edges = Vec::with_capacity(3);
        let mut corners = Vec::with_capacity(cycle.len());
        for &h in &cycle {
            self.set_face(h, FaceId::invalid());
            if self.is_boundary_halfedge(h.twin()) {
                dead_edges.push(h.edge());
            }
            corners.push(self.target(h));
        }

        for e in dead_edges {
            let h0 = e.halfedge(0);
            let v0 = self.target(h0);
            let next0 = self.next(h0);
            let prev0 = self.prev(h0);

            let h1 = e.halfedge(1);
            let v1 = self.target(h1);
            let next1 = self.next(h1);
            let prev1 = self.prev(h1);

            self.set_next(prev0, next1);
            self.set_next(prev1, next0);

            self.mark_edge_deleted(e);

            if self.vertex_halfedge(v0) == h1 {
                if next0 == h1 {
                    self.set_vertex_halfedge(v0, HalfEdgeId::invalid());
                    self.mark_vertex_deleted(v0);
                } else {
                    self.set_vertex_halfedge(v0, next0);
                }
            }

            if self.vertex_halfedge(v1) == h0 {
                if next1 == h0 {
                    self.set_vertex_halfedge(v1, HalfEdgeId::invalid());
                    self.mark_vertex_deleted(v1);
                } else {
                    self.set_vertex_halfedge(v1, next1);
                }
            }
        }

        for v in corners {
            if !self.is_deleted_vertex(v) {
                self.adjust_outgoing_halfedge(v);
            }
        }
    }

    // ==================== Properties ====================

    /// Copy every vertex property value from `from` to `to`.
    pub(crate) fn copy_vertex_properties(&mut self, from: VertexId, to: VertexId) {
        self.vprops.copy(from.index(), to.index());
    }

    // ==================== Validation ====================

    /// Check that all connectivity of live elements is consistent.
    ///
    /// Failures are reported at debug level.
    pub fn is_valid(&self) -> bool {
        for v in self.vertex_ids() {
            let h = self.vertex_halfedge(v);
            if !h.is_valid() {
                continue;
            }
            if h.index() >= self.halfedges.len() || self.is_deleted_halfedge(h) {
                debug!("{:?} references missing half-edge {:?}", v, h);
                return false;
            }
            if self.source(h) != v {
                debug!("{:?}: outgoing half-edge {:?} starts elsewhere", v, h);
                return false;
            }
            if !self.is_boundary_halfedge(h)
                && self.vertex_halfedges(v).any(|o| self.is_boundary_halfedge(o))
            {
                debug!("{:?}: boundary vertex without boundary outgoing half-edge", v);
                return false;
            }
        }

        for h in self.halfedge_ids() {
            let next = self.next(h);
            let prev = self.prev(h);
            if !next.is_valid() || !prev.is_valid() {
                debug!("{:?} is not linked", h);
                return false;
            }
            if self.is_deleted_halfedge(next) || self.is_deleted_halfedge(prev) {
                debug!("{:?} links to a deleted half-edge", h);
                return false;
            }
            if self.target(h) == self.source(h) {
                debug!("{:?} is a loop at {:?}", h, self.target(h));
                return false;
            }
            if self.prev(next) != h || self.next(prev) != h {
                debug!("{:?}: next/prev mismatch", h);
                return false;
            }
            if self.target(h) != self.source(next) {
                debug!("{:?}: next half-edge does not continue at its target", h);
                return false;
            }
            if self.is_deleted_vertex(self.target(h)) {
                debug!("{:?} points to a deleted vertex", h);
                return false;
            }
            if self.face_of(next) != self.face_of(h) {
                debug!("{:?}: next half-edge lies in another face", h);
                return false;
            }
            let f = self.face_of(h);
            if f.is_valid() && self.is_deleted_face(f) {
                debug!("{:?} references deleted {:?}", h, f);
                return false;
            }
        }

        for f in self.face_ids() {
            let h = self.face_halfedge(f);
            if !h.is_valid() || self.is_deleted_halfedge(h) || self.face_of(h) != f {
                debug!("{:?} has an inconsistent half-edge {:?}", f, h);
                return false;
            }
        }

        true
    }
}

macro_rules! impl_property_accessors {
    (
        $kind:literal, $key:ty, $handle:ident, $field:ident,
        $add:ident, $get:ident, $or_add:ident, $remove:ident, $has:ident, $names:ident,
        $access:ident, $access_mut:ident
    ) => {
        impl HalfEdgeMesh {
            #[doc = concat!("Register a new ", $kind, " property. Fails if the name is taken.")]
            pub fn $add<T: Clone + Send + Sync + 'static>(
                &mut self,
                name: &str,
                default: T,
            ) -> Result<$handle<T>> {
                self.$field.add(name, default)
            }

            #[doc = concat!("Look up a ", $kind, " property by name and type.")]
            pub fn $get<T: Clone + Send + Sync + 'static>(&self, name: &str) -> Option<$handle<T>> {
                self.$field.get(name)
            }

            #[doc = concat!("Look up a ", $kind, " property, registering it when absent.")]
            pub fn $or_add<T: Clone + Send + Sync + 'static>(
                &mut self,
                name: &str,
                default: T,
            ) -> Result<$handle<T>> {
                self.$field.get_or_add(name, default)
            }

            #[doc = concat!("Remove a ", $kind, " property.")]
            pub fn $remove<T>(&mut self, p: $handle<T>) {
                self.$field.remove(p);
            }

            #[doc = concat!("Whether a ", $kind, " property with this name exists.")]
            pub fn $has(&self, name: &str) -> bool {
                self.$field.exists(name)
            }

            #[doc = concat!("Names of all ", $kind, " properties.")]
            pub fn $names(&self) -> Vec<String> {
                self.$field.names()
            }

            #[doc = concat!("Read access to a ", $kind, " property.")]
            pub fn $access<T: 'static>(&self, p: $handle<T>) -> &PropertyVec<$key, T> {
                self.$field.get_array(p)
            }

            #[doc = concat!("Write access to a ", $kind, " property.")]
            pub fn $access_mut<T: 'static>(&mut self, p: $handle<T>) -> &mut PropertyVec<$key, T> {
                self.$field.get_array_mut(p)
            }
        }
    };
}

impl_property_accessors!(
    "vertex", VertexId, VertexProperty, vprops,
    add_vertex_property, get_vertex_property, vertex_property_or_add,
    remove_vertex_property, has_vertex_property, vertex_property_names,
    vertex_property, vertex_property_mut
);
impl_property_accessors!(
    "half-edge", HalfEdgeId, HalfEdgeProperty, hprops,
    add_halfedge_property, get_halfedge_property, halfedge_property_or_add,
    remove_halfedge_property, has_halfedge_property, halfedge_property_names,
    halfedge_property, halfedge_property_mut
);
impl_property_accessors!(
    "edge", EdgeId, EdgeProperty, eprops,
    add_edge_property, get_edge_property, edge_property_or_add,
    remove_edge_property, has_edge_property, edge_property_names,
    edge_property, edge_property_mut
);
impl_property_accessors!(
    "face", FaceId, FaceProperty, fprops,
    add_face_property, get_face_property, face_property_or_add,
    remove_face_property, has_face_property, face_property_names,
    face_property, face_property_mut
);
impl_property_accessors!(
    "model", Model, ModelProperty, mprops,
    add_model_property, get_model_property, model_property_or_add,
    remove_model_property, has_model_property, model_property_names,
    model_property, model_property_mut
);

/// Iterator over outgoing half-edges around a vertex.
pub struct VertexHalfEdgeIter<'a> {
    mesh: &'a HalfEdgeMesh,
    start: HalfEdgeId,
    current: HalfEdgeId,
    done: bool,
}

impl<'a> VertexHalfEdgeIter<'a> {
    fn new(mesh: &'a HalfEdgeMesh, v: VertexId) -> Self {
        let start = mesh.vertex_halfedge(v);
        Self {
            mesh,
            start,
            current: start,
            done: !start.is_valid(),
        }
    }
}

impl<'a> Iterator for VertexHalfEdgeIter<'a> {
    type Item = HalfEdgeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current;

        // If he goes v -> w, twin(he) goes w -> v and the half-edge after it
        // leaves v again.
        self.current = self.mesh.rotate_cw(self.current);

        if self.current == self.start {
            self.done = true;
        }

        Some(result)
    }
}

/// Iterator over the half-edges of a face or boundary loop.
pub struct FaceHalfEdgeIter<'a> {
    mesh: &'a HalfEdgeMesh,
    start: HalfEdgeId,
    current: HalfEdgeId,
    done: bool,
}

impl<'a> FaceHalfEdgeIter<'a> {
    fn new(mesh: &'a HalfEdgeMesh, start: HalfEdgeId) -> Self {
        Self {
            mesh,
            start,
            current: start,
            done: !start.is_valid(),
        }
    }
}

impl<'a> Iterator for FaceHalfEdgeIter<'a> {
    type Item = HalfEdgeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current;
        self.current = self.mesh.next(self.current);

        if self.current == self.start {
            self.done = true;
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_strip() -> (HalfEdgeMesh, [VertexId; 6]) {
        // 3 --- 4 --- 5
        // |     |     |
        // 0 --- 1 --- 2
        let mut mesh = HalfEdgeMesh::new();
        let v = [
            mesh.add_vertex(Point3::new(0.0, 0.0, 0.0)),
            mesh.add_vertex(Point3::new(1.0, 0.0, 0.0)),
            mesh.add_vertex(Point3::new(2.0, 0.0, 0.0)),
            mesh.add_vertex(Point3::new(0.0, 1.0, 0.0)),
            mesh.add_vertex(Point3::new(1.0, 1.0, 0.0)),
            mesh.add_vertex(Point3::new(2.0, 1.0, 0.0)),
        ];
        mesh.add_quad(v[0], v[1], v[4], v[3]);
        mesh.add_quad(v[1], v[2], v[5], v[4]);
        (mesh, v)
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = HalfEdgeMesh::new();
        assert_eq!(mesh.num_vertices(), 0);
        assert_eq!(mesh.num_halfedges(), 0);
        assert_eq!(mesh.num_faces(), 0);
        assert!(mesh.is_empty());
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_add_vertex() {
        let mut mesh = HalfEdgeMesh::new();
        let v0 = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let v1 = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));

        assert_eq!(mesh.num_vertices(), 2);
        assert_eq!(v0.index(), 0);
        assert_eq!(v1.index(), 1);
        assert!(mesh.is_isolated(v0));
        assert!(mesh.is_boundary_vertex(v0));
    }

    #[test]
    fn test_single_triangle() {
        let mut mesh = HalfEdgeMesh::new();
        let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
        let f = mesh.add_triangle(a, b, c);

        assert!(f.is_valid());
        assert_eq!(mesh.num_edges(), 3);
        assert_eq!(mesh.face_triangle(f), [a, b, c]);
        assert!(mesh.is_valid());
        assert!(mesh.vertex_ids().all(|v| mesh.is_boundary_vertex(v)));
        assert!(mesh.vertex_ids().all(|v| mesh.is_manifold(v)));
        assert_eq!(mesh.boundary_loops().len(), 1);
        assert_eq!(mesh.boundary_loops()[0].len(), 3);
        assert!((mesh.face_area(f) - 0.5).abs() < 1e-12);
        assert!((mesh.face_normal(f) - Vector3::z()).norm() < 1e-12);
    }

    #[test]
    fn test_loop_is_invalid() {
        let mut mesh = HalfEdgeMesh::new();
        let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
        mesh.add_triangle(a, b, c);
        assert!(mesh.is_valid());

        let h = mesh.find_halfedge(a, b);
        mesh.set_target(h, a);
        assert_eq!(mesh.source(h), mesh.target(h));
        assert!(!mesh.is_valid());
    }

    #[test]
    fn test_add_face_rejects_bad_input() {
        let mut mesh = HalfEdgeMesh::new();
        let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));

        assert_eq!(mesh.check_face(&[a, b]), Err(LinkError::TooFewVertices));
        assert_eq!(mesh.check_face(&[a, b, a]), Err(LinkError::DuplicateVertex));
        assert_eq!(
            mesh.check_face(&[a, b, VertexId::new(9)]),
            Err(LinkError::InvalidVertex(2))
        );
        assert!(!mesh.add_face(&[a, b]).is_valid());

        assert!(mesh.add_triangle(a, b, c).is_valid());
        // Same orientation again uses the same directed half-edges.
        assert_eq!(mesh.check_face(&[a, b, c]), Err(LinkError::ComplexEdge(0)));
        assert!(!mesh.add_triangle(a, b, c).is_valid());
        assert_eq!(mesh.num_faces(), 1);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_quads_and_queries() {
        let (mesh, v) = quad_strip();
        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(mesh.num_edges(), 7);
        assert!(!mesh.is_triangle_mesh());
        assert!(mesh.is_valid());

        assert_eq!(mesh.valence(v[1]), 3);
        assert_eq!(mesh.valence(v[0]), 2);
        assert!(mesh.find_halfedge(v[1], v[4]).is_valid());
        assert!(!mesh.find_halfedge(v[0], v[4]).is_valid());
        assert!(!mesh.is_boundary_edge(mesh.find_edge(v[1], v[4])));
        assert!(mesh.is_boundary_edge(mesh.find_edge(v[0], v[1])));

        for f in mesh.face_ids() {
            assert_eq!(mesh.face_valence(f), 4);
            assert!((mesh.face_area(f) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_patch_relinking() {
        // Fan around the center added in an order that needs re-linking.
        let mut mesh = HalfEdgeMesh::new();
        let c = mesh.add_vertex(Point3::origin());
        let ring: Vec<VertexId> = (0..6)
            .map(|i| {
                let a = i as f64 * std::f64::consts::TAU / 6.0;
                mesh.add_vertex(Point3::new(a.cos(), a.sin(), 0.0))
            })
            .collect();

        for &i in &[0, 3, 1, 4, 2, 5] {
            let f = mesh.add_triangle(c, ring[i], ring[(i + 1) % 6]);
            assert!(f.is_valid(), "triangle {} rejected", i);
            assert!(mesh.is_valid());
        }
        assert!(!mesh.is_boundary_vertex(c));
        assert_eq!(mesh.valence(c), 6);
        assert!(mesh.vertex_ids().all(|v| mesh.is_manifold(v)));
    }

    #[test]
    fn test_delete_face_removes_dangling_elements() {
        let (mut mesh, v) = quad_strip();
        let f = mesh.face_ids().next().unwrap();
        mesh.delete_face(f);

        assert_eq!(mesh.num_faces(), 1);
        // the left quad's three outer edges and its corners 0 and 3 go away
        assert_eq!(mesh.num_edges(), 4);
        assert_eq!(mesh.num_vertices(), 4);
        assert!(mesh.is_deleted_vertex(v[0]));
        assert!(mesh.is_deleted_vertex(v[3]));
        assert!(mesh.has_garbage());
        assert!(mesh.is_valid());
        assert!(mesh.is_boundary_vertex(v[1]));
    }

    #[test]
    fn test_delete_vertex() {
        let (mut mesh, v) = quad_strip();
        mesh.delete_vertex(v[1]);
        assert_eq!(mesh.num_faces(), 0);
        assert_eq!(mesh.num_edges(), 0);
        assert_eq!(mesh.num_vertices(), 0);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_delete_edge() {
        let (mut mesh, v) = quad_strip();
        let e = mesh.find_edge(v[1], v[4]);
        mesh.delete_edge(e);
        assert_eq!(mesh.num_faces(), 0);
        assert!(mesh.is_deleted_edge(e));
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_properties_grow_in_lockstep() {
        let mut mesh = HalfEdgeMesh::new();
        let w = mesh.add_vertex_property("v:w", 7_i32).unwrap();
        let a = mesh.add_vertex(Point3::origin());
        let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
        let len = mesh.add_edge_property("e:len", 0.0_f64).unwrap();
        mesh.add_triangle(a, b, c);

        assert_eq!(mesh.vertex_property(w).len(), 3);
        assert_eq!(mesh.vertex_property(w)[b], 7);
        assert_eq!(mesh.edge_property(len).len(), 3);
        assert!(mesh.has_vertex_property("v:w"));
        assert_eq!(mesh.vertex_property_names(), vec!["v:w".to_string()]);
        assert!(mesh.add_vertex_property("v:w", 0_i32).is_err());

        mesh.remove_vertex_property(w);
        assert!(!mesh.has_vertex_property("v:w"));
    }

    #[test]
    fn test_clone_is_deep() {
        let (mut mesh, v) = quad_strip();
        let tag = mesh.add_face_property("f:tag", 0_u8).unwrap();
        let copy = mesh.clone();
        let f = mesh.face_ids().next().unwrap();
        mesh.face_property_mut(tag)[f] = 3;
        mesh.set_position(v[0], Point3::new(5.0, 5.0, 5.0));

        assert_eq!(copy.face_property(tag)[f], 0);
        assert_eq!(copy.position(v[0]), &Point3::new(0.0, 0.0, 0.0));
    }
}
