//! Mesh construction utilities.
//!
//! [`MeshBuilder`] turns an arbitrary polygon soup (inconsistent winding,
//! non-manifold edges and vertices, degenerate faces) into a manifold
//! [`HalfEdgeMesh`] by duplicating vertices where needed. Construction is
//! two-phase:
//!
//! 1. **Ingestion**: every face is checked and linked immediately. Degenerate
//!    faces are dropped and counted; corners that would create a
//!    non-manifold edge or an impossible link are replaced by copies.
//! 2. **Finalization**: runs exactly once, from [`MeshBuilder::finish`] or
//!    from `Drop`. Umbrellas glued at a single vertex are split onto fresh
//!    copies, every duplicated vertex is locked through the `bool` vertex
//!    property `"v:locked"`, isolated vertices are removed and the mesh is
//!    compacted.
//!
//! ```
//! use halfmesh::mesh::{HalfEdgeMesh, MeshBuilder};
//! use nalgebra::Point3;
//!
//! let mut mesh = HalfEdgeMesh::new();
//! let mut builder = MeshBuilder::begin(&mut mesh);
//! for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]] {
//!     builder.add_vertex(Point3::new(p[0], p[1], p[2]));
//! }
//! // Two triangles touching only at vertex 0.
//! builder.add_face(&[0, 1, 2]);
//! builder.add_face(&[0, 3, 4]);
//! let report = builder.finish();
//!
//! assert_eq!(report.non_manifold_copies, 1);
//! assert_eq!(mesh.num_vertices(), 6);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, error, info, warn};
use nalgebra::Point3;

use super::halfedge::{HalfEdgeMesh, LinkError};
use super::index::{FaceId, HalfEdgeId, VertexId};
use crate::error::{MeshError, Result};

/// Name of the vertex property marking duplicated vertices.
pub const LOCKED_VERTEX_PROPERTY: &str = "v:locked";

/// Origin marker for vertices that were not added through the builder.
const NOT_INPUT: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CopyKind {
    Edge,
    Linking,
    NonManifold,
}

/// Statistics and duplication records of one builder session.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Faces linked into the mesh.
    pub faces_added: usize,
    /// Faces rejected for having fewer than three vertices.
    pub faces_too_few_vertices: usize,
    /// Faces rejected for repeating a vertex.
    pub faces_duplicate_vertices: usize,
    /// Faces rejected for referencing a vertex that was never added.
    pub faces_out_of_range: usize,
    /// Faces the underlying `add_face` refused even after duplication.
    pub faces_unknown_topology: usize,
    /// Copies made because an edge would have carried a third face.
    pub edge_copies: usize,
    /// Copies made because a corner could not be linked.
    pub linking_copies: usize,
    /// Copies made while splitting non-manifold vertices at finalization.
    pub non_manifold_copies: usize,
    /// Isolated vertices removed at finalization.
    pub isolated_removed: usize,
    /// Non-manifold vertices left after finalization.
    pub residual_non_manifold: usize,
    /// Whether the final connectivity passed [`HalfEdgeMesh::is_valid`].
    pub valid: bool,
    /// Final handle of each input vertex (invalid if it was removed).
    pub vertex_map: Vec<VertexId>,
    /// Input vertex index -> copies forced by edge non-manifoldness.
    pub edge_duplicates: BTreeMap<usize, Vec<VertexId>>,
    /// Input vertex index -> copies forced by linking conflicts.
    pub linking_duplicates: BTreeMap<usize, Vec<VertexId>>,
    /// Input vertex index -> copies made for non-manifold vertices.
    pub non_manifold_duplicates: BTreeMap<usize, Vec<VertexId>>,
}

impl BuildReport {
    /// Total number of rejected input faces.
    pub fn faces_rejected(&self) -> usize {
        self.faces_too_few_vertices
            + self.faces_duplicate_vertices
            + self.faces_out_of_range
            + self.faces_unknown_topology
    }

    /// Total number of vertex copies.
    pub fn vertex_copies(&self) -> usize {
        self.edge_copies + self.linking_copies + self.non_manifold_copies
    }

    /// Whether any vertex was duplicated.
    pub fn has_duplications(&self) -> bool {
        self.vertex_copies() > 0
    }

    /// No rejected faces, no copies and a valid manifold result.
    pub fn is_clean(&self) -> bool {
        self.faces_rejected() == 0
            && !self.has_duplications()
            && self.valid
            && self.residual_non_manifold == 0
    }

    /// All copies of an input vertex that survived finalization.
    pub fn copies_of(&self, input: usize) -> Vec<VertexId> {
        [
            &self.edge_duplicates,
            &self.linking_duplicates,
            &self.non_manifold_duplicates,
        ]
        .iter()
        .filter_map(|record| record.get(&input))
        .flatten()
        .copied()
        .collect()
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "faces added:              {}", self.faces_added)?;
        if self.faces_rejected() > 0 {
            writeln!(f, "faces rejected:           {}", self.faces_rejected())?;
            writeln!(f, "  too few vertices:       {}", self.faces_too_few_vertices)?;
            writeln!(f, "  duplicate vertices:     {}", self.faces_duplicate_vertices)?;
            writeln!(f, "  out-of-range vertices:  {}", self.faces_out_of_range)?;
            writeln!(f, "  unknown topology:       {}", self.faces_unknown_topology)?;
        }
        if self.has_duplications() {
            writeln!(f, "vertex copies:            {}", self.vertex_copies())?;
            writeln!(f, "  non-manifold edges:     {}", self.edge_copies)?;
            writeln!(f, "  linking conflicts:      {}", self.linking_copies)?;
            writeln!(f, "  non-manifold vertices:  {}", self.non_manifold_copies)?;
            let records = [
                ("edge", &self.edge_duplicates),
                ("linking", &self.linking_duplicates),
                ("non-manifold", &self.non_manifold_duplicates),
            ];
            for (label, record) in records {
                for (input, copies) in record {
                    writeln!(f, "  [{}] vertex {} -> {:?}", label, input, copies)?;
                }
            }
        }
        if self.isolated_removed > 0 {
            writeln!(f, "isolated vertices removed: {}", self.isolated_removed)?;
        }
        if self.residual_non_manifold > 0 {
            writeln!(f, "unresolved non-manifold vertices: {}", self.residual_non_manifold)?;
        }
        write!(f, "connectivity valid:       {}", self.valid)
    }
}

/// Scoped builder that repairs non-manifold input while constructing a mesh.
///
/// Creating the builder begins the surface; finalization runs in
/// [`finish`](Self::finish), or in `Drop` if `finish` was never called.
pub struct MeshBuilder<'a> {
    mesh: &'a mut HalfEdgeMesh,
    /// Input index -> vertex created for it.
    originals: Vec<VertexId>,
    /// Vertex index -> input index, [`NOT_INPUT`] for foreign vertices.
    origin: Vec<usize>,
    /// Input index -> every copy made so far.
    copies: Vec<Vec<VertexId>>,
    /// (copied vertex, copy) pairs, in creation order.
    copied_pairs: Vec<(VertexId, VertexId)>,
    edge_records: BTreeMap<usize, Vec<VertexId>>,
    linking_records: BTreeMap<usize, Vec<VertexId>>,
    non_manifold_records: BTreeMap<usize, Vec<VertexId>>,
    report: BuildReport,
    finished: bool,
}

impl<'a> MeshBuilder<'a> {
    /// Begin a surface on `mesh`. Existing elements are kept.
    pub fn begin(mesh: &'a mut HalfEdgeMesh) -> Self {
        let origin = vec![NOT_INPUT; mesh.vertices_size()];
        Self {
            mesh,
            originals: Vec::new(),
            origin,
            copies: Vec::new(),
            copied_pairs: Vec::new(),
            edge_records: BTreeMap::new(),
            linking_records: BTreeMap::new(),
            non_manifold_records: BTreeMap::new(),
            report: BuildReport::default(),
            finished: false,
        }
    }

    /// The mesh under construction.
    pub fn mesh(&self) -> &HalfEdgeMesh {
        self.mesh
    }

    /// Number of input vertices added so far.
    pub fn num_input_vertices(&self) -> usize {
        self.originals.len()
    }

    /// Counters collected so far.
    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    /// Add an input vertex; returns its input index.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> usize {
        let v = self.mesh.add_vertex(position);
        let input = self.originals.len();
        self.originals.push(v);
        self.copies.push(Vec::new());
        self.set_origin(v, input);
        input
    }

    /// Add input vertices in order.
    pub fn add_vertices(&mut self, positions: &[Point3<f64>]) {
        for &p in positions {
            self.add_vertex(p);
        }
    }

    /// Input vertex behind a mesh vertex (itself or the vertex it copies).
    pub fn input_index(&self, v: VertexId) -> Option<usize> {
        self.origin
            .get(v.index())
            .copied()
            .filter(|&i| i != NOT_INPUT)
    }

    fn set_origin(&mut self, v: VertexId, input: usize) {
        if self.origin.len() <= v.index() {
            self.origin.resize(v.index() + 1, NOT_INPUT);
        }
        self.origin[v.index()] = input;
    }

    /// Fresh copy of `of`, sharing its position and every vertex property.
    fn copy_vertex(&mut self, of: VertexId, kind: CopyKind) -> VertexId {
        let position = *self.mesh.position(of);
        let copy = self.mesh.add_vertex(position);
        self.mesh.copy_vertex_properties(of, copy);
        self.copied_pairs.push((of, copy));

        let input = self.input_index(of);
        if let Some(input) = input {
            self.copies[input].push(copy);
            self.set_origin(copy, input);
        }
        let record = match kind {
            CopyKind::Edge => {
                self.report.edge_copies += 1;
                &mut self.edge_records
            }
            CopyKind::Linking => {
                self.report.linking_copies += 1;
                &mut self.linking_records
            }
            CopyKind::NonManifold => {
                self.report.non_manifold_copies += 1;
                &mut self.non_manifold_records
            }
        };
        if let Some(input) = input {
            record.entry(input).or_default().push(copy);
        }
        debug!("copied {:?} to {:?} ({:?})", of, copy, kind);
        copy
    }

    /// The original vertex if it still has a boundary gap, else a copy that has one.
    fn working_vertex(&mut self, input: usize) -> VertexId {
        let original = self.originals[input];
        if self.mesh.is_boundary_vertex(original) {
            return original;
        }
        let reusable = self.copies[input]
            .iter()
            .copied()
            .find(|&c| self.mesh.is_boundary_vertex(c));
        match reusable {
            Some(c) => c,
            None => self.copy_vertex(original, CopyKind::Linking),
        }
    }

    /// Add a polygon given by input vertex indices.
    ///
    /// Returns the new face, or [`FaceId::invalid()`] if the polygon was
    /// rejected (the reason is counted in the report).
    pub fn add_face(&mut self, indices: &[usize]) -> FaceId {
        let n = indices.len();
        if n < 3 {
            debug!("face {:?} rejected: fewer than 3 vertices", indices);
            self.report.faces_too_few_vertices += 1;
            return FaceId::invalid();
        }
        if indices.iter().any(|&i| i >= self.originals.len()) {
            debug!("face {:?} rejected: vertex index out of range", indices);
            self.report.faces_out_of_range += 1;
            return FaceId::invalid();
        }
        if (1..n).any(|i| indices[..i].contains(&indices[i])) {
            debug!("face {:?} rejected: duplicate vertices", indices);
            self.report.faces_duplicate_vertices += 1;
            return FaceId::invalid();
        }

        let mut working: Vec<VertexId> = indices.iter().map(|&i| self.working_vertex(i)).collect();

        // Each conflict is removed by replacing corners with isolated copies,
        // so at most n rounds are needed.
        for _ in 0..=2 * n {
            match self.mesh.check_face(&working) {
                Ok(()) => break,
                Err(LinkError::ComplexEdge(i)) => {
                    let j = (i + 1) % n;
                    working[i] = self.copy_vertex(working[i], CopyKind::Edge);
                    working[j] = self.copy_vertex(working[j], CopyKind::Edge);
                }
                Err(LinkError::ComplexVertex(i)) | Err(LinkError::PatchRelinkFailed(i)) => {
                    working[i] = self.copy_vertex(working[i], CopyKind::Linking);
                }
                Err(err) => {
                    debug!("face {:?}: {}", indices, err);
                    break;
                }
            }
        }

        let f = self.mesh.add_face(&working);
        if f.is_valid() {
            self.report.faces_added += 1;
        } else {
            debug!("face {:?} rejected: unknown topology", indices);
            self.report.faces_unknown_topology += 1;
        }
        f
    }

    /// Add a triangle given by input vertex indices.
    pub fn add_triangle(&mut self, a: usize, b: usize, c: usize) -> FaceId {
        self.add_face(&[a, b, c])
    }

    /// Finalize the surface and return the report.
    pub fn finish(mut self) -> BuildReport {
        self.end_surface();
        std::mem::take(&mut self.report)
    }

    fn end_surface(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        self.resolve_non_manifold_vertices();
        self.lock_duplicates();
        self.mesh.adjust_outgoing_halfedges();

        let isolated: Vec<VertexId> = self
            .mesh
            .vertex_ids()
            .filter(|&v| self.mesh.is_isolated(v))
            .collect();
        self.report.isolated_removed = isolated.len();
        for v in isolated {
            self.mesh.delete_vertex(v);
        }

        let maps = self.mesh.collect_garbage_mapped();
        let live = self.mesh.vertices_size();
        let remap = |v: &VertexId| maps.vertex(*v, live);
        self.report.vertex_map = self
            .originals
            .iter()
            .map(|v| remap(v).unwrap_or_default())
            .collect();
        for (record, out) in [
            (&self.edge_records, &mut self.report.edge_duplicates),
            (&self.linking_records, &mut self.report.linking_duplicates),
            (&self.non_manifold_records, &mut self.report.non_manifold_duplicates),
        ] {
            *out = record
                .iter()
                .map(|(&input, copies)| (input, copies.iter().filter_map(remap).collect::<Vec<_>>()))
                .filter(|(_, copies)| !copies.is_empty())
                .collect();
        }

        self.report.valid = self.mesh.is_valid();
        if !self.report.valid {
            error!("mesh builder produced inconsistent connectivity");
        }
        let residual: Vec<VertexId> = self
            .mesh
            .vertex_ids()
            .filter(|&v| !self.mesh.is_manifold(v))
            .collect();
        for v in &residual {
            error!("unresolved non-manifold vertex {:?}", v);
        }
        self.report.residual_non_manifold = residual.len();

        if self.report.has_duplications() || self.report.faces_rejected() > 0 {
            info!(
                "mesh builder: {} faces, {} rejected, {} vertex copies",
                self.report.faces_added,
                self.report.faces_rejected(),
                self.report.vertex_copies()
            );
        } else {
            debug!("mesh builder: {} faces", self.report.faces_added);
        }
    }

    /// Split every vertex whose incoming half-edges form more than one
    /// umbrella, or one umbrella with several boundary gaps.
    fn resolve_non_manifold_vertices(&mut self) {
        let nh = self.mesh.halfedges_size();
        let mut visited = vec![false; nh];
        let mut seen = vec![false; self.mesh.vertices_size()];

        for hi in 0..nh {
            let h = HalfEdgeId::new(hi);
            if visited[hi] || self.mesh.is_deleted_halfedge(h) {
                continue;
            }
            let v = self.mesh.target(h);

            let mut cycle = Vec::new();
            let mut c = h;
            loop {
                visited[c.index()] = true;
                cycle.push(c);
                c = self.mesh.next(c).twin();
                if c == h {
                    break;
                }
                if cycle.len() > nh {
                    error!("half-edge cycle around {:?} does not close", v);
                    break;
                }
            }

            let sectors = self.split_into_sectors(cycle);
            for (k, sector) in sectors.into_iter().enumerate() {
                let keep = k == 0 && !seen[v.index()];
                let w = if keep {
                    v
                } else {
                    self.copy_vertex(v, CopyKind::NonManifold)
                };
                if !keep {
                    for &c in &sector {
                        self.mesh.set_target(c, w);
                    }
                }
                let (Some(&first), Some(&last)) = (sector.first(), sector.last()) else {
                    continue;
                };
                let out = first.twin();
                if self.mesh.is_boundary_halfedge(last) {
                    self.mesh.set_next(last, out);
                }
                self.mesh.set_vertex_halfedge(w, out);
            }
            seen[v.index()] = true;
        }
    }

    /// Cut a cycle of incoming half-edges after each boundary half-edge.
    fn split_into_sectors(&self, cycle: Vec<HalfEdgeId>) -> Vec<Vec<HalfEdgeId>> {
        let first_boundary = cycle
            .iter()
            .position(|&c| self.mesh.is_boundary_halfedge(c));
        let Some(b) = first_boundary else {
            return vec![cycle];
        };
        let start = (b + 1) % cycle.len();

        let mut sectors = Vec::new();
        let mut current = Vec::new();
        for k in 0..cycle.len() {
            let c = cycle[(start + k) % cycle.len()];
            current.push(c);
            if self.mesh.is_boundary_halfedge(c) {
                sectors.push(std::mem::take(&mut current));
            }
        }
        sectors
    }

    fn lock_duplicates(&mut self) {
        if self.copied_pairs.is_empty() {
            return;
        }
        let locked = match self.mesh.vertex_property_or_add(LOCKED_VERTEX_PROPERTY, false) {
            Ok(p) => p,
            Err(err) => {
                warn!("cannot lock duplicated vertices: {}", err);
                return;
            }
        };
        let flags = self.mesh.vertex_property_mut(locked);
        for &(of, copy) in &self.copied_pairs {
            flags[of] = true;
            flags[copy] = true;
        }
    }
}

impl Drop for MeshBuilder<'_> {
    fn drop(&mut self) {
        self.end_surface();
    }
}

/// Build a mesh from any polygon soup, repairing it as needed.
///
/// Never fails; rejected faces and duplications are described by the
/// returned [`BuildReport`].
pub fn build_from_polygons<F: AsRef<[usize]>>(
    vertices: &[Point3<f64>],
    faces: &[F],
) -> (HalfEdgeMesh, BuildReport) {
    let mut mesh = HalfEdgeMesh::with_capacity(vertices.len(), faces.len());
    let mut builder = MeshBuilder::begin(&mut mesh);
    builder.add_vertices(vertices);
    for face in faces {
        builder.add_face(face.as_ref());
    }
    let report = builder.finish();
    (mesh, report)
}

/// Build a half-edge mesh from vertices and triangle faces.
///
/// Unlike [`build_from_polygons`], malformed input is an error; non-manifold
/// configurations are still repaired by vertex duplication.
///
/// # Example
/// ```
/// use halfmesh::mesh::build_from_triangles;
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let faces = vec![[0, 1, 2]];
///
/// let mesh = build_from_triangles(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_vertices(), 3);
/// assert_eq!(mesh.num_faces(), 1);
/// ```
pub fn build_from_triangles(vertices: &[Point3<f64>], faces: &[[usize; 3]]) -> Result<HalfEdgeMesh> {
    if faces.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    for (fi, face) in faces.iter().enumerate() {
        for &vi in face {
            if vi >= vertices.len() {
                return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
            }
        }
        if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
            return Err(MeshError::DegenerateFace { face: fi });
        }
    }

    let (mesh, report) = build_from_polygons(vertices, faces);
    if report.has_duplications() {
        debug!("build_from_triangles repaired input:\n{}", report);
    }
    Ok(mesh)
}

/// Convert a mesh to face-vertex triangles over its live vertices.
///
/// Polygons are fan-triangulated.
pub fn to_face_vertex(mesh: &HalfEdgeMesh) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    let (vertices, polygons) = to_polygons(mesh);
    let mut faces = Vec::with_capacity(polygons.len());
    for poly in polygons {
        for k in 1..poly.len().saturating_sub(1) {
            faces.push([poly[0], poly[k], poly[k + 1]]);
        }
    }
    (vertices, faces)
}

/// Convert a mesh to face-vertex polygons over its live vertices.
pub fn to_polygons(mesh: &HalfEdgeMesh) -> (Vec<Point3<f64>>, Vec<Vec<usize>>) {
    let mut index = vec![usize::MAX; mesh.vertices_size()];
    let mut vertices = Vec::with_capacity(mesh.num_vertices());
    for v in mesh.vertex_ids() {
        index[v.index()] = vertices.len();
        vertices.push(*mesh.position(v));
    }

    let faces = mesh
        .face_ids()
        .map(|f| mesh.face_vertices(f).map(|v| index[v.index()]).collect())
        .collect();

    (vertices, faces)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_triangle() -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2]];
        (vertices, faces)
    }

    fn two_triangles() -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
        // Two triangles sharing an edge
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2], [1, 0, 3]];
        (vertices, faces)
    }

    #[test]
    fn test_single_triangle() {
        let (vertices, faces) = single_triangle();
        let mesh = build_from_triangles(&vertices, &faces).unwrap();

        assert_eq!(mesh.num_vertices(), 3);
        assert_eq!(mesh.num_faces(), 1);
        // 3 interior half-edges + 3 boundary half-edges
        assert_eq!(mesh.num_halfedges(), 6);
        assert!(mesh.is_valid());

        for v in mesh.vertex_ids() {
            assert!(mesh.is_boundary_vertex(v));
        }
    }

    #[test]
    fn test_two_triangles() {
        let (vertices, faces) = two_triangles();
        let mesh = build_from_triangles(&vertices, &faces).unwrap();

        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 2);
        // 6 interior half-edges + 4 boundary half-edges
        assert_eq!(mesh.num_halfedges(), 10);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_roundtrip() {
        let (vertices, faces) = two_triangles();
        let mesh = build_from_triangles(&vertices, &faces).unwrap();

        let (out_verts, out_faces) = to_face_vertex(&mesh);

        assert_eq!(vertices.len(), out_verts.len());
        assert_eq!(faces.len(), out_faces.len());

        for (v_in, v_out) in vertices.iter().zip(out_verts.iter()) {
            assert!((v_in - v_out).norm() < 1e-10);
        }
        assert_eq!(out_faces, faces);
    }

    #[test]
    fn test_invalid_vertex_index() {
        let vertices = vec![Point3::new(0.0, 0.0, 0.0)];
        let faces = vec![[0, 1, 2]];

        let result = build_from_triangles(&vertices, &faces);
        assert!(matches!(result, Err(MeshError::InvalidVertexIndex { face: 0, vertex: 1 })));
    }

    #[test]
    fn test_degenerate_face() {
        let (vertices, _) = single_triangle();
        let faces = vec![[0, 0, 2]];

        let result = build_from_triangles(&vertices, &faces);
        assert!(matches!(result, Err(MeshError::DegenerateFace { face: 0 })));
    }

    #[test]
    fn test_rejection_counters() {
        let (vertices, _) = single_triangle();
        let faces: Vec<Vec<usize>> = vec![vec![0, 1], vec![0, 1, 1], vec![0, 1, 7], vec![0, 1, 2]];
        let (mesh, report) = build_from_polygons(&vertices, &faces);

        assert_eq!(report.faces_too_few_vertices, 1);
        assert_eq!(report.faces_duplicate_vertices, 1);
        assert_eq!(report.faces_out_of_range, 1);
        assert_eq!(report.faces_rejected(), 3);
        assert_eq!(report.faces_added, 1);
        assert!(!report.has_duplications());
        assert_eq!(mesh.num_faces(), 1);
    }

    #[test]
    fn test_opposite_winding_duplicates_shared_edge() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ];
        // both faces traverse 1 -> 2
        let faces = vec![[0, 1, 2], [1, 2, 3]];
        let (mesh, report) = build_from_polygons(&vertices, &faces);

        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(report.edge_copies, 2);
        assert_eq!(report.copies_of(1).len(), 1);
        assert_eq!(report.copies_of(2).len(), 1);
        assert_eq!(mesh.num_vertices(), 6);
        assert!(report.valid);

        let locked = mesh.get_vertex_property::<bool>(LOCKED_VERTEX_PROPERTY).unwrap();
        let locked_count = mesh
            .vertex_ids()
            .filter(|&v| mesh.vertex_property(locked)[v])
            .count();
        assert_eq!(locked_count, 4);
    }

    #[test]
    fn test_third_face_on_edge() {
        // Three triangles hinged on the edge 0-1.
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
            Point3::new(0.5, 0.0, 1.0),
        ];
        let faces = vec![[0, 1, 2], [1, 0, 3], [0, 1, 4]];
        let (mesh, report) = build_from_polygons(&vertices, &faces);

        assert_eq!(mesh.num_faces(), 3);
        assert_eq!(report.edge_copies, 2);
        assert!(report.valid);
        assert_eq!(report.residual_non_manifold, 0);
        assert!(mesh.vertex_ids().all(|v| mesh.is_manifold(v)));
    }

    #[test]
    fn test_unused_vertex_removed() {
        let mut vertices = single_triangle().0;
        vertices.push(Point3::new(9.0, 9.0, 9.0));
        let (mesh, report) = build_from_polygons(&vertices, &[[0, 1, 2]]);
        assert_eq!(report.isolated_removed, 1);
        assert_eq!(mesh.num_vertices(), 3);
        assert!(!report.vertex_map[3].is_valid());
        assert!(report.vertex_map[..3].iter().all(|v| v.is_valid()));
    }

    #[test]
    fn test_drop_finalizes() {
        let mut mesh = HalfEdgeMesh::new();
        {
            let mut builder = MeshBuilder::begin(&mut mesh);
            for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [5.0, 5.0, 5.0]] {
                builder.add_vertex(Point3::new(p[0], p[1], p[2]));
            }
            builder.add_triangle(0, 1, 2);
        }
        // the unused vertex was removed and the arrays compacted
        assert_eq!(mesh.vertices_size(), 3);
        assert!(!mesh.has_garbage());
    }

    #[test]
    fn test_report_display() {
        let (vertices, _) = single_triangle();
        let (_, report) = build_from_polygons(&vertices, &[vec![0, 1, 2], vec![0, 1]]);
        let text = report.to_string();
        assert!(text.contains("faces added:              1"));
        assert!(text.contains("too few vertices:       1"));
    }
}
