//! Incremental triangle remeshing.
//!
//! Both entry points run the same pipeline on a half-edge triangle mesh,
//! mutating it in place through the local operators of
//! [`HalfEdgeMesh`]:
//!
//! 1. **Preprocessing**: attach transient lock, sizing and normal
//!    properties; lock everything outside a non-empty `"v:selected"`
//!    selection and every feature vertex that is not on exactly two feature
//!    edges; compute the sizing field; freeze a reference copy of the input
//!    with a nearest-triangle index when projection is enabled.
//! 2. **Iterations**, each consisting of:
//!    - **Split** edges longer than 4/3 of their target length
//!    - **Collapse** edges shorter than 4/5 of their target length
//!    - **Flip** edges to move valences towards 6 (interior) and 4 (boundary)
//!    - **Tangential smoothing**, five sub-iterations
//! 3. **Cap removal**: flip away triangles with an angle above 170°.
//! 4. **Postprocessing**: drop the reference and all transient properties.
//!
//! The uniform variant targets a single edge length; the adaptive variant
//! derives a per-vertex target from the maximum absolute curvature.
//!
//! Feature vertices and edges are read from the `bool` properties
//! `"v:feature"` and `"e:feature"`, the selection from `"v:selected"` and
//! existing locks from `"v:locked"`. These caller properties are never
//! removed; feature flags are propagated to edges and vertices created by
//! splitting feature edges.
//!
//! # Example
//!
//! ```
//! use halfmesh::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//!     Point3::new(0.5, 0.5, 1.0),
//! ];
//! let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
//! let mut mesh = build_from_triangles(&vertices, &faces).unwrap();
//!
//! let options = UniformRemeshOptions::with_target_length(0.25).with_iterations(3);
//! let stats = uniform_remeshing(&mut mesh, &options).unwrap();
//!
//! assert!(mesh.is_valid());
//! assert!(stats.splits > 0);
//! ```
//!
//! # References
//!
//! - Botsch, M., & Kobbelt, L. (2004). "A remeshing approach to multiresolution modeling."
//!   Symposium on Geometry Processing.
//! - Dunyach, M., et al. (2013). "Adaptive remeshing for real-time mesh deformation."
//!   Eurographics.

mod passes;
mod sizing;
mod smoothing;

pub use sizing::edge_length_from_curvature;

use log::{debug, warn};
use nalgebra::Vector3;

use super::progress::Progress;
use super::spatial::TriangleBvh;
use crate::error::{MeshError, Result};
use crate::mesh::{
    EdgeId, EdgeProperty, HalfEdgeMesh, VertexId, VertexProperty, LOCKED_VERTEX_PROPERTY,
};

/// Name of the `bool` vertex property flagging feature vertices.
pub const FEATURE_VERTEX_PROPERTY: &str = "v:feature";
/// Name of the `bool` edge property flagging feature edges.
pub const FEATURE_EDGE_PROPERTY: &str = "e:feature";
/// Name of the `bool` vertex property restricting remeshing to a region.
pub const SELECTED_VERTEX_PROPERTY: &str = "v:selected";

const TRANSIENT_VERTEX_LOCK: &str = "v:remesh:locked";
const TRANSIENT_EDGE_LOCK: &str = "e:remesh:locked";
const TRANSIENT_SIZING: &str = "v:remesh:sizing";
const TRANSIENT_NORMAL: &str = "v:remesh:normal";

/// Upper bound on split, collapse and flip passes per iteration.
const MAX_PASSES: usize = 10;
/// Tangential smoothing sub-iterations per iteration.
const SMOOTHING_ITERATIONS: usize = 5;
/// Edges longer than this factor times their target length are split.
const SPLIT_FACTOR: f64 = 4.0 / 3.0;
/// Edges shorter than this factor times their target length are collapsed.
const COLLAPSE_FACTOR: f64 = 4.0 / 5.0;
/// Triangles with an angle above this are caps.
const CAP_ANGLE_DEGREES: f64 = 170.0;
/// Laplacian smoothing passes over the curvature field.
const SIZING_SMOOTHING_ITERATIONS: usize = 2;
const IDEAL_VALENCE_INTERIOR: i64 = 6;
const IDEAL_VALENCE_BOUNDARY: i64 = 4;
const DEFAULT_ITERATIONS: usize = 10;

/// Options for uniform remeshing.
#[derive(Debug, Clone)]
pub struct UniformRemeshOptions {
    /// Target edge length.
    pub target_length: f64,

    /// Number of split/collapse/flip/smooth iterations.
    pub iterations: usize,

    /// Project vertices back onto the input surface.
    pub use_projection: bool,
}

impl UniformRemeshOptions {
    /// Create options with the specified target edge length.
    pub fn with_target_length(target_length: f64) -> Self {
        Self {
            target_length,
            iterations: DEFAULT_ITERATIONS,
            use_projection: true,
        }
    }

    /// Set the number of remeshing iterations.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set whether vertices are projected onto the input surface.
    pub fn with_projection(mut self, use_projection: bool) -> Self {
        self.use_projection = use_projection;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.target_length.is_finite() && self.target_length > 0.0) {
            return Err(MeshError::invalid_param(
                "target_length",
                self.target_length,
                "must be positive and finite",
            ));
        }
        Ok(())
    }
}

/// Options for curvature-adaptive remeshing.
#[derive(Debug, Clone)]
pub struct AdaptiveRemeshOptions {
    /// Shortest allowed target edge length.
    pub min_length: f64,

    /// Longest allowed target edge length.
    pub max_length: f64,

    /// Maximum deviation between the surface and its chords.
    pub approx_error: f64,

    /// Number of split/collapse/flip/smooth iterations.
    pub iterations: usize,

    /// Project vertices back onto the input surface.
    pub use_projection: bool,
}

impl AdaptiveRemeshOptions {
    /// Create options with the specified edge length bounds and approximation error.
    pub fn new(min_length: f64, max_length: f64, approx_error: f64) -> Self {
        Self {
            min_length,
            max_length,
            approx_error,
            iterations: DEFAULT_ITERATIONS,
            use_projection: true,
        }
    }

    /// Set the number of remeshing iterations.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set whether vertices are projected onto the input surface.
    pub fn with_projection(mut self, use_projection: bool) -> Self {
        self.use_projection = use_projection;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.min_length.is_finite() && self.min_length > 0.0) {
            return Err(MeshError::invalid_param(
                "min_length",
                self.min_length,
                "must be positive and finite",
            ));
        }
        if !(self.max_length.is_finite() && self.max_length >= self.min_length) {
            return Err(MeshError::invalid_param(
                "max_length",
                self.max_length,
                "must be finite and at least min_length",
            ));
        }
        if !(self.approx_error.is_finite() && self.approx_error > 0.0) {
            return Err(MeshError::invalid_param(
                "approx_error",
                self.approx_error,
                "must be positive and finite",
            ));
        }
        Ok(())
    }
}

/// Operation counts of one remeshing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemeshStats {
    /// Completed outer iterations.
    pub iterations: usize,
    /// Edge splits.
    pub splits: usize,
    /// Edge collapses.
    pub collapses: usize,
    /// Valence-improving flips.
    pub flips: usize,
    /// Flips that removed a cap.
    pub caps_removed: usize,
    /// Live vertices after remeshing.
    pub vertices: usize,
    /// Live faces after remeshing.
    pub faces: usize,
}

#[derive(Debug, Clone, Copy)]
enum SizingMode {
    Uniform {
        target_length: f64,
    },
    Adaptive {
        min_length: f64,
        max_length: f64,
        approx_error: f64,
    },
}

/// Remesh to a uniform target edge length.
///
/// Returns [`MeshError::NotTriangleMesh`] for polygon meshes and
/// [`MeshError::InvalidParameter`] for a non-positive target length.
/// Handles held by the caller are invalidated.
pub fn uniform_remeshing(mesh: &mut HalfEdgeMesh, options: &UniformRemeshOptions) -> Result<RemeshStats> {
    uniform_remeshing_with_progress(mesh, options, &Progress::none())
}

/// Uniform remeshing with progress reporting and cancellation.
///
/// Progress is reported and cancellation checked once per iteration; a
/// cancelled run leaves a valid mesh and returns [`MeshError::Cancelled`].
pub fn uniform_remeshing_with_progress(
    mesh: &mut HalfEdgeMesh,
    options: &UniformRemeshOptions,
    progress: &Progress,
) -> Result<RemeshStats> {
    options.validate()?;
    let mode = SizingMode::Uniform {
        target_length: options.target_length,
    };
    run(mesh, mode, options.iterations, options.use_projection, progress)
}

/// Remesh with curvature-adapted edge lengths.
///
/// The target length at a vertex is the longest chord that deviates at most
/// `approx_error` from a circle of the local maximum curvature, clamped to
/// `[min_length, max_length]`.
pub fn adaptive_remeshing(mesh: &mut HalfEdgeMesh, options: &AdaptiveRemeshOptions) -> Result<RemeshStats> {
    adaptive_remeshing_with_progress(mesh, options, &Progress::none())
}

/// Adaptive remeshing with progress reporting and cancellation.
pub fn adaptive_remeshing_with_progress(
    mesh: &mut HalfEdgeMesh,
    options: &AdaptiveRemeshOptions,
    progress: &Progress,
) -> Result<RemeshStats> {
    options.validate()?;
    let mode = SizingMode::Adaptive {
        min_length: options.min_length,
        max_length: options.max_length,
        approx_error: options.approx_error,
    };
    run(mesh, mode, options.iterations, options.use_projection, progress)
}

fn run(
    mesh: &mut HalfEdgeMesh,
    mode: SizingMode,
    iterations: usize,
    use_projection: bool,
    progress: &Progress,
) -> Result<RemeshStats> {
    if !mesh.is_triangle_mesh() {
        return Err(MeshError::NotTriangleMesh);
    }
    if iterations == 0 || mesh.num_faces() == 0 {
        return Ok(RemeshStats {
            vertices: mesh.num_vertices(),
            faces: mesh.num_faces(),
            ..RemeshStats::default()
        });
    }

    let mut remesher = Remesher::new(mesh, mode, use_projection)?;
    let outcome = remesher.remesh(iterations, progress);
    let mut stats = remesher.finish();
    outcome?;

    stats.vertices = mesh.num_vertices();
    stats.faces = mesh.num_faces();
    debug!(
        "remeshing: {} iterations, {} splits, {} collapses, {} flips, {} caps; {} vertices, {} faces",
        stats.iterations,
        stats.splits,
        stats.collapses,
        stats.flips,
        stats.caps_removed,
        stats.vertices,
        stats.faces
    );
    Ok(stats)
}

/// Frozen copy of the input surface used for projection.
struct Reference {
    mesh: HalfEdgeMesh,
    bvh: TriangleBvh,
    normals: Vec<Vector3<f64>>,
    sizing: Vec<f64>,
}

/// Remeshing state: the mesh plus handles to its working properties.
struct Remesher<'a> {
    mesh: &'a mut HalfEdgeMesh,
    mode: SizingMode,
    vfeature: VertexProperty<bool>,
    efeature: EdgeProperty<bool>,
    owns_vfeature: bool,
    owns_efeature: bool,
    vlocked: VertexProperty<bool>,
    elocked: EdgeProperty<bool>,
    vsizing: VertexProperty<f64>,
    vnormal: VertexProperty<Vector3<f64>>,
    reference: Option<Reference>,
    stats: RemeshStats,
}

impl<'a> Remesher<'a> {
    /// Preprocessing.
    fn new(mesh: &'a mut HalfEdgeMesh, mode: SizingMode, use_projection: bool) -> Result<Self> {
        let owns_vfeature = !mesh.has_vertex_property(FEATURE_VERTEX_PROPERTY);
        let owns_efeature = !mesh.has_edge_property(FEATURE_EDGE_PROPERTY);
        let vfeature = mesh.vertex_property_or_add(FEATURE_VERTEX_PROPERTY, false)?;
        let efeature = mesh.edge_property_or_add(FEATURE_EDGE_PROPERTY, false)?;

        let vlocked = mesh.vertex_property_or_add(TRANSIENT_VERTEX_LOCK, false)?;
        let elocked = mesh.edge_property_or_add(TRANSIENT_EDGE_LOCK, false)?;
        let vsizing = mesh.vertex_property_or_add(TRANSIENT_SIZING, 0.0)?;
        let vnormal = mesh.vertex_property_or_add(TRANSIENT_NORMAL, Vector3::zeros())?;
        mesh.vertex_property_mut(vlocked).fill(false);
        mesh.edge_property_mut(elocked).fill(false);

        let mut remesher = Self {
            mesh,
            mode,
            vfeature,
            efeature,
            owns_vfeature,
            owns_efeature,
            vlocked,
            elocked,
            vsizing,
            vnormal,
            reference: None,
            stats: RemeshStats::default(),
        };

        remesher.init_locks();
        remesher.init_sizing();
        remesher.update_normals();
        if use_projection {
            remesher.build_reference();
        }
        Ok(remesher)
    }

    fn init_locks(&mut self) {
        let mut locked: Vec<bool> = match self.mesh.get_vertex_property::<bool>(LOCKED_VERTEX_PROPERTY) {
            Some(p) => self.mesh.vertex_property(p).as_slice().to_vec(),
            None => vec![false; self.mesh.vertices_size()],
        };
        let mut edge_locked = vec![false; self.mesh.edges_size()];

        if let Some(selected) = self.mesh.get_vertex_property::<bool>(SELECTED_VERTEX_PROPERTY) {
            let selected = self.mesh.vertex_property(selected);
            if self.mesh.vertex_ids().any(|v| selected[v]) {
                for v in self.mesh.vertex_ids() {
                    if !selected[v] {
                        locked[v.index()] = true;
                    }
                }
                for e in self.mesh.edge_ids() {
                    let h = e.halfedge(0);
                    let (a, b) = (self.mesh.source(h), self.mesh.target(h));
                    edge_locked[e.index()] = locked[a.index()] || locked[b.index()];
                }
            }
        }

        // feature curve endpoints and junctions stay put
        for v in self.mesh.vertex_ids() {
            if !self.is_feature(v) {
                continue;
            }
            let feature_edges = self
                .mesh
                .vertex_halfedges(v)
                .filter(|h| self.is_feature_edge(h.edge()))
                .count();
            if feature_edges != 2 {
                locked[v.index()] = true;
            }
        }

        self.mesh
            .vertex_property_mut(self.vlocked)
            .as_mut_slice()
            .copy_from_slice(&locked);
        self.mesh
            .edge_property_mut(self.elocked)
            .as_mut_slice()
            .copy_from_slice(&edge_locked);

        let count = locked.iter().filter(|&&l| l).count();
        if count > 0 {
            debug!("remeshing: {} locked vertices", count);
        }
    }

    fn init_sizing(&mut self) {
        match self.mode {
            SizingMode::Uniform { target_length } => {
                self.mesh.vertex_property_mut(self.vsizing).fill(target_length);
            }
            SizingMode::Adaptive {
                min_length,
                max_length,
                approx_error,
            } => {
                let field =
                    sizing::adaptive_sizing(self.mesh, self.vfeature, min_length, max_length, approx_error);
                self.mesh
                    .vertex_property_mut(self.vsizing)
                    .as_mut_slice()
                    .copy_from_slice(&field);
            }
        }
    }

    fn build_reference(&mut self) {
        let mesh = self.mesh.clone();
        let bvh = TriangleBvh::build(&mesh);
        let normals = self.mesh.vertex_property(self.vnormal).as_slice().to_vec();
        let sizing = self.mesh.vertex_property(self.vsizing).as_slice().to_vec();
        self.reference = Some(Reference {
            mesh,
            bvh,
            normals,
            sizing,
        });
    }

    fn remesh(&mut self, iterations: usize, progress: &Progress) -> Result<()> {
        for i in 0..iterations {
            if progress.is_cancelled() {
                warn!("remeshing cancelled after {} of {} iterations", i, iterations);
                return Err(MeshError::Cancelled);
            }
            progress.report(i, iterations, "Remeshing");

            self.split_long_edges();
            self.update_normals();
            self.collapse_short_edges();
            self.flip_edges();
            self.tangential_smoothing(SMOOTHING_ITERATIONS);
            self.stats.iterations += 1;
        }

        self.remove_caps();
        progress.report(iterations, iterations, "Remeshing complete");
        Ok(())
    }

    /// Postprocessing: release the reference and every transient property.
    fn finish(self) -> RemeshStats {
        let Self {
            mesh,
            vfeature,
            efeature,
            owns_vfeature,
            owns_efeature,
            vlocked,
            elocked,
            vsizing,
            vnormal,
            stats,
            ..
        } = self;

        mesh.remove_vertex_property(vlocked);
        mesh.remove_edge_property(elocked);
        mesh.remove_vertex_property(vsizing);
        mesh.remove_vertex_property(vnormal);
        if owns_vfeature {
            mesh.remove_vertex_property(vfeature);
        }
        if owns_efeature {
            mesh.remove_edge_property(efeature);
        }
        stats
    }

    // ==================== Property helpers ====================

    #[inline]
    fn is_locked(&self, v: VertexId) -> bool {
        self.mesh.vertex_property(self.vlocked)[v]
    }

    #[inline]
    fn is_edge_locked(&self, e: EdgeId) -> bool {
        self.mesh.edge_property(self.elocked)[e]
    }

    #[inline]
    fn is_feature(&self, v: VertexId) -> bool {
        self.mesh.vertex_property(self.vfeature)[v]
    }

    #[inline]
    fn is_feature_edge(&self, e: EdgeId) -> bool {
        self.mesh.edge_property(self.efeature)[e]
    }

    #[inline]
    fn sizing(&self, v: VertexId) -> f64 {
        self.mesh.vertex_property(self.vsizing)[v]
    }

    #[inline]
    fn normal(&self, v: VertexId) -> Vector3<f64> {
        self.mesh.vertex_property(self.vnormal)[v]
    }

    /// Mean target length of the edge between two vertices.
    #[inline]
    fn target_length(&self, v0: VertexId, v1: VertexId) -> f64 {
        0.5 * (self.sizing(v0) + self.sizing(v1))
    }

    fn distance(&self, v0: VertexId, v1: VertexId) -> f64 {
        (self.mesh.position(v0) - self.mesh.position(v1)).norm()
    }

    fn is_too_long(&self, v0: VertexId, v1: VertexId) -> bool {
        self.distance(v0, v1) > SPLIT_FACTOR * self.target_length(v0, v1)
    }

    fn is_too_short(&self, v0: VertexId, v1: VertexId) -> bool {
        self.distance(v0, v1) < COLLAPSE_FACTOR * self.target_length(v0, v1)
    }

    fn update_normals(&mut self) {
        let normals: Vec<(VertexId, Vector3<f64>)> = self
            .mesh
            .vertex_ids()
            .map(|v| (v, self.mesh.vertex_normal(v)))
            .collect();
        let prop = self.mesh.vertex_property_mut(self.vnormal);
        for (v, n) in normals {
            prop[v] = n;
        }
    }
}
