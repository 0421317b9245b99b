//! # halfmesh
//!
//! A half-edge polygon mesh library with non-manifold repair and
//! incremental remeshing.
//!
//! halfmesh provides a half-edge mesh data structure with dynamic typed
//! element properties, a builder that turns arbitrary polygon soups into
//! manifold meshes by vertex duplication, and the split / collapse / flip
//! operators plus the remeshing pipeline built on top of them.
//!
//! ## Features
//!
//! - **Half-edge data structure**: O(1) adjacency queries with type-safe indices
//! - **Properties**: named per-element attributes kept in lockstep with the mesh
//! - **Repairing builder**: non-manifold edges and vertices resolved by duplication
//! - **Remeshing**: uniform and curvature-adaptive incremental remeshing
//! - **File formats**: OBJ, PLY
//!
//! ## Quick Start
//!
//! ```no_run
//! use halfmesh::prelude::*;
//!
//! // Load a mesh; the build report lists every repair that was needed
//! let (mut mesh, report) = halfmesh::io::load("model.obj").unwrap();
//! println!("{}", report);
//!
//! // Remesh to a uniform edge length
//! let options = UniformRemeshOptions::with_target_length(0.05);
//! uniform_remeshing(&mut mesh, &options).unwrap();
//!
//! // Save the mesh
//! halfmesh::io::save(&mesh, "output.ply").unwrap();
//! ```
//!
//! ## Building Meshes Programmatically
//!
//! ```
//! use halfmesh::prelude::*;
//! use nalgebra::Point3;
//!
//! // Define vertices and faces
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//!     Point3::new(0.5, 0.5, 1.0),
//! ];
//!
//! let faces = vec![
//!     [0, 2, 1],  // bottom
//!     [0, 1, 3],  // front
//!     [1, 2, 3],  // right
//!     [2, 0, 3],  // left
//! ];
//!
//! // Build the mesh
//! let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//! assert_eq!(mesh.num_vertices(), 4);
//! assert_eq!(mesh.num_faces(), 4);
//! ```
//!
//! ## Mesh Traversal
//!
//! ```
//! use halfmesh::prelude::*;
//! use nalgebra::Point3;
//!
//! # let vertices = vec![
//! #     Point3::new(0.0, 0.0, 0.0),
//! #     Point3::new(1.0, 0.0, 0.0),
//! #     Point3::new(0.5, 1.0, 0.0),
//! # ];
//! # let faces = vec![[0, 1, 2]];
//! # let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//! // Iterate over neighbors of a vertex
//! let v = VertexId::new(0);
//! for neighbor in mesh.vertex_neighbors(v) {
//!     println!("Neighbor: {:?}", neighbor);
//! }
//!
//! // Iterate over faces around a vertex
//! for face in mesh.vertex_faces(v) {
//!     println!("Adjacent face: {:?}", face);
//! }
//!
//! // Get vertices of a face
//! let f = FaceId::new(0);
//! let [v0, v1, v2] = mesh.face_triangle(f);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod io;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use halfmesh::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::remesh::{
        adaptive_remeshing, uniform_remeshing, AdaptiveRemeshOptions, RemeshStats,
        UniformRemeshOptions,
    };
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{
        build_from_polygons, build_from_triangles, to_face_vertex, to_polygons, BuildReport,
        EdgeId, FaceId, HalfEdgeId, HalfEdgeMesh, MeshBuilder, VertexId,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;
