//! Core mesh data structures.
//!
//! This module provides the half-edge mesh representation, its property
//! system, the repairing builder and the local topology operators.
//!
//! # Overview
//!
//! The primary type is [`HalfEdgeMesh`], which represents a polygon mesh using
//! a half-edge (doubly-connected edge list) data structure. This representation
//! provides O(1) adjacency queries, making it efficient for geometry processing
//! algorithms.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe `u32` handles:
//! - [`VertexId`] - Identifies a vertex
//! - [`HalfEdgeId`] - Identifies a half-edge
//! - [`FaceId`] - Identifies a face
//! - [`EdgeId`] - Identifies a full edge
//!
//! # Properties
//!
//! Named, typed attributes can be attached to every element kind and stay in
//! lockstep with the element arrays through insertion and garbage collection.
//! See [`property`].
//!
//! # Construction
//!
//! Meshes are typically constructed from file I/O or from face-vertex lists:
//!
//! ```
//! use halfmesh::mesh::{HalfEdgeMesh, build_from_triangles};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2]];
//!
//! let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//! ```
//!
//! Polygon soups with non-manifold configurations go through
//! [`build_from_polygons`] or a [`MeshBuilder`], which duplicate vertices
//! instead of rejecting faces.

mod builder;
mod garbage;
mod halfedge;
mod index;
mod ops;
pub mod property;

pub use builder::{
    build_from_polygons, build_from_triangles, to_face_vertex, to_polygons, BuildReport,
    MeshBuilder, LOCKED_VERTEX_PROPERTY,
};
pub use garbage::GarbageMaps;
pub use halfedge::{
    Face, FaceHalfEdgeIter, HalfEdge, HalfEdgeMesh, LinkError, Vertex, VertexHalfEdgeIter,
};
pub use index::{EdgeId, FaceId, HalfEdgeId, VertexId};
pub use property::{
    EdgeProperty, FaceProperty, HalfEdgeProperty, Model, ModelProperty, Property,
    PropertyContainer, PropertyVec, VertexProperty,
};
