//! Mesh file I/O.
//!
//! Every loader goes through [`MeshBuilder`](crate::mesh::MeshBuilder), so
//! arbitrary polygon soups load as manifold meshes; the [`BuildReport`] of
//! that repair is returned alongside the mesh.
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Notes |
//! |--------|-----------|------|------|-------|
//! | Wavefront OBJ | `.obj` | ✓ | ✓ | Polygons, positions only |
//! | PLY | `.ply` | ✓ | ✓ | ASCII and binary in, ASCII out, scalar vertex properties |
//!
//! # Usage
//!
//! ```no_run
//! use halfmesh::io::{load, save};
//!
//! let (mesh, report) = load("model.obj").unwrap();
//! if !report.is_clean() {
//!     eprintln!("{}", report);
//! }
//! save(&mesh, "output.ply").unwrap();
//! ```

pub mod obj;
pub mod ply;

use std::path::Path;

use crate::error::{MeshError, Result};
use crate::mesh::{BuildReport, HalfEdgeMesh};

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Wavefront OBJ format.
    Obj,
    /// PLY (Stanford polygon) format.
    Ply,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "obj" => Some(Format::Obj),
            "ply" => Some(Format::Ply),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }
}

fn detect(path: &Path) -> Result<Format> {
    Format::from_path(path).ok_or_else(|| MeshError::UnsupportedFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })
}

/// Load a mesh from a file with automatic format detection.
pub fn load<P: AsRef<Path>>(path: P) -> Result<(HalfEdgeMesh, BuildReport)> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Obj => obj::load(path),
        Format::Ply => ply::load(path),
    }
}

/// Save a mesh to a file with automatic format detection.
pub fn save<P: AsRef<Path>>(mesh: &HalfEdgeMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Obj => obj::save(mesh, path),
        Format::Ply => ply::save(mesh, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::from_path("a/b/mesh.OBJ"), Some(Format::Obj));
        assert_eq!(Format::from_path("mesh.ply"), Some(Format::Ply));
        assert_eq!(Format::from_path("mesh.stl"), None);
        assert_eq!(Format::from_path("mesh"), None);
    }

    #[test]
    fn test_unsupported_extension() {
        let mesh = HalfEdgeMesh::new();
        match save(&mesh, "out.xyz") {
            Err(MeshError::UnsupportedFormat { extension }) => assert_eq!(extension, "xyz"),
            other => panic!("expected UnsupportedFormat, got {:?}", other),
        }
        assert!(matches!(load("noext"), Err(MeshError::UnsupportedFormat { .. })));
    }
}
