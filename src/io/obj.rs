//! Wavefront OBJ format support.
//!
//! Only `v` and `f` records are interpreted. Face corners may carry
//! texture and normal references (`f 1/2/3 ...`), which are ignored;
//! negative indices count back from the most recent vertex.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;

use crate::error::{MeshError, Result};
use crate::mesh::{build_from_polygons, to_polygons, BuildReport, HalfEdgeMesh};

/// Load a mesh from an OBJ file.
///
/// # Example
///
/// ```no_run
/// use halfmesh::io::obj;
///
/// let (mesh, report) = obj::load("model.obj").unwrap();
/// println!("{} faces, {} rejected", mesh.num_faces(), report.faces_rejected());
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<(HalfEdgeMesh, BuildReport)> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let (vertices, faces) = parse(BufReader::new(file)).map_err(|message| MeshError::LoadError {
        path: path.to_path_buf(),
        message,
    })?;

    if faces.is_empty() {
        return Err(MeshError::LoadError {
            path: path.to_path_buf(),
            message: "OBJ file contains no faces".to_string(),
        });
    }

    Ok(build_from_polygons(&vertices, &faces))
}

/// Parse OBJ text into positions and zero-based polygons.
///
/// Out-of-range face indices are passed through for the builder to reject.
pub fn parse<R: BufRead>(reader: R) -> std::result::Result<(Vec<Point3<f64>>, Vec<Vec<usize>>), String> {
    let mut vertices = Vec::new();
    let mut faces = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| e.to_string())?;
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let mut coords = [0.0; 3];
                for c in &mut coords {
                    *c = tokens
                        .next()
                        .and_then(|t| t.parse::<f64>().ok())
                        .ok_or_else(|| format!("line {}: malformed vertex", line_no + 1))?;
                }
                vertices.push(Point3::new(coords[0], coords[1], coords[2]));
            }
            Some("f") => {
                let face = tokens
                    .map(|t| resolve_index(t, vertices.len()))
                    .collect::<Option<Vec<usize>>>()
                    .ok_or_else(|| format!("line {}: malformed face", line_no + 1))?;
                faces.push(face);
            }
            _ => {}
        }
    }

    Ok((vertices, faces))
}

fn resolve_index(token: &str, num_vertices: usize) -> Option<usize> {
    let index: i64 = token.split('/').next()?.parse().ok()?;
    if index > 0 {
        Some(index as usize - 1)
    } else if index < 0 {
        let back = index.unsigned_abs() as usize;
        // past the first vertex maps out of range
        Some(num_vertices.checked_sub(back).unwrap_or(usize::MAX))
    } else {
        None
    }
}

/// Save a mesh to an OBJ file, keeping polygons as they are.
pub fn save<P: AsRef<Path>>(mesh: &HalfEdgeMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let (vertices, faces) = to_polygons(mesh);

    writeln!(writer, "# halfmesh")?;
    writeln!(writer, "# {} vertices, {} faces", vertices.len(), faces.len())?;
    for v in &vertices {
        writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
    }
    for face in &faces {
        write!(writer, "f")?;
        for &i in face {
            write!(writer, " {}", i + 1)?;
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_polygons_and_corner_references() {
        let text = "\
# comment
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
f -4 -2 -1
";
        let (vertices, faces) = parse(Cursor::new(text)).unwrap();
        assert_eq!(vertices.len(), 4);
        assert_eq!(faces, vec![vec![0, 1, 2, 3], vec![0, 2, 3]]);
    }

    #[test]
    fn test_parse_errors_name_the_line() {
        let err = parse(Cursor::new("v 0 0\n")).unwrap_err();
        assert!(err.contains("line 1"));
        let err = parse(Cursor::new("v 0 0 0\nf 1 x 2\n")).unwrap_err();
        assert!(err.contains("line 2"));
        assert!(parse(Cursor::new("v 0 0 0\nf 0 1 1\n")).is_err());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let mut mesh = HalfEdgeMesh::new();
        let v: Vec<_> = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [2.0, 0.5]]
            .iter()
            .map(|p| mesh.add_vertex(Point3::new(p[0], p[1], 0.0)))
            .collect();
        mesh.add_quad(v[0], v[1], v[2], v[3]);
        mesh.add_triangle(v[1], v[4], v[2]);

        let path = std::env::temp_dir().join(format!("halfmesh_obj_{}.obj", std::process::id()));
        save(&mesh, &path).unwrap();
        let (loaded, report) = load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(report.is_clean());
        assert_eq!(loaded.num_vertices(), 5);
        assert_eq!(loaded.num_faces(), 2);
        assert!(!loaded.is_triangle_mesh());
        assert!((loaded.surface_area() - mesh.surface_area()).abs() < 1e-12);
    }

    #[test]
    fn test_load_without_faces_fails() {
        let path = std::env::temp_dir().join(format!("halfmesh_empty_{}.obj", std::process::id()));
        std::fs::write(&path, "v 0 0 0\n").unwrap();
        let result = load(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(MeshError::LoadError { .. })));
    }
}
