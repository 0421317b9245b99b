//! PLY (Stanford polygon) format support.
//!
//! Loading accepts ASCII and binary files through `ply_rs`. Scalar vertex
//! properties other than the coordinates are attached to the mesh as `f64`
//! vertex properties of the same name. Saving writes ASCII and includes
//! every `f64` vertex property, with `:` in names replaced by `_`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;
use nalgebra::Point3;
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};

use crate::error::{MeshError, Result};
use crate::mesh::{build_from_polygons, to_polygons, BuildReport, HalfEdgeMesh, VertexProperty};

const COORDINATES: [&str; 3] = ["x", "y", "z"];

/// Load a mesh from a PLY file.
///
/// # Example
///
/// ```no_run
/// use halfmesh::io::ply;
///
/// let (mesh, _report) = ply::load("model.ply").unwrap();
/// for name in mesh.vertex_property_names() {
///     println!("vertex property {}", name);
/// }
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<(HalfEdgeMesh, BuildReport)> {
    let path = path.as_ref();
    let load_error = |message: &str| MeshError::LoadError {
        path: path.to_path_buf(),
        message: message.to_string(),
    };

    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let parser = Parser::<DefaultElement>::new();
    let ply = parser.read_ply(&mut reader).map_err(|e| MeshError::LoadError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let vertex_element = ply
        .payload
        .get("vertex")
        .ok_or_else(|| load_error("PLY file has no vertex element"))?;

    let mut vertices: Vec<Point3<f64>> = Vec::with_capacity(vertex_element.len());
    for vertex in vertex_element {
        let mut coords = [0.0; 3];
        for (c, name) in coords.iter_mut().zip(COORDINATES) {
            *c = get_float_property(vertex, name)
                .ok_or_else(|| load_error(&format!("vertex missing {} coordinate", name)))?;
        }
        vertices.push(Point3::new(coords[0], coords[1], coords[2]));
    }

    let face_element = ply
        .payload
        .get("face")
        .ok_or_else(|| load_error("PLY file has no face element"))?;

    let mut faces: Vec<Vec<usize>> = Vec::with_capacity(face_element.len());
    for face in face_element {
        let indices = get_list_property(face, "vertex_indices")
            .or_else(|| get_list_property(face, "vertex_index"))
            .ok_or_else(|| load_error("face missing vertex_indices property"))?;
        faces.push(indices);
    }

    if faces.is_empty() {
        return Err(load_error("PLY file contains no faces"));
    }

    let (mut mesh, report) = build_from_polygons(&vertices, &faces);

    // scalar attributes beyond the coordinates
    let mut names: Vec<&String> = vertex_element
        .first()
        .map(|first| first.keys().collect())
        .unwrap_or_default();
    names.retain(|name| !COORDINATES.contains(&name.as_str()));
    for name in names {
        let values: Option<Vec<f64>> = vertex_element
            .iter()
            .map(|vertex| get_float_property(vertex, name))
            .collect();
        let Some(values) = values else {
            continue;
        };
        let prop = mesh.vertex_property_or_add(name, 0.0_f64)?;
        assign_by_input(&mut mesh, &report, prop, &values);
        debug!("ply: loaded vertex property {}", name);
    }

    Ok((mesh, report))
}

/// Write per-input values to every surviving vertex and copy of that input.
fn assign_by_input(mesh: &mut HalfEdgeMesh, report: &BuildReport, prop: VertexProperty<f64>, values: &[f64]) {
    let array = mesh.vertex_property_mut(prop);
    for (input, &value) in values.iter().enumerate() {
        if let Some(&v) = report.vertex_map.get(input) {
            if v.is_valid() {
                array[v] = value;
            }
        }
        for copy in report.copies_of(input) {
            array[copy] = value;
        }
    }
}

fn get_float_property(element: &DefaultElement, name: &str) -> Option<f64> {
    match element.get(name)? {
        Property::Float(v) => Some(*v as f64),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(*v as f64),
        Property::UInt(v) => Some(*v as f64),
        Property::Short(v) => Some(*v as f64),
        Property::UShort(v) => Some(*v as f64),
        Property::Char(v) => Some(*v as f64),
        Property::UChar(v) => Some(*v as f64),
        _ => None,
    }
}

fn get_list_property(element: &DefaultElement, name: &str) -> Option<Vec<usize>> {
    match element.get(name)? {
        Property::ListInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        _ => None,
    }
}

/// Save a mesh to a PLY file (ASCII format).
///
/// # Example
///
/// ```no_run
/// use halfmesh::io::ply;
/// use halfmesh::mesh::HalfEdgeMesh;
///
/// let mesh = HalfEdgeMesh::new();
/// ply::save(&mesh, "output.ply").unwrap();
/// ```
pub fn save<P: AsRef<Path>>(mesh: &HalfEdgeMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let (vertices, faces) = to_polygons(mesh);
    let scalars: Vec<(String, VertexProperty<f64>)> = mesh
        .vertex_property_names()
        .into_iter()
        .filter_map(|name| mesh.get_vertex_property::<f64>(&name).map(|p| (name.replace(':', "_"), p)))
        .collect();

    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "comment Generated by halfmesh")?;
    writeln!(writer, "element vertex {}", vertices.len())?;
    for name in COORDINATES {
        writeln!(writer, "property double {}", name)?;
    }
    for (name, _) in &scalars {
        writeln!(writer, "property double {}", name)?;
    }
    writeln!(writer, "element face {}", faces.len())?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    writeln!(writer, "end_header")?;

    // to_polygons enumerates live vertices in handle order
    for (v, p) in mesh.vertex_ids().zip(&vertices) {
        write!(writer, "{} {} {}", p.x, p.y, p.z)?;
        for (_, prop) in &scalars {
            write!(writer, " {}", mesh.vertex_property(*prop)[v])?;
        }
        writeln!(writer)?;
    }

    for face in &faces {
        write!(writer, "{}", face.len())?;
        for &i in face {
            write!(writer, " {}", i)?;
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}
