//! Property-based tests for the local operators.
//!
//! Random sequences of split, collapse and flip are applied to small meshes;
//! after every operation the connectivity must stay valid and the element
//! counts must change by the operator's exact deltas.
//!
//! Run with: cargo test --test proptest_topology

use halfmesh::prelude::*;
use nalgebra::Point3;
use proptest::prelude::*;

// =============================================================================
// Fixtures
// =============================================================================

fn octahedron() -> HalfEdgeMesh {
    let vertices = vec![
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(-1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, -1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(0.0, 0.0, -1.0),
    ];
    let faces = vec![
        [0, 2, 4],
        [2, 1, 4],
        [1, 3, 4],
        [3, 0, 4],
        [2, 0, 5],
        [1, 2, 5],
        [3, 1, 5],
        [0, 3, 5],
    ];
    build_from_triangles(&vertices, &faces).unwrap()
}

fn grid(n: usize) -> HalfEdgeMesh {
    let mut vertices = Vec::new();
    let mut faces = Vec::new();
    for j in 0..=n {
        for i in 0..=n {
            vertices.push(Point3::new(i as f64, j as f64, 0.0));
        }
    }
    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + n + 1;
            let v11 = v01 + 1;
            faces.push([v00, v10, v11]);
            faces.push([v00, v11, v01]);
        }
    }
    build_from_triangles(&vertices, &faces).unwrap()
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Split(usize),
    Collapse(usize),
    Flip(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..10_000usize).prop_map(Op::Split),
        (0..10_000usize).prop_map(Op::Collapse),
        (0..10_000usize).prop_map(Op::Flip),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Counts {
    vertices: i64,
    edges: i64,
    faces: i64,
}

fn counts(mesh: &HalfEdgeMesh) -> Counts {
    Counts {
        vertices: mesh.num_vertices() as i64,
        edges: mesh.num_edges() as i64,
        faces: mesh.num_faces() as i64,
    }
}

fn delta(before: Counts, after: Counts) -> (i64, i64, i64) {
    (
        after.vertices - before.vertices,
        after.edges - before.edges,
        after.faces - before.faces,
    )
}

/// Check the pointer invariants on every live half-edge.
fn check_connectivity(mesh: &HalfEdgeMesh) -> std::result::Result<(), TestCaseError> {
    prop_assert!(mesh.is_valid());
    for h in mesh.halfedge_ids() {
        prop_assert_eq!(h.twin().twin(), h);
        prop_assert_eq!(mesh.next(mesh.prev(h)), h);
        prop_assert_eq!(mesh.prev(mesh.next(h)), h);
        prop_assert_eq!(mesh.source(h), mesh.target(h.twin()));
        prop_assert!(!mesh.is_deleted_vertex(mesh.target(h)));
    }
    for v in mesh.vertex_ids() {
        prop_assert!(mesh.is_manifold(v));
    }
    prop_assert!(mesh.is_triangle_mesh());
    Ok(())
}

/// Apply one operation if its precondition holds; returns whether it ran.
fn apply(mesh: &mut HalfEdgeMesh, op: Op) -> std::result::Result<bool, TestCaseError> {
    let before = counts(mesh);
    match op {
        Op::Split(i) => {
            let e = EdgeId::new(i % mesh.edges_size());
            if mesh.is_deleted_edge(e) {
                return Ok(false);
            }
            let boundary = mesh.is_boundary_edge(e);
            let midpoint = mesh.edge_midpoint(e);
            let v = mesh.add_vertex(midpoint);
            mesh.split_edge(e, v);
            let expected = if boundary { (1, 2, 1) } else { (1, 3, 2) };
            prop_assert_eq!(delta(before, counts(mesh)), expected);
            prop_assert_eq!(*mesh.position(v), midpoint);
        }
        Op::Collapse(i) => {
            let h = HalfEdgeId::new(i % mesh.halfedges_size());
            if !mesh.is_collapse_ok(h) {
                return Ok(false);
            }
            mesh.collapse(h);
            let d = delta(before, counts(mesh));
            prop_assert!(d == (-1, -3, -2) || d == (-1, -2, -1), "collapse delta {:?}", d);
        }
        Op::Flip(i) => {
            let e = EdgeId::new(i % mesh.edges_size());
            if !mesh.is_flip_ok(e) {
                return Ok(false);
            }
            mesh.flip(e);
            prop_assert_eq!(delta(before, counts(mesh)), (0, 0, 0));
        }
    }
    Ok(true)
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Operator sequences on a closed mesh keep it valid and closed.
    #[test]
    fn closed_mesh_operator_sequences(ops in prop::collection::vec(arb_op(), 1..60)) {
        let mut mesh = octahedron();
        for op in ops {
            apply(&mut mesh, op)?;
            check_connectivity(&mesh)?;
            let euler = mesh.num_vertices() as i64 - mesh.num_edges() as i64 + mesh.num_faces() as i64;
            prop_assert_eq!(euler, 2);
        }
    }

    /// Operator sequences on an open mesh keep it valid with one boundary loop.
    #[test]
    fn open_mesh_operator_sequences(ops in prop::collection::vec(arb_op(), 1..60)) {
        let mut mesh = grid(3);
        for op in ops {
            apply(&mut mesh, op)?;
            check_connectivity(&mesh)?;
            prop_assert_eq!(mesh.boundary_loops().len(), 1);
        }
    }

    /// Garbage collection after random edits keeps counts and validity.
    #[test]
    fn garbage_collection_after_edits(ops in prop::collection::vec(arb_op(), 1..40)) {
        let mut mesh = grid(3);
        for op in ops {
            apply(&mut mesh, op)?;
        }
        let before = counts(&mesh);
        let area = mesh.surface_area();
        mesh.collect_garbage();

        prop_assert!(!mesh.has_garbage());
        prop_assert_eq!(counts(&mesh), before);
        prop_assert_eq!(mesh.vertices_size() as i64, before.vertices);
        prop_assert_eq!(mesh.faces_size() as i64, before.faces);
        prop_assert!((mesh.surface_area() - area).abs() < 1e-9);
        check_connectivity(&mesh)?;
    }

    /// Vertex property values follow their vertex through compaction.
    #[test]
    fn property_values_survive_compaction(ops in prop::collection::vec(arb_op(), 1..40)) {
        let mut mesh = octahedron();
        let tag = mesh.add_vertex_property("v:tag", 0.0_f64).unwrap();
        for op in ops {
            apply(&mut mesh, op)?;
        }
        for v in mesh.vertex_ids().collect::<Vec<_>>() {
            let p = *mesh.position(v);
            mesh.vertex_property_mut(tag)[v] = p.x + 10.0 * p.y + 100.0 * p.z;
        }
        mesh.collect_garbage();
        for v in mesh.vertex_ids() {
            let p = mesh.position(v);
            prop_assert_eq!(mesh.vertex_property(tag)[v], p.x + 10.0 * p.y + 100.0 * p.z);
        }
    }
}
