//! Curvature-driven sizing field for adaptive remeshing.

use crate::algo::curvature::{cotangent_weight, max_abs_curvature};
use crate::mesh::{HalfEdgeMesh, VertexProperty};

use super::SIZING_SMOOTHING_ITERATIONS;

/// Longest chord length that deviates at most `approx_error` from a circle
/// of curvature `curvature`.
///
/// For radius `r = 1 / curvature` this is `sqrt(6·e·r − 3·e²)` when the
/// error is below the radius, and `e·3/√3` otherwise. Zero curvature yields
/// infinity; callers clamp the result.
///
/// ```
/// use halfmesh::algo::remesh::edge_length_from_curvature;
///
/// let l = edge_length_from_curvature(1.0, 0.01);
/// assert!((l - 0.244335).abs() < 1e-5);
/// assert!(edge_length_from_curvature(0.0, 0.01).is_infinite());
/// ```
pub fn edge_length_from_curvature(curvature: f64, approx_error: f64) -> f64 {
    let r = 1.0 / curvature;
    if approx_error < r {
        (6.0 * approx_error * r - 3.0 * approx_error * approx_error).sqrt()
    } else {
        approx_error * 3.0 / 3.0_f64.sqrt()
    }
}

/// Per-slot target edge lengths from the maximum absolute curvature.
///
/// The curvature is smoothed with cotangent weights over interior non-feature
/// vertices; feature vertices then take the weighted mean of their
/// non-feature neighbours.
pub(super) fn adaptive_sizing(
    mesh: &HalfEdgeMesh,
    vfeature: VertexProperty<bool>,
    min_length: f64,
    max_length: f64,
    approx_error: f64,
) -> Vec<f64> {
    let feature = mesh.vertex_property(vfeature);
    let mut curvature = max_abs_curvature(mesh);

    for _ in 0..SIZING_SMOOTHING_ITERATIONS {
        let previous = curvature.clone();
        for v in mesh.vertex_ids() {
            if mesh.is_boundary_vertex(v) || feature[v] || mesh.is_isolated(v) {
                continue;
            }
            let (sum, weights) = mesh.vertex_halfedges(v).fold((0.0, 0.0), |(s, ws), h| {
                let w = cotangent_weight(mesh, h);
                (s + w * previous[mesh.target(h).index()], ws + w)
            });
            if weights > 0.0 {
                curvature[v.index()] = sum / weights;
            }
        }
    }

    for v in mesh.vertex_ids() {
        if !feature[v] {
            continue;
        }
        let mut sum = 0.0;
        let mut weights = 0.0;
        for h in mesh.vertex_halfedges(v) {
            let w = mesh.target(h);
            if feature[w] {
                continue;
            }
            let weight = cotangent_weight(mesh, h).max(f64::EPSILON);
            sum += weight * curvature[w.index()];
            weights += weight;
        }
        if weights > 0.0 {
            curvature[v.index()] = sum / weights;
        }
    }

    curvature
        .into_iter()
        .map(|c| edge_length_from_curvature(c, approx_error).clamp(min_length, max_length))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::remesh::tests::{create_grid_mesh, create_icosphere};
    use approx::assert_relative_eq;

    #[test]
    fn test_edge_length_from_curvature() {
        assert_relative_eq!(edge_length_from_curvature(1.0, 0.01), 0.0597_f64.sqrt(), epsilon = 1e-12);
        // error exceeds the radius
        assert_relative_eq!(
            edge_length_from_curvature(200.0, 0.01),
            0.03 / 3.0_f64.sqrt(),
            epsilon = 1e-12
        );
        assert!(edge_length_from_curvature(0.0, 0.01).is_infinite());
    }

    #[test]
    fn test_flat_mesh_gets_max_length() {
        let mut mesh = create_grid_mesh(3);
        let vfeature = mesh.add_vertex_property("v:feature", false).unwrap();
        let sizing = adaptive_sizing(&mesh, vfeature, 0.1, 2.0, 0.01);
        for v in mesh.vertex_ids() {
            assert_relative_eq!(sizing[v.index()], 2.0);
        }
    }

    #[test]
    fn test_unit_sphere_sizing() {
        let mut mesh = create_icosphere(3);
        let vfeature = mesh.add_vertex_property("v:feature", false).unwrap();
        let sizing = adaptive_sizing(&mesh, vfeature, 0.01, 1.0, 0.01);
        let expected = edge_length_from_curvature(1.0, 0.01);
        for v in mesh.vertex_ids() {
            assert_relative_eq!(sizing[v.index()], expected, max_relative = 0.1);
        }
    }
}
