//! Nearest-triangle queries over a frozen triangle mesh.
//!
//! [`TriangleBvh`] stores its own copy of every triangle, so the mesh it was
//! built from may be mutated or dropped afterwards. The remesher builds one
//! over a reference copy of the input and projects vertices back onto it.

use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

use crate::mesh::{FaceId, HalfEdgeMesh};

const MAX_LEAF_SIZE: usize = 8;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

impl Aabb {
    /// An empty (inverted) box.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::MAX, f64::MAX, f64::MAX),
            max: Point3::new(f64::MIN, f64::MIN, f64::MIN),
        }
    }

    /// Grow the box to contain a point.
    pub fn expand_point(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Grow the box to contain another box.
    pub fn expand(&mut self, other: &Self) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    /// Center of the box.
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Index of the longest axis.
    pub fn longest_axis(&self) -> usize {
        (self.max - self.min).imax()
    }

    /// Squared distance from a point to the box (zero inside).
    pub fn distance_squared(&self, p: &Point3<f64>) -> f64 {
        let mut d = 0.0;
        for i in 0..3 {
            let excess = (self.min[i] - p[i]).max(p[i] - self.max[i]).max(0.0);
            d += excess * excess;
        }
        d
    }
}

/// Result of a nearest-triangle query.
#[derive(Debug, Clone, Copy)]
pub struct NearestTriangle {
    /// Face of the source mesh.
    pub face: FaceId,
    /// Closest point on the triangle.
    pub point: Point3<f64>,
    /// Barycentric coordinates of `point` w.r.t. the face's corners, in
    /// [`HalfEdgeMesh::face_triangle`] order.
    pub barycentric: [f64; 3],
    /// Squared distance from the query point.
    pub distance_squared: f64,
}

impl NearestTriangle {
    /// Interpolate per-corner values with the barycentric coordinates.
    pub fn interpolate(&self, values: [f64; 3]) -> f64 {
        self.barycentric[0] * values[0]
            + self.barycentric[1] * values[1]
            + self.barycentric[2] * values[2]
    }

    /// Interpolate per-corner vectors with the barycentric coordinates.
    pub fn interpolate_vector(&self, values: [Vector3<f64>; 3]) -> Vector3<f64> {
        values[0] * self.barycentric[0]
            + values[1] * self.barycentric[1]
            + values[2] * self.barycentric[2]
    }
}

#[derive(Debug)]
enum BvhNode {
    Leaf {
        bbox: Aabb,
        triangles: SmallVec<[u32; MAX_LEAF_SIZE]>,
    },
    Internal {
        bbox: Aabb,
        left: Box<BvhNode>,
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    fn bbox(&self) -> &Aabb {
        match self {
            Self::Leaf { bbox, .. } | Self::Internal { bbox, .. } => bbox,
        }
    }
}

#[derive(Debug, Clone)]
struct Triangle {
    face: FaceId,
    corners: [Point3<f64>; 3],
    bbox: Aabb,
}

/// Bounding volume hierarchy over the triangles of a mesh.
#[derive(Debug)]
pub struct TriangleBvh {
    triangles: Vec<Triangle>,
    root: Option<BvhNode>,
}

impl TriangleBvh {
    /// Build over the live triangles of `mesh`; other polygons are skipped.
    pub fn build(mesh: &HalfEdgeMesh) -> Self {
        let triangles: Vec<Triangle> = mesh
            .face_ids()
            .filter(|&f| mesh.face_valence(f) == 3)
            .map(|f| {
                let corners = mesh.face_positions(f);
                let mut bbox = Aabb::empty();
                for c in &corners {
                    bbox.expand_point(c);
                }
                Triangle { face: f, corners, bbox }
            })
            .collect();

        let root = if triangles.is_empty() {
            None
        } else {
            let indices: Vec<u32> = (0..triangles.len() as u32).collect();
            Some(Self::build_recursive(&triangles, indices))
        };

        Self { triangles, root }
    }

    fn build_recursive(triangles: &[Triangle], mut indices: Vec<u32>) -> BvhNode {
        let mut bbox = Aabb::empty();
        for &i in &indices {
            bbox.expand(&triangles[i as usize].bbox);
        }

        if indices.len() <= MAX_LEAF_SIZE {
            return BvhNode::Leaf {
                bbox,
                triangles: indices.into_iter().collect(),
            };
        }

        // median split along the longest axis of the centroid spread
        let mut centers = Aabb::empty();
        for &i in &indices {
            centers.expand_point(&triangles[i as usize].bbox.center());
        }
        let axis = centers.longest_axis();
        let mid = indices.len() / 2;
        indices.select_nth_unstable_by(mid, |&a, &b| {
            let ca = triangles[a as usize].bbox.center()[axis];
            let cb = triangles[b as usize].bbox.center()[axis];
            ca.total_cmp(&cb)
        });
        let right = indices.split_off(mid);

        BvhNode::Internal {
            bbox,
            left: Box::new(Self::build_recursive(triangles, indices)),
            right: Box::new(Self::build_recursive(triangles, right)),
        }
    }

    /// Number of triangles in the hierarchy.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Whether the hierarchy holds no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Closest point on the surface, or `None` for an empty hierarchy.
    pub fn nearest(&self, p: &Point3<f64>) -> Option<NearestTriangle> {
        let root = self.root.as_ref()?;
        let mut best: Option<NearestTriangle> = None;
        let mut stack: Vec<&BvhNode> = vec![root];

        while let Some(node) = stack.pop() {
            let bound = best.map_or(f64::INFINITY, |b| b.distance_squared);
            if node.bbox().distance_squared(p) > bound {
                continue;
            }
            match node {
                BvhNode::Leaf { triangles, .. } => {
                    for &i in triangles {
                        let tri = &self.triangles[i as usize];
                        let (point, barycentric) = closest_point_on_triangle(p, &tri.corners);
                        let d = (point - p).norm_squared();
                        if best.map_or(true, |b| d < b.distance_squared) {
                            best = Some(NearestTriangle {
                                face: tri.face,
                                point,
                                barycentric,
                                distance_squared: d,
                            });
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    // visit the nearer child first
                    let dl = left.bbox().distance_squared(p);
                    let dr = right.bbox().distance_squared(p);
                    if dl < dr {
                        stack.push(right);
                        stack.push(left);
                    } else {
                        stack.push(left);
                        stack.push(right);
                    }
                }
            }
        }
        best
    }
}

/// Closest point on triangle `abc` to `p` and its barycentric coordinates.
///
/// Voronoi-region walk from Ericson, "Real-Time Collision Detection", 5.1.5.
pub fn closest_point_on_triangle(p: &Point3<f64>, tri: &[Point3<f64>; 3]) -> (Point3<f64>, [f64; 3]) {
    let [a, b, c] = tri;
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return (*a, [1.0, 0.0, 0.0]);
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return (*b, [0.0, 1.0, 0.0]);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return (a + ab * v, [1.0 - v, v, 0.0]);
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return (*c, [0.0, 0.0, 1.0]);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return (a + ac * w, [1.0 - w, 0.0, w]);
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (b + (c - b) * w, [0.0, 1.0 - w, w]);
    }

    let denom = va + vb + vc;
    if denom.abs() < f64::MIN_POSITIVE {
        return (*a, [1.0, 0.0, 0.0]);
    }
    let v = vb / denom;
    let w = vc / denom;
    (a + ab * v + ac * w, [1.0 - v - w, v, w])
}
