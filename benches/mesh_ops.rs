//! Benchmarks for mesh construction, local operators and remeshing.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use halfmesh::algo::curvature::{compute_curvature, compute_curvature_sequential};
use halfmesh::algo::spatial::TriangleBvh;
use halfmesh::prelude::*;
use nalgebra::Point3;

fn grid(n: usize) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    let mut faces = Vec::with_capacity(n * n * 2);

    for j in 0..=n {
        for i in 0..=n {
            // gentle bump so curvature and projection do real work
            let (x, y) = (i as f64 / n as f64, j as f64 / n as f64);
            let z = 0.2 * (std::f64::consts::PI * x).sin() * (std::f64::consts::PI * y).sin();
            vertices.push(Point3::new(x, y, z));
        }
    }

    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + (n + 1);
            let v11 = v01 + 1;

            faces.push([v00, v10, v11]);
            faces.push([v00, v11, v01]);
        }
    }

    (vertices, faces)
}

fn create_grid_mesh(n: usize) -> HalfEdgeMesh {
    let (vertices, faces) = grid(n);
    build_from_triangles(&vertices, &faces).unwrap()
}

fn bench_mesh_construction(c: &mut Criterion) {
    let (vertices, faces) = grid(50);
    c.bench_function("build_grid_50x50", |b| {
        b.iter(|| build_from_polygons(black_box(&vertices), black_box(&faces)))
    });

    // every face twice with opposite winding: each edge needs a copy
    let mut doubled: Vec<[usize; 3]> = faces.clone();
    doubled.extend(faces.iter().map(|f| [f[0], f[2], f[1]]));
    c.bench_function("build_grid_50x50_doubled", |b| {
        b.iter(|| build_from_polygons(black_box(&vertices), black_box(&doubled)))
    });
}

fn bench_mesh_traversal(c: &mut Criterion) {
    let mesh = create_grid_mesh(50);

    c.bench_function("vertex_neighbors_all", |b| {
        b.iter(|| {
            let mut count = 0;
            for v in mesh.vertex_ids() {
                count += mesh.vertex_neighbors(v).count();
            }
            count
        });
    });

    c.bench_function("face_normals_all", |b| {
        b.iter(|| {
            let mut sum = nalgebra::Vector3::zeros();
            for f in mesh.face_ids() {
                sum += mesh.face_normal(f);
            }
            sum
        });
    });
}

fn bench_operators(c: &mut Criterion) {
    let mesh = create_grid_mesh(30);

    c.bench_function("split_all_edges", |b| {
        b.iter_batched(
            || mesh.clone(),
            |mut m| {
                let edges: Vec<EdgeId> = m.edge_ids().collect();
                for e in edges {
                    let p = m.edge_midpoint(e);
                    let v = m.add_vertex(p);
                    m.split_edge(e, v);
                }
                m
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("flip_all_interior_edges", |b| {
        b.iter_batched(
            || mesh.clone(),
            |mut m| {
                let edges: Vec<EdgeId> = m.edge_ids().collect();
                for e in edges {
                    if m.is_flip_ok(e) {
                        m.flip(e);
                    }
                }
                m
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("collapse_and_collect_garbage", |b| {
        b.iter_batched(
            || mesh.clone(),
            |mut m| {
                let halfedges: Vec<HalfEdgeId> = m.halfedge_ids().step_by(7).collect();
                for h in halfedges {
                    if m.is_collapse_ok(h) {
                        m.collapse(h);
                    }
                }
                m.collect_garbage();
                m
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_curvature(c: &mut Criterion) {
    let mesh = create_grid_mesh(60);
    c.bench_function("curvature_parallel", |b| b.iter(|| compute_curvature(black_box(&mesh))));
    c.bench_function("curvature_sequential", |b| {
        b.iter(|| compute_curvature_sequential(black_box(&mesh)))
    });

    c.bench_function("bvh_nearest_1000", |b| {
        let bvh = TriangleBvh::build(&mesh);
        b.iter(|| {
            let mut total = 0.0;
            for i in 0..1000 {
                let t = i as f64 / 1000.0;
                let q = Point3::new(t, 1.0 - t, 0.5);
                if let Some(hit) = bvh.nearest(&q) {
                    total += hit.distance_squared;
                }
            }
            total
        })
    });
}

fn bench_remeshing(c: &mut Criterion) {
    let mesh = create_grid_mesh(20);
    let mut group = c.benchmark_group("remeshing");
    group.sample_size(10);

    group.bench_function("uniform", |b| {
        let options = UniformRemeshOptions::with_target_length(0.04).with_iterations(3);
        b.iter_batched(
            || mesh.clone(),
            |mut m| uniform_remeshing(&mut m, &options).map(|stats| stats.faces),
            BatchSize::SmallInput,
        )
    });

    group.bench_function("adaptive", |b| {
        let options = AdaptiveRemeshOptions::new(0.01, 0.1, 0.001).with_iterations(3);
        b.iter_batched(
            || mesh.clone(),
            |mut m| adaptive_remeshing(&mut m, &options).map(|stats| stats.faces),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_mesh_construction,
    bench_mesh_traversal,
    bench_operators,
    bench_curvature,
    bench_remeshing
);
criterion_main!(benches);
