//! Compaction of deleted elements.
//!
//! Deleted elements are swapped to the end of their arrays (two-pointer
//! sweep), every property container is permuted in lockstep, and all
//! cross references are rewritten through the resulting handle maps. Each
//! slot takes part in at most one swap, so a map is its own inverse:
//! `map[old] == new`.

use log::debug;

use super::halfedge::HalfEdgeMesh;
use super::index::{FaceId, HalfEdgeId, VertexId};

/// Old-to-new handle maps produced by a garbage collection.
///
/// Entries for deleted elements point past the end of the compacted arrays.
#[derive(Debug, Clone, Default)]
pub struct GarbageMaps {
    /// Vertex map.
    pub vertices: Vec<VertexId>,
    /// Half-edge map.
    pub halfedges: Vec<HalfEdgeId>,
    /// Face map.
    pub faces: Vec<FaceId>,
}

impl GarbageMaps {
    /// New handle of a vertex that survived compaction.
    pub fn vertex(&self, old: VertexId, live: usize) -> Option<VertexId> {
        self.vertices
            .get(old.index())
            .copied()
            .filter(|v| v.index() < live)
    }
}

/// Two-pointer sweep over `deleted`; calls `swap(i, j)` for every exchange and
/// returns the number of surviving elements.
fn compact(deleted: &mut [bool], mut swap: impl FnMut(usize, usize)) -> usize {
    let n = deleted.len();
    if n == 0 {
        return 0;
    }
    let mut i0 = 0;
    let mut i1 = n - 1;
    loop {
        while !deleted[i0] && i0 < i1 {
            i0 += 1;
        }
        while deleted[i1] && i0 < i1 {
            i1 -= 1;
        }
        if i0 >= i1 {
            break;
        }
        deleted.swap(i0, i1);
        swap(i0, i1);
    }
    if deleted[i0] {
        i0
    } else {
        i0 + 1
    }
}

impl HalfEdgeMesh {
    /// Physically remove all deleted elements.
    ///
    /// Every handle obtained before this call is invalidated; property
    /// handles remain valid and their values follow the surviving elements.
    pub fn collect_garbage(&mut self) {
        self.collect_garbage_mapped();
    }

    /// Like [`collect_garbage`](Self::collect_garbage), returning the handle maps.
    pub fn collect_garbage_mapped(&mut self) -> GarbageMaps {
        let mut vmap: Vec<VertexId> = (0..self.vertices.len()).map(VertexId::new).collect();
        let mut hmap: Vec<HalfEdgeId> = (0..self.halfedges.len()).map(HalfEdgeId::new).collect();
        let mut fmap: Vec<FaceId> = (0..self.faces.len()).map(FaceId::new).collect();

        if !self.has_garbage {
            return GarbageMaps {
                vertices: vmap,
                halfedges: hmap,
                faces: fmap,
            };
        }

        let before = (self.vertices.len(), self.edge_deleted.len(), self.faces.len());

        let mut vdeleted: Vec<bool> = self.vertices.iter().map(|v| v.deleted).collect();
        let nv = compact(&mut vdeleted, |i, j| {
            self.vertices.swap(i, j);
            self.vprops.swap(i, j);
            vmap.swap(i, j);
        });

        let mut edeleted = std::mem::take(&mut self.edge_deleted);
        let ne = compact(&mut edeleted, |i, j| {
            self.eprops.swap(i, j);
            for k in 0..2 {
                let (a, b) = (2 * i + k, 2 * j + k);
                self.halfedges.swap(a, b);
                self.hprops.swap(a, b);
                hmap.swap(a, b);
            }
        });
        self.edge_deleted = edeleted;
        let nh = 2 * ne;

        let mut fdeleted: Vec<bool> = self.faces.iter().map(|f| f.deleted).collect();
        let nf = compact(&mut fdeleted, |i, j| {
            self.faces.swap(i, j);
            self.fprops.swap(i, j);
            fmap.swap(i, j);
        });

        for v in &mut self.vertices[..nv] {
            if v.halfedge.is_valid() {
                v.halfedge = hmap[v.halfedge.index()];
            }
        }

        for i in 0..nh {
            let he = &mut self.halfedges[i];
            he.vertex = vmap[he.vertex.index()];
            he.next = hmap[he.next.index()];
            he.prev = hmap[he.prev.index()];
            if he.face.is_valid() {
                he.face = fmap[he.face.index()];
            }
        }

        for f in &mut self.faces[..nf] {
            f.halfedge = hmap[f.halfedge.index()];
        }

        self.vertices.truncate(nv);
        self.halfedges.truncate(nh);
        self.edge_deleted.truncate(ne);
        self.faces.truncate(nf);
        self.vprops.resize(nv);
        self.hprops.resize(nh);
        self.eprops.resize(ne);
        self.fprops.resize(nf);

        self.vertices.shrink_to_fit();
        self.halfedges.shrink_to_fit();
        self.edge_deleted.shrink_to_fit();
        self.faces.shrink_to_fit();
        self.vprops.shrink_to_fit();
        self.hprops.shrink_to_fit();
        self.eprops.shrink_to_fit();
        self.fprops.shrink_to_fit();

        self.deleted_vertices = 0;
        self.deleted_edges = 0;
        self.deleted_faces = 0;
        self.has_garbage = false;

        debug!(
            "garbage collection: vertices {} -> {}, edges {} -> {}, faces {} -> {}",
            before.0, nv, before.1, ne, before.2, nf
        );

        GarbageMaps {
            vertices: vmap,
            halfedges: hmap,
            faces: fmap,
        }
    }
}
