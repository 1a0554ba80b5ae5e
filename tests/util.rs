#![allow(dead_code)]
use loopmesh::prelude::*;

pub fn v(i: u32) -> VertexId {
    VertexId(i)
}

/// Mesh from positions and counter-clockwise triangles, not finalized.
pub fn mesh_from(positions: &[[f32; 3]], triangles: &[[u32; 3]]) -> TriMesh {
    let mut m = TriMesh::default();
    for &p in positions {
        m.add_vertex(p).unwrap();
    }
    for t in triangles {
        m.insert_triangle(t.map(VertexId), None).unwrap();
    }
    m
}

/// Finalized and compacted, ready to subdivide.
pub fn ready(mut m: TriMesh) -> TriMesh {
    m.finalize_boundaries().unwrap();
    m.compact().unwrap();
    m
}

/// One isolated triangle.
pub fn cap() -> TriMesh {
    ready(mesh_from(
        &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        &[[0, 1, 2]],
    ))
}

/// Unit square split along its diagonal.
pub fn quad() -> TriMesh {
    ready(mesh_from(
        &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        &[[0, 1, 2], [0, 2, 3]],
    ))
}

pub fn tetrahedron() -> TriMesh {
    ready(mesh_from(
        &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        &[[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
    ))
}

/// +x, -x, +y, -y, +z, -z.
pub fn octahedron() -> TriMesh {
    ready(mesh_from(
        &[
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
        ],
        &[
            [0, 2, 4],
            [2, 1, 4],
            [1, 3, 4],
            [3, 0, 4],
            [2, 0, 5],
            [1, 2, 5],
            [3, 1, 5],
            [0, 3, 5],
        ],
    ))
}

/// `n` x `n` grid of unit cells, two triangles each, inserted row by row.
pub fn grid_raw(n: u32) -> TriMesh {
    let mut positions = Vec::new();
    for j in 0..=n {
        for i in 0..=n {
            positions.push([i as f32, j as f32, 0.0]);
        }
    }
    let at = |i: u32, j: u32| j * (n + 1) + i;
    let mut triangles = Vec::new();
    for j in 0..n {
        for i in 0..n {
            let (a, b, c, d) = (at(i, j), at(i + 1, j), at(i + 1, j + 1), at(i, j + 1));
            triangles.push([a, b, c]);
            triangles.push([a, c, d]);
        }
    }
    mesh_from(&positions, &triangles)
}

pub fn grid(n: u32) -> TriMesh {
    ready(grid_raw(n))
}

/// `V - E + F` with whole edges as `E`.
pub fn euler(m: &TriMesh) -> i64 {
    m.vertex_count() as i64 - m.whole_edge_count() as i64 + m.face_count() as i64
}

pub fn positions(m: &TriMesh) -> Vec<[f32; 3]> {
    (0..m.vertex_count() as u32)
        .map(|i| m.position(v(i)).unwrap())
        .collect()
}

/// Positions as sortable bit patterns, for comparing meshes up to renumbering.
pub fn sorted_position_bits(m: &TriMesh) -> Vec<[u32; 3]> {
    let mut bits: Vec<[u32; 3]> = positions(m).iter().map(|p| p.map(f32::to_bits)).collect();
    bits.sort_unstable();
    bits
}

pub fn assert_close(a: [f32; 3], b: [f32; 3]) {
    for k in 0..3 {
        assert!((a[k] - b[k]).abs() < 1e-5, "{a:?} != {b:?}");
    }
}
