mod util;
use util::*;

use loopmesh::prelude::*;
use loopmesh::topology::validate_mesh;

/// Every boundary edge with its successor, plus hole heads and sizes.
fn boundary_layout(m: &TriMesh) -> (Vec<(EdgeHandle, EdgeHandle)>, Vec<(EdgeHandle, u32)>) {
    let links = (0..m.boundary_edge_count() as u32)
        .map(|b| {
            let e = EdgeHandle::Boundary(b);
            (e, m.next(e).unwrap())
        })
        .collect();
    let holes = m
        .holes()
        .map(|h| (m.hole_edge(h).unwrap(), m.hole_sides(h).unwrap()))
        .collect();
    (links, holes)
}

#[test]
fn compaction_packs_boundary_slots() {
    let mut m = grid_raw(3);
    m.finalize_boundaries().unwrap();
    assert!(!m.is_compacted());
    let live = m.boundary_edge_count();

    m.compact().unwrap();
    assert!(m.is_compacted());
    assert_eq!(m.stats().free_boundary, 0);
    assert_eq!(m.boundary_edge_count(), live);
    validate_mesh(&m, ValidationOptions::all()).unwrap();

    // one hole, laid out contiguously from its head
    let (links, holes) = boundary_layout(&m);
    assert_eq!(holes, vec![(EdgeHandle::Boundary(0), 12)]);
    for (i, &(e, next)) in links.iter().enumerate() {
        assert_eq!(e, EdgeHandle::Boundary(i as u32));
        assert_eq!(next, EdgeHandle::Boundary(((i + 1) % live) as u32));
    }
}

#[test]
fn compaction_is_idempotent() {
    let mut m = grid(2);
    let before = boundary_layout(&m);
    m.compact().unwrap();
    assert_eq!(boundary_layout(&m), before);
}

#[test]
fn compaction_keeps_geometry_and_faces() {
    let raw = grid_raw(2);
    let faces: Vec<[VertexId; 3]> = (0..raw.face_count() as u32)
        .map(|f| raw.face_vertices(FaceId(f)).unwrap())
        .collect();
    let m = ready(raw);
    for (f, corners) in faces.iter().enumerate() {
        assert_eq!(&m.face_vertices(FaceId(f as u32)).unwrap(), corners);
    }
    for w in 0..m.whole_edge_count() as u32 {
        let (left, right) = m.whole_edge(WholeEdgeId(w)).unwrap();
        assert_eq!(m.pair(left).unwrap(), right);
        assert_eq!(m.whole_edge_of(right).unwrap(), WholeEdgeId(w));
    }
}

#[test]
fn closing_a_hole_frees_its_slot() {
    let mut m = mesh_from(
        &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        &[[0, 2, 1], [0, 1, 3], [0, 3, 2]],
    );
    m.finalize_boundaries().unwrap();
    assert_eq!(m.hole_count(), 1);

    m.insert_triangle([v(1), v(2), v(3)], None).unwrap();
    m.finalize_boundaries().unwrap();
    assert_eq!(m.hole_count(), 0);
    assert!(!m.is_compacted());

    m.compact().unwrap();
    assert!(m.is_compacted());
    assert_eq!(m.boundary_edge_count(), 0);
    validate_mesh(&m, ValidationOptions::all()).unwrap();
}
