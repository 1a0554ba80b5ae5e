//! Pairing adjacent triangles into quads.
//!
//! Each interior whole edge gets a cost: how far the two triangles' normals
//! diverge, plus how far the two corners on either end of the edge are from a
//! right angle once the triangles are merged. Triangles repeatedly pick their
//! cheapest unpaired neighbour and a pair is kept when both sides agree. A
//! final pass trades one quad for two when it can absorb two left-over
//! triangles.

use std::f32::consts::{FRAC_PI_2, PI};

use hashbrown::HashMap;
use itertools::{Either, Itertools};
use serde::{Deserialize, Serialize};

use crate::topology::edge::EdgeProvider;
use crate::topology::face::FaceTable;
use crate::topology::handle::{FaceId, WholeEdgeId, next_directed};
use crate::topology::mesh::TriMesh;

/// Cost of an edge with a boundary side; never chosen.
const BOUNDARY_COST: f32 = 3.0 * PI;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadOptions {
    /// Largest angle between two face normals still treated as coplanar.
    pub angle_tolerance: f32,
}

impl Default for QuadOptions {
    fn default() -> Self {
        QuadOptions {
            angle_tolerance: PI / 12.0,
        }
    }
}

/// Result of [`quadrangulate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuadPairing {
    /// `(lower face, higher face, shared whole edge)`, ordered by lower face.
    pub pairs: Vec<(FaceId, FaceId, WholeEdgeId)>,
    /// Triangles left unpaired, ascending.
    pub leftover: Vec<FaceId>,
}

impl QuadPairing {
    pub fn quad_count(&self) -> usize {
        self.pairs.len()
    }
}

pub fn quadrangulate(mesh: &TriMesh) -> QuadPairing {
    quadrangulate_with(mesh, &QuadOptions::default())
}

pub fn quadrangulate_with(mesh: &TriMesh, options: &QuadOptions) -> QuadPairing {
    let faces = mesh.face_count();
    let edges = mesh.edge_tables();
    let (angles, normals) = corner_angles(mesh);
    let costs: Vec<f32> = (0..mesh.whole_edge_count() as u32)
        .map(|w| edge_cost(mesh, WholeEdgeId(w), &angles, &normals, options.angle_tolerance))
        .collect();

    // best[f] == f marks an isolated triangle once f is settled.
    let mut best: Vec<usize> = (0..faces).collect();
    let mut settled = vec![false; faces];
    let mut available = faces;

    while available > 0 {
        for f in 0..faces {
            if settled[f] {
                continue;
            }
            best[f] = FaceTable::edges(FaceId(f as u32))
                .into_iter()
                .filter_map(|e| {
                    let other = edges.pair(e).face()?.index();
                    (!settled[other]).then(|| (other, costs[edges.wedge(e).0.index()]))
                })
                .filter(|&(_, cost)| cost < 2.0 * PI)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map_or(f, |(other, _)| other);
        }

        let before = available;
        for f in 0..faces {
            if settled[f] {
                continue;
            }
            let b = best[f];
            if b == f {
                settled[f] = true;
                available -= 1;
            } else if best[b] == f && !settled[b] {
                settled[f] = true;
                settled[b] = true;
                available -= 2;
            }
        }

        if before == available {
            // No pair agreed: settle the rest first come first served.
            for f in 0..faces {
                if settled[f] {
                    continue;
                }
                let b = best[f];
                if b != f && !settled[b] {
                    settled[b] = true;
                    best[b] = f;
                } else {
                    best[f] = f;
                }
                settled[f] = true;
            }
            available = 0;
        }
    }

    repair_dangling(mesh, &mut best);

    let (pairs, leftover): (Vec<_>, Vec<_>) = (0..faces)
        .filter(|&f| best[f] >= f)
        .partition_map(|f| {
            if best[f] == f {
                Either::Right(FaceId(f as u32))
            } else {
                let (a, b) = (FaceId(f as u32), FaceId(best[f] as u32));
                // partners are chosen across a shared edge
                match shared_whole_edge(mesh, a, b) {
                    Some(w) => Either::Left((a, b, w)),
                    None => Either::Right(a),
                }
            }
        });
    log::debug!("quadrangulated {faces} triangles: {} quads, {} left over", pairs.len(), leftover.len());
    QuadPairing { pairs, leftover }
}

/// Two isolated triangles next to the two halves of one quad become two quads.
fn repair_dangling(mesh: &TriMesh, best: &mut [usize]) {
    let edges = mesh.edge_tables();
    // paired face -> isolated triangle adjacent to its partner
    let mut waiting: HashMap<usize, usize> = HashMap::new();
    for t in 0..best.len() {
        if best[t] != t {
            continue;
        }
        for e in FaceTable::edges(FaceId(t as u32)) {
            let Some(n) = edges.pair(e).face().map(FaceId::index) else {
                continue;
            };
            let p = best[n];
            if p == n {
                continue;
            }
            match waiting.get(&n).copied() {
                Some(d) if d != t && best[d] == d && best[p] == n => {
                    best[t] = n;
                    best[n] = t;
                    best[p] = d;
                    best[d] = p;
                    waiting.remove(&n);
                    break;
                }
                Some(_) => {
                    waiting.remove(&n);
                }
                None => {
                    waiting.insert(p, t);
                }
            }
        }
    }
}

fn shared_whole_edge(mesh: &TriMesh, a: FaceId, b: FaceId) -> Option<WholeEdgeId> {
    let edges = mesh.edge_tables();
    FaceTable::edges(a)
        .into_iter()
        .find(|&e| edges.pair(e).face() == Some(b))
        .map(|e| edges.wedge(e).0)
}

/// Interior angle at the origin of every directed edge, and each face's
/// unnormalized normal.
fn corner_angles(mesh: &TriMesh) -> (Vec<f32>, Vec<[f32; 3]>) {
    let edges = mesh.edge_tables();
    let vertices = mesh.vertex_table();
    let mut angles = Vec::with_capacity(3 * mesh.face_count());
    let mut normals = Vec::with_capacity(mesh.face_count());
    for f in 0..mesh.face_count() as u32 {
        let p = FaceTable::edges(FaceId(f)).map(|e| vertices.position(edges.origin(e)));
        normals.push(cross(sub(p[1], p[0]), sub(p[2], p[0])));
        // windows start at the last corner so the middle one is corner 0
        for (prev, here, next) in [p[2], p[0], p[1]].into_iter().circular_tuple_windows() {
            angles.push(angle(sub(prev, here), sub(next, here)));
        }
    }
    (angles, normals)
}

fn edge_cost(mesh: &TriMesh, w: WholeEdgeId, angles: &[f32], normals: &[[f32; 3]], tolerance: f32) -> f32 {
    let edges = mesh.edge_tables();
    let (left, right) = edges.whole_edge(w);
    let (Some(lf), Some(rf)) = (left.face(), right.face()) else {
        return BOUNDARY_COST;
    };
    let (Some(l), Some(r)) = (left.directed(), right.directed()) else {
        return BOUNDARY_COST;
    };
    let mut cost = if angle(normals[lf.index()], normals[rf.index()]) > tolerance {
        PI
    } else {
        0.0
    };
    let at_origin = angles[l as usize] + angles[next_directed(r) as usize];
    let at_dest = angles[r as usize] + angles[next_directed(l) as usize];
    if at_origin >= PI || at_dest >= PI {
        // merged quad would be concave
        cost += PI;
    }
    cost + (at_origin - FRAC_PI_2).abs() + (at_dest - FRAC_PI_2).abs()
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn angle(a: [f32; 3], b: [f32; 3]) -> f32 {
    let c = cross(a, b);
    dot(c, c).sqrt().atan2(dot(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::handle::VertexId;

    fn square() -> TriMesh {
        let mut m = TriMesh::default();
        for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]] {
            m.add_vertex(p).unwrap();
        }
        m.insert_triangle([VertexId(0), VertexId(1), VertexId(2)], None).unwrap();
        m.insert_triangle([VertexId(0), VertexId(2), VertexId(3)], None).unwrap();
        m.finalize_boundaries().unwrap();
        m
    }

    #[test]
    fn right_triangle_angles() {
        let (angles, normals) = corner_angles(&square());
        assert!((angles[1] - FRAC_PI_2).abs() < 1e-5);
        assert!((angles[0] - PI / 4.0).abs() < 1e-5);
        assert!((angles[0..3].iter().sum::<f32>() - PI).abs() < 1e-5);
        assert!(normals[0][2] > 0.0);
    }

    #[test]
    fn square_becomes_one_quad() {
        let m = square();
        let q = quadrangulate(&m);
        assert_eq!(q.quad_count(), 1);
        assert!(q.leftover.is_empty());
        let (a, b, w) = q.pairs[0];
        assert_eq!((a, b), (FaceId(0), FaceId(1)));
        let (l, r) = m.whole_edge(w).unwrap();
        assert!(!l.is_boundary() && !r.is_boundary());
    }

    #[test]
    fn lone_triangle_is_left_over() {
        let mut m = TriMesh::default();
        for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            m.add_vertex(p).unwrap();
        }
        m.insert_triangle([VertexId(0), VertexId(1), VertexId(2)], None).unwrap();
        let q = quadrangulate(&m);
        assert!(q.pairs.is_empty());
        assert_eq!(q.leftover, vec![FaceId(0)]);
    }
}
