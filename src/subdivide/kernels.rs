//! Loop refinement rules with semi-sharp creases.
//!
//! Vertex points:
//! - corner (`crease < 0`, which includes every boundary vertex): unchanged
//! - crease (`crease >= 1`): `3/4 V + 1/8 (a + b)` over the two sharp neighbours
//! - smooth: `(1 - k beta) V + beta * sum(neighbours)`, `beta = 3/16` for
//!   `k <= 3`, else `3 / (8k)`
//! - `0 < crease < 1`: linear blend of the smooth and crease points
//!
//! Edge points:
//! - boundary or `sharpness >= 1`: midpoint
//! - smooth: `3/8 (a + b) + 1/8 (c + d)` over the two opposite apexes
//! - `0 < sharpness < 1`: linear blend of the smooth point and the midpoint

use crate::topology::edge::{BOUNDARY_SHARPNESS, EdgeProvider};
use crate::topology::handle::{VertexId, WholeEdgeId};
use crate::topology::vertex::{CORNER, VertexTable};

#[inline]
fn axpy(acc: &mut [f32; 3], w: f32, p: [f32; 3]) {
    for k in 0..3 {
        acc[k] += w * p[k];
    }
}

/// Loop smoothing weight for valence `k`.
#[inline]
pub fn loop_beta(k: u32) -> f32 {
    if k <= 3 { 3.0 / 16.0 } else { 3.0 / (8.0 * k as f32) }
}

/// Sharpness of both halves of a split whole edge.
#[inline]
pub fn split_sharpness(s: f32) -> f32 {
    if s < 0.0 {
        BOUNDARY_SHARPNESS
    } else if s >= 1.0 {
        s - 1.0
    } else {
        0.0
    }
}

/// Crease stored on a refined old vertex.
#[inline]
pub fn refined_crease(c: f32) -> f32 {
    if c < 0.0 {
        CORNER
    } else if c >= 1.0 {
        c - 1.0
    } else {
        0.0
    }
}

/// Crease stored on a new edge vertex, derived from its two halves.
///
/// A vertex splitting a boundary edge is a corner, like every other boundary
/// vertex.
#[inline]
pub fn edge_vertex_crease(s: f32) -> f32 {
    match split_sharpness(s) {
        s if s < 0.0 => CORNER,
        s => s,
    }
}

/// Refined position and crease of old vertex `v`, as `[x, y, z, crease]`.
pub fn refine_vertex<P: EdgeProvider>(vertices: &VertexTable, edges: &P, v: VertexId) -> [f32; 4] {
    let p = vertices.position(v);
    let c = vertices.crease(v);
    let k = vertices.valence(v);
    if c < 0.0 || k == 0 {
        return [p[0], p[1], p[2], refined_crease(c)];
    }

    let mut ring_sum = [0.0f32; 3];
    let mut sharp_sum = [0.0f32; 3];
    let mut sharp = 0u32;
    for e in vertices.outgoing_ring(edges, v) {
        let q = vertices.position(edges.dest(e));
        axpy(&mut ring_sum, 1.0, q);
        if sharp < 2 && edges.edge_sharpness(e) != 0.0 {
            axpy(&mut sharp_sum, 1.0, q);
            sharp += 1;
        }
    }

    let mut crease_point = [0.0f32; 3];
    axpy(&mut crease_point, 0.75, p);
    axpy(&mut crease_point, 0.125, sharp_sum);
    if c >= 1.0 && sharp == 2 {
        let [x, y, z] = crease_point;
        return [x, y, z, c - 1.0];
    }

    let beta = loop_beta(k);
    let mut smooth = [0.0f32; 3];
    axpy(&mut smooth, 1.0 - k as f32 * beta, p);
    axpy(&mut smooth, beta, ring_sum);
    if c > 0.0 && sharp == 2 {
        let mut out = [0.0f32; 3];
        axpy(&mut out, 1.0 - c, smooth);
        axpy(&mut out, c, crease_point);
        smooth = out;
    }
    let [x, y, z] = smooth;
    [x, y, z, 0.0]
}

/// Position and crease of the new vertex on whole edge `w`.
pub fn refine_edge<P: EdgeProvider>(vertices: &VertexTable, edges: &P, w: WholeEdgeId) -> [f32; 4] {
    let (left, right) = edges.whole_edge(w);
    let a = vertices.position(edges.origin(left));
    let b = vertices.position(edges.origin(right));
    let s = edges.sharpness(w);
    let crease = edge_vertex_crease(s);

    let mut mid = [0.0f32; 3];
    axpy(&mut mid, 0.5, a);
    axpy(&mut mid, 0.5, b);
    if right.is_boundary() || s < 0.0 || s >= 1.0 {
        let [x, y, z] = mid;
        return [x, y, z, crease];
    }

    let c = vertices.position(edges.origin(edges.prev(left)));
    let d = vertices.position(edges.origin(edges.prev(right)));
    let end = 0.375 * (1.0 - s) + 0.5 * s;
    let apex = 0.125 * (1.0 - s);
    let mut out = [0.0f32; 3];
    axpy(&mut out, end, a);
    axpy(&mut out, end, b);
    axpy(&mut out, apex, c);
    axpy(&mut out, apex, d);
    let [x, y, z] = out;
    [x, y, z, crease]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beta_matches_loop_weights() {
        assert_eq!(loop_beta(3), 3.0 / 16.0);
        assert_eq!(loop_beta(6), 1.0 / 16.0);
    }

    #[test]
    fn sharpness_decays_by_one() {
        assert_eq!(split_sharpness(-1.0), -1.0);
        assert_eq!(split_sharpness(2.5), 1.5);
        assert_eq!(split_sharpness(0.4), 0.0);
        assert_eq!(edge_vertex_crease(-1.0), CORNER);
        assert_eq!(edge_vertex_crease(3.0), 2.0);
        assert_eq!(refined_crease(f32::INFINITY), f32::INFINITY);
        assert_eq!(refined_crease(CORNER), CORNER);
        assert_eq!(refined_crease(0.5), 0.0);
    }
}
