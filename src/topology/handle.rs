//! Topological handles.
//!
//! Directed edges of triangle `f` are `3f`, `3f + 1`, `3f + 2`; their cyclic
//! order is pure arithmetic. Boundary (free) edges live in a separate index
//! space and are told apart by the [`EdgeHandle`] variant. Inside columns an
//! edge handle is stored as one `i32`: directed `i` as `i`, boundary `i` as
//! `-(i + 1)`.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! index_handle {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[repr(transparent)]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "{}"), self.0)
            }
        }

        impl From<u32> for $name {
            fn from(v: u32) -> Self {
                $name(v)
            }
        }
    };
}

index_handle!(
    /// Vertex handle.
    VertexId,
    "v"
);
index_handle!(
    /// Triangle handle.
    FaceId,
    "f"
);
index_handle!(
    /// Whole-edge (twin pair) handle.
    WholeEdgeId,
    "w"
);
index_handle!(
    /// Boundary cycle handle.
    HoleId,
    "h"
);

/// `next` within a triangle, by `handle mod 3`.
pub const NEXT: [u32; 3] = [1, 2, 0];
/// `prev` within a triangle, by `handle mod 3`.
pub const PREV: [u32; 3] = [2, 0, 1];

/// A directed edge: either owned by a triangle or a free boundary edge.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeHandle {
    Directed(u32),
    Boundary(u32),
}

impl EdgeHandle {
    /// Column encoding.
    #[inline]
    pub fn encode(self) -> i32 {
        match self {
            EdgeHandle::Directed(d) => d as i32,
            EdgeHandle::Boundary(b) => -(b as i32) - 1,
        }
    }

    /// Inverse of [`EdgeHandle::encode`].
    #[inline]
    pub fn decode(raw: i32) -> Self {
        if raw >= 0 {
            EdgeHandle::Directed(raw as u32)
        } else {
            EdgeHandle::Boundary((-(raw + 1)) as u32)
        }
    }

    #[inline]
    pub fn is_boundary(self) -> bool {
        matches!(self, EdgeHandle::Boundary(_))
    }

    /// Owning triangle of a directed edge.
    #[inline]
    pub fn face(self) -> Option<FaceId> {
        match self {
            EdgeHandle::Directed(d) => Some(FaceId(d / 3)),
            EdgeHandle::Boundary(_) => None,
        }
    }

    #[inline]
    pub fn directed(self) -> Option<u32> {
        match self {
            EdgeHandle::Directed(d) => Some(d),
            EdgeHandle::Boundary(_) => None,
        }
    }

    #[inline]
    pub fn boundary(self) -> Option<u32> {
        match self {
            EdgeHandle::Boundary(b) => Some(b),
            EdgeHandle::Directed(_) => None,
        }
    }
}

impl fmt::Display for EdgeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeHandle::Directed(d) => write!(f, "d{d}"),
            EdgeHandle::Boundary(b) => write!(f, "b{b}"),
        }
    }
}

/// Which slot of a whole edge an edge occupies.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left = 0,
    Right = 1,
}

impl Side {
    #[inline]
    pub fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Pack a whole-edge back-reference into one `i32` column slot.
#[inline]
pub fn pack_wedge(w: WholeEdgeId, side: Side) -> i32 {
    ((w.0 << 1) | side as u32) as i32
}

#[inline]
pub fn unpack_wedge(raw: i32) -> (WholeEdgeId, Side) {
    let raw = raw as u32;
    let side = if raw & 1 == 0 { Side::Left } else { Side::Right };
    (WholeEdgeId(raw >> 1), side)
}

/// `next` of a directed edge, without touching memory.
#[inline]
pub fn next_directed(d: u32) -> u32 {
    d - d % 3 + NEXT[(d % 3) as usize]
}

/// `prev` of a directed edge, without touching memory.
#[inline]
pub fn prev_directed(d: u32) -> u32 {
    d - d % 3 + PREV[(d % 3) as usize]
}

/// Canonical `(left, right)` order for a whole edge: a boundary edge is
/// always on the right, otherwise the lower directed handle is on the left.
#[inline]
pub fn canonical_pair(a: EdgeHandle, b: EdgeHandle) -> (EdgeHandle, EdgeHandle) {
    match (a, b) {
        (EdgeHandle::Boundary(_), _) => (b, a),
        (EdgeHandle::Directed(x), EdgeHandle::Directed(y)) if y < x => (b, a),
        _ => (a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_eq_size;

    assert_eq_size!(VertexId, u32);
    assert_eq_size!(WholeEdgeId, u32);

    #[test]
    fn edge_encoding_is_disjoint() {
        assert_eq!(EdgeHandle::Directed(0).encode(), 0);
        assert_eq!(EdgeHandle::Boundary(0).encode(), -1);
        for raw in [-7, -1, 0, 5] {
            assert_eq!(EdgeHandle::decode(raw).encode(), raw);
        }
    }

    #[test]
    fn triangle_cycling() {
        assert_eq!(next_directed(3), 4);
        assert_eq!(next_directed(5), 3);
        assert_eq!(prev_directed(3), 5);
        assert_eq!(prev_directed(7), 6);
        assert_eq!(EdgeHandle::Directed(7).face(), Some(FaceId(2)));
    }

    #[test]
    fn canonical_order() {
        let d = EdgeHandle::Directed;
        let b = EdgeHandle::Boundary;
        assert_eq!(canonical_pair(d(9), d(2)), (d(2), d(9)));
        assert_eq!(canonical_pair(b(0), d(4)), (d(4), b(0)));
        assert_eq!(canonical_pair(d(4), b(0)), (d(4), b(0)));
    }

    #[test]
    fn wedge_packing() {
        let raw = pack_wedge(WholeEdgeId(12), Side::Right);
        assert_eq!(unpack_wedge(raw), (WholeEdgeId(12), Side::Right));
    }
}
