//! Boundary-edge and hole compaction.

use crate::mesh_error::MeshError;
use crate::topology::handle::{EdgeHandle, HoleId, unpack_wedge};
use crate::topology::mesh::TriMesh;

const UNVISITED: u32 = u32::MAX;

impl TriMesh {
    /// Repack the boundary-edge and hole tables with no free slots.
    ///
    /// Each boundary cycle is laid out contiguously starting at its hole's
    /// representative edge, holes in index order, then cycles without a hole
    /// from their lowest slot. Whole-edge back-references, `prev`/`next`
    /// links and hole heads are rewritten to the new slots. Calling it on an
    /// already packed mesh changes nothing.
    pub fn compact(&mut self) -> Result<(), MeshError> {
        let slots = self.edges.boundary_len();
        let mut new_index = vec![UNVISITED; slots];
        let mut order: Vec<u32> = Vec::with_capacity(self.edges.live_boundary_len());

        // Heads go stale when edits free a hole's edge before the next finalize.
        let heads: Vec<u32> = self
            .holes
            .iter()
            .map(|h| self.holes.edge(h))
            .filter(|&b| (b as usize) < slots && !self.edges.is_free(b))
            .collect();
        let unassigned: Vec<u32> = self.edges.boundary_iter().collect();
        for start in heads.into_iter().chain(unassigned) {
            let mut current = start;
            while new_index[current as usize] == UNVISITED {
                new_index[current as usize] = order.len() as u32;
                order.push(current);
                current = self.edges.boundary_next(current);
            }
        }
        if order.len() != self.edges.live_boundary_len() {
            return Err(MeshError::InvariantViolated(format!(
                "compaction reached {} of {} boundary edges",
                order.len(),
                self.edges.live_boundary_len()
            )));
        }

        let packed = order.len() == slots && order.iter().enumerate().all(|(i, &b)| i as u32 == b);
        if !packed {
            self.edges.boundary.permute(&order);
            for b in 0..order.len() {
                let cols = self.edges.boundary.columns_mut();
                let next = cols.next.get(b, 0) as usize;
                let prev = cols.prev.get(b, 0) as usize;
                cols.next.set(b, 0, new_index[next] as i32);
                cols.prev.set(b, 0, new_index[prev] as i32);
                let (w, side) = unpack_wedge(cols.wedge.get(b, 0));
                self.edges.whole.columns_mut().edge.set(
                    w.index(),
                    side as usize,
                    EdgeHandle::Boundary(b as u32).encode(),
                );
            }
            let live: Vec<HoleId> = self.holes.iter().collect();
            for h in live {
                let head = self.holes.edge(h) as usize;
                if let Some(&moved) = new_index.get(head).filter(|&&n| n != UNVISITED) {
                    self.holes.set_edge(h, moved);
                }
            }
            self.edges.clear_free_list();
            log::debug!(
                "compacted boundary edges: {slots} slots -> {} live",
                order.len()
            );
        }

        if self.holes.free_len() > 0 {
            let hole_order: Vec<u32> = self.holes.iter().map(|h| h.0).collect();
            let mut hole_index = vec![UNVISITED; self.holes.len()];
            for (new, &old) in hole_order.iter().enumerate() {
                hole_index[old as usize] = new as u32;
            }
            self.holes.slab.permute(&hole_order);
            self.holes.clear_free_list();
            for b in 0..self.edges.boundary_len() as u32 {
                if let Some(h) = self.edges.hole(b) {
                    let moved = hole_index[h.index()];
                    self.edges
                        .set_hole(b, (moved != UNVISITED).then_some(HoleId(moved)));
                }
            }
            log::debug!("compacted holes: {} live", hole_order.len());
        }
        Ok(())
    }
}
