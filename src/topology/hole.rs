//! Hole table: one row per boundary cycle, pooled through a free list.

use crate::mesh_error::MeshError;
use crate::slab::{Column, Slab, SlabConfig};
use crate::slab_columns;
use crate::topology::handle::HoleId;

#[derive(Debug)]
pub struct HoleColumns {
    /// One boundary edge of the cycle, or the free-list link of a free slot.
    pub edge: Column<i32>,
    /// Side count, `-1` marks a free slot.
    pub sides: Column<i32>,
}
slab_columns!(HoleColumns { edge, sides });

#[derive(Debug)]
pub struct HoleTable {
    pub(crate) slab: Slab<HoleColumns>,
    free_head: i32,
    free_count: usize,
}

impl HoleTable {
    pub fn new(config: SlabConfig) -> Self {
        HoleTable {
            slab: Slab::new(
                "hole",
                HoleColumns {
                    edge: Column::with_fill("edge", 1, -1),
                    sides: Column::with_fill("sides", 1, -1),
                },
                config,
            ),
            free_head: -1,
            free_count: 0,
        }
    }

    /// Slots, live and free.
    pub fn len(&self) -> usize {
        self.slab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slab.is_empty()
    }

    pub fn live_len(&self) -> usize {
        self.slab.len() - self.free_count
    }

    pub fn free_len(&self) -> usize {
        self.free_count
    }

    pub fn check(&self, h: HoleId) -> Result<(), MeshError> {
        if h.index() < self.slab.len() && !self.is_free(h) {
            Ok(())
        } else {
            Err(MeshError::invalid("hole", h.index(), self.slab.len()))
        }
    }

    #[inline]
    pub fn is_free(&self, h: HoleId) -> bool {
        self.slab.columns().sides.get(h.index(), 0) < 0
    }

    pub fn iter(&self) -> impl Iterator<Item = HoleId> + '_ {
        (0..self.slab.len() as u32)
            .map(HoleId)
            .filter(move |&h| !self.is_free(h))
    }

    pub(crate) fn alloc(&mut self, edge: u32) -> Result<HoleId, MeshError> {
        let h = if self.free_head >= 0 {
            let h = self.free_head as usize;
            self.free_head = self.slab.columns().edge.get(h, 0);
            self.free_count -= 1;
            h
        } else {
            self.slab.append(1)?
        };
        let cols = self.slab.columns_mut();
        cols.edge.set(h, 0, edge as i32);
        cols.sides.set(h, 0, 0);
        Ok(HoleId(h as u32))
    }

    pub(crate) fn free(&mut self, h: HoleId) {
        debug_assert!(!self.is_free(h), "double free of hole {h}");
        let head = self.free_head;
        let cols = self.slab.columns_mut();
        cols.edge.set(h.index(), 0, head);
        cols.sides.set(h.index(), 0, -1);
        self.free_head = h.0 as i32;
        self.free_count += 1;
    }

    pub(crate) fn clear_free_list(&mut self) {
        self.free_head = -1;
        self.free_count = 0;
    }

    /// Representative boundary edge.
    #[inline]
    pub fn edge(&self, h: HoleId) -> u32 {
        self.slab.columns().edge.get(h.index(), 0) as u32
    }

    pub(crate) fn set_edge(&mut self, h: HoleId, edge: u32) {
        self.slab.columns_mut().edge.set(h.index(), 0, edge as i32);
    }

    #[inline]
    pub fn sides(&self, h: HoleId) -> u32 {
        self.slab.columns().sides.get(h.index(), 0).max(0) as u32
    }

    pub(crate) fn set_sides(&mut self, h: HoleId, sides: u32) {
        self.slab.columns_mut().sides.set(h.index(), 0, sides as i32);
    }
}
