//! Opaque material handles and their reference counting.

use std::fmt::Debug;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Opaque material handle. The mesh never interprets it.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct MaterialId(pub u32);

/// The material collaborator.
///
/// The mesh calls `add_ref` on every face that takes a material and
/// `release_ref` on every face that gives one up, including when the mesh is
/// dropped.
pub trait MaterialDepot: Send + Sync + Debug {
    fn add_ref(&self, material: MaterialId, count: u32);
    fn release_ref(&self, material: MaterialId, count: u32);
    /// Material assigned to faces inserted without one.
    fn default_material(&self) -> MaterialId;
}

/// Reference-counting depot backed by a concurrent map.
#[derive(Debug, Default)]
pub struct CountingDepot {
    counts: DashMap<MaterialId, u64>,
    default: MaterialId,
}

impl CountingDepot {
    pub fn new(default: MaterialId) -> Self {
        CountingDepot {
            counts: DashMap::new(),
            default,
        }
    }

    /// Current usage count of `material`.
    pub fn ref_count(&self, material: MaterialId) -> u64 {
        self.counts.get(&material).map_or(0, |c| *c)
    }

    /// Materials with a non-zero count.
    pub fn in_use(&self) -> Vec<MaterialId> {
        let mut out: Vec<_> = self
            .counts
            .iter()
            .filter(|e| *e.value() > 0)
            .map(|e| *e.key())
            .collect();
        out.sort_unstable();
        out
    }
}

impl MaterialDepot for CountingDepot {
    fn add_ref(&self, material: MaterialId, count: u32) {
        *self.counts.entry(material).or_insert(0) += count as u64;
    }

    fn release_ref(&self, material: MaterialId, count: u32) {
        match self.counts.get_mut(&material) {
            Some(mut c) if *c >= count as u64 => *c -= count as u64,
            Some(mut c) => {
                log::warn!("material {material:?}: releasing {count} refs, only {} held", *c);
                *c = 0;
            }
            None => log::warn!("material {material:?}: release on unknown handle"),
        }
    }

    fn default_material(&self) -> MaterialId {
        self.default
    }
}
