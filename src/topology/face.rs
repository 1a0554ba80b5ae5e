//! Triangle table. A face stores only its material; its edges are implicit.

use crate::mesh_error::MeshError;
use crate::slab::{Column, Slab, SlabConfig};
use crate::slab_columns;
use crate::topology::handle::{EdgeHandle, FaceId};
use crate::topology::material::MaterialId;

#[derive(Debug)]
pub struct FaceColumns {
    pub material: Column<i32>,
}
slab_columns!(FaceColumns { material });

#[derive(Debug)]
pub struct FaceTable {
    pub(crate) slab: Slab<FaceColumns>,
}

impl FaceTable {
    pub fn new(config: SlabConfig) -> Self {
        FaceTable {
            slab: Slab::new(
                "face",
                FaceColumns {
                    material: Column::new("material", 1),
                },
                config,
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.slab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slab.is_empty()
    }

    pub fn check(&self, f: FaceId) -> Result<(), MeshError> {
        if f.index() < self.slab.len() {
            Ok(())
        } else {
            Err(MeshError::invalid("face", f.index(), self.slab.len()))
        }
    }

    pub(crate) fn alloc(&mut self, material: MaterialId) -> Result<FaceId, MeshError> {
        let f = self.slab.append(1)?;
        self.slab.columns_mut().material.set(f, 0, material.0 as i32);
        Ok(FaceId(f as u32))
    }

    #[inline]
    pub fn material(&self, f: FaceId) -> MaterialId {
        MaterialId(self.slab.columns().material.get(f.index(), 0) as u32)
    }

    pub(crate) fn set_material(&mut self, f: FaceId, m: MaterialId) {
        self.slab.columns_mut().material.set_tracked(f.index(), 0, m.0 as i32);
    }

    /// The three directed edges of `f`.
    #[inline]
    pub fn edges(f: FaceId) -> [EdgeHandle; 3] {
        let base = f.0 * 3;
        [
            EdgeHandle::Directed(base),
            EdgeHandle::Directed(base + 1),
            EdgeHandle::Directed(base + 2),
        ]
    }
}
