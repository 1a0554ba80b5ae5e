//! Runtime-attached typed columns.
//!
//! A [`PropertyBag`] lets callers add columns (UV layers, vertex colors, ...)
//! to a slab after creation. Each column is addressed by a typed
//! [`PropertyId`], so lookups never need a string compare or a type guess.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use bytemuck::Pod;

use crate::slab::column::{Column, ColumnBuffer};

/// Typed handle to a property column.
pub struct PropertyId<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PropertyId<T> {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T> Clone for PropertyId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PropertyId<T> {}

impl<T> PartialEq for PropertyId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for PropertyId<T> {}

impl<T> fmt::Debug for PropertyId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyId<{}>({})", std::any::type_name::<T>(), self.index)
    }
}

trait PropertyColumn: ColumnBuffer {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn as_buffer(&self) -> &dyn ColumnBuffer;
    fn as_buffer_mut(&mut self) -> &mut dyn ColumnBuffer;
}

impl<T: Pod + Send + Sync> PropertyColumn for Column<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn as_buffer(&self) -> &dyn ColumnBuffer {
        self
    }
    fn as_buffer_mut(&mut self) -> &mut dyn ColumnBuffer {
        self
    }
}

/// Heterogeneous set of extra columns owned by one slab.
#[derive(Default)]
pub struct PropertyBag {
    columns: Vec<Box<dyn PropertyColumn>>,
}

impl fmt::Debug for PropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.columns.iter().map(|c| (c.name(), c.stride())))
            .finish()
    }
}

impl PropertyBag {
    /// Add a column sized to match an existing slab of `len` live rows and
    /// `capacity` allocated rows.
    pub(crate) fn add<T: Pod + Send + Sync>(
        &mut self,
        name: &'static str,
        stride: usize,
        fill: T,
        len: usize,
        capacity: usize,
    ) -> PropertyId<T> {
        let mut column = Column::with_fill(name, stride, fill);
        column.grow_to(capacity);
        column.set_len(len);
        self.columns.push(Box::new(column));
        PropertyId {
            index: self.columns.len() - 1,
            _marker: PhantomData,
        }
    }

    pub fn get<T: Pod + Send + Sync>(&self, id: PropertyId<T>) -> Option<&Column<T>> {
        self.columns.get(id.index)?.as_any().downcast_ref()
    }

    pub fn get_mut<T: Pod + Send + Sync>(&mut self, id: PropertyId<T>) -> Option<&mut Column<T>> {
        self.columns.get_mut(id.index)?.as_any_mut().downcast_mut()
    }

    /// Look a column up by name, checking its element type.
    pub fn find<T: Pod + Send + Sync>(&self, name: &str) -> Option<PropertyId<T>> {
        self.columns
            .iter()
            .position(|c| c.name() == name && c.as_any().is::<Column<T>>())
            .map(|index| PropertyId {
                index,
                _marker: PhantomData,
            })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub(crate) fn visit(&self, f: &mut dyn FnMut(&dyn ColumnBuffer)) {
        for c in &self.columns {
            f(c.as_buffer());
        }
    }

    pub(crate) fn visit_mut(&mut self, f: &mut dyn FnMut(&mut dyn ColumnBuffer)) {
        for c in &mut self.columns {
            f(c.as_buffer_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_lookup_rejects_wrong_type() {
        let mut bag = PropertyBag::default();
        let uv = bag.add::<f32>("uv0", 2, 0.0, 3, 4);
        assert_eq!(bag.get(uv).map(|c| c.len()), Some(3));
        assert_eq!(bag.find::<f32>("uv0"), Some(uv));
        assert!(bag.find::<i32>("uv0").is_none());
        assert!(bag.find::<f32>("uv1").is_none());
    }

    #[test]
    fn columns_follow_visitor_resizes() {
        let mut bag = PropertyBag::default();
        let color = bag.add::<f32>("color", 4, 1.0, 0, 0);
        bag.visit_mut(&mut |c| {
            c.grow_to(2);
            c.set_len(2);
        });
        let col = bag.get(color).unwrap();
        assert_eq!(col.get_vec::<4>(1), [1.0; 4]);
    }
}
