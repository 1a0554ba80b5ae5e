//! Slab allocator: named tables of parallel fixed-stride columns.
//!
//! All columns of a [`Slab`] share one live row count. Capacity is always a
//! padded rectangle (see [`rect`]) so every column can be handed to an
//! image-shaped consumer as-is. Growth is geometric and only ever happens
//! through `&mut self`, which keeps it out of parallel phases.

pub mod column;
pub mod property;
pub mod rect;

use serde::{Deserialize, Serialize};

use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshError;

pub use column::{Column, ColumnBuffer};
pub use property::{PropertyBag, PropertyId};
pub use rect::{RectDims, compute_rect_dimensions, padded_rows};

/// Smallest growth factor a slab accepts.
pub const MIN_GROWTH: f32 = 1.5;

/// Allocation policy shared by every slab of a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlabConfig {
    /// Widest image line, in elements, a consumer accepts.
    pub max_row_width: usize,
    /// Geometric growth factor; clamped to at least [`MIN_GROWTH`].
    pub growth_factor: f32,
    /// Rows reserved up front by [`Slab::with_config`].
    pub initial_capacity: usize,
}

impl Default for SlabConfig {
    fn default() -> Self {
        SlabConfig {
            max_row_width: 4096,
            growth_factor: MIN_GROWTH,
            initial_capacity: 0,
        }
    }
}

impl SlabConfig {
    fn growth(&self) -> f32 {
        self.growth_factor.max(MIN_GROWTH)
    }
}

/// A fixed set of columns making up one table.
///
/// Usually implemented with the [`slab_columns!`](crate::slab_columns) macro.
pub trait Columns: Send + Sync {
    fn visit(&self, f: &mut dyn FnMut(&dyn ColumnBuffer));
    fn visit_mut(&mut self, f: &mut dyn FnMut(&mut dyn ColumnBuffer));
}

/// Implement [`Columns`] for a struct whose listed fields are [`Column`]s.
#[macro_export]
macro_rules! slab_columns {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::slab::Columns for $ty {
            fn visit(&self, f: &mut dyn FnMut(&dyn $crate::slab::ColumnBuffer)) {
                $( f(&self.$field); )+
            }
            fn visit_mut(&mut self, f: &mut dyn FnMut(&mut dyn $crate::slab::ColumnBuffer)) {
                $( f(&mut self.$field); )+
            }
        }
    };
}

/// A named table of parallel columns with a shared live length.
#[derive(Debug)]
pub struct Slab<C> {
    name: &'static str,
    len: usize,
    config: SlabConfig,
    columns: C,
    props: PropertyBag,
}

impl<C: Columns> Slab<C> {
    /// Empty slab; no rows reserved.
    pub fn new(name: &'static str, columns: C, config: SlabConfig) -> Self {
        Slab {
            name,
            len: 0,
            config,
            columns,
            props: PropertyBag::default(),
        }
    }

    /// Empty slab with `config.initial_capacity` rows reserved.
    pub fn with_config(name: &'static str, columns: C, config: SlabConfig) -> Result<Self, MeshError> {
        let mut slab = Self::new(name, columns, config);
        if config.initial_capacity > 0 {
            slab.reserve_exact(config.initial_capacity)?;
        }
        Ok(slab)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Rows every column can hold without growing.
    pub fn capacity(&self) -> usize {
        let mut cap = usize::MAX;
        self.visit(&mut |c| cap = cap.min(c.capacity()));
        if cap == usize::MAX { 0 } else { cap }
    }

    pub fn config(&self) -> &SlabConfig {
        &self.config
    }

    #[inline]
    pub fn columns(&self) -> &C {
        &self.columns
    }

    #[inline]
    pub fn columns_mut(&mut self) -> &mut C {
        &mut self.columns
    }

    pub fn props(&self) -> &PropertyBag {
        &self.props
    }

    pub fn props_mut(&mut self) -> &mut PropertyBag {
        &mut self.props
    }

    /// Attach a new column that follows this slab's length from now on.
    pub fn add_property<T: bytemuck::Pod + Send + Sync>(
        &mut self,
        name: &'static str,
        stride: usize,
        fill: T,
    ) -> Result<PropertyId<T>, MeshError> {
        compute_rect_dimensions(self.capacity(), stride, self.config.max_row_width)
            .map_err(|_| self.exceeded(self.capacity()))?;
        let capacity = self.capacity();
        Ok(self.props.add(name, stride, fill, self.len, capacity))
    }

    /// Rect layout of a column of `stride` over the current capacity.
    pub fn rect_dims(&self, stride: usize) -> Result<RectDims, MeshError> {
        compute_rect_dimensions(self.capacity(), stride, self.config.max_row_width)
            .map_err(|_| self.exceeded(self.capacity()))
    }

    /// Append `n` rows and return the index of the first one.
    ///
    /// Grows geometrically when the capacity is exhausted; any raw view into a
    /// column is invalidated by that growth.
    pub fn append(&mut self, n: usize) -> Result<usize, MeshError> {
        let start = self.len;
        let needed = start.checked_add(n).ok_or_else(|| self.exceeded(usize::MAX))?;
        if needed > self.capacity() {
            let grown = (self.capacity() as f64 * self.config.growth() as f64).ceil() as usize;
            self.grow(needed.max(grown))?;
        }
        self.set_len(needed);
        Ok(start)
    }

    /// Drop `n` rows from the end.
    pub fn shrink(&mut self, n: usize) {
        debug_assert!(n <= self.len, "slab `{}`: shrink({n}) past len {}", self.name, self.len);
        let len = self.len - n.min(self.len);
        self.set_len(len);
    }

    /// Make room for at least `rows` rows, growing geometrically if needed.
    pub fn reserve(&mut self, rows: usize) -> Result<(), MeshError> {
        if rows > self.capacity() {
            let grown = (self.capacity() as f64 * self.config.growth() as f64).ceil() as usize;
            self.grow(rows.max(grown))?;
        }
        Ok(())
    }

    /// Make room for exactly `rows` rows, rounded up to the rectangle.
    pub fn reserve_exact(&mut self, rows: usize) -> Result<(), MeshError> {
        if rows > self.capacity() {
            self.grow(rows)?;
        }
        Ok(())
    }

    /// Size the slab to exactly `rows` live rows without geometric slack.
    ///
    /// Used to pre-size destination tables before a parallel pass.
    pub fn presize(&mut self, rows: usize) -> Result<(), MeshError> {
        self.reserve_exact(rows)?;
        self.set_len(rows);
        Ok(())
    }

    /// Swap the storage of one column for caller-provided memory.
    ///
    /// `backing` must be a padded rectangle under this slab's row width and
    /// hold at least the live rows; the live prefix is copied in.
    pub fn set_backing<T, F>(&mut self, select: F, backing: Vec<T>) -> Result<(), MeshError>
    where
        T: bytemuck::Pod + Send + Sync,
        F: FnOnce(&mut C) -> &mut Column<T>,
    {
        let max = self.config.max_row_width;
        select(&mut self.columns).set_backing(backing, max)
    }

    /// Reorder rows of every column: new row `i` is old row `order[i]`.
    pub fn permute(&mut self, order: &[u32]) {
        debug_assert!(order.iter().all(|&r| (r as usize) < self.len));
        self.columns.visit_mut(&mut |c| c.permute(order));
        self.props.visit_mut(&mut |c| c.permute(order));
        self.len = order.len();
    }

    fn visit(&self, f: &mut dyn FnMut(&dyn ColumnBuffer)) {
        self.columns.visit(f);
        self.props.visit(f);
    }

    fn set_len(&mut self, rows: usize) {
        self.columns.visit_mut(&mut |c| c.set_len(rows));
        self.props.visit_mut(&mut |c| c.set_len(rows));
        self.len = rows;
    }

    fn grow(&mut self, target: usize) -> Result<(), MeshError> {
        let max = self.config.max_row_width;
        let rows = padded_rows(target, max).map_err(|_| self.exceeded(target))?;
        let mut fits = true;
        self.visit(&mut |c| fits &= compute_rect_dimensions(rows, c.stride(), max).is_ok());
        if !fits {
            return Err(self.exceeded(target));
        }
        log::debug!(
            "slab `{}`: grow {} -> {} rows (target {target})",
            self.name,
            self.capacity(),
            rows
        );
        self.columns.visit_mut(&mut |c| {
            if c.capacity() < rows {
                c.grow_to(rows)
            }
        });
        self.props.visit_mut(&mut |c| {
            if c.capacity() < rows {
                c.grow_to(rows)
            }
        });
        Ok(())
    }

    fn exceeded(&self, requested: usize) -> MeshError {
        MeshError::CapacityExceeded {
            slab: self.name,
            requested,
            max_row_width: self.config.max_row_width,
        }
    }
}

impl<C: Columns> DebugInvariants for Slab<C> {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "slab");
    }

    fn validate_invariants(&self) -> Result<(), MeshError> {
        let mut problem = None;
        let max = self.config.max_row_width;
        self.visit(&mut |c| {
            if problem.is_some() {
                return;
            }
            if c.len() != self.len {
                problem = Some(format!(
                    "slab `{}`: column `{}` has {} rows, slab has {}",
                    self.name,
                    c.name(),
                    c.len(),
                    self.len
                ));
            } else if c.capacity() < c.len() {
                problem = Some(format!(
                    "slab `{}`: column `{}` capacity {} below length {}",
                    self.name,
                    c.name(),
                    c.capacity(),
                    c.len()
                ));
            } else if c.capacity() > 0 && !rect::is_padded(c.capacity(), max) {
                problem = Some(format!(
                    "slab `{}`: column `{}` capacity {} is not a padded rectangle",
                    self.name,
                    c.name(),
                    c.capacity()
                ));
            }
        });
        match problem {
            Some(msg) => Err(MeshError::InvariantViolated(msg)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct PointColumns {
        pt: Column<f32>,
        tag: Column<i32>,
    }
    crate::slab_columns!(PointColumns { pt, tag });

    fn points(max_row_width: usize) -> Slab<PointColumns> {
        Slab::new(
            "points",
            PointColumns {
                pt: Column::new("pt", 4),
                tag: Column::with_fill("tag", 1, -1),
            },
            SlabConfig {
                max_row_width,
                ..SlabConfig::default()
            },
        )
    }

    #[test]
    fn append_returns_start_and_grows() {
        let mut s = points(4096);
        assert_eq!(s.append(3).unwrap(), 0);
        assert_eq!(s.append(2).unwrap(), 3);
        assert_eq!(s.len(), 5);
        assert!(s.capacity() >= 5);
        assert_eq!(s.columns().tag.get(4, 0), -1);
        s.validate_invariants().unwrap();
    }

    #[test]
    fn growth_is_geometric_and_padded() {
        let mut s = points(64);
        s.append(100).unwrap();
        let cap = s.capacity();
        assert!(rect::is_padded(cap, 64));
        s.append(cap - s.len() + 1).unwrap();
        assert!(s.capacity() as f32 >= cap as f32 * MIN_GROWTH);
        s.validate_invariants().unwrap();
    }

    #[test]
    fn growth_past_rect_limit_fails() {
        // stride 4 with max width 8 allows at most 2 rows per line, 16 rows total
        let mut s = points(8);
        s.append(16).unwrap();
        let err = s.append(1).unwrap_err();
        assert!(matches!(err, MeshError::CapacityExceeded { slab: "points", .. }));
        assert_eq!(s.len(), 16);
    }

    #[test]
    fn shrink_truncates_and_resets_on_regrow() {
        let mut s = points(4096);
        s.append(4).unwrap();
        s.columns_mut().tag.set(3, 0, 9);
        s.shrink(2);
        assert_eq!(s.len(), 2);
        s.append(2).unwrap();
        assert_eq!(s.columns().tag.get(3, 0), -1);
    }

    #[test]
    fn properties_follow_slab_length() {
        let mut s = points(4096);
        s.append(2).unwrap();
        let color = s.add_property::<f32>("color", 4, 1.0).unwrap();
        s.append(10).unwrap();
        assert_eq!(s.props().get(color).unwrap().len(), 12);
        s.permute(&[11, 0]);
        assert_eq!(s.props().get(color).unwrap().len(), 2);
        s.validate_invariants().unwrap();
    }

    #[test]
    fn injected_backing_keeps_live_rows() {
        let mut s = points(4096);
        s.append(3).unwrap();
        s.columns_mut().tag.set(2, 0, 7);
        s.set_backing(|c| &mut c.tag, vec![0; 4]).unwrap();
        assert_eq!(s.columns().tag.get(2, 0), 7);
        assert_eq!(s.columns().tag.capacity(), 4);

        let err = s.set_backing(|c| &mut c.tag, vec![0; 2]).unwrap_err();
        assert_eq!(err, MeshError::BackingTooSmall { needed: 3, provided: 2 });
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: SlabConfig = serde_json::from_str(r#"{ "max_row_width": 1024 }"#).unwrap();
        assert_eq!(cfg.max_row_width, 1024);
        assert_eq!(cfg.growth_factor, MIN_GROWTH);
        assert_eq!(cfg.initial_capacity, 0);
    }
}
