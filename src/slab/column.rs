//! Fixed-stride typed column.
//!
//! A [`Column`] stores `capacity * stride` elements of a plain-old-data type.
//! Only the first `len` rows are live; the rest is padding that keeps the
//! buffer rectangular for image-shaped consumers.

use std::ops::RangeInclusive;

use bytemuck::Pod;

use crate::mesh_error::MeshError;
use crate::slab::rect::is_padded;

/// Object-safe view of a column used by the owning slab to resize,
/// permute, and export every column uniformly.
pub trait ColumnBuffer: Send + Sync {
    fn name(&self) -> &'static str;
    fn stride(&self) -> usize;
    /// Live rows.
    fn len(&self) -> usize;
    /// Allocated rows (live + padding).
    fn capacity(&self) -> usize;
    /// Reallocate to `rows` rows of capacity, keeping the live prefix.
    fn grow_to(&mut self, rows: usize);
    /// Set the live row count; rows exposed by growing are reset to the fill value.
    fn set_len(&mut self, rows: usize);
    /// Reorder rows so that new row `i` holds old row `order[i]`; `len` becomes `order.len()`.
    fn permute(&mut self, order: &[u32]);
    /// Whole padded buffer as bytes.
    fn bytes(&self) -> &[u8];
}

/// A stride-addressed column of `T`.
#[derive(Debug, Clone)]
pub struct Column<T> {
    name: &'static str,
    stride: usize,
    len: usize,
    fill: T,
    data: Vec<T>,
    dirty: Option<(usize, usize)>,
}

impl<T: Pod> Column<T> {
    /// Empty column with zeroed fill.
    pub fn new(name: &'static str, stride: usize) -> Self {
        Self::with_fill(name, stride, T::zeroed())
    }

    /// Empty column whose unused and newly exposed slots hold `fill`.
    pub fn with_fill(name: &'static str, stride: usize, fill: T) -> Self {
        debug_assert!(stride > 0, "column `{name}` needs a non-zero stride");
        Column {
            name,
            stride,
            len: 0,
            fill,
            data: Vec::new(),
            dirty: None,
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Live rows.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated rows.
    pub fn capacity(&self) -> usize {
        self.data.len() / self.stride
    }

    #[inline]
    fn index(&self, row: usize, field: usize) -> usize {
        debug_assert!(
            row < self.len && field < self.stride,
            "column `{}`: ({row}, {field}) out of bounds (len {}, stride {})",
            self.name,
            self.len,
            self.stride
        );
        row * self.stride + field
    }

    #[inline]
    pub fn get(&self, row: usize, field: usize) -> T {
        self.data[self.index(row, field)]
    }

    #[inline]
    pub fn set(&mut self, row: usize, field: usize, value: T) {
        let i = self.index(row, field);
        self.data[i] = value;
    }

    /// Bounds-checked read.
    pub fn try_get(&self, row: usize, field: usize) -> Option<T> {
        (row < self.len && field < self.stride).then(|| self.data[row * self.stride + field])
    }

    /// Store `value` and widen the dirty range if the stored value changed.
    ///
    /// Returns `true` when the slot was modified.
    pub fn set_tracked(&mut self, row: usize, field: usize, value: T) -> bool {
        let i = self.index(row, field);
        if bytemuck::bytes_of(&self.data[i]) == bytemuck::bytes_of(&value) {
            return false;
        }
        self.data[i] = value;
        self.dirty = Some(match self.dirty {
            Some((lo, hi)) => (lo.min(i), hi.max(i)),
            None => (i, i),
        });
        true
    }

    /// Read the first `N` fields of `row`.
    #[inline]
    pub fn get_vec<const N: usize>(&self, row: usize) -> [T; N] {
        let start = self.index(row, 0);
        debug_assert!(N <= self.stride);
        let mut out = [self.fill; N];
        out.copy_from_slice(&self.data[start..start + N]);
        out
    }

    /// Write the first `N` fields of `row`.
    #[inline]
    pub fn set_vec<const N: usize>(&mut self, row: usize, value: [T; N]) {
        let start = self.index(row, 0);
        debug_assert!(N <= self.stride);
        self.data[start..start + N].copy_from_slice(&value);
    }

    /// Tracked variant of [`Column::set_vec`].
    pub fn set_vec_tracked<const N: usize>(&mut self, row: usize, value: [T; N]) -> bool {
        let mut changed = false;
        for (field, v) in value.into_iter().enumerate() {
            changed |= self.set_tracked(row, field, v);
        }
        changed
    }

    pub fn row(&self, row: usize) -> &[T] {
        let start = self.index(row, 0);
        &self.data[start..start + self.stride]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [T] {
        let start = self.index(row, 0);
        &mut self.data[start..start + self.stride]
    }

    /// Live elements only.
    pub fn as_slice(&self) -> &[T] {
        &self.data[..self.len * self.stride]
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let end = self.len * self.stride;
        &mut self.data[..end]
    }

    /// Live elements plus padding.
    pub fn padded(&self) -> &[T] {
        &self.data
    }

    /// Raw pointer to the padded buffer for disjoint parallel writers.
    pub(crate) fn as_mut_ptr(&mut self) -> *mut T {
        self.data.as_mut_ptr()
    }

    /// Inclusive element-index range changed since the last reset.
    pub fn dirty_range(&self) -> Option<RangeInclusive<usize>> {
        self.dirty.map(|(lo, hi)| lo..=hi)
    }

    pub fn reset_dirty_range(&mut self) {
        self.dirty = None;
    }

    /// Mark every live element as changed, e.g. after a bulk rewrite.
    pub fn mark_all_dirty(&mut self) {
        let elements = self.len * self.stride;
        self.dirty = (elements > 0).then(|| (0, elements - 1));
    }

    pub fn fill_value(&self) -> T {
        self.fill
    }

    /// Replace the backing store with caller-owned storage.
    ///
    /// `backing` must hold a whole number of rows, at least the live row count,
    /// and its row count must already be a padded rectangle. The live prefix is
    /// copied in; the remainder is reset to the fill value.
    pub fn set_backing(&mut self, mut backing: Vec<T>, max_row_width: usize) -> Result<(), MeshError> {
        let needed = self.len * self.stride;
        if backing.len() < needed {
            return Err(MeshError::BackingTooSmall {
                needed,
                provided: backing.len(),
            });
        }
        let rows = backing.len() / self.stride;
        if backing.len() % self.stride != 0 || !is_padded(rows, max_row_width) {
            return Err(MeshError::BackingNotPadded { len: backing.len() });
        }
        backing[..needed].copy_from_slice(&self.data[..needed]);
        backing[needed..].fill(self.fill);
        self.data = backing;
        self.dirty = (needed > 0).then(|| (0, needed - 1));
        Ok(())
    }
}

impl<T: Pod + Send + Sync> ColumnBuffer for Column<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn stride(&self) -> usize {
        Column::stride(self)
    }

    fn len(&self) -> usize {
        Column::len(self)
    }

    fn capacity(&self) -> usize {
        Column::capacity(self)
    }

    fn grow_to(&mut self, rows: usize) {
        let want = rows * self.stride;
        if want > self.data.len() {
            let mut grown = Vec::with_capacity(want);
            grown.extend_from_slice(&self.data[..self.len * self.stride]);
            grown.resize(want, self.fill);
            self.data = grown;
        }
    }

    fn set_len(&mut self, rows: usize) {
        debug_assert!(rows <= Column::capacity(self));
        if rows > self.len {
            let fill = self.fill;
            self.data[self.len * self.stride..rows * self.stride].fill(fill);
        }
        self.len = rows;
    }

    fn permute(&mut self, order: &[u32]) {
        let mut data = vec![self.fill; self.data.len()];
        for (new_row, &old_row) in order.iter().enumerate() {
            let src = old_row as usize * self.stride;
            let dst = new_row * self.stride;
            data[dst..dst + self.stride].copy_from_slice(&self.data[src..src + self.stride]);
        }
        self.data = data;
        self.len = order.len();
        self.dirty = (self.len > 0).then(|| (0, self.len * self.stride - 1));
    }

    fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_with_rows(rows: usize) -> Column<f32> {
        let mut c = Column::<f32>::new("pt", 3);
        c.grow_to(rows);
        c.set_len(rows);
        c
    }

    #[test]
    fn tracked_set_records_changed_range_only() {
        let mut c = column_with_rows(4);
        assert!(c.dirty_range().is_none());
        assert!(!c.set_tracked(1, 0, 0.0), "unchanged value is not recorded");
        assert!(c.dirty_range().is_none());
        assert!(c.set_tracked(2, 1, 5.0));
        assert!(c.set_tracked(0, 2, 1.0));
        assert_eq!(c.dirty_range(), Some(2..=7));
        c.reset_dirty_range();
        assert!(c.dirty_range().is_none());
    }

    #[test]
    fn vector_access_by_row() {
        let mut c = column_with_rows(2);
        c.set_vec(1, [1.0, 2.0, 3.0]);
        assert_eq!(c.get_vec::<3>(1), [1.0, 2.0, 3.0]);
        assert_eq!(c.get(1, 2), 3.0);
        assert_eq!(c.row(0), &[0.0, 0.0, 0.0]);
        assert_eq!(c.try_get(2, 0), None);
    }

    #[test]
    fn growth_keeps_live_prefix_and_fills_rest() {
        let mut c = Column::<i32>::with_fill("link", 1, -1);
        c.grow_to(2);
        c.set_len(2);
        c.set(0, 0, 7);
        c.set(1, 0, 8);
        c.grow_to(6);
        assert_eq!(c.capacity(), 6);
        assert_eq!(c.padded(), &[7, 8, -1, -1, -1, -1]);
    }

    #[test]
    fn permute_reorders_rows() {
        let mut c = Column::<i32>::with_fill("x", 2, 0);
        c.grow_to(3);
        c.set_len(3);
        for r in 0..3 {
            c.set_vec(r, [r as i32, 10 * r as i32]);
        }
        c.permute(&[2, 0]);
        assert_eq!(c.len(), 2);
        assert_eq!(c.as_slice(), &[2, 20, 0, 0]);
    }

    #[test]
    fn backing_injection_validates_and_copies() {
        let mut c = column_with_rows(2);
        c.set_vec(1, [4.0, 5.0, 6.0]);
        let err = c.set_backing(vec![0.0; 3], 8).unwrap_err();
        assert!(matches!(err, MeshError::BackingTooSmall { needed: 6, provided: 3 }));
        // 10 rows with max width 4 pads to 12
        let err = c.set_backing(vec![0.0; 30], 4).unwrap_err();
        assert_eq!(err, MeshError::BackingNotPadded { len: 30 });

        c.set_backing(vec![9.0; 36], 4).unwrap();
        assert_eq!(c.capacity(), 12);
        assert_eq!(c.get_vec::<3>(1), [4.0, 5.0, 6.0]);
        assert_eq!(c.padded()[6], 0.0);
        assert_eq!(c.bytes().len(), 36 * 4);
    }
}
