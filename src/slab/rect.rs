//! Rectangular-padding math.
//!
//! A slab of `length` rows, each `stride` elements wide, is consumed downstream
//! as a 2-D image whose width is bounded by `max_row_width` elements. Rows are
//! laid out `row_width` per image line, `row_count` lines tall.

use serde::{Deserialize, Serialize};

use crate::mesh_error::MeshError;

/// Image-shaped layout of a slab's capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RectDims {
    /// Slab rows per image line.
    pub row_width: usize,
    /// Number of image lines.
    pub row_count: usize,
}

impl RectDims {
    /// Number of slab rows covered by the rectangle.
    #[inline]
    pub fn rows(&self) -> usize {
        self.row_width * self.row_count
    }

    /// Width of one image line in elements.
    #[inline]
    pub fn element_width(&self, stride: usize) -> usize {
        self.row_width * stride
    }
}

/// Compute the rectangle that holds `length` rows of `stride` elements.
///
/// One row per line while `length` fits in a single column of lines; past that
/// the rows are spread across `ceil(length / max_row_width)` per line and the
/// line count is re-derived so the rectangle stays tight.
///
/// Fails with [`MeshError::CapacityExceeded`] when `stride * row_width` is wider
/// than `max_row_width`.
pub fn compute_rect_dimensions(
    length: usize,
    stride: usize,
    max_row_width: usize,
) -> Result<RectDims, MeshError> {
    let exceeded = || MeshError::CapacityExceeded {
        slab: "rect",
        requested: length,
        max_row_width,
    };
    if max_row_width == 0 || stride == 0 {
        return Err(exceeded());
    }
    let row_width = length.div_ceil(max_row_width);
    let row_count = if row_width > 1 {
        length.div_ceil(row_width)
    } else {
        length
    };
    let width = row_width.checked_mul(stride).ok_or_else(exceeded)?;
    if width > max_row_width {
        return Err(exceeded());
    }
    Ok(RectDims {
        row_width,
        row_count,
    })
}

/// Smallest padded row count `>= length` that forms a valid rectangle.
pub fn padded_rows(length: usize, max_row_width: usize) -> Result<usize, MeshError> {
    compute_rect_dimensions(length, 1, max_row_width).map(|d| d.rows())
}

/// `true` when `rows` is already a padded rectangle.
pub fn is_padded(rows: usize, max_row_width: usize) -> bool {
    matches!(padded_rows(rows, max_row_width), Ok(p) if p == rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_line_per_row_when_short() {
        let d = compute_rect_dimensions(100, 4, 4096).unwrap();
        assert_eq!(d, RectDims { row_width: 1, row_count: 100 });
        assert_eq!(d.element_width(4), 4);
    }

    #[test]
    fn spreads_rows_once_past_max() {
        let d = compute_rect_dimensions(10, 1, 4).unwrap();
        // ceil(10/4) = 3 rows per line, ceil(10/3) = 4 lines
        assert_eq!(d, RectDims { row_width: 3, row_count: 4 });
        assert_eq!(d.rows(), 12);
    }

    #[test]
    fn wide_stride_overflows() {
        let err = compute_rect_dimensions(10, 2, 4).unwrap_err();
        assert!(matches!(err, MeshError::CapacityExceeded { max_row_width: 4, .. }));
    }

    #[test]
    fn empty_is_zero_area() {
        let d = compute_rect_dimensions(0, 3, 16).unwrap();
        assert_eq!(d.rows(), 0);
    }

    proptest! {
        #[test]
        fn rect_covers_length(len in 0usize..200_000, stride in 1usize..5) {
            let max = 1024;
            match compute_rect_dimensions(len, stride, max) {
                Ok(d) => {
                    prop_assert!(d.rows() >= len);
                    prop_assert!(d.element_width(stride) <= max);
                    // padding is a fixed point
                    prop_assert!(is_padded(d.rows(), max));
                }
                Err(MeshError::CapacityExceeded { .. }) => {
                    prop_assert!(len.div_ceil(max) * stride > max);
                }
                Err(e) => prop_assert!(false, "unexpected error {e}"),
            }
        }
    }
}
