//! The communication area: aligned sample rows shared by all components.
//!
//! Every atomic output channel, external capture channel and external playback
//! channel owns exactly one row of `block_length` samples. Input ports own no
//! rows; they are resolved to lists of producer rows, so fan-out costs no
//! memory.
//!
//! Rows of one sample type live in a single contiguous allocation. Each row
//! starts on a multiple of the configured alignment (bytes, power of two), so
//! the stride between rows is `block_length` rounded up to whole alignment
//! units.

use core::ops::Range;

use super::context::{OwnRows, RowsView};
use crate::error::GraphError;
use crate::sample::Sample;

/// Rows of one sample type in one aligned allocation.
pub struct SampleRows<S> {
    storage: Vec<S>,
    offset: usize,
    rows: usize,
    stride: usize,
    block_length: usize,
}

impl<S: Sample> SampleRows<S> {
    /// Allocates `rows` zeroed rows.
    ///
    /// `alignment` must be a power of two; `CommunicationArea::new` checks it.
    pub fn new(rows: usize, block_length: usize, alignment: usize) -> Self {
        let lanes = lanes::<S>(alignment);
        let stride = block_length.div_ceil(lanes) * lanes;
        // One extra alignment unit so the first row can be shifted onto a boundary.
        let storage = vec![S::default(); rows * stride + lanes];
        let offset = match storage.as_ptr().align_offset(alignment) {
            offset if offset < lanes => offset,
            _ => 0,
        };
        Self {
            storage,
            offset,
            rows,
            stride,
            block_length,
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Distance between row starts, in samples.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Samples per row.
    pub fn block_length(&self) -> usize {
        self.block_length
    }

    /// One row.
    ///
    /// # Panics
    ///
    /// Panics if `row >= rows()`.
    #[inline]
    pub fn row(&self, row: usize) -> &[S] {
        let start = self.offset + row * self.stride;
        &self.storage[start..start + self.block_length]
    }

    /// One row, mutably.
    ///
    /// # Panics
    ///
    /// Panics if `row >= rows()`.
    #[inline]
    pub fn row_mut(&mut self, row: usize) -> &mut [S] {
        let start = self.offset + row * self.stride;
        &mut self.storage[start..start + self.block_length]
    }

    /// Copies row `from` over row `to`.
    pub fn copy_row(&mut self, from: usize, to: usize) {
        let src = self.offset + from * self.stride;
        let dst = self.offset + to * self.stride;
        self.storage.copy_within(src..src + self.block_length, dst);
    }

    /// Zeroes every row.
    pub fn clear(&mut self) {
        self.storage.fill(S::default());
    }

    /// The aligned region holding all rows back to back (padding included).
    pub fn as_slice(&self) -> &[S] {
        &self.storage[self.offset..self.offset + self.rows * self.stride]
    }

    fn as_mut_slice(&mut self) -> &mut [S] {
        let end = self.offset + self.rows * self.stride;
        &mut self.storage[self.offset..end]
    }

    /// Splits the rows into shared access to everything outside `own` and
    /// mutable access to the rows in `own`.
    pub(crate) fn split_around(
        &mut self,
        own: Range<usize>,
    ) -> (RowsView<'_, S>, OwnRows<'_, S>) {
        let (stride, block_length) = (self.stride, self.block_length);
        let data = self.as_mut_slice();
        let (head, rest) = data.split_at_mut(own.start * stride);
        let (mine, tail) = rest.split_at_mut(own.len() * stride);
        (
            RowsView::new(head, tail, own, stride, block_length),
            OwnRows::new(mine, stride, block_length),
        )
    }
}

/// Alignment expressed in samples, at least one.
fn lanes<S>(alignment: usize) -> usize {
    (alignment / size_of::<S>()).max(1)
}

/// Row storage for every sample type.
pub struct CommunicationArea {
    pub(crate) f32: SampleRows<f32>,
    pub(crate) f64: SampleRows<f64>,
    alignment: usize,
    block_length: usize,
}

impl CommunicationArea {
    /// Allocates the area.
    ///
    /// # Errors
    ///
    /// [`GraphError::InvalidConfiguration`] for a zero block length or an
    /// alignment that is not a power of two.
    pub fn new(
        f32_rows: usize,
        f64_rows: usize,
        block_length: usize,
        alignment: usize,
    ) -> Result<Self, GraphError> {
        if block_length == 0 {
            return Err(GraphError::InvalidConfiguration(
                "block length must be at least one sample".to_string(),
            ));
        }
        if !alignment.is_power_of_two() {
            return Err(GraphError::InvalidConfiguration(format!(
                "alignment {alignment} is not a power of two"
            )));
        }
        Ok(Self {
            f32: SampleRows::new(f32_rows, block_length, alignment),
            f64: SampleRows::new(f64_rows, block_length, alignment),
            alignment,
            block_length,
        })
    }

    /// Rows of sample type `S`.
    pub fn rows<S: Sample>(&self) -> &SampleRows<S> {
        S::area(self)
    }

    /// Rows of sample type `S`, mutably.
    pub fn rows_mut<S: Sample>(&mut self) -> &mut SampleRows<S> {
        S::area_mut(self)
    }

    /// Row alignment in bytes.
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Samples per row.
    pub fn block_length(&self) -> usize {
        self.block_length
    }

    /// Zeroes every row of every sample type.
    pub fn clear(&mut self) {
        self.f32.clear();
        self.f64.clear();
    }
}
