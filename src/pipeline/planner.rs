//! Chunk planning: split the image rows into contiguous, numbered groups.

use log::debug;

use crate::error::{Error, Result};

/// Rows covered by one pipeline chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    /// Sequence number, 0-based and gapless.
    pub index: usize,
    /// First row (inclusive).
    pub start_row: u32,
    /// Last row (exclusive).
    pub end_row: u32,
}

impl ChunkSpan {
    /// Number of rows in the chunk. Never zero.
    pub fn rows(&self) -> u32 {
        self.end_row - self.start_row
    }

    /// Whether this chunk starts the image.
    pub fn is_first(&self) -> bool {
        self.start_row == 0
    }
}

/// Partition of an image into chunks of at most `rows_per_chunk` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    height: u32,
    rows_per_chunk: u32,
    chunks: usize,
}

impl ChunkPlan {
    /// Plan chunks so each holds at most `budget` raw bytes, except that a
    /// chunk always holds at least one row.
    pub fn new(height: u32, stride: usize, budget: usize) -> Result<Self> {
        if height == 0 {
            return Err(Error::InvalidOption("image height must be positive"));
        }
        if budget == 0 {
            return Err(Error::InvalidOption("chunk size must be positive"));
        }
        let rows = (budget / stride.max(1)).clamp(1, height as usize) as u32;
        let chunks = height.div_ceil(rows) as usize;
        debug!(
            "planned {chunks} chunks of up to {rows} rows ({} bytes each) for {height} rows",
            rows as usize * stride
        );
        Ok(Self {
            height,
            rows_per_chunk: rows,
            chunks,
        })
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks
    }

    /// Always false; a plan covers at least one row.
    pub fn is_empty(&self) -> bool {
        self.chunks == 0
    }

    /// Rows per full chunk.
    pub fn rows_per_chunk(&self) -> u32 {
        self.rows_per_chunk
    }

    /// Span of chunk `index`, or `None` past the end.
    pub fn span(&self, index: usize) -> Option<ChunkSpan> {
        if index >= self.chunks {
            return None;
        }
        let start_row = index as u32 * self.rows_per_chunk;
        let end_row = (start_row + self.rows_per_chunk).min(self.height);
        Some(ChunkSpan {
            index,
            start_row,
            end_row,
        })
    }

    /// All spans in order.
    pub fn spans(&self) -> impl Iterator<Item = ChunkSpan> + '_ {
        (0..self.chunks).filter_map(|i| self.span(i))
    }
}
