//! Units of work moving through the pipeline.

use super::planner::ChunkSpan;

/// Raw rows accumulated for one chunk.
///
/// Rows are stored back to back; once sealed the chunk is shared read-only
/// between its own filter task and the filter task of the next chunk, which
/// needs the last row as its "previous row".
#[derive(Debug, Clone)]
pub struct PixelChunk {
    span: ChunkSpan,
    stride: usize,
    data: Vec<u8>,
}

impl PixelChunk {
    /// Empty accumulator for `span`.
    pub fn new(span: ChunkSpan, stride: usize) -> Self {
        Self {
            span,
            stride,
            data: Vec::with_capacity(span.rows() as usize * stride),
        }
    }

    /// Sequence number.
    pub fn index(&self) -> usize {
        self.span.index
    }

    /// Rows covered.
    pub fn span(&self) -> ChunkSpan {
        self.span
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Copy one row in. The caller guarantees `row.len() == stride`.
    pub fn push_row(&mut self, row: &[u8]) {
        debug_assert_eq!(row.len(), self.stride);
        debug_assert!(!self.is_full(), "row pushed into a full chunk");
        self.data.extend_from_slice(row);
    }

    /// Rows copied so far.
    pub fn rows_filled(&self) -> u32 {
        (self.data.len() / self.stride) as u32
    }

    /// Whether every row of the span has arrived.
    pub fn is_full(&self) -> bool {
        self.rows_filled() == self.span.rows()
    }

    /// Rows in image order.
    pub fn rows(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(self.stride)
    }

    /// Last row of the chunk, if any has arrived.
    pub fn last_row(&self) -> Option<&[u8]> {
        self.rows().last()
    }

    /// Raw byte count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether no rows have arrived.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Filtered rows of one chunk, each prefixed with its filter tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredChunk {
    /// Sequence number of the originating [`PixelChunk`].
    pub index: usize,
    /// Rows in the chunk.
    pub rows: u32,
    /// `rows * (stride + 1)` bytes.
    pub data: Vec<u8>,
}

/// Compressed output for one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedBlock {
    /// Sequence number of the originating chunk.
    pub index: usize,
    /// Uncompressed bytes that were fed to the stream.
    pub input_len: usize,
    /// Compressed bytes, ending on a flush boundary.
    pub data: Vec<u8>,
}
