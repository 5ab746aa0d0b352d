//! Work executed on pool threads.
//!
//! Filter tasks run for any chunk as soon as its rows are in. Compression
//! tasks run one at a time: the session moves the compression stream into
//! the task for the chunk at the compression cursor and gets it back in the
//! task's result message.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use log::trace;

use super::chunk::{CompressedBlock, FilteredChunk, PixelChunk};
use crate::compress::CompressStream;
use crate::error::{Error, Result};
use crate::png::filter::{FilterMode, RowFilter};

/// Result of a worker task, sent back to the driving thread.
pub enum WorkerMessage {
    /// A chunk finished filtering.
    Filtered(FilteredChunk),
    /// A chunk was fed to the stream; the stream travels back with it.
    Compressed {
        /// Output of the chunk.
        block: CompressedBlock,
        /// Stream, ready for the next chunk.
        stream: Box<dyn CompressStream>,
    },
    /// The task failed or panicked.
    Failed(Error),
}

/// Filter every row of `chunk`.
///
/// The first row is filtered against the last row of `previous`, or against
/// a zero row if `chunk` starts the image.
pub fn filter_chunk(
    chunk: &PixelChunk,
    previous: Option<&PixelChunk>,
    mode: FilterMode,
    bpp: usize,
) -> Result<FilteredChunk> {
    let stride = chunk.stride();
    let zero_row = vec![0u8; stride];
    let mut prev_row: &[u8] = if chunk.span().is_first() {
        &zero_row
    } else {
        previous
            .and_then(PixelChunk::last_row)
            .ok_or(Error::Pipeline("chunk filtered without its predecessor"))?
    };

    let rows = chunk.rows_filled();
    let mut filter = RowFilter::new(mode, bpp, stride);
    let mut data = Vec::with_capacity(rows as usize * (stride + 1));
    for row in chunk.rows() {
        filter.filter_into(prev_row, row, &mut data);
        prev_row = row;
    }

    Ok(FilteredChunk {
        index: chunk.index(),
        rows,
        data,
    })
}

/// Feed one filtered chunk into the stream and collect its output.
pub fn compress_chunk(
    stream: &mut dyn CompressStream,
    chunk: &FilteredChunk,
) -> Result<CompressedBlock> {
    let mut data = Vec::with_capacity(chunk.data.len() / 2 + 64);
    stream.write(&chunk.data, &mut data)?;
    Ok(CompressedBlock {
        index: chunk.index,
        input_len: chunk.data.len(),
        data,
    })
}

/// Task body for filtering; never panics outward.
pub fn run_filter(
    chunk: Arc<PixelChunk>,
    previous: Option<Arc<PixelChunk>>,
    mode: FilterMode,
    bpp: usize,
) -> WorkerMessage {
    guarded(|| {
        let filtered = filter_chunk(&chunk, previous.as_deref(), mode, bpp)?;
        trace!("chunk {} filtered ({} bytes)", filtered.index, filtered.data.len());
        Ok(WorkerMessage::Filtered(filtered))
    })
}

/// Task body for compression; never panics outward.
pub fn run_compress(mut stream: Box<dyn CompressStream>, chunk: FilteredChunk) -> WorkerMessage {
    guarded(move || {
        let block = compress_chunk(stream.as_mut(), &chunk)?;
        trace!(
            "chunk {} compressed {} -> {} bytes",
            block.index,
            block.input_len,
            block.data.len()
        );
        Ok(WorkerMessage::Compressed { block, stream })
    })
}

fn guarded<F>(task: F) -> WorkerMessage
where
    F: FnOnce() -> Result<WorkerMessage>,
{
    match catch_unwind(AssertUnwindSafe(task)) {
        Ok(Ok(message)) => message,
        Ok(Err(e)) => WorkerMessage::Failed(e),
        Err(payload) => WorkerMessage::Failed(Error::WorkerPanicked(panic_message(payload))),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
