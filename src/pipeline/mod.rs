//! Stages of the parallel encode pipeline.
//!
//! Rows are grouped into chunks by the [`planner`], accumulated into
//! [`chunk::PixelChunk`]s, filtered in parallel, compressed in sequence by
//! the [`worker`] tasks, put back in order by a [`reorder::ReorderBuffer`] and
//! written out by the [`assembler`].

pub mod assembler;
pub mod chunk;
pub mod planner;
pub mod reorder;
pub mod worker;

pub use assembler::Assembler;
pub use chunk::{CompressedBlock, FilteredChunk, PixelChunk};
pub use planner::{ChunkPlan, ChunkSpan};
pub use reorder::ReorderBuffer;
