//! In-order emission of PNG chunks to the write sink.

use log::trace;

use crate::error::{Error, Result};
use crate::io::WriteSink;
use crate::png::chunk::write_chunk;
use crate::png::FlushPolicy;

/// Frames bytes as PNG chunks and hands them to the sink, one `write` call
/// per PNG chunk, and applies the flush policy.
pub struct Assembler<S> {
    sink: S,
    max_idat_size: usize,
    flush_policy: FlushPolicy,
    scratch: Vec<u8>,
    bytes_since_flush: usize,
    blocks_since_flush: usize,
    bytes_written: u64,
}

impl<S> Assembler<S> {
    /// Wrap `sink`.
    pub fn new(sink: S, max_idat_size: usize, flush_policy: FlushPolicy) -> Self {
        Self {
            sink,
            max_idat_size: max_idat_size.max(1),
            flush_policy,
            scratch: Vec::new(),
            bytes_since_flush: 0,
            blocks_since_flush: 0,
            bytes_written: 0,
        }
    }

    /// Borrow the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Total bytes accepted by the sink.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Drop scratch memory.
    pub fn release_buffers(&mut self) {
        self.scratch = Vec::new();
    }
}

impl<S: WriteSink> Assembler<S> {
    /// Write pre-framed bytes (signature plus header chunks).
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let written = self.sink.write(bytes)?;
        if written < bytes.len() {
            return Err(Error::ShortWrite {
                expected: bytes.len(),
                written,
            });
        }
        self.bytes_written += written as u64;
        self.bytes_since_flush += written;
        Ok(())
    }

    /// Frame `data` as one chunk of type `tag` and write it.
    pub fn write_chunk(&mut self, tag: &[u8; 4], data: &[u8]) -> Result<()> {
        let mut framed = std::mem::take(&mut self.scratch);
        framed.clear();
        write_chunk(&mut framed, tag, data);
        let result = self.write_raw(&framed);
        self.scratch = framed;
        result
    }

    /// Emit a compressed block of pipeline chunk `index` as IDAT chunks,
    /// then flush if the policy asks for it.
    pub fn emit_block(&mut self, index: usize, data: &[u8]) -> Result<()> {
        self.write_idat(data)?;
        trace!("chunk {index} emitted ({} compressed bytes)", data.len());
        self.blocks_since_flush += 1;
        let due = match self.flush_policy {
            FlushPolicy::Never => false,
            FlushPolicy::Bytes(n) => self.bytes_since_flush >= n,
            FlushPolicy::Chunks(n) => self.blocks_since_flush >= n,
        };
        if due {
            self.flush()?;
        }
        Ok(())
    }

    /// Emit bytes as IDAT chunks without counting a pipeline block.
    pub fn write_idat(&mut self, data: &[u8]) -> Result<()> {
        for part in data.chunks(self.max_idat_size) {
            self.write_chunk(b"IDAT", part)?;
        }
        Ok(())
    }

    /// Flush the sink and reset the policy counters.
    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        self.bytes_since_flush = 0;
        self.blocks_since_flush = 0;
        Ok(())
    }
}
