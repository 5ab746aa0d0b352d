//! zlib stream backed by `flate2`.

use flate2::{Compress, Compression, FlushCompress, Status};

use super::CompressStream;
use crate::error::{Error, Result};
use crate::png::CompressionLevel;

/// Spare output capacity kept available before each call into zlib.
const MIN_SPARE: usize = 8 * 1024;

/// A single zlib stream (header, deflate body, Adler-32 trailer) that is
/// sync-flushed after every chunk.
pub struct ZlibStream {
    inner: Compress,
    finished: bool,
}

impl ZlibStream {
    /// Create a stream at the given effort.
    pub fn new(level: CompressionLevel) -> Self {
        Self {
            inner: Compress::new(Compression::new(level.zlib_level()), true),
            finished: false,
        }
    }

    /// Uncompressed bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.inner.total_in()
    }

    fn run(&mut self, mut input: &[u8], output: &mut Vec<u8>, flush: FlushCompress) -> Result<()> {
        loop {
            if output.capacity() - output.len() < MIN_SPARE {
                output.reserve(input.len() / 2 + MIN_SPARE);
            }
            let in_before = self.inner.total_in();
            let out_before = output.len();

            let status = self
                .inner
                .compress_vec(input, output, flush)
                .map_err(|e| Error::Compression(e.to_string()))?;

            let consumed = (self.inner.total_in() - in_before) as usize;
            input = &input[consumed..];

            match status {
                Status::StreamEnd => return Ok(()),
                Status::Ok | Status::BufError => {
                    let spare_left = output.len() < output.capacity();
                    if flush != FlushCompress::Finish && input.is_empty() && spare_left {
                        return Ok(());
                    }
                    if consumed == 0 && output.len() == out_before && spare_left {
                        return Err(Error::Compression("zlib made no progress".into()));
                    }
                }
            }
        }
    }
}

impl CompressStream for ZlibStream {
    fn write(&mut self, data: &[u8], output: &mut Vec<u8>) -> Result<()> {
        if self.finished {
            return Err(Error::Compression("write after end of stream".into()));
        }
        self.run(data, output, FlushCompress::Sync)
    }

    fn finish(&mut self, output: &mut Vec<u8>) -> Result<()> {
        if self.finished {
            return Err(Error::Compression("stream already finished".into()));
        }
        self.run(&[], output, FlushCompress::Finish)?;
        self.finished = true;
        Ok(())
    }
}
