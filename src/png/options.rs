//! Encoder configuration.

use super::filter::FilterMode;
use crate::error::{Error, Result};

/// Default target size in bytes of raw pixel data per pipeline chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 200_000;

/// Default maximum payload length of a single IDAT chunk.
pub const DEFAULT_MAX_IDAT_SIZE: usize = 256 * 1024;

/// zlib compression effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    /// zlib level 1.
    Fast,
    /// zlib level 6.
    #[default]
    Default,
    /// zlib level 9.
    High,
}

impl CompressionLevel {
    /// Numeric zlib level.
    pub const fn zlib_level(self) -> u32 {
        match self {
            CompressionLevel::Fast => 1,
            CompressionLevel::Default => 6,
            CompressionLevel::High => 9,
        }
    }
}

/// When the sink is flushed, besides the final flush after IEND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushPolicy {
    /// Only flush once the image is finished.
    #[default]
    Never,
    /// Flush whenever at least this many bytes were emitted since the last flush.
    Bytes(usize),
    /// Flush after this many pipeline chunks were emitted since the last flush.
    Chunks(usize),
}

/// PNG encoding options.
///
/// Thread count is not part of the options; it belongs to the
/// [`crate::pool::ThreadPool`] the encoder runs on.
#[derive(Debug, Clone)]
pub struct Options {
    /// Target bytes of raw pixel data per pipeline chunk. Chunks are cut on
    /// row boundaries, so a row larger than this still forms one chunk.
    pub chunk_size: usize,
    /// Filter selection policy.
    pub filter_mode: FilterMode,
    /// zlib effort.
    pub compression_level: CompressionLevel,
    /// Intermediate flush behaviour.
    pub flush_policy: FlushPolicy,
    /// Compressed blocks longer than this are split across several IDAT chunks.
    pub max_idat_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            filter_mode: FilterMode::Adaptive,
            compression_level: CompressionLevel::Default,
            flush_policy: FlushPolicy::Never,
            max_idat_size: DEFAULT_MAX_IDAT_SIZE,
        }
    }
}

impl Options {
    /// Speed-focused preset: no filtering, fast zlib.
    pub fn fast() -> Self {
        Self {
            filter_mode: FilterMode::Fixed(super::Filter::None),
            compression_level: CompressionLevel::Fast,
            ..Self::default()
        }
    }

    /// Balanced preset (same as default).
    pub fn balanced() -> Self {
        Self::default()
    }

    /// Highest compression preset; larger chunks keep more history per block.
    pub fn max_compression() -> Self {
        Self {
            chunk_size: 1024 * 1024,
            compression_level: CompressionLevel::High,
            ..Self::default()
        }
    }

    /// Check every option for a usable value.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidOption("chunk size must be positive"));
        }
        if self.max_idat_size == 0 {
            return Err(Error::InvalidOption("IDAT size must be positive"));
        }
        if self.max_idat_size > i32::MAX as usize {
            return Err(Error::InvalidOption("IDAT size must fit in 31 bits"));
        }
        match self.flush_policy {
            FlushPolicy::Bytes(0) => Err(Error::InvalidOption("flush byte threshold must be positive")),
            FlushPolicy::Chunks(0) => Err(Error::InvalidOption("flush chunk threshold must be positive")),
            _ => Ok(()),
        }
    }
}
