//! Continuable compression streams.
//!
//! The pipeline treats the compressor as an opaque stream that must see
//! chunks in sequence order. Each chunk is fed with a sync flush so its
//! compressed bytes end on a byte boundary and can be emitted as soon as the
//! chunk is done; the end of the image is signalled once with
//! [`CompressStream::finish`].

pub mod zlib;

pub use zlib::ZlibStream;

use crate::error::Result;

/// An order-sensitive compressor fed one pipeline chunk at a time.
///
/// Implementations are moved between threads, but only one thread ever
/// holds the stream at a time.
pub trait CompressStream: Send + 'static {
    /// Feed `data`, flush, and append all produced bytes to `output`.
    fn write(&mut self, data: &[u8], output: &mut Vec<u8>) -> Result<()>;

    /// Signal end of input and append the stream trailer to `output`.
    fn finish(&mut self, output: &mut Vec<u8>) -> Result<()>;
}

impl<T: CompressStream + ?Sized> CompressStream for Box<T> {
    fn write(&mut self, data: &[u8], output: &mut Vec<u8>) -> Result<()> {
        (**self).write(data, output)
    }

    fn finish(&mut self, output: &mut Vec<u8>) -> Result<()> {
        (**self).finish(output)
    }
}
