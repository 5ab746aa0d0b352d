//! Caller-side I/O contracts.
//!
//! The encoder pulls raw rows from a [`RowSource`] and pushes PNG bytes into
//! a [`WriteSink`]. Both are plain traits so files, sockets, memory buffers
//! and callback pairs plug in the same way.

use std::io;

/// Supplies one raw scanline per call.
pub trait RowSource {
    /// Fill `row` with the next scanline and return the number of bytes
    /// written. Returning fewer than `row.len()` while rows remain is treated
    /// as a fatal I/O error by the encoder.
    fn read_row(&mut self, row: &mut [u8]) -> io::Result<usize>;
}

impl<T: RowSource + ?Sized> RowSource for &mut T {
    fn read_row(&mut self, row: &mut [u8]) -> io::Result<usize> {
        (**self).read_row(row)
    }
}

/// Receives encoded PNG bytes.
///
/// Only ever called from the thread driving the encoder, never concurrently.
pub trait WriteSink {
    /// Write `bytes` and return how many were accepted. Anything short of
    /// `bytes.len()` aborts the encoding session.
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Push buffered bytes to their destination.
    fn flush(&mut self) -> io::Result<()>;
}

impl<T: WriteSink + ?Sized> WriteSink for &mut T {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        (**self).write(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// In-memory sink; never short-writes.
impl WriteSink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Adapts any [`std::io::Write`] (file, socket, cursor) into a [`WriteSink`].
///
/// Uses `write_all`, so partial writes of the underlying writer are retried
/// rather than reported as short writes.
#[derive(Debug)]
pub struct IoSink<W> {
    inner: W,
}

impl<W: io::Write> IoSink<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Borrow the wrapped writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: io::Write> WriteSink for IoSink<W> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.inner.write_all(bytes)?;
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Callback pair sink: a write function returning the number of bytes it
/// accepted and a flush function returning success.
pub struct FnSink<W, F> {
    write: W,
    flush: F,
}

impl<W, F> FnSink<W, F>
where
    W: FnMut(&[u8]) -> usize,
    F: FnMut() -> bool,
{
    /// Build a sink from callbacks.
    pub fn new(write: W, flush: F) -> Self {
        Self { write, flush }
    }
}

impl<W, F> WriteSink for FnSink<W, F>
where
    W: FnMut(&[u8]) -> usize,
    F: FnMut() -> bool,
{
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        Ok((self.write)(bytes))
    }

    fn flush(&mut self) -> io::Result<()> {
        if (self.flush)() {
            Ok(())
        } else {
            Err(io::Error::other("flush callback reported failure"))
        }
    }
}

/// Callback row source: fills the buffer and returns the byte count.
pub struct FnRowSource<F> {
    read: F,
}

impl<F: FnMut(&mut [u8]) -> usize> FnRowSource<F> {
    /// Build a source from a callback.
    pub fn new(read: F) -> Self {
        Self { read }
    }
}

impl<F: FnMut(&mut [u8]) -> usize> RowSource for FnRowSource<F> {
    fn read_row(&mut self, row: &mut [u8]) -> io::Result<usize> {
        Ok((self.read)(row))
    }
}

/// Rows served from a contiguous in-memory image.
#[derive(Debug, Clone)]
pub struct SliceRows<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> SliceRows<'a> {
    /// Serve rows from `data`, which holds the image rows back to back.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Bytes not yet served.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }
}

impl RowSource for SliceRows<'_> {
    fn read_row(&mut self, row: &mut [u8]) -> io::Result<usize> {
        let n = row.len().min(self.remaining());
        row[..n].copy_from_slice(&self.data[self.offset..self.offset + n]);
        self.offset += n;
        Ok(n)
    }
}

/// Rows pulled from any [`std::io::Read`].
///
/// Keeps reading until a row is full or the reader reports end of input.
#[derive(Debug)]
pub struct ReaderRows<R> {
    inner: R,
}

impl<R: io::Read> ReaderRows<R> {
    /// Wrap a reader.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: io::Read> RowSource for ReaderRows<R> {
    fn read_row(&mut self, row: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < row.len() {
            match self.inner.read(&mut row[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}
