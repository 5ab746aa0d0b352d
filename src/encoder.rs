//! Streaming encoder session.
//!
//! An [`Encoder`] drives one image through the pipeline:
//!
//! 1. rows are pulled (or pushed) into the chunk under construction;
//! 2. a full chunk is sealed and filtered on the pool, in parallel with other
//!    chunks;
//! 3. filtered chunks are released in sequence order and fed, one at a time,
//!    to the compression stream, which itself travels to a worker and back;
//! 4. compressed blocks are emitted as IDAT chunks in sequence order.
//!
//! All sink calls happen on the thread that calls the encoder's methods.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use log::{debug, trace, warn};

use crate::color::ColorType;
use crate::compress::{CompressStream, ZlibStream};
use crate::error::{Error, ErrorKind, Result};
use crate::io::{RowSource, SliceRows, WriteSink};
use crate::pipeline::worker::{self, WorkerMessage};
use crate::pipeline::{
    Assembler, ChunkPlan, CompressedBlock, FilteredChunk, PixelChunk, ReorderBuffer,
};
use crate::png::{Filter, FilterMode, Header, Options};
use crate::pool::ThreadPool;

/// Chunks allowed in flight beyond the worker count.
const EXTRA_IN_FLIGHT: usize = 2;

/// Lifecycle of an encoder session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderState {
    /// Constructed; nothing written.
    Created,
    /// Signature and header chunks written.
    HeaderWritten,
    /// At least one row consumed.
    Streaming,
    /// IEND written and the sink flushed.
    Finished,
    /// Resources dropped; no further calls are legal.
    Released,
    /// A fatal error of the given kind occurred; only release is legal.
    Poisoned(ErrorKind),
}

/// A single-image encoding session running on a borrowed pool.
///
/// ```no_run
/// use pngpipe::{ColorType, Encoder, Header, Options, SliceRows, ThreadPool};
///
/// # fn main() -> pngpipe::Result<()> {
/// let pool = ThreadPool::new(None)?;
/// let header = Header::new(2, 1, ColorType::Truecolor, 8)?;
/// let pixels = [255, 0, 0, 0, 0, 255];
///
/// let mut png = Vec::new();
/// let mut encoder = Encoder::new(&mut png, &pool, header, &Options::default())?;
/// encoder.write_header()?;
/// encoder.write_image(SliceRows::new(&pixels))?;
/// encoder.finish()?;
/// encoder.release()?;
/// # Ok(())
/// # }
/// ```
pub struct Encoder<'p, S> {
    pool: &'p ThreadPool,
    header: Header,
    filter_mode: FilterMode,
    state: EncoderState,
    assembler: Assembler<S>,
    plan: ChunkPlan,
    stride: usize,
    bpp: usize,
    max_in_flight: usize,
    rows_read: u32,
    pending: Option<PixelChunk>,
    previous: Option<Arc<PixelChunk>>,
    chunks_dispatched: usize,
    chunks_emitted: usize,
    filtered: ReorderBuffer<FilteredChunk>,
    compressed: ReorderBuffer<CompressedBlock>,
    stream: Option<Box<dyn CompressStream>>,
    running: usize,
    tx: Sender<WorkerMessage>,
    rx: Receiver<WorkerMessage>,
}

impl<'p, S: WriteSink> Encoder<'p, S> {
    /// Create a session writing to `sink` with a zlib stream at the
    /// configured level.
    pub fn new(sink: S, pool: &'p ThreadPool, header: Header, options: &Options) -> Result<Self> {
        let stream = Box::new(ZlibStream::new(options.compression_level));
        Self::with_stream(sink, pool, header, options, stream)
    }

    /// Create a session with a caller-supplied compression stream.
    pub fn with_stream(
        sink: S,
        pool: &'p ThreadPool,
        header: Header,
        options: &Options,
        stream: Box<dyn CompressStream>,
    ) -> Result<Self> {
        header.validate()?;
        options.validate()?;
        let stride = header.stride();
        let plan = ChunkPlan::new(header.height(), stride, options.chunk_size)?;
        let filter_mode = resolve_filter_mode(options.filter_mode, &header);
        let (tx, rx) = mpsc::channel();
        debug!(
            "encoder created: {}x{} {:?}/{} on {} threads, {:?}",
            header.width(),
            header.height(),
            header.color_type(),
            header.bit_depth(),
            pool.threads(),
            filter_mode
        );
        Ok(Self {
            pool,
            filter_mode,
            state: EncoderState::Created,
            assembler: Assembler::new(sink, options.max_idat_size, options.flush_policy),
            plan,
            stride,
            bpp: header.bytes_per_pixel(),
            max_in_flight: pool.threads() + EXTRA_IN_FLIGHT,
            header,
            rows_read: 0,
            pending: None,
            previous: None,
            chunks_dispatched: 0,
            chunks_emitted: 0,
            filtered: ReorderBuffer::new(),
            compressed: ReorderBuffer::new(),
            stream: Some(stream),
            running: 0,
            tx,
            rx,
        })
    }

    /// Write the PNG signature, IHDR and any PLTE/tRNS chunks.
    pub fn write_header(&mut self) -> Result<()> {
        let result = self.try_write_header();
        self.poison_on_failure(result)
    }

    /// Pull every row of the image from `source` and push it through the
    /// pipeline.
    ///
    /// A read returning less than a full row fails the session.
    pub fn write_image<R: RowSource>(&mut self, mut source: R) -> Result<()> {
        let result = self.try_write_image(&mut source);
        self.poison_on_failure(result)
    }

    /// Push one or more whole rows.
    ///
    /// `rows.len()` must be a multiple of the row stride and must not run
    /// past the image height; both are checked before anything is consumed.
    /// Once streaming has started, any error poisons the session.
    pub fn write_rows(&mut self, rows: &[u8]) -> Result<()> {
        let result = self.try_write_rows(rows);
        self.poison_on_failure(result)
    }

    /// Wait for every chunk, close the compression stream, write IEND and
    /// flush the sink.
    pub fn finish(&mut self) -> Result<()> {
        let result = self.try_finish();
        self.poison_on_failure(result)
    }

    /// Borrow the sink.
    pub fn sink(&self) -> &S {
        self.assembler.sink()
    }
}

impl<'p, S> Encoder<'p, S> {
    /// Current lifecycle state.
    pub fn state(&self) -> EncoderState {
        self.state
    }

    /// Whether the PNG stream is complete.
    pub fn is_finished(&self) -> bool {
        self.state == EncoderState::Finished
    }

    /// Fraction of pipeline chunks written to the sink, from 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        if self.plan.is_empty() {
            return 1.0;
        }
        self.chunks_emitted as f64 / self.plan.len() as f64
    }

    /// Image being encoded.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Rows consumed so far.
    pub fn rows_written(&self) -> u32 {
        self.rows_read
    }

    /// Wait for in-flight tasks, then drop buffers and the compression
    /// stream. Legal in every state except Released, including after a
    /// failure.
    pub fn release(&mut self) -> Result<()> {
        if self.state == EncoderState::Released {
            return Err(Error::InvalidState {
                operation: "release",
                state: self.state,
            });
        }
        let abandoned = self.running;
        self.drain_workers();
        self.filtered.clear();
        self.compressed.clear();
        self.pending = None;
        self.previous = None;
        self.stream = None;
        self.assembler.release_buffers();
        debug!(
            "encoder released from {:?} ({abandoned} tasks drained)",
            self.state
        );
        self.state = EncoderState::Released;
        Ok(())
    }

    fn require(&self, operation: &'static str, allowed: &[EncoderState]) -> Result<()> {
        match self.state {
            EncoderState::Poisoned(kind) => Err(Error::Poisoned(kind)),
            state if allowed.contains(&state) => Ok(()),
            state => Err(Error::InvalidState { operation, state }),
        }
    }

    /// I/O and internal failures are always fatal; once streaming has
    /// started, so is every other error.
    fn poison_on_failure<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if matches!(self.state, EncoderState::Poisoned(_) | EncoderState::Released) {
                return result;
            }
            let kind = err.kind();
            let streaming = matches!(
                self.state,
                EncoderState::Streaming | EncoderState::Finished
            );
            if streaming || matches!(kind, ErrorKind::Io | ErrorKind::Internal) {
                warn!("encoder poisoned: {err}");
                self.state = EncoderState::Poisoned(kind);
            }
        }
        result
    }

    /// Block until every dispatched task has reported back.
    fn drain_workers(&mut self) {
        while self.running > 0 {
            match self.rx.recv() {
                Ok(WorkerMessage::Failed(err)) => warn!("task failed during drain: {err}"),
                Ok(_) => {}
                Err(_) => break,
            }
            self.running -= 1;
        }
    }
}

impl<S: WriteSink> Encoder<'_, S> {
    fn try_write_header(&mut self) -> Result<()> {
        self.require("write header", &[EncoderState::Created])?;
        self.header.validate()?;
        let preamble = self.header.preamble();
        self.assembler.write_raw(&preamble)?;
        self.state = EncoderState::HeaderWritten;
        debug!("header written ({} bytes)", preamble.len());
        Ok(())
    }

    fn try_write_image<R: RowSource>(&mut self, source: &mut R) -> Result<()> {
        self.require("write image", &[EncoderState::HeaderWritten])?;
        self.state = EncoderState::Streaming;
        self.pull_rows(source)
    }

    fn try_write_rows(&mut self, rows: &[u8]) -> Result<()> {
        self.require(
            "write rows",
            &[EncoderState::HeaderWritten, EncoderState::Streaming],
        )?;
        if rows.len() % self.stride != 0 {
            return Err(Error::PartialRow {
                stride: self.stride,
                len: rows.len(),
            });
        }
        let count = rows.len() / self.stride;
        if count > (self.header.height() - self.rows_read) as usize {
            return Err(Error::TooManyRows {
                height: self.header.height(),
            });
        }
        if count == 0 {
            return Ok(());
        }
        self.state = EncoderState::Streaming;
        rows.chunks_exact(self.stride).try_for_each(|row| self.process_row(row))
    }

    fn try_finish(&mut self) -> Result<()> {
        self.require("finish", &[EncoderState::Streaming])?;
        if self.rows_read < self.header.height() {
            return Err(Error::InvalidState {
                operation: "finish",
                state: self.state,
            });
        }
        self.drain_and_close()?;
        self.state = EncoderState::Finished;
        debug!(
            "encoding finished: {} chunks, {} bytes written",
            self.chunks_emitted,
            self.assembler.bytes_written()
        );
        Ok(())
    }

    fn pull_rows<R: RowSource>(&mut self, source: &mut R) -> Result<()> {
        let mut row = vec![0u8; self.stride];
        while self.rows_read < self.header.height() {
            let read = source.read_row(&mut row)?;
            if read < self.stride {
                return Err(Error::ShortRead {
                    row: self.rows_read,
                    expected: self.stride,
                    read,
                });
            }
            self.process_row(&row)?;
        }
        Ok(())
    }

    fn process_row(&mut self, row: &[u8]) -> Result<()> {
        if self.pending.is_none() {
            let span = self
                .plan
                .span(self.chunks_dispatched)
                .ok_or(Error::Pipeline("row past the last planned chunk"))?;
            self.pending = Some(PixelChunk::new(span, self.stride));
        }
        let full = match self.pending.as_mut() {
            Some(chunk) => {
                chunk.push_row(row);
                chunk.is_full()
            }
            None => return Err(Error::Pipeline("no chunk accepting rows")),
        };
        self.rows_read += 1;
        if full {
            if let Some(chunk) = self.pending.take() {
                self.dispatch_filter(chunk)?;
            }
        }
        Ok(())
    }

    fn dispatch_filter(&mut self, chunk: PixelChunk) -> Result<()> {
        let index = chunk.index();
        let chunk = Arc::new(chunk);
        let previous = self.previous.replace(Arc::clone(&chunk));
        let (mode, bpp) = (self.filter_mode, self.bpp);
        let tx = self.tx.clone();
        self.pool.spawn(move || {
            let _ = tx.send(worker::run_filter(chunk, previous, mode, bpp));
        });
        self.running += 1;
        self.chunks_dispatched += 1;
        trace!("chunk {index} dispatched for filtering");

        while self.chunks_dispatched - self.chunks_emitted >= self.max_in_flight {
            self.pump(true)?;
        }
        self.pump(false)
    }

    /// Land worker results, keep the compression stream busy and emit every
    /// block that is next in sequence. With `block` set, waits for at least
    /// one result first.
    fn pump(&mut self, block: bool) -> Result<()> {
        if block {
            if self.running == 0 {
                return Err(Error::Pipeline("waiting for results with no tasks running"));
            }
            let message = self
                .rx
                .recv()
                .map_err(|_| Error::Pipeline("worker channel closed"))?;
            self.running -= 1;
            self.land(message)?;
        }
        while let Ok(message) = self.rx.try_recv() {
            self.running -= 1;
            self.land(message)?;
        }
        self.schedule_compression();
        self.emit_ready()
    }

    fn land(&mut self, message: WorkerMessage) -> Result<()> {
        match message {
            WorkerMessage::Filtered(chunk) => self.filtered.insert(chunk.index, chunk),
            WorkerMessage::Compressed { block, stream } => {
                self.stream = Some(stream);
                self.compressed.insert(block.index, block)
            }
            WorkerMessage::Failed(err) => Err(err),
        }
    }

    /// Hand the stream to the chunk at the compression cursor, if both are
    /// available.
    fn schedule_compression(&mut self) {
        let Some(stream) = self.stream.take() else {
            return;
        };
        match self.filtered.pop_ready() {
            Some(chunk) => {
                trace!("chunk {} dispatched for compression", chunk.index);
                let tx = self.tx.clone();
                self.pool.spawn(move || {
                    let _ = tx.send(worker::run_compress(stream, chunk));
                });
                self.running += 1;
            }
            None => self.stream = Some(stream),
        }
    }

    fn emit_ready(&mut self) -> Result<()> {
        while let Some(block) = self.compressed.pop_ready() {
            self.assembler.emit_block(block.index, &block.data)?;
            self.chunks_emitted += 1;
        }
        Ok(())
    }

    fn drain_and_close(&mut self) -> Result<()> {
        while self.chunks_emitted < self.plan.len() {
            self.pump(true)?;
        }
        let mut stream = self
            .stream
            .take()
            .ok_or(Error::Pipeline("compression stream missing at finish"))?;
        let mut trailer = Vec::new();
        stream.finish(&mut trailer)?;
        self.assembler.write_idat(&trailer)?;
        self.assembler.write_chunk(b"IEND", &[])?;
        self.assembler.flush()
    }
}

impl<S> Drop for Encoder<'_, S> {
    fn drop(&mut self) {
        if self.state != EncoderState::Released {
            self.drain_workers();
        }
    }
}

impl<S> std::fmt::Debug for Encoder<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("header", &self.header)
            .field("state", &self.state)
            .field("rows_read", &self.rows_read)
            .field("chunks", &self.plan.len())
            .field("chunks_emitted", &self.chunks_emitted)
            .finish()
    }
}

/// Adaptive selection brings nothing for palette indices and sub-byte
/// samples, where neighbouring bytes do not hold comparable values.
fn resolve_filter_mode(mode: FilterMode, header: &Header) -> FilterMode {
    match mode {
        FilterMode::Adaptive
            if header.color_type() == ColorType::Indexed || header.bit_depth() < 8 =>
        {
            FilterMode::Fixed(Filter::None)
        }
        mode => mode,
    }
}

/// Encode a whole in-memory image and return the PNG bytes.
///
/// `data` holds the raw rows back to back, `header.stride()` bytes each.
/// Input of the wrong length is rejected before anything is encoded.
pub fn encode(header: Header, data: &[u8], options: &Options, pool: &ThreadPool) -> Result<Vec<u8>> {
    let expected = header.image_bytes();
    if data.len() > expected {
        return Err(Error::TooManyRows {
            height: header.height(),
        });
    }
    if data.len() < expected {
        let stride = header.stride();
        return Err(Error::ShortRead {
            row: (data.len() / stride) as u32,
            expected: stride,
            read: data.len() % stride,
        });
    }
    let mut output = Vec::with_capacity(data.len() / 2 + 1024);
    {
        let mut encoder = Encoder::new(&mut output, pool, header, options)?;
        encoder.write_header()?;
        encoder.write_image(SliceRows::new(data))?;
        encoder.finish()?;
        encoder.release()?;
    }
    Ok(output)
}
