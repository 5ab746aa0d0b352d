//! Ordering and determinism of the parallel pipeline.
//!
//! Output must not depend on the worker count or on the order in which
//! chunk tasks complete.

mod support;

use std::sync::{Arc, Mutex};

use pngpipe::{
    encode, ColorType, CompressStream, CompressionLevel, Encoder, FilterMode, Header, Options,
    ReaderRows, Result, SliceRows, ThreadPool, ZlibStream,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use support::{chunks, init_logging, synthetic};

/// Compression stream that logs the size of every chunk it is fed.
struct Recorder {
    inner: ZlibStream,
    fed: Arc<Mutex<Vec<usize>>>,
}

impl CompressStream for Recorder {
    fn write(&mut self, data: &[u8], output: &mut Vec<u8>) -> Result<()> {
        self.fed.lock().unwrap().push(data.len());
        self.inner.write(data, output)
    }

    fn finish(&mut self, output: &mut Vec<u8>) -> Result<()> {
        self.inner.finish(output)
    }
}

#[test]
fn test_single_and_many_threads_agree() {
    init_logging();
    let one = ThreadPool::single_threaded().unwrap();
    let eight = ThreadPool::new(Some(8)).unwrap();
    let mut rng = StdRng::seed_from_u64(0x5EED);

    for (color_type, bit_depth) in synthetic::ALL_FORMATS {
        let width = rng.gen_range(1..80);
        let height = rng.gen_range(1..120);
        let header = synthetic::header(width, height, color_type, bit_depth);
        let pixels = synthetic::noise(&header, rng.gen());
        let options = Options {
            chunk_size: rng.gen_range(1..2_000),
            ..Options::default()
        };

        let a = encode(header.clone(), &pixels, &options, &one).unwrap();
        let b = encode(header, &pixels, &options, &eight).unwrap();
        assert_eq!(a, b, "{color_type:?}/{bit_depth} differs between 1 and 8 threads");
    }
}

#[test]
fn test_pool_serves_consecutive_sessions() {
    let pool = ThreadPool::new(Some(4)).unwrap();
    let header = Header::new(50, 50, ColorType::Truecolor, 8).unwrap();
    let pixels = synthetic::gradient(&header);
    let options = Options {
        chunk_size: 600,
        ..Options::default()
    };
    let first = encode(header.clone(), &pixels, &options, &pool).unwrap();
    for _ in 0..5 {
        assert_eq!(encode(header.clone(), &pixels, &options, &pool).unwrap(), first);
    }
    pool.release();
}

#[test]
fn test_stream_is_fed_every_chunk_once_in_order() {
    let pool = ThreadPool::new(Some(6)).unwrap();
    // 10 rows of 31 bytes, 3 rows per chunk: 4 chunks, the last with 1 row.
    let header = Header::new(31, 10, ColorType::Grayscale, 8).unwrap();
    let pixels = synthetic::noise(&header, 3);
    let options = Options {
        chunk_size: 31 * 3,
        ..Options::default()
    };
    let fed = Arc::new(Mutex::new(Vec::new()));
    let stream = Box::new(Recorder {
        inner: ZlibStream::new(CompressionLevel::Default),
        fed: Arc::clone(&fed),
    });

    let mut out = Vec::new();
    {
        let mut encoder =
            Encoder::with_stream(&mut out, &pool, header.clone(), &options, stream).unwrap();
        encoder.write_header().unwrap();
        encoder.write_image(SliceRows::new(&pixels)).unwrap();
        encoder.finish().unwrap();
        encoder.release().unwrap();
    }

    assert_eq!(*fed.lock().unwrap(), vec![3 * 32, 3 * 32, 3 * 32, 32]);
    assert_eq!(out, encode(header, &pixels, &options, &pool).unwrap());
}

#[test]
fn test_single_row_image() {
    let pool = ThreadPool::new(Some(4)).unwrap();
    let header = Header::new(300, 1, ColorType::TruecolorAlpha, 8).unwrap();
    let pixels = synthetic::noise(&header, 11);
    let options = Options {
        chunk_size: 10,
        ..Options::default()
    };
    let png = encode(header, &pixels, &options, &pool).unwrap();

    let (info, decoded) = chunks::decode_identity(&png);
    assert_eq!(info.height, 1);
    assert_eq!(decoded, pixels);
}

#[test]
fn test_row_larger_than_chunk_size() {
    let pool = ThreadPool::new(Some(3)).unwrap();
    // 4000-byte rows against a 100-byte budget: one row per chunk.
    let header = Header::new(1000, 9, ColorType::TruecolorAlpha, 8).unwrap();
    let pixels = synthetic::gradient(&header);
    let options = Options {
        chunk_size: 100,
        filter_mode: FilterMode::Adaptive,
        ..Options::default()
    };
    let png = encode(header.clone(), &pixels, &options, &pool).unwrap();
    assert_eq!(chunks::decode_identity(&png).1, pixels);

    let whole = Options {
        chunk_size: header.image_bytes(),
        ..options
    };
    let single = encode(header, &pixels, &whole, &pool).unwrap();
    assert_eq!(chunks::decode_identity(&single).1, pixels);
    // Same filtered bytes either way; only the flush points differ.
    assert_eq!(
        chunks::inflate(&chunks::idat(&png)),
        chunks::inflate(&chunks::idat(&single))
    );
}

#[test]
fn test_reader_source_matches_slice_source() {
    let pool = ThreadPool::new(Some(2)).unwrap();
    let header = Header::new(17, 33, ColorType::GrayscaleAlpha, 16).unwrap();
    let pixels = synthetic::random_bytes(&header, 99);
    let options = Options {
        chunk_size: 256,
        ..Options::default()
    };

    let mut out = Vec::new();
    {
        let mut encoder = Encoder::new(&mut out, &pool, header.clone(), &options).unwrap();
        encoder.write_header().unwrap();
        encoder
            .write_image(ReaderRows::new(std::io::Cursor::new(&pixels)))
            .unwrap();
        encoder.finish().unwrap();
        assert_eq!(encoder.progress(), 1.0);
    }
    assert_eq!(out, encode(header, &pixels, &options, &pool).unwrap());
}

#[test]
fn test_backpressure_with_many_small_chunks() {
    let pool = ThreadPool::new(Some(2)).unwrap();
    let header = Header::new(8, 2_000, ColorType::Grayscale, 8).unwrap();
    let pixels = synthetic::stripes(&header, 5);
    let options = Options {
        chunk_size: 8,
        ..Options::default()
    };
    let png = encode(header, &pixels, &options, &pool).unwrap();
    assert_eq!(chunks::decode_identity(&png).1, pixels);
}
