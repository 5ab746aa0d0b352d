//! # pngpipe
//!
//! A multithreaded, streaming PNG encoder.
//!
//! Raw scanlines are grouped into chunks of rows. Chunks are filtered in
//! parallel on a worker pool, fed in sequence order through a single zlib
//! stream and written out as IDAT chunks as soon as they are next in line,
//! so output starts flowing long before the last row arrives.
//!
//! ## Features
//!
//! - **All PNG color types and bit depths**, including indexed images with
//!   PLTE and tRNS
//! - **Fixed or adaptive filtering**, chosen per row
//! - **Deterministic output**: identical bytes for every thread count
//! - **Pull or push input** through [`RowSource`] or [`Encoder::write_rows`]
//! - **Any output** through [`WriteSink`]: memory, files, sockets, callbacks
//!
//! ## Example
//!
//! ```rust
//! use pngpipe::{encode, ColorType, Header, Options, ThreadPool};
//!
//! let pool = ThreadPool::new(Some(2)).unwrap();
//! let header = Header::new(2, 2, ColorType::TruecolorAlpha, 8).unwrap();
//! let pixels = vec![255u8; 16];
//!
//! let png = encode(header, &pixels, &Options::default(), &pool).unwrap();
//! assert_eq!(&png[1..4], b"PNG");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod color;
pub mod compress;
pub mod encoder;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod png;
pub mod pool;

pub use color::ColorType;
pub use compress::{CompressStream, ZlibStream};
pub use encoder::{encode, Encoder, EncoderState};
pub use error::{Error, ErrorKind, Result};
pub use io::{FnRowSource, FnSink, IoSink, ReaderRows, RowSource, SliceRows, WriteSink};
pub use png::{CompressionLevel, Filter, FilterMode, FlushPolicy, Header, Options};
pub use pool::ThreadPool;
