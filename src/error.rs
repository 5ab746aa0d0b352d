//! Error types for the pngpipe encoder.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::color::ColorType;
use crate::encoder::EncoderState;

/// Result type alias for pngpipe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error classification, stable across releases.
///
/// Callers that only need to log a code and bail out can match on this
/// instead of the individual [`Error`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid dimensions, color/bit-depth combination, palette or option.
    Configuration,
    /// Call made outside its legal lifecycle transition.
    InvalidState,
    /// Row source, write sink or flush failure, including short transfers.
    Io,
    /// Compression stream failure or a worker task fault.
    Internal,
}

impl ErrorKind {
    /// Numeric code for the kind. `0` is reserved for success.
    pub const fn code(self) -> i32 {
        match self {
            ErrorKind::Configuration => 1,
            ErrorKind::InvalidState => 2,
            ErrorKind::Io => 3,
            ErrorKind::Internal => 4,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::InvalidState => "invalid state",
            ErrorKind::Io => "I/O",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while configuring or driving an encoder.
#[derive(Debug, Error)]
pub enum Error {
    /// Width or height is zero.
    #[error("invalid image dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },

    /// Width or height exceeds what PNG can store.
    #[error("image {width}x{height} exceeds maximum dimension {max}")]
    ImageTooLarge {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
        /// Maximum supported dimension.
        max: u32,
    },

    /// Bit depth not allowed for the color type.
    #[error("bit depth {bit_depth} is not valid for {color_type:?}")]
    InvalidBitDepth {
        /// Requested color type.
        color_type: ColorType,
        /// Requested bit depth.
        bit_depth: u8,
    },

    /// Palette missing, empty, too long, or present where it is not allowed.
    #[error("invalid palette: {0}")]
    InvalidPalette(&'static str),

    /// Transparency data has the wrong shape for the color type.
    #[error("invalid transparency: {0}")]
    InvalidTransparency(&'static str),

    /// An encoder or pool option is out of range.
    #[error("invalid option: {0}")]
    InvalidOption(&'static str),

    /// Operation called in a lifecycle state that does not allow it.
    #[error("cannot {operation} while encoder is {state:?}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// State the encoder was in.
        state: EncoderState,
    },

    /// Row data supplied through the push API is not whole rows.
    #[error("row data must be a whole number of {stride}-byte rows, got {len} bytes")]
    PartialRow {
        /// Bytes per row.
        stride: usize,
        /// Bytes supplied.
        len: usize,
    },

    /// More rows were supplied than the image has.
    #[error("received more than {height} rows")]
    TooManyRows {
        /// Image height.
        height: u32,
    },

    /// Underlying I/O failure from a row source or write sink.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The sink accepted fewer bytes than requested.
    #[error("short write: {written} of {expected} bytes accepted")]
    ShortWrite {
        /// Bytes requested.
        expected: usize,
        /// Bytes the sink reported as written.
        written: usize,
    },

    /// The row source returned fewer bytes than a full row.
    #[error("short read on row {row}: {read} of {expected} bytes")]
    ShortRead {
        /// Zero-based image row.
        row: u32,
        /// Bytes per row.
        expected: usize,
        /// Bytes actually read.
        read: usize,
    },

    /// The session failed earlier and only `release` is allowed.
    #[error("encoder poisoned by an earlier {0} error")]
    Poisoned(ErrorKind),

    /// Compression stream failure.
    #[error("compression error: {0}")]
    Compression(String),

    /// A worker task panicked.
    #[error("worker task panicked: {0}")]
    WorkerPanicked(String),

    /// The thread pool could not be built.
    #[error("thread pool error: {0}")]
    ThreadPool(String),

    /// Pipeline bookkeeping reached an impossible state.
    #[error("pipeline fault: {0}")]
    Pipeline(&'static str),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidDimensions { .. }
            | Error::ImageTooLarge { .. }
            | Error::InvalidBitDepth { .. }
            | Error::InvalidPalette(_)
            | Error::InvalidTransparency(_)
            | Error::InvalidOption(_) => ErrorKind::Configuration,
            Error::InvalidState { .. } | Error::PartialRow { .. } | Error::TooManyRows { .. } => {
                ErrorKind::InvalidState
            }
            Error::Io(_) | Error::ShortWrite { .. } | Error::ShortRead { .. } => ErrorKind::Io,
            Error::Poisoned(kind) => *kind,
            Error::Compression(_)
            | Error::WorkerPanicked(_)
            | Error::ThreadPool(_)
            | Error::Pipeline(_) => ErrorKind::Internal,
        }
    }

    /// Numeric code of [`Error::kind`].
    pub fn code(&self) -> i32 {
        self.kind().code()
    }
}
