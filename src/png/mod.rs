//! PNG format pieces: the image header, chunk framing, filters and options.
//!
//! Implements the parts of the PNG specification (RFC 2083) an encoder
//! needs. The streaming pipeline that drives them lives in
//! [`crate::pipeline`] and [`crate::encoder`].

pub mod chunk;
pub mod filter;
pub mod options;

pub use filter::{Filter, FilterMode};
pub use options::{CompressionLevel, FlushPolicy, Options};

use crate::color::ColorType;
use crate::error::{Error, Result};

/// PNG file signature (magic bytes).
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Largest width or height PNG can store.
pub const MAX_DIMENSION: u32 = (1 << 31) - 1;

/// Image descriptor: dimensions, pixel format and optional palette data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    width: u32,
    height: u32,
    color_type: ColorType,
    bit_depth: u8,
    palette: Option<Vec<[u8; 3]>>,
    transparency: Option<Vec<u8>>,
}

impl Header {
    /// Create a validated header.
    ///
    /// Indexed images additionally need [`Header::with_palette`] before they
    /// can be written.
    pub fn new(width: u32, height: u32, color_type: ColorType, bit_depth: u8) -> Result<Self> {
        validate_dimensions(width, height)?;
        if !color_type.is_valid_bit_depth(bit_depth) {
            return Err(Error::InvalidBitDepth {
                color_type,
                bit_depth,
            });
        }
        Ok(Self {
            width,
            height,
            color_type,
            bit_depth,
            palette: None,
            transparency: None,
        })
    }

    /// Attach a PLTE palette.
    ///
    /// Required for [`ColorType::Indexed`], allowed as a suggested palette for
    /// truecolor types, rejected for grayscale types.
    pub fn with_palette(mut self, palette: Vec<[u8; 3]>) -> Result<Self> {
        match self.color_type {
            ColorType::Grayscale | ColorType::GrayscaleAlpha => {
                return Err(Error::InvalidPalette("grayscale images cannot carry a palette"));
            }
            _ => {}
        }
        if palette.is_empty() {
            return Err(Error::InvalidPalette("palette must have at least one entry"));
        }
        let max_entries = match self.color_type {
            ColorType::Indexed => 1usize << self.bit_depth,
            _ => 256,
        };
        if palette.len() > max_entries.min(256) {
            return Err(Error::InvalidPalette(
                "palette has more entries than the bit depth can index",
            ));
        }
        if let Some(alpha) = &self.transparency {
            if self.color_type == ColorType::Indexed && alpha.len() > palette.len() {
                return Err(Error::InvalidTransparency(
                    "more alpha entries than palette entries",
                ));
            }
        }
        self.palette = Some(palette);
        Ok(self)
    }

    /// Attach tRNS transparency data.
    ///
    /// Indexed: one alpha byte per palette entry, up to the palette length.
    /// Grayscale: one 16-bit gray sample (2 bytes). Truecolor: one 16-bit RGB
    /// triple (6 bytes). Types with an alpha channel cannot carry tRNS.
    pub fn with_transparency(mut self, transparency: Vec<u8>) -> Result<Self> {
        match self.color_type {
            ColorType::Indexed => {
                if transparency.is_empty() {
                    return Err(Error::InvalidTransparency("alpha table is empty"));
                }
                if let Some(palette) = &self.palette {
                    if transparency.len() > palette.len() {
                        return Err(Error::InvalidTransparency(
                            "more alpha entries than palette entries",
                        ));
                    }
                } else if transparency.len() > 256 {
                    return Err(Error::InvalidTransparency("alpha table exceeds 256 entries"));
                }
            }
            ColorType::Grayscale => {
                if transparency.len() != 2 {
                    return Err(Error::InvalidTransparency(
                        "grayscale transparency must be exactly 2 bytes",
                    ));
                }
            }
            ColorType::Truecolor => {
                if transparency.len() != 6 {
                    return Err(Error::InvalidTransparency(
                        "truecolor transparency must be exactly 6 bytes",
                    ));
                }
            }
            ColorType::GrayscaleAlpha | ColorType::TruecolorAlpha => {
                return Err(Error::InvalidTransparency(
                    "color types with alpha cannot carry tRNS",
                ));
            }
        }
        self.transparency = Some(transparency);
        Ok(self)
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel color type.
    pub fn color_type(&self) -> ColorType {
        self.color_type
    }

    /// Bits per sample.
    pub fn bit_depth(&self) -> u8 {
        self.bit_depth
    }

    /// PLTE entries, if any.
    pub fn palette(&self) -> Option<&[[u8; 3]]> {
        self.palette.as_deref()
    }

    /// tRNS payload, if any.
    pub fn transparency(&self) -> Option<&[u8]> {
        self.transparency.as_deref()
    }

    /// Distance in bytes between corresponding samples of adjacent pixels,
    /// as used by the Sub, Average and Paeth filters. At least 1.
    pub fn bytes_per_pixel(&self) -> usize {
        (self.color_type.bits_per_pixel(self.bit_depth) / 8).max(1)
    }

    /// Bytes per raw (unfiltered) row.
    pub fn stride(&self) -> usize {
        (self.width as usize * self.color_type.bits_per_pixel(self.bit_depth)).div_ceil(8)
    }

    /// Total raw image bytes, saturating at `usize::MAX`.
    pub fn image_bytes(&self) -> usize {
        self.stride().saturating_mul(self.height as usize)
    }

    /// Re-check every invariant, including the palette requirement for
    /// indexed images.
    pub fn validate(&self) -> Result<()> {
        validate_dimensions(self.width, self.height)?;
        if !self.color_type.is_valid_bit_depth(self.bit_depth) {
            return Err(Error::InvalidBitDepth {
                color_type: self.color_type,
                bit_depth: self.bit_depth,
            });
        }
        if self.color_type == ColorType::Indexed && self.palette.is_none() {
            return Err(Error::InvalidPalette("indexed images require a palette"));
        }
        Ok(())
    }

    /// Serialized IHDR payload (13 bytes).
    pub(crate) fn ihdr_payload(&self) -> [u8; 13] {
        let mut ihdr = [0u8; 13];
        ihdr[0..4].copy_from_slice(&self.width.to_be_bytes());
        ihdr[4..8].copy_from_slice(&self.height.to_be_bytes());
        ihdr[8] = self.bit_depth;
        ihdr[9] = self.color_type.png_color_type();
        // Compression method 0 (DEFLATE), filter method 0, interlace 0.
        ihdr[10] = 0;
        ihdr[11] = 0;
        ihdr[12] = 0;
        ihdr
    }

    /// Signature plus IHDR, PLTE and tRNS chunks, ready to hand to a sink.
    pub(crate) fn preamble(&self) -> Vec<u8> {
        let mut output = Vec::with_capacity(64 + self.palette.as_ref().map_or(0, |p| p.len() * 3));
        output.extend_from_slice(&PNG_SIGNATURE);
        chunk::write_chunk(&mut output, b"IHDR", &self.ihdr_payload());
        if let Some(palette) = &self.palette {
            let plte: Vec<u8> = palette.iter().flatten().copied().collect();
            chunk::write_chunk(&mut output, b"PLTE", &plte);
        }
        if let Some(alpha) = &self.transparency {
            chunk::write_chunk(&mut output, b"tRNS", alpha);
        }
        output
    }
}

fn validate_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(Error::ImageTooLarge {
            width,
            height,
            max: MAX_DIMENSION,
        });
    }
    Ok(())
}
