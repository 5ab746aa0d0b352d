//! PNG color types and their legal bit depths.

/// PNG color types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ColorType {
    /// Grayscale, one sample per pixel.
    Grayscale = 0,
    /// RGB, three samples per pixel.
    Truecolor = 2,
    /// Palette indices, one sample per pixel.
    Indexed = 3,
    /// Grayscale with alpha, two samples per pixel.
    GrayscaleAlpha = 4,
    /// RGBA, four samples per pixel.
    TruecolorAlpha = 6,
}

impl ColorType {
    /// Returns the number of samples (channels) per pixel.
    #[inline]
    pub const fn channels(self) -> usize {
        match self {
            ColorType::Grayscale | ColorType::Indexed => 1,
            ColorType::GrayscaleAlpha => 2,
            ColorType::Truecolor => 3,
            ColorType::TruecolorAlpha => 4,
        }
    }

    /// Returns the PNG color type value written to IHDR.
    #[inline]
    pub const fn png_color_type(self) -> u8 {
        self as u8
    }

    /// Bit depths the PNG format allows for this color type.
    pub const fn allowed_bit_depths(self) -> &'static [u8] {
        match self {
            ColorType::Grayscale => &[1, 2, 4, 8, 16],
            ColorType::Indexed => &[1, 2, 4, 8],
            ColorType::Truecolor | ColorType::GrayscaleAlpha | ColorType::TruecolorAlpha => {
                &[8, 16]
            }
        }
    }

    /// Whether `bit_depth` is legal for this color type.
    pub fn is_valid_bit_depth(self, bit_depth: u8) -> bool {
        self.allowed_bit_depths().contains(&bit_depth)
    }

    /// Whether pixels carry their own alpha sample.
    #[inline]
    pub const fn has_alpha(self) -> bool {
        matches!(self, ColorType::GrayscaleAlpha | ColorType::TruecolorAlpha)
    }

    /// Bits per pixel at the given depth.
    #[inline]
    pub const fn bits_per_pixel(self, bit_depth: u8) -> usize {
        self.channels() * bit_depth as usize
    }
}

impl TryFrom<u8> for ColorType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ColorType::Grayscale),
            2 => Ok(ColorType::Truecolor),
            3 => Ok(ColorType::Indexed),
            4 => Ok(ColorType::GrayscaleAlpha),
            6 => Ok(ColorType::TruecolorAlpha),
            other => Err(other),
        }
    }
}

impl From<ColorType> for u8 {
    fn from(color: ColorType) -> Self {
        color.png_color_type()
    }
}
