//! Synthetic test image generation.
//!
//! Every generator returns raw rows for a given [`Header`], packed the way
//! the encoder expects them: `header.stride()` bytes per row, samples
//! big-endian, sub-byte samples packed from the most significant bit.

#![allow(dead_code)]

use pngpipe::{ColorType, Header};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Every valid (color type, bit depth) combination.
pub const ALL_FORMATS: [(ColorType, u8); 15] = [
    (ColorType::Grayscale, 1),
    (ColorType::Grayscale, 2),
    (ColorType::Grayscale, 4),
    (ColorType::Grayscale, 8),
    (ColorType::Grayscale, 16),
    (ColorType::Truecolor, 8),
    (ColorType::Truecolor, 16),
    (ColorType::Indexed, 1),
    (ColorType::Indexed, 2),
    (ColorType::Indexed, 4),
    (ColorType::Indexed, 8),
    (ColorType::GrayscaleAlpha, 8),
    (ColorType::GrayscaleAlpha, 16),
    (ColorType::TruecolorAlpha, 8),
    (ColorType::TruecolorAlpha, 16),
];

/// Header for `width` x `height`, with a full-size palette for indexed types.
pub fn header(width: u32, height: u32, color_type: ColorType, bit_depth: u8) -> Header {
    let header = Header::new(width, height, color_type, bit_depth).unwrap();
    if color_type == ColorType::Indexed {
        header.with_palette(palette(bit_depth)).unwrap()
    } else {
        header
    }
}

/// Palette with `1 << bit_depth` distinct entries.
pub fn palette(bit_depth: u8) -> Vec<[u8; 3]> {
    let entries = 1usize << bit_depth;
    (0..entries)
        .map(|i| {
            let v = (i * 255 / (entries - 1).max(1)) as u8;
            [v, 255 - v, v / 2]
        })
        .collect()
}

/// Sample values varying smoothly along x and y, masked to the bit depth.
pub fn gradient(header: &Header) -> Vec<u8> {
    let mask = sample_mask(header);
    pack(header, |x, y, c| {
        (x as u32 * 7 + y as u32 * 3 + c as u32 * 50) & mask
    })
}

/// Alternating cells of minimum and maximum samples.
pub fn checkerboard(header: &Header, cell_size: usize) -> Vec<u8> {
    let mask = sample_mask(header);
    let cell = cell_size.max(1);
    pack(header, |x, y, _| {
        if (x / cell + y / cell) % 2 == 0 {
            mask
        } else {
            0
        }
    })
}

/// Uniform random samples from a seeded generator.
pub fn noise(header: &Header, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mask = sample_mask(header);
    pack(header, |_, _, _| rng.gen::<u32>() & mask)
}

/// Random bytes of exactly `header.image_bytes()`, ignoring sample layout.
pub fn random_bytes(header: &Header, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; header.image_bytes()];
    rng.fill(&mut data[..]);
    data
}

/// Horizontal stripes of `stripe_height` rows.
pub fn stripes(header: &Header, stripe_height: usize) -> Vec<u8> {
    let mask = sample_mask(header);
    let stripe = stripe_height.max(1);
    pack(header, |_, y, c| {
        if (y / stripe) % 2 == 0 {
            mask >> c.min(3)
        } else {
            0
        }
    })
}

/// Largest sample value for the header's bit depth. Indexed images are
/// limited to valid palette indices.
fn sample_mask(header: &Header) -> u32 {
    match header.palette() {
        Some(palette) if header.color_type() == ColorType::Indexed => {
            (palette.len() as u32 - 1).min((1 << header.bit_depth()) - 1)
        }
        _ => (1u32 << header.bit_depth()) - 1,
    }
}

/// Pack `sample(x, y, channel)` into raw rows.
fn pack(header: &Header, mut sample: impl FnMut(usize, usize, usize) -> u32) -> Vec<u8> {
    let width = header.width() as usize;
    let height = header.height() as usize;
    let channels = header.color_type().channels();
    let depth = header.bit_depth() as usize;
    let stride = header.stride();
    let mut data = vec![0u8; stride * height];

    for y in 0..height {
        let row = &mut data[y * stride..(y + 1) * stride];
        let mut bit = 0usize;
        for x in 0..width {
            for c in 0..channels {
                let value = sample(x, y, c);
                match depth {
                    16 => {
                        row[bit / 8..bit / 8 + 2].copy_from_slice(&(value as u16).to_be_bytes());
                    }
                    8 => row[bit / 8] = value as u8,
                    _ => {
                        let shift = 8 - depth - bit % 8;
                        row[bit / 8] |= ((value as u8) & ((1 << depth) - 1)) << shift;
                    }
                }
                bit += depth;
            }
        }
    }
    data
}
