//! Helpers for inspecting encoded PNG streams.

#![allow(dead_code)]

use std::io::Read;

/// PNG file signature.
pub const SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// One parsed chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    pub kind: [u8; 4],
    pub data: Vec<u8>,
    pub crc: u32,
}

impl RawChunk {
    /// Whether the stored CRC matches type and payload.
    pub fn crc_ok(&self) -> bool {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.kind);
        hasher.update(&self.data);
        hasher.finalize() == self.crc
    }
}

/// Split a PNG stream into its chunks. Panics on malformed input.
pub fn parse(png: &[u8]) -> Vec<RawChunk> {
    assert_eq!(&png[..8], &SIGNATURE, "missing PNG signature");
    let mut chunks = Vec::new();
    let mut pos = 8;
    while pos < png.len() {
        let len = u32::from_be_bytes(png[pos..pos + 4].try_into().unwrap()) as usize;
        let kind: [u8; 4] = png[pos + 4..pos + 8].try_into().unwrap();
        let data = png[pos + 8..pos + 8 + len].to_vec();
        let crc = u32::from_be_bytes(png[pos + 8 + len..pos + 12 + len].try_into().unwrap());
        chunks.push(RawChunk { kind, data, crc });
        pos += 12 + len;
    }
    assert_eq!(pos, png.len(), "trailing bytes after last chunk");
    chunks
}

/// Chunk type names in stream order.
pub fn kinds(png: &[u8]) -> Vec<String> {
    parse(png)
        .iter()
        .map(|c| String::from_utf8_lossy(&c.kind).into_owned())
        .collect()
}

/// Concatenated IDAT payloads.
pub fn idat(png: &[u8]) -> Vec<u8> {
    parse(png)
        .into_iter()
        .filter(|c| &c.kind == b"IDAT")
        .flat_map(|c| c.data)
        .collect()
}

/// Inflate a zlib stream.
pub fn inflate(zlib: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    flate2::read::ZlibDecoder::new(zlib)
        .read_to_end(&mut out)
        .expect("IDAT data is not a valid zlib stream");
    out
}

/// Decode with the `png` crate without any transformations, returning the
/// raw rows exactly as they were encoded.
pub fn decode_identity(png_bytes: &[u8]) -> (png::OutputInfo, Vec<u8>) {
    let mut decoder = png::Decoder::new(png_bytes);
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder.read_info().expect("png crate rejected header");
    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).expect("png crate rejected image data");
    buf.truncate(info.buffer_size());
    (info, buf)
}
