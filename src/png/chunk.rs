//! PNG chunk framing.

/// Bytes of framing around a chunk payload: length, type and CRC.
pub const CHUNK_OVERHEAD: usize = 12;

/// Append a PNG chunk (length, type, data, CRC32) to the output buffer.
///
/// The CRC covers the type and payload, not the length field.
pub fn write_chunk(output: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    output.reserve(CHUNK_OVERHEAD + data.len());

    let mut crc = crc32fast::Hasher::new();
    crc.update(chunk_type);
    crc.update(data);

    output.extend_from_slice(&(data.len() as u32).to_be_bytes());
    output.extend_from_slice(chunk_type);
    output.extend_from_slice(data);
    output.extend_from_slice(&crc.finalize().to_be_bytes());
}
