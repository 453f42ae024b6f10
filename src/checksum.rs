use byteorder::{ByteOrder, LittleEndian};

/// Sums the payload as little-endian 16-bit words, truncated to 16 bits.
/// A lone trailing byte is added as its byte value. The same sum covers
/// sector payloads (3968 bytes) and record substructures (48 bytes).
pub fn sum16(data: &[u8]) -> u16 {
    let mut checksum = 0u16;
    let mut chunks = data.chunks_exact(2);
    for word in &mut chunks {
        checksum = checksum.wrapping_add(LittleEndian::read_u16(word));
    }
    if let [byte] = chunks.remainder() {
        checksum = checksum.wrapping_add(*byte as u16);
    }

    checksum
}
