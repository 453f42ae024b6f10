use byteorder::{ByteOrder, LittleEndian};

use crate::checksum::sum16;
use crate::error::{Result, SaveError};

pub const PK3_SIZE_BOX: usize = 80;
pub const PK3_SIZE_PARTY: usize = 100;

const OID_OFFSET: usize = 0x04;
const CHECKSUM_OFFSET: usize = 0x1C;
const SUBSTRUCTURE_OFFSET: usize = 0x20;
const SUBSTRUCTURE_SIZE: usize = 12;
const SUBSTRUCTURE_COUNT: usize = 4;

// Each row maps a destination substructure position to the source position it
// is copied from, keyed by the personality value mod 24. Decrypting indexes
// the table directly; encrypting indexes it through INVERSE_SHUFFLE, which
// names the row holding each row's inverse permutation.
static BLOCK_SHUFFLE: [[usize; SUBSTRUCTURE_COUNT]; 24] = [
    [0, 1, 2, 3],
    [0, 1, 3, 2],
    [0, 2, 1, 3],
    [0, 3, 1, 2],
    [0, 2, 3, 1],
    [0, 3, 2, 1],
    [1, 0, 2, 3],
    [1, 0, 3, 2],
    [2, 0, 1, 3],
    [3, 0, 1, 2],
    [2, 0, 3, 1],
    [3, 0, 2, 1],
    [1, 2, 0, 3],
    [1, 3, 0, 2],
    [2, 1, 0, 3],
    [3, 1, 0, 2],
    [2, 3, 0, 1],
    [3, 2, 0, 1],
    [1, 2, 3, 0],
    [1, 3, 2, 0],
    [2, 1, 3, 0],
    [3, 1, 2, 0],
    [2, 3, 1, 0],
    [3, 2, 1, 0],
];

static INVERSE_SHUFFLE: [usize; 24] = [
    0, 1, 2, 4, 3, 5, 6, 7, 12, 18, 13, 19, 8, 10, 14, 20, 16, 22, 9, 11, 15, 21, 17, 23,
];

/// Reads the personality value from the unencrypted header of a stored or
/// canonical record.
pub fn pid(record: &[u8]) -> u32 {
    LittleEndian::read_u32(&record[..4])
}

/// Converts a stored record into its canonical layout: the XOR keying is
/// undone over the substructure region, then the substructures are moved
/// back into their fixed order. Returns `Ok(None)` for an empty slot
/// (personality value of zero), which is not an error.
pub fn decrypt(raw: &[u8; PK3_SIZE_BOX]) -> Result<Option<[u8; PK3_SIZE_BOX]>> {
    let pid = pid(raw);
    if pid == 0 {
        return Ok(None);
    }
    let oid = LittleEndian::read_u32(&raw[OID_OFFSET..OID_OFFSET + 4]);

    let mut record = *raw;
    xor_substructures(&mut record, pid ^ oid);

    let order = BLOCK_SHUFFLE
        .get((pid % 24) as usize)
        .ok_or(SaveError::MalformedRecord)?;
    let shuffled = record;
    for (dest, &src) in order.iter().enumerate() {
        copy_substructure(&mut record, dest, &shuffled, src)?;
    }

    Ok(Some(record))
}

/// Converts a canonical record back into its stored layout, the exact
/// inverse of [`decrypt`]. The record checksum is recomputed over the
/// canonical substructure bytes and stamped into the header before the
/// shuffle and XOR keying are applied.
pub fn encrypt(plain: &[u8; PK3_SIZE_BOX]) -> Result<[u8; PK3_SIZE_BOX]> {
    let pid = pid(plain);
    let oid = LittleEndian::read_u32(&plain[OID_OFFSET..OID_OFFSET + 4]);
    let checksum = sum16(&plain[SUBSTRUCTURE_OFFSET..]);

    let mut record = *plain;
    LittleEndian::write_u16(
        &mut record[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2],
        checksum,
    );

    let inverse_sv = *INVERSE_SHUFFLE
        .get((pid % 24) as usize)
        .ok_or(SaveError::MalformedRecord)?;
    let order = BLOCK_SHUFFLE
        .get(inverse_sv)
        .ok_or(SaveError::MalformedRecord)?;
    let unshuffled = record;
    for (dest, &src) in order.iter().enumerate() {
        copy_substructure(&mut record, dest, &unshuffled, src)?;
    }

    xor_substructures(&mut record, pid ^ oid);
    Ok(record)
}

fn xor_substructures(record: &mut [u8; PK3_SIZE_BOX], key: u32) {
    for idx in (SUBSTRUCTURE_OFFSET..PK3_SIZE_BOX).step_by(4) {
        let word = LittleEndian::read_u32(&record[idx..idx + 4]);
        LittleEndian::write_u32(&mut record[idx..idx + 4], word ^ key);
    }
}

fn copy_substructure(
    record: &mut [u8; PK3_SIZE_BOX],
    dest: usize,
    source: &[u8; PK3_SIZE_BOX],
    src: usize,
) -> Result<()> {
    if dest >= SUBSTRUCTURE_COUNT || src >= SUBSTRUCTURE_COUNT {
        return Err(SaveError::MalformedRecord);
    }
    let dest_offset = SUBSTRUCTURE_OFFSET + dest * SUBSTRUCTURE_SIZE;
    let src_offset = SUBSTRUCTURE_OFFSET + src * SUBSTRUCTURE_SIZE;
    record[dest_offset..dest_offset + SUBSTRUCTURE_SIZE]
        .copy_from_slice(&source[src_offset..src_offset + SUBSTRUCTURE_SIZE]);
    Ok(())
}
