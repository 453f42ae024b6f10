use byteorder::{ByteOrder, LittleEndian};

use crate::checksum::sum16;
use crate::error::{Result, SaveError};
use crate::pk3::{self, PK3_SIZE_BOX, PK3_SIZE_PARTY};

pub const SECTOR_SIZE: usize = 0x1000;
pub const SECTOR_DATA_SIZE: usize = 3968;
pub const SECTORS_PER_SLOT: usize = 14;
pub const SLOT_SIZE: usize = SECTOR_SIZE * SECTORS_PER_SLOT;

const SECTOR_ID_OFFSET: usize = 0x0FF4;
const SECTOR_CHECKSUM_OFFSET: usize = 0x0FF6;
const SAVE_COUNTER_OFFSET: usize = 0x0FFC;

const SMALL_BUFFER_SIZE: usize = SECTOR_DATA_SIZE;
const LARGE_BUFFER_SIZE: usize = 4 * SECTOR_DATA_SIZE;
const STORAGE_BUFFER_SIZE: usize = 9 * SECTOR_DATA_SIZE;

// A slot counts as valid when at least half its sectors carry a footer
// checksum matching their payload.
const VALID_SECTOR_QUORUM: usize = 7;

pub const BOX_COUNT: usize = 14;
pub const BOX_CAPACITY: usize = 30;
pub const PARTY_CAPACITY: usize = 6;

// The team records live partway into the first large-buffer sector; the
// layout is not sector-aligned.
const PARTY_OFFSET: usize = 0x238;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Region {
    Party,
    Box,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordAddress {
    Party { slot: usize },
    Box { box_number: usize, slot: usize },
}

/// One loaded game save: the authoritative slot's sectors reassembled into
/// logical buffers, plus the raw slot image they came from so that
/// [`GameSave::export`] can reproduce an image of the original length.
pub struct GameSave {
    raw_slot: Vec<u8>,
    selected_slot: usize,
    slot_validity: Vec<usize>,
    small: Vec<u8>,
    large: Vec<u8>,
    storage: Vec<u8>,
}

impl GameSave {
    pub fn new(data: &[u8]) -> Result<Self> {
        if data.len() < SLOT_SIZE {
            log::debug!(
                "Save data of {} bytes is shorter than one slot ({SLOT_SIZE} bytes)",
                data.len()
            );
            return Err(SaveError::TooSmall { found: data.len() });
        }

        let slot_count = if data.len() >= 2 * SLOT_SIZE { 2 } else { 1 };
        let slot_validity = (0..slot_count)
            .map(|slot| count_valid_sectors(&data[slot * SLOT_SIZE..(slot + 1) * SLOT_SIZE]))
            .collect::<Vec<_>>();

        let selected_slot = select_slot(data, &slot_validity);
        let base = selected_slot * SLOT_SIZE;

        let mut save = GameSave {
            raw_slot: data[base..base + SLOT_SIZE].to_vec(),
            selected_slot,
            slot_validity,
            small: vec![0u8; SMALL_BUFFER_SIZE],
            large: vec![0u8; LARGE_BUFFER_SIZE],
            storage: vec![0u8; STORAGE_BUFFER_SIZE],
        };
        save.route_sectors();
        Ok(save)
    }

    /// Copies each sector's payload into the logical buffer its identity
    /// selects. Garbled identities and short windows are skipped, not
    /// fatal; a partially-populated save is reported through
    /// [`GameSave::is_slot_valid`] instead.
    fn route_sectors(&mut self) {
        for sector in 0..SECTORS_PER_SLOT {
            let offset = sector * SECTOR_SIZE;
            let Some(window) = self.raw_slot.get(offset..offset + SECTOR_SIZE) else {
                log::warn!("Sector {sector} overruns the save image, skipping");
                continue;
            };
            let id = LittleEndian::read_u16(&window[SECTOR_ID_OFFSET..SECTOR_ID_OFFSET + 2]);
            let payload = &window[..SECTOR_DATA_SIZE];
            match id {
                0 => self.small.copy_from_slice(payload),
                1..=4 => {
                    let start = (id as usize - 1) * SECTOR_DATA_SIZE;
                    self.large[start..start + SECTOR_DATA_SIZE].copy_from_slice(payload);
                }
                5..=13 => {
                    let start = (id as usize - 5) * SECTOR_DATA_SIZE;
                    self.storage[start..start + SECTOR_DATA_SIZE].copy_from_slice(payload);
                }
                _ => {
                    log::warn!("Sector {sector} carries invalid identity {id}, skipping");
                }
            }
        }
    }

    pub fn selected_slot(&self) -> usize {
        self.selected_slot
    }

    pub fn valid_sector_count(&self, slot: usize) -> Option<usize> {
        self.slot_validity.get(slot).copied()
    }

    pub fn is_slot_valid(&self, slot: usize) -> bool {
        self.valid_sector_count(slot)
            .map_or(false, |count| count >= VALID_SECTOR_QUORUM)
    }

    pub fn save_counter(&self) -> u32 {
        read_save_counter(&self.raw_slot)
    }

    /// The trainer/system region, handed out raw for field-level decoders.
    pub fn trainer_data(&self) -> &[u8] {
        &self.small
    }

    pub fn get_box(&self, box_number: usize, slot: usize) -> Result<Option<[u8; PK3_SIZE_BOX]>> {
        let offset = box_slot_offset(box_number, slot)?;
        let window = self
            .storage
            .get(offset..offset + PK3_SIZE_BOX)
            .ok_or(SaveError::Truncated)?;
        let mut raw = [0u8; PK3_SIZE_BOX];
        raw.copy_from_slice(window);
        pk3::decrypt(&raw)
    }

    pub fn get_party(&self, slot: usize) -> Result<Option<[u8; PK3_SIZE_BOX]>> {
        let offset = party_slot_offset(slot)?;
        let window = self
            .large
            .get(offset..offset + PK3_SIZE_PARTY)
            .ok_or(SaveError::Truncated)?;
        let mut raw = [0u8; PK3_SIZE_BOX];
        raw.copy_from_slice(&window[..PK3_SIZE_BOX]);
        pk3::decrypt(&raw)
    }

    pub fn put_box(
        &mut self,
        box_number: usize,
        slot: usize,
        record: &[u8; PK3_SIZE_BOX],
    ) -> Result<()> {
        let offset = box_slot_offset(box_number, slot)?;
        let encrypted = pk3::encrypt(record)?;
        self.storage
            .get_mut(offset..offset + PK3_SIZE_BOX)
            .ok_or(SaveError::Truncated)?
            .copy_from_slice(&encrypted);
        Ok(())
    }

    pub fn put_party(&mut self, slot: usize, record: &[u8; PK3_SIZE_BOX]) -> Result<()> {
        let offset = party_slot_offset(slot)?;
        let encrypted = pk3::encrypt(record)?;
        let window = self
            .large
            .get_mut(offset..offset + PK3_SIZE_PARTY)
            .ok_or(SaveError::Truncated)?;
        window[..PK3_SIZE_BOX].copy_from_slice(&encrypted);
        // The trailing battle-state fields get regenerated by the game.
        window[PK3_SIZE_BOX..].fill(0);
        Ok(())
    }

    pub fn take_box(
        &mut self,
        box_number: usize,
        slot: usize,
    ) -> Result<Option<[u8; PK3_SIZE_BOX]>> {
        let record = self.get_box(box_number, slot)?;
        if record.is_some() {
            let offset = box_slot_offset(box_number, slot)?;
            self.storage[offset..offset + PK3_SIZE_BOX].fill(0);
        }
        Ok(record)
    }

    pub fn take_party(&mut self, slot: usize) -> Result<Option<[u8; PK3_SIZE_BOX]>> {
        let record = self.get_party(slot)?;
        if record.is_some() {
            let offset = party_slot_offset(slot)?;
            self.large[offset..offset + PK3_SIZE_PARTY].fill(0);
        }
        Ok(record)
    }

    /// Writes the record into the first empty address of the region, in
    /// slot order. A linear scan is fine at these region sizes; swap in an
    /// occupancy index here if they ever grow.
    pub fn deposit(
        &mut self,
        record: &[u8; PK3_SIZE_BOX],
        region: Region,
    ) -> Result<RecordAddress> {
        match region {
            Region::Box => {
                for box_number in 0..BOX_COUNT {
                    for slot in 0..BOX_CAPACITY {
                        let offset = box_slot_offset(box_number, slot)?;
                        let stored = self
                            .storage
                            .get(offset..offset + PK3_SIZE_BOX)
                            .ok_or(SaveError::Truncated)?;
                        if pk3::pid(stored) == 0 {
                            self.put_box(box_number, slot, record)?;
                            return Ok(RecordAddress::Box { box_number, slot });
                        }
                    }
                }
            }
            Region::Party => {
                for slot in 0..PARTY_CAPACITY {
                    let offset = party_slot_offset(slot)?;
                    let stored = self
                        .large
                        .get(offset..offset + PK3_SIZE_PARTY)
                        .ok_or(SaveError::Truncated)?;
                    if pk3::pid(stored) == 0 {
                        self.put_party(slot, record)?;
                        return Ok(RecordAddress::Party { slot });
                    }
                }
            }
        }

        Err(SaveError::RegionFull)
    }

    /// Reassembles a flat image of the selected slot: every sector whose
    /// identity routes to a logical buffer gets its payload written back
    /// and its footer restamped with identity and a fresh checksum.
    /// Sectors with garbled identities pass through as loaded, which
    /// keeps repeated exports byte-identical.
    pub fn export(&self) -> Vec<u8> {
        let mut image = self.raw_slot.clone();
        for sector in 0..SECTORS_PER_SLOT {
            let offset = sector * SECTOR_SIZE;
            let window = &mut image[offset..offset + SECTOR_SIZE];
            let id = LittleEndian::read_u16(&window[SECTOR_ID_OFFSET..SECTOR_ID_OFFSET + 2]);
            let Some(payload) = self.payload_for_identity(id) else {
                continue;
            };
            window[..SECTOR_DATA_SIZE].copy_from_slice(payload);
            let checksum = sum16(&window[..SECTOR_DATA_SIZE]);
            LittleEndian::write_u16(&mut window[SECTOR_ID_OFFSET..SECTOR_ID_OFFSET + 2], id);
            LittleEndian::write_u16(
                &mut window[SECTOR_CHECKSUM_OFFSET..SECTOR_CHECKSUM_OFFSET + 2],
                checksum,
            );
        }

        image
    }

    fn payload_for_identity(&self, id: u16) -> Option<&[u8]> {
        let id = id as usize;
        match id {
            0 => Some(&self.small[..]),
            1..=4 => {
                let start = (id - 1) * SECTOR_DATA_SIZE;
                Some(&self.large[start..start + SECTOR_DATA_SIZE])
            }
            5..=13 => {
                let start = (id - 5) * SECTOR_DATA_SIZE;
                Some(&self.storage[start..start + SECTOR_DATA_SIZE])
            }
            _ => None,
        }
    }
}

pub fn box_offset(box_number: usize) -> Result<usize> {
    if box_number >= BOX_COUNT {
        return Err(SaveError::OutOfRange);
    }
    Ok(box_number * BOX_CAPACITY * PK3_SIZE_BOX)
}

pub fn box_slot_offset(box_number: usize, slot: usize) -> Result<usize> {
    if slot >= BOX_CAPACITY {
        return Err(SaveError::OutOfRange);
    }
    Ok(box_offset(box_number)? + slot * PK3_SIZE_BOX)
}

pub const fn party_offset() -> usize {
    PARTY_OFFSET
}

pub fn party_slot_offset(slot: usize) -> Result<usize> {
    if slot >= PARTY_CAPACITY {
        return Err(SaveError::OutOfRange);
    }
    Ok(PARTY_OFFSET + slot * PK3_SIZE_PARTY)
}

fn count_valid_sectors(slot_data: &[u8]) -> usize {
    (0..SECTORS_PER_SLOT)
        .filter(|sector| {
            let offset = sector * SECTOR_SIZE;
            match slot_data.get(offset..offset + SECTOR_SIZE) {
                Some(window) => {
                    let stored = LittleEndian::read_u16(
                        &window[SECTOR_CHECKSUM_OFFSET..SECTOR_CHECKSUM_OFFSET + 2],
                    );
                    stored == sum16(&window[..SECTOR_DATA_SIZE])
                }
                None => false,
            }
        })
        .count()
}

// The counter is read relative to the slot's base, the way the game reads
// it back: whichever sector sits first physically carries the value that
// decides slot recency.
fn read_save_counter(slot_data: &[u8]) -> u32 {
    LittleEndian::read_u32(&slot_data[SAVE_COUNTER_OFFSET..SAVE_COUNTER_OFFSET + 4])
}

fn select_slot(data: &[u8], slot_validity: &[usize]) -> usize {
    let valid = |slot: usize| {
        slot_validity
            .get(slot)
            .map_or(false, |count| *count >= VALID_SECTOR_QUORUM)
    };

    match (valid(0), valid(1)) {
        (false, true) => 1,
        (true, true) => {
            let counter_a = read_save_counter(&data[..SLOT_SIZE]);
            let counter_b = read_save_counter(&data[SLOT_SIZE..2 * SLOT_SIZE]);
            if counter_b > counter_a {
                1
            } else {
                0
            }
        }
        // Neither slot checking out still loads slot 0 as a best effort;
        // callers can see the tally through is_slot_valid.
        (true, false) | (false, false) => 0,
    }
}
