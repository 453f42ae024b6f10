use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SaveError {
    #[error("save data too small: found {found} bytes, need at least one slot")]
    TooSmall { found: usize },
    #[error("box or slot index outside the valid range")]
    OutOfRange,
    #[error("no empty slot left in the region")]
    RegionFull,
    #[error("record substructure shuffle index out of bounds")]
    MalformedRecord,
    #[error("computed record window exceeds the logical buffer")]
    Truncated,
}

pub type Result<T> = std::result::Result<T, SaveError>;
