use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlockfitError {
    #[error("Invalid request: allocation size must be at least 1")]
    ZeroSizeRequest,

    #[error("Cell {cell} is already used")]
    CellAlreadyUsed { cell: u64 },

    #[error("Cell {cell} is not in use")]
    CellNotUsed { cell: u64 },

    #[error("Range overflows the address space: start {start}, size {size}")]
    RangeOverflow { start: u64, size: u64 },

    #[error("Handle issued by allocator {issued_by} freed in allocator {freed_in}")]
    ForeignHandle { issued_by: u64, freed_in: u64 },

    #[error("Handle {serial} is not live in allocator {allocator}")]
    StaleHandle { serial: u64, allocator: u64 },

    #[error("Internal inconsistency: {0}")]
    Inconsistent(String),

    #[error("Invalid bitmap text: unexpected character {0:?}")]
    InvalidBitmap(char),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] validator::ValidationErrors),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BlockfitError>;
