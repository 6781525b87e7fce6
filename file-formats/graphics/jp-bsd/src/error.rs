use std::io;
use thiserror::Error;

use jp_tsp::TspError;

/// Error types for BSD scene descriptor parsing
#[derive(Error, Debug)]
pub enum BsdError {
    /// I/O error while reading the descriptor
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Non-I/O failure reported by the record reader
    #[error("Binary read error: {0}")]
    Binary(String),

    /// Embedded level geometry failed to parse
    #[error("Level geometry error: {0}")]
    Tsp(#[from] TspError),

    /// A record did not have the size the layout requires
    #[error("Record size mismatch for {field}: expected {expected} bytes, found {actual}")]
    RecordSizeMismatch {
        field: &'static str,
        expected: u64,
        actual: i64,
    },

    #[error("Invalid count for {field}: {value}")]
    InvalidCount { field: &'static str, value: i64 },

    /// A sentinel pad did not hold its fixed value
    #[error("Invalid padding in {field}: expected {expected:#06X}, found {actual:#06X}")]
    InvalidPadding {
        field: &'static str,
        expected: u16,
        actual: u16,
    },

    #[error("Invalid offset for {field}: {value}")]
    InvalidOffset { field: &'static str, value: i64 },

    #[error("Invalid reference: {field} value {value} exceeds maximum {max}")]
    InvalidReference {
        field: &'static str,
        value: i64,
        max: usize,
    },

    /// A bone links back to one of its ancestors
    #[error("Cyclic bone hierarchy at offset {offset}")]
    CyclicHierarchy { offset: i32 },

    /// A bone is linked from more than one parent
    #[error("Bone at offset {offset} has more than one parent")]
    SharedBone { offset: i32 },
}

impl From<binrw::Error> for BsdError {
    fn from(err: binrw::Error) -> Self {
        match err {
            binrw::Error::Io(e) => Self::Io(e),
            binrw::Error::Backtrace(bt) => Self::from(*bt.error),
            other => Self::Binary(other.to_string()),
        }
    }
}

/// Result type using BsdError
pub type Result<T> = std::result::Result<T, BsdError>;
