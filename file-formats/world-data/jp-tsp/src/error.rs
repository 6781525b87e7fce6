use std::io;
use thiserror::Error;

/// Error types for TSP level geometry parsing
#[derive(Error, Debug)]
pub enum TspError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Binary read error: {0}")]
    Binary(String),

    #[error("Unknown primitive tag {tag} in node {node}")]
    UnknownPrimitive { node: usize, tag: u16 },

    #[error("Invalid count for {field}: {value}")]
    InvalidCount { field: &'static str, value: i64 },

    #[error("Invalid offset for {field}: {value}")]
    InvalidOffset { field: &'static str, value: i64 },

    #[error("Invalid reference: {field} value {value} exceeds maximum {max}")]
    InvalidReference {
        field: &'static str,
        value: i64,
        max: usize,
    },

    #[error("Invalid dynamic face effect: {0}")]
    InvalidEffect(u8),
}

impl From<binrw::Error> for TspError {
    fn from(err: binrw::Error) -> Self {
        match err {
            binrw::Error::Io(e) => Self::Io(e),
            binrw::Error::Backtrace(bt) => Self::from(*bt.error),
            other => Self::Binary(other.to_string()),
        }
    }
}

/// Result type for TSP operations
pub type Result<T> = std::result::Result<T, TspError>;
