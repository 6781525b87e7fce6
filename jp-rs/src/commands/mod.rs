//! Command implementations for each file format

pub mod bsd;
pub mod tsp;
