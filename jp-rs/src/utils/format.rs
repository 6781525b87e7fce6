//! Formatting utilities

use humansize::{DECIMAL, format_size};
use jp_bsd::section::is_present;

/// Format file size in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    format_size(bytes, DECIMAL)
}

/// Format a header-relative offset, showing `-` when the resource is absent
pub fn format_offset(offset: i32) -> String {
    if is_present(offset) {
        offset.to_string()
    } else {
        "-".to_string()
    }
}

/// Format a 1/4096 fixed-point value
pub fn format_fixed(value: i32) -> String {
    format!("{:.4}", value as f32 / 4096.0)
}

/// Format a point as `(x, y, z)` with one decimal
pub fn format_point(x: f32, y: f32, z: f32) -> String {
    format!("({x:.1}, {y:.1}, {z:.1})")
}
