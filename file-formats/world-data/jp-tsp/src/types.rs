//! Small fixed-layout records shared by the level geometry sections

use binrw::BinRead;

/// A 16-bit integer position, followed by a pad word on disk (8 bytes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct TspVertex {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub pad: i16,
}

impl TspVertex {
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z, pad: 0 }
    }
}

/// RGBA vertex colour (4 bytes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Texture coordinate pair in texture-page texels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct Uv {
    pub u: u8,
    pub v: u8,
}

/// Axis-aligned bounding box stored as two 16-bit corners
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct BoundingBox {
    pub min: [i16; 3],
    pub max: [i16; 3],
}

impl BoundingBox {
    /// Check whether a point lies inside the box (inclusive)
    pub fn contains(&self, point: [i16; 3]) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_contains() {
        let bbox = BoundingBox {
            min: [-10, 0, -10],
            max: [10, 5, 10],
        };
        assert!(bbox.contains([0, 0, 0]));
        assert!(bbox.contains([10, 5, -10]));
        assert!(!bbox.contains([11, 0, 0]));
        assert!(!bbox.contains([0, -1, 0]));
    }
}
