//! Fixed-layout records shared across the scene descriptor

use binrw::BinRead;
use bitflags::bitflags;
use glam::Vec3;

/// Integer vertex position followed by a pad word (8 bytes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct BsdVertex {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub pad: i16,
}

impl BsdVertex {
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z, pad: 0 }
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(f32::from(self.x), f32::from(self.y), f32::from(self.z))
    }
}

/// Packet colour with components in the 0..=127 range (4 bytes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct BsdColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub pad: u8,
}

impl BsdColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, pad: 0 }
    }

    /// Expand every component to the 0..=255 range
    pub fn remapped(self) -> Self {
        Self {
            r: remap_color_component(self.r),
            g: remap_color_component(self.g),
            b: remap_color_component(self.b),
            pad: self.pad,
        }
    }
}

/// Map a 0..=127 colour component to 0..=255.
///
/// Integer division happens before the multiply, so anything under 127 maps
/// to 0. Values past 127 saturate at 255.
pub fn remap_color_component(value: u8) -> u8 {
    (u32::from(value) / 127 * 255).min(255) as u8
}

/// Texture coordinate in texels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct BsdUv {
    pub u: u8,
    pub v: u8,
}

bitflags! {
    /// Texture page descriptor carried by textured faces
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
    pub struct TexInfo: u16 {
        /// VRAM texture page
        const PAGE = 0x001F;
        /// Semi-transparency blend rate
        const ABR = 0x0060;
        /// Colour mode (4-bit, 8-bit or direct)
        const COLOR_MODE = 0x0180;
    }
}

impl TexInfo {
    pub fn texture_page(self) -> u16 {
        (self & Self::PAGE).bits()
    }

    pub fn abr_rate(self) -> u16 {
        (self & Self::ABR).bits() >> 5
    }

    pub fn color_mode(self) -> u16 {
        (self & Self::COLOR_MODE).bits() >> 7
    }
}

/// Palette position in VRAM as `(x, y)` for a CLUT word
pub fn clut_position(clut: u16) -> (u16, u16) {
    ((clut << 4) & 0x3F0, (clut >> 6) & 0x1FF)
}
