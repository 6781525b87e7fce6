//! Packed quaternion and translation codec
//!
//! Animation frames store bone rotations as 12-bit fixed-point quaternion
//! components packed into 32-bit words: two quaternions share three words,
//! and an odd trailing quaternion takes two. Components decode with arithmetic
//! shifts and are doubled, so every decoded component is even. One unit is
//! `1 / 4096`.
//!
//! # Algorithm
//!
//! 1. Split the word list into groups of three and decode a pair from each
//! 2. When the count is odd, decode one more quaternion from the last two words
//! 3. Frames without stored words are rebuilt by [`nlerp`] between the
//!    neighbours named by their interpolation byte

use glam::{Quat, Vec3, Vec4};

/// Fixed-point scale of quaternion components and translations
pub const FIXED_POINT_ONE: f32 = 4096.0;

/// Fixed-point quaternion as stored after decoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct Quaternion {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub w: i16,
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        x: 0,
        y: 0,
        z: 0,
        w: 4096,
    };

    pub const fn new(x: i16, y: i16, z: i16, w: i16) -> Self {
        Self { x, y, z, w }
    }

    /// Components scaled to floats, `(x, y, z, w)`
    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(
            f32::from(self.x),
            f32::from(self.y),
            f32::from(self.z),
            f32::from(self.w),
        ) / FIXED_POINT_ONE
    }

    /// Truncating conversion back to fixed point
    pub fn from_vec4(v: Vec4) -> Self {
        let v = v * FIXED_POINT_ONE;
        Self::new(v.x as i16, v.y as i16, v.z as i16, v.w as i16)
    }

    /// Normalised rotation; a zero quaternion becomes the identity
    pub fn to_quat(self) -> Quat {
        let v = self.to_vec4();
        let length = v.length();
        if length <= 0.0 {
            return Quat::IDENTITY;
        }
        Quat::from_vec4(v / length)
    }
}

/// Decode two quaternions from three packed words
pub fn decode_pair(p0: i32, p1: i32, p2: i32) -> (Quaternion, Quaternion) {
    (decode_single(p0, p1), decode_second(p1, p2))
}

/// Decode the first quaternion of a group; only two words are needed
pub fn decode_single(p0: i32, p1: i32) -> Quaternion {
    Quaternion {
        x: (((p0 << 16) >> 20) * 2) as i16,
        y: ((p1 << 20) >> 19) as i16,
        z: (((((p1 >> 12) << 28) >> 20) | ((p0 >> 12) & 0xF0) | (p0 & 0xF)) * 2) as i16,
        w: ((p0 >> 20) * 2) as i16,
    }
}

fn decode_second(p1: i32, p2: i32) -> Quaternion {
    Quaternion {
        x: ((p1 >> 20) * 2) as i16,
        y: (((p2 << 4) >> 20) * 2) as i16,
        z: ((((p2 >> 28) << 8) | ((p2 & 0xF) << 4) | ((p1 >> 16) & 0xF)) * 2) as i16,
        w: (((p2 << 16) >> 20) * 2) as i16,
    }
}

/// Number of packed words holding `count` quaternions
pub const fn encoded_word_count(count: usize) -> usize {
    let words = (count / 2) * 3;
    if count % 2 == 1 { words + 2 } else { words }
}

/// Decode `count` quaternions from `words`.
///
/// Returns `None` when `words` is shorter than [`encoded_word_count`].
pub fn decode_quaternions(words: &[i32], count: usize) -> Option<Vec<Quaternion>> {
    let needed = encoded_word_count(count);
    if words.len() < needed {
        return None;
    }
    let mut out = Vec::with_capacity(count);
    for group in words[..(count / 2) * 3].chunks_exact(3) {
        let (a, b) = decode_pair(group[0], group[1], group[2]);
        out.push(a);
        out.push(b);
    }
    if count % 2 == 1 {
        out.push(decode_single(words[needed - 2], words[needed - 1]));
    }
    Some(out)
}

/// Unpack a frame translation (10/11/10-bit signed fields)
pub fn decode_translation(packed: i32) -> [i32; 3] {
    [
        (packed << 22) >> 22,
        (packed << 11) >> 21,
        (packed << 1) >> 22,
    ]
}

/// Translation in model units
pub fn translation_to_vec3(translation: [i32; 3]) -> Vec3 {
    Vec3::new(
        translation[0] as f32,
        translation[1] as f32,
        translation[2] as f32,
    ) / FIXED_POINT_ONE
}

/// Normalised linear interpolation between two fixed-point quaternions.
///
/// `to` is negated when the pair lies in opposite hemispheres, `t` is clamped
/// to `[0, 1]`, and a degenerate result becomes the identity.
pub fn nlerp(from: Quaternion, to: Quaternion, t: f32) -> Quaternion {
    let a = from.to_vec4();
    let mut b = to.to_vec4();
    if a.dot(b) < 0.0 {
        b = -b;
    }
    let t = t.clamp(0.0, 1.0);
    let blended = a + (b - a) * t;
    let length_squared = blended.length_squared();
    let normalized = if length_squared <= 0.0 {
        Vec4::new(0.0, 0.0, 0.0, 1.0)
    } else {
        blended / length_squared.sqrt()
    };
    Quaternion::from_vec4(normalized)
}

/// Neighbour frames and blend factor named by an interpolation byte.
///
/// The high nibble counts forward to the next source, the low nibble backward
/// to the previous one. Returns `(previous, next, t)` with `t = 1 / jump`, or
/// `None` when both nibbles are zero.
pub fn interpolation_sources(frame: usize, index: u8) -> Option<(isize, isize, f32)> {
    let frame = frame as isize;
    let next = frame + isize::from(index >> 4);
    let previous = frame - isize::from(index & 0xF);
    let jump = next - previous;
    if jump == 0 {
        return None;
    }
    Some((previous, next, 1.0 / jump as f32))
}
