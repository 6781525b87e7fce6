//! Animation clips and frames
//!
//! An animated object lists its clips in a small header at its animation data
//! offset. Each clip points at a table entry naming its frame count and where
//! its 20-byte frame records start. A frame either points at packed quaternion
//! words or names two neighbours to interpolate from.

use std::io::{Read, Seek, SeekFrom};

use binrw::BinRead;
use byteorder::{LittleEndian, ReadBytesExt};
use glam::Vec3;
use log::{debug, trace, warn};

use crate::codec::{
    Quaternion, decode_quaternions, decode_translation, encoded_word_count,
    interpolation_sources, nlerp, translation_to_vec3,
};
use crate::error::{BsdError, Result};
use crate::section::{SectionKind, SectionTable, resolve_absolute};

/// Size of a frame record
pub const FRAME_RECORD_SIZE: u64 = 20;

/// Pad word following the clip count
pub const ANIMATION_DATA_PAD: u16 = 0xCDCD;

/// Pad word inside every clip table entry
pub const ANIMATION_TABLE_PAD: u16 = 0xCD00;

/// Clip table entry (8 bytes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct AnimationTableEntry {
    pub frame_count: u8,
    pub affected_vertex_count: u8,
    pub pad: u16,
    /// Offset of the first frame record inside the animation data section
    pub frame_offset: i32,
}

/// Raw frame record (20 bytes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct FrameRecord {
    pub unk0: i16,
    pub unk4: i16,
    pub encoded_translation: i32,
    pub unk1: i16,
    pub unk2: i16,
    pub unk3: u8,
    pub unk5: u8,
    pub interpolation_index: u8,
    pub quaternion_count: u8,
    /// Offset into the quaternion data section, `-1` when interpolated
    pub quaternion_offset: i32,
}

/// A decoded animation frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct AnimationFrame {
    pub unk0: i16,
    pub unk1: i16,
    pub unk2: i16,
    pub unk3: u8,
    pub unk4: i16,
    pub unk5: u8,
    pub encoded_translation: i32,
    /// Root translation in 1/4096 units
    pub translation: [i32; 3],
    /// High nibble: frames forward to the next source; low nibble: backward
    pub interpolation_index: u8,
    pub quaternion_count: u8,
    /// Packed words as stored; empty for interpolated frames
    pub encoded: Vec<i32>,
    /// Decoded rotations, `None` until the frame is resolved
    pub decoded: Option<Vec<Quaternion>>,
    /// Rotations consumed by the next pose application
    pub working: Vec<Quaternion>,
}

impl AnimationFrame {
    fn from_record(record: &FrameRecord) -> Self {
        Self {
            unk0: record.unk0,
            unk1: record.unk1,
            unk2: record.unk2,
            unk3: record.unk3,
            unk4: record.unk4,
            unk5: record.unk5,
            encoded_translation: record.encoded_translation,
            translation: decode_translation(record.encoded_translation),
            interpolation_index: record.interpolation_index,
            quaternion_count: record.quaternion_count,
            ..Self::default()
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.decoded.is_some()
    }

    pub fn translation_vec3(&self) -> Vec3 {
        translation_to_vec3(self.translation)
    }

    /// Reset the working rotations from the decoded ones
    pub fn reset_working(&mut self) {
        if let Some(decoded) = &self.decoded {
            self.working.clone_from(decoded);
        }
    }

    fn resolve(&mut self, decoded: Vec<Quaternion>) {
        self.working.clone_from(&decoded);
        self.decoded = Some(decoded);
    }
}

/// One animation sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize))]
pub struct AnimationClip {
    /// `None` for a slot whose offset was `-1`
    pub entry: Option<AnimationTableEntry>,
    pub frames: Vec<AnimationFrame>,
}

impl AnimationClip {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn unresolved_frames(&self) -> usize {
        self.frames.iter().filter(|f| !f.is_resolved()).count()
    }
}

/// Read every clip of an animated object.
///
/// Empty clip slots are kept so clip indices match the file.
pub fn read_clips<R: Read + Seek>(
    reader: &mut R,
    sections: &SectionTable,
    data_offset: i32,
) -> Result<Vec<AnimationClip>> {
    reader.seek(SeekFrom::Start(resolve_absolute(
        data_offset,
        "animation data offset",
    )?))?;
    let count = reader.read_i16::<LittleEndian>()?;
    let pad = reader.read_u16::<LittleEndian>()?;
    if pad != ANIMATION_DATA_PAD {
        return Err(BsdError::InvalidPadding {
            field: "animation data header",
            expected: ANIMATION_DATA_PAD,
            actual: pad,
        });
    }
    if count < 0 {
        return Err(BsdError::InvalidCount {
            field: "animation count",
            value: i64::from(count),
        });
    }

    let mut offsets = Vec::with_capacity(count as usize);
    for _ in 0..count {
        offsets.push(reader.read_i32::<LittleEndian>()?);
    }
    debug!("{} animation slots at {}", count, data_offset);

    let mut clips = Vec::with_capacity(offsets.len());
    for (index, offset) in offsets.into_iter().enumerate() {
        if offset == -1 {
            clips.push(AnimationClip::default());
            continue;
        }
        let mut clip = read_clip(reader, sections, offset)?;
        reconstruct_missing_frames(&mut clip);
        let unresolved = clip.unresolved_frames();
        if unresolved > 0 {
            warn!(
                "Animation {} has {} frames that could not be reconstructed",
                index, unresolved
            );
        }
        clips.push(clip);
    }
    Ok(clips)
}

fn read_clip<R: Read + Seek>(
    reader: &mut R,
    sections: &SectionTable,
    offset: i32,
) -> Result<AnimationClip> {
    reader.seek(SeekFrom::Start(
        sections.resolve(SectionKind::AnimationTable, offset)?,
    ))?;
    let entry = AnimationTableEntry::read(reader)?;
    if entry.pad != ANIMATION_TABLE_PAD {
        return Err(BsdError::InvalidPadding {
            field: "animation table entry",
            expected: ANIMATION_TABLE_PAD,
            actual: entry.pad,
        });
    }
    trace!(
        "Clip at {}: {} frames, {} affected vertices, frames at {}",
        offset, entry.frame_count, entry.affected_vertex_count, entry.frame_offset
    );

    let mut frames = Vec::with_capacity(usize::from(entry.frame_count));
    for j in 0..i32::from(entry.frame_count) {
        let relative = entry.frame_offset + j * FRAME_RECORD_SIZE as i32;
        let start = sections.resolve(SectionKind::AnimationData, relative)?;
        reader.seek(SeekFrom::Start(start))?;
        let record = FrameRecord::read(reader)?;
        let consumed = reader.stream_position()? - start;
        if consumed != FRAME_RECORD_SIZE {
            return Err(BsdError::RecordSizeMismatch {
                field: "animation frame",
                expected: FRAME_RECORD_SIZE,
                actual: consumed as i64,
            });
        }

        let mut frame = AnimationFrame::from_record(&record);
        if record.quaternion_offset != -1 {
            reader.seek(SeekFrom::Start(
                sections.resolve(SectionKind::QuaternionData, record.quaternion_offset)?,
            ))?;
            let count = usize::from(record.quaternion_count);
            let mut words = Vec::with_capacity(encoded_word_count(count));
            for _ in 0..encoded_word_count(count) {
                words.push(reader.read_i32::<LittleEndian>()?);
            }
            let decoded = decode_quaternions(&words, count).ok_or(BsdError::InvalidCount {
                field: "encoded quaternion words",
                value: words.len() as i64,
            })?;
            frame.encoded = words;
            frame.resolve(decoded);
        }
        frames.push(frame);
    }
    Ok(AnimationClip {
        entry: Some(entry),
        frames,
    })
}

/// Rebuild frames that carry no quaternion words.
///
/// Frames are visited in order, so an interpolated frame may use a neighbour
/// that was itself rebuilt earlier in the pass. A frame whose sources are out
/// of range, unresolved, or hold a different number of rotations is left
/// unresolved.
pub fn reconstruct_missing_frames(clip: &mut AnimationClip) {
    for j in 0..clip.frames.len() {
        if clip.frames[j].is_resolved() {
            continue;
        }
        let frame = &clip.frames[j];
        let Some((previous, next, t)) = interpolation_sources(j, frame.interpolation_index)
        else {
            trace!("Frame {} has no interpolation sources", j);
            continue;
        };
        let (Ok(previous), Ok(next)) = (usize::try_from(previous), usize::try_from(next)) else {
            continue;
        };
        if previous == j || next == j {
            continue;
        }
        let count = usize::from(frame.quaternion_count);
        let sources = clip
            .frames
            .get(previous)
            .and_then(|f| f.decoded.as_ref())
            .zip(clip.frames.get(next).and_then(|f| f.decoded.as_ref()));
        let Some((from, to)) = sources else {
            trace!("Frame {} sources {} and {} unavailable", j, previous, next);
            continue;
        };
        if from.len() != count || to.len() != count {
            continue;
        }
        let blended = from
            .iter()
            .zip(to)
            .map(|(&a, &b)| nlerp(a, b, t))
            .collect();
        clip.frames[j].resolve(blended);
    }
}
