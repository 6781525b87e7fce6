//! Pose application
//!
//! Applying a pose rebuilds every current vertex table from rest positions and
//! runs the bone hierarchy with the target frame's rotations. A request that
//! cannot be honoured is reported as [`PoseOutcome::NoOp`] and leaves the
//! object untouched.

use std::fmt;

use glam::Mat4;
use log::debug;

use crate::codec::{Quaternion, nlerp};
use crate::render_object::RenderObject;

/// Blend factor used when stepping between frames of the same clip
pub const TRANSITION_BLEND: f32 = 0.5;

/// Result of a pose request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseOutcome {
    Applied,
    NoOp(PoseNoOp),
}

impl PoseOutcome {
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }
}

/// Why a pose request changed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseNoOp {
    /// The object has no skeleton
    NotAnimated,
    AnimationOutOfRange { animation: usize, count: usize },
    /// The clip slot is empty
    EmptyAnimation { animation: usize },
    FrameOutOfRange { frame: usize, count: usize },
    /// The pose is already applied and no override was requested
    AlreadySet,
    /// The frame has no rotations, stored or reconstructed
    UnresolvedFrame { animation: usize, frame: usize },
    /// The previous and target frames hold different rotation counts
    BlendCountMismatch { from: usize, to: usize },
    /// A bone reads a rotation index the frame does not have
    MissingBoneRotation { table_index: u16, count: usize },
}

impl fmt::Display for PoseNoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnimated => write!(f, "object is not animated"),
            Self::AnimationOutOfRange { animation, count } => {
                write!(f, "animation {animation} out of range (count {count})")
            }
            Self::EmptyAnimation { animation } => write!(f, "animation {animation} has no frames"),
            Self::FrameOutOfRange { frame, count } => {
                write!(f, "frame {frame} out of range (count {count})")
            }
            Self::AlreadySet => write!(f, "pose already set"),
            Self::UnresolvedFrame { animation, frame } => {
                write!(f, "frame {frame} of animation {animation} has no rotations")
            }
            Self::BlendCountMismatch { from, to } => {
                write!(f, "cannot blend {from} rotations into {to}")
            }
            Self::MissingBoneRotation { table_index, count } => {
                write!(f, "bone rotation {table_index} missing (frame has {count})")
            }
        }
    }
}

/// Receives posed geometry after a pose is applied.
///
/// Renderers implement this to refresh their buffers from
/// [`RenderObject::vertex_tables`].
pub trait GeometrySink {
    fn pose_applied(&mut self, object: &RenderObject);
}

impl GeometrySink for () {
    fn pose_applied(&mut self, _object: &RenderObject) {}
}

impl RenderObject {
    /// Pose the object at `frame` of `animation`.
    ///
    /// Re-applying the current pose is a no-op unless `force` is set.
    pub fn set_animation_pose(&mut self, animation: usize, frame: usize, force: bool) -> PoseOutcome {
        self.set_animation_pose_with(animation, frame, force, &mut ())
    }

    /// Like [`set_animation_pose`](Self::set_animation_pose), notifying `sink`
    /// once the pose is applied
    pub fn set_animation_pose_with(
        &mut self,
        animation: usize,
        frame: usize,
        force: bool,
        sink: &mut dyn GeometrySink,
    ) -> PoseOutcome {
        let rotations = match self.pose_rotations(animation, frame, force) {
            Ok(rotations) => rotations,
            Err(reason) => {
                debug!("Object {}: pose {}/{} skipped: {}", self.id, animation, frame, reason);
                return PoseOutcome::NoOp(reason);
            }
        };

        let target = &mut self.animations[animation].frames[frame];
        target.working = rotations;
        let root = Mat4::from_translation(target.translation_vec3());

        for table in &mut self.vertex_tables {
            table.reset();
        }
        if let Some(skeleton) = &self.skeleton {
            skeleton.apply(
                &self.animations[animation].frames[frame].working,
                &mut self.vertex_tables,
                root,
            );
        }
        self.current = Some((animation, frame));
        self.refresh_center();
        sink.pose_applied(self);
        PoseOutcome::Applied
    }

    /// Check every precondition and compute the rotations to apply
    fn pose_rotations(
        &self,
        animation: usize,
        frame: usize,
        force: bool,
    ) -> Result<Vec<Quaternion>, PoseNoOp> {
        let skeleton = self.skeleton.as_ref().ok_or(PoseNoOp::NotAnimated)?;
        let clip = self
            .animations
            .get(animation)
            .ok_or(PoseNoOp::AnimationOutOfRange {
                animation,
                count: self.animations.len(),
            })?;
        if self.current == Some((animation, frame)) && !force {
            return Err(PoseNoOp::AlreadySet);
        }
        if clip.is_empty() {
            return Err(PoseNoOp::EmptyAnimation { animation });
        }
        let target = clip.frames.get(frame).ok_or(PoseNoOp::FrameOutOfRange {
            frame,
            count: clip.frames.len(),
        })?;
        let decoded = target
            .decoded
            .as_ref()
            .ok_or(PoseNoOp::UnresolvedFrame { animation, frame })?;

        let rotations = match self.current {
            Some((current_animation, current_frame))
                if current_animation == animation && current_frame != frame =>
            {
                let previous = clip
                    .frames
                    .get(current_frame)
                    .and_then(|f| f.decoded.as_ref())
                    .ok_or(PoseNoOp::UnresolvedFrame {
                        animation,
                        frame: current_frame,
                    })?;
                if previous.len() != decoded.len() {
                    return Err(PoseNoOp::BlendCountMismatch {
                        from: previous.len(),
                        to: decoded.len(),
                    });
                }
                previous
                    .iter()
                    .zip(decoded)
                    .map(|(&a, &b)| nlerp(a, b, TRANSITION_BLEND))
                    .collect()
            }
            _ => decoded.clone(),
        };

        if let Some(table_index) = skeleton.max_table_index()
            && usize::from(table_index) >= rotations.len()
        {
            return Err(PoseNoOp::MissingBoneRotation {
                table_index,
                count: rotations.len(),
            });
        }
        Ok(rotations)
    }
}
