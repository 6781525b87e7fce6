//! # BSD Scene Descriptor Parser
//!
//! Decoder for BSD scene descriptors. A descriptor catalogs render objects:
//! static models built from GPU primitive packets, skeletal models with bone
//! hierarchies and packed quaternion animation, and the world object that
//! embeds the level geometry (see [`jp_tsp`]).
//!
//! Every offset in a descriptor is relative to the end of a 2048-byte header,
//! and animation data is further relative to one of ten section bases listed
//! in the [`SectionTable`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use jp_bsd::{BsdLoader, RecordLayout};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut reader = BufReader::new(File::open("scene.bsd")?);
//! let report = BsdLoader::new()
//!     .with_layout(RecordLayout::Standard)
//!     .load_all(&mut reader)?;
//!
//! for mut object in report.objects {
//!     if object.is_animated() {
//!         object.set_animation_pose(0, 0, false);
//!         println!("{} centred at {}", object.file_name, object.center());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Quaternion codec
//!
//! ```
//! use jp_bsd::codec::{decode_quaternions, encoded_word_count};
//!
//! assert_eq!(encoded_word_count(3), 5);
//! let words = [0x1000_0000, 0, 0, 0x1000_0000, 0];
//! let rotations = decode_quaternions(&words, 3).unwrap();
//! assert_eq!(rotations[2].w, 0x200);
//! ```
//!
//! ## Modules
//!
//! - [`section`]: Section table and offset resolution
//! - [`catalog`]: Render object catalog and record layouts
//! - [`codec`]: Packed quaternion codec and interpolation
//! - [`animation`]: Clips, frames and missing-frame reconstruction
//! - [`hierarchy`]: Bone tree and pose transform
//! - [`face`]: Static face packets
//! - [`vertex`]: Vertex tables and animated faces
//! - [`pose`]: Pose application
//! - [`loader`]: Render object loader

pub mod animation;
pub mod catalog;
pub mod codec;
pub mod error;
pub mod face;
pub mod hierarchy;
pub mod loader;
pub mod pose;
pub mod render_object;
pub mod section;
pub mod types;
pub mod vertex;

pub use animation::{AnimationClip, AnimationFrame, AnimationTableEntry};
pub use catalog::{AnimatedLights, Catalog, RecordLayout, RenderObjectRecord};
pub use codec::Quaternion;
pub use error::{BsdError, Result};
pub use face::{BsdFace, FaceCategory, FaceStage, PacketKind};
pub use hierarchy::{BoneNode, BoneTree};
pub use loader::{BsdLoader, LoadFailure, LoadReport};
pub use pose::{GeometrySink, PoseNoOp, PoseOutcome};
pub use render_object::RenderObject;
pub use section::{BSD_HEADER_SIZE, SectionEntry, SectionKind, SectionTable};
pub use types::{BsdColor, BsdUv, BsdVertex, TexInfo};
pub use vertex::{AnimatedFace, VertexRef, VertexTable};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Load every render object of a standard-layout descriptor
pub fn load_bsd<R: std::io::Read + std::io::Seek>(reader: &mut R) -> Result<LoadReport> {
    BsdLoader::new().load_all(reader)
}
