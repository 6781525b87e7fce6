//! # TSP Level Geometry Parser
//!
//! Decoder for TSP blocks: the level geometry of a scene. A block holds a
//! spatial partition tree whose leaves carry tagged face primitives, the
//! vertex and colour pools those faces index into, optional dynamic face
//! blocks that cycle alternate texture coordinates, and an independent
//! collision mesh with a 2D KD-tree used for floor height queries.
//!
//! TSP blocks are usually embedded inside a larger container, so parsing
//! takes the absolute position of the block as a base.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use jp_tsp::parse_tsp;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = File::open("level.tsp")?;
//! let mut reader = BufReader::new(file);
//! let level = parse_tsp(&mut reader, 0)?;
//!
//! println!("Nodes: {}", level.nodes.len());
//! if let Some(hit) = level.height_at(1024, -512) {
//!     println!("Floor at {}", hit.y);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Dynamic faces
//!
//! Stride advancement is a pure function of the block's effect, the current
//! state and the table size. Callers decide how often to tick.
//!
//! ```
//! use jp_tsp::{DynamicFaceEffect, StrideState, advance_stride};
//!
//! let mut state = StrideState::default();
//! for _ in 0..3 {
//!     state = advance_stride(DynamicFaceEffect::Cycle, state, 3);
//! }
//! assert_eq!(state.stride, 0);
//! ```
//!
//! ## Modules
//!
//! - [`header`]: Header and section offset resolution
//! - [`node`]: Node tree and tagged face primitives
//! - [`dynamic`]: Dynamic face blocks and stride advancement
//! - [`collision`]: Collision mesh records
//! - [`query`]: KD-tree floor height query
//! - [`parser`]: Block parser
//! - [`error`]: Error types

pub mod collision;
pub mod dynamic;
pub mod error;
pub mod header;
pub mod level;
pub mod node;
pub mod parser;
pub mod query;
pub mod types;

pub use collision::{CollisionFace, CollisionHeader, CollisionMesh, KdNode};
pub use dynamic::{
    DynamicFaceBlock, DynamicFaceData, DynamicFaceEffect, StrideState, advance_stride,
};
pub use error::{Result, TspError};
pub use header::{TSP_HEADER_SIZE, TspHeader, TspSection, TspSectionKind};
pub use level::TspLevel;
pub use node::{Primitive, TsbFlags, TspFace, TspLeafFace, TspNode};
pub use parser::TspParser;
pub use query::CollisionHit;
pub use types::{BoundingBox, Color, TspVertex, Uv};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parse a TSP block starting at `base`
pub fn parse_tsp<R: std::io::Read + std::io::Seek>(reader: &mut R, base: u64) -> Result<TspLevel> {
    TspParser::new().parse(reader, base)
}
