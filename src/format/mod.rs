pub mod blo;
pub mod ddsc_db;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod material;
pub mod mdic;
pub mod rbm;
pub mod render_block;
pub mod rtpc;

use std::fmt::{Debug, Display, Formatter};

use binrw::binread;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Render block type identifier.
#[binread]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct BlockTag(pub u32);

impl Display for BlockTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { write!(f, "{:#010X}", self.0) }
}

impl Debug for BlockTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Display::fmt(self, f) }
}

impl Serialize for BlockTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[binread]
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct CVector3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[binread]
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct CAABox {
    pub min: CVector3f,
    pub max: CVector3f,
}

/// A referenced model placed in the world.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlacementEntry {
    pub referenced_path: String,
    /// Row-major, Y-up.
    pub world_matrix: [f32; 16],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Index of the enclosing placement in the same list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
}

impl PlacementEntry {
    pub fn new(referenced_path: String, world_matrix: [f32; 16]) -> Self {
        Self { referenced_path, world_matrix, name: None, parent: None }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("truncated input at offset {offset:#X} ({available} bytes available)")]
    TruncatedInput { offset: u64, available: usize },
    #[error("invalid UTF-8 string at offset {offset:#X}")]
    InvalidString { offset: u64 },
    #[error("bad magic: expected {expected}, found {found}")]
    BadMagic { expected: String, found: String },
    #[error("unsupported version {version} (expected {expected})")]
    UnsupportedVersion { version: u32, expected: u32 },
    #[error("unknown render block tag {tag} at offset {offset:#X}")]
    UnknownBlockTag { tag: BlockTag, offset: u64 },
    #[error("render block {name} ({tag}) has no known layout")]
    UnsupportedBlock { name: &'static str, tag: BlockTag },
    #[error("malformed geometry in {block}: {reason}")]
    MalformedGeometry { block: &'static str, reason: String },
    #[error("malformed placement data: {0}")]
    MalformedPlacement(String),
    #[error("malformed container: {0}")]
    MalformedContainer(String),
    #[error("unknown property type {kind} at offset {offset:#X}")]
    UnknownPropertyType { kind: u8, offset: u64 },
    #[error(transparent)]
    Binary(#[from] binrw::Error),
}

pub type DecodeResult<T> = Result<T, DecodeError>;
