//! Sub-chunk decode and encode errors.
//!
//! Every failure is terminal for the call that produced it. Offsets are byte
//! positions within the record passed to the decoder.

use std::fmt;

use mc_rs_nbt::NbtError;
use thiserror::Error;

/// Which storage layer of a sub-chunk an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Blocks,
    WaterLogged,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Blocks => f.write_str("blocks layer"),
            LayerKind::WaterLogged => f.write_str("water-logged layer"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SubChunkError {
    #[error("unsupported sub-chunk version {version} (expected 1 or 8)")]
    UnsupportedVersion { version: i8 },

    #[error("storage format flag {flag} at offset {offset}: 0 is expected for save data")]
    UnsupportedStorageFormat { flag: u8, offset: u64 },

    #[error("unsupported storage count {count} (expected 1 or 2)")]
    UnsupportedStorageCount { count: i8 },

    #[error("sub-chunk declares no block storage records")]
    EmptyStorageRecord,

    #[error("invalid bits-per-index {bits} at offset {offset}")]
    InvalidBitWidth { bits: u8, offset: u64 },

    #[error("truncated {what} at offset {offset}: needed {needed} bytes, {remaining} remain")]
    TruncatedData {
        what: &'static str,
        offset: u64,
        needed: usize,
        remaining: usize,
    },

    #[error("negative palette size {size} at offset {offset}")]
    NegativePaletteSize { size: i32, offset: u64 },

    #[error("palette size {size} at offset {offset} exceeds limit {limit}")]
    PaletteTooLarge { size: usize, limit: usize, offset: u64 },

    #[error("palette entry {entry}: {reason}")]
    MalformedPaletteEntry { entry: usize, reason: &'static str },

    #[error("palette declared {declared} entries but the parser produced {parsed}")]
    PaletteSizeMismatch { declared: usize, parsed: usize },

    #[error("palette NBT at offset {offset}: {source}")]
    Nbt {
        offset: u64,
        #[source]
        source: NbtError,
    },

    #[error("block {position} has palette index {index} but the palette has {palette_len} entries")]
    IndexOutOfPaletteRange {
        index: u32,
        position: usize,
        palette_len: usize,
    },

    #[error("block {position} has palette index {index}, which does not fit in {bits} bits")]
    IndexTooWide { index: u32, position: usize, bits: u8 },

    #[error("unexpected water layer: {reason} (palette: {names:?})")]
    UnexpectedWaterLayerShape {
        reason: &'static str,
        names: Vec<String>,
    },

    #[error("sub-chunk coordinates {x} {y} {z} are invalid: each must be in 0-15")]
    CoordinateOutOfRange { x: usize, y: usize, z: usize },

    #[error("block index {index} is outside 0-4095")]
    VoxelIndexOutOfRange { index: usize },

    #[error("{layer}: {source}")]
    InLayer {
        layer: LayerKind,
        #[source]
        source: Box<SubChunkError>,
    },
}

impl SubChunkError {
    pub(crate) fn in_layer(self, layer: LayerKind) -> Self {
        SubChunkError::InLayer {
            layer,
            source: Box::new(self),
        }
    }

    /// The underlying error with any layer context removed.
    pub fn root_cause(&self) -> &SubChunkError {
        match self {
            SubChunkError::InLayer { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// The layer the error occurred in, if it was raised while decoding one.
    pub fn layer(&self) -> Option<LayerKind> {
        match self {
            SubChunkError::InLayer { layer, .. } => Some(*layer),
            _ => None,
        }
    }
}
