//! Sub-chunk block storage records.
//!
//! Disk format:
//! ```text
//! [version:i8 = 1|8][storage_count:i8, v8 only][layer]{1,2}
//! layer = [header][packed indices][palette_count:i32_le][NBT_LE compound]*
//! ```
//! Version 1 records always hold a single layer. A second layer, when
//! present, marks water-logged blocks: its palette is at most
//! `[anything, water]`.

use std::io::Cursor;

use bytes::{Buf, BufMut, BytesMut};
use tracing::debug;

use crate::config::{DecoderConfig, DEFAULT_MAX_PALETTE_LEN, DEFAULT_WATER_BLOCK_NAME};
use crate::error::{LayerKind, SubChunkError};
use crate::layer::{self, BlockLayer};
use crate::palette::{BlockState, LeNbtParser, TagListParser};
use crate::voxel::Voxel;

/// Palette index that marks a water-logged block in the second layer.
pub const WATER_LOGGED_INDEX: u32 = 1;

/// Sub-chunk storage format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubChunkVersion {
    /// Version 1: one layer, no storage count byte.
    Legacy,
    /// Version 8: explicit storage count of 1 or 2.
    Paletted,
}

impl SubChunkVersion {
    pub fn from_byte(version: i8) -> Result<Self, SubChunkError> {
        match version {
            1 => Ok(SubChunkVersion::Legacy),
            8 => Ok(SubChunkVersion::Paletted),
            _ => Err(SubChunkError::UnsupportedVersion { version }),
        }
    }

    pub fn as_byte(self) -> i8 {
        match self {
            SubChunkVersion::Legacy => 1,
            SubChunkVersion::Paletted => 8,
        }
    }
}

/// A decoded 16x16x16 block storage record.
#[derive(Debug, Clone, PartialEq)]
pub struct SubChunk {
    version: SubChunkVersion,
    blocks: BlockLayer,
    water_logged: Option<BlockLayer>,
}

impl SubChunk {
    /// Assemble a record, holding a second layer to the water-logging shape.
    ///
    /// Version 1 records cannot carry a second layer.
    pub fn new(
        version: SubChunkVersion,
        blocks: BlockLayer,
        water_logged: Option<BlockLayer>,
    ) -> Result<Self, SubChunkError> {
        if let Some(layer) = &water_logged {
            if version == SubChunkVersion::Legacy {
                return Err(SubChunkError::UnsupportedStorageCount { count: 2 });
            }
            check_water_layer(layer, DEFAULT_WATER_BLOCK_NAME)
                .map_err(|e| e.in_layer(LayerKind::WaterLogged))?;
        }
        Ok(Self {
            version,
            blocks,
            water_logged,
        })
    }

    pub fn version(&self) -> SubChunkVersion {
        self.version
    }

    /// The primary layer.
    pub fn blocks(&self) -> &BlockLayer {
        &self.blocks
    }

    pub fn water_logged(&self) -> Option<&BlockLayer> {
        self.water_logged.as_ref()
    }

    /// Number of storage layers: 1, or 2 with a water-logging layer.
    pub fn storage_count(&self) -> usize {
        if self.water_logged.is_some() {
            2
        } else {
            1
        }
    }

    /// Block state at local coordinates in the primary layer.
    pub fn block_at(&self, x: usize, y: usize, z: usize) -> Result<&BlockState, SubChunkError> {
        Ok(self.blocks.state_at(Voxel::new(x, y, z)?))
    }

    /// Whether the block at local coordinates is flagged as water-logged.
    pub fn is_waterlogged(&self, x: usize, y: usize, z: usize) -> Result<bool, SubChunkError> {
        let voxel = Voxel::new(x, y, z)?;
        Ok(self
            .water_logged
            .as_ref()
            .is_some_and(|layer| layer.state_index_at(voxel) == WATER_LOGGED_INDEX))
    }
}

/// Decodes sub-chunk records with a given palette parser and limits.
#[derive(Debug, Clone)]
pub struct SubChunkDecoder<P = LeNbtParser> {
    parser: P,
    config: DecoderConfig,
}

impl SubChunkDecoder<LeNbtParser> {
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self::with_parser(LeNbtParser, config)
    }
}

impl Default for SubChunkDecoder<LeNbtParser> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: TagListParser> SubChunkDecoder<P> {
    pub fn with_parser(parser: P, config: DecoderConfig) -> Self {
        Self { parser, config }
    }

    /// Decode one record. Bytes after the last layer are ignored.
    pub fn decode(&self, data: &[u8]) -> Result<SubChunk, SubChunkError> {
        let mut cursor = Cursor::new(data);

        let version = SubChunkVersion::from_byte(read_i8(&mut cursor, "version")?)?;
        let storage_count = match version {
            SubChunkVersion::Legacy => 1,
            SubChunkVersion::Paletted => read_i8(&mut cursor, "storage count")?,
        };
        match storage_count {
            0 => return Err(SubChunkError::EmptyStorageRecord),
            1 | 2 => {}
            count => return Err(SubChunkError::UnsupportedStorageCount { count }),
        }
        debug!(
            "decoding sub-chunk: version {}, {storage_count} storage record(s)",
            version.as_byte()
        );

        let blocks = self
            .decode_layer(&mut cursor)
            .map_err(|e| e.in_layer(LayerKind::Blocks))?;

        let water_logged = if storage_count == 2 {
            let layer = self
                .decode_layer(&mut cursor)
                .and_then(|layer| {
                    check_water_layer(&layer, &self.config.water.block_name)?;
                    Ok(layer)
                })
                .map_err(|e| e.in_layer(LayerKind::WaterLogged))?;
            Some(layer)
        } else {
            None
        };

        if cursor.has_remaining() {
            debug!("{} trailing bytes after sub-chunk layers", cursor.remaining());
        }

        Ok(SubChunk {
            version,
            blocks,
            water_logged,
        })
    }

    fn decode_layer(&self, cursor: &mut Cursor<&[u8]>) -> Result<BlockLayer, SubChunkError> {
        layer::decode_layer(cursor, &self.parser, self.config.limits.max_palette_len)
    }

}

/// A water-logging layer has at most two palette entries, and the second one
/// must be named `water_block_name`.
pub fn check_water_layer(
    layer: &BlockLayer,
    water_block_name: &str,
) -> Result<(), SubChunkError> {
    let palette = layer.palette();
    let reason = if palette.len() > 2 {
        Some("palette has more than 2 entries")
    } else if palette.len() == 2 && palette[1].name() != water_block_name {
        Some("palette entry 1 is not water")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(SubChunkError::UnexpectedWaterLayerShape {
            reason,
            names: palette.iter().map(|s| s.name().to_owned()).collect(),
        }),
        None => Ok(()),
    }
}

fn read_i8(cursor: &mut Cursor<&[u8]>, what: &'static str) -> Result<i8, SubChunkError> {
    if !cursor.has_remaining() {
        return Err(SubChunkError::TruncatedData {
            what,
            offset: cursor.position(),
            needed: 1,
            remaining: 0,
        });
    }
    Ok(cursor.get_i8())
}

/// Decode a sub-chunk record with the default limits and LE NBT palettes.
pub fn decode_sub_chunk(data: &[u8]) -> Result<SubChunk, SubChunkError> {
    SubChunkDecoder::new().decode(data)
}

/// Serialize a sub-chunk back to its disk format.
///
/// Each layer is written at the narrowest index width its palette allows.
/// Palettes above the default decode limit are rejected.
pub fn encode_sub_chunk(sub_chunk: &SubChunk) -> Result<Vec<u8>, SubChunkError> {
    let mut buf = BytesMut::new();
    buf.put_i8(sub_chunk.version.as_byte());
    if sub_chunk.version == SubChunkVersion::Paletted {
        buf.put_i8(sub_chunk.storage_count() as i8);
    }

    layer::encode_layer(&mut buf, &sub_chunk.blocks, DEFAULT_MAX_PALETTE_LEN)
        .map_err(|e| e.in_layer(LayerKind::Blocks))?;
    if let Some(water_logged) = &sub_chunk.water_logged {
        layer::encode_layer(&mut buf, water_logged, DEFAULT_MAX_PALETTE_LEN)
            .map_err(|e| e.in_layer(LayerKind::WaterLogged))?;
    }

    Ok(buf.to_vec())
}
