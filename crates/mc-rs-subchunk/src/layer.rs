//! One block storage record: packed indices followed by their palette.

use std::io::Cursor;

use bytes::BytesMut;
use tracing::debug;

use crate::error::SubChunkError;
use crate::packed::{self, BlockIndices};
use crate::palette::{self, BlockState, TagListParser};
use crate::voxel::{Voxel, BLOCK_COUNT};

/// A decoded storage layer. Every index is a valid position in the palette.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockLayer {
    indices: BlockIndices,
    palette: Vec<BlockState>,
}

impl BlockLayer {
    pub fn new(indices: BlockIndices, palette: Vec<BlockState>) -> Result<Self, SubChunkError> {
        check_indices(&indices[..], palette.len())?;
        Ok(Self { indices, palette })
    }

    /// A layer where every block has the same state.
    pub fn uniform(state: BlockState) -> Self {
        Self {
            indices: Box::new([0; BLOCK_COUNT]),
            palette: vec![state],
        }
    }

    /// Palette index of every block, in storage order.
    pub fn indices(&self) -> &[u32] {
        &self.indices[..]
    }

    pub fn palette(&self) -> &[BlockState] {
        &self.palette
    }

    pub fn state_index_at(&self, voxel: Voxel) -> u32 {
        self.indices[voxel.index()]
    }

    pub fn state_at(&self, voxel: Voxel) -> &BlockState {
        // Indices were checked against the palette on construction.
        &self.palette[self.state_index_at(voxel) as usize]
    }
}

fn check_indices(indices: &[u32], palette_len: usize) -> Result<(), SubChunkError> {
    match indices
        .iter()
        .position(|&index| index as usize >= palette_len)
    {
        Some(position) => Err(SubChunkError::IndexOutOfPaletteRange {
            index: indices[position],
            position,
            palette_len,
        }),
        None => Ok(()),
    }
}

/// Read one storage record: header, packed indices, then palette.
pub fn decode_layer<P: TagListParser + ?Sized>(
    cursor: &mut Cursor<&[u8]>,
    parser: &P,
    max_palette_len: usize,
) -> Result<BlockLayer, SubChunkError> {
    let (bits, indices) = packed::unpack_indices(cursor)?;
    let palette = palette::decode_palette(cursor, parser, max_palette_len)?;
    debug!(
        "decoded storage layer: {bits} bits per index, {} palette entries",
        palette.len()
    );
    BlockLayer::new(indices, palette)
}

/// Write one storage record using the narrowest width that fits the palette.
pub fn encode_layer(
    buf: &mut BytesMut,
    layer: &BlockLayer,
    max_palette_len: usize,
) -> Result<(), SubChunkError> {
    if layer.palette.len() > max_palette_len {
        return Err(SubChunkError::PaletteTooLarge {
            size: layer.palette.len(),
            limit: max_palette_len,
            offset: buf.len() as u64,
        });
    }
    let bits = packed::bits_per_index_for_palette(layer.palette.len());
    packed::pack_indices(buf, &layer.indices, bits)?;
    palette::encode_palette(buf, &layer.palette, max_palette_len)
}
