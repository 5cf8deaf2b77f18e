//! Decoding of Minecraft Bedrock Edition sub-chunk block storage records.
//!
//! A sub-chunk record stores a 16x16x16 cube of blocks as one or two layers of
//! palette indices packed into `u32` words, each followed by an NBT palette.
//! [`decode_sub_chunk`] turns the raw value stored under a sub-chunk key into
//! a [`SubChunk`]; [`encode_sub_chunk`] writes one back.

pub mod config;
pub mod error;
pub mod layer;
pub mod packed;
pub mod palette;
pub mod sub_chunk;
pub mod voxel;

pub use config::DecoderConfig;
pub use error::{LayerKind, SubChunkError};
pub use layer::BlockLayer;
pub use palette::{BlockState, LeNbtParser, StateValue, TagListParser};
pub use sub_chunk::{
    check_water_layer, decode_sub_chunk, encode_sub_chunk, SubChunk, SubChunkDecoder,
    SubChunkVersion,
};
pub use voxel::{index_to_voxel, voxel_to_index, voxels, Voxel, BLOCK_COUNT};
