//! Little-endian NBT (Named Binary Tag) for Minecraft Bedrock Edition save data.
//!
//! Ints and array lengths are `i32_le`, string lengths are `u16_le`. Block
//! palettes in sub-chunk records are stored as a run of root compounds in
//! this format, which [`read_nbt_le_list`] decodes without touching the bytes
//! that follow them.

pub mod error;
mod reader;
pub mod tag;
mod writer;

pub use error::NbtError;
pub use tag::{NbtCompound, NbtRoot, NbtTag};

use bytes::{Buf, BufMut};

/// Read one little-endian root compound from a buffer.
pub fn read_nbt_le(buf: &mut impl Buf) -> Result<NbtRoot, NbtError> {
    reader::read_root(buf)
}

/// Read exactly `count` consecutive root compounds from the front of a buffer.
///
/// The buffer is advanced past the last compound and no further.
pub fn read_nbt_le_list(buf: &mut impl Buf, count: usize) -> Result<Vec<NbtRoot>, NbtError> {
    reader::read_root_list(buf, count)
}

/// Write one little-endian root compound to a buffer.
pub fn write_nbt_le(buf: &mut impl BufMut, root: &NbtRoot) -> Result<(), NbtError> {
    writer::write_root(buf, root)
}
