//! Little-endian NBT decoding, as used by Bedrock world saves.
//!
//! Ints and array lengths are `i32_le`, string lengths are `u16_le`.

use bytes::Buf;

use crate::error::NbtError;
use crate::tag::{NbtCompound, NbtRoot, NbtTag, TAG_COMPOUND, TAG_END};

/// Maximum nesting depth to prevent stack overflow.
const MAX_DEPTH: usize = 512;

pub(crate) fn read_root(buf: &mut impl Buf) -> Result<NbtRoot, NbtError> {
    ensure_remaining(buf, 1)?;
    let tag_type = buf.get_u8();
    if tag_type != TAG_COMPOUND {
        return Err(NbtError::ExpectedCompound { got: tag_type });
    }
    let name = read_string(buf)?;
    let compound = read_compound(buf, 0)?;
    Ok(NbtRoot { name, compound })
}

/// Reads `count` consecutive root compounds. Stops at the first failure,
/// tagging it with the position of the offending compound.
pub(crate) fn read_root_list(buf: &mut impl Buf, count: usize) -> Result<Vec<NbtRoot>, NbtError> {
    // Every root compound takes at least 4 bytes (type, empty name, TAG_End).
    let mut roots = Vec::with_capacity(count.min(buf.remaining() / 4));
    for index in 0..count {
        let root = read_root(buf).map_err(|source| NbtError::InList {
            index,
            count,
            source: Box::new(source),
        })?;
        roots.push(root);
    }
    Ok(roots)
}

fn read_tag(buf: &mut impl Buf, tag_type: u8, depth: usize) -> Result<NbtTag, NbtError> {
    if depth > MAX_DEPTH {
        return Err(NbtError::NestingTooDeep { limit: MAX_DEPTH });
    }

    let tag = match tag_type {
        1 => {
            ensure_remaining(buf, 1)?;
            NbtTag::Byte(buf.get_i8())
        }
        2 => {
            ensure_remaining(buf, 2)?;
            NbtTag::Short(buf.get_i16_le())
        }
        3 => NbtTag::Int(read_i32(buf)?),
        4 => {
            ensure_remaining(buf, 8)?;
            NbtTag::Long(buf.get_i64_le())
        }
        5 => {
            ensure_remaining(buf, 4)?;
            NbtTag::Float(buf.get_f32_le())
        }
        6 => {
            ensure_remaining(buf, 8)?;
            NbtTag::Double(buf.get_f64_le())
        }
        7 => {
            let len = read_len(buf)?;
            ensure_remaining(buf, len)?;
            let mut arr = vec![0u8; len];
            buf.copy_to_slice(&mut arr);
            NbtTag::ByteArray(arr.into_iter().map(|b| b as i8).collect())
        }
        8 => NbtTag::String(read_string(buf)?),
        9 => {
            ensure_remaining(buf, 1)?;
            let element_type = buf.get_u8();
            let len = read_len(buf)?;
            if len > 0 && element_type == TAG_END {
                return Err(NbtError::UnknownTagType(element_type));
            }
            let mut list = Vec::with_capacity(len.min(buf.remaining()));
            for _ in 0..len {
                list.push(read_tag(buf, element_type, depth + 1)?);
            }
            NbtTag::List(list)
        }
        10 => NbtTag::Compound(read_compound(buf, depth + 1)?),
        11 => {
            let len = read_len(buf)?;
            ensure_remaining(buf, len.saturating_mul(4))?;
            NbtTag::IntArray((0..len).map(|_| buf.get_i32_le()).collect())
        }
        12 => {
            let len = read_len(buf)?;
            ensure_remaining(buf, len.saturating_mul(8))?;
            NbtTag::LongArray((0..len).map(|_| buf.get_i64_le()).collect())
        }
        _ => return Err(NbtError::UnknownTagType(tag_type)),
    };
    Ok(tag)
}

fn read_compound(buf: &mut impl Buf, depth: usize) -> Result<NbtCompound, NbtError> {
    if depth > MAX_DEPTH {
        return Err(NbtError::NestingTooDeep { limit: MAX_DEPTH });
    }
    let mut map = NbtCompound::new();
    loop {
        ensure_remaining(buf, 1)?;
        let tag_type = buf.get_u8();
        if tag_type == TAG_END {
            break;
        }
        let name = read_string(buf)?;
        let tag = read_tag(buf, tag_type, depth)?;
        map.insert(name, tag);
    }
    Ok(map)
}

fn read_i32(buf: &mut impl Buf) -> Result<i32, NbtError> {
    ensure_remaining(buf, 4)?;
    Ok(buf.get_i32_le())
}

fn read_len(buf: &mut impl Buf) -> Result<usize, NbtError> {
    let len = read_i32(buf)?;
    usize::try_from(len).map_err(|_| NbtError::NegativeLength(len))
}

fn read_string(buf: &mut impl Buf) -> Result<String, NbtError> {
    ensure_remaining(buf, 2)?;
    let len = buf.get_u16_le() as usize;
    ensure_remaining(buf, len)?;
    let mut data = vec![0u8; len];
    buf.copy_to_slice(&mut data);
    String::from_utf8(data).map_err(|_| NbtError::InvalidUtf8)
}

fn ensure_remaining(buf: &impl Buf, needed: usize) -> Result<(), NbtError> {
    if buf.remaining() < needed {
        Err(NbtError::UnexpectedEof)
    } else {
        Ok(())
    }
}
