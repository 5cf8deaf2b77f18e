//! Little-endian NBT encoding.

use bytes::BufMut;

use crate::error::NbtError;
use crate::tag::{NbtCompound, NbtRoot, NbtTag, TAG_COMPOUND, TAG_END};

pub(crate) fn write_root(buf: &mut impl BufMut, root: &NbtRoot) -> Result<(), NbtError> {
    buf.put_u8(TAG_COMPOUND);
    write_string(buf, &root.name)?;
    write_compound(buf, &root.compound)
}

fn write_tag(buf: &mut impl BufMut, tag: &NbtTag) -> Result<(), NbtError> {
    match tag {
        NbtTag::Byte(v) => buf.put_i8(*v),
        NbtTag::Short(v) => buf.put_i16_le(*v),
        NbtTag::Int(v) => buf.put_i32_le(*v),
        NbtTag::Long(v) => buf.put_i64_le(*v),
        NbtTag::Float(v) => buf.put_f32_le(*v),
        NbtTag::Double(v) => buf.put_f64_le(*v),
        NbtTag::ByteArray(arr) => {
            buf.put_i32_le(arr.len() as i32);
            for &b in arr {
                buf.put_i8(b);
            }
        }
        NbtTag::String(s) => write_string(buf, s)?,
        NbtTag::List(list) => {
            // An empty list is written with element type TAG_End.
            let element_type = list.first().map_or(TAG_END, NbtTag::tag_type_id);
            buf.put_u8(element_type);
            buf.put_i32_le(list.len() as i32);
            for item in list {
                write_tag(buf, item)?;
            }
        }
        NbtTag::Compound(map) => write_compound(buf, map)?,
        NbtTag::IntArray(arr) => {
            buf.put_i32_le(arr.len() as i32);
            for &v in arr {
                buf.put_i32_le(v);
            }
        }
        NbtTag::LongArray(arr) => {
            buf.put_i32_le(arr.len() as i32);
            for &v in arr {
                buf.put_i64_le(v);
            }
        }
    }
    Ok(())
}

fn write_compound(buf: &mut impl BufMut, map: &NbtCompound) -> Result<(), NbtError> {
    for (name, tag) in map {
        buf.put_u8(tag.tag_type_id());
        write_string(buf, name)?;
        write_tag(buf, tag)?;
    }
    buf.put_u8(TAG_END);
    Ok(())
}

fn write_string(buf: &mut impl BufMut, s: &str) -> Result<(), NbtError> {
    let len = u16::try_from(s.len()).map_err(|_| NbtError::StringTooLong(s.len()))?;
    buf.put_u16_le(len);
    buf.put_slice(s.as_bytes());
    Ok(())
}
