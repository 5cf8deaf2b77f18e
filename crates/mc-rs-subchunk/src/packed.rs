//! Palette indices packed into little-endian `u32` words.
//!
//! A storage record starts with one byte: bit 0 is the storage format flag
//! (0 = persistent, NBT palette) and the upper 7 bits are the bits per index.
//! Each word holds `32 / bits` indices starting at the least significant bit.
//! Indices never straddle two words; when `bits` does not divide 32 the high
//! bits of every word are padding.

use std::io::Cursor;

use bytes::{Buf, BufMut};
use tracing::trace;

use crate::error::SubChunkError;
use crate::voxel::BLOCK_COUNT;

/// One palette index per block, in storage order.
pub type BlockIndices = Box<[u32; BLOCK_COUNT]>;

const MAX_BITS_PER_INDEX: u8 = 32;

/// Number of indices held by one word, or `None` for an unusable width.
pub fn indices_per_word(bits_per_index: u8) -> Option<usize> {
    if bits_per_index == 0 || bits_per_index > MAX_BITS_PER_INDEX {
        return None;
    }
    Some(32 / bits_per_index as usize)
}

/// Number of words needed to store a full sub-chunk at the given width.
pub fn word_count(bits_per_index: u8) -> Option<usize> {
    indices_per_word(bits_per_index).map(|per_word| BLOCK_COUNT.div_ceil(per_word))
}

/// Smallest Bedrock index width able to address `palette_len` entries.
/// Valid values: 1, 2, 3, 4, 5, 6, 8, 16, 32.
pub fn bits_per_index_for_palette(palette_len: usize) -> u8 {
    match palette_len {
        0..=2 => 1,
        3..=4 => 2,
        5..=8 => 3,
        9..=16 => 4,
        17..=32 => 5,
        33..=64 => 6,
        65..=256 => 8,
        257..=65536 => 16,
        _ => 32,
    }
}

fn index_mask(bits_per_index: u8) -> u32 {
    u32::MAX >> (32 - bits_per_index as u32)
}

/// Read the header byte and packed words of one storage record.
///
/// The returned values are only bounded by the index width; checking them
/// against a palette is the caller's job.
pub fn unpack_indices(cursor: &mut Cursor<&[u8]>) -> Result<(u8, BlockIndices), SubChunkError> {
    let header_offset = cursor.position();
    if !cursor.has_remaining() {
        return Err(SubChunkError::TruncatedData {
            what: "storage header",
            offset: header_offset,
            needed: 1,
            remaining: 0,
        });
    }
    let header = cursor.get_u8();

    let flag = header & 1;
    if flag != 0 {
        return Err(SubChunkError::UnsupportedStorageFormat {
            flag,
            offset: header_offset,
        });
    }

    let bits = header >> 1;
    let (per_word, words) = match (indices_per_word(bits), word_count(bits)) {
        (Some(per_word), Some(words)) => (per_word, words),
        _ => {
            return Err(SubChunkError::InvalidBitWidth {
                bits,
                offset: header_offset,
            })
        }
    };

    let needed = words * 4;
    if cursor.remaining() < needed {
        return Err(SubChunkError::TruncatedData {
            what: "packed block indices",
            offset: cursor.position(),
            needed,
            remaining: cursor.remaining(),
        });
    }
    trace!("unpacking {BLOCK_COUNT} indices at {bits} bits from {words} words");

    let mask = index_mask(bits);
    let mut indices: BlockIndices = Box::new([0; BLOCK_COUNT]);
    let mut position = 0;
    for _ in 0..words {
        let word = cursor.get_u32_le();
        for slot in 0..per_word {
            if position == BLOCK_COUNT {
                break;
            }
            indices[position] = (word >> (slot * bits as usize)) & mask;
            position += 1;
        }
    }

    Ok((bits, indices))
}

/// Write a persistent storage header and the packed words for `indices`.
pub fn pack_indices(
    buf: &mut impl BufMut,
    indices: &[u32; BLOCK_COUNT],
    bits_per_index: u8,
) -> Result<(), SubChunkError> {
    let Some(per_word) = indices_per_word(bits_per_index) else {
        return Err(SubChunkError::InvalidBitWidth {
            bits: bits_per_index,
            offset: 0,
        });
    };
    let mask = index_mask(bits_per_index);
    if let Some(position) = indices.iter().position(|&index| index & !mask != 0) {
        return Err(SubChunkError::IndexTooWide {
            index: indices[position],
            position,
            bits: bits_per_index,
        });
    }

    buf.put_u8(bits_per_index << 1);
    for chunk in indices.chunks(per_word) {
        let mut word = 0u32;
        for (slot, &index) in chunk.iter().enumerate() {
            word |= index << (slot * bits_per_index as usize);
        }
        buf.put_u32_le(word);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn pattern(bits: u8) -> BlockIndices {
        let modulus = 1u64 << bits;
        let mut indices: BlockIndices = Box::new([0; BLOCK_COUNT]);
        for (i, slot) in indices.iter_mut().enumerate() {
            *slot = ((i as u64 * 7 + i as u64 / 13) % modulus) as u32;
        }
        indices
    }

    fn unpack(bytes: &[u8]) -> Result<(u8, BlockIndices), SubChunkError> {
        unpack_indices(&mut Cursor::new(bytes))
    }

    #[test]
    fn word_counts() {
        assert_eq!(word_count(1), Some(128));
        assert_eq!(word_count(2), Some(256));
        assert_eq!(word_count(3), Some(410));
        assert_eq!(word_count(4), Some(512));
        assert_eq!(word_count(5), Some(683));
        assert_eq!(word_count(6), Some(820));
        assert_eq!(word_count(8), Some(1024));
        assert_eq!(word_count(16), Some(2048));
        assert_eq!(word_count(32), Some(4096));
        assert_eq!(word_count(0), None);
        assert_eq!(word_count(33), None);
    }

    #[test]
    fn bits_per_index_selection() {
        assert_eq!(bits_per_index_for_palette(0), 1);
        assert_eq!(bits_per_index_for_palette(1), 1);
        assert_eq!(bits_per_index_for_palette(2), 1);
        assert_eq!(bits_per_index_for_palette(3), 2);
        assert_eq!(bits_per_index_for_palette(5), 3);
        assert_eq!(bits_per_index_for_palette(16), 4);
        assert_eq!(bits_per_index_for_palette(17), 5);
        assert_eq!(bits_per_index_for_palette(64), 6);
        assert_eq!(bits_per_index_for_palette(256), 8);
        assert_eq!(bits_per_index_for_palette(4096), 16);
    }

    #[test]
    fn pack_unpack_all_common_widths() {
        for bits in [1u8, 2, 3, 4, 5, 6, 8, 16, 32] {
            let indices = pattern(bits);
            let mut buf = BytesMut::new();
            pack_indices(&mut buf, &indices, bits).unwrap();
            assert_eq!(buf.len(), 1 + word_count(bits).unwrap() * 4, "{bits} bits");

            let (read_bits, decoded) = unpack(&buf).unwrap();
            assert_eq!(read_bits, bits);
            assert_eq!(decoded, indices, "{bits} bits");
        }
    }

    #[test]
    fn full_width_indices() {
        let mut indices: BlockIndices = Box::new([0; BLOCK_COUNT]);
        indices[0] = u32::MAX;
        indices[1] = 0x8000_0001;
        indices[4095] = 0xDEAD_BEEF;
        let mut buf = BytesMut::new();
        pack_indices(&mut buf, &indices, 32).unwrap();
        assert_eq!(buf[0], 32 << 1);
        assert_eq!(&buf[1..5], &[0xFFu8; 4]);

        let (bits, decoded) = unpack(&buf).unwrap();
        assert_eq!(bits, 32);
        assert_eq!(decoded, indices);
    }

    #[test]
    fn unpack_stops_after_packed_words() {
        let indices = pattern(4);
        let mut buf = BytesMut::new();
        pack_indices(&mut buf, &indices, 4).unwrap();
        buf.extend_from_slice(&[1, 2, 3]);

        let mut cursor = Cursor::new(&buf[..]);
        unpack_indices(&mut cursor).unwrap();
        assert_eq!(cursor.position(), 1 + 512 * 4);
    }

    #[test]
    fn four_bit_word_layout() {
        // header: 4 bits, persistent
        let mut data = vec![4 << 1];
        data.extend_from_slice(&0x7654_3210u32.to_le_bytes());
        data.extend_from_slice(&[0; 511 * 4]);

        let (_, indices) = unpack(&data).unwrap();
        assert_eq!(&indices[..9], &[0, 1, 2, 3, 4, 5, 6, 7, 0]);
    }

    #[test]
    fn five_bit_padding_is_discarded() {
        // Six 5-bit indices fill the low 30 bits; the top two bits are padding.
        let word: u32 = 0b11 << 30 | 31 << 25 | 1 << 20 | 2 << 15 | 3 << 10 | 4 << 5 | 5;
        let mut data = vec![5 << 1];
        for _ in 0..word_count(5).unwrap() {
            data.extend_from_slice(&word.to_le_bytes());
        }

        let (_, indices) = unpack(&data).unwrap();
        assert_eq!(&indices[..6], &[5, 4, 3, 2, 1, 31]);
        // The seventh index starts the next word, not the padding bits.
        assert_eq!(indices[6], 5);
        assert_eq!(&indices[6..12], &[5, 4, 3, 2, 1, 31]);
        assert!(indices.iter().all(|&i| i < 32));
    }

    #[test]
    fn packed_padding_bits_are_zero() {
        let mut indices: BlockIndices = Box::new([0; BLOCK_COUNT]);
        indices.fill(31);
        let mut buf = BytesMut::new();
        pack_indices(&mut buf, &indices, 5).unwrap();
        let word = u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]);
        assert_eq!(word >> 30, 0);
        assert_eq!(word, (1 << 30) - 1);
    }

    #[test]
    fn runtime_flag_rejected() {
        let data = [(4 << 1) | 1];
        assert!(matches!(
            unpack(&data),
            Err(SubChunkError::UnsupportedStorageFormat { flag: 1, offset: 0 })
        ));
    }

    #[test]
    fn zero_and_oversized_widths_rejected() {
        assert!(matches!(
            unpack(&[0]),
            Err(SubChunkError::InvalidBitWidth { bits: 0, .. })
        ));
        assert!(matches!(
            unpack(&[33 << 1]),
            Err(SubChunkError::InvalidBitWidth { bits: 33, .. })
        ));
    }

    #[test]
    fn truncated_words() {
        let mut data = vec![4 << 1];
        data.extend_from_slice(&[0; 100]);
        assert!(matches!(
            unpack(&data),
            Err(SubChunkError::TruncatedData {
                offset: 1,
                needed: 2048,
                remaining: 100,
                ..
            })
        ));
        assert!(matches!(
            unpack(&[]),
            Err(SubChunkError::TruncatedData { needed: 1, .. })
        ));
    }

    #[test]
    fn pack_rejects_index_wider_than_width() {
        let mut indices: BlockIndices = Box::new([0; BLOCK_COUNT]);
        indices[10] = 4;
        let mut buf = BytesMut::new();
        assert!(matches!(
            pack_indices(&mut buf, &indices, 2),
            Err(SubChunkError::IndexTooWide {
                index: 4,
                position: 10,
                bits: 2
            })
        ));
        assert!(buf.is_empty());
    }
}
