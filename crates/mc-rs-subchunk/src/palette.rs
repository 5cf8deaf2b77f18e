//! Block state palettes.
//!
//! A persistent palette is an `i32_le` entry count followed by that many
//! little-endian NBT compounds of the form
//! `{name: String, states: Compound, version: Int}`.

use std::collections::BTreeMap;
use std::io::Cursor;

use bytes::{Buf, BufMut, BytesMut};
use mc_rs_nbt::{NbtCompound, NbtError, NbtRoot, NbtTag};
use serde::Serialize;

use crate::error::SubChunkError;

/// A block state property value.
///
/// NBT bytes holding 0 or 1 read as [`StateValue::Bool`]; every other integral
/// tag reads as [`StateValue::Int`]. Array tags read as lists of ints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StateValue {
    String(String),
    Int(i64),
    Bool(bool),
    Float(f64),
    List(Vec<StateValue>),
    Compound(BTreeMap<String, StateValue>),
}

impl StateValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StateValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            StateValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StateValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    fn from_tag(tag: &NbtTag) -> Self {
        match tag {
            NbtTag::Byte(v @ (0 | 1)) => StateValue::Bool(*v == 1),
            NbtTag::Byte(v) => StateValue::Int(i64::from(*v)),
            NbtTag::Short(v) => StateValue::Int(i64::from(*v)),
            NbtTag::Int(v) => StateValue::Int(i64::from(*v)),
            NbtTag::Long(v) => StateValue::Int(*v),
            NbtTag::Float(v) => StateValue::Float(f64::from(*v)),
            NbtTag::Double(v) => StateValue::Float(*v),
            NbtTag::String(v) => StateValue::String(v.clone()),
            NbtTag::List(items) => StateValue::List(items.iter().map(Self::from_tag).collect()),
            NbtTag::Compound(map) => StateValue::Compound(compound_values(map)),
            NbtTag::ByteArray(arr) => {
                StateValue::List(arr.iter().map(|&v| StateValue::Int(i64::from(v))).collect())
            }
            NbtTag::IntArray(arr) => {
                StateValue::List(arr.iter().map(|&v| StateValue::Int(i64::from(v))).collect())
            }
            NbtTag::LongArray(arr) => {
                StateValue::List(arr.iter().map(|&v| StateValue::Int(v)).collect())
            }
        }
    }

    /// `None` if a list mixes value kinds, which NBT cannot represent.
    fn to_tag(&self) -> Option<NbtTag> {
        let tag = match self {
            StateValue::String(v) => NbtTag::String(v.clone()),
            StateValue::Int(v) => match i32::try_from(*v) {
                Ok(v) => NbtTag::Int(v),
                Err(_) => NbtTag::Long(*v),
            },
            StateValue::Bool(v) => NbtTag::Byte(i8::from(*v)),
            StateValue::Float(v) => NbtTag::Double(*v),
            StateValue::List(items) if needs_long_list(items) => NbtTag::List(
                items
                    .iter()
                    .filter_map(StateValue::as_int)
                    .map(NbtTag::Long)
                    .collect(),
            ),
            StateValue::List(items) => {
                let tags = items.iter().map(Self::to_tag).collect::<Option<Vec<_>>>()?;
                let first = tags.first().map(NbtTag::tag_type_id);
                if tags.iter().any(|t| Some(t.tag_type_id()) != first) {
                    return None;
                }
                NbtTag::List(tags)
            }
            StateValue::Compound(map) => NbtTag::Compound(
                map.iter()
                    .map(|(k, v)| Some((k.clone(), v.to_tag()?)))
                    .collect::<Option<NbtCompound>>()?,
            ),
        };
        Some(tag)
    }
}

/// An all-int list with a value outside `i32` is written as a list of longs.
fn needs_long_list(items: &[StateValue]) -> bool {
    items.iter().all(|v| matches!(v, StateValue::Int(_)))
        && items
            .iter()
            .any(|v| matches!(v, StateValue::Int(n) if i32::try_from(*n).is_err()))
}

fn compound_values(map: &NbtCompound) -> BTreeMap<String, StateValue> {
    map.iter()
        .map(|(k, v)| (k.clone(), StateValue::from_tag(v)))
        .collect()
}

/// One palette entry: a block name and its property values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockState {
    name: String,
    states: BTreeMap<String, StateValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<i32>,
}

impl BlockState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: BTreeMap::new(),
            version: None,
        }
    }

    pub fn with_state(mut self, name: impl Into<String>, value: StateValue) -> Self {
        self.states.insert(name.into(), value);
        self
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = Some(version);
        self
    }

    /// Block identifier, e.g. `minecraft:stone`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self, name: &str) -> Option<&StateValue> {
        self.states.get(name)
    }

    pub fn states(&self) -> &BTreeMap<String, StateValue> {
        &self.states
    }

    /// Block state format version stored with the entry, if any.
    pub fn version(&self) -> Option<i32> {
        self.version
    }

    /// Build a state from palette compound number `entry`.
    pub fn from_nbt(entry: usize, compound: &NbtCompound) -> Result<Self, SubChunkError> {
        let name = compound
            .get("name")
            .and_then(NbtTag::as_string)
            .ok_or(SubChunkError::MalformedPaletteEntry {
                entry,
                reason: "missing string \"name\" tag",
            })?;

        let states = match compound.get("states") {
            None => BTreeMap::new(),
            Some(tag) => tag.as_compound().map(compound_values).ok_or(
                SubChunkError::MalformedPaletteEntry {
                    entry,
                    reason: "\"states\" is not a compound",
                },
            )?,
        };

        let version = compound.get("version").and_then(NbtTag::as_int);

        Ok(Self {
            name: name.to_owned(),
            states,
            version,
        })
    }

    fn to_nbt(&self, entry: usize) -> Result<NbtRoot, SubChunkError> {
        let mut states = NbtCompound::new();
        for (k, v) in &self.states {
            let tag = v.to_tag().ok_or(SubChunkError::MalformedPaletteEntry {
                entry,
                reason: "list state values must share one type",
            })?;
            states.insert(k.clone(), tag);
        }

        let mut compound = NbtCompound::new();
        compound.insert("name".into(), NbtTag::String(self.name.clone()));
        compound.insert("states".into(), NbtTag::Compound(states));
        if let Some(version) = self.version {
            compound.insert("version".into(), NbtTag::Int(version));
        }
        Ok(NbtRoot::new("", compound))
    }
}

/// Decodes the NBT compounds that make up a palette.
///
/// Implementations must consume exactly the bytes of `count` compounds and
/// leave the cursor after the last one.
pub trait TagListParser {
    fn parse_tag_list(
        &self,
        cursor: &mut Cursor<&[u8]>,
        count: usize,
    ) -> Result<Vec<NbtCompound>, NbtError>;
}

/// Little-endian NBT, the encoding used by Bedrock world saves.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeNbtParser;

impl TagListParser for LeNbtParser {
    fn parse_tag_list(
        &self,
        cursor: &mut Cursor<&[u8]>,
        count: usize,
    ) -> Result<Vec<NbtCompound>, NbtError> {
        let roots = mc_rs_nbt::read_nbt_le_list(cursor, count)?;
        Ok(roots.into_iter().map(|root| root.compound).collect())
    }
}

/// Read a palette size and that many block states.
///
/// Declared sizes above `max_len` are rejected before any entry is parsed.
pub fn decode_palette<P: TagListParser + ?Sized>(
    cursor: &mut Cursor<&[u8]>,
    parser: &P,
    max_len: usize,
) -> Result<Vec<BlockState>, SubChunkError> {
    let offset = cursor.position();
    if cursor.remaining() < 4 {
        return Err(SubChunkError::TruncatedData {
            what: "palette size",
            offset,
            needed: 4,
            remaining: cursor.remaining(),
        });
    }
    let size = cursor.get_i32_le();
    let declared =
        usize::try_from(size).map_err(|_| SubChunkError::NegativePaletteSize { size, offset })?;
    if declared > max_len {
        return Err(SubChunkError::PaletteTooLarge {
            size: declared,
            limit: max_len,
            offset,
        });
    }

    let entries_offset = cursor.position();
    let entries = parser
        .parse_tag_list(cursor, declared)
        .map_err(|source| SubChunkError::Nbt {
            offset: entries_offset,
            source,
        })?;
    if entries.len() != declared {
        return Err(SubChunkError::PaletteSizeMismatch {
            declared,
            parsed: entries.len(),
        });
    }

    entries
        .iter()
        .enumerate()
        .map(|(entry, compound)| BlockState::from_nbt(entry, compound))
        .collect()
}

/// Write a palette size followed by one NBT compound per state.
///
/// Palettes longer than `max_len` are rejected so the output stays decodable
/// under the same limit.
pub fn encode_palette(
    buf: &mut BytesMut,
    palette: &[BlockState],
    max_len: usize,
) -> Result<(), SubChunkError> {
    let too_large = SubChunkError::PaletteTooLarge {
        size: palette.len(),
        limit: max_len,
        offset: buf.len() as u64,
    };
    if palette.len() > max_len {
        return Err(too_large);
    }
    let size = i32::try_from(palette.len()).map_err(|_| too_large)?;
    buf.put_i32_le(size);
    for (entry, state) in palette.iter().enumerate() {
        let root = state.to_nbt(entry)?;
        let offset = buf.len() as u64;
        mc_rs_nbt::write_nbt_le(buf, &root)
            .map_err(|source| SubChunkError::Nbt { offset, source })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(palette: &[BlockState]) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_palette(&mut buf, palette, 4096).unwrap();
        buf
    }

    fn decode(bytes: &[u8]) -> Result<Vec<BlockState>, SubChunkError> {
        decode_palette(&mut Cursor::new(bytes), &LeNbtParser, 4096)
    }

    fn lever() -> BlockState {
        BlockState::new("minecraft:lever")
            .with_state("lever_direction", StateValue::String("north".into()))
            .with_state("open_bit", StateValue::Bool(true))
            .with_version(18_100_737)
    }

    #[test]
    fn decode_entries_in_order() {
        let palette = vec![
            BlockState::new("minecraft:air"),
            lever(),
            BlockState::new("minecraft:wheat").with_state("growth", StateValue::Int(3)),
        ];
        assert_eq!(decode(&encoded(&palette)).unwrap(), palette);
    }

    #[test]
    fn decode_leaves_trailing_bytes() {
        let mut buf = encoded(&[BlockState::new("minecraft:stone")]);
        let palette_len = buf.len();
        buf.extend_from_slice(&[0x08, 0x01]);

        let mut cursor = Cursor::new(&buf[..]);
        let palette = decode_palette(&mut cursor, &LeNbtParser, 16).unwrap();
        assert_eq!(palette.len(), 1);
        assert_eq!(cursor.position(), palette_len as u64);
    }

    #[test]
    fn empty_palette() {
        assert!(decode(&0i32.to_le_bytes()).unwrap().is_empty());
    }

    #[test]
    fn byte_states_read_as_bools_or_ints() {
        let mut states = NbtCompound::new();
        states.insert("open_bit".into(), NbtTag::Byte(0));
        states.insert("odd".into(), NbtTag::Byte(7));
        states.insert("facing".into(), NbtTag::Short(2));
        let mut c = NbtCompound::new();
        c.insert("name".into(), NbtTag::String("minecraft:door".into()));
        c.insert("states".into(), NbtTag::Compound(states));

        let state = BlockState::from_nbt(0, &c).unwrap();
        assert_eq!(state.state("open_bit"), Some(&StateValue::Bool(false)));
        assert_eq!(state.state("odd").and_then(StateValue::as_int), Some(7));
        assert_eq!(state.state("facing").and_then(StateValue::as_int), Some(2));
        assert_eq!(state.version(), None);
    }

    #[test]
    fn missing_name_is_malformed() {
        let mut c = NbtCompound::new();
        c.insert("states".into(), NbtTag::Compound(NbtCompound::new()));
        assert!(matches!(
            BlockState::from_nbt(4, &c),
            Err(SubChunkError::MalformedPaletteEntry { entry: 4, .. })
        ));

        let mut c = NbtCompound::new();
        c.insert("name".into(), NbtTag::Int(1));
        assert!(matches!(
            BlockState::from_nbt(0, &c),
            Err(SubChunkError::MalformedPaletteEntry { entry: 0, .. })
        ));
    }

    #[test]
    fn states_must_be_compound() {
        let mut c = NbtCompound::new();
        c.insert("name".into(), NbtTag::String("minecraft:stone".into()));
        c.insert("states".into(), NbtTag::Int(0));
        assert!(matches!(
            BlockState::from_nbt(0, &c),
            Err(SubChunkError::MalformedPaletteEntry { .. })
        ));
    }

    #[test]
    fn negative_size() {
        assert!(matches!(
            decode(&(-1i32).to_le_bytes()),
            Err(SubChunkError::NegativePaletteSize { size: -1, offset: 0 })
        ));
    }

    #[test]
    fn size_over_limit() {
        let err = decode_palette(&mut Cursor::new(&5000i32.to_le_bytes()[..]), &LeNbtParser, 4096)
            .unwrap_err();
        assert!(matches!(
            err,
            SubChunkError::PaletteTooLarge {
                size: 5000,
                limit: 4096,
                ..
            }
        ));
    }

    #[test]
    fn truncated_size() {
        assert!(matches!(
            decode(&[1, 0]),
            Err(SubChunkError::TruncatedData {
                what: "palette size",
                needed: 4,
                remaining: 2,
                ..
            })
        ));
    }

    #[test]
    fn truncated_entries() {
        let mut buf = encoded(&[BlockState::new("minecraft:stone")]);
        buf[0] = 2;
        assert!(matches!(
            decode(&buf),
            Err(SubChunkError::Nbt { offset: 4, .. })
        ));
    }

    struct ShortParser;

    impl TagListParser for ShortParser {
        fn parse_tag_list(
            &self,
            _cursor: &mut Cursor<&[u8]>,
            count: usize,
        ) -> Result<Vec<NbtCompound>, NbtError> {
            let mut c = NbtCompound::new();
            c.insert("name".into(), NbtTag::String("minecraft:air".into()));
            Ok(vec![c; count.saturating_sub(1)])
        }
    }

    #[test]
    fn parser_count_mismatch() {
        let err = decode_palette(&mut Cursor::new(&3i32.to_le_bytes()[..]), &ShortParser, 16)
            .unwrap_err();
        assert!(matches!(
            err,
            SubChunkError::PaletteSizeMismatch {
                declared: 3,
                parsed: 2
            }
        ));
    }

    #[test]
    fn mixed_list_cannot_be_encoded() {
        let state = BlockState::new("minecraft:odd").with_state(
            "mixed",
            StateValue::List(vec![StateValue::Int(1), StateValue::String("a".into())]),
        );
        let mut buf = BytesMut::new();
        assert!(matches!(
            encode_palette(&mut buf, &[state], 4096),
            Err(SubChunkError::MalformedPaletteEntry { entry: 0, .. })
        ));
    }

    #[test]
    fn wide_int_list_written_as_longs() {
        let state = BlockState::new("minecraft:odd").with_state(
            "values",
            StateValue::List(vec![StateValue::Int(1), StateValue::Int(1 << 40)]),
        );
        let palette = decode(&encoded(&[state.clone()])).unwrap();
        assert_eq!(palette, vec![state]);
    }

    #[test]
    fn palette_over_limit_not_encoded() {
        let palette = vec![BlockState::new("minecraft:air"); 3];
        let mut buf = BytesMut::new();
        assert!(matches!(
            encode_palette(&mut buf, &palette, 2),
            Err(SubChunkError::PaletteTooLarge {
                size: 3,
                limit: 2,
                offset: 0
            })
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn json_rendering() {
        let json = serde_json::to_value(lever()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "minecraft:lever",
                "states": {"lever_direction": "north", "open_bit": true},
                "version": 18_100_737
            })
        );
        let air = serde_json::to_value(BlockState::new("minecraft:air")).unwrap();
        assert_eq!(air, serde_json::json!({"name": "minecraft:air", "states": {}}));
    }
}
