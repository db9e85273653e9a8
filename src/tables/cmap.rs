//! Parsing of the `cmap` table and construction of the character map.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/cmap>

use encoding_rs::MACINTOSH;
use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::binary::read::{ReadArray, ReadBinary, ReadCtxt, ReadFixed, ReadFrom, ReadScope};
use crate::binary::{I16Be, U16Be, U32Be, U8};
use crate::error::ParseError;

/// Unicode codepoint to glyph index.
pub type CharMap = FxHashMap<u32, u32>;

/// Highest Unicode scalar value, bounds the ranges enumerated from segmented subtables.
const MAX_CODEPOINT: u32 = 0x10FFFF;

/// Windows Symbol fonts place their characters in this private use block.
const SYMBOL_BASE: u32 = 0xF000;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PlatformId(pub u16);

impl PlatformId {
    pub const UNICODE: PlatformId = PlatformId(0);
    pub const MACINTOSH: PlatformId = PlatformId(1);
    pub const ISO: PlatformId = PlatformId(2);
    pub const WINDOWS: PlatformId = PlatformId(3);
    pub const CUSTOM: PlatformId = PlatformId(4);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EncodingId(pub u16);

impl EncodingId {
    pub const UNICODE_1_0: EncodingId = EncodingId(0);
    pub const UNICODE_1_1: EncodingId = EncodingId(1);
    pub const UNICODE_ISO_10646: EncodingId = EncodingId(2);
    pub const UNICODE_2_0_BMP: EncodingId = EncodingId(3);
    pub const UNICODE_2_0_FULL: EncodingId = EncodingId(4);
    pub const UNICODE_FULL: EncodingId = EncodingId(6);

    pub const WINDOWS_SYMBOL: EncodingId = EncodingId(0);
    pub const WINDOWS_UNICODE_BMP_UCS2: EncodingId = EncodingId(1);
    pub const WINDOWS_SHIFT_JIS: EncodingId = EncodingId(2);
    pub const WINDOWS_PRC: EncodingId = EncodingId(3);
    pub const WINDOWS_BIG5: EncodingId = EncodingId(4);
    pub const WINDOWS_WANSUNG: EncodingId = EncodingId(5);
    pub const WINDOWS_JOHAB: EncodingId = EncodingId(6);
    pub const WINDOWS_UNICODE_UCS4: EncodingId = EncodingId(10);

    pub const MACINTOSH_APPLE_ROMAN: EncodingId = EncodingId(0);
}

/// Subtables tried in order when building the character map.
const PREFERRED_SUBTABLES: [(PlatformId, EncodingId); 10] = [
    (PlatformId::WINDOWS, EncodingId::WINDOWS_UNICODE_UCS4),
    (PlatformId::UNICODE, EncodingId::UNICODE_FULL),
    (PlatformId::UNICODE, EncodingId::UNICODE_2_0_FULL),
    (PlatformId::WINDOWS, EncodingId::WINDOWS_UNICODE_BMP_UCS2),
    (PlatformId::UNICODE, EncodingId::UNICODE_2_0_BMP),
    (PlatformId::UNICODE, EncodingId::UNICODE_ISO_10646),
    (PlatformId::UNICODE, EncodingId::UNICODE_1_1),
    (PlatformId::UNICODE, EncodingId::UNICODE_1_0),
    (PlatformId::WINDOWS, EncodingId::WINDOWS_SYMBOL),
    (PlatformId::MACINTOSH, EncodingId::MACINTOSH_APPLE_ROMAN),
];

pub struct Cmap<'a> {
    pub scope: ReadScope<'a>,
    encoding_records: ReadArray<'a, EncodingRecord>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EncodingRecord {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub offset: u32,
}

pub enum CmapSubtable<'a> {
    Format0 {
        language: u16,
        glyph_id_array: ReadArray<'a, U8>,
    },
    Format4 {
        language: u16,
        end_codes: ReadArray<'a, U16Be>,
        start_codes: ReadArray<'a, U16Be>,
        id_deltas: ReadArray<'a, I16Be>,
        id_range_offsets: ReadArray<'a, U16Be>,
        glyph_id_array: ReadArray<'a, U16Be>,
    },
    Format6 {
        language: u16,
        first_code: u16,
        glyph_id_array: ReadArray<'a, U16Be>,
    },
    Format10 {
        language: u32,
        start_char_code: u32,
        glyph_id_array: ReadArray<'a, U16Be>,
    },
    Format12 {
        language: u32,
        groups: ReadArray<'a, SequentialMapGroup>,
    },
    /// Many-to-one range mappings: every code in a group maps to the same glyph.
    Format13 {
        language: u32,
        groups: ReadArray<'a, SequentialMapGroup>,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SequentialMapGroup {
    pub start_char_code: u32,
    pub end_char_code: u32,
    pub start_glyph_id: u32,
}

/// Check that `encoding_id` is defined for `platform_id`.
pub fn verify_platform_id(platform_id: u16, encoding_id: u16) -> bool {
    match PlatformId(platform_id) {
        PlatformId::UNICODE => encoding_id <= 6,
        PlatformId::MACINTOSH => encoding_id <= 32,
        PlatformId::ISO => encoding_id <= 2,
        PlatformId::WINDOWS => encoding_id <= 6 || encoding_id == 10,
        PlatformId::CUSTOM => true,
        _ => false,
    }
}

impl ReadBinary for Cmap<'_> {
    type HostType<'a> = Cmap<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Cmap<'a>, ParseError> {
        let scope = ctxt.scope();
        let version = ctxt.read_u16be()?;
        ctxt.check_version(version == 0)?;
        let num_tables = usize::from(ctxt.read_u16be()?);
        let encoding_records = ctxt.read_array::<EncodingRecord>(num_tables)?;
        Ok(Cmap {
            scope,
            encoding_records,
        })
    }
}

impl ReadFrom for EncodingRecord {
    type ReadType = (U16Be, U16Be, U32Be);
    fn read_from((platform_id, encoding_id, offset): (u16, u16, u32)) -> Self {
        EncodingRecord {
            platform_id,
            encoding_id,
            offset,
        }
    }
}

impl ReadBinary for CmapSubtable<'_> {
    type HostType<'a> = CmapSubtable<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<CmapSubtable<'a>, ParseError> {
        let subtable_format = ctxt.read_u16be()?;
        match subtable_format {
            0 => {
                let length = usize::from(ctxt.read_u16be()?);
                ctxt.check(length >= 3 * U16Be::SIZE + 256)?;
                let language = ctxt.read_u16be()?;
                let glyph_id_array = ctxt.read_array::<U8>(256)?;
                Ok(CmapSubtable::Format0 {
                    language,
                    glyph_id_array,
                })
            }
            4 => {
                let length = usize::from(ctxt.read_u16be()?);
                let language = ctxt.read_u16be()?;
                let seg_count_x2 = usize::from(ctxt.read_u16be()?);
                ctxt.check((seg_count_x2 & 1) == 0)?;
                let seg_count = seg_count_x2 >> 1;
                let _search_range = ctxt.read_u16be()?;
                let _entry_selector = ctxt.read_u16be()?;
                let _range_shift = ctxt.read_u16be()?;
                let end_codes = ctxt.read_array::<U16Be>(seg_count)?;
                let _reserved_pad = ctxt.read_u16be()?;
                let start_codes = ctxt.read_array::<U16Be>(seg_count)?;
                let id_deltas = ctxt.read_array::<I16Be>(seg_count)?;
                let id_range_offsets = ctxt.read_array::<U16Be>(seg_count)?;
                let header_size = (8 + (4 * seg_count)) * U16Be::SIZE;
                ctxt.check(length >= header_size)?;
                let remaining = length - header_size;
                let glyph_id_array = ctxt.read_array::<U16Be>(remaining >> 1)?;
                Ok(CmapSubtable::Format4 {
                    language,
                    end_codes,
                    start_codes,
                    id_deltas,
                    id_range_offsets,
                    glyph_id_array,
                })
            }
            6 => {
                let _length = ctxt.read_u16be()?;
                let language = ctxt.read_u16be()?;
                let first_code = ctxt.read_u16be()?;
                let entry_count = usize::from(ctxt.read_u16be()?);
                let glyph_id_array = ctxt.read_array::<U16Be>(entry_count)?;
                Ok(CmapSubtable::Format6 {
                    language,
                    first_code,
                    glyph_id_array,
                })
            }
            10 => {
                let reserved = ctxt.read_u16be()?;
                ctxt.check(reserved == 0)?;
                let _length = ctxt.read_u32be()?;
                let language = ctxt.read_u32be()?;
                let start_char_code = ctxt.read_u32be()?;
                let num_chars = usize::try_from(ctxt.read_u32be()?)?;
                let glyph_id_array = ctxt.read_array::<U16Be>(num_chars)?;
                Ok(CmapSubtable::Format10 {
                    language,
                    start_char_code,
                    glyph_id_array,
                })
            }
            12 | 13 => {
                let reserved = ctxt.read_u16be()?;
                ctxt.check(reserved == 0)?;
                let _length = ctxt.read_u32be()?;
                let language = ctxt.read_u32be()?;
                let num_groups = usize::try_from(ctxt.read_u32be()?)?;
                let groups = ctxt.read_array::<SequentialMapGroup>(num_groups)?;
                if subtable_format == 12 {
                    Ok(CmapSubtable::Format12 { language, groups })
                } else {
                    Ok(CmapSubtable::Format13 { language, groups })
                }
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl ReadFrom for SequentialMapGroup {
    type ReadType = (U32Be, U32Be, U32Be);
    fn read_from((start_char_code, end_char_code, start_glyph_id): (u32, u32, u32)) -> Self {
        SequentialMapGroup {
            start_char_code,
            end_char_code,
            start_glyph_id,
        }
    }
}

impl<'a> Cmap<'a> {
    /// Find the first encoding record for the given `platform_id` and `encoding_id`
    pub fn find_subtable(
        &self,
        platform_id: PlatformId,
        encoding_id: EncodingId,
    ) -> Option<EncodingRecord> {
        self.encoding_records.iter().find(|record| {
            record.platform_id == platform_id.0 && record.encoding_id == encoding_id.0
        })
    }

    /// All encoding records with a valid platform and encoding combination.
    pub fn valid_records(&self) -> impl Iterator<Item = EncodingRecord> + 'a {
        self.encoding_records.iter().filter(|record| {
            let valid = verify_platform_id(record.platform_id, record.encoding_id);
            if !valid {
                debug!(
                    "skipping cmap encoding record ({}, {})",
                    record.platform_id, record.encoding_id
                );
            }
            valid
        })
    }

    pub fn subtable(&self, record: &EncodingRecord) -> Result<CmapSubtable<'a>, ParseError> {
        let offset = usize::try_from(record.offset)?;
        self.scope.offset(offset).read::<CmapSubtable<'_>>()
    }

    /// Build the character map from the most preferred subtable that decodes.
    ///
    /// Glyph ids of 0 and ids `>= num_glyphs` are left unmapped. Returns an empty map if no
    /// subtable is usable.
    pub fn char_map(&self, num_glyphs: u32) -> CharMap {
        let records = self.valid_records().collect::<Vec<_>>();
        for (platform_id, encoding_id) in PREFERRED_SUBTABLES {
            let candidates = records.iter().filter(|record| {
                record.platform_id == platform_id.0 && record.encoding_id == encoding_id.0
            });
            for record in candidates {
                match self.decode_subtable(record, num_glyphs) {
                    Ok(char_map) => {
                        debug!(
                            "using cmap subtable ({}, {}) with {} mappings",
                            record.platform_id,
                            record.encoding_id,
                            char_map.len()
                        );
                        return char_map;
                    }
                    Err(err) => {
                        debug!(
                            "cmap subtable ({}, {}) unusable: {}",
                            record.platform_id, record.encoding_id, err
                        );
                    }
                }
            }
        }

        warn!("no usable cmap subtable, character map is empty");
        CharMap::default()
    }

    fn decode_subtable(
        &self,
        record: &EncodingRecord,
        num_glyphs: u32,
    ) -> Result<CharMap, ParseError> {
        let subtable = self.subtable(record)?;
        let mut char_map = CharMap::default();
        let mut insert = |ch: u32, glyph_id: u32| {
            if glyph_id != 0 && glyph_id < num_glyphs {
                char_map.entry(ch).or_insert(glyph_id);
            }
        };

        match (PlatformId(record.platform_id), EncodingId(record.encoding_id)) {
            (PlatformId::MACINTOSH, _) => subtable.mappings(num_glyphs, |code, glyph_id| {
                if let Some(ch) = mac_roman_to_unicode(code) {
                    insert(ch, glyph_id);
                }
            })?,
            (PlatformId::WINDOWS, EncodingId::WINDOWS_SYMBOL) => {
                subtable.mappings(num_glyphs, |code, glyph_id| {
                    insert(code, glyph_id);
                    if (SYMBOL_BASE..=SYMBOL_BASE + 0xFF).contains(&code) {
                        insert(code - SYMBOL_BASE, glyph_id);
                    }
                })?
            }
            _ => subtable.mappings(num_glyphs, &mut insert)?,
        }

        Ok(char_map)
    }
}

fn mac_roman_to_unicode(code: u32) -> Option<u32> {
    let byte = u8::try_from(code).ok()?;
    let bytes = [byte];
    let (decoded, _had_errors) = MACINTOSH.decode_without_bom_handling(&bytes);
    decoded.chars().next().map(u32::from)
}

impl<'a> CmapSubtable<'a> {
    pub fn map_glyph(&self, ch: u32) -> Result<Option<u32>, ParseError> {
        match *self {
            CmapSubtable::Format0 {
                ref glyph_id_array, ..
            } => Ok(usize::try_from(ch)
                .ok()
                .and_then(|index| glyph_id_array.get_item(index))
                .map(u32::from)),
            CmapSubtable::Format4 { .. } => {
                let Ok(ch) = u16::try_from(ch) else {
                    return Ok(None);
                };
                for segment in 0..self.segment_count() {
                    if let Some(glyph_id) = self.format4_lookup(segment, ch)? {
                        return Ok(Some(glyph_id));
                    }
                }
                Ok(None)
            }
            CmapSubtable::Format6 {
                first_code,
                ref glyph_id_array,
                ..
            } => Ok(ch
                .checked_sub(u32::from(first_code))
                .and_then(|index| glyph_id_array.get_item(usize::try_from(index).ok()?))
                .map(u32::from)),
            CmapSubtable::Format10 {
                start_char_code,
                ref glyph_id_array,
                ..
            } => Ok(ch
                .checked_sub(start_char_code)
                .and_then(|index| glyph_id_array.get_item(usize::try_from(index).ok()?))
                .map(u32::from)),
            CmapSubtable::Format12 { ref groups, .. } => Ok(groups
                .iter()
                .find(|group| group.start_char_code <= ch && ch <= group.end_char_code)
                .and_then(|group| group.start_glyph_id.checked_add(ch - group.start_char_code))),
            CmapSubtable::Format13 { ref groups, .. } => Ok(groups
                .iter()
                .find(|group| group.start_char_code <= ch && ch <= group.end_char_code)
                .map(|group| group.start_glyph_id)),
        }
    }

    /// Call `f` with every `(code, glyph_id)` pair in the subtable.
    ///
    /// Ranged formats are only enumerated as far as they can produce glyph ids below
    /// `num_glyphs`, so a corrupt group cannot produce an unbounded number of mappings.
    pub fn mappings<F>(&self, num_glyphs: u32, mut f: F) -> Result<(), ParseError>
    where
        F: FnMut(u32, u32),
    {
        match *self {
            CmapSubtable::Format0 {
                ref glyph_id_array, ..
            } => {
                for (code, glyph_id) in (0..).zip(glyph_id_array) {
                    f(code, u32::from(glyph_id));
                }
            }
            CmapSubtable::Format4 {
                ref start_codes,
                ref end_codes,
                ..
            } => {
                for segment in 0..self.segment_count() {
                    let start = start_codes.read_item(segment)?;
                    let end = end_codes.read_item(segment)?;
                    for ch in start..=end {
                        match self.format4_lookup(segment, ch) {
                            Ok(Some(glyph_id)) => f(u32::from(ch), glyph_id),
                            Ok(None) => {}
                            Err(err) => debug!("cmap: skipping U+{:04X}: {}", ch, err),
                        }
                    }
                }
            }
            CmapSubtable::Format6 {
                first_code,
                ref glyph_id_array,
                ..
            } => {
                for (code, glyph_id) in (u32::from(first_code)..).zip(glyph_id_array) {
                    f(code, u32::from(glyph_id));
                }
            }
            CmapSubtable::Format10 {
                start_char_code,
                ref glyph_id_array,
                ..
            } => {
                for (code, glyph_id) in (start_char_code..=u32::MAX).zip(glyph_id_array) {
                    f(code, u32::from(glyph_id));
                }
            }
            CmapSubtable::Format12 { ref groups, .. } => {
                for group in groups {
                    if group.start_char_code > group.end_char_code
                        || group.start_glyph_id >= num_glyphs
                    {
                        continue;
                    }
                    let span = (group.end_char_code - group.start_char_code)
                        .min(num_glyphs - 1 - group.start_glyph_id);
                    for delta in 0..=span {
                        f(group.start_char_code + delta, group.start_glyph_id + delta);
                    }
                }
            }
            CmapSubtable::Format13 { ref groups, .. } => {
                for group in groups {
                    let end = group.end_char_code.min(MAX_CODEPOINT);
                    if group.start_char_code > end || group.start_glyph_id >= num_glyphs {
                        continue;
                    }
                    for code in group.start_char_code..=end {
                        f(code, group.start_glyph_id);
                    }
                }
            }
        }

        Ok(())
    }

    fn segment_count(&self) -> usize {
        match self {
            CmapSubtable::Format4 { end_codes, .. } => end_codes.len(),
            _ => 0,
        }
    }

    /// Look `ch` up in one format 4 segment.
    fn format4_lookup(&self, segment: usize, ch: u16) -> Result<Option<u32>, ParseError> {
        let CmapSubtable::Format4 {
            ref end_codes,
            ref start_codes,
            ref id_deltas,
            ref id_range_offsets,
            ref glyph_id_array,
            ..
        } = *self
        else {
            return Ok(None);
        };

        let start_code = start_codes.read_item(segment)?;
        let end_code = end_codes.read_item(segment)?;
        if ch < start_code || ch > end_code {
            return Ok(None);
        }

        // The idDelta arithmetic is modulo 65536.
        let id_delta = id_deltas.read_item(segment)? as u16;
        let id_range_offset = usize::from(id_range_offsets.read_item(segment)?);
        if id_range_offset == 0 {
            return Ok(Some(u32::from(ch.wrapping_add(id_delta))));
        }

        // id_range_offset is relative to its own position in the id_range_offsets array, which
        // is immediately followed by the glyph id array.
        let glyph_id_offset =
            id_range_offset + segment * 2 + usize::from(ch - start_code) * 2;
        let index = (glyph_id_offset >> 1)
            .checked_sub(id_range_offsets.len())
            .ok_or(ParseError::BadIndex)?;
        match glyph_id_array.read_item(index)? {
            0 => Ok(Some(0)),
            glyph_id => Ok(Some(u32::from(glyph_id.wrapping_add(id_delta)))),
        }
    }
}
