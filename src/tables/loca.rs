//! Parsing of the `loca` table.
//!
//! > The indexToLoc table stores the offsets to the locations of the glyphs in the font, relative
//! > to the beginning of the glyphData table.
//!
//! -- <https://docs.microsoft.com/en-us/typography/opentype/spec/loca>

use std::ops::Range;

use itertools::Itertools;

use crate::binary::read::{ReadBinaryDep, ReadCtxt};
use crate::binary::{U16Be, U32Be};
use crate::error::ParseError;
use crate::tables::IndexToLocFormat;

/// `loca` table
///
/// Holds `num_glyphs + 1` offsets, already scaled to bytes. Glyph `i` occupies
/// `offsets[i]..offsets[i + 1]` of the `glyf` table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocaTable {
    pub offsets: Vec<u32>,
}

impl ReadBinaryDep for LocaTable {
    type Args<'a> = (usize, IndexToLocFormat, usize);
    type HostType<'a> = Self;

    /// Read a `loca` table from `ctxt`
    ///
    /// * `num_glyphs` is the number of glyphs in the font, from the `maxp` table.
    /// * `index_to_loc_format` specifies whether the offsets are short or long, from the `head`
    ///   table.
    /// * `glyf_len` is the length of the `glyf` table. No offset may point past it.
    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        (num_glyphs, index_to_loc_format, glyf_len): (usize, IndexToLocFormat, usize),
    ) -> Result<Self, ParseError> {
        let offsets = match index_to_loc_format {
            // The actual local offset divided by 2 is stored.
            IndexToLocFormat::Short => ctxt
                .read_array::<U16Be>(num_glyphs + 1)?
                .iter()
                .map(|offset| u32::from(offset) * 2)
                .collect::<Vec<_>>(),
            IndexToLocFormat::Long => ctxt.read_array::<U32Be>(num_glyphs + 1)?.to_vec(),
        };

        ctxt.check(offsets.iter().tuple_windows().all(|(a, b)| a <= b))?;
        let last = offsets.last().copied().unwrap_or(0);
        ctxt.check(usize::try_from(last)? <= glyf_len)?;

        Ok(LocaTable { offsets })
    }
}

impl LocaTable {
    /// The number of glyphs described by this table.
    pub fn num_glyphs(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Byte range of `glyph_index` within `glyf`, `None` if the index is out of range.
    ///
    /// An empty range is a glyph without an outline.
    pub fn glyph_range(&self, glyph_index: usize) -> Option<Range<usize>> {
        let start = *self.offsets.get(glyph_index)?;
        let end = *self.offsets.get(glyph_index + 1)?;
        Some(usize::try_from(start).ok()?..usize::try_from(end).ok()?)
    }
}
