//! Font model assembly.
//!
//! Tables are decoded in dependency order from scopes limited to each table and combined into an
//! owned [Font]. Loading never panics: malformed input produces [Font::empty] (or an error from
//! [Font::try_load]).

use log::{debug, error, warn};

use crate::binary::read::ReadScope;
use crate::binary::U32Be;
use crate::directory::{self, TableMap, TableTag};
use crate::error::ParseError;
use crate::glyph::Glyph;
use crate::post::PostTable;
use crate::tables::cmap::{CharMap, Cmap};
use crate::tables::glyf::GlyfTable;
use crate::tables::loca::LocaTable;
use crate::tables::name::{FontNames, NameTable};
use crate::tables::{self, HeadTable, HheaTable, HmtxTable, MaxpTable};
use crate::tag;

/// A decoded TrueType font.
///
/// Holds only owned data, so it can be shared between threads once loaded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Font {
    pub header: HeadTable,
    pub char_map: CharMap,
    pub glyphs: Vec<Glyph>,
    pub names: FontNames,
    pub horizontal_header: Option<HheaTable>,
}

/// Load a single font, returning [Font::empty] if it cannot be decoded.
pub fn load_font(data: &[u8]) -> Font {
    match Font::try_load(data) {
        Ok(font) => font,
        Err(err) => {
            error!("unable to load font: {}", err);
            Font::empty()
        }
    }
}

/// Load every font of a collection.
///
/// A single font file yields one font. A font of the collection that fails to decode is
/// [Font::empty] at its index. An unreadable header yields no fonts.
pub fn load_font_collection(data: &[u8]) -> Vec<Font> {
    let scope = ReadScope::new(data);
    let table_maps = match read_table_maps(scope) {
        Ok(table_maps) => table_maps,
        Err(err) => {
            error!("unable to read font collection: {}", err);
            return Vec::new();
        }
    };

    table_maps
        .iter()
        .enumerate()
        .map(
            |(index, table_map)| match load_font_internal(scope, table_map) {
                Ok(font) => font,
                Err(err) => {
                    error!("unable to load font {} of collection: {}", index, err);
                    Font::empty()
                }
            },
        )
        .collect()
}

fn read_table_maps(scope: ReadScope<'_>) -> Result<Vec<TableMap>, ParseError> {
    match scope.read::<U32Be>()? {
        tag::TTCF => directory::parse_shared_file_header(scope),
        _ => Ok(vec![directory::parse_file_header(scope)?]),
    }
}

/// Decode the font described by `table_map`.
///
/// `scope` is the whole font file; table offsets are relative to its start.
pub fn load_font_internal(scope: ReadScope<'_>, table_map: &TableMap) -> Result<Font, ParseError> {
    let names = match table_map.read_table(&scope, TableTag::Name) {
        Ok(Some(name_scope)) => match name_scope.read::<NameTable<'_>>() {
            Ok(name_table) => name_table.font_names(),
            Err(err) => {
                warn!("unable to read name table: {}", err);
                FontNames::default()
            }
        },
        Ok(None) => FontNames::default(),
        Err(err) => {
            warn!("unable to read name table: {}", err);
            FontNames::default()
        }
    };

    let header = table_map
        .get(TableTag::Header)
        .ok_or(ParseError::MissingTable(tag::HEAD))?
        .read_table(&scope)?
        .read::<HeadTable>()?;
    debug!(
        "head: units per em {}, {:?} loca",
        header.units_per_em, header.index_to_loc_format
    );

    let maxp = table_map
        .get(TableTag::MaxProfile)
        .ok_or(ParseError::MissingTable(tag::MAXP))?
        .read_table(&scope)?
        .read::<MaxpTable>()?;
    let num_glyphs = usize::from(maxp.num_glyphs);
    debug!("maxp: {} glyphs", num_glyphs);

    let glyph_names = match table_map.read_table(&scope, TableTag::PostScript)? {
        Some(post_scope) => match post_scope.read_dep::<PostTable<'_>>(num_glyphs) {
            Ok(post) => post.glyph_names(),
            Err(err) => {
                warn!("unable to read glyph names from post table: {}", err);
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let horizontal_header = table_map
        .read_table(&scope, TableTag::HorizontalHeader)?
        .map(|hhea_scope| hhea_scope.read::<HheaTable>())
        .transpose()?;

    let char_map = match table_map.read_table(&scope, TableTag::CharMap)? {
        Some(cmap_scope) => cmap_scope
            .read::<Cmap<'_>>()?
            .char_map(u32::from(maxp.num_glyphs)),
        None => {
            debug!("no cmap table");
            CharMap::default()
        }
    };

    let glyf_scope = table_map
        .get(TableTag::GlyphData)
        .ok_or(ParseError::MissingTable(tag::GLYF))?
        .read_table(&scope)?;
    let loca = table_map
        .get(TableTag::Location)
        .ok_or(ParseError::MissingTable(tag::LOCA))?
        .read_table(&scope)?
        .read_dep::<LocaTable>((
            num_glyphs,
            header.index_to_loc_format,
            glyf_scope.data().len(),
        ))?;
    let glyf = glyf_scope.read_dep::<GlyfTable>((&loca, num_glyphs))?;
    let mut glyphs = glyf.glyphs;
    debug!("glyf: {} glyphs decoded", glyphs.len());

    for (glyph, name) in glyphs.iter_mut().zip(glyph_names) {
        glyph.name = name;
    }

    match (
        &horizontal_header,
        table_map.read_table(&scope, TableTag::HorizontalMetrics)?,
    ) {
        (Some(hhea), Some(hmtx_scope)) => {
            let hmtx = hmtx_scope
                .read_dep::<HmtxTable<'_>>((num_glyphs, usize::from(hhea.num_h_metrics)))?;
            glyphs = tables::apply_horizontal_metrics(glyphs, &hmtx);
        }
        (None, Some(_)) => warn!("hmtx table without hhea table, advances are zero"),
        (_, None) => debug!("no hmtx table"),
    }

    Ok(Font {
        header,
        char_map,
        glyphs,
        names,
        horizontal_header,
    })
}

impl Font {
    /// The font returned when loading fails: no glyphs and an identity header.
    pub fn empty() -> Font {
        Font::default()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Decode a single font, reporting why it failed.
    pub fn try_load(data: &[u8]) -> Result<Font, ParseError> {
        let scope = ReadScope::new(data);
        let table_map = directory::parse_file_header(scope)?;
        load_font_internal(scope, &table_map)
    }

    /// Decode every font of a collection (or a single font file), failing if any of them
    /// fails.
    pub fn try_load_collection(data: &[u8]) -> Result<Vec<Font>, ParseError> {
        let scope = ReadScope::new(data);
        read_table_maps(scope)?
            .iter()
            .map(|table_map| load_font_internal(scope, table_map))
            .collect()
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    pub fn glyph(&self, glyph_index: u32) -> Option<&Glyph> {
        self.glyphs.get(usize::try_from(glyph_index).ok()?)
    }

    /// Glyph index for `ch`, 0 (`.notdef`) if the font does not map it.
    pub fn glyph_index(&self, ch: char) -> u32 {
        self.char_map.get(&u32::from(ch)).copied().unwrap_or(0)
    }

    pub fn advance_width(&self, glyph_index: u32) -> Option<u16> {
        self.glyph(glyph_index).map(|glyph| glyph.advance_width)
    }

    pub fn units_per_em(&self) -> u16 {
        self.header.units_per_em
    }

    /// Scale factor from font units to pixels such that the font's ascender to descender span is
    /// `pixel_height` pixels. Falls back to the em square when `hhea` is absent.
    pub fn scale_for_pixel_height(&self, pixel_height: f32) -> f32 {
        let height = self
            .horizontal_header
            .as_ref()
            .map(|hhea| i32::from(hhea.ascender) - i32::from(hhea.descender))
            .filter(|&height| height > 0)
            .unwrap_or_else(|| i32::from(self.units_per_em()));
        if height == 0 {
            return 0.0;
        }
        pixel_height / height as f32
    }
}
