// Shared between the unit tests (through `src/tests.rs`) and the integration tests.

#[allow(dead_code)]
pub mod writer {
    // The writer module is derived from ttf-parser, licenced under Apache-2.0.
    // https://github.com/RazrFalcon/ttf-parser/blob/439aaaebd50eb8aed66302e3c1b51fae047f85b2/src/writer.rs

    #[allow(missing_debug_implementations)]
    #[derive(Clone, Copy)]
    pub enum TtfType {
        Raw(&'static [u8]),
        TrueTypeMagic,
        OpenTypeMagic,
        FontCollectionMagic,
        Int8(i8),
        UInt8(u8),
        Int16(i16),
        UInt16(u16),
        Int32(i32),
        UInt32(u32),
        Int64(i64),
    }

    pub fn convert(values: &[TtfType]) -> Vec<u8> {
        let mut data = Vec::with_capacity(256);
        for v in values {
            convert_type(*v, &mut data);
        }

        data
    }

    pub fn convert_type(value: TtfType, data: &mut Vec<u8>) {
        match value {
            TtfType::Raw(bytes) => {
                data.extend_from_slice(bytes);
            }
            TtfType::TrueTypeMagic => {
                data.extend_from_slice(&[0x00, 0x01, 0x00, 0x00]);
            }
            TtfType::OpenTypeMagic => {
                data.extend_from_slice(&[0x4F, 0x54, 0x54, 0x4F]);
            }
            TtfType::FontCollectionMagic => {
                data.extend_from_slice(&[0x74, 0x74, 0x63, 0x66]);
            }
            TtfType::Int8(n) => {
                data.extend_from_slice(&i8::to_be_bytes(n));
            }
            TtfType::UInt8(n) => {
                data.extend_from_slice(&u8::to_be_bytes(n));
            }
            TtfType::Int16(n) => {
                data.extend_from_slice(&i16::to_be_bytes(n));
            }
            TtfType::UInt16(n) => {
                data.extend_from_slice(&u16::to_be_bytes(n));
            }
            TtfType::Int32(n) => {
                data.extend_from_slice(&i32::to_be_bytes(n));
            }
            TtfType::UInt32(n) => {
                data.extend_from_slice(&u32::to_be_bytes(n));
            }
            TtfType::Int64(n) => {
                data.extend_from_slice(&i64::to_be_bytes(n));
            }
        }
    }

    #[derive(Debug)]
    pub struct Writer {
        pub data: Vec<u8>,
    }

    impl Writer {
        pub fn new() -> Self {
            Writer {
                data: Vec::with_capacity(256),
            }
        }

        pub fn offset(&self) -> usize {
            self.data.len()
        }

        pub fn write(&mut self, value: TtfType) {
            convert_type(value, &mut self.data);
        }

        pub fn write_all(&mut self, values: &[TtfType]) {
            for value in values {
                self.write(*value);
            }
        }

        pub fn write_bytes(&mut self, bytes: &[u8]) {
            self.data.extend_from_slice(bytes);
        }

        pub fn align(&mut self) {
            while self.data.len() % 4 != 0 {
                self.data.push(0);
            }
        }
    }
}

/// Assembles complete synthetic TrueType fonts.
#[allow(dead_code)]
pub mod builder {
    use super::writer::{TtfType, TtfType::*, Writer};

    /// A point of a test outline: x, y and whether it is on the curve.
    pub type Point = (i16, i16, bool);

    #[derive(Debug, Clone)]
    pub enum TestGlyph {
        Empty,
        Simple(Vec<Vec<Point>>),
        /// Components as (glyph index, x offset, y offset).
        Compound(Vec<(u16, i16, i16)>),
        /// Components with a transform as (glyph index, x offset, y offset, transform).
        TransformedCompound(Vec<(u16, i16, i16, ComponentTransform)>),
    }

    /// The transform of a compound glyph component, written as F2Dot14 values.
    #[derive(Debug, Copy, Clone, PartialEq)]
    pub enum ComponentTransform {
        Scale(f32),
        XYScale(f32, f32),
        /// x_scale, scale01, scale10, y_scale in file order.
        TwoByTwo(f32, f32, f32, f32),
    }

    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub enum CmapFormat {
        Format4,
        Format12,
    }

    #[derive(Debug, Clone)]
    pub struct FontBuilder {
        units_per_em: u16,
        glyphs: Vec<(TestGlyph, u16)>,
        mappings: Vec<(u32, u16)>,
        cmap_format: CmapFormat,
        names: Vec<(u16, String)>,
        glyph_names: Option<Vec<String>>,
        long_loca: bool,
        omitted: Vec<[u8; 4]>,
    }

    /// An axis aligned square with its bottom left corner at (x, y).
    pub fn square(x: i16, y: i16, size: i16) -> Vec<Point> {
        vec![
            (x, y, true),
            (x, y + size, true),
            (x + size, y + size, true),
            (x + size, y, true),
        ]
    }

    /// A circle made of four on/off/on arcs.
    pub fn circle(cx: i16, cy: i16, r: i16) -> Vec<Point> {
        vec![
            (cx, cy - r, true),
            (cx - r, cy - r, false),
            (cx - r, cy, true),
            (cx - r, cy + r, false),
            (cx, cy + r, true),
            (cx + r, cy + r, false),
            (cx + r, cy, true),
            (cx + r, cy - r, false),
        ]
    }

    impl FontBuilder {
        /// A font with only the `.notdef` glyph, an empty outline.
        pub fn new() -> Self {
            FontBuilder {
                units_per_em: 1000,
                glyphs: vec![(TestGlyph::Empty, 500)],
                mappings: Vec::new(),
                cmap_format: CmapFormat::Format4,
                names: Vec::new(),
                glyph_names: None,
                long_loca: false,
                omitted: Vec::new(),
            }
        }

        pub fn units_per_em(mut self, units_per_em: u16) -> Self {
            self.units_per_em = units_per_em;
            self
        }

        /// Add a glyph with the given advance width. Its index is the number of glyphs added
        /// before it, plus one for `.notdef`.
        pub fn glyph(mut self, glyph: TestGlyph, advance_width: u16) -> Self {
            self.glyphs.push((glyph, advance_width));
            self
        }

        pub fn map(mut self, ch: char, glyph_index: u16) -> Self {
            self.mappings.push((u32::from(ch), glyph_index));
            self
        }

        pub fn cmap_format(mut self, cmap_format: CmapFormat) -> Self {
            self.cmap_format = cmap_format;
            self
        }

        /// Add a Windows Unicode English name record.
        pub fn name(mut self, name_id: u16, value: &str) -> Self {
            self.names.push((name_id, String::from(value)));
            self
        }

        /// Write a version 2 `post` table naming every glyph.
        pub fn glyph_names(mut self, names: &[&str]) -> Self {
            self.glyph_names = Some(names.iter().map(|name| String::from(*name)).collect());
            self
        }

        pub fn long_loca(mut self) -> Self {
            self.long_loca = true;
            self
        }

        pub fn without_table(mut self, tag: &[u8; 4]) -> Self {
            self.omitted.push(*tag);
            self
        }

        pub fn build(&self) -> Vec<u8> {
            let tables = self.tables();
            let mut w = Writer::new();
            write_directory(&mut w, &tables, 0);
            w.data
        }

        /// The tables of this font, sorted by tag.
        pub fn tables(&self) -> Vec<([u8; 4], Vec<u8>)> {
            let (glyf, loca, bbox) = self.glyf_and_loca();
            let mut tables = vec![
                (*b"cmap", self.cmap()),
                (*b"glyf", glyf),
                (*b"head", self.head(bbox)),
                (*b"hhea", self.hhea()),
                (*b"hmtx", self.hmtx()),
                (*b"loca", loca),
                (*b"maxp", self.maxp()),
                (*b"name", self.name_table()),
                (*b"post", self.post()),
            ];
            tables.retain(|(tag, _)| !self.omitted.contains(tag));
            tables
        }

        fn num_glyphs(&self) -> u16 {
            self.glyphs.len() as u16
        }

        fn head(&self, (x_min, y_min, x_max, y_max): (i16, i16, i16, i16)) -> Vec<u8> {
            let mut w = Writer::new();
            w.write_all(&[
                UInt16(1),
                UInt16(0),
                Int32(0x00010000),
                UInt32(0), // checkSumAdjustment
                UInt32(0x5F0F3CF5),
                UInt16(0),
                UInt16(self.units_per_em),
                Int64(0),
                Int64(0),
                Int16(x_min),
                Int16(y_min),
                Int16(x_max),
                Int16(y_max),
                UInt16(0),
                UInt16(8),
                Int16(2),
                Int16(if self.long_loca { 1 } else { 0 }),
                Int16(0),
            ]);
            w.data
        }

        fn maxp(&self) -> Vec<u8> {
            let mut w = Writer::new();
            w.write_all(&[UInt32(0x00005000), UInt16(self.num_glyphs())]);
            w.data
        }

        fn hhea(&self) -> Vec<u8> {
            let advance_width_max = self.glyphs.iter().map(|(_, advance)| *advance).max();
            let mut w = Writer::new();
            w.write_all(&[
                UInt16(1),
                UInt16(0),
                Int16(800),
                Int16(-200),
                Int16(0),
                UInt16(advance_width_max.unwrap_or(0)),
                Int16(0),
                Int16(0),
                Int16(0),
                Int16(1),
                Int16(0),
                Int16(0),
                Int16(0),
                Int16(0),
                Int16(0),
                Int16(0),
                Int16(0),
                UInt16(self.num_glyphs()),
            ]);
            w.data
        }

        fn hmtx(&self) -> Vec<u8> {
            let mut w = Writer::new();
            for (glyph, advance_width) in &self.glyphs {
                let lsb = glyph_bbox(glyph).map(|bbox| bbox.0).unwrap_or(0);
                w.write_all(&[UInt16(*advance_width), Int16(lsb)]);
            }
            w.data
        }

        fn glyf_and_loca(&self) -> (Vec<u8>, Vec<u8>, (i16, i16, i16, i16)) {
            let mut glyf = Writer::new();
            let mut offsets = vec![0];
            for (glyph, _) in &self.glyphs {
                write_glyph(&mut glyf, glyph);
                glyf.align();
                offsets.push(glyf.offset() as u32);
            }

            let mut loca = Writer::new();
            for offset in offsets {
                if self.long_loca {
                    loca.write(UInt32(offset));
                } else {
                    loca.write(UInt16((offset / 2) as u16));
                }
            }

            let bbox = self
                .glyphs
                .iter()
                .filter_map(|(glyph, _)| glyph_bbox(glyph))
                .fold(None, |acc: Option<(i16, i16, i16, i16)>, b| match acc {
                    None => Some(b),
                    Some(a) => Some((a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3))),
                })
                .unwrap_or((0, 0, 0, 0));

            (glyf.data, loca.data, bbox)
        }

        fn cmap(&self) -> Vec<u8> {
            let mut mappings = self.mappings.clone();
            mappings.sort();

            let mut w = Writer::new();
            match self.cmap_format {
                CmapFormat::Format4 => {
                    w.write_all(&[UInt16(0), UInt16(1), UInt16(3), UInt16(1), UInt32(12)]);
                    // One segment per mapping plus the final 0xFFFF segment
                    let seg_count = mappings.len() as u16 + 1;
                    let length = 16 + 8 * seg_count;
                    w.write_all(&[
                        UInt16(4),
                        UInt16(length),
                        UInt16(0),
                        UInt16(seg_count * 2),
                        UInt16(0),
                        UInt16(0),
                        UInt16(0),
                    ]);
                    for (code, _) in &mappings {
                        w.write(UInt16(*code as u16));
                    }
                    w.write(UInt16(0xFFFF));
                    w.write(UInt16(0));
                    for (code, _) in &mappings {
                        w.write(UInt16(*code as u16));
                    }
                    w.write(UInt16(0xFFFF));
                    for (code, glyph_index) in &mappings {
                        let delta = glyph_index.wrapping_sub(*code as u16);
                        w.write(Int16(delta as i16));
                    }
                    w.write(Int16(1));
                    for _ in 0..seg_count {
                        w.write(UInt16(0));
                    }
                }
                CmapFormat::Format12 => {
                    w.write_all(&[UInt16(0), UInt16(1), UInt16(3), UInt16(10), UInt32(12)]);
                    let num_groups = mappings.len() as u32;
                    w.write_all(&[
                        UInt16(12),
                        UInt16(0),
                        UInt32(16 + 12 * num_groups),
                        UInt32(0),
                        UInt32(num_groups),
                    ]);
                    for (code, glyph_index) in &mappings {
                        w.write_all(&[
                            UInt32(*code),
                            UInt32(*code),
                            UInt32(u32::from(*glyph_index)),
                        ]);
                    }
                }
            }
            w.data
        }

        fn name_table(&self) -> Vec<u8> {
            let count = self.names.len() as u16;
            let mut records = Writer::new();
            let mut storage = Vec::new();
            for (name_id, value) in &self.names {
                let bytes = value
                    .encode_utf16()
                    .flat_map(|unit| unit.to_be_bytes())
                    .collect::<Vec<_>>();
                records.write_all(&[
                    UInt16(3),
                    UInt16(1),
                    UInt16(0x409),
                    UInt16(*name_id),
                    UInt16(bytes.len() as u16),
                    UInt16(storage.len() as u16),
                ]);
                storage.extend(bytes);
            }

            let mut w = Writer::new();
            w.write_all(&[UInt16(0), UInt16(count), UInt16(6 + 12 * count)]);
            w.write_bytes(&records.data);
            w.write_bytes(&storage);
            w.data
        }

        fn post(&self) -> Vec<u8> {
            let version = if self.glyph_names.is_some() {
                0x00020000
            } else {
                0x00030000
            };
            let mut w = Writer::new();
            w.write_all(&[
                UInt32(version),
                Int32(0),
                Int16(-100),
                Int16(50),
                UInt32(0),
                UInt32(0),
                UInt32(0),
                UInt32(0),
                UInt32(0),
            ]);
            if let Some(names) = &self.glyph_names {
                w.write(UInt16(names.len() as u16));
                for index in 0..names.len() {
                    w.write(UInt16(258 + index as u16));
                }
                for name in names {
                    w.write(UInt8(name.len() as u8));
                    w.write_bytes(name.as_bytes());
                }
            }
            w.data
        }
    }

    fn glyph_bbox(glyph: &TestGlyph) -> Option<(i16, i16, i16, i16)> {
        match glyph {
            TestGlyph::Simple(contours) => {
                let points = contours.iter().flatten();
                let x_min = points.clone().map(|p| p.0).min()?;
                let y_min = points.clone().map(|p| p.1).min()?;
                let x_max = points.clone().map(|p| p.0).max()?;
                let y_max = points.map(|p| p.1).max()?;
                Some((x_min, y_min, x_max, y_max))
            }
            TestGlyph::Empty | TestGlyph::Compound(_) | TestGlyph::TransformedCompound(_) => None,
        }
    }

    fn write_glyph(w: &mut Writer, glyph: &TestGlyph) {
        match glyph {
            TestGlyph::Empty => {}
            TestGlyph::Simple(contours) => {
                let (x_min, y_min, x_max, y_max) = glyph_bbox(glyph).unwrap_or((0, 0, 0, 0));
                w.write_all(&[
                    Int16(contours.len() as i16),
                    Int16(x_min),
                    Int16(y_min),
                    Int16(x_max),
                    Int16(y_max),
                ]);
                let mut end = 0;
                for contour in contours {
                    end += contour.len() as u16;
                    w.write(UInt16(end - 1));
                }
                w.write(UInt16(0)); // instructionLength
                let points = contours.iter().flatten().collect::<Vec<_>>();
                for (_, _, on_curve) in &points {
                    w.write(UInt8(if *on_curve { 1 } else { 0 }));
                }
                let mut prev = 0;
                for (x, _, _) in &points {
                    w.write(Int16(x - prev));
                    prev = *x;
                }
                let mut prev = 0;
                for (_, y, _) in &points {
                    w.write(Int16(y - prev));
                    prev = *y;
                }
            }
            TestGlyph::Compound(components) => {
                let components = components
                    .iter()
                    .map(|&(glyph_index, dx, dy)| (glyph_index, dx, dy, None))
                    .collect::<Vec<_>>();
                write_components(w, &components);
            }
            TestGlyph::TransformedCompound(components) => {
                let components = components
                    .iter()
                    .map(|&(glyph_index, dx, dy, transform)| (glyph_index, dx, dy, Some(transform)))
                    .collect::<Vec<_>>();
                write_components(w, &components);
            }
        }
    }

    fn f2dot14(value: f32) -> TtfType {
        Int16((value * 16384.0).round() as i16)
    }

    type Component = (u16, i16, i16, Option<ComponentTransform>);

    fn write_components(w: &mut Writer, components: &[Component]) {
        w.write_all(&[Int16(-1), Int16(0), Int16(0), Int16(0), Int16(0)]);
        for (i, (glyph_index, dx, dy, transform)) in components.iter().enumerate() {
            // ARG_1_AND_2_ARE_WORDS | ARGS_ARE_XY_VALUES
            let mut flags = 0x0003;
            if i + 1 < components.len() {
                // MORE_COMPONENTS
                flags |= 0x0020;
            }
            flags |= match transform {
                None => 0,
                Some(ComponentTransform::Scale(_)) => 0x0008,
                Some(ComponentTransform::XYScale(..)) => 0x0040,
                Some(ComponentTransform::TwoByTwo(..)) => 0x0080,
            };
            w.write_all(&[UInt16(flags), UInt16(*glyph_index), Int16(*dx), Int16(*dy)]);
            match *transform {
                None => {}
                Some(ComponentTransform::Scale(scale)) => w.write(f2dot14(scale)),
                Some(ComponentTransform::XYScale(x_scale, y_scale)) => {
                    w.write_all(&[f2dot14(x_scale), f2dot14(y_scale)])
                }
                Some(ComponentTransform::TwoByTwo(x_scale, scale01, scale10, y_scale)) => {
                    w.write_all(&[
                        f2dot14(x_scale),
                        f2dot14(scale01),
                        f2dot14(scale10),
                        f2dot14(y_scale),
                    ])
                }
            }
        }
    }

    fn checksum(data: &[u8]) -> u32 {
        data.chunks(4)
            .map(|chunk| {
                let mut word = [0; 4];
                word[..chunk.len()].copy_from_slice(chunk);
                u32::from_be_bytes(word)
            })
            .fold(0, u32::wrapping_add)
    }

    // Write a table directory followed by the table data. `base` is the offset of the directory
    // within the final file.
    fn write_directory(w: &mut Writer, tables: &[([u8; 4], Vec<u8>)], base: usize) {
        let num_tables = tables.len() as u16;
        w.write_all(&[TrueTypeMagic, UInt16(num_tables), UInt16(0), UInt16(0), UInt16(0)]);
        let mut offset = base + 12 + 16 * tables.len();
        for (tag, data) in tables {
            w.write_all(&[
                UInt32(u32::from_be_bytes(*tag)),
                UInt32(checksum(data)),
                UInt32(offset as u32),
                UInt32(data.len() as u32),
            ]);
            offset += (data.len() + 3) & !3;
        }
        for (_, data) in tables {
            w.write_bytes(data);
            w.align();
        }
    }

    /// Assemble a font collection from `fonts`.
    pub fn collection(fonts: &[FontBuilder]) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_all(&[FontCollectionMagic, UInt16(1), UInt16(0), UInt32(fonts.len() as u32)]);
        let header_len = 12 + 4 * fonts.len();

        let mut directories = Writer::new();
        let mut offsets = Vec::new();
        for font in fonts {
            let base = header_len + directories.offset();
            offsets.push(base);
            write_directory(&mut directories, &font.tables(), base);
        }
        for offset in offsets {
            w.write(UInt32(offset as u32));
        }
        w.write_bytes(&directories.data);
        w.data
    }
}
