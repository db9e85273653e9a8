//! Parsing of the `glyf` table.
//!
//! > This table contains information that describes the glyphs in the font in the TrueType outline
//! > format. Information regarding the rasterizer (scaler) refers to the TrueType rasterizer.
//!
//! -- <https://docs.microsoft.com/en-us/typography/opentype/spec/glyf>

use std::iter;

use bitflags::bitflags;
use itertools::Itertools;
use log::{debug, warn};
use pathfinder_geometry::transform2d::Matrix2x2F;
use pathfinder_geometry::vector::vec2f;

use crate::binary::read::{ReadBinary, ReadBinaryDep, ReadCtxt, ReadFrom, ReadScope};
use crate::binary::{I16Be, U16Be, U8};
use crate::error::ParseError;
use crate::glyph::{BoundingBox, Component, Contour, Glyph, Outline, SimpleOutline};
use crate::tables::loca::LocaTable;
use crate::tables::F2Dot14;

/// Maximum nesting of compound glyphs followed when drawing.
pub const COMPOSITE_GLYPH_RECURSION_LIMIT: u8 = 8;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    #[rustfmt::skip]
    pub struct SimpleGlyphFlag: u8 {
        const ON_CURVE_POINT                       = 0b00000001;
        const X_SHORT_VECTOR                       = 0b00000010;
        const Y_SHORT_VECTOR                       = 0b00000100;
        const REPEAT_FLAG                          = 0b00001000;
        const X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR = 0b00010000;
        const Y_IS_SAME_OR_POSITIVE_Y_SHORT_VECTOR = 0b00100000;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct CompositeGlyphFlag: u16 {
        /// Bit 0: If this is set, the arguments are 16-bit (uint16 or int16); otherwise, they are
        /// bytes (uint8 or int8).
        const ARG_1_AND_2_ARE_WORDS = 0x0001;
        /// Bit 1: If this is set, the arguments are signed xy values; otherwise, they are unsigned
        /// point numbers.
        const ARGS_ARE_XY_VALUES = 0x0002;
        /// Bit 2: For the xy values if the preceding is true.
        const ROUND_XY_TO_GRID = 0x0004;
        /// Bit 3: This indicates that there is a simple scale for the component. Otherwise,
        /// scale = 1.0.
        const WE_HAVE_A_SCALE = 0x0008;
        /// Bit 5: Indicates at least one more glyph after this one.
        const MORE_COMPONENTS = 0x0020;
        /// Bit 6: The x direction will use a different scale from the y direction.
        const WE_HAVE_AN_X_AND_Y_SCALE = 0x0040;
        /// Bit 7: There is a 2 by 2 transformation that will be used to scale the component.
        const WE_HAVE_A_TWO_BY_TWO = 0x0080;
        /// Bit 8: Following the last component are instructions for the composite character.
        const WE_HAVE_INSTRUCTIONS = 0x0100;
        /// Bit 9: Use the advance width and side bearing of this component for the composite.
        const USE_MY_METRICS = 0x0200;
        /// Bit 10: If set, the components of the compound glyph overlap.
        const OVERLAP_COMPOUND = 0x0400;
        /// Bit 11: The composite is designed to have the component offset scaled.
        const SCALED_COMPONENT_OFFSET = 0x0800;
        /// Bit 12: The composite is designed not to have the component offset scaled.
        const UNSCALED_COMPONENT_OFFSET = 0x1000;
    }
}

/// Decoded `glyf` table
///
/// <https://docs.microsoft.com/en-us/typography/opentype/spec/glyf>
#[derive(Debug, Clone, PartialEq)]
pub struct GlyfTable {
    pub glyphs: Vec<Glyph>,
}

/// Glyph header: contour count and bounding box
#[derive(Debug, Copy, Clone, PartialEq)]
struct GlyphHeader {
    number_of_contours: i16,
    bounding_box: BoundingBox,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CompositeGlyphArgument {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
}

impl ReadBinaryDep for GlyfTable {
    type Args<'a> = (&'a LocaTable, usize);
    type HostType<'a> = Self;

    /// Decode every glyph described by `loca`.
    ///
    /// Each glyph is read from a scope limited to its own `loca` range.
    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        (loca, num_glyphs): (&'a LocaTable, usize),
    ) -> Result<Self, ParseError> {
        ctxt.check(loca.num_glyphs() == num_glyphs)?;
        let scope = ctxt.scope();

        let glyphs = (0..num_glyphs)
            .map(|glyph_index| {
                let range = loca.glyph_range(glyph_index).ok_or(ParseError::BadIndex)?;
                if range.is_empty() {
                    return Ok(Glyph::default());
                }
                scope
                    .offset_length(range.start, range.len())?
                    .read_dep::<Glyph>(num_glyphs)
                    .map_err(|err| {
                        debug!("glyph {} is malformed: {}", glyph_index, err);
                        err
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(GlyfTable { glyphs })
    }
}

impl ReadBinaryDep for Glyph {
    type Args<'a> = usize;
    type HostType<'a> = Self;

    /// Read one glyph record. `num_glyphs` bounds the indices compound glyphs may refer to.
    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, num_glyphs: usize) -> Result<Self, ParseError> {
        let header = ctxt.read::<GlyphHeader>()?;
        let outline = match u16::try_from(header.number_of_contours) {
            Ok(number_of_contours) => {
                Outline::Simple(ctxt.read_dep::<SimpleOutline>(number_of_contours)?)
            }
            Err(_) => Outline::Compound(read_components(ctxt, num_glyphs)?),
        };

        Ok(Glyph {
            outline,
            bounding_box: header.bounding_box,
            ..Glyph::default()
        })
    }
}

impl ReadBinary for GlyphHeader {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let number_of_contours = ctxt.read_i16be()?;
        let x_min = ctxt.read_i16be()?;
        let y_min = ctxt.read_i16be()?;
        let x_max = ctxt.read_i16be()?;
        let y_max = ctxt.read_i16be()?;

        Ok(GlyphHeader {
            number_of_contours,
            bounding_box: BoundingBox {
                x_min,
                y_min,
                x_max,
                y_max,
            },
        })
    }
}

impl ReadBinaryDep for SimpleOutline {
    type Args<'a> = u16;
    type HostType<'a> = Self;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        number_of_contours: u16,
    ) -> Result<Self, ParseError> {
        let end_pts_of_contours = ctxt
            .read_array::<U16Be>(usize::from(number_of_contours))?
            .to_vec();
        ctxt.check(end_pts_of_contours.iter().tuple_windows().all(|(a, b)| a < b))?;
        let instruction_length = ctxt.read::<U16Be>()?;
        let _instructions = ctxt.read_slice(usize::from(instruction_length))?;
        // end_pts_of_contours stores the index of the end points.
        // Therefore the number of coordinates is the last index + 1
        let number_of_coordinates = end_pts_of_contours
            .last()
            .map_or(0, |&last| usize::from(last) + 1);

        let mut flags = Vec::with_capacity(number_of_coordinates);
        while flags.len() < number_of_coordinates {
            let flag = ctxt.read::<SimpleGlyphFlag>()?;
            if flag.is_repeated() {
                let count = usize::from(ctxt.read::<U8>()?) + 1; // + 1 to include the current entry
                flags.extend(iter::repeat(flag).take(count));
            } else {
                flags.push(flag);
            }
        }
        ctxt.check(flags.len() == number_of_coordinates)?;

        // Coordinates are deltas against the previous point, the first against (0, 0).
        let xs = read_coordinates(ctxt, &flags, Axis::X)?;
        let ys = read_coordinates(ctxt, &flags, Axis::Y)?;
        let points = xs
            .into_iter()
            .zip(ys)
            .map(|(x, y)| vec2f(x as f32, y as f32))
            .collect();

        let mut start = 0;
        let contours = end_pts_of_contours
            .iter()
            .map(|&end_pt| {
                let end = usize::from(end_pt) + 1;
                let contour = Contour { start, end };
                start = end;
                contour
            })
            .collect();

        Ok(SimpleOutline {
            contours,
            points,
            on_curve: flags.iter().map(|flag| flag.is_on_curve()).collect(),
        })
    }
}

#[derive(Copy, Clone)]
enum Axis {
    X,
    Y,
}

fn read_coordinates(
    ctxt: &mut ReadCtxt<'_>,
    flags: &[SimpleGlyphFlag],
    axis: Axis,
) -> Result<Vec<i32>, ParseError> {
    let mut value = 0i32;
    flags
        .iter()
        .map(|&flag| -> Result<i32, ParseError> {
            let (is_short, is_same_or_positive) = match axis {
                Axis::X => (flag.x_is_short(), flag.x_is_same_or_positive()),
                Axis::Y => (flag.y_is_short(), flag.y_is_same_or_positive()),
            };
            let delta = if is_short {
                let magnitude = i32::from(ctxt.read::<U8>()?);
                if is_same_or_positive {
                    magnitude
                } else {
                    -magnitude
                }
            } else if is_same_or_positive {
                0
            } else {
                i32::from(ctxt.read::<I16Be>()?)
            };
            value += delta;
            Ok(value)
        })
        .collect()
}

fn read_components(
    ctxt: &mut ReadCtxt<'_>,
    num_glyphs: usize,
) -> Result<Vec<Component>, ParseError> {
    let mut components = Vec::new();
    loop {
        let flags = ctxt.read::<CompositeGlyphFlag>()?;
        let glyph_index = ctxt.read_u16be()?;
        ctxt.check_index(usize::from(glyph_index) < num_glyphs)?;
        let argument1 = ctxt.read_dep::<CompositeGlyphArgument>(flags)?;
        let argument2 = ctxt.read_dep::<CompositeGlyphArgument>(flags)?;

        let transform = if flags.we_have_a_scale() {
            let scale = f32::from(ctxt.read::<F2Dot14>()?);
            Matrix2x2F::row_major(scale, 0., 0., scale)
        } else if flags.we_have_an_x_and_y_scale() {
            let x_scale = f32::from(ctxt.read::<F2Dot14>()?);
            let y_scale = f32::from(ctxt.read::<F2Dot14>()?);
            Matrix2x2F::row_major(x_scale, 0., 0., y_scale)
        } else if flags.we_have_a_two_by_two() {
            let x_scale = f32::from(ctxt.read::<F2Dot14>()?);
            let scale01 = f32::from(ctxt.read::<F2Dot14>()?);
            let scale10 = f32::from(ctxt.read::<F2Dot14>()?);
            let y_scale = f32::from(ctxt.read::<F2Dot14>()?);
            // x' = x_scale * x + scale10 * y, y' = scale01 * x + y_scale * y
            Matrix2x2F::row_major(x_scale, scale10, scale01, y_scale)
        } else {
            Matrix2x2F::from_scale(1.0)
        };

        if !flags.args_are_xy_values() {
            warn!(
                "component {} uses point matching, treating arguments as an offset",
                glyph_index
            );
        }
        let mut offset = vec2f(
            i32::from(argument1) as f32,
            i32::from(argument2) as f32,
        );
        if flags.scaled_component_offset() {
            offset = transform * offset;
        }

        components.push(Component {
            glyph_index: u32::from(glyph_index),
            offset,
            transform,
        });

        if !flags.more_components() {
            break;
        }
    }

    Ok(components)
}

impl ReadFrom for SimpleGlyphFlag {
    type ReadType = U8;

    fn read_from(flag: u8) -> Self {
        SimpleGlyphFlag::from_bits_truncate(flag)
    }
}

impl SimpleGlyphFlag {
    pub fn is_on_curve(self) -> bool {
        self.contains(Self::ON_CURVE_POINT)
    }

    pub fn x_is_short(self) -> bool {
        self.contains(Self::X_SHORT_VECTOR)
    }

    pub fn y_is_short(self) -> bool {
        self.contains(Self::Y_SHORT_VECTOR)
    }

    pub fn is_repeated(self) -> bool {
        self.contains(Self::REPEAT_FLAG)
    }

    pub fn x_is_same_or_positive(self) -> bool {
        self.contains(Self::X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR)
    }

    pub fn y_is_same_or_positive(self) -> bool {
        self.contains(Self::Y_IS_SAME_OR_POSITIVE_Y_SHORT_VECTOR)
    }
}

impl ReadFrom for CompositeGlyphFlag {
    type ReadType = U16Be;

    fn read_from(flag: u16) -> Self {
        CompositeGlyphFlag::from_bits_truncate(flag)
    }
}

impl CompositeGlyphFlag {
    pub fn arg_1_and_2_are_words(self) -> bool {
        self.contains(Self::ARG_1_AND_2_ARE_WORDS)
    }

    pub fn args_are_xy_values(self) -> bool {
        self.contains(Self::ARGS_ARE_XY_VALUES)
    }

    pub fn we_have_a_scale(self) -> bool {
        self.contains(Self::WE_HAVE_A_SCALE)
    }

    pub fn we_have_an_x_and_y_scale(self) -> bool {
        self.contains(Self::WE_HAVE_AN_X_AND_Y_SCALE)
    }

    pub fn we_have_a_two_by_two(self) -> bool {
        self.contains(Self::WE_HAVE_A_TWO_BY_TWO)
    }

    pub fn more_components(self) -> bool {
        self.contains(Self::MORE_COMPONENTS)
    }

    /// Offsets are transformed along with the component unless the font says otherwise.
    pub fn scaled_component_offset(self) -> bool {
        self.contains(Self::SCALED_COMPONENT_OFFSET)
            && !self.contains(Self::UNSCALED_COMPONENT_OFFSET)
    }
}

impl ReadBinaryDep for CompositeGlyphArgument {
    type Args<'a> = CompositeGlyphFlag;
    type HostType<'a> = Self;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        flags: CompositeGlyphFlag,
    ) -> Result<Self, ParseError> {
        let arg = match (flags.arg_1_and_2_are_words(), flags.args_are_xy_values()) {
            (true, true) => CompositeGlyphArgument::I16(ctxt.read_i16be()?),
            (true, false) => CompositeGlyphArgument::U16(ctxt.read_u16be()?),
            (false, true) => CompositeGlyphArgument::I8(ctxt.read_i8()?),
            (false, false) => CompositeGlyphArgument::U8(ctxt.read_u8()?),
        };

        Ok(arg)
    }
}

impl From<CompositeGlyphArgument> for i32 {
    fn from(arg: CompositeGlyphArgument) -> Self {
        match arg {
            CompositeGlyphArgument::U8(value) => i32::from(value),
            CompositeGlyphArgument::I8(value) => i32::from(value),
            CompositeGlyphArgument::U16(value) => i32::from(value),
            CompositeGlyphArgument::I16(value) => i32::from(value),
        }
    }
}

impl GlyfTable {
    /// Decode the glyph stored at `glyph_index` of a raw `glyf` table.
    pub fn read_glyph(
        glyf: ReadScope<'_>,
        loca: &LocaTable,
        glyph_index: usize,
    ) -> Result<Glyph, ParseError> {
        let range = loca.glyph_range(glyph_index).ok_or(ParseError::BadIndex)?;
        if range.is_empty() {
            return Ok(Glyph::default());
        }
        glyf.offset_length(range.start, range.len())?
            .read_dep::<Glyph>(loca.num_glyphs())
    }
}
