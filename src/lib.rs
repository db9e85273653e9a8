#![warn(rust_2018_idioms)]

//! TrueType font parsing and scanline glyph rasterization.
//!
//! [load_font] and [load_font_collection] decode `.ttf` and `.ttc` data into owned [Font]
//! values. [raster::rasterize] paints a glyph into any [raster::Canvas].

/// Reading of binary data.
pub mod binary;
/// Checksum calculation routines.
pub mod checksum;
pub mod directory;
pub mod error;
pub mod font;
pub mod glyph;
#[cfg(feature = "outline")]
pub mod outline;
pub mod post;
pub mod raster;
pub mod tables;
pub mod tag;

pub use pathfinder_geometry;

pub use crate::error::ParseError;
pub use crate::font::{load_font, load_font_collection, Font};
pub use crate::raster::{rasterize, rasterize_char, Bitmap, Canvas, FILL_COVERAGE};
pub use crate::tables::glyf::COMPOSITE_GLYPH_RECURSION_LIMIT;
