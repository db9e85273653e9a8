//! Access glyph outlines. Requires the `outline` cargo feature (enabled by default).
//!
//! Outlines are delivered as drawing commands to an implementor of [OutlineSink], in font units
//! with y pointing up. Compound glyphs are flattened: each component is visited with its
//! transform applied.
//!
//! ### Example
//!
//! ```
//! use fontscan::outline::OutlineSink;
//! use fontscan::pathfinder_geometry::vector::Vector2F;
//! use fontscan::Font;
//!
//! #[derive(Default)]
//! struct CommandCounter {
//!     moves: usize,
//!     lines: usize,
//!     quads: usize,
//!     closes: usize,
//! }
//!
//! impl OutlineSink for CommandCounter {
//!     fn move_to(&mut self, _to: Vector2F) {
//!         self.moves += 1;
//!     }
//!
//!     fn line_to(&mut self, _to: Vector2F) {
//!         self.lines += 1;
//!     }
//!
//!     fn quadratic_curve_to(&mut self, _ctrl: Vector2F, _to: Vector2F) {
//!         self.quads += 1;
//!     }
//!
//!     fn close(&mut self) {
//!         self.closes += 1;
//!     }
//! }
//!
//! let font = Font::empty();
//! let mut counter = CommandCounter::default();
//! // The empty font has no glyphs
//! assert!(font.visit_outline(0, &mut counter).is_err());
//! assert_eq!(counter.moves, 0);
//! ```

use pathfinder_geometry::transform2d::{Matrix2x2F, Transform2F};
use pathfinder_geometry::vector::Vector2F;

use crate::error::ParseError;
use crate::font::Font;
use crate::glyph::{Outline, Segment, SimpleOutline};
use crate::tables::glyf::COMPOSITE_GLYPH_RECURSION_LIMIT;

// `OutlineSink` is from font-kit, font-kit/src/outline.rs:
//
// Copyright © 2020 The Pathfinder Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

/// A trait for visiting a glyph outline
pub trait OutlineSink {
    /// Moves the pen to a point.
    fn move_to(&mut self, to: Vector2F);
    /// Draws a line to a point.
    fn line_to(&mut self, to: Vector2F);
    /// Draws a quadratic Bézier curve to a point.
    fn quadratic_curve_to(&mut self, ctrl: Vector2F, to: Vector2F);
    /// Closes the path, returning to the first point in it.
    fn close(&mut self);
}

impl Font {
    /// Deliver the outline of `glyph_index` to `sink`.
    ///
    /// Fails with `BadIndex` for a glyph the font does not have and `LimitExceeded` when
    /// compound glyphs nest deeper than [COMPOSITE_GLYPH_RECURSION_LIMIT].
    pub fn visit_outline<S: OutlineSink>(
        &self,
        glyph_index: u32,
        sink: &mut S,
    ) -> Result<(), ParseError> {
        let identity = Transform2F {
            matrix: Matrix2x2F::from_scale(1.0),
            vector: Vector2F::zero(),
        };
        self.visit_transformed(glyph_index, sink, identity, 0)
    }

    fn visit_transformed<S: OutlineSink>(
        &self,
        glyph_index: u32,
        sink: &mut S,
        transform: Transform2F,
        depth: u8,
    ) -> Result<(), ParseError> {
        if depth > COMPOSITE_GLYPH_RECURSION_LIMIT {
            return Err(ParseError::LimitExceeded);
        }

        let glyph = self.glyph(glyph_index).ok_or(ParseError::BadIndex)?;
        match &glyph.outline {
            Outline::Simple(outline) => {
                visit_simple_outline(sink, transform, outline);
                Ok(())
            }
            Outline::Compound(components) => {
                for component in components {
                    let component_transform = Transform2F {
                        matrix: component.transform,
                        vector: component.offset,
                    };
                    self.visit_transformed(
                        component.glyph_index,
                        sink,
                        transform * component_transform,
                        depth + 1,
                    )?;
                }
                Ok(())
            }
        }
    }
}

fn visit_simple_outline<S: OutlineSink>(
    sink: &mut S,
    transform: Transform2F,
    outline: &SimpleOutline,
) {
    for segments in outline.contours() {
        sink.move_to(transform * segments.origin());
        for segment in segments {
            match segment {
                Segment::Line(_, to) => sink.line_to(transform * to),
                Segment::Quad(_, control, to) => {
                    sink.quadratic_curve_to(transform * control, transform * to)
                }
            }
        }
        sink.close();
    }
}
