//! Scanline rasterization of glyph outlines.
//!
//! Coverage is binary: a pixel is filled when its centre lies inside the outline under the
//! nonzero winding rule. Each pixel row is sampled along the horizontal line through its centre
//! (`y + 0.5`). Every outline edge crossing that line leaves a [FillBound]; walking the bounds in
//! x order with a winding counter yields the filled runs.
//!
//! Font units are y-up and canvases are y-down, so a point `p` in font units lands at
//! `origin + (p.x * scale, -p.y * scale)`.

pub mod bezier;

use log::trace;
use pathfinder_geometry::transform2d::{Matrix2x2F, Transform2F};
use pathfinder_geometry::vector::Vector2F;

use crate::error::ParseError;
use crate::font::Font;
use crate::glyph::{Outline, Segment, SimpleOutline};
use crate::tables::glyf::COMPOSITE_GLYPH_RECURSION_LIMIT;

use bezier::{QuadBezier, EPSILON};

// Roots this close to either end of an arc are treated as its end points.
const END_TOLERANCE: f32 = 1e-3;

/// Coverage written for every filled pixel.
pub const FILL_COVERAGE: u8 = 255;

/// A pixel buffer that receives coverage.
pub trait Canvas {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn set_pixel(&mut self, x: usize, y: usize, coverage: u8);
}

/// Row-major 8-bit coverage buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

/// A crossing of the outline with a sample line.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FillBound {
    pub x: f32,
    /// The edge runs towards the top of the canvas (decreasing y).
    pub upward: bool,
}

/// Fill bounds and spikes of every row of a canvas, collected from one outline.
pub(crate) struct Scanlines {
    bounds: Vec<Vec<FillBound>>,
    spikes: Vec<Vec<(f32, f32)>>,
}

impl Bitmap {
    pub fn new(width: usize, height: usize) -> Self {
        Bitmap {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> u8 {
        if x < self.width && y < self.height {
            self.data[y * self.width + x]
        } else {
            0
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The filled pixels of row `y` as a string of `#` and `.`.
    pub fn row_string(&self, y: usize) -> String {
        (0..self.width)
            .map(|x| if self.get_pixel(x, y) > 0 { '#' } else { '.' })
            .collect()
    }
}

impl Canvas for Bitmap {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn set_pixel(&mut self, x: usize, y: usize, coverage: u8) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = coverage;
        }
    }
}

/// Paint `glyph_index` into `canvas` with its baseline origin at `origin` (in pixels) and
/// `scale` pixels per font unit.
///
/// Compound glyphs are painted component by component. Nesting deeper than
/// [COMPOSITE_GLYPH_RECURSION_LIMIT] fails with `LimitExceeded`, leaving whatever was already
/// painted.
pub fn rasterize<C: Canvas + ?Sized>(
    font: &Font,
    canvas: &mut C,
    origin: Vector2F,
    glyph_index: u32,
    scale: f32,
) -> Result<(), ParseError> {
    let transform = Transform2F {
        matrix: Matrix2x2F::row_major(scale, 0.0, 0.0, -scale),
        vector: origin,
    };
    rasterize_glyph(font, canvas, transform, glyph_index, 0)
}

/// Paint the glyph `font` maps `ch` to, `.notdef` if it has none.
pub fn rasterize_char<C: Canvas + ?Sized>(
    font: &Font,
    canvas: &mut C,
    origin: Vector2F,
    ch: char,
    scale: f32,
) -> Result<(), ParseError> {
    rasterize(font, canvas, origin, font.glyph_index(ch), scale)
}

fn rasterize_glyph<C: Canvas + ?Sized>(
    font: &Font,
    canvas: &mut C,
    transform: Transform2F,
    glyph_index: u32,
    depth: u8,
) -> Result<(), ParseError> {
    if depth > COMPOSITE_GLYPH_RECURSION_LIMIT {
        return Err(ParseError::LimitExceeded);
    }

    let glyph = font.glyph(glyph_index).ok_or(ParseError::BadIndex)?;
    match &glyph.outline {
        Outline::Simple(outline) => {
            rasterize_single(canvas, outline, transform);
            Ok(())
        }
        Outline::Compound(components) => {
            for component in components {
                let component_transform = Transform2F {
                    matrix: component.transform,
                    vector: component.offset,
                };
                rasterize_glyph(
                    font,
                    canvas,
                    transform * component_transform,
                    component.glyph_index,
                    depth + 1,
                )?;
            }
            Ok(())
        }
    }
}

/// Fill a simple outline mapped through `transform` into canvas space.
pub fn rasterize_single<C: Canvas + ?Sized>(
    canvas: &mut C,
    outline: &SimpleOutline,
    transform: Transform2F,
) {
    if canvas.width() == 0 || canvas.height() == 0 {
        return;
    }
    let scanlines = Scanlines::from_outline(outline, transform, canvas.height());
    scanlines.fill(canvas);
}

impl Scanlines {
    pub(crate) fn new(height: usize) -> Self {
        Scanlines {
            bounds: vec![Vec::new(); height],
            spikes: vec![Vec::new(); height],
        }
    }

    pub(crate) fn from_outline(
        outline: &SimpleOutline,
        transform: Transform2F,
        height: usize,
    ) -> Self {
        let mut scanlines = Scanlines::new(height);
        for segments in outline.contours() {
            for segment in segments {
                match segment {
                    Segment::Line(a, b) => scanlines.add_line(transform * a, transform * b),
                    Segment::Quad(p0, p1, p2) => scanlines.add_quad(QuadBezier::new(
                        transform * p0,
                        transform * p1,
                        transform * p2,
                    )),
                }
            }
        }
        scanlines
    }

    pub(crate) fn bounds(&self, row: usize) -> &[FillBound] {
        self.bounds.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Rows whose sample line `row + 0.5` lies in `[min_y, max_y]`, clipped to the canvas.
    fn rows(&self, min_y: f32, max_y: f32) -> std::ops::Range<usize> {
        let height = self.bounds.len() as f32;
        let first = (min_y - 0.5).ceil().clamp(0.0, height);
        let end = ((max_y - 0.5).floor() + 1.0).clamp(0.0, height);
        if end <= first {
            return 0..0;
        }
        first as usize..end as usize
    }

    fn push_bound(&mut self, row: usize, bound: FillBound) {
        if let Some(bounds) = self.bounds.get_mut(row) {
            // After any equal x so ties keep insertion order
            let index = bounds.partition_point(|other| other.x <= bound.x);
            bounds.insert(index, bound);
        }
    }

    fn add_line(&mut self, a: Vector2F, b: Vector2F) {
        if (a.y() - b.y()).abs() < EPSILON {
            self.add_horizontal(a, b);
            return;
        }

        let (min_y, max_y) = (a.y().min(b.y()), a.y().max(b.y()));
        let upward = b.y() < a.y();
        for row in self.rows(min_y, max_y) {
            let sample_y = row as f32 + 0.5;
            // Half-open: a vertex on the sample line belongs to the edge leaving it downwards
            if sample_y >= max_y {
                continue;
            }
            let t = (sample_y - a.y()) / (b.y() - a.y());
            let x = a.x() + t * (b.x() - a.x());
            self.push_bound(row, FillBound { x, upward });
        }
    }

    // A horizontal edge lying on a sample line is painted directly; others cross no sample line.
    fn add_horizontal(&mut self, a: Vector2F, b: Vector2F) {
        let y = a.y();
        if ((y - y.floor()) - 0.5).abs() >= EPSILON || y < 0.0 {
            return;
        }
        let row = y.floor() as usize;
        if let Some(spikes) = self.spikes.get_mut(row) {
            spikes.push((a.x().min(b.x()), a.x().max(b.x())));
        }
    }

    fn add_quad(&mut self, curve: QuadBezier) {
        let (y0, y1, y2) = (curve.p0.y(), curve.p1.y(), curve.p2.y());
        if (y0 - y1).abs() < EPSILON && (y1 - y2).abs() < EPSILON {
            self.add_horizontal(curve.p0, curve.p2);
            return;
        }

        let bbox = curve.bounding_box();
        for row in self.rows(bbox.min_y(), bbox.max_y()) {
            let sample_y = row as f32 + 0.5;
            for t in curve.solve_t_for_y(sample_y) {
                let dy = curve.derivative(t).y();
                let at_start = t < END_TOLERANCE && (sample_y - y0).abs() < EPSILON;
                let at_end = t > 1.0 - END_TOLERANCE && (sample_y - y2).abs() < EPSILON;
                let include = if at_start {
                    // Same half-open rule as lines: keep the end point with the smaller y
                    dy > EPSILON
                } else if at_end {
                    dy < -EPSILON
                } else {
                    // Tangent extrema touch the sample line without crossing it
                    dy.abs() >= EPSILON
                };
                if include {
                    let x = curve.eval(t).x();
                    self.push_bound(row, FillBound { x, upward: dy < 0.0 });
                }
            }
        }
    }

    /// Paint the runs and spikes of every row.
    pub(crate) fn fill<C: Canvas + ?Sized>(&self, canvas: &mut C) {
        let width = canvas.width();
        for (row, bounds) in self.bounds.iter().enumerate() {
            let mut winding = 0i32;
            let mut run_start = 0.0;
            for bound in bounds {
                let previous = winding;
                winding += if bound.upward { 1 } else { -1 };
                if previous == 0 {
                    run_start = bound.x;
                } else if winding == 0 {
                    fill_span(canvas, width, row, run_start, bound.x);
                }
            }
            if winding != 0 {
                trace!("unclosed run on scanline {}, skipping rest of row", row);
            }

            for &(start, end) in &self.spikes[row] {
                fill_span(canvas, width, row, start, end);
            }
        }
    }
}

/// Fill the pixels of `row` whose centres lie in `[start, end)`, clamped to the canvas.
fn fill_span<C: Canvas + ?Sized>(canvas: &mut C, width: usize, row: usize, start: f32, end: f32) {
    let first = (start - 0.5).ceil().clamp(0.0, width as f32) as usize;
    let end = (end - 0.5).ceil().clamp(0.0, width as f32) as usize;
    for x in first..end {
        canvas.set_pixel(x, row, FILL_COVERAGE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::load_font;
    use crate::tests::builder::{self, ComponentTransform, FontBuilder, TestGlyph};
    use pathfinder_geometry::vector::vec2f;

    fn square_font() -> Font {
        load_font(
            &FontBuilder::new()
                .glyph(TestGlyph::Simple(vec![builder::square(0, 0, 10)]), 500)
                .map('a', 1)
                .build(),
        )
    }

    fn filled(bitmap: &Bitmap) -> Vec<(usize, usize)> {
        let mut pixels = Vec::new();
        for y in 0..bitmap.height() {
            for x in 0..bitmap.width() {
                if bitmap.get_pixel(x, y) == FILL_COVERAGE {
                    pixels.push((x, y));
                }
            }
        }
        pixels
    }

    #[test]
    fn test_unit_square() {
        let font = square_font();
        let mut bitmap = Bitmap::new(12, 12);
        rasterize(&font, &mut bitmap, vec2f(0., 10.), 1, 1.0).unwrap();

        let expected = (0..10)
            .flat_map(|y| (0..10).map(move |x| (x, y)))
            .collect::<Vec<_>>();
        assert_eq!(filled(&bitmap), expected);
    }

    #[test]
    fn test_rasterize_char() {
        let font = square_font();
        let mut bitmap = Bitmap::new(12, 12);
        rasterize_char(&font, &mut bitmap, vec2f(1., 11.), 'a', 1.0).unwrap();
        assert_eq!(bitmap.row_string(0), "............");
        assert_eq!(bitmap.row_string(1), ".##########.");
        assert_eq!(bitmap.row_string(10), ".##########.");
        assert_eq!(bitmap.row_string(11), "............");
    }

    #[test]
    fn test_scaled_square() {
        let font = square_font();
        let mut bitmap = Bitmap::new(8, 8);
        rasterize(&font, &mut bitmap, vec2f(0., 5.), 1, 0.5).unwrap();
        assert_eq!(filled(&bitmap).len(), 25);
    }

    #[test]
    fn test_clipped_to_canvas() {
        let font = square_font();
        let mut bitmap = Bitmap::new(4, 4);
        rasterize(&font, &mut bitmap, vec2f(-5., 8.), 1, 1.0).unwrap();
        // Square covers x in [-5, 5) and y in [-2, 8)
        assert_eq!(filled(&bitmap).len(), 16);

        let mut bitmap = Bitmap::new(4, 4);
        rasterize(&font, &mut bitmap, vec2f(100., 100.), 1, 1.0).unwrap();
        assert!(filled(&bitmap).is_empty());
    }

    #[test]
    fn test_nonzero_overlap() {
        // Two overlapping squares with the same winding fill their union
        let font = load_font(
            &FontBuilder::new()
                .glyph(
                    TestGlyph::Simple(vec![builder::square(0, 0, 6), builder::square(4, 0, 6)]),
                    500,
                )
                .build(),
        );
        let mut bitmap = Bitmap::new(12, 8);
        rasterize(&font, &mut bitmap, vec2f(0., 6.), 1, 1.0).unwrap();
        assert_eq!(bitmap.row_string(3), "##########..");
    }

    #[test]
    fn test_hole() {
        // Inner contour wound the other way
        let mut inner = builder::square(3, 3, 4);
        inner.reverse();
        let font = load_font(
            &FontBuilder::new()
                .glyph(
                    TestGlyph::Simple(vec![builder::square(0, 0, 10), inner]),
                    500,
                )
                .build(),
        );
        let mut bitmap = Bitmap::new(10, 10);
        rasterize(&font, &mut bitmap, vec2f(0., 10.), 1, 1.0).unwrap();
        assert_eq!(bitmap.row_string(5), "###....###");
        assert_eq!(bitmap.row_string(1), "##########");
    }

    #[test]
    fn test_compound_offset_is_scaled() {
        let font = load_font(
            &FontBuilder::new()
                .glyph(TestGlyph::Simple(vec![builder::square(0, 0, 10)]), 500)
                .glyph(TestGlyph::Compound(vec![(1, 20, 0)]), 500)
                .build(),
        );
        let mut bitmap = Bitmap::new(20, 6);
        rasterize(&font, &mut bitmap, vec2f(0., 5.), 2, 0.5).unwrap();
        assert_eq!(bitmap.row_string(2), "..........#####.....");
    }

    #[test]
    fn test_component_transforms() {
        // A 10x4 bar and a 10x10 square
        let bar = vec![(0, 0, true), (0, 4, true), (10, 4, true), (10, 0, true)];
        let font = load_font(
            &FontBuilder::new()
                .glyph(TestGlyph::Simple(vec![bar]), 500)
                .glyph(TestGlyph::Simple(vec![builder::square(0, 0, 10)]), 500)
                .glyph(
                    TestGlyph::TransformedCompound(vec![(2, 0, 0, ComponentTransform::Scale(0.5))]),
                    500,
                )
                .glyph(
                    TestGlyph::TransformedCompound(vec![(
                        2,
                        0,
                        0,
                        ComponentTransform::XYScale(1.0, 0.5),
                    )]),
                    500,
                )
                // Quarter turn: x' = -y + 4, y' = x
                .glyph(
                    TestGlyph::TransformedCompound(vec![(
                        1,
                        4,
                        0,
                        ComponentTransform::TwoByTwo(0.0, 1.0, -1.0, 0.0),
                    )]),
                    500,
                )
                .build(),
        );
        let render = |glyph_index| {
            let mut bitmap = Bitmap::new(12, 12);
            rasterize(&font, &mut bitmap, vec2f(0., 12.), glyph_index, 1.0).unwrap();
            bitmap
        };

        let half = render(3);
        assert_eq!(filled(&half).len(), 25);
        assert_eq!(half.row_string(6), "............");
        assert_eq!(half.row_string(7), "#####.......");
        assert_eq!(half.row_string(11), "#####.......");

        let squashed = render(4);
        assert_eq!(filled(&squashed).len(), 50);
        assert_eq!(squashed.row_string(6), "............");
        assert_eq!(squashed.row_string(7), "##########..");

        // The bar stands upright
        let turned = render(5);
        assert_eq!(filled(&turned).len(), 40);
        assert_eq!(turned.row_string(1), "............");
        assert_eq!(turned.row_string(2), "####........");
        assert_eq!(turned.row_string(11), "####........");
    }

    #[test]
    fn test_self_referencing_compound() {
        let font = load_font(
            &FontBuilder::new()
                .glyph(TestGlyph::Simple(vec![builder::square(0, 0, 4)]), 500)
                .glyph(TestGlyph::Compound(vec![(1, 0, 0), (2, 0, 0)]), 500)
                .build(),
        );
        let mut bitmap = Bitmap::new(8, 8);
        assert_eq!(
            rasterize(&font, &mut bitmap, vec2f(0., 4.), 2, 1.0),
            Err(ParseError::LimitExceeded)
        );
        // The simple component was painted before the limit was hit
        assert_eq!(filled(&bitmap).len(), 16);
    }

    #[test]
    fn test_bad_glyph_index() {
        let font = square_font();
        let mut bitmap = Bitmap::new(4, 4);
        assert_eq!(
            rasterize(&font, &mut bitmap, vec2f(0., 4.), 7, 1.0),
            Err(ParseError::BadIndex)
        );
    }

    #[test]
    fn test_spike() {
        let mut scanlines = Scanlines::new(4);
        scanlines.add_line(vec2f(1., 2.5), vec2f(3., 2.5));
        // Not on a sample line
        scanlines.add_line(vec2f(0., 1.0), vec2f(4., 1.0));
        let mut bitmap = Bitmap::new(4, 4);
        scanlines.fill(&mut bitmap);
        assert_eq!(bitmap.row_string(1), "....");
        assert_eq!(bitmap.row_string(2), ".##.");
    }

    #[test]
    fn test_vertex_on_sample_line_counted_once() {
        // Diamond with its left and right vertices on the sample line of row 2
        let mut scanlines = Scanlines::new(5);
        let points = [vec2f(2., 0.), vec2f(0., 2.5), vec2f(2., 5.), vec2f(4., 2.5)];
        for i in 0..points.len() {
            scanlines.add_line(points[i], points[(i + 1) % points.len()]);
        }
        for row in 0..5 {
            assert_eq!(scanlines.bounds(row).len(), 2, "row {}", row);
        }
        assert_eq!(scanlines.bounds(2)[0].x, 0.0);
        assert_eq!(scanlines.bounds(2)[1].x, 4.0);
    }

    #[test]
    fn test_tangent_extremum_skipped() {
        // Arc whose top touches the sample line of row 1 exactly
        let mut scanlines = Scanlines::new(4);
        scanlines.add_quad(QuadBezier::new(vec2f(0., 3.), vec2f(2., 0.), vec2f(4., 3.)));
        assert!(scanlines.bounds(1).is_empty());
        assert_eq!(scanlines.bounds(2).len(), 2);
    }

    fn assert_rows_balanced(scanlines: &Scanlines, rows: usize) {
        for row in 0..rows {
            let bounds = scanlines.bounds(row);
            assert_eq!(bounds.len() % 2, 0, "row {}", row);
            let winding: i32 = bounds.iter().map(|b| if b.upward { 1 } else { -1 }).sum();
            assert_eq!(winding, 0, "row {}", row);
        }
    }

    #[test]
    fn test_arc_end_on_sample_line() {
        // An arc ending on the sample line of row 2, continued by a line, walked both ways
        let (a, control, b) = (vec2f(1., 0.), vec2f(4., 0.), vec2f(4., 2.5));
        let (c, d) = (vec2f(4., 5.), vec2f(1., 5.));

        let mut forward = Scanlines::new(6);
        forward.add_quad(QuadBezier::new(a, control, b));
        forward.add_line(b, c);
        forward.add_line(c, d);
        forward.add_line(d, a);

        let mut backward = Scanlines::new(6);
        backward.add_line(a, d);
        backward.add_line(d, c);
        backward.add_line(c, b);
        backward.add_quad(QuadBezier::new(b, control, a));

        for scanlines in [&forward, &backward] {
            assert_rows_balanced(scanlines, 6);
            for row in 0..5 {
                assert_eq!(scanlines.bounds(row).len(), 2, "row {}", row);
            }
            assert_eq!(scanlines.bounds(2)[1].x, 4.0);
        }
    }

    #[test]
    fn test_circle_extrema_on_sample_lines() {
        // Top on row 2, sides on row 5 and bottom on row 8
        let points = [
            vec2f(5., 2.5),
            vec2f(8., 2.5),
            vec2f(8., 5.5),
            vec2f(8., 8.5),
            vec2f(5., 8.5),
            vec2f(2., 8.5),
            vec2f(2., 5.5),
            vec2f(2., 2.5),
        ];
        let mut scanlines = Scanlines::new(10);
        for i in (0..points.len()).step_by(2) {
            scanlines.add_quad(QuadBezier::new(
                points[i],
                points[i + 1],
                points[(i + 2) % points.len()],
            ));
        }

        assert_rows_balanced(&scanlines, 10);
        assert!(scanlines.bounds(2).is_empty());
        assert!(scanlines.bounds(8).is_empty());
        for row in [3, 4, 5, 6, 7] {
            assert_eq!(scanlines.bounds(row).len(), 2, "row {}", row);
        }
        assert_eq!(scanlines.bounds(5)[0].x, 2.0);
        assert_eq!(scanlines.bounds(5)[1].x, 8.0);
    }

    #[test]
    fn test_unclosed_run_skipped() {
        let mut scanlines = Scanlines::new(1);
        scanlines.push_bound(
            0,
            FillBound {
                x: 1.0,
                upward: true,
            },
        );
        let mut bitmap = Bitmap::new(4, 1);
        scanlines.fill(&mut bitmap);
        assert_eq!(bitmap.row_string(0), "....");
    }

    #[test]
    fn test_bounds_sorted_stable() {
        let mut scanlines = Scanlines::new(1);
        for (x, upward) in [(3.0, true), (1.0, false), (3.0, false), (2.0, true)] {
            scanlines.push_bound(0, FillBound { x, upward });
        }
        let bounds = scanlines.bounds(0);
        assert_eq!(
            bounds.iter().map(|b| (b.x, b.upward)).collect::<Vec<_>>(),
            vec![(1.0, false), (2.0, true), (3.0, true), (3.0, false)]
        );
    }

    #[test]
    fn test_circle_bounds_even() {
        let font = load_font(
            &FontBuilder::new()
                .glyph(TestGlyph::Simple(vec![builder::circle(50, 50, 40)]), 1000)
                .build(),
        );
        let Outline::Simple(outline) = &font.glyphs[1].outline else {
            panic!("expected simple outline");
        };
        let transform = Transform2F {
            matrix: Matrix2x2F::row_major(1.0, 0.0, 0.0, -1.0),
            vector: vec2f(0., 100.),
        };
        let scanlines = Scanlines::from_outline(outline, transform, 100);
        for row in 0..100 {
            let bounds = scanlines.bounds(row);
            assert_eq!(bounds.len() % 2, 0, "row {}", row);
            let winding: i32 = bounds.iter().map(|b| if b.upward { 1 } else { -1 }).sum();
            assert_eq!(winding, 0, "row {}", row);
        }
    }
}
