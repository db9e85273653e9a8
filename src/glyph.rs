//! In-memory glyph model.
//!
//! A `Glyph` owns its outline in font units (y-up). Simple outlines keep their points exactly as
//! stored in the `glyf` table: implied on-curve midpoints between consecutive control points are
//! not materialised, they are synthesised by [`Segments`] when the contour is walked.

use std::ops::Range;

use pathfinder_geometry::transform2d::Matrix2x2F;
use pathfinder_geometry::vector::Vector2F;

/// A decoded glyph with its metrics.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Glyph {
    pub outline: Outline,
    pub bounding_box: BoundingBox,
    pub advance_width: u16,
    pub left_side_bearing: i16,
    /// PostScript name from the `post` table, when the font supplies one.
    pub name: Option<String>,
}

/// Glyph bounding box in font units, as stored in the glyph header.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Hash)]
pub struct BoundingBox {
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outline {
    Simple(SimpleOutline),
    Compound(Vec<Component>),
}

/// Contours of a simple glyph.
///
/// `points` and `on_curve` always have the same length. Contour ranges are contiguous, in order,
/// and cover every point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimpleOutline {
    pub contours: Vec<Contour>,
    pub points: Vec<Vector2F>,
    pub on_curve: Vec<bool>,
}

/// The half-open range of point indices making up one closed contour.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Contour {
    pub start: usize,
    pub end: usize,
}

/// A reference to another glyph, placed with an affine transform.
///
/// A point `p` of the referenced glyph lands at `transform * p + offset` in the parent.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Component {
    pub glyph_index: u32,
    pub offset: Vector2F,
    pub transform: Matrix2x2F,
}

/// One piece of a contour.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Segment {
    Line(Vector2F, Vector2F),
    /// Quadratic Bézier: start, control, end.
    Quad(Vector2F, Vector2F, Vector2F),
}

/// Iterator over the segments of one contour, closing back to its starting point.
pub struct Segments<'a> {
    points: &'a [Vector2F],
    on_curve: &'a [bool],
    origin: Vector2F,
    current: Vector2F,
    pending: Option<Vector2F>,
    i: usize,
    until: usize,
    closed: bool,
}

impl Default for Outline {
    fn default() -> Self {
        Outline::Simple(SimpleOutline::default())
    }
}

impl Outline {
    /// `true` if there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        match self {
            Outline::Simple(simple) => simple.contours.is_empty(),
            Outline::Compound(components) => components.is_empty(),
        }
    }
}

impl Contour {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl SimpleOutline {
    /// Walk the segments of `contour`.
    pub fn segments(&self, contour: &Contour) -> Segments<'_> {
        let range = contour.range();
        Segments::new(&self.points[range.clone()], &self.on_curve[range])
    }

    /// Segment iterators for every non-empty contour, in order.
    pub fn contours(&self) -> impl Iterator<Item = Segments<'_>> + '_ {
        self.contours
            .iter()
            .filter(|contour| !contour.is_empty())
            .map(move |contour| self.segments(contour))
    }
}

impl<'a> Segments<'a> {
    /// Create a walker over a contour. `points` must not be empty.
    pub fn new(points: &'a [Vector2F], on_curve: &'a [bool]) -> Self {
        let len = points.len();
        let (origin, i, until) = match (on_curve.first(), on_curve.last()) {
            (Some(true), _) => (points[0], 1, len),
            (Some(false), Some(true)) => (points[len - 1], 0, len - 1),
            (Some(false), Some(false)) => (points[len - 1].lerp(points[0], 0.5), 0, len),
            _ => (Vector2F::zero(), 0, 0),
        };
        Segments {
            points,
            on_curve,
            origin,
            current: origin,
            pending: None,
            i,
            until,
            closed: len == 0,
        }
    }

    /// The first on-curve point of the contour, real or implied.
    pub fn origin(&self) -> Vector2F {
        self.origin
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        while self.i < self.until {
            let point = self.points[self.i];
            let on_curve = self.on_curve[self.i];
            self.i += 1;

            if on_curve {
                let segment = match self.pending.take() {
                    Some(control) => Segment::Quad(self.current, control, point),
                    None => Segment::Line(self.current, point),
                };
                self.current = point;
                return Some(segment);
            }

            if let Some(control) = self.pending.replace(point) {
                let mid = control.lerp(point, 0.5);
                let segment = Segment::Quad(self.current, control, mid);
                self.current = mid;
                return Some(segment);
            }
        }

        if self.closed {
            return None;
        }
        self.closed = true;
        match self.pending.take() {
            Some(control) => Some(Segment::Quad(self.current, control, self.origin)),
            None if self.current != self.origin => Some(Segment::Line(self.current, self.origin)),
            None => None,
        }
    }
}
