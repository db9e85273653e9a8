//! Quadratic Bézier helpers used by the scanline filler.

use pathfinder_geometry::rect::RectF;
use pathfinder_geometry::vector::Vector2F;
use tinyvec::ArrayVec;

/// Tolerance for treating a coefficient or derivative as zero.
pub const EPSILON: f32 = 1e-6;

/// A quadratic Bézier curve: start, control, end.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct QuadBezier {
    pub p0: Vector2F,
    pub p1: Vector2F,
    pub p2: Vector2F,
}

impl QuadBezier {
    pub fn new(p0: Vector2F, p1: Vector2F, p2: Vector2F) -> Self {
        QuadBezier { p0, p1, p2 }
    }

    pub fn eval(&self, t: f32) -> Vector2F {
        let mt = 1.0 - t;
        self.p0 * (mt * mt) + self.p1 * (2.0 * mt * t) + self.p2 * (t * t)
    }

    pub fn derivative(&self, t: f32) -> Vector2F {
        (self.p1 - self.p0) * (2.0 * (1.0 - t)) + (self.p2 - self.p1) * (2.0 * t)
    }

    /// Tight bounding box, including the extrema between the end points.
    pub fn bounding_box(&self) -> RectF {
        let mut min = self.p0.min(self.p2);
        let mut max = self.p0.max(self.p2);
        for t in [self.extremum_t(Axis::X), self.extremum_t(Axis::Y)]
            .into_iter()
            .flatten()
        {
            let p = self.eval(t);
            min = min.min(p);
            max = max.max(p);
        }
        RectF::from_points(min, max)
    }

    fn extremum_t(&self, axis: Axis) -> Option<f32> {
        let (a, b, c) = match axis {
            Axis::X => (self.p0.x(), self.p1.x(), self.p2.x()),
            Axis::Y => (self.p0.y(), self.p1.y(), self.p2.y()),
        };
        let denom = a - 2.0 * b + c;
        if denom.abs() < EPSILON {
            return None;
        }
        let t = (a - b) / denom;
        (t > 0.0 && t < 1.0).then_some(t)
    }

    /// Parameters `t` in `[0, 1]` where the curve crosses the horizontal line at `y`, in
    /// ascending order.
    pub fn solve_t_for_y(&self, y: f32) -> ArrayVec<[f32; 2]> {
        let a = self.p0.y() - 2.0 * self.p1.y() + self.p2.y();
        let b = 2.0 * (self.p1.y() - self.p0.y());
        let c = self.p0.y() - y;

        let mut roots = ArrayVec::<[f32; 2]>::new();
        if a.abs() < EPSILON {
            if b.abs() >= EPSILON {
                roots.push(-c / b);
            }
        } else {
            let discriminant = b * b - 4.0 * a * c;
            if discriminant >= 0.0 {
                let sqrt = discriminant.sqrt();
                let t0 = (-b - sqrt) / (2.0 * a);
                let t1 = (-b + sqrt) / (2.0 * a);
                let (t0, t1) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
                roots.push(t0);
                if t1 - t0 > EPSILON {
                    roots.push(t1);
                }
            }
        }

        roots.retain(|t| (-EPSILON..=1.0 + EPSILON).contains(t));
        for t in roots.iter_mut() {
            *t = t.clamp(0.0, 1.0);
        }
        roots
    }
}

#[derive(Copy, Clone)]
enum Axis {
    X,
    Y,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathfinder_geometry::vector::vec2f;

    #[test]
    fn test_eval_and_derivative() {
        let curve = QuadBezier::new(vec2f(0., 0.), vec2f(5., 10.), vec2f(10., 0.));
        assert_eq!(curve.eval(0.0), vec2f(0., 0.));
        assert_eq!(curve.eval(0.5), vec2f(5., 5.));
        assert_eq!(curve.eval(1.0), vec2f(10., 0.));
        assert_eq!(curve.derivative(0.0), vec2f(10., 20.));
        assert_eq!(curve.derivative(0.5), vec2f(10., 0.));
    }

    #[test]
    fn test_bounding_box_includes_extremum() {
        let curve = QuadBezier::new(vec2f(0., 0.), vec2f(5., 10.), vec2f(10., 0.));
        let rect = curve.bounding_box();
        assert_eq!(rect.min_y(), 0.);
        assert_eq!(rect.max_y(), 5.);
        assert_eq!(rect.min_x(), 0.);
        assert_eq!(rect.max_x(), 10.);
    }

    #[test]
    fn test_solve_two_roots() {
        let curve = QuadBezier::new(vec2f(0., 0.), vec2f(5., 10.), vec2f(10., 0.));
        let roots = curve.solve_t_for_y(3.75);
        assert_eq!(roots.as_slice(), &[0.25, 0.75]);
    }

    #[test]
    fn test_solve_linear() {
        // Control point on the chord: y is linear in t
        let curve = QuadBezier::new(vec2f(0., 0.), vec2f(0., 5.), vec2f(0., 10.));
        let roots = curve.solve_t_for_y(2.5);
        assert_eq!(roots.as_slice(), &[0.25]);
    }

    #[test]
    fn test_solve_outside_range() {
        let curve = QuadBezier::new(vec2f(0., 0.), vec2f(5., 10.), vec2f(10., 0.));
        assert!(curve.solve_t_for_y(6.0).is_empty());
        assert!(curve.solve_t_for_y(-1.0).is_empty());
    }
}
