//! Polygon primitives and predicates.
//!
//! Rings are slices of `(x, y)` points, closed implicitly (the first point is
//! not repeated at the end). Several predicates accept an `offset` that is
//! added to every vertex of a ring, so a translated copy never has to be
//! materialised while orbiting.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A 2D point.
pub type Point = (f64, f64);

/// Floating-point tolerance shared by every predicate in the kernel.
pub const TOL: f64 = 1e-9;

/// Id reserved for the bin.
pub const BIN_ID: i32 = -1;

/// Returns true if `a` and `b` differ by less than [`TOL`].
#[inline]
pub fn almost_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < TOL
}

/// Returns true if `a` and `b` differ by less than `tolerance`.
#[inline]
pub fn almost_equal_tol(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() < tolerance
}

/// Returns true if both coordinates are almost equal.
#[inline]
pub fn points_equal(a: Point, b: Point) -> bool {
    almost_equal(a.0, b.0) && almost_equal(a.1, b.1)
}

#[inline]
pub(crate) fn shift(p: Point, offset: Point) -> Point {
    (p.0 + offset.0, p.1 + offset.1)
}

/// Returns the ring with its first point appended, unless it is already closed.
pub(crate) fn closed_ring(ring: &[Point]) -> Vec<Point> {
    let mut closed = ring.to_vec();
    if let (Some(&first), Some(&last)) = (ring.first(), ring.last()) {
        if ring.len() > 1 && !points_equal(first, last) {
            closed.push(first);
        }
    }
    closed
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Right edge.
    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    /// Top edge.
    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }
}

/// Outcome of a point-in-polygon test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    Inside,
    Outside,
    /// The point sits on a vertex or an edge, or the ring is degenerate.
    Indeterminate,
}

impl Containment {
    /// `Some(true)` inside, `Some(false)` outside, `None` when indeterminate.
    pub fn as_option(self) -> Option<bool> {
        match self {
            Containment::Inside => Some(true),
            Containment::Outside => Some(false),
            Containment::Indeterminate => None,
        }
    }

    pub fn is_inside(self) -> bool {
        self == Containment::Inside
    }

    /// True if one is inside and the other outside.
    pub(crate) fn differs_from(self, other: Containment) -> bool {
        matches!(
            (self, other),
            (Containment::Inside, Containment::Outside) | (Containment::Outside, Containment::Inside)
        )
    }
}

/// A polygon with an id and the rings of its direct holes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Polygon {
    /// Part id, or [`BIN_ID`] for the bin.
    pub id: i32,
    /// Outer ring.
    pub points: Vec<Point>,
    /// Direct holes, used for nesting parts inside other parts.
    pub holes: Vec<Vec<Point>>,
}

impl Polygon {
    /// Creates a polygon without holes.
    pub fn new(id: i32, points: Vec<Point>) -> Self {
        Self {
            id,
            points,
            holes: Vec::new(),
        }
    }

    /// Sets the hole rings.
    pub fn with_holes(mut self, holes: Vec<Vec<Point>>) -> Self {
        self.holes = holes;
        self
    }

    /// Absolute area of the outer ring.
    pub fn area(&self) -> f64 {
        polygon_area(&self.points).abs()
    }

    /// Bounding box of the outer ring.
    pub fn bounds(&self) -> Option<Bounds> {
        polygon_bounds(&self.points)
    }

    /// A copy rotated by `degrees` about the origin, holes included.
    pub fn rotated(&self, degrees: f64) -> Self {
        Self {
            id: self.id,
            points: rotate_polygon(&self.points, degrees),
            holes: self
                .holes
                .iter()
                .map(|hole| rotate_polygon(hole, degrees))
                .collect(),
        }
    }
}

/// Signed shoelace area; positive for counter-clockwise rings.
pub fn polygon_area(polygon: &[Point]) -> f64 {
    let n = polygon.len();
    if n < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += polygon[i].0 * polygon[j].1 - polygon[j].0 * polygon[i].1;
    }
    area / 2.0
}

/// Reverses the ring in place if it winds clockwise.
pub fn make_ccw(ring: &mut [Point]) {
    if polygon_area(ring) < 0.0 {
        ring.reverse();
    }
}

/// Reverses the ring in place if it winds counter-clockwise.
pub fn make_cw(ring: &mut [Point]) {
    if polygon_area(ring) > 0.0 {
        ring.reverse();
    }
}

/// Bounding box; `None` for rings with fewer than three points.
pub fn polygon_bounds(polygon: &[Point]) -> Option<Bounds> {
    if polygon.len() < 3 {
        return None;
    }
    Some(points_bounds(polygon.iter().copied()))
}

/// Bounding box of any non-empty point set.
pub(crate) fn points_bounds(points: impl IntoIterator<Item = Point>) -> Bounds {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for (x, y) in points {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    Bounds {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    }
}

/// Tri-state ray-casting test.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> Containment {
    point_in_polygon_at(point, polygon, (0.0, 0.0))
}

/// [`point_in_polygon`] against `polygon` translated by `offset`.
pub fn point_in_polygon_at(point: Point, polygon: &[Point], offset: Point) -> Containment {
    let n = polygon.len();
    if n < 3 {
        return Containment::Indeterminate;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = shift(polygon[i], offset);
        let pj = shift(polygon[j], offset);
        j = i;

        if points_equal(pi, point) || on_segment(pi, pj, point) {
            return Containment::Indeterminate;
        }

        // Degenerate edge.
        if points_equal(pi, pj) {
            continue;
        }

        let crosses = (pi.1 > point.1) != (pj.1 > point.1)
            && point.0 < (pj.0 - pi.0) * (point.1 - pi.1) / (pj.1 - pi.1) + pi.0;
        if crosses {
            inside = !inside;
        }
    }

    if inside {
        Containment::Inside
    } else {
        Containment::Outside
    }
}

/// True if `p` lies on segment `ab`, excluding both endpoints.
pub fn on_segment(a: Point, b: Point, p: Point) -> bool {
    // vertical
    if almost_equal(a.0, b.0) && almost_equal(p.0, a.0) {
        return !almost_equal(p.1, b.1)
            && !almost_equal(p.1, a.1)
            && p.1 < a.1.max(b.1)
            && p.1 > a.1.min(b.1);
    }

    // horizontal
    if almost_equal(a.1, b.1) && almost_equal(p.1, a.1) {
        return !almost_equal(p.0, b.0)
            && !almost_equal(p.0, a.0)
            && p.0 < a.0.max(b.0)
            && p.0 > a.0.min(b.0);
    }

    if (p.0 < a.0 && p.0 < b.0)
        || (p.0 > a.0 && p.0 > b.0)
        || (p.1 < a.1 && p.1 < b.1)
        || (p.1 > a.1 && p.1 > b.1)
    {
        return false;
    }

    if points_equal(p, a) || points_equal(p, b) {
        return false;
    }

    let cross = (p.1 - a.1) * (b.0 - a.0) - (p.0 - a.0) * (b.1 - a.1);
    if cross.abs() > TOL {
        return false;
    }

    let dot = (p.0 - a.0) * (b.0 - a.0) + (p.1 - a.1) * (b.1 - a.1);
    if dot < 0.0 || almost_equal(dot, 0.0) {
        return false;
    }

    let len2 = (b.0 - a.0) * (b.0 - a.0) + (b.1 - a.1) * (b.1 - a.1);
    !(dot > len2 || almost_equal(dot, len2))
}

/// Intersection of lines `ab` and `ef`.
///
/// With `infinite` unset both are treated as segments. Parallel lines and
/// numerical blow-ups yield `None`.
pub fn line_intersect(a: Point, b: Point, e: Point, f: Point, infinite: bool) -> Option<Point> {
    let a1 = b.1 - a.1;
    let b1 = a.0 - b.0;
    let c1 = b.0 * a.1 - a.0 * b.1;
    let a2 = f.1 - e.1;
    let b2 = e.0 - f.0;
    let c2 = f.0 * e.1 - e.0 * f.1;

    let denom = a1 * b2 - a2 * b1;
    let x = (b1 * c2 - b2 * c1) / denom;
    let y = (a2 * c1 - a1 * c2) / denom;

    if !x.is_finite() || !y.is_finite() {
        return None;
    }

    if !infinite
        && (outside_span(x, a.0, b.0)
            || outside_span(y, a.1, b.1)
            || outside_span(x, e.0, f.0)
            || outside_span(y, e.1, f.1))
    {
        return None;
    }

    Some((x, y))
}

/// Coincident endpoints of a span do not constrain it.
fn outside_span(v: f64, s: f64, t: f64) -> bool {
    if (s - t).abs() <= TOL {
        return false;
    }
    if s < t {
        v < s || v > t
    } else {
        v > s || v < t
    }
}

/// True if the boundaries of `a` and `b` (each translated by its offset) cross.
///
/// Touching is not crossing: where a vertex lies on the other ring, the
/// neighbouring vertices decide whether the boundaries pass through each other.
pub fn intersect(a: &[Point], a_offset: Point, b: &[Point], b_offset: Point) -> bool {
    let ca = closed_ring(a);
    let cb = closed_ring(b);
    let na = ca.len();
    let nb = cb.len();
    if na < 3 || nb < 3 {
        return false;
    }

    for i in 0..na - 1 {
        for j in 0..nb - 1 {
            let a1 = shift(ca[i], a_offset);
            let a2 = shift(ca[i + 1], a_offset);
            let b1 = shift(cb[j], b_offset);
            let b2 = shift(cb[j + 1], b_offset);

            let mut prev_b = if j == 0 { nb - 1 } else { j - 1 };
            let mut prev_a = if i == 0 { na - 1 } else { i - 1 };
            let mut next_b = if j + 1 == nb - 1 { 0 } else { j + 2 };
            let mut next_a = if i + 1 == na - 1 { 0 } else { i + 2 };

            // step past the duplicated closing point
            if points_equal(cb[prev_b], cb[j]) {
                prev_b = if prev_b == 0 { nb - 1 } else { prev_b - 1 };
            }
            if points_equal(ca[prev_a], ca[i]) {
                prev_a = if prev_a == 0 { na - 1 } else { prev_a - 1 };
            }
            if points_equal(cb[next_b], cb[j + 1]) {
                next_b = if next_b == nb - 1 { 0 } else { next_b + 1 };
            }
            if points_equal(ca[next_a], ca[i + 1]) {
                next_a = if next_a == na - 1 { 0 } else { next_a + 1 };
            }

            let a0 = shift(ca[prev_a], a_offset);
            let b0 = shift(cb[prev_b], b_offset);
            let a3 = shift(ca[next_a], a_offset);
            let b3 = shift(cb[next_b], b_offset);

            if on_segment(a1, a2, b1) || points_equal(a1, b1) {
                let b0_in = point_in_polygon_at(b0, a, a_offset);
                let b2_in = point_in_polygon_at(b2, a, a_offset);
                if b0_in.differs_from(b2_in) {
                    return true;
                }
                continue;
            }

            if on_segment(a1, a2, b2) || points_equal(a2, b2) {
                let b1_in = point_in_polygon_at(b1, a, a_offset);
                let b3_in = point_in_polygon_at(b3, a, a_offset);
                if b1_in.differs_from(b3_in) {
                    return true;
                }
                continue;
            }

            if on_segment(b1, b2, a1) || points_equal(a1, b2) {
                let a0_in = point_in_polygon_at(a0, b, b_offset);
                let a2_in = point_in_polygon_at(a2, b, b_offset);
                if a0_in.differs_from(a2_in) {
                    return true;
                }
                continue;
            }

            if on_segment(b1, b2, a2) || points_equal(a2, b1) {
                let a1_in = point_in_polygon_at(a1, b, b_offset);
                let a3_in = point_in_polygon_at(a3, b, b_offset);
                if a1_in.differs_from(a3_in) {
                    return true;
                }
                continue;
            }

            if line_intersect(b1, b2, a1, a2, false).is_some() {
                return true;
            }
        }
    }

    false
}

/// Rotates a ring about the origin by `degrees`.
pub fn rotate_polygon(polygon: &[Point], degrees: f64) -> Vec<Point> {
    let (sin, cos) = degrees.to_radians().sin_cos();
    polygon
        .iter()
        .map(|&(x, y)| (x * cos - y * sin, x * sin + y * cos))
        .collect()
}

/// Translates a ring.
pub fn translate_polygon(polygon: &[Point], dx: f64, dy: f64) -> Vec<Point> {
    polygon.iter().map(|&(x, y)| (x + dx, y + dy)).collect()
}

/// True if every vertex lies on the ring's own bounding box within `tolerance`.
pub fn is_rectangle(polygon: &[Point], tolerance: f64) -> bool {
    let Some(bb) = polygon_bounds(polygon) else {
        return false;
    };

    polygon.iter().all(|&(x, y)| {
        (almost_equal_tol(x, bb.x, tolerance) || almost_equal_tol(x, bb.max_x(), tolerance))
            && (almost_equal_tol(y, bb.y, tolerance) || almost_equal_tol(y, bb.max_y(), tolerance))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect(w: f64, h: f64) -> Vec<Point> {
        vec![(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)]
    }

    #[test]
    fn test_area_sign_encodes_winding() {
        let ccw = rect(10.0, 5.0);
        let mut cw = ccw.clone();
        cw.reverse();

        assert_relative_eq!(polygon_area(&ccw), 50.0, epsilon = 1e-10);
        assert_relative_eq!(polygon_area(&cw), -50.0, epsilon = 1e-10);

        make_ccw(&mut cw);
        assert!(polygon_area(&cw) > 0.0);
        make_cw(&mut cw);
        assert!(polygon_area(&cw) < 0.0);
    }

    #[test]
    fn test_point_in_polygon_tri_state() {
        let square = rect(10.0, 10.0);

        assert_eq!(point_in_polygon((5.0, 5.0), &square), Containment::Inside);
        assert_eq!(point_in_polygon((15.0, 5.0), &square), Containment::Outside);
        assert_eq!(point_in_polygon((10.0, 10.0), &square), Containment::Indeterminate);
        assert_eq!(point_in_polygon((5.0, 0.0), &square), Containment::Indeterminate);
        assert_eq!(
            point_in_polygon((5.0, 5.0), &square[..2]),
            Containment::Indeterminate
        );
    }

    #[test]
    fn test_point_in_polygon_with_offset() {
        let square = rect(2.0, 2.0);
        assert_eq!(
            point_in_polygon_at((11.0, 11.0), &square, (10.0, 10.0)),
            Containment::Inside
        );
        assert_eq!(
            point_in_polygon_at((1.0, 1.0), &square, (10.0, 10.0)),
            Containment::Outside
        );
    }

    #[test]
    fn test_on_segment_excludes_endpoints() {
        assert!(on_segment((0.0, 0.0), (10.0, 0.0), (5.0, 0.0)));
        assert!(on_segment((0.0, 0.0), (0.0, 10.0), (0.0, 3.0)));
        assert!(on_segment((0.0, 0.0), (10.0, 10.0), (4.0, 4.0)));
        assert!(!on_segment((0.0, 0.0), (10.0, 0.0), (0.0, 0.0)));
        assert!(!on_segment((0.0, 0.0), (10.0, 0.0), (10.0, 0.0)));
        assert!(!on_segment((0.0, 0.0), (10.0, 10.0), (4.0, 5.0)));
        assert!(!on_segment((0.0, 0.0), (10.0, 0.0), (11.0, 0.0)));
    }

    #[test]
    fn test_line_intersect() {
        let p = line_intersect((0.0, 0.0), (10.0, 10.0), (0.0, 10.0), (10.0, 0.0), false).unwrap();
        assert_relative_eq!(p.0, 5.0, epsilon = 1e-10);
        assert_relative_eq!(p.1, 5.0, epsilon = 1e-10);

        assert!(line_intersect((0.0, 0.0), (1.0, 1.0), (0.0, 10.0), (10.0, 0.0), false).is_none());
        assert!(line_intersect((0.0, 0.0), (1.0, 1.0), (0.0, 10.0), (10.0, 0.0), true).is_some());
        assert!(line_intersect((0.0, 0.0), (10.0, 0.0), (0.0, 1.0), (10.0, 1.0), true).is_none());
    }

    #[test]
    fn test_intersect_overlap_vs_touch() {
        let a = rect(10.0, 10.0);
        let b = rect(4.0, 4.0);

        assert!(intersect(&a, (0.0, 0.0), &b, (8.0, 3.0)));
        // edge contact only
        assert!(!intersect(&a, (0.0, 0.0), &b, (10.0, 3.0)));
        // fully inside, no boundary crossing
        assert!(!intersect(&a, (0.0, 0.0), &b, (3.0, 3.0)));
        // apart
        assert!(!intersect(&a, (0.0, 0.0), &b, (20.0, 20.0)));
    }

    #[test]
    fn test_rotate_round_trip() {
        let poly = vec![(0.0, 0.0), (7.0, 1.0), (3.0, 5.0), (-2.0, 4.0)];
        for angle in [0.0, 33.0, 90.0, 180.0, 271.5] {
            let back = rotate_polygon(&rotate_polygon(&poly, angle), -angle);
            for (p, q) in poly.iter().zip(back.iter()) {
                assert_relative_eq!(p.0, q.0, epsilon = 1e-9);
                assert_relative_eq!(p.1, q.1, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_is_rectangle() {
        assert!(is_rectangle(&rect(10.0, 5.0), 0.001));
        assert!(is_rectangle(&rotate_polygon(&rect(10.0, 5.0), 90.0), 0.001));
        assert!(!is_rectangle(&rotate_polygon(&rect(10.0, 5.0), 45.0), 0.001));
        assert!(!is_rectangle(&[(0.0, 0.0), (10.0, 0.0), (5.0, 5.0)], 0.001));
    }

    #[test]
    fn test_bounds() {
        let bounds = polygon_bounds(&[(1.0, 2.0), (5.0, -1.0), (3.0, 7.0)]).unwrap();
        assert_eq!(bounds.x, 1.0);
        assert_eq!(bounds.y, -1.0);
        assert_eq!(bounds.width, 4.0);
        assert_eq!(bounds.height, 8.0);
        assert!(polygon_bounds(&[(0.0, 0.0), (1.0, 1.0)]).is_none());
    }

    #[test]
    fn test_polygon_rotated_carries_holes() {
        let part = Polygon::new(3, rect(10.0, 10.0)).with_holes(vec![rect(2.0, 2.0)]);
        let rotated = part.rotated(90.0);
        assert_eq!(rotated.id, 3);
        assert_eq!(rotated.holes.len(), 1);
        assert_relative_eq!(rotated.holes[0][1].0, 0.0, epsilon = 1e-9);
        assert_relative_eq!(rotated.holes[0][1].1, 2.0, epsilon = 1e-9);
        assert_relative_eq!(rotated.area(), 100.0, epsilon = 1e-9);
    }
}
