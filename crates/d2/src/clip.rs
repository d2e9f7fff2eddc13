//! Boolean operations, cleaning and offsetting over `i_overlay`.
//!
//! Every ring is snapped onto the fixed-point grid of [`FixedScale`] before it
//! reaches the overlay engine. Thresholds passed in here are in real units.

use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use orbinest_core::robust::FixedScale;
use std::f64::consts::PI;

use crate::geometry::{make_ccw, points_equal, polygon_area, Point};

type Contour = Vec<[f64; 2]>;

fn to_contours(rings: &[Vec<Point>], grid: &FixedScale) -> Vec<Contour> {
    rings
        .iter()
        .filter(|ring| ring.len() >= 3)
        .map(|ring| {
            grid.snap_ring(ring)
                .into_iter()
                .map(|(x, y)| [x, y])
                .collect()
        })
        .collect()
}

fn from_shapes(shapes: Vec<Vec<Contour>>) -> Vec<Vec<Point>> {
    shapes
        .into_iter()
        .flatten()
        .filter(|contour| contour.len() >= 3)
        .map(|contour| contour.into_iter().map(|[x, y]| (x, y)).collect())
        .collect()
}

/// NonZero union of all rings. Holes come back as separate rings.
pub fn union(rings: &[Vec<Point>], grid: &FixedScale) -> Vec<Vec<Point>> {
    let subject = to_contours(rings, grid);
    if subject.is_empty() {
        return Vec::new();
    }
    let clip: Vec<Contour> = Vec::new();
    from_shapes(subject.overlay(&clip, OverlayRule::Union, FillRule::NonZero))
}

/// NonZero difference `subject - clip`.
pub fn difference(
    subject: &[Vec<Point>],
    clip: &[Vec<Point>],
    grid: &FixedScale,
) -> Vec<Vec<Point>> {
    let subject = to_contours(subject, grid);
    if subject.is_empty() {
        return Vec::new();
    }
    let clip = to_contours(clip, grid);
    from_shapes(subject.overlay(&clip, OverlayRule::Difference, FillRule::NonZero))
}

/// Removes self-intersections and keeps the largest remaining ring.
pub fn simplify(ring: &[Point], grid: &FixedScale) -> Option<Vec<Point>> {
    largest_ring(union(&[ring.to_vec()], grid))
}

/// The ring of largest absolute area, if any.
pub fn largest_ring(rings: Vec<Vec<Point>>) -> Option<Vec<Point>> {
    rings.into_iter().max_by(|a, b| {
        polygon_area(a)
            .abs()
            .total_cmp(&polygon_area(b).abs())
    })
}

/// [`simplify`] followed by [`clean_ring`]; `None` if nothing usable is left.
///
/// The returned ring is counter-clockwise.
pub fn clean_polygon(ring: &[Point], tolerance: f64, grid: &FixedScale) -> Option<Vec<Point>> {
    let simple = simplify(ring, grid)?;
    let mut clean = clean_ring(&simple, tolerance);
    if clean.is_empty() {
        return None;
    }
    make_ccw(&mut clean);
    Some(clean)
}

/// Drops vertices closer than `distance` to a neighbour, spikes, and vertices
/// within `distance` of the line through their neighbours.
///
/// Returns an empty ring when fewer than three vertices survive.
pub fn clean_ring(ring: &[Point], distance: f64) -> Vec<Point> {
    let d2 = distance * distance;
    let mut pts: Vec<Point> = ring.to_vec();
    if pts.len() > 1 && points_equal(pts[0], pts[pts.len() - 1]) {
        pts.pop();
    }

    let mut changed = true;
    while changed && pts.len() >= 3 {
        changed = false;
        let mut i = 0;
        while i < pts.len() && pts.len() >= 3 {
            let n = pts.len();
            let prev = pts[(i + n - 1) % n];
            let cur = pts[i];
            let next = pts[(i + 1) % n];

            if dist2(prev, cur) <= d2 {
                pts.remove(i);
                changed = true;
            } else if dist2(cur, next) <= d2 {
                pts.remove((i + 1) % n);
                if (i + 1) % n < i {
                    i -= 1;
                }
                changed = true;
            } else if dist2(prev, next) <= d2 {
                // spike: drop the tip and the point that doubles back
                let next_index = (i + 1) % n;
                if next_index > i {
                    pts.remove(next_index);
                    pts.remove(i);
                } else {
                    pts.remove(i);
                    pts.remove(next_index);
                    i = i.saturating_sub(1);
                }
                changed = true;
            } else if near_collinear(prev, cur, next, d2) {
                pts.remove(i);
                changed = true;
            } else {
                i += 1;
            }
        }
    }

    if pts.len() < 3 {
        return Vec::new();
    }
    pts
}

fn dist2(a: Point, b: Point) -> f64 {
    (a.0 - b.0) * (a.0 - b.0) + (a.1 - b.1) * (a.1 - b.1)
}

/// Squared distance from `p` to the line through `a` and `b`.
fn line_dist2(p: Point, a: Point, b: Point) -> f64 {
    let len2 = dist2(a, b);
    if len2 == 0.0 {
        return dist2(p, a);
    }
    let cross = (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0);
    cross * cross / len2
}

fn near_collinear(prev: Point, cur: Point, next: Point, d2: f64) -> bool {
    line_dist2(cur, prev, next) < d2
}

/// Offsets a ring by `delta` (positive grows, negative shrinks) with round joins.
///
/// The ring is unioned with (or cut by) a buffer made of one rectangle per
/// edge, reaching `|delta|` to both sides, and one disc per vertex. Discs are
/// polygons circumscribing the true circle, so a grown ring always contains
/// the exact offset and a shrunk ring always lies within it.
/// `arc_tolerance` bounds how far the disc corners stick out.
pub fn offset(
    ring: &[Point],
    delta: f64,
    arc_tolerance: f64,
    grid: &FixedScale,
) -> Vec<Vec<Point>> {
    if ring.len() < 3 || delta.abs() < crate::geometry::TOL {
        return vec![ring.to_vec()];
    }

    let mut ring = ring.to_vec();
    make_ccw(&mut ring);

    let radius = delta.abs();
    let steps = arc_steps(radius, arc_tolerance);
    let n = ring.len();

    let mut buffer: Vec<Vec<Point>> = Vec::with_capacity(2 * n);
    for i in 0..n {
        if let Some(band) = edge_band(ring[i], ring[(i + 1) % n], radius) {
            buffer.push(band);
        }
        buffer.push(disc(ring[i], radius, steps));
    }

    if delta > 0.0 {
        buffer.push(ring);
        union(&buffer, grid)
    } else {
        difference(&[ring], &buffer, grid)
    }
}

/// Vertices per full circle for the given radius and arc tolerance, rounded
/// up to a multiple of four so the disc has a flat side facing each axis.
fn arc_steps(radius: f64, arc_tolerance: f64) -> usize {
    let tolerance = if arc_tolerance <= 0.0 {
        0.25
    } else {
        arc_tolerance.min(radius * 0.25)
    };
    let steps = PI / (1.0 - tolerance / radius).acos();
    let steps = if steps.is_finite() {
        (steps.ceil() as usize).clamp(4, 1024)
    } else {
        4
    };
    steps.div_ceil(4) * 4
}

/// Counter-clockwise rectangle covering every point within `radius` of the
/// segment `a`-`b`, caps excluded. `None` for a zero-length edge.
fn edge_band(a: Point, b: Point, radius: f64) -> Option<Vec<Point>> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len = dx.hypot(dy);
    if len < crate::geometry::TOL {
        return None;
    }
    let (nx, ny) = (-dy / len * radius, dx / len * radius);
    Some(vec![
        (a.0 - nx, a.1 - ny),
        (b.0 - nx, b.1 - ny),
        (b.0 + nx, b.1 + ny),
        (a.0 + nx, a.1 + ny),
    ])
}

/// Regular `steps`-gon whose inscribed circle has the given radius.
fn disc(center: Point, radius: f64, steps: usize) -> Vec<Point> {
    let half = PI / steps as f64;
    let outer = radius / half.cos();
    (0..steps)
        .map(|k| {
            let angle = half * (2 * k + 1) as f64;
            (center.0 + outer * angle.cos(), center.1 + outer * angle.sin())
        })
        .collect()
}
