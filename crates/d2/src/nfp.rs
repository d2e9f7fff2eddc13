//! No-Fit Polygon (NFP) computation by orbiting.
//!
//! The NFP of a stationary polygon A and a moving polygon B is the path traced
//! by B's reference point (its first vertex) while B slides around A, always
//! touching and never overlapping it. With `inside` set, B slides along the
//! inside of A instead, which yields the region where B fits within A.
//!
//! Each step finds every touching vertex/edge pair, derives candidate
//! translation vectors from the edges meeting there, and takes the vector
//! that can slide the farthest before a new collision. The loop closes when
//! the reference point returns to a point already on the ring.

use crate::geometry::{
    almost_equal, closed_ring, intersect, on_segment, point_in_polygon, points_equal, shift,
    Point, TOL,
};

/// Multiple of `|A| + |B|` after which an orbit is abandoned.
const ORBIT_CAP_FACTOR: usize = 10;

/// Unit-vector cross product below which a step back along the previous
/// translation is considered a reversal.
const REVERSAL_TOLERANCE: f64 = 1e-4;

// ============================================================================
// Contacts and translation vectors
// ============================================================================

/// How the two polygons touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContactType {
    /// A vertex of A coincides with a vertex of B.
    Vertex,
    /// A vertex of B lies on an edge of A.
    BOnEdgeOfA,
    /// A vertex of A lies on an edge of B.
    AOnEdgeOfB,
}

#[derive(Debug, Clone, Copy)]
struct Contact {
    kind: ContactType,
    a: usize,
    b: usize,
}

/// A candidate slide. `start`/`end` are the A vertices it runs between, if any.
#[derive(Debug, Clone, Copy)]
struct TranslationVector {
    x: f64,
    y: f64,
    start: Option<usize>,
    end: Option<usize>,
}

impl TranslationVector {
    fn new(v: Point, start: Option<usize>, end: Option<usize>) -> Self {
        Self {
            x: v.0,
            y: v.1,
            start,
            end,
        }
    }

    fn length_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }
}

#[inline]
fn dot(a: Point, b: Point) -> f64 {
    a.0 * b.0 + a.1 * b.1
}

#[inline]
fn sub(a: Point, b: Point) -> Point {
    (a.0 - b.0, a.1 - b.1)
}

/// Unit vector; inputs already of unit length are returned unchanged.
fn normalize(v: Point) -> Point {
    let len2 = v.0 * v.0 + v.1 * v.1;
    if almost_equal(len2, 1.0) {
        return v;
    }
    let inv = 1.0 / len2.sqrt();
    (v.0 * inv, v.1 * inv)
}

fn find_contacts(a: &[Point], b: &[Point], offset: Point) -> Vec<Contact> {
    let na = a.len();
    let nb = b.len();
    let mut contacts = Vec::new();

    for i in 0..na {
        let next_i = (i + 1) % na;
        for j in 0..nb {
            let next_j = (j + 1) % nb;
            let bj = shift(b[j], offset);

            if points_equal(a[i], bj) {
                contacts.push(Contact {
                    kind: ContactType::Vertex,
                    a: i,
                    b: j,
                });
            } else if on_segment(a[i], a[next_i], bj) {
                contacts.push(Contact {
                    kind: ContactType::BOnEdgeOfA,
                    a: next_i,
                    b: j,
                });
            } else if on_segment(bj, shift(b[next_j], offset), a[i]) {
                contacts.push(Contact {
                    kind: ContactType::AOnEdgeOfB,
                    a: i,
                    b: next_j,
                });
            }
        }
    }

    contacts
}

/// Translation vectors for every contact. Touched A vertices are marked.
fn translation_vectors(
    a: &[Point],
    b: &[Point],
    offset: Point,
    contacts: &[Contact],
    marks: &mut [bool],
) -> Vec<TranslationVector> {
    let na = a.len();
    let nb = b.len();
    let mut vectors = Vec::with_capacity(contacts.len() * 4);

    for contact in contacts {
        marks[contact.a] = true;

        let prev_a_index = (contact.a + na - 1) % na;
        let next_a_index = (contact.a + 1) % na;
        let vertex_a = a[contact.a];
        let prev_a = a[prev_a_index];
        let next_a = a[next_a_index];

        let vertex_b = b[contact.b];
        let prev_b = b[(contact.b + nb - 1) % nb];
        let next_b = b[(contact.b + 1) % nb];

        match contact.kind {
            ContactType::Vertex => {
                vectors.push(TranslationVector::new(
                    sub(prev_a, vertex_a),
                    Some(contact.a),
                    Some(prev_a_index),
                ));
                vectors.push(TranslationVector::new(
                    sub(next_a, vertex_a),
                    Some(contact.a),
                    Some(next_a_index),
                ));
                // B moves opposite to its own edges
                vectors.push(TranslationVector::new(sub(vertex_b, prev_b), None, None));
                vectors.push(TranslationVector::new(sub(vertex_b, next_b), None, None));
            }
            ContactType::BOnEdgeOfA => {
                let touching = shift(vertex_b, offset);
                vectors.push(TranslationVector::new(
                    sub(vertex_a, touching),
                    Some(prev_a_index),
                    Some(contact.a),
                ));
                vectors.push(TranslationVector::new(
                    sub(prev_a, touching),
                    Some(contact.a),
                    Some(prev_a_index),
                ));
            }
            ContactType::AOnEdgeOfB => {
                vectors.push(TranslationVector::new(
                    sub(vertex_a, shift(vertex_b, offset)),
                    None,
                    None,
                ));
                vectors.push(TranslationVector::new(
                    sub(vertex_a, shift(prev_b, offset)),
                    None,
                    None,
                ));
            }
        }
    }

    vectors
}

// ============================================================================
// Distances
// ============================================================================

/// Distance `p` must travel along `normal` to reach the line through `s1 s2`.
///
/// Without `infinite`, `None` is returned when `p` does not project strictly
/// inside the segment.
fn point_distance(p: Point, s1: Point, s2: Point, normal: Point, infinite: bool) -> Option<f64> {
    let normal = normalize(normal);
    let dir = (normal.1, -normal.0);

    let pdot = dot(p, dir);
    let s1dot = dot(s1, dir);
    let s2dot = dot(s2, dir);

    let pdotnorm = dot(p, normal);
    let s1dotnorm = dot(s1, normal);
    let s2dotnorm = dot(s2, normal);

    if !infinite {
        let le = |x: f64, y: f64| x < y || almost_equal(x, y);
        let ge = |x: f64, y: f64| x > y || almost_equal(x, y);
        if (le(pdot, s1dot) && le(pdot, s2dot)) || (ge(pdot, s1dot) && ge(pdot, s2dot)) {
            return None;
        }
    }

    Some(-(pdotnorm - s1dotnorm + (s1dotnorm - s2dotnorm) * (s1dot - pdot) / (s1dot - s2dot)))
}

/// How far segment `ef` can move along `direction` before hitting segment `ab`.
///
/// `None` means the segments never meet or merely graze at a single point.
fn segment_distance(a: Point, b: Point, e: Point, f: Point, direction: Point) -> Option<f64> {
    let normal = (direction.1, -direction.0);
    let reverse = (-direction.0, -direction.1);

    let dot_a = dot(a, normal);
    let dot_b = dot(b, normal);
    let dot_e = dot(e, normal);
    let dot_f = dot(f, normal);

    let cross_a = dot(a, direction);
    let cross_b = dot(b, direction);
    let cross_e = dot(e, direction);
    let cross_f = dot(f, direction);

    let ab_min = dot_a.min(dot_b);
    let ab_max = dot_a.max(dot_b);
    let ef_max = dot_e.max(dot_f);
    let ef_min = dot_e.min(dot_f);

    // touch at one point
    if almost_equal(ab_max, ef_min) || almost_equal(ab_min, ef_max) {
        return None;
    }
    // miss
    if ab_max < ef_min || ab_min > ef_max {
        return None;
    }

    let overlap = if (ab_max > ef_max && ab_min < ef_min) || (ef_max > ab_max && ef_min < ab_min) {
        1.0
    } else {
        let min_max = ab_max.min(ef_max);
        let max_min = ab_min.max(ef_min);
        let max_max = ab_max.max(ef_max);
        let min_min = ab_min.min(ef_min);
        (min_max - max_min) / (max_max - min_min)
    };

    let cross_abe = (e.1 - a.1) * (b.0 - a.0) - (e.0 - a.0) * (b.1 - a.1);
    let cross_abf = (f.1 - a.1) * (b.0 - a.0) - (f.0 - a.0) * (b.1 - a.1);

    if almost_equal(cross_abe, 0.0) && almost_equal(cross_abf, 0.0) {
        // collinear: only facing edges pushed into each other block the move
        let ab_norm = normalize((b.1 - a.1, a.0 - b.0));
        let ef_norm = normalize((f.1 - e.1, e.0 - f.0));

        if (ab_norm.1 * ef_norm.0 - ab_norm.0 * ef_norm.1).abs() < TOL
            && ab_norm.1 * ef_norm.1 + ab_norm.0 * ef_norm.0 < 0.0
        {
            let norm_dot = ab_norm.1 * direction.1 + ab_norm.0 * direction.0;
            if almost_equal(norm_dot, 0.0) {
                return None;
            }
            if norm_dot < 0.0 {
                return Some(0.0);
            }
        }
        return None;
    }

    let mut distances = Vec::with_capacity(4);

    // A touching EF while AB moves away does not count.
    let moving_away = |d: Option<f64>, other: Option<f64>| -> Option<f64> {
        match d {
            Some(d) if almost_equal(d, 0.0) => match other {
                Some(o) if o < 0.0 || almost_equal(o * overlap, 0.0) => None,
                _ => Some(d),
            },
            other_d => other_d,
        }
    };

    if almost_equal(dot_a, dot_e) {
        distances.push(cross_a - cross_e);
    } else if almost_equal(dot_a, dot_f) {
        distances.push(cross_a - cross_f);
    } else if dot_a > ef_min && dot_a < ef_max {
        let d = point_distance(a, e, f, reverse, false);
        let d = if d.is_some_and(|d| almost_equal(d, 0.0)) {
            moving_away(d, point_distance(b, e, f, reverse, true))
        } else {
            d
        };
        distances.extend(d);
    }

    if almost_equal(dot_b, dot_e) {
        distances.push(cross_b - cross_e);
    } else if almost_equal(dot_b, dot_f) {
        distances.push(cross_b - cross_f);
    } else if dot_b > ef_min && dot_b < ef_max {
        let d = point_distance(b, e, f, reverse, false);
        let d = if d.is_some_and(|d| almost_equal(d, 0.0)) {
            moving_away(d, point_distance(a, e, f, reverse, true))
        } else {
            d
        };
        distances.extend(d);
    }

    if dot_e > ab_min && dot_e < ab_max {
        let d = point_distance(e, a, b, direction, false);
        let d = if d.is_some_and(|d| almost_equal(d, 0.0)) {
            moving_away(d, point_distance(f, a, b, direction, true))
        } else {
            d
        };
        distances.extend(d);
    }

    if dot_f > ab_min && dot_f < ab_max {
        let d = point_distance(f, a, b, direction, false);
        let d = if d.is_some_and(|d| almost_equal(d, 0.0)) {
            moving_away(d, point_distance(e, a, b, direction, true))
        } else {
            d
        };
        distances.extend(d);
    }

    distances.into_iter().reduce(f64::min)
}

/// Largest distance B (at `b_offset`) can slide along `direction` before
/// colliding with A (at `a_offset`).
///
/// With `ignore_negative`, only forward (non-negative) distances count.
pub fn polygon_slide_distance(
    a: &[Point],
    a_offset: Point,
    b: &[Point],
    b_offset: Point,
    direction: Point,
    ignore_negative: bool,
) -> Option<f64> {
    let ca = closed_ring(a);
    let cb = closed_ring(b);
    let dir = normalize(direction);

    let mut distance: Option<f64> = None;

    for i in 0..cb.len().saturating_sub(1) {
        let b1 = shift(cb[i], b_offset);
        let b2 = shift(cb[i + 1], b_offset);
        if points_equal(b1, b2) {
            continue;
        }

        for j in 0..ca.len().saturating_sub(1) {
            let a1 = shift(ca[j], a_offset);
            let a2 = shift(ca[j + 1], a_offset);
            if points_equal(a1, a2) {
                continue;
            }

            if let Some(d) = segment_distance(a1, a2, b1, b2, dir) {
                let shorter = distance.map_or(true, |current| d < current);
                if shorter && (!ignore_negative || d > 0.0 || almost_equal(d, 0.0)) {
                    distance = Some(d);
                }
            }
        }
    }

    distance
}

/// Projects every vertex of B onto A along `direction` and returns the
/// largest of the per-vertex minimum projections.
pub fn polygon_projection_distance(
    a: &[Point],
    a_offset: Point,
    b: &[Point],
    b_offset: Point,
    direction: Point,
) -> Option<f64> {
    let ca = closed_ring(a);
    let cb = closed_ring(b);

    let mut distance: Option<f64> = None;

    for &vertex in &cb {
        let p = shift(vertex, b_offset);
        let mut min_projection: Option<f64> = None;

        for j in 0..ca.len().saturating_sub(1) {
            let s1 = shift(ca[j], a_offset);
            let s2 = shift(ca[j + 1], a_offset);

            // edges parallel to the direction never stop the projection
            if ((s2.1 - s1.1) * direction.0 - (s2.0 - s1.0) * direction.1).abs() < TOL {
                continue;
            }

            if let Some(d) = point_distance(p, s1, s2, direction, false) {
                if min_projection.map_or(true, |m| d < m) {
                    min_projection = Some(d);
                }
            }
        }

        if let Some(m) = min_projection {
            if distance.map_or(true, |d| m > d) {
                distance = Some(m);
            }
        }
    }

    distance
}

// ============================================================================
// Start points
// ============================================================================

/// Containment of B (at `offset`) in A, decided by its first vertex that is
/// not on A's boundary. `None` if every vertex is on the boundary.
fn b_inside_a(a: &[Point], b: &[Point], offset: Point) -> Option<bool> {
    b.iter()
        .find_map(|&p| point_in_polygon(shift(p, offset), a).as_option())
}

fn in_nfp(p: Point, nfp: &[Vec<Point>]) -> bool {
    nfp.iter().flatten().any(|&q| points_equal(p, q))
}

/// Finds an offset for B that touches A without crossing it, on the requested
/// side, and that is not a point of any loop already traced.
///
/// Tries each unmarked vertex of A in turn (marking it), aligning each vertex
/// of B to it and, failing that, sliding B along the following edge of A.
pub fn search_start_point(
    a: &[Point],
    b: &[Point],
    inside: bool,
    marks: &mut [bool],
    nfp: &[Vec<Point>],
) -> Option<Point> {
    let ca = closed_ring(a);
    let cb = closed_ring(b);
    let origin = (0.0, 0.0);

    let accept = |b_inside: bool, offset: Point| {
        b_inside == inside && !intersect(a, origin, b, offset) && !in_nfp(offset, nfp)
    };

    for i in 0..ca.len().saturating_sub(1) {
        if marks.get(i).copied().unwrap_or(true) {
            continue;
        }
        marks[i] = true;

        for &bj in &cb {
            let mut offset = sub(ca[i], bj);

            // A and B coincide
            let mut b_inside = b_inside_a(a, b, offset)?;

            if accept(b_inside, offset) {
                return Some(offset);
            }

            // slide B along the edge
            let mut v = sub(ca[i + 1], ca[i]);
            let d1 = polygon_projection_distance(a, origin, b, offset, v);
            let d2 = polygon_projection_distance(b, offset, a, origin, (-v.0, -v.1));

            let d = match (d1, d2) {
                (Some(x), Some(y)) => x.min(y),
                (Some(x), None) | (None, Some(x)) => x,
                (None, None) => continue,
            };

            // only slide while the overlap is positive
            if d <= 0.0 || almost_equal(d, 0.0) {
                continue;
            }

            let vd2 = v.0 * v.0 + v.1 * v.1;
            if d * d < vd2 && !almost_equal(d * d, vd2) {
                let vd = vd2.sqrt();
                v = (v.0 * d / vd, v.1 * d / vd);
            }

            offset = shift(offset, v);

            if let Some(now) = b_inside_a(a, b, offset) {
                b_inside = now;
            }
            if accept(b_inside, offset) {
                return Some(offset);
            }
        }
    }

    None
}

// ============================================================================
// NFP
// ============================================================================

/// Orbits B around (or, with `inside`, within) A.
///
/// Returns the traced loops, or `None` if no loop could be closed. Without
/// `search_edges` at most one loop is traced; with it, new start points are
/// searched until none remain, which finds the extra loops concave shapes
/// produce.
pub fn no_fit_polygon(
    a: &[Point],
    b: &[Point],
    inside: bool,
    search_edges: bool,
) -> Option<Vec<Vec<Point>>> {
    if a.len() < 3 || b.len() < 3 {
        return None;
    }

    let mut marks = vec![false; a.len()];

    let mut start = if inside {
        search_start_point(a, b, true, &mut marks, &[])
    } else {
        // B's top vertex on A's bottom vertex cannot overlap
        let mut min_a = 0;
        for (i, p) in a.iter().enumerate().skip(1) {
            if p.1 < a[min_a].1 {
                min_a = i;
            }
        }
        let mut max_b = 0;
        for (i, p) in b.iter().enumerate().skip(1) {
            if p.1 > b[max_b].1 {
                max_b = i;
            }
        }
        Some(sub(a[min_a], b[max_b]))
    };

    let cap = ORBIT_CAP_FACTOR * (a.len() + b.len());
    let mut loops: Vec<Vec<Point>> = Vec::new();

    while let Some(start_offset) = start {
        match orbit(a, b, start_offset, cap, &mut marks) {
            Some(ring) => loops.push(ring),
            None => log::debug!(
                "orbit from ({:.4}, {:.4}) did not close",
                start_offset.0,
                start_offset.1
            ),
        }

        if !search_edges {
            break;
        }

        start = search_start_point(a, b, inside, &mut marks, &loops);
    }

    if loops.is_empty() {
        None
    } else {
        Some(loops)
    }
}

/// Traces one loop starting with B at `offset`.
fn orbit(
    a: &[Point],
    b: &[Point],
    mut offset: Point,
    cap: usize,
    marks: &mut [bool],
) -> Option<Vec<Point>> {
    let origin = (0.0, 0.0);
    let start = shift(b[0], offset);
    let mut reference = start;
    let mut ring = vec![start];
    let mut prev_vector: Option<TranslationVector> = None;

    for _ in 0..cap {
        let contacts = find_contacts(a, b, offset);
        let vectors = translation_vectors(a, b, offset, &contacts, marks);

        let mut translate: Option<TranslationVector> = None;
        let mut max_d = 0.0;

        for v in &vectors {
            if v.x == 0.0 && v.y == 0.0 {
                continue;
            }

            // skip vectors pointing back where we came from
            if let Some(prev) = prev_vector {
                if v.y * prev.y + v.x * prev.x < 0.0 {
                    let unit_v = normalize((v.x, v.y));
                    let unit_prev = normalize((prev.x, prev.y));
                    if (unit_v.1 * unit_prev.0 - unit_v.0 * unit_prev.1).abs() < REVERSAL_TOLERANCE {
                        continue;
                    }
                }
            }

            let length2 = v.length_squared();
            let d = match polygon_slide_distance(a, origin, b, offset, (v.x, v.y), true) {
                Some(d) if d * d <= length2 => d,
                _ => length2.sqrt(),
            };

            if d > max_d {
                max_d = d;
                translate = Some(*v);
            }
        }

        let mut translate = match translate {
            Some(t) if !almost_equal(max_d, 0.0) => t,
            _ => return None,
        };

        for vertex in [translate.start, translate.end].into_iter().flatten() {
            marks[vertex] = true;
        }

        let length2 = translate.length_squared();
        if max_d * max_d < length2 && !almost_equal(max_d * max_d, length2) {
            let scale = (max_d * max_d / length2).sqrt();
            translate.x *= scale;
            translate.y *= scale;
        }
        prev_vector = Some(translate);

        reference = (reference.0 + translate.x, reference.1 + translate.y);

        if points_equal(reference, start) {
            return Some(ring);
        }

        // starting on a shared horizontal edge can close on an earlier point
        if ring[..ring.len() - 1]
            .iter()
            .any(|&p| points_equal(reference, p))
        {
            return Some(ring);
        }

        ring.push(reference);
        offset = (offset.0 + translate.x, offset.1 + translate.y);
    }

    None
}

/// Closed-form inner NFP when A is an axis-aligned rectangle.
///
/// `None` if B is wider or taller than A.
pub fn no_fit_polygon_rectangle(a: &[Point], b: &[Point]) -> Option<Vec<Vec<Point>>> {
    let (&a0, &b0) = (a.first()?, b.first()?);

    let (mut min_ax, mut min_ay, mut max_ax, mut max_ay) = (a0.0, a0.1, a0.0, a0.1);
    for &(x, y) in &a[1..] {
        min_ax = min_ax.min(x);
        min_ay = min_ay.min(y);
        max_ax = max_ax.max(x);
        max_ay = max_ay.max(y);
    }

    let (mut min_bx, mut min_by, mut max_bx, mut max_by) = (b0.0, b0.1, b0.0, b0.1);
    for &(x, y) in &b[1..] {
        min_bx = min_bx.min(x);
        min_by = min_by.min(y);
        max_bx = max_bx.max(x);
        max_by = max_by.max(y);
    }

    if max_bx - min_bx > max_ax - min_ax || max_by - min_by > max_ay - min_ay {
        return None;
    }

    Some(vec![vec![
        (min_ax - min_bx + b0.0, min_ay - min_by + b0.1),
        (max_ax - max_bx + b0.0, min_ay - min_by + b0.1),
        (max_ax - max_bx + b0.0, max_ay - max_by + b0.1),
        (min_ax - min_bx + b0.0, max_ay - max_by + b0.1),
    ]])
}
