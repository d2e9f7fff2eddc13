//! Outer NFP as a Minkowski sum.
//!
//! The region where B's reference point makes B overlap A is `A ⊕ (-B)`
//! shifted by B's first vertex. Both polygons are split into convex pieces
//! by ear clipping, each pair of pieces is summed by merging edge vectors,
//! and the partial sums are unioned.

use orbinest_core::robust::{
    is_convex_robust, orient2d_filtered, point_in_triangle_robust, FixedScale,
};
use std::f64::consts::PI;

use crate::clip;
use crate::geometry::{make_ccw, Point, TOL};

/// Outer NFP of B around A, or `None` if the sum is empty.
///
/// Only the outer boundary is returned. The ring of largest absolute area is
/// the boundary of A ⊕ (-B); any smaller rings are holes inside the sum.
pub fn minkowski_nfp(a: &[Point], b: &[Point], grid: &FixedScale) -> Option<Vec<Vec<Point>>> {
    if a.len() < 3 || b.len() < 3 {
        return None;
    }

    let pieces_a = triangulate(a);
    let reflected: Vec<Point> = b.iter().map(|&(x, y)| (-x, -y)).collect();
    let pieces_b = triangulate(&reflected);

    let mut partial: Vec<Vec<Point>> = Vec::with_capacity(pieces_a.len() * pieces_b.len());
    for piece_a in &pieces_a {
        for piece_b in &pieces_b {
            let sum = convex_sum(piece_a, piece_b);
            if sum.len() >= 3 {
                partial.push(sum);
            }
        }
    }

    let merged = if partial.len() == 1 {
        partial
    } else {
        clip::union(&partial, grid)
    };

    let outer = clip::largest_ring(merged)?;

    let (rx, ry) = b[0];
    Some(vec![outer.into_iter().map(|(x, y)| (x + rx, y + ry)).collect()])
}

/// Minkowski sum of two convex CCW polygons.
fn convex_sum(a: &[Point], b: &[Point]) -> Vec<Point> {
    let edges_a = edge_vectors(a);
    let edges_b = edge_vectors(b);
    let start_a = bottom_left(a);
    let start_b = bottom_left(b);

    let mut current = (a[start_a].0 + b[start_b].0, a[start_a].1 + b[start_b].1);
    let mut result = vec![current];

    for (dx, dy) in merge_edge_vectors(&edges_a, start_a, &edges_b, start_b) {
        current = (current.0 + dx, current.1 + dy);
        result.push(current);
    }

    if result.len() > 1 {
        let first = result[0];
        let last = result[result.len() - 1];
        if (first.0 - last.0).abs() < TOL && (first.1 - last.1).abs() < TOL {
            result.pop();
        }
    }

    result
}

fn edge_vectors(polygon: &[Point]) -> Vec<Point> {
    let n = polygon.len();
    (0..n)
        .map(|i| {
            let j = (i + 1) % n;
            (polygon[j].0 - polygon[i].0, polygon[j].1 - polygon[i].1)
        })
        .collect()
}

/// Index of the bottom-most, then left-most vertex.
fn bottom_left(polygon: &[Point]) -> usize {
    let mut min_idx = 0;
    for (i, &(x, y)) in polygon.iter().enumerate() {
        let (min_x, min_y) = polygon[min_idx];
        if y < min_y || (y == min_y && x < min_x) {
            min_idx = i;
        }
    }
    min_idx
}

/// Edge angle in `[0, 2π)`.
fn edge_angle(dx: f64, dy: f64) -> f64 {
    let angle = dy.atan2(dx);
    if angle < 0.0 {
        angle + 2.0 * PI
    } else {
        angle
    }
}

/// Interleaves both edge sequences by increasing angle.
fn merge_edge_vectors(
    edges_a: &[Point],
    start_a: usize,
    edges_b: &[Point],
    start_b: usize,
) -> Vec<Point> {
    let n_a = edges_a.len();
    let n_b = edges_b.len();
    let mut result = Vec::with_capacity(n_a + n_b);
    let mut i_a = 0;
    let mut i_b = 0;

    while i_a < n_a || i_b < n_b {
        if i_a >= n_a {
            result.push(edges_b[(start_b + i_b) % n_b]);
            i_b += 1;
        } else if i_b >= n_b {
            result.push(edges_a[(start_a + i_a) % n_a]);
            i_a += 1;
        } else {
            let ea = edges_a[(start_a + i_a) % n_a];
            let eb = edges_b[(start_b + i_b) % n_b];
            let angle_a = edge_angle(ea.0, ea.1);
            let angle_b = edge_angle(eb.0, eb.1);

            if angle_a <= angle_b + 1e-10 {
                result.push(ea);
                i_a += 1;
            }
            if angle_b <= angle_a + 1e-10 {
                result.push(eb);
                i_b += 1;
            }
        }
    }

    result
}

/// Splits a simple polygon into convex CCW pieces.
///
/// Convex input is returned whole. Degenerate input that has no ear falls
/// back to its convex hull.
fn triangulate(polygon: &[Point]) -> Vec<Vec<Point>> {
    let mut vertices = polygon.to_vec();
    make_ccw(&mut vertices);

    if is_convex_robust(&vertices) {
        return vec![vertices];
    }

    let mut triangles = Vec::with_capacity(vertices.len().saturating_sub(2));
    while vertices.len() > 3 {
        let n = vertices.len();
        let ear = (0..n).find(|&i| is_ear(&vertices, (i + n - 1) % n, i, (i + 1) % n));

        match ear {
            Some(i) => {
                let prev = vertices[(i + n - 1) % n];
                let next = vertices[(i + 1) % n];
                triangles.push(vec![prev, vertices[i], next]);
                vertices.remove(i);
            }
            None => {
                log::debug!("ear clipping stalled at {} vertices, using hull", n);
                return vec![convex_hull(polygon)];
            }
        }
    }

    if vertices.len() == 3
        && !orient2d_filtered(vertices[0], vertices[1], vertices[2]).is_collinear()
    {
        triangles.push(vertices);
    }

    triangles
}

fn is_ear(vertices: &[Point], prev: usize, curr: usize, next: usize) -> bool {
    let (a, b, c) = (vertices[prev], vertices[curr], vertices[next]);

    if !orient2d_filtered(a, b, c).is_ccw() {
        return false;
    }

    !vertices
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != prev && i != curr && i != next)
        .any(|(_, &p)| point_in_triangle_robust(p, a, b, c))
}

fn convex_hull(points: &[Point]) -> Vec<Point> {
    use geo::{ConvexHull, Coord, LineString};

    let coords: Vec<Coord<f64>> = points.iter().map(|&(x, y)| Coord { x, y }).collect();
    let hull = LineString::from(coords).convex_hull();
    let exterior: Vec<Point> = hull.exterior().coords().map(|c| (c.x, c.y)).collect();
    let keep = exterior.len().saturating_sub(1);
    let mut ring: Vec<Point> = exterior.into_iter().take(keep).collect();
    make_ccw(&mut ring);
    ring
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::polygon_area;
    use crate::geometry::polygon_bounds;
    use crate::nfp::no_fit_polygon;
    use approx::assert_relative_eq;

    fn rect(w: f64, h: f64) -> Vec<Point> {
        vec![(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)]
    }

    #[test]
    fn test_minkowski_squares() {
        let grid = FixedScale::default();
        let nfp = minkowski_nfp(&rect(10.0, 10.0), &rect(4.0, 4.0), &grid).unwrap();

        assert_eq!(nfp.len(), 1);
        assert_relative_eq!(polygon_area(&nfp[0]).abs(), 196.0, epsilon = 1e-6);
        let bounds = polygon_bounds(&nfp[0]).unwrap();
        assert_relative_eq!(bounds.x, -4.0, epsilon = 1e-6);
        assert_relative_eq!(bounds.y, -4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_minkowski_agrees_with_orbit_for_convex() {
        let grid = FixedScale::default();
        let a = vec![(0.0, 0.0), (8.0, 0.0), (10.0, 6.0), (2.0, 7.0)];
        let b = vec![(1.0, 1.0), (4.0, 1.0), (2.0, 3.0)];

        let sum = minkowski_nfp(&a, &b, &grid).unwrap();
        let orbit = no_fit_polygon(&a, &b, false, false).unwrap();

        assert_relative_eq!(
            polygon_area(&sum[0]).abs(),
            polygon_area(&orbit[0]).abs(),
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_minkowski_concave() {
        let grid = FixedScale::default();
        let l_shape = vec![
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 4.0),
            (4.0, 4.0),
            (4.0, 10.0),
            (0.0, 10.0),
        ];
        let nfp = minkowski_nfp(&l_shape, &rect(2.0, 2.0), &grid).unwrap();

        // [-2,10]x[-2,4] union [-2,4]x[-2,10]
        assert_relative_eq!(polygon_area(&nfp[0]).abs(), 108.0, epsilon = 1e-6);
    }

    #[test]
    fn test_triangulate_concave_covers_area() {
        let arrow = vec![(0.0, 0.0), (4.0, 2.0), (8.0, 0.0), (4.0, 8.0)];
        let pieces = triangulate(&arrow);
        let total: f64 = pieces.iter().map(|p| polygon_area(p)).sum();
        assert_relative_eq!(total, polygon_area(&arrow).abs(), epsilon = 1e-9);
        assert!(pieces.iter().all(|p| polygon_area(p) > 0.0));
    }

    #[test]
    fn test_edge_angle() {
        assert_relative_eq!(edge_angle(1.0, 0.0), 0.0);
        assert_relative_eq!(edge_angle(0.0, 1.0), PI / 2.0);
        assert_relative_eq!(edge_angle(0.0, -1.0), 3.0 * PI / 2.0);
    }
}
