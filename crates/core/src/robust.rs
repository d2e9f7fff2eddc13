//! Exact orientation predicates and fixed-point snapping.
//!
//! Triangulation for the Minkowski fallback decides ears with these predicates
//! so nearly collinear vertices never flip sign. [`FixedScale`] snaps
//! coordinates onto the integer grid the boolean layer works on.
//!
//! Based on Shewchuk's adaptive precision predicates via the `robust` crate.

use robust::{orient2d as robust_orient2d, Coord};

/// Result of an orientation test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Left turn.
    CounterClockwise,
    /// Right turn.
    Clockwise,
    /// Collinear.
    Collinear,
}

impl Orientation {
    #[inline]
    pub fn is_ccw(self) -> bool {
        matches!(self, Orientation::CounterClockwise)
    }

    #[inline]
    pub fn is_cw(self) -> bool {
        matches!(self, Orientation::Clockwise)
    }

    #[inline]
    pub fn is_collinear(self) -> bool {
        matches!(self, Orientation::Collinear)
    }
}

/// Exact orientation of `pc` relative to the directed line `pa -> pb`.
#[inline]
pub fn orient2d(pa: (f64, f64), pb: (f64, f64), pc: (f64, f64)) -> Orientation {
    let det = robust_orient2d(
        Coord { x: pa.0, y: pa.1 },
        Coord { x: pb.0, y: pb.1 },
        Coord { x: pc.0, y: pc.1 },
    );

    if det > 0.0 {
        Orientation::CounterClockwise
    } else if det < 0.0 {
        Orientation::Clockwise
    } else {
        Orientation::Collinear
    }
}

/// Relative error bound under which the plain cross product is trusted.
const FILTER_EPSILON: f64 = 1e-12;

/// Orientation with a floating-point filter; falls back to [`orient2d`] only
/// when the fast determinant is too close to zero to trust.
#[inline]
pub fn orient2d_filtered(pa: (f64, f64), pb: (f64, f64), pc: (f64, f64)) -> Orientation {
    let acx = pa.0 - pc.0;
    let bcx = pb.0 - pc.0;
    let acy = pa.1 - pc.1;
    let bcy = pb.1 - pc.1;

    let det = acx * bcy - acy * bcx;
    let det_sum = (acx * bcy).abs() + (acy * bcx).abs();

    if det.abs() > FILTER_EPSILON * det_sum {
        return if det > 0.0 {
            Orientation::CounterClockwise
        } else {
            Orientation::Clockwise
        };
    }

    orient2d(pa, pb, pc)
}

/// True if `p` is strictly inside triangle `abc` (either winding).
pub fn point_in_triangle_robust(
    p: (f64, f64),
    a: (f64, f64),
    b: (f64, f64),
    c: (f64, f64),
) -> bool {
    let o1 = orient2d_filtered(a, b, p);
    let o2 = orient2d_filtered(b, c, p);
    let o3 = orient2d_filtered(c, a, p);

    (o1.is_ccw() && o2.is_ccw() && o3.is_ccw()) || (o1.is_cw() && o2.is_cw() && o3.is_cw())
}

/// True if every non-collinear turn of the ring has the same orientation.
pub fn is_convex_robust(polygon: &[(f64, f64)]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut expected: Option<Orientation> = None;
    for i in 0..n {
        let o = orient2d_filtered(polygon[i], polygon[(i + 1) % n], polygon[(i + 2) % n]);
        if o.is_collinear() {
            continue;
        }
        match expected {
            None => expected = Some(o),
            Some(e) if e != o => return false,
            _ => {}
        }
    }

    true
}

/// Fixed-point grid used before boolean operations.
///
/// Coordinates are multiplied by `scale`, rounded, and divided back, which
/// mirrors the integer coordinates of a clipper-style engine while keeping
/// `f64` at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedScale {
    scale: f64,
    inv_scale: f64,
}

impl FixedScale {
    /// Creates a grid with the given scale factor (e.g. `1e7`).
    pub fn new(scale: f64) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            1.0
        };
        Self {
            scale,
            inv_scale: 1.0 / scale,
        }
    }

    /// The scale factor.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Snaps a point onto the grid.
    #[inline]
    pub fn snap(&self, p: (f64, f64)) -> (f64, f64) {
        (
            (p.0 * self.scale).round() * self.inv_scale,
            (p.1 * self.scale).round() * self.inv_scale,
        )
    }

    /// Snaps a whole ring.
    pub fn snap_ring(&self, ring: &[(f64, f64)]) -> Vec<(f64, f64)> {
        ring.iter().map(|&p| self.snap(p)).collect()
    }
}

impl Default for FixedScale {
    fn default() -> Self {
        Self::new(1e7)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orient2d_basic() {
        let a = (0.0, 0.0);
        let b = (1.0, 0.0);
        let c = (0.5, 1.0);

        assert_eq!(orient2d(a, b, c), Orientation::CounterClockwise);
        assert_eq!(orient2d(a, c, b), Orientation::Clockwise);
        assert_eq!(orient2d(a, (1.0, 1.0), (2.0, 2.0)), Orientation::Collinear);
    }

    #[test]
    fn test_filtered_matches_exact_near_degenerate() {
        let a = (0.1, 0.1);
        let b = (0.3, 0.3);
        let c = (0.7, 0.7);
        assert_eq!(orient2d_filtered(a, b, c), orient2d(a, b, c));
    }

    #[test]
    fn test_point_in_triangle() {
        let a = (0.0, 0.0);
        let b = (10.0, 0.0);
        let c = (5.0, 10.0);

        assert!(point_in_triangle_robust((5.0, 3.0), a, b, c));
        assert!(point_in_triangle_robust((5.0, 3.0), a, c, b));
        assert!(!point_in_triangle_robust((20.0, 5.0), a, b, c));
        assert!(!point_in_triangle_robust((5.0, 0.0), a, b, c));
    }

    #[test]
    fn test_is_convex() {
        let square = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        assert!(is_convex_robust(&square));

        let l_shape = vec![
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 5.0),
            (5.0, 5.0),
            (5.0, 10.0),
            (0.0, 10.0),
        ];
        assert!(!is_convex_robust(&l_shape));
    }

    #[test]
    fn test_fixed_scale_snap() {
        let grid = FixedScale::new(1000.0);
        assert_eq!(grid.snap((1.23449, 5.6781)), (1.234, 5.678));
        assert_eq!(FixedScale::new(-1.0).scale(), 1.0);
    }
}
