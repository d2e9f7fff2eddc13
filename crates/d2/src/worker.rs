//! NFP computation for one work item.
//!
//! [`compute_nfp`] is the pure function the controller fans out over every
//! missing [`NfpPair`]. It picks the right kernel, normalises winding and
//! applies the sanity checks. A `None` result means the pair has no usable
//! NFP; it is logged here and costs fitness later, but is never an error.

use orbinest_core::robust::FixedScale;
use orbinest_core::Config;

use crate::geometry::{
    is_rectangle, make_ccw, make_cw, point_in_polygon, polygon_area, polygon_bounds, Point,
};
use crate::minkowski::minkowski_nfp;
use crate::nfp::{no_fit_polygon, no_fit_polygon_rectangle};
use crate::nfp_cache::NfpPair;

/// Tolerance of the rectangular-bin shortcut.
const RECTANGLE_TOLERANCE: f64 = 0.001;

/// Kernel switches shared by every pair of a round.
#[derive(Debug, Clone, Copy)]
pub struct NfpOptions {
    /// Add NFPs for B inside A's holes.
    pub use_holes: bool,
    /// Trace every orbit loop instead of taking the Minkowski shortcut.
    pub search_edges: bool,
    /// Grid for the boolean operations of the Minkowski path.
    pub grid: FixedScale,
}

impl From<&Config> for NfpOptions {
    fn from(config: &Config) -> Self {
        Self {
            use_holes: config.use_holes,
            search_edges: config.explore_concave,
            grid: FixedScale::new(config.clipper_scale),
        }
    }
}

/// Computes the NFP of one pair at its key's rotations.
///
/// Inner NFPs are wound counter-clockwise. For outer NFPs the outer ring is
/// counter-clockwise, rings lying inside it are clockwise, and hole NFPs are
/// appended clockwise.
pub fn compute_nfp(pair: &NfpPair, options: &NfpOptions) -> Option<Vec<Vec<Point>>> {
    let key = pair.key;
    let a = pair.a.rotated(key.a_rotation());
    let b = pair.b.rotated(key.b_rotation());

    if key.inside {
        let nfp = if is_rectangle(&a.points, RECTANGLE_TOLERANCE) {
            no_fit_polygon_rectangle(&a.points, &b.points)
        } else {
            no_fit_polygon(&a.points, &b.points, true, options.search_edges)
        };

        return match nfp {
            Some(mut rings) if !rings.is_empty() => {
                for ring in &mut rings {
                    make_ccw(ring);
                }
                Some(rings)
            }
            _ => {
                log::warn!(
                    "no inner NFP for part {} at {}°; part may be larger than the bin",
                    key.b,
                    key.b_rotation()
                );
                None
            }
        };
    }

    let nfp = if options.search_edges {
        no_fit_polygon(&a.points, &b.points, false, true)
    } else {
        minkowski_nfp(&a.points, &b.points, &options.grid)
    };

    let mut rings = match nfp {
        Some(rings) if !rings.is_empty() => rings,
        _ => {
            log::error!("outer NFP failed for {:?}", key);
            return None;
        }
    };

    // the first traced loop is the outer one; only it must cover A
    let checked = if options.search_edges { 1 } else { rings.len() };
    let area_a = polygon_area(&a.points).abs();
    for ring in rings.iter().take(checked) {
        let area = polygon_area(ring).abs();
        if area < area_a {
            log::error!(
                "outer NFP area {:.4} smaller than part area {:.4} for {:?}",
                area,
                area_a,
                key
            );
            return None;
        }
    }

    for ring in &mut rings {
        make_ccw(ring);
    }
    for i in 1..rings.len() {
        let Some(&first) = rings[i].first() else {
            continue;
        };
        if point_in_polygon(first, &rings[0]).is_inside() {
            make_cw(&mut rings[i]);
        }
    }

    if options.use_holes && !a.holes.is_empty() {
        if let Some(bb) = polygon_bounds(&b.points) {
            for hole in &a.holes {
                let Some(hb) = polygon_bounds(hole) else {
                    continue;
                };
                if hb.width <= bb.width || hb.height <= bb.height {
                    continue;
                }

                let mut container = hole.clone();
                make_ccw(&mut container);

                if let Some(inner) = no_fit_polygon(&container, &b.points, true, options.search_edges)
                {
                    for mut ring in inner {
                        make_cw(&mut ring);
                        rings.push(ring);
                    }
                }
            }
        }
    }

    Some(rings)
}
