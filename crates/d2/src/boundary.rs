//! The bin parts are nested into.

use orbinest_core::robust::FixedScale;
use orbinest_core::{Config, Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::clip;
use crate::geometry::{make_ccw, polygon_area, polygon_bounds, Bounds, Point, Polygon, BIN_ID};

/// A prepared bin.
///
/// The ring is cleaned, shrunk by half the spacing, wound counter-clockwise
/// and translated so its bounding box starts at the origin.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bin {
    polygon: Polygon,
    width: f64,
    height: f64,
    /// Where the bin's origin lies in the caller's coordinates.
    origin: Point,
    /// Bounds of the cleaned input ring, before spacing.
    source_bounds: Bounds,
}

impl Bin {
    /// Prepares a bin from a raw ring.
    pub fn prepare(ring: &[Point], config: &Config) -> Result<Self> {
        let grid = FixedScale::new(config.clipper_scale);

        let mut points = clip::clean_polygon(ring, config.curve_tolerance, &grid)
            .filter(|clean| clean.len() >= 3)
            .ok_or_else(|| Error::InvalidBoundary("bin is degenerate after cleaning".into()))?;

        let source_bounds = polygon_bounds(&points)
            .ok_or_else(|| Error::InvalidBoundary("bin has no extent".into()))?;

        if config.spacing > 0.0 {
            let shrunk = clip::offset(
                &points,
                -0.5 * config.spacing,
                config.curve_tolerance,
                &grid,
            );
            if shrunk.len() > 1 {
                log::warn!(
                    "bin offset produced {} rings, keeping the largest",
                    shrunk.len()
                );
            }
            points = clip::largest_ring(shrunk)
                .ok_or_else(|| Error::InvalidBoundary("bin collapsed under spacing".into()))?;
        }

        let bounds = polygon_bounds(&points)
            .ok_or_else(|| Error::InvalidBoundary("bin collapsed under spacing".into()))?;

        for p in &mut points {
            p.0 -= bounds.x;
            p.1 -= bounds.y;
        }
        make_ccw(&mut points);

        if polygon_area(&points).abs() <= f64::EPSILON {
            return Err(Error::InvalidBoundary("bin has zero area".into()));
        }

        Ok(Self {
            polygon: Polygon::new(BIN_ID, points),
            width: bounds.width,
            height: bounds.height,
            origin: (bounds.x, bounds.y),
            source_bounds,
        })
    }

    /// The prepared ring, id [`BIN_ID`].
    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    pub fn points(&self) -> &[Point] {
        &self.polygon.points
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Absolute area of the prepared ring.
    pub fn area(&self) -> f64 {
        self.polygon.area()
    }

    /// Translation from bin coordinates back to the caller's coordinates.
    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn source_bounds(&self) -> Bounds {
        self.source_bounds
    }

    /// Whether a part with `bounds` can possibly fit, by bounding box only.
    pub fn admits(&self, bounds: &Bounds) -> bool {
        bounds.width < self.width && bounds.height < self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_prepare_translates_to_origin() {
        let ring = vec![(5.0, 5.0), (5.0, 15.0), (25.0, 15.0), (25.0, 5.0)];
        let bin = Bin::prepare(&ring, &Config::default()).unwrap();

        assert_eq!(bin.polygon().id, BIN_ID);
        assert_relative_eq!(bin.width(), 20.0);
        assert_relative_eq!(bin.height(), 10.0);
        assert_eq!(bin.origin(), (5.0, 5.0));
        assert!(polygon_area(bin.points()) > 0.0);

        let bounds = polygon_bounds(bin.points()).unwrap();
        assert_relative_eq!(bounds.x, 0.0);
        assert_relative_eq!(bounds.y, 0.0);
    }

    #[test]
    fn test_prepare_applies_spacing() {
        let ring = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let config = Config::default().with_spacing(2.0);
        let bin = Bin::prepare(&ring, &config).unwrap();

        assert_relative_eq!(bin.width(), 8.0, epsilon = 1e-6);
        assert_relative_eq!(bin.height(), 8.0, epsilon = 1e-6);
        assert_relative_eq!(bin.origin().0, 1.0, epsilon = 1e-6);
        assert_relative_eq!(bin.source_bounds().width, 10.0);
    }

    #[test]
    fn test_prepare_spacing_is_exact_at_default_tolerance() {
        let ring = vec![(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)];
        let bin = Bin::prepare(&ring, &Config::default().with_spacing(2.0)).unwrap();

        assert_relative_eq!(bin.width(), 98.0, epsilon = 1e-6);
        assert_relative_eq!(bin.height(), 98.0, epsilon = 1e-6);
        assert_relative_eq!(bin.polygon().area(), 98.0 * 98.0, epsilon = 1e-4);
    }

    #[test]
    fn test_prepare_rejects_collapsed_by_spacing() {
        let ring = vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)];
        assert!(matches!(
            Bin::prepare(&ring, &Config::default().with_spacing(10.0)),
            Err(Error::InvalidBoundary(_))
        ));
    }

    #[test]
    fn test_prepare_rejects_degenerate() {
        let line = vec![(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)];
        assert!(matches!(
            Bin::prepare(&line, &Config::default()),
            Err(Error::InvalidBoundary(_))
        ));
    }

    #[test]
    fn test_admits_is_strict() {
        let ring = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let bin = Bin::prepare(&ring, &Config::default()).unwrap();
        let exact = Bounds {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 4.0,
        };
        assert!(!bin.admits(&exact));
        assert!(bin.admits(&Bounds { width: 9.9, ..exact }));
    }
}
