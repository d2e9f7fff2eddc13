//! Placement results.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where one part ended up inside a bin.
///
/// `(x, y)` is the translation applied after rotating the part by `rotation`
/// degrees about the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Placement {
    /// Id of the placed part.
    pub part_id: i32,
    /// Translation along x.
    pub x: f64,
    /// Translation along y.
    pub y: f64,
    /// Rotation in degrees.
    pub rotation: f64,
}

impl Placement {
    /// Creates a new placement.
    pub fn new(part_id: i32, x: f64, y: f64, rotation: f64) -> Self {
        Self {
            part_id,
            x,
            y,
            rotation,
        }
    }

    /// Applies this placement to a point given in part coordinates.
    pub fn transform_point(&self, (px, py): (f64, f64)) -> (f64, f64) {
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        (px * cos - py * sin + self.x, px * sin + py * cos + self.y)
    }
}

/// Outcome of placing one individual.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NestResult {
    /// One list of placements per opened bin, in opening order.
    pub bins: Vec<Vec<Placement>>,
    /// Fitness of the individual; lower is better.
    pub fitness: f64,
    /// Ids of parts that could not be placed in any bin.
    pub unplaced: Vec<i32>,
}

impl NestResult {
    /// Number of bins that received at least one part.
    pub fn bins_used(&self) -> usize {
        self.bins.len()
    }

    /// Number of placed parts across all bins.
    pub fn placed_count(&self) -> usize {
        self.bins.iter().map(Vec::len).sum()
    }

    /// Returns true if every part was placed.
    pub fn all_placed(&self) -> bool {
        self.unplaced.is_empty()
    }

    /// Iterates all placements in bin order.
    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.bins.iter().flatten()
    }
}

/// Improvement report handed to the display callback.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NestReport {
    /// Placements per bin.
    pub placements: Vec<Vec<Placement>>,
    /// Placed part area over the total area of the bins used.
    pub efficiency: f64,
    /// Number of parts placed.
    pub parts_placed: usize,
    /// Number of parts in the nest.
    pub parts_total: usize,
    /// Fitness of the reported result.
    pub fitness: f64,
}

impl NestReport {
    /// Returns true if every part was placed.
    pub fn all_placed(&self) -> bool {
        self.parts_placed == self.parts_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_point() {
        let placement = Placement::new(0, 10.0, 5.0, 90.0);
        let (x, y) = placement.transform_point((1.0, 0.0));
        assert_relative_eq!(x, 10.0, epsilon = 1e-10);
        assert_relative_eq!(y, 6.0, epsilon = 1e-10);
    }

    #[test]
    fn test_result_counts() {
        let result = NestResult {
            bins: vec![
                vec![Placement::new(0, 0.0, 0.0, 0.0), Placement::new(1, 4.0, 0.0, 0.0)],
                vec![Placement::new(2, 0.0, 0.0, 90.0)],
            ],
            fitness: 2.5,
            unplaced: vec![3],
        };

        assert_eq!(result.bins_used(), 2);
        assert_eq!(result.placed_count(), 3);
        assert!(!result.all_placed());
        let ids: Vec<i32> = result.placements().map(|p| p.part_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}
