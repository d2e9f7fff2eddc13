//! Greedy bin filling for one individual.
//!
//! Parts are taken in the individual's order. The first part of a bin goes to
//! the leftmost point of its inner NFP. Every later part goes to the point of
//! the feasible region (inner NFP minus the union of the outer NFPs of the
//! parts already in the bin) that minimises `2 × width + height` of the
//! bounding box of everything placed so far. Parts that do not fit roll over
//! to the next bin.

use orbinest_core::robust::FixedScale;
use orbinest_core::{Config, NestResult, Phenotype, Placement};

use crate::boundary::Bin;
use crate::clip;
use crate::geometry::{
    almost_equal, points_bounds, polygon_area, rotate_polygon, translate_polygon, Point,
};
use crate::nfp_cache::{NfpCache, NfpKey};
use crate::tree::PartTree;

/// Distance below which NFP vertices are merged before the boolean operations.
const CLEAN_DISTANCE: f64 = 0.0001;

/// NFP rings smaller than this are dropped before the boolean operations.
const MIN_RING_AREA: f64 = 0.1;

/// Feasible regions smaller than this are not searched for positions.
const MIN_REGION_AREA: f64 = 2.0;

/// A part waiting to be placed, already rotated.
#[derive(Debug, Clone)]
struct Candidate {
    id: i32,
    rotation: f64,
    path: Vec<Point>,
}

/// Places parts into copies of one bin using cached NFPs.
#[derive(Debug, Clone, Copy)]
pub struct PlacementEngine<'a> {
    bin: &'a Bin,
    parts: &'a PartTree,
    grid: FixedScale,
}

impl<'a> PlacementEngine<'a> {
    pub fn new(bin: &'a Bin, parts: &'a PartTree, config: &Config) -> Self {
        Self {
            bin,
            parts,
            grid: FixedScale::new(config.clipper_scale),
        }
    }

    /// Places `individual` and returns the placements with their fitness.
    ///
    /// Fitness is one per bin opened, plus the last bin's bounding-box width
    /// over the bin area, plus two per part that could not be placed.
    pub fn place(&self, individual: &Phenotype, cache: &NfpCache) -> NestResult {
        let bin_area = self.bin.area();

        let mut remaining: Vec<Candidate> = individual
            .genes()
            .filter_map(|(id, rotation)| {
                let Some(node) = self.parts.by_id(id) else {
                    log::warn!("individual references unknown part {}", id);
                    return None;
                };
                Some(Candidate {
                    id,
                    rotation,
                    path: rotate_polygon(&node.ring, rotation),
                })
            })
            .collect();

        let mut bins: Vec<Vec<Placement>> = Vec::new();
        let mut fitness = 0.0;
        let mut last_width: Option<f64> = None;

        while !remaining.is_empty() {
            fitness += 1.0;

            let (placed, min_width) = self.fill_bin(&remaining, cache);

            if placed.is_empty() {
                log::debug!(
                    "{} parts could not be placed in an empty bin",
                    remaining.len()
                );
                break;
            }

            last_width = min_width;
            remaining.retain(|c| !placed.iter().any(|(id, _)| c.id == *id));
            bins.push(placed.into_iter().map(|(_, placement)| placement).collect());
        }

        if let Some(width) = last_width {
            fitness += width / bin_area;
        }
        fitness += 2.0 * remaining.len() as f64;

        NestResult {
            bins,
            fitness,
            unplaced: remaining.iter().map(|c| c.id).collect(),
        }
    }

    /// One bin pass. Returns `(part id, placement)` pairs and the bounding-box
    /// width found for the last part that reached the position search.
    fn fill_bin(
        &self,
        remaining: &[Candidate],
        cache: &NfpCache,
    ) -> (Vec<(i32, Placement)>, Option<f64>) {
        let mut placed: Vec<(&Candidate, Placement)> = Vec::new();
        let mut min_width: Option<f64> = None;

        for part in remaining {
            let bin_nfp = match cache.get(&NfpKey::bin(part.id, part.rotation)) {
                Some(nfp) if !nfp.is_empty() => nfp,
                _ => continue,
            };

            let outer: Option<Vec<&Vec<Vec<Point>>>> = placed
                .iter()
                .map(|(other, _)| {
                    cache.get(&NfpKey::outer(
                        other.id,
                        other.rotation,
                        part.id,
                        part.rotation,
                    ))
                })
                .collect();
            let Some(outer) = outer else {
                continue;
            };

            let Some(&anchor) = part.path.first() else {
                continue;
            };

            if placed.is_empty() {
                // leftmost point of the inner NFP
                let position = bin_nfp
                    .iter()
                    .flatten()
                    .map(|&(x, y)| (x - anchor.0, y - anchor.1))
                    .fold(None, |best: Option<Point>, p| match best {
                        Some(b) if b.0 <= p.0 => Some(b),
                        _ => Some(p),
                    });

                if let Some((x, y)) = position {
                    placed.push((part, Placement::new(part.id, x, y, part.rotation)));
                }
                continue;
            }

            let Some(region) = self.feasible_region(bin_nfp, &placed, &outer) else {
                continue;
            };

            let (position, width) = best_position(part, anchor, &placed, &region);
            min_width = width;

            if let Some((x, y)) = position {
                placed.push((part, Placement::new(part.id, x, y, part.rotation)));
            }
        }

        let placements = placed
            .into_iter()
            .map(|(part, placement)| (part.id, placement))
            .collect();
        (placements, min_width)
    }

    /// Inner NFP minus the union of the translated outer NFPs.
    fn feasible_region(
        &self,
        bin_nfp: &[Vec<Point>],
        placed: &[(&Candidate, Placement)],
        outer: &[&Vec<Vec<Point>>],
    ) -> Option<Vec<Vec<Point>>> {
        let mut obstacles = Vec::new();
        for ((_, placement), nfp) in placed.iter().zip(outer) {
            for ring in nfp.iter() {
                let moved = translate_polygon(ring, placement.x, placement.y);
                let clean = clip::clean_ring(&moved, CLEAN_DISTANCE);
                if clean.len() > 2 && polygon_area(&clean).abs() > MIN_RING_AREA {
                    obstacles.push(clean);
                }
            }
        }

        let combined = clip::union(&obstacles, &self.grid);

        let region: Vec<Vec<Point>> = clip::difference(bin_nfp, &combined, &self.grid)
            .into_iter()
            .map(|ring| clip::clean_ring(&ring, CLEAN_DISTANCE))
            .filter(|ring| ring.len() >= 3 && polygon_area(ring).abs() >= MIN_RING_AREA)
            .collect();

        if region.is_empty() {
            None
        } else {
            Some(region)
        }
    }
}

/// Scans every vertex of the feasible region for the most compact position.
///
/// Returns the translation and the bounding-box width it yields; ties on the
/// score go to the smaller x.
fn best_position(
    part: &Candidate,
    anchor: Point,
    placed: &[(&Candidate, Placement)],
    region: &[Vec<Point>],
) -> (Option<Point>, Option<f64>) {
    let placed_points: Vec<Point> = placed
        .iter()
        .flat_map(|(other, placement)| {
            other
                .path
                .iter()
                .map(move |&(x, y)| (x + placement.x, y + placement.y))
        })
        .collect();

    let mut best: Option<(Point, f64, f64)> = None;

    for ring in region {
        if polygon_area(ring).abs() < MIN_REGION_AREA {
            continue;
        }

        for &(x, y) in ring {
            let shift = (x - anchor.0, y - anchor.1);
            let bounds = points_bounds(
                placed_points.iter().copied().chain(
                    part.path
                        .iter()
                        .map(|&(px, py)| (px + shift.0, py + shift.1)),
                ),
            );
            let score = bounds.width * 2.0 + bounds.height;

            let better = match best {
                None => true,
                Some((current, current_score, _)) => {
                    score < current_score
                        || (almost_equal(score, current_score) && shift.0 < current.0)
                }
            };
            if better {
                best = Some((shift, score, bounds.width));
            }
        }
    }

    match best {
        Some((shift, _, width)) => (Some(shift), Some(width)),
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{intersect, point_in_polygon, Containment};
    use crate::nfp_cache::{required_keys, NfpPair};
    use crate::worker::{compute_nfp, NfpOptions};
    use approx::assert_relative_eq;

    fn square(size: f64) -> Vec<Point> {
        vec![(0.0, 0.0), (size, 0.0), (size, size), (0.0, size)]
    }

    fn fill_cache(bin: &Bin, tree: &PartTree, individual: &Phenotype, config: &Config) -> NfpCache {
        let options = NfpOptions::from(config);
        let mut cache = NfpCache::new();
        for key in required_keys(individual) {
            let a = if key.inside {
                bin.polygon().clone()
            } else {
                tree.polygon_by_id(key.a).unwrap()
            };
            let b = tree.polygon_by_id(key.b).unwrap();
            if let Some(nfp) = compute_nfp(&NfpPair { key, a, b }, &options) {
                cache.insert(key, nfp);
            }
        }
        cache
    }

    fn setup(parts: &[Vec<Point>], config: &Config) -> (Bin, PartTree) {
        let bin = Bin::prepare(&square(10.0), config).unwrap();
        let tree = PartTree::prepare(parts, config);
        (bin, tree)
    }

    #[test]
    fn test_single_part_goes_left() {
        let config = Config::default();
        let (bin, tree) = setup(&[square(4.0)], &config);
        let individual = Phenotype::new(vec![0], vec![0.0]);
        let cache = fill_cache(&bin, &tree, &individual, &config);

        let result = PlacementEngine::new(&bin, &tree, &config).place(&individual, &cache);

        assert_eq!(result.bins_used(), 1);
        assert!(result.all_placed());
        let placement = result.bins[0][0];
        assert_relative_eq!(placement.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(result.fitness, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_second_part_packs_beside_first() {
        let config = Config::default();
        let (bin, tree) = setup(&[square(4.0), square(4.0)], &config);
        let individual = Phenotype::new(vec![0, 1], vec![0.0, 0.0]);
        let cache = fill_cache(&bin, &tree, &individual, &config);

        let result = PlacementEngine::new(&bin, &tree, &config).place(&individual, &cache);

        assert_eq!(result.bins_used(), 1);
        assert_eq!(result.placed_count(), 2);

        let [first, second] = [result.bins[0][0], result.bins[0][1]];
        let a = translate_polygon(&square(4.0), first.x, first.y);
        let b = translate_polygon(&square(4.0), second.x, second.y);
        assert!(!intersect(&a, (0.0, 0.0), &b, (0.0, 0.0)));

        // stacked in a column: width 4, so fitness 1 + 4/100
        assert_relative_eq!(result.fitness, 1.04, epsilon = 1e-6);
        for p in a.iter().chain(&b) {
            assert_ne!(point_in_polygon(*p, bin.points()), Containment::Outside);
        }
    }

    #[test]
    fn test_overflow_opens_second_bin() {
        let config = Config::default();
        let (bin, tree) = setup(&[square(6.0), square(6.0)], &config);
        let individual = Phenotype::new(vec![0, 1], vec![0.0, 0.0]);
        let cache = fill_cache(&bin, &tree, &individual, &config);

        let result = PlacementEngine::new(&bin, &tree, &config).place(&individual, &cache);

        assert_eq!(result.bins_used(), 2);
        assert_eq!(result.bins[0].len(), 1);
        assert_eq!(result.bins[1].len(), 1);
        assert_relative_eq!(result.fitness, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_width_term_counts_last_bin_only() {
        let config = Config::default().with_rotations(1);
        let parts: Vec<Vec<Point>> = (0..4)
            .map(|i| {
                let x = 20.0 * i as f64;
                vec![(x, 0.0), (x + 6.0, 0.0), (x + 6.0, 4.0), (x, 4.0)]
            })
            .collect();
        let (bin, tree) = setup(&parts, &config);
        let individual = Phenotype::new(vec![0, 1, 2, 3], vec![0.0; 4]);
        let cache = fill_cache(&bin, &tree, &individual, &config);

        let result = PlacementEngine::new(&bin, &tree, &config).place(&individual, &cache);

        assert_eq!(result.bins_used(), 2);
        assert_eq!(result.bins[0].len(), 2);
        assert_eq!(result.bins[1].len(), 2);
        // two bins, each stacked 6 wide; only the second contributes 6/100
        assert_relative_eq!(result.fitness, 2.06, epsilon = 1e-6);
    }

    #[test]
    fn test_missing_bin_nfp_is_penalised() {
        let config = Config::default();
        let large = translate_polygon(&square(12.0), 20.0, 0.0);
        let (bin, tree) = setup(&[square(4.0), large], &config);
        let individual = Phenotype::new(vec![1, 0], vec![0.0, 0.0]);
        let cache = fill_cache(&bin, &tree, &individual, &config);

        let result = PlacementEngine::new(&bin, &tree, &config).place(&individual, &cache);

        assert_eq!(result.bins_used(), 1);
        assert_eq!(result.unplaced, vec![1]);
        // one bin, one part left over; the lone part never reaches the search
        assert_relative_eq!(result.fitness, 2.0 + 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unknown_part_is_ignored() {
        let config = Config::default();
        let (bin, tree) = setup(&[square(4.0)], &config);
        let individual = Phenotype::new(vec![0, 9], vec![0.0, 0.0]);
        let cache = fill_cache(&bin, &tree, &Phenotype::new(vec![0], vec![0.0]), &config);

        let result = PlacementEngine::new(&bin, &tree, &config).place(&individual, &cache);
        assert_eq!(result.placed_count(), 1);
        assert!(result.all_placed());
    }
}
