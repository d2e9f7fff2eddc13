//! Part/hole hierarchy stored as an arena.
//!
//! A ring whose first point lies strictly inside another ring becomes that
//! ring's child. Depth alternates meaning: roots are parts, their children
//! are holes, grandchildren are solid islands inside holes, and so on.

use std::collections::HashMap;

use orbinest_core::robust::FixedScale;
use orbinest_core::Config;

use crate::clip;
use crate::geometry::{make_ccw, make_cw, point_in_polygon, polygon_area, Point, Polygon};

/// One ring in the tree.
#[derive(Debug, Clone)]
pub struct PartNode {
    /// Unique id; roots are numbered first.
    pub id: i32,
    /// Index of the input ring this node came from.
    pub source: usize,
    pub ring: Vec<Point>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Arena of parts and their holes.
#[derive(Debug, Clone, Default)]
pub struct PartTree {
    nodes: Vec<PartNode>,
    roots: Vec<usize>,
    by_id: HashMap<i32, usize>,
}

impl PartTree {
    /// Builds the hierarchy from already-clean rings, ids starting at 0.
    ///
    /// `rings` pairs each ring with its source index.
    pub fn build(rings: Vec<(usize, Vec<Point>)>) -> Self {
        let mut tree = Self {
            nodes: rings
                .into_iter()
                .map(|(source, ring)| PartNode {
                    id: i32::MIN,
                    source,
                    ring,
                    parent: None,
                    children: Vec::new(),
                })
                .collect(),
            roots: Vec::new(),
            by_id: HashMap::new(),
        };

        let level: Vec<usize> = (0..tree.nodes.len()).collect();
        let mut next_id = 0;
        tree.roots = tree.assign_level(level, &mut next_id);
        tree.by_id = tree
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id, index))
            .collect();
        tree
    }

    /// Cleans raw rings, builds the tree, applies spacing and normalises winding.
    ///
    /// Rings that clean down to fewer than three points, or whose area does not
    /// exceed `curve_tolerance²`, are dropped.
    pub fn prepare(rings: &[Vec<Point>], config: &Config) -> Self {
        let grid = FixedScale::new(config.clipper_scale);
        let min_area = config.curve_tolerance * config.curve_tolerance;

        let mut kept = Vec::with_capacity(rings.len());
        for (source, ring) in rings.iter().enumerate() {
            match clip::clean_polygon(ring, config.curve_tolerance, &grid) {
                Some(clean) if clean.len() > 2 && polygon_area(&clean).abs() > min_area => {
                    kept.push((source, clean));
                }
                _ => log::warn!("ring {} is degenerate after cleaning, excluded", source),
            }
        }

        let mut tree = Self::build(kept);

        let half = 0.5 * config.spacing;
        for root in tree.roots.clone() {
            tree.offset_subtree(root, half, config.curve_tolerance, &grid);
        }
        for root in tree.roots.clone() {
            tree.normalize_subtree(root, false);
        }

        tree
    }

    /// Assigns parents within `level`, numbers the roots, then recurses.
    /// Returns the roots of this level.
    fn assign_level(&mut self, level: Vec<usize>, next_id: &mut i32) -> Vec<usize> {
        let mut roots = Vec::new();

        for &i in &level {
            let Some(&first) = self.nodes[i].ring.first() else {
                continue;
            };
            let parent = level
                .iter()
                .copied()
                .find(|&j| j != i && point_in_polygon(first, &self.nodes[j].ring).is_inside());

            match parent {
                Some(j) => {
                    self.nodes[j].children.push(i);
                    self.nodes[i].parent = Some(j);
                }
                None => roots.push(i),
            }
        }

        for &root in &roots {
            self.nodes[root].id = *next_id;
            *next_id += 1;
        }

        for &root in &roots {
            let children = std::mem::take(&mut self.nodes[root].children);
            if !children.is_empty() {
                let kept = self.assign_level(children, next_id);
                for &child in &kept {
                    self.nodes[child].parent = Some(root);
                }
                self.nodes[root].children = kept;
            }
        }

        roots
    }

    fn offset_subtree(
        &mut self,
        index: usize,
        delta: f64,
        arc_tolerance: f64,
        grid: &FixedScale,
    ) {
        if delta.abs() > crate::geometry::TOL {
            let result = clip::offset(&self.nodes[index].ring, delta, arc_tolerance, grid);
            if result.len() > 1 {
                log::debug!(
                    "offset of part {} produced {} rings, keeping the largest",
                    self.nodes[index].id,
                    result.len()
                );
            }
            match clip::largest_ring(result) {
                Some(ring) => self.nodes[index].ring = ring,
                None => log::warn!(
                    "offset of part {} collapsed, left unchanged",
                    self.nodes[index].id
                ),
            }
        }

        for child in self.nodes[index].children.clone() {
            self.offset_subtree(child, -delta, arc_tolerance, grid);
        }
    }

    fn normalize_subtree(&mut self, index: usize, hole: bool) {
        let ring = &mut self.nodes[index].ring;
        if ring.len() > 1 && crate::geometry::points_equal(ring[0], ring[ring.len() - 1]) {
            ring.pop();
        }
        if hole {
            make_cw(ring);
        } else {
            make_ccw(ring);
        }

        for child in self.nodes[index].children.clone() {
            self.normalize_subtree(child, !hole);
        }
    }

    /// Number of top-level parts.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Node by arena index.
    pub fn node(&self, index: usize) -> &PartNode {
        &self.nodes[index]
    }

    /// Node by id.
    pub fn by_id(&self, id: i32) -> Option<&PartNode> {
        self.by_id.get(&id).map(|&index| &self.nodes[index])
    }

    /// Arena indices of the top-level parts, in id order.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// A top-level part with its direct holes.
    pub fn polygon(&self, index: usize) -> Polygon {
        let node = &self.nodes[index];
        Polygon::new(node.id, node.ring.clone()).with_holes(
            node.children
                .iter()
                .map(|&child| self.nodes[child].ring.clone())
                .collect(),
        )
    }

    /// Arena index of the node with `id`.
    pub fn index_of(&self, id: i32) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    /// [`PartTree::polygon`] by id.
    pub fn polygon_by_id(&self, id: i32) -> Option<Polygon> {
        self.index_of(id).map(|index| self.polygon(index))
    }

    /// Every top-level part as a [`Polygon`].
    pub fn parts(&self) -> Vec<Polygon> {
        self.roots.iter().map(|&root| self.polygon(root)).collect()
    }

    /// All descendants of `index` in depth-first order, flagged `true` for holes.
    pub fn flatten(&self, index: usize) -> Vec<(usize, bool)> {
        let mut out = Vec::new();
        self.flatten_into(index, true, &mut out);
        out
    }

    fn flatten_into(&self, index: usize, hole: bool, out: &mut Vec<(usize, bool)>) {
        for &child in &self.nodes[index].children {
            out.push((child, hole));
            self.flatten_into(child, !hole, out);
        }
    }
}
