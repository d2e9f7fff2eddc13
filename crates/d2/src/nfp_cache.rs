//! NFP memoization and per-individual pair derivation.
//!
//! The cache is a plain value owned by the nesting controller. Each round it
//! is rebuilt: entries still needed by the current individual are carried
//! over, the rest are dropped, and the missing keys become [`NfpPair`] work
//! items.

use std::collections::{HashMap, HashSet};

use orbinest_core::Phenotype;

use crate::geometry::{Point, Polygon, BIN_ID};

/// Identifies one NFP: `b` orbiting `a` (inside or outside) at the given rotations.
///
/// Rotations are stored in millidegrees so the key hashes exactly.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct NfpKey {
    pub a: i32,
    pub b: i32,
    pub inside: bool,
    a_rotation: i64,
    b_rotation: i64,
}

fn to_millidegrees(degrees: f64) -> i64 {
    (degrees * 1000.0).round() as i64
}

impl NfpKey {
    pub fn new(a: i32, b: i32, inside: bool, a_rotation: f64, b_rotation: f64) -> Self {
        Self {
            a,
            b,
            inside,
            a_rotation: to_millidegrees(a_rotation),
            b_rotation: to_millidegrees(b_rotation),
        }
    }

    /// Key of a part inside the bin.
    pub fn bin(part: i32, rotation: f64) -> Self {
        Self::new(BIN_ID, part, true, 0.0, rotation)
    }

    /// Key of part `b` outside part `a`.
    pub fn outer(a: i32, a_rotation: f64, b: i32, b_rotation: f64) -> Self {
        Self::new(a, b, false, a_rotation, b_rotation)
    }

    /// Rotation of `a` in degrees.
    pub fn a_rotation(&self) -> f64 {
        self.a_rotation as f64 / 1000.0
    }

    /// Rotation of `b` in degrees.
    pub fn b_rotation(&self) -> f64 {
        self.b_rotation as f64 / 1000.0
    }
}

/// Every key needed to place `individual`.
///
/// One bin key per part, then one outer key for each earlier part in the
/// ordering.
pub fn required_keys(individual: &Phenotype) -> Vec<NfpKey> {
    let genes: Vec<(i32, f64)> = individual.genes().collect();
    let mut keys = Vec::with_capacity(genes.len() * (genes.len() + 1) / 2);

    for (i, &(id, rotation)) in genes.iter().enumerate() {
        keys.push(NfpKey::bin(id, rotation));
        for &(placed, placed_rotation) in &genes[..i] {
            keys.push(NfpKey::outer(placed, placed_rotation, id, rotation));
        }
    }

    keys
}

/// A work item: the unrotated polygons of one missing key.
#[derive(Debug, Clone)]
pub struct NfpPair {
    pub key: NfpKey,
    pub a: Polygon,
    pub b: Polygon,
}

/// NFP rings by key. An NFP may have several rings; the first is the outer one.
#[derive(Debug, Clone, Default)]
pub struct NfpCache {
    entries: HashMap<NfpKey, Vec<Vec<Point>>>,
}

impl NfpCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &NfpKey) -> Option<&Vec<Vec<Point>>> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &NfpKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: NfpKey, nfp: Vec<Vec<Point>>) {
        self.entries.insert(key, nfp);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Splits `keys` against this cache.
    ///
    /// Returns a new cache holding only the hits, and the keys that missed.
    /// Duplicate keys are reported once.
    pub fn carry_over(&self, keys: &[NfpKey]) -> (NfpCache, Vec<NfpKey>) {
        let mut next = NfpCache::new();
        let mut missing = Vec::new();
        let mut seen = HashSet::with_capacity(keys.len());

        for key in keys {
            if !seen.insert(*key) {
                continue;
            }
            match self.entries.get(key) {
                Some(nfp) => next.insert(*key, nfp.clone()),
                None => missing.push(*key),
            }
        }

        (next, missing)
    }
}

impl Extend<(NfpKey, Vec<Vec<Point>>)> for NfpCache {
    fn extend<I: IntoIterator<Item = (NfpKey, Vec<Vec<Point>>)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}
