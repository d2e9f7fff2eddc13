//! Genetic optimizer over part orderings and rotations.
//!
//! The population starts from a single ancestor ("Adam", usually parts sorted by
//! decreasing area) plus mutated clones of it; diversity comes only from
//! mutation. Each generation keeps the best individual unchanged and fills the
//! rest with mutated children of rank-weighted parents.
//!
//! Lower fitness is better. Individuals without a fitness are waiting to be
//! evaluated by the caller.

use rand::prelude::*;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::solver::Config;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the genetic optimizer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GaConfig {
    /// Population size.
    pub population_size: usize,
    /// Per-gene mutation probability, in percent.
    pub mutation_rate: u32,
    /// Number of candidate rotation angles.
    pub rotations: usize,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 10,
            mutation_rate: 10,
            rotations: 4,
        }
    }
}

impl GaConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size.max(3);
        self
    }

    /// Sets the mutation rate in percent.
    pub fn with_mutation_rate(mut self, rate: u32) -> Self {
        self.mutation_rate = rate;
        self
    }

    /// Sets the number of candidate rotations.
    pub fn with_rotations(mut self, rotations: usize) -> Self {
        self.rotations = rotations.max(1);
        self
    }

    /// Mutation probability as a fraction.
    fn mutation_probability(&self) -> f64 {
        0.01 * self.mutation_rate as f64
    }

    /// Evenly spaced candidate angles in degrees.
    pub fn candidate_angles(&self) -> Vec<f64> {
        let count = self.rotations.max(1);
        let step = 360.0 / count as f64;
        (0..count).map(|i| i as f64 * step).collect()
    }
}

impl From<&Config> for GaConfig {
    fn from(config: &Config) -> Self {
        Self {
            population_size: config.population_size,
            mutation_rate: config.mutation_rate,
            rotations: config.rotations,
        }
    }
}

/// One candidate solution: an insertion order of part ids and a rotation per slot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Phenotype {
    /// Part ids in insertion order.
    pub placement: Vec<i32>,
    /// Rotation in degrees for the part at the same index.
    pub rotation: Vec<f64>,
    /// Fitness once evaluated.
    pub fitness: Option<f64>,
}

impl Phenotype {
    /// Creates an unevaluated individual.
    pub fn new(placement: Vec<i32>, rotation: Vec<f64>) -> Self {
        debug_assert_eq!(placement.len(), rotation.len());
        Self {
            placement,
            rotation,
            fitness: None,
        }
    }

    /// Number of genes.
    pub fn len(&self) -> usize {
        self.placement.len()
    }

    /// Returns true if there are no genes.
    pub fn is_empty(&self) -> bool {
        self.placement.is_empty()
    }

    /// Iterates `(part_id, rotation)` pairs in insertion order.
    pub fn genes(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.placement
            .iter()
            .copied()
            .zip(self.rotation.iter().copied())
    }

    fn contains(&self, id: i32) -> bool {
        self.placement.contains(&id)
    }
}

/// Orders unevaluated individuals last.
fn compare_fitness(a: &Phenotype, b: &Phenotype) -> Ordering {
    let fa = a.fitness.unwrap_or(f64::INFINITY);
    let fb = b.fitness.unwrap_or(f64::INFINITY);
    fa.partial_cmp(&fb).unwrap_or(Ordering::Equal)
}

/// Population state machine.
#[derive(Debug, Clone)]
pub struct GeneticOptimizer {
    config: GaConfig,
    angles: Vec<f64>,
    /// Per part id, whether each candidate angle passes the bin bounding-box filter.
    admissible: HashMap<i32, Vec<bool>>,
    population: Vec<Phenotype>,
    generation: u32,
}

impl GeneticOptimizer {
    /// Seeds a population from `adam`, an ordering of part ids.
    ///
    /// `fits(id, angle)` reports whether the part's bounding box rotated by
    /// `angle` degrees is strictly smaller than the bin's in both dimensions.
    /// It is evaluated once per part and angle.
    pub fn new<F, R>(adam: Vec<i32>, config: GaConfig, fits: F, rng: &mut R) -> Self
    where
        F: Fn(i32, f64) -> bool,
        R: Rng + ?Sized,
    {
        let angles = config.candidate_angles();
        let admissible = adam
            .iter()
            .map(|&id| (id, angles.iter().map(|&angle| fits(id, angle)).collect()))
            .collect();

        let mut optimizer = Self {
            config,
            angles,
            admissible,
            population: Vec::new(),
            generation: 0,
        };

        let rotation = adam.iter().map(|&id| optimizer.random_angle(id, rng)).collect();
        optimizer.population.push(Phenotype::new(adam, rotation));

        while optimizer.population.len() < optimizer.config.population_size {
            let mutant = optimizer.mutate(&optimizer.population[0], rng);
            optimizer.population.push(mutant);
        }

        optimizer
    }

    /// Returns the configuration.
    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    /// Returns the current population.
    pub fn population(&self) -> &[Phenotype] {
        &self.population
    }

    /// Number of generations produced so far.
    pub fn generation_count(&self) -> u32 {
        self.generation
    }

    /// Index of the first individual lacking a fitness.
    pub fn first_unevaluated(&self) -> Option<usize> {
        self.population.iter().position(|p| p.fitness.is_none())
    }

    /// Indices of every individual lacking a fitness.
    pub fn unevaluated(&self) -> Vec<usize> {
        self.population
            .iter()
            .enumerate()
            .filter(|(_, p)| p.fitness.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    /// Records the fitness of the individual at `index`.
    pub fn set_fitness(&mut self, index: usize, fitness: f64) {
        if let Some(individual) = self.population.get_mut(index) {
            individual.fitness = Some(fitness);
        }
    }

    /// Best evaluated individual.
    pub fn best(&self) -> Option<&Phenotype> {
        self.population
            .iter()
            .filter(|p| p.fitness.is_some())
            .min_by(|a, b| compare_fitness(a, b))
    }

    /// Picks an insertion angle for a part.
    ///
    /// Candidate angles are tried in random order and the first one whose
    /// rotated bounding box fits the bin is returned; 0 if none fit.
    pub fn random_angle<R: Rng + ?Sized>(&self, id: i32, rng: &mut R) -> f64 {
        let mut order: Vec<usize> = (0..self.angles.len()).collect();
        order.shuffle(rng);

        let admissible = self.admissible.get(&id);
        order
            .into_iter()
            .find(|&i| admissible.map_or(false, |fits| fits[i]))
            .map_or(0.0, |i| self.angles[i])
    }

    /// Returns a mutated clone.
    ///
    /// Per gene, with probability `mutation_rate / 100`, the part swaps places
    /// with its successor; independently, with the same probability, its
    /// rotation is re-rolled.
    pub fn mutate<R: Rng + ?Sized>(&self, individual: &Phenotype, rng: &mut R) -> Phenotype {
        let probability = self.config.mutation_probability();
        let mut clone = Phenotype::new(individual.placement.clone(), individual.rotation.clone());

        for i in 0..clone.len() {
            if rng.gen::<f64>() < probability && i + 1 < clone.len() {
                clone.placement.swap(i, i + 1);
            }

            if rng.gen::<f64>() < probability {
                clone.rotation[i] = self.random_angle(clone.placement[i], rng);
            }
        }

        clone
    }

    /// Single-point crossover.
    ///
    /// The cut is drawn uniformly, clamped to [0.1, 0.9] of the sequence and
    /// rounded. Each child takes one parent's head and the other parent's
    /// remaining ids in that parent's order, rotations travelling with their ids.
    pub fn mate<R: Rng + ?Sized>(
        &self,
        male: &Phenotype,
        female: &Phenotype,
        rng: &mut R,
    ) -> (Phenotype, Phenotype) {
        let span = male.len().saturating_sub(1) as f64;
        let cut = (rng.gen::<f64>().clamp(0.1, 0.9) * span).round() as usize;

        (crossover(male, female, cut), crossover(female, male, cut))
    }

    /// Advances one generation.
    ///
    /// Sorts the population by ascending fitness, keeps the best individual and
    /// fills the remainder with mutated children. An odd remainder drops the
    /// last child.
    pub fn generation<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.population.sort_by(compare_fitness);

        let size = self.population.len();
        let mut next = Vec::with_capacity(size);
        next.push(self.population[0].clone());

        while next.len() < size {
            let male = self.random_weighted_index(None, rng);
            let female = self.random_weighted_index(Some(male), rng);

            let (first, second) = self.mate(&self.population[male], &self.population[female], rng);

            next.push(self.mutate(&first, rng));
            if next.len() < size {
                next.push(self.mutate(&second, rng));
            }
        }

        self.population = next;
        self.generation += 1;

        log::debug!(
            "generation {} seeded, elite fitness {:?}",
            self.generation,
            self.population[0].fitness
        );
    }

    /// Rank-weighted pick, front-loaded towards the start of the population.
    ///
    /// Uses ranks only: slot `i` of `n` gets a window of width
    /// `2 * (n - i) / n²` after a first window of `1 / n`. Falls back to the
    /// first candidate when the draw lands outside every window.
    pub fn random_weighted_index<R: Rng + ?Sized>(
        &self,
        exclude: Option<usize>,
        rng: &mut R,
    ) -> usize {
        let candidates: Vec<usize> = (0..self.population.len())
            .filter(|&i| Some(i) != exclude)
            .collect();
        let n = candidates.len();
        if n == 0 {
            return 0;
        }

        let draw = rng.gen::<f64>();
        let weight = 1.0 / n as f64;
        let mut lower = 0.0;
        let mut upper = weight;

        for (i, &index) in candidates.iter().enumerate() {
            if draw > lower && draw < upper {
                return index;
            }
            lower = upper;
            upper += 2.0 * weight * ((n - i) as f64 / n as f64);
        }

        candidates[0]
    }
}

/// Head of `head` up to `cut`, then `tail`'s genes not already present.
fn crossover(head: &Phenotype, tail: &Phenotype, cut: usize) -> Phenotype {
    let cut = cut.min(head.len());
    let mut child = Phenotype::new(head.placement[..cut].to_vec(), head.rotation[..cut].to_vec());

    for (id, rotation) in tail.genes() {
        if !child.contains(id) {
            child.placement.push(id);
            child.rotation.push(rotation);
        }
    }

    child
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    fn sorted_ids(individual: &Phenotype) -> Vec<i32> {
        let mut ids = individual.placement.clone();
        ids.sort();
        ids
    }

    fn optimizer(parts: i32, config: GaConfig, rng: &mut StdRng) -> GeneticOptimizer {
        GeneticOptimizer::new((0..parts).collect(), config, |_, _| true, rng)
    }

    #[test]
    fn test_initial_population() {
        let mut rng = StdRng::seed_from_u64(7);
        let ga = optimizer(6, GaConfig::default(), &mut rng);

        assert_eq!(ga.population().len(), 10);
        assert_eq!(ga.population()[0].placement, vec![0, 1, 2, 3, 4, 5]);
        for individual in ga.population() {
            assert_eq!(sorted_ids(individual), vec![0, 1, 2, 3, 4, 5]);
            assert_eq!(individual.rotation.len(), 6);
            assert!(individual.fitness.is_none());
        }
    }

    #[test]
    fn test_mutate_preserves_ids() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = GaConfig::default().with_mutation_rate(100);
        let ga = optimizer(12, config, &mut rng);

        for _ in 0..50 {
            let mutant = ga.mutate(&ga.population()[0], &mut rng);
            assert_eq!(sorted_ids(&mutant), (0..12).collect::<Vec<_>>());
            assert_eq!(mutant.rotation.len(), 12);
        }
    }

    #[test]
    fn test_mutate_does_not_touch_source() {
        let mut rng = StdRng::seed_from_u64(2);
        let ga = optimizer(8, GaConfig::default().with_mutation_rate(100), &mut rng);
        let before = ga.population()[0].clone();
        let _ = ga.mutate(&ga.population()[0], &mut rng);
        assert_eq!(ga.population()[0], before);
    }

    #[test]
    fn test_mate_preserves_ids() {
        let mut rng = StdRng::seed_from_u64(3);
        let ga = optimizer(9, GaConfig::default().with_mutation_rate(50), &mut rng);
        let male = ga.population()[1].clone();
        let mut female = ga.population()[2].clone();
        female.placement.reverse();
        female.rotation.reverse();

        for _ in 0..50 {
            let (a, b) = ga.mate(&male, &female, &mut rng);
            assert_eq!(sorted_ids(&a), (0..9).collect::<Vec<_>>());
            assert_eq!(sorted_ids(&b), (0..9).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_crossover_keeps_rotation_with_id() {
        let male = Phenotype::new(vec![0, 1, 2, 3], vec![0.0, 90.0, 180.0, 270.0]);
        let female = Phenotype::new(vec![3, 2, 1, 0], vec![30.0, 20.0, 10.0, 0.0]);

        let child = crossover(&male, &female, 2);
        assert_eq!(child.placement, vec![0, 1, 3, 2]);
        assert_eq!(child.rotation, vec![0.0, 90.0, 30.0, 20.0]);
    }

    #[test]
    fn test_random_angle_single_rotation() {
        let mut rng = StdRng::seed_from_u64(4);
        let config = GaConfig::default().with_rotations(1);
        let ga = GeneticOptimizer::new(vec![0, 1], config, |id, _| id == 0, &mut rng);

        for _ in 0..20 {
            assert_eq!(ga.random_angle(0, &mut rng), 0.0);
            assert_eq!(ga.random_angle(1, &mut rng), 0.0);
        }
    }

    #[test]
    fn test_random_angle_respects_fit() {
        let mut rng = StdRng::seed_from_u64(5);
        let config = GaConfig::default().with_rotations(4);
        let ga = GeneticOptimizer::new(
            vec![0],
            config,
            |_, angle| (angle - 90.0).abs() < 1e-9 || (angle - 270.0).abs() < 1e-9,
            &mut rng,
        );

        for _ in 0..50 {
            let angle = ga.random_angle(0, &mut rng);
            assert!(angle == 90.0 || angle == 270.0, "unexpected angle {}", angle);
        }
    }

    #[test]
    fn test_random_angle_none_fit() {
        let mut rng = StdRng::seed_from_u64(6);
        let ga = GeneticOptimizer::new(vec![0], GaConfig::default(), |_, _| false, &mut rng);
        assert_eq!(ga.random_angle(0, &mut rng), 0.0);
    }

    #[test]
    fn test_weighted_index_excludes() {
        let mut rng = StdRng::seed_from_u64(8);
        let ga = optimizer(5, GaConfig::default(), &mut rng);
        for _ in 0..200 {
            assert_ne!(ga.random_weighted_index(Some(0), &mut rng), 0);
        }
    }

    #[test]
    fn test_weighted_index_prefers_front() {
        let mut rng = StdRng::seed_from_u64(9);
        let ga = optimizer(5, GaConfig::default(), &mut rng);
        let mut counts = vec![0usize; ga.population().len()];
        for _ in 0..5000 {
            counts[ga.random_weighted_index(None, &mut rng)] += 1;
        }
        assert!(counts[0] > counts[9]);
        assert!(counts[1] > counts[8]);
    }

    #[test]
    fn test_generation_elitism() {
        let mut rng = StdRng::seed_from_u64(10);
        let config = GaConfig::default().with_population_size(7);
        let mut ga = optimizer(6, config, &mut rng);

        for round in 0..5 {
            for i in 0..ga.population().len() {
                if ga.population()[i].fitness.is_none() {
                    let fitness = rng.gen_range(1.0..10.0);
                    ga.set_fitness(i, fitness);
                }
            }
            let best_before = ga.best().and_then(|p| p.fitness).unwrap();

            ga.generation(&mut rng);

            assert_eq!(ga.population().len(), 7, "round {}", round);
            let best_after = ga.best().and_then(|p| p.fitness).unwrap();
            assert!(best_after <= best_before);
            assert_eq!(ga.population()[0].fitness, Some(best_before));
            assert_eq!(ga.first_unevaluated(), Some(1));
        }
        assert_eq!(ga.generation_count(), 5);
    }

    #[test]
    fn test_generation_children_are_permutations() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut ga = optimizer(10, GaConfig::default().with_mutation_rate(30), &mut rng);
        for i in 0..ga.population().len() {
            ga.set_fitness(i, i as f64);
        }
        ga.generation(&mut rng);
        for individual in ga.population() {
            assert_eq!(sorted_ids(individual), (0..10).collect::<Vec<_>>());
        }
    }
}
