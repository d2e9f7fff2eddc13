//! Nesting configuration and progress reporting.

use crate::result::NestReport;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tolerance below which a curve tolerance update is treated as zero and ignored.
const CURVE_TOLERANCE_EPSILON: f64 = 1e-9;

/// Options that drive a nesting run.
///
/// Construct with [`Config::new`] and the `with_*` builders, or merge a loosely
/// validated [`ConfigUpdate`] with [`Config::apply`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Flattening/cleaning tolerance; also the arc tolerance of spacing offsets.
    pub curve_tolerance: f64,

    /// Buffer kept between parts and between parts and the bin edge.
    pub spacing: f64,

    /// Number of evenly spaced candidate angles (360 / rotations apart).
    pub rotations: usize,

    /// Number of individuals in the genetic population.
    pub population_size: usize,

    /// Per-gene mutation probability, in percent.
    pub mutation_rate: u32,

    /// Compute NFPs against part holes so small parts can nest inside them.
    pub use_holes: bool,

    /// Trace every NFP loop with the orbiting method instead of the Minkowski fast path.
    pub explore_concave: bool,

    /// Fixed-point scale applied before boolean operations.
    pub clipper_scale: f64,

    /// Worker thread limit (0 = available parallelism).
    pub threads: usize,

    /// Seed for the optimizer's RNG; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            curve_tolerance: 0.3,
            spacing: 0.0,
            rotations: 4,
            population_size: 10,
            mutation_rate: 10,
            use_holes: false,
            explore_concave: false,
            clipper_scale: 1e7,
            threads: 0,
            seed: None,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the curve tolerance.
    pub fn with_curve_tolerance(mut self, tolerance: f64) -> Self {
        self.curve_tolerance = tolerance;
        self
    }

    /// Sets the spacing between parts.
    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.spacing = spacing;
        self
    }

    /// Sets the number of candidate rotations (at least 1).
    pub fn with_rotations(mut self, rotations: usize) -> Self {
        self.rotations = rotations.max(1);
        self
    }

    /// Sets the population size (at least 3).
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size.max(3);
        self
    }

    /// Sets the mutation rate in percent (at least 1).
    pub fn with_mutation_rate(mut self, rate: u32) -> Self {
        self.mutation_rate = rate.max(1);
        self
    }

    /// Enables nesting into part holes.
    pub fn with_use_holes(mut self, use_holes: bool) -> Self {
        self.use_holes = use_holes;
        self
    }

    /// Enables multi-loop orbiting NFPs for concave parts.
    pub fn with_explore_concave(mut self, explore: bool) -> Self {
        self.explore_concave = explore;
        self
    }

    /// Sets the worker thread limit.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Sets a fixed RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Resolved worker limit.
    pub fn worker_limit(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }

    /// Merges a partial update.
    ///
    /// Only present and well-formed values are taken; anything else keeps the
    /// previous value and is logged. Returns the number of fields changed.
    pub fn apply(&mut self, update: &ConfigUpdate) -> usize {
        let mut changed = 0;

        if let Some(tolerance) = update.curve_tolerance {
            if tolerance.is_finite() && tolerance > CURVE_TOLERANCE_EPSILON {
                self.curve_tolerance = tolerance;
                changed += 1;
            } else {
                log::warn!("ignoring curve tolerance {}", tolerance);
            }
        }

        if let Some(spacing) = update.spacing {
            if spacing.is_finite() {
                self.spacing = spacing;
                changed += 1;
            } else {
                log::warn!("ignoring non-finite spacing");
            }
        }

        if let Some(rotations) = update.rotations {
            if rotations > 0 {
                self.rotations = rotations as usize;
                changed += 1;
            } else {
                log::warn!("ignoring rotations {}, must be > 0", rotations);
            }
        }

        if let Some(size) = update.population_size {
            if size > 2 {
                self.population_size = size as usize;
                changed += 1;
            } else {
                log::warn!("ignoring population size {}, must be > 2", size);
            }
        }

        if let Some(rate) = update.mutation_rate {
            if rate > 0 && rate <= u32::MAX as i64 {
                self.mutation_rate = rate as u32;
                changed += 1;
            } else {
                log::warn!("ignoring mutation rate {}, must be > 0", rate);
            }
        }

        if let Some(use_holes) = update.use_holes {
            self.use_holes = use_holes;
            changed += 1;
        }

        if let Some(explore) = update.explore_concave {
            self.explore_concave = explore;
            changed += 1;
        }

        if let Some(threads) = update.threads {
            self.threads = threads;
            changed += 1;
        }

        if let Some(seed) = update.seed {
            self.seed = Some(seed);
            changed += 1;
        }

        changed
    }
}

/// A partial configuration change.
///
/// Integer options are signed so out-of-range requests can be rejected by
/// [`Config::apply`] instead of failing to construct.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConfigUpdate {
    pub curve_tolerance: Option<f64>,
    pub spacing: Option<f64>,
    pub rotations: Option<i64>,
    pub population_size: Option<i64>,
    pub mutation_rate: Option<i64>,
    pub use_holes: Option<bool>,
    pub explore_concave: Option<bool>,
    pub threads: Option<usize>,
    pub seed: Option<u64>,
}

impl ConfigUpdate {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn curve_tolerance(mut self, value: f64) -> Self {
        self.curve_tolerance = Some(value);
        self
    }

    pub fn spacing(mut self, value: f64) -> Self {
        self.spacing = Some(value);
        self
    }

    pub fn rotations(mut self, value: i64) -> Self {
        self.rotations = Some(value);
        self
    }

    pub fn population_size(mut self, value: i64) -> Self {
        self.population_size = Some(value);
        self
    }

    pub fn mutation_rate(mut self, value: i64) -> Self {
        self.mutation_rate = Some(value);
        self
    }

    pub fn use_holes(mut self, value: bool) -> Self {
        self.use_holes = Some(value);
        self
    }

    pub fn explore_concave(mut self, value: bool) -> Self {
        self.explore_concave = Some(value);
        self
    }

    /// Parses a loose JSON object such as `{"rotations": "8", "useHoles": true}`.
    ///
    /// Keys are camelCase. Numbers may be given as JSON numbers or numeric
    /// strings; unparseable values are dropped so [`Config::apply`] keeps the
    /// previous setting.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> crate::Result<Self> {
        use serde_json::Value;

        let value: Value = serde_json::from_str(json)?;
        let Value::Object(map) = value else {
            return Err(crate::Error::ConfigError(
                "configuration must be a JSON object".into(),
            ));
        };

        let float = |key: &str| -> Option<f64> {
            match map.get(key)? {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }
        };
        let int = |key: &str| -> Option<i64> {
            match map.get(key)? {
                Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
                Value::String(s) => {
                    let s = s.trim();
                    s.parse::<i64>()
                        .ok()
                        .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
                }
                _ => None,
            }
        };
        let flag = |key: &str| -> Option<bool> {
            match map.get(key)? {
                Value::Bool(b) => Some(*b),
                Value::Number(n) => n.as_f64().map(|f| f != 0.0),
                Value::String(s) => Some(!s.is_empty()),
                Value::Null => Some(false),
                _ => Some(true),
            }
        };

        Ok(Self {
            curve_tolerance: float("curveTolerance"),
            spacing: float("spacing"),
            rotations: int("rotations"),
            population_size: int("populationSize"),
            mutation_rate: int("mutationRate"),
            use_holes: flag("useHoles"),
            explore_concave: flag("exploreConcave"),
            threads: int("threads").and_then(|t| usize::try_from(t).ok()),
            seed: int("seed").and_then(|s| u64::try_from(s).ok()),
        })
    }
}

/// Progress callback, invoked on every poll of the nesting driver.
pub type ProgressCallback = Box<dyn Fn(ProgressInfo) + Send + Sync>;

/// Result callback: `Some` on a strictly better result, `None` after a round
/// that did not improve.
pub type DisplayCallback = Box<dyn Fn(Option<NestReport>) + Send + Sync>;

/// Progress snapshot.
#[derive(Debug, Clone, Default)]
pub struct ProgressInfo {
    /// Fraction of the current round's NFP pairs that have been dispatched (0.0 - 1.0).
    pub fraction: f64,
    /// Generations completed by the optimizer.
    pub generation: u32,
    /// Individuals evaluated so far.
    pub evaluated: usize,
    /// Best fitness so far.
    pub best_fitness: Option<f64>,
    /// Whether the driver is still running.
    pub running: bool,
}

impl ProgressInfo {
    /// Creates a new progress info for a running driver.
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction,
            running: true,
            ..Default::default()
        }
    }

    /// Sets the generation/evaluation counters.
    pub fn with_counts(mut self, generation: u32, evaluated: usize) -> Self {
        self.generation = generation;
        self.evaluated = evaluated;
        self
    }

    /// Sets the best fitness.
    pub fn with_best_fitness(mut self, fitness: Option<f64>) -> Self {
        self.best_fitness = fitness;
        self
    }

    /// Marks the driver as finished.
    pub fn finished(mut self) -> Self {
        self.running = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.curve_tolerance, 0.3);
        assert_eq!(config.spacing, 0.0);
        assert_eq!(config.rotations, 4);
        assert_eq!(config.population_size, 10);
        assert_eq!(config.mutation_rate, 10);
        assert!(!config.use_holes);
        assert!(!config.explore_concave);
        assert_eq!(config.clipper_scale, 1e7);
    }

    #[test]
    fn test_apply_valid_update() {
        let mut config = Config::new();
        let update = ConfigUpdate::new()
            .rotations(8)
            .population_size(20)
            .spacing(2.5)
            .use_holes(true);

        assert_eq!(config.apply(&update), 4);
        assert_eq!(config.rotations, 8);
        assert_eq!(config.population_size, 20);
        assert_eq!(config.spacing, 2.5);
        assert!(config.use_holes);
    }

    #[test]
    fn test_apply_rejects_invalid_values() {
        let mut config = Config::new();
        let update = ConfigUpdate::new()
            .rotations(0)
            .population_size(2)
            .mutation_rate(-5)
            .curve_tolerance(0.0);

        assert_eq!(config.apply(&update), 0);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_absent_values_untouched() {
        let mut config = Config::new().with_spacing(4.0);
        config.apply(&ConfigUpdate::new().rotations(2));
        assert_eq!(config.spacing, 4.0);
        assert_eq!(config.rotations, 2);
    }

    #[test]
    fn test_builder_clamps() {
        let config = Config::new()
            .with_rotations(0)
            .with_population_size(1)
            .with_mutation_rate(0);
        assert_eq!(config.rotations, 1);
        assert_eq!(config.population_size, 3);
        assert_eq!(config.mutation_rate, 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json_loose_types() {
        let update = ConfigUpdate::from_json(
            r#"{"rotations": "8", "populationSize": 12, "spacing": "1.5", "useHoles": 1, "bogus": 3}"#,
        )
        .unwrap();
        assert_eq!(update.rotations, Some(8));
        assert_eq!(update.population_size, Some(12));
        assert_eq!(update.spacing, Some(1.5));
        assert_eq!(update.use_holes, Some(true));
        assert_eq!(update.mutation_rate, None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(ConfigUpdate::from_json("[1, 2]").is_err());
    }
}
