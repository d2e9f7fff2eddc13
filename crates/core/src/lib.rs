//! # Orbinest Core
//!
//! Geometry-free machinery for the Orbinest irregular nesting engine.
//!
//! ## Core Components
//!
//! - **Configuration**: [`Config`], [`ConfigUpdate`] - validated nesting options
//! - **Genetic optimizer**: [`GeneticOptimizer`], [`Phenotype`] - orderings and
//!   rotations of parts, rank-weighted selection, single-point crossover, elitism
//! - **Parallel executor**: [`ParallelExecutor`] - bounded fan-out/fan-in with
//!   progress reporting and batch-level failure
//! - **Results**: [`Placement`], [`NestResult`], [`NestReport`]
//!
//! ## Configuration
//!
//! ```rust
//! use orbinest_core::{Config, ConfigUpdate};
//!
//! let mut config = Config::new()
//!     .with_spacing(2.0)
//!     .with_rotations(8);
//!
//! // Partial updates keep the previous value for anything invalid.
//! config.apply(&ConfigUpdate::new().population_size(1).mutation_rate(20));
//! assert_eq!(config.population_size, 10);
//! assert_eq!(config.mutation_rate, 20);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: serialization support and [`ConfigUpdate::from_json`]

pub mod error;
pub mod ga;
pub mod parallel;
pub mod result;
pub mod robust;
pub mod solver;

// Re-exports
pub use error::{Error, Result};
pub use ga::{GaConfig, GeneticOptimizer, Phenotype};
pub use parallel::{BatchProgress, ParallelExecutor};
pub use result::{NestReport, NestResult, Placement};
pub use solver::{Config, ConfigUpdate, DisplayCallback, ProgressCallback, ProgressInfo};
