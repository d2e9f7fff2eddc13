//! # Orbinest 2D
//!
//! Irregular 2D nesting with no-fit polygons and a genetic search.
//!
//! Parts are arbitrary simple polygons, possibly with holes. Their relative
//! positions are derived from no-fit polygons (NFPs): the region where one
//! polygon's reference point makes it overlap another. A genetic optimizer
//! searches orderings and rotations; each individual is placed greedily, bin
//! after bin, at the most compact feasible NFP vertex.
//!
//! ## Features
//!
//! - Orbiting NFP tracing for inner and outer NFPs, with multi-loop search
//!   for concave parts
//! - Rectangular-bin shortcut and a Minkowski-sum fast path for outer NFPs
//! - Nesting into part holes
//! - NFP cache carried across rounds, computed on a bounded worker pool
//! - Synchronous stepping or a background driver with progress callbacks
//!
//! ## Quick Start
//!
//! ```rust
//! use orbinest_d2::{Config, NestingController};
//!
//! let square = |s: f64| vec![(0.0, 0.0), (s, 0.0), (s, s), (0.0, s)];
//! let parts = vec![square(4.0), square(3.0), square(2.0)];
//! let bin = square(10.0);
//!
//! let config = Config::new().with_rotations(4).with_seed(1);
//! let mut controller = NestingController::new(&parts, &bin, config).unwrap();
//!
//! let best = controller.run(2).unwrap().unwrap();
//! assert!(best.all_placed());
//!
//! let outlines = controller.apply_placement(&best);
//! assert_eq!(outlines.len(), 1);
//! ```
//!
//! ## Background Driver
//!
//! ```rust,no_run
//! use orbinest_d2::{Config, DisplayCallback, NestingController};
//!
//! # let parts = vec![vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]];
//! # let bin = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
//! let controller = NestingController::new(&parts, &bin, Config::default()).unwrap();
//!
//! let display: DisplayCallback = Box::new(|report| {
//!     if let Some(report) = report {
//!         println!("efficiency {:.1}%", report.efficiency * 100.0);
//!     }
//! });
//!
//! let runner = controller.start(None, Some(display));
//! std::thread::sleep(std::time::Duration::from_secs(5));
//! runner.stop();
//! let controller = runner.join().unwrap();
//! ```

pub mod boundary;
pub mod clip;
pub mod geometry;
pub mod minkowski;
pub mod nester;
pub mod nfp;
pub mod nfp_cache;
pub mod placement;
pub mod tree;
pub mod worker;

// Re-exports
pub use boundary::Bin;
pub use geometry::{Bounds, Containment, Point, Polygon, BIN_ID};
pub use nester::{NestRunner, NestingController, PlacedOutline};
pub use nfp::{no_fit_polygon, no_fit_polygon_rectangle};
pub use nfp_cache::{NfpCache, NfpKey, NfpPair};
pub use placement::PlacementEngine;
pub use tree::{PartNode, PartTree};
pub use worker::{compute_nfp, NfpOptions};
pub use orbinest_core::{
    Config, ConfigUpdate, DisplayCallback, Error, NestReport, NestResult, Placement,
    ProgressCallback, ProgressInfo, Result,
};
