//! Nesting controller.
//!
//! [`NestingController`] owns the prepared bin and parts, the genetic
//! optimizer and the NFP cache. Each round it picks an individual, computes
//! the NFPs it is missing on the worker pool, places it and feeds the fitness
//! back to the optimizer. Rounds can be driven synchronously with
//! [`NestingController::step`] or on a background thread with
//! [`NestingController::start`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use orbinest_core::{
    BatchProgress, Config, ConfigUpdate, DisplayCallback, Error, GaConfig, GeneticOptimizer,
    NestReport, NestResult, ParallelExecutor, Phenotype, ProgressCallback, ProgressInfo, Result,
};

use crate::boundary::Bin;
use crate::geometry::{polygon_area, polygon_bounds, rotate_polygon, Point};
use crate::nfp_cache::{required_keys, NfpCache, NfpKey, NfpPair};
use crate::placement::PlacementEngine;
use crate::tree::PartTree;
use crate::worker::{compute_nfp, NfpOptions};

/// How often the background driver checks for a finished round.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Inputs shared by every round until the configuration changes.
#[derive(Debug)]
struct Workspace {
    config: Config,
    bin: Bin,
    parts: PartTree,
    executor: ParallelExecutor,
}

impl Workspace {
    fn prepare(parts: &[Vec<Point>], bin: &[Point], config: Config) -> Result<Self> {
        let bin = Bin::prepare(bin, &config)?;
        let tree = PartTree::prepare(parts, &config);
        if tree.is_empty() {
            return Err(Error::InvalidGeometry("no part survived cleaning".into()));
        }
        let executor = ParallelExecutor::new(config.worker_limit())?;

        log::debug!(
            "prepared {} parts for a {:.3} x {:.3} bin on {} workers",
            tree.len(),
            bin.width(),
            bin.height(),
            executor.limit()
        );

        Ok(Self {
            config,
            bin,
            parts: tree,
            executor,
        })
    }

    fn options(&self) -> NfpOptions {
        NfpOptions::from(&self.config)
    }

    fn engine(&self) -> PlacementEngine<'_> {
        PlacementEngine::new(&self.bin, &self.parts, &self.config)
    }

    /// The polygons behind a missing key.
    fn pair(&self, key: NfpKey) -> Option<NfpPair> {
        let a = if key.inside {
            self.bin.polygon().clone()
        } else {
            self.parts.polygon_by_id(key.a)?
        };
        let b = self.parts.polygon_by_id(key.b)?;
        Some(NfpPair { key, a, b })
    }

    fn pairs(&self, keys: Vec<NfpKey>) -> Vec<NfpPair> {
        keys.into_iter().filter_map(|key| self.pair(key)).collect()
    }

    /// Computes every pair and adds the usable NFPs to `cache`.
    fn fill(
        &self,
        cache: &mut NfpCache,
        pairs: Vec<NfpPair>,
        progress: Option<BatchProgress<'_>>,
    ) -> Result<()> {
        let options = self.options();
        let computed = self
            .executor
            .map(pairs, |pair| compute_nfp(pair, &options), progress)?;
        cache.extend(
            computed
                .into_iter()
                .filter_map(|(pair, nfp)| nfp.map(|rings| (pair.key, rings))),
        );
        Ok(())
    }

    fn report(&self, result: &NestResult) -> NestReport {
        let placed_area: f64 = result
            .placements()
            .filter_map(|placement| self.parts.by_id(placement.part_id))
            .map(|node| polygon_area(&node.ring).abs())
            .sum();
        let used_area = result.bins_used() as f64 * self.bin.area();

        NestReport {
            placements: result.bins.clone(),
            efficiency: if used_area > 0.0 {
                placed_area / used_area
            } else {
                0.0
            },
            parts_placed: result.placed_count(),
            parts_total: self.parts.len(),
            fitness: result.fitness,
        }
    }
}

/// Seeds the optimizer with parts ordered by decreasing area.
fn seed_optimizer(workspace: &Workspace, rng: &mut StdRng) -> GeneticOptimizer {
    let mut adam: Vec<(i32, f64)> = workspace
        .parts
        .roots()
        .iter()
        .map(|&root| {
            let node = workspace.parts.node(root);
            (node.id, polygon_area(&node.ring).abs())
        })
        .collect();
    adam.sort_by(|a, b| b.1.total_cmp(&a.1));

    let fits = |id: i32, angle: f64| {
        workspace
            .parts
            .by_id(id)
            .and_then(|node| polygon_bounds(&rotate_polygon(&node.ring, angle)))
            .is_some_and(|bounds| workspace.bin.admits(&bounds))
    };

    GeneticOptimizer::new(
        adam.into_iter().map(|(id, _)| id).collect(),
        GaConfig::from(&workspace.config),
        fits,
        rng,
    )
}

fn new_rng(config: &Config) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// One individual selected for evaluation, with the work it still needs.
#[derive(Debug)]
struct Round {
    index: usize,
    individual: Phenotype,
    cache: NfpCache,
    pairs: Vec<NfpPair>,
    workspace: Arc<Workspace>,
}

impl Round {
    fn execute(mut self, progress: Option<BatchProgress<'_>>) -> Result<Outcome> {
        let pairs = std::mem::take(&mut self.pairs);
        self.workspace.fill(&mut self.cache, pairs, progress)?;
        let result = self.workspace.engine().place(&self.individual, &self.cache);

        Ok(Outcome {
            index: self.index,
            cache: self.cache,
            result,
            workspace: self.workspace,
        })
    }
}

/// A finished round, not yet committed to the controller.
#[derive(Debug)]
struct Outcome {
    index: usize,
    cache: NfpCache,
    result: NestResult,
    workspace: Arc<Workspace>,
}

/// Drives the genetic search over placements of one set of parts in one bin.
#[derive(Debug)]
pub struct NestingController {
    source_parts: Vec<Vec<Point>>,
    source_bin: Vec<Point>,
    workspace: Arc<Workspace>,
    optimizer: Option<GeneticOptimizer>,
    cache: NfpCache,
    best: Option<NestReport>,
    evaluated: usize,
    rng: StdRng,
}

impl NestingController {
    /// Prepares `parts` and `bin` for nesting.
    ///
    /// Fails with [`Error::InvalidBoundary`] if the bin is unusable and with
    /// [`Error::InvalidGeometry`] if no part survives cleaning.
    pub fn new(parts: &[Vec<Point>], bin: &[Point], config: Config) -> Result<Self> {
        let rng = new_rng(&config);
        let workspace = Workspace::prepare(parts, bin, config)?;

        Ok(Self {
            source_parts: parts.to_vec(),
            source_bin: bin.to_vec(),
            workspace: Arc::new(workspace),
            optimizer: None,
            cache: NfpCache::new(),
            best: None,
            evaluated: 0,
            rng,
        })
    }

    pub fn config(&self) -> &Config {
        &self.workspace.config
    }

    pub fn bin(&self) -> &Bin {
        &self.workspace.bin
    }

    pub fn parts(&self) -> &PartTree {
        &self.workspace.parts
    }

    /// Best result so far.
    pub fn best(&self) -> Option<&NestReport> {
        self.best.as_ref()
    }

    /// The optimizer, once the first round has created it.
    pub fn optimizer(&self) -> Option<&GeneticOptimizer> {
        self.optimizer.as_ref()
    }

    /// Number of NFPs carried by the cache.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Individuals evaluated since the last reset.
    pub fn evaluated(&self) -> usize {
        self.evaluated
    }

    /// Applies a configuration update and starts over.
    ///
    /// The bin and parts are prepared again under the new configuration, and
    /// the best result, the NFP cache and the optimizer are discarded.
    /// Returns the number of fields that changed.
    pub fn set_config(&mut self, update: &ConfigUpdate) -> Result<usize> {
        let mut config = self.workspace.config.clone();
        let changed = config.apply(update);
        let workspace = Workspace::prepare(&self.source_parts, &self.source_bin, config)?;

        self.rng = new_rng(&workspace.config);
        self.workspace = Arc::new(workspace);
        self.optimizer = None;
        self.cache = NfpCache::new();
        self.best = None;
        self.evaluated = 0;

        log::info!("configuration updated ({} fields), search restarted", changed);
        Ok(changed)
    }

    /// Evaluates one individual.
    ///
    /// Returns the new best report if the individual improved on it. A failed
    /// worker batch discards the round and is returned as an error.
    pub fn step(&mut self) -> Result<Option<NestReport>> {
        let round = self.begin_round();
        let outcome = round.execute(None).map_err(|err| {
            log::error!("nesting round failed: {}", err);
            err
        })?;
        Ok(self.finish_round(outcome))
    }

    /// Evaluates every unevaluated individual of the population.
    ///
    /// NFPs for all of them are computed in one batch, then the placements
    /// run in parallel. Breeds a new generation first if the whole population
    /// is already evaluated.
    pub fn step_generation(&mut self) -> Result<Option<NestReport>> {
        let workspace = Arc::clone(&self.workspace);
        let optimizer = self
            .optimizer
            .get_or_insert_with(|| seed_optimizer(&workspace, &mut self.rng));
        if optimizer.first_unevaluated().is_none() {
            optimizer.generation(&mut self.rng);
        }

        let batch: Vec<(usize, Phenotype)> = optimizer
            .unevaluated()
            .into_iter()
            .map(|index| (index, optimizer.population()[index].clone()))
            .collect();
        let keys: Vec<NfpKey> = batch
            .iter()
            .flat_map(|(_, individual)| required_keys(individual))
            .collect();

        let (mut cache, missing) = self.cache.carry_over(&keys);
        let pairs = workspace.pairs(missing);
        workspace
            .fill(&mut cache, pairs, None)
            .map_err(|err| {
                log::error!("NFP batch failed: {}", err);
                err
            })?;

        let engine = workspace.engine();
        let placed = workspace
            .executor
            .map(batch, |(_, individual)| engine.place(individual, &cache), None)
            .map_err(|err| {
                log::error!("placement batch failed: {}", err);
                err
            })?;

        self.cache = cache;
        let mut improved = None;
        for ((index, _), result) in placed {
            if let Some(optimizer) = self.optimizer.as_mut() {
                optimizer.set_fitness(index, result.fitness);
            }
            self.evaluated += 1;
            if let Some(report) = self.record(result) {
                improved = Some(report);
            }
        }

        Ok(improved)
    }

    /// Runs `generations` calls of [`NestingController::step_generation`]
    /// and returns the best result.
    pub fn run(&mut self, generations: usize) -> Result<Option<NestReport>> {
        for _ in 0..generations {
            self.step_generation()?;
        }
        Ok(self.best.clone())
    }

    /// World-space outlines of a report, per bin.
    ///
    /// Each placed part contributes its input ring followed by every ring
    /// nested in it, flagged as holes at alternating depths. The rings are the
    /// ones passed to [`NestingController::new`], without cleaning or spacing,
    /// moved into the frame of the bin ring.
    pub fn apply_placement(&self, report: &NestReport) -> Vec<Vec<PlacedOutline>> {
        let parts = &self.workspace.parts;
        let (ox, oy) = self.workspace.bin.origin();

        report
            .placements
            .iter()
            .map(|bin| {
                let mut outlines = Vec::new();
                for placement in bin {
                    let Some(index) = parts.index_of(placement.part_id) else {
                        continue;
                    };
                    let transform = |ring: &[Point]| -> Vec<Point> {
                        ring.iter()
                            .map(|&p| {
                                let (x, y) = placement.transform_point(p);
                                (x + ox, y + oy)
                            })
                            .collect()
                    };

                    outlines.push(PlacedOutline {
                        part_id: placement.part_id,
                        points: transform(self.source_ring(index)),
                        is_hole: false,
                    });
                    for (child, is_hole) in parts.flatten(index) {
                        outlines.push(PlacedOutline {
                            part_id: placement.part_id,
                            points: transform(self.source_ring(child)),
                            is_hole,
                        });
                    }
                }
                outlines
            })
            .collect()
    }

    /// Runs rounds on a background thread until stopped.
    ///
    /// `progress` is called on every poll; `display` after every committed
    /// round with `Some` report on improvement and `None` otherwise.
    pub fn start(
        self,
        progress: Option<ProgressCallback>,
        display: Option<DisplayCallback>,
    ) -> NestRunner {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("orbinest-driver".into())
            .spawn(move || drive(self, flag, progress, display));

        match handle {
            Ok(handle) => NestRunner {
                running,
                handle: Some(handle),
            },
            Err(err) => {
                log::error!("failed to spawn nesting driver: {}", err);
                running.store(false, Ordering::SeqCst);
                NestRunner {
                    running,
                    handle: None,
                }
            }
        }
    }

    /// The caller's ring behind tree node `index`.
    fn source_ring(&self, index: usize) -> &[Point] {
        let source = self.workspace.parts.node(index).source;
        self.source_parts.get(source).map_or(&[], Vec::as_slice)
    }

    fn progress_info(&self, fraction: f64) -> ProgressInfo {
        let generation = self
            .optimizer
            .as_ref()
            .map_or(0, GeneticOptimizer::generation_count);
        ProgressInfo::new(fraction)
            .with_counts(generation, self.evaluated)
            .with_best_fitness(self.best.as_ref().map(|best| best.fitness))
    }

    /// Picks the next individual and splits the cache for it.
    fn begin_round(&mut self) -> Round {
        let workspace = Arc::clone(&self.workspace);
        let optimizer = self
            .optimizer
            .get_or_insert_with(|| seed_optimizer(&workspace, &mut self.rng));

        let index = match optimizer.first_unevaluated() {
            Some(index) => index,
            None => {
                optimizer.generation(&mut self.rng);
                optimizer.first_unevaluated().unwrap_or(0)
            }
        };
        let individual = optimizer.population()[index].clone();

        let (cache, missing) = self.cache.carry_over(&required_keys(&individual));
        let pairs = workspace.pairs(missing);

        Round {
            index,
            individual,
            cache,
            pairs,
            workspace,
        }
    }

    /// Commits a finished round. Rounds from before a reset are dropped.
    fn finish_round(&mut self, outcome: Outcome) -> Option<NestReport> {
        if !Arc::ptr_eq(&outcome.workspace, &self.workspace) {
            log::debug!("dropping round started under a previous configuration");
            return None;
        }

        self.cache = outcome.cache;
        if let Some(optimizer) = self.optimizer.as_mut() {
            optimizer.set_fitness(outcome.index, outcome.result.fitness);
        }
        self.evaluated += 1;
        self.record(outcome.result)
    }

    fn record(&mut self, result: NestResult) -> Option<NestReport> {
        log::debug!(
            "evaluated individual: fitness {:.6}, {} bins, {} unplaced",
            result.fitness,
            result.bins_used(),
            result.unplaced.len()
        );

        if self
            .best
            .as_ref()
            .is_some_and(|best| result.fitness >= best.fitness)
        {
            return None;
        }

        let report = self.workspace.report(&result);
        log::info!(
            "new best: fitness {:.6}, {}/{} parts in {} bins, efficiency {:.1}%",
            report.fitness,
            report.parts_placed,
            report.parts_total,
            report.placements.len(),
            report.efficiency * 100.0
        );
        self.best = Some(report.clone());
        Some(report)
    }
}

/// One ring of a placed part, in bin coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOutline {
    pub part_id: i32,
    pub points: Vec<Point>,
    pub is_hole: bool,
}

/// Handle to a controller running on a background thread.
#[derive(Debug)]
pub struct NestRunner {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<NestingController>>>,
}

impl NestRunner {
    /// Whether the driver is still dispatching rounds.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops dispatching. A round already in flight finishes but its result
    /// is discarded.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Waits for the driver and returns the controller.
    ///
    /// Does not stop the driver; call [`NestRunner::stop`] first. Returns the
    /// worker error if a round failed.
    pub fn join(mut self) -> Result<NestingController> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| Error::Internal("nesting driver was never started".into()))?;
        handle
            .join()
            .map_err(|_| Error::Internal("nesting driver panicked".into()))?
    }
}

impl Drop for NestRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn drive(
    mut controller: NestingController,
    running: Arc<AtomicBool>,
    progress: Option<ProgressCallback>,
    display: Option<DisplayCallback>,
) -> Result<NestingController> {
    let completed = Arc::new(AtomicUsize::new(0));
    let mut total = 0;
    let mut in_flight: Option<JoinHandle<Result<Outcome>>> = None;

    while running.load(Ordering::SeqCst) {
        if in_flight.as_ref().is_some_and(JoinHandle::is_finished) {
            let joined = in_flight.take().map(JoinHandle::join);
            match joined {
                Some(Ok(Ok(outcome))) => {
                    let improved = controller.finish_round(outcome);
                    if let Some(display) = &display {
                        display(improved);
                    }
                }
                Some(Ok(Err(err))) => {
                    log::error!("nesting round failed, stopping: {}", err);
                    running.store(false, Ordering::SeqCst);
                    return Err(err);
                }
                Some(Err(_)) => {
                    running.store(false, Ordering::SeqCst);
                    return Err(Error::Worker("nesting round panicked".into()));
                }
                None => {}
            }
        }

        if in_flight.is_none() {
            let round = controller.begin_round();
            total = round.pairs.len();
            completed.store(0, Ordering::Relaxed);

            let counter = Arc::clone(&completed);
            in_flight = Some(thread::spawn(move || {
                let report = |done: usize, _total: usize| counter.store(done, Ordering::Relaxed);
                round.execute(Some(&report))
            }));
        }

        if let Some(progress) = &progress {
            let fraction = if total == 0 {
                1.0
            } else {
                completed.load(Ordering::Relaxed) as f64 / total as f64
            };
            progress(controller.progress_info(fraction));
        }

        thread::sleep(POLL_INTERVAL);
    }

    // let the in-flight round finish; its result is not committed
    if let Some(handle) = in_flight {
        let _ = handle.join();
    }
    if let Some(progress) = &progress {
        progress(controller.progress_info(1.0).finished());
    }

    Ok(controller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::Mutex;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Vec<Point> {
        vec![(x, y), (x + w, y), (x + w, y + h), (x, y + h)]
    }

    fn config() -> Config {
        Config::default()
            .with_rotations(1)
            .with_population_size(4)
            .with_threads(2)
            .with_seed(7)
    }

    #[test]
    fn test_new_rejects_bad_input() {
        let parts = vec![rect(0.0, 0.0, 4.0, 4.0)];
        assert!(matches!(
            NestingController::new(&parts, &[(0.0, 0.0), (1.0, 0.0)], config()),
            Err(Error::InvalidBoundary(_))
        ));
        assert!(matches!(
            NestingController::new(&[], &rect(0.0, 0.0, 10.0, 10.0), config()),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_step_single_part() {
        let parts = vec![rect(0.0, 0.0, 4.0, 4.0)];
        let mut controller =
            NestingController::new(&parts, &rect(0.0, 0.0, 10.0, 10.0), config()).unwrap();

        let report = controller.step().unwrap().expect("first round improves");
        assert_eq!(report.parts_placed, 1);
        assert_eq!(report.parts_total, 1);
        assert_relative_eq!(report.efficiency, 0.16, epsilon = 1e-9);
        // a lone part never reaches the position search
        assert_relative_eq!(report.fitness, 1.0, epsilon = 1e-9);
        assert_eq!(controller.evaluated(), 1);
        assert_eq!(controller.cache_len(), 1);

        // same individual again cannot be strictly better
        let again = controller.step().unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn test_step_generation_evaluates_population() {
        let parts = vec![rect(0.0, 0.0, 4.0, 4.0), rect(0.0, 0.0, 3.0, 2.0)];
        let mut controller =
            NestingController::new(&parts, &rect(0.0, 0.0, 10.0, 10.0), config()).unwrap();

        controller.step_generation().unwrap();
        let optimizer = controller.optimizer().unwrap();
        assert!(optimizer.first_unevaluated().is_none());
        assert_eq!(controller.evaluated(), 4);

        let best = controller.best().unwrap();
        assert!(best.all_placed());
        assert_eq!(best.placements.len(), 1);
    }

    #[test]
    fn test_run_keeps_best() {
        let parts = vec![
            rect(0.0, 0.0, 4.0, 4.0),
            rect(0.0, 0.0, 3.0, 2.0),
            rect(0.0, 0.0, 2.0, 5.0),
        ];
        let mut controller =
            NestingController::new(&parts, &rect(0.0, 0.0, 12.0, 12.0), config()).unwrap();

        let first = controller.run(1).unwrap().unwrap().fitness;
        let later = controller.run(3).unwrap().unwrap().fitness;
        assert!(later <= first);
        assert_eq!(controller.optimizer().unwrap().generation_count(), 3);
    }

    #[test]
    fn test_set_config_resets() {
        let parts = vec![rect(0.0, 0.0, 4.0, 4.0)];
        let mut controller =
            NestingController::new(&parts, &rect(0.0, 0.0, 10.0, 10.0), config()).unwrap();
        controller.step().unwrap();
        assert!(controller.best().is_some());

        let changed = controller
            .set_config(&ConfigUpdate::new().spacing(2.0))
            .unwrap();
        assert_eq!(changed, 1);
        assert!(controller.best().is_none());
        assert!(controller.optimizer().is_none());
        assert_eq!(controller.cache_len(), 0);
        assert_relative_eq!(controller.bin().width(), 8.0, epsilon = 1e-6);
    }

    #[test]
    fn test_apply_placement_maps_back() {
        let parts = vec![rect(0.0, 0.0, 4.0, 4.0)];
        let mut controller =
            NestingController::new(&parts, &rect(100.0, 50.0, 10.0, 10.0), config()).unwrap();
        let report = controller.step().unwrap().unwrap();

        let outlines = controller.apply_placement(&report);
        assert_eq!(outlines.len(), 1);
        assert_eq!(outlines[0].len(), 1);
        assert!(!outlines[0][0].is_hole);

        let bounds = polygon_bounds(&outlines[0][0].points).unwrap();
        assert_relative_eq!(bounds.x, 100.0, epsilon = 1e-6);
        assert_relative_eq!(bounds.y, 50.0, epsilon = 1e-6);
        assert_relative_eq!(bounds.width, 4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_apply_placement_includes_holes() {
        let mut hole = rect(2.0, 2.0, 4.0, 4.0);
        hole.reverse();
        let parts = vec![rect(0.0, 0.0, 8.0, 8.0), hole];
        let mut controller =
            NestingController::new(&parts, &rect(0.0, 0.0, 20.0, 20.0), config()).unwrap();
        let report = controller.step().unwrap().unwrap();

        let outlines = controller.apply_placement(&report);
        assert_eq!(outlines[0].len(), 2);
        assert!(!outlines[0][0].is_hole);
        assert!(outlines[0][1].is_hole);
        assert_eq!(outlines[0][0].part_id, outlines[0][1].part_id);
    }

    #[test]
    fn test_runner_reports_and_stops() {
        let parts = vec![rect(0.0, 0.0, 4.0, 4.0), rect(0.0, 0.0, 3.0, 3.0)];
        let controller =
            NestingController::new(&parts, &rect(0.0, 0.0, 10.0, 10.0), config()).unwrap();

        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reports);
        let display: DisplayCallback = Box::new(move |report| {
            if let Ok(mut reports) = sink.lock() {
                reports.push(report);
            }
        });

        let runner = controller.start(None, Some(display));
        assert!(runner.is_running());

        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while reports.lock().unwrap().is_empty() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        runner.stop();
        assert!(!runner.is_running());

        let controller = runner.join().unwrap();
        assert!(controller.best().is_some());

        let reports = reports.lock().unwrap();
        assert!(matches!(reports.first(), Some(Some(_))));
    }
}
