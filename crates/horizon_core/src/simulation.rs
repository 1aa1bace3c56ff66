//! Simulation orchestration
//!
//! A [`SimulationRequest`] resolves a snapshot and options into everything a
//! path needs. Paths are run individually ([`run_path`]), in contiguous
//! batches ([`run_batch`]) or all at once ([`monte_carlo_simulate`]), and
//! their results are folded into a [`MonteCarloAggregator`].

use std::ops::Range;
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::Serialize;

use crate::allocation::{Allocation, compute_allocation};
use crate::bootstrap::{BootstrapOptions, BootstrapSampler};
use crate::config::{ReturnMode, ReturnParams, SimOptions};
use crate::error::{Result, SimulationError};
use crate::model::{
    AssetArray, AssetClass, DeterministicResult, HistoricalDataset, MonteSummary, PathResult,
    PercentileTrajectories, Snapshot, YearEndSeries,
};
use crate::path::{PathParams, ReturnSource, simulate_path, simulate_path_detailed};
use crate::quantile::{P2Quantile, PercentileGrid};
use crate::random::{RandomContext, offset_seed};
use crate::timeline::{Timeline, build_timeline};

const DEFAULT_INFLATION: f64 = 0.02;

/// Everything needed to run any path of one simulation.
///
/// Built once per request and shared read-only by every path.
#[derive(Debug, Clone)]
pub struct SimulationRequest {
    pub params: PathParams,
    pub allocation: Allocation,
    pub timeline: Timeline,
    /// Effective mode after resolving dataset availability
    pub mode: ReturnMode,
    pub returns: AssetArray<ReturnParams>,
    pub bootstrap: BootstrapOptions,
    pub historical: Option<Arc<HistoricalDataset>>,
    /// Classes the historical dataset covers, in canonical order
    pub historical_assets: Vec<AssetClass>,
    pub seed: Option<u32>,
    pub paths: usize,
    pub batch_size: usize,
    pub workers: usize,
    pub channel_capacity: usize,
    /// Path index that panics when run, for exercising worker fault handling
    #[cfg(test)]
    pub(crate) panic_at_path: Option<usize>,
}

impl SimulationRequest {
    /// Resolve `snapshot` and `options` into a request.
    ///
    /// Historical mode without a dataset falls back to parametric returns. A
    /// dataset with no rows is accepted here and fails when a path runs.
    pub fn prepare(
        snapshot: &Snapshot,
        options: &SimOptions,
        historical: Option<Arc<HistoricalDataset>>,
    ) -> Result<Self> {
        options.validate()?;

        let allocation = compute_allocation(snapshot);
        let timeline = build_timeline(snapshot, options.years);
        let assumptions = snapshot.assumptions.as_ref();

        let inflation = options
            .inflation
            .or_else(|| assumptions.and_then(|a| a.inflation_pct))
            .unwrap_or(DEFAULT_INFLATION);
        let rebalance = options
            .rebalance
            .or_else(|| {
                assumptions
                    .and_then(|a| a.rebalancing.as_ref())
                    .and_then(|r| r.frequency)
            })
            .unwrap_or_default();

        let spend_monthly = snapshot.retirement.expected_spend_monthly.max(0.0);
        let benefit_monthly = snapshot
            .social_security
            .iter()
            .map(|ss| ss.monthly_amount)
            .fold(0.0, f64::max);

        let mode = match (options.mode, &historical) {
            (ReturnMode::HistoricalBootstrap, None) => {
                tracing::warn!("Historical bootstrap requested without a dataset, using parametric returns");
                ReturnMode::Parametric
            }
            (mode, _) => mode,
        };

        let historical_assets = historical
            .as_deref()
            .map(|data| {
                AssetClass::ALL
                    .into_iter()
                    .filter(|class| data.covers(*class))
                    .collect()
            })
            .unwrap_or_default();

        let params = PathParams {
            initial_total: allocation.total,
            weights: allocation.weights,
            months: timeline.months,
            inflation,
            rebalance_every: rebalance.interval_months(),
            spend_monthly,
            benefit_monthly,
            cashflows: timeline.net_cashflows_by_month(),
            retirement_start: timeline.retirement_at_month,
            benefit_start: timeline.benefit_start_month,
        };

        tracing::info!(
            months = params.months,
            paths = options.paths,
            mode = ?mode,
            total = allocation.total,
            "Prepared simulation request"
        );

        Ok(Self {
            params,
            allocation,
            timeline,
            mode,
            returns: options.returns,
            bootstrap: BootstrapOptions {
                block_months: options.bootstrap_block_months,
                jitter_sigma: options.bootstrap_jitter_sigma,
            },
            historical,
            historical_assets,
            seed: options.seed,
            paths: options.paths,
            batch_size: options.batch_size,
            workers: options.workers,
            channel_capacity: options.channel_capacity,
            #[cfg(test)]
            panic_at_path: None,
        })
    }

    #[must_use]
    pub fn months(&self) -> usize {
        self.params.months
    }

    /// Same request with a different monthly retirement spend.
    #[must_use]
    pub fn with_spend(&self, spend_monthly: f64) -> Self {
        let mut request = self.clone();
        request.params.spend_monthly = spend_monthly.max(0.0);
        request
    }

    /// Fresh return source for one path.
    pub fn return_source(&self, rng: &mut RandomContext) -> Result<ReturnSource> {
        match (self.mode, self.historical.as_deref()) {
            (ReturnMode::HistoricalBootstrap, Some(dataset)) => {
                let sampler = BootstrapSampler::new(
                    dataset,
                    self.params.months,
                    &self.historical_assets,
                    self.bootstrap,
                    rng,
                )?;
                Ok(ReturnSource::Historical {
                    sampler,
                    fallback: self.returns,
                })
            }
            _ => Ok(ReturnSource::Parametric(self.returns)),
        }
    }

    /// Contiguous path ranges of at most `batch_size` covering `range`.
    #[must_use]
    pub fn batch_ranges(&self, range: Range<usize>) -> Vec<Range<usize>> {
        let size = self.batch_size.max(1);
        range
            .clone()
            .step_by(size)
            .map(|start| start..(start + size).min(range.end))
            .collect()
    }
}

/// Expected-return baseline: one path with zero-variance returns.
#[must_use]
pub fn simulate_deterministic(request: &SimulationRequest) -> DeterministicResult {
    let mut source = ReturnSource::Deterministic(request.returns);
    let mut rng = RandomContext::seeded(request.seed.unwrap_or_default());
    simulate_path_detailed(&request.params, &mut source, &mut rng)
}

/// Run path `index` of the request, recording its trajectory.
///
/// The path's randomness depends only on the base seed and `index`.
pub fn run_path(request: &SimulationRequest, index: usize) -> Result<PathResult> {
    let offset = u32::try_from(index).map_err(|_| {
        SimulationError::Config(format!("path index {index} exceeds the seedable range"))
    })?;
    injected_panic(request, index);
    let mut rng = RandomContext::new(offset_seed(request.seed, offset));
    let mut source = request.return_source(&mut rng)?;
    Ok(simulate_path(&request.params, &mut source, &mut rng, true))
}

#[cfg(test)]
fn injected_panic(request: &SimulationRequest, index: usize) {
    if request.panic_at_path == Some(index) {
        panic!("injected fault at path {index}");
    }
}

#[cfg(not(test))]
#[inline(always)]
fn injected_panic(_request: &SimulationRequest, _index: usize) {}

/// Results for a contiguous range of path indices
#[derive(Debug, Clone)]
pub struct PathBatch {
    pub range: Range<usize>,
    pub results: Vec<PathResult>,
}

pub fn run_batch(request: &SimulationRequest, range: Range<usize>) -> Result<PathBatch> {
    let results = range
        .clone()
        .map(|i| run_path(request, i))
        .collect::<Result<Vec<_>>>()?;
    Ok(PathBatch { range, results })
}

/// Folds completed paths into running statistics.
///
/// Not thread-safe; a single consumer owns it and ingests batches in any
/// order.
#[derive(Debug, Clone)]
pub struct MonteCarloAggregator {
    months: usize,
    trajectories: PercentileGrid,
    year_end: PercentileGrid,
    /// Month index sampled for each year end
    year_end_months: Vec<usize>,
    alive: Vec<usize>,
    terminal: [P2Quantile; 3],
    successes: usize,
    completed: usize,
    failed_batches: usize,
    lost_paths: usize,
}

impl MonteCarloAggregator {
    #[must_use]
    pub fn new(months: usize) -> Self {
        let years = months.div_ceil(12);
        let year_end_months = (0..years)
            .map(|y| ((y + 1) * 12 - 1).min(months.saturating_sub(1)))
            .collect();
        Self {
            months,
            trajectories: PercentileGrid::bands(months),
            year_end: PercentileGrid::bands(years),
            year_end_months,
            alive: vec![0; years],
            terminal: P2Quantile::deciles(),
            successes: 0,
            completed: 0,
            failed_batches: 0,
            lost_paths: 0,
        }
    }

    #[must_use]
    pub fn months(&self) -> usize {
        self.months
    }

    pub fn ingest(&mut self, batch: PathBatch) {
        for result in &batch.results {
            self.ingest_path(result);
        }
    }

    pub fn ingest_path(&mut self, result: &PathResult) {
        self.completed += 1;
        if result.success {
            self.successes += 1;
        }
        for estimator in &mut self.terminal {
            estimator.add(result.terminal);
        }

        if let Some(trajectory) = &result.trajectory {
            self.trajectories.add_trajectory(trajectory);
            let year_ends: Vec<f64> = self
                .year_end_months
                .iter()
                .map(|&m| trajectory.get(m).copied().unwrap_or(0.0))
                .collect();
            for (alive, value) in self.alive.iter_mut().zip(&year_ends) {
                if *value > 0.0 {
                    *alive += 1;
                }
            }
            self.year_end.add_trajectory(&year_ends);
        }
    }

    /// Count a lost batch. Its paths never enter the success denominator.
    pub fn record_failure(&mut self, range: Range<usize>, error: &SimulationError) {
        tracing::warn!(
            start = range.start,
            end = range.end,
            error = %error,
            "Batch lost"
        );
        self.failed_batches += 1;
        self.lost_paths += range.len();
    }

    #[must_use]
    pub fn completed_paths(&self) -> usize {
        self.completed
    }

    #[must_use]
    pub fn successes(&self) -> usize {
        self.successes
    }

    #[must_use]
    pub fn summary(&self) -> MonteSummary {
        let [p10, p50, p90] = &self.terminal;
        let success_probability = if self.completed > 0 {
            self.successes as f64 / self.completed as f64
        } else {
            0.0
        };
        MonteSummary {
            success_probability,
            median_terminal: finite_or_zero(p50.get()),
            p10_terminal: finite_or_zero(p10.get()),
            p90_terminal: finite_or_zero(p90.get()),
            completed_paths: self.completed,
            failed_batches: self.failed_batches,
            lost_paths: self.lost_paths,
        }
    }

    #[must_use]
    pub fn trajectories(&self) -> PercentileTrajectories {
        let grid = &self.trajectories;
        PercentileTrajectories {
            p10: grid.series(0),
            p25: grid.series(1),
            p50: grid.series(2),
            p75: grid.series(3),
            p90: grid.series(4),
        }
    }

    #[must_use]
    pub fn year_end(&self) -> YearEndSeries {
        let grid = &self.year_end;
        let alive_fraction = self
            .alive
            .iter()
            .map(|&a| {
                if self.completed > 0 {
                    a as f64 / self.completed as f64
                } else {
                    0.0
                }
            })
            .collect();
        YearEndSeries {
            p10: grid.series(0),
            p25: grid.series(1),
            p50: grid.series(2),
            p75: grid.series(3),
            p90: grid.series(4),
            alive_fraction,
        }
    }

    #[must_use]
    pub fn outcome(&self) -> MonteCarloOutcome {
        MonteCarloOutcome {
            summary: self.summary(),
            trajectories: self.trajectories(),
            year_end: self.year_end(),
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Converged result of a Monte Carlo run
#[derive(Debug, Clone, Serialize)]
pub struct MonteCarloOutcome {
    pub summary: MonteSummary,
    pub trajectories: PercentileTrajectories,
    pub year_end: YearEndSeries,
}

/// Run every path of the request and aggregate them.
///
/// Batches run in parallel with the `parallel` feature and are ingested in
/// batch order. The first engine error aborts the run.
pub fn monte_carlo_simulate(request: &SimulationRequest) -> Result<MonteCarloOutcome> {
    let ranges = request.batch_ranges(0..request.paths);
    tracing::debug!(paths = request.paths, batches = ranges.len(), "Running Monte Carlo");

    #[cfg(feature = "parallel")]
    let batches = ranges
        .into_par_iter()
        .map(|range| run_batch(request, range))
        .collect::<Result<Vec<_>>>()?;

    #[cfg(not(feature = "parallel"))]
    let batches = ranges
        .into_iter()
        .map(|range| run_batch(request, range))
        .collect::<Result<Vec<_>>>()?;

    let mut aggregator = MonteCarloAggregator::new(request.months());
    for batch in batches {
        aggregator.ingest(batch);
    }
    Ok(aggregator.outcome())
}
