//! Tests for per-path reproducibility
//!
//! Path randomness depends only on the base seed and the path index, so
//! results must not change with batch size, worker count or executor.

use std::sync::Arc;

use super::brokerage_snapshot;
use crate::config::{ReturnMode, SimOptions};
use crate::error::SimulationError;
use crate::model::{AssetClass, HistoricalDataset, HistoricalMonthRow, Snapshot};
use crate::simulation::{
    MonteCarloAggregator, SimulationRequest, monte_carlo_simulate, run_batch, run_path,
};
use crate::worker::SimulationWorker;

fn stressed_snapshot() -> Snapshot {
    let mut snapshot = brokerage_snapshot(&[("VTI", 400_000.0), ("VXUS", 100_000.0)]);
    snapshot.retirement.target_date = Some("2026-01-01".to_string());
    snapshot.retirement.expected_spend_monthly = 2_800.0;
    snapshot
}

fn options(batch_size: usize, workers: usize) -> SimOptions {
    SimOptions {
        years: 25.0,
        paths: 120,
        seed: Some(2024),
        batch_size,
        workers,
        ..Default::default()
    }
}

fn synthetic_history() -> Arc<HistoricalDataset> {
    let rows = (0..360)
        .map(|i| HistoricalMonthRow {
            year: 1990 + (i / 12) as i16,
            month: (i % 12) as i8 + 1,
            returns: [
                (AssetClass::UsStock, 0.006 + 0.05 * ((i * 13 % 17) as f64 / 17.0 - 0.5)),
                (AssetClass::IntlStock, 0.005 + 0.06 * ((i * 7 % 11) as f64 / 11.0 - 0.5)),
            ]
            .into_iter()
            .collect(),
        })
        .collect();
    Arc::new(HistoricalDataset { meta: None, rows })
}

/// Path i run alone matches path i inside a batch
#[test]
fn test_isolated_path_matches_batch() {
    let request = SimulationRequest::prepare(&stressed_snapshot(), &options(16, 2), None).unwrap();
    let batch = run_batch(&request, 30..46).unwrap();

    for (offset, result) in batch.results.iter().enumerate() {
        let alone = run_path(&request, 30 + offset).unwrap();
        assert_eq!(&alone, result, "path {}", 30 + offset);
    }
}

/// Bootstrapped paths are reproducible from their index too
#[test]
fn test_bootstrap_path_is_reproducible() {
    let mut opts = options(10, 1);
    opts.mode = ReturnMode::HistoricalBootstrap;
    let request =
        SimulationRequest::prepare(&stressed_snapshot(), &opts, Some(synthetic_history())).unwrap();
    assert_eq!(request.mode, ReturnMode::HistoricalBootstrap);

    let first = run_path(&request, 17).unwrap();
    let again = run_path(&request, 17).unwrap();
    let other = run_path(&request, 18).unwrap();
    assert_eq!(first, again);
    assert_ne!(first.trajectory, other.trajectory);
}

/// Batch size and executor do not change the success count
#[test]
fn test_success_count_independent_of_batching() {
    let reference = {
        let request = SimulationRequest::prepare(&stressed_snapshot(), &options(1, 1), None).unwrap();
        monte_carlo_simulate(&request).unwrap().summary
    };
    assert_eq!(reference.completed_paths, 120);

    for batch_size in [7, 32, 500] {
        let request =
            SimulationRequest::prepare(&stressed_snapshot(), &options(batch_size, 1), None).unwrap();
        let summary = monte_carlo_simulate(&request).unwrap().summary;
        assert_eq!(summary.success_probability, reference.success_probability, "batch {batch_size}");
    }

    let mut worker = SimulationWorker::new();
    for (batch_size, workers) in [(5, 1), (9, 3), (40, 8)] {
        let request = Arc::new(
            SimulationRequest::prepare(&stressed_snapshot(), &options(batch_size, workers), None)
                .unwrap(),
        );
        let mut aggregator = MonteCarloAggregator::new(request.months());
        let mut run = worker.submit(Arc::clone(&request), 0..request.paths);
        run.wait_into(&mut aggregator);

        let summary = aggregator.summary();
        assert_eq!(summary.completed_paths, 120);
        assert_eq!(
            summary.success_probability, reference.success_probability,
            "batch {batch_size}, workers {workers}"
        );
    }
}

/// Path indices past the 32-bit seed offset are rejected instead of wrapping
/// onto an earlier path's stream
#[cfg(target_pointer_width = "64")]
#[test]
fn test_path_index_beyond_seed_range_is_rejected() {
    let request = SimulationRequest::prepare(&stressed_snapshot(), &options(8, 1), None).unwrap();

    let last = run_path(&request, u32::MAX as usize);
    assert!(last.is_ok(), "largest seedable index should run");

    let err = run_path(&request, u32::MAX as usize + 1).unwrap_err();
    assert!(matches!(err, SimulationError::Config(_)), "unexpected error {err:?}");
}
