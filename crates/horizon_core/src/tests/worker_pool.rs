//! Tests for the streaming worker pool
//!
//! These tests verify:
//! - Partial aggregation while a run streams
//! - Engine errors become lost batches instead of skewing success rates
//! - A panicking path loses only its own batch
//! - Progress counts only batches handed to the consumer
//! - Cancellation and dropped runs terminate without hanging

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::brokerage_snapshot;
use crate::config::{ReturnMode, SimOptions};
use crate::error::SimulationError;
use crate::model::HistoricalDataset;
use crate::simulation::{MonteCarloAggregator, SimulationRequest};
use crate::worker::{BatchMessage, SimulationWorker};

fn request(paths: usize, years: f64, workers: usize) -> Arc<SimulationRequest> {
    let options = SimOptions {
        years,
        paths,
        seed: Some(77),
        batch_size: 4,
        workers,
        channel_capacity: 2,
        ..Default::default()
    };
    Arc::new(
        SimulationRequest::prepare(
            &brokerage_snapshot(&[("VTI", 250_000.0), ("BND", 250_000.0)]),
            &options,
            None,
        )
        .unwrap(),
    )
}

/// Every path arrives exactly once in some batch
#[test]
fn test_batches_cover_requested_range() {
    let request = request(50, 5.0, 3);
    let mut worker = SimulationWorker::new();
    let mut run = worker.submit(Arc::clone(&request), 10..50);
    assert_eq!(run.total_paths(), 40);

    let mut seen = vec![false; 50];
    let mut done = 0;
    while let Some(message) = run.recv() {
        match message {
            BatchMessage::Batch(batch) => {
                assert!(batch.range.len() <= 4);
                assert_eq!(batch.range.len(), batch.results.len());
                for i in batch.range {
                    assert!(!seen[i], "path {i} delivered twice");
                    seen[i] = true;
                }
            }
            BatchMessage::Failed { range, error } => panic!("lost {range:?}: {error}"),
            BatchMessage::Done { .. } => done += 1,
        }
        if run.is_finished() {
            break;
        }
    }

    assert_eq!(done, 3);
    assert!(seen[..10].iter().all(|s| !s));
    assert!(seen[10..].iter().all(|s| *s));
    assert_eq!(run.progress(), 40);
}

/// A dataset with no rows loses every batch and counts no paths
#[test]
fn test_engine_error_reports_lost_paths() {
    let options = SimOptions {
        years: 2.0,
        paths: 30,
        mode: ReturnMode::HistoricalBootstrap,
        seed: Some(1),
        batch_size: 5,
        workers: 2,
        ..Default::default()
    };
    let request = Arc::new(
        SimulationRequest::prepare(
            &brokerage_snapshot(&[("VTI", 1_000.0)]),
            &options,
            Some(Arc::new(HistoricalDataset::default())),
        )
        .unwrap(),
    );

    let mut worker = SimulationWorker::new();
    let mut run = worker.submit(Arc::clone(&request), 0..request.paths);
    let mut aggregator = MonteCarloAggregator::new(request.months());
    run.wait_into(&mut aggregator);

    let summary = aggregator.summary();
    assert!(run.is_finished());
    assert_eq!(summary.completed_paths, 0);
    assert_eq!(summary.success_probability, 0.0);
    assert_eq!(summary.lost_paths, 30);
    assert_eq!(summary.failed_batches, 2);
    assert_eq!(run.progress(), 0, "no path was delivered");
}

/// A panic inside one path fails that batch while every other batch arrives
#[test]
fn test_panicking_path_loses_only_its_batch() {
    let mut faulty = (*request(20, 3.0, 2)).clone();
    faulty.panic_at_path = Some(6);
    let request = Arc::new(faulty);

    let mut run = SimulationWorker::new().submit(Arc::clone(&request), 0..request.paths);
    let mut aggregator = MonteCarloAggregator::new(request.months());
    let mut failures = Vec::new();
    while let Some(message) = run.recv() {
        match message {
            BatchMessage::Batch(batch) => aggregator.ingest(batch),
            BatchMessage::Failed { range, error } => {
                let reported = match &error {
                    SimulationError::WorkerFailed { reason, .. } => reason.contains("path 6"),
                    _ => false,
                };
                assert!(reported, "unexpected error {error:?}");
                aggregator.record_failure(range.clone(), &error);
                failures.push(range);
            }
            BatchMessage::Done { .. } => {}
        }
        if run.is_finished() {
            break;
        }
    }

    assert_eq!(failures, vec![4..8]);
    let summary = aggregator.summary();
    assert_eq!(summary.failed_batches, 1);
    assert_eq!(summary.lost_paths, 4);
    assert_eq!(summary.completed_paths, 16);
    assert_eq!(summary.completed_paths + summary.lost_paths, 20);
    assert_eq!(run.progress(), 16);
}

/// The failure message carries the engine error
#[test]
fn test_failed_message_carries_error() {
    let options = SimOptions {
        paths: 3,
        mode: ReturnMode::HistoricalBootstrap,
        workers: 1,
        ..Default::default()
    };
    let request = Arc::new(
        SimulationRequest::prepare(
            &brokerage_snapshot(&[("VTI", 1_000.0)]),
            &options,
            Some(Arc::new(HistoricalDataset::default())),
        )
        .unwrap(),
    );
    let mut run = SimulationWorker::new().submit(request, 0..3);
    match run.recv() {
        Some(BatchMessage::Failed { range, error }) => {
            assert_eq!(range, 0..3);
            assert!(matches!(error, SimulationError::EmptyHistoricalData));
        }
        other => panic!("expected a failure, got {other:?}"),
    }
}

/// Cancelling a long run lets every worker finish promptly
#[test]
fn test_cancelled_run_finishes() {
    let request = request(200_000, 40.0, 4);
    let mut worker = SimulationWorker::new();
    let mut run = worker.submit(Arc::clone(&request), 0..request.paths);

    let mut aggregator = MonteCarloAggregator::new(request.months());
    while aggregator.completed_paths() == 0 {
        if let Some(BatchMessage::Batch(batch)) = run.recv() {
            aggregator.ingest(batch);
        }
    }
    let partial = aggregator.summary();
    assert!(partial.completed_paths > 0);
    assert!(partial.success_probability >= 0.0 && partial.success_probability <= 1.0);

    let started = Instant::now();
    run.cancel();
    assert!(run.is_cancelled());
    run.wait_into(&mut aggregator);
    assert!(run.is_finished());
    assert!(aggregator.completed_paths() < 200_000);
    assert_eq!(
        run.progress(),
        aggregator.completed_paths(),
        "progress counts only delivered batches"
    );
    assert!(started.elapsed() < Duration::from_secs(30));
}

/// Dropping an unread run with a full channel joins its threads
#[test]
fn test_dropped_run_does_not_hang() {
    let request = request(100_000, 40.0, 2);
    let mut worker = SimulationWorker::new();
    let run = worker.submit(Arc::clone(&request), 0..request.paths);
    std::thread::sleep(Duration::from_millis(20));

    let started = Instant::now();
    drop(run);
    assert!(started.elapsed() < Duration::from_secs(30));
}

/// Submitting a new run supersedes the previous one
#[test]
fn test_new_submission_cancels_previous_run() {
    let request = request(100_000, 40.0, 2);
    let mut worker = SimulationWorker::new();
    let first = worker.submit(Arc::clone(&request), 0..request.paths);
    let second = worker.submit(Arc::clone(&request), 0..8);

    assert!(first.is_cancelled());
    assert!(!second.is_cancelled());
    assert!(second.id() > first.id());
}
