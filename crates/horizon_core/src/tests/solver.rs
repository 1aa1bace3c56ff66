//! Tests for the sustainable spend search

use super::brokerage_snapshot;
use crate::config::SimOptions;
use crate::simulation::SimulationRequest;
use crate::solver::{SpendSolverConfig, solve_sustainable_spend};

fn request() -> SimulationRequest {
    let mut snapshot = brokerage_snapshot(&[("VTI", 500_000.0), ("BND", 300_000.0)]);
    snapshot.retirement.target_date = Some("2025-01-01".to_string());
    snapshot.retirement.expected_spend_monthly = 3_000.0;
    let options = SimOptions {
        years: 25.0,
        seed: Some(404),
        ..Default::default()
    };
    SimulationRequest::prepare(&snapshot, &options, None).unwrap()
}

fn config(target: f64) -> SpendSolverConfig {
    let mut config = SpendSolverConfig::new(target);
    config.paths_per_eval = 60;
    config.max_iterations = 8;
    config
}

/// Demanding a higher success rate never allows a higher spend
#[test]
fn test_higher_target_never_raises_spend() {
    let request = request();
    let spends: Vec<f64> = [0.5, 0.75, 0.95]
        .into_iter()
        .map(|target| {
            solve_sustainable_spend(&request, &config(target), None)
                .unwrap()
                .spend_monthly
        })
        .collect();

    assert!(spends[0] >= spends[1], "spends {spends:?}");
    assert!(spends[1] >= spends[2], "spends {spends:?}");
}

/// The progress callback sees every evaluation
#[test]
fn test_progress_callback_per_iteration() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let solution = solve_sustainable_spend(
        &request(),
        &config(0.8),
        Some(Box::new(move |_, spend, success| {
            assert!(spend > 0.0);
            assert!((0.0..=1.0).contains(&success));
            counter.fetch_add(1, Ordering::Relaxed);
        })),
    )
    .unwrap();

    assert_eq!(calls.load(Ordering::Relaxed), solution.iterations);
    assert_eq!(solution.iterations, 8);
    assert!(!solution.converged);
}
