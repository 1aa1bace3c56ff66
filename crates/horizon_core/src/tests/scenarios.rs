//! End-to-end scenario tests
//!
//! These tests verify:
//! - The expected-return baseline compounds once per year with annual rebalancing
//! - Zero-return portfolios keep their value through rebalancing
//! - Depleted portfolios fail and report zeros from the failure month on

use super::brokerage_snapshot;
use crate::config::{ReturnMode, ReturnParams, SimOptions, default_returns};
use crate::model::{Account, AssetArray, AssetClass, RebalanceFrequency, Snapshot};
use crate::simulation::{SimulationRequest, monte_carlo_simulate, run_path, simulate_deterministic};

fn zero_returns() -> AssetArray<ReturnParams> {
    AssetArray::splat(ReturnParams::new(0.0, 0.0))
}

/// $1M at 60/40 with 7%/3% expected returns grows to $1,054,000 in a year
#[test]
fn test_sixty_forty_one_year_baseline() {
    let snapshot = brokerage_snapshot(&[("VTI", 600_000.0), ("BND", 400_000.0)]);
    let mut returns = default_returns();
    returns[AssetClass::UsStock] = ReturnParams::new(0.07, 0.0);
    returns[AssetClass::Bonds] = ReturnParams::new(0.03, 0.0);
    let options = SimOptions {
        years: 1.0,
        inflation: Some(0.0),
        rebalance: Some(RebalanceFrequency::Annual),
        returns,
        ..Default::default()
    };

    let request = SimulationRequest::prepare(&snapshot, &options, None).unwrap();
    assert_eq!(request.months(), 12);
    assert!((request.allocation.weights[AssetClass::UsStock] - 0.6).abs() < 1e-12);

    let result = simulate_deterministic(&request);
    let expected = 1_000_000.0 * (0.6 * 1.07 + 0.4 * 1.03);
    assert!(result.success);
    assert!(
        (result.terminal - expected).abs() < 1e-3,
        "Expected {:.2}, got {:.2}",
        expected,
        result.terminal
    );
    assert_eq!(result.total.len(), 12);
    assert_eq!(result.min_drawdown, 1_000_000.0);

    // Rebalanced back to 60/40 at the year end
    let stock = result.by_class[AssetClass::UsStock][11];
    assert!((stock / result.terminal - 0.6).abs() < 1e-9);
}

/// All-zero returns with monthly rebalancing leave the total untouched
#[test]
fn test_zero_volatility_preserves_total() {
    let snapshot = brokerage_snapshot(&[("VTI", 300_000.0), ("VXUS", 150_000.0), ("BND", 50_000.0)]);
    for months in [1.0, 7.0, 30.0] {
        let options = SimOptions {
            years: months / 12.0,
            inflation: Some(0.0),
            rebalance: Some(RebalanceFrequency::Monthly),
            returns: zero_returns(),
            seed: Some(3),
            paths: 20,
            ..Default::default()
        };
        let request = SimulationRequest::prepare(&snapshot, &options, None).unwrap();
        let outcome = monte_carlo_simulate(&request).unwrap();
        assert_eq!(outcome.summary.success_probability, 1.0);
        assert!(
            (outcome.summary.median_terminal - 500_000.0).abs() < 1e-6,
            "{months} months: {}",
            outcome.summary.median_terminal
        );
    }
}

/// Spending $5k/month from $10k in cash fails in the second month
#[test]
fn test_depleted_path_reports_zeros() {
    let mut snapshot = Snapshot {
        timestamp: "2025-01-01".to_string(),
        accounts: vec![Account {
            id: "checking".to_string(),
            cash_balance: Some(10_000.0),
            ..Default::default()
        }],
        ..Default::default()
    };
    snapshot.retirement.target_date = Some("2025-01-01".to_string());
    snapshot.retirement.expected_spend_monthly = 5_000.0;

    let options = SimOptions {
        years: 1.0,
        inflation: Some(0.0),
        returns: zero_returns(),
        seed: Some(21),
        ..Default::default()
    };
    let request = SimulationRequest::prepare(&snapshot, &options, None).unwrap();
    assert_eq!(request.params.retirement_start, Some(0));

    let result = run_path(&request, 0).unwrap();
    assert!(!result.success);
    assert_eq!(result.terminal, 0.0);
    assert!(result.min_drawdown <= 0.0);

    let trajectory = result.trajectory.unwrap();
    assert_eq!(trajectory.len(), 12);
    assert_eq!(trajectory[0], 5_000.0);
    assert!(trajectory[1..].iter().all(|v| *v == 0.0), "{trajectory:?}");
}

/// Parametric runs with volatility spread the bands around the median
#[test]
fn test_parametric_bands_are_ordered() {
    let snapshot = brokerage_snapshot(&[("VTI", 800_000.0), ("BND", 200_000.0)]);
    let options = SimOptions {
        years: 10.0,
        paths: 300,
        seed: Some(5),
        mode: ReturnMode::Parametric,
        ..Default::default()
    };
    let request = SimulationRequest::prepare(&snapshot, &options, None).unwrap();
    let outcome = monte_carlo_simulate(&request).unwrap();

    assert_eq!(outcome.summary.completed_paths, 300);
    assert!(outcome.summary.p10_terminal < outcome.summary.median_terminal);
    assert!(outcome.summary.median_terminal < outcome.summary.p90_terminal);

    let bands = &outcome.trajectories;
    assert_eq!(bands.p50.len(), 120);
    for m in [0, 59, 119] {
        assert!(bands.p10[m] <= bands.p25[m]);
        assert!(bands.p25[m] <= bands.p50[m]);
        assert!(bands.p50[m] <= bands.p75[m]);
        assert!(bands.p75[m] <= bands.p90[m]);
    }
    assert_eq!(outcome.year_end.alive_fraction, vec![1.0; 10]);
}
