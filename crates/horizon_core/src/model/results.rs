//! Simulation results
//!
//! Output types produced by the path simulator and the Monte Carlo
//! aggregator. None of these are persisted by the engine.

use serde::{Deserialize, Serialize};

use super::asset_class::AssetArray;

/// Outcome of one simulated path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResult {
    /// Balance stayed above zero through the horizon
    pub success: bool,
    /// Total at the final month (0 on failure)
    pub terminal: f64,
    /// Running minimum of the total balance
    pub min_drawdown: f64,
    /// Total balance per month, when recorded
    pub trajectory: Option<Vec<f64>>,
}

/// Headline Monte Carlo statistics.
///
/// Readable at any point during a run; partial values are valid, just not
/// fully converged.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MonteSummary {
    pub success_probability: f64,
    pub median_terminal: f64,
    pub p10_terminal: f64,
    pub p90_terminal: f64,
    /// Paths ingested so far (the success-probability denominator)
    pub completed_paths: usize,
    /// Batches reported lost by workers
    pub failed_batches: usize,
    /// Paths inside lost batches
    pub lost_paths: usize,
}

/// Per-month percentile trajectories, each of length `months`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PercentileTrajectories {
    pub p10: Vec<f64>,
    pub p25: Vec<f64>,
    pub p50: Vec<f64>,
    pub p75: Vec<f64>,
    pub p90: Vec<f64>,
}

/// Year-end percentile balances and the share of paths still funded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct YearEndSeries {
    pub p10: Vec<f64>,
    pub p25: Vec<f64>,
    pub p50: Vec<f64>,
    pub p75: Vec<f64>,
    pub p90: Vec<f64>,
    /// Fraction of completed paths with a positive balance at each year end
    pub alive_fraction: Vec<f64>,
}

/// Expected-return baseline with a per-class breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeterministicResult {
    pub success: bool,
    pub terminal: f64,
    pub min_drawdown: f64,
    /// Total balance per month
    pub total: Vec<f64>,
    /// Balance per asset class per month
    pub by_class: AssetArray<Vec<f64>>,
    /// Cumulative scheduled cashflows, spend and benefits routed into the portfolio
    pub net_contributions: Vec<f64>,
}
