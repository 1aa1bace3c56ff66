//! Simulation report
//!
//! Drives one full run from the command line: load inputs, run the
//! deterministic baseline, stream the Monte Carlo paths through the worker
//! pool and optionally search for a sustainable spend.

use std::sync::Arc;

use horizon_core::model::{
    AssetArray, DeterministicResult, MonteSummary, PercentileTrajectories, YearEndSeries,
};
use horizon_core::simulation::MonteCarloOutcome;
use horizon_core::solver::{SpendSolution, SpendSolverConfig, solve_sustainable_spend};
use horizon_core::timeline::PropertyMortgage;
use horizon_core::{
    BatchMessage, MonteCarloAggregator, ReturnMode, SimulationRequest, SimulationWorker,
    simulate_deterministic,
};
use serde::Serialize;

use crate::args::Cli;
use crate::input::{load_historical, load_options, load_snapshot};

/// Progress is logged roughly this many times per run
const PROGRESS_STEPS: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: String,
    pub months: usize,
    pub mode: ReturnMode,
    pub total_value: f64,
    pub weights: AssetArray<f64>,
    pub deterministic: DeterministicSummary,
    pub summary: MonteSummary,
    pub trajectories: PercentileTrajectories,
    pub year_end: YearEndSeries,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mortgages: Vec<PropertyMortgage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sustainable_spend: Option<SpendSolution>,
}

/// Expected-return baseline, reduced to its end state
#[derive(Debug, Clone, Serialize)]
pub struct DeterministicSummary {
    pub success: bool,
    pub terminal: f64,
    pub min_drawdown: f64,
    /// Balance per class at the last simulated month
    pub final_by_class: AssetArray<f64>,
}

impl From<&DeterministicResult> for DeterministicSummary {
    fn from(result: &DeterministicResult) -> Self {
        Self {
            success: result.success,
            terminal: result.terminal,
            min_drawdown: result.min_drawdown,
            final_by_class: AssetArray::from_fn(|class| {
                result.by_class[class].last().copied().unwrap_or(0.0)
            }),
        }
    }
}

/// Load the inputs named by `cli` and run every requested analysis.
pub fn run_report(cli: &Cli) -> color_eyre::Result<Report> {
    let snapshot = load_snapshot(&cli.snapshot)?;
    let mut options = load_options(cli.options.as_deref())?;
    cli.apply_overrides(&mut options);
    let historical = cli
        .historical
        .as_deref()
        .map(load_historical)
        .transpose()?
        .map(Arc::new);

    let request = Arc::new(SimulationRequest::prepare(&snapshot, &options, historical)?);

    let deterministic = simulate_deterministic(&request);
    tracing::info!(
        terminal = deterministic.terminal,
        success = deterministic.success,
        "Deterministic baseline complete"
    );

    let outcome = stream_monte_carlo(&request);
    if outcome.summary.lost_paths > 0 {
        tracing::warn!(
            lost_paths = outcome.summary.lost_paths,
            failed_batches = outcome.summary.failed_batches,
            "Some paths were lost; success probability covers completed paths only"
        );
    }

    let sustainable_spend = match cli.solve_spend {
        Some(target) => Some(solve_sustainable_spend(
            &request,
            &SpendSolverConfig::new(target),
            Some(Box::new(|iteration, spend, success| {
                tracing::info!(iteration, spend, success, "Spend search step");
            })),
        )?),
        None => None,
    };

    Ok(Report {
        generated_at: jiff::Timestamp::now().to_string(),
        months: request.months(),
        mode: request.mode,
        total_value: request.allocation.total,
        weights: request.allocation.weights,
        deterministic: DeterministicSummary::from(&deterministic),
        summary: outcome.summary,
        trajectories: outcome.trajectories,
        year_end: outcome.year_end,
        mortgages: request.timeline.mortgages.clone(),
        sustainable_spend,
    })
}

/// Run every path on the worker pool, aggregating batches as they arrive.
fn stream_monte_carlo(request: &Arc<SimulationRequest>) -> MonteCarloOutcome {
    let mut worker = SimulationWorker::new();
    let mut run = worker.submit(Arc::clone(request), 0..request.paths);
    let mut aggregator = MonteCarloAggregator::new(request.months());

    let step = (request.paths / PROGRESS_STEPS).max(1);
    let mut next_report = step;

    while let Some(message) = run.recv() {
        match message {
            BatchMessage::Batch(batch) => aggregator.ingest(batch),
            BatchMessage::Failed { range, error } => aggregator.record_failure(range, &error),
            BatchMessage::Done { worker } => tracing::debug!(run = run.id(), worker, "Worker done"),
        }

        let completed = aggregator.completed_paths();
        if completed >= next_report {
            tracing::info!(
                completed,
                total = run.total_paths(),
                success = aggregator.summary().success_probability,
                "Monte Carlo progress"
            );
            next_report = completed + step;
        }

        if run.is_finished() {
            break;
        }
    }

    aggregator.outcome()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::Parser;
    use tempfile::tempdir;

    use super::*;

    const SNAPSHOT: &str = r#"{
        "timestamp": "2025-01-01",
        "accounts": [
            {"id": "brokerage", "type": "taxable", "cash_balance": 20000,
             "holdings": [{"ticker": "VTI", "units": 1000, "price": 300},
                          {"ticker": "BND", "units": 2000, "price": 70}]}
        ],
        "real_estate": [
            {"id": "condo", "value": 250000, "mortgage_balance": 100000, "rate": 0.0, "payment": 1000}
        ],
        "retirement": {"target_date": "2027-01-01", "expected_spend_monthly": 2500}
    }"#;

    fn write_inputs(dir: &std::path::Path) -> std::path::PathBuf {
        let path = dir.join("snapshot.json");
        fs::write(&path, SNAPSHOT).unwrap();
        path
    }

    /// Options file with every field at its default, so no user file is read
    fn write_default_options(dir: &std::path::Path) -> std::path::PathBuf {
        let path = dir.join("options.json");
        fs::write(&path, "{}").unwrap();
        path
    }

    #[test]
    fn test_report_end_to_end() {
        let dir = tempdir().unwrap();
        let snapshot = write_inputs(dir.path());
        let options = dir.path().join("options.yaml");
        fs::write(&options, "years: 10\ninflation: 0.0\nbatch_size: 7\n").unwrap();

        let cli = Cli::parse_from([
            "horizon",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--options",
            options.to_str().unwrap(),
            "--paths",
            "80",
            "--seed",
            "3",
            "--workers",
            "2",
        ]);
        let report = run_report(&cli).unwrap();

        assert_eq!(report.months, 120);
        assert_eq!(report.mode, ReturnMode::Parametric);
        assert_eq!(report.summary.completed_paths, 80);
        assert_eq!(report.summary.lost_paths, 0);
        assert_eq!(report.trajectories.p50.len(), 120);
        assert_eq!(report.year_end.alive_fraction.len(), 10);
        assert!((report.weights.sum() - 1.0).abs() < 1e-9);
        assert_eq!(report.mortgages.len(), 1);
        assert!(report.sustainable_spend.is_none());

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["summary"]["success_probability"].is_number());
        assert!(json.get("sustainable_spend").is_none());
    }

    #[test]
    fn test_report_is_reproducible_for_a_seed() {
        let dir = tempdir().unwrap();
        let snapshot = write_inputs(dir.path());
        let options = write_default_options(dir.path());
        let args = |workers: &'static str| {
            Cli::parse_from([
                "horizon",
                "--snapshot",
                snapshot.to_str().unwrap(),
                "--options",
                options.to_str().unwrap(),
                "--years",
                "15",
                "--paths",
                "60",
                "--seed",
                "8",
                "--workers",
                workers,
                "--batch-size",
                "4",
            ])
        };

        let one = run_report(&args("1")).unwrap();
        let four = run_report(&args("4")).unwrap();
        assert_eq!(one.summary.success_probability, four.summary.success_probability);
        assert_eq!(one.deterministic.terminal, four.deterministic.terminal);
    }

    #[test]
    fn test_report_with_spend_search() {
        let dir = tempdir().unwrap();
        let snapshot = write_inputs(dir.path());
        let options = write_default_options(dir.path());
        let cli = Cli::parse_from([
            "horizon",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--options",
            options.to_str().unwrap(),
            "--years",
            "5",
            "--paths",
            "20",
            "--seed",
            "1",
            "--solve-spend",
            "0.9",
        ]);
        let report = run_report(&cli).unwrap();
        let solution = report.sustainable_spend.unwrap();
        assert!(solution.iterations > 0);
        assert!(solution.spend_monthly >= 0.0);
    }

    #[test]
    fn test_missing_snapshot_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let options = write_default_options(dir.path());
        let cli = Cli::parse_from([
            "horizon",
            "--snapshot",
            missing.to_str().unwrap(),
            "--options",
            options.to_str().unwrap(),
        ]);
        assert!(run_report(&cli).is_err());
    }
}
