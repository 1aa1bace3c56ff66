//! Sustainable spend search
//!
//! Bisection on the monthly retirement spend for the largest value whose
//! Monte Carlo success probability still meets a target. Every evaluation
//! reuses the same path seeds, so success probability is non-increasing in
//! spend and the search is well defined.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};
use crate::simulation::{SimulationRequest, monte_carlo_simulate};

/// Seed used when the request is unseeded, so evaluations share draws
const SOLVER_SEED: u32 = 0;

/// Progress callback: (iteration, spend evaluated, success probability)
pub type ProgressCallback = Box<dyn Fn(usize, f64, f64) + Send + Sync>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendSolverConfig {
    /// Required success probability, in (0, 1]
    pub target_success: f64,
    #[serde(default = "default_paths_per_eval")]
    pub paths_per_eval: usize,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Stop once the bracket is narrower than this many dollars
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default)]
    pub lower_bound: Option<f64>,
    #[serde(default)]
    pub upper_bound: Option<f64>,
}

fn default_paths_per_eval() -> usize {
    400
}

fn default_max_iterations() -> usize {
    10
}

fn default_tolerance() -> f64 {
    0.01
}

impl SpendSolverConfig {
    #[must_use]
    pub fn new(target_success: f64) -> Self {
        Self {
            target_success,
            paths_per_eval: default_paths_per_eval(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            lower_bound: None,
            upper_bound: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SpendEvaluation {
    pub spend_monthly: f64,
    pub success_probability: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpendSolution {
    /// Largest feasible spend found, rounded to whole dollars
    pub spend_monthly: f64,
    /// Success probability at that spend (0 when nothing was feasible)
    pub success_probability: f64,
    pub iterations: usize,
    pub converged: bool,
    pub history: Vec<SpendEvaluation>,
}

fn initial_bracket(request: &SimulationRequest, config: &SpendSolverConfig) -> (f64, f64) {
    let total = request.allocation.total;
    let years = (request.months() as f64 / 12.0).max(1.0 / 12.0);
    let current = request.params.spend_monthly;
    let base_guess = if current > 0.0 {
        current
    } else {
        (total * 0.04 / 12.0).max(total / (years * 12.0))
    };

    let lo = config.lower_bound.unwrap_or((base_guess / 4.0).max(0.0));
    let mut hi = config.upper_bound.unwrap_or((base_guess * 4.0).max(1000.0));
    if lo >= hi {
        hi = lo * 2.0 + 1000.0;
    }
    (lo, hi)
}

fn success_at(request: &SimulationRequest, spend: f64, paths: usize) -> Result<f64> {
    let mut candidate = request.with_spend(spend);
    candidate.paths = paths;
    candidate.seed = Some(request.seed.unwrap_or(SOLVER_SEED));
    Ok(monte_carlo_simulate(&candidate)?.summary.success_probability)
}

/// Find the largest monthly spend meeting `config.target_success`.
pub fn solve_sustainable_spend(
    request: &SimulationRequest,
    config: &SpendSolverConfig,
    progress_callback: Option<ProgressCallback>,
) -> Result<SpendSolution> {
    if !(config.target_success > 0.0 && config.target_success <= 1.0) {
        return Err(SimulationError::Config(format!(
            "target success must lie in (0, 1], got {}",
            config.target_success
        )));
    }
    if config.paths_per_eval == 0 {
        return Err(SimulationError::Config(
            "paths per evaluation must be at least 1".to_string(),
        ));
    }

    let (mut lo, mut hi) = initial_bracket(request, config);
    tracing::info!(target = config.target_success, lo, hi, "Solving sustainable spend");

    let mut best = lo;
    let mut best_success = 0.0;
    let mut history = Vec::new();
    let mut iterations = 0;

    while iterations < config.max_iterations {
        iterations += 1;
        let mid = f64::midpoint(lo, hi);
        let p = success_at(request, mid, config.paths_per_eval)?;
        history.push(SpendEvaluation {
            spend_monthly: mid,
            success_probability: p,
        });

        if let Some(ref callback) = progress_callback {
            callback(iterations, mid, p);
        }

        if p >= config.target_success {
            best = mid;
            best_success = p;
            lo = mid;
        } else {
            hi = mid;
        }

        if (hi - lo).abs() < config.tolerance {
            break;
        }
    }

    let converged = (hi - lo).abs() < config.tolerance;
    tracing::info!(spend = best, success = best_success, iterations, converged, "Spend search finished");

    Ok(SpendSolution {
        spend_monthly: best.round(),
        success_probability: best_success,
        iterations,
        converged,
        history,
    })
}
