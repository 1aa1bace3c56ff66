//! Portfolio trajectory simulation engine
//!
//! This crate projects a multi-asset portfolio forward month by month under a
//! deterministic expected-return scenario and a stochastic Monte Carlo
//! scenario. It supports:
//! - Heuristic asset-class allocation from holdings, cash and real estate
//! - Contribution, expense and property cashflow schedules
//! - Parametric (lognormal) and historical block-bootstrap returns
//! - Streaming per-month percentile bands via the P² estimator
//! - Parallel batch runs (rayon) and a streaming worker pool
//! - A sustainable-spend search by bisection
//!
//! # Example
//!
//! ```ignore
//! use horizon_core::{SimOptions, SimulationRequest, monte_carlo_simulate};
//!
//! let request = SimulationRequest::prepare(&snapshot, &SimOptions::default(), None)?;
//! let outcome = monte_carlo_simulate(&request)?;
//! println!("success: {:.1}%", outcome.summary.success_probability * 100.0);
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod allocation;
pub mod bootstrap;
pub mod error;
pub mod mortgage;
pub mod path;
pub mod quantile;
pub mod random;
pub mod simulation;
pub mod solver;
pub mod timeline;
pub mod worker;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::{ReturnMode, ReturnParams, SimOptions};
pub use error::{Result, SimulationError};
pub use simulation::{
    MonteCarloAggregator, MonteCarloOutcome, SimulationRequest, monte_carlo_simulate,
    simulate_deterministic,
};
pub use worker::{BatchMessage, MonteCarloRun, SimulationWorker};
