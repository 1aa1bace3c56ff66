//! Command-line front end for the horizon simulation engine
//!
//! Loads a portfolio snapshot, options and an optional historical dataset,
//! runs the deterministic baseline and a streamed Monte Carlo simulation,
//! and renders a JSON report.

pub mod args;
pub mod input;
pub mod logging;
pub mod report;

pub use args::Cli;
pub use logging::init_logging;
pub use report::{Report, run_report};
