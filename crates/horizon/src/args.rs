use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use horizon_core::model::RebalanceFrequency;
use horizon_core::{ReturnMode, SimOptions};

#[derive(Parser, Debug, Clone)]
#[command(name = "horizon")]
#[command(about = "Project a portfolio snapshot forward with Monte Carlo simulation")]
pub struct Cli {
    /// Portfolio snapshot (.json, .yaml or .yml)
    #[arg(short, long)]
    pub snapshot: PathBuf,

    /// Monthly historical returns for bootstrap mode (.json, .yaml or .yml)
    #[arg(long)]
    pub historical: Option<PathBuf>,

    /// Simulation options file (default: ~/.horizon/options.yaml when present)
    #[arg(short, long)]
    pub options: Option<PathBuf>,

    /// Horizon in years
    #[arg(long)]
    pub years: Option<f64>,

    /// Number of Monte Carlo paths
    #[arg(short, long)]
    pub paths: Option<usize>,

    /// Base seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u32>,

    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Bootstrap block length in months
    #[arg(long)]
    pub block_months: Option<usize>,

    /// Gaussian jitter added to bootstrapped returns
    #[arg(long)]
    pub jitter: Option<f64>,

    #[arg(long, value_enum)]
    pub rebalance: Option<RebalanceArg>,

    /// Worker threads for the streaming run
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Paths per worker batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Also search for the monthly spend meeting this success probability
    #[arg(long)]
    pub solve_spend: Option<f64>,

    /// Write logs to `horizon.log` in this directory instead of stderr
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Parametric,
    Historical,
}

impl From<ModeArg> for ReturnMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Parametric => ReturnMode::Parametric,
            ModeArg::Historical => ReturnMode::HistoricalBootstrap,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebalanceArg {
    Monthly,
    Quarterly,
    Annual,
}

impl From<RebalanceArg> for RebalanceFrequency {
    fn from(frequency: RebalanceArg) -> Self {
        match frequency {
            RebalanceArg::Monthly => RebalanceFrequency::Monthly,
            RebalanceArg::Quarterly => RebalanceFrequency::Quarterly,
            RebalanceArg::Annual => RebalanceFrequency::Annual,
        }
    }
}

impl Cli {
    /// Apply command-line flags on top of file-loaded options.
    pub fn apply_overrides(&self, options: &mut SimOptions) {
        if let Some(years) = self.years {
            options.years = years;
        }
        if let Some(paths) = self.paths {
            options.paths = paths;
        }
        if let Some(seed) = self.seed {
            options.seed = Some(seed);
        }
        if let Some(mode) = self.mode {
            options.mode = mode.into();
        }
        if let Some(block) = self.block_months {
            options.bootstrap_block_months = block;
        }
        if let Some(jitter) = self.jitter {
            options.bootstrap_jitter_sigma = jitter;
        }
        if let Some(rebalance) = self.rebalance {
            options.rebalance = Some(rebalance.into());
        }
        if let Some(workers) = self.workers {
            options.workers = workers;
        }
        if let Some(batch_size) = self.batch_size {
            options.batch_size = batch_size;
        }
    }
}
