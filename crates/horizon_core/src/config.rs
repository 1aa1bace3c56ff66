//! Simulation options
//!
//! Options are serde-deserializable so front ends can load them from config
//! files. Every field has a default, so a partial file is valid.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, SimulationError};
use crate::model::{AssetArray, AssetClass, RebalanceFrequency};

/// Annual lognormal return assumption for one asset class
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReturnParams {
    /// Expected annual return (0.07 = 7%)
    pub mu: f64,
    /// Annual volatility
    #[serde(default)]
    pub sigma: f64,
}

impl ReturnParams {
    #[must_use]
    pub const fn new(mu: f64, sigma: f64) -> Self {
        Self { mu, sigma }
    }

    /// Monthly log drift and volatility: `(ln(1+mu)/12, sigma/sqrt(12))`.
    #[inline]
    #[must_use]
    pub fn monthly(self) -> (f64, f64) {
        ((1.0 + self.mu).ln() / 12.0, self.sigma / 12f64.sqrt())
    }
}

/// Default capital-market assumptions per asset class.
#[must_use]
pub fn default_returns() -> AssetArray<ReturnParams> {
    AssetArray::from_fn(|class| match class {
        AssetClass::UsStock => ReturnParams::new(0.07, 0.18),
        AssetClass::IntlStock => ReturnParams::new(0.065, 0.20),
        AssetClass::Bonds => ReturnParams::new(0.03, 0.07),
        AssetClass::Reit => ReturnParams::new(0.065, 0.20),
        AssetClass::Cash => ReturnParams::new(0.015, 0.01),
        AssetClass::RealEstate => ReturnParams::new(0.03, 0.12),
        AssetClass::Crypto => ReturnParams::new(0.08, 0.80),
        AssetClass::Gold => ReturnParams::new(0.04, 0.15),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnMode {
    /// Lognormal draws from per-class mu/sigma
    #[default]
    Parametric,
    /// Block bootstrap over a historical dataset
    #[serde(alias = "historical")]
    HistoricalBootstrap,
}

/// Options for one simulation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimOptions {
    /// Horizon in years
    pub years: f64,
    /// Annual inflation; falls back to the snapshot's assumption, then 2%
    pub inflation: Option<f64>,
    /// Falls back to the snapshot's rebalancing policy, then annual
    pub rebalance: Option<RebalanceFrequency>,
    pub paths: usize,
    pub mode: ReturnMode,
    pub bootstrap_block_months: usize,
    pub bootstrap_jitter_sigma: f64,
    /// Base seed; path `i` is seeded with `seed + i`. Unseeded runs draw from OS entropy.
    pub seed: Option<u32>,
    /// Return assumptions; classes listed in a config file override the defaults
    #[serde(deserialize_with = "deserialize_returns")]
    pub returns: AssetArray<ReturnParams>,
    /// Paths per worker message
    pub batch_size: usize,
    /// Worker threads for streaming runs
    pub workers: usize,
    /// Bounded capacity of the worker result channel, in batches
    pub channel_capacity: usize,
}

fn deserialize_returns<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<AssetArray<ReturnParams>, D::Error> {
    let overrides = BTreeMap::<AssetClass, ReturnParams>::deserialize(deserializer)?;
    let mut returns = default_returns();
    for (class, params) in overrides {
        returns[class] = params;
    }
    Ok(returns)
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            years: 40.0,
            inflation: None,
            rebalance: None,
            paths: 1000,
            mode: ReturnMode::Parametric,
            bootstrap_block_months: 12,
            bootstrap_jitter_sigma: 0.0,
            seed: None,
            returns: default_returns(),
            batch_size: 10,
            workers: default_workers(),
            channel_capacity: 64,
        }
    }
}

impl SimOptions {
    /// Reject options no simulation can run with.
    pub fn validate(&self) -> Result<()> {
        if !self.years.is_finite() || self.years < 0.0 {
            return Err(SimulationError::Config(format!(
                "years must be a non-negative number, got {}",
                self.years
            )));
        }
        if let Some(inflation) = self.inflation {
            if !inflation.is_finite() || inflation <= -1.0 {
                return Err(SimulationError::Config(format!(
                    "inflation must be greater than -100%, got {inflation}"
                )));
            }
        }
        if !self.bootstrap_jitter_sigma.is_finite() || self.bootstrap_jitter_sigma < 0.0 {
            return Err(SimulationError::Config(format!(
                "bootstrap jitter must be non-negative, got {}",
                self.bootstrap_jitter_sigma
            )));
        }
        for (class, params) in self.returns.iter() {
            if !params.mu.is_finite() || params.mu <= -1.0 || !params.sigma.is_finite() || params.sigma < 0.0 {
                return Err(SimulationError::Config(format!(
                    "invalid return assumption for {}: mu={} sigma={}",
                    class.label(),
                    params.mu,
                    params.sigma
                )));
            }
        }
        if self.batch_size == 0 {
            return Err(SimulationError::Config("batch size must be at least 1".to_string()));
        }
        if self.workers == 0 {
            return Err(SimulationError::Config("worker count must be at least 1".to_string()));
        }
        if self.channel_capacity == 0 {
            return Err(SimulationError::Config(
                "channel capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_options_fill_defaults() {
        let opts: SimOptions =
            serde_json::from_str(r#"{"paths": 250, "mode": "historical_bootstrap", "seed": 7}"#).unwrap();
        assert_eq!(opts.paths, 250);
        assert_eq!(opts.mode, ReturnMode::HistoricalBootstrap);
        assert_eq!(opts.seed, Some(7));
        assert_eq!(opts.years, 40.0);
        assert_eq!(opts.batch_size, 10);
        assert_eq!(opts.returns[AssetClass::UsStock], ReturnParams::new(0.07, 0.18));
        assert!(opts.workers >= 1);
    }

    #[test]
    fn test_returns_override_merges_with_defaults() {
        let opts: SimOptions =
            serde_json::from_str(r#"{"returns": {"US_STOCK": {"mu": 0.05, "sigma": 0.1}}}"#).unwrap();
        assert_eq!(opts.returns[AssetClass::UsStock], ReturnParams::new(0.05, 0.1));
        assert_eq!(opts.returns[AssetClass::Bonds], ReturnParams::new(0.03, 0.07));
    }

    #[test]
    fn test_monthly_params() {
        let (mu_m, sigma_m) = ReturnParams::new(0.07, 0.18).monthly();
        assert!(((mu_m * 12.0).exp() - 1.07).abs() < 1e-12);
        assert!((sigma_m * 12f64.sqrt() - 0.18).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(SimOptions::default().validate().is_ok());

        let opts = SimOptions {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(opts.validate(), Err(SimulationError::Config(_))));

        let opts = SimOptions {
            years: f64::NAN,
            ..Default::default()
        };
        assert!(opts.validate().is_err());

        let mut opts = SimOptions::default();
        opts.returns[AssetClass::Crypto].sigma = -0.1;
        assert!(opts.validate().is_err());
    }
}
