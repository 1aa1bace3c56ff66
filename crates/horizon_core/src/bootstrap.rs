//! Historical block bootstrap
//!
//! A path's return sequence is assembled up front from contiguous blocks of
//! the historical record. All requested classes share the same block starts,
//! which preserves cross-asset correlation within a month.

use crate::error::{Result, SimulationError};
use crate::model::{AssetArray, AssetClass, HistoricalDataset};
use crate::random::RandomContext;

/// Rows inspected when detecting annual-expanded data
const ANNUAL_DETECTION_ROWS: usize = 120;
const ANNUAL_TOLERANCE: f64 = 1e-12;
/// Minimum jitter applied to annual-expanded data
const ANNUAL_JITTER_FLOOR: f64 = 0.002;
const DEFAULT_BLOCK_MONTHS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootstrapOptions {
    /// Requested block length in months; 0 selects the default of 12
    pub block_months: usize,
    /// Standard deviation of white noise added to each sampled return
    pub jitter_sigma: f64,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            block_months: DEFAULT_BLOCK_MONTHS,
            jitter_sigma: 0.0,
        }
    }
}

/// Pre-assembled bootstrapped return path for one simulation path.
#[derive(Debug, Clone)]
pub struct BootstrapSampler {
    assets: Vec<AssetClass>,
    /// One assembled series per entry of `assets`, each `months` long
    series: Vec<Vec<f64>>,
    months: usize,
    block: usize,
    annual_mode: bool,
    jitter_sigma: f64,
    cursor: usize,
}

/// Whether every complete 12-row window of `values` is constant.
fn is_annual_expanded(values: &[f64]) -> bool {
    let window = &values[..values.len().min(ANNUAL_DETECTION_ROWS)];
    let mut complete = 0;
    for year in window.chunks_exact(12) {
        let first = year[0];
        if year.iter().any(|v| (v - first).abs() > ANNUAL_TOLERANCE) {
            return false;
        }
        complete += 1;
    }
    complete > 0
}

impl BootstrapSampler {
    /// Assemble a `months`-long path for `assets` from `dataset`.
    ///
    /// Fails with [`SimulationError::EmptyHistoricalData`] when the dataset
    /// has no rows.
    pub fn new(
        dataset: &HistoricalDataset,
        months: usize,
        assets: &[AssetClass],
        options: BootstrapOptions,
        rng: &mut RandomContext,
    ) -> Result<Self> {
        let rows = dataset.sorted_rows();
        if rows.is_empty() {
            return Err(SimulationError::EmptyHistoricalData);
        }
        let n = rows.len();

        let history: Vec<Vec<f64>> = assets
            .iter()
            .map(|&class| rows.iter().map(|r| r.value(class)).collect())
            .collect();

        // Detect on the months the reference class actually reports
        let annual_mode = assets.first().is_some_and(|&class| {
            let reported: Vec<f64> = rows.iter().filter_map(|r| r.present(class)).collect();
            is_annual_expanded(&reported)
        });

        let requested = if options.block_months == 0 {
            DEFAULT_BLOCK_MONTHS
        } else {
            options.block_months
        };
        let block = if annual_mode {
            12
        } else {
            requested.min((n / 4).max(1)).max(1)
        };

        let mut series: Vec<Vec<f64>> = assets.iter().map(|_| Vec::with_capacity(months)).collect();
        let mut remaining = months;
        while remaining > 0 {
            let mut start = rng.index(n);
            if annual_mode {
                start -= start % 12;
            }
            let take = block.min(remaining);
            for (out, source) in series.iter_mut().zip(&history) {
                out.extend((0..take).map(|i| source[(start + i) % n]));
            }
            remaining -= take;
        }

        let jitter_sigma = if annual_mode {
            options.jitter_sigma.max(ANNUAL_JITTER_FLOOR)
        } else {
            options.jitter_sigma
        };

        Ok(Self {
            assets: assets.to_vec(),
            series,
            months,
            block,
            annual_mode,
            jitter_sigma,
            cursor: 0,
        })
    }

    /// Returns for the current month; unrequested classes are 0.
    pub fn next(&mut self, rng: &mut RandomContext) -> AssetArray<f64> {
        let mut out = AssetArray::splat(0.0);
        if self.months == 0 {
            return out;
        }
        for (class, series) in self.assets.iter().zip(&self.series) {
            let jitter = if self.jitter_sigma > 0.0 {
                self.jitter_sigma * rng.randn()
            } else {
                0.0
            };
            out[*class] = series[self.cursor] + jitter;
        }
        self.cursor = (self.cursor + 1) % self.months;
        out
    }

    /// Classes sampled from history, in request order
    #[must_use]
    pub fn assets(&self) -> &[AssetClass] {
        &self.assets
    }

    #[must_use]
    pub fn block(&self) -> usize {
        self.block
    }

    #[must_use]
    pub fn annual_mode(&self) -> bool {
        self.annual_mode
    }

    #[must_use]
    pub fn months(&self) -> usize {
        self.months
    }

    #[must_use]
    pub fn jitter_sigma(&self) -> f64 {
        self.jitter_sigma
    }
}
