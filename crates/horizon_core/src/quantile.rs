//! Streaming quantile estimation
//!
//! [`P2Quantile`] is the P² estimator of Jain and Chlamtac: five markers
//! track the minimum, the target quantile, two intermediate quantiles and the
//! maximum in constant memory. [`PercentileGrid`] keeps one estimator per
//! (quantile, month) pair so per-month percentile bands can be produced
//! without retaining every path.

use crate::error::{Result, SimulationError};

/// Percentile bands reported for trajectories: p10, p25, p50, p75, p90
pub const BAND_QUANTILES: [f64; 5] = [0.1, 0.25, 0.5, 0.75, 0.9];

/// Single-quantile P² estimator.
#[derive(Debug, Clone)]
pub struct P2Quantile {
    q: f64,
    /// Marker heights
    heights: [f64; 5],
    /// Actual marker positions
    positions: [f64; 5],
    /// Desired marker positions
    desired: [f64; 5],
    /// Desired position increments per observation
    increments: [f64; 5],
    count: usize,
}

impl P2Quantile {
    /// Estimator for quantile `q`, which must lie strictly between 0 and 1.
    pub fn new(q: f64) -> Result<Self> {
        if !(q > 0.0 && q < 1.0) {
            return Err(SimulationError::InvalidQuantile(q));
        }
        Ok(Self::unchecked(q))
    }

    const fn unchecked(q: f64) -> Self {
        Self {
            q,
            heights: [0.0; 5],
            positions: [0.0; 5],
            desired: [0.0; 5],
            increments: [0.0; 5],
            count: 0,
        }
    }

    /// Estimators for p10, p50 and p90.
    #[must_use]
    pub fn deciles() -> [Self; 3] {
        [Self::unchecked(0.1), Self::unchecked(0.5), Self::unchecked(0.9)]
    }

    #[must_use]
    pub fn quantile(&self) -> f64 {
        self.q
    }

    /// Observations accepted so far (non-finite values are not counted).
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn add(&mut self, x: f64) {
        if !x.is_finite() {
            return;
        }

        if self.count < 5 {
            self.heights[self.count] = x;
            self.count += 1;
            if self.count == 5 {
                let q = self.q;
                self.heights.sort_by(f64::total_cmp);
                self.positions = [0.0, 1.0, 2.0, 3.0, 4.0];
                self.desired = [0.0, 2.0 * q, 4.0 * q, 2.0 + 2.0 * q, 4.0];
                self.increments = [0.0, q / 2.0, q, (1.0 + q) / 2.0, 1.0];
            }
            return;
        }
        self.count += 1;

        let h = &mut self.heights;
        let k = if x < h[0] {
            h[0] = x;
            0
        } else if x < h[1] {
            0
        } else if x < h[2] {
            1
        } else if x < h[3] {
            2
        } else if x <= h[4] {
            3
        } else {
            h[4] = x;
            3
        };

        for n in &mut self.positions[k + 1..] {
            *n += 1.0;
        }
        for (ns, dn) in self.desired.iter_mut().zip(&self.increments) {
            *ns += dn;
        }

        for i in 1..=3 {
            let d = self.desired[i] - self.positions[i];
            let n = &self.positions;
            if (d >= 1.0 && n[i + 1] - n[i] > 1.0) || (d <= -1.0 && n[i - 1] - n[i] < -1.0) {
                let s = d.signum();
                let candidate = self.parabolic(i, s);
                self.heights[i] = if self.heights[i - 1] < candidate && candidate < self.heights[i + 1] {
                    candidate
                } else {
                    self.linear(i, s)
                };
                self.positions[i] += s;
            }
        }
    }

    /// Current estimate; NaN before any observation.
    #[must_use]
    pub fn get(&self) -> f64 {
        match self.count {
            0 => f64::NAN,
            c if c < 5 => {
                let mut buffered = self.heights[..c].to_vec();
                buffered.sort_by(f64::total_cmp);
                let idx = ((self.q * (c - 1) as f64).floor() as usize).min(c - 1);
                buffered[idx]
            }
            _ => self.heights[2],
        }
    }

    fn parabolic(&self, i: usize, d: f64) -> f64 {
        let p = &self.heights;
        let n = &self.positions;
        p[i] + d / (n[i + 1] - n[i - 1])
            * ((n[i] - n[i - 1] + d) * (p[i + 1] - p[i]) / (n[i + 1] - n[i])
                + (n[i + 1] - n[i] - d) * (p[i] - p[i - 1]) / (n[i] - n[i - 1]))
    }

    fn linear(&self, i: usize, d: f64) -> f64 {
        let j = if d > 0.0 { i + 1 } else { i - 1 };
        self.heights[i] + d * (self.heights[j] - self.heights[i]) / (self.positions[j] - self.positions[i])
    }
}

/// One P² estimator per (quantile, month).
#[derive(Debug, Clone)]
pub struct PercentileGrid {
    quantiles: Vec<f64>,
    months: usize,
    /// Row-major: `estimators[k * months + m]`
    estimators: Vec<P2Quantile>,
}

impl PercentileGrid {
    pub fn new(months: usize, quantiles: &[f64]) -> Result<Self> {
        let mut estimators = Vec::with_capacity(quantiles.len() * months);
        for &q in quantiles {
            let template = P2Quantile::new(q)?;
            estimators.extend(std::iter::repeat_n(template, months));
        }
        Ok(Self {
            quantiles: quantiles.to_vec(),
            months,
            estimators,
        })
    }

    /// Grid over [`BAND_QUANTILES`].
    #[must_use]
    pub fn bands(months: usize) -> Self {
        let estimators = BAND_QUANTILES
            .iter()
            .flat_map(|&q| std::iter::repeat_n(P2Quantile::unchecked(q), months))
            .collect();
        Self {
            quantiles: BAND_QUANTILES.to_vec(),
            months,
            estimators,
        }
    }

    #[must_use]
    pub fn months(&self) -> usize {
        self.months
    }

    #[must_use]
    pub fn quantiles(&self) -> &[f64] {
        &self.quantiles
    }

    /// Feed one path's per-month values. Extra entries are ignored.
    pub fn add_trajectory(&mut self, trajectory: &[f64]) {
        if self.months == 0 {
            return;
        }
        for row in self.estimators.chunks_mut(self.months) {
            for (est, &value) in row.iter_mut().zip(trajectory) {
                est.add(value);
            }
        }
    }

    /// Estimates for the `k`th quantile, one per month.
    #[must_use]
    pub fn series(&self, k: usize) -> Vec<f64> {
        let start = k * self.months;
        self.estimators
            .get(start..start + self.months)
            .map(|row| row.iter().map(P2Quantile::get).collect())
            .unwrap_or_default()
    }
}
