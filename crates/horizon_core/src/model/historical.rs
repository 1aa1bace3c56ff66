use std::collections::BTreeMap;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use super::asset_class::{AssetArray, AssetClass};

/// Monthly historical returns across asset classes.
///
/// Rows may be out of order; consumers sort by `(year, month)` before use.
/// Low-fidelity sources repeat an annual figure across all 12 months of a
/// year ("annual-expanded" data).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoricalDataset {
    #[serde(default)]
    pub meta: Option<HistoricalDatasetMeta>,
    pub rows: Vec<HistoricalMonthRow>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoricalDatasetMeta {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalMonthRow {
    pub year: i16,
    /// Calendar month, 1-12
    pub month: i8,
    /// Monthly simple returns (0.01 = 1%). Non-numeric cells and unknown
    /// class labels are dropped on load.
    #[serde(default, deserialize_with = "deserialize_returns")]
    pub returns: BTreeMap<AssetClass, f64>,
}

/// One cell of a row's return map
#[derive(Deserialize)]
#[serde(untagged)]
enum ReturnCell {
    Value(f64),
    Other(IgnoredAny),
}

fn deserialize_returns<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<AssetClass, f64>, D::Error> {
    let cells = BTreeMap::<String, ReturnCell>::deserialize(deserializer)?;
    Ok(cells
        .into_iter()
        .filter_map(|(label, cell)| match (AssetClass::from_label(&label), cell) {
            (Some(class), ReturnCell::Value(v)) => Some((class, v)),
            _ => None,
        })
        .collect())
}

impl HistoricalMonthRow {
    /// Return for `class` when the row carries a finite value for it.
    #[inline]
    #[must_use]
    pub fn present(&self, class: AssetClass) -> Option<f64> {
        self.returns.get(&class).copied().filter(|v| v.is_finite())
    }

    /// Return for `class`; missing or non-finite values read as 0.
    #[inline]
    #[must_use]
    pub fn value(&self, class: AssetClass) -> f64 {
        self.present(class).unwrap_or(0.0)
    }
}

/// Basic statistics of one asset class's monthly return series.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HistoricalStatistics {
    pub arithmetic_mean: f64,
    pub geometric_mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Geometric mean compounded over 12 months
    pub annualized_return: f64,
    /// Monthly standard deviation scaled by sqrt(12)
    pub annualized_volatility: f64,
    pub months: usize,
}

impl HistoricalDataset {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in chronological order.
    #[must_use]
    pub fn sorted_rows(&self) -> Vec<&HistoricalMonthRow> {
        let mut rows: Vec<_> = self.rows.iter().collect();
        rows.sort_by_key(|r| (r.year, r.month));
        rows
    }

    /// Whether any row carries a value for `class`.
    #[must_use]
    pub fn covers(&self, class: AssetClass) -> bool {
        self.rows.iter().any(|r| r.returns.contains_key(&class))
    }

    /// Per-class statistics for every class present in the data.
    #[must_use]
    pub fn statistics(&self) -> AssetArray<Option<HistoricalStatistics>> {
        let rows = self.sorted_rows();
        AssetArray::from_fn(|class| {
            if !self.covers(class) {
                return None;
            }
            let series: Vec<f64> = rows.iter().map(|r| r.value(class)).collect();
            series_statistics(&series)
        })
    }
}

fn series_statistics(series: &[f64]) -> Option<HistoricalStatistics> {
    if series.is_empty() {
        return None;
    }
    let n = series.len() as f64;
    let arithmetic_mean = series.iter().sum::<f64>() / n;

    // Geometric mean: (product of (1+r))^(1/n) - 1
    let product: f64 = series.iter().map(|r| 1.0 + r).product();
    let geometric_mean = product.powf(1.0 / n) - 1.0;

    let variance = series
        .iter()
        .map(|r| (r - arithmetic_mean).powi(2))
        .sum::<f64>()
        / n;
    let std_dev = variance.sqrt();

    let min = series.iter().copied().fold(f64::INFINITY, f64::min);
    let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(HistoricalStatistics {
        arithmetic_mean,
        geometric_mean,
        std_dev,
        min,
        max,
        annualized_return: (1.0 + geometric_mean).powi(12) - 1.0,
        annualized_volatility: std_dev * 12f64.sqrt(),
        months: series.len(),
    })
}
