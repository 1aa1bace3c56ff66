//! Asset allocation accounting
//!
//! Holdings are classified heuristically from their ticker (or free-form
//! class label), cash balances accumulate into `Cash` and property values
//! into `RealEstate`.

use serde::{Deserialize, Serialize};

use crate::model::{AssetArray, AssetClass, Holding, Snapshot};

/// Portfolio weights by asset class plus the total value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub weights: AssetArray<f64>,
    pub total: f64,
}

impl Allocation {
    /// Build from raw per-class sums.
    ///
    /// `total` is the net sum. Negative class sums (overdrawn cash, margin)
    /// get zero weight and the rest are normalized among themselves, so
    /// weights are never negative. Weights are zero when the net total is
    /// not positive.
    #[must_use]
    pub fn from_sums(sums: AssetArray<f64>) -> Self {
        let total = sums.sum();
        let long = AssetArray::from_fn(|class| sums[class].max(0.0));
        let long_total = long.sum();
        let weights = if total > 0.0 && long_total > 0.0 {
            AssetArray::from_fn(|class| long[class] / long_total)
        } else {
            AssetArray::splat(0.0)
        };
        Self { weights, total }
    }
}

const CRYPTO_PATTERNS: &[&str] = &["BTC", "ETH", "SOL", "ADA", "DOGE", "MATIC", "CRYPTO"];
const INTL_PATTERNS: &[&str] = &["VXUS", "IXUS", "XUS", "VEU", "IEFA"];
const BOND_PATTERNS: &[&str] = &["BND", "AGG", "IEF", "TLT", "BOND", "VBTLX"];
const REIT_PATTERNS: &[&str] = &["VNQ", "SCHH", "REIT"];
const GOLD_PATTERNS: &[&str] = &["GLD", "IAU", "GOLD"];
const CASH_PATTERNS: &[&str] = &["CASH", "MONEY", "MMF"];

fn matches_any(symbol: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| symbol.contains(p))
}

/// Classify a holding by ticker pattern. Unmatched holdings are US stock.
#[must_use]
pub fn classify_holding(holding: &Holding) -> AssetClass {
    let symbol = holding
        .ticker
        .as_deref()
        .or(holding.asset_class.as_deref())
        .unwrap_or_default()
        .to_uppercase();

    if matches_any(&symbol, CRYPTO_PATTERNS) || symbol.contains("-USD") {
        AssetClass::Crypto
    } else if matches_any(&symbol, INTL_PATTERNS) {
        AssetClass::IntlStock
    } else if matches_any(&symbol, BOND_PATTERNS) {
        AssetClass::Bonds
    } else if matches_any(&symbol, REIT_PATTERNS) {
        AssetClass::Reit
    } else if matches_any(&symbol, GOLD_PATTERNS) {
        AssetClass::Gold
    } else if matches_any(&symbol, CASH_PATTERNS) {
        AssetClass::Cash
    } else {
        AssetClass::UsStock
    }
}

/// Compute the portfolio allocation of a snapshot.
#[must_use]
pub fn compute_allocation(snapshot: &Snapshot) -> Allocation {
    let mut sums = AssetArray::splat(0.0);

    for account in &snapshot.accounts {
        if let Some(cash) = account.cash_balance {
            sums[AssetClass::Cash] += cash;
        }
        for holding in &account.holdings {
            sums[classify_holding(holding)] += holding.value();
        }
    }

    for property in &snapshot.real_estate {
        sums[AssetClass::RealEstate] += property.value;
    }

    for (class, sum) in sums.iter() {
        if *sum < 0.0 {
            tracing::warn!(?class, sum, "Negative class balance excluded from target weights");
        }
    }

    Allocation::from_sums(sums)
}
