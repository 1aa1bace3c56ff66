//! Scenario tests for the horizon simulation engine
//!
//! Tests are organized by topic:
//! - `allocation` - Weight normalization across snapshot shapes
//! - `historical` - Block bootstrap alignment and annual-expanded data
//! - `scenarios` - End-to-end deterministic and parametric paths
//! - `reproducibility` - Per-path seeding across batch sizes and executors
//! - `worker_pool` - Streaming runs, lost batches and cancellation
//! - `solver` - Sustainable spend search

mod reproducibility;
mod scenarios;
mod solver;
mod worker_pool;

use crate::model::{Account, Holding, Snapshot};

/// Snapshot with one brokerage account holding `(ticker, value)` pairs.
pub(crate) fn brokerage_snapshot(holdings: &[(&str, f64)]) -> Snapshot {
    Snapshot {
        timestamp: "2025-01-01".to_string(),
        accounts: vec![Account {
            id: "brokerage".to_string(),
            account_type: "taxable".to_string(),
            holdings: holdings
                .iter()
                .map(|(ticker, value)| Holding {
                    ticker: Some((*ticker).to_string()),
                    units: 1.0,
                    price: *value,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }],
        ..Default::default()
    }
}
