use std::fmt;
use std::ops::Range;

/// Errors produced by the simulation engine
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Historical data is empty and cannot be sampled
    EmptyHistoricalData,
    /// Configuration error
    Config(String),
    /// A quantile outside (0, 1) was requested
    InvalidQuantile(f64),
    /// A worker lost a batch of paths (panic or engine error)
    WorkerFailed { range: Range<usize>, reason: String },
    /// The run was cancelled before all paths completed
    Cancelled,
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::EmptyHistoricalData => write!(f, "historical dataset has no rows"),
            SimulationError::Config(msg) => write!(f, "configuration error: {msg}"),
            SimulationError::InvalidQuantile(q) => {
                write!(f, "quantile {q} must lie strictly between 0 and 1")
            }
            SimulationError::WorkerFailed { range, reason } => {
                write!(
                    f,
                    "worker lost paths {}..{}: {reason}",
                    range.start, range.end
                )
            }
            SimulationError::Cancelled => write!(f, "simulation cancelled"),
        }
    }
}

impl std::error::Error for SimulationError {}

pub type Result<T> = std::result::Result<T, SimulationError>;
