//! Input file loading
//!
//! Snapshots, options and historical datasets are read as JSON or YAML,
//! chosen by file extension.

use std::fs;
use std::path::{Path, PathBuf};

use horizon_core::SimOptions;
use horizon_core::model::{HistoricalDataset, Snapshot};
use serde::de::DeserializeOwned;

/// Error types for loading input files
#[derive(Debug)]
pub enum InputError {
    Io(String),
    Parse(String),
    UnsupportedFormat(PathBuf),
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputError::Io(msg) => write!(f, "IO error: {}", msg),
            InputError::Parse(msg) => write!(f, "Parse error: {}", msg),
            InputError::UnsupportedFormat(path) => {
                write!(f, "Unsupported file format: {} (expected .json, .yaml or .yml)", path.display())
            }
        }
    }
}

impl std::error::Error for InputError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

fn format_of(path: &Path) -> Result<Format, InputError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("json") => Ok(Format::Json),
        Some("yaml" | "yml") => Ok(Format::Yaml),
        _ => Err(InputError::UnsupportedFormat(path.to_path_buf())),
    }
}

fn load<T: DeserializeOwned>(path: &Path) -> Result<T, InputError> {
    let format = format_of(path)?;
    let content = fs::read_to_string(path)
        .map_err(|e| InputError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
    match format {
        Format::Json => serde_json::from_str(&content)
            .map_err(|e| InputError::Parse(format!("{}: {}", path.display(), e))),
        Format::Yaml => serde_saphyr::from_str(&content)
            .map_err(|e| InputError::Parse(format!("{}: {}", path.display(), e))),
    }
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot, InputError> {
    load(path)
}

pub fn load_historical(path: &Path) -> Result<HistoricalDataset, InputError> {
    let dataset: HistoricalDataset = load(path)?;
    tracing::info!(rows = dataset.len(), path = %path.display(), "Loaded historical dataset");
    Ok(dataset)
}

/// Load options from `path`, or from the default location when it exists.
/// Missing fields take their defaults.
pub fn load_options(path: Option<&Path>) -> Result<SimOptions, InputError> {
    match path {
        Some(path) => load(path),
        None => {
            let default = default_options_path();
            if default.exists() {
                tracing::debug!(path = %default.display(), "Using default options file");
                load(&default)
            } else {
                Ok(SimOptions::default())
            }
        }
    }
}

/// Get the default data directory path (~/.horizon/)
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".horizon")
}

fn default_options_path() -> PathBuf {
    default_data_dir().join("options.yaml")
}
