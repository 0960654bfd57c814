//! Habit log analytics
//!
//! - [`event`]: streaming parser for the line-delimited event log
//! - [`metrics`]: prediction accuracy statistics
//! - [`misses`]: ranked misprediction report

pub mod event;
pub mod metrics;
pub mod misses;

use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use event::{
    open_log, read_log_file, EventReader, EventRecord, ParseStats, ParsedLog, Selection,
    TEXT_COMMITTED,
};
pub use metrics::{AnalysisResult, MetricsAccumulator};
pub use misses::{
    collect_misses, export_misses, miss_count, write_misses, ExportOutcome, MissRecord,
    DEFAULT_REPORT_FILE,
};

/// Log analysis errors
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Log file not found: {}", .0.display())]
    LogNotFound(PathBuf),

    #[error("Failed to read log file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create report file {}: {source}", .path.display())]
    CreateReport {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write report row: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to flush report: {0}")]
    Flush(#[source] io::Error),
}

/// Everything the `analyze` command reports about one log file
#[derive(Debug, Clone, Serialize)]
pub struct LogAnalysis {
    pub log_file: PathBuf,
    pub parse: ParseStats,
    pub metrics: AnalysisResult,
}

/// Streams a log file through the metrics calculator
pub fn analyze_log(path: &Path) -> Result<LogAnalysis, AnalysisError> {
    let mut reader = open_log(path)?;
    let mut acc = MetricsAccumulator::default();
    for record in reader.by_ref() {
        let record = record.map_err(|source| AnalysisError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        acc.push(&record);
    }

    Ok(LogAnalysis {
        log_file: path.to_path_buf(),
        parse: reader.stats(),
        metrics: acc.finish(),
    })
}
