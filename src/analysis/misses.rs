//! Misprediction report export
//!
//! A miss is a commit whose chosen candidate was not the top prediction
//! (rank > 0). Misses are ranked so that the most frequently mistyped words
//! come first, ties broken by the user's input sequence.

use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::event::EventRecord;
use super::AnalysisError;

/// Report header: user input, actual choice, predicted choice, selected rank
pub const REPORT_HEADER: [&str; 4] = ["用户输入", "实际选择", "程序预测", "选择排名"];

/// Default report file name
pub const DEFAULT_REPORT_FILE: &str = "mispredictions.csv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissRecord {
    pub user_input: String,
    pub actual_choice: String,
    pub predicted_choice: String,
    pub selected_rank: u64,
    /// Number of misses sharing `actual_choice`; ordering only
    #[serde(skip)]
    pub frequency: usize,
}

/// Result of an export request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written { path: PathBuf, rows: usize },
    NothingToExport,
}

pub fn miss_count(records: &[EventRecord]) -> usize {
    records.iter().filter(|r| r.miss_rank().is_some()).count()
}

/// Builds the ranked miss list: frequency descending, then user input ascending
pub fn collect_misses(records: &[EventRecord]) -> Vec<MissRecord> {
    let mut misses: Vec<MissRecord> = records
        .iter()
        .filter_map(|record| {
            record.miss_rank().map(|rank| MissRecord {
                user_input: record.source_input_buffer.clone(),
                actual_choice: record.committed_text.clone(),
                predicted_choice: record.source_first_candidate.clone(),
                selected_rank: rank,
                frequency: 0,
            })
        })
        .collect();

    let mut frequency: HashMap<String, usize> = HashMap::new();
    for miss in &misses {
        *frequency.entry(miss.actual_choice.clone()).or_default() += 1;
    }

    for miss in &mut misses {
        miss.frequency = frequency[&miss.actual_choice];
    }

    // Stable sort keeps log order for rows with equal key
    misses.sort_by(|a, b| {
        b.frequency
            .cmp(&a.frequency)
            .then_with(|| a.user_input.cmp(&b.user_input))
    });

    misses
}

/// Serializes misses as CSV with the fixed four-column header
pub fn write_misses<W: Write>(misses: &[MissRecord], writer: W) -> Result<(), AnalysisError> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    wtr.write_record(REPORT_HEADER)?;
    for miss in misses {
        let rank = miss.selected_rank.to_string();
        wtr.write_record([
            miss.user_input.as_str(),
            miss.actual_choice.as_str(),
            miss.predicted_choice.as_str(),
            rank.as_str(),
        ])?;
    }
    wtr.flush().map_err(AnalysisError::Flush)?;
    Ok(())
}

/// Writes the ranked miss report to `output`
///
/// Zero misses is not an error; no file is created in that case.
pub fn export_misses(
    records: &[EventRecord],
    output: &Path,
) -> Result<ExportOutcome, AnalysisError> {
    let misses = collect_misses(records);
    if misses.is_empty() {
        debug!("No mispredictions to export");
        return Ok(ExportOutcome::NothingToExport);
    }

    let file = File::create(output).map_err(|source| AnalysisError::CreateReport {
        path: output.to_path_buf(),
        source,
    })?;
    write_misses(&misses, io::BufWriter::new(file))?;

    info!(rows = misses.len(), path = %output.display(), "Misprediction report written");
    Ok(ExportOutcome::Written {
        path: output.to_path_buf(),
        rows: misses.len(),
    })
}
