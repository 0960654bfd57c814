//! Line-delimited event log parsing
//!
//! The logger script appends one JSON object per line. [`EventReader`] walks the
//! log lazily, decoding each line into an [`EventRecord`] and yielding only
//! `text_committed` events. A malformed line is reported with its line number
//! and skipped; it never aborts the pass.

use serde::{Deserialize, Deserializer, Serialize};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

use super::AnalysisError;

/// Event type of a commit entry; every other event type is dropped
pub const TEXT_COMMITTED: &str = "text_committed";

/// A single entry of the habit log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default, deserialize_with = "nullable_string")]
    pub event_type: String,

    /// `None` for malformed entries, `-1` for direct input, `r >= 0` for the
    /// r-th ranked candidate
    #[serde(default)]
    pub selected_candidate_rank: Option<i64>,

    #[serde(default, deserialize_with = "nullable_string")]
    pub committed_text: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub source_first_candidate: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub source_input_buffer: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub timestamp: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_sequence_at_commit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_candidates_list: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_method: Option<String>,
}

/// How a commit was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The candidate at this zero-based rank was chosen
    Candidate(u64),
    /// No candidate was offered; raw text was committed
    Direct,
    /// Rank missing or out of range; excluded from every metric
    Unranked,
}

impl EventRecord {
    pub fn is_commit(&self) -> bool {
        self.event_type == TEXT_COMMITTED
    }

    pub fn selection(&self) -> Selection {
        match self.selected_candidate_rank {
            Some(rank) if rank >= 0 => Selection::Candidate(rank as u64),
            Some(-1) => Selection::Direct,
            _ => Selection::Unranked,
        }
    }

    /// Rank of a commit where the top prediction was not chosen
    pub fn miss_rank(&self) -> Option<u64> {
        match self.selection() {
            Selection::Candidate(rank) if rank > 0 => Some(rank),
            _ => None,
        }
    }
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Counters collected while reading a log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    pub lines_read: usize,
    pub blank_lines: usize,
    pub malformed_lines: usize,
    pub ignored_events: usize,
    pub commits: usize,
}

/// Lazy, non-restartable iterator over the commit events of a log
///
/// Yields `Err` only for I/O failures of the underlying reader. Decode
/// failures are logged and skipped.
pub struct EventReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_number: usize,
    stats: ParseStats,
}

impl<R: BufRead> EventReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_number: 0,
            stats: ParseStats::default(),
        }
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    fn decode_line(&mut self) -> Option<EventRecord> {
        let line_number = self.line_number;
        let mut bytes = self.buf.as_slice();
        if let Some(stripped) = bytes.strip_suffix(b"\n") {
            bytes = stripped;
        }
        if let Some(stripped) = bytes.strip_suffix(b"\r") {
            bytes = stripped;
        }

        let line = match std::str::from_utf8(bytes) {
            Ok(line) => line,
            Err(e) => {
                warn!(line = line_number, error = %e, "Skipping line with invalid UTF-8");
                self.stats.malformed_lines += 1;
                return None;
            }
        };
        let line = if line_number == 1 {
            line.trim_start_matches('\u{feff}')
        } else {
            line
        };

        if line.trim().is_empty() {
            self.stats.blank_lines += 1;
            return None;
        }

        match serde_json::from_str::<EventRecord>(line) {
            Ok(record) if record.is_commit() => {
                self.stats.commits += 1;
                Some(record)
            }
            Ok(record) => {
                debug!(line = line_number, event_type = %record.event_type, "Ignoring event");
                self.stats.ignored_events += 1;
                None
            }
            Err(e) => {
                warn!(line = line_number, error = %e, "Skipping invalid JSON line");
                self.stats.malformed_lines += 1;
                None
            }
        }
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = io::Result<EventRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_number += 1;
                    self.stats.lines_read += 1;
                    if let Some(record) = self.decode_line() {
                        return Some(Ok(record));
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Commit events of a fully read log together with the parse counters
#[derive(Debug, Clone, Default)]
pub struct ParsedLog {
    pub records: Vec<EventRecord>,
    pub stats: ParseStats,
}

/// Opens a log file for lazy reading
pub fn open_log(path: &Path) -> Result<EventReader<BufReader<File>>, AnalysisError> {
    if !path.exists() {
        return Err(AnalysisError::LogNotFound(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|source| AnalysisError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(EventReader::new(BufReader::new(file)))
}

/// Reads every commit event of a log file into memory
pub fn read_log_file(path: &Path) -> Result<ParsedLog, AnalysisError> {
    let mut reader = open_log(path)?;
    let records = reader
        .by_ref()
        .collect::<io::Result<Vec<_>>>()
        .map_err(|source| AnalysisError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let stats = reader.stats();

    debug!(
        lines = stats.lines_read,
        commits = stats.commits,
        malformed = stats.malformed_lines,
        "Log parsed"
    );

    Ok(ParsedLog { records, stats })
}
