//! Output formatting for multiple formats
//!
//! Formatters for JSON, YAML and human-readable text. Machine formats
//! serialize the library types directly; the human format is laid out for a
//! terminal.
//!
//! # Example
//!
//! ```no_run
//! use rime_logger::analysis::analyze_log;
//! use rime_logger::cli::output::{OutputFormat, OutputFormatter};
//! use std::path::Path;
//!
//! let analysis = analyze_log(Path::new("input_habit_log_structured.jsonl")).unwrap();
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! println!("{}", formatter.format_analysis(&analysis).unwrap());
//! ```

use anyhow::{Context, Result};
use serde::Serialize;

use crate::analysis::LogAnalysis;
use crate::config::RimeLoggerConfig;
use crate::rime::{InstallStatus, LogPathSource, SchemaState};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";
const CHECK: &str = "\u{2713}";
const CROSS: &str = "\u{2717}";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// Status report together with the configuration it was computed under
#[derive(Serialize)]
struct StatusView<'a> {
    status: &'a InstallStatus,
    config: std::collections::BTreeMap<String, String>,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the result of `analyze`
    pub fn format_analysis(&self, analysis: &LogAnalysis) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(analysis)
                .context("Failed to serialize analysis to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(analysis).context("Failed to serialize analysis to YAML")
            }
            OutputFormat::Human => Ok(self.format_analysis_human(analysis)),
        }
    }

    /// Formats the result of `status`
    pub fn format_status(
        &self,
        status: &InstallStatus,
        config: &RimeLoggerConfig,
    ) -> Result<String> {
        let view = StatusView {
            status,
            config: config.to_display_map().into_iter().collect(),
        };
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&view).context("Failed to serialize status to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(&view).context("Failed to serialize status to YAML")
            }
            OutputFormat::Human => Ok(self.format_status_human(status)),
        }
    }

    fn format_analysis_human(&self, analysis: &LogAnalysis) -> String {
        let m = &analysis.metrics;
        let mut output = String::new();

        output.push_str("Input Habit Analysis\n");
        output.push_str(RULE);
        output.push_str("\n\n");
        output.push_str(&format!("Log File: {}\n\n", analysis.log_file.display()));

        output.push_str("Commits:\n");
        output.push_str(&format!("\u{251C}\u{2500} Total:            {}\n", m.total_commits));
        output.push_str(&format!("\u{251C}\u{2500} Candidate picks:  {}\n", m.total_selections));
        output.push_str(&format!("\u{2514}\u{2500} Direct input:     {}\n", m.raw_input_commits));

        if m.has_valid_selections {
            output.push_str("\nPrediction Accuracy:\n");
            output.push_str(&format!(
                "\u{251C}\u{2500} First choice hit rate: {}  ({}/{})\n",
                percent(m.first_choice_hit_rate),
                m.first_choice_count,
                m.total_selections
            ));
            output.push_str(&format!(
                "\u{251C}\u{2500} Top-3 hit rate:        {}  ({}/{})\n",
                percent(m.top3_hit_rate),
                m.top3_count,
                m.total_selections
            ));
            output.push_str(&format!(
                "\u{251C}\u{2500} Average rank:          {}\n",
                decimal(m.average_rank, 2)
            ));
            output.push_str(&format!(
                "\u{2514}\u{2500} Accuracy score:        {}\n",
                decimal(m.overall_accuracy_score, 3)
            ));
        }

        if m.has_commits {
            output.push_str(&format!(
                "\nDirect input rate: {}\n",
                percent(m.direct_input_rate)
            ));
        }

        let p = &analysis.parse;
        if p.malformed_lines > 0 {
            output.push_str(&format!(
                "\n\u{26A0} Skipped {} malformed line(s) of {}\n",
                p.malformed_lines, p.lines_read
            ));
        }

        output
    }

    fn format_status_human(&self, status: &InstallStatus) -> String {
        let mut output = String::new();

        output.push_str("Rime Logger Status\n");
        output.push_str(RULE);
        output.push_str("\n\n");
        output.push_str(&format!("User Dir: {}\n\n", status.user_dir.display()));

        output.push_str("Scripts:\n");
        for file in [&status.logger_script, &status.config_script] {
            let mark = if file.present { CHECK } else { CROSS };
            output.push_str(&format!("  {} {}\n", mark, file.path.display()));
        }

        let (mark, state) = match status.schema {
            SchemaState::Configured => (CHECK, "configured"),
            SchemaState::NotConfigured => (CROSS, "not configured"),
            SchemaState::Missing => (CROSS, "not found"),
            SchemaState::Unreadable => (CROSS, "unreadable"),
        };
        output.push_str(&format!(
            "\nSchema:\n  {} {} ({})\n",
            mark,
            status.schema_file.display(),
            state
        ));

        let source = match &status.log_file.source {
            LogPathSource::Default => "default".to_string(),
            LogPathSource::Preset(name) => format!("preset '{}'", name),
        };
        let mark = if status.log_file_exists { CHECK } else { CROSS };
        output.push_str(&format!(
            "\nLog File ({}):\n  {} {}\n",
            source,
            mark,
            status.log_file.path.display()
        ));
        if !status.log_file_exists {
            output.push_str("  Type something to generate the log.\n");
        }

        output
    }
}

fn percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}%", v))
        .unwrap_or_else(|| "n/a".to_string())
}

fn decimal(value: Option<f64>, places: usize) -> String {
    value
        .map(|v| format!("{:.*}", places, v))
        .unwrap_or_else(|| "n/a".to_string())
}
