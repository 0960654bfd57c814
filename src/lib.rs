//! rime-logger - input habit logging for the Rime input method
//!
//! This library installs a Lua logger into a Rime user directory and analyzes
//! the line-delimited event log it produces.
//!
//! # Core Concepts
//!
//! - **Event log**: one JSON object per line; `text_committed` events record
//!   which ranked candidate the user picked for an input sequence
//! - **Metrics**: first-choice and top-3 hit rates, average rank, an accuracy
//!   score and the share of commits typed without any candidate
//! - **Mispredictions**: commits where the chosen candidate was not the first
//!   prediction, exported as a ranked CSV report
//! - **Schema patching**: idempotent registration of the logger after the
//!   `punctuator` processor, with a `.bak` backup before every rewrite
//!
//! # Example Usage
//!
//! ```no_run
//! use rime_logger::analysis::analyze_log;
//! use std::path::Path;
//!
//! let analysis = analyze_log(Path::new("input_habit_log_structured.jsonl"))?;
//! if let Some(rate) = analysis.metrics.first_choice_hit_rate {
//!     println!("First choice hit rate: {:.2}%", rate);
//! }
//! # Ok::<(), rime_logger::AnalysisError>(())
//! ```
//!
//! # Project Structure
//!
//! - [`analysis`]: log parsing, metrics and misprediction export
//! - [`rime`]: user-directory layout, Lua config and schema patching
//! - [`fs`]: file system abstraction with an in-memory test double
//! - [`cli`]: command-line interface

pub mod analysis;
pub mod cli;
pub mod config;
pub mod fs;
pub mod rime;
pub mod util;

pub use analysis::{
    analyze_log, export_misses, AnalysisError, AnalysisResult, EventRecord, LogAnalysis,
    MissRecord,
};
pub use config::{ConfigError, RimeLoggerConfig};
pub use rime::{Installer, PatchError, Preset, RimeLayout, SchemaDocument, SchemaPatcher};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
