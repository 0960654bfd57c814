use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::analysis::DEFAULT_REPORT_FILE;
use crate::rime::Preset;

/// Input habit logger for the Rime input method
#[derive(Parser, Debug)]
#[command(
    name = "rime-logger",
    about = "Install the Rime input habit logger and analyze its logs",
    version,
    author,
    long_about = "rime-logger installs a Lua input habit logger into a Rime user directory, \
                  registers it in the schema, and analyzes the resulting event log to report \
                  how often the first predicted candidate was the one actually committed."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Rime user directory (auto-detected by default)"
    )]
    pub rime_dir: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_name = "FILE",
        help = "Schema file name inside the Rime user directory"
    )]
    pub schema: Option<String>,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Install the logger scripts and enable them in the schema",
        long_about = "Copies input_habit_logger.lua and input_habit_logger_config.lua into \
                      <rime-dir>/lua, selects a logging preset and registers the logger in the \
                      schema. An existing config script is kept; only its preset is changed. \
                      The schema is backed up to <schema>.bak before it is modified.\n\n\
                      Examples:\n  \
                      rime-logger install\n  \
                      rime-logger install --preset developer\n  \
                      rime-logger install --assets-dir ./assets"
    )]
    Install(InstallArgs),

    #[command(
        about = "Remove the logger scripts and the schema entry",
        long_about = "Deletes the logger scripts from <rime-dir>/lua and removes the logger \
                      entry from the schema, backing it up to <schema>.uninstall.bak first.\n\n\
                      Examples:\n  \
                      rime-logger uninstall\n  \
                      rime-logger uninstall --keep-config"
    )]
    Uninstall(UninstallArgs),

    #[command(
        about = "Show the installation status",
        long_about = "Reports whether the scripts are installed, whether the schema is \
                      configured, and where the log file is.\n\n\
                      Examples:\n  \
                      rime-logger status\n  \
                      rime-logger status --format json"
    )]
    Status(StatusArgs),

    #[command(
        about = "Compute prediction accuracy from the log",
        long_about = "Reads the event log and reports first-choice and top-3 hit rates, \
                      average selected rank, an accuracy score and the direct input rate.\n\n\
                      Examples:\n  \
                      rime-logger analyze\n  \
                      rime-logger analyze --log ./input_habit_log_structured.jsonl --format yaml"
    )]
    Analyze(AnalyzeArgs),

    #[command(
        about = "Export mispredictions to CSV",
        long_about = "Writes every commit where the chosen candidate was not the first \
                      prediction to a CSV file, most frequent words first.\n\n\
                      Examples:\n  \
                      rime-logger export-misses\n  \
                      rime-logger export-misses -o misses.csv"
    )]
    ExportMisses(ExportMissesArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct InstallArgs {
    #[arg(
        short = 'p',
        long,
        value_enum,
        default_value = "normal",
        help = "Logging preset"
    )]
    pub preset: PresetArg,

    #[arg(
        long,
        value_name = "DIR",
        help = "Directory containing the Lua scripts to install"
    )]
    pub assets_dir: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct UninstallArgs {
    #[arg(long, help = "Keep input_habit_logger_config.lua")]
    pub keep_config: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct StatusArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(
        short = 'l',
        long,
        value_name = "FILE",
        help = "Log file (defaults to the path configured for the active preset)"
    )]
    pub log: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ExportMissesArgs {
    #[arg(
        short = 'l',
        long,
        value_name = "FILE",
        help = "Log file (defaults to the path configured for the active preset)"
    )]
    pub log: Option<PathBuf>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        default_value = DEFAULT_REPORT_FILE,
        help = "CSV file to write"
    )]
    pub output: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetArg {
    Normal,
    Developer,
    Advanced,
    Custom,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Normal => Preset::Normal,
            PresetArg::Developer => Preset::Developer,
            PresetArg::Advanced => Preset::Advanced,
            PresetArg::Custom => Preset::Custom,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
