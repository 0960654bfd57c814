pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{
    AnalyzeArgs, CliArgs, Commands, ExportMissesArgs, InstallArgs, OutputFormatArg, PresetArg,
    StatusArgs, UninstallArgs,
};
pub use output::{OutputFormat, OutputFormatter};
