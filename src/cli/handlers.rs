//! Command handlers
//!
//! Each handler runs one subcommand and returns the process exit code.
//! Results go to stdout, diagnostics to stderr.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{error, info, warn};

use super::commands::{
    AnalyzeArgs, CliArgs, ExportMissesArgs, InstallArgs, StatusArgs, UninstallArgs,
};
use super::output::{OutputFormat, OutputFormatter};
use crate::analysis::{analyze_log, export_misses, miss_count, read_log_file, ExportOutcome};
use crate::config::RimeLoggerConfig;
use crate::fs::{FileSystem, RealFileSystem};
use crate::rime::{
    ConfigAction, InstallOutcome, Installer, LogPathSource, Preset, RemovalOutcome,
    RevertOutcome, RimeLayout,
};

/// Environment configuration with command-line overrides applied
pub fn load_config(args: &CliArgs) -> RimeLoggerConfig {
    let mut config = RimeLoggerConfig::default();
    if let Some(dir) = &args.rime_dir {
        config.user_dir = Some(dir.clone());
    }
    if let Some(schema) = &args.schema {
        config.schema_file = schema.clone();
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.to_lowercase();
    }
    config
}

fn exit_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn discover(fs: &dyn FileSystem, config: &RimeLoggerConfig) -> Result<RimeLayout> {
    config.validate()?;
    Ok(RimeLayout::discover(fs, config)?)
}

/// `--log` if given, otherwise the path configured for the active preset
fn log_path(
    fs: &dyn FileSystem,
    config: &RimeLoggerConfig,
    explicit: Option<&PathBuf>,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.clone());
    }

    let layout = discover(fs, config).context("Cannot locate the log file; pass --log")?;
    let resolved = layout.log_file_path(fs);
    if let LogPathSource::Preset(preset) = &resolved.source {
        info!(%preset, path = %resolved.path.display(), "Using log path from config script");
    }
    Ok(resolved.path)
}

pub fn handle_install(args: &InstallArgs, config: &RimeLoggerConfig) -> i32 {
    exit_code(run_install(args, config))
}

fn run_install(args: &InstallArgs, config: &RimeLoggerConfig) -> Result<()> {
    let fs = RealFileSystem::new();
    let layout = discover(&fs, config)?;
    println!("Rime user directory: {}", layout.user_dir.display());

    let preset = Preset::from(args.preset);
    if !preset.is_installable() {
        println!("Custom mode selected.");
        println!("Install with one of the other presets first, then edit this file to suit your needs:");
        println!("  {}", layout.config_script().display());
        return Ok(());
    }

    let assets_dir = args.assets_dir.clone().unwrap_or_else(|| config.assets_dir());
    let installer = Installer::new(&fs, layout, assets_dir);
    let report = installer.install(preset)?;

    println!("Installed: {}", report.logger_script.display());
    match report.config_action {
        ConfigAction::Created => println!(
            "Installed config with preset '{}': {}",
            report.preset,
            report.config_script.display()
        ),
        ConfigAction::PresetUpdated => println!(
            "Kept existing config, preset set to '{}': {}",
            report.preset,
            report.config_script.display()
        ),
    }
    match &report.schema {
        InstallOutcome::Installed { line, backup } => {
            println!("Schema backed up to: {}", backup.display());
            println!(
                "Logger registered in {} (line {})",
                installer.layout().schema_file.display(),
                line
            );
        }
        InstallOutcome::AlreadyInstalled => println!("Schema already configured, no changes needed"),
    }

    println!();
    println!("Installation complete. Re-deploy Rime for the changes to take effect.");
    Ok(())
}

pub fn handle_uninstall(args: &UninstallArgs, config: &RimeLoggerConfig) -> i32 {
    exit_code(run_uninstall(args, config))
}

fn run_uninstall(args: &UninstallArgs, config: &RimeLoggerConfig) -> Result<()> {
    let fs = RealFileSystem::new();
    let layout = discover(&fs, config)?;
    println!("Rime user directory: {}", layout.user_dir.display());

    let installer = Installer::new(&fs, layout, config.assets_dir());
    let report = installer.uninstall(args.keep_config)?;
    let layout = installer.layout();

    for (path, outcome) in [
        (layout.logger_script(), report.logger_script),
        (layout.config_script(), report.config_script),
    ] {
        match outcome {
            RemovalOutcome::Removed => println!("Removed: {}", path.display()),
            RemovalOutcome::NotFound => println!("Not found: {}", path.display()),
            RemovalOutcome::Kept => println!("Kept: {}", path.display()),
        }
    }

    match &report.schema {
        RevertOutcome::Reverted { removed, backup } => {
            println!("Schema backed up to: {}", backup.display());
            println!(
                "Removed {} logger entr{} from {}",
                removed,
                if *removed == 1 { "y" } else { "ies" },
                layout.schema_file.display()
            );
        }
        RevertOutcome::NotInstalled => println!("Logger entry not found in schema, no changes needed"),
        RevertOutcome::SchemaMissing => println!(
            "Schema file not found, skipped: {}",
            layout.schema_file.display()
        ),
    }

    println!();
    println!("Uninstall complete. Re-deploy Rime for the changes to take effect.");
    Ok(())
}

pub fn handle_status(args: &StatusArgs, config: &RimeLoggerConfig) -> i32 {
    exit_code(run_status(args, config))
}

fn run_status(args: &StatusArgs, config: &RimeLoggerConfig) -> Result<()> {
    let fs = RealFileSystem::new();
    let layout = discover(&fs, config)?;

    let status = Installer::new(&fs, layout, config.assets_dir()).status();
    let formatter = OutputFormatter::new(OutputFormat::from(args.format));
    print!("{}", formatter.format_status(&status, config)?);
    Ok(())
}

pub fn handle_analyze(args: &AnalyzeArgs, config: &RimeLoggerConfig) -> i32 {
    exit_code(run_analyze(args, config))
}

fn run_analyze(args: &AnalyzeArgs, config: &RimeLoggerConfig) -> Result<()> {
    let fs = RealFileSystem::new();
    let path = log_path(&fs, config, args.log.as_ref())?;

    let analysis = analyze_log(&path)?;
    if !analysis.metrics.has_commits {
        warn!(log = %path.display(), "No text commit events found in the log");
    }

    let formatter = OutputFormatter::new(OutputFormat::from(args.format));
    print!("{}", formatter.format_analysis(&analysis)?);
    Ok(())
}

pub fn handle_export_misses(args: &ExportMissesArgs, config: &RimeLoggerConfig) -> i32 {
    exit_code(run_export_misses(args, config))
}

fn run_export_misses(args: &ExportMissesArgs, config: &RimeLoggerConfig) -> Result<()> {
    let fs = RealFileSystem::new();
    let path = log_path(&fs, config, args.log.as_ref())?;

    let parsed = read_log_file(&path)?;
    println!("Log file: {}", path.display());
    println!("Total commits: {}", parsed.records.len());
    println!("Mispredictions: {}", miss_count(&parsed.records));

    match export_misses(&parsed.records, &args.output)? {
        ExportOutcome::Written { path, rows } => {
            println!("Exported {} row(s) to: {}", rows, path.display())
        }
        ExportOutcome::NothingToExport => println!("No mispredictions found, nothing to export"),
    }
    Ok(())
}
