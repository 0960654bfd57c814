use rime_logger::cli::commands::{CliArgs, Commands};
use rime_logger::cli::handlers::{
    handle_analyze, handle_export_misses, handle_install, handle_status, handle_uninstall,
    load_config,
};
use rime_logger::util::logging::{config_from_env, init_logging, parse_level};
use rime_logger::VERSION;

use clap::Parser;
use tracing::{debug, Level};

fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("rime-logger v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let config = load_config(&args);
    debug!(config = ?config, "Configuration loaded");

    let exit_code = match &args.command {
        Commands::Install(install_args) => handle_install(install_args, &config),
        Commands::Uninstall(uninstall_args) => handle_uninstall(uninstall_args, &config),
        Commands::Status(status_args) => handle_status(status_args, &config),
        Commands::Analyze(analyze_args) => handle_analyze(analyze_args, &config),
        Commands::ExportMisses(export_args) => handle_export_misses(export_args, &config),
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let mut config = config_from_env();

    if let Some(level_str) = &args.log_level {
        config.level = parse_level(level_str);
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }

    init_logging(config);
}
