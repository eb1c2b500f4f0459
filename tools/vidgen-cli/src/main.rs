//! vidgen CLI: turn a video document into bash scripts and run them.
//!
//! Usage:
//!   vidgen <DOCUMENT> <EXPORT_DIR>             Generate scripts and render
//!   vidgen <DOCUMENT> <EXPORT_DIR> --no-run    Generate scripts only
//!   vidgen <DOCUMENT> <EXPORT_DIR> --status    Report cache state per video
//!   vidgen <DOCUMENT> <EXPORT_DIR> --validate  Validate the document only

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use vidgen_common::config::AppConfig;
use vidgen_common::error::VidgenError;

mod commands;

#[derive(Parser)]
#[command(
    name = "vidgen",
    about = "Generate ffmpeg bash scripts from a YAML video document",
    version,
    author
)]
struct Cli {
    /// Path to the YAML video document
    document: PathBuf,

    /// Directory receiving the generated scripts and videos
    export_dir: PathBuf,

    /// Regenerate every video, ignoring stored fingerprints
    #[arg(short, long)]
    force: bool,

    /// Do not ask for confirmation in force mode
    #[arg(short, long)]
    yes: bool,

    /// Only load and validate the document
    #[arg(long, conflicts_with_all = ["status", "no_run"])]
    validate: bool,

    /// Report which videos are current without writing anything
    #[arg(long, conflicts_with = "no_run")]
    status: bool,

    /// Write the scripts but do not run them
    #[arg(long)]
    no_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit structured JSON logs
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(VidgenError::usage(err.to_string()).exit_code())
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let mut config = AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    vidgen_common::logging::init_logging(&config.logging);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = match err.downcast_ref::<VidgenError>() {
                Some(e) => e.exit_code(),
                None => 1,
            };
            if code != vidgen_common::error::EXIT_DECLINED {
                eprintln!("Error: {err:#}");
            }
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    if cli.validate {
        return commands::validate::run(&cli.document);
    }
    if cli.status {
        return commands::status::run(&cli.document, &cli.export_dir, &config);
    }
    commands::generate::run(commands::generate::GenerateOptions {
        document: cli.document,
        export_dir: cli.export_dir,
        force: cli.force,
        assume_yes: cli.yes,
        execute: !cli.no_run,
        config,
    })
    .await
}
