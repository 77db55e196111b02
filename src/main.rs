// =============================================================================
// augment: Main Entry Point
// =============================================================================
//
// Reads every candle file in the input folder, appends indicator columns and
// writes the result under the same name in the output folder.  Argument,
// configuration and backend errors exit with status 1 before any file is
// touched; per-file failures are logged and do not change the exit status.
// =============================================================================

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ohlcv_augment::driver;
use ohlcv_augment::run_config::RunConfig;

#[derive(Parser, Debug)]
#[command(name = "augment", version, about = "Append technical indicators to OHLCV csv files")]
struct Args {
    /// Folder holding one csv file per symbol
    input_folder: Option<PathBuf>,

    /// Folder receiving the enriched files
    output_folder: Option<PathBuf>,

    /// Worker threads (0 = one per CPU); overrides the config file
    #[arg(long, env = "AUGMENT_WORKERS")]
    workers: Option<usize>,

    /// JSON run configuration (indicators, periods, workers)
    #[arg(long, env = "AUGMENT_CONFIG")]
    config: Option<PathBuf>,

    /// Write the effective run configuration to FILE and exit
    #[arg(long, value_name = "FILE")]
    write_config: Option<PathBuf>,
}

fn main() -> ExitCode {
    // ── 1. Environment & logging ─────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if !e.use_stderr() => {
            // --help / --version
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(1);
        }
    };

    // ── 2. Run configuration ─────────────────────────────────────────────
    let mut config = match &args.config {
        Some(path) => match RunConfig::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                let detail = format!("{e:#}");
                error!(error = %detail, "invalid run config");
                return ExitCode::from(1);
            }
        },
        None => RunConfig::default(),
    };
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(path) = &args.write_config {
        return match config.save(path) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                let detail = format!("{e:#}");
                error!(error = %detail, "could not write run config");
                ExitCode::from(1)
            }
        };
    }

    // ── 3. Arguments ─────────────────────────────────────────────────────
    let (input, output) = match driver::validate_dirs(
        args.input_folder.as_deref(),
        args.output_folder.as_deref(),
    ) {
        Ok(dirs) => dirs,
        Err(e) => {
            error!(error = %e, "usage: augment <input_folder> <output_folder>");
            return ExitCode::from(1);
        }
    };

    info!(
        input = %input.display(),
        output = %output.display(),
        workers = config.resolved_workers(),
        "augmentation starting"
    );

    // ── 4. Run ───────────────────────────────────────────────────────────
    match driver::run(&input, &output, &config) {
        Ok(summary) => {
            if summary.failed > 0 {
                warn!(failed = summary.failed, "some files were not written");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let detail = format!("{e:#}");
            error!(error = %detail, "augmentation aborted");
            ExitCode::from(1)
        }
    }
}
