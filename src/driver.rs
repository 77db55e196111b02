// =============================================================================
// Driver: validate folders, fan files out to the pool, collect outcomes
// =============================================================================

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam_channel::unbounded;
use tracing::{error, info, warn};

use crate::error::ArgumentError;
use crate::indicators::IndicatorBackend;
use crate::processor::{SymbolProcessor, SymbolSummary};
use crate::run_config::RunConfig;
use crate::worker_pool::WorkerPool;

/// Per-file result reported back to the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Written(SymbolSummary),
    Failed { input: PathBuf, reason: String },
}

/// Totals for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub discovered: usize,
    pub written: usize,
    pub failed: usize,
    pub rows: usize,
    pub skipped_rows: usize,
    pub outcomes: Vec<FileOutcome>,
}

/// Check the two positional folders before any work is scheduled.
pub fn validate_dirs(
    input: Option<&Path>,
    output: Option<&Path>,
) -> Result<(PathBuf, PathBuf), ArgumentError> {
    let (Some(input), Some(output)) = (input, output) else {
        return Err(ArgumentError::Missing);
    };
    for (which, path) in [("input", input), ("output", output)] {
        if !path.exists() {
            return Err(ArgumentError::NotFound {
                which,
                path: path.to_path_buf(),
            });
        }
        if !path.is_dir() {
            return Err(ArgumentError::NotADirectory {
                which,
                path: path.to_path_buf(),
            });
        }
    }
    if let (Ok(a), Ok(b)) = (input.canonicalize(), output.canonicalize()) {
        if a == b {
            return Err(ArgumentError::SameDirectory { path: a });
        }
    }
    Ok((input.to_path_buf(), output.to_path_buf()))
}

/// Regular, non-hidden files directly inside `dir`, sorted by name.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to list input folder {}", dir.display()))?
    {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden || !path.is_file() {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

/// Process every file in `input_dir` into `output_dir`.
///
/// Per-file failures are logged and counted; only backend or pool start-up
/// failures make this return `Err`.
pub fn run(input_dir: &Path, output_dir: &Path, config: &RunConfig) -> Result<RunSummary> {
    let backend = Arc::new(
        IndicatorBackend::init(&config.indicators, config.params.clone())
            .context("indicator backend failed to initialise")?,
    );

    let files = discover_inputs(input_dir)?;
    info!(
        files = files.len(),
        input = %input_dir.display(),
        output = %output_dir.display(),
        "input files discovered"
    );

    let pool = WorkerPool::new(config.resolved_workers()).context("failed to start worker pool")?;
    let (tx, rx) = unbounded::<FileOutcome>();

    for file in &files {
        let tx = tx.clone();
        let mut processor = SymbolProcessor::new(file, output_dir, backend.clone());
        let submitted = pool.submit(move || {
            let result = processor.run();
            let outcome = match &result {
                Ok(summary) => FileOutcome::Written(summary.clone()),
                Err(e) => FileOutcome::Failed {
                    input: processor.input().to_path_buf(),
                    reason: e.to_string(),
                },
            };
            let _ = tx.send(outcome);
            result
                .map(|_| ())
                .with_context(|| format!("{} failed", processor.input().display()))
        });
        if let Err(e) = submitted {
            error!(path = %file.display(), error = %e, "could not submit file");
        }
    }
    drop(tx);

    pool.drain();
    pool.shutdown();
    let pool_stats = pool.stats();

    let mut summary = RunSummary {
        discovered: files.len(),
        ..RunSummary::default()
    };
    for outcome in rx.iter() {
        match &outcome {
            FileOutcome::Written(s) => {
                summary.written += 1;
                summary.rows += s.rows;
                summary.skipped_rows += s.skipped_rows;
            }
            FileOutcome::Failed { .. } => summary.failed += 1,
        }
        summary.outcomes.push(outcome);
    }
    if pool_stats.panicked > 0 {
        warn!(panicked = pool_stats.panicked, "some tasks panicked");
        summary.failed += pool_stats.panicked;
    }

    // Every task has been joined, so this is the last reference.
    match Arc::try_unwrap(backend) {
        Ok(backend) => {
            backend.shutdown();
        }
        Err(_) => warn!("indicator backend still referenced at shutdown"),
    }

    info!(
        discovered = summary.discovered,
        written = summary.written,
        failed = summary.failed,
        rows = summary.rows,
        skipped_rows = summary.skipped_rows,
        "run complete"
    );
    Ok(summary)
}
