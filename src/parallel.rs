use crate::config::EngineConfig;
use crate::errors::PipelineError;
use crate::metrics::METRICS;
use crate::normalizer::{self, NormalizeOutcome};
use crate::parsers::csv_parser::{self, LoadedFile};
use crate::report::DatasetReport;
use crate::time_operation;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

/// Result of processing a single file
#[derive(Debug, Serialize)]
pub struct FileReportResult {
    pub file_path: String,
    pub report: Option<DatasetReport>,
    pub error: Option<String>,
    pub processing_time_ms: u128,
}

/// Parallel file processor using Rayon
pub struct ParallelProcessor {
    num_workers: usize,
}

impl Default for ParallelProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ParallelProcessor {
    pub fn new() -> Self {
        let num_workers = num_cpus::get();
        info!("Initializing ParallelProcessor with {} workers", num_workers);
        Self { num_workers }
    }

    pub fn with_workers(num_workers: usize) -> Self {
        let num_workers = num_workers.max(1);
        info!("Initializing ParallelProcessor with {} custom workers", num_workers);
        Self { num_workers }
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Reports every file in parallel. Results keep the input order; a
    /// failing file yields an entry with `error` set.
    pub fn process_files(&self, paths: Vec<PathBuf>, config: &EngineConfig) -> Vec<FileReportResult> {
        let total_files = paths.len();
        info!("Starting parallel processing of {} files", total_files);

        let progress = Arc::new(ProgressBar::new(total_files as u64));
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
        )
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress.set_style(style);

        let run = || -> Vec<FileReportResult> {
            paths
                .into_par_iter()
                .map(|path| {
                    let start = Instant::now();
                    let file_path = path.to_string_lossy().to_string();
                    let progress_clone = Arc::clone(&progress);

                    let result = match process_file(&path, config) {
                        Ok(report) => {
                            let processing_time = start.elapsed().as_millis();
                            info!(
                                "Reported {} rows from {} in {}ms",
                                report.rows, file_path, processing_time
                            );
                            FileReportResult {
                                file_path,
                                report: Some(report),
                                error: None,
                                processing_time_ms: processing_time,
                            }
                        }
                        Err(e) => {
                            let processing_time = start.elapsed().as_millis();
                            error!("Failed to process {}: {}", file_path, e);
                            FileReportResult {
                                file_path,
                                report: None,
                                error: Some(e.to_string()),
                                processing_time_ms: processing_time,
                            }
                        }
                    };

                    progress_clone.inc(1);
                    result
                })
                .collect()
        };

        let results = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_workers)
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(e) => {
                warn!("Could not build a {}-thread pool ({}); using the global pool", self.num_workers, e);
                run()
            }
        };

        progress.finish_with_message("File processing completed");
        results
    }
}

/// Read, normalize and summarize one CSV file.
pub fn process_file(path: &Path, config: &EngineConfig) -> Result<DatasetReport, PipelineError> {
    METRICS.lock().record_file_attempt();

    let (loaded, outcome) = match load_and_normalize(path, config) {
        Ok(pair) => pair,
        Err(e) => {
            METRICS.lock().record_file_failure();
            return Err(e);
        }
    };

    {
        let mut metrics = METRICS.lock();
        metrics.record_file_success(loaded.records.len() as u64, loaded.malformed_rows as u64);
        metrics.record_admission(outcome.dataset.len() as u64, outcome.dropped as u64);
    }

    Ok(time_operation!(
        "report",
        DatasetReport::build(
            &outcome,
            config.species_key.field(),
            config.rank_metric,
            config.top_n,
        )
    ))
}

fn load_and_normalize(
    path: &Path,
    config: &EngineConfig,
) -> Result<(LoadedFile, NormalizeOutcome), PipelineError> {
    let delimiter = config.delimiter_byte()?;
    let loaded = time_operation!("read_csv", csv_parser::read_csv(path, delimiter))
        .map_err(|e| PipelineError::Parse(e, path.to_path_buf()))?;
    let outcome = time_operation!(
        "normalize",
        normalizer::normalize(&loaded.records, &config.normalize_options())
    )?;
    Ok((loaded, outcome))
}

/// Expands inputs into concrete files: glob patterns via `glob`,
/// directories recursively via `walkdir` (`.csv` files only), plain paths
/// as given. Output is sorted and deduplicated.
pub fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files = Vec::new();
    for input in inputs {
        if input.contains('*') || input.contains('?') || input.contains('[') {
            let paths = glob::glob(input).map_err(|e| PipelineError::Glob {
                pattern: input.clone(),
                message: e.to_string(),
            })?;
            let before = files.len();
            for entry in paths {
                match entry {
                    Ok(path) if path.is_dir() => files.extend(csv_files_under(&path)),
                    Ok(path) => files.push(path),
                    Err(e) => warn!("Skipping unreadable glob match for {}: {}", input, e),
                }
            }
            info!("Expanded glob {} to {} files", input, files.len() - before);
        } else {
            let path = PathBuf::from(input);
            if path.is_dir() {
                files.extend(csv_files_under(&path));
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn csv_files_under(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping directory entry under {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect()
}
