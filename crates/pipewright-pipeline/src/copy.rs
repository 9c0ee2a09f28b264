//! Static asset copying.

use std::fs;
use std::path::PathBuf;

use rayon::prelude::*;

use crate::config::BuildConfig;
use crate::record::discover;

/// One directory copy: files under `from` matching `extensions` (all files
/// when empty) land under `to` at the same relative path.
#[derive(Debug, Clone)]
pub struct CopyJob {
    pub name: &'static str,
    pub from: PathBuf,
    pub to: PathBuf,
    pub extensions: &'static [&'static str],
}

/// Outcome of one copy job.
#[derive(Debug, Default)]
pub struct CopyReport {
    pub copied: usize,
    pub failed: Vec<(PathBuf, String)>,
}

/// Outcome of all copy jobs.
#[derive(Debug, Default)]
pub struct CopySummary {
    pub copied: usize,
    pub failed: Vec<(PathBuf, String)>,
}

impl CopySummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Libraries, translations and static HTML assets.
pub fn jobs(config: &BuildConfig) -> Vec<CopyJob> {
    vec![
        CopyJob {
            name: "lib",
            from: config.lib_dir.clone(),
            to: config.output_dir.join("lib"),
            extensions: &["js", "map"],
        },
        CopyJob {
            name: "lang",
            from: config.lang_dir.clone(),
            to: config.output_dir.join("lang"),
            extensions: &["js"],
        },
        CopyJob {
            name: "html",
            from: config.html_dir.clone(),
            to: config.output_dir.clone(),
            extensions: &[],
        },
    ]
}

/// Copy every file of one job. A failing file is logged and the rest still
/// copy.
pub fn copy_job(job: &CopyJob) -> CopyReport {
    let mut report = CopyReport::default();

    for source in discover(&job.from, job.extensions) {
        let relative = source.strip_prefix(&job.from).unwrap_or(&source);
        let target = job.to.join(relative);

        let result = target
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| fs::copy(&source, &target));

        match result {
            Ok(_) => report.copied += 1,
            Err(e) => {
                tracing::error!("[{}] Failed to copy {}: {}", job.name, source.display(), e);
                report.failed.push((source, e.to_string()));
            }
        }
    }

    tracing::debug!("[{}] Copied {} files", job.name, report.copied);
    report
}

/// Run all copy jobs in parallel and wait for every one of them.
pub fn run(config: &BuildConfig) -> CopySummary {
    jobs(config)
        .par_iter()
        .map(copy_job)
        .collect::<Vec<_>>()
        .into_iter()
        .fold(CopySummary::default(), |mut summary, report| {
            summary.copied += report.copied;
            summary.failed.extend(report.failed);
            summary
        })
}
