//! Orchestration of a verification run across directories and aliases.
//!
//! One directory failing (bad alias, unreadable archive, sink that cannot
//! open) is logged and skipped so a multi-directory run still produces
//! partial results. Reporter write failures abort only their directory.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::aliases::{self, AliasError};
use crate::archive::{self, ArchiveError};
use crate::http_client;
use crate::probe::{ProbePhase, probe_path_with};
use crate::report::{ReportError, Reporter, Stats};

/// Everything a run needs, assembled by the CLI.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Root URL of the resolution service under test.
    pub api_root: String,
    /// Filesystem root holding one subdirectory per xml2rfc directory.
    pub archive_root: PathBuf,
    /// Restrict the run to a single directory.
    pub dirname: Option<String>,
    /// Root URL of the reference service to compare against.
    pub reference_root: Option<String>,
    /// Where reports and counters are written; no sink when absent.
    pub reports_dir: Option<PathBuf>,
    /// Also probe each directory's compatibility aliases.
    pub check_aliases: bool,
    /// Shuffle the probe order.
    pub randomize: bool,
    /// Skip this many paths from the front of the natural order.
    pub resume_offset: usize,
    /// Pause between path probes.
    pub delay: Option<Duration>,
}

/// Aggregate result of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Directories processed to completion.
    pub completed_directories: usize,
    /// Directories skipped because of a directory-level failure.
    pub failed_directories: usize,
    /// Counters summed over all completed directories with a sink.
    pub stats: Stats,
}

/// Failures that abort the whole run before any directory is processed.
#[derive(Debug, Error)]
pub enum RunError {
    /// The archive root could not be listed to discover directories.
    #[error("Failed to list archive root {path}: {source}")]
    ListArchiveRoot {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failures that abort a single directory.
#[derive(Debug, Error)]
enum DirectoryError {
    #[error(transparent)]
    Alias(#[from] AliasError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Probe every directory of the configured run.
pub fn run(config: &RunConfig) -> Result<RunSummary, RunError> {
    let dirnames = match &config.dirname {
        Some(dirname) => vec![dirname.clone()],
        None => list_directories(&config.archive_root)?,
    };
    let resume_offset = effective_resume_offset(config);

    let agent = http_client::agent();
    let mut summary = RunSummary::default();
    for dirname in &dirnames {
        match run_directory(agent, config, dirname, resume_offset) {
            Ok(stats) => {
                summary.completed_directories += 1;
                if let Some(stats) = stats {
                    summary.stats.failed += stats.failed;
                    summary.stats.used_fallback += stats.used_fallback;
                    summary.stats.used_mapping += stats.used_mapping;
                    summary.stats.used_auto_resolution += stats.used_auto_resolution;
                }
            }
            Err(err) => {
                tracing::error!("Failed to test directory {dirname} ({err})");
                summary.failed_directories += 1;
            }
        }
    }
    Ok(summary)
}

/// Validate the resume offset against the joint resume condition.
///
/// Offsets only line up with a prior run when exactly one directory is
/// targeted and neither aliasing nor randomization reorders the probes.
/// An inconsistent combination degrades to 0 with a warning.
fn effective_resume_offset(config: &RunConfig) -> usize {
    if config.resume_offset == 0 {
        return 0;
    }
    if config.dirname.is_none() || config.check_aliases || config.randomize {
        tracing::warn!(
            "Resume offset requires a single directory without aliases or randomization; \
             starting from 0",
        );
        return 0;
    }
    config.resume_offset
}

fn run_directory(
    agent: &ureq::Agent,
    config: &RunConfig,
    dirname: &str,
    resume_offset: usize,
) -> Result<Option<Stats>, DirectoryError> {
    let aliases = if config.check_aliases {
        let expanded = aliases::expand(dirname)?;
        tracing::debug!("Dirname {dirname} unpacked to include {}", expanded.join(", "));
        expanded
    } else {
        vec![dirname.to_string()]
    };

    let mut reporter = match &config.reports_dir {
        Some(reports_dir) => Some(Reporter::open(
            reports_dir,
            &config.api_root,
            dirname,
            config.reference_root.as_deref(),
            resume_offset > 0,
        )?),
        None => None,
    };

    let listing =
        match archive::enumerate(&config.archive_root, dirname, config.randomize, resume_offset) {
            Ok(listing) => listing,
            Err(err) => {
                // Close with the abort trailer so the report is not left
                // looking like a completed run with zero counters.
                if let Some(reporter) = &mut reporter {
                    let _ = reporter.close(Some(&err.to_string()));
                }
                return Err(err.into());
            }
        };

    for alias in &aliases {
        let mut progress = Progress::new(alias, listing.total, resume_offset);
        let mut remaining = listing.paths.len();
        for path in &listing.paths {
            let Some(basename) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let subpath = format!("{alias}/{basename}");
            let outcome = probe_path_with(
                agent,
                &subpath,
                &config.api_root,
                config.reference_root.as_deref(),
                |phase| {
                    progress.status(match phase {
                        ProbePhase::Resolving => "resolving",
                        ProbePhase::Comparing => "comparing",
                    });
                },
            );
            if let Some(reporter) = &mut reporter {
                if let Err(err) = reporter.report(&subpath, &outcome) {
                    progress.finish();
                    let _ = reporter.close(Some(&err.to_string()));
                    return Err(err.into());
                }
            }
            progress.advance();

            remaining -= 1;
            if remaining > 0 {
                if let Some(delay) = config.delay {
                    progress.status("sleeping");
                    std::thread::sleep(delay);
                }
            }
        }
        progress.finish();
    }

    let stats = match &mut reporter {
        Some(reporter) => {
            let stats = *reporter.stats();
            reporter.close(None)?;
            tracing::info!(
                "{dirname}: failed {}, mapping {}, auto {}, fallback {}",
                stats.failed,
                stats.used_mapping,
                stats.used_auto_resolution,
                stats.used_fallback,
            );
            Some(stats)
        }
        None => None,
    };
    Ok(stats)
}

fn list_directories(archive_root: &Path) -> Result<Vec<String>, RunError> {
    let mut dirnames = std::fs::read_dir(archive_root)
        .map_err(|source| RunError::ListArchiveRoot {
            path: archive_root.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect::<Vec<_>>();
    dirnames.sort();
    Ok(dirnames)
}

/// Single-line progress display on stderr, tqdm-fashion.
struct Progress {
    label: String,
    total: usize,
    done: usize,
}

impl Progress {
    fn new(label: &str, total: usize, done: usize) -> Self {
        Self {
            label: label.to_string(),
            total,
            done,
        }
    }

    fn status(&self, status: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(
            stderr,
            "\r{}: {}/{} {}        ",
            self.label, self.done, self.total, status,
        );
        let _ = stderr.flush();
    }

    fn advance(&mut self) {
        self.done += 1;
    }

    fn finish(&self) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "\r{}: {}/{} done        ", self.label, self.done, self.total);
    }
}
