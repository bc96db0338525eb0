//! HTML report and resumable counters for one directory run.
//!
//! The report is append-only HTML with client-side filter controls; the
//! counters file is a small TOML map rewritten in full after every path so
//! that a crash loses at most the in-flight path's accounting.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diff::escape_html;
use crate::outcome::{PathOutcome, ResolutionMethod};

/// Running counters for one directory, persisted after every reported path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Paths whose test request failed.
    pub failed: u64,
    /// Paths resolved by falling back to the bibxml data archive.
    pub used_fallback: u64,
    /// Paths resolved through a manual docid mapping.
    pub used_mapping: u64,
    /// Paths resolved automatically.
    pub used_auto_resolution: u64,
}

impl Stats {
    fn record(&mut self, outcome: &PathOutcome) {
        if outcome.error().is_some() {
            self.failed += 1;
            return;
        }
        match outcome.successful_method().map(|m| m.method) {
            Some(ResolutionMethod::Manual) => self.used_mapping += 1,
            Some(ResolutionMethod::Auto) => self.used_auto_resolution += 1,
            Some(ResolutionMethod::Fallback) => self.used_fallback += 1,
            None => {}
        }
    }
}

/// Errors raised by the report sink.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Continuation was requested but the prior counters cannot be restored.
    ///
    /// Restarting from zero would double-count and desynchronize the resume
    /// offset, so this is a hard failure for the directory.
    #[error("Cannot resume {dirname}: {detail}")]
    CannotResume { dirname: String, detail: String },
    /// Failed to open a report or counters file.
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to write a report or counters file.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Counters could not be serialized.
    #[error("Failed to serialize counters: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Per-directory sink writing the HTML report and the counters file.
#[derive(Debug)]
pub struct Reporter {
    dirname: String,
    api_root: String,
    reference_root: Option<String>,
    report_file: File,
    report_path: PathBuf,
    stats_path: PathBuf,
    stats: Stats,
    closed: bool,
}

impl Reporter {
    /// Open the sink for one directory.
    ///
    /// Fresh mode truncates the report and zeroes the counters. With
    /// `resume` the prior counters file is restored first; if it is missing
    /// or malformed the call fails with [`ReportError::CannotResume`] and
    /// the existing report file is left untouched.
    pub fn open(
        reports_dir: &Path,
        api_root: &str,
        dirname: &str,
        reference_root: Option<&str>,
        resume: bool,
    ) -> Result<Self, ReportError> {
        let report_path = reports_dir.join(format!("{dirname}-report.html"));
        let stats_path = reports_dir.join(format!("{dirname}-stats.toml"));

        let stats = if resume {
            load_stats(&stats_path).map_err(|detail| ReportError::CannotResume {
                dirname: dirname.to_string(),
                detail,
            })?
        } else {
            Stats::default()
        };

        let mut open_options = OpenOptions::new();
        open_options.create(true).write(true);
        if resume {
            open_options.append(true);
        } else {
            open_options.truncate(true);
        }
        let report_file = open_options
            .open(&report_path)
            .map_err(|source| ReportError::Open {
                path: report_path.clone(),
                source,
            })?;

        let mut reporter = Self {
            dirname: dirname.to_string(),
            api_root: api_root.trim_end_matches('/').to_string(),
            reference_root: reference_root.map(|root| root.trim_end_matches('/').to_string()),
            report_file,
            report_path,
            stats_path,
            stats,
            closed: false,
        };
        if !resume {
            let head = reporter.render_head();
            reporter.write_report(&head)?;
        }
        Ok(reporter)
    }

    /// Current counter values.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Append one path entry and persist the updated counters.
    pub fn report(&mut self, subpath: &str, outcome: &PathOutcome) -> Result<(), ReportError> {
        let entry = self.render_entry(subpath, outcome);
        self.write_report(&entry)?;
        self.stats.record(outcome);
        self.persist_stats()
    }

    /// Write the trailer and release both files. Safe to call twice.
    pub fn close(&mut self, abort_reason: Option<&str>) -> Result<(), ReportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let stats_toml = toml::to_string(&self.stats)?;
        let trailer = match abort_reason {
            Some(reason) => format!(
                "</details>\n<h2>Aborted</h2>\n<p>{}</p>\n<pre>{}</pre>\n",
                escape_html(reason),
                escape_html(&stats_toml),
            ),
            None => format!(
                "</details>\n<h2>Stats</h2>\n<pre>{}</pre>\n",
                escape_html(&stats_toml),
            ),
        };
        self.write_report(&trailer)?;
        self.report_file
            .flush()
            .map_err(|source| ReportError::Write {
                path: self.report_path.clone(),
                source,
            })
    }

    fn write_report(&mut self, content: &str) -> Result<(), ReportError> {
        self.report_file
            .write_all(content.as_bytes())
            .map_err(|source| ReportError::Write {
                path: self.report_path.clone(),
                source,
            })
    }

    fn persist_stats(&self) -> Result<(), ReportError> {
        let serialized = toml::to_string(&self.stats)?;
        std::fs::write(&self.stats_path, serialized).map_err(|source| ReportError::Write {
            path: self.stats_path.clone(),
            source,
        })
    }

    fn render_head(&self) -> String {
        let dirname = &self.dirname;
        let api_root = escape_html(&self.api_root);
        let comparison = match &self.reference_root {
            Some(root) => format!(", comparing with {}", escape_html(root)),
            None => String::new(),
        };
        let hide_no_diff_style = if self.reference_root.is_some() {
            ""
        } else {
            "display: none"
        };
        format!(
            r#"<!doctype html>
<head>
<style>
    body, html {{ padding: 0; margin: 0; }}
    body {{ padding: 1em; font-size: 14px; line-height: 1.2; font-family: sans-serif; }}
    h1 {{ font-size: 120%; }}
    pre.xml {{ white-space: pre-line; max-width: 80vw; overflow: auto; background: whiteSmoke; padding: 1em; }}
    .tools a {{ margin-right: 1em; }}
</style>
<meta charset="utf-8">
<title>xml2rfc path report for {dirname} directory</title>
<body>
<h1>xml2rfc path report for {dirname} directory</h1>
<p>Testing {api_root}{comparison}
<p class="tools">
    <a href="javascript:document.querySelectorAll('details').forEach(el => el.setAttribute('open', 'open'))">Open all</a>
    <a href="javascript:document.querySelectorAll('details').forEach(el => el.removeAttribute('open'))">Close all</a>
    <a href="javascript:document.querySelectorAll('details.path:not(.error)').forEach(el => el.style.display = 'none')">Hide successful paths</a>
    <a style="{hide_no_diff_style}" href="javascript:document.querySelectorAll('details.path:not(.has-diff)').forEach(el => el.style.display = 'none')">Hide paths w/o diff</a>
    <a href="javascript:document.querySelectorAll('details.path').forEach(el => el.style.display = 'block')">Show all paths</a>
    <input type="search" placeholder="Filter paths" oninput="const q = this.value.toLowerCase(); document.querySelectorAll('details.path').forEach(el => el.style.display = el.textContent.toLowerCase().includes(q) ? 'block' : 'none')">
</p>
<details>
    <summary>Processed paths</summary>
"#
        )
    }

    fn render_entry(&self, subpath: &str, outcome: &PathOutcome) -> String {
        let test_url = format!("{}/{}", self.api_root, subpath);

        let summary_status = match (outcome.error(), outcome.successful_method()) {
            (Some(_), _) => "<strong>error ⚠️</strong>".to_string(),
            (None, Some(successful)) => successful.method.to_string(),
            (None, None) => "no method reported".to_string(),
        };
        let diff_note = if outcome.diff.is_some() {
            " - diff available"
        } else {
            ""
        };

        let outcome_desc = match (outcome.error(), outcome.successful_method()) {
            (Some(error), _) => {
                let truncated = error.chars().take(500).collect::<String>();
                format!(
                    "<p>Request failed with (error possibly truncated): <pre>{}</pre>",
                    escape_html(&truncated),
                )
            }
            (None, Some(successful)) => format!("<p>{} succeeded", successful.method.label()),
            (None, None) => "<p>Succeeded without reporting a method".to_string(),
        };

        let reference_link = match (&self.reference_root, &outcome.reference) {
            (Some(root), Some(_)) => {
                let ref_url = format!("{root}/{subpath}");
                format!("<p>Comparing with reference: <a href=\"{ref_url}\">{ref_url}</a>")
            }
            _ => String::new(),
        };

        let xml = if let Some(diff) = &outcome.diff {
            // Diff markup is pre-escaped by the diff engine.
            format!("<p>Diff of effective outcome against reference: <pre class=\"xml\">{diff}</pre>")
        } else if outcome.reference.is_some() {
            format!(
                "<details><summary>Obtained XML is identical to reference</summary><pre class=\"xml\">{}</pre></details>",
                escape_html(outcome.resulting_xml().unwrap_or("XML N/A")),
            )
        } else if let Some(xml) = outcome.resulting_xml() {
            format!(
                "<details><summary>Obtained XML</summary><pre class=\"xml\">{}</pre></details>",
                escape_html(xml),
            )
        } else {
            String::new()
        };

        let classes = format!(
            "path {}{}",
            if outcome.error().is_some() {
                "error"
            } else {
                "success"
            },
            if outcome.diff.is_some() { " has-diff" } else { "" },
        );

        format!(
            r#"<details class="{classes}">
    <summary>{subpath} - {summary_status}{diff_note}</summary>
    <div style="padding: 0 1em 1em 1em;">
        <p>Attempted <a href="{test_url}">{test_url}</a>
        {outcome_desc}
        {reference_link}
        {xml}
    </div>
</details>
"#
        )
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        // Best-effort trailer if the caller forgot or bailed early.
        let _ = self.close(None);
    }
}

fn load_stats(path: &Path) -> Result<Stats, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("counters file {} unreadable: {err}", path.display()))?;
    toml::from_str(&raw).map_err(|err| format!("counters file {} malformed: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{MethodOutcome, Resolution};
    use tempfile::tempdir;

    fn resolved(method: ResolutionMethod) -> PathOutcome {
        let successful = MethodOutcome {
            method,
            config: None,
            error: None,
        };
        PathOutcome {
            resolution: Resolution::Resolved {
                xml: "<a/>".to_string(),
                method: Some(successful.clone()),
            },
            methods_tried: vec![successful],
            reference: None,
            diff: None,
        }
    }

    fn failed(error: &str) -> PathOutcome {
        PathOutcome {
            resolution: Resolution::Failed {
                error: error.to_string(),
            },
            methods_tried: Vec::new(),
            reference: None,
            diff: None,
        }
    }

    #[test]
    fn counters_serialization_is_idempotent() {
        let stats = Stats {
            failed: 3,
            used_fallback: 1,
            used_mapping: 4,
            used_auto_resolution: 2,
        };
        assert_eq!(toml::to_string(&stats).unwrap(), toml::to_string(&stats).unwrap());
    }

    #[test]
    fn counters_round_trip_through_toml() {
        let stats = Stats {
            failed: 1,
            used_fallback: 2,
            used_mapping: 3,
            used_auto_resolution: 4,
        };
        let serialized = toml::to_string(&stats).unwrap();
        let restored: Stats = toml::from_str(&serialized).unwrap();
        assert_eq!(restored, stats);
    }

    #[test]
    fn each_outcome_bumps_exactly_one_counter() {
        let dir = tempdir().unwrap();
        let mut reporter =
            Reporter::open(dir.path(), "http://test", "bibxml", None, false).unwrap();
        reporter.report("bibxml/a.xml", &resolved(ResolutionMethod::Manual)).unwrap();
        reporter.report("bibxml/b.xml", &resolved(ResolutionMethod::Auto)).unwrap();
        reporter.report("bibxml/c.xml", &resolved(ResolutionMethod::Fallback)).unwrap();
        reporter.report("bibxml/d.xml", &failed("HTTP 500: boom")).unwrap();
        assert_eq!(
            *reporter.stats(),
            Stats {
                failed: 1,
                used_fallback: 1,
                used_mapping: 1,
                used_auto_resolution: 1,
            },
        );
        reporter.close(None).unwrap();

        let persisted = load_stats(&dir.path().join("bibxml-stats.toml")).unwrap();
        assert_eq!(persisted, *reporter.stats());
    }

    #[test]
    fn fresh_open_truncates_prior_report() {
        let dir = tempdir().unwrap();
        let report_path = dir.path().join("bibxml-report.html");
        std::fs::write(&report_path, "stale content").unwrap();
        let mut reporter =
            Reporter::open(dir.path(), "http://test", "bibxml", None, false).unwrap();
        reporter.close(None).unwrap();
        let html = std::fs::read_to_string(&report_path).unwrap();
        assert!(!html.contains("stale content"));
        assert!(html.contains("xml2rfc path report for bibxml directory"));
        assert!(html.contains("<h2>Stats</h2>"));
    }

    #[test]
    fn resume_restores_persisted_counters() {
        let dir = tempdir().unwrap();
        {
            let mut reporter =
                Reporter::open(dir.path(), "http://test", "bibxml", None, false).unwrap();
            reporter.report("bibxml/a.xml", &failed("HTTP 500: boom")).unwrap();
            reporter.close(None).unwrap();
        }
        let reporter = Reporter::open(dir.path(), "http://test", "bibxml", None, true).unwrap();
        assert_eq!(reporter.stats().failed, 1);
    }

    #[test]
    fn resume_without_counters_fails_and_leaves_report_alone() {
        let dir = tempdir().unwrap();
        let report_path = dir.path().join("bibxml-report.html");
        std::fs::write(&report_path, "previous run").unwrap();
        let err = Reporter::open(dir.path(), "http://test", "bibxml", None, true).unwrap_err();
        assert!(matches!(err, ReportError::CannotResume { .. }), "{err}");
        assert_eq!(std::fs::read_to_string(&report_path).unwrap(), "previous run");
    }

    #[test]
    fn resume_with_malformed_counters_fails() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("bibxml-stats.toml"), "failed = \"lots\"").unwrap();
        let err = Reporter::open(dir.path(), "http://test", "bibxml", None, true).unwrap_err();
        assert!(matches!(err, ReportError::CannotResume { .. }), "{err}");
    }

    #[test]
    fn close_twice_is_a_no_op() {
        let dir = tempdir().unwrap();
        let mut reporter =
            Reporter::open(dir.path(), "http://test", "bibxml", None, false).unwrap();
        reporter.close(Some("operator interrupt")).unwrap();
        reporter.close(None).unwrap();
        let html = std::fs::read_to_string(dir.path().join("bibxml-report.html")).unwrap();
        assert_eq!(html.matches("<h2>").count(), 1);
        assert!(html.contains("<h2>Aborted</h2>"));
        assert!(html.contains("operator interrupt"));
    }

    #[test]
    fn entry_escapes_error_and_body_markup() {
        let dir = tempdir().unwrap();
        let report_path = dir.path().join("bibxml-report.html");
        let mut reporter =
            Reporter::open(dir.path(), "http://test", "bibxml", None, false).unwrap();
        reporter
            .report("bibxml/a.xml", &failed("HTTP 500: <script>alert(1)</script>"))
            .unwrap();
        reporter.close(None).unwrap();
        let html = std::fs::read_to_string(&report_path).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
