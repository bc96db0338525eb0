//! Verification harness driving an xml2rfc resolution service over archived paths.

use std::path::PathBuf;
use std::time::Duration;

use pathprobe::logging;
use pathprobe::run::{self, RunConfig};
use url::Url;

fn main() {
    let args = match parse_args(std::env::args().skip(1).collect()) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(1);
        }
    };

    if let Err(err) = logging::init(args.verbosity) {
        eprintln!("Logging disabled: {err}");
    }

    match run::run(&args.config) {
        Ok(summary) => {
            tracing::info!(
                "Run complete: {} directories done, {} skipped; failed {}, mapping {}, auto {}, fallback {}",
                summary.completed_directories,
                summary.failed_directories,
                summary.stats.failed,
                summary.stats.used_mapping,
                summary.stats.used_auto_resolution,
                summary.stats.used_fallback,
            );
            // Individually skipped directories still exit 0; partial results
            // are the point of a multi-directory run.
        }
        Err(err) => {
            tracing::error!("{err}");
            std::process::exit(1);
        }
    }
}

struct Args {
    config: RunConfig,
    verbosity: u8,
}

fn parse_args(args: Vec<String>) -> Result<Args, String> {
    if args.iter().any(|a| a == "-h" || a == "--help") {
        return Err(help_text());
    }

    let mut api_root: Option<String> = None;
    let mut archive_root: Option<PathBuf> = None;
    let mut dirname: Option<String> = None;
    let mut reference_root: Option<String> = None;
    let mut reports_dir: Option<PathBuf> = None;
    let mut check_aliases = false;
    let mut randomize = false;
    let mut resume_offset = 0usize;
    let mut delay: Option<Duration> = None;
    let mut verbosity = 1u8;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--api-root" => {
                api_root = Some(parse_root_url(&next_value(&args, &mut i, "--api-root")?)?);
            }
            "--archive-root" => {
                archive_root = Some(PathBuf::from(next_value(&args, &mut i, "--archive-root")?));
            }
            "--dirname" => {
                dirname = Some(next_value(&args, &mut i, "--dirname")?);
            }
            "--reference-root" => {
                reference_root =
                    Some(parse_root_url(&next_value(&args, &mut i, "--reference-root")?)?);
            }
            "--reports-dir" => {
                reports_dir = Some(PathBuf::from(next_value(&args, &mut i, "--reports-dir")?));
            }
            "--check-aliases" => {
                check_aliases = true;
            }
            "--randomize" => {
                randomize = true;
            }
            "--resume-offset" => {
                let value = next_value(&args, &mut i, "--resume-offset")?;
                resume_offset = value
                    .parse()
                    .map_err(|_| format!("Invalid --resume-offset '{value}'"))?;
            }
            "--delay-ms" => {
                let value = next_value(&args, &mut i, "--delay-ms")?;
                let millis: u64 = value
                    .parse()
                    .map_err(|_| format!("Invalid --delay-ms '{value}'"))?;
                delay = (millis > 0).then(|| Duration::from_millis(millis));
            }
            "--verbosity" => {
                let value = next_value(&args, &mut i, "--verbosity")?;
                verbosity = value
                    .parse()
                    .map_err(|_| format!("Invalid --verbosity '{value}'"))?;
            }
            unknown => return Err(format!("Unknown argument '{unknown}'\n\n{}", help_text())),
        }
        i += 1;
    }

    let api_root = api_root.ok_or_else(|| format!("Missing --api-root\n\n{}", help_text()))?;
    let archive_root =
        archive_root.ok_or_else(|| format!("Missing --archive-root\n\n{}", help_text()))?;
    if !archive_root.is_dir() {
        return Err(format!("Not a directory: {}", archive_root.display()));
    }

    Ok(Args {
        config: RunConfig {
            api_root,
            archive_root,
            dirname,
            reference_root,
            reports_dir,
            check_aliases,
            randomize,
            resume_offset,
            delay,
        },
        verbosity,
    })
}

fn parse_root_url(value: &str) -> Result<String, String> {
    let url = Url::parse(value).map_err(|err| format!("Invalid URL '{value}': {err}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("Unsupported URL scheme '{}'", url.scheme()));
    }
    Ok(value.trim_end_matches('/').to_string())
}

fn next_value(args: &[String], i: &mut usize, name: &str) -> Result<String, String> {
    let next = args
        .get(*i + 1)
        .ok_or_else(|| format!("Missing value for {name}"))?;
    *i += 1;
    Ok(next.clone())
}

fn help_text() -> String {
    "Usage: pathprobe --api-root <url> --archive-root <dir> [options]\n\n\
Options:\n\
  --api-root <url>         Root URL of the resolution service under test\n\
  --archive-root <dir>     Directory tree of archived xml2rfc paths\n\
  --dirname <name>         Probe only this directory\n\
  --reference-root <url>   Compare responses against this reference service\n\
  --reports-dir <dir>      Write per-directory HTML reports and counters here\n\
  --check-aliases          Also probe each directory's compatibility aliases\n\
  --randomize              Shuffle the probe order\n\
  --resume-offset <n>      Skip the first n paths (single dirname, no aliases,\n\
                           no randomization) and resume prior counters\n\
  --delay-ms <n>           Pause between path probes\n\
  --verbosity <n>          0 warnings only, 1 progress (default), 2 debug\n"
        .to_string()
}
