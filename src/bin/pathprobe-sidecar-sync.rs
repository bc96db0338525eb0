//! Synchronize per-document sidecar metadata with a path-to-docid mapping.

use std::path::PathBuf;

use pathprobe::{logging, mapping, sidecar};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

struct Args {
    mapping_file: PathBuf,
    datadir: PathBuf,
    verbose: bool,
}

fn run() -> Result<(), String> {
    let args = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init(if args.verbose { 2 } else { 1 }) {
        eprintln!("Logging disabled: {err}");
    }

    if !args.datadir.is_dir() {
        return Err(format!("Not a directory: {}", args.datadir.display()));
    }

    tracing::debug!("Reading {}...", args.mapping_file.display());
    let loaded = mapping::load_mapping(&args.mapping_file).map_err(|err| err.to_string())?;
    let mapped = mapping::mapped_entries(&loaded).count();
    tracing::debug!("Given {mapped} mapped path(s)");
    if mapped == 0 {
        eprintln!("Nothing to do: file contains no mapped paths");
        return Ok(());
    }

    let report = sidecar::sync_sidecars(&args.datadir, &loaded).map_err(|err| err.to_string())?;

    println!("Done");
    println!("unchanged sidecar files: {}", report.unchanged);
    println!("updated sidecar files: {}", report.updated);
    println!("new sidecar files: {}", report.created);
    println!("orphaned sidecar files: {}", report.orphaned_removed);
    println!("malformed sidecar files: {}", report.malformed_removed);
    println!("nonexistent paths mapped: {}", report.nonexistent_mapped);
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<Args, String> {
    if args.iter().any(|a| a == "-h" || a == "--help") {
        return Err(help_text());
    }

    let mut positional = Vec::new();
    let mut verbose = false;
    for arg in args {
        match arg.as_str() {
            "--verbose" => verbose = true,
            other if other.starts_with("--") => {
                return Err(format!("Unknown argument '{other}'\n\n{}", help_text()));
            }
            other => positional.push(other.to_string()),
        }
    }

    let [mapping_file, datadir] = positional.as_slice() else {
        return Err(format!("Expected <mapping-file> <datadir>\n\n{}", help_text()));
    };
    Ok(Args {
        mapping_file: PathBuf::from(mapping_file),
        datadir: PathBuf::from(datadir),
        verbose,
    })
}

fn help_text() -> String {
    "Usage: pathprobe-sidecar-sync <mapping-file> <datadir> [--verbose]\n\n\
Removes orphaned and malformed sidecar files under <datadir> and\n\
creates or updates sidecars for every mapped XML document.\n"
        .to_string()
}
