//! Convert a YAML `path: docid` mapping into the flat JSON docid list
//! consumed by the indexer.

use std::path::PathBuf;

use pathprobe::mapping;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

struct Args {
    mapping_file: PathBuf,
    dirname: String,
    out: Option<PathBuf>,
    verbose: bool,
}

fn run() -> Result<(), String> {
    let args = parse_args(std::env::args().skip(1).collect())?;

    if args.verbose {
        eprintln!("Reading {}...", args.mapping_file.display());
    }
    let loaded = mapping::load_mapping(&args.mapping_file).map_err(|err| err.to_string())?;
    let entries = mapping::to_docid_list(&loaded, &args.dirname).map_err(|err| err.to_string())?;
    if args.verbose {
        eprintln!("{} paths total, {} mapped", loaded.len(), entries.len());
    }
    if entries.is_empty() {
        eprintln!("Nothing to do: file contains no mapped paths");
        return Ok(());
    }

    let json = serde_json::to_string_pretty(&entries).map_err(|err| err.to_string())?;
    match &args.out {
        Some(out) => {
            eprintln!("Writing JSON to {}...", out.display());
            std::fs::write(out, json)
                .map_err(|err| format!("Failed to write {}: {err}", out.display()))?;
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<Args, String> {
    if args.iter().any(|a| a == "-h" || a == "--help") {
        return Err(help_text());
    }

    let mut positional = Vec::new();
    let mut out = None;
    let mut verbose = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--out" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| "Missing value for --out".to_string())?;
                out = Some(PathBuf::from(value));
                i += 1;
            }
            "--verbose" => verbose = true,
            other if other.starts_with("--") => {
                return Err(format!("Unknown argument '{other}'\n\n{}", help_text()));
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let [mapping_file, dirname] = positional.as_slice() else {
        return Err(format!("Expected <mapping-file> <dirname>\n\n{}", help_text()));
    };
    Ok(Args {
        mapping_file: PathBuf::from(mapping_file),
        dirname: dirname.clone(),
        out,
        verbose,
    })
}

fn help_text() -> String {
    "Usage: pathprobe-convert <mapping-file> <dirname> [--out <file>] [--verbose]\n\n\
Reads a YAML path-to-docid mapping and emits a JSON list of\n\
{docid, path} objects with paths qualified by <dirname>.\n"
        .to_string()
}
