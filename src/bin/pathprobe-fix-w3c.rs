//! Normalize a W3C `path: docid` mapping file.
//!
//! Adds the `W3C ` prefix to docids that miss it and drops unmapped
//! entries, writing the result as a fresh YAML mapping.

use std::path::PathBuf;

use pathprobe::mapping;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

struct Args {
    infile: PathBuf,
    outfile: PathBuf,
    verbose: bool,
}

fn run() -> Result<(), String> {
    let args = parse_args(std::env::args().skip(1).collect())?;

    if args.verbose {
        eprintln!("Reading {}...", args.infile.display());
    }
    let loaded = mapping::load_mapping(&args.infile).map_err(|err| err.to_string())?;
    let fixed = mapping::fix_w3c_docids(&loaded);
    if args.verbose {
        eprintln!("{} paths total, {} kept", loaded.len(), fixed.len());
    }

    let yaml = serde_yaml::to_string(&fixed).map_err(|err| err.to_string())?;
    std::fs::write(&args.outfile, yaml)
        .map_err(|err| format!("Failed to write {}: {err}", args.outfile.display()))?;
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

    let [infile, outfile] = positional.as_slice() else {
        return Err(format!("Expected <infile> <outfile>\n\n{}", help_text()));
    };
    Ok(Args {
        infile: PathBuf::from(infile),
        outfile: PathBuf::from(outfile),
        verbose,
    })
}

fn help_text() -> String {
    "Usage: pathprobe-fix-w3c <infile> <outfile> [--verbose]\n\n\
Reads a YAML path-to-docid mapping, prefixes `W3C ` onto docids that\n\
lack it, drops unmapped entries and writes the fixed mapping to <outfile>.\n"
        .to_string()
}
