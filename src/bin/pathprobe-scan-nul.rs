//! One-shot scan of an archive tree for XML files with invalid bytes.
//!
//! Prints the relative name of every `*.xml` file containing NUL bytes or
//! invalid UTF-8 to stdout.

use std::path::{Path, PathBuf};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        return Err(help_text());
    }
    let [archive_root] = args.as_slice() else {
        return Err(format!("Expected <archive-root>\n\n{}", help_text()));
    };
    let archive_root = PathBuf::from(archive_root);
    if !archive_root.is_dir() {
        return Err(format!("Not a directory: {}", archive_root.display()));
    }

    let mut xml_files = Vec::new();
    collect_xml_files(&archive_root, &mut xml_files)
        .map_err(|err| format!("Failed to walk {}: {err}", archive_root.display()))?;
    xml_files.sort();

    for path in xml_files {
        let bytes = std::fs::read(&path)
            .map_err(|err| format!("Failed to read {}: {err}", path.display()))?;
        let relative = path.strip_prefix(&archive_root).unwrap_or(&path);
        if let Some(issue) = scan_bytes(&bytes) {
            println!("{}: {issue}", relative.display());
        }
    }
    Ok(())
}

fn collect_xml_files(dir: &Path, found: &mut Vec<PathBuf>) -> Result<(), std::io::Error> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_xml_files(&path, found)?;
        } else if path.extension().and_then(|ext| ext.to_str()) == Some("xml") {
            found.push(path);
        }
    }
    Ok(())
}

fn scan_bytes(bytes: &[u8]) -> Option<&'static str> {
    if bytes.contains(&0) {
        return Some("NUL character in XML string");
    }
    if std::str::from_utf8(bytes).is_err() {
        return Some("invalid UTF-8");
    }
    None
}

fn help_text() -> String {
    "Usage: pathprobe-scan-nul <archive-root>\n\n\
Recursively checks every *.xml file for NUL bytes and invalid UTF-8.\n"
        .to_string()
}
