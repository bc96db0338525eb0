//! Compatibility aliases for xml2rfc tool directories.
//!
//! The resolution service answers each numbered `bibxmlN` directory under
//! one or more historical names. The table mirrors the service settings and
//! must be kept in sync with them by hand.

use thiserror::Error;

/// Known directories and their compatibility aliases.
const DIR_ALIASES: &[(&str, &[&str])] = &[
    ("bibxml", &["bibxml-rfcs"]),
    ("bibxml2", &["bibxml-misc"]),
    ("bibxml3", &["bibxml-ids"]),
    ("bibxml4", &["bibxml-w3c"]),
    ("bibxml5", &["bibxml-3gpp"]),
    ("bibxml6", &["bibxml-ieee"]),
    ("bibxml7", &["bibxml-doi"]),
    ("bibxml8", &["bibxml-iana"]),
    ("bibxml9", &["bibxml-rfcsubseries"]),
    ("bibxml-nist", &[]),
];

/// Errors raised during alias expansion.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AliasError {
    /// The directory name is not in the alias table.
    ///
    /// A typo here would otherwise silently test zero directories, so it is
    /// a hard failure rather than an empty expansion.
    #[error("Unknown xml2rfc directory {0}")]
    UnknownDirectory(String),
}

/// Expand a directory name into itself plus its compatibility aliases.
///
/// The input is always the first element of the returned list.
pub fn expand(dirname: &str) -> Result<Vec<String>, AliasError> {
    let aliases = DIR_ALIASES
        .iter()
        .find(|(name, _)| *name == dirname)
        .map(|(_, aliases)| *aliases)
        .ok_or_else(|| AliasError::UnknownDirectory(dirname.to_string()))?;
    let mut expanded = Vec::with_capacity(aliases.len() + 1);
    expanded.push(dirname.to_string());
    expanded.extend(aliases.iter().map(|alias| alias.to_string()));
    Ok(expanded)
}
