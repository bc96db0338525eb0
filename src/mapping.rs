//! Reading and converting `path: docid` mapping files.
//!
//! Mappings are maintained by operators as YAML, one entry per archived
//! file name. A blank or missing docid means the path is intentionally
//! unmapped.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Errors raised while reading or converting mapping files.
#[derive(Debug, Error)]
pub enum MappingError {
    /// The mapping file could not be read.
    #[error("Failed to read mapping file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The mapping file is not valid YAML or not a `path: docid` map.
    #[error("Mapping file {path} has an invalid structure: {detail}")]
    InvalidStructure { path: PathBuf, detail: String },
    /// The target directory name would break path construction.
    #[error("Dirname must not contain slash: {0}")]
    DirnameWithSlash(String),
}

/// One entry of the flat docid list consumed by the indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocidEntry {
    /// Primary document identifier.
    pub docid: String,
    /// Directory-qualified path the identifier maps to.
    pub path: String,
}

/// Load a mapping file, keeping unmapped (blank) entries.
///
/// Keys are file basenames; values are docids or `None`/blank when the
/// path is unmapped. Ordering is normalized to the key sort order.
pub fn load_mapping(path: &Path) -> Result<BTreeMap<String, Option<String>>, MappingError> {
    let raw = std::fs::read_to_string(path).map_err(|source| MappingError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|err| MappingError::InvalidStructure {
        path: path.to_path_buf(),
        detail: err.to_string(),
    })
}

/// Keep only entries that actually carry a docid, trimmed.
pub fn mapped_entries<'a>(
    mapping: &'a BTreeMap<String, Option<String>>,
) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
    mapping.iter().filter_map(|(path, docid)| {
        let docid = docid.as_deref()?.trim();
        (!docid.is_empty()).then_some((path.as_str(), docid))
    })
}

/// Convert a mapping to the flat docid list, qualifying paths by `dirname`.
///
/// Unmapped entries are dropped. An empty result is valid; deciding whether
/// that is worth acting on is left to the caller.
pub fn to_docid_list(
    mapping: &BTreeMap<String, Option<String>>,
    dirname: &str,
) -> Result<Vec<DocidEntry>, MappingError> {
    if dirname.contains('/') {
        return Err(MappingError::DirnameWithSlash(dirname.to_string()));
    }
    Ok(mapped_entries(mapping)
        .map(|(path, docid)| DocidEntry {
            docid: docid.to_string(),
            path: format!("{dirname}/{path}"),
        })
        .collect())
}

/// Normalize W3C docids so every mapped entry carries one `W3C ` prefix.
///
/// Entries without a docid are dropped. Already-prefixed docids are left
/// alone rather than doubled.
pub fn fix_w3c_docids(mapping: &BTreeMap<String, Option<String>>) -> BTreeMap<String, String> {
    mapped_entries(mapping)
        .map(|(path, docid)| {
            let bare = docid.strip_prefix("W3C ").unwrap_or(docid);
            (path.to_string(), format!("W3C {bare}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn mapping_from(entries: &[(&str, Option<&str>)]) -> BTreeMap<String, Option<String>> {
        entries
            .iter()
            .map(|(path, docid)| (path.to_string(), docid.map(|d| d.to_string())))
            .collect()
    }

    #[test]
    fn loads_yaml_mapping_with_blank_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mappings.yaml");
        std::fs::write(
            &path,
            "reference.W3C.XHTML-2.xml: W3C XHTML-2\nreference.W3C.other.xml:\n",
        )
        .unwrap();
        let mapping = load_mapping(&path).unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(
            mapping["reference.W3C.XHTML-2.xml"].as_deref(),
            Some("W3C XHTML-2"),
        );
        assert_eq!(mapping["reference.W3C.other.xml"], None);
    }

    #[test]
    fn non_map_yaml_is_invalid_structure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mappings.yaml");
        std::fs::write(&path, "- just\n- a\n- list\n").unwrap();
        assert!(matches!(
            load_mapping(&path),
            Err(MappingError::InvalidStructure { .. }),
        ));
    }

    #[test]
    fn docid_list_skips_blank_mappings_and_prefixes_dirname() {
        let mapping = mapping_from(&[
            ("a.xml", Some("W3C A")),
            ("b.xml", None),
            ("c.xml", Some("   ")),
        ]);
        let list = to_docid_list(&mapping, "bibxml4").unwrap();
        assert_eq!(
            list,
            vec![DocidEntry {
                docid: "W3C A".to_string(),
                path: "bibxml4/a.xml".to_string(),
            }],
        );
    }

    #[test]
    fn w3c_fix_prefixes_docids_and_drops_blank_entries() {
        let mapping = mapping_from(&[
            ("a.xml", Some("XHTML-2")),
            ("b.xml", Some("W3C SVG11")),
            ("c.xml", None),
            ("d.xml", Some("")),
        ]);
        let fixed = fix_w3c_docids(&mapping);
        assert_eq!(fixed.len(), 2);
        assert_eq!(fixed["a.xml"], "W3C XHTML-2");
        assert_eq!(fixed["b.xml"], "W3C SVG11");
    }

    #[test]
    fn dirname_with_slash_is_rejected() {
        let mapping = mapping_from(&[("a.xml", Some("X"))]);
        assert!(matches!(
            to_docid_list(&mapping, "bibxml4/nested"),
            Err(MappingError::DirnameWithSlash(_)),
        ));
    }
}
