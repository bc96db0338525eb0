//! Sidecar metadata files carrying per-document identifiers.
//!
//! Every archived `doc.xml` may have a `doc.yaml` sidecar holding its
//! primary docid and an optional `invalid` marker. Synchronization brings
//! the sidecars in line with an operator-maintained mapping file: orphaned
//! and malformed sidecars are removed, mapped paths get theirs written.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mapping::mapped_entries;

/// Parsed sidecar metadata. Unknown keys are preserved across rewrites.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SidecarMeta {
    /// Primary document identifier for the accompanying XML file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_docid: Option<String>,
    /// Marks the accompanying XML as known-invalid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid: Option<bool>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_yaml::Value>,
}

/// Errors raised while reading, validating or writing sidecar files.
#[derive(Debug, Error)]
pub enum SidecarError {
    /// The sidecar file could not be read.
    #[error("Failed to read sidecar {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The sidecar file could not be written.
    #[error("Failed to write sidecar {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The sidecar does not parse or fails validation.
    #[error("Malformed sidecar {path}: {detail}")]
    Malformed { path: PathBuf, detail: String },
    /// The data directory could not be listed.
    #[error("Failed to read data directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A stale sidecar could not be removed.
    #[error("Failed to remove sidecar {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Tallies of one synchronization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Sidecars whose docid already matched the mapping.
    pub unchanged: usize,
    /// Sidecars rewritten with a changed docid.
    pub updated: usize,
    /// Sidecars created for newly mapped paths.
    pub created: usize,
    /// Sidecars removed because their XML file is gone.
    pub orphaned_removed: usize,
    /// Sidecars removed because they failed validation.
    pub malformed_removed: usize,
    /// Mapping entries naming an XML file that does not exist.
    pub nonexistent_mapped: usize,
}

/// Load and validate one sidecar file.
pub fn load(path: &Path) -> Result<SidecarMeta, SidecarError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SidecarError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let meta: SidecarMeta =
        serde_yaml::from_str(&raw).map_err(|err| SidecarError::Malformed {
            path: path.to_path_buf(),
            detail: err.to_string(),
        })?;
    validate(&meta).map_err(|detail| SidecarError::Malformed {
        path: path.to_path_buf(),
        detail,
    })?;
    Ok(meta)
}

/// Write one sidecar file.
pub fn store(path: &Path, meta: &SidecarMeta) -> Result<(), SidecarError> {
    let serialized = serde_yaml::to_string(meta).map_err(|err| SidecarError::Malformed {
        path: path.to_path_buf(),
        detail: err.to_string(),
    })?;
    std::fs::write(path, serialized).map_err(|source| SidecarError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Check invariants the type system cannot express.
fn validate(meta: &SidecarMeta) -> Result<(), String> {
    if let Some(docid) = &meta.primary_docid {
        if docid.trim().is_empty() {
            return Err("blank primary docid mapping".to_string());
        }
    }
    Ok(())
}

/// Synchronize the sidecars of a flat data directory with a mapping.
///
/// Stale sidecars (orphaned or malformed) are deleted first, then every
/// mapped XML file gets its sidecar created or updated. Individual oddities
/// are logged and tallied; only I/O failures abort the pass.
pub fn sync_sidecars(
    datadir: &Path,
    mapping: &BTreeMap<String, Option<String>>,
) -> Result<SyncReport, SidecarError> {
    let mut report = SyncReport::default();

    let mut xml_names = Vec::new();
    let mut sidecar_paths = Vec::new();
    for entry in std::fs::read_dir(datadir).map_err(|source| SidecarError::ReadDir {
        path: datadir.to_path_buf(),
        source,
    })? {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("xml") => {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    xml_names.push(name.to_string());
                }
            }
            Some("yaml") => sidecar_paths.push(path),
            _ => {}
        }
    }

    for (mapped_path, _) in mapped_entries(mapping) {
        if !xml_names.iter().any(|name| name == mapped_path) {
            tracing::error!("Mapping references nonexistent file: {mapped_path}");
            report.nonexistent_mapped += 1;
        }
    }

    let mut existing: BTreeMap<String, SidecarMeta> = BTreeMap::new();
    for sidecar_path in sidecar_paths {
        let Some(stem) = sidecar_path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if !datadir.join(format!("{stem}.xml")).is_file() {
            tracing::error!("Orphaned sidecar file: {}", sidecar_path.display());
            remove(&sidecar_path)?;
            report.orphaned_removed += 1;
            continue;
        }
        match load(&sidecar_path) {
            Ok(meta) => {
                existing.insert(stem.to_string(), meta);
            }
            Err(err) => {
                tracing::error!("Removing malformed sidecar file: {err}");
                remove(&sidecar_path)?;
                report.malformed_removed += 1;
            }
        }
    }

    for xml_name in &xml_names {
        let Some(docid) = mapping.get(xml_name).and_then(|d| d.as_deref()) else {
            continue;
        };
        let docid = docid.trim();
        if docid.is_empty() {
            continue;
        }
        let stem = xml_name.trim_end_matches(".xml");
        let mut meta = existing.get(stem).cloned().unwrap_or_default();
        match meta.primary_docid.as_deref() {
            Some(existing_docid) if existing_docid == docid => {
                report.unchanged += 1;
                continue;
            }
            Some(existing_docid) => {
                tracing::warn!("Changed mapping for {xml_name}: {existing_docid} -> {docid}");
                report.updated += 1;
            }
            None => report.created += 1,
        }
        meta.primary_docid = Some(docid.to_string());
        store(&datadir.join(format!("{stem}.yaml")), &meta)?;
    }

    Ok(report)
}

fn remove(path: &Path) -> Result<(), SidecarError> {
    std::fs::remove_file(path).map_err(|source| SidecarError::Remove {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn mapping_from(entries: &[(&str, &str)]) -> BTreeMap<String, Option<String>> {
        entries
            .iter()
            .map(|(path, docid)| (path.to_string(), Some(docid.to_string())))
            .collect()
    }

    #[test]
    fn validation_rejects_blank_docid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.yaml");
        std::fs::write(&path, "primary_docid: '  '\n").unwrap();
        assert!(matches!(load(&path), Err(SidecarError::Malformed { .. })));
    }

    #[test]
    fn validation_rejects_non_bool_invalid_marker() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.yaml");
        std::fs::write(&path, "primary_docid: RFC 2119\ninvalid: maybe\n").unwrap();
        assert!(matches!(load(&path), Err(SidecarError::Malformed { .. })));
    }

    #[test]
    fn validation_rejects_non_map_sidecar() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.yaml");
        std::fs::write(&path, "- not\n- a\n- map\n").unwrap();
        assert!(matches!(load(&path), Err(SidecarError::Malformed { .. })));
    }

    #[test]
    fn sidecar_round_trips_with_unknown_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.yaml");
        std::fs::write(&path, "primary_docid: RFC 2119\nnote: keep me\n").unwrap();
        let mut meta = load(&path).unwrap();
        meta.primary_docid = Some("RFC 8174".to_string());
        store(&path, &meta).unwrap();
        let rewritten = load(&path).unwrap();
        assert_eq!(rewritten.primary_docid.as_deref(), Some("RFC 8174"));
        assert_eq!(
            rewritten.extra.get("note"),
            Some(&serde_yaml::Value::String("keep me".to_string())),
        );
    }

    #[test]
    fn sync_creates_updates_and_keeps_sidecars() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.xml"), "<a/>").unwrap();
        std::fs::write(dir.path().join("b.xml"), "<b/>").unwrap();
        std::fs::write(dir.path().join("c.xml"), "<c/>").unwrap();
        std::fs::write(dir.path().join("b.yaml"), "primary_docid: OLD B\n").unwrap();
        std::fs::write(dir.path().join("c.yaml"), "primary_docid: DOC C\n").unwrap();

        let mapping = mapping_from(&[("a.xml", "DOC A"), ("b.xml", "DOC B"), ("c.xml", "DOC C")]);
        let report = sync_sidecars(dir.path(), &mapping).unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.orphaned_removed, 0);

        let a = load(&dir.path().join("a.yaml")).unwrap();
        assert_eq!(a.primary_docid.as_deref(), Some("DOC A"));
        let b = load(&dir.path().join("b.yaml")).unwrap();
        assert_eq!(b.primary_docid.as_deref(), Some("DOC B"));
    }

    #[test]
    fn sync_removes_orphaned_and_malformed_sidecars() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.xml"), "<a/>").unwrap();
        std::fs::write(dir.path().join("a.yaml"), "primary_docid: ''\n").unwrap();
        std::fs::write(dir.path().join("ghost.yaml"), "primary_docid: GHOST\n").unwrap();

        let report = sync_sidecars(dir.path(), &BTreeMap::new()).unwrap();
        assert_eq!(report.orphaned_removed, 1);
        assert_eq!(report.malformed_removed, 1);
        assert!(!dir.path().join("a.yaml").exists());
        assert!(!dir.path().join("ghost.yaml").exists());
    }

    #[test]
    fn sync_counts_nonexistent_mapped_paths() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.xml"), "<a/>").unwrap();
        let mapping = mapping_from(&[("a.xml", "DOC A"), ("missing.xml", "DOC M")]);
        let report = sync_sidecars(dir.path(), &mapping).unwrap();
        assert_eq!(report.nonexistent_mapped, 1);
        assert_eq!(report.created, 1);
    }
}
