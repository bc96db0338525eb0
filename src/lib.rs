//! Library exports for the pathprobe verification harness and its helper binaries.

/// xml2rfc compatibility-alias table.
pub mod aliases;
/// Application directory helpers.
pub mod app_dirs;
/// Archive path enumeration.
pub mod archive;
/// Token-level HTML diff rendering.
pub mod diff;
/// Shared HTTP agent configuration.
pub mod http_client;
/// Logging setup.
pub mod logging;
/// Path-to-docid mapping files.
pub mod mapping;
/// Per-path outcome data model and resolution-header parsing.
pub mod outcome;
/// Single-path probing against the test and reference services.
pub mod probe;
/// HTML report and resumable counters sink.
pub mod report;
/// Run orchestration across directories and aliases.
pub mod run;
/// Sidecar metadata files accompanying archived XML documents.
pub mod sidecar;
