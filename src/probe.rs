//! Probing of a single archived path against the test and reference services.
//!
//! One test request and at most one reference request per call. Failures
//! are recorded in the outcome, never retried.

use crate::diff::diff_html;
use crate::http_client::{self, MAX_BODY_BYTES};
use crate::outcome::{
    METHODS_HEADER, MethodOutcome, OUTCOMES_HEADER, PathOutcome, Resolution, parse_method_headers,
};

/// Caller identification the resolution service keys compatibility policy on.
pub const CALLER_ID: &str = "xml2rfcResolver";

/// Error bodies are truncated to this many bytes before being recorded.
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

/// Phase notifications for live progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbePhase {
    /// The test request is about to be issued.
    Resolving,
    /// The reference request is about to be issued.
    Comparing,
}

/// Probe one subpath (`{dirname}/{basename}`) and assemble its outcome.
///
/// The test request carries `X-Requested-With` so the service can apply its
/// xml2rfc compatibility policy. The reference service is consulted when the
/// test request succeeds, or when it 404s and the reference may confirm the
/// path is absent on both sides.
pub fn probe_path(
    agent: &ureq::Agent,
    subpath: &str,
    api_root: &str,
    reference_root: Option<&str>,
) -> PathOutcome {
    probe_path_with(agent, subpath, api_root, reference_root, |_| {})
}

/// Like [`probe_path`], notifying `on_phase` before each request.
pub fn probe_path_with<F>(
    agent: &ureq::Agent,
    subpath: &str,
    api_root: &str,
    reference_root: Option<&str>,
    mut on_phase: F,
) -> PathOutcome
where
    F: FnMut(ProbePhase),
{
    let test_url = join_url(api_root, subpath);
    on_phase(ProbePhase::Resolving);
    let (resolution, methods_tried, test_status) = match agent
        .get(&test_url)
        .set("X-Requested-With", CALLER_ID)
        .call()
    {
        Ok(response) => {
            let status = response.status();
            let (methods_tried, successful) = methods_from_response(&response);
            match http_client::read_response_text(response, MAX_BODY_BYTES) {
                Ok(xml) => (
                    Resolution::Resolved {
                        xml,
                        method: successful,
                    },
                    methods_tried,
                    Some(status),
                ),
                Err(err) => (
                    Resolution::Failed {
                        error: format!("Failed to read response body: {err}"),
                    },
                    methods_tried,
                    Some(status),
                ),
            }
        }
        Err(ureq::Error::Status(status, response)) => {
            let (methods_tried, _) = methods_from_response(&response);
            let body = http_client::read_response_text(response, MAX_ERROR_BODY_BYTES)
                .unwrap_or_default();
            (
                Resolution::Failed {
                    error: format!("HTTP {status}: {body}"),
                },
                methods_tried,
                Some(status),
            )
        }
        Err(err) => (
            Resolution::Failed {
                error: err.to_string(),
            },
            Vec::new(),
            None,
        ),
    };

    let mut outcome = PathOutcome {
        resolution,
        methods_tried,
        reference: None,
        diff: None,
    };

    if let Some(reference_root) = reference_root {
        check_reference(
            agent,
            subpath,
            reference_root,
            test_status,
            &mut outcome,
            &mut on_phase,
        );
    }

    outcome
}

fn check_reference<F>(
    agent: &ureq::Agent,
    subpath: &str,
    reference_root: &str,
    test_status: Option<u16>,
    outcome: &mut PathOutcome,
    on_phase: &mut F,
) where
    F: FnMut(ProbePhase),
{
    // Only a succeeded test is worth diffing; a 404 is still worth one
    // lookup to learn whether the reference agrees the path is absent.
    let test_absent = test_status == Some(404);
    if outcome.error().is_some() && !test_absent {
        return;
    }

    let reference_url = join_url(reference_root, subpath);
    on_phase(ProbePhase::Comparing);
    match agent.get(&reference_url).call() {
        Ok(response) => {
            let Ok(body) = http_client::read_response_text(response, MAX_BODY_BYTES) else {
                return;
            };
            if outcome.error().is_some() {
                return;
            }
            outcome.reference = Some(body);
            if let (Some(xml), Some(reference)) =
                (outcome.resulting_xml(), outcome.reference.as_deref())
            {
                outcome.diff = diff_html(reference, xml);
            }
        }
        Err(ureq::Error::Status(404, _)) if test_absent => {
            if let Resolution::Failed { error } = &mut outcome.resolution {
                error.push_str(" (reference agrees: HTTP 404 on both sides)");
            }
        }
        Err(_) => {}
    }
}

fn methods_from_response(
    response: &ureq::Response,
) -> (Vec<MethodOutcome>, Option<MethodOutcome>) {
    parse_method_headers(
        response.header(METHODS_HEADER),
        response.header(OUTCOMES_HEADER),
    )
}

fn join_url(root: &str, subpath: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), subpath)
}
