//! Per-path outcome model and parsing of the resolution headers.
//!
//! The service reports which internal strategies it tried through two
//! positionally aligned, semicolon-delimited headers. The parser fails
//! closed: any shape mismatch yields an empty method list rather than a
//! partially recovered one.

use std::fmt;
use std::str::FromStr;

/// Header listing the method names the service attempted, in order.
pub const METHODS_HEADER: &str = "x-resolution-methods";
/// Header listing one `config,error` pair per attempted method.
pub const OUTCOMES_HEADER: &str = "x-resolution-outcomes";

/// One internal strategy the resolution service may use for a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMethod {
    /// Automatic resolution from the document identifier.
    Auto,
    /// Mapping by primary docid maintained by operators.
    Manual,
    /// Fallback to the bibxml data archive.
    Fallback,
}

impl ResolutionMethod {
    /// Human label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Auto => "Automatic resolution",
            Self::Manual => "Mapping by primary docid",
            Self::Fallback => "Fallback to bibxml data archive",
        }
    }

    /// Wire name as it appears in the resolution headers.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
            Self::Fallback => "fallback",
        }
    }
}

impl FromStr for ResolutionMethod {
    type Err = ();

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            "fallback" => Ok(Self::Fallback),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Outcome of one attempted resolution method, as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodOutcome {
    /// The strategy that was attempted.
    pub method: ResolutionMethod,
    /// Configuration the method ran under, when reported.
    pub config: Option<String>,
    /// Error text when the method failed.
    pub error: Option<String>,
}

impl MethodOutcome {
    /// Whether this method satisfied the lookup.
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// How the test request for one path ended.
///
/// Success and failure carry disjoint payloads, so a path can never hold
/// both an error and a successful method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The service answered 2xx.
    Resolved {
        /// Response body, expected to be XML.
        xml: String,
        /// The first method that reported no error, when any did.
        method: Option<MethodOutcome>,
    },
    /// Transport failure or non-2xx status.
    Failed {
        /// `HTTP <status>: <body>` or the transport error text.
        error: String,
    },
}

/// Everything recorded about one probed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathOutcome {
    /// Success or failure of the test request.
    pub resolution: Resolution,
    /// Every method the service reported attempting, in header order.
    pub methods_tried: Vec<MethodOutcome>,
    /// Reference service body, when fetched successfully.
    pub reference: Option<String>,
    /// Rendered diff, present only when test and reference bodies differ.
    pub diff: Option<String>,
}

impl PathOutcome {
    /// Error text when the test request failed.
    pub fn error(&self) -> Option<&str> {
        match &self.resolution {
            Resolution::Failed { error } => Some(error),
            Resolution::Resolved { .. } => None,
        }
    }

    /// The method that satisfied the lookup, when the request succeeded.
    pub fn successful_method(&self) -> Option<&MethodOutcome> {
        match &self.resolution {
            Resolution::Resolved { method, .. } => method.as_ref(),
            Resolution::Failed { .. } => None,
        }
    }

    /// Test response body, when the request succeeded.
    pub fn resulting_xml(&self) -> Option<&str> {
        match &self.resolution {
            Resolution::Resolved { xml, .. } => Some(xml),
            Resolution::Failed { .. } => None,
        }
    }
}

/// Parse the two resolution headers into method outcomes.
///
/// Returns the attempted methods in header order and the first successful
/// one. Either header missing, a split-length mismatch, an unknown method
/// name or a malformed `config,error` entry drops the whole list.
pub fn parse_method_headers(
    methods_header: Option<&str>,
    outcomes_header: Option<&str>,
) -> (Vec<MethodOutcome>, Option<MethodOutcome>) {
    let (Some(methods_header), Some(outcomes_header)) = (methods_header, outcomes_header) else {
        return (Vec::new(), None);
    };

    let methods = methods_header.split(';').collect::<Vec<_>>();
    let outcomes = outcomes_header.split(';').collect::<Vec<_>>();
    if methods.len() != outcomes.len() {
        return (Vec::new(), None);
    }

    let mut parsed = Vec::with_capacity(methods.len());
    let mut successful = None;
    for (name, entry) in methods.iter().zip(outcomes) {
        let Ok(method) = name.trim().parse::<ResolutionMethod>() else {
            return (Vec::new(), None);
        };
        let mut parts = entry.splitn(2, ',');
        let (Some(config), Some(error)) = (parts.next(), parts.next()) else {
            return (Vec::new(), None);
        };
        let outcome = MethodOutcome {
            method,
            config: (!config.is_empty()).then(|| config.to_string()),
            error: (!error.is_empty()).then(|| error.to_string()),
        };
        if outcome.success() && successful.is_none() {
            successful = Some(outcome.clone());
        }
        parsed.push(outcome);
    }
    (parsed, successful)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aligned_headers_and_picks_first_success() {
        let (tried, successful) =
            parse_method_headers(Some("manual;auto"), Some("W3C-XHTML2,;,"));
        assert_eq!(tried.len(), 2);
        assert_eq!(tried[0].method, ResolutionMethod::Manual);
        assert_eq!(tried[0].config.as_deref(), Some("W3C-XHTML2"));
        assert!(tried[0].success());
        assert_eq!(tried[1].method, ResolutionMethod::Auto);
        assert!(tried[1].success());
        assert_eq!(successful.unwrap().method, ResolutionMethod::Manual);
    }

    #[test]
    fn failed_methods_carry_their_error() {
        let (tried, successful) =
            parse_method_headers(Some("auto;fallback"), Some(",no docid match;archive-2020,"));
        assert_eq!(tried.len(), 2);
        assert_eq!(tried[0].error.as_deref(), Some("no docid match"));
        assert!(!tried[0].success());
        let successful = successful.unwrap();
        assert_eq!(successful.method, ResolutionMethod::Fallback);
        assert_eq!(successful.config.as_deref(), Some("archive-2020"));
    }

    #[test]
    fn length_mismatch_fails_closed() {
        let (tried, successful) = parse_method_headers(Some("manual;auto"), Some(","));
        assert!(tried.is_empty());
        assert!(successful.is_none());
    }

    #[test]
    fn unknown_method_name_fails_closed() {
        let (tried, successful) = parse_method_headers(Some("manual;psychic"), Some(",;,"));
        assert!(tried.is_empty());
        assert!(successful.is_none());
    }

    #[test]
    fn entry_without_comma_fails_closed() {
        let (tried, successful) = parse_method_headers(Some("manual"), Some("just-a-config"));
        assert!(tried.is_empty());
        assert!(successful.is_none());
    }

    #[test]
    fn missing_headers_fail_closed() {
        let (tried, successful) = parse_method_headers(None, Some(","));
        assert!(tried.is_empty());
        assert!(successful.is_none());
        let (tried, successful) = parse_method_headers(Some("auto"), None);
        assert!(tried.is_empty());
        assert!(successful.is_none());
    }

    #[test]
    fn single_method_header_parses() {
        let (tried, successful) = parse_method_headers(Some("auto"), Some(","));
        assert_eq!(tried.len(), 1);
        assert_eq!(successful.unwrap().method, ResolutionMethod::Auto);
    }
}
