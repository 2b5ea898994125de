use thiserror::Error;

/// Classified failure of a single document fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("network unreachable for {url}")]
    NetworkUnreachable { url: String },

    #[error("could not parse document from {url}")]
    ParseFailure { url: String },
}

impl FetchError {
    /// Whether a caller may reasonably retry this failure with backoff.
    ///
    /// Timeouts, connection failures, 5xx responses and rate-limit statuses
    /// count as transient; other 4xx responses and unparsable bodies do not.
    /// The engine itself never retries — retry policy belongs to the host.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout { .. } | FetchError::NetworkUnreachable { .. } => true,
            FetchError::HttpStatus { status, .. } => matches!(
                *status,
                429 | 500 | 502 | 503 | 504 | 520 | 521 | 522 | 523 | 524 | 525 | 526 | 527
            ),
            FetchError::ParseFailure { .. } => false,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            FetchError::Timeout { url }
            | FetchError::HttpStatus { url, .. }
            | FetchError::NetworkUnreachable { url }
            | FetchError::ParseFailure { url } => url,
        }
    }
}

/// Failure to extract a required field from one record.
///
/// Inside a listing these are scoped to the offending record; for a
/// detail or page resolution they fail the whole call.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("required field `{field}` missing at {url}")]
    MissingRequiredField { field: &'static str, url: String },

    #[error("link `{href}` does not resolve to an absolute URL")]
    MalformedLink { href: String },
}

/// Invalid locator or source configuration, raised before any network access.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid CSS selector `{selector}`")]
    InvalidSelector { selector: String },

    #[error("invalid URL template `{template}`: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("invalid source configuration: {0}")]
    Config(String),
}

/// Top-level error surfaced to the host.
///
/// A host receives either a complete (possibly empty) result or exactly one
/// of these; partial successes are never reported as full successes.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("fetch failed on page {page} of {walk}: {source}")]
    Fetch {
        page: u32,
        walk: String,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error("filter index {index} out of range (0..{len})")]
    InvalidFilterIndex { index: usize, len: usize },

    #[error("{0} is not supported by this source")]
    UnsupportedOperation(&'static str),

    #[error("walk cancelled")]
    Cancelled,
}

impl EngineError {
    /// The underlying fetch failure, if this error wraps one.
    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            EngineError::Fetch { source, .. } => Some(source),
            _ => None,
        }
    }
}
