/// Error types for the enrichment layer.
///
/// Provider-side failures (`ExternalApi`, `RateLimited`, `Timeout`, `Parse`) are
/// recoverable: the orchestrator drops the affected stage and keeps going.
/// `Configuration` and `ProviderNotConfigured` are surfaced to the caller directly,
/// and `Internal` is the only variant that aborts an in-flight lead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnrichmentError {
    /// Invalid construction parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A single-stage call was made against a provider that was never constructed.
    #[error("{0} provider not configured")]
    ProviderNotConfigured(&'static str),

    /// Network failure or non-2xx response from an external API.
    #[error("External API error: {0}")]
    ExternalApi(String),

    /// The external API answered 429.
    #[error("Rate limited by provider: {0}")]
    RateLimited(String),

    /// The HTTP request exceeded the configured timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// A 2xx response that could not be parsed into the expected shape.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Anything that indicates a bug or a broken invariant rather than a provider issue.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EnrichmentError {
    /// Whether an orchestration stage that produced this error may be skipped
    /// while the rest of the lead continues.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EnrichmentError::ExternalApi(_)
                | EnrichmentError::RateLimited(_)
                | EnrichmentError::Timeout(_)
                | EnrichmentError::Parse(_)
        )
    }
}

impl From<reqwest::Error> for EnrichmentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EnrichmentError::Timeout(err.to_string())
        } else if err.is_decode() {
            EnrichmentError::Parse(err.to_string())
        } else {
            EnrichmentError::ExternalApi(err.to_string())
        }
    }
}

impl From<serde_json::Error> for EnrichmentError {
    fn from(err: serde_json::Error) -> Self {
        EnrichmentError::Parse(err.to_string())
    }
}
