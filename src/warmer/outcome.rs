use crate::warmer::transport::TransportError;

/// Per-URL result of a single warmup request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Status in [200, 400)
    Success(u16),

    /// A status the server uses to ask for a later retry (429, 503 by default)
    Retryable(u16),

    /// Any other status
    HttpFailure(u16),

    /// No status was obtained
    NetworkFailure(TransportError),
}

impl FetchOutcome {
    /// Classifies a transport result
    ///
    /// | Result | Outcome |
    /// |--------|---------|
    /// | 200..=399 | Success |
    /// | status in `retry_statuses` | Retryable |
    /// | other status | HttpFailure |
    /// | transport error | NetworkFailure |
    pub fn classify(result: Result<u16, TransportError>, retry_statuses: &[u16]) -> Self {
        match result {
            Ok(status) if (200..400).contains(&status) => Self::Success(status),
            Ok(status) if retry_statuses.contains(&status) => Self::Retryable(status),
            Ok(status) => Self::HttpFailure(status),
            Err(e) => Self::NetworkFailure(e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}
