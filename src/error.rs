use thiserror::Error;

/// Failures surfaced to the caller of an extraction.
///
/// Anything short of these (missing fields, out-of-set enum values,
/// unparseable dates) degrades into annotated `TaskFields` instead.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The completion endpoint could not be reached, timed out, or sent
    /// back something that was not a completion envelope.
    #[error("completion endpoint unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The completion endpoint answered with an explicit error.
    #[error("{provider} rejected the request (HTTP {status}): {message}")]
    UpstreamRejected {
        provider: String,
        status: u16,
        message: String,
    },

    /// The model output held no recoverable JSON object.
    #[error("no structured task fields in model output: {0}")]
    ExtractionFailed(String),

    /// The request or schema could not be constructed.
    #[error("invalid extraction request: {0}")]
    InvalidRequest(String),
}

impl ExtractError {
    /// Whether a user-initiated retry could plausibly succeed.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ExtractError::UpstreamUnavailable(_) | ExtractError::UpstreamRejected { .. }
        )
    }

    pub(crate) fn from_transport(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExtractError::UpstreamUnavailable(format!("{} request timed out", provider))
        } else {
            ExtractError::UpstreamUnavailable(format!("{} transport error: {}", provider, err))
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_classification() {
        assert!(ExtractError::UpstreamUnavailable("down".into()).is_upstream());
        assert!(
            ExtractError::UpstreamRejected {
                provider: "openai".into(),
                status: 401,
                message: "bad key".into(),
            }
            .is_upstream()
        );
        assert!(!ExtractError::ExtractionFailed("prose".into()).is_upstream());
    }

    #[test]
    fn test_rejected_display_includes_status() {
        let err = ExtractError::UpstreamRejected {
            provider: "Anthropic".into(),
            status: 429,
            message: "quota exceeded".into(),
        };
        assert_eq!(
            err.to_string(),
            "Anthropic rejected the request (HTTP 429): quota exceeded"
        );
    }
}
