use socops_core::ports::UpstreamError;
use thiserror::Error;

pub(crate) const SERVICE: &str = "generator";

/// Errors returned by the content-generation client.
#[derive(Debug, Error)]
pub enum GenClientError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("generator returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The provider answered 2xx with an `{"error": …}` body.
    #[error("generator error: {0}")]
    Api(String),

    /// The response body did not have the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("generator response has neither 'content' nor 'error'")]
    EmptyResponse,

    #[error("invalid generator base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("no generator URL configured (set SOCOPS_GENERATOR_URL)")]
    NotConfigured,
}

impl GenClientError {
    /// Whether the provider may answer differently if asked again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            GenClientError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            GenClientError::Status { status, .. } => *status == 429 || *status >= 500,
            GenClientError::Api(_)
            | GenClientError::Deserialize { .. }
            | GenClientError::EmptyResponse
            | GenClientError::InvalidBaseUrl { .. }
            | GenClientError::NotConfigured => false,
        }
    }
}

impl From<GenClientError> for UpstreamError {
    fn from(err: GenClientError) -> Self {
        let service = SERVICE.to_string();
        let reason = err.to_string();
        if err.is_transient() || matches!(err, GenClientError::Http(_) | GenClientError::NotConfigured)
        {
            UpstreamError::Unavailable { service, reason }
        } else {
            UpstreamError::InvalidResponse { service, reason }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_map_to_unavailable() {
        let err = GenClientError::Status {
            status: 503,
            message: "overloaded".to_string(),
        };
        let upstream = UpstreamError::from(err);
        assert!(matches!(
            upstream,
            UpstreamError::Unavailable { ref service, ref reason }
                if service == "generator" && reason.contains("503")
        ));
    }

    #[test]
    fn client_errors_map_to_invalid_response() {
        let err = GenClientError::Status {
            status: 422,
            message: "prompt too long".to_string(),
        };
        assert!(matches!(
            UpstreamError::from(err),
            UpstreamError::InvalidResponse { .. }
        ));
        assert!(matches!(
            UpstreamError::from(GenClientError::Api("quota".to_string())),
            UpstreamError::InvalidResponse { .. }
        ));
    }
}
