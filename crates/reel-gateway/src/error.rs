use thiserror::Error;

/// Failure modes of a single gateway round trip. The gateway never retries;
/// classification here drives the caller's retry policy.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request could not be formed (malformed base URL, user id that
    /// cannot be encoded into a path). Non-retryable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Transport-level failure (connection refused, timeout, DNS).
    #[error("network failure: {0}")]
    Network(#[source] reqwest::Error),

    /// The backend answered outside 200-299.
    #[error("server failure: status {status}")]
    Server { status: u16 },

    /// The response body did not match the expected schema. Indicates a
    /// client/server contract break, not a transient condition.
    #[error("decoding failure: {0}")]
    Decoding(#[source] serde_json::Error),
}

impl GatewayError {
    /// Whether a later attempt of the same call could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Network(_) | GatewayError::Server { .. } => true,
            GatewayError::InvalidRequest(_) | GatewayError::Decoding(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_classification() {
        assert!(GatewayError::Server { status: 503 }.is_retryable());
        assert!(!GatewayError::InvalidRequest("bad user id".into()).is_retryable());

        let decode_err = serde_json::from_str::<u32>("not json").unwrap_err();
        assert!(!GatewayError::Decoding(decode_err).is_retryable());
    }

    #[test]
    fn server_error_carries_status() {
        let err = GatewayError::Server { status: 404 };
        assert_eq!(err.to_string(), "server failure: status 404");
    }
}
