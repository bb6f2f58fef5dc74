use thiserror::Error;
use twitch_helix::HelixError;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Platform error: {0}")]
    Platform(#[from] HelixError),

    #[error("Store transport error: {0}")]
    StoreTransport(String),

    /// The store answered the write with an error status. Retrying on the next
    /// tick reproduces it, so the supervisor stops the process on this variant.
    #[error("Store rejected document for {index} (status {status}): {reason}")]
    StoreRejected {
        index: String,
        status: u16,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Timeout error: {0}")]
    Timeout(String),
}

impl IndexerError {
    /// Errors that must terminate the process instead of only the current cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, IndexerError::StoreRejected { .. })
    }

    /// Short label used for the cycle outcome metric.
    pub fn kind(&self) -> &'static str {
        match self {
            IndexerError::Platform(_) => "platform",
            IndexerError::StoreTransport(_) => "store_transport",
            IndexerError::StoreRejected { .. } => "store_rejected",
            IndexerError::Serialization(_) => "serialization",
            IndexerError::Configuration(_) => "configuration",
            IndexerError::Timeout(_) => "timeout",
        }
    }
}

impl From<elasticsearch::Error> for IndexerError {
    fn from(err: elasticsearch::Error) -> Self {
        if err.is_timeout() {
            IndexerError::Timeout(err.to_string())
        } else {
            IndexerError::StoreTransport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for IndexerError {
    fn from(err: serde_json::Error) -> Self {
        IndexerError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for IndexerError {
    fn from(err: url::ParseError) -> Self {
        IndexerError::Configuration(format!("invalid Elasticsearch URL: {err}"))
    }
}

impl From<elasticsearch::http::transport::BuildError> for IndexerError {
    fn from(err: elasticsearch::http::transport::BuildError) -> Self {
        IndexerError::Configuration(format!("failed to build transport: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_store_rejection_is_fatal() {
        let rejected = IndexerError::StoreRejected {
            index: "streams-2021-3".to_string(),
            status: 400,
            reason: "mapper_parsing_exception".to_string(),
        };
        assert!(rejected.is_fatal());

        let transient = [
            IndexerError::StoreTransport("connection refused".to_string()),
            IndexerError::Timeout("timed out".to_string()),
            IndexerError::Platform(HelixError::Api {
                status: 503,
                message: "unavailable".to_string(),
            }),
        ];
        for err in transient {
            assert!(!err.is_fatal(), "{err} should not be fatal");
        }
    }

    #[test]
    fn test_rejection_message_carries_context() {
        let err = IndexerError::StoreRejected {
            index: "streams-2024-11".to_string(),
            status: 403,
            reason: "security_exception".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("streams-2024-11"));
        assert!(msg.contains("403"));
        assert_eq!(err.kind(), "store_rejected");
    }
}
