//! Error types for tool search operations.

use std::time::Duration;

use crate::config::ConfigError;

/// Error type for tool search operations.
///
/// Strategy failures are caught by the fallback engine and never reach
/// `ToolSearchEngine::search` callers; they surface here for strategy
/// implementors, configuration loading and cancellation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SearchError {
    /// The embedding generator failed to produce a query vector.
    #[error("Embedding generation failed ({generator}): {message}")]
    EmbeddingGenerationFailed { generator: String, message: String },

    /// A downstream retrieval function or store is not available.
    #[error("Downstream function '{function}' unavailable: {message}")]
    DownstreamFunctionUnavailable { function: String, message: String },

    /// Operation exceeded its deadline.
    #[error("Operation timed out after {:.1}s", .0.as_secs_f64())]
    TimeoutExceeded(Duration),

    /// The query could not be interpreted by a strategy.
    #[error("Query parsing failed: {0}")]
    QueryParsingFailed(String),

    /// Every strategy in the chain was skipped, failed or rejected.
    #[error("All {attempted} strategies exhausted without an acceptable result")]
    FallbackExhausted { attempted: usize },

    /// The caller cancelled the search.
    #[error("Search cancelled")]
    Cancelled,

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// JSON serialization or deserialization failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// File system operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error kind, independent of the concrete error payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    EmbeddingGenerationFailed,
    DownstreamFunctionUnavailable,
    TimeoutExceeded,
    QueryParsingFailed,
    FallbackExhausted,
    Cancelled,
    Configuration,
    Internal,
}

/// Error category for retry and circuit-breaker decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// May succeed on retry (embedding hiccups, timeouts).
    Transient,
    /// Will keep failing; do not retry, trip the circuit breaker.
    Structural,
    /// Ends the search itself (exhausted chain, cancellation).
    Terminal,
    /// Configuration or setup errors.
    Configuration,
    /// IO, JSON and other unexpected states.
    Internal,
}

impl SearchError {
    pub fn embedding(generator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingGenerationFailed {
            generator: generator.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DownstreamFunctionUnavailable {
            function: function.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmbeddingGenerationFailed { .. } => ErrorKind::EmbeddingGenerationFailed,
            Self::DownstreamFunctionUnavailable { .. } => ErrorKind::DownstreamFunctionUnavailable,
            Self::TimeoutExceeded(_) => ErrorKind::TimeoutExceeded,
            Self::QueryParsingFailed(_) => ErrorKind::QueryParsingFailed,
            Self::FallbackExhausted { .. } => ErrorKind::FallbackExhausted,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Config(_) => ErrorKind::Configuration,
            Self::Json(_) | Self::Io(_) => ErrorKind::Internal,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::EmbeddingGenerationFailed { .. } | Self::TimeoutExceeded(_) => {
                ErrorCategory::Transient
            }
            Self::DownstreamFunctionUnavailable { .. } | Self::QueryParsingFailed(_) => {
                ErrorCategory::Structural
            }
            Self::FallbackExhausted { .. } | Self::Cancelled => ErrorCategory::Terminal,
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Json(_) | Self::Io(_) => ErrorCategory::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }

    pub fn is_structural(&self) -> bool {
        self.category() == ErrorCategory::Structural
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::EmbeddingGenerationFailed => "embedding_generation_failed",
            Self::DownstreamFunctionUnavailable => "downstream_function_unavailable",
            Self::TimeoutExceeded => "timeout_exceeded",
            Self::QueryParsingFailed => "query_parsing_failed",
            Self::FallbackExhausted => "fallback_exhausted",
            Self::Cancelled => "cancelled",
            Self::Configuration => "configuration",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SearchError::unavailable("search_tools_knowledge", "function missing");
        assert!(err.to_string().contains("search_tools_knowledge"));

        let err = SearchError::TimeoutExceeded(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "Operation timed out after 1.5s");
    }

    #[test]
    fn test_error_taxonomy() {
        assert!(SearchError::embedding("hash", "boom").is_retryable());
        assert!(SearchError::TimeoutExceeded(Duration::from_secs(1)).is_retryable());

        let structural = SearchError::unavailable("vector", "no index");
        assert!(structural.is_structural());
        assert!(!structural.is_retryable());

        let parsing = SearchError::QueryParsingFailed("unbalanced quote".into());
        assert!(parsing.is_structural());

        let exhausted = SearchError::FallbackExhausted { attempted: 5 };
        assert_eq!(exhausted.category(), ErrorCategory::Terminal);
        assert!(!exhausted.is_retryable());
        assert_eq!(exhausted.kind(), ErrorKind::FallbackExhausted);
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(
            ErrorKind::DownstreamFunctionUnavailable.to_string(),
            "downstream_function_unavailable"
        );
    }
}
