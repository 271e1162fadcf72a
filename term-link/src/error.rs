//! Error types for the Term linkage library.
//!
//! All fallible operations return [`LinkError`]. Construction-time problems
//! (malformed rule lists, a level a dialect cannot render) surface before any
//! backend is touched; execution problems are wrapped in
//! [`LinkError::PipelineExecution`] with the name of the failing statement.

use thiserror::Error;

/// The main error type for the Term linkage library.
#[derive(Error, Debug)]
pub enum LinkError {
    /// A comparison level cannot be rendered for the requested dialect.
    #[error("Comparison level '{level}' is not supported by the {dialect} dialect")]
    UnsupportedDialect {
        /// Name of the dialect that was requested
        dialect: String,
        /// Human-readable description of the level
        level: String,
    },

    /// A comparison rule list has an invalid shape.
    #[error("Invalid rule list for comparison '{comparison}': {message}")]
    InvalidRuleList {
        /// Output column name of the comparison
        comparison: String,
        /// What is wrong with the level ordering
        message: String,
    },

    /// The backend failed while executing a pipeline.
    #[error("Pipeline execution failed for '{output_name}': {message}")]
    PipelineExecution {
        /// Output name of the statement that was being materialized
        output_name: String,
        /// Message reported by the backend
        message: String,
        /// Underlying backend error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Bad caller input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Security-related error.
    #[error("Security error: {0}")]
    SecurityError(String),
}

/// A type alias for `Result<T, LinkError>`.
pub type Result<T> = std::result::Result<T, LinkError>;

impl LinkError {
    /// Creates an unsupported dialect error.
    pub fn unsupported_dialect(dialect: impl Into<String>, level: impl Into<String>) -> Self {
        Self::UnsupportedDialect {
            dialect: dialect.into(),
            level: level.into(),
        }
    }

    /// Creates an invalid rule list error.
    pub fn invalid_rule_list(comparison: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRuleList {
            comparison: comparison.into(),
            message: message.into(),
        }
    }

    /// Creates a pipeline execution error without an underlying source.
    pub fn pipeline_execution(output_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PipelineExecution {
            output_name: output_name.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a backend error as a pipeline execution failure.
    pub fn pipeline_execution_with_source(
        output_name: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::PipelineExecution {
            output_name: output_name.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

impl From<serde_json::Error> for LinkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<LinkError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.with_context(|| msg.to_string())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| match e.into() {
            LinkError::PipelineExecution {
                output_name,
                message,
                source,
            } => LinkError::PipelineExecution {
                output_name,
                message: format!("{}: {message}", f()),
                source,
            },
            LinkError::InvalidArgument(inner) => {
                LinkError::InvalidArgument(format!("{}: {inner}", f()))
            }
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_unsupported_dialect_message() {
        let err = LinkError::unsupported_dialect("postgres", "Jaro-Winkler similarity of name >= 0.9");
        assert_eq!(
            err.to_string(),
            "Comparison level 'Jaro-Winkler similarity of name >= 0.9' is not supported by the postgres dialect"
        );
    }

    #[test]
    fn test_invalid_rule_list_message() {
        let err = LinkError::invalid_rule_list("amount", "catch-all level must be last");
        assert_eq!(
            err.to_string(),
            "Invalid rule list for comparison 'amount': catch-all level must be last"
        );
    }

    #[test]
    fn test_pipeline_execution_keeps_source() {
        let source = std::io::Error::new(std::io::ErrorKind::Other, "table not found");
        let err = LinkError::pipeline_execution_with_source("__link__df_blocked", Box::new(source));

        assert!(err.source().is_some());
        assert!(err.to_string().contains("__link__df_blocked"));
        assert!(err.to_string().contains("table not found"));
    }

    #[test]
    fn test_error_context() {
        fn failing_operation() -> Result<()> {
            Err(LinkError::pipeline_execution("out", "boom"))
        }

        let err = failing_operation()
            .context("While computing comparison vectors")
            .unwrap_err();
        assert!(err.to_string().contains("While computing comparison vectors"));
        assert!(matches!(err, LinkError::PipelineExecution { .. }));
    }

    #[test]
    fn test_serde_json_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: LinkError = parse.unwrap_err().into();
        assert!(matches!(err, LinkError::Serialization(_)));
    }
}
