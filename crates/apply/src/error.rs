//! Error types for resource handlers and the polling protocol.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::ClientError;
use crate::operation::OperationKind;
use fortisase_value::ResponseMap;

/// Result type alias using the apply error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by resource handlers.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The REST call itself failed.
    #[error("{operation} failed for {resource_type} {mkey}: {source}")]
    #[diagnostic(code(fortisase_apply::api_error))]
    Api {
        /// Operation that was running
        operation: OperationKind,
        /// Resource type name
        resource_type: String,
        /// Primary key, or `<new>` before one is assigned
        mkey: String,
        /// Client error
        #[source]
        source: ClientError,
    },

    /// A read or search failed.
    #[error("Reading {resource_type} {mkey} failed: {source}")]
    #[diagnostic(code(fortisase_apply::read_failed))]
    ReadFailed {
        /// Resource type name
        resource_type: String,
        /// Primary key, or `<search>` for filtered lists
        mkey: String,
        /// Client error
        #[source]
        source: ClientError,
    },

    /// A status poll failed with a transport or API error.
    #[error("Polling {resource_type} {mkey} failed after {attempts} attempts: {source}")]
    #[diagnostic(code(fortisase_apply::poll_failed))]
    PollFailed {
        /// Resource type name
        resource_type: String,
        /// Primary key
        mkey: String,
        /// Polls issued, including the failing one
        attempts: u32,
        /// Client error
        #[source]
        source: ClientError,
    },

    /// The backend did not report success within the retry budget.
    #[error(
        "{operation} of {resource_type} {mkey} did not reach '{expected}' within {attempts} attempts"
    )]
    #[diagnostic(
        code(fortisase_apply::poll_timed_out),
        help("The backend may still be applying the change; run the operation again later")
    )]
    PollTimedOut {
        /// Operation that was running
        operation: OperationKind,
        /// Resource type name
        resource_type: String,
        /// Primary key
        mkey: String,
        /// Terminal-success tokens that were awaited
        expected: String,
        /// Polls issued
        attempts: u32,
        /// Last response observed, if any
        last_observed: Option<ResponseMap>,
    },

    /// The object was still readable after the delete budget.
    #[error("{resource_type} {mkey} still exists after {attempts} post-delete checks")]
    #[diagnostic(code(fortisase_apply::delete_not_confirmed))]
    DeleteNotConfirmed {
        /// Resource type name
        resource_type: String,
        /// Primary key
        mkey: String,
        /// Checks issued
        attempts: u32,
        /// Last state observed
        last_observed: ResponseMap,
    },

    /// The caller cancelled the operation mid-poll.
    #[error("{operation} of {resource_type} {mkey} was cancelled after {attempts} polls")]
    #[diagnostic(code(fortisase_apply::cancelled))]
    Cancelled {
        /// Operation that was running
        operation: OperationKind,
        /// Resource type name
        resource_type: String,
        /// Primary key
        mkey: String,
        /// Polls issued before cancellation
        attempts: u32,
    },

    /// Read-back after a mutation found nothing.
    #[error("Resource not found: {resource_type} {mkey}")]
    #[diagnostic(code(fortisase_apply::resource_not_found))]
    ResourceNotFound {
        /// Resource type name
        resource_type: String,
        /// Primary key
        mkey: String,
    },

    /// Configuration failed to load or validate.
    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(fortisase_apply::invalid_config))]
    InvalidConfig {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Creates a configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns true if the backend may still be working on the change.
    #[must_use]
    pub const fn is_retryable_later(&self) -> bool {
        matches!(self, Self::PollTimedOut { .. } | Self::Cancelled { .. })
    }

    /// Renders the error as a framework diagnostic.
    #[must_use]
    pub fn diagnostic(&self) -> ProviderDiagnostic {
        let summary = match self {
            Self::Api { .. } => "API request failed",
            Self::ReadFailed { .. } => "Read failed",
            Self::PollFailed { .. } => "Status polling failed",
            Self::PollTimedOut { .. } => "Operation did not complete in time",
            Self::DeleteNotConfirmed { .. } => "Deletion not confirmed",
            Self::Cancelled { .. } => "Operation cancelled",
            Self::ResourceNotFound { .. } => "Resource not found",
            Self::InvalidConfig { .. } => "Invalid provider configuration",
        };

        let mut detail = self.to_string();
        let last = match self {
            Self::PollTimedOut { last_observed, .. } => last_observed.as_ref(),
            Self::DeleteNotConfirmed { last_observed, .. } => Some(last_observed),
            _ => None,
        };
        if let Some(last) = last {
            let rendered = serde_json::to_string(last).unwrap_or_default();
            detail.push_str("\nLast observed state: ");
            detail.push_str(&rendered);
        }

        ProviderDiagnostic::error(summary, detail)
    }
}

/// Diagnostic severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticSeverity {
    /// Error
    Error,
}

/// A summary + detail pair returned to the plugin framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDiagnostic {
    /// Severity level
    pub severity: DiagnosticSeverity,
    /// Short summary
    pub summary: String,
    /// Detailed description
    pub detail: String,
}

impl ProviderDiagnostic {
    /// Creates an error diagnostic.
    #[must_use]
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_timeout_diagnostic_includes_last_observed() {
        let last = json!({"status": "creating"}).as_object().cloned();
        let err = Error::PollTimedOut {
            operation: OperationKind::Create,
            resource_type: "network_configuration".into(),
            mkey: "global".into(),
            expected: "success".into(),
            attempts: 20,
            last_observed: last,
        };

        let diag = err.diagnostic();
        assert_eq!(diag.severity, DiagnosticSeverity::Error);
        assert_eq!(diag.summary, "Operation did not complete in time");
        assert!(diag.detail.contains("within 20 attempts"));
        assert!(diag.detail.contains(r#""status":"creating""#));
        assert!(err.is_retryable_later());
    }

    #[test]
    fn test_api_error_is_distinct_from_timeout() {
        let err = Error::Api {
            operation: OperationKind::Update,
            resource_type: "dns_filter_profile".into(),
            mkey: "default".into(),
            source: ClientError::new("HTTP 400: invalid value"),
        };
        assert!(!err.is_retryable_later());
        assert_eq!(err.diagnostic().summary, "API request failed");
        assert!(err.to_string().contains("HTTP 400"));
    }

    #[test]
    fn test_every_variant_renders_a_distinct_error_diagnostic() {
        let rt = || "bgp_routing".to_string();
        let key = || "bgp-1".to_string();
        let errors = [
            Error::Api {
                operation: OperationKind::Create,
                resource_type: rt(),
                mkey: key(),
                source: ClientError::new("HTTP 400"),
            },
            Error::ReadFailed {
                resource_type: rt(),
                mkey: key(),
                source: ClientError::new("HTTP 500"),
            },
            Error::PollFailed {
                resource_type: rt(),
                mkey: key(),
                attempts: 2,
                source: ClientError::new("HTTP 502"),
            },
            Error::PollTimedOut {
                operation: OperationKind::Update,
                resource_type: rt(),
                mkey: key(),
                expected: "success".into(),
                attempts: 20,
                last_observed: None,
            },
            Error::DeleteNotConfirmed {
                resource_type: rt(),
                mkey: key(),
                attempts: 4,
                last_observed: ResponseMap::new(),
            },
            Error::Cancelled {
                operation: OperationKind::Delete,
                resource_type: rt(),
                mkey: key(),
                attempts: 1,
            },
            Error::ResourceNotFound {
                resource_type: rt(),
                mkey: key(),
            },
            Error::invalid_config("max_attempts must be at least 1"),
        ];

        let mut summaries: Vec<String> = errors
            .iter()
            .map(|e| {
                let diag = e.diagnostic();
                assert_eq!(diag.severity, DiagnosticSeverity::Error);
                assert!(diag.detail.starts_with(&e.to_string()));
                diag.summary
            })
            .collect();
        summaries.sort();
        summaries.dedup();
        assert_eq!(summaries.len(), errors.len());
    }
}
