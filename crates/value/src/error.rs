//! Error types for the value layer.
//!
//! Coercion never fails; only explicit parsing entry points return these.

use thiserror::Error;

/// Errors raised by the non-total helpers of this crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A backend version string could not be parsed.
    #[error("Invalid version '{version}': {message}")]
    InvalidVersion {
        /// The offending version string
        version: String,
        /// Parser message
        message: String,
    },

    /// A version requirement could not be parsed.
    #[error("Invalid version requirement '{requirement}': {message}")]
    InvalidRequirement {
        /// The offending requirement string
        requirement: String,
        /// Parser message
        message: String,
    },
}
