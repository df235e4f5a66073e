//! Eventual-consistency apply protocol.
//!
//! Some FortiSASE objects (network configuration, BGP routing) are applied
//! asynchronously by the backend. A create or update returns before the
//! change is live, so the handler submits the mutation and then polls the
//! object's status field until it reports success:
//!
//! ```text
//! Submitted ──> Polling(1) ──> Polling(2) ──> ... ──> Succeeded
//!                   │               │
//!                   └───────────────┴──> Failed | TimedOut | Cancelled
//! ```
//!
//! Deletion uses the same loop, waiting for the object to disappear.

use std::convert::Infallible;
use std::fmt;

use fortisase_value::{DynamicValue, ResponseMap, coerce_string};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use crate::client::{ApiRequest, ClientError, RestClient, read_existing};
use crate::error::{Error, Result};
use crate::poll::{PollOutcome, PollPolicy, poll_until};

/// Status field watched when none is configured.
pub const DEFAULT_STATUS_FIELD: &str = "status";

/// Terminal-success token watched when none is configured.
pub const DEFAULT_SUCCESS_VALUE: &str = "success";

/// The kind of mutation being driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Create a new object
    Create,
    /// Update an existing object
    Update,
    /// Delete an object
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Protocol state of one pollable operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyState {
    /// Mutation sent
    Submitted,
    /// Waiting on the status field
    Polling {
        /// 1-based poll number
        attempt: u32,
    },
    /// Status reached a success token
    Succeeded,
    /// A call returned an error
    Failed,
    /// Budget exhausted
    TimedOut,
    /// Caller cancelled
    Cancelled,
}

impl ApplyState {
    /// Returns true if no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::TimedOut | Self::Cancelled
        )
    }

    /// Returns true if `next` is a legal successor of this state.
    #[must_use]
    pub const fn can_transition_to(&self, next: &Self) -> bool {
        match (self, next) {
            (Self::Submitted, Self::Polling { attempt }) => *attempt == 1,
            (Self::Polling { attempt: a }, Self::Polling { attempt: b }) => *b == *a + 1,
            (
                Self::Polling { .. },
                Self::Succeeded | Self::Failed | Self::TimedOut | Self::Cancelled,
            ) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ApplyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitted => write!(f, "submitted"),
            Self::Polling { attempt } => write!(f, "polling({attempt})"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::TimedOut => write!(f, "timed_out"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One asynchronous backend mutation, driven to completion within a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollableOperation {
    /// Mutation kind
    pub kind: OperationKind,
    /// Resource type name, for diagnostics
    pub resource_type: String,
    /// Primary key of the target object
    pub target: String,
    /// Response field holding the apply status
    pub status_field: String,
    /// Status values that mean the change is live
    pub success_values: Vec<String>,
    /// Attempt budget and delay
    pub policy: PollPolicy,
}

impl PollableOperation {
    /// Creates an operation watching `status` for `success`.
    #[must_use]
    pub fn new(
        kind: OperationKind,
        resource_type: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            resource_type: resource_type.into(),
            target: target.into(),
            status_field: DEFAULT_STATUS_FIELD.to_string(),
            success_values: vec![DEFAULT_SUCCESS_VALUE.to_string()],
            policy: PollPolicy::default(),
        }
    }

    /// Sets the watched status field.
    #[must_use]
    pub fn with_status_field(mut self, field: impl Into<String>) -> Self {
        self.status_field = field.into();
        self
    }

    /// Replaces the success tokens.
    #[must_use]
    pub fn with_success_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.success_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the polling policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Reads the status field from a response.
    #[must_use]
    pub fn observed_status(&self, response: &ResponseMap) -> Option<String> {
        response
            .get(&self.status_field)
            .and_then(|v| coerce_string(v).into_inner())
    }

    /// Returns true if the response carries a success token.
    #[must_use]
    pub fn is_success(&self, response: &ResponseMap) -> bool {
        self.observed_status(response)
            .is_some_and(|status| self.success_values.contains(&status))
    }
}

/// Result of a successful create or update.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    /// Primary key of the applied object
    pub mkey: String,
    /// Final poll response
    pub response: ResponseMap,
    /// Polls issued
    pub attempts: u32,
}

/// Result of a confirmed delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Primary key of the deleted object
    pub mkey: String,
    /// Existence checks issued
    pub attempts: u32,
}

/// Extracts the primary key assigned by a mutation response.
///
/// Looks at `mkey`, then `id`; numeric keys are rendered as strings.
#[must_use]
pub fn response_mkey(response: &ResponseMap) -> Option<String> {
    ["mkey", "id"].iter().find_map(|field| match response.get(*field) {
        Some(DynamicValue::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(DynamicValue::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn advance(state: &mut ApplyState, next: ApplyState) {
    if state.can_transition_to(&next) {
        trace!(from = %state, to = %next, "Apply state transition");
    } else {
        warn!(from = %state, to = %next, "Unexpected apply state transition");
    }
    *state = next;
}

/// Submits a create or update and polls until the backend reports success.
///
/// A read that finds nothing counts as "still applying". On success the
/// final response is returned for decoding.
///
/// # Errors
///
/// - [`Error::Api`] if the mutation call fails
/// - [`Error::PollFailed`] if a status read fails
/// - [`Error::PollTimedOut`] if the budget runs out, with the last response
/// - [`Error::Cancelled`] if `cancel` fires
/// - [`Error::InvalidConfig`] if `op` is a delete
#[instrument(
    name = "apply_with_polling",
    skip(client, op, request, cancel),
    fields(kind = %op.kind, resource_type = %op.resource_type, target = %op.target)
)]
pub async fn apply_with_polling<C: RestClient + ?Sized>(
    client: &C,
    op: &PollableOperation,
    request: &ApiRequest,
    cancel: Option<&CancellationToken>,
) -> Result<ApplyOutcome> {
    let submitted = match op.kind {
        OperationKind::Create => client.create(request).await,
        OperationKind::Update => client.update(request).await,
        OperationKind::Delete => {
            return Err(Error::invalid_config(
                "deletes are driven by delete_with_polling",
            ));
        }
    };
    let response = submitted.map_err(|source| Error::Api {
        operation: op.kind,
        resource_type: op.resource_type.clone(),
        mkey: request.display_key().to_string(),
        source,
    })?;

    let mkey = response_mkey(&response).unwrap_or_else(|| op.target.clone());
    debug!(mkey = %mkey, "Mutation accepted, polling for completion");

    let mut read_request = ApiRequest::for_target(&mkey);
    read_request.url_params.clone_from(&request.url_params);

    let mut state = ApplyState::Submitted;
    let outcome = {
        let state = &mut state;
        let read_request = &read_request;
        let mkey = mkey.as_str();
        poll_until(
            &op.policy,
            cancel,
            move |attempt| {
                advance(state, ApplyState::Polling { attempt });
                crate::emit_poll_attempt!(op.resource_type, mkey, attempt, op.policy.max_attempts);
                read_existing(client, read_request)
            },
            |observed: &Option<ResponseMap>| {
                let status = observed.as_ref().and_then(|r| op.observed_status(r));
                trace!(status = ?status, "Observed status");
                observed.as_ref().is_some_and(|r| op.is_success(r))
            },
        )
        .await
    };
    crate::emit_poll_completed!(op.resource_type, mkey, outcome, outcome.attempts());

    match outcome {
        PollOutcome::Succeeded { value, attempts } => {
            advance(&mut state, ApplyState::Succeeded);
            let response = value.ok_or_else(|| Error::ResourceNotFound {
                resource_type: op.resource_type.clone(),
                mkey: mkey.clone(),
            })?;
            Ok(ApplyOutcome {
                mkey,
                response,
                attempts,
            })
        }
        PollOutcome::Failed { error, attempts } => {
            advance(&mut state, ApplyState::Failed);
            Err(Error::PollFailed {
                resource_type: op.resource_type.clone(),
                mkey,
                attempts,
                source: error,
            })
        }
        PollOutcome::TimedOut { last, attempts } => {
            advance(&mut state, ApplyState::TimedOut);
            Err(Error::PollTimedOut {
                operation: op.kind,
                resource_type: op.resource_type.clone(),
                mkey,
                expected: op.success_values.join("|"),
                attempts,
                last_observed: last.flatten(),
            })
        }
        PollOutcome::Cancelled { attempts, .. } => {
            if attempts > 0 {
                advance(&mut state, ApplyState::Cancelled);
            }
            Err(Error::Cancelled {
                operation: op.kind,
                resource_type: op.resource_type.clone(),
                mkey,
                attempts,
            })
        }
    }
}

/// Deletes `op.target` and polls until it can no longer be read.
///
/// A read that errors or returns nothing means the object is gone.
///
/// # Errors
///
/// - [`Error::Api`] if the delete call fails
/// - [`Error::DeleteNotConfirmed`] if the object is still readable after the
///   budget, with the last observed state
/// - [`Error::Cancelled`] if `cancel` fires
#[instrument(
    name = "delete_with_polling",
    skip(client, op, cancel),
    fields(resource_type = %op.resource_type, target = %op.target)
)]
pub async fn delete_with_polling<C: RestClient + ?Sized>(
    client: &C,
    op: &PollableOperation,
    cancel: Option<&CancellationToken>,
) -> Result<DeleteOutcome> {
    let request = ApiRequest::for_target(&op.target);
    client.delete(&request).await.map_err(|source| Error::Api {
        operation: OperationKind::Delete,
        resource_type: op.resource_type.clone(),
        mkey: op.target.clone(),
        source,
    })?;

    let request = &request;
    let outcome = poll_until(
        &op.policy,
        cancel,
        move |attempt| async move {
            crate::emit_poll_attempt!(op.resource_type, op.target, attempt, op.policy.max_attempts);
            let observed = read_existing(client, request)
                .await
                .unwrap_or_else(|e: ClientError| {
                    debug!(error = %e, "Read after delete failed, treating as gone");
                    None
                });
            Ok::<_, Infallible>(observed)
        },
        Option::is_none,
    )
    .await;
    crate::emit_poll_completed!(op.resource_type, op.target, outcome, outcome.attempts());

    match outcome {
        PollOutcome::Succeeded { attempts, .. } => Ok(DeleteOutcome {
            mkey: op.target.clone(),
            attempts,
        }),
        PollOutcome::Failed { error, .. } => match error {},
        PollOutcome::TimedOut { last, attempts } => Err(Error::DeleteNotConfirmed {
            resource_type: op.resource_type.clone(),
            mkey: op.target.clone(),
            attempts,
            last_observed: last.flatten().unwrap_or_default(),
        }),
        PollOutcome::Cancelled { attempts, .. } => Err(Error::Cancelled {
            operation: OperationKind::Delete,
            resource_type: op.resource_type.clone(),
            mkey: op.target.clone(),
            attempts,
        }),
    }
}
