//! Resource lifecycle and polling events.
//!
//! Events are plain `tracing` events on the `fortisase::apply` target with an
//! `event_type` field, so a subscriber can route or render them separately
//! from ordinary log lines.
//!
//! ```rust,ignore
//! use fortisase_apply::emit_resource_creating;
//!
//! emit_resource_creating!("fortisase_network_configuration", "<new>");
//! ```

// ============================================================================
// Resource lifecycle
// ============================================================================

/// Emit a resource creating event.
#[macro_export]
macro_rules! emit_resource_creating {
    ($resource_type:expr, $mkey:expr) => {
        ::tracing::info!(
            target: "fortisase::apply",
            event_type = "resource.creating",
            resource_type = %$resource_type,
            mkey = %$mkey,
        )
    };
}

/// Emit a resource created event.
#[macro_export]
macro_rules! emit_resource_created {
    ($resource_type:expr, $mkey:expr, $duration_ms:expr) => {
        ::tracing::info!(
            target: "fortisase::apply",
            event_type = "resource.created",
            resource_type = %$resource_type,
            mkey = %$mkey,
            duration_ms = $duration_ms,
        )
    };
}

/// Emit a resource updating event.
#[macro_export]
macro_rules! emit_resource_updating {
    ($resource_type:expr, $mkey:expr, $changed_attributes:expr) => {
        ::tracing::info!(
            target: "fortisase::apply",
            event_type = "resource.updating",
            resource_type = %$resource_type,
            mkey = %$mkey,
            changed_attributes = ?$changed_attributes,
        )
    };
}

/// Emit a resource updated event.
#[macro_export]
macro_rules! emit_resource_updated {
    ($resource_type:expr, $mkey:expr, $duration_ms:expr) => {
        ::tracing::info!(
            target: "fortisase::apply",
            event_type = "resource.updated",
            resource_type = %$resource_type,
            mkey = %$mkey,
            duration_ms = $duration_ms,
        )
    };
}

/// Emit a resource deleting event.
#[macro_export]
macro_rules! emit_resource_deleting {
    ($resource_type:expr, $mkey:expr) => {
        ::tracing::info!(
            target: "fortisase::apply",
            event_type = "resource.deleting",
            resource_type = %$resource_type,
            mkey = %$mkey,
        )
    };
}

/// Emit a resource deleted event.
#[macro_export]
macro_rules! emit_resource_deleted {
    ($resource_type:expr, $mkey:expr, $duration_ms:expr) => {
        ::tracing::info!(
            target: "fortisase::apply",
            event_type = "resource.deleted",
            resource_type = %$resource_type,
            mkey = %$mkey,
            duration_ms = $duration_ms,
        )
    };
}

/// Emit a resource failed event.
#[macro_export]
macro_rules! emit_resource_failed {
    ($resource_type:expr, $mkey:expr, $operation:expr, $error:expr) => {
        ::tracing::error!(
            target: "fortisase::apply",
            event_type = "resource.failed",
            resource_type = %$resource_type,
            mkey = %$mkey,
            operation = %$operation,
            error = %$error,
        )
    };
}

// ============================================================================
// Polling
// ============================================================================

/// Emit a poll attempt event.
#[macro_export]
macro_rules! emit_poll_attempt {
    ($resource_type:expr, $mkey:expr, $attempt:expr, $max_attempts:expr) => {
        ::tracing::debug!(
            target: "fortisase::apply",
            event_type = "poll.attempt",
            resource_type = %$resource_type,
            mkey = %$mkey,
            attempt = $attempt,
            max_attempts = $max_attempts,
        )
    };
}

/// Emit a poll completed event.
#[macro_export]
macro_rules! emit_poll_completed {
    ($resource_type:expr, $mkey:expr, $outcome:expr, $attempts:expr) => {
        ::tracing::info!(
            target: "fortisase::apply",
            event_type = "poll.completed",
            resource_type = %$resource_type,
            mkey = %$mkey,
            outcome = %$outcome,
            attempts = $attempts,
        )
    };
}
