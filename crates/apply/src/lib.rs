//! # fortisase-apply
//!
//! Resource handlers and the eventual-consistency apply protocol for the
//! FortiSASE Terraform provider.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ResourceHandler                                            │
//! │  (create / read / update / delete / search per type)        │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │  Schema (fortisase-value)    │  ResourceLocks               │
//! │  typed plan <-> JSON body    │  per-type keyed mutexes      │
//! ├──────────────────────────────┴──────────────────────────────┤
//! │  apply_with_polling / delete_with_polling                   │
//! │  (poll_until: fixed budget, fixed delay, optional cancel)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RestClient (transport supplied by the provider)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fortisase_apply::{ApplyConfig, ResourceHandler, ResourceLocks, ResourceSpec, StatusPolling};
//! use fortisase_value::{Attribute, Schema};
//!
//! let config = ApplyConfig::load(None)?;
//! let spec = ResourceSpec::new(
//!     "fortisase_network_configuration",
//!     Schema::new().with(Attribute::string("bgp_router_ids_subnet")),
//! )
//! .with_status_polling(StatusPolling::default())
//! .with_config(&config);
//!
//! let handler = ResourceHandler::new(Arc::new(client), ResourceLocks::new(), spec);
//! let applied = handler.create(&planned).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod locks;
pub mod operation;
pub mod poll;
pub mod resource;
pub mod telemetry;

pub use client::{ApiRequest, ClientError, RestClient};
pub use config::{ApplyConfig, PollingConfig, TracingSettings};
pub use error::{DiagnosticSeverity, Error, ProviderDiagnostic, Result};
pub use locks::ResourceLocks;
pub use operation::{
    ApplyOutcome, ApplyState, DeleteOutcome, OperationKind, PollableOperation,
    apply_with_polling, delete_with_polling, response_mkey,
};
pub use poll::{PollOutcome, PollPolicy, poll_until};
pub use resource::{AppliedState, ResourceHandler, ResourceSpec, StatusPolling};
pub use telemetry::{TracingConfig, TracingFormat, init_tracing};
