//! Resource handler orchestration.
//!
//! A [`ResourceHandler`] is the generic CRUD implementation behind one
//! Terraform resource type: it marshals typed plans through the resource's
//! [`Schema`], serializes mutations through the shared [`ResourceLocks`] when
//! the type requires it, and drives asynchronous backends through the
//! polling protocol.

use std::sync::Arc;

use fortisase_value::{ResponseMap, Schema, TypedObject};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::client::{ApiRequest, ClientError, RestClient, read_existing};
use crate::config::ApplyConfig;
use crate::error::{Error, Result};
use crate::locks::ResourceLocks;
use crate::operation::{
    DEFAULT_STATUS_FIELD, DEFAULT_SUCCESS_VALUE, OperationKind, PollableOperation,
    apply_with_polling, delete_with_polling, response_mkey,
};
use crate::poll::PollPolicy;

/// Status polling settings for asynchronously applied resource types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPolling {
    /// Response field holding the apply status
    pub field: String,
    /// Status values that mean the change is live
    pub success_values: Vec<String>,
    /// Attempt budget and delay
    pub policy: PollPolicy,
}

impl Default for StatusPolling {
    fn default() -> Self {
        Self {
            field: DEFAULT_STATUS_FIELD.to_string(),
            success_values: vec![DEFAULT_SUCCESS_VALUE.to_string()],
            policy: PollPolicy::default(),
        }
    }
}

/// Static description of one resource type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSpec {
    /// Terraform type name
    pub type_name: String,
    /// Attribute table
    pub schema: Schema,
    /// Attribute holding the primary key, for objects addressed by name
    pub mkey_attribute: Option<String>,
    /// Named lock held around create and update
    pub lock_name: Option<String>,
    /// Poll the status field after create and update
    pub status_polling: Option<StatusPolling>,
    /// Poll for disappearance after delete
    pub delete_polling: Option<PollPolicy>,
}

impl ResourceSpec {
    /// Creates a synchronous, unlocked resource type.
    #[must_use]
    pub fn new(type_name: impl Into<String>, schema: Schema) -> Self {
        Self {
            type_name: type_name.into(),
            schema,
            mkey_attribute: None,
            lock_name: None,
            status_polling: None,
            delete_polling: None,
        }
    }

    /// Names the attribute that carries the primary key.
    #[must_use]
    pub fn with_mkey_attribute(mut self, name: impl Into<String>) -> Self {
        self.mkey_attribute = Some(name.into());
        self
    }

    /// Serializes create and update through the named lock.
    #[must_use]
    pub fn with_lock(mut self, name: impl Into<String>) -> Self {
        self.lock_name = Some(name.into());
        self
    }

    /// Enables status polling after create and update.
    #[must_use]
    pub fn with_status_polling(mut self, polling: StatusPolling) -> Self {
        self.status_polling = Some(polling);
        self
    }

    /// Enables disappearance polling after delete.
    #[must_use]
    pub const fn with_delete_polling(mut self, policy: PollPolicy) -> Self {
        self.delete_polling = Some(policy);
        self
    }

    /// Replaces the budgets of enabled polling with the configured ones.
    #[must_use]
    pub fn with_config(mut self, config: &ApplyConfig) -> Self {
        if let Some(polling) = &mut self.status_polling {
            polling.policy = config.polling.policy();
        }
        if let Some(policy) = &mut self.delete_polling {
            *policy = config.delete_polling.policy();
        }
        self
    }
}

/// Typed state after a successful create or update.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedState {
    /// Primary key of the object
    pub mkey: String,
    /// Refreshed typed state
    pub state: TypedObject,
}

/// Generic CRUD for one resource type.
pub struct ResourceHandler {
    client: Arc<dyn RestClient>,
    locks: ResourceLocks,
    spec: ResourceSpec,
    cancel: Option<CancellationToken>,
}

impl std::fmt::Debug for ResourceHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHandler")
            .field("spec", &self.spec.type_name)
            .field("locks", &self.locks)
            .field("cancellable", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}

impl ResourceHandler {
    /// Creates a handler sharing `client` and `locks` with the provider.
    #[must_use]
    pub fn new(client: Arc<dyn RestClient>, locks: ResourceLocks, spec: ResourceSpec) -> Self {
        Self {
            client,
            locks,
            spec,
            cancel: None,
        }
    }

    /// Aborts in-flight polling when `token` fires.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns the resource type description.
    #[must_use]
    pub const fn spec(&self) -> &ResourceSpec {
        &self.spec
    }

    /// Creates the object described by `planned`.
    ///
    /// # Errors
    ///
    /// Returns an error if the create call, the status polling, or the
    /// read-back fails.
    #[instrument(skip(self, planned), fields(resource_type = %self.spec.type_name))]
    pub async fn create(&self, planned: &TypedObject) -> Result<AppliedState> {
        let started = Instant::now();
        let planned_key = self.planned_key(planned);
        crate::emit_resource_creating!(
            self.spec.type_name,
            planned_key.as_deref().unwrap_or("<new>")
        );

        let body = self.spec.schema.to_body(planned);
        let request = ApiRequest::new().with_params(body);

        let result = self
            .mutate(OperationKind::Create, planned_key.unwrap_or_default(), &request)
            .await;
        match result {
            Ok(applied) => {
                crate::emit_resource_created!(self.spec.type_name, applied.mkey, elapsed_ms(started));
                Ok(applied)
            }
            Err(e) => {
                crate::emit_resource_failed!(self.spec.type_name, "<new>", OperationKind::Create, e);
                Err(e)
            }
        }
    }

    /// Reads the object keyed by `mkey`. `Ok(None)` means it no longer exists
    /// and should be removed from state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadFailed`] if the read call fails.
    #[instrument(skip(self), fields(resource_type = %self.spec.type_name))]
    pub async fn read(&self, mkey: &str) -> Result<Option<TypedObject>> {
        let request = ApiRequest::for_target(mkey);
        let response = read_existing(self.client.as_ref(), &request)
            .await
            .map_err(|source| self.read_failed(mkey, source))?;

        if response.is_none() {
            debug!(mkey = %mkey, "Object not found, removing from state");
        }
        Ok(response.map(|r| self.spec.schema.decode(&r)))
    }

    /// Updates the object keyed by `mkey` from `prior` to `planned`.
    ///
    /// Only changed attributes are sent. An empty diff issues no request and
    /// returns `prior` unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the update call, the status polling, or the
    /// read-back fails.
    #[instrument(skip(self, prior, planned), fields(resource_type = %self.spec.type_name))]
    pub async fn update(
        &self,
        mkey: &str,
        prior: &TypedObject,
        planned: &TypedObject,
    ) -> Result<AppliedState> {
        let body = self.spec.schema.diff_body(prior, planned);
        if body.is_empty() {
            debug!(mkey = %mkey, "No attribute changes, skipping update");
            return Ok(AppliedState {
                mkey: mkey.to_string(),
                state: prior.clone(),
            });
        }

        let started = Instant::now();
        let changed = self.spec.schema.changed_attributes(prior, planned);
        crate::emit_resource_updating!(self.spec.type_name, mkey, changed);

        let request = ApiRequest::for_target(mkey).with_params(body);
        match self.mutate(OperationKind::Update, mkey.to_string(), &request).await {
            Ok(applied) => {
                crate::emit_resource_updated!(self.spec.type_name, applied.mkey, elapsed_ms(started));
                Ok(applied)
            }
            Err(e) => {
                crate::emit_resource_failed!(self.spec.type_name, mkey, OperationKind::Update, e);
                Err(e)
            }
        }
    }

    /// Deletes the object keyed by `mkey`, confirming disappearance when the
    /// resource type polls after delete.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the delete call fails, or a polling error
    /// if disappearance is not confirmed.
    #[instrument(skip(self), fields(resource_type = %self.spec.type_name))]
    pub async fn delete(&self, mkey: &str) -> Result<()> {
        let started = Instant::now();
        crate::emit_resource_deleting!(self.spec.type_name, mkey);

        let result = match self.spec.delete_polling {
            Some(policy) => {
                let op =
                    PollableOperation::new(OperationKind::Delete, &self.spec.type_name, mkey)
                        .with_policy(policy);
                delete_with_polling(self.client.as_ref(), &op, self.cancel.as_ref())
                    .await
                    .map(|_| ())
            }
            None => self
                .client
                .delete(&ApiRequest::for_target(mkey))
                .await
                .map_err(|source| self.api_error(OperationKind::Delete, mkey, source)),
        };

        match result {
            Ok(()) => {
                crate::emit_resource_deleted!(self.spec.type_name, mkey, elapsed_ms(started));
                Ok(())
            }
            Err(e) => {
                crate::emit_resource_failed!(self.spec.type_name, mkey, OperationKind::Delete, e);
                Err(e)
            }
        }
    }

    /// Looks up objects for a data source.
    ///
    /// `filter` uses the Terraform-side syntax and is escaped before sending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadFailed`] if the list call fails.
    #[instrument(skip(self), fields(resource_type = %self.spec.type_name))]
    pub async fn search(&self, filter: &str) -> Result<Vec<TypedObject>> {
        let request = ApiRequest::new().with_filter(filter);
        let results = self
            .client
            .list(&request)
            .await
            .map_err(|source| self.read_failed("<search>", source))?;

        debug!(matches = results.len(), "Search completed");
        Ok(results
            .iter()
            .map(|r| self.spec.schema.decode(r))
            .collect())
    }

    async fn mutate(
        &self,
        kind: OperationKind,
        target: String,
        request: &ApiRequest,
    ) -> Result<AppliedState> {
        let _guard = match &self.spec.lock_name {
            Some(name) => Some(self.locks.lock(name).await),
            None => None,
        };

        let (mkey, response) = match &self.spec.status_polling {
            Some(polling) => {
                let op = PollableOperation::new(kind, &self.spec.type_name, target)
                    .with_status_field(&polling.field)
                    .with_success_values(polling.success_values.iter().cloned())
                    .with_policy(polling.policy);
                let outcome =
                    apply_with_polling(self.client.as_ref(), &op, request, self.cancel.as_ref())
                        .await?;
                (outcome.mkey, outcome.response)
            }
            None => self.mutate_and_read_back(kind, target, request).await?,
        };

        Ok(AppliedState {
            state: self.spec.schema.decode(&response),
            mkey,
        })
    }

    async fn mutate_and_read_back(
        &self,
        kind: OperationKind,
        target: String,
        request: &ApiRequest,
    ) -> Result<(String, ResponseMap)> {
        let submitted = match kind {
            OperationKind::Create => self.client.create(request).await,
            OperationKind::Update => self.client.update(request).await,
            OperationKind::Delete => {
                return Err(Error::invalid_config(
                    "deletes are not applied through mutate_and_read_back",
                ));
            }
        };
        let response =
            submitted.map_err(|source| self.api_error(kind, request.display_key(), source))?;

        let mkey = response_mkey(&response).unwrap_or(target);
        let read_back = read_existing(self.client.as_ref(), &ApiRequest::for_target(&mkey))
            .await
            .map_err(|source| self.read_failed(&mkey, source))?
            .ok_or_else(|| Error::ResourceNotFound {
                resource_type: self.spec.type_name.clone(),
                mkey: mkey.clone(),
            })?;
        Ok((mkey, read_back))
    }

    fn planned_key(&self, planned: &TypedObject) -> Option<String> {
        self.spec
            .mkey_attribute
            .as_deref()
            .and_then(|name| planned.get_str(name))
            .map(str::to_string)
    }

    fn api_error(&self, operation: OperationKind, mkey: &str, source: ClientError) -> Error {
        Error::Api {
            operation,
            resource_type: self.spec.type_name.clone(),
            mkey: mkey.to_string(),
            source,
        }
    }

    fn read_failed(&self, mkey: &str, source: ClientError) -> Error {
        Error::ReadFailed {
            resource_type: self.spec.type_name.clone(),
            mkey: mkey.to_string(),
            source,
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollingConfig;
    use fortisase_value::Attribute;
    use std::time::Duration;

    #[test]
    fn test_spec_builder_and_config() {
        let config = ApplyConfig {
            polling: PollingConfig {
                max_attempts: 5,
                interval_secs: 2,
            },
            ..ApplyConfig::default()
        };

        let spec = ResourceSpec::new(
            "fortisase_network_configuration",
            Schema::new().with(Attribute::string("status").computed()),
        )
        .with_lock("network_configuration")
        .with_status_polling(StatusPolling::default())
        .with_config(&config);

        assert_eq!(spec.lock_name.as_deref(), Some("network_configuration"));
        let polling = spec.status_polling.as_ref().unwrap();
        assert_eq!(polling.field, "status");
        assert_eq!(polling.policy, PollPolicy::new(5, Duration::from_secs(2)));
        assert!(spec.delete_polling.is_none());
    }

    #[derive(Default)]
    struct RecordingClient {
        calls: std::sync::Mutex<Vec<&'static str>>,
    }

    impl RecordingClient {
        fn record(&self, method: &'static str) {
            self.calls.lock().unwrap().push(method);
        }
    }

    #[async_trait::async_trait]
    impl RestClient for RecordingClient {
        async fn create(&self, _: &ApiRequest) -> std::result::Result<ResponseMap, ClientError> {
            self.record("create");
            Ok(ResponseMap::new())
        }

        async fn read(
            &self,
            _: &ApiRequest,
        ) -> std::result::Result<Option<ResponseMap>, ClientError> {
            self.record("read");
            Ok(None)
        }

        async fn update(&self, _: &ApiRequest) -> std::result::Result<ResponseMap, ClientError> {
            self.record("update");
            Ok(ResponseMap::new())
        }

        async fn delete(&self, _: &ApiRequest) -> std::result::Result<(), ClientError> {
            self.record("delete");
            Ok(())
        }

        async fn list(&self, _: &ApiRequest) -> std::result::Result<Vec<ResponseMap>, ClientError> {
            self.record("list");
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_delete_kind_is_rejected_before_any_call() {
        let client = Arc::new(RecordingClient::default());
        let handler = ResourceHandler::new(
            client.clone(),
            ResourceLocks::new(),
            ResourceSpec::new("fortisase_dns_filter_profile", Schema::new()),
        );

        let err = handler
            .mutate_and_read_back(
                OperationKind::Delete,
                "corp".to_string(),
                &ApiRequest::for_key("corp"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidConfig { .. }));
        assert!(client.calls.lock().unwrap().is_empty());
    }
}
