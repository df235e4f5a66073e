//! The REST client contract resource handlers are written against.
//!
//! Transport, authentication and URL routing belong to the implementor; this
//! crate only needs CRUD calls keyed by a primary key that exchange untyped
//! JSON maps.

use std::collections::BTreeMap;

use async_trait::async_trait;
use fortisase_value::{DynamicValue, ResponseMap, escape_filter};
use thiserror::Error;

/// An opaque client failure.
///
/// Only its presence matters to the polling protocol; the message is carried
/// through to diagnostics verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ClientError {
    message: String,
}

impl ClientError {
    /// Creates a client error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One request to the configuration API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiRequest {
    /// Primary key of the addressed object, if any
    pub mkey: Option<String>,
    /// Body parameters
    pub params: ResponseMap,
    /// URL path and query parameters
    pub url_params: BTreeMap<String, String>,
    /// Pre-escaped search filter (`filter=...&filter=...`)
    pub filter: Option<String>,
}

impl ApiRequest {
    /// Creates an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a request addressing `mkey`.
    #[must_use]
    pub fn for_key(mkey: impl Into<String>) -> Self {
        Self::new().with_mkey(mkey)
    }

    /// Creates a request addressing `target`, or no key at all for
    /// singleton objects (empty target).
    #[must_use]
    pub fn for_target(target: &str) -> Self {
        if target.is_empty() {
            Self::new()
        } else {
            Self::for_key(target)
        }
    }

    /// Sets the primary key.
    #[must_use]
    pub fn with_mkey(mut self, mkey: impl Into<String>) -> Self {
        self.mkey = Some(mkey.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_params(mut self, params: ResponseMap) -> Self {
        self.params = params;
        self
    }

    /// Adds one body parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: DynamicValue) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Adds one URL parameter.
    #[must_use]
    pub fn with_url_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.url_params.insert(key.into(), value.into());
        self
    }

    /// Sets the search filter, escaping it into wire format.
    #[must_use]
    pub fn with_filter(mut self, filter: &str) -> Self {
        self.filter = Some(escape_filter(filter));
        self
    }

    /// Returns the primary key, or `<new>` when none is set.
    #[must_use]
    pub fn display_key(&self) -> &str {
        self.mkey.as_deref().unwrap_or("<new>")
    }
}

/// CRUD access to one FortiSASE object collection.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Creates an object, returning the backend's response.
    async fn create(&self, request: &ApiRequest) -> Result<ResponseMap, ClientError>;

    /// Reads an object. `Ok(None)` (or an empty map) means not found.
    async fn read(&self, request: &ApiRequest) -> Result<Option<ResponseMap>, ClientError>;

    /// Updates an object, returning the backend's response.
    async fn update(&self, request: &ApiRequest) -> Result<ResponseMap, ClientError>;

    /// Deletes an object.
    async fn delete(&self, request: &ApiRequest) -> Result<(), ClientError>;

    /// Lists objects matching the request's filter.
    async fn list(&self, request: &ApiRequest) -> Result<Vec<ResponseMap>, ClientError>;
}

/// Reads an object, folding an empty response into not-found.
pub(crate) async fn read_existing<C: RestClient + ?Sized>(
    client: &C,
    request: &ApiRequest,
) -> Result<Option<ResponseMap>, ClientError> {
    Ok(client.read(request).await?.filter(|map| !map.is_empty()))
}
