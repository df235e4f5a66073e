//! In-memory scripted REST client shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fortisase_apply::{ApiRequest, ClientError, RestClient};
use fortisase_value::{DynamicValue, ResponseMap};

/// One scripted read response.
#[derive(Debug, Clone)]
pub enum ReadStep {
    Found(ResponseMap),
    NotFound,
    Fail(String),
}

/// A `Found` step from a JSON object literal.
pub fn found(value: DynamicValue) -> ReadStep {
    ReadStep::Found(obj(value))
}

/// A `Found` step carrying only a status field.
pub fn status(value: &str) -> ReadStep {
    found(serde_json::json!({ "status": value }))
}

/// Unwraps a JSON object literal.
pub fn obj(value: DynamicValue) -> ResponseMap {
    value.as_object().cloned().expect("object literal")
}

/// Records every call and replays scripted responses.
///
/// Reads are consumed in order; once the script runs out the last step
/// repeats forever.
#[derive(Default)]
pub struct ScriptedClient {
    reads: Mutex<VecDeque<ReadStep>>,
    last_read: Mutex<Option<ReadStep>>,
    create_response: Mutex<Option<Result<ResponseMap, ClientError>>>,
    update_response: Mutex<Option<Result<ResponseMap, ClientError>>>,
    delete_error: Mutex<Option<ClientError>>,
    list_response: Mutex<Vec<ResponseMap>>,
    mutation_delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<(&'static str, ApiRequest)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reads(self, steps: impl IntoIterator<Item = ReadStep>) -> Self {
        self.reads.lock().unwrap().extend(steps);
        self
    }

    pub fn with_create_response(self, response: DynamicValue) -> Self {
        *self.create_response.lock().unwrap() = Some(Ok(obj(response)));
        self
    }

    pub fn with_create_error(self, message: &str) -> Self {
        *self.create_response.lock().unwrap() = Some(Err(ClientError::new(message)));
        self
    }

    pub fn with_update_response(self, response: DynamicValue) -> Self {
        *self.update_response.lock().unwrap() = Some(Ok(obj(response)));
        self
    }

    pub fn with_delete_error(self, message: &str) -> Self {
        *self.delete_error.lock().unwrap() = Some(ClientError::new(message));
        self
    }

    pub fn with_list_response(self, items: impl IntoIterator<Item = DynamicValue>) -> Self {
        *self.list_response.lock().unwrap() = items.into_iter().map(obj).collect();
        self
    }

    /// Makes create and update take `delay` of (virtual) time.
    pub fn with_mutation_delay(self, delay: Duration) -> Self {
        *self.mutation_delay.lock().unwrap() = Some(delay);
        self
    }

    /// Requests recorded for `method`, in call order.
    pub fn calls(&self, method: &str) -> Vec<ApiRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| *m == method)
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// Number of calls to `method`.
    pub fn count(&self, method: &str) -> usize {
        self.calls(method).len()
    }

    /// Total number of calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of concurrent create/update calls observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, method: &'static str, request: &ApiRequest) {
        self.calls.lock().unwrap().push((method, request.clone()));
    }

    async fn mutation(
        &self,
        method: &'static str,
        request: &ApiRequest,
        scripted: &Mutex<Option<Result<ResponseMap, ClientError>>>,
    ) -> Result<ResponseMap, ClientError> {
        self.record(method, request);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.mutation_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        scripted
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(ResponseMap::new()))
    }
}

#[async_trait]
impl RestClient for ScriptedClient {
    async fn create(&self, request: &ApiRequest) -> Result<ResponseMap, ClientError> {
        self.mutation("create", request, &self.create_response).await
    }

    async fn read(&self, request: &ApiRequest) -> Result<Option<ResponseMap>, ClientError> {
        self.record("read", request);
        let step = {
            let next = self.reads.lock().unwrap().pop_front();
            let mut last = self.last_read.lock().unwrap();
            if let Some(step) = next {
                *last = Some(step);
            }
            last.clone().unwrap_or(ReadStep::NotFound)
        };
        match step {
            ReadStep::Found(map) => Ok(Some(map)),
            ReadStep::NotFound => Ok(None),
            ReadStep::Fail(message) => Err(ClientError::new(message)),
        }
    }

    async fn update(&self, request: &ApiRequest) -> Result<ResponseMap, ClientError> {
        self.mutation("update", request, &self.update_response).await
    }

    async fn delete(&self, request: &ApiRequest) -> Result<(), ClientError> {
        self.record("delete", request);
        match self.delete_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn list(&self, request: &ApiRequest) -> Result<Vec<ResponseMap>, ClientError> {
        self.record("list", request);
        Ok(self.list_response.lock().unwrap().clone())
    }
}
