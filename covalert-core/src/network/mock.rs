//! Mock Transport
//!
//! Mock implementation of the Transport trait for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::NetworkError;
use super::transport::{ApiRequest, ApiResponse, Transport, TransportResult};

/// Computes a response from a request.
pub type ResponseHandler = Arc<dyn Fn(&ApiRequest) -> ApiResponse + Send + Sync>;

/// Mock transport for testing.
///
/// Allows injection of responses and tracking of sent requests.
///
/// # Example
///
/// ```ignore
/// use covalert_core::network::{ApiResponse, MockTransport};
///
/// let transport = MockTransport::new();
/// transport.respond("status", ApiResponse::json(200, &verdict));
///
/// // ... run the protocol ...
///
/// assert_eq!(transport.requests_to("status").len(), 1);
/// ```
#[derive(Default)]
pub struct MockTransport {
    /// Requests that have been executed, in order.
    requests: Mutex<Vec<ApiRequest>>,
    /// One-shot responses per path.
    responses: Mutex<HashMap<String, VecDeque<ApiResponse>>>,
    /// Fallback handlers per path.
    handlers: Mutex<HashMap<String, ResponseHandler>>,
    /// Error to inject on the next request.
    inject_error: Mutex<Option<NetworkError>>,
    /// Simulated round-trip latency.
    delay: Mutex<Option<Duration>>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for the next request to `path`.
    pub fn respond(&self, path: &str, response: ApiResponse) {
        self.responses
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(response);
    }

    /// Installs a handler answering every request to `path` that has no
    /// queued response.
    pub fn on<F>(&self, path: &str, handler: F)
    where
        F: Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .insert(path.to_string(), Arc::new(handler));
    }

    /// Injects an error to be returned by the next request.
    pub fn inject_error(&self, error: NetworkError) {
        *self.inject_error.lock() = Some(error);
    }

    /// Delays every response by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Returns all requests executed so far.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    /// Returns the requests executed against `path`.
    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    /// Clears the recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    fn next_response(&self, request: &ApiRequest) -> TransportResult<ApiResponse> {
        if let Some(err) = self.inject_error.lock().take() {
            return Err(err);
        }
        if let Some(response) = self
            .responses
            .lock()
            .get_mut(&request.path)
            .and_then(VecDeque::pop_front)
        {
            return Ok(response);
        }
        let handler = self.handlers.lock().get(&request.path).cloned();
        match handler {
            Some(handler) => Ok(handler(request)),
            None => Err(NetworkError::ConnectionFailed(format!(
                "no scripted response for {}",
                request.path
            ))),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> TransportResult<ApiResponse> {
        self.requests.lock().push(request.clone());

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.next_response(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queued_responses_are_consumed_in_order() {
        let transport = MockTransport::new();
        transport.respond("status", ApiResponse::status(500));
        transport.respond("status", ApiResponse::status(200));

        let first = transport.execute(ApiRequest::get("status")).await.unwrap();
        let second = transport.execute(ApiRequest::get("status")).await.unwrap();

        assert_eq!(first.status, 500);
        assert_eq!(second.status, 200);
        assert!(transport.execute(ApiRequest::get("status")).await.is_err());
        assert_eq!(transport.requests_to("status").len(), 3);
    }

    #[tokio::test]
    async fn test_handler_fallback() {
        let transport = MockTransport::new();
        transport.on("echo", |req| ApiResponse::new(200, req.body.clone()));

        let request = ApiRequest::post_json("echo", &serde_json::json!({"a": 1})).unwrap();
        let response = transport.execute(request).await.unwrap();
        assert_eq!(response.body, br#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_error_injection_is_one_shot() {
        let transport = MockTransport::new();
        transport.on("x", |_| ApiResponse::status(204));
        transport.inject_error(NetworkError::Timeout);

        assert_eq!(
            transport.execute(ApiRequest::get("x")).await,
            Err(NetworkError::Timeout)
        );
        assert!(transport.execute(ApiRequest::get("x")).await.is_ok());
    }
}
