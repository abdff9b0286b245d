//! Transport Trait
//!
//! Platform-agnostic abstraction for the HTTPS request/response legs of the
//! protocol. Protocol code builds [`ApiRequest`]s and interprets
//! [`ApiResponse`]s; the transport only moves bytes.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::NetworkError;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, NetworkError>;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A request relative to the versioned API base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, without leading slash (e.g. `status`).
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ApiRequest {
    /// Creates a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        ApiRequest {
            method: Method::Get,
            path: path.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Creates a POST request with a JSON body.
    pub fn post_json<B: Serialize + ?Sized>(
        path: impl Into<String>,
        body: &B,
    ) -> TransportResult<Self> {
        Ok(ApiRequest {
            method: Method::Post,
            path: path.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: serde_json::to_vec(body)?,
        })
    }

    /// Adds a header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Returns the first header with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parses the JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> TransportResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// A response as received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Creates a response with a raw body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        ApiResponse {
            status,
            body: body.into(),
        }
    }

    /// Creates a response with a JSON body.
    pub fn json<B: Serialize + ?Sized>(status: u16, body: &B) -> Self {
        ApiResponse {
            status,
            body: serde_json::to_vec(body).unwrap_or_default(),
        }
    }

    /// Creates an empty response with the given status.
    pub fn status(status: u16) -> Self {
        ApiResponse {
            status,
            body: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the JSON body.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Transport trait for the protocol endpoints.
///
/// Implementations must be cancel-safe: dropping the returned future
/// abandons the request without side effects on the caller's state.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes a request and returns the raw response.
    ///
    /// Non-2xx statuses are responses, not errors. Errors are reserved for
    /// failures to obtain a response at all.
    async fn execute(&self, request: ApiRequest) -> TransportResult<ApiResponse>;
}
