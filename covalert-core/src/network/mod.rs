//! Network + Transport Layer
//!
//! Request/response plumbing shared by registration, status sync and
//! certificate aggregation.
//!
//! # Architecture
//!
//! - **Transport trait**: Platform-agnostic interface for one HTTPS exchange
//! - **Wire types**: JSON payloads with load-bearing field names
//! - **HttpTransport**: reqwest implementation (feature `http`)
//! - **MockTransport**: scripted server for tests and simulated devices

mod error;
mod mock;
mod transport;

#[cfg(feature = "http")]
mod http;

pub mod wire;

pub use error::NetworkError;
pub use mock::{MockTransport, ResponseHandler};
pub use transport::{ApiRequest, ApiResponse, Method, Transport, TransportResult};

#[cfg(feature = "http")]
pub use http::HttpTransport;
