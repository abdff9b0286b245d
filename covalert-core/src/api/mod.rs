// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Layer
//!
//! Shared plumbing for the three protocol flows.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use covalert_core::api::{ClientConfig, DeviceContext};
//! use covalert_core::network::HttpTransport;
//! use covalert_core::registration::KeyExchange;
//!
//! let config = ClientConfig::default().with_server_url("https://api.covalert.example");
//! let ctx = Arc::new(DeviceContext::in_memory()?);
//! let transport = Arc::new(HttpTransport::new(&config)?);
//!
//! let exchange = KeyExchange::new(ctx.clone(), transport.clone(), config.clone());
//! let challenge = exchange.fetch_captcha(CaptchaKind::Image, "en").await?;
//! // ... user solves the captcha, for as long as it takes ...
//! exchange.register(challenge, "ABC123", None).await?;
//! ```
//!
//! # Module Structure
//!
//! - [`error`] - Unified error type and recovery categories
//! - [`config`] - Client configuration
//! - [`context`] - Per-device owned state
//! - [`events`] - Event system for callbacks
//! - [`clock`] - Time source
//! - [`retry`] - Backoff for transient failures

pub(crate) mod call;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod retry;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ClientConfig, PROTOCOL_VERSION};
pub use context::DeviceContext;
pub use error::{ErrorCategory, ProtocolError, ProtocolResult};
pub use events::{CallbackHandler, CovAlertEvent, EventDispatcher, EventHandler};
pub use retry::{retry_with_backoff, RetryPolicy};
