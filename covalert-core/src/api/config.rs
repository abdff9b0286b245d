//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Protocol version pinned by this client (curve, KDF and MAC profile).
pub const PROTOCOL_VERSION: u32 = 6;

/// Configuration for talking to the protocol server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server URL without the API prefix (e.g. "https://api.covalert.example").
    pub server_url: String,

    /// Versioned API path segment appended to `server_url`.
    pub api_version: String,

    /// Protocol version the server must report at registration.
    pub protocol_version: u32,

    /// Deadline for one network leg, response body included.
    pub request_timeout: Duration,

    /// Deadline for establishing the connection.
    pub connect_timeout: Duration,

    /// Proxy URL (for Tor support)
    pub proxy_url: Option<String>,

    /// User agent sent on every request.
    pub user_agent: String,

    /// Database path. None keeps all state in memory.
    pub storage_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "https://api.covalert.example".to_string(),
            api_version: format!("v{}", PROTOCOL_VERSION),
            protocol_version: PROTOCOL_VERSION,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            proxy_url: None,
            user_agent: format!("covalert-core/{}", env!("CARGO_PKG_VERSION")),
            storage_path: None,
        }
    }
}

impl ClientConfig {
    /// Sets the server URL.
    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = server_url.into();
        self
    }

    /// Configure with Tor proxy
    ///
    /// Uses the default Tor SOCKS5 proxy at 127.0.0.1:9050 and doubles the
    /// timeouts to account for Tor latency.
    pub fn with_tor(mut self) -> Self {
        self.proxy_url = Some("socks5://127.0.0.1:9050".to_string());
        self.request_timeout = Duration::from_secs(60);
        self.connect_timeout = Duration::from_secs(20);
        self
    }

    /// Configure with custom proxy
    pub fn with_proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    /// Sets the per-leg request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the database path.
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Returns the versioned API base URL, e.g. `https://host/api/v6`.
    pub fn api_base(&self) -> String {
        format!(
            "{}/api/{}",
            self.server_url.trim_end_matches('/'),
            self.api_version
        )
    }
}
