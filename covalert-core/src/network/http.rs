// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! HTTPS Transport
//!
//! `reqwest`-backed [`Transport`] with:
//! - Connect and request timeouts
//! - Proxy support (for Tor)
//! - rustls (no OpenSSL on Android/iOS)

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::error::NetworkError;
use super::transport::{ApiRequest, ApiResponse, Method, Transport, TransportResult};
use crate::api::ClientConfig;

/// Production transport talking to the protocol server.
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport from config.
    pub fn new(config: &ClientConfig) -> Result<Self, NetworkError> {
        let mut builder = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone());

        // Support proxy if configured (for Tor)
        if let Some(proxy_url) = &config.proxy_url {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| NetworkError::InvalidUrl(e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        Ok(HttpTransport {
            client,
            base_url: config.api_base(),
        })
    }

    /// Returns the versioned API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip_all, fields(path = %request.path))]
    async fn execute(&self, request: ApiRequest) -> TransportResult<ApiResponse> {
        let url = self.url_for(&request.path);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url).body(request.body),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(map_send_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_receive_error)?;

        debug!(status, len = body.len(), "response received");
        Ok(ApiResponse::new(status, body.to_vec()))
    }
}

fn map_send_error(err: reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        NetworkError::Timeout
    } else if err.is_connect() {
        NetworkError::ConnectionFailed(err.to_string())
    } else {
        NetworkError::SendFailed(err.to_string())
    }
}

/// The client deadline covers the body too, so a server that stalls after
/// its headers surfaces here.
fn map_receive_error(err: reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        NetworkError::Timeout
    } else {
        NetworkError::ReceiveFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    /// Serves one connection: headers and part of the body, then silence.
    fn stalling_server() -> (String, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 2048];
            let _ = stream.read(&mut request);
            stream
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                      Content-Length: 100\r\n\r\n{\"atRisk\":",
                )
                .unwrap();
            stream.flush().unwrap();
            thread::sleep(Duration::from_secs(3));
        });
        (url, handle)
    }

    #[tokio::test]
    async fn test_stalled_body_is_a_timeout() {
        let (url, server) = stalling_server();
        let config = ClientConfig::default()
            .with_server_url(url)
            .with_request_timeout(Duration::from_millis(500));
        let transport = HttpTransport::new(&config).unwrap();

        let result = transport
            .execute(ApiRequest::get(crate::network::wire::paths::STATUS))
            .await;

        assert_eq!(result.unwrap_err(), NetworkError::Timeout);
        server.join().unwrap();
    }

    #[test]
    fn test_url_joining() {
        let config = ClientConfig::default().with_server_url("https://api.example.org/");
        let transport = HttpTransport::new(&config).unwrap();

        assert_eq!(transport.base_url(), "https://api.example.org/api/v6");
        assert_eq!(
            transport.url_for("/status"),
            "https://api.example.org/api/v6/status"
        );
    }
}
