//! HTTP transport to the origin.
//!
//! ### Forwarding
//! - Method, URL, headers and body are sent as given; hop-by-hop headers,
//!   `host` and `content-length` are dropped
//! - Bodies are passed through raw (no transparent decompression), so
//!   `content-encoding` stays valid on replay
//! - Max redirects: 5 (configurable, 0 disables following)
//!
//! ### Failures
//! - Connection, DNS, TLS and body read errors become `NetworkUnavailable`
//! - A client that cannot be built is `TransportInit`, not a network failure
//! - Error statuses are not failures; they are returned like any response
//! - No timeout is applied here

pub mod headers;
pub mod url;

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use reqwest::{Client, Method};
use tracing::debug;

pub use headers::{forwardable_request_header, forwardable_response_header, is_hop_by_hop};
pub use self::url::{UrlError, canonicalize, upstream_url};

use precache_core::Error;
use precache_core::request::{HeaderList, RequestDescriptor, ResponseSnapshot};
use precache_core::transport::Transport;

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "precache/0.1")
    pub user_agent: String,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "precache/0.1".to_string(), max_redirects: 5 }
    }
}

/// reqwest-backed [`Transport`].
pub struct HttpTransport {
    http: Client,
    config: FetchConfig,
}

impl HttpTransport {
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let redirect = match config.max_redirects {
            0 => Policy::none(),
            n => Policy::limited(n),
        };

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(redirect)
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::TransportInit(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidRequest(format!("{}: {e}", request.method)))?;

        let mut builder = self.http.request(method, request.url.clone());
        for (name, value) in &request.headers {
            if forwardable_request_header(name) {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                Error::InvalidRequest(format!("{}: {e}", request.url))
            } else {
                Error::NetworkUnavailable(format!("{}: {e}", request.url))
            }
        })?;

        let status = response.status().as_u16();
        let headers = snapshot_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::NetworkUnavailable(format!("failed to read response from {}: {e}", request.url)))?;

        debug!(
            method = %request.method,
            url = %request.url,
            status,
            bytes = body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched"
        );

        Ok(ResponseSnapshot::new(status, headers, body))
    }
}

/// Copy response headers worth replaying, names lowercased, repeats kept.
fn snapshot_headers(map: &HeaderMap) -> HeaderList {
    map.iter()
        .filter(|(name, _)| forwardable_response_header(name.as_str()))
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::url::Url;
    use bytes::Bytes;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP/1.1 response and hand back the raw request.
    async fn one_shot_server(response: &'static str) -> (Url, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });
        (Url::parse(&format!("http://{addr}/")).unwrap(), handle)
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "precache/0.1");
        assert_eq!(config.max_redirects, 5);
    }

    #[tokio::test]
    async fn test_transport_new() {
        assert!(HttpTransport::new(FetchConfig::default()).is_ok());
        assert!(HttpTransport::new(FetchConfig { max_redirects: 0, ..Default::default() }).is_ok());
    }

    #[tokio::test]
    async fn test_transport_new_rejects_bad_user_agent() {
        let result = HttpTransport::new(FetchConfig { user_agent: "precache\n0.1".into(), ..Default::default() });
        assert!(matches!(result, Err(Error::TransportInit(_))));
    }

    #[tokio::test]
    async fn test_send_returns_snapshot_without_hop_by_hop() {
        let (base, server) = one_shot_server(
            "HTTP/1.1 200 OK\r\ncontent-type: text/css\r\nconnection: close\r\ncontent-length: 9\r\n\r\nbody{x:1}",
        )
        .await;
        let transport = HttpTransport::new(FetchConfig::default()).unwrap();

        let request = RequestDescriptor::new(
            "GET",
            base.join("/css/styles.css").unwrap(),
            vec![("accept".into(), "text/css".into()), ("connection".into(), "keep-alive".into())],
            Bytes::new(),
        )
        .unwrap();
        let response = transport.send(&request).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body.as_ref(), b"body{x:1}");
        assert_eq!(response.content_type(), Some("text/css"));
        assert!(response.header("connection").is_none());
        assert!(response.header("content-length").is_none());

        let raw = server.await.unwrap();
        assert!(raw.starts_with("GET /css/styles.css HTTP/1.1"));
        assert!(raw.contains("user-agent: precache/0.1"));
    }

    #[tokio::test]
    async fn test_error_status_is_a_response() {
        let (base, _server) =
            one_shot_server("HTTP/1.1 404 Not Found\r\nconnection: close\r\ncontent-length: 0\r\n\r\n").await;
        let transport = HttpTransport::new(FetchConfig::default()).unwrap();

        let response = transport.send(&RequestDescriptor::get(base.join("/missing").unwrap())).await.unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.is_ok());
    }

    #[tokio::test]
    async fn test_refused_connection_is_network_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::new(FetchConfig::default()).unwrap();
        let url = Url::parse(&format!("http://{addr}/api/cart")).unwrap();
        let result = transport.send(&RequestDescriptor::get(url)).await;

        assert!(matches!(result, Err(ref e) if e.is_network()));
    }
}
