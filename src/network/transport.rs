//! HTTP transport abstraction and its reqwest implementation.

use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::endpoint::HttpMethod;
use super::error::TransportError;

/// A fully resolved outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
  pub method: HttpMethod,
  pub url: Url,
  pub headers: HeaderMap,
  pub body: Option<Vec<u8>>,
}

/// Status and raw body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

impl HttpResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Executes one HTTP exchange.
///
/// Implementations must be safe to share between concurrent requests.
/// Dropping the returned future must abort the exchange.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Transport backed by a single pooled [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
  inner: Client,
}

impl ReqwestTransport {
  /// Build the shared client with the given request timeout.
  pub fn new(timeout: Duration) -> Result<Self, TransportError> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {}", e)))?;

    Ok(Self { inner: client })
  }
}

#[async_trait]
impl Transport for ReqwestTransport {
  #[instrument(skip(self, request), fields(method = request.method.as_str(), url = %request.url))]
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
    let mut builder = self
      .inner
      .request(request.method.into(), request.url)
      .headers(request.headers);
    if let Some(body) = request.body {
      builder = builder.body(body);
    }

    let response = builder.send().await?;
    let status = response.status().as_u16();
    debug!(status, "Response received");

    let body = response.bytes().await?;
    Ok(HttpResponse {
      status,
      body: body.to_vec(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::network::endpoint::RequestDescriptor;
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::{TcpListener, TcpStream};

  async fn local_listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("addr"));
    (listener, base)
  }

  async fn accept_and_read(listener: &TcpListener) -> TcpStream {
    let (mut socket, _) = listener.accept().await.expect("accept");
    let mut buf = vec![0u8; 8192];
    socket.read(&mut buf).await.expect("read request");
    socket
  }

  fn pikachu_request(base: &str) -> HttpRequest {
    RequestDescriptor::get("/pokemon/25")
      .to_http_request(base)
      .expect("request")
  }

  #[tokio::test]
  async fn test_send_returns_status_and_body() {
    let (listener, base) = local_listener().await;
    tokio::spawn(async move {
      let mut socket = accept_and_read(&listener).await;
      let body = r#"{"id":25}"#;
      let response = format!(
        "HTTP/1.1 404 Not Found\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        body.len(),
        body
      );
      socket.write_all(response.as_bytes()).await.expect("write");
    });

    let response = ReqwestTransport::new(Duration::from_secs(5))
      .expect("transport")
      .send(pikachu_request(&base))
      .await
      .expect("send");

    assert_eq!(response.status, 404);
    assert_eq!(response.body, br#"{"id":25}"#.to_vec());
    assert!(!response.is_success());
  }

  #[tokio::test]
  async fn test_refused_connection_is_not_connected() {
    let (listener, base) = local_listener().await;
    drop(listener);

    let err = ReqwestTransport::new(Duration::from_secs(5))
      .expect("transport")
      .send(pikachu_request(&base))
      .await
      .expect_err("nothing is listening");

    assert_eq!(err, TransportError::NotConnected);
    assert!(err.is_recoverable());
  }

  #[tokio::test]
  async fn test_connection_closed_before_response_is_connection_lost() {
    let (listener, base) = local_listener().await;
    tokio::spawn(async move {
      let socket = accept_and_read(&listener).await;
      drop(socket);
    });

    let err = ReqwestTransport::new(Duration::from_secs(5))
      .expect("transport")
      .send(pikachu_request(&base))
      .await
      .expect_err("server hung up");

    assert_eq!(err, TransportError::ConnectionLost);
    assert!(err.is_recoverable());
  }

  #[tokio::test]
  async fn test_silent_server_times_out_at_sub_second_timeout() {
    let (listener, base) = local_listener().await;
    tokio::spawn(async move {
      let _socket = accept_and_read(&listener).await;
      tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let started = std::time::Instant::now();
    let err = ReqwestTransport::new(Duration::from_millis(200))
      .expect("transport")
      .send(pikachu_request(&base))
      .await
      .expect_err("no response");

    assert_eq!(err, TransportError::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(5));
  }
}
