//! Network error types.

use thiserror::Error;

// ============================================================================
// Transport Error
// ============================================================================

/// Raw failure reported by a [`Transport`](super::transport::Transport).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
  /// No route to the host (DNS failure, connection refused, offline).
  #[error("not connected to the network")]
  NotConnected,

  /// The connection dropped while the request was in flight.
  #[error("network connection was lost")]
  ConnectionLost,

  /// The request did not complete within the configured timeout.
  #[error("request timed out")]
  TimedOut,

  /// The request could not be built.
  #[error("invalid request: {0}")]
  InvalidRequest(String),

  /// Anything else the transport reported.
  #[error("{0}")]
  Other(String),
}

impl TransportError {
  /// Whether retrying the same request may succeed.
  pub fn is_recoverable(&self) -> bool {
    matches!(
      self,
      Self::NotConnected | Self::ConnectionLost | Self::TimedOut
    )
  }
}

impl From<reqwest::Error> for TransportError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      Self::TimedOut
    } else if err.is_connect() {
      Self::NotConnected
    } else if err.is_body() || err.is_request() {
      Self::ConnectionLost
    } else if err.is_builder() {
      Self::InvalidRequest(err.to_string())
    } else {
      Self::Other(err.to_string())
    }
  }
}

// ============================================================================
// Network Error
// ============================================================================

/// Classified error surfaced to callers of the network client.
#[derive(Debug, Error)]
pub enum NetworkError {
  #[error("Invalid URL")]
  InvalidUrl,

  #[error("No data received")]
  NoData,

  #[error("Failed to decode response")]
  Decoding(#[source] serde_json::Error),

  #[error("Network error: {0}")]
  Network(#[source] TransportError),

  #[error("Server error with code: {0}")]
  Server(u16),

  #[error("Unknown error occurred")]
  Unknown,
}

impl NetworkError {
  /// Failures the presentation layer shows as a connectivity problem.
  pub fn is_connectivity(&self) -> bool {
    matches!(self, Self::Network(cause) if cause.is_recoverable())
  }

  /// The transport cause, for errors that have one.
  pub fn transport_cause(&self) -> Option<&TransportError> {
    match self {
      Self::Network(cause) => Some(cause),
      _ => None,
    }
  }
}

impl From<TransportError> for NetworkError {
  fn from(err: TransportError) -> Self {
    Self::Network(err)
  }
}
