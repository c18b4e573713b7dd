//! HTTP request pipeline with adaptation, classification and retries.
//!
//! A call flows through these pieces:
//!
//! - [`Endpoint`] / [`RequestDescriptor`] describe what to call
//! - [`RequestInterceptor`] adds headers and decides per-attempt retries
//! - [`Transport`] performs the exchange over one shared connection pool
//! - [`NetworkService`] validates, decodes and retries the whole call
//!
//! Two retry layers compound. The interceptor resends a single attempt after
//! dropped or timed-out connections. The service restarts the whole logical
//! request up to `max_retry_attempts` times for any error.

pub mod endpoint;
pub mod error;
pub mod interceptor;
pub mod service;
pub mod transport;

use serde::{Deserialize, Deserializer};
use std::time::Duration;

pub use endpoint::{
  Endpoint, HttpMethod, ParameterEncoding, Parameters, RequestDescriptor, RequestTarget,
};
pub use error::{NetworkError, TransportError};
pub use interceptor::{Backoff, DefaultInterceptor, RequestInterceptor, RetryDecision};
pub use service::{NetworkService, PendingRequest};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;

/// Settings for the network client, fixed once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NetworkConfiguration {
  pub base_url: String,
  /// Read from `timeout_secs`; fractional seconds are allowed
  #[serde(rename = "timeout_secs", deserialize_with = "deserialize_secs")]
  pub timeout: Duration,
  /// Total end-to-end attempts per logical request. Zero behaves like one.
  pub max_retry_attempts: u32,
}

impl NetworkConfiguration {
  pub fn new(base_url: impl Into<String>, timeout: Duration, max_retry_attempts: u32) -> Self {
    Self {
      base_url: base_url.into(),
      timeout,
      max_retry_attempts,
    }
  }

  pub fn timeout(&self) -> Duration {
    self.timeout
  }
}

impl Default for NetworkConfiguration {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
      max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
    }
  }
}

fn deserialize_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
  D: Deserializer<'de>,
{
  let secs = f64::deserialize(deserializer)?;
  match Duration::try_from_secs_f64(secs) {
    Ok(timeout) if !timeout.is_zero() => Ok(timeout),
    Ok(_) => Err(serde::de::Error::custom("timeout_secs must be greater than zero")),
    Err(e) => Err(serde::de::Error::custom(e)),
  }
}
