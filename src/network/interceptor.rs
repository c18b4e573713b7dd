//! Request adaptation and per-attempt retry decisions.

use reqwest::header::{HeaderValue, ACCEPT, USER_AGENT};
use std::time::Duration;

use super::error::NetworkError;
use super::transport::HttpRequest;

/// Client identifier sent with every request.
pub const CLIENT_IDENTIFIER: &str = concat!("PokedexPocket/", env!("CARGO_PKG_VERSION"));

/// Default ceiling for transport-level retries of one attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Outcome of asking an interceptor whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
  DoNotRetry,
  RetryAfter(Duration),
}

/// Delay schedule between granted retries.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
  /// Same delay before every retry.
  Fixed(Duration),
  /// `base * factor^retry_count`, capped at `max`.
  Exponential {
    base: Duration,
    factor: f64,
    max: Duration,
  },
}

impl Backoff {
  /// Delay before the retry that follows `retry_count` earlier retries.
  pub fn delay_for(&self, retry_count: u32) -> Duration {
    match self {
      Self::Fixed(delay) => *delay,
      Self::Exponential { base, factor, max } => {
        let exponent = i32::try_from(retry_count).unwrap_or(i32::MAX);
        let secs = base.as_secs_f64() * factor.powi(exponent);
        if secs.is_finite() && secs < max.as_secs_f64() {
          Duration::from_secs_f64(secs.max(0.0))
        } else {
          *max
        }
      }
    }
  }
}

impl Default for Backoff {
  fn default() -> Self {
    Self::Fixed(Duration::from_secs(1))
  }
}

/// Hook between the network client and the transport.
pub trait RequestInterceptor: Send + Sync {
  /// Mutate an outgoing request. Must not change method, URL or body.
  fn adapt(&self, request: HttpRequest) -> HttpRequest;

  /// Decide whether a failed attempt should be sent again.
  fn retry(&self, retry_count: u32, error: &NetworkError) -> RetryDecision;
}

/// Injects JSON/client headers and retries dropped connections.
#[derive(Debug, Clone)]
pub struct DefaultInterceptor {
  max_retries: u32,
  backoff: Backoff,
}

impl DefaultInterceptor {
  pub fn new() -> Self {
    Self {
      max_retries: DEFAULT_MAX_RETRIES,
      backoff: Backoff::default(),
    }
  }

  pub fn with_max_retries(mut self, max_retries: u32) -> Self {
    self.max_retries = max_retries;
    self
  }

  pub fn with_backoff(mut self, backoff: Backoff) -> Self {
    self.backoff = backoff;
    self
  }

  pub fn max_retries(&self) -> u32 {
    self.max_retries
  }
}

impl Default for DefaultInterceptor {
  fn default() -> Self {
    Self::new()
  }
}

impl RequestInterceptor for DefaultInterceptor {
  fn adapt(&self, mut request: HttpRequest) -> HttpRequest {
    request
      .headers
      .insert(ACCEPT, HeaderValue::from_static("application/json"));
    request
      .headers
      .insert(USER_AGENT, HeaderValue::from_static(CLIENT_IDENTIFIER));
    request
  }

  fn retry(&self, retry_count: u32, error: &NetworkError) -> RetryDecision {
    if retry_count >= self.max_retries {
      return RetryDecision::DoNotRetry;
    }

    match error.transport_cause() {
      Some(cause) if cause.is_recoverable() => {
        RetryDecision::RetryAfter(self.backoff.delay_for(retry_count))
      }
      _ => RetryDecision::DoNotRetry,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::network::endpoint::{HttpMethod, Parameters, RequestDescriptor};
  use crate::network::error::TransportError;

  fn every_error_kind() -> Vec<NetworkError> {
    vec![
      NetworkError::InvalidUrl,
      NetworkError::NoData,
      NetworkError::Decoding(serde_json::from_str::<u32>("x").expect_err("invalid")),
      NetworkError::Network(TransportError::NotConnected),
      NetworkError::Network(TransportError::ConnectionLost),
      NetworkError::Network(TransportError::TimedOut),
      NetworkError::Network(TransportError::Other("reset".into())),
      NetworkError::Server(500),
      NetworkError::Unknown,
    ]
  }

  #[test]
  fn test_adapt_injects_headers_only() {
    let request = RequestDescriptor::new(HttpMethod::Post, "/favorites")
      .with_parameters(Parameters::new().with("id", 25))
      .with_header("Accept", "text/plain")
      .to_http_request("https://pokeapi.co/api/v2")
      .expect("request");
    let (method, url, body) = (request.method, request.url.clone(), request.body.clone());

    let adapted = DefaultInterceptor::new().adapt(request);

    assert_eq!(adapted.headers[ACCEPT], "application/json");
    assert_eq!(adapted.headers[USER_AGENT], CLIENT_IDENTIFIER);
    assert_eq!(adapted.method, method);
    assert_eq!(adapted.url, url);
    assert_eq!(adapted.body, body);
  }

  #[test]
  fn test_not_connected_retries_after_one_second() {
    let decision = DefaultInterceptor::new()
      .retry(0, &NetworkError::Network(TransportError::NotConnected));
    assert_eq!(decision, RetryDecision::RetryAfter(Duration::from_secs_f64(1.0)));
  }

  #[test]
  fn test_server_error_is_not_retried() {
    let decision = DefaultInterceptor::new().retry(0, &NetworkError::Server(500));
    assert_eq!(decision, RetryDecision::DoNotRetry);
  }

  #[test]
  fn test_ceiling_wins_over_error_kind() {
    let interceptor = DefaultInterceptor::new();
    for error in every_error_kind() {
      assert_eq!(
        interceptor.retry(DEFAULT_MAX_RETRIES, &error),
        RetryDecision::DoNotRetry,
        "{error:?}"
      );
      assert_eq!(interceptor.retry(DEFAULT_MAX_RETRIES + 5, &error), RetryDecision::DoNotRetry);
    }
  }

  #[test]
  fn test_only_recoverable_causes_retry_below_ceiling() {
    let interceptor = DefaultInterceptor::new();
    let retried: Vec<bool> = every_error_kind()
      .iter()
      .map(|e| interceptor.retry(2, e) != RetryDecision::DoNotRetry)
      .collect();

    assert_eq!(
      retried,
      vec![false, false, false, true, true, true, false, false, false]
    );
  }

  #[test]
  fn test_zero_ceiling_never_retries() {
    let interceptor = DefaultInterceptor::new().with_max_retries(0);
    assert_eq!(interceptor.max_retries(), 0);
    assert_eq!(DefaultInterceptor::default().max_retries(), DEFAULT_MAX_RETRIES);
    assert_eq!(
      interceptor.retry(0, &NetworkError::Network(TransportError::TimedOut)),
      RetryDecision::DoNotRetry
    );
  }

  #[test]
  fn test_fixed_backoff_does_not_grow() {
    let backoff = Backoff::default();
    assert_eq!(backoff.delay_for(0), Duration::from_secs(1));
    assert_eq!(backoff.delay_for(2), Duration::from_secs(1));
  }

  #[test]
  fn test_exponential_backoff_is_capped() {
    let backoff = Backoff::Exponential {
      base: Duration::from_millis(500),
      factor: 2.0,
      max: Duration::from_secs(3),
    };

    assert_eq!(backoff.delay_for(0), Duration::from_millis(500));
    assert_eq!(backoff.delay_for(1), Duration::from_secs(1));
    assert_eq!(backoff.delay_for(2), Duration::from_secs(2));
    assert_eq!(backoff.delay_for(3), Duration::from_secs(3));
    assert_eq!(backoff.delay_for(40), Duration::from_secs(3));
  }
}
