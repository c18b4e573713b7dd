//! Network client that executes descriptors and decodes typed responses.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::endpoint::{Endpoint, RequestDescriptor};
use super::error::NetworkError;
use super::interceptor::{DefaultInterceptor, RequestInterceptor, RetryDecision};
use super::transport::{HttpRequest, ReqwestTransport, Transport};
use super::NetworkConfiguration;

/// Attempt counters for one logical request, one per retry layer.
#[derive(Debug, Default, Clone, Copy)]
struct AttemptState {
  /// End-to-end attempt, starting at 1
  attempt: u32,
  /// Interceptor-granted resends within the current attempt
  transport_retries: u32,
}

struct ServiceInner {
  configuration: NetworkConfiguration,
  transport: Arc<dyn Transport>,
  interceptor: Arc<dyn RequestInterceptor>,
}

/// Typed HTTP client over a shared transport.
///
/// Clones share the same transport (and so the same connection pool).
/// Concurrent requests are independent of each other.
#[derive(Clone)]
pub struct NetworkService {
  inner: Arc<ServiceInner>,
}

impl NetworkService {
  /// Create a service with a pooled reqwest transport and the default interceptor.
  pub fn new(configuration: NetworkConfiguration) -> Result<Self, NetworkError> {
    let transport = ReqwestTransport::new(configuration.timeout())?;
    Ok(Self::with_transport(configuration, transport))
  }

  pub fn with_transport(
    configuration: NetworkConfiguration,
    transport: impl Transport + 'static,
  ) -> Self {
    Self {
      inner: Arc::new(ServiceInner {
        configuration,
        transport: Arc::new(transport),
        interceptor: Arc::new(DefaultInterceptor::new()),
      }),
    }
  }

  /// Replace the interceptor, keeping the transport.
  pub fn with_interceptor(self, interceptor: impl RequestInterceptor + 'static) -> Self {
    Self {
      inner: Arc::new(ServiceInner {
        configuration: self.inner.configuration.clone(),
        transport: Arc::clone(&self.inner.transport),
        interceptor: Arc::new(interceptor),
      }),
    }
  }

  pub fn configuration(&self) -> &NetworkConfiguration {
    &self.inner.configuration
  }

  /// Execute `endpoint` and decode the response body as `T`.
  ///
  /// Dropping the returned future cancels the in-flight exchange.
  pub async fn request<T: DeserializeOwned>(
    &self,
    endpoint: &impl Endpoint,
  ) -> Result<T, NetworkError> {
    self.execute(&endpoint.descriptor()).await
  }

  /// Start `endpoint` on the runtime and return a cancellable handle.
  ///
  /// Must be called from within a tokio runtime.
  pub fn spawn_request<T>(&self, endpoint: &impl Endpoint) -> PendingRequest<T>
  where
    T: DeserializeOwned + Send + 'static,
  {
    let service = self.clone();
    let descriptor = endpoint.descriptor();
    let token = CancellationToken::new();
    let cancelled = token.clone();

    let handle = tokio::spawn(async move {
      tokio::select! {
        biased;
        _ = cancelled.cancelled() => None,
        result = service.execute::<T>(&descriptor) => Some(result),
      }
    });

    PendingRequest { token, handle }
  }

  async fn execute<T: DeserializeOwned>(
    &self,
    descriptor: &RequestDescriptor,
  ) -> Result<T, NetworkError> {
    let max_attempts = self.inner.configuration.max_retry_attempts.max(1);
    let mut state = AttemptState::default();

    loop {
      state.attempt += 1;
      state.transport_retries = 0;

      match self.attempt(descriptor, &mut state).await {
        Ok(value) => return Ok(value),
        Err(e) if state.attempt < max_attempts => {
          warn!(
            error = %e,
            attempt = state.attempt,
            max_attempts,
            "Request failed, restarting"
          );
        }
        Err(e) => return Err(e),
      }
    }
  }

  /// One end-to-end attempt, including interceptor-granted resends.
  async fn attempt<T: DeserializeOwned>(
    &self,
    descriptor: &RequestDescriptor,
    state: &mut AttemptState,
  ) -> Result<T, NetworkError> {
    let request = descriptor.to_http_request(&self.inner.configuration.base_url)?;

    loop {
      let adapted = self.inner.interceptor.adapt(request.clone());
      debug!(
        method = adapted.method.as_str(),
        url = %adapted.url,
        attempt = state.attempt,
        transport_retry = state.transport_retries,
        "Sending request"
      );

      let error = match self.send_once(adapted).await {
        Ok(value) => return Ok(value),
        Err(e) => e,
      };

      match self.inner.interceptor.retry(state.transport_retries, &error) {
        RetryDecision::DoNotRetry => return Err(error),
        RetryDecision::RetryAfter(delay) => {
          warn!(
            error = %error,
            attempt = state.attempt,
            transport_retry = state.transport_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Transport failure, retrying"
          );
          tokio::time::sleep(delay).await;
          state.transport_retries += 1;
        }
      }
    }
  }

  async fn send_once<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, NetworkError> {
    let response = self.inner.transport.send(request).await?;

    if !response.is_success() {
      return Err(NetworkError::Server(response.status));
    }
    if response.body.is_empty() {
      return Err(NetworkError::NoData);
    }

    serde_json::from_slice(&response.body).map_err(NetworkError::Decoding)
  }
}

/// A request running in the background that can be cancelled.
///
/// Cancelling (or dropping the handle) aborts the transport exchange, and
/// no value or error is delivered afterwards.
pub struct PendingRequest<T> {
  token: CancellationToken,
  handle: JoinHandle<Option<Result<T, NetworkError>>>,
}

impl<T> PendingRequest<T> {
  pub fn cancel(&self) {
    self.token.cancel();
  }

  pub fn is_cancelled(&self) -> bool {
    self.token.is_cancelled()
  }

  /// Wait for the request. `None` means it was cancelled.
  pub async fn outcome(mut self) -> Option<Result<T, NetworkError>> {
    let joined = (&mut self.handle).await;
    if self.token.is_cancelled() {
      return None;
    }

    match joined {
      Ok(outcome) => outcome,
      Err(e) => {
        warn!(error = %e, "Request task failed");
        Some(Err(NetworkError::Unknown))
      }
    }
  }
}

impl<T> Drop for PendingRequest<T> {
  fn drop(&mut self) {
    self.token.cancel();
  }
}
