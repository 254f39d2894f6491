use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, TransportError};
use crate::gateway::transport::{ApiRequest, Transport, TransportResponse};

/// The result of a typed backend operation.
pub type ApiResult<T> = std::result::Result<T, GatewayError>;

/// Error body the backend sends alongside a non-2xx status.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Outbound calls with a per-attempt timeout and exponential backoff.
///
/// The gateway holds no mutable state; clones share the transport and clock.
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(transport: Arc<dyn Transport>, clock: Arc<dyn Clock>, config: GatewayConfig) -> Self {
        Self {
            transport,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Performs `request` and returns the decoded JSON body.
    pub async fn call(&self, request: ApiRequest) -> ApiResult<sonic_rs::Value> {
        self.call_json(request).await
    }

    /// Performs `request` and decodes the 2xx body into `T`.
    ///
    /// An undecodable body counts as a failed attempt.
    pub async fn call_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        self.call_cancellable(request, &CancellationToken::new()).await
    }

    /// Same as [`call_json`](Self::call_json), but stops as soon as `cancel`
    /// fires. A cancelled call is never retried.
    pub async fn call_cancellable<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> ApiResult<T> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(TransportError::Cancelled),
                result = tokio::time::timeout(
                    self.config.request_timeout,
                    self.transport.send(&request),
                ) => match result {
                    Ok(Ok(response)) => decode::<T>(response),
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(TransportError::Timeout(self.config.request_timeout)),
                },
            };

            let last_error = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(
                            "✅ {} {} succeeded on attempt {}",
                            request.method,
                            request.path,
                            attempt
                        );
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if last_error == TransportError::Cancelled {
                tracing::debug!("{} {} cancelled", request.method, request.path);
                return Err(GatewayError {
                    attempts: attempt,
                    last_error,
                });
            }

            if attempt >= max_attempts {
                tracing::error!(
                    "❌ {} {} failed after {} attempts: {}",
                    request.method,
                    request.path,
                    attempt,
                    last_error
                );
                return Err(GatewayError {
                    attempts: attempt,
                    last_error,
                });
            }

            let delay = self.config.delay_after_attempt(attempt);
            tracing::warn!(
                "⚠️  {} {} attempt {} failed: {} (retrying in {:?})",
                request.method,
                request.path,
                attempt,
                last_error,
                delay
            );

            let cancelled = tokio::select! {
                biased;
                _ = cancel.cancelled() => true,
                _ = self.clock.sleep(delay) => false,
            };

            if cancelled {
                return Err(GatewayError {
                    attempts: attempt,
                    last_error: TransportError::Cancelled,
                });
            }
        }
    }
}

fn decode<T: DeserializeOwned>(response: TransportResponse) -> Result<T, TransportError> {
    if !response.is_success() {
        return Err(TransportError::Status {
            status: response.status,
            message: error_message(&response),
        });
    }

    sonic_rs::from_slice(&response.body).map_err(|e| TransportError::Decode(e.to_string()))
}

fn error_message(response: &TransportResponse) -> String {
    sonic_rs::from_slice::<ErrorBody>(&response.body)
        .ok()
        .and_then(|body| body.error.or(body.message))
        .or_else(|| {
            http::StatusCode::from_u16(response.status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "unexpected status".to_string())
}
