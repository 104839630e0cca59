//! Throttled transport to the commerce admin API
//!
//! Every remote call in the process passes through one [`ThrottleGate`]:
//! a call proceeds only after the previous call has finished AND the
//! minimum gap has elapsed since it finished. The gate models a global
//! rate budget shared by the API credential, so it is a deliberate
//! bottleneck, never sharded per caller.

use async_trait::async_trait;
use partsdesk_common::{Error, Result};
use reqwest::header::RETRY_AFTER;
use reqwest::Method;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};

const USER_AGENT: &str = "partsdesk/0.1.0";
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Serialized admission gate for remote calls.
///
/// Holds the completion instant of the most recent call. A permit is
/// the mutex guard itself, so callers are strictly serialized; the
/// completion instant is recorded when the permit drops, which charges
/// the throttle slot on success, retry exhaustion, and network failure
/// alike.
pub struct ThrottleGate {
    last_done: Mutex<Option<Instant>>,
    min_gap: Duration,
}

/// Permit for one remote call. Dropping it stamps the completion
/// instant and releases the gate.
pub struct ThrottlePermit<'a> {
    slot: MutexGuard<'a, Option<Instant>>,
}

impl Drop for ThrottlePermit<'_> {
    fn drop(&mut self) {
        *self.slot = Some(Instant::now());
    }
}

impl ThrottleGate {
    pub fn new(min_gap: Duration) -> Self {
        Self {
            last_done: Mutex::new(None),
            min_gap,
        }
    }

    /// Wait for the gate: previous call finished and the minimum gap
    /// elapsed since it finished.
    pub async fn acquire(&self) -> ThrottlePermit<'_> {
        let slot = self.last_done.lock().await;

        if let Some(done) = *slot {
            let elapsed = done.elapsed();
            if elapsed < self.min_gap {
                let wait_time = self.min_gap - elapsed;
                tracing::debug!("Throttling remote call: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        ThrottlePermit { slot }
    }
}

/// Retry delay for a 429/5xx response: server-supplied `Retry-After`
/// when present, otherwise a capped linear-in-attempt backoff.
pub fn backoff_delay(attempt: u32, retry_after: Option<Duration>) -> Duration {
    retry_after
        .unwrap_or_else(|| Duration::from_millis((2_000 * u64::from(attempt)).min(10_000)))
}

/// One JSON call to the remote API. Trait seam so tests can substitute
/// a scripted fake for the HTTP stack.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value>;
}

/// reqwest-backed [`Transport`] with throttling and retry.
pub struct HttpTransport {
    http_client: reqwest::Client,
    base_url: String,
    access_token: String,
    gate: ThrottleGate,
    max_attempts: u32,
}

impl HttpTransport {
    /// The gate is injected so ownership of the process-wide rate
    /// budget stays explicit at the construction site.
    pub fn new(
        base_url: &str,
        access_token: &str,
        gate: ThrottleGate,
        max_attempts: u32,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(CALL_TIMEOUT)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            gate,
            max_attempts: max_attempts.max(1),
        })
    }

    /// Attempt loop for one logical call. Runs entirely under the
    /// caller's throttle permit: retry backoff sleeps do not release
    /// the gate, so sustained errors cannot burst the remote API.
    async fn call_serialized(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        for attempt in 1..=self.max_attempts {
            let mut request = self
                .http_client
                .request(method.clone(), &url)
                .bearer_auth(&self.access_token);
            if let Some(body) = body {
                request = request.json(body);
            }

            tracing::debug!(method = %method, url = %url, attempt, "Calling remote API");

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.max_attempts => {
                    let delay = backoff_delay(attempt, None);
                    tracing::warn!(
                        url = %url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Remote call timed out, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) => return Err(Error::Network(e.to_string())),
            };

            let status = response.status();

            if (status.as_u16() == 429 || status.is_server_error()) && attempt < self.max_attempts
            {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);
                let delay = backoff_delay(attempt, retry_after);
                tracing::warn!(
                    url = %url,
                    status = status.as_u16(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Remote API asked us to back off, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            let body_text = response
                .text()
                .await
                .map_err(|e| Error::Network(e.to_string()))?;

            if !status.is_success() {
                // Either a non-retryable 4xx or the retry cap ran out on
                // the last attempt; surface status, reason and body.
                return Err(Error::Transport {
                    status: status.as_u16(),
                    message: format!(
                        "{} {}",
                        status.canonical_reason().unwrap_or("error"),
                        body_text.trim()
                    ),
                });
            }

            if body_text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_str(&body_text)?);
        }

        // Loop always returns on the final attempt.
        Err(Error::Internal("retry loop exited without a result".to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let _permit = self.gate.acquire().await;
        self.call_serialized(method, path, body.as_ref()).await
    }
}
