//! HTTP client for the Webpushr send API.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use secrecy::ExposeSecret;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::{Credentials, DeliveryConfig};
use crate::error::Error;

use super::audience::Audience;
use super::payload::NotificationPayload;
use super::retry::RetryPolicy;

/// Header carrying the API key (`webpushrKey`). Header names are
/// case-insensitive; `HeaderName` wants them lowercase.
const KEY_HEADER: &str = "webpushrkey";

/// Header carrying the auth token (`webpushrAuthToken`). Never logged.
const TOKEN_HEADER: &str = "webpushrauthtoken";

/// Webpushr send endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Broadcast to every subscriber.
    All,
    /// Subscribers in one segment.
    Segment,
    /// A single subscriber id.
    Subscriber,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::All => "/notification/send/all",
            Endpoint::Segment => "/notification/send/segment",
            Endpoint::Subscriber => "/notification/send/sid",
        }
    }

    pub fn url(&self, api_base: &str) -> String {
        format!("{}{}", api_base.trim_end_matches('/'), self.path())
    }
}

/// Result of one send call, after retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// 2xx response.
    Delivered { status: u16 },
    /// Non-2xx response. Not retried.
    Rejected { status: u16 },
    /// No response after every attempt.
    TransportFailed { attempts: u32 },
    /// Logged only.
    DryRun,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            DeliveryOutcome::Delivered { .. } | DeliveryOutcome::DryRun
        )
    }
}

/// Sends payloads with bounded retries. Failures are logged and reported
/// as outcomes, never returned as errors.
#[derive(Debug)]
pub struct DeliveryClient {
    http: reqwest::Client,
    api_base: String,
    /// Credential and content-type headers, marked sensitive.
    headers: HeaderMap,
    retry: RetryPolicy,
    pacing: Duration,
    dry_run: bool,
}

impl DeliveryClient {
    pub fn new(
        config: &DeliveryConfig,
        credentials: Credentials,
        dry_run: bool,
    ) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.clone(),
            headers: request_headers(&credentials)?,
            retry: RetryPolicy::from(config),
            pacing: config.pacing(),
            dry_run,
        })
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Send a payload to its audience, one call per fan-out target, in
    /// order, pausing between calls.
    pub async fn deliver(
        &self,
        payload: &NotificationPayload,
        audience: &Audience,
    ) -> Vec<DeliveryOutcome> {
        let requests = audience.fan_out(payload);
        let mut outcomes = Vec::with_capacity(requests.len());

        for (idx, (endpoint, body)) in requests.iter().enumerate() {
            if let Some(pause) = self.pause_before(idx) {
                sleep(pause).await;
            }
            outcomes.push(self.send(*endpoint, body).await);
        }

        outcomes
    }

    /// Pause before the send at `idx`. Only between sends, never in dry run.
    fn pause_before(&self, idx: usize) -> Option<Duration> {
        (idx > 0 && !self.pacing.is_zero() && !self.dry_run).then_some(self.pacing)
    }

    /// Send a single request.
    pub async fn send(&self, endpoint: Endpoint, payload: &NotificationPayload) -> DeliveryOutcome {
        let url = endpoint.url(&self.api_base);
        let body = serde_json::to_string(payload)
            .unwrap_or_else(|e| format!("<unserializable payload: {}>", e));

        info!(
            url = %url,
            headers = ?redacted_headers(&self.headers),
            payload = %body,
            "Sending push"
        );

        if self.dry_run {
            info!(url = %url, "Dry run, request not sent");
            return DeliveryOutcome::DryRun;
        }

        match self.post_with_retries(&url, payload).await {
            Ok(response) => log_response(response).await,
            Err(attempts) => {
                error!(url = %url, attempts, "Giving up on push request");
                DeliveryOutcome::TransportFailed { attempts }
            }
        }
    }

    /// POST until a response arrives. Only transport errors are retried;
    /// an HTTP error status is still a response. On failure returns the
    /// number of attempts made.
    async fn post_with_retries(
        &self,
        url: &str,
        payload: &NotificationPayload,
    ) -> Result<reqwest::Response, u32> {
        let mut attempt = 1;
        loop {
            let result = self
                .http
                .post(url)
                .headers(self.headers.clone())
                .json(payload)
                .send()
                .await;

            let err = match result {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            if err.is_builder() {
                error!(error = %err, "Push request could not be built");
                return Err(attempt);
            }

            match self.retry.next_delay(attempt) {
                Some(delay) => {
                    warn!(
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %err,
                        "Push request failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    warn!(attempt, error = %err, "Push request failed");
                    return Err(attempt);
                }
            }
        }
    }
}

async fn log_response(response: reqwest::Response) -> DeliveryOutcome {
    let status = response.status();
    let headers = header_map(response.headers());
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => format!("<unreadable body: {}>", e),
    };

    if status.is_success() {
        info!(status = status.as_u16(), headers = ?headers, body = %body, "Push accepted");
        DeliveryOutcome::Delivered {
            status: status.as_u16(),
        }
    } else {
        warn!(status = status.as_u16(), headers = ?headers, body = %body, "Push rejected");
        DeliveryOutcome::Rejected {
            status: status.as_u16(),
        }
    }
}

fn request_headers(credentials: &Credentials) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(KEY_HEADER),
        secret_header("API key", credentials.api_key.expose_secret())?,
    );
    headers.insert(
        HeaderName::from_static(TOKEN_HEADER),
        secret_header("auth token", credentials.auth_token.expose_secret())?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

fn secret_header(name: &'static str, secret: &str) -> Result<HeaderValue, Error> {
    let mut value = HeaderValue::from_str(secret)
        .map_err(|_| Error::invalid(name, "contains characters not allowed in a header"))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Request headers for logging: the key masked, the token left out.
fn redacted_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter(|(name, _)| name.as_str() != TOKEN_HEADER)
        .map(|(name, value)| {
            let text = value.to_str().unwrap_or("<binary>");
            let text = if name.as_str() == KEY_HEADER {
                mask(text)
            } else {
                text.to_string()
            };
            (name.as_str().to_string(), text)
        })
        .collect()
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or("<binary>").to_string(),
            )
        })
        .collect()
}

/// Keep the first four characters of a secret.
fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}
