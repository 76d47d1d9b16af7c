//! HTTP transport for the Liferay JSON web services, with retry logic.

use super::transport::Transport;
use super::types::{Method, Payload, Response};
use crate::error::{LiferayError, Result};
use async_trait::async_trait;
use reqwest::{Client, Identity, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Basic authentication credentials
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    /// Credentials are only used when both parts are present
    pub fn from_parts(user: Option<String>, password: Option<String>) -> Option<Self> {
        match (user, password) {
            (Some(user), Some(password)) => Some(Self { user, password }),
            _ => None,
        }
    }
}

/// Live transport backed by `reqwest`
pub struct HttpTransport {
    /// HTTP client
    client: Client,
    /// Basic auth sent with every request
    credentials: Option<Credentials>,
    /// Maximum retries for failed requests
    max_retries: u32,
    /// Base delay for retry (exponential backoff)
    retry_delay_ms: u64,
}

impl HttpTransport {
    /// Create a new transport
    ///
    /// `cert` is a PEM file holding the client certificate and its private key.
    pub fn new(
        credentials: Option<Credentials>,
        verify: bool,
        cert: Option<&Path>,
        timeout: Duration,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> Result<Self> {
        if !verify {
            warn!("TLS certificate verification is disabled");
        }

        let mut builder = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("liferay-connector/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(!verify);

        if let Some(cert) = cert {
            debug!(cert = %cert.display(), "Using client certificate");
            builder = builder.use_rustls_tls().identity(load_identity(cert)?);
        }

        let client = builder
            .build()
            .map_err(|e| LiferayError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            credentials,
            max_retries,
            retry_delay_ms,
        })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_delay_ms.saturating_mul(2u64.saturating_pow(attempt)))
    }

    fn request(&self, url: &str, method: Method, payload: Option<&Payload>) -> reqwest::RequestBuilder {
        let mut request = match (method, payload) {
            (Method::Get, None) => self.client.get(url),
            (Method::Get, Some(payload)) => self.client.get(url).query(payload),
            (Method::Post, None) => self.client.post(url),
            (Method::Post, Some(payload)) => self.client.post(url).form(payload),
        };
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.user, Some(&credentials.password));
        }
        request
    }
}

/// Read a PEM client identity (certificate chain plus private key)
fn load_identity(path: &Path) -> Result<Identity> {
    let pem = std::fs::read(path).map_err(|e| {
        LiferayError::Config(format!("failed to read certificate {}: {}", path.display(), e))
    })?;
    Identity::from_pem(&pem).map_err(|e| {
        LiferayError::Config(format!("invalid certificate {}: {}", path.display(), e))
    })
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(
        &self,
        url: &str,
        method: Method,
        payload: Option<&Payload>,
    ) -> Result<Response> {
        for attempt in 0..=self.max_retries {
            debug!(url = %url, method = %method, attempt = attempt + 1, "Making API request");

            match self.request(url, method, payload).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let text = response
                            .text()
                            .await
                            .map_err(|e| LiferayError::transport(url, e))?;
                        debug!(url = %url, bytes = text.len(), "Request successful");
                        return Ok(Response {
                            status: status.as_u16(),
                            text,
                        });
                    }

                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());

                    let retryable =
                        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();

                    if retryable && attempt < self.max_retries {
                        let delay = self.backoff(attempt);
                        warn!(
                            url = %url,
                            status = %status,
                            delay_ms = delay.as_millis(),
                            "Request failed, retrying after delay"
                        );
                        sleep(delay).await;
                        continue;
                    }

                    warn!(
                        url = %url,
                        status = %status,
                        error = %error_text,
                        "Request failed"
                    );
                    return Err(LiferayError::transport(
                        url,
                        format!("status {}: {}", status, error_text),
                    ));
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Request error");

                    if attempt < self.max_retries {
                        let delay = self.backoff(attempt);
                        debug!(delay_ms = delay.as_millis(), "Retrying after delay");
                        sleep(delay).await;
                        continue;
                    }

                    return Err(LiferayError::transport(
                        url,
                        format!("failed after {} retries: {}", self.max_retries, e),
                    ));
                }
            }
        }

        Err(LiferayError::transport(url, "request failed after all retries"))
    }
}
