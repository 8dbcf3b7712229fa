//! Delivery configuration and the validated delivery policy.

use std::{fmt, num::NonZeroUsize, path::PathBuf, sync::Arc, time::Duration};

use hyper::{body::Bytes, http::uri::InvalidUri, StatusCode, Uri};
use serde::{Deserialize, Serialize};

use crate::tls::{self, TlsError};

/// Server certificate verification mode.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsMode {
    /// Verify server certificates against the Mozilla root store and optional extra CA certificates.
    #[default]
    Verify,
    /// Accept any server certificate. Must be opted into explicitly; a warning is logged
    /// whenever a transport is created with this mode.
    InsecureSkipVerify,
}

/// TLS section of [`DeliveryConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Certificate verification mode.
    pub mode: TlsMode,
    /// Path to a PEM file with additional CA certificates trusted in the [`TlsMode::Verify`] mode.
    pub ca_file: Option<PathBuf>,
}

/// Delivery configuration for the HTTP transport, e.g. loaded from a config file.
///
/// The config is validated into a [`DeliveryPolicy`] with [`Self::into_policy()`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// URL of the collector. Must use the `http` or `https` scheme.
    pub url: Option<String>,
    /// TLS settings used for `https` URLs.
    pub tls: TlsConfig,
    /// Maximum number of concurrent deliveries (and idle pooled connections). Must be positive.
    pub pool_size: usize,
    /// Maximum number of retries for a failed delivery.
    pub max_retries: u32,
    /// Timeout for a single delivery attempt in milliseconds. Must be positive.
    pub request_timeout_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            url: None,
            tls: TlsConfig::default(),
            pool_size: 1,
            max_retries: 1,
            request_timeout_ms: 10_000,
        }
    }
}

impl DeliveryConfig {
    /// Creates a default config for the specified collector URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Validates this config.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is missing or invalid, the pool size or timeout is zero,
    /// or TLS context cannot be initialized.
    pub fn into_policy(self) -> Result<DeliveryPolicy, PolicyError> {
        let raw_url = self.url.ok_or(PolicyError::MissingUrl)?;
        let url: Uri = raw_url.parse().map_err(|source| PolicyError::InvalidUrl {
            url: raw_url.clone(),
            source,
        })?;
        if !matches!(url.scheme_str(), Some("http" | "https")) || url.host().is_none() {
            return Err(PolicyError::UnsupportedUrl(raw_url));
        }

        let pool_size = NonZeroUsize::new(self.pool_size).ok_or(PolicyError::ZeroPoolSize)?;
        if self.request_timeout_ms == 0 {
            return Err(PolicyError::ZeroTimeout);
        }
        let tls_config = tls::client_config(self.tls.mode, self.tls.ca_file.as_deref())?;

        Ok(DeliveryPolicy {
            url,
            tls_mode: self.tls.mode,
            tls_config,
            pool_size,
            max_retries: self.max_retries,
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            success_handler: SuccessHandler::default(),
        })
    }
}

/// Error validating a [`DeliveryConfig`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PolicyError {
    /// Collector URL is not configured.
    #[error("collector URL is not configured")]
    MissingUrl,
    /// Collector URL cannot be parsed.
    #[error("invalid collector URL `{url}`")]
    InvalidUrl {
        /// Raw URL.
        url: String,
        /// Parsing error.
        #[source]
        source: InvalidUri,
    },
    /// Collector URL is not an absolute `http` / `https` URL.
    #[error("collector URL `{0}` must be an absolute `http` or `https` URL")]
    UnsupportedUrl(String),
    /// Pool size is zero.
    #[error("connection pool size must be positive")]
    ZeroPoolSize,
    /// Request timeout is zero.
    #[error("request timeout must be positive")]
    ZeroTimeout,
    /// TLS context cannot be initialized.
    #[error(transparent)]
    Tls(#[from] TlsError),
}

/// Information about a successfully delivered request passed to the [`SuccessHandler`].
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    /// Collector URL.
    pub url: Uri,
    /// Content type of the payload.
    pub content_type: &'static str,
    /// Payload size in bytes.
    pub payload_size: usize,
    /// Zero-based attempt number that succeeded.
    pub attempt: u32,
}

/// Collector response passed to the [`SuccessHandler`].
#[derive(Debug, Clone)]
pub struct DeliveryResponse {
    /// Response status; always successful (2xx).
    pub status: StatusCode,
    /// Response body.
    pub body: Bytes,
}

type SuccessFn = dyn Fn(&DeliveryRequest, &DeliveryResponse) + Send + Sync;

/// Callback invoked after each successful delivery. There is no failure counterpart;
/// delivery failures are logged by the transport.
///
/// The default handler logs delivery at the `DEBUG` level.
#[derive(Clone)]
pub struct SuccessHandler(Arc<SuccessFn>);

impl fmt::Debug for SuccessHandler {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("SuccessHandler").finish_non_exhaustive()
    }
}

impl Default for SuccessHandler {
    fn default() -> Self {
        Self::new(|request, response| {
            tracing::debug!(
                url = %request.url,
                status = %response.status,
                payload_size = request.payload_size,
                attempt = request.attempt,
                "Delivered metrics to collector"
            );
        })
    }
}

impl SuccessHandler {
    /// Wraps the provided closure.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&DeliveryRequest, &DeliveryResponse) + Send + Sync + 'static,
    {
        Self(Arc::new(handler))
    }

    pub(crate) fn call(&self, request: &DeliveryRequest, response: &DeliveryResponse) {
        (self.0)(request, response);
    }
}

/// Validated delivery policy for the HTTP transport.
#[derive(Clone)]
pub struct DeliveryPolicy {
    url: Uri,
    tls_mode: TlsMode,
    tls_config: Arc<rustls::ClientConfig>,
    pool_size: NonZeroUsize,
    max_retries: u32,
    request_timeout: Duration,
    success_handler: SuccessHandler,
}

impl fmt::Debug for DeliveryPolicy {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DeliveryPolicy")
            .field("url", &self.url)
            .field("tls_mode", &self.tls_mode)
            .field("pool_size", &self.pool_size)
            .field("max_retries", &self.max_retries)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl DeliveryPolicy {
    /// Sets the handler invoked after each successful delivery.
    #[must_use]
    pub fn with_success_handler(mut self, handler: SuccessHandler) -> Self {
        self.success_handler = handler;
        self
    }

    /// Returns the collector URL.
    pub fn url(&self) -> &Uri {
        &self.url
    }

    /// Returns the certificate verification mode.
    pub fn tls_mode(&self) -> TlsMode {
        self.tls_mode
    }

    pub(crate) fn tls_config(&self) -> &rustls::ClientConfig {
        &self.tls_config
    }

    /// Returns the maximum number of concurrent deliveries.
    pub fn pool_size(&self) -> NonZeroUsize {
        self.pool_size
    }

    /// Returns the maximum number of retries for a failed delivery.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the timeout for a single delivery attempt.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub(crate) fn success_handler(&self) -> &SuccessHandler {
        &self.success_handler
    }
}
