//! Transport collaborator and its HTTP implementation.

use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use http_body_util::{BodyExt as _, Full};
use hyper::{body::Bytes, header, Method, Request, StatusCode, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::{
    runtime::Handle,
    sync::{mpsc, Semaphore},
};

use crate::policy::{DeliveryPolicy, DeliveryRequest, DeliveryResponse, TlsMode};

/// Minimum interval between delivery error logs, so that a misbehaving collector
/// doesn't flood logs at `WARN` / `ERROR` level.
const ERROR_LOG_INTERVAL: Duration = Duration::from_secs(60);
/// Delay before the first retry; doubled for each subsequent retry.
const INITIAL_BACKOFF: Duration = Duration::from_millis(50);

/// Rendered payload handed over to a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Payload body.
    pub body: String,
    /// HTTP content type of the body.
    pub content_type: &'static str,
}

/// Delivery mechanism for rendered payloads.
///
/// Delivery is fire-and-forget: [`Self::send_event()`] must not block on network I/O,
/// and delivery outcome is never reported back to the caller.
pub trait Transport: fmt::Debug + Send + Sync + 'static {
    /// Submits the payload for delivery.
    fn send_event(&self, payload: Payload);
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send_event(&self, payload: Payload) {
        (**self).send_event(payload);
    }
}

/// Error delivering a payload.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DeliveryError {
    /// Request cannot be built.
    #[error("failed building delivery request")]
    Request(#[source] hyper::http::Error),
    /// Request has failed on the connection level.
    #[error("HTTP request failed")]
    Http(#[source] hyper_util::client::legacy::Error),
    /// Response body cannot be read.
    #[error("failed reading response body")]
    Body(#[source] hyper::Error),
    /// Request has timed out.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// Collector responded with a non-successful status.
    #[error("collector returned {status}: {body}")]
    Status {
        /// Response status.
        status: StatusCode,
        /// Response body (lossily decoded as UTF-8).
        body: String,
    },
}

impl DeliveryError {
    /// Checks whether the delivery should be retried after this error.
    ///
    /// Connection errors and timeouts are retried, as are 408 (Request Timeout),
    /// 429 (Too Many Requests) and 5xx statuses. Other statuses are terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) => false,
            Self::Http(_) | Self::Body(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => {
                *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
                    || status.is_server_error()
            }
        }
    }
}

#[derive(Debug, Default)]
struct ErrorLogThrottle {
    last_log_timestamp: Mutex<Option<Instant>>,
}

impl ErrorLogThrottle {
    fn should_log(&self) -> bool {
        let mut last_log_timestamp = self
            .last_log_timestamp
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let should_log =
            last_log_timestamp.map_or(true, |timestamp| timestamp.elapsed() >= ERROR_LOG_INTERVAL);
        if should_log {
            *last_log_timestamp = Some(Instant::now());
        }
        should_log
    }
}

type HttpClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

struct DeliveryWorker {
    client: HttpClient,
    policy: DeliveryPolicy,
    error_throttle: ErrorLogThrottle,
}

impl DeliveryWorker {
    fn new(policy: DeliveryPolicy) -> Self {
        let connector = HttpsConnectorBuilder::new()
            .with_tls_config(policy.tls_config().clone())
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(policy.pool_size().get())
            .build(connector);
        Self {
            client,
            policy,
            error_throttle: ErrorLogThrottle::default(),
        }
    }

    async fn run(self, mut receiver: mpsc::UnboundedReceiver<Payload>) {
        let permits = Arc::new(Semaphore::new(self.policy.pool_size().get()));
        let this = Arc::new(self);
        while let Some(payload) = receiver.recv().await {
            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };
            let this = Arc::clone(&this);
            tokio::spawn(async move {
                this.deliver(payload).await;
                drop(permit);
            });
        }
        tracing::info!(
            url = %this.policy.url(),
            "Transport dropped, metrics delivery worker is shutting down"
        );
    }

    async fn deliver(&self, payload: Payload) {
        let mut request = DeliveryRequest {
            url: self.policy.url().clone(),
            content_type: payload.content_type,
            payload_size: payload.body.len(),
            attempt: 0,
        };
        let body = Bytes::from(payload.body);
        let mut backoff = INITIAL_BACKOFF;

        loop {
            let started_at = Instant::now();
            match self.try_deliver(&request, body.clone()).await {
                Ok(response) => {
                    let latency = started_at.elapsed();
                    tracing::debug!(
                        latency_sec = latency.as_secs_f64(),
                        payload_size = request.payload_size,
                        attempt = request.attempt,
                        "Delivered metrics in {latency:?}"
                    );
                    self.policy.success_handler().call(&request, &response);
                    return;
                }
                Err(err) if err.is_retryable() && request.attempt < self.policy.max_retries() => {
                    tracing::debug!(
                        %err,
                        attempt = request.attempt,
                        "Metrics delivery failed, retrying in {backoff:?}"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    request.attempt += 1;
                }
                Err(err) => {
                    self.report_error(&err, &request);
                    return;
                }
            }
        }
    }

    async fn try_deliver(
        &self,
        request: &DeliveryRequest,
        body: Bytes,
    ) -> Result<DeliveryResponse, DeliveryError> {
        let http_request = Request::builder()
            .method(Method::POST)
            .uri(request.url.clone())
            .header(header::CONTENT_TYPE, request.content_type)
            .body(Full::new(body))
            .map_err(DeliveryError::Request)?;

        let timeout = self.policy.request_timeout();
        let response = tokio::time::timeout(timeout, async {
            let response = self
                .client
                .request(http_request)
                .await
                .map_err(DeliveryError::Http)?;
            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(DeliveryError::Body)?
                .to_bytes();
            Ok::<_, DeliveryError>(DeliveryResponse { status, body })
        })
        .await
        .map_err(|_| DeliveryError::Timeout(timeout))??;

        if response.status.is_success() {
            Ok(response)
        } else {
            Err(DeliveryError::Status {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            })
        }
    }

    fn report_error(&self, err: &DeliveryError, request: &DeliveryRequest) {
        if !self.error_throttle.should_log() {
            return;
        }

        let url = &request.url;
        let attempts = request.attempt + 1;
        if let DeliveryError::Status { status, body } = err {
            tracing::warn!(
                %status,
                %body,
                %url,
                attempts,
                "Error delivering metrics to collector"
            );
        } else {
            tracing::error!(
                %err,
                %url,
                attempts,
                "Error submitting metrics to collector"
            );
        }
    }
}

/// HTTP(S) [`Transport`] delivering payloads with `POST` requests.
///
/// Payloads are queued and delivered by a worker task spawned on the provided Tokio runtime,
/// with at most [`DeliveryPolicy::pool_size()`] concurrent deliveries. Failed deliveries are retried
/// with exponential backoff up to [`DeliveryPolicy::max_retries()`] times; final failures are logged
/// (at most once per minute). Dropping the transport lets the worker deliver queued payloads and exit.
#[derive(Debug)]
pub struct HttpTransport {
    sender: mpsc::UnboundedSender<Payload>,
    url: Uri,
}

impl HttpTransport {
    /// Creates a transport and spawns its delivery worker on the `runtime`.
    pub fn new(policy: DeliveryPolicy, runtime: &Handle) -> Self {
        let url = policy.url().clone();
        if policy.tls_mode() == TlsMode::InsecureSkipVerify {
            tracing::warn!(
                %url,
                "Server certificate verification is disabled for metrics delivery"
            );
        }
        tracing::info!(
            "Created HTTP metrics transport to `{url}` with pool size {} and up to {} retries",
            policy.pool_size(),
            policy.max_retries()
        );

        let (sender, receiver) = mpsc::unbounded_channel();
        runtime.spawn(DeliveryWorker::new(policy).run(receiver));
        Self { sender, url }
    }
}

impl Transport for HttpTransport {
    fn send_event(&self, payload: Payload) {
        if self.sender.send(payload).is_err() {
            tracing::warn!(
                url = %self.url,
                "Metrics delivery worker has stopped; dropping payload"
            );
        }
    }
}
