use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use http_test_util::byte_body;
use http_test_util::drain::DrainBodyFuture;
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Request, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::time::{self, Instant};

use crate::error::TransportError;
use crate::outcome::{classify, RequestOutcome};

/// Largest response body read before the request counts as a transport failure.
pub const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// Where one worker's request goes. Every call is one attempt, never retried.
pub trait Target: Clone + Send + Sync + 'static {
    fn fire(&self) -> impl Future<Output = RequestOutcome> + Send;
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client<HttpConnector, Full<Bytes>>,
    max_body: usize,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    #[must_use]
    pub fn new() -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self {
            client,
            max_body: MAX_RESPONSE_BYTES,
        }
    }

    #[must_use]
    pub fn with_max_body(mut self, max_body: usize) -> Self {
        self.max_body = max_body;
        self
    }

    /// POSTs a JSON payload and classifies the response. `timeout` covers the
    /// whole exchange, connect through the last body byte.
    pub async fn post_json(&self, uri: Uri, payload: Bytes, timeout: Duration) -> RequestOutcome {
        let start = Instant::now();
        let request = match Request::post(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(byte_body(payload))
        {
            Ok(request) => request,
            Err(e) => {
                return RequestOutcome::TransportFailure {
                    latency: start.elapsed(),
                    reason: TransportError::InvalidRequest(e.to_string()),
                }
            }
        };
        match time::timeout(timeout, self.send_recv(request)).await {
            Ok(Ok((status, body))) => classify(status, &body, start.elapsed()),
            Ok(Err(reason)) => RequestOutcome::TransportFailure {
                latency: start.elapsed(),
                reason,
            },
            Err(_elapsed) => RequestOutcome::TransportFailure {
                latency: start.elapsed(),
                reason: TransportError::Timeout(timeout),
            },
        }
    }

    async fn send_recv(
        &self,
        request: Request<Full<Bytes>>,
    ) -> Result<(StatusCode, Vec<u8>), TransportError> {
        let resp = self.client.request(request).await.map_err(|e| {
            let connect = e.is_connect();
            let reason = format!("{:#}", anyhow::Error::new(e));
            if connect {
                TransportError::Connect(reason)
            } else {
                TransportError::Other(reason)
            }
        })?;
        let status = resp.status();
        let content_length: usize = resp
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|hv| hv.to_str().ok())
            .and_then(|hv| hv.parse().ok())
            .unwrap_or(1024);
        let bytes = DrainBodyFuture::new_trusted_length(resp.into_body(), content_length)
            .with_limit(self.max_body)
            .await
            .map_err(|e| TransportError::Other(format!("{e:#}")))?;
        Ok((status, bytes))
    }
}

/// Posts the same payload to one endpoint on every call.
#[derive(Clone)]
pub struct HttpTarget {
    client: HttpClient,
    uri: Uri,
    payload: Bytes,
    timeout: Duration,
}

impl HttpTarget {
    #[must_use]
    pub fn new(client: HttpClient, uri: Uri, payload: Bytes, timeout: Duration) -> Self {
        Self {
            client,
            uri,
            payload,
            timeout,
        }
    }
}

impl Target for HttpTarget {
    fn fire(&self) -> impl Future<Output = RequestOutcome> + Send {
        self.client
            .post_json(self.uri.clone(), self.payload.clone(), self.timeout)
    }
}
