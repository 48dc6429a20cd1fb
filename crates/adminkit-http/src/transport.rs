//! Transport abstraction
//!
//! The pipeline only needs "send this, give me status and body". Keeping that
//! behind a trait lets tests script responses without a server.

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// No usable response was received
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Timeout(_) => "timeout",
            TransportError::Connect(_) => "connect",
            TransportError::Request(_) => "request",
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let msg = e.to_string();
        if e.is_timeout() {
            TransportError::Timeout(msg)
        } else if e.is_connect() {
            TransportError::Connect(msg)
        } else {
            TransportError::Request(msg)
        }
    }
}

pub trait Transport: Send + Sync + 'static {
    /// Perform exactly one attempt
    fn send(
        &self,
        request: OutboundRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        // A body cut off mid-stream means no usable response
        let body = response.bytes().await?;

        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}
