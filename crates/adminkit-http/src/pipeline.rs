//! Request Pipeline
//!
//! Builds the outbound call, sends it once, and turns whatever came back into
//! a typed [`RequestOutcome`].

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

use adminkit_session::SessionStore;

use crate::error::{ErrorKind, RequestError};
use crate::notify::{LogNotifier, Notice, Notifier};
use crate::transport::{OutboundRequest, Transport, TransportResponse};
use crate::RequestOutcome;

/// Per-call knobs merged over the pipeline defaults
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Emit a notice when the call fails
    pub notify_on_error: bool,
    /// Attach the session's bearer token when there is one
    pub attach_token: bool,
    /// Tear down the session on a 401
    pub invalidate_on_unauthorized: bool,
    /// Extra headers; these win over the JSON defaults
    pub headers: HeaderMap,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            notify_on_error: true,
            attach_token: true,
            invalidate_on_unauthorized: true,
            headers: HeaderMap::new(),
        }
    }
}

impl RequestOptions {
    /// Caller shows its own feedback
    pub fn quiet() -> Self {
        Self {
            notify_on_error: false,
            ..Self::default()
        }
    }

    /// No credential is sent, so a 401 says nothing about the session
    pub fn anonymous() -> Self {
        Self {
            attach_token: false,
            invalidate_on_unauthorized: false,
            ..Self::default()
        }
    }

    pub fn silent(mut self) -> Self {
        self.notify_on_error = false;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

pub struct RequestPipeline<T> {
    transport: Arc<T>,
    session: SessionStore,
    notifier: Arc<dyn Notifier>,
    /// Base URL including the API prefix, e.g. `http://host/api/v1`
    base_url: Url,
}

impl<T: Transport> RequestPipeline<T> {
    pub fn new(transport: T, session: SessionStore, base_url: Url) -> Self {
        Self {
            transport: Arc::new(transport),
            session,
            notifier: Arc::new(LogNotifier),
            base_url,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Execute one API call.
    ///
    /// `endpoint` is relative to the base URL (`/categories/3`). The outcome
    /// is always exactly one of success or a classified failure.
    pub async fn request<R, B>(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&B>,
        options: RequestOptions,
    ) -> RequestOutcome<R>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request_id = Uuid::new_v4();
        // The session this call belongs to, fixed before anything is sent
        let (generation, token) = self.session.bearer();
        let token = token.filter(|_| options.attach_token);

        let outcome = self
            .execute(request_id, endpoint, method.clone(), body, token, &options)
            .await;

        match &outcome {
            Ok(_) => {
                tracing::debug!(%request_id, %method, endpoint, "Request succeeded");
            }
            Err(err) => {
                tracing::warn!(
                    %request_id,
                    %method,
                    endpoint,
                    kind = %err.kind,
                    status = ?err.status,
                    detail = ?err.detail,
                    "Request failed"
                );

                if err.kind == ErrorKind::Unauthorized && options.invalidate_on_unauthorized {
                    self.session.force_invalidate_if(generation);
                }
                if options.notify_on_error {
                    self.notifier.notify(Notice::error(err.message.clone()));
                }
            }
        }

        outcome
    }

    pub async fn get<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> RequestOutcome<R> {
        self.request::<R, ()>(endpoint, Method::GET, None, options)
            .await
    }

    pub async fn post<R, B>(&self, endpoint: &str, body: &B, options: RequestOptions) -> RequestOutcome<R>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(endpoint, Method::POST, Some(body), options)
            .await
    }

    pub async fn put<R, B>(&self, endpoint: &str, body: &B, options: RequestOptions) -> RequestOutcome<R>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(endpoint, Method::PUT, Some(body), options)
            .await
    }

    pub async fn delete<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> RequestOutcome<R> {
        self.request::<R, ()>(endpoint, Method::DELETE, None, options)
            .await
    }

    async fn execute<R, B>(
        &self,
        request_id: Uuid,
        endpoint: &str,
        method: Method,
        body: Option<&B>,
        token: Option<String>,
        options: &RequestOptions,
    ) -> RequestOutcome<R>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url_for(endpoint)?;
        let body = match body {
            Some(b) => Some(serde_json::to_vec(b).map_err(|e| {
                RequestError::validation(format!("请求数据无法编码: {}", e))
            })?),
            None => None,
        };

        let request = OutboundRequest {
            method,
            url,
            headers: headers_for(options, token.as_deref()),
            body,
        };

        tracing::debug!(
            %request_id,
            method = %request.method,
            url = %request.url,
            authorized = request.headers.contains_key(AUTHORIZATION),
            "Sending request"
        );

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| RequestError::network(e.to_string()))?;

        classify(response)
    }

    fn url_for(&self, endpoint: &str) -> RequestOutcome<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let endpoint = endpoint.trim_start_matches('/');

        Url::parse(&format!("{}/{}", base, endpoint))
            .map_err(|e| RequestError::validation(format!("无效的请求地址 {}: {}", endpoint, e)))
    }
}

fn headers_for(options: &RequestOptions, token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    for (name, value) in options.headers.iter() {
        headers.insert(name.clone(), value.clone());
    }

    if let Some(token) = token {
        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => tracing::warn!("Session token is not a valid header value"),
        }
    }

    headers
}

impl<T> Clone for RequestPipeline<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            session: self.session.clone(),
            notifier: Arc::clone(&self.notifier),
            base_url: self.base_url.clone(),
        }
    }
}

fn classify<R: DeserializeOwned>(response: TransportResponse) -> RequestOutcome<R> {
    let status = response.status;

    if status == StatusCode::UNAUTHORIZED {
        return Err(RequestError::unauthorized());
    }
    if !status.is_success() {
        return Err(RequestError::http(status.as_u16()));
    }

    // An empty body is malformed, not `null`
    serde_json::from_slice(&response.body).map_err(|e| RequestError::parse(e.to_string()))
}
