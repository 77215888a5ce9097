//! Remote data client: outbound HTTP with the session cookie attached.

use crate::config::ClientConfig;
use agrisense_cache::QueryFetcher;
use agrisense_core::{ApiRequest, ApiResponse, HttpMethod, QueryKey, RemoteError, Transport};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Real transport backed by reqwest.
///
/// The cookie store carries the server's session cookie across requests,
/// so callers never see or manage the credential themselves.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| RemoteError::transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, RemoteError> {
        Self::new(&config.api_base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, RemoteError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        };
        builder = builder.header(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RemoteError::transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::transport(e.to_string()))?;
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            "Request completed"
        );

        let body = if text.is_empty() && !status.is_success() {
            status.canonical_reason().unwrap_or_default().to_string()
        } else {
            text
        };
        Ok(ApiResponse::new(status.as_u16(), body))
    }
}

/// JSON client over any [`Transport`].
///
/// Non-2xx responses become [`RemoteError::Status`]; bodies that are not
/// JSON become [`RemoteError::Decode`].
#[derive(Clone)]
pub struct RemoteClient {
    transport: Arc<dyn Transport>,
}

impl RemoteClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Client over a real HTTP transport built from config.
    pub fn http(config: &ClientConfig) -> Result<Self, RemoteError> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::new(Arc::new(transport)))
    }

    pub async fn get_json(&self, path: &str) -> Result<Value, RemoteError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn post_json<B>(&self, path: &str, body: &B) -> Result<Value, RemoteError>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)
            .map_err(|e| RemoteError::decode(format!("request body: {}", e)))?;
        self.send(ApiRequest::post(path, Some(body))).await
    }

    /// POST without a body and without interpreting the response body.
    ///
    /// Success is decided by the status alone.
    pub async fn post_discard(&self, path: &str) -> Result<(), RemoteError> {
        let response = self.transport.send(ApiRequest::post(path, None)).await?;
        check_status(response).map(|_| ())
    }

    pub async fn send(&self, request: ApiRequest) -> Result<Value, RemoteError> {
        let response = self.transport.send(request).await?;
        parse_response(response)
    }

    /// A fetcher that GETs each key's path.
    pub fn fetcher(&self, on_unauthorized: UnauthorizedBehavior) -> Arc<dyn QueryFetcher> {
        Arc::new(PathFetcher::new(self.clone(), on_unauthorized))
    }
}

fn check_status(response: ApiResponse) -> Result<ApiResponse, RemoteError> {
    if response.is_success() {
        return Ok(response);
    }
    let body = if response.body.trim().is_empty() {
        format!("HTTP {}", response.status)
    } else {
        response.body
    };
    Err(RemoteError::status(response.status, body))
}

fn parse_response(response: ApiResponse) -> Result<Value, RemoteError> {
    let response = check_status(response)?;
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body).map_err(|e| RemoteError::decode(e.to_string()))
}

/// What a fetch should do with an HTTP 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthorizedBehavior {
    /// Resolve to `null`: "definitively unauthenticated" is a valid state.
    ReturnNull,
    /// Surface the 401 as an error like any other status.
    Error,
}

/// Default query fetcher: GET the path the key addresses.
pub struct PathFetcher {
    client: RemoteClient,
    on_unauthorized: UnauthorizedBehavior,
}

impl PathFetcher {
    pub fn new(client: RemoteClient, on_unauthorized: UnauthorizedBehavior) -> Self {
        Self {
            client,
            on_unauthorized,
        }
    }
}

#[async_trait]
impl QueryFetcher for PathFetcher {
    async fn fetch(&self, key: &QueryKey) -> Result<Value, RemoteError> {
        match self.client.get_json(&key.path()).await {
            Err(err)
                if err.is_unauthorized()
                    && self.on_unauthorized == UnauthorizedBehavior::ReturnNull =>
            {
                tracing::debug!(key = %key, "Unauthorized; resolving to null");
                Ok(Value::Null)
            }
            other => other,
        }
    }
}
