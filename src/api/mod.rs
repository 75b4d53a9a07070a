//! # Request Gateway
//!
//! Single chokepoint for all calls against the remote bookmark API.
//! Every read, write, and replayed outbox entry goes through [`RequestGateway::call`].
//!
//! ## Responsibilities
//!
//! - **Path normalization**: strip the leading slash, ensure the trailing
//!   slash the API requires, prefix the `/api/` root
//! - **Auth injection**: `Authorization: Token <value>` from the context
//! - **Error decoding**: non-2xx responses become [`ApiError::Http`] carrying
//!   the status and the raw body so callers can special-case 404
//! - **Payload repair**: static-asset paths embedded in response strings are
//!   rewritten into the app's own proxied path space
//!
//! The gateway performs no retries; retry policy belongs to the caller.

use crate::context::AppContext;
use crate::error::ApiError;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Transport verb for an API call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Wire name of the verb
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    fn as_reqwest(&self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(ApiError::storage(format!("unknown HTTP method: {}", other))),
        }
    }
}

/// HTTP gateway to the remote API
#[derive(Debug, Clone)]
pub struct RequestGateway {
    ctx: Arc<AppContext>,
    http: reqwest::Client,
}

impl RequestGateway {
    /// Create a gateway bound to an application context
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self {
            ctx,
            http: reqwest::Client::new(),
        }
    }

    /// Canonical form of a logical endpoint path
    ///
    /// The remote API requires a trailing slash on every endpoint; a missing
    /// one would cost a redirect that drops the request body.
    pub fn normalize_path(path: &str) -> String {
        let trimmed = path.trim_start_matches('/');
        if trimmed.ends_with('/') || trimmed.is_empty() {
            trimmed.to_string()
        } else {
            format!("{}/", trimmed)
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/api/{}",
            self.ctx.config().api_root(),
            Self::normalize_path(path)
        )
    }

    /// Execute a call against the remote API
    ///
    /// Returns the decoded JSON body. An HTTP 204 yields an empty object
    /// rather than a decode attempt.
    pub async fn call(
        &self,
        path: &str,
        method: HttpMethod,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        self.call_with_query(path, method, &[], body).await
    }

    /// Execute a call with query parameters
    pub async fn call_with_query(
        &self,
        path: &str,
        method: HttpMethod,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = self.endpoint(path);
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method.as_reqwest(), &url)
            .header("Content-Type", "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = self.ctx.token().await {
            request = request.header("Authorization", format!("Token {}", token));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::transport(e.to_string()))?;

        self.decode(response).await
    }

    /// Probe whether the current credential is accepted by the server
    ///
    /// The only call with a client-enforced timeout; everything else relies
    /// on transport-level behavior.
    pub async fn check_auth(&self) -> Result<(), ApiError> {
        let url = self.endpoint("user/profile");
        let mut request = self
            .http
            .get(&url)
            .timeout(self.ctx.config().auth_check_timeout);
        if let Some(token) = self.ctx.token().await {
            request = request.header("Authorization", format!("Token {}", token));
        }
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::transport(e.to_string()))?;
        self.decode(response).await.map(|_| ())
    }

    async fn decode(&self, response: reqwest::Response) -> Result<Value, ApiError> {
        let status = response.status();

        if status.as_u16() == 204 {
            return Ok(json!({}));
        }

        if status.is_success() {
            let mut value: Value = response
                .json()
                .await
                .map_err(|e| ApiError::serialization(format!("response decode error: {}", e)))?;
            rewrite_asset_paths(
                &mut value,
                self.ctx.config().api_root(),
                &self.ctx.config().asset_proxy_path,
            );
            return Ok(value);
        }

        let text = response.text().await.unwrap_or_default();
        let body: Option<Value> = serde_json::from_str(&text).ok();
        let message = body
            .as_ref()
            .and_then(extract_error_message)
            .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));
        tracing::warn!("HTTP {}: {}", status.as_u16(), message);
        Err(ApiError::http(status.as_u16(), message, body))
    }
}

/// Pull a human-readable message out of a decoded error body
fn extract_error_message(body: &Value) -> Option<String> {
    if let Some(detail) = body.get("detail").and_then(Value::as_str) {
        return Some(detail.to_string());
    }
    if let Some(message) = body.get("message").and_then(Value::as_str) {
        return Some(message.to_string());
    }
    // Field-error shape: {"url": ["Enter a valid URL."]}
    if let Some(object) = body.as_object() {
        for (field, errors) in object {
            if let Some(first) = errors.as_array().and_then(|a| a.first()).and_then(Value::as_str) {
                return Some(format!("{}: {}", field, first));
            }
        }
    }
    None
}

/// Rewrite embedded static-asset paths into the proxied path space
///
/// The remote API serves favicons and preview images from its own
/// `/static/` tree; the client renders them through a same-origin proxy
/// instead, so every string value pointing at that tree is rewritten.
fn rewrite_asset_paths(value: &mut Value, api_root: &str, proxy_path: &str) {
    match value {
        Value::Object(map) => {
            for entry in map.values_mut() {
                rewrite_asset_paths(entry, api_root, proxy_path);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                rewrite_asset_paths(item, api_root, proxy_path);
            }
        }
        Value::String(s) => {
            let absolute_prefix = format!("{}/static/", api_root);
            if let Some(rest) = s.strip_prefix(&absolute_prefix) {
                *s = format!("{}/{}", proxy_path.trim_end_matches('/'), rest);
            } else if let Some(rest) = s.strip_prefix("/static/") {
                *s = format!("{}/{}", proxy_path.trim_end_matches('/'), rest);
            }
        }
        _ => {}
    }
}
