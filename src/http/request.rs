//! Outbound request description and the per-call attempt context.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use super::error::ApiError;

/// A pending call: method, path, per-call header overrides and an optional
/// JSON body.
///
/// The descriptor is never mutated by the client; retry state lives in
/// [`Attempt`], which the client threads through the call explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Path relative to the client's base URL, or an absolute `http(s)` URL.
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Whether a 401 may trigger a token refresh and replay.
    pub refresh_on_unauthorized: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
            refresh_on_unauthorized: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Serialize `body` as the JSON payload.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Add a per-call header. It replaces a default header of the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Surface a 401 as-is instead of refreshing; used by the credential
    /// endpoints, where a 401 means wrong credentials.
    pub fn without_refresh(mut self) -> Self {
        self.refresh_on_unauthorized = false;
        self
    }
}

/// Which send of a logical call this is.
///
/// Only `Initial` may lead to a refresh. The replay is always a `Retry`,
/// carrying the token that overwrites the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Attempt {
    Initial,
    Retry { access_token: String },
}

impl Attempt {
    pub(crate) fn is_retry(&self) -> bool {
        matches!(self, Attempt::Retry { .. })
    }
}
