//! Typed failures of the authenticated client.

use reqwest::StatusCode;
use serde_json::Value;
use std::collections::BTreeMap;

/// Why a 401 was surfaced instead of being recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthExpiredReason {
    /// No refresh token in storage.
    NoRefreshToken,
    /// The request was already replayed once with a refreshed token.
    AlreadyRetried,
    /// The call opted out of refresh (credential endpoints).
    RefreshDisabled,
}

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    AuthExpired,
    RefreshFailed,
    Validation,
    Http,
    Cancelled,
    Local,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("request cancelled")]
    Cancelled,

    #[error("authentication expired (HTTP 401): {body}")]
    AuthExpired {
        body: String,
        reason: AuthExpiredReason,
    },

    /// The original 401 is what propagates; the refresh failure is the source.
    #[error("authentication expired (HTTP 401) and token refresh failed: {body}")]
    RefreshFailed {
        body: String,
        #[source]
        cause: RefreshError,
    },

    #[error("validation failed (HTTP {status}): {errors}")]
    Validation {
        status: u16,
        errors: ValidationErrors,
    },

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("failed to serialize request body: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid header {name}: {message}")]
    InvalidHeader { name: String, message: String },

    #[error("credential store error: {0}")]
    Storage(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Network(_) => ErrorKind::Network,
            ApiError::Cancelled => ErrorKind::Cancelled,
            ApiError::AuthExpired { .. } => ErrorKind::AuthExpired,
            ApiError::RefreshFailed { .. } => ErrorKind::RefreshFailed,
            ApiError::Validation { .. } => ErrorKind::Validation,
            ApiError::Http { .. } => ErrorKind::Http,
            ApiError::Decode(_)
            | ApiError::Serialization(_)
            | ApiError::InvalidHeader { .. }
            | ApiError::Storage(_) => ErrorKind::Local,
        }
    }

    /// HTTP status of the response that caused this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::AuthExpired { .. } | ApiError::RefreshFailed { .. } => {
                Some(StatusCode::UNAUTHORIZED.as_u16())
            }
            ApiError::Validation { status, .. } | ApiError::Http { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The message to show a person: the first field error in form order,
    /// then the server's `detail`, then `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        let errors = match self {
            ApiError::Validation { errors, .. } => Some(errors.clone()),
            ApiError::AuthExpired { body, .. }
            | ApiError::RefreshFailed { body, .. }
            | ApiError::Http { body, .. } => ValidationErrors::parse(body),
            _ => None,
        };

        errors
            .and_then(|e| e.first_message(FORM_FIELDS))
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Map a non-success, non-401 response to an error.
    pub(crate) fn from_status(status: StatusCode, body: String) -> Self {
        if status.is_client_error()
            && let Some(errors) = ValidationErrors::parse(&body)
        {
            return ApiError::Validation {
                status: status.as_u16(),
                errors,
            };
        }

        ApiError::Http {
            status: status.as_u16(),
            body,
        }
    }
}

/// Field order the sign-up form reports errors in.
const FORM_FIELDS: &[&str] = &["email", "password", "full_name"];

/// Field-level messages from a 4xx JSON body, e.g.
/// `{"email": ["Enter a valid email address."], "detail": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub fields: BTreeMap<String, Vec<String>>,
    pub detail: Option<String>,
}

impl ValidationErrors {
    /// Returns `None` unless the body is a JSON object.
    pub fn parse(body: &str) -> Option<Self> {
        let Value::Object(map) = serde_json::from_str::<Value>(body).ok()? else {
            return None;
        };

        let mut errors = ValidationErrors::default();
        for (key, value) in map {
            if key == "detail" {
                errors.detail = message_of(&value);
                continue;
            }
            let messages: Vec<String> = match &value {
                Value::Array(items) => items.iter().filter_map(message_of).collect(),
                other => message_of(other).into_iter().collect(),
            };
            if !messages.is_empty() {
                errors.fields.insert(key, messages);
            }
        }
        Some(errors)
    }

    /// First message of the first listed field that has one, then `detail`,
    /// then the first message of any other field.
    pub fn first_message(&self, priority: &[&str]) -> Option<String> {
        priority
            .iter()
            .find_map(|field| self.fields.get(*field).and_then(|m| m.first()))
            .cloned()
            .or_else(|| self.detail.clone())
            .or_else(|| self.fields.values().find_map(|m| m.first()).cloned())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.detail.is_none()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        if let Some(detail) = &self.detail {
            parts.push(detail.clone());
        }
        if parts.is_empty() {
            write!(f, "(no details)")
        } else {
            write!(f, "{}", parts.join("; "))
        }
    }
}

fn message_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Why a refresh attempt did not produce a new access token.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("refresh endpoint unreachable: {0}")]
    Network(#[source] reqwest::Error),

    #[error("refresh rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("refresh response was not understood: {0}")]
    Decode(#[source] reqwest::Error),

    /// The refresh token was removed while this call waited for its turn.
    #[error("refresh token is no longer stored")]
    Missing,
}
