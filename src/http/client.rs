//! HTTP client with bearer-token injection and single-shot token refresh.

use log::{debug, warn};
use reqwest::{
    Client, Response, StatusCode,
    header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue},
};
use serde::de::DeserializeOwned;
use std::sync::{Arc, PoisonError, RwLock};
use tokio_util::sync::CancellationToken;

use crate::store::{CredentialStore, REFRESH_KEY, redact};

use super::error::{ApiError, AuthExpiredReason};
use super::refresh::CredentialPolicy;
use super::request::{Attempt, RequestDescriptor};

/// Default headers applied to every request, plus a counter bumped whenever
/// the access token changes.
#[derive(Debug, Default)]
pub(super) struct DefaultHeaders {
    pub(super) map: HeaderMap,
    pub(super) generation: u64,
}

/// Authenticated client for the service API.
///
/// Clones share default header state, credential store and the refresh lock,
/// so a token refreshed through one clone is used by all of them.
#[derive(Clone)]
pub struct ApiClient {
    pub(super) client: Client,
    pub(super) base_url: String,
    pub(super) defaults: Arc<RwLock<DefaultHeaders>>,
    pub(super) store: Arc<dyn CredentialStore>,
    pub(super) refresh_lock: Arc<tokio::sync::Mutex<()>>,
    pub(super) policy: CredentialPolicy,
}

impl ApiClient {
    /// Creates a client for `base_url` wrapping the given reqwest Client.
    pub fn new(client: Client, base_url: &str, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            defaults: Arc::new(RwLock::new(DefaultHeaders::default())),
            store,
            refresh_lock: Arc::new(tokio::sync::Mutex::new(())),
            policy: CredentialPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CredentialPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn policy(&self) -> CredentialPolicy {
        self.policy
    }

    /// Sets (`Some`) or clears (`None`) the default `Authorization: Bearer`
    /// header for all later requests through this client and its clones.
    #[tracing::instrument(skip(self, token))]
    pub fn set_auth_token(&self, token: Option<&str>) {
        let mut defaults = self.defaults.write().unwrap_or_else(PoisonError::into_inner);
        defaults.generation += 1;

        match token {
            Some(token) => match bearer(token) {
                Ok(value) => {
                    defaults.map.insert(AUTHORIZATION, value);
                    debug!("Authorization header set for token {}", redact(token));
                }
                Err(e) => {
                    warn!("Access token is not a valid header value ({}), clearing it", e);
                    defaults.map.remove(AUTHORIZATION);
                }
            },
            None => {
                defaults.map.remove(AUTHORIZATION);
                debug!("Authorization header cleared");
            }
        }
    }

    /// The access token currently in the default headers.
    pub fn auth_token(&self) -> Option<String> {
        let defaults = self.defaults.read().unwrap_or_else(PoisonError::into_inner);
        bearer_token(&defaults.map)
    }

    /// A snapshot of the default headers.
    pub fn default_headers(&self) -> HeaderMap {
        let defaults = self.defaults.read().unwrap_or_else(PoisonError::into_inner);
        defaults.map.clone()
    }

    pub(super) fn token_generation(&self) -> u64 {
        let defaults = self.defaults.read().unwrap_or_else(PoisonError::into_inner);
        defaults.generation
    }

    /// Issues `desc`. A 401 on the first send is recovered at most once by
    /// refreshing the access token and replaying the call with it.
    #[tracing::instrument(skip(self, desc), fields(method = %desc.method, path = %desc.path))]
    pub async fn request(&self, desc: &RequestDescriptor) -> Result<Response, ApiError> {
        let mut attempt = Attempt::Initial;

        loop {
            let (response, generation) = self.send(desc, &attempt).await?;

            if response.status() != StatusCode::UNAUTHORIZED {
                return finish(response).await;
            }

            let body = read_body(response).await;

            let refresh_token = match self.refresh_precondition(desc, &attempt) {
                Ok(token) => token,
                Err(reason) => {
                    debug!("{} {}: 401 surfaced ({:?})", desc.method, desc.path, reason);
                    return Err(ApiError::AuthExpired { body, reason });
                }
            };

            debug!("{} {}: 401, refreshing access token", desc.method, desc.path);

            let access_token = match self.refresh_access_token(&refresh_token, generation).await {
                Ok(token) => token,
                Err(cause) => {
                    warn!("Token refresh failed: {}", cause);
                    self.discard_credentials_after_failed_refresh();
                    return Err(ApiError::RefreshFailed { body, cause });
                }
            };

            debug!("{} {}: replaying with refreshed token", desc.method, desc.path);
            attempt = Attempt::Retry { access_token };
        }
    }

    /// [`request`](Self::request) followed by decoding the JSON body.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        desc: &RequestDescriptor,
    ) -> Result<T, ApiError> {
        let response = self.request(desc).await?;
        response.json::<T>().await.map_err(ApiError::Decode)
    }

    /// [`request`](Self::request), abandoned as soon as `cancel` fires.
    ///
    /// Dropping the in-flight call aborts the transport and any refresh in
    /// progress; nothing is sent once the token is cancelled.
    pub async fn request_with_cancel(
        &self,
        desc: &RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Response, ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("{} {}: cancelled", desc.method, desc.path);
                Err(ApiError::Cancelled)
            }
            result = self.request(desc) => result,
        }
    }

    /// Refresh token to use for this 401, or why there is none.
    fn refresh_precondition(
        &self,
        desc: &RequestDescriptor,
        attempt: &Attempt,
    ) -> Result<String, AuthExpiredReason> {
        if attempt.is_retry() {
            return Err(AuthExpiredReason::AlreadyRetried);
        }
        if !desc.refresh_on_unauthorized {
            return Err(AuthExpiredReason::RefreshDisabled);
        }

        match self.store.get(REFRESH_KEY) {
            Ok(Some(token)) if !token.is_empty() => Ok(token),
            Ok(_) => Err(AuthExpiredReason::NoRefreshToken),
            Err(e) => {
                warn!("Failed to read refresh token: {:#}", e);
                Err(AuthExpiredReason::NoRefreshToken)
            }
        }
    }

    /// Sends once. Returns the response and the token generation the
    /// headers were built from.
    async fn send(
        &self,
        desc: &RequestDescriptor,
        attempt: &Attempt,
    ) -> Result<(Response, u64), ApiError> {
        let (headers, generation) = self.build_headers(desc, attempt)?;

        let mut builder = self
            .client
            .request(desc.method.clone(), self.url(&desc.path))
            .headers(headers);
        if let Some(body) = &desc.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(ApiError::Network)?;
        debug!(
            "{} {} -> {} ({})",
            desc.method,
            desc.path,
            response.status(),
            if attempt.is_retry() { "retry" } else { "initial" }
        );
        Ok((response, generation))
    }

    /// Defaults, then per-call overrides, then the retry token; each layer
    /// replaces same-named headers of the previous one.
    fn build_headers(
        &self,
        desc: &RequestDescriptor,
        attempt: &Attempt,
    ) -> Result<(HeaderMap, u64), ApiError> {
        let (mut headers, generation) = {
            let defaults = self.defaults.read().unwrap_or_else(PoisonError::into_inner);
            (defaults.map.clone(), defaults.generation)
        };

        for (name, value) in &desc.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| ApiError::InvalidHeader {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| ApiError::InvalidHeader {
                name: name.clone(),
                message: e.to_string(),
            })?;
            headers.insert(header_name, header_value);
        }

        if let Attempt::Retry { access_token } = attempt {
            let value = bearer(access_token).map_err(|e| ApiError::InvalidHeader {
                name: AUTHORIZATION.to_string(),
                message: e.to_string(),
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok((headers, generation))
    }

    pub(super) fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

fn bearer(token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
    value.set_sensitive(true);
    Ok(value)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

async fn read_body(response: Response) -> String {
    response.text().await.unwrap_or_default()
}

/// Passes through non-error responses; maps 4xx/5xx to an error.
async fn finish(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let body = read_body(response).await;
        return Err(ApiError::from_status(status, body));
    }
    Ok(response)
}
