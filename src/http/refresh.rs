//! Access-token refresh sub-protocol.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::store::{ACCESS_KEY, REFRESH_KEY};

use super::client::ApiClient;
use super::error::RefreshError;

/// Endpoint that mints a new access token from a refresh token.
pub const REFRESH_PATH: &str = "/api/token/refresh/";

/// What happens to stored credentials when a refresh fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CredentialPolicy {
    /// Keep stale tokens until the next explicit login.
    #[default]
    Keep,
    /// Remove both tokens and clear the default header.
    Purge,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
}

impl ApiClient {
    /// Exchanges `refresh_token` for a new access token, persists it and
    /// installs it as the default bearer token.
    ///
    /// Refreshes are serialized. `seen_generation` is the token generation
    /// the rejected request was built from; if the token changed since, a
    /// concurrent call already refreshed and its token is reused.
    ///
    /// The refresh call goes straight to the transport without default
    /// headers and never re-enters 401 handling.
    #[tracing::instrument(skip(self, refresh_token))]
    pub(super) async fn refresh_access_token(
        &self,
        refresh_token: &str,
        seen_generation: u64,
    ) -> Result<String, RefreshError> {
        let _guard = self.refresh_lock.lock().await;

        if self.token_generation() != seen_generation
            && let Some(current) = self.auth_token()
        {
            debug!("Access token was replaced while waiting, reusing it");
            return Ok(current);
        }

        // A purge may have run while this call waited.
        let refresh_token = match self.store.get(REFRESH_KEY) {
            Ok(Some(token)) if !token.is_empty() => token,
            Ok(_) => return Err(RefreshError::Missing),
            Err(e) => {
                warn!("Failed to re-read refresh token, using the one read earlier: {:#}", e);
                refresh_token.to_string()
            }
        };

        let response = self
            .client
            .post(self.url(REFRESH_PATH))
            .json(&RefreshRequest {
                refresh: &refresh_token,
            })
            .send()
            .await
            .map_err(RefreshError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let RefreshResponse { access } = response.json().await.map_err(RefreshError::Decode)?;

        if let Err(e) = self.store.set(ACCESS_KEY, &access) {
            warn!("Failed to persist refreshed access token: {:#}", e);
        }
        self.set_auth_token(Some(&access));
        info!("Access token refreshed");

        Ok(access)
    }

    /// Applies the configured [`CredentialPolicy`] after a failed refresh.
    pub(super) fn discard_credentials_after_failed_refresh(&self) {
        match self.policy {
            CredentialPolicy::Keep => {
                debug!("Keeping stored credentials after failed refresh");
            }
            CredentialPolicy::Purge => {
                for key in [ACCESS_KEY, REFRESH_KEY] {
                    if let Err(e) = self.store.remove(key) {
                        warn!("Failed to remove stored {} token: {:#}", key, e);
                    }
                }
                self.set_auth_token(None);
                info!("Stored credentials purged after failed refresh");
            }
        }
    }
}
