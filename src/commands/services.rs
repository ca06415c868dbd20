//! Builds the client stack from a resolved [`Config`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::Client;

use crate::{
    auth::AuthService,
    http::ApiClient,
    runtime::Runtime,
    store::FileStore,
    users::UsersApi,
};

use super::config::Config;

/// Build the transport with the per-request timeout.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(concat!("vetauth/", env!("VETAUTH_VERSION")))
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

pub struct Services {
    pub client: ApiClient,
    pub auth: AuthService,
    pub users: UsersApi,
}

impl Services {
    /// Wires a file-backed client and loads any stored session into it.
    /// Unreadable stored credentials leave the client logged out, so that
    /// login and logout can still replace them.
    pub fn from_config<R: Runtime + 'static>(runtime: Arc<R>, config: &Config) -> Result<Self> {
        let store = Arc::new(FileStore::new(runtime, config.store_path.clone()));
        let client = ApiClient::new(build_http_client(config.timeout)?, &config.api_url, store)
            .with_policy(config.policy);

        let auth = AuthService::new(client.clone());
        match auth.restore() {
            Ok(restored) => debug!("Session restored: {}", restored),
            Err(e) => warn!("Ignoring stored credentials: {:#}", e),
        }

        Ok(Self {
            users: UsersApi::new(client.clone()),
            auth,
            client,
        })
    }
}
