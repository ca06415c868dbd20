use anyhow::{Context, Result};
use log::debug;
use std::path::PathBuf;
use std::time::Duration;

use crate::{http::CredentialPolicy, runtime::Runtime};

/// API base URL used when neither `--api-url` nor the environment sets one.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Environment variable consulted for the API base URL.
pub const API_URL_ENV: &str = "VETAUTH_API_URL";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Values given on the command line, before defaults are applied.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    pub api_url: Option<String>,
    pub store_path: Option<PathBuf>,
    pub purge_on_refresh_failure: bool,
    pub timeout_secs: Option<u64>,
}

/// Resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub store_path: PathBuf,
    pub policy: CredentialPolicy,
    pub timeout: Duration,
}

impl Config {
    /// Applies defaults to `options`.
    ///
    /// API URL: option, then `VETAUTH_API_URL`, then [`DEFAULT_API_URL`].
    /// Store: option, then `<config dir>/vetauth/credentials.json`, then
    /// `~/.vetauth/credentials.json`.
    #[tracing::instrument(skip(runtime))]
    pub fn new<R: Runtime + ?Sized>(runtime: &R, options: ConfigOptions) -> Result<Self> {
        let api_url = match options.api_url {
            Some(url) => url,
            None => runtime
                .env_var(API_URL_ENV)
                .ok()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        };

        let store_path = match options.store_path {
            Some(path) => path,
            None => default_store_path(runtime)?,
        };

        let policy = if options.purge_on_refresh_failure {
            CredentialPolicy::Purge
        } else {
            CredentialPolicy::Keep
        };

        let timeout_secs = options.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            anyhow::bail!("Timeout must be at least one second");
        }
        let timeout = Duration::from_secs(timeout_secs);

        debug!(
            "Using API {} with credentials at {:?} ({:?} on refresh failure)",
            api_url, store_path, policy
        );

        Ok(Self {
            api_url,
            store_path,
            policy,
            timeout,
        })
    }
}

fn default_store_path<R: Runtime + ?Sized>(runtime: &R) -> Result<PathBuf> {
    if let Some(dir) = runtime.config_dir() {
        return Ok(dir.join("vetauth").join("credentials.json"));
    }
    let home = runtime
        .home_dir()
        .context("Could not find home directory")?;
    Ok(home.join(".vetauth").join("credentials.json"))
}
