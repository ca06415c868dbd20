use anyhow::Result;
use std::sync::Arc;

use crate::runtime::Runtime;

use super::config::{Config, ConfigOptions};
use super::services::Services;
use super::failure;

/// Log in and store the issued tokens.
#[tracing::instrument(skip(runtime, options, password))]
pub async fn login<R: Runtime + 'static>(
    runtime: R,
    options: ConfigOptions,
    username: &str,
    password: Option<String>,
) -> Result<()> {
    let runtime = Arc::new(runtime);
    let config = Config::new(runtime.as_ref(), options)?;
    let password = match password {
        Some(password) => password,
        None => runtime.prompt("Password")?,
    };

    let services = Services::from_config(runtime, &config)?;
    services
        .auth
        .login(username, &password)
        .await
        .map_err(|e| failure(e, "Login failed"))?;

    println!("Logged in as {}.", username);
    Ok(())
}
