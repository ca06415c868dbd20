use anyhow::Result;

use crate::{runtime::Runtime, store::redact};

use super::config::ConfigOptions;
use super::{connect, failure};

/// Show the API in use and which tokens are stored.
#[tracing::instrument(skip(runtime, options))]
pub fn status<R: Runtime + 'static>(runtime: R, options: ConfigOptions) -> Result<()> {
    let (config, services) = connect(runtime, options)?;
    let session = services
        .auth
        .status()
        .map_err(|e| failure(e, "Could not read credentials"))?;

    println!("API:           {}", config.api_url);
    println!("Credentials:   {}", config.store_path.display());
    match services.client.auth_token() {
        Some(token) => println!("Access token:  {}", redact(&token)),
        None => println!("Access token:  (none)"),
    }
    println!(
        "Refresh token: {}",
        if session.has_refresh_token { "stored" } else { "(none)" }
    );
    println!(
        "Status:        {}",
        if session.is_logged_in() { "logged in" } else { "logged out" }
    );
    Ok(())
}
