use anyhow::Result;

use crate::runtime::Runtime;

use super::config::ConfigOptions;
use super::{connect, failure};

/// Forget the stored tokens.
#[tracing::instrument(skip(runtime, options))]
pub fn logout<R: Runtime + 'static>(runtime: R, options: ConfigOptions) -> Result<()> {
    let (_, services) = connect(runtime, options)?;
    services
        .auth
        .logout()
        .map_err(|e| failure(e, "Logout failed"))?;
    println!("Logged out.");
    Ok(())
}
