use anyhow::Result;
use std::sync::Arc;

use crate::{http::ApiError, runtime::Runtime};

pub mod config;
mod login;
mod logout;
mod request;
mod services;
mod signup;
mod status;
mod users;

pub use login::login;
pub use logout::logout;
pub use request::{RequestOptions, request};
pub use signup::{SignupOptions, signup};
pub use status::status;
pub use users::{UsersAction, users};

use config::{Config, ConfigOptions};
use services::Services;

/// Resolves configuration and builds the client stack for one command.
fn connect<R: Runtime + 'static>(runtime: R, options: ConfigOptions) -> Result<(Config, Services)> {
    let runtime = Arc::new(runtime);
    let config = Config::new(runtime.as_ref(), options)?;
    let services = Services::from_config(runtime, &config)?;
    Ok((config, services))
}

/// Puts the message a person should see in front of the error chain.
fn failure(err: ApiError, fallback: &str) -> anyhow::Error {
    let message = err.user_message(fallback);
    anyhow::Error::new(err).context(message)
}
