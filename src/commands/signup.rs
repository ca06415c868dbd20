use anyhow::Result;
use log::debug;

use crate::{auth::Registration, runtime::Runtime};

use super::config::ConfigOptions;
use super::{connect, failure};

#[derive(Debug, Clone, Default)]
pub struct SignupOptions {
    pub email: String,
    pub full_name: String,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
    /// Only create the account.
    pub no_login: bool,
}

/// Create an account and, unless told otherwise, log straight in.
#[tracing::instrument(skip(runtime, options, signup))]
pub async fn signup<R: Runtime + 'static>(
    runtime: R,
    options: ConfigOptions,
    signup: SignupOptions,
) -> Result<()> {
    let registration = registration(&runtime, signup.clone())?;
    let (_, services) = connect(runtime, options)?;

    if signup.no_login {
        services
            .auth
            .register(&registration)
            .await
            .map_err(|e| failure(e, "Signup failed"))?;
        println!("Account created for {}.", registration.email);
        return Ok(());
    }

    let (user, _) = services
        .auth
        .register_and_login(&registration)
        .await
        .map_err(|e| failure(e, "Signup failed"))?;
    debug!("Registered user {:?}", user.id);

    println!("Account created for {}.", registration.email);
    println!("Logged in as {}.", registration.email);
    Ok(())
}

/// Collects missing passwords from the prompt and checks the confirmation.
fn registration<R: Runtime>(runtime: &R, signup: SignupOptions) -> Result<Registration> {
    let (password, confirm) = match (signup.password, signup.confirm_password) {
        (Some(password), Some(confirm)) => (password, confirm),
        (Some(password), None) => (password.clone(), password),
        (None, _) => (
            runtime.prompt("Password")?,
            runtime.prompt("Confirm password")?,
        ),
    };

    Ok(Registration::confirmed(
        &signup.email,
        &password,
        &confirm,
        &signup.full_name,
    )?)
}
