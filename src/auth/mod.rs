//! Login, registration and session lifecycle on top of [`ApiClient`].

mod types;

use log::{debug, info};

use crate::http::{ApiClient, ApiError, RequestDescriptor};
use crate::store::{ACCESS_KEY, REFRESH_KEY};

pub use types::{FormError, RegisteredUser, Registration, SessionStatus, TokenPair};
use types::LoginRequest;

/// Endpoint issuing an access/refresh token pair for username and password.
pub const LOGIN_PATH: &str = "/api/token/";

/// Endpoint creating a new account.
pub const REGISTER_PATH: &str = "/api/v1/register/";

#[derive(Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Exchanges credentials for a token pair, stores both tokens and makes
    /// the access token the default bearer token.
    ///
    /// A 401 here means wrong credentials, so it is surfaced without a refresh.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, ApiError> {
        let desc = RequestDescriptor::post(LOGIN_PATH)
            .json(&LoginRequest { username, password })?
            .without_refresh();

        let tokens: TokenPair = self.client.request_json(&desc).await?;

        let store = self.client.store();
        store.set(ACCESS_KEY, &tokens.access).map_err(storage_error)?;
        store.set(REFRESH_KEY, &tokens.refresh).map_err(storage_error)?;
        self.client.set_auth_token(Some(&tokens.access));

        info!("Logged in as {}", username);
        Ok(tokens)
    }

    /// Creates an account. Field problems come back as
    /// [`ApiError::Validation`].
    #[tracing::instrument(skip(self))]
    pub async fn register(&self, registration: &Registration) -> Result<RegisteredUser, ApiError> {
        let desc = RequestDescriptor::post(REGISTER_PATH).json(registration)?;
        let user: RegisteredUser = self.client.request_json(&desc).await?;
        info!("Registered {}", registration.email);
        Ok(user)
    }

    /// Registers, then logs in with the email as username.
    pub async fn register_and_login(
        &self,
        registration: &Registration,
    ) -> Result<(RegisteredUser, TokenPair), ApiError> {
        let user = self.register(registration).await?;
        let tokens = self
            .login(&registration.email, &registration.password)
            .await?;
        Ok((user, tokens))
    }

    /// Installs a stored access token as the default bearer token.
    /// Returns whether one was found.
    pub fn restore(&self) -> Result<bool, ApiError> {
        let access = self
            .client
            .store()
            .get(ACCESS_KEY)
            .map_err(storage_error)?
            .filter(|token| !token.is_empty());

        match access {
            Some(token) => {
                self.client.set_auth_token(Some(&token));
                debug!("Restored stored session");
                Ok(true)
            }
            None => {
                debug!("No stored session");
                Ok(false)
            }
        }
    }

    /// Forgets both tokens and clears the default header.
    #[tracing::instrument(skip(self))]
    pub fn logout(&self) -> Result<(), ApiError> {
        self.client.store().clear().map_err(storage_error)?;
        self.client.set_auth_token(None);
        info!("Logged out");
        Ok(())
    }

    pub fn status(&self) -> Result<SessionStatus, ApiError> {
        let store = self.client.store();
        let present = |key: &str| -> Result<bool, ApiError> {
            Ok(store
                .get(key)
                .map_err(storage_error)?
                .is_some_and(|token| !token.is_empty()))
        };

        Ok(SessionStatus {
            has_access_token: present(ACCESS_KEY)?,
            has_refresh_token: present(REFRESH_KEY)?,
        })
    }
}

fn storage_error(e: anyhow::Error) -> ApiError {
    ApiError::Storage(format!("{:#}", e))
}
