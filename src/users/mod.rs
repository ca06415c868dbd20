//! Member profiles and connections.

mod types;

use async_trait::async_trait;
use log::debug;

use crate::http::{ApiClient, ApiError, RequestDescriptor};

pub use types::{Connection, ProfileUpdate, User};
use types::ConnectRequest;

/// Collection path of the users endpoint.
pub const USERS_PATH: &str = "/api/v1/users/";

/// Operations on the member directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, ApiError>;

    async fn get_user(&self, id: u64) -> Result<User, ApiError>;

    /// Sends only the fields set in `update`.
    async fn update_profile(&self, id: u64, update: &ProfileUpdate) -> Result<User, ApiError>;

    async fn list_connections(&self, id: u64) -> Result<Vec<Connection>, ApiError>;

    /// Links `id` to `other`. Linking a member to itself is rejected by the
    /// server.
    async fn connect(&self, id: u64, other: u64) -> Result<Connection, ApiError>;

    /// Removes the link from `id` to `other`; 404 if there was none.
    async fn disconnect(&self, id: u64, other: u64) -> Result<(), ApiError>;
}

/// [`UserDirectory`] backed by the REST API.
pub struct UsersApi {
    client: ApiClient,
}

impl UsersApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn user_path(id: u64) -> String {
        format!("{}{}/", USERS_PATH, id)
    }

    fn connections_path(id: u64) -> String {
        format!("{}{}/connections/", USERS_PATH, id)
    }
}

#[async_trait]
impl UserDirectory for UsersApi {
    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        debug!("Listing users");
        self.client
            .request_json(&RequestDescriptor::get(USERS_PATH))
            .await
    }

    async fn get_user(&self, id: u64) -> Result<User, ApiError> {
        self.client
            .request_json(&RequestDescriptor::get(Self::user_path(id)))
            .await
    }

    #[tracing::instrument(skip(self, update))]
    async fn update_profile(&self, id: u64, update: &ProfileUpdate) -> Result<User, ApiError> {
        let desc = RequestDescriptor::patch(Self::user_path(id)).json(update)?;
        self.client.request_json(&desc).await
    }

    async fn list_connections(&self, id: u64) -> Result<Vec<Connection>, ApiError> {
        self.client
            .request_json(&RequestDescriptor::get(Self::connections_path(id)))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn connect(&self, id: u64, other: u64) -> Result<Connection, ApiError> {
        let desc = RequestDescriptor::post(Self::connections_path(id)).json(&ConnectRequest {
            connected_user: other,
        })?;
        self.client.request_json(&desc).await
    }

    #[tracing::instrument(skip(self))]
    async fn disconnect(&self, id: u64, other: u64) -> Result<(), ApiError> {
        let path = format!("{}{}/", Self::connections_path(id), other);
        self.client.request(&RequestDescriptor::delete(path)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ErrorKind;
    use crate::store::MemoryStore;
    use mockito::Matcher;
    use reqwest::Client;
    use serde_json::json;
    use std::sync::Arc;

    fn api(url: &str) -> UsersApi {
        let client = ApiClient::new(
            Client::new(),
            url,
            Arc::new(MemoryStore::with_tokens("acc", "ref")),
        );
        client.set_auth_token(Some("acc"));
        UsersApi::new(client)
    }

    #[tokio::test]
    async fn test_list_users_sends_bearer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", USERS_PATH)
            .match_header("authorization", "Bearer acc")
            .with_status(200)
            .with_body(r#"[{"id": 1, "username": "a"}, {"id": 2, "username": "b"}]"#)
            .create_async()
            .await;

        let users = api(&server.url()).list_users().await.unwrap();

        mock.assert_async().await;
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].username, "b");
    }

    #[tokio::test]
    async fn test_get_user() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/users/9/")
            .with_status(200)
            .with_body(r#"{"id": 9, "username": "nine", "hobby": "fishing"}"#)
            .create_async()
            .await;

        let user = api(&server.url()).get_user(9).await.unwrap();
        assert_eq!(user.hobby.as_deref(), Some("fishing"));
    }

    #[tokio::test]
    async fn test_update_profile_patches_only_given_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/api/v1/users/3/")
            .match_body(Matcher::Json(json!({"location": "Austin", "wellness": 4})))
            .with_status(200)
            .with_body(r#"{"id": 3, "username": "c", "location": "Austin", "wellness": 4}"#)
            .expect(1)
            .create_async()
            .await;

        let update = ProfileUpdate {
            location: Some("Austin".into()),
            wellness: Some(4),
            ..Default::default()
        };
        let user = api(&server.url()).update_profile(3, &update).await.unwrap();

        mock.assert_async().await;
        assert_eq!(user.wellness, Some(4));
    }

    #[tokio::test]
    async fn test_connect_and_list_connections() {
        let mut server = mockito::Server::new_async().await;
        let post = server
            .mock("POST", "/api/v1/users/1/connections/")
            .match_body(Matcher::Json(json!({"connected_user": 2})))
            .with_status(201)
            .with_body(r#"{"id": 10, "connected_user": 2, "created_at": "2024-05-01T12:00:00Z"}"#)
            .create_async()
            .await;
        let get = server
            .mock("GET", "/api/v1/users/1/connections/")
            .with_status(200)
            .with_body(r#"[{"id": 10, "connected_user": 2, "created_at": "2024-05-01T12:00:00Z"}]"#)
            .create_async()
            .await;

        let api = api(&server.url());
        let created = api.connect(1, 2).await.unwrap();
        let listed = api.list_connections(1).await.unwrap();

        post.assert_async().await;
        get.assert_async().await;
        assert_eq!(listed, vec![created]);
    }

    #[tokio::test]
    async fn test_connect_to_self_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/users/1/connections/")
            .with_status(400)
            .with_body(r#"{"detail": "Cannot connect user to self"}"#)
            .create_async()
            .await;

        let err = api(&server.url()).connect(1, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.user_message("Connect failed"), "Cannot connect user to self");
    }

    #[tokio::test]
    async fn test_disconnect() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/v1/users/1/connections/2/")
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        api(&server.url()).disconnect(1, 2).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_disconnect_missing_connection() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/api/v1/users/1/connections/5/")
            .with_status(404)
            .create_async()
            .await;

        let err = api(&server.url()).disconnect(1, 5).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Http);
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_directory_call_recovers_from_expired_token() {
        let mut server = mockito::Server::new_async().await;
        let _stale = server
            .mock("GET", USERS_PATH)
            .match_header("authorization", "Bearer acc")
            .with_status(401)
            .create_async()
            .await;
        let _refresh = server
            .mock("POST", "/api/token/refresh/")
            .with_status(200)
            .with_body(r#"{"access": "new"}"#)
            .create_async()
            .await;
        let fresh = server
            .mock("GET", USERS_PATH)
            .match_header("authorization", "Bearer new")
            .with_status(200)
            .with_body("[]")
            .expect(1)
            .create_async()
            .await;

        let users = api(&server.url()).list_users().await.unwrap();

        assert!(users.is_empty());
        fresh.assert_async().await;
    }
}
