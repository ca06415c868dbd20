use serde::{Deserialize, Serialize};

/// A member profile as served by the users endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub job: Option<String>,
    pub mental_health: Option<u16>,
    pub wellness: Option<u16>,
    pub engage: Option<u16>,
    pub location: Option<String>,
    pub gender: Option<String>,
    pub age: Option<u16>,
    pub description: Option<String>,
    pub hobby: Option<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Partial profile update; `None` fields are left untouched on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mental_health: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wellness: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engage: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hobby: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A directed link from one member to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: u64,
    pub connected_user: u64,
    pub created_at: String,
}

#[derive(Serialize)]
pub(crate) struct ConnectRequest {
    pub connected_user: u64,
}
