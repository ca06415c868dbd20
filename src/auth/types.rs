use serde::{Deserialize, Serialize};

/// Credentials posted to the login endpoint.
#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Token pair returned by the login endpoint.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &crate::store::redact(&self.access))
            .field("refresh", &crate::store::redact(&self.refresh))
            .finish()
    }
}

/// Sign-up payload.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl Registration {
    pub fn new(email: &str, password: &str, full_name: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
            full_name: full_name.to_string(),
        }
    }

    /// Builds a registration from a form with a password confirmation field.
    pub fn confirmed(
        email: &str,
        password: &str,
        confirm_password: &str,
        full_name: &str,
    ) -> Result<Self, FormError> {
        if password != confirm_password {
            return Err(FormError::PasswordMismatch);
        }
        Ok(Self::new(email, password, full_name))
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("full_name", &self.full_name)
            .finish()
    }
}

/// Problems caught before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("Passwords don't match!")]
    PasswordMismatch,
}

/// Account created by the registration endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegisteredUser {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Which credentials are currently stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub has_access_token: bool,
    pub has_refresh_token: bool,
}

impl SessionStatus {
    pub fn is_logged_in(&self) -> bool {
        self.has_access_token || self.has_refresh_token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmed_rejects_mismatched_passwords() {
        let err = Registration::confirmed("a@b.com", "secret1", "secret2", "A B").unwrap_err();
        assert_eq!(err, FormError::PasswordMismatch);
        assert_eq!(err.to_string(), "Passwords don't match!");
    }

    #[test]
    fn test_confirmed_accepts_matching_passwords() {
        let registration = Registration::confirmed("a@b.com", "secret", "secret", "A B").unwrap();
        assert_eq!(registration, Registration::new("a@b.com", "secret", "A B"));
    }

    #[test]
    fn test_registration_serializes_wire_names() {
        let value = serde_json::to_value(Registration::new("a@b.com", "pw", "Full Name")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"email": "a@b.com", "password": "pw", "full_name": "Full Name"})
        );
    }

    #[test]
    fn test_debug_output_hides_secrets() {
        let registration = Registration::new("a@b.com", "hunter22", "A B");
        assert!(!format!("{:?}", registration).contains("hunter22"));

        let tokens = TokenPair {
            access: "access-token-value-1234".into(),
            refresh: "refresh-token-value-5678".into(),
        };
        let debug = format!("{:?}", tokens);
        assert!(!debug.contains("token-value"));
    }

    #[test]
    fn test_registered_user_tolerates_missing_fields() {
        let user: RegisteredUser = serde_json::from_str(r#"{"email": "a@b.com"}"#).unwrap();
        assert_eq!(user.email.as_deref(), Some("a@b.com"));
        assert_eq!(user.id, None);
    }

    #[test]
    fn test_session_status() {
        let status = SessionStatus {
            has_access_token: false,
            has_refresh_token: true,
        };
        assert!(status.is_logged_in());
        assert!(
            !SessionStatus {
                has_access_token: false,
                has_refresh_token: false
            }
            .is_logged_in()
        );
    }
}
