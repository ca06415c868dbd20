//! Durable key-value storage for the credential pair.
//!
//! The client only ever touches two keys, [`ACCESS_KEY`] and [`REFRESH_KEY`].
//! Tokens are never validated locally; whatever is stored is sent until the
//! server answers 401.

mod file;

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;

pub use file::FileStore;

/// Storage key for the access token.
pub const ACCESS_KEY: &str = "access";

/// Storage key for the refresh token.
pub const REFRESH_KEY: &str = "refresh";

#[cfg_attr(test, mockall::automock)]
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Removing a key that is not present is not an error.
    fn remove(&self, key: &str) -> Result<()>;
    /// Forget every stored entry.
    fn clear(&self) -> Result<()>;
}

/// Process-local store, used by tests and by callers that do not want
/// tokens to outlive the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a credential pair.
    pub fn with_tokens(access: &str, refresh: &str) -> Self {
        let store = Self::new();
        if let Ok(mut entries) = store.entries.lock() {
            entries.insert(ACCESS_KEY.to_string(), access.to_string());
            entries.insert(REFRESH_KEY.to_string(), refresh.to_string());
        }
        store
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("Credential store lock poisoned"))
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries()?.clear();
        Ok(())
    }
}

/// Shorten a token for log output: first and last four characters only.
pub fn redact(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        return "*********".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}*********{}", head, tail)
}
