use anyhow::{Context, Result};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::runtime::Runtime;

use super::CredentialStore;

/// Credentials persisted as a flat JSON object, e.g.
/// `{"access": "...", "refresh": "..."}`.
///
/// Writes go to a sibling temporary file, created owner-only, which is then
/// renamed over the target, so a crash never leaves a half-written
/// credentials file. A file that no longer parses is an error for reads but
/// is overwritten by writes.
pub struct FileStore<R: Runtime> {
    runtime: Arc<R>,
    path: PathBuf,
    lock: Mutex<()>,
}

impl<R: Runtime> FileStore<R> {
    pub fn new(runtime: Arc<R>, path: PathBuf) -> Self {
        Self {
            runtime,
            path,
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.runtime.exists(&self.path) {
            return Ok(BTreeMap::new());
        }

        let content = self
            .runtime
            .read_to_string(&self.path)
            .with_context(|| format!("Failed to read credentials from {:?}", self.path))?;

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("Invalid credentials file {:?}", self.path))
    }

    /// Like [`Self::load`], but an unparsable file starts over as empty.
    /// The flag is set when that happened.
    fn load_for_update(&self) -> Result<(BTreeMap<String, String>, bool)> {
        match self.load() {
            Ok(entries) => Ok((entries, false)),
            Err(e) if e.downcast_ref::<serde_json::Error>().is_some() => {
                warn!("Discarding unreadable credentials: {:#}", e);
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !self.runtime.exists(parent)
        {
            self.runtime.create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(entries)?;

        self.runtime
            .write_with_mode(&tmp_path, content.as_bytes(), 0o600)
            .with_context(|| format!("Failed to write credentials to {:?}", tmp_path))?;
        self.runtime
            .rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to save credentials to {:?}", self.path))?;

        debug!("Saved {} credential(s) to {:?}", entries.len(), self.path);
        Ok(())
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Credential file lock poisoned"))
    }
}

impl<R: Runtime> CredentialStore for FileStore<R> {
    #[tracing::instrument(skip(self))]
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.guard()?;
        Ok(self.load()?.remove(key))
    }

    #[tracing::instrument(skip(self, value))]
    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.guard()?;
        let (mut entries, _) = self.load_for_update()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    #[tracing::instrument(skip(self))]
    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.guard()?;
        let (mut entries, discarded) = self.load_for_update()?;
        if entries.remove(key).is_none() && !discarded {
            return Ok(());
        }
        self.save(&entries)
    }

    #[tracing::instrument(skip(self))]
    fn clear(&self) -> Result<()> {
        let _guard = self.guard()?;
        if !self.runtime.exists(&self.path) {
            return Ok(());
        }
        self.runtime
            .remove_file(&self.path)
            .with_context(|| format!("Failed to remove credentials file {:?}", self.path))?;
        debug!("Removed credentials file {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use crate::store::{ACCESS_KEY, REFRESH_KEY};
    use mockall::predicate::eq;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_round_trip_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vetauth").join("credentials.json");
        let store = FileStore::new(Arc::new(RealRuntime), path.clone());

        assert_eq!(store.get(ACCESS_KEY).unwrap(), None);

        store.set(ACCESS_KEY, "acc").unwrap();
        store.set(REFRESH_KEY, "ref").unwrap();

        // A second store over the same file sees the same values
        let reopened = FileStore::new(Arc::new(RealRuntime), path.clone());
        assert_eq!(reopened.get(ACCESS_KEY).unwrap().as_deref(), Some("acc"));
        assert_eq!(reopened.get(REFRESH_KEY).unwrap().as_deref(), Some("ref"));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["access"], "acc");
        assert_eq!(raw["refresh"], "ref");
        assert!(!path.with_extension("json.tmp").exists());

        reopened.remove(ACCESS_KEY).unwrap();
        assert_eq!(store.get(ACCESS_KEY).unwrap(), None);
        assert_eq!(store.get(REFRESH_KEY).unwrap().as_deref(), Some("ref"));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = FileStore::new(Arc::new(RealRuntime), path.clone());
        store.set(ACCESS_KEY, "acc").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_store_missing_file_reads_empty() {
        let mut runtime = MockRuntime::new();
        let path = PathBuf::from("/home/user/.config/vetauth/credentials.json");

        runtime
            .expect_exists()
            .with(eq(path.clone()))
            .returning(|_| false);
        runtime.expect_read_to_string().never();

        let store = FileStore::new(Arc::new(runtime), path);
        assert_eq!(store.get(REFRESH_KEY).unwrap(), None);
    }

    #[test]
    fn test_file_store_remove_absent_key_does_not_write() {
        let mut runtime = MockRuntime::new();
        let path = PathBuf::from("/home/user/.config/vetauth/credentials.json");

        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(|_| Ok(r#"{"refresh": "ref"}"#.to_string()));
        runtime.expect_write_with_mode().never();
        runtime.expect_rename().never();

        let store = FileStore::new(Arc::new(runtime), path);
        store.remove(ACCESS_KEY).unwrap();
    }

    #[test]
    fn test_file_store_set_writes_temp_then_renames() {
        let mut runtime = MockRuntime::new();
        let path = PathBuf::from("/home/user/.config/vetauth/credentials.json");
        let tmp = path.with_extension("json.tmp");

        runtime.expect_exists().returning(|_| false);
        runtime
            .expect_create_dir_all()
            .with(eq(PathBuf::from("/home/user/.config/vetauth")))
            .times(1)
            .returning(|_| Ok(()));
        runtime
            .expect_write_with_mode()
            .withf({
                let tmp = tmp.clone();
                move |p, contents, mode| {
                    let json: serde_json::Value = serde_json::from_slice(contents).unwrap();
                    p == tmp.as_path() && json["access"] == "acc" && *mode == 0o600
                }
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        runtime
            .expect_rename()
            .with(eq(tmp), eq(path.clone()))
            .times(1)
            .returning(|_, _| Ok(()));

        let store = FileStore::new(Arc::new(runtime), path);
        store.set(ACCESS_KEY, "acc").unwrap();
    }

    #[test]
    fn test_file_store_corrupt_file_is_an_error() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("not json".to_string()));

        let store = FileStore::new(
            Arc::new(runtime),
            PathBuf::from("/home/user/.config/vetauth/credentials.json"),
        );
        let err = store.get(ACCESS_KEY).unwrap_err();
        assert!(err.to_string().contains("Invalid credentials file"));
    }

    #[test]
    fn test_file_store_set_replaces_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"access": "a", "refr"#).unwrap();
        let store = FileStore::new(Arc::new(RealRuntime), path.clone());

        store.set(ACCESS_KEY, "acc").unwrap();

        assert_eq!(store.get(ACCESS_KEY).unwrap().as_deref(), Some("acc"));
        assert_eq!(store.get(REFRESH_KEY).unwrap(), None);
    }

    #[test]
    fn test_file_store_remove_rewrites_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FileStore::new(Arc::new(RealRuntime), path.clone());

        store.remove(ACCESS_KEY).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        assert_eq!(store.get(ACCESS_KEY).unwrap(), None);
    }

    #[test]
    fn test_file_store_unreadable_file_still_fails_set() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(|_| Err(anyhow::anyhow!("Permission denied")));
        runtime.expect_write_with_mode().never();

        let store = FileStore::new(
            Arc::new(runtime),
            PathBuf::from("/home/user/.config/vetauth/credentials.json"),
        );
        assert!(store.set(ACCESS_KEY, "acc").is_err());
    }

    #[test]
    fn test_file_store_clear_deletes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FileStore::new(Arc::new(RealRuntime), path.clone());

        store.clear().unwrap();
        assert!(!path.exists());

        // clearing an absent file is fine
        store.clear().unwrap();
        assert_eq!(store.get(ACCESS_KEY).unwrap(), None);
    }
}
