//! File system operations (read, write, rename, permissions).

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

use super::RealRuntime;

impl RealRuntime {
    /// Create or truncate `path` with `mode` already applied, then write.
    /// The mode is ignored on non-Unix systems.
    #[tracing::instrument(skip(self, contents))]
    pub(crate) fn write_with_mode_impl(
        &self,
        path: &Path,
        contents: &[u8],
        mode: u32,
    ) -> Result<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        let mut file = options.open(path).context("Failed to open file for writing")?;

        // An existing file keeps its old mode through open().
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(mode))
                .context("Failed to set permissions")?;
        }
        #[cfg(not(unix))]
        {
            let _ = mode;
        }

        file.write_all(contents).context("Failed to write to file")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_to_string_impl(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).context("Failed to read file to string")
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn rename_impl(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).context("Failed to rename file")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn create_dir_all_impl(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).context("Failed to create directory")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_file_impl(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).context("Failed to remove file")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn exists_impl(&self, path: &Path) -> bool {
        path.exists()
    }
}
