// Per-request scratch area.
//
// Each conversion gets its own directory; nothing is shared between
// requests. The directory is removed when the context is closed or dropped.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tempfile::{Builder, TempDir};

use crate::error::IoError;

pub struct WorkContext {
    dir: TempDir,
}

impl WorkContext {
    /// Create a scratch directory named `ofdconv_<timestamp>_<random>`,
    /// under `parent` when given, else under the system temp dir.
    pub fn create(parent: Option<&Path>) -> Result<Self, IoError> {
        let prefix = format!("ofdconv_{}_", Local::now().format("%Y%m%d_%H%M%S"));
        let mut builder = Builder::new();
        builder.prefix(&prefix);

        let dir = match parent {
            Some(p) => {
                fs::create_dir_all(p)?;
                builder.tempdir_in(p)?
            }
            None => builder.tempdir()?,
        };
        log::debug!("scratch area: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `bytes` to `name` inside the scratch area.
    pub fn stage(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, IoError> {
        let file_name = Path::new(name)
            .file_name()
            .ok_or_else(|| IoError::Scratch(std::io::Error::other(format!("invalid file name '{name}'"))))?;
        let path = self.dir.path().join(file_name);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Copy a staged file to its final destination.
    ///
    /// A partially written destination is removed before the error is returned.
    pub fn deliver(&self, staged: &Path, dest: &Path) -> Result<u64, IoError> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        match fs::copy(staged, dest) {
            Ok(n) => Ok(n),
            Err(e) => {
                if dest.exists() {
                    if let Err(rm) = fs::remove_file(dest) {
                        log::warn!("could not remove partial output {}: {}", dest.display(), rm);
                    }
                }
                Err(IoError::Scratch(e))
            }
        }
    }

    /// Remove the scratch area. Failures are logged, never returned.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            log::warn!("could not remove scratch area {}: {}", path.display(), e);
        }
    }
}
