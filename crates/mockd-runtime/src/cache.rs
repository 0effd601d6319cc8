//! Disk-backed deployment cache.
//!
//! One JSON file per deployment, named `<id>.json`, under a directory the
//! caller chooses (typically XDG state). Writes are full-file overwrites
//! serialized by a mutex; loads skip unreadable or malformed files so a
//! half-written cache never prevents startup. Crash recovery is
//! best-effort by design.

use std::fs;
use std::path::{Path, PathBuf};

use mockd_core::Deployment;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::RuntimeResult;

#[cfg(unix)]
const DIR_MODE: u32 = 0o755;
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// Directory of cached deployments.
#[derive(Debug)]
pub struct DeploymentCache {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl DeploymentCache {
    /// Open (creating if needed) a cache directory.
    pub fn open(dir: impl Into<PathBuf>) -> RuntimeResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&dir, fs::Permissions::from_mode(DIR_MODE))?;
        }
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist one deployment, overwriting any previous file for its id.
    pub fn store(&self, deployment: &Deployment) -> RuntimeResult<()> {
        let _guard = self.write_lock.lock();
        let path = self.file_path(&deployment.id);
        let body = serde_json::to_vec_pretty(deployment)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(&path, body)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(FILE_MODE))?;
        }
        debug!(id = %deployment.id, path = %path.display(), "deployment cached");
        Ok(())
    }

    /// Remove the cache file for an id. Missing files are fine.
    pub fn remove(&self, id: &str) -> RuntimeResult<()> {
        let _guard = self.write_lock.lock();
        match fs::remove_file(self.file_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Load every readable, well-formed deployment file. Anything else is
    /// skipped silently.
    pub fn load_all(&self) -> RuntimeResult<Vec<Deployment>> {
        let mut deployments = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(bytes) = fs::read(&path) else {
                warn!(path = %path.display(), "skipping unreadable cache file");
                continue;
            };
            match serde_json::from_slice::<Deployment>(&bytes) {
                Ok(deployment) => deployments.push(deployment),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "skipping malformed cache file");
                }
            }
        }
        Ok(deployments)
    }

    /// Rewrite the cache to exactly this set of deployments.
    pub fn replace_all(&self, deployments: &[Deployment]) -> RuntimeResult<()> {
        {
            let _guard = self.write_lock.lock();
            for entry in fs::read_dir(&self.dir)? {
                let Ok(entry) = entry else { continue };
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("json") {
                    let _ = fs::remove_file(path);
                }
            }
        }
        for deployment in deployments {
            self.store(deployment)?;
        }
        Ok(())
    }

    fn file_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}
