//! Document location and reference-resolution context.
//!
//! A [`DocumentReference`] pins down where the document lives. The
//! [`BaseStrategy`] decides how the document service learns where relative
//! `$ref`s point: either the document's own URL is passed explicitly, or the
//! process working directory is moved next to the document while it loads.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// How relative references are anchored while loading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaseStrategy {
    /// Pass the document's absolute location to the loader
    #[default]
    Explicit,
    /// Change into the document's directory for the duration of the load
    #[serde(rename = "working-dir")]
    WorkingDirectory,
}

impl std::str::FromStr for BaseStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "explicit" => Ok(Self::Explicit),
            "working-dir" => Ok(Self::WorkingDirectory),
            other => Err(format!(
                "unknown base strategy '{other}' (expected 'explicit' or 'working-dir')"
            )),
        }
    }
}

/// Base location handed to the document service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseLocation {
    /// Resolve relative to this URL
    Url(Url),
    /// Resolve relative to the process working directory at load time
    CurrentDir,
}

impl BaseLocation {
    /// The URL relative references are joined to
    pub fn to_url(&self) -> crate::Result<Url> {
        match self {
            Self::Url(url) => Ok(url.clone()),
            Self::CurrentDir => {
                let cwd = current_dir()?;
                Url::from_directory_path(&cwd).map_err(|()| Error::InvalidPath {
                    path: cwd,
                    reason: "not representable as a file URL".to_string(),
                })
            }
        }
    }
}

/// Absolute location of a document and the root directory it was checked against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReference {
    path: PathBuf,
    root: PathBuf,
}

impl DocumentReference {
    /// Resolve `document` and `root` to absolute paths and check both exist.
    ///
    /// `root` defaults to the current working directory. Relative document
    /// paths are taken relative to the current working directory.
    pub fn resolve<P: AsRef<Path>>(document: P, root: Option<&Path>) -> crate::Result<Self> {
        let cwd = current_dir()?;
        let root = absolutize(root.unwrap_or(&cwd))?;
        if !root.is_dir() {
            return Err(Error::RootNotFound(root));
        }

        let path = absolutize(document.as_ref())?;
        if !path.exists() {
            return Err(Error::DocumentNotFound(path));
        }

        log::debug!("Resolved document {} (root {})", path.display(), root.display());
        Ok(Self { path, root })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory containing the document
    pub fn parent_dir(&self) -> &Path {
        self.path.parent().unwrap_or(&self.root)
    }

    /// The document's own location as a `file://` URL
    pub fn url(&self) -> crate::Result<Url> {
        Url::from_file_path(&self.path).map_err(|()| Error::InvalidPath {
            path: self.path.clone(),
            reason: "not representable as a file URL".to_string(),
        })
    }

    /// The base location to load with under `strategy`
    pub fn base_location(&self, strategy: BaseStrategy) -> crate::Result<BaseLocation> {
        match strategy {
            BaseStrategy::Explicit => Ok(BaseLocation::Url(self.url()?)),
            BaseStrategy::WorkingDirectory => Ok(BaseLocation::CurrentDir),
        }
    }
}

/// Moves the process into a directory and moves it back when dropped.
///
/// Restoration happens on every exit path, including early returns and
/// unwinding. Only one guard should be alive at a time.
#[derive(Debug)]
pub struct WorkingDirGuard {
    previous: PathBuf,
}

impl WorkingDirGuard {
    pub fn enter<P: AsRef<Path>>(dir: P) -> crate::Result<Self> {
        let dir = dir.as_ref();
        let previous = current_dir()?;
        env::set_current_dir(dir).map_err(|e| Error::InvalidPath {
            path: dir.to_path_buf(),
            reason: format!("cannot change into directory: {e}"),
        })?;
        log::debug!(
            "Changed working directory {} -> {}",
            previous.display(),
            dir.display()
        );
        Ok(Self { previous })
    }

    /// The directory restored on drop
    pub fn previous(&self) -> &Path {
        &self.previous
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        match env::set_current_dir(&self.previous) {
            Ok(()) => log::debug!("Restored working directory {}", self.previous.display()),
            Err(e) => log::error!(
                "Failed to restore working directory {}: {}",
                self.previous.display(),
                e
            ),
        }
    }
}

fn current_dir() -> crate::Result<PathBuf> {
    env::current_dir().map_err(|e| Error::InvalidPath {
        path: PathBuf::from("."),
        reason: format!("cannot read current directory: {e}"),
    })
}

fn absolutize(path: &Path) -> crate::Result<PathBuf> {
    std::path::absolute(path).map_err(|e| Error::InvalidPath {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
