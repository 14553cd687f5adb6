use std::cell::RefCell;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// The course that owns a set of static assets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseScope {
    pub org: String,
    pub course: String,
}

impl CourseScope {
    pub fn new(org: impl Into<String>, course: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            course: course.into(),
        }
    }
}

impl fmt::Display for CourseScope {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}/{}", self.org, self.course)
    }
}

impl std::str::FromStr for CourseScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((org, course)) if !org.is_empty() && !course.is_empty() && !course.contains('/') => {
                Ok(CourseScope::new(org, course))
            }
            _ => Err(format!("expected ORG/COURSE, got '{}'", s)),
        }
    }
}

#[derive(Debug)]
pub enum StoreError {
    NotFound { scope: CourseScope, filename: String },
    Io(io::Error),
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Io(err) => Some(err),
            StoreError::NotFound { .. } => None,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::NotFound { scope, filename } => {
                write!(fmt, "Asset '{}' not found in course {}", filename, scope)
            }
            StoreError::Io(err) => write!(fmt, "{}", err),
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::Io(err)
    }
}

/// Blob storage for course assets, keyed by course and filename.
pub trait AssetStore {
    fn put(
        &self,
        scope: &CourseScope,
        filename: &str,
        mime_type: &str,
        data: &[u8],
    ) -> Result<(), StoreError>;

    fn get(&self, scope: &CourseScope, filename: &str) -> Result<Vec<u8>, StoreError>;

    fn delete(&self, scope: &CourseScope, filename: &str) -> Result<(), StoreError>;

    /// Drops any cached copy of the asset. Called after every `put`.
    fn invalidate(&self, scope: &CourseScope, filename: &str);
}

/// Stores assets as `<root>/<org>/<course>/<filename>`.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path(&self, scope: &CourseScope, filename: &str) -> PathBuf {
        self.root.join(&scope.org).join(&scope.course).join(filename)
    }

    fn not_found(scope: &CourseScope, filename: &str, err: io::Error) -> StoreError {
        if err.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound {
                scope: scope.clone(),
                filename: filename.to_string(),
            }
        } else {
            StoreError::Io(err)
        }
    }
}

impl AssetStore for FsStore {
    fn put(
        &self,
        scope: &CourseScope,
        filename: &str,
        mime_type: &str,
        data: &[u8],
    ) -> Result<(), StoreError> {
        let path = self.path(scope, filename);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, data)?;
        debug!(path = %path.display(), mime_type, bytes = data.len(), "wrote asset");
        Ok(())
    }

    fn get(&self, scope: &CourseScope, filename: &str) -> Result<Vec<u8>, StoreError> {
        fs::read(self.path(scope, filename)).map_err(|err| Self::not_found(scope, filename, err))
    }

    fn delete(&self, scope: &CourseScope, filename: &str) -> Result<(), StoreError> {
        fs::remove_file(self.path(scope, filename))
            .map_err(|err| Self::not_found(scope, filename, err))
    }

    fn invalidate(&self, scope: &CourseScope, filename: &str) {
        // Nothing is cached in front of the filesystem.
        debug!(%scope, filename, "invalidated asset");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Keeps assets in memory. Also records every invalidation it receives.
#[derive(Default)]
pub struct MemoryStore {
    assets: RefCell<HashMap<(CourseScope, String), StoredAsset>>,
    invalidated: RefCell<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asset(&self, scope: &CourseScope, filename: &str) -> Option<StoredAsset> {
        self.assets
            .borrow()
            .get(&(scope.clone(), filename.to_string()))
            .cloned()
    }

    /// Sorted filenames stored under `scope`.
    pub fn filenames(&self, scope: &CourseScope) -> Vec<String> {
        let mut names: Vec<String> = self
            .assets
            .borrow()
            .keys()
            .filter(|(s, _)| s == scope)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn invalidated(&self) -> Vec<String> {
        self.invalidated.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.borrow().is_empty()
    }
}

impl AssetStore for MemoryStore {
    fn put(
        &self,
        scope: &CourseScope,
        filename: &str,
        mime_type: &str,
        data: &[u8],
    ) -> Result<(), StoreError> {
        self.assets.borrow_mut().insert(
            (scope.clone(), filename.to_string()),
            StoredAsset {
                mime_type: mime_type.to_string(),
                data: data.to_vec(),
            },
        );
        Ok(())
    }

    fn get(&self, scope: &CourseScope, filename: &str) -> Result<Vec<u8>, StoreError> {
        self.asset(scope, filename)
            .map(|asset| asset.data)
            .ok_or_else(|| StoreError::NotFound {
                scope: scope.clone(),
                filename: filename.to_string(),
            })
    }

    fn delete(&self, scope: &CourseScope, filename: &str) -> Result<(), StoreError> {
        self.assets
            .borrow_mut()
            .remove(&(scope.clone(), filename.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                scope: scope.clone(),
                filename: filename.to_string(),
            })
    }

    fn invalidate(&self, _scope: &CourseScope, filename: &str) {
        self.invalidated.borrow_mut().push(filename.to_string());
    }
}
