//! Bucket/path object storage on the local filesystem.

use super::validate_ident;
use crate::errors::{AppError, AppResult};
use std::fs;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
    url_base: String,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>, url_base: &str) -> Self {
        Self {
            root: root.into(),
            url_base: url_base.trim_end_matches('/').to_string(),
        }
    }

    /// Resolve `bucket/path` under the storage root, refusing anything that
    /// would escape it.
    pub fn object_path(&self, bucket: &str, path: &str) -> AppResult<PathBuf> {
        validate_ident(bucket)?;
        let rel = Path::new(path);
        let clean = !path.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(AppError::Backend(format!("invalid object path '{}'", path)));
        }
        Ok(self.root.join(bucket).join(rel))
    }

    pub fn upload(&self, bucket: &str, path: &str, bytes: &[u8], upsert: bool) -> AppResult<()> {
        let target = self.object_path(bucket, path)?;
        if target.exists() && !upsert {
            return Err(AppError::ObjectExists(format!("{}/{}", bucket, path)));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, bytes)?;
        Ok(())
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", self.url_base, bucket, path)
    }
}
