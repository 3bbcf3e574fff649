//! Per-device persisted session state, one YAML file per device name.

use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    pub token: String,
    pub user_id: String,
    /// Change-feed position of the session guard; absent when the session
    /// is not guarded.
    #[serde(default)]
    pub cursor: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct DeviceStore {
    dir: PathBuf,
}

impl DeviceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, device: &str) -> AppResult<PathBuf> {
        let ok = !device.is_empty()
            && device
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !ok {
            return Err(AppError::InvalidInput(format!(
                "invalid device name '{}'",
                device
            )));
        }
        Ok(self.dir.join(format!("{device}.yaml")))
    }

    pub fn load(&self, device: &str) -> AppResult<Option<DeviceState>> {
        let path = self.file_for(device)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let state = serde_yaml::from_str(&content)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(Some(state))
    }

    pub fn save(&self, device: &str, state: &DeviceState) -> AppResult<()> {
        let path = self.file_for(device)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(path, serde_yaml::to_string(state)?)?;
        Ok(())
    }

    /// Smallest feed cursor saved by any device, or `None` when no device
    /// holds one.
    pub fn oldest_cursor(&self) -> AppResult<Option<i64>> {
        if !self.dir.exists() {
            return Ok(None);
        }
        let mut oldest: Option<i64> = None;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let state: DeviceState = serde_yaml::from_str(&fs::read_to_string(&path)?)
                .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
            if let Some(cursor) = state.cursor {
                oldest = Some(oldest.map_or(cursor, |o| o.min(cursor)));
            }
        }
        Ok(oldest)
    }

    /// Forget the device's session. Missing files are fine.
    pub fn clear(&self, device: &str) -> AppResult<()> {
        let path = self.file_for(device)?;
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_load_clear() {
        let dir = TempDir::new().unwrap();
        let store = DeviceStore::new(dir.path().join("devices"));
        assert_eq!(store.load("phone").unwrap(), None);

        let state = DeviceState {
            token: "t".into(),
            user_id: "u".into(),
            cursor: Some(7),
        };
        store.save("phone", &state).unwrap();
        assert_eq!(store.load("phone").unwrap(), Some(state));

        store.clear("phone").unwrap();
        store.clear("phone").unwrap();
        assert_eq!(store.load("phone").unwrap(), None);
    }

    #[test]
    fn oldest_cursor_skips_unguarded_devices() {
        let dir = TempDir::new().unwrap();
        let store = DeviceStore::new(dir.path().join("devices"));
        assert_eq!(store.oldest_cursor().unwrap(), None);

        let state = |cursor| DeviceState {
            token: "t".into(),
            user_id: "u".into(),
            cursor,
        };
        store.save("phone", &state(Some(12))).unwrap();
        store.save("tablet", &state(None)).unwrap();
        store.save("laptop", &state(Some(5))).unwrap();
        assert_eq!(store.oldest_cursor().unwrap(), Some(5));

        store.clear("laptop").unwrap();
        assert_eq!(store.oldest_cursor().unwrap(), Some(12));
    }

    #[test]
    fn rejects_device_names_with_paths() {
        let store = DeviceStore::new("/tmp/none");
        assert!(store.load("../x").is_err());
        assert!(store.load("").is_err());
    }
}
