//! Configuration file checks and upgrades.

use super::Config;
use crate::errors::AppResult;
use crate::ui::messages::{info, success};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

/// Keys every configuration file is expected to carry.
pub const EXPECTED_KEYS: &[&str] = &[
    "database",
    "storage_dir",
    "public_url_base",
    "device_name",
    "poll_interval_ms",
    "vacation_days_per_period",
    "documents_bucket",
    "show_weekday",
];

fn read_mapping(path: &Path) -> AppResult<Mapping> {
    let content = fs::read_to_string(path)?;
    let value: Value = serde_yaml::from_str(&content)?;
    Ok(value.as_mapping().cloned().unwrap_or_default())
}

/// Return the expected keys that are absent from the file at `path`.
pub fn missing_fields(path: &Path) -> AppResult<Vec<String>> {
    let map = read_mapping(path)?;
    Ok(EXPECTED_KEYS
        .iter()
        .filter(|k| !map.contains_key(**k))
        .map(|k| k.to_string())
        .collect())
}

/// Rewrite the file at `path` so that every expected key is present.
/// Existing values are preserved; missing ones get their defaults.
///   Ok(true)  → file updated
///   Ok(false) → nothing to do
pub fn run_config_migration(path: &Path) -> AppResult<bool> {
    if !path.exists() {
        info(format!("No configuration file at {}", path.display()));
        return Ok(false);
    }

    let missing = missing_fields(path)?;
    if missing.is_empty() {
        return Ok(false);
    }

    // serde defaults fill every absent field
    let cfg = Config::load_from(path)?;
    cfg.save_to(path)?;

    success(format!(
        "Configuration upgraded, added: {}",
        missing.join(", ")
    ));
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn detects_and_fills_missing_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rponto.conf");
        fs::write(&path, "database: /tmp/x.sqlite\nshow_weekday: None\n").unwrap();

        let missing = missing_fields(&path).unwrap();
        assert!(missing.contains(&"device_name".to_string()));
        assert!(!missing.contains(&"database".to_string()));

        assert!(run_config_migration(&path).unwrap());
        assert!(missing_fields(&path).unwrap().is_empty());

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.database, "/tmp/x.sqlite");
        assert_eq!(cfg.vacation_days_per_period, 30);

        assert!(!run_config_migration(&path).unwrap());
    }
}
