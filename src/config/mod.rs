use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub mod migrate;

/// Environment variable that relocates the whole config directory.
pub const HOME_ENV: &str = "RPONTO_HOME";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: String,
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
    #[serde(default = "default_public_url_base")]
    pub public_url_base: String,
    #[serde(default = "default_device_name")]
    pub device_name: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_vacation_days")]
    pub vacation_days_per_period: i64,
    #[serde(default = "default_documents_bucket")]
    pub documents_bucket: String,
    #[serde(default = "default_show_weekday")]
    pub show_weekday: String,
}

fn default_storage_dir() -> String {
    Config::config_dir()
        .join("storage")
        .to_string_lossy()
        .to_string()
}
fn default_public_url_base() -> String {
    "https://storage.rponto.local/object/public".to_string()
}
fn default_device_name() -> String {
    "mobile".to_string()
}
fn default_poll_interval() -> u64 {
    1000
}
fn default_vacation_days() -> i64 {
    30
}
fn default_documents_bucket() -> String {
    crate::core::documents::DEFAULT_BUCKET.to_string()
}
fn default_show_weekday() -> String {
    "None".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: Self::database_file().to_string_lossy().to_string(),
            storage_dir: default_storage_dir(),
            public_url_base: default_public_url_base(),
            device_name: default_device_name(),
            poll_interval_ms: default_poll_interval(),
            vacation_days_per_period: default_vacation_days(),
            documents_bucket: default_documents_bucket(),
            show_weekday: default_show_weekday(),
        }
    }
}

impl Config {
    /// Return the standard configuration directory depending on the platform
    pub fn config_dir() -> PathBuf {
        if let Ok(custom) = env::var(HOME_ENV)
            && !custom.trim().is_empty()
        {
            return PathBuf::from(custom);
        }

        if cfg!(target_os = "windows") {
            let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(appdata).join("rponto")
        } else {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".rponto")
        }
    }

    /// Return the full path of the config file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("rponto.conf")
    }

    /// Return the full path of the SQLite database
    pub fn database_file() -> PathBuf {
        Self::config_dir().join("rponto.sqlite")
    }

    /// Directory holding the per-device session state files.
    pub fn devices_dir() -> PathBuf {
        Self::config_dir().join("devices")
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load() -> AppResult<Self> {
        Self::load_from(&Self::config_file())
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path).map_err(|_| AppError::ConfigLoad)?;
        let cfg: Config = serde_yaml::from_str(&content)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(yaml.as_bytes())?;
        Ok(())
    }

    /// Initialize configuration directory, config file and database file.
    /// Returns the configuration that was written (or would have been, in test mode).
    pub fn init_all(custom_db: Option<String>, is_test: bool) -> AppResult<Config> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;

        let mut config = Config::default();
        if let Some(name) = custom_db {
            let p = Path::new(&name);
            let db_path = if p.is_absolute() {
                p.to_path_buf()
            } else {
                dir.join(p)
            };
            config.database = db_path.to_string_lossy().to_string();
        }

        if !is_test {
            config.save_to(&Self::config_file())?;
            println!("✅ Config file: {:?}", Self::config_file());
        }

        let db_path = PathBuf::from(&config.database);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        if !db_path.exists() {
            fs::File::create(&db_path)?;
        }
        fs::create_dir_all(&config.storage_dir)?;

        println!("✅ Database:    {:?}", db_path);

        Ok(config)
    }
}
