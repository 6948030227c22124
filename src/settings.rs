use std::fs;
use std::io;
use std::path::PathBuf;

use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Server {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct Sqlite {
    #[serde(default = "default_sqlite_path")]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct Frontend {
    #[serde(default = "default_frontend_url")]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub sqlite: Sqlite,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub frontend: Frontend,
}

impl Settings {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path).required(false))
            .build()?;

        config.try_deserialize()
    }
}

impl Storage {
    pub fn users_file(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("users.json")
    }

    pub fn predictions_file(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("predictions.json")
    }

    pub fn referrals_file(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("referrals.json")
    }

    /// Create the data directory and seed empty array files so first reads
    /// see a well-formed store rather than a missing one.
    pub fn provision(&self) -> io::Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        for path in [
            self.users_file(),
            self.predictions_file(),
            self.referrals_file(),
        ] {
            if !path.exists() {
                fs::write(&path, "[]")?;
            }
        }
        Ok(())
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_sqlite_path() -> String {
    "data/crickcast_users.db".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_frontend_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

impl Default for Server {
    fn default() -> Self {
        Server {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for Sqlite {
    fn default() -> Self {
        Sqlite {
            path: default_sqlite_path(),
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Storage {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for Frontend {
    fn default() -> Self {
        Frontend {
            url: default_frontend_url(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let settings = Settings::load("does-not-exist").expect("defaults");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.storage.data_dir, "data");
        assert_eq!(settings.frontend.url, "http://127.0.0.1:3000");
    }

    #[test]
    fn storage_paths_live_under_the_data_dir() {
        let storage = Storage {
            data_dir: "/tmp/crickcast-test".to_string(),
        };
        assert!(storage.users_file().ends_with("users.json"));
        assert!(storage.predictions_file().starts_with("/tmp/crickcast-test"));
    }
}
