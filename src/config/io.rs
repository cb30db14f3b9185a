use std::env::{current_exe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use directories_next::{ProjectDirs};
use log::{info, warn};
use tokio::fs::{File};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use serde_json;
use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::OpenOptions;
use std::str;

use crate::config::types::Config;
use crate::error::ConfigError;

// creates a path to pressure-ble.json in the same directory as the executable
// this could be useful for usb sticks
fn get_portable_config_path() -> Option<PathBuf> {
    match current_exe() {
        Ok(mut path) => {
            // F:\pressure-ble.exe => F:\pressure-ble.json
            if !path.set_extension("json") {
                warn!("current exe has no filename: {}", path.to_string_lossy());
                return None
            }

            Some(path)
        },
        Err(err) => {
            warn!("failed to get current exe path: {:?}", err);
            None
        },
    }
}

// creates a path to pressure-ble.json in an os dependent standard directory, such as %AppData% on
// windows.
fn get_local_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "example", "pressure-ble").map(|dirs| {
        dirs.config_dir().join("pressure-ble.json")
    })
}

fn get_config_path() -> Result<PathBuf, ConfigError> {
    let portable = get_portable_config_path();
    if let Some(path) = portable {
        match std::fs::metadata(&path) {
            Ok(attr) => {
                if attr.is_file() {
                    return Ok(path);
                }
            }
            Err(err) => {
                info!("Could not read metadata of: {}; Using local path instead. ({:?})", path.to_string_lossy(), err);
            },
        }
    }

    match get_local_config_path() {
        None => Err(ConfigError::NoConfigPath),
        Some(path) => Ok(path),
    }
}

/// Holds the exclusive lock that makes this the only running instance.
pub struct ConfigIOLocker {
    rw_lock: RwLock<std::fs::File>,
}

impl ConfigIOLocker {
    pub fn lock(&mut self) -> Result<RwLockWriteGuard<std::fs::File>, ConfigError> {
        match self.rw_lock.try_write() {
            Ok(guard) => Ok(guard),
            Err(source) => Err(ConfigError::CanNotLock { source }),
        }
    }
}

struct ConfigIOInner {
    file: std::fs::File,
}

#[derive(Clone)]
pub struct ConfigIO {
    inner: Arc<Mutex<ConfigIOInner>>,
}

impl ConfigIO {
    /// Open (creating if needed) the config file at `path`, or at the default location.
    pub fn new_sync(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => get_config_path()?,
        };
        info!("Using config file {}", path.to_string_lossy());

        if let Some(directory) = path.parent() {
            if !directory.as_os_str().is_empty() {
                std::fs::create_dir_all(directory)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .truncate(false)
            .append(false)
            .create(true)
            .open(path)?;

        let inner = ConfigIOInner {
            file,
        };
        Ok(ConfigIO { inner: Arc::new(Mutex::new(inner)) })
    }

    pub fn locker(&self) -> Result<ConfigIOLocker, ConfigError> {
        let inner = self.inner.lock().expect("Failed to lock ConfigIO inner");

        Ok(ConfigIOLocker {
            rw_lock: RwLock::new(inner.file.try_clone()?),
        })
    }

    // The File returned from here should never be closed!
    fn get_file(&self) -> Result<File, ConfigError> {
        let inner = self.inner.lock().expect("Failed to lock ConfigIO inner");
        let file = inner.file.try_clone()?; // std File
        Ok(File::from_std(file)) // tokio File
    }

    /// Read the config. An empty file yields the defaults, which are then written back so the
    /// user has something to edit.
    pub async fn read(&self) -> Result<Config, ConfigError> {
        let mut file = self.get_file()?;
        info!("Reading config file");

        let mut content = vec![];
        file.rewind().await?;
        file.read_to_end(&mut content).await?;

        if content.is_empty() {
            let config = Config::default();
            self.save(config.clone()).await?;
            return Ok(config);
        }

        let content = str::from_utf8(&content)?;

        let mut config: Config = serde_json::from_str(content)?;
        config.sort_thresholds();
        Ok(config)
    }

    pub async fn save(&self, config: Config) -> Result<(), ConfigError> {
        let mut file = self.get_file()?;
        info!("Saving config");

        let content = serde_json::to_string_pretty(&config)?;
        file.rewind().await?;
        file.set_len(0).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::Thresholds;

    fn temp_config_path(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("pressure-ble-{}-{}.json", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[tokio::test]
    async fn should_write_defaults_for_empty_file() {
        let path = temp_config_path("defaults");
        let config_io = ConfigIO::new_sync(Some(&path)).unwrap();

        let config = config_io.read().await.unwrap();
        assert_eq!(config, Config::default());

        let written: Config = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, Config::default());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn should_read_back_saved_config() {
        let path = temp_config_path("roundtrip");
        let config_io = ConfigIO::new_sync(Some(&path)).unwrap();
        let config = Config {
            thresholds: Thresholds { moderate: 10.0, high: 30.0, critical: 60.0 },
            time_format: "%T".to_string(),
        };

        config_io.save(config.clone()).await.unwrap();
        assert_eq!(config_io.read().await.unwrap(), config);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn should_refuse_a_second_lock() {
        let path = temp_config_path("lock");
        let first = ConfigIO::new_sync(Some(&path)).unwrap();
        let second = ConfigIO::new_sync(Some(&path)).unwrap();

        let mut first_locker = first.locker().unwrap();
        let _guard = first_locker.lock().unwrap();

        let mut second_locker = second.locker().unwrap();
        assert!(matches!(second_locker.lock(), Err(ConfigError::CanNotLock { .. })));
        let _ = std::fs::remove_file(&path);
    }
}
