mod config;
pub mod database;
mod memory;
pub mod timer_store;

pub use config::{AlarmConfig, Config, NotificationsConfig, TimerConfig};
pub use database::Database;
pub use memory::MemoryStore;
pub use timer_store::TimerStore;

use std::path::PathBuf;

use crate::error::{CoreError, StoreError};

/// String key/value storage that outlives a single process run.
///
/// Values are opaque strings; typed encoding lives in [`TimerStore`].
pub trait KvStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

impl<T: KvStore + ?Sized> KvStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

/// Returns `~/.config/studybuddy[-dev]/` based on STUDYBUDDY_ENV.
///
/// Set STUDYBUDDY_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the data directory fails.
pub fn data_dir() -> Result<PathBuf, CoreError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("STUDYBUDDY_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("studybuddy-dev")
    } else {
        base_dir.join("studybuddy")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
