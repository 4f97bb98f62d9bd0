//! JSON file backed user registry.
//!
//! Layout on disk (both files optional, created on first write):
//!
//! ```text
//! <data_dir>/users.json   { "<email>": { "apiKeyIndex": 0, ... }, ... }
//! <data_dir>/usage.json   { "<email>": [ { "timestamp": ..., ... } ], ... }
//! ```
//!
//! Every mutation is a read-modify-write under one async lock, and files are
//! replaced through a temp file plus rename so readers never see a torn write.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use keyrelay_config::StorageConfig;
use serde::Serialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::debug;

use crate::assign::{assign_in, record_in};
use crate::error::StoreError;
use crate::record::{Assignment, Registry, UsageEvent, UsageLog, UserRecord};
use crate::traits::UserStore;

/// Registry persisted as `users.json` and `usage.json`.
#[derive(Debug)]
pub struct JsonFileStore {
    users_path: PathBuf,
    usage_path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(users_path: impl Into<PathBuf>, usage_path: impl Into<PathBuf>) -> Self {
        Self {
            users_path: users_path.into(),
            usage_path: usage_path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store rooted at the configured data directory.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.users_path(), config.usage_path())
    }

    #[inline]
    pub fn users_path(&self) -> &Path {
        &self.users_path
    }

    #[inline]
    pub fn usage_path(&self) -> &Path {
        &self.usage_path
    }
}

async fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(T::default()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec_pretty(value)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), bytes = bytes.len(), "registry file written");
    Ok(())
}

#[async_trait]
impl UserStore for JsonFileStore {
    async fn assign(
        &self,
        email: &str,
        pool_size: usize,
        user_agent: Option<&str>,
    ) -> Result<Assignment, StoreError> {
        let _guard = self.lock.lock().await;
        let mut users: Registry = read_json(&self.users_path).await?;
        let out = assign_in(
            &mut users,
            email,
            pool_size,
            user_agent,
            OffsetDateTime::now_utc(),
        )?;
        if out.is_new || out.reassigned {
            write_json(&self.users_path, &users).await?;
        }
        Ok(out)
    }

    async fn get(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut users: Registry = read_json(&self.users_path).await?;
        Ok(users.remove(email))
    }

    async fn users(&self) -> Result<Registry, StoreError> {
        let _guard = self.lock.lock().await;
        read_json(&self.users_path).await
    }

    async fn record_usage(&self, email: &str, event: UsageEvent) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut users: Registry = read_json(&self.users_path).await?;
        let mut usage: UsageLog = read_json(&self.usage_path).await?;
        let updated = record_in(&mut users, &mut usage, email, event);
        write_json(&self.usage_path, &usage).await?;
        if updated {
            write_json(&self.users_path, &users).await?;
        }
        Ok(updated)
    }

    async fn usage(&self) -> Result<UsageLog, StoreError> {
        let _guard = self.lock.lock().await;
        read_json(&self.usage_path).await
    }
}
