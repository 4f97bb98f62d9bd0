//! Client keys: the widget keys checked by `/verify-key` and managed by
//! `/generate-api-key`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use keyrelay_config::ClientKeyConfig;
use keyrelay_core::CLIENT_KEY_SLUG_MAX;
use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::format_description;

use crate::error::StoreError;

/// A client key's quota and billing data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientKey {
    pub company: String,
    pub limit: u64,
    pub used: u64,
    pub active: bool,
    /// Creation day, `YYYY-MM-DD`.
    pub created_at: String,
    pub price_per_minute: f64,
}

impl ClientKey {
    /// A fresh, active key created today.
    pub fn new(company: impl Into<String>, limit: u64, price_per_minute: f64) -> Self {
        Self {
            company: company.into(),
            limit,
            used: 0,
            active: true,
            created_at: today(),
            price_per_minute,
        }
    }

    #[inline]
    pub fn remaining(&self) -> i64 {
        self.limit as i64 - self.used as i64
    }

    /// `used * price_per_minute`.
    #[inline]
    pub fn revenue(&self) -> f64 {
        self.used as f64 * self.price_per_minute
    }
}

impl From<&ClientKeyConfig> for ClientKey {
    fn from(c: &ClientKeyConfig) -> Self {
        Self {
            company: c.company.clone(),
            limit: c.limit,
            used: c.used,
            active: c.active,
            created_at: today(),
            price_per_minute: c.price_per_minute,
        }
    }
}

fn today() -> String {
    OffsetDateTime::now_utc()
        .date()
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

/// Generate `sk_<slug>_<8 hex>` for `company`.
///
/// The slug is the company name lowercased with everything but ASCII
/// letters and digits removed, cut to ten characters.
pub fn generate_client_key(company: &str) -> String {
    let slug: String = company
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .take(CLIENT_KEY_SLUG_MAX)
        .collect();
    let suffix: [u8; 4] = rand::thread_rng().r#gen();
    format!("sk_{slug}_{}", hex::encode(suffix))
}

/// Storage for client keys.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<ClientKey>, StoreError>;

    /// All keys in key order.
    async fn list(&self) -> Result<Vec<(String, ClientKey)>, StoreError>;

    /// Insert or replace.
    async fn put(&self, key: &str, value: ClientKey) -> Result<(), StoreError>;

    /// Remove a key, returning [`StoreError::NotFound`] if it was absent.
    async fn delete(&self, key: &str) -> Result<ClientKey, StoreError>;

    /// Charge one request to `key` and return its updated state.
    ///
    /// The check and the increment are a single step: an inactive key fails
    /// with [`StoreError::Inactive`], a key with `used >= limit` with
    /// [`StoreError::LimitExceeded`], and neither is charged.
    async fn consume(&self, key: &str) -> Result<ClientKey, StoreError>;
}

#[async_trait]
impl<S: KeyStore + ?Sized> KeyStore for Arc<S> {
    #[inline]
    async fn get(&self, key: &str) -> Result<Option<ClientKey>, StoreError> {
        (**self).get(key).await
    }

    #[inline]
    async fn list(&self) -> Result<Vec<(String, ClientKey)>, StoreError> {
        (**self).list().await
    }

    #[inline]
    async fn put(&self, key: &str, value: ClientKey) -> Result<(), StoreError> {
        (**self).put(key, value).await
    }

    #[inline]
    async fn delete(&self, key: &str) -> Result<ClientKey, StoreError> {
        (**self).delete(key).await
    }

    #[inline]
    async fn consume(&self, key: &str) -> Result<ClientKey, StoreError> {
        (**self).consume(key).await
    }
}

/// Client keys held in memory, seeded from config.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    keys: RwLock<BTreeMap<String, ClientKey>>,
}

impl MemoryKeyStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(clients: &[ClientKeyConfig]) -> Self {
        let keys = clients
            .iter()
            .map(|c| (c.key.clone(), ClientKey::from(c)))
            .collect();
        Self {
            keys: RwLock::new(keys),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn get(&self, key: &str) -> Result<Option<ClientKey>, StoreError> {
        Ok(self.keys.read().get(key).cloned())
    }

    async fn list(&self) -> Result<Vec<(String, ClientKey)>, StoreError> {
        Ok(self
            .keys
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn put(&self, key: &str, value: ClientKey) -> Result<(), StoreError> {
        self.keys.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<ClientKey, StoreError> {
        self.keys.write().remove(key).ok_or(StoreError::NotFound)
    }

    async fn consume(&self, key: &str) -> Result<ClientKey, StoreError> {
        let mut keys = self.keys.write();
        let client = keys.get_mut(key).ok_or(StoreError::NotFound)?;
        if !client.active {
            return Err(StoreError::Inactive);
        }
        if client.used >= client.limit {
            return Err(StoreError::LimitExceeded {
                used: client.used,
                limit: client.limit,
            });
        }
        client.used += 1;
        Ok(client.clone())
    }
}
