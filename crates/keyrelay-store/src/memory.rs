//! In-memory user registry.

use async_trait::async_trait;
use parking_lot::Mutex;
use time::OffsetDateTime;

use crate::assign::{assign_in, record_in};
use crate::error::StoreError;
use crate::record::{Assignment, Registry, UsageEvent, UsageLog, UserRecord};
use crate::traits::UserStore;

#[derive(Debug, Default)]
struct Inner {
    users: Registry,
    usage: UsageLog,
}

/// Registry held entirely in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing registry.
    pub fn with_users(users: Registry) -> Self {
        Self {
            inner: Mutex::new(Inner {
                users,
                usage: UsageLog::new(),
            }),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.lock().users.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().users.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn assign(
        &self,
        email: &str,
        pool_size: usize,
        user_agent: Option<&str>,
    ) -> Result<Assignment, StoreError> {
        let mut inner = self.inner.lock();
        assign_in(
            &mut inner.users,
            email,
            pool_size,
            user_agent,
            OffsetDateTime::now_utc(),
        )
    }

    async fn get(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.inner.lock().users.get(email).cloned())
    }

    async fn users(&self) -> Result<Registry, StoreError> {
        Ok(self.inner.lock().users.clone())
    }

    async fn record_usage(&self, email: &str, event: UsageEvent) -> Result<bool, StoreError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        Ok(record_in(&mut inner.users, &mut inner.usage, email, event))
    }

    async fn usage(&self) -> Result<UsageLog, StoreError> {
        Ok(self.inner.lock().usage.clone())
    }
}
