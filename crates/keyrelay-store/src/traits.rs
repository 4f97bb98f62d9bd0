//! User registry trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::{Assignment, Registry, UsageEvent, UsageLog, UserRecord};

/// Data-access trait for the user registry and usage log.
///
/// Callers pass emails already trimmed and lowercased. `assign` must be
/// atomic: two concurrent calls for the same email yield one record.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Return the user's assignment, creating it when absent.
    async fn assign(
        &self,
        email: &str,
        pool_size: usize,
        user_agent: Option<&str>,
    ) -> Result<Assignment, StoreError>;

    /// Look up a single user.
    async fn get(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Snapshot of the whole registry.
    async fn users(&self) -> Result<Registry, StoreError>;

    /// Log a usage event and update the user's counters.
    ///
    /// Returns `Ok(false)` if the email is not registered. The event is
    /// appended to the usage log either way.
    async fn record_usage(&self, email: &str, event: UsageEvent) -> Result<bool, StoreError>;

    /// Snapshot of the usage log.
    async fn usage(&self) -> Result<UsageLog, StoreError>;
}

#[async_trait]
impl<S: UserStore + ?Sized> UserStore for Arc<S> {
    #[inline]
    async fn assign(
        &self,
        email: &str,
        pool_size: usize,
        user_agent: Option<&str>,
    ) -> Result<Assignment, StoreError> {
        (**self).assign(email, pool_size, user_agent).await
    }

    #[inline]
    async fn get(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        (**self).get(email).await
    }

    #[inline]
    async fn users(&self) -> Result<Registry, StoreError> {
        (**self).users().await
    }

    #[inline]
    async fn record_usage(&self, email: &str, event: UsageEvent) -> Result<bool, StoreError> {
        (**self).record_usage(email, event).await
    }

    #[inline]
    async fn usage(&self) -> Result<UsageLog, StoreError> {
        (**self).usage().await
    }
}

#[async_trait]
impl<S: UserStore + ?Sized> UserStore for Box<S> {
    #[inline]
    async fn assign(
        &self,
        email: &str,
        pool_size: usize,
        user_agent: Option<&str>,
    ) -> Result<Assignment, StoreError> {
        (**self).assign(email, pool_size, user_agent).await
    }

    #[inline]
    async fn get(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        (**self).get(email).await
    }

    #[inline]
    async fn users(&self) -> Result<Registry, StoreError> {
        (**self).users().await
    }

    #[inline]
    async fn record_usage(&self, email: &str, event: UsageEvent) -> Result<bool, StoreError> {
        (**self).record_usage(email, event).await
    }

    #[inline]
    async fn usage(&self) -> Result<UsageLog, StoreError> {
        (**self).usage().await
    }
}
