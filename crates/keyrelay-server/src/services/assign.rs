//! Key assignment.

use std::sync::Arc;

use keyrelay_store::{KeyPool, UserRecord, UserStore, normalize_email};
use tracing::info;

use crate::error::{ApiError, ErrorPolicy};

/// Stored for users whose request had no `User-Agent`.
const UNKNOWN_AGENT: &str = "unknown";

/// Result of binding a user to a pool key.
#[derive(Debug, Clone)]
pub struct AssignOutcome {
    /// Normalized email the record is stored under.
    pub email: String,
    pub api_key: String,
    pub is_new_user: bool,
    pub record: UserRecord,
}

pub struct AssignService {
    store: Arc<dyn UserStore>,
    pool: KeyPool,
    errors: ErrorPolicy,
}

impl AssignService {
    pub fn new(store: Arc<dyn UserStore>, pool: KeyPool, errors: ErrorPolicy) -> Self {
        Self {
            store,
            pool,
            errors,
        }
    }

    #[inline]
    pub fn pool(&self) -> &KeyPool {
        &self.pool
    }

    /// Return the key bound to `email`, binding one first if needed.
    pub async fn assign(
        &self,
        email: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<AssignOutcome, ApiError> {
        let email = normalize_email(email)?;
        if self.pool.is_empty() {
            return Err(ApiError::Configuration("No valid API keys configured".into()));
        }

        let out = self
            .store
            .assign(
                &email,
                self.pool.len(),
                Some(user_agent.unwrap_or(UNKNOWN_AGENT)),
            )
            .await
            .map_err(|e| self.errors.store(e))?;

        let index = out.record.api_key_index;
        let Some(api_key) = self.pool.get(index) else {
            return Err(self
                .errors
                .internal(format!("assigned index {index} outside pool of {}", self.pool.len())));
        };

        info!(
            email = %email,
            key_index = index,
            new_user = out.is_new,
            "api key assigned"
        );

        Ok(AssignOutcome {
            email,
            api_key: api_key.to_string(),
            is_new_user: out.is_new,
            record: out.record,
        })
    }
}

#[cfg(test)]
mod tests {
    use keyrelay_store::MemoryStore;

    use super::*;

    fn service(keys: &[&str]) -> AssignService {
        AssignService::new(
            Arc::new(MemoryStore::new()),
            KeyPool::new(keys.iter().copied()),
            ErrorPolicy::default(),
        )
    }

    #[tokio::test]
    async fn test_invalid_email_is_validation_error() {
        let svc = service(&["sk-ant-0"]);
        for (raw, expected) in [
            (None, "User email is required"),
            (Some("   "), "User email is required"),
            (Some("nope"), "Valid user email is required"),
        ] {
            match svc.assign(raw, None).await {
                Err(ApiError::Validation(msg)) => assert_eq!(msg, expected),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_assign_sequence_and_idempotence() {
        let svc = service(&["sk-ant-0", "sk-ant-1"]);
        let a = svc.assign(Some("a@x.com"), Some("ua")).await.unwrap();
        let b = svc.assign(Some("b@x.com"), None).await.unwrap();
        let c = svc.assign(Some("c@x.com"), None).await.unwrap();
        assert_eq!(
            [a.api_key.as_str(), b.api_key.as_str(), c.api_key.as_str()],
            ["sk-ant-0", "sk-ant-1", "sk-ant-0"]
        );
        assert!(a.is_new_user && b.is_new_user && c.is_new_user);
        assert_eq!(a.record.user_agent.as_deref(), Some("ua"));
        assert_eq!(b.record.user_agent.as_deref(), Some(UNKNOWN_AGENT));

        for _ in 0..3 {
            let again = svc.assign(Some(" A@X.com"), None).await.unwrap();
            assert!(!again.is_new_user);
            assert_eq!(again.api_key, "sk-ant-0");
            assert_eq!(again.email, "a@x.com");
        }
    }

    #[tokio::test]
    async fn test_empty_pool_is_configuration_error() {
        let svc = service(&[]);
        assert!(matches!(
            svc.assign(Some("a@x.com"), None).await,
            Err(ApiError::Configuration(_))
        ));
    }
}
