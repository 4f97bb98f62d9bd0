//! Key index selection for new users.

use std::collections::HashSet;

use time::OffsetDateTime;

use crate::error::StoreError;
use crate::record::{Assignment, Registry, UsageEvent, UsageLog, UserRecord};

/// Pick the pool index for a user not yet in `registry`.
///
/// The lowest index no existing record references wins. Once every index is
/// taken, `registry.len() % pool_size` is used, i.e. the size of the registry
/// before the new record is inserted.
///
/// `pool_size` must be non-zero.
pub fn select_key_index(registry: &Registry, pool_size: usize) -> usize {
    debug_assert!(pool_size > 0);
    let used: HashSet<usize> = registry.values().map(|r| r.api_key_index).collect();
    (0..pool_size)
        .find(|i| !used.contains(i))
        .unwrap_or(registry.len() % pool_size)
}

/// Bind `email` to a pool index inside `registry`.
///
/// Existing users keep their index and counters. A record whose index no
/// longer fits the pool is re-bound with [`select_key_index`] over the other
/// records, counters intact.
pub(crate) fn assign_in(
    registry: &mut Registry,
    email: &str,
    pool_size: usize,
    user_agent: Option<&str>,
    now: OffsetDateTime,
) -> Result<Assignment, StoreError> {
    if pool_size == 0 {
        return Err(StoreError::EmptyPool);
    }

    if let Some(existing) = registry.get(email) {
        if existing.api_key_index < pool_size {
            return Ok(Assignment {
                record: existing.clone(),
                is_new: false,
                reassigned: false,
            });
        }
        let Some(mut record) = registry.remove(email) else {
            return Err(StoreError::backend("registry entry vanished"));
        };
        let stale = record.api_key_index;
        record.api_key_index = select_key_index(registry, pool_size);
        tracing::warn!(
            email,
            stale_index = stale,
            new_index = record.api_key_index,
            pool_size,
            "rebinding user to a key that still exists"
        );
        registry.insert(email.to_string(), record.clone());
        return Ok(Assignment {
            record,
            is_new: false,
            reassigned: true,
        });
    }

    let index = select_key_index(registry, pool_size);
    let record = UserRecord::new(index, now, user_agent);
    registry.insert(email.to_string(), record.clone());
    Ok(Assignment {
        record,
        is_new: true,
        reassigned: false,
    })
}

/// Append `event` to the usage log and bump the user's counters.
///
/// Returns `false` when `email` has no record; the event is still logged.
pub(crate) fn record_in(
    registry: &mut Registry,
    usage: &mut UsageLog,
    email: &str,
    event: UsageEvent,
) -> bool {
    let cost = event.cost;
    usage.entry(email.to_string()).or_default().push(event);
    match registry.get_mut(email) {
        Some(record) => {
            record.add_usage(cost);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::record::UserRecord;

    fn registry(indices: &[usize]) -> Registry {
        indices
            .iter()
            .enumerate()
            .map(|(n, &i)| {
                (
                    format!("user{n}@x.com"),
                    UserRecord::new(i, OffsetDateTime::UNIX_EPOCH, None),
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_registry_gets_zero() {
        assert_eq!(select_key_index(&Registry::new(), 3), 0);
    }

    #[test]
    fn test_first_unused_index() {
        assert_eq!(select_key_index(&registry(&[0]), 2), 1);
        assert_eq!(select_key_index(&registry(&[0, 2]), 4), 1);
        assert_eq!(select_key_index(&registry(&[1, 1, 1]), 3), 0);
    }

    #[test]
    fn test_wraparound_when_pool_exhausted() {
        // pool [K0, K1]: a -> 0, b -> 1, c -> 2 % 2 = 0
        assert_eq!(select_key_index(&registry(&[0, 1]), 2), 0);
        assert_eq!(select_key_index(&registry(&[0, 1, 0]), 2), 1);
        assert_eq!(select_key_index(&registry(&[0, 1, 0, 1, 0]), 2), 1);
        assert_eq!(select_key_index(&registry(&[0]), 1), 0);
    }

    #[test]
    fn test_out_of_range_indices_do_not_count_as_used() {
        // A stale index 5 does not occupy any slot of a 2-key pool.
        assert_eq!(select_key_index(&registry(&[5]), 2), 0);
    }

    #[test]
    fn test_assign_in_sequence() {
        let mut reg = Registry::new();
        let now = OffsetDateTime::UNIX_EPOCH;
        let a = assign_in(&mut reg, "a@x.com", 2, None, now).unwrap();
        let b = assign_in(&mut reg, "b@x.com", 2, None, now).unwrap();
        let c = assign_in(&mut reg, "c@x.com", 2, Some("ua"), now).unwrap();
        assert_eq!(
            [a.record.api_key_index, b.record.api_key_index, c.record.api_key_index],
            [0, 1, 0]
        );
        assert!(a.is_new && b.is_new && c.is_new);
        assert_eq!(c.record.user_agent.as_deref(), Some("ua"));

        let again = assign_in(&mut reg, "a@x.com", 2, None, now).unwrap();
        assert!(!again.is_new);
        assert_eq!(again.record, a.record);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn test_assign_in_empty_pool() {
        let mut reg = Registry::new();
        let err = assign_in(&mut reg, "a@x.com", 0, None, OffsetDateTime::UNIX_EPOCH);
        assert!(matches!(err, Err(StoreError::EmptyPool)));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_assign_in_rebinds_stale_index() {
        let mut reg = registry(&[0, 4]);
        reg.get_mut("user1@x.com").unwrap().add_usage(0.2);

        let out = assign_in(&mut reg, "user1@x.com", 2, None, OffsetDateTime::UNIX_EPOCH).unwrap();
        assert!(!out.is_new);
        assert!(out.reassigned);
        assert_eq!(out.record.api_key_index, 1);
        assert_eq!(out.record.total_messages, 1);
        assert_eq!(reg["user1@x.com"].api_key_index, 1);
    }

    #[test]
    fn test_record_in() {
        let mut reg = registry(&[0]);
        let mut usage = UsageLog::new();
        let event = UsageEvent::new(OffsetDateTime::UNIX_EPOCH, "Hi", "Hello", 0.0001);

        assert!(record_in(&mut reg, &mut usage, "user0@x.com", event.clone()));
        assert_eq!(reg["user0@x.com"].total_messages, 1);

        assert!(!record_in(&mut reg, &mut usage, "ghost@x.com", event));
        assert!(!reg.contains_key("ghost@x.com"));
        assert_eq!(usage["ghost@x.com"].len(), 1);
        assert_eq!(usage["user0@x.com"][0].message_length, 2);
    }
}
