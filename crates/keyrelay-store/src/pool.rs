//! The upstream key pool.

use std::fmt;

/// Ordered list of upstream API keys, identified by position.
///
/// Immutable once built. `Debug` never prints the keys themselves.
#[derive(Clone, Default)]
pub struct KeyPool {
    keys: Vec<String>,
}

impl KeyPool {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Key at `index`, if the pool is that large.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.keys.get(index).map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Position of `key` in the pool.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }
}

impl fmt::Debug for KeyPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPool").field("len", &self.keys.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let pool = KeyPool::new(["sk-ant-0", "sk-ant-1"]);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(1), Some("sk-ant-1"));
        assert_eq!(pool.get(2), None);
        assert_eq!(pool.index_of("sk-ant-0"), Some(0));
        assert_eq!(pool.index_of("sk-ant-9"), None);
    }

    #[test]
    fn test_debug_redacts() {
        let pool = KeyPool::new(["sk-ant-secret"]);
        assert!(!format!("{pool:?}").contains("secret"));
    }
}
