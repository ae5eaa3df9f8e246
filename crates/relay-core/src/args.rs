//! Ordered, multi-valued string metadata
//!
//! `Args` keeps key/value pairs in insertion order. A key may repeat;
//! `get_all` returns every value for it in the order they were added.
//!
//! Instances are recycled through a bounded lock-free free list so that
//! per-call metadata does not allocate on the hot path:
//!
//! ```ignore
//! let mut meta = acquire_args();
//! meta.add("X-Trace", "abc");
//! // ...
//! release_args(meta);
//! ```

use crossbeam_queue::ArrayQueue;
use std::sync::OnceLock;

use crate::constants::POOL_CAPACITY;

/// Key/value metadata collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    pairs: Vec<(String, String)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value. Existing values for `key` are kept.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Replace every value for `key` with a single `value`.
    ///
    /// The first occurrence keeps its position; later duplicates are removed.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.pairs.iter().position(|(k, _)| k == key) {
            Some(first) => {
                self.pairs[first].1 = value;
                let mut idx = 0;
                self.pairs.retain(|(k, _)| {
                    let keep = idx <= first || k != key;
                    idx += 1;
                    keep
                });
            }
            None => self.pairs.push((key.to_string(), value)),
        }
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `key`, in insertion order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn has(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Remove every value for `key`.
    pub fn del(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    /// Number of pairs (a repeated key counts once per value).
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Clear all pairs, keeping the allocation.
    pub fn reset(&mut self) {
        self.pairs.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Args {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = Args::new();
        for (k, v) in iter {
            args.add(k, v);
        }
        args
    }
}

// ============================================================================
// Pool
// ============================================================================

fn args_pool() -> &'static ArrayQueue<Args> {
    static POOL: OnceLock<ArrayQueue<Args>> = OnceLock::new();
    POOL.get_or_init(|| ArrayQueue::new(POOL_CAPACITY))
}

/// Take an empty `Args` from the free list, or allocate one.
pub fn acquire_args() -> Args {
    args_pool().pop().unwrap_or_default()
}

/// Reset `args` and return it to the free list. Dropped if the list is full.
pub fn release_args(mut args: Args) {
    args.reset();
    let _ = args_pool().push(args);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_keeps_order() {
        let mut args = Args::new();
        args.add("a", "1");
        args.add("b", "2");
        args.add("a", "3");

        assert_eq!(args.len(), 3);
        assert_eq!(args.get("a"), Some("1"));
        assert_eq!(args.get_all("a"), vec!["1", "3"]);
        let keys: Vec<&str> = args.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_set_collapses_duplicates() {
        let mut args = Args::new();
        args.add("a", "1");
        args.add("b", "2");
        args.add("a", "3");
        args.set("a", "x");

        assert_eq!(args.get_all("a"), vec!["x"]);
        let pairs: Vec<(&str, &str)> = args.iter().collect();
        assert_eq!(pairs, vec![("a", "x"), ("b", "2")]);

        args.set("c", "4");
        assert_eq!(args.get("c"), Some("4"));
    }

    #[test]
    fn test_del_and_reset() {
        let mut args: Args = [("a", "1"), ("b", "2"), ("a", "3")].into_iter().collect();
        args.del("a");
        assert!(!args.has("a"));
        assert!(args.has("b"));

        args.reset();
        assert!(args.is_empty());
        assert_eq!(args.get("b"), None);
    }

    #[test]
    fn test_pool_returns_empty() {
        let mut args = acquire_args();
        args.add("k", "v");
        release_args(args);

        for _ in 0..4 {
            let fresh = acquire_args();
            assert!(fresh.is_empty());
        }
    }

    #[test]
    fn test_acquired_are_independent() {
        let mut a = acquire_args();
        let b = acquire_args();
        a.add("only", "a");
        assert!(b.is_empty());
        release_args(a);
        release_args(b);
    }
}
