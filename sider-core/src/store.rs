use bytes::Bytes;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::entry::{now_nanos, Entry};
use crate::error::StoreError;

/// Value returned by [`Store::ttl`] when the key does not exist
pub const KEY_MISSING_TTL: i64 = -2;

/// Thread-safe in-memory key-value store with per-entry expiry
///
/// Every operation, including lookups and pattern scans, takes the same
/// exclusive lock. The lock is only held for the map operation itself.
///
/// Expired entries are not filtered on read. They stay visible to `get`,
/// `keys` and `ttl` until [`Store::delete_expired`] runs, either from the
/// [`Sweeper`](crate::Sweeper) or from an explicit call.
///
/// Cloning a `Store` is cheap and every clone shares the same table.
///
/// # Example
///
/// ```rust
/// use sider_core::{Store, NEVER_EXPIRES};
///
/// let store = Store::new();
/// store.set("user:123", &b"John Doe"[..], NEVER_EXPIRES);
///
/// let entry = store.get("user:123").unwrap();
/// assert_eq!(entry.value().as_ref(), b"John Doe");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Store {
    data: Arc<Mutex<HashMap<String, Entry>>>,
}

impl Store {
    /// Creates a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given entries
    pub fn from_entries(entries: HashMap<String, Entry>) -> Self {
        Self {
            data: Arc::new(Mutex::new(entries)),
        }
    }

    /// Sets the key to hold the value, replacing any existing entry
    ///
    /// `expires_at` is stored as given, without validation.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Bytes>, expires_at: i64) {
        let entry = Entry::new(value, expires_at);
        self.data.lock().insert(key.into(), entry);
    }

    /// Returns the entry stored under the key
    ///
    /// Logically expired entries are returned as stored.
    pub fn get(&self, key: &str) -> Result<Entry, StoreError> {
        self.data
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    /// Replaces the value of an existing key, keeping its expiration time
    pub fn update(&self, key: &str, value: impl Into<Bytes>) -> Result<(), StoreError> {
        let value = value.into();
        let mut data = self.data.lock();
        match data.get_mut(key) {
            Some(entry) => {
                entry.replace_value(value);
                Ok(())
            }
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    /// Removes a key from the store
    ///
    /// Returns `true` if the key existed. Removing an absent key is not an error.
    pub fn remove(&self, key: &str) -> bool {
        self.data.lock().remove(key).is_some()
    }

    /// Returns every key containing a match for the regular expression `pattern`
    ///
    /// Matching is unanchored: `"k.*"` matches `"key1"` and also `"desk"`.
    /// An empty pattern matches every key. A pattern that is not a valid
    /// regular expression matches nothing. Order is unspecified.
    ///
    /// # Performance Warning
    ///
    /// This scans the whole table while holding the store lock.
    pub fn keys(&self, pattern: &str) -> Vec<String> {
        let re = match Regex::new(pattern) {
            Ok(re) => re,
            Err(e) => {
                tracing::debug!(error = %e, "invalid key pattern, matching nothing");
                return Vec::new();
            }
        };
        let data = self.data.lock();
        data.keys().filter(|key| re.is_match(key)).cloned().collect()
    }

    /// Returns the raw expiration timestamp stored for the key
    ///
    /// This is the absolute expiry (or `-1` for entries that never expire),
    /// not a remaining duration. Returns [`KEY_MISSING_TTL`] if the key is absent.
    pub fn ttl(&self, key: &str) -> i64 {
        self.data
            .lock()
            .get(key)
            .map(Entry::expires_at)
            .unwrap_or(KEY_MISSING_TTL)
    }

    /// Removes all entries from the store
    ///
    /// Returns the number of entries that were removed.
    pub fn flush(&self) -> usize {
        let mut data = self.data.lock();
        let count = data.len();
        data.clear();
        count
    }

    /// Removes every entry whose expiration time has passed
    ///
    /// Returns the number of entries removed.
    pub fn delete_expired(&self) -> usize {
        self.delete_expired_at(now_nanos())
    }

    /// Removes every entry that is expired relative to `now` (epoch nanoseconds)
    pub fn delete_expired_at(&self, now: i64) -> usize {
        let mut data = self.data.lock();
        let before = data.len();
        data.retain(|_, entry| !entry.is_expired_at(now));
        before - data.len()
    }

    /// Returns the number of entries in the store (including expired ones)
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns `true` if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }

    /// Returns a copy of the whole table
    ///
    /// Values are reference-counted, so this does not copy value bytes.
    pub fn entries(&self) -> HashMap<String, Entry> {
        self.data.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::NEVER_EXPIRES;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_set_and_get() {
        let store = Store::new();
        store.set("key1", &b"value1"[..], 42);

        let entry = store.get("key1").unwrap();
        assert_eq!(entry.value().as_ref(), b"value1");
        assert_eq!(entry.expires_at(), 42);
    }

    #[test]
    fn test_get_nonexistent_key() {
        let store = Store::new();
        assert!(matches!(store.get("nonexistent"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_overwrite_key() {
        let store = Store::new();
        store.set("key1", &b"value1"[..], NEVER_EXPIRES);
        store.set("key1", &b"value2"[..], 7);

        let entry = store.get("key1").unwrap();
        assert_eq!(entry.value().as_ref(), b"value2");
        assert_eq!(entry.expires_at(), 7);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_empty_value_round_trips() {
        let store = Store::new();
        store.set("empty", Bytes::new(), NEVER_EXPIRES);

        assert!(store.get("empty").unwrap().value().is_empty());
    }

    #[test]
    fn test_get_returns_expired_entry() {
        let store = Store::new();
        store.set("stale", &b"value"[..], 1);

        let entry = store.get("stale").unwrap();
        assert!(entry.is_expired());
        assert_eq!(entry.expires_at(), 1);
    }

    #[test]
    fn test_update_missing_key() {
        let store = Store::new();
        let result = store.update("missing", &b"value"[..]);

        assert!(matches!(result, Err(StoreError::NotFound(k)) if k == "missing"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_preserves_expiry() {
        let store = Store::new();
        store.set("k", &b"v1"[..], 5);
        store.update("k", &b"v2"[..]).unwrap();

        assert_eq!(store.ttl("k"), 5);
        assert_eq!(store.get("k").unwrap().value().as_ref(), b"v2");
    }

    #[test]
    fn test_remove() {
        let store = Store::new();
        store.set("key1", &b"value1"[..], NEVER_EXPIRES);

        assert!(store.remove("key1"));
        assert!(store.get("key1").is_err());
        assert!(!store.remove("key1")); // Already removed
    }

    #[test]
    fn test_remove_absent_key_leaves_table_alone() {
        let store = Store::new();
        store.set("keep", &b"value"[..], NEVER_EXPIRES);

        assert!(!store.remove("absent"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("keep").unwrap().value().as_ref(), b"value");
    }

    #[test]
    fn test_keys_pattern() {
        let store = Store::new();
        store.set("key1", &b"a"[..], NEVER_EXPIRES);
        store.set("key2", &b"b"[..], NEVER_EXPIRES);
        store.set("other", &b"c"[..], NEVER_EXPIRES);

        let keys: HashSet<String> = store.keys("k.*").into_iter().collect();
        let expected: HashSet<String> = ["key1", "key2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_keys_is_unanchored() {
        let store = Store::new();
        store.set("user:1", &b"a"[..], NEVER_EXPIRES);
        store.set("session:user", &b"b"[..], NEVER_EXPIRES);
        store.set("admin", &b"c"[..], NEVER_EXPIRES);

        let mut keys = store.keys("user");
        keys.sort();
        assert_eq!(keys, vec!["session:user", "user:1"]);

        let anchored = store.keys("^user");
        assert_eq!(anchored, vec!["user:1"]);
    }

    #[test]
    fn test_keys_empty_pattern_matches_all() {
        let store = Store::new();
        store.set("a", &b"1"[..], NEVER_EXPIRES);
        store.set("b", &b"2"[..], 1);

        let mut keys = store.keys("");
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_keys_invalid_pattern() {
        let store = Store::new();
        store.set("a", &b"1"[..], NEVER_EXPIRES);

        assert!(store.keys("(").is_empty());
        assert!(store.keys("[a-").is_empty());
        assert_eq!(store.keys("a"), vec!["a"]);
    }

    #[test]
    fn test_ttl_sentinels() {
        let store = Store::new();
        store.set("forever", &b"v"[..], NEVER_EXPIRES);
        store.set("timed", &b"v"[..], 1_700_000_000_000_000_000);

        assert_eq!(store.ttl("missing"), KEY_MISSING_TTL);
        assert_eq!(store.ttl("forever"), -1);
        assert_eq!(store.ttl("timed"), 1_700_000_000_000_000_000);
    }

    #[test]
    fn test_flush() {
        let store = Store::new();
        store.set("key1", &b"value1"[..], NEVER_EXPIRES);
        store.set("key2", &b"value2"[..], NEVER_EXPIRES);
        store.set("key3", &b"value3"[..], NEVER_EXPIRES);

        assert_eq!(store.flush(), 3);
        assert!(store.is_empty());
        assert!(store.get("key1").is_err());
        assert_eq!(store.flush(), 0);
    }

    #[test]
    fn test_delete_expired() {
        let store = Store::new();
        let now = now_nanos();
        store.set("past", &b"v"[..], now - 1);
        store.set("future", &b"v"[..], now + 1_000_000_000_000);
        store.set("forever", &b"v"[..], NEVER_EXPIRES);

        let removed = store.delete_expired();

        assert_eq!(removed, 1);
        assert!(store.get("past").is_err());
        assert!(store.get("future").is_ok());
        assert!(store.get("forever").is_ok());
    }

    #[test]
    fn test_delete_expired_at_fixed_clock() {
        let store = Store::new();
        store.set("a", &b"v"[..], 100);
        store.set("b", &b"v"[..], 200);
        store.set("c", &b"v"[..], NEVER_EXPIRES);

        assert_eq!(store.delete_expired_at(100), 0);
        assert_eq!(store.delete_expired_at(150), 1);
        assert_eq!(store.delete_expired_at(i64::MAX), 1);

        assert_eq!(store.keys(""), vec!["c"]);
    }

    #[test]
    fn test_entries_is_a_copy() {
        let store = Store::new();
        store.set("k", &b"v"[..], NEVER_EXPIRES);

        let copy = store.entries();
        store.flush();

        assert_eq!(copy.len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_writes() {
        let store = Store::new();
        let mut handles = vec![];

        // Spawn 10 threads, each writing 100 distinct keys
        for thread_id in 0..10 {
            let store = store.clone();
            let handle = thread::spawn(move || {
                for i in 0..100 {
                    let key = format!("thread{}:key{}", thread_id, i);
                    let value = format!("value{}:{}", thread_id, i);
                    store.set(key, value, NEVER_EXPIRES);
                }
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.join().expect("Thread panicked");
        }

        assert_eq!(store.len(), 1000);
        for thread_id in 0..10 {
            for i in 0..100 {
                let entry = store.get(&format!("thread{}:key{}", thread_id, i)).unwrap();
                assert_eq!(entry.value().as_ref(), format!("value{}:{}", thread_id, i).as_bytes());
            }
        }
    }

    #[test]
    fn test_concurrent_sweep_with_operations() {
        let store = Store::new();

        for i in 0..50 {
            store.set(format!("expiring{}", i), &b"value"[..], 1);
            store.set(format!("persistent{}", i), &b"value"[..], NEVER_EXPIRES);
        }

        let mut handles = vec![];

        let sweeper = store.clone();
        handles.push(thread::spawn(move || {
            sweeper.delete_expired();
        }));

        for _ in 0..3 {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                for i in 0..50 {
                    let _ = store.get(&format!("expiring{}", i));
                    let _ = store.keys("persistent");
                }
            }));
        }

        let writer = store.clone();
        handles.push(thread::spawn(move || {
            for i in 0..50 {
                writer.set(format!("new{}", i), &b"value"[..], NEVER_EXPIRES);
            }
        }));

        for handle in handles {
            handle.join().expect("Thread panicked");
        }

        // persistent: 50, new: 50
        assert_eq!(store.len(), 100);
        for i in 0..50 {
            assert!(store.get(&format!("persistent{}", i)).is_ok());
            assert!(store.get(&format!("new{}", i)).is_ok());
        }
    }

    #[test]
    fn test_store_clone_shares_data() {
        let store1 = Store::new();
        let store2 = store1.clone();

        store1.set("key1", &b"value1"[..], NEVER_EXPIRES);
        assert!(store2.get("key1").is_ok());

        store2.remove("key1");
        assert!(store1.get("key1").is_err());
    }
}
