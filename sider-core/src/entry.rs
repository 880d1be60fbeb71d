use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Expiry sentinel for entries that never expire
pub const NEVER_EXPIRES: i64 = -1;

/// Returns the current wall-clock time in Unix epoch nanoseconds
///
/// Saturates at `i64::MAX` (year 2262) and returns 0 for clocks set before the epoch.
pub fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Represents a stored value with its expiration time
///
/// The value is opaque to the store. `expires_at` is an absolute epoch
/// nanosecond timestamp, or [`NEVER_EXPIRES`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    value: Bytes,
    expires_at: i64,
}

impl Entry {
    /// Creates a new entry with the given value and expiration time
    pub fn new(value: impl Into<Bytes>, expires_at: i64) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Creates an entry that never expires
    pub fn persistent(value: impl Into<Bytes>) -> Self {
        Self::new(value, NEVER_EXPIRES)
    }

    /// Returns the stored value
    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Returns the raw expiration timestamp as stored
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// Consumes the entry, returning the value and expiration time
    pub fn into_parts(self) -> (Bytes, i64) {
        (self.value, self.expires_at)
    }

    /// Replaces the value, keeping the expiration time
    pub(crate) fn replace_value(&mut self, value: Bytes) {
        self.value = value;
    }

    /// Checks if this entry has expired relative to `now` (epoch nanoseconds)
    ///
    /// Only positive timestamps can expire; `-1` and `0` never do.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at > 0 && now > self.expires_at
    }

    /// Checks if this entry has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_nanos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_not_expired() {
        let entry = Entry::new(&b"test_value"[..], now_nanos() + 60_000_000_000);

        assert_eq!(entry.value().as_ref(), b"test_value");
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expired() {
        let entry = Entry::new(&b"test_value"[..], now_nanos() - 1);

        assert!(entry.is_expired());
    }

    #[test]
    fn test_never_expires_sentinel() {
        let entry = Entry::persistent(&b"forever"[..]);

        assert_eq!(entry.expires_at(), NEVER_EXPIRES);
        assert!(!entry.is_expired_at(i64::MAX));
    }

    #[test]
    fn test_boundary_is_not_expired() {
        // Expiry is strict: an entry is still live at exactly its timestamp.
        let entry = Entry::new(&b"v"[..], 1_000);
        assert!(!entry.is_expired_at(1_000));
        assert!(entry.is_expired_at(1_001));
    }

    #[test]
    fn test_zero_expiry_never_expires() {
        let entry = Entry::new(&b"v"[..], 0);
        assert!(!entry.is_expired_at(now_nanos()));
    }

    #[test]
    fn test_value_clone_shares_buffer() {
        let entry = Entry::persistent(Bytes::from_static(b"shared_value"));

        let a = entry.value().clone();
        let b = entry.value().clone();
        assert_eq!(a.as_ptr(), b.as_ptr());
    }
}
