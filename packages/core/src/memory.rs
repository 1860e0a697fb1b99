//! In-memory store.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::{Context, KvPair, KvStore, Location, StoreError};

/// A `KvStore` backed by an ordered map.
///
/// # Example
///
/// ```rust
/// use kvfs_core::{KvFs, MemoryStore};
/// use url::Url;
///
/// let store = MemoryStore::new()
///     .with_entry("dir/foo", "foo")
///     .with_entry("dir/sub/bar", "bar");
///
/// let fsys = KvFs::new(Url::parse("mem:///dir/").unwrap(), store).unwrap();
/// assert_eq!(fsys.read_file("foo").unwrap(), "foo");
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Bytes>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy of this store with `key` set to `value`.
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Bytes>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Bytes>> FromIterator<(K, V)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl KvStore for MemoryStore {
    fn get(&self, ctx: &Context, at: &Location) -> Result<Option<KvPair>, StoreError> {
        ctx.check()?;
        let key = at.key();
        Ok(self
            .entries
            .get(&key)
            .map(|value| KvPair::new(key, value.clone())))
    }

    fn list(&self, ctx: &Context, prefix: &Location) -> Result<Vec<KvPair>, StoreError> {
        ctx.check()?;
        let prefix = prefix.key();
        Ok(self
            .entries
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(key, value)| KvPair::new(key.clone(), value.clone()))
            .collect())
    }
}
