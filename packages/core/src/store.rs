//! Backing store trait.

use std::collections::BTreeSet;

use bytes::Bytes;

use crate::{Context, Location, StoreError};

/// A key and its value, as returned by the backing store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KvPair {
    pub key: String,
    pub value: Bytes,
}

impl KvPair {
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Read access to a flat key-value store.
///
/// Keys are `/`-separated strings; the store has no notion of directories.
/// Every call performs exactly one round-trip and honors the context's
/// cancellation.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Box<dyn KvStore>`.
pub trait KvStore: Send + Sync {
    /// Look up a single key.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - The key does not exist.
    /// * `Ok(Some(pair))` - The key and its value.
    /// * `Err(StoreError)` - The lookup failed.
    fn get(&self, ctx: &Context, at: &Location) -> Result<Option<KvPair>, StoreError>;

    /// Every pair whose key starts with `prefix`, at any depth, in no
    /// particular order. An unknown prefix yields an empty vector.
    fn list(&self, ctx: &Context, prefix: &Location) -> Result<Vec<KvPair>, StoreError>;

    /// The keys at or directly below `prefix`, without their values.
    ///
    /// Each key starting with `prefix` is cut after the first `/` that
    /// follows the prefix, so a deep subtree shows up as one entry. A key
    /// equal to `prefix` (a directory marker) is included. Sorted, no
    /// duplicates. The default implementation filters [`list`](Self::list);
    /// backends with a cheaper key-only query should override it.
    fn keys(&self, ctx: &Context, prefix: &Location) -> Result<Vec<String>, StoreError> {
        let prefix_key = prefix.key();
        let keys: BTreeSet<String> = self
            .list(ctx, prefix)?
            .into_iter()
            .filter_map(|pair| {
                let remainder = pair.key.strip_prefix(&prefix_key)?;
                Some(match remainder.find('/') {
                    Some(sep) => pair.key[..prefix_key.len() + sep + 1].to_string(),
                    None => pair.key,
                })
            })
            .collect();
        Ok(keys.into_iter().collect())
    }
}

impl<T: KvStore + ?Sized> KvStore for &T {
    fn get(&self, ctx: &Context, at: &Location) -> Result<Option<KvPair>, StoreError> {
        (**self).get(ctx, at)
    }

    fn list(&self, ctx: &Context, prefix: &Location) -> Result<Vec<KvPair>, StoreError> {
        (**self).list(ctx, prefix)
    }

    fn keys(&self, ctx: &Context, prefix: &Location) -> Result<Vec<String>, StoreError> {
        (**self).keys(ctx, prefix)
    }
}

impl<T: KvStore + ?Sized> KvStore for Box<T> {
    fn get(&self, ctx: &Context, at: &Location) -> Result<Option<KvPair>, StoreError> {
        (**self).get(ctx, at)
    }

    fn list(&self, ctx: &Context, prefix: &Location) -> Result<Vec<KvPair>, StoreError> {
        (**self).list(ctx, prefix)
    }

    fn keys(&self, ctx: &Context, prefix: &Location) -> Result<Vec<String>, StoreError> {
        (**self).keys(ctx, prefix)
    }
}

impl<T: KvStore + ?Sized> KvStore for std::sync::Arc<T> {
    fn get(&self, ctx: &Context, at: &Location) -> Result<Option<KvPair>, StoreError> {
        (**self).get(ctx, at)
    }

    fn list(&self, ctx: &Context, prefix: &Location) -> Result<Vec<KvPair>, StoreError> {
        (**self).list(ctx, prefix)
    }

    fn keys(&self, ctx: &Context, prefix: &Location) -> Result<Vec<String>, StoreError> {
        (**self).keys(ctx, prefix)
    }
}
