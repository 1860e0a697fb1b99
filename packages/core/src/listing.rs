//! One-level directory listings built from recursive queries.

use std::collections::HashMap;

use bytes::Bytes;

use crate::path::base_name;
use crate::{collapse, Context, FileInfo, KvStore, Location, StoreError};

/// One entry of a directory listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirEntry {
    File { name: String, content: Bytes },
    Dir { name: String },
}

impl DirEntry {
    /// Base name, without the directory marker.
    pub fn name(&self) -> &str {
        match self {
            DirEntry::File { name, .. } | DirEntry::Dir { name } => name,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, DirEntry::Dir { .. })
    }

    pub fn info(&self) -> FileInfo {
        match self {
            DirEntry::File { name, content } => FileInfo::file(name.clone(), content.len() as u64),
            DirEntry::Dir { name } => FileInfo::dir(name.clone()),
        }
    }
}

/// List the immediate children of `prefix` with one recursive query.
///
/// A prefix with no descendants yields an empty listing.
pub fn list<S: KvStore + ?Sized>(
    store: &S,
    ctx: &Context,
    prefix: &Location,
) -> Result<Vec<DirEntry>, StoreError> {
    let key = prefix.key();
    let pairs = store.list(ctx, prefix)?;
    log::debug!("listed {} keys under '{}'", pairs.len(), key);

    let mut values: HashMap<String, Bytes> = pairs
        .into_iter()
        .map(|pair| (pair.key, pair.value))
        .collect();

    let children = collapse(&key, values.keys());
    let entries: Vec<DirEntry> = children
        .into_iter()
        .map(|child| {
            let name = base_name(&child).to_string();
            if child.ends_with('/') {
                DirEntry::Dir { name }
            } else {
                let content = values.remove(&child).unwrap_or_default();
                DirEntry::File { name, content }
            }
        })
        .collect();

    log::trace!("'{}' has {} children", key, entries.len());
    Ok(entries)
}
