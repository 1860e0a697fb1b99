//! Folding deep keys into one directory level.

use std::collections::BTreeSet;

/// The immediate children of `prefix` among `keys`.
///
/// A key with no separator after `prefix` is a file child and is returned
/// as is. Deeper keys are truncated after the first separator following
/// `prefix`, so every descendant of a subdirectory collapses onto one
/// `prefix + name + "/"` entry. The prefix itself is dropped, duplicates are
/// removed and the result is sorted. Keys outside `prefix` are ignored.
///
/// # Example
///
/// ```rust
/// use kvfs_core::collapse;
///
/// let children = collapse("dir/", ["dir/1", "dir/4/4.1", "dir/4/4.2", "dir/2"]);
/// assert_eq!(children, vec!["dir/1", "dir/2", "dir/4/"]);
/// ```
pub fn collapse<I, K>(prefix: &str, keys: I) -> Vec<String>
where
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    let mut children = BTreeSet::new();

    for key in keys {
        let key = key.as_ref();
        let Some(remainder) = key.strip_prefix(prefix) else {
            continue;
        };
        if remainder.is_empty() {
            continue;
        }

        let child = match remainder.find('/') {
            Some(sep) => &key[..prefix.len() + sep + 1],
            None => key,
        };
        children.insert(child.to_string());
    }

    children.into_iter().collect()
}
